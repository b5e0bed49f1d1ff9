//! Resolution Set Builder
//!
//! Drives the specificity resolver across a whole package request, once for
//! the native manager and once per secondary manager.
//!
//! # Rules
//!
//! | Manager   | `NotFound`                      | `FoundNull`        |
//! |-----------|---------------------------------|--------------------|
//! | native    | fatal `UnmappedRequiredPackage` | recorded as remove |
//! | secondary | entry omitted                   | recorded as remove |
//!
//! # What This Explicitly Refuses To Do
//!
//! - Decide suppression between managers: that's `logic::suppress`
//! - Flatten or sort: output is keyed by logical name, see `logic::finalize`
//! - Check that concrete names exist in any repository

use std::collections::BTreeMap;

use crate::error::{ResolveError, Result};
use crate::logic::specificity::resolve;
use crate::mapping::{CandidateValue, MappingTable};
use crate::projects::ProjectPackages;
use crate::types::TargetProfile;

/// Name under which the native manager's resolution is reported
pub const NATIVE_MANAGER: &str = "native";

/// Logical package name -> selected candidate, for one manager
pub type ResolvedMapping = BTreeMap<String, CandidateValue>;

/// Resolved mapping for one manager, tagged with the manager's name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagerResolution {
    pub manager: String,
    pub mapping: ResolvedMapping,
}

/// Per-manager resolutions for one request, secondaries in declaration order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolutionSet {
    pub native: ManagerResolution,
    pub secondaries: Vec<ManagerResolution>,
}

// ============================================================================
// Per-manager resolution
// ============================================================================

/// Resolve every requested package against the native table.
///
/// The first package without any matching key aborts the whole request.
pub fn resolve_native(
    requests: &[ProjectPackages],
    table: &MappingTable,
    profile: &TargetProfile,
) -> Result<ResolvedMapping> {
    let mut resolved = ResolvedMapping::new();

    for request in requests {
        for package in &request.packages {
            let candidate = resolve(package, table, profile)
                .to_candidate()
                .ok_or_else(|| ResolveError::UnmappedRequiredPackage {
                    package: package.clone(),
                    project: request.project.clone(),
                    profile: profile.to_string(),
                })?;
            resolved.insert(package.clone(), candidate);
        }
    }

    tracing::debug!(
        table = table.name(),
        entries = resolved.len(),
        "resolved native packages"
    );
    Ok(resolved)
}

/// Resolve every requested package against a secondary table.
///
/// Packages the table has nothing to say about are left out.
pub fn resolve_secondary(
    requests: &[ProjectPackages],
    table: &MappingTable,
    profile: &TargetProfile,
) -> ResolvedMapping {
    let resolved: ResolvedMapping = requests
        .iter()
        .flat_map(|request| request.packages.iter())
        .filter_map(|package| {
            resolve(package, table, profile)
                .to_candidate()
                .map(|candidate| (package.clone(), candidate))
        })
        .collect();

    tracing::debug!(
        table = table.name(),
        entries = resolved.len(),
        "resolved secondary packages"
    );
    resolved
}

// ============================================================================
// Whole-set resolution
// ============================================================================

/// Resolve a request for the native manager and each secondary manager.
///
/// Native resolution runs first; if it fails, no secondary table is consulted.
pub fn build<'t, I>(
    requests: &[ProjectPackages],
    native: &MappingTable,
    secondaries: I,
    profile: &TargetProfile,
) -> Result<ResolutionSet>
where
    I: IntoIterator<Item = (&'t str, &'t MappingTable)>,
{
    let native = ManagerResolution {
        manager: NATIVE_MANAGER.to_string(),
        mapping: resolve_native(requests, native, profile)?,
    };

    let secondaries = secondaries
        .into_iter()
        .map(|(manager, table)| ManagerResolution {
            manager: manager.to_string(),
            mapping: resolve_secondary(requests, table, profile),
        })
        .collect();

    Ok(ResolutionSet {
        native,
        secondaries,
    })
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn fedora() -> TargetProfile {
        TargetProfile::new("Fedora", "33", "x86_64", "rpm")
    }

    fn request(project: &str, packages: &[&str]) -> Vec<ProjectPackages> {
        vec![ProjectPackages::new(project, packages.iter().copied())]
    }

    fn native_table() -> MappingTable {
        MappingTable::new("native")
            .with("git", "default", "git")
            .with("meson", "default", "meson")
            .with("meson", "x86_64-Fedora", "meson-ninja")
            .with("perl", "default", CandidateValue::Remove)
    }

    #[test]
    fn test_native_resolves_every_package() {
        let resolved =
            resolve_native(&request("libvirt", &["git", "meson", "perl"]), &native_table(), &fedora())
                .unwrap();

        assert_eq!(resolved.len(), 3);
        assert_eq!(resolved["meson"], CandidateValue::from("meson-ninja"));
        assert_eq!(resolved["perl"], CandidateValue::Remove);
    }

    #[test]
    fn test_native_unmapped_is_fatal() {
        let err = resolve_native(&request("libvirt", &["git", "pytest"]), &native_table(), &fedora())
            .unwrap_err();

        assert_eq!(
            err,
            ResolveError::UnmappedRequiredPackage {
                package: "pytest".to_string(),
                project: "libvirt".to_string(),
                profile: "x86_64 Fedora 33 (rpm)".to_string(),
            }
        );
    }

    #[test]
    fn test_native_error_names_owning_project() {
        let requests = vec![
            ProjectPackages::new("base", ["git"]),
            ProjectPackages::new("qemu", ["meson", "sphinx"]),
        ];
        let err = resolve_native(&requests, &native_table(), &fedora()).unwrap_err();

        assert!(matches!(
            err,
            ResolveError::UnmappedRequiredPackage { ref project, ref package, .. }
                if project == "qemu" && package == "sphinx"
        ));
    }

    #[test]
    fn test_secondary_unmapped_is_omitted() {
        let pypi = MappingTable::new("pip").with("meson", "default", "meson==0.56");
        let resolved = resolve_secondary(&request("qemu", &["git", "meson"]), &pypi, &fedora());

        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved["meson"], CandidateValue::from("meson==0.56"));
    }

    #[test]
    fn test_build_keeps_secondary_order() {
        let pip = MappingTable::new("pip").with("meson", "default", "meson");
        let cpan = MappingTable::new("cpan").with("perl", "default", "App::cpanminus");

        let set = build(
            &request("qemu", &["git", "meson", "perl"]),
            &native_table(),
            [("pip", &pip), ("cpan", &cpan)],
            &fedora(),
        )
        .unwrap();

        assert_eq!(set.native.manager, NATIVE_MANAGER);
        let managers: Vec<&str> = set.secondaries.iter().map(|s| s.manager.as_str()).collect();
        assert_eq!(managers, vec!["pip", "cpan"]);
        assert_eq!(set.secondaries[1].mapping["perl"], CandidateValue::from("App::cpanminus"));
        assert!(!set.secondaries[0].mapping.contains_key("perl"));
    }

    #[test]
    fn test_build_fails_before_secondaries() {
        let pip = MappingTable::new("pip").with("pytest", "default", "pytest");

        let result = build(
            &request("qemu", &["pytest"]),
            &native_table(),
            [("pip", &pip)],
            &fedora(),
        );

        assert!(matches!(
            result,
            Err(ResolveError::UnmappedRequiredPackage { .. })
        ));
    }
}
