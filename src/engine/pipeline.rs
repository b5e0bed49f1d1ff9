//! Provisioning pipeline
//!
//! Turns a package request and a target profile into one `ManagerPlan` per
//! package manager. The pipeline is straight-line and forward-only:
//!
//! ```text
//! Splitting            (cross builds only: foreign and skipped packages
//!     ↓                 leave the request)
//! Resolving            (native first, fatal on unmapped package; then each
//!     ↓                 secondary manager in declaration order)
//! Suppressing          (secondary vs. native)
//!     ↓
//! Bootstrapping        (native packages needed by used secondary managers)
//!     ↓
//! Finalizing           (flatten, dedupe, sort per manager and for the
//!                       foreign architecture)
//! ```
//!
//! Any error aborts the run before a single plan is returned, so callers never
//! see a partial package set.
//!
//! # Design
//!
//! - **Pure logic**: No I/O; tables and requests are borrowed, never mutated
//! - **Shareable**: A `Pipeline` is `Send + Sync` and can serve many hosts at once
//! - **Typed output**: `ManagerPlan` carries manager name, action and packages

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{ResolveError, Result};
use crate::logic::cross::{self, CrossSplit, CrossTarget, CROSS_MANAGER};
use crate::logic::finalize::finalize;
use crate::logic::resolver::{self, ResolutionSet, ResolvedMapping, NATIVE_MANAGER};
use crate::logic::specificity::{resolve, Resolution};
use crate::logic::suppress::suppress_all;
use crate::mapping::MappingTable;
use crate::projects::ProjectPackages;
use crate::types::{PackageAction, TargetProfile};

// ============================================================================
// Inputs and outputs
// ============================================================================

/// A non-native package manager layered on top of the OS one
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecondaryManager {
    pub name: String,
    /// Install command with a `{packages}` placeholder
    pub install_command: String,
    pub table: MappingTable,
    /// Logical packages the native manager must provide whenever this
    /// manager has anything to install (e.g. pip itself)
    pub bootstrap: Vec<String>,
}

impl SecondaryManager {
    pub fn new(
        name: impl Into<String>,
        install_command: impl Into<String>,
        table: MappingTable,
    ) -> Self {
        Self {
            name: name.into(),
            install_command: install_command.into(),
            table,
            bootstrap: Vec::new(),
        }
    }

    pub fn with_bootstrap<I, S>(mut self, packages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.bootstrap = packages.into_iter().map(Into::into).collect();
        self
    }
}

/// Final package list for one manager, ready for the installer dispatcher
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManagerPlan {
    pub manager_name: String,
    pub action: PackageAction,
    pub packages: Vec<String>,
}

impl ManagerPlan {
    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }

    /// Substitute the space-joined package list for `{packages}` in `template`
    pub fn command_line(&self, template: &str) -> String {
        template.replace("{packages}", &self.packages.join(" "))
    }
}

/// Everything a provisioning run produces for one (request, profile) pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvisionPlan {
    pub profile: TargetProfile,
    /// Native install first, then secondaries in declaration order, then
    /// the foreign plan of a cross build, then the native remove plan if one
    /// was requested
    pub plans: Vec<ManagerPlan>,
    /// Logical names that produced at least one concrete package
    pub mapped_names: Vec<String>,
    /// Foreign architecture, for cross builds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cross: Option<CrossTarget>,
}

impl ProvisionPlan {
    pub fn plan(&self, manager: &str, action: PackageAction) -> Option<&ManagerPlan> {
        self.plans
            .iter()
            .find(|p| p.manager_name == manager && p.action == action)
    }

    /// Packages `manager` installs (empty when the manager has no plan)
    pub fn installs(&self, manager: &str) -> &[String] {
        self.plan(manager, PackageAction::Install)
            .map(|p| p.packages.as_slice())
            .unwrap_or_default()
    }
}

// ============================================================================
// Stages
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    Splitting,
    Resolving,
    Suppressing,
    Bootstrapping,
    Finalizing,
}

impl PipelineStage {
    pub const fn description(self) -> &'static str {
        match self {
            Self::Splitting => "Splitting foreign packages for the cross build",
            Self::Resolving => "Resolving package mappings",
            Self::Suppressing => "Suppressing natively supplied packages",
            Self::Bootstrapping => "Adding secondary manager bootstrap packages",
            Self::Finalizing => "Finalizing package lists",
        }
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}

// ============================================================================
// Pipeline
// ============================================================================

/// Resolution pipeline over read-only tables
#[derive(Debug, Clone, Copy)]
pub struct Pipeline<'a> {
    native: &'a MappingTable,
    secondaries: &'a [SecondaryManager],
    cross: Option<&'a CrossTarget>,
}

impl<'a> Pipeline<'a> {
    pub fn new(native: &'a MappingTable, secondaries: &'a [SecondaryManager]) -> Self {
        Self {
            native,
            secondaries,
            cross: None,
        }
    }

    /// Build for a foreign architecture as well as for the host
    pub fn with_cross(mut self, target: &'a CrossTarget) -> Self {
        self.cross = Some(target);
        self
    }

    /// Run the pipeline for packages to install, plus an optional set of
    /// packages to remove.
    pub fn run(
        &self,
        install: &[ProjectPackages],
        remove: Option<&ProjectPackages>,
        profile: &TargetProfile,
    ) -> Result<ProvisionPlan> {
        let _span = tracing::info_span!("provision", host = %profile).entered();

        let split = match self.cross {
            Some(target) => {
                log_stage(PipelineStage::Splitting);
                Some(cross::split(install, self.native, profile, target)?)
            }
            None => None,
        };
        let install = split
            .as_ref()
            .map_or(install, |split| split.native.as_slice());

        log_stage(PipelineStage::Resolving);
        let set = resolver::build(
            install,
            self.native,
            self.secondaries
                .iter()
                .map(|manager| (manager.name.as_str(), &manager.table)),
            profile,
        )?;

        log_stage(PipelineStage::Suppressing);
        let mut set = suppress_all(set);

        log_stage(PipelineStage::Bootstrapping);
        for (manager, resolution) in self.secondaries.iter().zip(&set.secondaries) {
            if finalize(&resolution.mapping).is_empty() {
                continue;
            }
            self.bootstrap(manager, &mut set.native.mapping, profile)?;
        }

        // Removal plan is resolved before any output is assembled so a bad
        // `unwanted` entry still aborts the whole run
        let removals = remove
            .map(|request| {
                resolver::resolve_native(std::slice::from_ref(request), self.native, profile)
            })
            .transpose()?;

        log_stage(PipelineStage::Finalizing);
        let mut plans = Vec::with_capacity(set.secondaries.len() + 3);
        plans.push(ManagerPlan {
            manager_name: NATIVE_MANAGER.to_string(),
            action: PackageAction::Install,
            packages: finalize(&set.native.mapping),
        });
        for resolution in &set.secondaries {
            plans.push(ManagerPlan {
                manager_name: resolution.manager.clone(),
                action: PackageAction::Install,
                packages: finalize(&resolution.mapping),
            });
        }
        if let Some(split) = &split {
            plans.push(ManagerPlan {
                manager_name: CROSS_MANAGER.to_string(),
                action: PackageAction::Install,
                packages: finalize(&split.foreign),
            });
        }
        if let Some(removals) = &removals {
            plans.push(ManagerPlan {
                manager_name: NATIVE_MANAGER.to_string(),
                action: PackageAction::Remove,
                packages: finalize(removals),
            });
        }

        let mapped_names = mapped_names(&set, split.as_ref());
        tracing::info!(
            native = plans[0].packages.len(),
            mapped = mapped_names.len(),
            "provisioning plan ready"
        );

        Ok(ProvisionPlan {
            profile: profile.clone(),
            plans,
            mapped_names,
            cross: self.cross.cloned(),
        })
    }

    fn bootstrap(
        &self,
        manager: &SecondaryManager,
        native: &mut ResolvedMapping,
        profile: &TargetProfile,
    ) -> Result<()> {
        for package in &manager.bootstrap {
            match resolve(package, self.native, profile) {
                Resolution::Found(value) => {
                    tracing::debug!(%package, manager = %manager.name, "bootstrap package");
                    native.insert(package.clone(), value.clone());
                }
                Resolution::FoundNull | Resolution::NotFound => {
                    return Err(ResolveError::MissingBootstrapPackage {
                        package: package.clone(),
                        manager: manager.name.clone(),
                        profile: profile.to_string(),
                    })
                }
            }
        }
        Ok(())
    }
}

fn log_stage(stage: PipelineStage) {
    tracing::debug!(%stage, "pipeline stage");
}

/// Sorted logical names with at least one concrete package in any manager
fn mapped_names(set: &ResolutionSet, split: Option<&CrossSplit>) -> Vec<String> {
    let mut names: Vec<String> = std::iter::once(&set.native)
        .chain(&set.secondaries)
        .flat_map(|resolution| resolution.mapping.iter())
        .chain(split.into_iter().flat_map(|split| split.foreign.iter()))
        .filter(|(_, candidate)| candidate.names().iter().any(|n| !n.trim().is_empty()))
        .map(|(name, _)| name.clone())
        .collect();
    names.sort();
    names.dedup();
    names
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::CandidateValue;

    fn debian() -> TargetProfile {
        TargetProfile::new("Debian", "10", "x86_64", "deb")
    }

    fn native() -> MappingTable {
        MappingTable::new("native")
            .with("git", "default", "git")
            .with("meson", "default", "meson")
            .with("meson", "Debian10", CandidateValue::Remove)
            .with("python3-pip", "default", "python3-pip")
            .with("exim", "deb", "exim4")
            .with("cpanm", "default", CandidateValue::Remove)
    }

    fn pip() -> SecondaryManager {
        SecondaryManager::new(
            "pip",
            "pip3 install {packages}",
            MappingTable::new("pip").with("meson", "default", "meson==0.55"),
        )
        .with_bootstrap(["python3-pip"])
    }

    #[test]
    fn test_run_routes_package_to_secondary_when_native_removes_it() {
        let secondaries = vec![pip()];
        let table = native();
        let pipeline = Pipeline::new(&table, &secondaries);

        let plan = pipeline
            .run(&[ProjectPackages::new("qemu", ["git", "meson"])], None, &debian())
            .unwrap();

        assert_eq!(plan.installs("pip"), ["meson==0.55"]);
        // python3-pip comes from the bootstrap list
        assert_eq!(plan.installs(NATIVE_MANAGER), ["git", "python3-pip"]);
        assert_eq!(plan.mapped_names, vec!["git", "meson", "python3-pip"]);
    }

    #[test]
    fn test_run_skips_bootstrap_for_unused_manager() {
        let secondaries = vec![pip()];
        let table = native();
        let pipeline = Pipeline::new(&table, &secondaries);

        let plan = pipeline
            .run(&[ProjectPackages::new("qemu", ["git"])], None, &debian())
            .unwrap();

        assert_eq!(plan.installs(NATIVE_MANAGER), ["git"]);
        assert!(plan.plan("pip", PackageAction::Install).unwrap().is_empty());
    }

    #[test]
    fn test_run_missing_bootstrap_is_fatal() {
        let secondaries = vec![SecondaryManager::new(
            "cpan",
            "cpanm --notest {packages}",
            MappingTable::new("cpan").with("perl-xml", "default", "XML::XPath"),
        )
        .with_bootstrap(["cpanm"])];
        let table = native().with("perl-xml", "default", CandidateValue::Remove);
        let pipeline = Pipeline::new(&table, &secondaries);

        let err = pipeline
            .run(&[ProjectPackages::new("libvirt", ["perl-xml"])], None, &debian())
            .unwrap_err();

        assert_eq!(
            err,
            ResolveError::MissingBootstrapPackage {
                package: "cpanm".to_string(),
                manager: "cpan".to_string(),
                profile: "x86_64 Debian 10 (deb)".to_string(),
            }
        );
    }

    #[test]
    fn test_run_emits_remove_plan() {
        let table = native();
        let secondaries: Vec<SecondaryManager> = Vec::new();
        let pipeline = Pipeline::new(&table, &secondaries);

        let plan = pipeline
            .run(
                &[ProjectPackages::new("qemu", ["git"])],
                Some(&ProjectPackages::new("unwanted", ["exim"])),
                &debian(),
            )
            .unwrap();

        let removal = plan.plan(NATIVE_MANAGER, PackageAction::Remove).unwrap();
        assert_eq!(removal.packages, vec!["exim4"]);
        assert_eq!(plan.plans.last(), Some(removal));
    }

    #[test]
    fn test_run_unmapped_removal_is_fatal() {
        let table = native();
        let secondaries: Vec<SecondaryManager> = Vec::new();
        let pipeline = Pipeline::new(&table, &secondaries);

        let result = pipeline.run(
            &[ProjectPackages::new("qemu", ["git"])],
            Some(&ProjectPackages::new("unwanted", ["sendmail"])),
            &debian(),
        );

        assert!(matches!(
            result,
            Err(ResolveError::UnmappedRequiredPackage { ref project, .. }) if project == "unwanted"
        ));
    }

    #[test]
    fn test_run_cross_build_moves_foreign_packages() {
        let table = native()
            .with("glib2", "deb", "libglib2.0-dev")
            .with("glib2", "cross-policy-default", "foreign")
            .with("gcc", "deb", "gcc")
            .with("gcc", "cross-policy-default", "skip")
            .with("gcc-cross", "cross-policy-default", "foreign")
            .with("gcc-cross", "cross-aarch64-deb", "gcc-aarch64-linux-gnu");
        let secondaries = vec![pip()];
        let target = CrossTarget::new("aarch64", &debian()).unwrap();
        let pipeline = Pipeline::new(&table, &secondaries).with_cross(&target);

        let plan = pipeline
            .run(
                &[ProjectPackages::new("qemu", ["git", "glib2", "gcc", "gcc-cross"])],
                None,
                &debian(),
            )
            .unwrap();

        assert_eq!(plan.installs(NATIVE_MANAGER), ["git"]);
        assert_eq!(
            plan.installs(CROSS_MANAGER),
            ["gcc-aarch64-linux-gnu", "libglib2.0-dev:arm64"]
        );
        assert_eq!(plan.plans.len(), 3);
        assert_eq!(plan.cross, Some(target));
        assert_eq!(plan.mapped_names, vec!["gcc-cross", "git", "glib2"]);
    }

    #[test]
    fn test_run_without_cross_has_no_cross_plan() {
        let table = native();
        let secondaries: Vec<SecondaryManager> = Vec::new();

        let plan = Pipeline::new(&table, &secondaries)
            .run(&[ProjectPackages::new("qemu", ["git"])], None, &debian())
            .unwrap();

        assert!(plan.plan(CROSS_MANAGER, PackageAction::Install).is_none());
        assert_eq!(plan.cross, None);
    }

    #[test]
    fn test_command_line() {
        let plan = ManagerPlan {
            manager_name: "pip".to_string(),
            action: PackageAction::Install,
            packages: vec!["meson".to_string(), "sphinx".to_string()],
        };
        assert_eq!(
            plan.command_line("pip3 install {packages}"),
            "pip3 install meson sphinx"
        );
    }

    #[test]
    fn test_stage_display() {
        assert_eq!(
            PipelineStage::Suppressing.to_string(),
            "Suppressing natively supplied packages"
        );
    }
}
