//! Cross-architecture resolution
//!
//! When a guest builds for a foreign architecture, every native package has a
//! policy saying where it comes from:
//!
//! | Policy    | Effect                                                  |
//! |-----------|---------------------------------------------------------|
//! | `native`  | resolved for the host as usual (the default)            |
//! | `foreign` | resolved over the cross tiers, installed for the target |
//! | `skip`    | not installed at all                                    |
//!
//! The policy comes from `cross-policy-<key>` entries of the native table,
//! folded over the four tiers not qualified by architecture. Foreign packages
//! fold over `cross-<arch>-<key>`; on deb hosts the plain `<key>` and
//! `<arch>-<key>` tiers come first, since Debian names a foreign package like
//! the native one and only adds a `:<deb arch>` suffix.
//!
//! Foreign and skipped packages are withdrawn from the request before native
//! and secondary resolution run.

use strum::{Display, EnumString};

use serde::{Deserialize, Serialize};

use crate::error::{ResolveError, Result};
use crate::logic::resolver::ResolvedMapping;
use crate::logic::specificity::{base_keys, resolve_keys, Resolution};
use crate::mapping::{CandidateValue, MappingTable};
use crate::projects::ProjectPackages;
use crate::types::TargetProfile;

/// Manager name the foreign package plan is reported under
pub const CROSS_MANAGER: &str = "cross";

const DEB_FORMAT: &str = "deb";

/// Where a package comes from in a cross build
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum CrossPolicy {
    #[default]
    Native,
    Foreign,
    Skip,
}

/// GNU triplet of the toolchain for an architecture
fn arch_to_abi(arch: &str) -> Option<&'static str> {
    Some(match arch {
        "aarch64" => "aarch64-linux-gnu",
        "armv6l" => "arm-linux-gnueabi",
        "armv7l" => "arm-linux-gnueabihf",
        "i686" => "i686-linux-gnu",
        "mingw32" => "i686-w64-mingw32",
        "mingw64" => "x86_64-w64-mingw32",
        "mips" => "mips-linux-gnu",
        "mipsel" => "mipsel-linux-gnu",
        "mips64el" => "mips64el-linux-gnuabi64",
        "ppc64le" => "powerpc64le-linux-gnu",
        "s390x" => "s390x-linux-gnu",
        "x86_64" => "x86_64-linux-gnu",
        _ => return None,
    })
}

/// Debian's name for an architecture
fn arch_to_deb_arch(arch: &str) -> Option<&'static str> {
    Some(match arch {
        "aarch64" => "arm64",
        "armv6l" => "armel",
        "armv7l" => "armhf",
        "i686" => "i386",
        "mips" => "mips",
        "mipsel" => "mipsel",
        "mips64el" => "mips64el",
        "ppc64le" => "ppc64el",
        "s390x" => "s390x",
        "x86_64" => "amd64",
        _ => return None,
    })
}

/// Foreign architecture a guest builds for
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrossTarget {
    pub arch: String,
    /// Toolchain triplet (`aarch64-linux-gnu`)
    pub abi: String,
    /// Debian architecture name; set on deb hosts only
    pub deb_arch: Option<String>,
}

impl CrossTarget {
    /// Check that `profile` can build for `cross_arch` and derive the target.
    ///
    /// Only Debian and Fedora hosts cross compile: Debian for Linux targets,
    /// Fedora for mingw targets.
    pub fn new(cross_arch: &str, profile: &TargetProfile) -> Result<Self> {
        let unsupported = |reason: &str| ResolveError::UnsupportedCrossTarget {
            cross_arch: cross_arch.to_string(),
            profile: profile.to_string(),
            reason: reason.to_string(),
        };

        let mingw = cross_arch.starts_with("mingw");
        match profile.os_name.as_str() {
            "Debian" if mingw => return Err(unsupported("mingw targets need a Fedora host")),
            "Fedora" if !mingw => return Err(unsupported("Fedora only builds for mingw targets")),
            "Debian" | "Fedora" => {}
            _ => return Err(unsupported("only Debian and Fedora hosts can cross compile")),
        }
        if cross_arch == profile.arch {
            return Err(unsupported("cross arch must differ from the native arch"));
        }

        let abi = arch_to_abi(cross_arch).ok_or_else(|| unsupported("unknown architecture"))?;
        let deb_arch = if profile.pkg_format == DEB_FORMAT {
            let deb_arch = arch_to_deb_arch(cross_arch)
                .ok_or_else(|| unsupported("no Debian name for this architecture"))?;
            Some(deb_arch.to_string())
        } else {
            None
        };

        Ok(Self {
            arch: cross_arch.to_string(),
            abi: abi.to_string(),
            deb_arch,
        })
    }

    /// Keys a foreign package is resolved over, least specific first
    pub fn foreign_keys(&self, profile: &TargetProfile) -> Vec<String> {
        let base = base_keys(profile);
        let cross = base.iter().map(|key| format!("cross-{}-{}", self.arch, key));

        if profile.pkg_format == DEB_FORMAT {
            base.iter()
                .cloned()
                .chain(base.iter().map(|key| format!("{}-{}", self.arch, key)))
                .chain(cross)
                .collect()
        } else {
            cross.collect()
        }
    }

    /// Name a foreign package is installed under.
    ///
    /// Cross compilers (`gcc-*`, `g++-*`) run on the host and keep their name.
    pub fn foreign_name(&self, name: &str) -> String {
        match &self.deb_arch {
            Some(deb_arch) if !(name.starts_with("gcc-") || name.starts_with("g++-")) => {
                format!("{name}:{deb_arch}")
            }
            _ => name.to_string(),
        }
    }

    fn rename(&self, candidate: &CandidateValue) -> CandidateValue {
        match candidate {
            CandidateValue::Name(name) => CandidateValue::Name(self.foreign_name(name)),
            CandidateValue::Names(names) => {
                CandidateValue::Names(names.iter().map(|n| self.foreign_name(n)).collect())
            }
            CandidateValue::Remove => CandidateValue::Remove,
        }
    }
}

/// Cross policy of `package` on `profile`
pub fn policy(package: &str, table: &MappingTable, profile: &TargetProfile) -> Result<CrossPolicy> {
    let keys: Vec<String> = base_keys(profile)
        .iter()
        .map(|key| format!("cross-policy-{key}"))
        .collect();

    let invalid = |found: String| ResolveError::InvalidCrossPolicy {
        package: package.to_string(),
        found,
    };

    match resolve_keys(package, table, &keys) {
        Resolution::NotFound => Ok(CrossPolicy::Native),
        Resolution::FoundNull => Err(invalid("null".to_string())),
        Resolution::Found(CandidateValue::Name(value)) => {
            value.parse().map_err(|_| invalid(value.clone()))
        }
        Resolution::Found(other) => Err(invalid(format!("{:?}", other.names()))),
    }
}

/// A request split by cross policy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrossSplit {
    /// What is left for native and secondary resolution
    pub native: Vec<ProjectPackages>,
    /// Foreign candidates, names already in their foreign spelling
    pub foreign: ResolvedMapping,
}

/// Split `requests` by cross policy, resolving the foreign packages.
///
/// A foreign package without any cross key is fatal, like an unmapped native
/// package.
pub fn split(
    requests: &[ProjectPackages],
    table: &MappingTable,
    profile: &TargetProfile,
    target: &CrossTarget,
) -> Result<CrossSplit> {
    let keys = target.foreign_keys(profile);
    let mut native = Vec::with_capacity(requests.len());
    let mut foreign = ResolvedMapping::new();

    for request in requests {
        let mut kept = Vec::with_capacity(request.packages.len());
        for package in &request.packages {
            match policy(package, table, profile)? {
                CrossPolicy::Native => kept.push(package.clone()),
                CrossPolicy::Skip => tracing::debug!(%package, "skipped for cross build"),
                CrossPolicy::Foreign => {
                    let candidate = resolve_keys(package, table, &keys)
                        .to_candidate()
                        .ok_or_else(|| ResolveError::UnmappedForeignPackage {
                            package: package.clone(),
                            project: request.project.clone(),
                            cross_arch: target.arch.clone(),
                            profile: profile.to_string(),
                        })?;
                    foreign.insert(package.clone(), target.rename(&candidate));
                }
            }
        }
        native.push(ProjectPackages::new(request.project.as_str(), kept));
    }

    tracing::debug!(
        cross_arch = %target.arch,
        foreign = foreign.len(),
        "split cross build request"
    );
    Ok(CrossSplit { native, foreign })
}

// ============================================================================
// Tests
// ============================================================================
