//! Host identity types for guestmap
//!
//! A `TargetProfile` is the immutable identity of one guest (OS, version,
//! architecture, native package format). It is what mapping keys are matched
//! against. `HostFacts` is the richer inventory record a profile is derived from.

use serde::{Deserialize, Serialize};
use std::fmt;
use strum::{Display, EnumString};

/// What the installer dispatcher should do with a package list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[derive(Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum PackageAction {
    #[default]
    Install,
    Remove,
}

/// Identity of a target host as seen by the mapping tables.
///
/// All four fields are used verbatim when building specificity keys, so
/// `os_name` keeps the casing the host reports (`"Fedora"`, `"Debian"`, ...).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TargetProfile {
    pub os_name: String,
    pub os_version: String,
    pub arch: String,
    pub pkg_format: String,
}

impl TargetProfile {
    pub fn new(
        os_name: impl Into<String>,
        os_version: impl Into<String>,
        arch: impl Into<String>,
        pkg_format: impl Into<String>,
    ) -> Self {
        Self {
            os_name: os_name.into(),
            os_version: os_version.into(),
            arch: arch.into(),
            pkg_format: pkg_format.into(),
        }
    }

    /// `os_name` and `os_version` concatenated without separator (`"Fedora33"`)
    pub fn os_release(&self) -> String {
        format!("{}{}", self.os_name, self.os_version)
    }
}

impl fmt::Display for TargetProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} ({})",
            self.arch, self.os_name, self.os_version, self.pkg_format
        )
    }
}

/// Architecture of the machine guestmap runs on, in mapping-key spelling
pub fn native_arch() -> &'static str {
    std::env::consts::ARCH
}

// ============================================================================
// Inventory facts
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OsFacts {
    pub name: String,
    pub version: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackagingFacts {
    /// Native package format (`rpm`, `deb`, `apk`, `pkg`, ...)
    pub format: String,
    /// Native package manager command (`dnf`, `apt-get`, ...)
    pub command: String,
}

/// Tool locations on the guest, exported through the variables formatter
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathFacts {
    #[serde(default)]
    pub ccache: Option<String>,
    #[serde(default)]
    pub make: Option<String>,
    #[serde(default)]
    pub ninja: Option<String>,
    #[serde(default)]
    pub python: Option<String>,
    #[serde(default)]
    pub pip3: Option<String>,
}

/// Inventory facts for one host
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostFacts {
    pub os: OsFacts,
    pub packaging: PackagingFacts,
    #[serde(default)]
    pub paths: PathFacts,
}

impl HostFacts {
    /// Build the target profile for this host on the given architecture
    pub fn profile(&self, arch: &str) -> TargetProfile {
        TargetProfile::new(
            self.os.name.clone(),
            self.os.version.clone(),
            arch,
            self.packaging.format.clone(),
        )
    }
}
