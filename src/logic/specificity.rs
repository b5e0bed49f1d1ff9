//! Specificity Resolver
//!
//! Selects the single best candidate value for one logical package on one
//! target profile.
//!
//! # Tiers (least to most specific)
//!
//! | Tier | Key built from profile                 | Example (x86_64 Fedora 33 rpm) |
//! |------|----------------------------------------|--------------------------------|
//! | 1    | `default`                              | `default`                      |
//! | 2    | `pkg_format`                           | `rpm`                          |
//! | 3    | `os_name`                              | `Fedora`                       |
//! | 4    | `os_name + os_version`                 | `Fedora33`                     |
//! | 5    | `arch-default`                         | `x86_64-default`               |
//! | 6    | `arch-pkg_format`                      | `x86_64-rpm`                   |
//! | 7    | `arch-os_name`                         | `x86_64-Fedora`                |
//! | 8    | `arch-os_name+os_version`              | `x86_64-Fedora33`              |
//!
//! Resolution folds over the tiers in order; every key present in the table
//! overwrites whatever a lower tier selected. A present `null` value is a real
//! selection (`FoundNull`) and overrides lower tiers like any other value.

use strum::{Display, EnumIter, IntoEnumIterator};

use crate::mapping::{CandidateValue, MappingTable};
use crate::types::TargetProfile;

/// One of the eight match patterns, in increasing specificity.
///
/// The derived `Ord` follows declaration order, so `a < b` means `b` wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display, EnumIter)]
#[strum(serialize_all = "kebab-case")]
pub enum SpecificityKey {
    Default,
    PkgFormat,
    OsName,
    OsRelease,
    ArchDefault,
    ArchPkgFormat,
    ArchOsName,
    ArchOsRelease,
}

impl SpecificityKey {
    /// Whether this tier is qualified by the CPU architecture
    pub const fn is_arch_qualified(self) -> bool {
        matches!(
            self,
            Self::ArchDefault | Self::ArchPkgFormat | Self::ArchOsName | Self::ArchOsRelease
        )
    }

    /// The mapping-table key this tier matches for `profile`
    pub fn key_for(self, profile: &TargetProfile) -> String {
        match self {
            Self::Default => "default".to_string(),
            Self::PkgFormat => profile.pkg_format.clone(),
            Self::OsName => profile.os_name.clone(),
            Self::OsRelease => profile.os_release(),
            Self::ArchDefault => format!("{}-default", profile.arch),
            Self::ArchPkgFormat => format!("{}-{}", profile.arch, profile.pkg_format),
            Self::ArchOsName => format!("{}-{}", profile.arch, profile.os_name),
            Self::ArchOsRelease => format!("{}-{}", profile.arch, profile.os_release()),
        }
    }
}

/// All table keys a profile can match, least specific first
pub fn profile_keys(profile: &TargetProfile) -> Vec<String> {
    SpecificityKey::iter().map(|tier| tier.key_for(profile)).collect()
}

/// The keys of the four tiers not qualified by architecture, least specific first
pub fn base_keys(profile: &TargetProfile) -> Vec<String> {
    SpecificityKey::iter()
        .filter(|tier| !tier.is_arch_qualified())
        .map(|tier| tier.key_for(profile))
        .collect()
}

/// Outcome of resolving one logical package against one table.
///
/// `FoundNull` ("remove here") and `NotFound` ("nothing to say") are distinct:
/// suppression and the native error path depend on telling them apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution<'t> {
    Found(&'t CandidateValue),
    FoundNull,
    NotFound,
}

impl<'t> Resolution<'t> {
    fn from_selected(selected: Option<&'t CandidateValue>) -> Self {
        match selected {
            Some(value) if value.is_remove() => Self::FoundNull,
            Some(value) => Self::Found(value),
            None => Self::NotFound,
        }
    }

    /// The selected value, with `FoundNull` mapped to `CandidateValue::Remove`
    pub fn to_candidate(self) -> Option<CandidateValue> {
        match self {
            Self::Found(value) => Some(value.clone()),
            Self::FoundNull => Some(CandidateValue::Remove),
            Self::NotFound => None,
        }
    }
}

/// Find the most specific key present for `package` and the tier it came from
pub fn select<'t>(
    package: &str,
    table: &'t MappingTable,
    profile: &TargetProfile,
) -> Option<(SpecificityKey, &'t CandidateValue)> {
    let candidates = table.get(package)?;

    SpecificityKey::iter().fold(None, |selected, tier| {
        match candidates.get(&tier.key_for(profile)) {
            Some(value) => Some((tier, value)),
            None => selected,
        }
    })
}

/// Resolve `package` against `table` for `profile`
pub fn resolve<'t>(package: &str, table: &'t MappingTable, profile: &TargetProfile) -> Resolution<'t> {
    match select(package, table, profile) {
        Some((tier, value)) => {
            tracing::trace!(
                package,
                table = table.name(),
                tier = %tier,
                "selected mapping"
            );
            Resolution::from_selected(Some(value))
        }
        None => Resolution::NotFound,
    }
}

/// Resolve `package` against an explicit key list, least specific first.
///
/// Same fold as [`resolve`], for callers that build their own tiers.
pub fn resolve_keys<'t, S: AsRef<str>>(
    package: &str,
    table: &'t MappingTable,
    keys: &[S],
) -> Resolution<'t> {
    let selected = table.get(package).and_then(|candidates| {
        keys.iter()
            .fold(None, |selected, key| candidates.get(key.as_ref()).or(selected))
    });
    Resolution::from_selected(selected)
}
