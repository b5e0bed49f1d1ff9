//! Error handling module for guestmap
//!
//! Provides the error type for the resolution engine using thiserror.
//! Every error is detected before a final package list is produced, so a
//! failed run never yields a partial package set.

use thiserror::Error;

/// Main error type for package resolution
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    /// A logical package has no matching key in the native table for the profile
    #[error("No mapping defined for '{package}' (project: {project}, host: {profile})")]
    UnmappedRequiredPackage {
        package: String,
        project: String,
        profile: String,
    },

    /// A mapping table value is neither a string, null, nor a list of strings
    #[error("Malformed value for '{package}' key '{key}' in {table} mappings: {found}")]
    MalformedCandidate {
        table: String,
        package: String,
        key: String,
        found: String,
    },

    /// A package from a secondary manager's bootstrap project resolved to nothing
    #[error("No package for '{package}' required by the {manager} manager (host: {profile})")]
    MissingBootstrapPackage {
        package: String,
        manager: String,
        profile: String,
    },

    /// A package built for the foreign architecture has no cross mapping
    #[error("No {cross_arch} mapping defined for '{package}' (project: {project}, host: {profile})")]
    UnmappedForeignPackage {
        package: String,
        project: String,
        cross_arch: String,
        profile: String,
    },

    /// A `cross-policy-*` value is not one of `native`, `foreign`, `skip`
    #[error("Unexpected cross arch policy {found} for '{package}'")]
    InvalidCrossPolicy { package: String, found: String },

    /// The host can't build for the requested foreign architecture
    #[error("Cannot cross compile for {cross_arch} on {profile}: {reason}")]
    UnsupportedCrossTarget {
        cross_arch: String,
        profile: String,
        reason: String,
    },

    /// A project name or pattern did not match any known project

    #[error("Unknown project '{name}'")]
    UnknownProject { name: String },

    /// Catch-all for invalid configuration (manager descriptors, empty names, ...)
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type alias for resolution operations
pub type Result<T> = std::result::Result<T, ResolveError>;

impl ResolveError {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Returns true for errors raised while resolving against a host profile,
    /// as opposed to errors in the loaded data itself.
    pub fn is_resolution_error(&self) -> bool {
        matches!(
            self,
            Self::UnmappedRequiredPackage { .. }
                | Self::UnmappedForeignPackage { .. }
                | Self::MissingBootstrapPackage { .. }
        )
    }
}
