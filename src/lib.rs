//! guestmap library
//!
//! Resolves a project's logical package names into the concrete packages to
//! install on a CI guest, for the native package manager and any number of
//! secondary (language ecosystem) managers.

pub mod cli;
pub mod config_file;
pub mod engine;
pub mod error;
pub mod formatters;
pub mod logic;
pub mod mapping;
pub mod projects;
pub mod types;

// Re-export main types for convenience
pub use config_file::{LoadedMappings, ManagerConfig, ToolConfig};
pub use error::ResolveError;
pub use mapping::{CandidateValue, MappingTable};
pub use projects::{ProjectCatalog, ProjectPackages};
pub use types::{HostFacts, PackageAction, TargetProfile};

// Resolution engine
pub use engine::pipeline::{ManagerPlan, Pipeline, ProvisionPlan, SecondaryManager};
pub use logic::cross::{CrossPolicy, CrossTarget, CROSS_MANAGER};
pub use logic::finalize::finalize;
pub use logic::resolver::{build, ResolutionSet, ResolvedMapping, NATIVE_MANAGER};
pub use logic::specificity::{resolve, Resolution, SpecificityKey};
pub use logic::suppress::suppress;
