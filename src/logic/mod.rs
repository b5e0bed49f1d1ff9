//! Logic modules: the package-identifier resolution engine.
//!
//! # Modules
//!
//! - `specificity`: picks the best candidate for one package on one profile
//! - `resolver`: resolves a whole request per package manager
//! - `suppress`: drops secondary entries the native manager already supplies
//! - `finalize`: flattens, deduplicates and sorts concrete package names
//! - `cross`: cross-architecture policies and foreign package resolution

pub mod cross;
pub mod finalize;
pub mod resolver;
pub mod specificity;
pub mod suppress;
