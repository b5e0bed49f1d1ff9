//! Engine modules: strings the resolution logic together into a run.
//!
//! The engine layer sits between loaded data (tables, projects, host profile)
//! and the installer dispatcher. It produces one package plan per manager.

pub mod pipeline;
