//! Project catalog
//!
//! Each project is an ordered list of logical package names. A handful of
//! projects are implementation details (`base` is added to every request,
//! `unwanted` lists packages to remove, `python-pip`/`perl-cpan` bootstrap
//! secondary managers) and are never returned by pattern expansion.

use std::collections::{BTreeMap, BTreeSet};

use crate::error::{ResolveError, Result};

/// Project whose packages are part of every request
pub const BASE_PROJECT: &str = "base";

/// Project listing packages that must be removed from guests
pub const UNWANTED_PROJECT: &str = "unwanted";

/// Projects hidden from users
pub const INTERNAL_PROJECTS: &[&str] = &[
    BASE_PROJECT,
    "cloud-init",
    "developer",
    "perl-cpan",
    "python-pip",
    UNWANTED_PROJECT,
    "vm",
];

/// Logical package names requested on behalf of one project
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectPackages {
    pub project: String,
    pub packages: Vec<String>,
}

impl ProjectPackages {
    pub fn new<I, S>(project: impl Into<String>, packages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            project: project.into(),
            packages: packages.into_iter().map(Into::into).collect(),
        }
    }
}

/// All known projects and their package lists
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectCatalog {
    projects: BTreeMap<String, Vec<String>>,
}

impl ProjectCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a project. Duplicate package names are kept but logged: the
    /// engine only deduplicates concrete names, not logical ones.
    pub fn insert(&mut self, project: impl Into<String>, packages: Vec<String>) {
        let project = project.into();

        let mut seen = BTreeSet::new();
        for package in &packages {
            if !seen.insert(package.as_str()) {
                tracing::warn!(%project, %package, "package listed more than once");
            }
        }

        self.projects.insert(project, packages);
    }

    pub fn contains(&self, project: &str) -> bool {
        self.projects.contains_key(project)
    }

    /// Package list of a project
    pub fn packages(&self, project: &str) -> Result<ProjectPackages> {
        self.projects
            .get(project)
            .map(|packages| ProjectPackages::new(project, packages.iter().cloned()))
            .ok_or_else(|| ResolveError::UnknownProject {
                name: project.to_string(),
            })
    }

    /// Every project name, internal ones included, sorted
    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.projects.keys().map(String::as_str)
    }

    /// Project names users may select, sorted
    pub fn public_names(&self) -> Vec<&str> {
        self.names()
            .filter(|name| !INTERNAL_PROJECTS.contains(name))
            .collect()
    }

    /// Expand a user pattern into a sorted list of public project names.
    ///
    /// The pattern is a comma-separated list of tokens; each token is `all`,
    /// a project name, or a glob (`*`, `?`, `[...]`). Every token must match
    /// at least one project. Internal projects are dropped from the result
    /// even when named explicitly.
    pub fn expand_pattern(&self, pattern: &str) -> Result<Vec<String>> {
        let mut expanded = BTreeSet::new();

        for token in pattern.split(',').map(str::trim).filter(|t| !t.is_empty()) {
            if token == "all" {
                expanded.extend(self.names());
                continue;
            }

            let glob = glob::Pattern::new(token).map_err(|e| {
                ResolveError::config(format!("invalid project pattern '{token}': {e}"))
            })?;
            let before = expanded.len();
            let mut matched = false;
            for name in self.names().filter(|name| glob.matches(name)) {
                expanded.insert(name);
                matched = true;
            }
            if !matched {
                return Err(ResolveError::UnknownProject {
                    name: token.to_string(),
                });
            }
            tracing::trace!(token, added = expanded.len() - before, "expanded project token");
        }

        Ok(expanded
            .into_iter()
            .filter(|name| !INTERNAL_PROJECTS.contains(name))
            .map(str::to_string)
            .collect())
    }

    /// Build the package request for the selected projects.
    ///
    /// The `base` project (when the catalog has one) is appended after the
    /// selected projects unless already selected.
    pub fn request(&self, selected: &[String]) -> Result<Vec<ProjectPackages>> {
        let mut requests = selected
            .iter()
            .map(|project| self.packages(project))
            .collect::<Result<Vec<_>>>()?;

        if self.contains(BASE_PROJECT) && !selected.iter().any(|p| p == BASE_PROJECT) {
            requests.push(self.packages(BASE_PROJECT)?);
        }

        Ok(requests)
    }
}
