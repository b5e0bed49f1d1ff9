//! Configuration file handling and data loading.
//!
//! `ToolConfig` describes where the mapping file and project lists live and
//! which package managers exist. Everything here touches the filesystem and
//! reports failures through `anyhow` with the offending path attached; the
//! resolution engine itself never does I/O.
//!
//! Data files may be YAML (`.yml`, `.yaml`) or JSON (`.json`).

use anyhow::{bail, Context, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

use crate::engine::pipeline::SecondaryManager;
use crate::logic::cross::CROSS_MANAGER;
use crate::logic::resolver::NATIVE_MANAGER;
use crate::mapping::MappingTable;
use crate::projects::ProjectCatalog;
use crate::types::HostFacts;

/// Placeholder every install command must contain
pub const PACKAGES_PLACEHOLDER: &str = "{packages}";

/// Descriptor of a secondary package manager
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManagerConfig {
    /// Manager name, used in plans and variable names
    pub name: String,
    /// Section of the mappings file holding this manager's table
    pub section: String,
    /// Install command template containing `{packages}`
    pub install_command: String,
    /// Project whose packages the native manager installs to bootstrap this one
    #[serde(default)]
    pub bootstrap_project: Option<String>,
}

/// Tool configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolConfig {
    #[serde(default = "default_mappings_file")]
    pub mappings_file: PathBuf,
    #[serde(default = "default_projects_dir")]
    pub projects_dir: PathBuf,
    /// Section of the mappings file holding the native table
    #[serde(default = "default_native_section")]
    pub native_section: String,
    #[serde(default = "default_secondary")]
    pub secondary: Vec<ManagerConfig>,
    /// Guest architecture; defaults to the architecture guestmap runs on
    #[serde(default)]
    pub arch: Option<String>,
}

fn default_mappings_file() -> PathBuf {
    PathBuf::from("mappings.yml")
}

fn default_projects_dir() -> PathBuf {
    PathBuf::from("projects")
}

fn default_native_section() -> String {
    String::from("mappings")
}

fn default_secondary() -> Vec<ManagerConfig> {
    vec![
        ManagerConfig {
            name: "pypi".to_string(),
            section: "pypi_mappings".to_string(),
            install_command: "pip3 install {packages}".to_string(),
            bootstrap_project: Some("python-pip".to_string()),
        },
        ManagerConfig {
            name: "cpan".to_string(),
            section: "cpan_mappings".to_string(),
            install_command: "cpanm --notest {packages}".to_string(),
            bootstrap_project: Some("perl-cpan".to_string()),
        },
    ]
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            mappings_file: default_mappings_file(),
            projects_dir: default_projects_dir(),
            native_section: default_native_section(),
            secondary: default_secondary(),
            arch: None,
        }
    }
}

impl ToolConfig {
    /// Load configuration from a JSON file.
    ///
    /// Relative data paths are taken relative to the configuration file.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read configuration from {:?}", path))?;

        let mut config: Self =
            serde_json::from_str(&content).context("Failed to parse configuration JSON")?;

        if let Some(base) = path.parent() {
            config.rebase(base);
        }
        Ok(config)
    }

    /// Save configuration to a JSON file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json = serde_json::to_string_pretty(self)
            .context("Failed to serialize configuration to JSON")?;

        fs::write(&path, json)
            .with_context(|| format!("Failed to write configuration to {:?}", path.as_ref()))?;

        Ok(())
    }

    fn rebase(&mut self, base: &Path) {
        if self.mappings_file.is_relative() {
            self.mappings_file = base.join(&self.mappings_file);
        }
        if self.projects_dir.is_relative() {
            self.projects_dir = base.join(&self.projects_dir);
        }
    }

    /// Validate the manager descriptors
    pub fn validate(&self) -> Result<()> {
        if self.native_section.trim().is_empty() {
            bail!("Native mappings section must be specified");
        }

        let mut names = BTreeSet::new();
        for manager in &self.secondary {
            if manager.name.trim().is_empty() {
                bail!("Secondary manager name must be specified");
            }
            if manager.name == NATIVE_MANAGER || manager.name == CROSS_MANAGER {
                bail!("Secondary manager cannot be named '{}'", manager.name);
            }
            if !names.insert(manager.name.as_str()) {
                bail!("Secondary manager '{}' is declared twice", manager.name);
            }
            if manager.section == self.native_section {
                bail!(
                    "Secondary manager '{}' cannot use the native section '{}'",
                    manager.name,
                    manager.section
                );
            }
            if !manager.install_command.contains(PACKAGES_PLACEHOLDER) {
                bail!(
                    "Install command for '{}' must contain {}",
                    manager.name,
                    PACKAGES_PLACEHOLDER
                );
            }
        }

        Ok(())
    }
}

// ============================================================================
// Data files
// ============================================================================

fn is_yaml(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yml") | Some("yaml")
    )
}

fn is_data_file(path: &Path) -> bool {
    is_yaml(path) || path.extension().and_then(|e| e.to_str()) == Some("json")
}

/// Read a YAML or JSON file, picking the parser from the extension
pub fn read_data_file<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {:?}", path))?;

    if is_yaml(path) {
        serde_yaml::from_str(&content).with_context(|| format!("Failed to parse YAML {:?}", path))
    } else {
        serde_json::from_str(&content).with_context(|| format!("Failed to parse JSON {:?}", path))
    }
}

/// Load inventory facts for one host
pub fn load_facts(path: &Path) -> Result<HostFacts> {
    read_data_file(path).context("Failed to load host facts")
}

#[derive(Debug, Deserialize)]
struct ProjectFile {
    packages: Vec<String>,
}

/// Sorted data files among directory entries; a failed entry is an error
fn data_files<I>(dir: &Path, entries: I) -> Result<Vec<PathBuf>>
where
    I: IntoIterator<Item = std::io::Result<PathBuf>>,
{
    let mut paths = Vec::new();
    for entry in entries {
        let path = entry.with_context(|| format!("Failed to read an entry of {:?}", dir))?;
        if path.is_file() && is_data_file(&path) {
            paths.push(path);
        }
    }
    paths.sort();
    Ok(paths)
}

/// Load every project file (`<project>.yml|.yaml|.json`) in a directory
pub fn load_projects(dir: &Path) -> Result<ProjectCatalog> {
    let entries = fs::read_dir(dir)
        .with_context(|| format!("Failed to read project directory {:?}", dir))?;
    let paths = data_files(dir, entries.map(|entry| entry.map(|e| e.path())))?;

    let mut catalog = ProjectCatalog::new();
    for path in paths {
        let Some(project) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        if catalog.contains(project) {
            bail!("Project '{}' is defined by more than one file", project);
        }

        tracing::debug!(%project, "loading project");
        let file: ProjectFile = read_data_file(&path)
            .with_context(|| format!("Can't load packages for '{}'", project))?;
        catalog.insert(project, file.packages);
    }

    Ok(catalog)
}

/// Tables ready for the pipeline
#[derive(Debug, Clone)]
pub struct LoadedMappings {
    pub native: MappingTable,
    pub secondaries: Vec<SecondaryManager>,
}

type RawSection = BTreeMap<String, Value>;

/// Load the native and secondary tables named by `config`.
///
/// Only the sections `config` names are read; other top-level keys are left
/// alone. Malformed values anywhere in a used section are reported here,
/// before anything is resolved. Bootstrap projects must exist in `catalog`
/// and their packages must be in the native table.
pub fn load_mappings(config: &ToolConfig, catalog: &ProjectCatalog) -> Result<LoadedMappings> {
    let mut sections: BTreeMap<String, Value> =
        read_data_file(&config.mappings_file).context("Can't load mappings")?;

    let mut take_section = |name: &str| -> Result<RawSection> {
        match sections.remove(name) {
            None => bail!("Mappings file has no '{}' section", name),
            Some(Value::Null) => Ok(RawSection::new()),
            Some(section) => serde_json::from_value(section)
                .with_context(|| format!("Mappings section '{}' is not a map of packages", name)),
        }
    };

    let native = MappingTable::from_raw(NATIVE_MANAGER, &take_section(&config.native_section)?)?;

    let mut secondaries = Vec::with_capacity(config.secondary.len());
    for manager in &config.secondary {
        let table = MappingTable::from_raw(manager.name.as_str(), &take_section(&manager.section)?)?;

        let bootstrap = match &manager.bootstrap_project {
            Some(project) => catalog
                .packages(project)
                .with_context(|| format!("Bootstrap project for '{}'", manager.name))?
                .packages,
            None => Vec::new(),
        };
        if let Some(package) = bootstrap.iter().find(|p| !native.contains(p)) {
            bail!(
                "Bootstrap package '{}' for '{}' has no native mapping",
                package,
                manager.name
            );
        }

        secondaries.push(
            SecondaryManager::new(manager.name.as_str(), manager.install_command.as_str(), table)
                .with_bootstrap(bootstrap),
        );
    }

    tracing::info!(
        native = native.len(),
        secondary = secondaries.len(),
        "loaded mapping tables"
    );
    Ok(LoadedMappings {
        native,
        secondaries,
    })
}
