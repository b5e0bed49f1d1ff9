//! guestmap - Main entry point
//!
//! Thin front-end over the library: loads configuration, facts, projects and
//! mapping tables, runs the pipeline and prints the result.

use anyhow::{Context, Result};
use std::path::Path;
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

use guestmap::cli::{Cli, Commands, HostArgs};
use guestmap::config_file::{self, LoadedMappings, ToolConfig};
use guestmap::formatters::format_variables;
use guestmap::projects::{ProjectCatalog, UNWANTED_PROJECT};
use guestmap::types::{native_arch, HostFacts};
use guestmap::logic::cross::CrossTarget;
use guestmap::{Pipeline, ProvisionPlan, ResolveError};

/// Initialize tracing; logs go to stderr so stdout stays machine-readable
fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn load_config(path: Option<&Path>) -> Result<ToolConfig> {
    let config = match path {
        Some(path) => {
            info!("Loading configuration from: {:?}", path);
            ToolConfig::load_from_file(path)?
        }
        None => {
            debug!("No configuration file given, using defaults");
            ToolConfig::default()
        }
    };
    config.validate().context("Invalid configuration")?;
    Ok(config)
}

/// Everything needed to run the pipeline for one host
struct Session {
    catalog: ProjectCatalog,
    mappings: LoadedMappings,
    facts: HostFacts,
    arch: String,
    cross_arch: Option<String>,
}

impl Session {
    fn load(config: &ToolConfig, host: &HostArgs) -> Result<Self> {
        let catalog = config_file::load_projects(&config.projects_dir)?;
        let mappings = config_file::load_mappings(config, &catalog)?;
        let facts = config_file::load_facts(&host.facts)?;
        let arch = host
            .arch
            .clone()
            .or_else(|| config.arch.clone())
            .unwrap_or_else(|| native_arch().to_string());

        Ok(Self {
            catalog,
            mappings,
            facts,
            arch,
            cross_arch: host.cross_arch.clone(),
        })
    }

    fn provision(&self, pattern: &str) -> Result<ProvisionPlan> {
        let selected = self.catalog.expand_pattern(pattern)?;
        info!("Selected projects: {}", selected.join(", "));

        let install = self.catalog.request(&selected)?;
        let remove = if self.catalog.contains(UNWANTED_PROJECT) {
            Some(self.catalog.packages(UNWANTED_PROJECT)?)
        } else {
            None
        };

        let profile = self.facts.profile(&self.arch);
        let cross = self
            .cross_arch
            .as_deref()
            .map(|arch| CrossTarget::new(arch, &profile))
            .transpose()?;

        let mut pipeline = Pipeline::new(&self.mappings.native, &self.mappings.secondaries);
        if let Some(target) = &cross {
            info!("Cross building for {} ({})", target.arch, target.abi);
            pipeline = pipeline.with_cross(target);
        }
        let plan = pipeline
            .run(&install, remove.as_ref(), &profile)
            .with_context(|| format!("Failed to resolve packages for {}", profile))?;
        Ok(plan)
    }
}

fn print_plan(plan: &ProvisionPlan, session: &Session) {
    for manager_plan in &plan.plans {
        if manager_plan.is_empty() {
            continue;
        }
        let command = session
            .mappings
            .secondaries
            .iter()
            .find(|m| m.name == manager_plan.manager_name)
            .map(|m| manager_plan.command_line(&m.install_command));

        println!(
            "{} ({}): {}",
            manager_plan.manager_name,
            manager_plan.action,
            manager_plan.packages.join(" ")
        );
        if let Some(command) = command {
            println!("  $ {}", command);
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Projects => {
            let catalog = config_file::load_projects(&config.projects_dir)?;
            for project in catalog.public_names() {
                println!("{}", project);
            }
        }
        Commands::Resolve { host, json } => {
            let session = Session::load(&config, &host)?;
            let plan = session.provision(&host.projects)?;
            if json {
                let out =
                    serde_json::to_string_pretty(&plan).context("Failed to serialize plan")?;
                println!("{}", out);
            } else {
                print_plan(&plan, &session);
            }
        }
        Commands::Variables { host } => {
            let session = Session::load(&config, &host)?;
            let plan = session.provision(&host.projects)?;
            for line in format_variables(&session.facts, &plan) {
                println!("{}", line);
            }
        }
        Commands::Validate { host } => {
            let session = Session::load(&config, &host)?;
            let plan = session.provision(&host.projects)?;
            println!(
                "✓ {} logical packages resolve on {}",
                plan.mapped_names.len(),
                plan.profile
            );
        }
    }

    Ok(())
}

/// Whether the failure comes from the mapping data not covering the host
fn is_resolution_failure(err: &anyhow::Error) -> bool {
    err.chain()
        .filter_map(|cause| cause.downcast_ref::<ResolveError>())
        .any(ResolveError::is_resolution_error)
}

fn main() {
    let cli = Cli::parse_args();
    init_tracing(cli.verbose);
    debug!("CLI arguments parsed");

    if let Err(e) = run(cli) {
        error!("{:#}", e);
        eprintln!("✗ {:#}", e);
        if is_resolution_failure(&e) {
            eprintln!("  Add a mapping for this host to the mappings file");
        }
        std::process::exit(1);
    }
}
