use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// guestmap - resolve project dependencies into per-host package lists
#[derive(Parser)]
#[command(name = "guestmap")]
#[command(about = "Resolve logical package names into concrete packages for CI guests")]
#[command(version)]
pub struct Cli {
    /// Enable debug logging (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to configuration file (JSON)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Host and project selection shared by the resolving commands
#[derive(Args, Debug, Clone)]
pub struct HostArgs {
    /// Host facts file (YAML or JSON)
    #[arg(short, long)]
    pub facts: PathBuf,

    /// Projects to resolve: `all`, names, or globs, comma separated
    #[arg(short, long)]
    pub projects: String,

    /// Guest architecture (defaults to the config value, then the native one)
    #[arg(short, long)]
    pub arch: Option<String>,

    /// Foreign architecture to cross build for (Debian and Fedora hosts only)
    #[arg(short = 'x', long)]
    pub cross_arch: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List projects available for selection
    Projects,
    /// Print the resolved package lists
    Resolve {
        #[command(flatten)]
        host: HostArgs,

        /// Print the plan as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print the resolved package lists as KEY='VALUE' variables
    Variables {
        #[command(flatten)]
        host: HostArgs,
    },
    /// Check mappings and projects for a host without printing plans
    Validate {
        #[command(flatten)]
        host: HostArgs,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_resolve() {
        let cli = Cli::parse_from([
            "guestmap", "--verbose", "resolve", "--facts", "fedora-33.yml", "--projects",
            "libvirt,qemu", "--json",
        ]);

        assert!(cli.verbose);
        match cli.command {
            Commands::Resolve { host, json } => {
                assert!(json);
                assert_eq!(host.projects, "libvirt,qemu");
                assert_eq!(host.facts, PathBuf::from("fedora-33.yml"));
                assert!(host.arch.is_none());
                assert!(host.cross_arch.is_none());
            }
            _ => panic!("expected resolve command"),
        }
    }

    #[test]
    fn test_parse_cross_arch() {
        let cli = Cli::parse_from([
            "guestmap", "variables", "-f", "debian-10.yml", "-p", "qemu", "--cross-arch",
            "aarch64",
        ]);

        match cli.command {
            Commands::Variables { host } => {
                assert_eq!(host.cross_arch.as_deref(), Some("aarch64"));
            }
            _ => panic!("expected variables command"),
        }
    }

    #[test]
    fn test_resolve_requires_facts() {
        assert!(Cli::try_parse_from(["guestmap", "resolve", "--projects", "all"]).is_err());
    }
}
