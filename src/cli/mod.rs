// src/cli/mod.rs — CLI definition (clap derive)

pub mod audit;
pub mod config;
pub mod serve;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "velle",
    about = "Guarded self-prompting for agent sessions (MCP tool server)",
    version
)]
pub struct Cli {
    /// Config file path
    #[arg(long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum Commands {
    /// Run the MCP tool server on stdio (default)
    Serve {
        /// Also start the localhost HTTP sidecar
        #[arg(long)]
        sidecar: bool,
        /// Log deliveries instead of typing them into the terminal
        #[arg(long)]
        dry_run: bool,
    },
    /// Print the effective configuration as TOML
    Config,
    /// Show recent records from the local audit log
    Audit {
        /// Number of records to show
        #[arg(short, long, default_value = "20")]
        limit: usize,
        /// Print raw JSON lines
        #[arg(long)]
        json: bool,
    },
}

impl Default for Commands {
    fn default() -> Self {
        Commands::Serve {
            sidecar: false,
            dry_run: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_subcommand_defaults_to_serve() {
        let cli = Cli::parse_from(["velle"]);
        assert_eq!(cli.command.unwrap_or_default(), Commands::default());
    }

    #[test]
    fn test_serve_flags() {
        let cli = Cli::parse_from(["velle", "serve", "--sidecar", "--dry-run"]);
        assert_eq!(
            cli.command,
            Some(Commands::Serve {
                sidecar: true,
                dry_run: true
            })
        );
    }

    #[test]
    fn test_global_config_flag() {
        let cli = Cli::parse_from(["velle", "audit", "--config", "/tmp/v.toml", "-l", "5"]);
        assert_eq!(cli.config.as_deref(), Some("/tmp/v.toml"));
        assert_eq!(
            cli.command,
            Some(Commands::Audit {
                limit: 5,
                json: false
            })
        );
    }
}
