// src/main.rs — velle entry point

use clap::Parser;

use velle::cli::{Cli, Commands};
use velle::infra::config::Config;
use velle::infra::logger;

#[tokio::main]
async fn main() {
    // stderr only; stdout is the MCP transport (respects RUST_LOG / VELLE_LOG)
    logger::init_logging("warn");

    if let Err(e) = run().await {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Falls back to defaults if there is no velle.toml
    let config = if let Some(ref path) = cli.config {
        Config::load_from(std::path::Path::new(path))?
    } else {
        Config::load()?
    };

    match cli.command.unwrap_or_default() {
        Commands::Serve { sidecar, dry_run } => {
            velle::cli::serve::run_serve(config, sidecar, dry_run).await
        }
        Commands::Config => velle::cli::config::show_config(&config, cli.config.as_deref()),
        Commands::Audit { limit, json } => velle::cli::audit::show_audit(&config, limit, json),
    }
}
