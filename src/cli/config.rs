// src/cli/config.rs — `velle config`: print the effective configuration

use crate::infra::config::Config;
use crate::infra::paths;
use crate::registry::CommandRegistry;

pub fn show_config(config: &Config, source: Option<&str>) -> anyhow::Result<()> {
    let source = match source {
        Some(path) => path.to_string(),
        None => {
            let path = paths::config_file_path();
            if path.exists() {
                path.display().to_string()
            } else {
                "(defaults)".to_string()
            }
        }
    };
    let registry = CommandRegistry::from_config(&config.commands);

    println!("# source: {source}");
    println!("# audit file: {}", config.audit.resolved_local_path().display());
    println!(
        "# commands: {} known, {} allowed",
        registry.len(),
        registry.allowed_names().len()
    );
    println!();
    print!("{}", toml::to_string_pretty(config)?);
    Ok(())
}
