//! Configuration view and validation commands (`taskboard config`).

use std::path::Path;

use anyhow::{Context, Result};
use taskboard::config::{CONFIG_FILE_NAME, CliOverrides, TaskboardConfig};

use super::super::ConfigCommands;

pub fn cmd_config(config_path: Option<&Path>, command: Option<ConfigCommands>) -> Result<()> {
    match command {
        None | Some(ConfigCommands::Show) => {
            let config = TaskboardConfig::resolve(config_path, &CliOverrides::default())?;
            println!("# Effective configuration (secrets masked)");
            print!("{}", config.to_redacted_toml()?);
        }
        Some(ConfigCommands::Validate) => {
            let config = TaskboardConfig::resolve(config_path, &CliOverrides::default())?;
            let warnings = config.validate();
            if warnings.is_empty() {
                println!("Configuration is valid.");
            } else {
                println!("Configuration warnings:");
                for warning in &warnings {
                    println!("  - {}", warning);
                }
            }
        }
        Some(ConfigCommands::Init) => {
            let path = config_path.unwrap_or_else(|| Path::new(CONFIG_FILE_NAME));
            if path.exists() {
                println!("Config already exists at {}", path.display());
                return Ok(());
            }
            let content = toml::to_string_pretty(&TaskboardConfig::default())
                .context("Failed to serialize default config")?;
            std::fs::write(path, content)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            println!("Created {}", path.display());
        }
    }
    Ok(())
}
