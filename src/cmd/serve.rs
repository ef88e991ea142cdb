//! Server and database commands: `taskboard serve` and `taskboard init-db`.

use std::path::{Path, PathBuf};

use anyhow::Result;
use taskboard::board::server::{open_database, start_server};
use taskboard::config::{CliOverrides, TaskboardConfig};

pub async fn cmd_serve(
    config_path: Option<&Path>,
    port: Option<u16>,
    db_path: Option<PathBuf>,
    dev: bool,
) -> Result<()> {
    let config = TaskboardConfig::resolve(
        config_path,
        &CliOverrides {
            port,
            db_path,
            dev_mode: dev,
        },
    )?;
    start_server(config).await
}

pub fn cmd_init_db(config_path: Option<&Path>, db_path: Option<PathBuf>) -> Result<()> {
    let config = TaskboardConfig::resolve(
        config_path,
        &CliOverrides {
            db_path,
            ..CliOverrides::default()
        },
    )?;
    open_database(&config.server.db_path)?;
    println!(
        "Taskboard database initialized at {}",
        config.server.db_path.display()
    );
    Ok(())
}
