//! Integration tests for the taskboard CLI
//!
//! These run the compiled binary in a scratch directory.

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

/// Helper to create a taskboard Command isolated from the caller's env
fn taskboard(dir: &TempDir) -> Command {
    let mut cmd = cargo_bin_cmd!("taskboard");
    cmd.current_dir(dir.path());
    for key in [
        "TASKBOARD_CONFIG",
        "TASKBOARD_HOST",
        "TASKBOARD_PORT",
        "TASKBOARD_DB_PATH",
        "TASKBOARD_STATIC_DIR",
        "TASKBOARD_ACCESS_TOKEN_SECRET",
        "TASKBOARD_REFRESH_TOKEN_SECRET",
        "TASKBOARD_ACCESS_TOKEN_TTL_SECS",
        "TASKBOARD_REFRESH_TOKEN_TTL_SECS",
        "TASKBOARD_COOKIE_SECURE",
    ] {
        cmd.env_remove(key);
    }
    cmd
}

// =============================================================================
// Basic CLI Tests
// =============================================================================

mod cli_basics {
    use super::*;

    #[test]
    fn test_help() {
        let dir = TempDir::new().unwrap();
        taskboard(&dir)
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("serve"))
            .stdout(predicate::str::contains("init-db"));
    }

    #[test]
    fn test_version() {
        let dir = TempDir::new().unwrap();
        taskboard(&dir).arg("--version").assert().success();
    }

    #[test]
    fn test_unknown_subcommand_fails() {
        let dir = TempDir::new().unwrap();
        taskboard(&dir).arg("frobnicate").assert().failure();
    }
}

// =============================================================================
// Database Tests
// =============================================================================

mod init_db {
    use super::*;

    #[test]
    fn test_init_db_creates_database() {
        let dir = TempDir::new().unwrap();
        taskboard(&dir)
            .args(["init-db", "--db-path", "data/board.db"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Taskboard database initialized"));

        assert!(dir.path().join("data/board.db").exists());
    }

    #[test]
    fn test_init_db_is_idempotent() {
        let dir = TempDir::new().unwrap();
        for _ in 0..2 {
            taskboard(&dir)
                .args(["init-db", "--db-path", "board.db"])
                .assert()
                .success();
        }
    }

    #[test]
    fn test_init_db_uses_configured_path() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("taskboard.toml"),
            "[server]\ndb_path = \"from-config.db\"\n",
        )
        .unwrap();
        taskboard(&dir).arg("init-db").assert().success();
        assert!(dir.path().join("from-config.db").exists());
    }
}

// =============================================================================
// Config Tests
// =============================================================================

mod config {
    use super::*;

    #[test]
    fn test_config_show_defaults() {
        let dir = TempDir::new().unwrap();
        taskboard(&dir)
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("port = 3141"))
            .stdout(predicate::str::contains("cookie_name = \"jwt\""));
    }

    #[test]
    fn test_config_show_masks_secrets() {
        let dir = TempDir::new().unwrap();
        taskboard(&dir)
            .args(["config", "show"])
            .env("TASKBOARD_ACCESS_TOKEN_SECRET", "super-secret-value")
            .assert()
            .success()
            .stdout(predicate::str::contains("********"))
            .stdout(predicate::str::contains("super-secret-value").not());
    }

    #[test]
    fn test_config_show_layers_env_over_file() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("taskboard.toml"), "[server]\nport = 8000\n").unwrap();
        taskboard(&dir)
            .args(["config", "show"])
            .env("TASKBOARD_PORT", "9000")
            .assert()
            .success()
            .stdout(predicate::str::contains("port = 9000"));
    }

    #[test]
    fn test_config_explicit_path() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("custom.toml"), "[server]\nport = 7777\n").unwrap();
        taskboard(&dir)
            .args(["--config", "custom.toml", "config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("port = 7777"));
    }

    #[test]
    fn test_config_validate_warns_on_shared_secret() {
        let dir = TempDir::new().unwrap();
        taskboard(&dir)
            .args(["config", "validate"])
            .env("TASKBOARD_ACCESS_TOKEN_SECRET", "same")
            .env("TASKBOARD_REFRESH_TOKEN_SECRET", "same")
            .assert()
            .success()
            .stdout(predicate::str::contains("should differ"));
    }

    #[test]
    fn test_config_init_writes_file_once() {
        let dir = TempDir::new().unwrap();
        taskboard(&dir)
            .args(["config", "init"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Created"));
        let content = fs::read_to_string(dir.path().join("taskboard.toml")).unwrap();
        assert!(content.contains("[server]"));
        assert!(content.contains("[auth]"));

        taskboard(&dir)
            .args(["config", "init"])
            .assert()
            .success()
            .stdout(predicate::str::contains("already exists"));
    }

    #[test]
    fn test_invalid_config_file_fails() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("taskboard.toml"), "[server\nport = ").unwrap();
        taskboard(&dir).args(["config", "show"]).assert().failure();
    }
}

// =============================================================================
// Server Tests
// =============================================================================

mod serve {
    use super::*;

    #[test]
    fn test_serve_without_secrets_fails_outside_dev_mode() {
        let dir = TempDir::new().unwrap();
        taskboard(&dir)
            .args(["serve", "--port", "0", "--db-path", "board.db"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("access_token_secret"));
    }
}
