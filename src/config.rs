//! Layered configuration for the taskboard server.
//!
//! Values are resolved in order, later layers winning:
//! built-in defaults → `taskboard.toml` → `TASKBOARD_*` environment
//! variables (a `.env` file is loaded first) → CLI flags.
//!
//! # Configuration File Format
//!
//! ```toml
//! [server]
//! host = "127.0.0.1"
//! port = 3141
//! db_path = ".taskboard/taskboard.db"
//! dev_mode = false
//! static_dir = "ui/dist"
//!
//! [auth]
//! access_token_secret = "change-me"
//! refresh_token_secret = "change-me-too"
//! access_token_ttl_secs = 900
//! refresh_token_ttl_secs = 604800
//! cookie_name = "jwt"
//! cookie_secure = false
//! ```

use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Default config file name, looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = "taskboard.toml";

/// HTTP listener and storage settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSection {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,
    /// Permissive CORS, bind on all interfaces, ephemeral secrets allowed
    #[serde(default)]
    pub dev_mode: bool,
    /// Built SPA bundle served for unmatched paths
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub static_dir: Option<PathBuf>,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3141
}

fn default_db_path() -> PathBuf {
    PathBuf::from(".taskboard/taskboard.db")
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            db_path: default_db_path(),
            dev_mode: false,
            static_dir: None,
        }
    }
}

/// Token signing and refresh cookie settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthSection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token_secret: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token_secret: Option<String>,
    #[serde(default = "default_access_ttl")]
    pub access_token_ttl_secs: i64,
    #[serde(default = "default_refresh_ttl")]
    pub refresh_token_ttl_secs: i64,
    #[serde(default = "default_cookie_name")]
    pub cookie_name: String,
    #[serde(default)]
    pub cookie_secure: bool,
}

fn default_access_ttl() -> i64 {
    15 * 60
}

fn default_refresh_ttl() -> i64 {
    7 * 24 * 60 * 60
}

fn default_cookie_name() -> String {
    "jwt".to_string()
}

impl Default for AuthSection {
    fn default() -> Self {
        Self {
            access_token_secret: None,
            refresh_token_secret: None,
            access_token_ttl_secs: default_access_ttl(),
            refresh_token_ttl_secs: default_refresh_ttl(),
            cookie_name: default_cookie_name(),
            cookie_secure: false,
        }
    }
}

/// Parsed `taskboard.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskboardConfig {
    #[serde(default)]
    pub server: ServerSection,
    #[serde(default)]
    pub auth: AuthSection,
}

/// Flags given on the command line; `None` leaves the lower layers alone.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub port: Option<u16>,
    pub db_path: Option<PathBuf>,
    pub dev_mode: bool,
}

impl TaskboardConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::parse(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse taskboard.toml")
    }

    /// Load `path` if given (it must exist), otherwise `taskboard.toml` in
    /// the working directory if present, otherwise defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => {
                let default_path = Path::new(CONFIG_FILE_NAME);
                if default_path.exists() {
                    Self::load(default_path)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    /// Resolve the full stack: file, then process environment, then CLI.
    pub fn resolve(path: Option<&Path>, cli: &CliOverrides) -> Result<Self> {
        // A missing .env is normal.
        let _ = dotenvy::dotenv();
        let mut config = Self::load_or_default(path)?;
        config.apply_env(|key| std::env::var(key).ok())?;
        config.apply_cli(cli);
        Ok(config)
    }

    /// Overlay `TASKBOARD_*` variables read through `lookup`.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("TASKBOARD_HOST") {
            self.server.host = v;
        }
        if let Some(v) = lookup("TASKBOARD_PORT") {
            self.server.port = parse_env("TASKBOARD_PORT", &v)?;
        }
        if let Some(v) = lookup("TASKBOARD_DB_PATH") {
            self.server.db_path = PathBuf::from(v);
        }
        if let Some(v) = lookup("TASKBOARD_STATIC_DIR") {
            self.server.static_dir = Some(PathBuf::from(v));
        }
        if let Some(v) = lookup("TASKBOARD_ACCESS_TOKEN_SECRET") {
            self.auth.access_token_secret = Some(v);
        }
        if let Some(v) = lookup("TASKBOARD_REFRESH_TOKEN_SECRET") {
            self.auth.refresh_token_secret = Some(v);
        }
        if let Some(v) = lookup("TASKBOARD_ACCESS_TOKEN_TTL_SECS") {
            self.auth.access_token_ttl_secs = parse_env("TASKBOARD_ACCESS_TOKEN_TTL_SECS", &v)?;
        }
        if let Some(v) = lookup("TASKBOARD_REFRESH_TOKEN_TTL_SECS") {
            self.auth.refresh_token_ttl_secs = parse_env("TASKBOARD_REFRESH_TOKEN_TTL_SECS", &v)?;
        }
        if let Some(v) = lookup("TASKBOARD_COOKIE_SECURE") {
            self.auth.cookie_secure = v != "false" && v != "0";
        }
        Ok(())
    }

    pub fn apply_cli(&mut self, cli: &CliOverrides) {
        if let Some(port) = cli.port {
            self.server.port = port;
        }
        if let Some(ref db_path) = cli.db_path {
            self.server.db_path = db_path.clone();
        }
        if cli.dev_mode {
            self.server.dev_mode = true;
        }
    }

    /// Render as TOML with secrets masked, for `taskboard config show`.
    pub fn to_redacted_toml(&self) -> Result<String> {
        let mut shown = self.clone();
        let mask = |s: &mut Option<String>| {
            if s.is_some() {
                *s = Some("********".to_string());
            }
        };
        mask(&mut shown.auth.access_token_secret);
        mask(&mut shown.auth.refresh_token_secret);
        toml::to_string_pretty(&shown).context("Failed to serialize taskboard.toml")
    }

    /// Validate the configuration and return any warnings.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if self.auth.access_token_ttl_secs <= 0 {
            warnings.push(format!(
                "access_token_ttl_secs must be positive, got {}",
                self.auth.access_token_ttl_secs
            ));
        }
        if self.auth.refresh_token_ttl_secs <= self.auth.access_token_ttl_secs {
            warnings.push(
                "refresh_token_ttl_secs should be longer than access_token_ttl_secs".to_string(),
            );
        }
        if let (Some(a), Some(r)) = (
            &self.auth.access_token_secret,
            &self.auth.refresh_token_secret,
        ) {
            if a == r {
                warnings.push("access and refresh token secrets should differ".to_string());
            }
        }

        warnings
    }
}

fn parse_env<T: FromStr>(key: &str, value: &str) -> Result<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    value
        .parse()
        .with_context(|| format!("Invalid value for {}: '{}'", key, value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_parse_empty_uses_defaults() -> Result<()> {
        let config = TaskboardConfig::parse("")?;
        assert_eq!(config.server.port, 3141);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.db_path, PathBuf::from(".taskboard/taskboard.db"));
        assert!(!config.server.dev_mode);
        assert_eq!(config.auth.access_token_ttl_secs, 900);
        assert_eq!(config.auth.refresh_token_ttl_secs, 604_800);
        assert_eq!(config.auth.cookie_name, "jwt");
        assert!(config.auth.access_token_secret.is_none());
        Ok(())
    }

    #[test]
    fn test_parse_sections() -> Result<()> {
        let config = TaskboardConfig::parse(
            r#"
            [server]
            port = 8080
            static_dir = "ui/dist"

            [auth]
            access_token_secret = "a"
            refresh_token_secret = "b"
            cookie_secure = true
            "#,
        )?;
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.static_dir, Some(PathBuf::from("ui/dist")));
        assert_eq!(config.auth.access_token_secret.as_deref(), Some("a"));
        assert!(config.auth.cookie_secure);
        Ok(())
    }

    #[test]
    fn test_parse_rejects_bad_types() {
        assert!(TaskboardConfig::parse("[server]\nport = \"eighty\"").is_err());
    }

    #[test]
    fn test_env_overrides_file() -> Result<()> {
        let mut config = TaskboardConfig::parse("[server]\nport = 8080")?;
        config.apply_env(env(&[
            ("TASKBOARD_PORT", "9090"),
            ("TASKBOARD_ACCESS_TOKEN_SECRET", "from-env"),
            ("TASKBOARD_COOKIE_SECURE", "true"),
        ]))?;
        assert_eq!(config.server.port, 9090);
        assert_eq!(config.auth.access_token_secret.as_deref(), Some("from-env"));
        assert!(config.auth.cookie_secure);
        Ok(())
    }

    #[test]
    fn test_env_rejects_unparseable_port() {
        let mut config = TaskboardConfig::default();
        let err = config
            .apply_env(env(&[("TASKBOARD_PORT", "not-a-port")]))
            .unwrap_err();
        assert!(err.to_string().contains("TASKBOARD_PORT"));
    }

    #[test]
    fn test_cli_overrides_env() -> Result<()> {
        let mut config = TaskboardConfig::default();
        config.apply_env(env(&[("TASKBOARD_PORT", "9090")]))?;
        config.apply_cli(&CliOverrides {
            port: Some(7070),
            db_path: Some(PathBuf::from("/tmp/x.db")),
            dev_mode: true,
        });
        assert_eq!(config.server.port, 7070);
        assert_eq!(config.server.db_path, PathBuf::from("/tmp/x.db"));
        assert!(config.server.dev_mode);
        Ok(())
    }

    #[test]
    fn test_cli_without_flags_keeps_lower_layers() {
        let mut config = TaskboardConfig::default();
        config.server.dev_mode = true;
        config.apply_cli(&CliOverrides::default());
        assert!(config.server.dev_mode);
        assert_eq!(config.server.port, 3141);
    }

    #[test]
    fn test_redacted_toml_hides_secrets() -> Result<()> {
        let mut config = TaskboardConfig::default();
        config.auth.access_token_secret = Some("super-secret".into());
        let shown = config.to_redacted_toml()?;
        assert!(!shown.contains("super-secret"));
        assert!(shown.contains("********"));
        assert!(shown.contains("port = 3141"));
        Ok(())
    }

    #[test]
    fn test_validate_flags_shared_secret_and_bad_ttls() {
        let mut config = TaskboardConfig::default();
        config.auth.access_token_secret = Some("same".into());
        config.auth.refresh_token_secret = Some("same".into());
        config.auth.refresh_token_ttl_secs = 10;
        let warnings = config.validate();
        assert_eq!(warnings.len(), 2);
    }

    #[test]
    fn test_load_missing_file_errors() {
        let result = TaskboardConfig::load(Path::new("/nonexistent/taskboard.toml"));
        assert!(result.is_err());
    }

    #[test]
    fn test_load_from_file() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("taskboard.toml");
        std::fs::write(&path, "[auth]\ncookie_name = \"rt\"\n")?;
        let config = TaskboardConfig::load_or_default(Some(&path))?;
        assert_eq!(config.auth.cookie_name, "rt");
        Ok(())
    }
}
