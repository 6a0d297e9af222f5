use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_BIND: &str = "127.0.0.1:5000";
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 10_000;

#[derive(Debug, Deserialize, Serialize, Default, Clone, PartialEq)]
pub struct DatabaseConfig {
    pub path: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Serialize, Default, Clone, PartialEq)]
pub struct ServerConfig {
    pub bind: Option<String>,
    pub request_timeout_ms: Option<u64>,
}

/// Top-level jop config file structure.
#[derive(Debug, Deserialize, Serialize, Default, Clone, PartialEq)]
pub struct JopConfig {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

impl JopConfig {
    /// Load config from ~/.jop/config.toml. Returns default if file doesn't exist.
    pub fn load() -> Result<Self> {
        Self::load_from(&config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(JopConfig::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).with_context(|| "Failed to parse config.toml")
    }

    /// Database path: CLI flag / `JOP_DB` (clap merges both) > config > ~/.jop/jop.db
    pub fn resolve_db_path(&self, cli_flag: Option<PathBuf>) -> Result<PathBuf> {
        if let Some(path) = cli_flag.filter(|p| !p.as_os_str().is_empty()) {
            return Ok(path);
        }
        if let Some(ref path) = self.database.path {
            return Ok(expand_home(path));
        }
        crate::db::Database::default_db_path()
    }

    /// Bind address: CLI flag / `JOP_BIND` > config > 127.0.0.1:5000
    pub fn resolve_bind(&self, cli_flag: Option<&str>) -> String {
        cli_flag
            .filter(|b| !b.is_empty())
            .map(str::to_string)
            .or_else(|| self.server.bind.clone())
            .unwrap_or_else(|| DEFAULT_BIND.to_string())
    }

    pub fn resolve_timeout(&self, cli_flag: Option<u64>) -> Duration {
        Duration::from_millis(
            cli_flag
                .or(self.server.request_timeout_ms)
                .unwrap_or(DEFAULT_REQUEST_TIMEOUT_MS),
        )
    }

    /// Render the effective file contents for `jop config`.
    pub fn display(&self) -> String {
        let mut lines = vec!["[database]".to_string()];
        match self.database.path {
            Some(ref p) => lines.push(format!("  path = \"{}\"", p.display())),
            None => lines.push("  path = (default)".to_string()),
        }
        lines.push("[server]".to_string());
        lines.push(format!(
            "  bind = \"{}\"",
            self.server.bind.as_deref().unwrap_or(DEFAULT_BIND)
        ));
        lines.push(format!(
            "  request_timeout_ms = {}",
            self.server
                .request_timeout_ms
                .unwrap_or(DEFAULT_REQUEST_TIMEOUT_MS)
        ));
        lines.join("\n")
    }
}

fn expand_home(path: &Path) -> PathBuf {
    match (path.strip_prefix("~"), dirs::home_dir()) {
        (Ok(rest), Some(home)) => home.join(rest),
        _ => path.to_path_buf(),
    }
}

/// Path to the config file: ~/.jop/config.toml
pub fn config_path() -> Result<PathBuf> {
    let home = dirs::home_dir().context("Could not determine home directory")?;
    Ok(home.join(".jop").join("config.toml"))
}

/// Default config template content.
pub fn default_config_template() -> &'static str {
    r#"# ~/.jop/config.toml
# Resolution order: CLI flag > env var > this file > built-in default

[database]
# path = "~/.jop/jop.db"

[server]
# bind = "127.0.0.1:5000"
# request_timeout_ms = 10000
"#
}

/// Create the default config file if it doesn't already exist.
pub fn init_config() -> Result<bool> {
    let path = config_path()?;
    if path.exists() {
        return Ok(false);
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&path, default_config_template())?;
    Ok(true)
}
