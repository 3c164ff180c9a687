//! Configuration. Priority order (highest wins): CLI flags, environment
//! variables, a `.env` file in the working directory, a TOML config file
//! under the platform config directory, then built-in defaults — the same
//! layering the teacher crate's configuration module uses, trimmed down to
//! the handful of settings a translation engine and its MongoDB client
//! actually need.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub host: String,
    pub port: Option<u16>,
    pub user: String,
    #[serde(skip_serializing)]
    pub password: String,
    pub database: Option<String>,
    pub log_level: String,
    pub log_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            host: "127.0.0.1".to_string(),
            port: None,
            user: String::new(),
            password: String::new(),
            database: None,
            log_level: "info".to_string(),
            log_file: None,
        }
    }
}

impl Config {
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("mongosql").join("config.toml"))
    }

    /// Load from the TOML config file (if present), then apply `.env` and
    /// process environment overrides. CLI flags are applied afterwards by
    /// the caller, since `clap::Parser` already owns argv.
    pub fn load() -> Self {
        let mut config = Self::config_path()
            .filter(|p| p.exists())
            .and_then(|p| std::fs::read_to_string(p).ok())
            .and_then(|s| toml::from_str(&s).ok())
            .unwrap_or_default();

        let _ = dotenv_if_present();
        config.apply_env();
        config
    }

    fn apply_env(&mut self) {
        if let Ok(v) = std::env::var("MONGOSQL_HOST") {
            self.host = v;
        }
        if let Ok(v) = std::env::var("MONGOSQL_PORT") {
            self.port = v.parse().ok();
        }
        if let Ok(v) = std::env::var("MONGOSQL_USER") {
            self.user = v;
        }
        if let Ok(v) = std::env::var("MONGOSQL_PASSWORD") {
            self.password = v;
        }
        if let Ok(v) = std::env::var("MONGOSQL_DATABASE") {
            self.database = Some(v);
        }
        if let Ok(v) = std::env::var("MONGOSQL_LOG_LEVEL") {
            self.log_level = v;
        }
    }

    pub fn save(&self) -> std::io::Result<()> {
        if let Some(path) = Self::config_path() {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let toml_str = toml::to_string_pretty(self).unwrap_or_default();
            std::fs::write(path, toml_str)?;
        }
        Ok(())
    }
}

/// A minimal `.env` loader (`KEY=VALUE` lines, `#` comments) — avoids
/// pulling in a dedicated dotenv crate for a handful of optional
/// overrides the teacher stack doesn't otherwise need.
fn dotenv_if_present() -> std::io::Result<()> {
    let path = PathBuf::from(".env");
    if !path.exists() {
        return Ok(());
    }
    let contents = std::fs::read_to_string(path)?;
    for line in contents.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if let Some((key, value)) = line.split_once('=') {
            if std::env::var(key.trim()).is_err() {
                std::env::set_var(key.trim(), value.trim());
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_local_host() {
        let config = Config::default();
        assert_eq!(config.host, "127.0.0.1");
    }
}
