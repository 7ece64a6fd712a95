use std::{
    fs,
    net::SocketAddr,
    path::{Path, PathBuf},
};

use chrono_tz::Tz;
use clap::Parser;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::utils;

const DEFAULT_BIND: &str = "127.0.0.1:5000";
const DEFAULT_TIMEZONE: &str = "UTC";
const DEFAULT_LOG_FILTER: &str = "info";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unable to read config {path:?}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid config {path:?}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("invalid bind address {0:?}")]
    Bind(String),
    #[error("unknown time zone {0:?}")]
    Timezone(String),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub bind: String,
    pub database_path: Option<PathBuf>,
    pub timezone: String,
    pub log_filter: String,
    pub seed_demo_data: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind: DEFAULT_BIND.to_string(),
            database_path: None,
            timezone: DEFAULT_TIMEZONE.to_string(),
            log_filter: DEFAULT_LOG_FILTER.to_string(),
            seed_demo_data: false,
        }
    }
}

/// Command line flags. Each one falls back to an environment variable and
/// then to the config file.
#[derive(Debug, Clone, Default, Parser)]
#[command(name = "fyyur", version, about = "Venue and artist directory server")]
pub struct CliArgs {
    /// JSON config file; defaults to config.json in the data directory
    #[arg(long, env = "FYYUR_CONFIG")]
    pub config: Option<PathBuf>,

    /// Address to listen on, e.g. 0.0.0.0:8080
    #[arg(long, env = "FYYUR_BIND")]
    pub bind: Option<String>,

    /// SQLite database file
    #[arg(long, env = "FYYUR_DATABASE")]
    pub database: Option<PathBuf>,

    /// IANA zone used to read and display show times
    #[arg(long, env = "FYYUR_TIMEZONE")]
    pub timezone: Option<String>,

    /// tracing filter directive; RUST_LOG takes precedence
    #[arg(long)]
    pub log: Option<String>,

    /// Load demo venues, artists and shows into an empty database
    #[arg(long)]
    pub seed: bool,
}

impl AppConfig {
    /// Config file (explicit path, or the default one when it exists) with
    /// command line overrides applied on top.
    pub fn resolve(args: &CliArgs) -> Result<Self, ConfigError> {
        let mut config = match &args.config {
            Some(path) => read_config(path)?,
            None => {
                let path = utils::default_config_path();
                if path.exists() {
                    read_config(&path)?
                } else {
                    AppConfig::default()
                }
            }
        };

        if let Some(bind) = &args.bind {
            config.bind = bind.clone();
        }
        if let Some(database) = &args.database {
            config.database_path = Some(database.clone());
        }
        if let Some(timezone) = &args.timezone {
            config.timezone = timezone.clone();
        }
        if let Some(log) = &args.log {
            config.log_filter = log.clone();
        }
        if args.seed {
            config.seed_demo_data = true;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.bind_addr()?;
        self.tz()?;
        Ok(())
    }

    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.bind
            .parse()
            .map_err(|_| ConfigError::Bind(self.bind.clone()))
    }

    pub fn tz(&self) -> Result<Tz, ConfigError> {
        self.timezone
            .parse()
            .map_err(|_| ConfigError::Timezone(self.timezone.clone()))
    }

    pub fn database_path(&self) -> PathBuf {
        self.database_path
            .clone()
            .unwrap_or_else(utils::default_database_path)
    }
}

fn read_config(path: &Path) -> Result<AppConfig, ConfigError> {
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&contents).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(extra: &[&str]) -> CliArgs {
        let mut argv = vec!["fyyur"];
        argv.extend_from_slice(extra);
        CliArgs::parse_from(argv)
    }

    #[test]
    fn file_values_fill_missing_keys_with_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{ "timezone": "America/Boise", "seed_demo_data": true }"#)
            .expect("write config");

        let config =
            AppConfig::resolve(&args(&["--config", path.to_str().expect("utf8 path")]))
                .expect("resolve");
        assert_eq!(config.timezone, "America/Boise");
        assert!(config.seed_demo_data);
        assert_eq!(config.bind, DEFAULT_BIND);
        assert_eq!(config.tz().expect("tz"), chrono_tz::America::Boise);
    }

    #[test]
    fn flags_override_the_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{ "bind": "127.0.0.1:6000", "log_filter": "warn" }"#)
            .expect("write config");

        let config = AppConfig::resolve(&args(&[
            "--config",
            path.to_str().expect("utf8 path"),
            "--bind",
            "0.0.0.0:8080",
            "--database",
            "/tmp/fyyur-test.sqlite",
            "--log",
            "debug",
        ]))
        .expect("resolve");
        assert_eq!(config.bind_addr().expect("addr").port(), 8080);
        assert_eq!(config.log_filter, "debug");
        assert_eq!(
            config.database_path(),
            PathBuf::from("/tmp/fyyur-test.sqlite")
        );
    }

    #[test]
    fn rejects_unknown_time_zone() {
        let config = AppConfig {
            timezone: "Mars/Olympus_Mons".to_string(),
            ..AppConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Timezone(_))));
    }

    #[test]
    fn rejects_malformed_bind_address() {
        let config = AppConfig {
            bind: "localhost".to_string(),
            ..AppConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Bind(_))));
    }

    #[test]
    fn missing_explicit_config_file_is_an_error() {
        let err = AppConfig::resolve(&args(&["--config", "/definitely/not/here.json"]))
            .expect_err("missing file");
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
