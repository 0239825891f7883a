//! Environment-driven configuration.
//!
//! A `.env` file in the working directory is loaded first (if present).
//! CLI flags override whatever is read here.
//!
//! | Variable             | Default                   |
//! |----------------------|---------------------------|
//! | `BIRDWATCH_DATA`     | `merged_data_cleaned.csv` |
//! | `BIRDWATCH_PORT`     | `3000`                    |
//! | `BIRDWATCH_EXTENDED` | `false`                   |

use std::env;
use std::path::PathBuf;

use crate::error::{ConfigError, ConfigResult};

pub const DEFAULT_DATA_PATH: &str = "merged_data_cleaned.csv";
pub const DEFAULT_PORT: u16 = 3000;

/// Runtime configuration for the CLI and the server.
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    /// Cleaned dataset: written by `clean`, served by `serve`.
    pub data_path: PathBuf,
    pub port: u16,
    /// Impute the extended column set by default.
    pub extended: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_path: PathBuf::from(DEFAULT_DATA_PATH),
            port: DEFAULT_PORT,
            extended: false,
        }
    }
}

impl AppConfig {
    /// Load from the process environment, after `.env`.
    pub fn from_env() -> ConfigResult<Self> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key lookup; unset keys keep their default.
    pub fn from_lookup<F>(lookup: F) -> ConfigResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(path) = lookup("BIRDWATCH_DATA").filter(|v| !v.trim().is_empty()) {
            config.data_path = PathBuf::from(path.trim());
        }

        if let Some(port) = lookup("BIRDWATCH_PORT") {
            config.port = port.trim().parse().map_err(|_| invalid("BIRDWATCH_PORT", &port))?;
        }

        if let Some(flag) = lookup("BIRDWATCH_EXTENDED") {
            config.extended = parse_flag(&flag).ok_or_else(|| invalid("BIRDWATCH_EXTENDED", &flag))?;
        }

        Ok(config)
    }
}

pub(crate) fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}

fn invalid(key: &str, value: &str) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    }
}
