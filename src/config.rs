//! Run configuration: defaults, optional JSON file, validation.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::generator::MAX_USERS;
use crate::model::TIMESTAMP_FORMAT;

/// Users generated when nothing else is configured
pub const DEFAULT_USERS: usize = 10_000;
pub const DEFAULT_OUTPUT: &str = "Funnel_Analysis_Dataset_GRANDFINAL.csv";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config JSON in {}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("users must be at least 1")]
    NoUsers,
    #[error("users must be at most {max}, got {users}")]
    TooManyUsers { users: usize, max: usize },
    #[error("output path must not be empty")]
    EmptyOutput,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub users: usize,
    /// Fixed RNG seed; a fresh one is drawn per run when unset.
    pub seed: Option<u64>,
    /// End of the 30-day timestamp window; current UTC time when unset.
    pub anchor: Option<NaiveDateTime>,
    pub out: PathBuf,
    /// Where to write the summary JSON, if anywhere
    pub summary: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            users: DEFAULT_USERS,
            seed: None,
            anchor: None,
            out: PathBuf::from(DEFAULT_OUTPUT),
            summary: None,
        }
    }
}

impl Config {
    /// Load a config file. Missing fields keep their defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let json = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&json).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.users == 0 {
            return Err(ConfigError::NoUsers);
        }
        if self.users > MAX_USERS {
            return Err(ConfigError::TooManyUsers {
                users: self.users,
                max: MAX_USERS,
            });
        }
        if self.out.as_os_str().is_empty() {
            return Err(ConfigError::EmptyOutput);
        }
        Ok(())
    }
}

/// Accepts the CSV rendering (`2024-06-01 12:00:00`) or ISO 8601
/// (`2024-06-01T12:00:00`).
pub fn parse_anchor(s: &str) -> Result<NaiveDateTime, chrono::ParseError> {
    NaiveDateTime::parse_from_str(s, TIMESTAMP_FORMAT).or_else(|_| s.parse())
}
