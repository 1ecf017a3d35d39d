//! Configuration file loading for the tactics report.
//!
//! Settings come from `tactics.toml`, then the `STOCKFISH_PATH` environment
//! variable, then command-line flags, each layer overriding the previous.

use std::path::{Path, PathBuf};

use chess_tactics::AnalysisConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Environment variable overriding the configured engine path.
pub const ENGINE_PATH_ENV: &str = "STOCKFISH_PATH";

/// Errors that can occur when loading or parsing configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),
    /// Failed to parse the configuration file as valid TOML.
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),
    /// A setting is out of range.
    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Report configuration.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct TacticsConfig {
    /// Path to the UCI engine. Defaults to "stockfish" (assumes it's in PATH).
    #[serde(default = "default_engine_path")]
    pub engine_path: String,
    /// Search depth for the engine's best move. Defaults to 10.
    #[serde(default = "default_depth")]
    pub depth: u32,
    /// Number of games analyzed from the PGN file. Defaults to 5.
    #[serde(default = "default_max_games")]
    pub max_games: usize,
}

fn default_engine_path() -> String {
    "stockfish".to_string()
}

fn default_depth() -> u32 {
    10
}

fn default_max_games() -> usize {
    5
}

impl Default for TacticsConfig {
    fn default() -> Self {
        Self {
            engine_path: default_engine_path(),
            depth: default_depth(),
            max_games: default_max_games(),
        }
    }
}

impl TacticsConfig {
    /// Loads the configuration from `path`, or from [`Self::config_path()`]
    /// when no path is given.
    ///
    /// A missing default file yields the default configuration; a missing
    /// explicit file is an error.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ReadError`] if the file cannot be read,
    /// or [`ConfigError::ParseError`] if the file contains invalid TOML.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config_path = match path {
            Some(path) => path.to_path_buf(),
            None => {
                let default = Self::config_path();
                if !default.exists() {
                    return Ok(Self::default());
                }
                default
            }
        };
        let content = std::fs::read_to_string(&config_path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Returns the path to the default configuration file.
    ///
    /// Currently returns `tactics.toml` in the current working directory.
    pub fn config_path() -> PathBuf {
        PathBuf::from("tactics.toml")
    }

    /// Replaces the engine path with `value` when it is set and non-empty.
    pub fn with_engine_override(mut self, value: Option<String>) -> Self {
        if let Some(path) = value.filter(|v| !v.trim().is_empty()) {
            self.engine_path = path;
        }
        self
    }

    /// Checks that depth and game count are positive.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the offending setting.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.depth == 0 {
            return Err(ConfigError::Invalid("depth must be at least 1".to_string()));
        }
        if self.max_games == 0 {
            return Err(ConfigError::Invalid(
                "max_games must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn analysis_config(&self) -> AnalysisConfig {
        AnalysisConfig {
            depth: self.depth,
            max_games: self.max_games,
        }
    }
}
