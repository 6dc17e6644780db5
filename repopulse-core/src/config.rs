//! Configuration loading and management
//!
//! Configuration is loaded from `~/.config/repopulse/config.toml`
//!
//! This module follows the XDG Base Directory Specification:
//! - Config: `$XDG_CONFIG_HOME/repopulse/` (~/.config/repopulse/)
//! - State/Logs: `$XDG_STATE_HOME/repopulse/` (~/.local/state/repopulse/)
//!
//! Data artifacts (the JSON files the frontend consumes) are deliberately
//! not under XDG: they live in a project-local data directory, default
//! `data/` relative to the working directory, because they are committed
//! alongside the site that renders them.

use crate::error::{Error, Result};
use serde::Deserialize;
use std::path::PathBuf;

/// Returns a best-effort home directory path.
fn home_dir() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Returns XDG_CONFIG_HOME or ~/.config
fn xdg_config_home() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".config"))
}

/// Returns XDG_STATE_HOME or ~/.local/state
fn xdg_state_home() -> PathBuf {
    std::env::var("XDG_STATE_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".local/state"))
}

/// Main configuration struct
#[derive(Debug, Deserialize, Default)]
pub struct Config {
    /// GitHub API configuration
    #[serde(default)]
    pub github: GithubConfig,

    /// Backfill run configuration
    #[serde(default)]
    pub backfill: BackfillConfig,

    /// Artifact storage configuration
    #[serde(default)]
    pub storage: StorageConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// GitHub API configuration
#[derive(Debug, Deserialize, Clone)]
pub struct GithubConfig {
    /// Account whose repositories are measured
    #[serde(default)]
    pub owner: String,

    /// API base URL (override for tests)
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Personal access token. `GITHUB_TOKEN` in the environment takes
    /// precedence over this value.
    pub token: Option<String>,

    /// Commits per page (GitHub caps this at 100)
    #[serde(default = "default_per_page")]
    pub per_page: u32,

    /// Politeness delay between successive page requests, in milliseconds
    #[serde(default = "default_page_delay_ms")]
    pub page_delay_ms: u64,
}

impl Default for GithubConfig {
    fn default() -> Self {
        Self {
            owner: String::new(),
            api_url: default_api_url(),
            token: None,
            per_page: default_per_page(),
            page_delay_ms: default_page_delay_ms(),
        }
    }
}

impl GithubConfig {
    /// Validate configuration, returning an error message if invalid
    pub fn validate(&self) -> Result<()> {
        if self.owner.is_empty() {
            return Err(Error::Config(
                "github.owner is required (set it in the config file or pass --owner)".to_string(),
            ));
        }
        if self.per_page == 0 || self.per_page > 100 {
            return Err(Error::Config(
                "github.per_page must be between 1 and 100".to_string(),
            ));
        }
        Ok(())
    }

    /// Resolve the API token: `GITHUB_TOKEN` env var first, then the
    /// config file. Absence is a fatal precondition for real-data paths.
    pub fn resolve_token(&self) -> Result<String> {
        if let Ok(token) = std::env::var("GITHUB_TOKEN") {
            if !token.is_empty() {
                return Ok(token);
            }
        }
        self.token
            .clone()
            .filter(|t| !t.is_empty())
            .ok_or(Error::MissingToken)
    }
}

fn default_api_url() -> String {
    "https://api.github.com".to_string()
}

fn default_per_page() -> u32 {
    100
}

fn default_page_delay_ms() -> u64 {
    200
}

/// Backfill run configuration
#[derive(Debug, Deserialize, Clone)]
pub struct BackfillConfig {
    /// How far back to reconstruct history, in calendar months
    #[serde(default = "default_lookback_months")]
    pub lookback_months: u32,

    /// Politeness delay between repository iterations, in milliseconds
    #[serde(default = "default_repo_delay_ms")]
    pub repo_delay_ms: u64,
}

impl Default for BackfillConfig {
    fn default() -> Self {
        Self {
            lookback_months: default_lookback_months(),
            repo_delay_ms: default_repo_delay_ms(),
        }
    }
}

fn default_lookback_months() -> u32 {
    12
}

fn default_repo_delay_ms() -> u64 {
    500
}

/// Artifact storage configuration
#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    /// Directory holding input and output JSON artifacts
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

/// Logging configuration
#[derive(Debug, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Load configuration from the default path
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();

        if !config_path.exists() {
            tracing::info!("No config file found at {:?}, using defaults", config_path);
            return Ok(Config::default());
        }

        Self::load_from(&config_path)
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &PathBuf) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read config file {:?}: {}", path, e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("failed to parse config: {}", e)))?;

        Ok(config)
    }

    /// Returns the default config file path
    ///
    /// `$XDG_CONFIG_HOME/repopulse/config.toml` (~/.config/repopulse/config.toml)
    pub fn config_path() -> PathBuf {
        xdg_config_home().join("repopulse").join("config.toml")
    }

    /// Returns the state directory path (for logs)
    ///
    /// `$XDG_STATE_HOME/repopulse/` (~/.local/state/repopulse/)
    pub fn state_dir() -> PathBuf {
        xdg_state_home().join("repopulse")
    }

    /// Returns the log file path
    ///
    /// `$XDG_STATE_HOME/repopulse/repopulse.log`
    pub fn log_path() -> PathBuf {
        Self::state_dir().join("repopulse.log")
    }
}
