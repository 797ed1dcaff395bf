//! Configuration management for Metron
//!
//! This module handles loading, validation, and management of the application
//! configuration from YAML files.

use crate::error::{MetronError, Result};
use chrono::{Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

fn default_true() -> bool {
    true
}

fn default_start_date() -> NaiveDate {
    // First day of the current month
    let today = Utc::now().date_naive();
    today.with_day(1).unwrap_or(today)
}

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Metering API connection configuration
    pub api: ApiConfig,

    /// Metering point configuration
    pub meter: MeterConfig,

    /// Logging configuration
    pub logging: LoggingConfig,

    /// Web server binding configuration
    pub web: WebConfig,

    /// Polling interval in seconds
    pub poll_interval_secs: u64,
}

/// Metering API connection parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// OAuth2 client id
    pub client_id: String,

    /// OAuth2 client secret
    pub client_secret: String,

    /// Base URL of the identity server issuing access tokens
    pub token_url: String,

    /// Base URL of the data API
    pub data_url: String,

    /// HTTP request timeout in seconds
    pub timeout_secs: u64,
}

/// Metering point parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeterConfig {
    /// EAN of the metering point
    pub ean: String,

    /// Backfill start date (calendar date, no time component)
    #[serde(default = "default_start_date")]
    pub start_date: NaiveDate,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    pub level: String,

    /// Optional per-sink override for the console layer
    #[serde(default)]
    pub console_level: Option<String>,

    /// Optional per-sink override for the file layer
    #[serde(default)]
    pub file_level: Option<String>,

    /// Path to log file (or directory for rolling logs)
    pub file: String,

    /// Number of rotated files to keep
    pub backup_count: u32,

    /// Whether to log to console
    #[serde(default = "default_true")]
    pub console_output: bool,

    /// Whether to use JSON format
    pub json_format: bool,
}

/// Web server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebConfig {
    /// Bind address
    pub host: String,

    /// TCP port
    pub port: u16,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            client_secret: String::new(),
            token_url: "https://idm.distribuce24.cz".to_string(),
            data_url: "https://data.distribuce24.cz/rest".to_string(),
            timeout_secs: 30,
        }
    }
}

impl Default for MeterConfig {
    fn default() -> Self {
        Self {
            ean: String::new(),
            start_date: default_start_date(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "INFO".to_string(),
            console_level: None,
            file_level: None,
            file: "/tmp/metron.log".to_string(),
            backup_count: 5,
            console_output: true,
            json_format: false,
        }
    }
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8088,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api: ApiConfig::default(),
            meter: MeterConfig::default(),
            logging: LoggingConfig::default(),
            web: WebConfig::default(),
            poll_interval_secs: 3600,
        }
    }
}

impl Config {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&contents)?;
        Ok(config)
    }

    /// Load configuration from the default locations
    pub fn load() -> Result<Self> {
        let default_paths = [
            "metron.yaml",
            "/data/metron.yaml",
            "/etc/metron/config.yaml",
        ];

        for path in &default_paths {
            if Path::new(path).exists() {
                return Self::from_file(path);
            }
        }

        // Fall back to default configuration
        Ok(Config::default())
    }

    /// Save configuration to a YAML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(path, yaml)?;
        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.api.client_id.is_empty() {
            return Err(MetronError::validation(
                "api.client_id",
                "Client id cannot be empty",
            ));
        }

        if self.api.client_secret.is_empty() {
            return Err(MetronError::validation(
                "api.client_secret",
                "Client secret cannot be empty",
            ));
        }

        if self.api.token_url.is_empty() || self.api.data_url.is_empty() {
            return Err(MetronError::validation(
                "api.token_url",
                "API base URLs cannot be empty",
            ));
        }

        if self.meter.ean.is_empty() {
            return Err(MetronError::validation(
                "meter.ean",
                "EAN cannot be empty",
            ));
        }

        if self.poll_interval_secs == 0 {
            return Err(MetronError::validation(
                "poll_interval_secs",
                "Must be greater than 0",
            ));
        }

        if self.web.port == 0 {
            return Err(MetronError::validation(
                "web.port",
                "Port must be greater than 0",
            ));
        }

        Ok(())
    }
}
