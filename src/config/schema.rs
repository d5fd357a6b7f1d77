//! Configuration schema types
//!
//! Maps the TOML configuration file onto typed structures and validates
//! them before anything connects to storage.

use crate::config::SecretString;
use crate::domain::user::Role;
use serde::{Deserialize, Serialize};

/// Runtime environment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    /// Development environment
    #[default]
    Development,
    /// Staging environment
    Staging,
    /// Production environment
    Production,
}

/// Main Medgate configuration
///
/// This is the root structure that maps to the TOML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MedgateConfig {
    /// Application-level settings
    pub application: ApplicationConfig,

    /// Runtime environment (development, staging, production)
    #[serde(default)]
    pub environment: Environment,

    /// SQLite database settings
    pub database: DatabaseConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Seed accounts created by `medgate init`
    #[serde(default)]
    pub seed: SeedConfig,
}

impl MedgateConfig {
    /// Validates the configuration
    ///
    /// # Errors
    ///
    /// Returns an error describing the first invalid value found.
    pub fn validate(&self) -> Result<(), String> {
        self.application.validate()?;
        self.database.validate()?;
        self.logging.validate()?;
        self.seed.validate()?;
        Ok(())
    }
}

/// Application-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationConfig {
    /// Application name used in log output
    #[serde(default = "default_app_name")]
    pub name: String,

    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl ApplicationConfig {
    fn validate(&self) -> Result<(), String> {
        const LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];
        if !LEVELS.contains(&self.log_level.to_lowercase().as_str()) {
            return Err(format!(
                "invalid log_level '{}', expected one of: {}",
                self.log_level,
                LEVELS.join(", ")
            ));
        }
        Ok(())
    }
}

/// SQLite database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the database file; parent directories are created on init
    pub path: String,

    /// Connection pool size
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

impl DatabaseConfig {
    fn validate(&self) -> Result<(), String> {
        if self.path.trim().is_empty() {
            return Err("database.path must not be empty".to_string());
        }
        if self.max_connections == 0 {
            return Err("database.max_connections must be at least 1".to_string());
        }
        Ok(())
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Enable the rolling file layer in addition to console output
    #[serde(default)]
    pub local_enabled: bool,

    /// Directory for rolling log files
    #[serde(default = "default_log_path")]
    pub local_path: String,

    /// Rotation interval: "daily" or "hourly"
    #[serde(default = "default_rotation")]
    pub local_rotation: String,
}

impl LoggingConfig {
    fn validate(&self) -> Result<(), String> {
        if self.local_enabled && self.local_path.trim().is_empty() {
            return Err("logging.local_path must not be empty when file logging is enabled"
                .to_string());
        }
        if !matches!(self.local_rotation.as_str(), "daily" | "hourly") {
            return Err(format!(
                "invalid logging.local_rotation '{}', expected 'daily' or 'hourly'",
                self.local_rotation
            ));
        }
        Ok(())
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            local_enabled: false,
            local_path: default_log_path(),
            local_rotation: default_rotation(),
        }
    }
}

/// Seed accounts configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SeedConfig {
    /// Accounts inserted if absent on `medgate init`
    #[serde(default)]
    pub users: Vec<SeedUser>,
}

impl SeedConfig {
    fn validate(&self) -> Result<(), String> {
        for user in &self.users {
            if user.username.trim().is_empty() {
                return Err("seed user username must not be empty".to_string());
            }
        }
        Ok(())
    }
}

/// A single seed account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedUser {
    pub username: String,
    /// Plain password, usually injected via ${VAR} substitution; hashed
    /// before it reaches storage
    pub password: SecretString,
    pub role: Role,
}

fn default_app_name() -> String {
    "medgate".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_max_connections() -> u32 {
    5
}

fn default_log_path() -> String {
    "logs".to_string()
}

fn default_rotation() -> String {
    "daily".to_string()
}
