//! Configuration loader with TOML parsing and environment overrides
//!
//! Loading a config file:
//! 1. reads the TOML file
//! 2. substitutes `${VAR}` placeholders from the environment
//! 3. parses into [`MedgateConfig`]
//! 4. applies `MEDGATE_*` environment overrides
//! 5. validates the result

use super::schema::MedgateConfig;
use crate::domain::errors::MedgateError;
use crate::domain::result::Result;
use regex::Regex;
use std::fs;
use std::path::Path;

/// Loads configuration from a TOML file
///
/// # Errors
///
/// Returns a configuration error when the file is missing or unreadable,
/// a referenced environment variable is unset, the TOML does not parse,
/// or validation fails.
///
/// # Examples
///
/// ```no_run
/// use medgate::config::load_config;
///
/// let config = load_config("medgate.toml").expect("failed to load config");
/// ```
pub fn load_config(path: impl AsRef<Path>) -> Result<MedgateConfig> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(MedgateError::Configuration(format!(
            "Configuration file not found: {}",
            path.display()
        )));
    }

    let contents = fs::read_to_string(path).map_err(|e| {
        MedgateError::Configuration(format!(
            "Failed to read configuration file {}: {}",
            path.display(),
            e
        ))
    })?;

    let contents = substitute_env_vars(&contents)?;

    let mut config: MedgateConfig = toml::from_str(&contents)
        .map_err(|e| MedgateError::Configuration(format!("Failed to parse TOML: {e}")))?;

    apply_env_overrides(&mut config);

    config
        .validate()
        .map_err(|e| MedgateError::Configuration(format!("Configuration validation failed: {e}")))?;

    Ok(config)
}

/// Substitutes environment variables in the format ${VAR_NAME}
///
/// Comment lines are left untouched. Missing variables are collected and
/// reported together.
fn substitute_env_vars(input: &str) -> Result<String> {
    let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}").expect("env var pattern is valid");
    let mut result = String::new();
    let mut missing_vars = Vec::new();

    for line in input.lines() {
        let trimmed = line.trim_start();
        if trimmed.starts_with('#') {
            result.push_str(line);
            result.push('\n');
            continue;
        }

        let mut processed_line = line.to_string();
        for cap in re.captures_iter(line) {
            let var_name = &cap[1];
            match std::env::var(var_name) {
                Ok(value) => {
                    let placeholder = format!("${{{var_name}}}");
                    processed_line = processed_line.replace(&placeholder, &value);
                }
                Err(_) => {
                    if !missing_vars.contains(&var_name.to_string()) {
                        missing_vars.push(var_name.to_string());
                    }
                }
            }
        }
        result.push_str(&processed_line);
        result.push('\n');
    }

    if !missing_vars.is_empty() {
        return Err(MedgateError::Configuration(format!(
            "Missing required environment variables: {}",
            missing_vars.join(", ")
        )));
    }

    Ok(result)
}

/// Applies environment variable overrides using the MEDGATE_* prefix
///
/// The pattern is MEDGATE_<SECTION>_<KEY>, e.g. MEDGATE_DATABASE_PATH.
fn apply_env_overrides(config: &mut MedgateConfig) {
    if let Ok(val) = std::env::var("MEDGATE_APPLICATION_LOG_LEVEL") {
        config.application.log_level = val;
    }
    if let Ok(val) = std::env::var("MEDGATE_DATABASE_PATH") {
        config.database.path = val;
    }
    if let Ok(val) = std::env::var("MEDGATE_DATABASE_MAX_CONNECTIONS") {
        if let Ok(n) = val.parse() {
            config.database.max_connections = n;
        }
    }
    if let Ok(val) = std::env::var("MEDGATE_LOGGING_LOCAL_ENABLED") {
        config.logging.local_enabled = val.parse().unwrap_or(false);
    }
    if let Ok(val) = std::env::var("MEDGATE_LOGGING_LOCAL_PATH") {
        config.logging.local_path = val;
    }
}
