//! CLI interface and argument parsing
//!
//! Operational commands for the patient-records kernel. The service API
//! itself is consumed as a library; the CLI covers database
//! initialization and health checks.

pub mod commands;

use clap::{Parser, Subcommand};

/// Medgate - access-controlled patient records kernel
#[derive(Parser, Debug)]
#[command(name = "medgate")]
#[command(version, about, long_about = None)]
#[command(author = "Medgate Contributors")]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "medgate.toml", env = "MEDGATE_CONFIG")]
    pub config: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, env = "MEDGATE_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create the database schema and seed accounts (idempotent)
    Init(commands::init::InitArgs),

    /// Validate configuration file
    ValidateConfig(commands::validate::ValidateArgs),

    /// Show database health and row counts
    Status(commands::status::StatusArgs),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parse_init() {
        let cli = Cli::parse_from(["medgate", "init"]);
        assert_eq!(cli.config, "medgate.toml");
        assert!(matches!(cli.command, Commands::Init(_)));
    }

    #[test]
    fn test_cli_parse_with_config() {
        let cli = Cli::parse_from(["medgate", "--config", "custom.toml", "status"]);
        assert_eq!(cli.config, "custom.toml");
        assert!(matches!(cli.command, Commands::Status(_)));
    }

    #[test]
    fn test_cli_parse_with_log_level() {
        let cli = Cli::parse_from(["medgate", "--log-level", "debug", "init"]);
        assert_eq!(cli.log_level, Some("debug".to_string()));
    }

    #[test]
    fn test_cli_parse_validate_config() {
        let cli = Cli::parse_from(["medgate", "validate-config"]);
        assert!(matches!(cli.command, Commands::ValidateConfig(_)));
    }
}
