//! Validate-config command implementation

use crate::config::load_config;
use clap::Args;

/// Arguments for the validate-config command
#[derive(Args, Debug)]
pub struct ValidateArgs {}

impl ValidateArgs {
    /// Execute the validate-config command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        match load_config(config_path) {
            Ok(config) => {
                println!("✅ Configuration is valid");
                println!("   Database: {}", config.database.path);
                println!("   Seed users: {}", config.seed.users.len());
                Ok(0)
            }
            Err(e) => {
                println!("❌ Configuration is invalid");
                println!("   Error: {e}");
                Ok(2) // Configuration error exit code
            }
        }
    }
}
