//! Status command implementation
//!
//! Connects to the configured database, runs a health check, and prints
//! row counts for the three tables.

use crate::config::load_config;
use crate::storage::SqliteStore;
use clap::Args;

/// Arguments for the status command
#[derive(Args, Debug)]
pub struct StatusArgs {}

impl StatusArgs {
    /// Execute the status command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!("Checking database status");

        println!("📊 Medgate Status");
        println!();

        let config = match load_config(config_path) {
            Ok(c) => c,
            Err(e) => {
                println!("❌ Failed to load configuration file");
                println!("   Error: {e}");
                return Ok(2); // Configuration error exit code
            }
        };

        let store = match SqliteStore::connect(
            &config.database.path,
            config.database.max_connections,
        )
        .await
        {
            Ok(s) => s,
            Err(e) => {
                println!("❌ Failed to open database");
                println!("   Error: {e}");
                return Ok(4); // Connection error exit code
            }
        };

        if let Err(e) = store.health_check().await {
            println!("❌ Health check failed");
            println!("   Error: {e}");
            return Ok(5); // Fatal error exit code
        }

        let counts = match store.table_counts().await {
            Ok(c) => c,
            Err(e) => {
                println!("❌ Failed to read table counts");
                println!("   Error: {e}");
                return Ok(5);
            }
        };

        println!("Database: {}", config.database.path);
        println!();
        println!("{:<12} {:>8}", "Table", "Rows");
        println!("{}", "-".repeat(22));
        println!("{:<12} {:>8}", "users", counts.users);
        println!("{:<12} {:>8}", "patients", counts.patients);
        println!("{:<12} {:>8}", "logs", counts.logs);
        println!();
        println!("✅ Healthy");

        Ok(0)
    }
}
