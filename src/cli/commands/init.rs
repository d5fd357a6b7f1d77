//! Init command implementation
//!
//! Creates the SQLite schema and inserts the configured seed accounts.
//! Re-running is safe: migrations are `IF NOT EXISTS` and seeding is
//! insert-if-absent, so existing data is never altered.

use crate::auth::hash_password;
use crate::config::load_config;
use crate::storage::{SqliteStore, UserStore};
use clap::Args;
use secrecy::ExposeSecret;

/// Arguments for the init command
#[derive(Args, Debug)]
pub struct InitArgs {}

impl InitArgs {
    /// Execute the init command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!("Initializing database");

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

        println!("✅ Schema ready at {}", config.database.path);

        if config.seed.users.is_empty() {
            println!("No seed users configured; skipping seeding.");
            return Ok(0);
        }

        let mut inserted = 0;
        let mut skipped = 0;
        for seed in &config.seed.users {
            let username = seed.username.trim().to_lowercase();
            let password_hash = hash_password(seed.password.expose_secret().as_ref());
            match store
                .insert_if_absent(&username, &password_hash, seed.role)
                .await
            {
                Ok(true) => {
                    tracing::info!(username = %username, role = %seed.role, "Seed user created");
                    inserted += 1;
                }
                Ok(false) => {
                    tracing::debug!(username = %username, "Seed user already present");
                    skipped += 1;
                }
                Err(e) => {
                    println!("❌ Failed to seed user '{username}'");
                    println!("   Error: {e}");
                    return Ok(5); // Fatal error exit code
                }
            }
        }

        println!("✅ Seed accounts: {inserted} created, {skipped} already present");
        Ok(0)
    }
}
