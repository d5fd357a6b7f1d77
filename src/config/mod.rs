//! Configuration management
//!
//! TOML configuration with `${VAR}` environment substitution, `MEDGATE_*`
//! overrides, and secrecy-wrapped seed passwords.

pub mod loader;
pub mod schema;
pub mod secret;

pub use loader::load_config;
pub use schema::{
    ApplicationConfig, DatabaseConfig, Environment, LoggingConfig, MedgateConfig, SeedConfig,
    SeedUser,
};
pub use secret::{secret_from, SecretString, SecretValue};
