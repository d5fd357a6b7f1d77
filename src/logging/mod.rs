//! Structured logging and observability

pub mod structured;

pub use structured::{init_logging, LoggingGuard};
