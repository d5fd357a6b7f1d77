// Medgate - Access-Controlled Patient Records Kernel
// Copyright (c) 2026 Medgate Contributors
// Licensed under the MIT License

//! # Medgate - access-controlled patient records kernel
//!
//! Medgate is the confidentiality/integrity core of a small clinical
//! records product: authentication, role-based authorization, field-level
//! masking, and a tamper-evident audit log over a SQLite dataset. UI and
//! export formatting live outside this crate and consume the service API.
//!
//! ## Architecture
//!
//! Medgate follows a layered architecture:
//!
//! - [`cli`] - Command-line interface (init, status, validate-config)
//! - [`service`] - The access-controlled façade every caller goes through
//! - [`policy`] - The closed role × action authorization table
//! - [`anonymization`] - Deterministic field masking transforms
//! - [`auth`] - Credential verification and session context
//! - [`storage`] - Storage traits and the SQLite adapter
//! - [`domain`] - Core domain types and error hierarchy
//! - [`config`] - Configuration management
//! - [`logging`] - Structured logging
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use medgate::domain::RawPatientFields;
//! use medgate::service::PatientService;
//! use medgate::storage::SqliteStore;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = Arc::new(SqliteStore::connect("data/medgate.db", 5).await?);
//!     let service = PatientService::with_sqlite(store);
//!
//!     let session = service.login("reception", "ReceptionPass123!").await?;
//!     let id = service
//!         .add_patient(
//!             &session,
//!             RawPatientFields {
//!                 name: "Jane Doe".to_string(),
//!                 contact: "555-123-4567".to_string(),
//!                 diagnosis: "Flu".to_string(),
//!             },
//!         )
//!         .await?;
//!
//!     println!("created patient {id}");
//!     Ok(())
//! }
//! ```
//!
//! ## Guarantees
//!
//! Every service call is authorized against a closed policy table before
//! it touches storage, and every call — allowed or denied — appends
//! exactly one audit entry before it returns. Mutations and their audit
//! entry commit in the same transaction: an effect whose log write failed
//! does not survive.
//!
//! ## Error Handling
//!
//! All fallible operations return [`domain::MedgateError`], a small stable
//! set of categories (auth, authorization, validation, storage) that never
//! exposes low-level driver detail:
//!
//! ```rust,no_run
//! use medgate::domain::MedgateError;
//!
//! fn render(err: &MedgateError) -> &'static str {
//!     match err {
//!         MedgateError::Auth(_) => "invalid username or password",
//!         MedgateError::Authorization(_) => "you are not permitted to do that",
//!         MedgateError::Validation(_) => "please check the submitted fields",
//!         _ => "something went wrong, try again later",
//!     }
//! }
//! ```

pub mod anonymization;
pub mod auth;
pub mod cli;
pub mod config;
pub mod domain;
pub mod logging;
pub mod policy;
pub mod service;
pub mod storage;
