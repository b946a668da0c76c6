//! # OpenProject Integration Infrastructure
//!
//! Everything that performs I/O on behalf of the integration.
//!
//! This crate contains:
//! - SQLite persistence behind the `ConfigRepository` port
//! - The authenticated OpenProject API client
//! - Services for the connect journey, settings writes and notifications
//! - Configuration loading and background scheduling
//!
//! ## Architecture
//! - Implements ports defined in `openproject-common`
//! - Depends on `openproject-domain` for configuration and error types
//! - Consumed by the `openproject-server` HTTP surface

pub mod api;
pub mod config;
pub mod database;
pub mod errors;
pub mod http;
pub mod scheduling;
pub mod services;

pub use api::{OpenProjectClient, RequestError, RequestParams};
pub use database::{DbManager, SqliteConfigRepository};
pub use errors::InfraError;
pub use http::HttpClient;
pub use services::{IntegrationServices, ServiceError};
