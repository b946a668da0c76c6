//! Database implementations

pub mod config_repository;
pub mod manager;

pub use config_repository::SqliteConfigRepository;
pub use manager::{DbManager, SqliteConnection, SqlitePool};
