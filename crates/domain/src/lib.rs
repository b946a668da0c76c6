//! # OpenProject Integration Domain
//!
//! Domain types shared by every crate of the integration.
//!
//! This crate contains:
//! - Application configuration structures
//! - Domain error types and Result definitions
//! - Domain constants
//!
//! ## Architecture
//! - No dependencies on other workspace crates
//! - Only external dependencies allowed

pub mod config;
pub mod constants;
pub mod errors;

// Re-export commonly used items
pub use config::*;
pub use errors::*;
