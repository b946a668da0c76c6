//! Settings persistence
//!
//! - **[`repository`]**: the [`ConfigRepository`] port and [`Scope`] addressing
//! - **[`memory`]**: in-process implementation
//! - **[`keys`]**: persisted key names
//!
//! Durable backends live in the infrastructure crate.

pub mod error;
pub mod keys;
#[cfg(feature = "runtime")]
pub mod memory;
#[cfg(feature = "runtime")]
pub mod repository;

pub use error::{StorageError, StorageResult};
#[cfg(feature = "runtime")]
pub use memory::InMemoryConfigRepository;
#[cfg(feature = "runtime")]
pub use repository::{ConfigRepository, Scope};
