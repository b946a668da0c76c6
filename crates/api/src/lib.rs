//! # OpenProject Integration Server
//!
//! HTTP surface of the integration: the OAuth connect journey and the
//! settings endpoints, plus the [`AppContext`] that wires storage, services
//! and background jobs.

pub mod context;
pub mod error;
pub mod extract;
pub mod routes;
pub mod utils;

pub use context::AppContext;
pub use error::ApiError;
pub use extract::{Principal, SESSION_HEADER, USER_HEADER};
pub use routes::build_router;
