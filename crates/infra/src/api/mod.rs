//! OpenProject REST API access
//!
//! - [`client`]: authenticated requests with refresh-on-401
//! - [`query`]: parameter encoding
//! - [`errors`]: the closed set of request failures

pub mod client;
pub mod errors;
pub mod query;

pub use client::OpenProjectClient;
pub use errors::RequestError;
pub use query::RequestParams;
