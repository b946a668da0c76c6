//! Error conversions between infrastructure libraries and the domain.

pub mod conversions;

pub use conversions::InfraError;
