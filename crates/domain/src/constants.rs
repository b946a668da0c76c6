//! Application constants
//!
//! Centralized location for domain-level constants used throughout the
//! integration.

// Remote API
pub const API_V3_PREFIX: &str = "api/v3";
pub const OAUTH_AUTHORIZE_PATH: &str = "oauth/authorize";
pub const OAUTH_TOKEN_PATH: &str = "oauth/token";

// Inbound routes
pub const OAUTH_REDIRECT_ROUTE: &str = "/oauth-redirect";
pub const DEFAULT_JOURNEY_DESTINATION: &str = "/";

// One-time connection markers shown after the redirect
pub const CONNECTION_SUCCESS: &str = "success";
pub const CONNECTION_ERROR: &str = "error";
pub const GENERIC_CONNECTION_ERROR_MESSAGE: &str = "Error during OAuth exchanges";

// Notification sweep
pub const DEFAULT_NOTIFICATION_SWEEP_SECS: u64 = 300;
