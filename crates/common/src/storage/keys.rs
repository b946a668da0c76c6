//! Persisted key names.
//!
//! These strings are part of the storage contract: renaming one orphans data
//! that is already on disk.

/// Application scope (admin settings).
pub mod app {
    pub const AUTHORIZATION_METHOD: &str = "authorization_method";
    pub const INSTANCE_URL: &str = "openproject_instance_url";
    pub const CLIENT_ID: &str = "openproject_client_id";
    pub const CLIENT_SECRET: &str = "openproject_client_secret";
    pub const DEFAULT_ENABLE_NAVIGATION: &str = "default_enable_navigation";
    pub const DEFAULT_ENABLE_UNIFIED_SEARCH: &str = "default_enable_unified_search";
    pub const SETUP_PROJECT_FOLDER: &str = "setup_project_folder";
    pub const SETUP_APP_PASSWORD: &str = "setup_app_password";
    pub const SSO_PROVIDER_TYPE: &str = "sso_provider_type";
    pub const OIDC_PROVIDER: &str = "oidc_provider";
    pub const TARGETED_AUDIENCE_CLIENT_ID: &str = "targeted_audience_client_id";
    pub const TOKEN_EXCHANGE: &str = "token_exchange";
}

/// User scope (credential, identity, preferences, one-time messages).
pub mod user {
    pub const TOKEN: &str = "token";
    pub const TOKEN_TYPE: &str = "token_type";
    pub const REFRESH_TOKEN: &str = "refresh_token";
    pub const TOKEN_CREATED_AT: &str = "token_created_at";
    pub const TOKEN_EXPIRES_IN: &str = "token_expires_in";
    pub const OIDC_PROVIDER_ID: &str = "oidc_provider_id";
    pub const ID_TOKEN: &str = "id_token";

    pub const USER_ID: &str = "user_id";
    pub const USER_NAME: &str = "user_name";

    pub const NAVIGATION_ENABLED: &str = "navigation_enabled";
    pub const SEARCH_ENABLED: &str = "search_enabled";
    pub const NOTIFICATION_COUNT: &str = "notification_count";

    pub const JOURNEY_STARTING_PAGE: &str = "oauth_journey_starting_page";
    pub const CONNECTION_RESULT: &str = "oauth_connection_result";
    pub const CONNECTION_ERROR_MESSAGE: &str = "oauth_connection_error_message";

    /// Every key that makes up a stored credential.
    pub const CREDENTIAL_KEYS: &[&str] = &[
        TOKEN,
        TOKEN_TYPE,
        REFRESH_TOKEN,
        TOKEN_CREATED_AT,
        TOKEN_EXPIRES_IN,
        OIDC_PROVIDER_ID,
        ID_TOKEN,
    ];
}

/// Session scope.
pub mod session {
    pub const PKCE_STATE: &str = "pkce_exchange_state";
}
