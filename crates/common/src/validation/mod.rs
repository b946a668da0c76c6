//! Validation of configuration payloads.

pub mod settings;

pub use settings::{
    is_boolean_setting, is_http_url, is_known_setting, required_keys, AuthorizationMethod,
    SettingsError, SettingsValidator, SsoProviderType,
};
