//! Admin settings validation
//!
//! Admin configuration comes in two mutually exclusive shapes, selected by
//! `authorization_method`: a direct OAuth2 client registration or an OIDC
//! provider setup. Validation is all-or-nothing and runs before anything is
//! persisted.

use serde_json::{Map, Value};
use thiserror::Error;
use url::Url;

use crate::storage::keys::app;

/// Settings validation failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SettingsError {
    #[error("Invalid key: {key}")]
    InvalidKey { key: String },

    #[error("Missing or invalid authorization method")]
    MissingOrInvalidAuthMethod,

    #[error("Incomplete settings, missing: {}", missing.join(", "))]
    IncompleteSettings { missing: Vec<String> },

    #[error("Unknown setting: {key}")]
    UnknownSetting { key: String },

    #[error("Project folder setup and app password setup must be enabled or disabled together")]
    InconsistentGroupfolderSettings,

    #[error("Invalid type for {key}: expected {expected}")]
    InvalidType { key: String, expected: &'static str },

    #[error("Invalid value for {key}")]
    InvalidValue { key: String },

    #[error("Invalid URL for {key}")]
    InvalidUrl { key: String },
}

impl SettingsError {
    /// Stable machine-readable label.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidKey { .. } => "invalid_key",
            Self::MissingOrInvalidAuthMethod => "missing_or_invalid_auth_method",
            Self::IncompleteSettings { .. } => "incomplete_settings",
            Self::UnknownSetting { .. } => "unknown_setting",
            Self::InconsistentGroupfolderSettings => "inconsistent_groupfolder_settings",
            Self::InvalidType { .. } => "invalid_type",
            Self::InvalidValue { .. } => "invalid_value",
            Self::InvalidUrl { .. } => "invalid_url",
        }
    }
}

/// `authorization_method` values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthorizationMethod {
    OAuth2,
    Oidc,
}

impl AuthorizationMethod {
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "oauth2" => Some(Self::OAuth2),
            "oidc" => Some(Self::Oidc),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::OAuth2 => "oauth2",
            Self::Oidc => "oidc",
        }
    }
}

/// `sso_provider_type` values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SsoProviderType {
    NextcloudHub,
    External,
}

impl SsoProviderType {
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "nextcloud_hub" => Some(Self::NextcloudHub),
            "external" => Some(Self::External),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum SettingType {
    Text,
    Url,
    Bool,
    OneOf(&'static [&'static str]),
}

impl SettingType {
    fn expected(self) -> &'static str {
        match self {
            Self::Text | Self::Url => "string",
            Self::Bool => "boolean",
            Self::OneOf(_) => "one of the allowed values",
        }
    }
}

const AUTH_METHODS: &[&str] = &["oauth2", "oidc"];
const SSO_PROVIDER_TYPES: &[&str] = &["nextcloud_hub", "external"];

const BASE_KEYS: &[&str] = &[
    app::INSTANCE_URL,
    app::DEFAULT_ENABLE_NAVIGATION,
    app::DEFAULT_ENABLE_UNIFIED_SEARCH,
    app::SETUP_PROJECT_FOLDER,
    app::SETUP_APP_PASSWORD,
];

const OAUTH2_KEYS: &[&str] = &[app::CLIENT_ID, app::CLIENT_SECRET];

fn setting_type(key: &str) -> Option<SettingType> {
    let kind = match key {
        app::AUTHORIZATION_METHOD => SettingType::OneOf(AUTH_METHODS),
        app::INSTANCE_URL => SettingType::Url,
        app::CLIENT_ID | app::CLIENT_SECRET | app::OIDC_PROVIDER | app::TARGETED_AUDIENCE_CLIENT_ID => {
            SettingType::Text
        }
        app::DEFAULT_ENABLE_NAVIGATION
        | app::DEFAULT_ENABLE_UNIFIED_SEARCH
        | app::SETUP_PROJECT_FOLDER
        | app::SETUP_APP_PASSWORD
        | app::TOKEN_EXCHANGE => SettingType::Bool,
        app::SSO_PROVIDER_TYPE => SettingType::OneOf(SSO_PROVIDER_TYPES),
        _ => return None,
    };
    Some(kind)
}

/// Whether `key` is an admin setting at all.
#[must_use]
pub fn is_known_setting(key: &str) -> bool {
    setting_type(key).is_some()
}

/// Whether the setting holds a boolean.
#[must_use]
pub fn is_boolean_setting(key: &str) -> bool {
    matches!(setting_type(key), Some(SettingType::Bool))
}

/// Keys that must be present for a complete configuration of `method`.
///
/// For OIDC the provider type decides the exemptions: a `nextcloud_hub`
/// provider needs neither `oidc_provider` nor `token_exchange`, and an
/// `external` provider without token exchange needs no
/// `targeted_audience_client_id`. An unknown provider type is treated as
/// `external`.
#[must_use]
pub fn required_keys(
    method: AuthorizationMethod,
    sso_provider_type: Option<SsoProviderType>,
    token_exchange: Option<bool>,
) -> Vec<&'static str> {
    let mut keys: Vec<&'static str> = BASE_KEYS.to_vec();
    match method {
        AuthorizationMethod::OAuth2 => keys.extend_from_slice(OAUTH2_KEYS),
        AuthorizationMethod::Oidc => {
            keys.push(app::SSO_PROVIDER_TYPE);
            match sso_provider_type.unwrap_or(SsoProviderType::External) {
                SsoProviderType::NextcloudHub => keys.push(app::TARGETED_AUDIENCE_CLIENT_ID),
                SsoProviderType::External => {
                    keys.push(app::OIDC_PROVIDER);
                    keys.push(app::TOKEN_EXCHANGE);
                    if token_exchange != Some(false) {
                        keys.push(app::TARGETED_AUDIENCE_CLIENT_ID);
                    }
                }
            }
        }
    }
    keys
}

/// Keys a complete configuration may carry: the required ones plus, for an
/// `external` provider, the audience client id even when token exchange is
/// off.
fn allowed_keys(
    method: AuthorizationMethod,
    sso_provider_type: Option<SsoProviderType>,
    token_exchange: Option<bool>,
) -> Vec<&'static str> {
    let mut keys = required_keys(method, sso_provider_type, token_exchange);
    keys.push(app::AUTHORIZATION_METHOD);
    let external = sso_provider_type.unwrap_or(SsoProviderType::External) == SsoProviderType::External;
    if method == AuthorizationMethod::Oidc && external && !keys.contains(&app::TARGETED_AUDIENCE_CLIENT_ID) {
        keys.push(app::TARGETED_AUDIENCE_CLIENT_ID);
    }
    keys
}

/// Validates admin settings payloads.
#[derive(Debug, Clone, Copy, Default)]
pub struct SettingsValidator;

impl SettingsValidator {
    /// Validate `values`.
    ///
    /// With `complete_setup` the payload must describe a whole configuration
    /// for one authorization method; otherwise it is an incremental update
    /// and only the supplied keys are checked.
    ///
    /// # Errors
    /// The first [`SettingsError`] found, checking in this order: unknown
    /// keys, authorization method, per-key type/value/URL, completeness,
    /// keys outside the selected setup, project folder consistency.
    pub fn validate(values: &Map<String, Value>, complete_setup: bool) -> Result<(), SettingsError> {
        if let Some(key) = values.keys().find(|k| !is_known_setting(k)) {
            return Err(SettingsError::UnknownSetting { key: key.clone() });
        }

        let method = match values.get(app::AUTHORIZATION_METHOD) {
            Some(Value::String(s)) => {
                Some(AuthorizationMethod::parse(s).ok_or(SettingsError::MissingOrInvalidAuthMethod)?)
            }
            Some(_) => return Err(SettingsError::MissingOrInvalidAuthMethod),
            None if complete_setup => return Err(SettingsError::MissingOrInvalidAuthMethod),
            None => None,
        };

        for (key, value) in values {
            if let Some(kind) = setting_type(key) {
                check_value(key, kind, value)?;
            }
        }

        if complete_setup {
            if let Some(method) = method {
                check_complete(values, method)?;
            }
        }

        if let (Some(folder), Some(password)) =
            (values.get(app::SETUP_PROJECT_FOLDER), values.get(app::SETUP_APP_PASSWORD))
        {
            if folder != password {
                return Err(SettingsError::InconsistentGroupfolderSettings);
            }
        }

        Ok(())
    }
}

fn check_value(key: &str, kind: SettingType, value: &Value) -> Result<(), SettingsError> {
    let invalid_type = || SettingsError::InvalidType { key: key.to_string(), expected: kind.expected() };

    match kind {
        SettingType::Bool => {
            if !value.is_boolean() {
                return Err(invalid_type());
            }
        }
        SettingType::Text | SettingType::Url | SettingType::OneOf(_) => {
            let text = value.as_str().ok_or_else(invalid_type)?;
            if text.is_empty() {
                return Err(SettingsError::InvalidValue { key: key.to_string() });
            }
            match kind {
                SettingType::Url if !is_http_url(text) => {
                    return Err(SettingsError::InvalidUrl { key: key.to_string() });
                }
                SettingType::OneOf(allowed) if !allowed.contains(&text) => {
                    return Err(invalid_type());
                }
                _ => {}
            }
        }
    }
    Ok(())
}

fn check_complete(values: &Map<String, Value>, method: AuthorizationMethod) -> Result<(), SettingsError> {
    let sso_provider_type =
        values.get(app::SSO_PROVIDER_TYPE).and_then(Value::as_str).and_then(SsoProviderType::parse);
    let token_exchange = values.get(app::TOKEN_EXCHANGE).and_then(Value::as_bool);

    let missing: Vec<String> = required_keys(method, sso_provider_type, token_exchange)
        .into_iter()
        .filter(|key| !values.contains_key(*key))
        .map(str::to_string)
        .collect();
    if !missing.is_empty() {
        return Err(SettingsError::IncompleteSettings { missing });
    }

    let allowed = allowed_keys(method, sso_provider_type, token_exchange);
    if let Some(key) = values.keys().find(|key| !allowed.contains(&key.as_str())) {
        return Err(SettingsError::UnknownSetting { key: key.clone() });
    }

    Ok(())
}

/// Absolute `http`/`https` URL with a host.
#[must_use]
pub fn is_http_url(value: &str) -> bool {
    Url::parse(value)
        .map(|url| matches!(url.scheme(), "http" | "https") && url.host().is_some())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn map(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => unreachable!("test input must be an object"),
        }
    }

    fn oauth2_form() -> Map<String, Value> {
        map(json!({
            "authorization_method": "oauth2",
            "openproject_instance_url": "http://test.example",
            "openproject_client_id": "a",
            "openproject_client_secret": "b",
            "default_enable_navigation": false,
            "default_enable_unified_search": false,
            "setup_project_folder": false,
            "setup_app_password": false
        }))
    }

    fn oidc_form() -> Map<String, Value> {
        map(json!({
            "authorization_method": "oidc",
            "openproject_instance_url": "https://op.example.com",
            "sso_provider_type": "external",
            "oidc_provider": "keycloak",
            "targeted_audience_client_id": "openproject",
            "token_exchange": true,
            "default_enable_navigation": true,
            "default_enable_unified_search": false,
            "setup_project_folder": true,
            "setup_app_password": true
        }))
    }

    #[test]
    fn complete_oauth2_form_is_valid() {
        assert_eq!(SettingsValidator::validate(&oauth2_form(), true), Ok(()));
    }

    #[test]
    fn asymmetric_project_folder_flags_are_rejected() {
        let mut values = oauth2_form();
        values.insert("setup_project_folder".into(), json!(true));
        values.insert("setup_app_password".into(), json!(false));

        assert_eq!(
            SettingsValidator::validate(&values, true),
            Err(SettingsError::InconsistentGroupfolderSettings)
        );
    }

    #[test]
    fn incremental_url_must_be_absolute_http() {
        let values = map(json!({"openproject_instance_url": "not-a-url"}));
        assert_eq!(
            SettingsValidator::validate(&values, false),
            Err(SettingsError::InvalidUrl { key: "openproject_instance_url".into() })
        );

        let ftp = map(json!({"openproject_instance_url": "ftp://op.example.com"}));
        assert!(matches!(SettingsValidator::validate(&ftp, false), Err(SettingsError::InvalidUrl { .. })));
    }

    #[test]
    fn empty_full_setup_needs_auth_method() {
        assert_eq!(
            SettingsValidator::validate(&Map::new(), true),
            Err(SettingsError::MissingOrInvalidAuthMethod)
        );

        let bogus = map(json!({"authorization_method": "saml"}));
        assert_eq!(
            SettingsValidator::validate(&bogus, false),
            Err(SettingsError::MissingOrInvalidAuthMethod)
        );
    }

    #[test]
    fn unknown_keys_are_rejected_in_both_modes() {
        let values = map(json!({"favourite_colour": "blue"}));
        for complete in [true, false] {
            assert_eq!(
                SettingsValidator::validate(&values, complete),
                Err(SettingsError::UnknownSetting { key: "favourite_colour".into() })
            );
        }
    }

    #[test]
    fn missing_client_secret_is_incomplete() {
        let mut values = oauth2_form();
        values.remove("openproject_client_secret");

        assert_eq!(
            SettingsValidator::validate(&values, true),
            Err(SettingsError::IncompleteSettings { missing: vec!["openproject_client_secret".into()] })
        );
        // the same payload is a fine incremental update
        assert_eq!(SettingsValidator::validate(&values, false), Ok(()));
    }

    #[test]
    fn oidc_keys_are_not_allowed_in_oauth2_setup() {
        let mut values = oauth2_form();
        values.insert("oidc_provider".into(), json!("keycloak"));
        assert_eq!(
            SettingsValidator::validate(&values, true),
            Err(SettingsError::UnknownSetting { key: "oidc_provider".into() })
        );
    }

    #[test]
    fn complete_oidc_form_is_valid() {
        assert_eq!(SettingsValidator::validate(&oidc_form(), true), Ok(()));
    }

    #[test]
    fn nextcloud_hub_does_not_need_provider_or_token_exchange() {
        let mut values = oidc_form();
        values.insert("sso_provider_type".into(), json!("nextcloud_hub"));
        values.remove("oidc_provider");
        values.remove("token_exchange");
        assert_eq!(SettingsValidator::validate(&values, true), Ok(()));

        values.remove("targeted_audience_client_id");
        assert_eq!(
            SettingsValidator::validate(&values, true),
            Err(SettingsError::IncompleteSettings { missing: vec!["targeted_audience_client_id".into()] })
        );
    }

    #[test]
    fn nextcloud_hub_rejects_external_provider_keys() {
        for (extra, dropped) in [("oidc_provider", "token_exchange"), ("token_exchange", "oidc_provider")] {
            let mut hub = oidc_form();
            hub.insert("sso_provider_type".into(), json!("nextcloud_hub"));
            hub.remove(dropped);
            assert_eq!(
                SettingsValidator::validate(&hub, true),
                Err(SettingsError::UnknownSetting { key: extra.into() })
            );
            // an incremental update is not checked against the setup shape
            assert_eq!(SettingsValidator::validate(&hub, false), Ok(()));
        }
    }

    #[test]
    fn external_without_token_exchange_does_not_need_audience() {
        let mut values = oidc_form();
        values.insert("token_exchange".into(), json!(false));
        assert_eq!(SettingsValidator::validate(&values, true), Ok(()));
        values.remove("targeted_audience_client_id");
        assert_eq!(SettingsValidator::validate(&values, true), Ok(()));

        values.insert("token_exchange".into(), json!(true));
        assert!(matches!(
            SettingsValidator::validate(&values, true),
            Err(SettingsError::IncompleteSettings { .. })
        ));
    }

    #[test]
    fn value_types_are_enforced() {
        let values = map(json!({"default_enable_navigation": "yes"}));
        assert_eq!(
            SettingsValidator::validate(&values, false),
            Err(SettingsError::InvalidType { key: "default_enable_navigation".into(), expected: "boolean" })
        );

        let values = map(json!({"openproject_client_id": 42}));
        assert!(matches!(SettingsValidator::validate(&values, false), Err(SettingsError::InvalidType { .. })));

        let values = map(json!({"sso_provider_type": "okta"}));
        assert!(matches!(SettingsValidator::validate(&values, false), Err(SettingsError::InvalidType { .. })));

        let values = map(json!({"openproject_client_id": ""}));
        assert_eq!(
            SettingsValidator::validate(&values, false),
            Err(SettingsError::InvalidValue { key: "openproject_client_id".into() })
        );
    }

    #[test]
    fn error_kinds_are_stable() {
        assert_eq!(SettingsError::MissingOrInvalidAuthMethod.kind(), "missing_or_invalid_auth_method");
        assert_eq!(SettingsError::InvalidUrl { key: "k".into() }.kind(), "invalid_url");
        assert_eq!(SettingsError::InvalidKey { key: "k".into() }.to_string(), "Invalid key: k");
    }
}
