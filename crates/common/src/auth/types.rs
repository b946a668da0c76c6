//! Credential and token payload types
//!
//! A [`Credential`] is the single bearer secret held for a principal. It is
//! either a personal API key (never expires) or an OAuth access token with an
//! optional refresh token and a lifetime measured from `created_at`.

use std::fmt;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// How a credential is presented to the remote API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthMode {
    /// Personal access token, sent as HTTP Basic with the `apikey` user.
    ApiKey,
    /// OAuth/OIDC access token, sent as a Bearer token.
    OAuth,
}

impl AuthMode {
    /// Stable persisted label.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ApiKey => "api_key",
            Self::OAuth => "oauth",
        }
    }

    /// Parse a persisted label.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "api_key" => Some(Self::ApiKey),
            "oauth" => Some(Self::OAuth),
            _ => None,
        }
    }

    /// Value for the `Authorization` header carrying `token`.
    #[must_use]
    pub fn authorization_header(self, token: &str) -> String {
        match self {
            Self::ApiKey => format!("Basic {}", STANDARD.encode(format!("apikey:{token}"))),
            Self::OAuth => format!("Bearer {token}"),
        }
    }
}

impl fmt::Display for AuthMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Token material returned by the token endpoint or delivered by an OIDC
/// provider, after shape validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenPayload {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: i64,
    pub id_token: Option<String>,
    pub provider_id: Option<String>,
}

impl TokenPayload {
    /// Validate a raw JSON token payload.
    ///
    /// `access_token` and `refresh_token` must be non-empty strings and
    /// `expires_in` an integer or a numeric string. The error is a short
    /// reason naming the offending field.
    pub fn from_value(value: &Value) -> Result<Self, String> {
        let object = value.as_object().ok_or_else(|| "token data is not an object".to_string())?;

        let access_token = required_string(object.get("access_token"), "access_token")?;
        let refresh_token = required_string(object.get("refresh_token"), "refresh_token")?;
        let expires_in = match object.get("expires_in") {
            Some(Value::Number(n)) => n.as_i64().ok_or_else(|| "expires_in is not an integer".to_string())?,
            Some(Value::String(s)) => {
                s.trim().parse::<i64>().map_err(|_| "expires_in is not numeric".to_string())?
            }
            Some(_) => return Err("expires_in is not numeric".to_string()),
            None => return Err("expires_in is missing".to_string()),
        };
        if expires_in < 0 {
            return Err("expires_in is negative".to_string());
        }

        Ok(Self {
            access_token,
            refresh_token,
            expires_in,
            id_token: optional_string(object.get("id_token")),
            provider_id: optional_string(object.get("provider_id")),
        })
    }
}

fn required_string(value: Option<&Value>, field: &str) -> Result<String, String> {
    match value {
        Some(Value::String(s)) if !s.is_empty() => Ok(s.clone()),
        Some(_) => Err(format!("{field} is not a non-empty string")),
        None => Err(format!("{field} is missing")),
    }
}

fn optional_string(value: Option<&Value>) -> Option<String> {
    value.and_then(Value::as_str).filter(|s| !s.is_empty()).map(str::to_string)
}

/// The bearer credential held for one principal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    pub access_token: String,
    pub auth_mode: AuthMode,
    pub refresh_token: Option<String>,
    pub created_at: DateTime<Utc>,
    /// Lifetime in seconds; `None` means the credential does not expire.
    pub expires_in: Option<i64>,
    pub provider_id: Option<String>,
    pub id_token: Option<String>,
}

impl Credential {
    /// A personal API key.
    pub fn api_key(token: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            access_token: token.into(),
            auth_mode: AuthMode::ApiKey,
            refresh_token: None,
            created_at,
            expires_in: None,
            provider_id: None,
            id_token: None,
        }
    }

    /// An OAuth credential issued at `created_at`.
    #[must_use]
    pub fn from_payload(payload: TokenPayload, created_at: DateTime<Utc>) -> Self {
        Self {
            access_token: payload.access_token,
            auth_mode: AuthMode::OAuth,
            refresh_token: Some(payload.refresh_token),
            created_at,
            expires_in: Some(payload.expires_in),
            provider_id: payload.provider_id,
            id_token: payload.id_token,
        }
    }

    /// Absolute expiry instant, if the credential expires at all.
    ///
    /// A lifetime beyond the representable time range counts as never
    /// expiring.
    #[must_use]
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.lifetime()
            .and_then(Duration::try_seconds)
            .and_then(|lifetime| self.created_at.checked_add_signed(lifetime))
    }

    /// `now > created_at + expires_in`.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at().is_some_and(|expiry| now > expiry)
    }

    /// `now > created_at + expires_in / 2`.
    #[must_use]
    pub fn is_expiring_at(&self, now: DateTime<Utc>) -> bool {
        self.lifetime()
            .and_then(|e| Duration::try_milliseconds(e.saturating_mul(500)))
            .and_then(|half| self.created_at.checked_add_signed(half))
            .is_some_and(|halfway| now > halfway)
    }

    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    #[must_use]
    pub fn is_expiring(&self) -> bool {
        self.is_expiring_at(Utc::now())
    }

    /// Seconds left before expiry (negative once expired).
    #[must_use]
    pub fn seconds_until_expiry(&self) -> Option<i64> {
        self.expires_at().map(|expiry| (expiry - Utc::now()).num_seconds())
    }

    /// Value for the `Authorization` header.
    #[must_use]
    pub fn authorization_header(&self) -> String {
        self.auth_mode.authorization_header(&self.access_token)
    }

    // API keys never expire, whatever lifetime was recorded.
    fn lifetime(&self) -> Option<i64> {
        match self.auth_mode {
            AuthMode::ApiKey => None,
            AuthMode::OAuth => self.expires_in,
        }
    }
}

/// Remote instance and client registration used for token endpoint calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientCredentials {
    pub instance_url: String,
    pub client_id: String,
    pub client_secret: String,
}

impl ClientCredentials {
    pub fn new(
        instance_url: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        Self {
            instance_url: instance_url.into(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        }
    }

    /// `{instance}/oauth/authorize`
    #[must_use]
    pub fn authorization_url(&self) -> String {
        format!("{}/oauth/authorize", self.instance_url.trim_end_matches('/'))
    }

    /// `{instance}/oauth/token`
    #[must_use]
    pub fn token_url(&self) -> String {
        format!("{}/oauth/token", self.instance_url.trim_end_matches('/'))
    }
}

/// Standard OAuth 2.0 error response body (RFC 6749 §5.2).
#[derive(Debug, Deserialize)]
pub struct OAuthError {
    pub error: String,
    pub error_description: Option<String>,
}

impl fmt::Display for OAuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.error_description {
            Some(desc) => write!(f, "{}: {}", self.error, desc),
            None => write!(f, "{}", self.error),
        }
    }
}

impl std::error::Error for OAuthError {}
