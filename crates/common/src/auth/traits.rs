//! Seams for the OAuth exchange
//!
//! Lets the token store and services run against a mock token endpoint.

use async_trait::async_trait;

use super::client::OAuthFlowError;
use super::types::{ClientCredentials, Credential, TokenPayload};

/// Token endpoint operations.
#[async_trait]
pub trait OAuthClientTrait: Send + Sync {
    /// Exchange an authorization code, consuming the pending PKCE state of
    /// `session_id`.
    ///
    /// # Errors
    /// Returns error on state/verifier/secret validation failure or if the
    /// token endpoint refuses the grant.
    async fn exchange_authorization_code(
        &self,
        session_id: &str,
        code: &str,
        returned_state: &str,
        client: &ClientCredentials,
        redirect_uri: &str,
    ) -> Result<TokenPayload, OAuthFlowError>;

    /// Obtain a new access token from the credential's refresh token.
    ///
    /// # Errors
    /// Returns error if no refresh token is held or the grant is refused.
    async fn refresh_access_token(
        &self,
        credential: &Credential,
        client: &ClientCredentials,
    ) -> Result<TokenPayload, OAuthFlowError>;
}
