//! Authenticated OpenProject API client
//!
//! Sends requests to `{instance}/api/v3/{endpoint}` with the principal's
//! stored credential. Under OAuth a 401 triggers exactly one forced refresh
//! followed by exactly one retry; nothing else is retried.

use std::sync::Arc;

use openproject_common::auth::{AuthMode, Credential, OAuthClientTrait, OAuthExchangeClient, TokenStore};
use openproject_common::storage::keys::app;
use openproject_common::storage::{ConfigRepository, Scope};
use openproject_domain::constants::API_V3_PREFIX;
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Method, Response, StatusCode};
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use super::errors::RequestError;
use super::query::RequestParams;
use crate::http::HttpClient;

/// OpenProject REST client bound to the stored credentials.
pub struct OpenProjectClient<C: OAuthClientTrait + 'static = OAuthExchangeClient> {
    http: HttpClient,
    tokens: Arc<TokenStore<C>>,
    repository: Arc<dyn ConfigRepository>,
}

impl<C: OAuthClientTrait + 'static> OpenProjectClient<C> {
    pub fn new(http: HttpClient, tokens: Arc<TokenStore<C>>, repository: Arc<dyn ConfigRepository>) -> Self {
        Self { http, tokens, repository }
    }

    pub fn tokens(&self) -> &Arc<TokenStore<C>> {
        &self.tokens
    }

    /// Call `endpoint` on behalf of `principal`.
    ///
    /// Returns the decoded JSON body; an empty body yields `Value::Null` and
    /// a body that is not JSON is returned as a string.
    ///
    /// # Errors
    /// - [`RequestError::NetworkError`] when no instance URL is configured,
    ///   the transport fails or `cancel` fires
    /// - [`RequestError::Unauthorized`] when there is no credential, or an
    ///   OAuth credential was rejected and could not be renewed
    /// - [`RequestError::BadCredentials`] for any other error status
    #[instrument(skip_all, fields(principal = %principal, endpoint = %endpoint, method = %method, auth_mode = %auth_mode))]
    pub async fn request(
        &self,
        principal: &str,
        endpoint: &str,
        params: &RequestParams,
        method: Method,
        auth_mode: AuthMode,
        cancel: &CancellationToken,
    ) -> Result<Value, RequestError> {
        let url = self.endpoint_url(endpoint).await?;

        let credential = self
            .tokens
            .current(principal, true)
            .await
            .map_err(|e| RequestError::network(format!("credential lookup failed: {e}")))?
            .ok_or_else(|| RequestError::Unauthorized {
                status: StatusCode::UNAUTHORIZED.as_u16(),
                message: "not connected to OpenProject".to_string(),
            })?;

        let response = self.send(&url, params, &method, auth_mode, &credential, cancel).await?;
        let status = response.status();

        if status == StatusCode::UNAUTHORIZED && auth_mode == AuthMode::OAuth {
            let message = error_message(response).await;
            warn!(principal, "access token rejected; refreshing once");

            let refreshed = match self.tokens.force_refresh(principal, &credential.access_token).await {
                Ok(refreshed) => refreshed,
                Err(err) => {
                    warn!(principal, error = %err, "token refresh after 401 failed");
                    return Err(RequestError::Unauthorized { status: status.as_u16(), message });
                }
            };

            let retry = self.send(&url, params, &method, auth_mode, &refreshed, cancel).await?;
            let retry_status = retry.status();
            if retry_status == StatusCode::UNAUTHORIZED {
                let message = error_message(retry).await;
                return Err(RequestError::Unauthorized { status: retry_status.as_u16(), message });
            }
            return finish(retry).await;
        }

        finish(response).await
    }

    async fn endpoint_url(&self, endpoint: &str) -> Result<String, RequestError> {
        let instance = self
            .repository
            .get(&Scope::App, app::INSTANCE_URL)
            .await
            .map_err(|e| RequestError::network(format!("configuration unavailable: {e}")))?
            .filter(|url| !url.is_empty())
            .ok_or_else(|| RequestError::network("OpenProject instance URL is not configured"))?;

        Ok(format!(
            "{}/{}/{}",
            instance.trim_end_matches('/'),
            API_V3_PREFIX,
            endpoint.trim_start_matches('/')
        ))
    }

    async fn send(
        &self,
        url: &str,
        params: &RequestParams,
        method: &Method,
        auth_mode: AuthMode,
        credential: &Credential,
        cancel: &CancellationToken,
    ) -> Result<Response, RequestError> {
        let mut builder = if *method == Method::GET {
            let query = params.to_query_string();
            let target = if query.is_empty() { url.to_string() } else { format!("{url}?{query}") };
            self.http.request(Method::GET, target)
        } else {
            self.http
                .request(method.clone(), url)
                .header(CONTENT_TYPE, "application/json")
                .json(&params.to_json_body())
        };

        builder = builder
            .header(ACCEPT, "application/json")
            .header(AUTHORIZATION, auth_mode.authorization_header(&credential.access_token));

        debug!(url, "sending authenticated request");
        tokio::select! {
            biased;
            () = cancel.cancelled() => Err(RequestError::network("request cancelled")),
            result = self.http.send(builder) => result.map_err(|e| RequestError::network(e.to_string())),
        }
    }
}

async fn finish(response: Response) -> Result<Value, RequestError> {
    let status = response.status();
    if status.as_u16() >= 400 {
        debug!(status = status.as_u16(), "remote API returned error status");
        return Err(RequestError::BadCredentials { status: status.as_u16() });
    }

    let text = response.text().await.map_err(|e| RequestError::network(e.to_string()))?;
    if text.trim().is_empty() {
        return Ok(Value::Null);
    }

    info!(status = status.as_u16(), "request successful");
    Ok(serde_json::from_str(&text).unwrap_or(Value::String(text)))
}

/// `message` of an OpenProject error body, or the status reason.
async fn error_message(response: Response) -> String {
    let status = response.status();
    let fallback = status.canonical_reason().unwrap_or("Unauthorized").to_string();
    match response.json::<Value>().await {
        Ok(body) => body.get("message").and_then(Value::as_str).map(str::to_string).unwrap_or(fallback),
        Err(_) => fallback,
    }
}
