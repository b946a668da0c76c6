//! Remote identity of a connected user.

use openproject_common::auth::AuthMode;
use openproject_common::storage::keys::user;
use openproject_common::storage::{ConfigRepository, Scope, StorageResult};
use reqwest::Method;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::ServiceError;
use crate::api::{OpenProjectClient, RequestError, RequestParams};

/// The OpenProject account behind a credential.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserInfo {
    pub id: String,
    pub name: String,
}

/// Fetch `users/me` and persist the identity for `principal`.
pub(crate) async fn fetch_and_store(
    client: &OpenProjectClient,
    repository: &dyn ConfigRepository,
    principal: &str,
    auth_mode: AuthMode,
) -> Result<UserInfo, ServiceError> {
    let me = client
        .request(principal, "users/me", &RequestParams::new(), Method::GET, auth_mode, &CancellationToken::new())
        .await?;

    let id = match me.get("id") {
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::String(s)) if !s.is_empty() => s.clone(),
        _ => return Err(RequestError::network("users/me response has no id").into()),
    };
    let name = me.get("name").and_then(Value::as_str).unwrap_or_default().to_string();

    let scope = Scope::user(principal);
    repository.set(&scope, user::USER_ID, &id).await?;
    repository.set(&scope, user::USER_NAME, &name).await?;
    debug!(principal, remote_user_id = %id, "stored OpenProject identity");

    Ok(UserInfo { id, name })
}

pub(crate) async fn clear(repository: &dyn ConfigRepository, principal: &str) -> StorageResult<()> {
    let scope = Scope::user(principal);
    repository.delete(&scope, user::USER_ID).await?;
    repository.delete(&scope, user::USER_NAME).await
}
