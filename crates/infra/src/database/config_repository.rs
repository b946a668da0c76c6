//! SQLite-backed settings repository.
//!
//! Implements the [`ConfigRepository`] port on the `config_values` table.
//! All database operations run in `spawn_blocking` to avoid blocking the
//! async runtime.

use std::sync::Arc;

use async_trait::async_trait;
use openproject_common::storage::{ConfigRepository, Scope, StorageError, StorageResult};
use rusqlite::{params, OptionalExtension};
use tokio::task;

use super::manager::DbManager;

/// SQLite-backed [`ConfigRepository`].
pub struct SqliteConfigRepository {
    db: Arc<DbManager>,
}

impl SqliteConfigRepository {
    /// Create a new repository with the given database manager.
    pub fn new(db: Arc<DbManager>) -> Self {
        Self { db }
    }

    async fn with_connection<T, F>(&self, op: F) -> StorageResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&rusqlite::Connection) -> rusqlite::Result<T> + Send + 'static,
    {
        let db = Arc::clone(&self.db);
        task::spawn_blocking(move || -> StorageResult<T> {
            let conn = db.get_connection().map_err(|e| StorageError::Connection(e.to_string()))?;
            op(&conn).map_err(map_sql_error)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn owners_with_key(&self, kind: &'static str, key: &str) -> StorageResult<Vec<String>> {
        let key = key.to_string();
        self.with_connection(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT owner FROM config_values
                 WHERE scope_kind = ?1 AND key = ?2
                 ORDER BY owner",
            )?;
            let owners = stmt
                .query_map(params![kind, key], |row| row.get::<_, String>(0))?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(owners)
        })
        .await
    }
}

#[async_trait]
impl ConfigRepository for SqliteConfigRepository {
    async fn get(&self, scope: &Scope, key: &str) -> StorageResult<Option<String>> {
        let (kind, owner, key) = parts(scope, key);
        self.with_connection(move |conn| {
            conn.query_row(
                "SELECT value FROM config_values WHERE scope_kind = ?1 AND owner = ?2 AND key = ?3",
                params![kind, owner, key],
                |row| row.get::<_, String>(0),
            )
            .optional()
        })
        .await
    }

    async fn set(&self, scope: &Scope, key: &str, value: &str) -> StorageResult<()> {
        let (kind, owner, key) = parts(scope, key);
        let value = value.to_string();
        self.with_connection(move |conn| {
            let now = chrono::Utc::now().timestamp();
            // Upsert pattern (SQLite 3.24.0+)
            conn.execute(
                "INSERT INTO config_values (scope_kind, owner, key, value, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(scope_kind, owner, key) DO UPDATE SET
                    value = excluded.value,
                    updated_at = excluded.updated_at",
                params![kind, owner, key, value, now],
            )?;
            Ok(())
        })
        .await
    }

    async fn delete(&self, scope: &Scope, key: &str) -> StorageResult<()> {
        let (kind, owner, key) = parts(scope, key);
        self.with_connection(move |conn| {
            conn.execute(
                "DELETE FROM config_values WHERE scope_kind = ?1 AND owner = ?2 AND key = ?3",
                params![kind, owner, key],
            )?;
            Ok(())
        })
        .await
    }

    async fn principals_with_key(&self, key: &str) -> StorageResult<Vec<String>> {
        self.owners_with_key("user", key).await
    }

    async fn sessions_with_key(&self, key: &str) -> StorageResult<Vec<String>> {
        self.owners_with_key("session", key).await
    }
}

fn parts(scope: &Scope, key: &str) -> (&'static str, String, String) {
    (scope.kind(), scope.owner().to_string(), key.to_string())
}

// ============================================================================
// Error Mapping
// ============================================================================

fn map_sql_error(err: rusqlite::Error) -> StorageError {
    use rusqlite::ffi::ErrorCode;

    match &err {
        rusqlite::Error::SqliteFailure(failure, _)
            if matches!(failure.code, ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked) =>
        {
            StorageError::Unavailable(err.to_string())
        }
        _ => StorageError::Query(err.to_string()),
    }
}

fn map_join_error(err: task::JoinError) -> StorageError {
    if err.is_cancelled() {
        StorageError::Unavailable("blocking task cancelled".into())
    } else {
        StorageError::Query(format!("blocking task failed: {err}"))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    async fn setup() -> (SqliteConfigRepository, TempDir) {
        let dir = TempDir::new().expect("temp dir created");
        let manager = DbManager::new(dir.path().join("config.db"), 4).expect("manager created");
        manager.run_migrations().expect("migrations run");
        (SqliteConfigRepository::new(Arc::new(manager)), dir)
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_get_missing_returns_none() {
        let (repo, _dir) = setup().await;
        assert_eq!(repo.get(&Scope::App, "openproject_instance_url").await.unwrap(), None);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_set_overwrites_and_delete_removes() {
        let (repo, _dir) = setup().await;
        let scope = Scope::user("alice");

        repo.set(&scope, "token", "one").await.unwrap();
        repo.set(&scope, "token", "two").await.unwrap();
        assert_eq!(repo.get(&scope, "token").await.unwrap().as_deref(), Some("two"));

        repo.delete(&scope, "token").await.unwrap();
        assert_eq!(repo.get(&scope, "token").await.unwrap(), None);

        // deleting a missing key is fine
        repo.delete(&scope, "token").await.unwrap();
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_scopes_are_isolated() {
        let (repo, _dir) = setup().await;

        repo.set(&Scope::App, "k", "app").await.unwrap();
        repo.set(&Scope::user("x"), "k", "user").await.unwrap();
        repo.set(&Scope::session("x"), "k", "session").await.unwrap();

        assert_eq!(repo.get(&Scope::App, "k").await.unwrap().as_deref(), Some("app"));
        assert_eq!(repo.get(&Scope::user("x"), "k").await.unwrap().as_deref(), Some("user"));
        assert_eq!(repo.get(&Scope::session("x"), "k").await.unwrap().as_deref(), Some("session"));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_principals_with_key_lists_users_only() {
        let (repo, _dir) = setup().await;

        repo.set(&Scope::user("carol"), "token", "c").await.unwrap();
        repo.set(&Scope::user("alice"), "token", "a").await.unwrap();
        repo.set(&Scope::user("bob"), "search_enabled", "1").await.unwrap();
        repo.set(&Scope::session("dave"), "token", "d").await.unwrap();

        let principals = repo.principals_with_key("token").await.unwrap();
        assert_eq!(principals, vec!["alice".to_string(), "carol".to_string()]);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_sessions_with_key_lists_sessions_only() {
        let (repo, _dir) = setup().await;

        repo.set(&Scope::session("s-2"), "pkce_exchange_state", "{}").await.unwrap();
        repo.set(&Scope::session("s-1"), "pkce_exchange_state", "{}").await.unwrap();
        repo.set(&Scope::user("s-3"), "pkce_exchange_state", "{}").await.unwrap();

        let sessions = repo.sessions_with_key("pkce_exchange_state").await.unwrap();
        assert_eq!(sessions, vec!["s-1".to_string(), "s-2".to_string()]);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_values_survive_reopen() {
        let dir = TempDir::new().expect("temp dir created");
        let path = dir.path().join("config.db");

        {
            let manager = DbManager::new(&path, 2).unwrap();
            manager.run_migrations().unwrap();
            let repo = SqliteConfigRepository::new(Arc::new(manager));
            repo.set(&Scope::App, "authorization_method", "oauth2").await.unwrap();
        }

        let manager = DbManager::new(&path, 2).unwrap();
        manager.run_migrations().unwrap();
        let repo = SqliteConfigRepository::new(Arc::new(manager));
        assert_eq!(repo.get(&Scope::App, "authorization_method").await.unwrap().as_deref(), Some("oauth2"));
    }
}
