//! In-process [`ConfigRepository`] backed by a `DashMap`.
//!
//! Used by tests and by deployments that do not need durability.

use async_trait::async_trait;
use dashmap::DashMap;

use super::error::StorageResult;
use super::repository::{ConfigRepository, Scope};

/// Thread-safe in-memory settings store.
#[derive(Debug, Default)]
pub struct InMemoryConfigRepository {
    entries: DashMap<(Scope, String), String>,
}

impl InMemoryConfigRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries across all scopes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn owners_with_key(&self, key: &str, owner: impl Fn(&Scope) -> Option<&String>) -> Vec<String> {
        let mut owners: Vec<String> = self
            .entries
            .iter()
            .filter(|entry| entry.key().1 == key)
            .filter_map(|entry| owner(&entry.key().0).cloned())
            .collect();
        owners.sort();
        owners
    }
}

#[async_trait]
impl ConfigRepository for InMemoryConfigRepository {
    async fn get(&self, scope: &Scope, key: &str) -> StorageResult<Option<String>> {
        Ok(self.entries.get(&(scope.clone(), key.to_string())).map(|v| v.value().clone()))
    }

    async fn set(&self, scope: &Scope, key: &str, value: &str) -> StorageResult<()> {
        self.entries.insert((scope.clone(), key.to_string()), value.to_string());
        Ok(())
    }

    async fn delete(&self, scope: &Scope, key: &str) -> StorageResult<()> {
        self.entries.remove(&(scope.clone(), key.to_string()));
        Ok(())
    }

    async fn principals_with_key(&self, key: &str) -> StorageResult<Vec<String>> {
        Ok(self.owners_with_key(key, |scope| match scope {
            Scope::User(id) => Some(id),
            _ => None,
        }))
    }

    async fn sessions_with_key(&self, key: &str) -> StorageResult<Vec<String>> {
        Ok(self.owners_with_key(key, |scope| match scope {
            Scope::Session(id) => Some(id),
            _ => None,
        }))
    }
}
