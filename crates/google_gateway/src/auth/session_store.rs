//! Session storage backends
//!
//! The gateway only ever talks to [`SessionStore`]; the in-memory map below
//! is the default backend. Records have no expiry of their own and are lost
//! when the process restarts.

use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;

use super::credentials::CredentialPair;

#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn get(&self, key: &str) -> Option<CredentialPair>;

    /// Insert or replace the record for `key`.
    async fn set(&self, key: &str, pair: CredentialPair);

    /// Returns whether a record was removed.
    async fn delete(&self, key: &str) -> bool;

    async fn contains(&self, key: &str) -> bool {
        self.get(key).await.is_some()
    }

    /// Insert only if `key` is vacant. Returns false when a record already exists.
    async fn insert_new(&self, key: &str, pair: CredentialPair) -> bool;

    /// Overwrite an existing record. Returns false, storing nothing, when
    /// `key` has no record (e.g. it was deleted meanwhile).
    async fn replace(&self, key: &str, pair: CredentialPair) -> bool;

    async fn len(&self) -> usize;

    async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

/// Process-local session store backed by a concurrent map
#[derive(Clone, Default)]
pub struct InMemorySessionStore {
    sessions: Arc<DashMap<String, CredentialPair>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn get(&self, key: &str) -> Option<CredentialPair> {
        self.sessions.get(key).map(|entry| entry.value().clone())
    }

    async fn set(&self, key: &str, pair: CredentialPair) {
        self.sessions.insert(key.to_string(), pair);
    }

    async fn delete(&self, key: &str) -> bool {
        self.sessions.remove(key).is_some()
    }

    async fn contains(&self, key: &str) -> bool {
        self.sessions.contains_key(key)
    }

    async fn insert_new(&self, key: &str, pair: CredentialPair) -> bool {
        match self.sessions.entry(key.to_string()) {
            dashmap::mapref::entry::Entry::Occupied(_) => false,
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(pair);
                true
            }
        }
    }

    async fn replace(&self, key: &str, pair: CredentialPair) -> bool {
        match self.sessions.get_mut(key) {
            Some(mut entry) => {
                *entry = pair;
                true
            }
            None => false,
        }
    }

    async fn len(&self) -> usize {
        self.sessions.len()
    }

    async fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair(token: &str) -> CredentialPair {
        CredentialPair::bearer(token)
    }

    #[tokio::test]
    async fn test_set_get_delete() {
        let store = InMemorySessionStore::new();
        assert!(store.get("s1").await.is_none());

        store.set("s1", pair("a")).await;
        assert_eq!(store.get("s1").await, Some(pair("a")));
        assert!(store.contains("s1").await);
        assert_eq!(store.len().await, 1);

        assert!(store.delete("s1").await);
        assert!(!store.delete("s1").await);
        assert!(store.get("s1").await.is_none());
    }

    #[tokio::test]
    async fn test_set_replaces() {
        let store = InMemorySessionStore::new();
        store
            .set(
                "s1",
                CredentialPair {
                    access_token: "a".into(),
                    refresh_token: Some("r".into()),
                    expires_at: None,
                },
            )
            .await;
        store.set("s1", pair("b")).await;

        // Replaced wholesale, the old refresh token is gone
        assert_eq!(store.get("s1").await, Some(pair("b")));
    }

    #[tokio::test]
    async fn test_insert_new_refuses_occupied_key() {
        let store = InMemorySessionStore::new();
        assert!(store.insert_new("s1", pair("a")).await);
        assert!(!store.insert_new("s1", pair("b")).await);
        assert_eq!(store.get("s1").await, Some(pair("a")));
    }

    #[tokio::test]
    async fn test_replace_only_touches_live_records() {
        let store = InMemorySessionStore::new();
        assert!(!store.replace("gone", pair("a")).await);
        assert!(store.get("gone").await.is_none());
        assert!(store.is_empty().await);

        store.set("s1", pair("a")).await;
        assert!(store.replace("s1", pair("b")).await);
        assert_eq!(store.get("s1").await, Some(pair("b")));
        assert!(!store.is_empty().await);
    }

    #[tokio::test]
    async fn test_clones_share_state() {
        let store = InMemorySessionStore::new();
        let other = store.clone();
        store.set("s1", pair("a")).await;
        assert_eq!(other.get("s1").await, Some(pair("a")));
    }
}
