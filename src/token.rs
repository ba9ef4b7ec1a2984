//! Access token persistence
//!
//! Storage failures must not take the client down: writes are logged and
//! dropped, reads fall back to "no token".

use crate::storage::{keys, store_get_json, store_set_json, BoxedStateStore};
use tracing::{debug, warn};

/// Bearer token kept in the local state store
#[derive(Clone)]
pub struct TokenStore {
    store: BoxedStateStore,
}

impl TokenStore {
    /// Wrap a state store
    pub fn new(store: BoxedStateStore) -> Self {
        Self { store }
    }

    /// Remember the token returned by login/signup
    pub async fn set_access_token(&self, token: &str) {
        match store_set_json(self.store.as_ref(), keys::ACCESS_TOKEN, &token).await {
            Ok(()) => debug!(store = self.store.name(), "Access token saved"),
            Err(e) => warn!(error = %e, "Failed to save access token"),
        }
    }

    /// Current token, if any
    pub async fn access_token(&self) -> Option<String> {
        match store_get_json::<String>(self.store.as_ref(), keys::ACCESS_TOKEN).await {
            Ok(token) => token.filter(|t| !t.is_empty()),
            Err(e) => {
                warn!(error = %e, "Failed to read access token");
                None
            }
        }
    }

    /// Forget the token (logout)
    pub async fn remove_access_token(&self) {
        let result = match self.store.delete(keys::ACCESS_TOKEN).await {
            Ok(()) => self.store.flush().await,
            Err(e) => Err(e),
        };
        if let Err(e) = result {
            warn!(error = %e, "Failed to remove access token");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ClockError, Result};
    use crate::storage::{memory_store, StateStore};
    use async_trait::async_trait;
    use std::sync::Arc;

    struct BrokenStore;

    #[async_trait]
    impl StateStore for BrokenStore {
        async fn get(&self, _key: &str) -> Result<Option<Vec<u8>>> {
            Err(ClockError::storage("disk gone"))
        }
        async fn set(&self, _key: &str, _value: Vec<u8>) -> Result<()> {
            Err(ClockError::storage("disk gone"))
        }
        async fn delete(&self, _key: &str) -> Result<()> {
            Err(ClockError::storage("disk gone"))
        }
        async fn list_prefix(&self, _prefix: &str) -> Result<Vec<String>> {
            Err(ClockError::storage("disk gone"))
        }
        fn name(&self) -> &str {
            "broken"
        }
    }

    #[tokio::test]
    async fn test_token_roundtrip_and_removal() {
        let tokens = TokenStore::new(memory_store());
        assert!(tokens.access_token().await.is_none());

        tokens.set_access_token("jwt-123").await;
        assert_eq!(tokens.access_token().await.as_deref(), Some("jwt-123"));

        tokens.remove_access_token().await;
        assert!(tokens.access_token().await.is_none());
    }

    #[tokio::test]
    async fn test_empty_token_treated_as_missing() {
        let tokens = TokenStore::new(memory_store());
        tokens.set_access_token("").await;
        assert!(tokens.access_token().await.is_none());
    }

    #[tokio::test]
    async fn test_storage_failures_are_swallowed() {
        let tokens = TokenStore::new(Arc::new(BrokenStore));
        tokens.set_access_token("jwt").await;
        assert!(tokens.access_token().await.is_none());
        tokens.remove_access_token().await;
    }
}
