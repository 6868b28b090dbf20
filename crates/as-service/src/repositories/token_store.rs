use crate::errors::AsError;
use crate::models::{AccessToken, TokenKey};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Persistence for issued access tokens and seen assertion IDs.
///
/// Each call reads or writes a single record atomically; there are no
/// multi-record transactions. Implementations must be safe under any number
/// of concurrent callers.
#[async_trait]
pub trait TokenStore: Send + Sync {
    /// Store a newly issued token. Records are immutable apart from revocation.
    async fn put(&self, key: &TokenKey, token: &AccessToken) -> Result<(), AsError>;

    async fn get(&self, key: &TokenKey) -> Result<Option<AccessToken>, AsError>;

    /// Mark a token revoked. Returns `false` when no such token exists.
    async fn revoke(&self, key: &TokenKey) -> Result<bool, AsError>;

    /// Remember an assertion `jti` until `expires_at`.
    ///
    /// Returns `false` if the same issuer already used `jti` and that
    /// assertion has not yet expired.
    async fn record_assertion_id(
        &self,
        issuer: &str,
        jti: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<bool, AsError>;

    /// Delete tokens and assertion IDs that expired before `cutoff`.
    /// Returns the number of records removed.
    async fn purge_expired(&self, cutoff: DateTime<Utc>) -> Result<u64, AsError>;
}

/// Process-local token store.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    tokens: RwLock<HashMap<TokenKey, AccessToken>>,
    assertion_ids: RwLock<HashMap<(String, String), DateTime<Utc>>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored tokens, including expired and revoked ones.
    pub async fn len(&self) -> usize {
        self.tokens.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.tokens.read().await.is_empty()
    }
}

#[async_trait]
impl TokenStore for MemoryTokenStore {
    async fn put(&self, key: &TokenKey, token: &AccessToken) -> Result<(), AsError> {
        self.tokens.write().await.insert(key.clone(), token.clone());
        Ok(())
    }

    async fn get(&self, key: &TokenKey) -> Result<Option<AccessToken>, AsError> {
        Ok(self.tokens.read().await.get(key).cloned())
    }

    async fn revoke(&self, key: &TokenKey) -> Result<bool, AsError> {
        match self.tokens.write().await.get_mut(key) {
            Some(token) => {
                token.revoked = true;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn record_assertion_id(
        &self,
        issuer: &str,
        jti: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<bool, AsError> {
        let now = Utc::now();
        let mut seen = self.assertion_ids.write().await;

        // Expired entries can never match again.
        seen.retain(|_, exp| *exp > now);

        let id = (issuer.to_string(), jti.to_string());
        if seen.contains_key(&id) {
            return Ok(false);
        }
        seen.insert(id, expires_at);
        Ok(true)
    }

    async fn purge_expired(&self, cutoff: DateTime<Utc>) -> Result<u64, AsError> {
        let mut tokens = self.tokens.write().await;
        let before = tokens.len();
        tokens.retain(|_, t| t.expires_at >= cutoff);
        let mut removed = before - tokens.len();
        drop(tokens);

        let mut seen = self.assertion_ids.write().await;
        let before = seen.len();
        seen.retain(|_, exp| *exp >= cutoff);
        removed += before - seen.len();

        Ok(removed as u64)
    }
}
