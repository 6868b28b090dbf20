use crate::crypto::PublicKey;
use crate::errors::AsError;
use crate::models::TrustedKeyEntry;
use async_trait::async_trait;
use common::jwt::decode_public_key_b64url;
use std::collections::HashMap;

/// Resolves `(issuer, key_id)` to a key trusted to sign that issuer's assertions.
#[async_trait]
pub trait KeyRegistry: Send + Sync {
    /// `Ok(None)` means the pair is not trusted.
    async fn resolve(&self, issuer: &str, key_id: &str) -> Result<Option<PublicKey>, AsError>;
}

/// Key registry loaded once from configuration.
#[derive(Debug, Default)]
pub struct StaticKeyRegistry {
    keys: HashMap<(String, String), PublicKey>,
}

impl StaticKeyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from registry file entries. Duplicate `(issuer, key_id)` pairs
    /// are rejected so a later entry cannot silently replace a trusted key.
    pub fn from_entries(entries: &[TrustedKeyEntry]) -> Result<Self, AsError> {
        let mut registry = Self::new();
        for entry in entries {
            let raw = decode_public_key_b64url(&entry.public_key).map_err(|e| {
                AsError::Crypto(format!(
                    "Invalid public key encoding for key {}: {}",
                    entry.key_id, e
                ))
            })?;
            let key = PublicKey::from_raw(entry.algorithm, raw)?;
            if registry.keys.contains_key(&(entry.issuer.clone(), entry.key_id.clone())) {
                return Err(AsError::Crypto(format!(
                    "Duplicate trusted key {} for issuer {}",
                    entry.key_id, entry.issuer
                )));
            }
            registry.insert(&entry.issuer, &entry.key_id, key);
        }
        Ok(registry)
    }

    pub fn insert(&mut self, issuer: &str, key_id: &str, key: PublicKey) {
        self.keys
            .insert((issuer.to_string(), key_id.to_string()), key);
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

#[async_trait]
impl KeyRegistry for StaticKeyRegistry {
    async fn resolve(&self, issuer: &str, key_id: &str) -> Result<Option<PublicKey>, AsError> {
        Ok(self
            .keys
            .get(&(issuer.to_string(), key_id.to_string()))
            .cloned())
    }
}
