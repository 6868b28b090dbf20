//! Builder patterns for test data construction
//!
//! Provides fluent APIs for signed assertions and registry documents.

use crate::crypto_fixtures::TestKeyPair;
use crate::test_ids::{TEST_AUDIENCES, TEST_SCOPE, TEST_SUBJECT};
use as_service::models::{
    ClientRegistration, KeyAlgorithm, RegistryDocument, TrustedKeyEntry, JWT_BEARER_GRANT_TYPE,
};
use chrono::{Duration, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde_json::{json, Map, Value};

/// Builder for signed JWT bearer assertions.
///
/// Defaults: subject [`TEST_SUBJECT`], audience [`TEST_AUDIENCES`], expiry in
/// one hour, `iat` now, a random `jti`.
///
/// # Example
/// ```rust,ignore
/// let assertion = AssertionBuilder::new("my-issuer", "key-1")
///     .expires_in(600)
///     .without_jti()
///     .sign(&key);
/// ```
pub struct AssertionBuilder {
    issuer: Option<String>,
    key_id: Option<String>,
    subject: Option<String>,
    audience: Option<Value>,
    exp: Option<i64>,
    iat: Option<i64>,
    jti: Option<String>,
}

impl AssertionBuilder {
    pub fn new(issuer: &str, key_id: &str) -> Self {
        let now = Utc::now();
        Self {
            issuer: Some(issuer.to_string()),
            key_id: Some(key_id.to_string()),
            subject: Some(TEST_SUBJECT.to_string()),
            audience: Some(json!(TEST_AUDIENCES)),
            exp: Some((now + Duration::hours(1)).timestamp()),
            iat: Some(now.timestamp()),
            jti: Some(uuid::Uuid::new_v4().to_string()),
        }
    }

    pub fn subject(mut self, subject: &str) -> Self {
        self.subject = Some(subject.to_string());
        self
    }

    /// `aud` as an array.
    pub fn audience(mut self, audience: &[&str]) -> Self {
        self.audience = Some(json!(audience));
        self
    }

    /// `aud` as a single string.
    pub fn single_audience(mut self, audience: &str) -> Self {
        self.audience = Some(json!(audience));
        self
    }

    /// Expiry in seconds from now (negative for an expired assertion).
    pub fn expires_in(mut self, seconds: i64) -> Self {
        self.exp = Some((Utc::now() + Duration::seconds(seconds)).timestamp());
        self
    }

    /// `iat` in seconds from now (positive for an assertion from the future).
    pub fn issued_in(mut self, seconds: i64) -> Self {
        self.iat = Some((Utc::now() + Duration::seconds(seconds)).timestamp());
        self
    }

    pub fn jti(mut self, jti: &str) -> Self {
        self.jti = Some(jti.to_string());
        self
    }

    pub fn without_subject(mut self) -> Self {
        self.subject = None;
        self
    }

    pub fn without_audience(mut self) -> Self {
        self.audience = None;
        self
    }

    pub fn without_expiry(mut self) -> Self {
        self.exp = None;
        self
    }

    pub fn without_iat(mut self) -> Self {
        self.iat = None;
        self
    }

    pub fn without_jti(mut self) -> Self {
        self.jti = None;
        self
    }

    pub fn without_key_id(mut self) -> Self {
        self.key_id = None;
        self
    }

    /// Build the claims as a JSON object.
    pub fn claims(&self) -> Value {
        let mut claims = Map::new();
        if let Some(iss) = &self.issuer {
            claims.insert("iss".to_string(), json!(iss));
        }
        if let Some(sub) = &self.subject {
            claims.insert("sub".to_string(), json!(sub));
        }
        if let Some(aud) = &self.audience {
            claims.insert("aud".to_string(), aud.clone());
        }
        if let Some(exp) = self.exp {
            claims.insert("exp".to_string(), json!(exp));
        }
        if let Some(iat) = self.iat {
            claims.insert("iat".to_string(), json!(iat));
        }
        if let Some(jti) = &self.jti {
            claims.insert("jti".to_string(), json!(jti));
        }
        Value::Object(claims)
    }

    /// Sign the assertion with `key`.
    pub fn sign(&self, key: &TestKeyPair) -> String {
        let (algorithm, encoding_key) = match key.algorithm {
            KeyAlgorithm::EdDsa => (
                Algorithm::EdDSA,
                EncodingKey::from_ed_der(&key.private_key_pkcs8),
            ),
            KeyAlgorithm::Es256 => (
                Algorithm::ES256,
                EncodingKey::from_ec_der(&key.private_key_pkcs8),
            ),
        };

        let mut header = Header::new(algorithm);
        header.kid = self.key_id.clone();

        encode(&header, &self.claims(), &encoding_key).expect("Failed to sign test assertion")
    }
}

/// Builder for the registry document loaded at startup.
///
/// # Example
/// ```rust,ignore
/// let registry = RegistryBuilder::new()
///     .public_client("my-issuer")
///     .trusted_key(key.trusted_key_entry("my-issuer", "key-1"))
///     .build();
/// ```
#[derive(Default)]
pub struct RegistryBuilder {
    document: RegistryDocument,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Client without a secret, allowed the JWT bearer grant and [`TEST_SCOPE`].
    pub fn public_client(self, client_id: &str) -> Self {
        self.client(test_client(client_id, None))
    }

    /// Client authenticating with `secret_hash`.
    pub fn confidential_client(self, client_id: &str, secret_hash: &str) -> Self {
        self.client(test_client(client_id, Some(secret_hash.to_string())))
    }

    pub fn client(mut self, client: ClientRegistration) -> Self {
        self.document.clients.push(client);
        self
    }

    pub fn trusted_key(mut self, entry: TrustedKeyEntry) -> Self {
        self.document.trusted_keys.push(entry);
        self
    }

    pub fn build(self) -> RegistryDocument {
        self.document
    }
}

/// Registration allowed the JWT bearer grant and [`TEST_SCOPE`].
pub fn test_client(client_id: &str, secret_hash: Option<String>) -> ClientRegistration {
    ClientRegistration {
        client_id: client_id.to_string(),
        client_secret_hash: secret_hash,
        grant_types: vec![JWT_BEARER_GRANT_TYPE.to_string()],
        scopes: vec![TEST_SCOPE.to_string()],
        strict_scope: false,
    }
}
