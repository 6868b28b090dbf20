//! Custom test assertions for expressive tests
//!
//! Provides trait-based assertions for issued access tokens and
//! introspection responses.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use serde::Deserialize;
use serde_json::Value;

/// JWT header structure
#[derive(Debug, Deserialize)]
struct JwtHeader {
    pub alg: String,
    pub typ: String,
    #[serde(default)]
    pub kid: Option<String>,
}

/// Access token claims as issued by the server
#[derive(Debug, Deserialize)]
struct JwtClaims {
    pub iss: String,
    pub sub: String,
    pub aud: Vec<String>,
    pub client_id: String,
    pub scope: String,
    pub exp: i64,
    pub iat: i64,
    pub jti: String,
}

fn segment(token: &str, index: usize) -> Vec<u8> {
    let part = token
        .split('.')
        .nth(index)
        .unwrap_or_else(|| panic!("JWT has no segment {}", index));
    URL_SAFE_NO_PAD
        .decode(part)
        .unwrap_or_else(|e| panic!("Failed to base64 decode JWT segment {}: {}", index, e))
}

fn header(token: &str) -> JwtHeader {
    serde_json::from_slice(&segment(token, 0)).expect("Failed to parse JWT header")
}

fn claims(token: &str) -> JwtClaims {
    serde_json::from_slice(&segment(token, 1)).expect("Failed to parse JWT claims")
}

/// Custom assertions for access tokens
///
/// # Example
/// ```rust,ignore
/// token
///     .assert_valid_jwt()
///     .assert_has_scope("read")
///     .assert_expires_in(3600);
/// ```
pub trait TokenAssertions {
    /// Assert that the token is a well-formed EdDSA JWT with every access token claim
    fn assert_valid_jwt(&self) -> &Self;

    /// Assert that the token contains the specified scope
    fn assert_has_scope(&self, scope: &str) -> &Self;

    /// Assert that the token was signed by the specified key
    fn assert_signed_by(&self, key_id: &str) -> &Self;

    /// Assert that the token expires within the specified seconds
    fn assert_expires_in(&self, seconds: u64) -> &Self;

    /// Assert that the token is for the specified subject
    fn assert_for_subject(&self, subject: &str) -> &Self;

    /// Assert that the token was issued to the specified client
    fn assert_for_client(&self, client_id: &str) -> &Self;

    /// Assert that the token audience contains `audience`
    fn assert_has_audience(&self, audience: &str) -> &Self;
}

impl TokenAssertions for String {
    fn assert_valid_jwt(&self) -> &Self {
        let parts = self.split('.').count();
        assert_eq!(
            parts, 3,
            "JWT must have 3 parts (header.payload.signature), got {}",
            parts
        );

        let header = header(self);
        assert_eq!(header.alg, "EdDSA", "Expected EdDSA algorithm");
        assert_eq!(header.typ, "JWT", "Expected JWT type");
        assert!(header.kid.is_some(), "Expected a kid header");

        let claims = claims(self);
        assert!(!claims.iss.is_empty(), "Expected a non-empty iss");
        assert!(!claims.jti.is_empty(), "Expected a non-empty jti");
        assert!(claims.exp > claims.iat, "Expected exp after iat");

        self
    }

    fn assert_has_scope(&self, scope: &str) -> &Self {
        let claims = claims(self);
        let scopes: Vec<_> = claims.scope.split_whitespace().collect();
        assert!(
            scopes.contains(&scope),
            "Token does not contain scope '{}'. Available scopes: {}",
            scope,
            claims.scope
        );

        self
    }

    fn assert_signed_by(&self, key_id: &str) -> &Self {
        let header = header(self);
        assert_eq!(
            header.kid.as_deref(),
            Some(key_id),
            "Expected key_id '{}', got {:?}",
            key_id,
            header.kid
        );

        self
    }

    fn assert_expires_in(&self, seconds: u64) -> &Self {
        let claims = claims(self);
        let now = chrono::Utc::now().timestamp();
        let expires_in = claims.exp - now;

        // Allow 5-second tolerance for slow test machines
        assert!(
            (expires_in - seconds as i64).abs() <= 5,
            "Expected token to expire in {} seconds, but expires in {} seconds",
            seconds,
            expires_in
        );

        self
    }

    fn assert_for_subject(&self, subject: &str) -> &Self {
        let claims = claims(self);
        assert_eq!(
            claims.sub, subject,
            "Expected subject '{}', got '{}'",
            subject, claims.sub
        );

        self
    }

    fn assert_for_client(&self, client_id: &str) -> &Self {
        let claims = claims(self);
        assert_eq!(
            claims.client_id, client_id,
            "Expected client_id '{}', got '{}'",
            client_id, claims.client_id
        );

        self
    }

    fn assert_has_audience(&self, audience: &str) -> &Self {
        let claims = claims(self);
        assert!(
            claims.aud.iter().any(|a| a == audience),
            "Token audience {:?} does not contain '{}'",
            claims.aud,
            audience
        );

        self
    }
}

/// Custom assertions for introspection response bodies
pub trait IntrospectionAssertions {
    /// Assert `active: true`
    fn assert_active(&self) -> &Self;

    /// Assert the response is exactly `{"active":false}`
    fn assert_inactive(&self) -> &Self;

    /// Assert the space-delimited `scope` contains `scope`
    fn assert_scope_contains(&self, scope: &str) -> &Self;
}

impl IntrospectionAssertions for Value {
    fn assert_active(&self) -> &Self {
        assert_eq!(
            self["active"],
            Value::Bool(true),
            "Expected an active token, got {}",
            self
        );
        self
    }

    fn assert_inactive(&self) -> &Self {
        assert_eq!(
            self,
            &serde_json::json!({ "active": false }),
            "Inactive response must carry no other field"
        );
        self
    }

    fn assert_scope_contains(&self, scope: &str) -> &Self {
        let scopes = self["scope"].as_str().unwrap_or_default();
        assert!(
            scopes.split_whitespace().any(|s| s == scope),
            "Introspection scope '{}' does not contain '{}'",
            scopes,
            scope
        );
        self
    }
}
