use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;

/// `grant_type` value for the JWT bearer grant (RFC 7523 Section 2.1).
pub const JWT_BEARER_GRANT_TYPE: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

/// `token_type` reported for issued access tokens.
pub const BEARER_TOKEN_TYPE: &str = "bearer";

/// Access token record (maps to access_tokens table).
///
/// The token value itself is never part of the record; the store keys it by
/// [`TokenKey`].
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct AccessToken {
    /// `jti` of the signed access token.
    pub token_id: String,
    /// Client the token was issued to.
    pub client_id: String,
    /// `iss` of the assertion the token was granted for.
    pub assertion_issuer: String,
    pub subject: String,
    pub audience: Vec<String>,
    pub scopes: Vec<String>,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub revoked: bool,
}

impl AccessToken {
    /// A token whose expiry equals `now` is already dead.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        !self.revoked && !self.is_expired(now)
    }
}

/// Store key for an access token: hex SHA-256 of the token value.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct TokenKey(String);

impl TokenKey {
    pub fn from_token(token: &str) -> Self {
        TokenKey(hex::encode(Sha256::digest(token.as_bytes())))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for TokenKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Prefix is enough to correlate log lines.
        let prefix = self.0.get(..8).unwrap_or(&self.0);
        write!(f, "TokenKey({}..)", prefix)
    }
}

/// Outcome of an introspection that passed caller authorization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntrospectionResult {
    Inactive,
    Active(AccessToken),
}

impl IntrospectionResult {
    pub fn is_active(&self) -> bool {
        matches!(self, IntrospectionResult::Active(_))
    }
}

/// Token response (RFC 6749 Section 5.1)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: u64,
    pub scope: String,
}

/// Introspection response (RFC 7662 Section 2.2)
///
/// An inactive token serializes as `{"active":false}` and nothing else.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntrospectionResponse {
    pub active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aud: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
}

impl IntrospectionResponse {
    pub fn inactive() -> Self {
        IntrospectionResponse::default()
    }

    /// Build the wire response; `issuer` is this server's `iss`.
    pub fn from_result(result: IntrospectionResult, issuer: &str) -> Self {
        match result {
            IntrospectionResult::Inactive => IntrospectionResponse::inactive(),
            IntrospectionResult::Active(token) => IntrospectionResponse {
                active: true,
                scope: Some(common::scope::join_scope(&token.scopes)),
                client_id: Some(token.client_id),
                token_type: Some(BEARER_TOKEN_TYPE.to_string()),
                exp: Some(token.expires_at.timestamp()),
                iat: Some(token.issued_at.timestamp()),
                sub: Some(token.subject),
                aud: Some(token.audience),
                iss: Some(issuer.to_string()),
            },
        }
    }
}

/// JWKS response (RFC 7517)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Jwks {
    pub keys: Vec<JsonWebKey>,
}

/// JSON Web Key (RFC 7517)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonWebKey {
    pub kid: String, // Key ID
    pub kty: String, // Key Type ("OKP" for EdDSA)
    pub crv: String, // Curve ("Ed25519")
    pub x: String,   // Public key (base64url encoded)
    #[serde(rename = "use")]
    pub use_: String, // Public key use ("sig")
    pub alg: String, // Algorithm ("EdDSA")
}

/// Signature algorithm of a trusted issuer key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum KeyAlgorithm {
    #[serde(rename = "EdDSA")]
    EdDsa,
    #[serde(rename = "ES256")]
    Es256,
}

impl KeyAlgorithm {
    pub fn as_str(&self) -> &'static str {
        match self {
            KeyAlgorithm::EdDsa => "EdDSA",
            KeyAlgorithm::Es256 => "ES256",
        }
    }
}

impl FromStr for KeyAlgorithm {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "EdDSA" => Ok(KeyAlgorithm::EdDsa),
            "ES256" => Ok(KeyAlgorithm::Es256),
            _ => Err(format!("Unsupported key algorithm: {}", s)),
        }
    }
}

/// A registered OAuth client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientRegistration {
    pub client_id: String,
    /// Bcrypt hash; public clients have none.
    #[serde(default)]
    pub client_secret_hash: Option<String>,
    #[serde(default)]
    pub grant_types: Vec<String>,
    #[serde(default)]
    pub scopes: Vec<String>,
    /// Reject requests whose scope shares nothing with `scopes`.
    #[serde(default)]
    pub strict_scope: bool,
}

impl ClientRegistration {
    pub fn allows_grant_type(&self, grant_type: &str) -> bool {
        self.grant_types.iter().any(|g| g == grant_type)
    }
}

/// A public key trusted to sign assertions for `issuer`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrustedKeyEntry {
    pub issuer: String,
    pub key_id: String,
    pub algorithm: KeyAlgorithm,
    /// Base64url raw key: 32-byte Ed25519 key or 65-byte uncompressed P-256 point.
    pub public_key: String,
}

/// Registry file contents.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegistryDocument {
    #[serde(default)]
    pub clients: Vec<ClientRegistration>,
    #[serde(default)]
    pub trusted_keys: Vec<TrustedKeyEntry>,
}
