use crate::crypto::{self, AccessTokenClaims};
use crate::errors::AsError;
use crate::models::{JsonWebKey, Jwks};
use base64::{
    engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD},
    Engine as _,
};
use common::secret::{ExposeSecret, SecretBox, SecretString};
use sha2::{Digest, Sha256};
use std::fmt;

/// The Ed25519 key this server signs access tokens with.
///
/// The key ID is derived from the public key, so a key supplied through
/// configuration keeps the same `kid` across restarts.
pub struct ServerSigningKey {
    key_id: String,
    private_key: SecretBox<Vec<u8>>,
    public_key: Vec<u8>,
}

impl fmt::Debug for ServerSigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerSigningKey")
            .field("key_id", &self.key_id)
            .field("private_key", &"[REDACTED]")
            .finish()
    }
}

impl ServerSigningKey {
    /// Generate a fresh key (used when none is configured).
    pub fn generate() -> Result<Self, AsError> {
        let (_, private_key_pkcs8) = crypto::generate_signing_key()?;
        let key = Self::from_pkcs8(private_key_pkcs8)?;
        tracing::info!(key_id = %key.key_id, "Generated ephemeral access token signing key");
        Ok(key)
    }

    /// Accepts v1 or v2 PKCS#8 documents.
    pub fn from_pkcs8(private_key_pkcs8: Vec<u8>) -> Result<Self, AsError> {
        let private_key_pkcs8 = crypto::ed25519_pkcs8_v2(&private_key_pkcs8)?;
        let public_key = crypto::ed25519_public_key(&private_key_pkcs8)?;
        let fingerprint = Sha256::digest(&public_key);
        let key_id = format!("as-{}", hex::encode(fingerprint.get(..8).unwrap_or_default()));

        Ok(Self {
            key_id,
            private_key: SecretBox::new(Box::new(private_key_pkcs8)),
            public_key,
        })
    }

    /// Load from the base64 (standard alphabet) PKCS#8 document in `AS_SIGNING_KEY`.
    pub fn from_base64(encoded: &SecretString) -> Result<Self, AsError> {
        let der = STANDARD
            .decode(encoded.expose_secret().trim())
            .map_err(|e| AsError::Crypto(format!("Invalid signing key encoding: {}", e)))?;
        Self::from_pkcs8(der)
    }

    /// Use the configured key, or generate one.
    pub fn from_config(configured: Option<&SecretString>) -> Result<Self, AsError> {
        match configured {
            Some(encoded) => Self::from_base64(encoded),
            None => Self::generate(),
        }
    }

    pub fn key_id(&self) -> &str {
        &self.key_id
    }

    pub fn public_key(&self) -> &[u8] {
        &self.public_key
    }

    pub fn sign(&self, claims: &AccessTokenClaims) -> Result<String, AsError> {
        crypto::sign_access_token(claims, self.private_key.expose_secret(), &self.key_id)
    }

    pub fn jwk(&self) -> JsonWebKey {
        JsonWebKey {
            kid: self.key_id.clone(),
            kty: "OKP".to_string(),
            crv: "Ed25519".to_string(),
            x: URL_SAFE_NO_PAD.encode(&self.public_key),
            use_: "sig".to_string(),
            alg: "EdDSA".to_string(),
        }
    }
}

/// Public keys resource servers use to verify access tokens offline.
pub fn get_jwks(key: &ServerSigningKey) -> Jwks {
    Jwks {
        keys: vec![key.jwk()],
    }
}
