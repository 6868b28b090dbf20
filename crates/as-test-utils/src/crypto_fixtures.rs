//! Cryptographic fixtures for testing
//!
//! Ed25519 keys are deterministic: the same seed always yields the same
//! key pair. P-256 keys come from the system RNG since ring offers no seeded
//! ECDSA generation; tests using them must not depend on key bytes.

use as_service::models::{KeyAlgorithm, TrustedKeyEntry};
use as_service::services::key_management_service::ServerSigningKey;
use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use base64::Engine;
use ring::rand::SystemRandom;
use ring::signature::{
    EcdsaKeyPair, Ed25519KeyPair, KeyPair, ECDSA_P256_SHA256_FIXED_SIGNING,
};
use thiserror::Error;

/// Test fixture error type
#[derive(Error, Debug)]
pub enum FixtureError {
    #[error("Cryptographic operation failed: {0}")]
    Crypto(String),
}

/// An assertion-signing key held by a test issuer.
#[derive(Clone)]
pub struct TestKeyPair {
    pub algorithm: KeyAlgorithm,
    /// PKCS#8 document, as `jsonwebtoken::EncodingKey` expects it.
    pub private_key_pkcs8: Vec<u8>,
    /// Raw public key (32 bytes Ed25519, 65 bytes uncompressed P-256).
    pub public_key: Vec<u8>,
}

impl TestKeyPair {
    /// Base64url public key, the form used in the registry file.
    pub fn public_key_b64url(&self) -> String {
        URL_SAFE_NO_PAD.encode(&self.public_key)
    }

    /// Registry entry trusting this key for `issuer` under `key_id`.
    pub fn trusted_key_entry(&self, issuer: &str, key_id: &str) -> TrustedKeyEntry {
        TrustedKeyEntry {
            issuer: issuer.to_string(),
            key_id: key_id.to_string(),
            algorithm: self.algorithm,
            public_key: self.public_key_b64url(),
        }
    }
}

/// Generate a deterministic Ed25519 key for testing.
///
/// # Example
/// ```rust,ignore
/// let key = test_ed25519_key(1)?;
/// assert_eq!(key.public_key, test_ed25519_key(1)?.public_key);
/// ```
pub fn test_ed25519_key(seed: u8) -> Result<TestKeyPair, FixtureError> {
    let seed_bytes = seed_bytes(seed);

    let key_pair = Ed25519KeyPair::from_seed_unchecked(&seed_bytes)
        .map_err(|e| FixtureError::Crypto(format!("Failed to generate test keypair: {:?}", e)))?;
    let public_key = key_pair.public_key().as_ref().to_vec();

    let private_key_pkcs8 = build_pkcs8_v2(&seed_bytes, &public_key);

    Ok(TestKeyPair {
        algorithm: KeyAlgorithm::EdDsa,
        private_key_pkcs8,
        public_key,
    })
}

/// Generate a fresh ES256 (P-256) key for testing.
pub fn test_es256_key() -> Result<TestKeyPair, FixtureError> {
    let rng = SystemRandom::new();
    let pkcs8 = EcdsaKeyPair::generate_pkcs8(&ECDSA_P256_SHA256_FIXED_SIGNING, &rng)
        .map_err(|e| FixtureError::Crypto(format!("Failed to generate P-256 key: {:?}", e)))?;
    let key_pair =
        EcdsaKeyPair::from_pkcs8(&ECDSA_P256_SHA256_FIXED_SIGNING, pkcs8.as_ref(), &rng)
            .map_err(|e| FixtureError::Crypto(format!("Failed to parse P-256 key: {:?}", e)))?;

    Ok(TestKeyPair {
        algorithm: KeyAlgorithm::Es256,
        private_key_pkcs8: pkcs8.as_ref().to_vec(),
        public_key: key_pair.public_key().as_ref().to_vec(),
    })
}

/// Deterministic access token signing key for the test server.
pub fn test_server_signing_key() -> Result<ServerSigningKey, FixtureError> {
    let key = test_ed25519_key(200)?;
    ServerSigningKey::from_pkcs8(key.private_key_pkcs8)
        .map_err(|e| FixtureError::Crypto(format!("Failed to load server key: {}", e)))
}

/// Base64 (standard alphabet) PKCS#8 document, the `AS_SIGNING_KEY` format.
pub fn encode_signing_key(key: &TestKeyPair) -> String {
    STANDARD.encode(&key.private_key_pkcs8)
}

fn seed_bytes(seed: u8) -> [u8; 32] {
    let mut seed_bytes = [0u8; 32];
    for (i, byte) in seed_bytes.iter_mut().enumerate() {
        *byte = seed.wrapping_mul(i as u8).wrapping_add(i as u8).wrapping_add(seed);
    }
    seed_bytes
}

/// Build a PKCS#8 v2 document (RFC 8410 / RFC 5958) for an Ed25519 key.
///
/// Test-only: production keys come from `ring::rand::SystemRandom`.
fn build_pkcs8_v2(seed: &[u8; 32], public_key: &[u8]) -> Vec<u8> {
    let mut pkcs8 = Vec::with_capacity(85);

    // OneAsymmetricKey SEQUENCE, 83 bytes
    pkcs8.extend_from_slice(&[0x30, 0x53]);
    // version: INTEGER 1 (v2)
    pkcs8.extend_from_slice(&[0x02, 0x01, 0x01]);
    // AlgorithmIdentifier: OID 1.3.101.112 (Ed25519)
    pkcs8.extend_from_slice(&[0x30, 0x05, 0x06, 0x03, 0x2b, 0x65, 0x70]);
    // privateKey: OCTET STRING { OCTET STRING seed }
    pkcs8.extend_from_slice(&[0x04, 0x22, 0x04, 0x20]);
    pkcs8.extend_from_slice(seed);
    // publicKey: [1] BIT STRING
    pkcs8.extend_from_slice(&[0xa1, 0x23, 0x03, 0x21, 0x00]);
    pkcs8.extend_from_slice(public_key);

    pkcs8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ed25519_key_is_deterministic() {
        let first = test_ed25519_key(1).unwrap();
        let second = test_ed25519_key(1).unwrap();

        assert_eq!(first.public_key, second.public_key);
        assert_eq!(first.private_key_pkcs8, second.private_key_pkcs8);
        assert_eq!(first.public_key.len(), 32);
    }

    #[test]
    fn test_different_seeds_produce_different_keys() {
        let first = test_ed25519_key(1).unwrap();
        let second = test_ed25519_key(2).unwrap();
        assert_ne!(first.public_key, second.public_key);
    }

    #[test]
    fn test_pkcs8_document_is_accepted_by_ring() {
        let key = test_ed25519_key(7).unwrap();
        let parsed = Ed25519KeyPair::from_pkcs8(&key.private_key_pkcs8).unwrap();
        assert_eq!(parsed.public_key().as_ref(), key.public_key.as_slice());
    }

    #[test]
    fn test_es256_key_shape() {
        let key = test_es256_key().unwrap();
        assert_eq!(key.public_key.len(), 65);
        assert_eq!(key.public_key.first(), Some(&0x04));
    }

    #[test]
    fn test_server_signing_key_is_stable() {
        let first = test_server_signing_key().unwrap();
        let second = test_server_signing_key().unwrap();
        assert_eq!(first.key_id(), second.key_id());
    }

    #[test]
    fn test_trusted_key_entry() {
        let key = test_ed25519_key(3).unwrap();
        let entry = key.trusted_key_entry("issuer-a", "key-1");

        assert_eq!(entry.issuer, "issuer-a");
        assert_eq!(entry.algorithm, KeyAlgorithm::EdDsa);
        assert_eq!(URL_SAFE_NO_PAD.decode(&entry.public_key).unwrap(), key.public_key);
    }
}
