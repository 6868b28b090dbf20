use crate::crypto;
use crate::errors::AsError;
use crate::models::ClientRegistration;
use crate::observability::hash_for_correlation;
use crate::observability::metrics::record_bcrypt_duration;
use crate::repositories::ClientRegistry;
use common::secret::{ExposeSecret, SecretString};
use std::sync::Arc;
use std::time::Instant;
use tracing::instrument;

/// Verified against when the client is unknown or has no secret, so every
/// secret check costs one bcrypt verification.
const DUMMY_BCRYPT_HASH: &str = "$2b$12$LQv3c1yqBWVHxkd0LHAkCOYz6TtxMQJqhN8/LewY5GyYqExt7YD3a";

/// Client credentials presented on a token request.
#[derive(Debug, Clone)]
pub struct ClientCredentials {
    pub client_id: String,
    pub client_secret: Option<SecretString>,
}

/// Authenticates the client making a token request.
pub struct ClientAuthenticator {
    registry: Arc<ClientRegistry>,
    skip_client_auth: bool,
}

impl ClientAuthenticator {
    pub fn new(registry: Arc<ClientRegistry>, skip_client_auth: bool) -> Self {
        Self {
            registry,
            skip_client_auth,
        }
    }

    /// Resolve the requesting client.
    ///
    /// With credentials, the client must exist and the secret must match its
    /// hash (public clients present no secret and have none registered).
    /// Without credentials, the request is only accepted when client
    /// authentication is skipped, and the client is the one registered under
    /// the assertion's issuer.
    #[instrument(skip_all, name = "as.client.authenticate", fields(status))]
    pub fn authenticate(
        &self,
        credentials: Option<&ClientCredentials>,
        assertion_issuer: &str,
    ) -> Result<ClientRegistration, AsError> {
        let result = match credentials {
            Some(credentials) => self.verify_credentials(credentials),
            None if self.skip_client_auth => {
                self.registry.get(assertion_issuer).cloned().ok_or_else(|| {
                    tracing::debug!(
                        target: "as.client",
                        issuer = %hash_for_correlation(assertion_issuer),
                        "No client registered for assertion issuer"
                    );
                    AsError::InvalidClient
                })
            }
            None => Err(AsError::InvalidClient),
        };

        let status = if result.is_ok() { "success" } else { "error" };
        tracing::Span::current().record("status", status);
        result
    }

    fn verify_credentials(
        &self,
        credentials: &ClientCredentials,
    ) -> Result<ClientRegistration, AsError> {
        let client = self.registry.get(&credentials.client_id);
        let stored_hash = client.and_then(|c| c.client_secret_hash.as_deref());

        let secret_matches = match &credentials.client_secret {
            Some(secret) => {
                let start = Instant::now();
                let valid = crypto::verify_client_secret(
                    secret.expose_secret(),
                    stored_hash.unwrap_or(DUMMY_BCRYPT_HASH),
                )?;
                record_bcrypt_duration("verify", start.elapsed());
                valid && stored_hash.is_some()
            }
            // Public client: no secret presented, none registered.
            None => stored_hash.is_none(),
        };

        match client {
            Some(client) if secret_matches => Ok(client.clone()),
            _ => {
                tracing::debug!(
                    target: "as.client",
                    client = %hash_for_correlation(&credentials.client_id),
                    "Client authentication failed"
                );
                Err(AsError::InvalidClient)
            }
        }
    }
}
