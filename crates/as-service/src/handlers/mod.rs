//! HTTP request handlers.
//!
//! - `token_handler` - `POST /oauth2/token` (JWT bearer grant)
//! - `introspection_handler` - `POST /oauth2/introspect`
//! - `revocation_handler` - `POST /oauth2/revoke`
//! - `jwks_handler` - `GET /.well-known/jwks.json`
//! - `health` - `GET /health`, `GET /metrics`

pub mod health;
pub mod introspection_handler;
pub mod jwks_handler;
pub mod revocation_handler;
pub mod token_handler;

use crate::config::Config;
use crate::errors::AsError;
use crate::models::RegistryDocument;
use crate::repositories::{ClientRegistry, StaticKeyRegistry, TokenStore};
use crate::services::assertion_validator::{AssertionPolicy, AssertionValidator};
use crate::services::authorization_boundary::boundary_for;
use crate::services::client_service::ClientAuthenticator;
use crate::services::grant_service::GrantIssuer;
use crate::services::introspection_service::IntrospectionService;
use crate::services::key_management_service::ServerSigningKey;
use crate::services::revocation_service::RevocationService;
use std::sync::Arc;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub validator: Arc<AssertionValidator>,
    pub clients: Arc<ClientAuthenticator>,
    pub grant_issuer: Arc<GrantIssuer>,
    pub introspection: Arc<IntrospectionService>,
    pub revocation: Arc<RevocationService>,
    pub signing_key: Arc<ServerSigningKey>,
}

impl AppState {
    /// Wire every component from configuration, the registry document and
    /// a token store.
    pub fn new(
        config: Config,
        registry: RegistryDocument,
        store: Arc<dyn TokenStore>,
        signing_key: ServerSigningKey,
    ) -> Result<Self, AsError> {
        let key_registry = StaticKeyRegistry::from_entries(&registry.trusted_keys)?;
        let client_registry = ClientRegistry::from_registrations(registry.clients)?;
        client_registry.check_secret_hash_cost(config.bcrypt_cost)?;
        let signing_key = Arc::new(signing_key);

        tracing::info!(
            trusted_keys = key_registry.len(),
            clients = client_registry.len(),
            signing_key_id = %signing_key.key_id(),
            "Loaded registry"
        );

        let validator = AssertionValidator::new(
            Arc::new(key_registry),
            AssertionPolicy::from_config(&config),
        );
        let clients = ClientAuthenticator::new(Arc::new(client_registry), config.skip_client_auth);
        let grant_issuer = GrantIssuer::new(
            Arc::clone(&store),
            Arc::clone(&signing_key),
            chrono::Duration::seconds(config.access_token_lifespan_seconds),
            config.issuer.clone(),
        );
        let introspection = IntrospectionService::new(
            Arc::clone(&store),
            boundary_for(config.require_audience_overlap),
        );
        let revocation = RevocationService::new(store);

        Ok(Self {
            config,
            validator: Arc::new(validator),
            clients: Arc::new(clients),
            grant_issuer: Arc::new(grant_issuer),
            introspection: Arc::new(introspection),
            revocation: Arc::new(revocation),
            signing_key,
        })
    }
}
