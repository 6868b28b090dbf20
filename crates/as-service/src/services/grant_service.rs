use crate::crypto::AccessTokenClaims;
use crate::errors::AsError;
use crate::models::{AccessToken, ClientRegistration, TokenKey, JWT_BEARER_GRANT_TYPE};
use crate::observability::hash_for_correlation;
use crate::repositories::TokenStore;
use crate::services::assertion_validator::ValidatedAssertion;
use crate::services::key_management_service::ServerSigningKey;
use chrono::{DateTime, Duration, Utc};
use common::scope;
use common::secret::SecretString;
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

/// A freshly issued access token.
#[derive(Debug)]
pub struct IssuedToken {
    /// The bearer value handed to the client. Only its hash is stored.
    pub access_token: SecretString,
    pub record: AccessToken,
}

/// Turns validated assertions into stored access tokens.
pub struct GrantIssuer {
    store: Arc<dyn TokenStore>,
    signing_key: Arc<ServerSigningKey>,
    lifespan: Duration,
    issuer: String,
}

impl GrantIssuer {
    pub fn new(
        store: Arc<dyn TokenStore>,
        signing_key: Arc<ServerSigningKey>,
        lifespan: Duration,
        issuer: String,
    ) -> Self {
        Self {
            store,
            signing_key,
            lifespan,
            issuer,
        }
    }

    pub fn lifespan(&self) -> Duration {
        self.lifespan
    }

    #[instrument(skip_all, name = "as.grant.issue", fields(client = %hash_for_correlation(&client.client_id), status))]
    pub async fn issue(
        &self,
        assertion: &ValidatedAssertion,
        requested_scope: &[String],
        client: &ClientRegistration,
    ) -> Result<IssuedToken, AsError> {
        let result = self
            .issue_at(assertion, requested_scope, client, Utc::now())
            .await;
        let status = if result.is_ok() { "success" } else { "error" };
        tracing::Span::current().record("status", status);
        result
    }

    pub async fn issue_at(
        &self,
        assertion: &ValidatedAssertion,
        requested_scope: &[String],
        client: &ClientRegistration,
        now: DateTime<Utc>,
    ) -> Result<IssuedToken, AsError> {
        if !client.allows_grant_type(JWT_BEARER_GRANT_TYPE) {
            return Err(AsError::ClientUnauthorizedForGrant);
        }

        let scopes = grant_scope(requested_scope, client)?;

        if let Some(jti) = &assertion.token_id {
            let first_use = self
                .store
                .record_assertion_id(&assertion.issuer, jti, assertion.expires_at)
                .await?;
            if !first_use {
                tracing::warn!(
                    target: "as.grant",
                    issuer = %hash_for_correlation(&assertion.issuer),
                    "Rejected replayed assertion"
                );
                return Err(AsError::InvalidAssertion(
                    "Assertion has already been used".to_string(),
                ));
            }
        }

        let issued_at = DateTime::from_timestamp(now.timestamp(), 0).ok_or(AsError::Internal)?;
        let expires_at = issued_at
            .checked_add_signed(self.lifespan)
            .ok_or(AsError::Internal)?;
        let record = AccessToken {
            token_id: Uuid::new_v4().to_string(),
            client_id: client.client_id.clone(),
            assertion_issuer: assertion.issuer.clone(),
            subject: assertion.subject.clone(),
            audience: assertion.audience.clone(),
            scopes,
            issued_at,
            expires_at,
            revoked: false,
        };

        let claims = AccessTokenClaims {
            iss: self.issuer.clone(),
            sub: record.subject.clone(),
            aud: record.audience.clone(),
            client_id: record.client_id.clone(),
            scope: scope::join_scope(&record.scopes),
            iat: record.issued_at.timestamp(),
            exp: record.expires_at.timestamp(),
            jti: record.token_id.clone(),
        };
        let access_token = self.signing_key.sign(&claims)?;

        // Last await: a request dropped before this commits no token. A `jti`
        // recorded above stays burned.
        self.store
            .put(&TokenKey::from_token(&access_token), &record)
            .await?;

        tracing::info!(
            target: "as.grant",
            client = %hash_for_correlation(&record.client_id),
            scope_count = record.scopes.len(),
            "Issued access token"
        );

        Ok(IssuedToken {
            access_token: SecretString::from(access_token),
            record,
        })
    }
}

/// Decide the granted scope.
///
/// An empty request gets everything the client is allowed. Otherwise the
/// grant is the intersection, narrowed silently. A disjoint request is
/// refused only for strict-scope clients; others get an empty grant.
pub fn grant_scope(
    requested: &[String],
    client: &ClientRegistration,
) -> Result<Vec<String>, AsError> {
    if requested.is_empty() {
        return Ok(client.scopes.clone());
    }

    let granted = scope::intersect(requested, &client.scopes);
    if granted.is_empty() && client.strict_scope {
        return Err(AsError::ScopeNotGranted {
            requested: requested.to_vec(),
            allowed: client.scopes.clone(),
        });
    }
    Ok(granted)
}
