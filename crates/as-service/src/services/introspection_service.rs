use crate::errors::AsError;
use crate::models::{IntrospectionResult, TokenKey};
use crate::observability::hash_for_correlation;
use crate::observability::metrics::record_introspection;
use crate::repositories::TokenStore;
use crate::services::authorization_boundary::AuthorizationBoundary;
use chrono::{DateTime, Utc};
use common::scope;
use std::sync::Arc;
use std::time::Instant;
use tracing::instrument;

/// Token introspection (RFC 7662) for callers holding their own access token.
pub struct IntrospectionService {
    store: Arc<dyn TokenStore>,
    boundary: Box<dyn AuthorizationBoundary>,
}

impl IntrospectionService {
    pub fn new(store: Arc<dyn TokenStore>, boundary: Box<dyn AuthorizationBoundary>) -> Self {
        Self { store, boundary }
    }

    #[instrument(skip_all, name = "as.introspect", fields(outcome))]
    pub async fn introspect(
        &self,
        caller_token: &str,
        target_token: &str,
        requested_scopes: &[String],
    ) -> Result<IntrospectionResult, AsError> {
        let start = Instant::now();
        let result = self
            .introspect_at(caller_token, target_token, requested_scopes, Utc::now())
            .await;

        let outcome = match &result {
            Ok(IntrospectionResult::Active(_)) => "active",
            Ok(IntrospectionResult::Inactive) => "inactive",
            Err(AsError::CallerUnauthorized) => "unauthorized",
            Err(_) => "error",
        };
        tracing::Span::current().record("outcome", outcome);
        record_introspection(outcome, start.elapsed());

        result
    }

    /// Only caller authentication and the authorization boundary produce
    /// errors (besides storage failures). Anything wrong with the target
    /// yields an inactive result.
    pub async fn introspect_at(
        &self,
        caller_token: &str,
        target_token: &str,
        requested_scopes: &[String],
        now: DateTime<Utc>,
    ) -> Result<IntrospectionResult, AsError> {
        let caller_key = TokenKey::from_token(caller_token);
        let caller = match self.store.get(&caller_key).await? {
            Some(caller) if caller.is_active(now) => caller,
            _ => return Err(AsError::CallerUnauthorized),
        };

        let target_key = TokenKey::from_token(target_token);
        if target_key == caller_key {
            tracing::debug!(
                target: "as.introspect",
                client = %hash_for_correlation(&caller.client_id),
                "Caller attempted to introspect its own bearer token"
            );
            return Err(AsError::CallerUnauthorized);
        }

        let target = match self.store.get(&target_key).await? {
            Some(target) if target.is_active(now) => target,
            _ => return Ok(IntrospectionResult::Inactive),
        };

        if !self.boundary.may_introspect(&caller, &target) {
            tracing::debug!(
                target: "as.introspect",
                client = %hash_for_correlation(&caller.client_id),
                "Introspection refused by authorization boundary"
            );
            return Err(AsError::CallerUnauthorized);
        }

        if !requested_scopes.is_empty() && !scope::overlaps(requested_scopes, &target.scopes) {
            return Ok(IntrospectionResult::Inactive);
        }

        Ok(IntrospectionResult::Active(target))
    }
}
