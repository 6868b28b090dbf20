use crate::errors::AsError;
use crate::models::TokenKey;
use crate::observability::hash_for_correlation;
use crate::observability::metrics::record_revocation;
use crate::repositories::TokenStore;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::instrument;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevocationOutcome {
    Revoked,
    /// The token was never issued here; RFC 7009 still reports success.
    Unknown,
}

/// Token revocation (RFC 7009), limited to the caller's own client.
pub struct RevocationService {
    store: Arc<dyn TokenStore>,
}

impl RevocationService {
    pub fn new(store: Arc<dyn TokenStore>) -> Self {
        Self { store }
    }

    #[instrument(skip_all, name = "as.revoke", fields(outcome))]
    pub async fn revoke(
        &self,
        caller_token: &str,
        target_token: &str,
    ) -> Result<RevocationOutcome, AsError> {
        let result = self.revoke_at(caller_token, target_token, Utc::now()).await;

        let outcome = match &result {
            Ok(RevocationOutcome::Revoked) => "revoked",
            Ok(RevocationOutcome::Unknown) => "unknown",
            Err(_) => "rejected",
        };
        tracing::Span::current().record("outcome", outcome);
        record_revocation(outcome);

        result
    }

    pub async fn revoke_at(
        &self,
        caller_token: &str,
        target_token: &str,
        now: DateTime<Utc>,
    ) -> Result<RevocationOutcome, AsError> {
        let caller = match self.store.get(&TokenKey::from_token(caller_token)).await? {
            Some(caller) if caller.is_active(now) => caller,
            _ => return Err(AsError::CallerUnauthorized),
        };

        let target_key = TokenKey::from_token(target_token);
        let target = match self.store.get(&target_key).await? {
            Some(target) => target,
            None => return Ok(RevocationOutcome::Unknown),
        };

        if target.client_id != caller.client_id {
            tracing::debug!(
                target: "as.revoke",
                client = %hash_for_correlation(&caller.client_id),
                "Refused to revoke a token issued to another client"
            );
            return Err(AsError::TokenNotOwned);
        }

        if self.store.revoke(&target_key).await? {
            Ok(RevocationOutcome::Revoked)
        } else {
            // Removed between the read and the update.
            Ok(RevocationOutcome::Unknown)
        }
    }
}
