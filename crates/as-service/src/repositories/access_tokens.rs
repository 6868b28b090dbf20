use crate::errors::AsError;
use crate::models::{AccessToken, TokenKey};
use crate::observability::metrics::record_db_query;
use crate::repositories::token_store::TokenStore;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use std::time::Instant;

/// Postgres-backed token store (access_tokens and assertion_ids tables).
#[derive(Debug, Clone)]
pub struct PgTokenStore {
    pool: PgPool,
}

impl PgTokenStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TokenStore for PgTokenStore {
    async fn put(&self, key: &TokenKey, token: &AccessToken) -> Result<(), AsError> {
        let start = Instant::now();
        let result = sqlx::query(
            r#"
            INSERT INTO access_tokens (
                token_hash, token_id, client_id, assertion_issuer, subject,
                audience, scopes, issued_at, expires_at, revoked
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(key.as_str())
        .bind(&token.token_id)
        .bind(&token.client_id)
        .bind(&token.assertion_issuer)
        .bind(&token.subject)
        .bind(&token.audience)
        .bind(&token.scopes)
        .bind(token.issued_at)
        .bind(token.expires_at)
        .bind(token.revoked)
        .execute(&self.pool)
        .await;

        let status = if result.is_ok() { "success" } else { "error" };
        record_db_query("insert", "access_tokens", status, start.elapsed());

        result.map_err(|e| AsError::Database(format!("Failed to store access token: {}", e)))?;
        Ok(())
    }

    async fn get(&self, key: &TokenKey) -> Result<Option<AccessToken>, AsError> {
        let start = Instant::now();
        let result = sqlx::query_as::<_, AccessToken>(
            r#"
            SELECT
                token_id, client_id, assertion_issuer, subject,
                audience, scopes, issued_at, expires_at, revoked
            FROM access_tokens
            WHERE token_hash = $1
            "#,
        )
        .bind(key.as_str())
        .fetch_optional(&self.pool)
        .await;

        let status = if result.is_ok() { "success" } else { "error" };
        record_db_query("select", "access_tokens", status, start.elapsed());

        result.map_err(|e| AsError::Database(format!("Failed to fetch access token: {}", e)))
    }

    async fn revoke(&self, key: &TokenKey) -> Result<bool, AsError> {
        let start = Instant::now();
        let result = sqlx::query("UPDATE access_tokens SET revoked = true WHERE token_hash = $1")
            .bind(key.as_str())
            .execute(&self.pool)
            .await;

        let status = if result.is_ok() { "success" } else { "error" };
        record_db_query("update", "access_tokens", status, start.elapsed());

        let result =
            result.map_err(|e| AsError::Database(format!("Failed to revoke access token: {}", e)))?;
        Ok(result.rows_affected() > 0)
    }

    async fn record_assertion_id(
        &self,
        issuer: &str,
        jti: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<bool, AsError> {
        let start = Instant::now();
        // An existing row only blocks the insert while its assertion is unexpired.
        let result = sqlx::query_scalar::<_, String>(
            r#"
            INSERT INTO assertion_ids (issuer, jti, expires_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (issuer, jti) DO UPDATE
                SET expires_at = EXCLUDED.expires_at
                WHERE assertion_ids.expires_at <= NOW()
            RETURNING jti
            "#,
        )
        .bind(issuer)
        .bind(jti)
        .bind(expires_at)
        .fetch_optional(&self.pool)
        .await;

        let status = if result.is_ok() { "success" } else { "error" };
        record_db_query("upsert", "assertion_ids", status, start.elapsed());

        let inserted = result
            .map_err(|e| AsError::Database(format!("Failed to record assertion id: {}", e)))?;
        Ok(inserted.is_some())
    }

    async fn purge_expired(&self, cutoff: DateTime<Utc>) -> Result<u64, AsError> {
        let start = Instant::now();
        let tokens = sqlx::query("DELETE FROM access_tokens WHERE expires_at < $1")
            .bind(cutoff)
            .execute(&self.pool)
            .await;
        let status = if tokens.is_ok() { "success" } else { "error" };
        record_db_query("delete", "access_tokens", status, start.elapsed());
        let tokens = tokens
            .map_err(|e| AsError::Database(format!("Failed to purge access tokens: {}", e)))?;

        let start = Instant::now();
        let ids = sqlx::query("DELETE FROM assertion_ids WHERE expires_at < $1")
            .bind(cutoff)
            .execute(&self.pool)
            .await;
        let status = if ids.is_ok() { "success" } else { "error" };
        record_db_query("delete", "assertion_ids", status, start.elapsed());
        let ids =
            ids.map_err(|e| AsError::Database(format!("Failed to purge assertion ids: {}", e)))?;

        Ok(tokens.rows_affected() + ids.rows_affected())
    }
}
