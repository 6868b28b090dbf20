//! Metrics definitions for the authorization server
//!
//! All metrics follow Prometheus naming conventions:
//! - `as_` prefix
//! - `_total` suffix for counters
//! - `_seconds` suffix for duration histograms
//!
//! # Cardinality
//!
//! Labels are bounded:
//! - `grant_type`: the grant types the server knows, anything else is `other`
//! - `status`: success, error
//! - `outcome`: bounded by code
//! - `error_category`: see [`super::ErrorCategory`]
//! - `path`: known routes, anything else is `/other`

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::time::Duration;

use crate::models::JWT_BEARER_GRANT_TYPE;

/// Install the global Prometheus recorder and return the handle used to
/// serve `/metrics`.
///
/// Must be called once, before any metric is recorded.
///
/// # Errors
///
/// Returns an error string if bucket configuration fails or a recorder is
/// already installed.
pub fn init_metrics_recorder() -> Result<PrometheusHandle, String> {
    PrometheusBuilder::new()
        // Token issuance includes a bcrypt verification for confidential clients.
        .set_buckets_for_metric(
            Matcher::Prefix("as_token_issuance".to_string()),
            &[
                0.005, 0.010, 0.025, 0.050, 0.100, 0.200, 0.350, 0.500, 1.000, 2.000,
            ],
        )
        .map_err(|e| format!("Failed to set token issuance buckets: {e}"))?
        .set_buckets_for_metric(
            Matcher::Prefix("as_introspection".to_string()),
            &[0.001, 0.002, 0.005, 0.010, 0.025, 0.050, 0.100, 0.250],
        )
        .map_err(|e| format!("Failed to set introspection buckets: {e}"))?
        .set_buckets_for_metric(
            Matcher::Prefix("as_http_request".to_string()),
            &[
                0.005, 0.010, 0.025, 0.050, 0.100, 0.150, 0.200, 0.300, 0.500, 1.000, 2.000,
            ],
        )
        .map_err(|e| format!("Failed to set HTTP request buckets: {e}"))?
        .set_buckets_for_metric(
            Matcher::Prefix("as_db_query".to_string()),
            &[
                0.001, 0.002, 0.005, 0.010, 0.020, 0.050, 0.100, 0.250, 0.500, 1.000,
            ],
        )
        .map_err(|e| format!("Failed to set DB query buckets: {e}"))?
        // Coarse buckets: bcrypt timing must not be observable at fine grain.
        .set_buckets_for_metric(
            Matcher::Full("as_bcrypt_duration_seconds".to_string()),
            &[0.050, 0.100, 0.250, 0.500, 1.000],
        )
        .map_err(|e| format!("Failed to set bcrypt buckets: {e}"))?
        .install_recorder()
        .map_err(|e| format!("Failed to install Prometheus recorder: {e}"))
}

// ============================================================================
// Token Metrics
// ============================================================================

/// Record token issuance duration and outcome
///
/// Metric: `as_token_issuance_duration_seconds`, `as_token_issuance_total`
/// Labels: `grant_type`, `status`
pub fn record_token_issuance(grant_type: &str, status: &str, duration: Duration) {
    let grant_type = grant_type_label(grant_type);
    histogram!("as_token_issuance_duration_seconds", "grant_type" => grant_type, "status" => status.to_string())
        .record(duration.as_secs_f64());

    counter!("as_token_issuance_total", "grant_type" => grant_type, "status" => status.to_string())
        .increment(1);
}

/// Record an assertion validation result
///
/// Metric: `as_assertion_validations_total`
/// Labels: `status`, `error_kind`
pub fn record_assertion_validation(status: &str, error_kind: Option<&str>) {
    let kind = error_kind.unwrap_or("none");
    counter!("as_assertion_validations_total", "status" => status.to_string(), "error_kind" => kind.to_string())
        .increment(1);
}

/// Record an introspection outcome
///
/// Metric: `as_introspections_total`
/// Labels: `outcome` (active, inactive, unauthorized, error)
pub fn record_introspection(outcome: &str, duration: Duration) {
    histogram!("as_introspection_duration_seconds", "outcome" => outcome.to_string())
        .record(duration.as_secs_f64());
    counter!("as_introspections_total", "outcome" => outcome.to_string()).increment(1);
}

/// Record a revocation outcome
///
/// Metric: `as_revocations_total`
/// Labels: `outcome` (revoked, unknown, rejected)
pub fn record_revocation(outcome: &str) {
    counter!("as_revocations_total", "outcome" => outcome.to_string()).increment(1);
}

/// Record JWKS request
///
/// Metric: `as_jwks_requests_total`
pub fn record_jwks_request() {
    counter!("as_jwks_requests_total").increment(1);
}

// ============================================================================
// Database Metrics
// ============================================================================

/// Record database query execution
///
/// Metric: `as_db_query_duration_seconds`, `as_db_queries_total`
/// Labels: `operation`, `table`, `status`
pub fn record_db_query(operation: &str, table: &str, status: &str, duration: Duration) {
    histogram!("as_db_query_duration_seconds", "operation" => operation.to_string(), "table" => table.to_string())
        .record(duration.as_secs_f64());

    counter!("as_db_queries_total", "operation" => operation.to_string(), "table" => table.to_string(), "status" => status.to_string())
        .increment(1);
}

// ============================================================================
// Crypto Metrics
// ============================================================================

/// Record bcrypt verification duration
///
/// Metric: `as_bcrypt_duration_seconds`
pub fn record_bcrypt_duration(operation: &str, duration: Duration) {
    histogram!("as_bcrypt_duration_seconds", "operation" => operation.to_string())
        .record(duration.as_secs_f64());
}

// ============================================================================
// Error Metrics
// ============================================================================

/// Record error by category
///
/// Metric: `as_errors_total`
/// Labels: `operation`, `error_category`, `status_code`
pub fn record_error(operation: &str, error_category: &str, status_code: u16) {
    counter!("as_errors_total",
        "operation" => operation.to_string(),
        "error_category" => error_category.to_string(),
        "status_code" => status_code.to_string()
    )
    .increment(1);
}

// ============================================================================
// HTTP Request Metrics
// ============================================================================

/// Record HTTP request completion
///
/// Metric: `as_http_requests_total`, `as_http_request_duration_seconds`
/// Labels: `method`, `path`, `status_code`
///
/// Captures framework-level rejections (415, 422, 404, 405) as well as
/// handler responses.
pub fn record_http_request(method: &str, path: &str, status_code: u16, duration: Duration) {
    let normalized_path = normalize_path(path);

    histogram!("as_http_request_duration_seconds",
        "method" => method.to_string(),
        "path" => normalized_path,
        "status_code" => status_code.to_string()
    )
    .record(duration.as_secs_f64());

    counter!("as_http_requests_total",
        "method" => method.to_string(),
        "path" => normalized_path,
        "status_code" => status_code.to_string()
    )
    .increment(1);
}

fn normalize_path(path: &str) -> &'static str {
    match path {
        "/health" => "/health",
        "/metrics" => "/metrics",
        "/.well-known/jwks.json" => "/.well-known/jwks.json",
        "/oauth2/token" => "/oauth2/token",
        "/oauth2/introspect" => "/oauth2/introspect",
        "/oauth2/revoke" => "/oauth2/revoke",
        _ => "/other",
    }
}

fn grant_type_label(grant_type: &str) -> &'static str {
    match grant_type {
        JWT_BEARER_GRANT_TYPE => "jwt_bearer",
        "client_credentials" => "client_credentials",
        "authorization_code" => "authorization_code",
        "refresh_token" => "refresh_token",
        _ => "other",
    }
}
