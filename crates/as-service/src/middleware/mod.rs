pub mod auth;
pub mod http_metrics;

pub use auth::{require_bearer_token, BearerToken};
pub use http_metrics::http_metrics_middleware;
