use crate::models::RegistryDocument;
use common::jwt::MAX_CLOCK_SKEW;
use common::secret::SecretString;
use std::collections::HashMap;
use std::env;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Default access token lifespan (1 hour).
pub const DEFAULT_ACCESS_TOKEN_LIFESPAN_SECONDS: i64 = 3600;

/// Upper bound for the access token lifespan (1 year).
pub const MAX_ACCESS_TOKEN_LIFESPAN_SECONDS: i64 = 365 * 86_400;

/// Default maximum distance between now and an assertion's `exp` (24 hours).
pub const DEFAULT_ASSERTION_MAX_LIFETIME_SECONDS: i64 = 86_400;

/// Upper bound for the assertion lifetime setting (30 days).
pub const MAX_ASSERTION_MAX_LIFETIME_SECONDS: i64 = 30 * 86_400;

/// Default tolerance for assertion `iat` in the future.
pub const DEFAULT_JWT_CLOCK_SKEW_SECONDS: i64 = 0;

/// Bcrypt cost bounds for client secret hashes.
pub const MIN_BCRYPT_COST: u32 = 10;
pub const MAX_BCRYPT_COST: u32 = 14;
pub const DEFAULT_BCRYPT_COST: u32 = 12;

/// Default interval between purges of expired tokens (5 minutes).
pub const DEFAULT_PURGE_INTERVAL_SECONDS: i64 = 300;
pub const MAX_PURGE_INTERVAL_SECONDS: i64 = 86_400;

/// Service configuration.
///
/// Every component receives the values it needs from here at construction
/// time; nothing reads the environment after startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub bind_address: String,
    /// Postgres token store; the in-memory store is used when absent.
    pub database_url: Option<String>,
    /// Token endpoint URL. Every assertion must list it in `aud`.
    pub token_url: String,
    /// `iss` of the access tokens this server signs.
    pub issuer: String,
    pub access_token_lifespan_seconds: i64,
    pub assertion_max_lifetime_seconds: i64,
    /// `requireIssuedAt`: reject assertions without `iat`.
    pub require_assertion_iat: bool,
    /// `requireTokenID`: reject assertions without `jti`.
    pub require_assertion_jti: bool,
    /// Accept JWT bearer requests without client credentials, resolving the
    /// client from the assertion issuer.
    pub skip_client_auth: bool,
    pub jwt_clock_skew_seconds: i64,
    /// JSON document listing clients and trusted issuer keys.
    pub registry_file: String,
    /// Base64 PKCS#8 Ed25519 key for signing access tokens; generated when absent.
    pub signing_key: Option<SecretString>,
    /// Minimum cost accepted for registered client secret hashes.
    pub bcrypt_cost: u32,
    pub purge_interval_seconds: i64,
    /// Also require caller and target tokens to share an audience.
    pub require_audience_overlap: bool,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid value for {name}: {reason}")]
    InvalidValue { name: String, reason: String },

    #[error("Failed to load registry file: {0}")]
    Registry(String),
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a HashMap (for testing)
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let token_url = vars
            .get("AS_TOKEN_URL")
            .filter(|v| !v.is_empty())
            .ok_or_else(|| ConfigError::MissingEnvVar("AS_TOKEN_URL".to_string()))?
            .clone();

        let registry_file = vars
            .get("AS_REGISTRY_FILE")
            .filter(|v| !v.is_empty())
            .ok_or_else(|| ConfigError::MissingEnvVar("AS_REGISTRY_FILE".to_string()))?
            .clone();

        let bind_address = vars
            .get("BIND_ADDRESS")
            .cloned()
            .unwrap_or_else(|| "0.0.0.0:8083".to_string());

        let database_url = vars.get("DATABASE_URL").filter(|v| !v.is_empty()).cloned();

        let issuer = vars
            .get("AS_ISSUER")
            .filter(|v| !v.is_empty())
            .cloned()
            .unwrap_or_else(|| token_url.clone());

        let access_token_lifespan_seconds = parse_bounded_seconds(
            vars,
            "AS_ACCESS_TOKEN_LIFESPAN_SECONDS",
            DEFAULT_ACCESS_TOKEN_LIFESPAN_SECONDS,
            MAX_ACCESS_TOKEN_LIFESPAN_SECONDS,
        )?;

        let assertion_max_lifetime_seconds = parse_bounded_seconds(
            vars,
            "AS_ASSERTION_MAX_LIFETIME_SECONDS",
            DEFAULT_ASSERTION_MAX_LIFETIME_SECONDS,
            MAX_ASSERTION_MAX_LIFETIME_SECONDS,
        )?;

        let jwt_clock_skew_seconds = match vars.get("AS_JWT_CLOCK_SKEW_SECONDS") {
            None => DEFAULT_JWT_CLOCK_SKEW_SECONDS,
            Some(raw) => {
                let value: i64 = raw.parse().map_err(|e| invalid("AS_JWT_CLOCK_SKEW_SECONDS", e))?;
                let max = i64::try_from(MAX_CLOCK_SKEW.as_secs()).unwrap_or(i64::MAX);
                if !(0..=max).contains(&value) {
                    return Err(ConfigError::InvalidValue {
                        name: "AS_JWT_CLOCK_SKEW_SECONDS".to_string(),
                        reason: format!("must be between 0 and {}, got {}", max, value),
                    });
                }
                value
            }
        };

        let bcrypt_cost = match vars.get("AS_BCRYPT_COST") {
            None => DEFAULT_BCRYPT_COST,
            Some(raw) => {
                let cost: u32 = raw.parse().map_err(|e| invalid("AS_BCRYPT_COST", e))?;
                if !(MIN_BCRYPT_COST..=MAX_BCRYPT_COST).contains(&cost) {
                    return Err(ConfigError::InvalidValue {
                        name: "AS_BCRYPT_COST".to_string(),
                        reason: format!(
                            "must be between {} and {}, got {}",
                            MIN_BCRYPT_COST, MAX_BCRYPT_COST, cost
                        ),
                    });
                }
                cost
            }
        };

        let purge_interval_seconds = parse_bounded_seconds(
            vars,
            "AS_PURGE_INTERVAL_SECONDS",
            DEFAULT_PURGE_INTERVAL_SECONDS,
            MAX_PURGE_INTERVAL_SECONDS,
        )?;

        let signing_key = vars
            .get("AS_SIGNING_KEY")
            .filter(|v| !v.is_empty())
            .map(|v| SecretString::from(v.clone()));

        Ok(Config {
            bind_address,
            database_url,
            token_url,
            issuer,
            access_token_lifespan_seconds,
            assertion_max_lifetime_seconds,
            require_assertion_iat: parse_bool(vars, "AS_REQUIRE_ASSERTION_IAT", false)?,
            require_assertion_jti: parse_bool(vars, "AS_REQUIRE_ASSERTION_JTI", false)?,
            skip_client_auth: parse_bool(vars, "AS_SKIP_CLIENT_AUTH", false)?,
            jwt_clock_skew_seconds,
            registry_file,
            signing_key,
            bcrypt_cost,
            purge_interval_seconds,
            require_audience_overlap: parse_bool(vars, "AS_REQUIRE_AUDIENCE_OVERLAP", false)?,
        })
    }

    pub fn purge_interval(&self) -> Duration {
        Duration::from_secs(u64::try_from(self.purge_interval_seconds).unwrap_or(1))
    }

    /// Clock skew tolerance as a `Duration`.
    pub fn jwt_clock_skew(&self) -> Duration {
        Duration::from_secs(u64::try_from(self.jwt_clock_skew_seconds).unwrap_or(0))
    }
}

/// Read and parse the client / trusted key registry document.
pub fn load_registry(path: impl AsRef<Path>) -> Result<RegistryDocument, ConfigError> {
    let path = path.as_ref();
    let raw = std::fs::read_to_string(path)
        .map_err(|e| ConfigError::Registry(format!("{}: {}", path.display(), e)))?;
    serde_json::from_str(&raw)
        .map_err(|e| ConfigError::Registry(format!("{}: {}", path.display(), e)))
}

fn invalid(name: &str, err: impl std::fmt::Display) -> ConfigError {
    ConfigError::InvalidValue {
        name: name.to_string(),
        reason: err.to_string(),
    }
}

fn parse_bool(
    vars: &HashMap<String, String>,
    name: &str,
    default: bool,
) -> Result<bool, ConfigError> {
    match vars.get(name).map(|v| v.trim().to_ascii_lowercase()) {
        None => Ok(default),
        Some(v) if v.is_empty() => Ok(default),
        Some(v) => match v.as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            other => Err(invalid(name, format!("expected a boolean, got '{}'", other))),
        },
    }
}

/// Parse a duration in seconds that must lie in `1..=max`.
fn parse_bounded_seconds(
    vars: &HashMap<String, String>,
    name: &str,
    default: i64,
    max: i64,
) -> Result<i64, ConfigError> {
    match vars.get(name) {
        None => Ok(default),
        Some(raw) => {
            let value: i64 = raw.parse().map_err(|e| invalid(name, e))?;
            if !(1..=max).contains(&value) {
                return Err(invalid(
                    name,
                    format!("must be between 1 and {}, got {}", max, value),
                ));
            }
            Ok(value)
        }
    }
}
