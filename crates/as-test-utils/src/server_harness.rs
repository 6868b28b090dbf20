//! Test server harness for E2E testing
//!
//! Provides TestAuthServer for spawning real authorization server instances
//! in tests, backed by the in-memory token store.

use crate::crypto_fixtures::test_server_signing_key;
use crate::test_ids::TEST_TOKEN_URL;
use as_service::config::{
    Config, DEFAULT_ACCESS_TOKEN_LIFESPAN_SECONDS, DEFAULT_ASSERTION_MAX_LIFETIME_SECONDS,
    DEFAULT_JWT_CLOCK_SKEW_SECONDS, DEFAULT_PURGE_INTERVAL_SECONDS, MIN_BCRYPT_COST,
};
use as_service::handlers::AppState;
use as_service::models::{RegistryDocument, JWT_BEARER_GRANT_TYPE};
use as_service::repositories::{MemoryTokenStore, TokenStore};
use as_service::routes;
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Test harness for spawning the authorization server in E2E tests
///
/// # Example
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_grant_e2e() -> Result<()> {
///     let server = TestAuthServer::spawn(registry).await?;
///     let response = server.request_token(&assertion, Some("read")).await?;
///     assert_eq!(response.status(), 200);
///     Ok(())
/// }
/// ```
pub struct TestAuthServer {
    addr: SocketAddr,
    config: Config,
    store: Arc<MemoryTokenStore>,
    client: reqwest::Client,
    _handle: JoinHandle<()>,
}

impl TestAuthServer {
    /// Configuration the harness uses unless told otherwise.
    ///
    /// The token URL is fixed to [`TEST_TOKEN_URL`] rather than the bound
    /// address, so assertions can be built before the server starts.
    pub fn test_config() -> Config {
        Config {
            bind_address: "127.0.0.1:0".to_string(),
            database_url: None,
            token_url: TEST_TOKEN_URL.to_string(),
            issuer: TEST_TOKEN_URL.to_string(),
            access_token_lifespan_seconds: DEFAULT_ACCESS_TOKEN_LIFESPAN_SECONDS,
            assertion_max_lifetime_seconds: DEFAULT_ASSERTION_MAX_LIFETIME_SECONDS,
            require_assertion_iat: false,
            require_assertion_jti: false,
            skip_client_auth: true,
            jwt_clock_skew_seconds: DEFAULT_JWT_CLOCK_SKEW_SECONDS,
            registry_file: String::new(), // Registry is passed in directly
            signing_key: None,
            bcrypt_cost: MIN_BCRYPT_COST,
            purge_interval_seconds: DEFAULT_PURGE_INTERVAL_SECONDS,
            require_audience_overlap: false,
        }
    }

    /// Spawn a server with [`Self::test_config`].
    pub async fn spawn(registry: RegistryDocument) -> Result<Self, anyhow::Error> {
        Self::spawn_with_config(Self::test_config(), registry).await
    }

    /// Spawn a server on a random local port.
    ///
    /// Metrics go to a recorder that is not installed globally, so any
    /// number of servers can run in one test process.
    pub async fn spawn_with_config(
        config: Config,
        registry: RegistryDocument,
    ) -> Result<Self, anyhow::Error> {
        let store = Arc::new(MemoryTokenStore::new());
        let signing_key = test_server_signing_key()?;

        let state = Arc::new(
            AppState::new(
                config.clone(),
                registry,
                Arc::clone(&store) as Arc<dyn TokenStore>,
                signing_key,
            )
            .map_err(|e| anyhow::anyhow!("Failed to build application state: {}", e))?,
        );

        let metrics_handle = PrometheusBuilder::new().build_recorder().handle();
        let app = routes::build_routes(state, metrics_handle);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .map_err(|e| anyhow::anyhow!("Failed to bind test server: {}", e))?;

        let addr = listener
            .local_addr()
            .map_err(|e| anyhow::anyhow!("Failed to get local address: {}", e))?;

        let handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                eprintln!("Test server error: {}", e);
            }
        });

        Ok(Self {
            addr,
            config,
            store,
            client: reqwest::Client::new(),
            _handle: handle,
        })
    }

    /// Get the base URL of the test server
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Token store backing the server, for seeding and inspection.
    pub fn store(&self) -> &MemoryTokenStore {
        &self.store
    }

    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }

    /// POST a JWT bearer grant request without client credentials.
    pub async fn request_token(
        &self,
        assertion: &str,
        scope: Option<&str>,
    ) -> Result<reqwest::Response, anyhow::Error> {
        let mut form = vec![
            ("grant_type", JWT_BEARER_GRANT_TYPE),
            ("assertion", assertion),
        ];
        if let Some(scope) = scope {
            form.push(("scope", scope));
        }

        Ok(self
            .client
            .post(format!("{}/oauth2/token", self.url()))
            .form(&form)
            .send()
            .await?)
    }

    /// Run a JWT bearer grant that must succeed and return the access token.
    pub async fn issue_token(
        &self,
        assertion: &str,
        scope: Option<&str>,
    ) -> Result<String, anyhow::Error> {
        let response = self.request_token(assertion, scope).await?;
        let status = response.status();
        let body: serde_json::Value = response.json().await?;
        if !status.is_success() {
            anyhow::bail!("Token request failed with {}: {}", status, body);
        }
        body["access_token"]
            .as_str()
            .map(ToString::to_string)
            .ok_or_else(|| anyhow::anyhow!("Token response has no access_token: {}", body))
    }

    /// POST an introspection request authenticated with `caller_token`.
    pub async fn introspect(
        &self,
        caller_token: &str,
        token: &str,
        scope: Option<&str>,
    ) -> Result<reqwest::Response, anyhow::Error> {
        let mut form = vec![("token", token)];
        if let Some(scope) = scope {
            form.push(("scope", scope));
        }

        Ok(self
            .client
            .post(format!("{}/oauth2/introspect", self.url()))
            .bearer_auth(caller_token)
            .form(&form)
            .send()
            .await?)
    }

    /// POST a revocation request authenticated with `caller_token`.
    pub async fn revoke(
        &self,
        caller_token: &str,
        token: &str,
    ) -> Result<reqwest::Response, anyhow::Error> {
        Ok(self
            .client
            .post(format!("{}/oauth2/revoke", self.url()))
            .bearer_auth(caller_token)
            .form(&[("token", token)])
            .send()
            .await?)
    }
}

impl Drop for TestAuthServer {
    fn drop(&mut self) {
        // Abort the HTTP server task so the port is released when the test ends.
        self._handle.abort();
    }
}
