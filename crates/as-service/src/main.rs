use as_service::config::{self, Config};
use as_service::handlers::AppState;
use as_service::observability::metrics::init_metrics_recorder;
use as_service::repositories::{MemoryTokenStore, PgTokenStore, TokenStore};
use as_service::routes;
use as_service::services::key_management_service::ServerSigningKey;
use as_service::tasks::start_token_purge;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "as_service=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Authorization Server");

    let config = Config::from_env().map_err(|e| {
        error!("Failed to load configuration: {}", e);
        e
    })?;

    info!(token_url = %config.token_url, "Configuration loaded successfully");

    let registry = config::load_registry(&config.registry_file).map_err(|e| {
        error!("Failed to load registry: {}", e);
        e
    })?;

    let metrics_handle = init_metrics_recorder().map_err(|e| {
        error!("Failed to initialize metrics recorder: {}", e);
        e
    })?;

    let store: Arc<dyn TokenStore> = match &config.database_url {
        Some(database_url) => {
            info!("Connecting to database...");
            let pool = sqlx::postgres::PgPoolOptions::new()
                .max_connections(5)
                .connect(database_url)
                .await
                .map_err(|e| {
                    error!("Failed to connect to database: {}", e);
                    e
                })?;

            sqlx::migrate!("../../migrations")
                .run(&pool)
                .await
                .map_err(|e| {
                    error!("Failed to run migrations: {}", e);
                    e
                })?;

            info!("Database connection established");
            Arc::new(PgTokenStore::new(pool))
        }
        None => {
            warn!("DATABASE_URL not set, tokens are kept in memory and lost on restart");
            Arc::new(MemoryTokenStore::new())
        }
    };

    let signing_key = ServerSigningKey::from_config(config.signing_key.as_ref()).map_err(|e| {
        error!("Failed to load signing key: {}", e);
        e
    })?;

    let bind_address = config.bind_address.clone();

    let cancel_token = CancellationToken::new();
    let purge_handle = tokio::spawn(start_token_purge(
        Arc::clone(&store),
        config.purge_interval(),
        cancel_token.clone(),
    ));

    let state = Arc::new(AppState::new(config, registry, store, signing_key).map_err(|e| {
        error!("Failed to build application state: {}", e);
        e
    })?);

    let app = routes::build_routes(state, metrics_handle);

    let addr: SocketAddr = bind_address.parse().map_err(|e| {
        error!("Invalid bind address: {}", e);
        e
    })?;

    info!("Authorization Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    cancel_token.cancel();
    if let Err(e) = purge_handle.await {
        warn!("Token purge task ended abnormally: {}", e);
    }

    info!("Authorization Server shutdown complete");

    Ok(())
}

/// Returns when SIGINT or SIGTERM is received.
async fn shutdown_signal() {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => info!("Received SIGINT, starting graceful shutdown..."),
            Err(e) => error!("Failed to listen for SIGINT: {}", e),
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received SIGTERM, starting graceful shutdown...");
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
