use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pos_integrity_server::identity::HttpIdentityProvider;
use pos_integrity_server::retention::SweepScheduler;
use pos_integrity_server::store::{create_pool, PgStore, RowStore};
use pos_integrity_server::{routes, AppState, Config};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pos_integrity_server=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting POS Integrity Server...");

    // Load configuration
    let config = Config::from_env().map_err(|e| anyhow::anyhow!(e))?;

    tracing::info!(
        "Environment: {}, Server: {}",
        config.environment,
        config.server_address()
    );

    // Create database connection pool
    let pool = create_pool(&config.database_url).await?;

    // Run migrations (deletion_records is the only table owned here)
    tracing::info!("Running database migrations...");
    sqlx::migrate!("./migrations").run(&pool).await?;
    tracing::info!("Migrations complete");

    let store: Arc<dyn RowStore> = Arc::new(PgStore::new(pool));
    let identity_provider = Arc::new(HttpIdentityProvider::new(
        &config.identity_api_url,
        &config.identity_api_key,
    )?);

    // Retention sweep: one run shortly after start, then one per interval
    let sweeper = SweepScheduler::new(
        Arc::clone(&store),
        identity_provider.clone(),
        Duration::from_secs(config.sweep_interval_secs),
        Duration::from_secs(config.sweep_startup_delay_secs),
        config.worker_concurrency,
    );
    let _sweep_task = sweeper.spawn();

    // Configure CORS
    let origins: Vec<axum::http::HeaderValue> = config
        .allowed_origins
        .iter()
        .map(|s| s.parse())
        .collect::<Result<_, _>>()?;
    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([axum::http::Method::GET, axum::http::Method::POST])
        .allow_headers(Any);

    // Create app state
    let state = AppState::new(store, identity_provider, sweeper, config.clone());

    // Build router
    let app = routes::router(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    // Start server
    let addr: SocketAddr = config.server_address().parse()?;
    tracing::info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
