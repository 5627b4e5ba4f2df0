use axum::{
    http::Method,
    middleware as axum_middleware,
    routing::{delete, get, post},
    Router,
};
use std::net::SocketAddr;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use artfund_backend::{
    config::Config,
    db::connection::create_pool,
    handlers,
    middleware as auth_middleware,
    state::AppState,
};

fn mask_secret(s: &str) -> String {
    if s.is_empty() {
        return "<empty>".into();
    }
    let prefix = s.chars().take(4).collect::<String>();
    format!("{}*** (len={})", prefix, s.len())
}

async fn health() -> &'static str {
    "ok"
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "artfund_backend=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::load()?;
    tracing::info!(
        database_url = %config.database_url,
        storage_url = %config.storage_url,
        storage_bucket = %config.storage_bucket,
        storage_service_key = %mask_secret(&config.storage_service_key),
        admin_api_key = %mask_secret(&config.admin_api_key),
        trash_retention_days = config.trash_retention_days,
        variant_transforms_enabled = config.variant_transforms_enabled,
        "Loaded configuration from environment/.env"
    );

    // Initialize database
    let pool = create_pool(&config.database_url).await?;
    sqlx::migrate!("./migrations").run(pool.as_ref()).await?;

    let state = AppState::new(pool, config);

    // Admin-protected routes (shared API key)
    let admin_routes = Router::new()
        .route(
            "/api/admin/artworks/{id}",
            delete(handlers::artworks::delete_artwork),
        )
        .route(
            "/api/admin/artworks/batch-delete",
            post(handlers::artworks::delete_artworks_batch),
        )
        .route(
            "/api/admin/artists/{id}",
            delete(handlers::artists::delete_artist),
        )
        .route("/api/admin/trash", get(handlers::trash::list_trash))
        .route(
            "/api/admin/trash/{id}/restore",
            post(handlers::trash::restore_entry),
        )
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            auth_middleware::admin_auth,
        ));

    // Compose app with shared layers (CORS/Trace) and shared state
    let app = Router::new()
        .route("/health", get(health))
        .merge(admin_routes)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(
                    CorsLayer::new()
                        .allow_origin(Any)
                        .allow_methods([
                            Method::GET,
                            Method::POST,
                            Method::PUT,
                            Method::DELETE,
                            Method::OPTIONS,
                        ])
                        .allow_headers(Any)
                        .max_age(std::time::Duration::from_secs(24 * 60 * 60)),
                ),
        )
        .with_state(state);

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], 3000));
    tracing::info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
