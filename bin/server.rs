// PlayerDB - Web Server
// REST API with Axum: paginated reads + CSV reload trigger

use anyhow::{Context, Result};
use playerdb::api::{build_router, AppState};
use playerdb::{init_tracing, AppConfig, OutboxPublisher, SqlitePlayerStore};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    // Silent if the file does not exist
    let _ = dotenvy::from_filename(".env.local");
    init_tracing();

    let config = AppConfig::from_env()?;
    info!(?config, "PlayerDB web server starting");

    // Store and outbox share the database file, each on its own connection
    let store = SqlitePlayerStore::open(&config.database_path)?;
    let publisher = OutboxPublisher::open(&config.database_path, config.default_channel.clone())?;
    info!(path = %config.database_path.display(), "Database opened");

    let state = AppState {
        store: Arc::new(store),
        publisher: Arc::new(publisher),
        csv_path: config.csv_path.clone(),
        rejection_channel: config.rejection_channel.clone(),
    };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind_addr))?;

    info!("Server running on http://{}", config.bind_addr);
    info!("   API: http://{}/api/players", config.bind_addr);

    axum::serve(listener, app)
        .await
        .context("Failed to start server")?;

    Ok(())
}
