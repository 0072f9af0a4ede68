//! # Stream Hub API Server
//!
//! Account, session and profile API for Stream Hub.
//!
//! ## Usage
//!
//! ```bash
//! ACCESS_TOKEN_SECRET=... REFRESH_TOKEN_SECRET=... cargo run -p streamhub-api
//! ```
//!
//! Without `DATABASE_URL` the server runs on in-memory storage.

use std::sync::Arc;

use anyhow::Context;
use streamhub_api::{
    app::{build_router, AppState, StorageBackend},
    config::Config,
};
use streamhub_shared::{
    db::{migrations, pool},
    media::DiskMediaStore,
    store::{memory::InMemoryStore, postgres::PgStore},
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "streamhub_api=debug,streamhub_shared=debug,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(
        "Stream Hub API Server v{} starting...",
        env!("CARGO_PKG_VERSION")
    );

    let config = Config::from_env()?;
    let bind_address = config.bind_address();

    tokio::fs::create_dir_all(&config.media.root)
        .await
        .with_context(|| format!("Cannot create media root {}", config.media.root.display()))?;
    let media = Arc::new(DiskMediaStore::new(
        config.media.root.clone(),
        config.media.base_url.clone(),
    ));

    let (state, db) = match config.database.url.clone() {
        Some(url) => {
            migrations::ensure_database_exists(&url).await?;
            let db = pool::create_pool(pool::DatabaseConfig {
                url,
                max_connections: config.database.max_connections,
                ..Default::default()
            })
            .await?;
            migrations::run_migrations(&db).await?;

            let store = Arc::new(PgStore::new(db.clone()));
            let state = AppState::new(config, store, StorageBackend::Postgres(db.clone()), media);
            (state, Some(db))
        }
        None => {
            tracing::warn!("DATABASE_URL not set; using in-memory storage, data will not persist");
            let store = Arc::new(InMemoryStore::new());
            (AppState::new(config, store, StorageBackend::Memory, media), None)
        }
    };

    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&bind_address)
        .await
        .with_context(|| format!("Cannot bind {}", bind_address))?;
    tracing::info!("Server listening on http://{}", bind_address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(db) = db {
        pool::close_pool(db).await;
    }

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received, draining connections...");
}
