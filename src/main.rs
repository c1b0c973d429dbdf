// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! CrewIntel API Server
//!
//! Serves the business directory, reviews, admin stats and list pages.

use crewintel::{
    config::Config,
    db::{CollectionStore, PgDb, VercelBlobStore},
    services::{AccessGate, AirportService, ClerkVerifier, SearchLogQueue},
    AppState,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize structured JSON logging
    init_logging()?;

    // Load configuration from environment
    let config = Config::from_env()?;
    tracing::info!(port = config.port, "Starting CrewIntel API");

    // Postgres pool (connects on first query)
    let db = PgDb::new(&config.database_url)?;

    // Blob-backed collections
    let blob = Arc::new(VercelBlobStore::new(
        config.blob_api_url.clone(),
        config.blob_token.clone(),
    ));
    let collections = CollectionStore::new(blob);

    // Load airport list
    tracing::info!(path = %config.airports_path, "Loading airports");
    let airports = AirportService::load_from_file(&config.airports_path)?;

    let identity = ClerkVerifier::new(&config)?;
    let access = AccessGate::new(config.admin_email.clone());

    // Background search log delivery
    let search_log = SearchLogQueue::start(db.clone());

    // Build shared state
    let state = Arc::new(AppState {
        config: config.clone(),
        db,
        collections,
        identity,
        access,
        airports,
        search_log,
    });

    // Build router
    let app = crewintel::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging.
fn init_logging() -> anyhow::Result<()> {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("crewintel=debug".parse()?)
                .add_directive("info".parse()?),
        )
        .with(format)
        .init();

    Ok(())
}
