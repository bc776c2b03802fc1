use std::sync::Arc;

use crate::cache::{KeyValueStore, MemoryStore, RedisStore};
use crate::model::{DbConnection, ModelManager};
use crate::progress::{ProgressKeys, ProgressTracker};
use crate::utils::signal::shutdown_signal;
use crate::{error::AppResult, web::AppState};
use axum::Router;
use tokio::net::TcpListener;

pub mod config;
pub use config::{Config, ConfigError, ConfigResult};

pub mod auth;
pub mod cache;
pub mod client;
pub mod error;
pub mod model;
pub mod progress;
pub mod utils;
pub mod web;

static APPLICATION_NAME: &str = "educa";

/// Progress tracker over the store named in `[cache]`: redis when a url is
/// configured, process memory otherwise.
pub fn build_tracker(config: &Config) -> AppResult<ProgressTracker> {
    let cache = config.cache();
    let store: Arc<dyn KeyValueStore> = match cache.url() {
        Some(url) => {
            tracing::info!("progress store: redis at {url}");
            Arc::new(RedisStore::open(url, cache.timeout())?)
        }
        None => {
            tracing::warn!("no cache.url configured, progress is kept in process memory");
            Arc::new(MemoryStore::new())
        }
    };

    Ok(ProgressTracker::new(store)
        .with_keys(ProgressKeys::new(cache.prefix()))
        .with_retention(cache.retention()))
}

pub async fn build_server() -> AppResult<(AppState, Router)> {
    let use_local = cfg!(debug_assertions);
    let config = Config::get_or_init(use_local).await;

    let db = DbConnection::connect(config.app().database_uri())?;
    db.migrate().await?;

    let tracker = build_tracker(config)?;
    if !tracker.ping().await {
        // not fatal: every progress call degrades until the store comes back
        tracing::error!("progress store is not reachable");
    }

    build_server_with(db, tracker).await
}

pub async fn build_server_with(
    db: DbConnection,
    tracker: ProgressTracker,
) -> AppResult<(AppState, Router)> {
    let config = Config::get_or_init(true).await;

    let mm = ModelManager::new(db);
    let state = AppState::new(mm, tracker);
    let app = web::routes::build_app(state.clone(), config.app().docs());
    Ok((state, app))
}

#[tracing::instrument]
pub async fn setup_workers() -> AppResult<()> {
    let (_, app) = build_server().await?;
    let config = Config::get_or_init(false).await;
    let listener = TcpListener::bind(config.host().bindto()).await?;

    tracing::info!("axum is starting at: {}", config.host().bindto());
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("server stopped");
    Ok(())
}

pub fn setup_trace() {
    use tracing_error::ErrorLayer;
    use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

    // load .env file for RUST_LOG etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .with(ErrorLayer::default())
        .init();

    tracing::debug!("tracing initialized.");
}

#[tracing::instrument]
pub async fn run() -> AppResult<()> {
    setup_trace();
    setup_workers().await?;
    Ok(())
}
