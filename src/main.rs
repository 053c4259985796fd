//! scene_directory - Scene Directory Backend API
//!
//! Serves the scene hierarchy (scenes, groups, rooms, areas, devices,
//! regions and maintenance tickets) from an in-memory aggregate cache
//! backed by a Postgres document store.

use std::net::SocketAddr;
use std::sync::Arc;

use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use scene_directory::api;
use scene_directory::cache::{CacheConfig, SceneCache};
use scene_directory::db;
use scene_directory::handlers::Handlers;
use scene_directory::jobs::{JobScheduler, JobSchedulerConfig};
use scene_directory::store::PgDocumentStore;
use scene_directory::Config;

/// Initialize tracing/logging
fn init_tracing(production: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "scene_directory=debug,tower_http=debug".into());

    let registry = tracing_subscriber::registry().with(filter);
    if production {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration
    let config = Config::from_env()?;
    init_tracing(config.is_production());

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;

    tracing::info!("Starting scene_directory server");
    tracing::info!("Connecting to database...");

    let pool = PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .connect(&config.database_url)
        .await?;

    db::verify_connection(&pool).await?;
    if !db::check_schema(&pool).await? {
        tracing::error!("Database schema is not complete. Please run migrations.");
        return Err(anyhow::anyhow!("Database schema incomplete"));
    }

    tracing::info!("Database connected successfully");

    // Build the cache and fill the scene registry
    let store = Arc::new(PgDocumentStore::new(pool.clone(), config.store_timeout));
    let cache_config = CacheConfig::default()
        .with_device_capacity(config.device_cache_capacity)
        .with_device_ttl(config.device_cache_ttl);
    let cache = Arc::new(SceneCache::new(store, cache_config));
    let loaded = cache.load().await;
    tracing::info!(scenes = loaded, "Scene registry loaded");

    // Background maintenance
    let scheduler = JobScheduler::with_config(
        cache.clone(),
        JobSchedulerConfig {
            reconcile_interval: config.reconcile_interval,
            sweep_interval: config.device_cache_ttl,
        },
    );
    let jobs = scheduler.start();

    let app = api::build_router(Handlers::new(cache, config.default_page_size));

    tracing::info!("Listening on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Cleanup
    tracing::info!("Server shutting down...");
    jobs.abort();
    pool.close().await;
    tracing::info!("Database connections closed. Goodbye!");

    Ok(())
}

/// Shutdown signal handler for graceful shutdown
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown...");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown...");
        },
    }
}
