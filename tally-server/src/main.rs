use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::sync::watch;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

pub mod api;
pub mod config;
pub mod db;
pub mod queue;
pub mod repository;
pub mod scheduler;
pub mod service;
pub mod state;
pub mod trigger;
pub mod worker;

use config::{Config, StorageBackend};
use queue::LocalQueue;
use repository::{InMemoryTaskStore, PgTaskStore, TaskStore};
use scheduler::Beat;
use state::AppState;
use trigger::{InMemoryTriggerStore, PgTriggerStore, TriggerStore};
use worker::{AddUnit, UnitRegistry, WorkerPool};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tally_server=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Tally server...");

    let config = Config::from_env().context("Failed to load configuration")?;

    let (store, triggers) = open_stores(&config).await?;

    // Work queue and the pool draining it
    let (queue, receiver) = LocalQueue::new(config.queue_capacity);
    let queue = Arc::new(queue);
    let registry = UnitRegistry::new().register(Arc::new(AddUnit::new(Arc::clone(&store))));
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let worker_handle = tokio::spawn(
        WorkerPool::new(receiver, registry, config.worker_concurrency).run(shutdown_rx.clone()),
    );

    let beat_handle = if config.beat_enabled {
        let beat = Beat::new(Arc::clone(&triggers), queue.clone(), config.beat_tick);
        Some(tokio::spawn(beat.run(shutdown_rx)))
    } else {
        tracing::info!("Beat disabled on this instance");
        None
    };

    // Build router with all API endpoints
    let app = api::create_router(AppState::new(store, triggers, queue));

    tracing::info!("Listening on {}", config.bind_addr);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind_addr))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Failed to start server")?;

    tracing::info!("Shutting down background tasks...");
    // Receivers only stop on an explicit true or a dropped sender.
    let _ = shutdown_tx.send(true);

    if let Err(e) = worker_handle.await {
        tracing::warn!("Worker pool task failed: {}", e);
    }
    if let Some(handle) = beat_handle {
        if let Err(e) = handle.await {
            tracing::warn!("Beat task failed: {}", e);
        }
    }

    tracing::info!("Tally server stopped");
    Ok(())
}

async fn open_stores(config: &Config) -> Result<(Arc<dyn TaskStore>, Arc<dyn TriggerStore>)> {
    match config.storage_backend {
        StorageBackend::Postgres => {
            tracing::info!("Connecting to database...");

            let pool = db::create_pool(&config.database_url, config.database_max_connections)
                .await
                .context("Failed to create database pool")?;

            tracing::info!("Database connection pool created");

            db::run_migrations(&pool)
                .await
                .context("Failed to run database migrations")?;

            let store: Arc<dyn TaskStore> = Arc::new(PgTaskStore::new(pool.clone()));
            let triggers: Arc<dyn TriggerStore> = Arc::new(PgTriggerStore::new(pool));
            Ok((store, triggers))
        }
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory storage; nothing survives a restart");
            let store: Arc<dyn TaskStore> = Arc::new(InMemoryTaskStore::new());
            let triggers: Arc<dyn TriggerStore> = Arc::new(InMemoryTriggerStore::new());
            Ok((store, triggers))
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
