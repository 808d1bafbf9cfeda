use std::{sync::Arc, time::Duration};

use engine::{DatabaseQueue, RebuildScheduler, WorkerConfig};
use migration::{Migrator, MigratorTrait};
use settings::Database;
use tokio::sync::watch;

mod settings;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let settings = settings::Settings::new()?;
    let mut tasks = tokio::task::JoinSet::new();

    tracing_subscriber::fmt()
        .with_env_filter(format!(
            "finboard={level},server={level},engine={level}",
            level = settings.app.level
        ))
        .init();

    let db = parse_database(&settings.database).await?;
    let engine = Arc::new(
        engine::Engine::builder()
            .database(db.clone())
            .build()
            .await?,
    );

    let worker = settings.worker.unwrap_or_default();
    let mut queue = DatabaseQueue::new(db);
    if let Some(secs) = worker.retry_after_secs {
        queue = queue.with_retry_after(Duration::from_secs(secs));
    }
    let config = worker_config(&worker);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tracing::info!(workers = config.concurrency, "starting rebuild workers");
    let mut workers = engine::spawn_workers(engine.clone(), queue.clone(), config, shutdown_rx);

    if let Some(server) = settings.server {
        let engine = engine.clone();
        let scheduler = RebuildScheduler::new(queue);
        tasks.spawn(async move {
            tracing::info!("Found server settings...");
            let bind = server.bind.unwrap_or_else(|| "127.0.0.1".to_string());
            let addr = format!("{}:{}", bind, server.port);
            let listener = match tokio::net::TcpListener::bind(addr).await {
                Ok(listener) => listener,
                Err(err) => {
                    tracing::error!("failed to bind server listener: {err}");
                    return;
                }
            };
            if let Err(err) = server::run_with_listener(engine, scheduler, listener).await {
                tracing::error!("server failed: {err}");
            }
        });
    }

    tokio::select! {
        _ = tokio::signal::ctrl_c() => tracing::info!("shutting down"),
        Some(_) = tasks.join_next() => tracing::warn!("server stopped"),
    }

    tasks.shutdown().await;
    let _ = shutdown_tx.send(true);
    while workers.join_next().await.is_some() {}

    Ok(())
}

fn worker_config(worker: &settings::Worker) -> WorkerConfig {
    let defaults = WorkerConfig::default();
    WorkerConfig {
        concurrency: worker.concurrency.unwrap_or(defaults.concurrency),
        max_attempts: worker.max_attempts.unwrap_or(defaults.max_attempts),
        backoff: worker
            .backoff_secs
            .map(Duration::from_secs)
            .unwrap_or(defaults.backoff),
        poll_interval: worker
            .poll_interval_ms
            .map(Duration::from_millis)
            .unwrap_or(defaults.poll_interval),
    }
}

async fn parse_database(
    config: &settings::Database,
) -> Result<sea_orm::DatabaseConnection, Box<dyn std::error::Error + Send + Sync>> {
    let url = match config {
        Database::Memory => String::from("sqlite::memory:"),
        Database::Sqlite(path) => format!("sqlite:{}?mode=rwc", path),
    };

    let database = sea_orm::Database::connect(url).await?;
    Migrator::up(&database, None).await?;
    Ok(database)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn memory_database_connects_and_migrates() {
        let db = parse_database(&Database::Memory).await.unwrap();
        let engine = engine::Engine::builder().database(db).build().await.unwrap();
        assert!(engine.list_users().await.unwrap().is_empty());
    }

    #[test]
    fn worker_settings_fall_back_to_defaults() {
        let config = worker_config(&settings::Worker {
            concurrency: Some(4),
            backoff_secs: Some(5),
            ..Default::default()
        });
        assert_eq!(config.concurrency, 4);
        assert_eq!(config.backoff, Duration::from_secs(5));
        assert_eq!(config.max_attempts, WorkerConfig::default().max_attempts);
        assert_eq!(config.poll_interval, WorkerConfig::default().poll_interval);
    }
}
