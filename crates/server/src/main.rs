//! hollow-rs background service entry point.
//!
//! Rebuilds the hot list, then runs the delayed-task scheduler and the task
//! worker until a shutdown signal arrives.

use std::sync::Arc;

use hollow_common::{Config, FastStore, Keyspace, LoadAverage, RedisStore};
use hollow_core::{
    ColdStart, EmailService, HttpPushDispatcher, NoOpPushDispatcher, PushDispatcher,
    PushNotificationService, RankingCache,
};
use hollow_db::repositories::{
    AttentionRepository, CommentRepository, PostRepository, PushMessageRepository,
    PushSettingsRepository,
};
use hollow_queue::{DelayedScheduler, EmailHandler, PushHandler, TaskType, Worker};
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Waits for a shutdown signal (SIGINT or SIGTERM).
///
/// On Unix systems, this listens for both SIGINT (Ctrl+C) and SIGTERM.
/// On Windows, this only listens for Ctrl+C.
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received SIGINT, shutting down");
        },
        () = terminate => {
            info!("Received SIGTERM, shutting down");
        },
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "hollow=debug".into()),
        )
        .init();

    info!("Starting hollow-rs...");

    let config = Config::load()?;

    let db = hollow_db::init(&config.database).await?;
    info!("Connected to database");
    hollow_db::migrate(&db).await?;
    info!("Migrations completed");
    let db = Arc::new(db);

    let redis = Arc::new(RedisStore::connect(&config.redis.url).await?);
    let store: Arc<dyn FastStore> = redis.clone();
    let keys = Keyspace::new(config.redis.prefix.clone());

    let post_repo = PostRepository::new(Arc::clone(&db));
    let comment_repo = CommentRepository::new(Arc::clone(&db));

    let ranking = RankingCache::new(
        Arc::clone(&store),
        keys.clone(),
        post_repo.clone(),
        Arc::new(LoadAverage::new()),
        config.ranking.clone(),
    );
    match ranking.cold_start().await {
        Ok(ColdStart::Loaded(count)) => info!(count, "Hot list loaded"),
        Ok(ColdStart::Skipped { load }) => info!(?load, "Hot list cold start skipped"),
        Err(e) => warn!(error = %e, "Hot list cold start failed"),
    }

    let push_dispatcher: Arc<dyn PushDispatcher> = match &config.push.endpoint {
        Some(endpoint) => {
            info!(endpoint = %endpoint, "Push dispatch enabled");
            Arc::new(HttpPushDispatcher::new(endpoint.clone()))
        }
        None => {
            info!("No push endpoint configured, push messages are stored only");
            Arc::new(NoOpPushDispatcher)
        }
    };
    let push_service = PushNotificationService::new(
        post_repo,
        comment_repo,
        AttentionRepository::new(Arc::clone(&db)),
        PushSettingsRepository::new(Arc::clone(&db)),
        PushMessageRepository::new(Arc::clone(&db)),
        push_dispatcher,
    );
    let email_service = EmailService::from_config(&config.email)?;

    let scheduler = DelayedScheduler::new(
        Arc::clone(&store),
        keys.clone(),
        config.queue.poll_interval(),
    )
    .spawn();
    info!("Delayed task scheduler started");

    let worker = Worker::new(store, keys, config.queue.retry_delay())
        .register(TaskType::EmailSend, Arc::new(EmailHandler::new(email_service)))
        .register(
            TaskType::PushNotification,
            Arc::new(PushHandler::new(push_service)),
        )
        .spawn();
    info!("Task worker started");

    shutdown_signal().await;

    worker.abort();
    scheduler.abort();
    redis.shutdown().await?;

    info!("Shutdown complete");
    Ok(())
}
