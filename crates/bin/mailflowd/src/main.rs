//! # mailflowd — mailflow daemon
//!
//! Composition root that wires all adapters together and starts the server.
//!
//! ## Responsibilities
//! - Parse configuration (config file, env vars)
//! - Initialize logging
//! - Initialize the `SQLite` connection pool and run migrations
//! - Construct repository and transport implementations (adapters)
//! - Construct application services, injecting adapters via port traits
//! - Optionally start the periodic queue worker
//! - Build the axum router, bind to a TCP port and serve
//! - Handle graceful shutdown (SIGTERM/SIGINT)
//!
//! ## Dependency rule
//! This is the **only** crate that depends on all other crates.
//! It is the wiring layer — no domain logic belongs here.

mod config;

use std::sync::Arc;

use anyhow::Context;
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

use mailflow_adapter_http_axum::auth::ApiTokens;
use mailflow_adapter_http_axum::router;
use mailflow_adapter_http_axum::state::AppState;
use mailflow_adapter_smtp_lettre::{LoggingMailer, Mailer, SmtpMailer};
use mailflow_adapter_storage_sqlite_sqlx::{
    Config as StorageConfig, SqliteAutomationRepository, SqliteQueueRepository,
};
use mailflow_app::services::queue_processor::QueueProcessor;
use mailflow_app::services::queue_worker::QueueWorker;

use crate::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load().context("failed to load configuration")?;

    let filter = EnvFilter::try_new(&config.logging.filter)
        .with_context(|| format!("invalid log filter {:?}", config.logging.filter))?;
    tracing_subscriber::fmt().with_env_filter(filter).init();

    // Database
    let db = StorageConfig {
        database_url: config.database.url.clone(),
        max_connections: config.database.max_connections,
    }
    .build()
    .await
    .context("failed to open database")?;
    let pool = db.pool().clone();

    // Repositories
    let automation_repo = SqliteAutomationRepository::new(pool.clone());
    let queue_repo = SqliteQueueRepository::new(pool);

    // Transport
    let mailer = if config.smtp.enabled {
        let smtp = config.smtp_config();
        tracing::info!(host = %smtp.host, port = smtp.port, "smtp delivery enabled");
        Mailer::Smtp(SmtpMailer::new(&smtp).context("failed to configure smtp")?)
    } else {
        tracing::warn!("smtp disabled, emails will only be logged");
        Mailer::Logging(LoggingMailer)
    };

    // Services
    let processor = Arc::new(QueueProcessor::new(
        queue_repo.clone(),
        mailer,
        config.processor_settings(),
    ));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let worker = config.poll_interval().map(|interval| {
        tokio::spawn(QueueWorker::new(Arc::clone(&processor), interval).run(shutdown_rx))
    });

    // HTTP
    let tokens = ApiTokens::new(config.auth.tokens.clone());
    if tokens.is_open() {
        tracing::warn!("no api token configured, the api is open to anyone who can reach it");
    }
    let state = AppState::new(automation_repo, queue_repo, processor);
    let app = router::build(state, tokens);

    let bind_addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {bind_addr}"))?;
    tracing::info!(addr = %bind_addr, "mailflowd listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    shutdown_tx.send_replace(true);
    if let Some(worker) = worker {
        worker.await.context("queue worker panicked")?;
    }
    tracing::info!("mailflowd stopped");
    Ok(())
}

/// Resolve on Ctrl-C or, on Unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to listen for sigterm");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
    tracing::info!("shutdown requested");
}
