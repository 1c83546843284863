//! mrm-admin - admin view mode and audit trail service
//!
//! Startup order: configuration, logging, root folder and database, audit
//! worker, then the HTTP server. On shutdown the audit queue is drained
//! before exit.

use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing::info;

use mrm_admin::audit::{ActionLogger, AuditStore, HttpIpLookup, SqliteAuditStore};
use mrm_admin::config::{AdminConfig, Cli};
use mrm_admin::directory::CompanyDirectory;
use mrm_admin::session::SessionRegistry;
use mrm_admin::{build_router, AppState};
use mrm_common::config::RootFolderInitializer;
use mrm_common::db::init_database;
use mrm_common::{Clock, SystemClock};

/// Timeout for the public IP lookup
const IP_LOOKUP_TIMEOUT: Duration = Duration::from_secs(5);

/// How often idle sessions are swept
const SESSION_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> Result<()> {
    let config = AdminConfig::resolve(Cli::parse());

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level)),
        )
        .init();

    // Build identification first, before any slow startup work
    info!(
        "Starting MRM Admin (mrm-admin) v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let initializer = RootFolderInitializer::new(config.root_folder.clone());
    initializer
        .ensure_directory_exists()
        .context("Failed to create root folder")?;

    let db_path = initializer.database_path();
    info!("Database path: {}", db_path.display());

    let pool = init_database(&db_path)
        .await
        .context("Failed to initialize database")?;
    info!("✓ Database ready");

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let audit_store: Arc<dyn AuditStore> = Arc::new(SqliteAuditStore::new(pool.clone()));
    let ip_lookup = HttpIpLookup::new(&config.ip_lookup_url, IP_LOOKUP_TIMEOUT)
        .context("Failed to build IP lookup client")?;
    let logger = ActionLogger::spawn(audit_store.clone(), Arc::new(ip_lookup));

    let directory = Arc::new(CompanyDirectory::new(
        pool,
        config.company_cache_ttl,
        clock.clone(),
    ));
    let sessions = SessionRegistry::new(config.session_idle_timeout, clock);
    let sweeper = sessions.spawn_sweeper(SESSION_SWEEP_INTERVAL);

    let state = AppState::new(sessions, logger.clone(), directory, audit_store);
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(config.listen_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.listen_addr))?;
    info!("mrm-admin listening on http://{}", config.listen_addr);
    info!("Health check: http://{}/health", config.listen_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    sweeper.abort();
    logger.shutdown().await;
    info!("Shutdown complete");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
