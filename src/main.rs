//! IOPn Ledger Service
//!
//! Main entry point for the token balance ledger backing the IOPn
//! dashboard. This service provides:
//! - HTTP JSON API for balance reads, credits, debits and transfers
//! - Append-only transaction audit trail (database + JSONL file)

use iopn_ledger::api::create_router;
use iopn_ledger::config::AppConfig;
use iopn_ledger::database::{self, create_pool};
use iopn_ledger::error::{LedgerError, LedgerResult};
use iopn_ledger::services::AuditTrailService;
use iopn_ledger::AppState;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> LedgerResult<()> {
    // Load environment variables first
    dotenv::dotenv().ok();

    // Load configuration
    let config = AppConfig::from_env().map_err(|e| {
        eprintln!("Configuration error: {}", e);
        LedgerError::Config(e)
    })?;

    // Initialize tracing/logging with config
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("iopn_ledger={},sqlx=warn,axum=info", config.log_level).into()
            }),
        )
        .init();

    info!("IOPn ledger service starting");
    info!("Environment: {}", config.environment);
    info!("Log level: {}", config.log_level);
    info!("HTTP port: {}", config.http_port);
    info!("Seed balance: {} tokens", config.seed_balance);

    // =========================================================================
    // DATABASE SETUP
    // =========================================================================
    info!("Connecting to database...");

    let pool = create_pool(&config.database).await.map_err(|e| {
        error!("Failed to create database pool: {}", e);
        LedgerError::Database(e)
    })?;

    info!("Database connection pool created successfully");
    info!("Max connections: {}", config.database.max_connections);

    // Run migrations
    info!("Running database migrations...");
    database::run_migrations(&pool, None).await.map_err(|e| {
        error!("Database migration failed: {}", e);
        LedgerError::Database(e)
    })?;

    info!("Database migrations completed successfully");

    // =========================================================================
    // CORE SERVICES INITIALIZATION
    // =========================================================================
    info!("Initializing core services...");

    // Audit trail: JSONL mirror of the transactions table
    let audit_log_dir = std::path::PathBuf::from(&config.audit_log_dir);
    let audit = match AuditTrailService::new(audit_log_dir) {
        Ok(service) => Some(Arc::new(service)),
        Err(e) => {
            // The transactions table still records everything; losing
            // the file mirror is not fatal.
            warn!("Audit trail unavailable: {}", e);
            None
        }
    };
    info!(
        "Audit trail {}",
        if audit.is_some() { "initialized" } else { "disabled" }
    );

    let state = Arc::new(AppState::new(pool, audit, config.seed_balance));
    info!("Ledger service initialized");

    // =========================================================================
    // START SERVER
    // =========================================================================
    let addr: SocketAddr = format!("0.0.0.0:{}", config.http_port)
        .parse()
        .map_err(|e| LedgerError::Config(format!("Invalid HTTP address: {}", e)))?;

    info!("Starting HTTP server on {}...", addr);

    let app = create_router(state);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| LedgerError::Message(format!("Failed to bind HTTP server: {}", e)))?;

    info!("IOPn ledger service ready on {}", addr);
    info!("Press Ctrl+C to shutdown gracefully");

    // =========================================================================
    // SHUTDOWN HANDLING
    // =========================================================================
    let shutdown = async {
        tokio::signal::ctrl_c().await.ok();
        info!("Shutdown signal received, shutting down gracefully...");
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| LedgerError::Message(format!("HTTP server error: {}", e)))?;

    info!("IOPn ledger service shutdown complete");
    Ok(())
}
