//! IOPn Ledger Library
//!
//! This module exposes the ledger components for use by tests and other
//! consumers: the store, the ledger operations, the transfer
//! orchestration, the HTTP surface, and the client shim.

pub mod api;
pub mod client;
pub mod config;
pub mod database;
pub mod error;
pub mod models;
pub mod repositories;
pub mod services;

// Re-export commonly used types
pub use config::AppConfig;
pub use error::{LedgerError, LedgerResult};

use database::Database;
use repositories::LedgerRepository;
use services::{AuditTrailService, LedgerService};
use std::sync::Arc;

/// Application state containing the ledger service and the database
/// handle
pub struct AppState {
    pub database: Database,
    pub ledger: Arc<LedgerService>,
}

impl AppState {
    /// Create a new AppState with initialized repositories and services
    pub fn new(
        pool: sqlx::PgPool,
        audit: Option<Arc<AuditTrailService>>,
        seed_balance: i64,
    ) -> Self {
        let database = Database::new(pool.clone());
        let ledger_repo = Arc::new(LedgerRepository::new(pool));
        let ledger = Arc::new(LedgerService::new(ledger_repo, audit, seed_balance));

        Self { database, ledger }
    }
}
