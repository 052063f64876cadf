//! Domain models for the IOPn ledger.
//!
//! This module contains the database-backed models representing
//! accounts and their audit transactions.

pub mod account;
pub mod transaction;

// Re-export all models for convenient access
pub use account::Account;
pub use transaction::{LedgerTransaction, TransactionKind};
