pub mod ledger_repository;

// Re-export for convenient access
pub use ledger_repository::LedgerRepository;
