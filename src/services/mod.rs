pub mod audit;
pub mod ledger_service;
pub mod transfer;

pub use audit::AuditTrailService;
pub use ledger_service::{LedgerService, TransferReceipt};
pub use transfer::{TransferLedger, TransferOutcome};
