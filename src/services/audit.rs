use crate::error::{LedgerError, LedgerResult};
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;
use uuid::Uuid;

/// Audit log entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditLogEntry {
    pub timestamp: i64,
    pub event_type: String, // "credit", "debit", "transfer", "account_provisioned"
    pub account: Option<String>,
    pub transfer_id: Option<Uuid>,
    pub details: serde_json::Value,
}

/// Audit trail service: an append-only JSONL file alongside the
/// `transactions` table, so balance mutations can be reconciled even if
/// the database is lost.
pub struct AuditTrailService {
    #[allow(dead_code)]
    log_file: PathBuf,
    file_handle: Arc<Mutex<std::fs::File>>,
}

impl AuditTrailService {
    /// Create a new audit trail service writing to a dated file
    pub fn new(log_directory: PathBuf) -> LedgerResult<Self> {
        std::fs::create_dir_all(&log_directory)
            .map_err(|e| LedgerError::Message(format!("Failed to create log directory: {}", e)))?;

        let date = chrono::Utc::now().format("%Y-%m-%d");
        let log_file = log_directory.join(format!("ledger_audit_{}.log", date));

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_file)
            .map_err(|e| LedgerError::Message(format!("Failed to open audit log file: {}", e)))?;

        info!("Audit trail initialized: {:?}", log_file);

        Ok(Self {
            log_file,
            file_handle: Arc::new(Mutex::new(file)),
        })
    }

    /// Log an audit entry
    pub async fn log(&self, entry: AuditLogEntry) -> LedgerResult<()> {
        let json = serde_json::to_string(&entry).map_err(LedgerError::Serialization)?;

        let mut file = self.file_handle.lock().await;
        writeln!(file, "{}", json)
            .map_err(|e| LedgerError::Message(format!("Failed to write audit log: {}", e)))?;

        file.flush()
            .map_err(|e| LedgerError::Message(format!("Failed to flush audit log: {}", e)))?;

        Ok(())
    }

    /// Log a credit or debit against an account
    pub async fn log_mutation(
        &self,
        event_type: &str,
        account: &str,
        amount: i64,
        new_balance: i64,
        reason: &str,
        source: &str,
    ) -> LedgerResult<()> {
        let entry = AuditLogEntry {
            timestamp: chrono::Utc::now().timestamp(),
            event_type: event_type.to_string(),
            account: Some(account.to_string()),
            transfer_id: None,
            details: serde_json::json!({
                "amount": amount,
                "new_balance": new_balance,
                "reason": reason,
                "source": source,
            }),
        };

        self.log(entry).await
    }

    /// Log a completed transfer (both legs committed atomically)
    pub async fn log_transfer(
        &self,
        transfer_id: Uuid,
        from: &str,
        to: &str,
        amount: i64,
    ) -> LedgerResult<()> {
        let entry = AuditLogEntry {
            timestamp: chrono::Utc::now().timestamp(),
            event_type: "transfer".to_string(),
            account: Some(from.to_string()),
            transfer_id: Some(transfer_id),
            details: serde_json::json!({
                "from": from,
                "to": to,
                "amount": amount,
            }),
        };

        self.log(entry).await
    }

    /// Log account provisioning with the seed grant. Free tokens per new
    /// id is an economic event, so every grant is traceable.
    pub async fn log_provisioned(&self, account: &str, seed_balance: i64) -> LedgerResult<()> {
        let entry = AuditLogEntry {
            timestamp: chrono::Utc::now().timestamp(),
            event_type: "account_provisioned".to_string(),
            account: Some(account.to_string()),
            transfer_id: None,
            details: serde_json::json!({ "seed_balance": seed_balance }),
        };

        self.log(entry).await
    }
}
