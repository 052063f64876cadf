use crate::error::{LedgerError, LedgerResult};
use crate::models::{Account, LedgerTransaction, TransactionKind};
use crate::repositories::LedgerRepository;
use crate::services::audit::AuditTrailService;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

/// Default page size for transaction history
const DEFAULT_HISTORY_LIMIT: i64 = 50;
const MAX_HISTORY_LIMIT: i64 = 500;

/// Result of a completed transfer
#[derive(Debug)]
pub struct TransferReceipt {
    pub transfer_id: Uuid,
    pub amount: i64,
    pub from: Account,
    pub to: Account,
}

/// Service translating domain intent (credit, debit, transfer) into
/// atomic store mutations, with input validation up front so invalid
/// requests never touch the database.
pub struct LedgerService {
    repo: Arc<LedgerRepository>,
    audit: Option<Arc<AuditTrailService>>,
    seed_balance: i64,
}

impl LedgerService {
    pub fn new(
        repo: Arc<LedgerRepository>,
        audit: Option<Arc<AuditTrailService>>,
        seed_balance: i64,
    ) -> Self {
        Self {
            repo,
            audit,
            seed_balance,
        }
    }

    /// Read an account balance, provisioning unknown ids with the seed
    /// balance. Reads never fail on unknown accounts.
    pub async fn balance(&self, id: &str) -> LedgerResult<Account> {
        let (account, created) = self.repo.get_or_create(id, self.seed_balance).await?;

        if created {
            info!(account = id, seed = self.seed_balance, "provisioned account");
            if let Some(audit) = &self.audit {
                if let Err(e) = audit.log_provisioned(id, self.seed_balance).await {
                    warn!(account = id, error = %e, "audit write failed");
                }
            }
        }

        Ok(account)
    }

    /// Add tokens to an account. Rejects non-positive amounts before
    /// touching the store.
    pub async fn credit(
        &self,
        id: &str,
        amount: i64,
        reason: &str,
        source: &str,
    ) -> LedgerResult<Account> {
        if amount <= 0 {
            return Err(LedgerError::InvalidAmount(amount));
        }

        // Auto-provision so crediting a fresh id works like the first read
        self.balance(id).await?;

        let account = self
            .repo
            .apply_delta(id, amount, TransactionKind::Earned, reason, source)
            .await?;

        info!(account = id, amount, balance = account.balance, "credit");
        if let Some(audit) = &self.audit {
            // The store mutation is committed at this point; a failed
            // audit write must not turn a successful credit into an error
            if let Err(e) = audit
                .log_mutation("credit", id, amount, account.balance, reason, source)
                .await
            {
                warn!(account = id, error = %e, "audit write failed");
            }
        }

        Ok(account)
    }

    /// Remove tokens from an account. The sufficiency check runs here for
    /// a fast rejection and again inside the store mutation under the row
    /// lock, so racing debits cannot both pass.
    pub async fn debit(
        &self,
        id: &str,
        amount: i64,
        reason: &str,
        source: &str,
    ) -> LedgerResult<Account> {
        if amount <= 0 {
            return Err(LedgerError::InvalidAmount(amount));
        }

        let current = self.balance(id).await?;
        if current.balance < amount {
            return Err(LedgerError::InsufficientBalance {
                available: current.balance,
                required: amount,
            });
        }

        let account = self
            .repo
            .apply_delta(id, -amount, TransactionKind::Spent, reason, source)
            .await?;

        info!(account = id, amount, balance = account.balance, "debit");
        if let Some(audit) = &self.audit {
            if let Err(e) = audit
                .log_mutation("debit", id, amount, account.balance, reason, source)
                .await
            {
                warn!(account = id, error = %e, "audit write failed");
            }
        }

        Ok(account)
    }

    /// Move tokens between two accounts as one atomic store transaction.
    /// Either both legs commit or neither does, so the two-round-trip
    /// compose-and-refund dance of the legacy dashboard client is not
    /// needed when going through this service.
    pub async fn transfer(
        &self,
        from: &str,
        to: &str,
        amount: i64,
        reason: &str,
    ) -> LedgerResult<TransferReceipt> {
        if amount <= 0 {
            return Err(LedgerError::InvalidAmount(amount));
        }
        if from == to {
            return Err(LedgerError::SelfTransfer(from.to_string()));
        }

        // Provision both ends; a transfer to a fresh id should land on a
        // seeded account exactly like a first read would create.
        self.balance(from).await?;
        self.balance(to).await?;

        let transfer_id = Uuid::new_v4();
        let (from_account, to_account) = self
            .repo
            .transfer(from, to, amount, reason, transfer_id)
            .await?;

        info!(
            %transfer_id,
            from,
            to,
            amount,
            from_balance = from_account.balance,
            to_balance = to_account.balance,
            "transfer complete"
        );
        if let Some(audit) = &self.audit {
            if let Err(e) = audit.log_transfer(transfer_id, from, to, amount).await {
                warn!(%transfer_id, error = %e, "audit write failed");
            }
        }

        Ok(TransferReceipt {
            transfer_id,
            amount,
            from: from_account,
            to: to_account,
        })
    }

    /// Paginated transaction history, newest first
    pub async fn transactions(
        &self,
        id: &str,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> LedgerResult<Vec<LedgerTransaction>> {
        let limit = limit
            .unwrap_or(DEFAULT_HISTORY_LIMIT)
            .clamp(1, MAX_HISTORY_LIMIT);
        let offset = offset.unwrap_or(0).max(0);

        let rows = self.repo.transactions(id, limit, offset).await?;
        Ok(rows)
    }
}
