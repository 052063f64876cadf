//! Two-leg transfer orchestration with compensating rollback.
//!
//! The dashboard historically composed a transfer from two independent
//! `subtract`/`add` calls, refunded the sender when the second leg failed,
//! and flagged the case where the refund itself failed. The server now
//! offers an atomic transfer endpoint, but this orchestration survives as
//! the client-tier compatibility path for deployments that predate it.
//! Its observable semantics are the contract: success, failure with no
//! side effects, rolled back, or unrecoverable.

use crate::error::{LedgerError, LedgerResult};
use async_trait::async_trait;
use tracing::{error, warn};

/// The two single-account operations a transfer is composed from. Each
/// implementation must make its legs individually atomic; the composition
/// across legs is what this module manages.
#[async_trait]
pub trait TransferLedger {
    /// Add tokens; returns the new balance
    async fn credit(
        &self,
        account: &str,
        amount: i64,
        reason: &str,
        source: &str,
    ) -> LedgerResult<i64>;

    /// Remove tokens; returns the new balance
    async fn debit(
        &self,
        account: &str,
        amount: i64,
        reason: &str,
        source: &str,
    ) -> LedgerResult<i64>;
}

/// Outcome of a successful orchestrated transfer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferOutcome {
    pub from: String,
    pub to: String,
    pub amount: i64,
    pub from_balance: i64,
    pub to_balance: i64,
}

/// Debit the sender, credit the receiver, and compensate the sender if
/// the credit leg fails.
///
/// Failure taxonomy:
/// - debit leg fails: the transfer aborts with no side effects and the
///   underlying error propagates unchanged.
/// - credit leg fails, refund succeeds: `TransferRolledBack`.
/// - credit leg fails, refund fails: `TransferUnrecoverable`. The sender
///   has been debited with no matching credit. Logged at error severity
///   for manual reconciliation.
pub async fn orchestrate<L>(
    ledger: &L,
    from: &str,
    to: &str,
    amount: i64,
    reason: &str,
) -> LedgerResult<TransferOutcome>
where
    L: TransferLedger + ?Sized,
{
    if amount <= 0 {
        return Err(LedgerError::InvalidAmount(amount));
    }
    if from == to {
        return Err(LedgerError::SelfTransfer(from.to_string()));
    }

    let from_balance = ledger
        .debit(from, amount, &format!("{} to {}", reason, to), "transfer")
        .await?;

    match ledger
        .credit(to, amount, &format!("{} from {}", reason, from), "transfer")
        .await
    {
        Ok(to_balance) => Ok(TransferOutcome {
            from: from.to_string(),
            to: to.to_string(),
            amount,
            from_balance,
            to_balance,
        }),
        Err(credit_err) => {
            warn!(
                from,
                to, amount, error = %credit_err,
                "transfer credit leg failed, refunding sender"
            );

            match ledger.credit(from, amount, "Transfer refund", "system").await {
                Ok(_) => Err(LedgerError::TransferRolledBack(credit_err.to_string())),
                Err(refund_err) => {
                    error!(
                        from,
                        to,
                        amount,
                        credit_error = %credit_err,
                        refund_error = %refund_err,
                        "transfer compensation failed; sender debited with no matching credit"
                    );
                    Err(LedgerError::TransferUnrecoverable(format!(
                        "credit failed ({}), refund failed ({})",
                        credit_err, refund_err
                    )))
                }
            }
        }
    }
}
