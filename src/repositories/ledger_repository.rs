//! Repository for account balance and transaction operations

use crate::error::StoreError;
use crate::models::{Account, LedgerTransaction, TransactionKind};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

const SELECT_ACCOUNT: &str =
    "SELECT id, balance, total_earned, total_spent, created_at, updated_at \
     FROM accounts WHERE id = $1";

const SELECT_ACCOUNT_FOR_UPDATE: &str =
    "SELECT id, balance, total_earned, total_spent, created_at, updated_at \
     FROM accounts WHERE id = $1 FOR UPDATE";

pub struct LedgerRepository {
    pool: PgPool,
}

impl LedgerRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // =========================================================================
    // Account Operations
    // =========================================================================

    /// Look up an account by its opaque key
    pub async fn get(&self, id: &str) -> Result<Option<Account>, StoreError> {
        let account = sqlx::query_as::<_, Account>(SELECT_ACCOUNT)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(account)
    }

    /// Get an account, provisioning it with the seed balance on first
    /// contact. The seed grant is recorded as a `bonus` transaction so the
    /// welcome tokens appear in the audit trail. Returns the account and
    /// whether it was created by this call.
    pub async fn get_or_create(
        &self,
        id: &str,
        seed_balance: i64,
    ) -> Result<(Account, bool), StoreError> {
        if let Some(account) = self.get(id).await? {
            return Ok((account, false));
        }

        let mut tx = self.pool.begin().await?;

        // ON CONFLICT DO NOTHING: a concurrent first read may have won the
        // insert race, in which case no row comes back and we re-select.
        let inserted = sqlx::query_as::<_, Account>(
            "INSERT INTO accounts (id, balance, total_earned, total_spent) \
             VALUES ($1, $2, $2, 0) \
             ON CONFLICT (id) DO NOTHING \
             RETURNING id, balance, total_earned, total_spent, created_at, updated_at",
        )
        .bind(id)
        .bind(seed_balance)
        .fetch_optional(&mut *tx)
        .await?;

        match inserted {
            Some(account) => {
                if seed_balance > 0 {
                    self.record_transaction(
                        &mut tx,
                        id,
                        seed_balance,
                        TransactionKind::Bonus,
                        "Welcome bonus",
                        "system",
                    )
                    .await?;
                }
                tx.commit().await?;
                Ok((account, true))
            }
            None => {
                tx.rollback().await?;
                let account = self
                    .get(id)
                    .await?
                    .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
                Ok((account, false))
            }
        }
    }

    // =========================================================================
    // Balance Mutations
    // =========================================================================

    /// Apply a signed delta to an account balance as one atomic unit:
    /// row lock, balance check, counter update and audit row all happen
    /// inside a single database transaction, so concurrent debits cannot
    /// both pass the sufficiency check.
    pub async fn apply_delta(
        &self,
        id: &str,
        delta: i64,
        kind: TransactionKind,
        description: &str,
        source: &str,
    ) -> Result<Account, StoreError> {
        let mut tx = self.pool.begin().await?;

        let current = sqlx::query_as::<_, Account>(SELECT_ACCOUNT_FOR_UPDATE)
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;

        if delta < 0 && current.balance + delta < 0 {
            return Err(StoreError::InsufficientBalance {
                available: current.balance,
                required: -delta,
            });
        }

        let updated = if delta >= 0 {
            sqlx::query_as::<_, Account>(
                "UPDATE accounts \
                 SET balance = balance + $2, total_earned = total_earned + $2, updated_at = NOW() \
                 WHERE id = $1 \
                 RETURNING id, balance, total_earned, total_spent, created_at, updated_at",
            )
            .bind(id)
            .bind(delta)
            .fetch_one(&mut *tx)
            .await?
        } else {
            sqlx::query_as::<_, Account>(
                "UPDATE accounts \
                 SET balance = balance - $2, total_spent = total_spent + $2, updated_at = NOW() \
                 WHERE id = $1 \
                 RETURNING id, balance, total_earned, total_spent, created_at, updated_at",
            )
            .bind(id)
            .bind(-delta)
            .fetch_one(&mut *tx)
            .await?
        };

        self.record_transaction(&mut tx, id, delta.abs(), kind, description, source)
            .await?;

        tx.commit().await?;

        Ok(updated)
    }

    /// Move tokens between two accounts inside a single database
    /// transaction. Both rows are locked in sorted-key order so two
    /// opposing transfers cannot deadlock; partial failure is impossible
    /// because either both legs commit or neither does.
    pub async fn transfer(
        &self,
        from: &str,
        to: &str,
        amount: i64,
        reason: &str,
        transfer_id: Uuid,
    ) -> Result<(Account, Account), StoreError> {
        let mut tx = self.pool.begin().await?;

        // Lock in deterministic order regardless of transfer direction
        let (first, second) = if from <= to { (from, to) } else { (to, from) };
        for key in [first, second] {
            sqlx::query_as::<_, Account>(SELECT_ACCOUNT_FOR_UPDATE)
                .bind(key)
                .fetch_optional(&mut *tx)
                .await?
                .ok_or_else(|| StoreError::NotFound(key.to_string()))?;
        }

        let sender = sqlx::query_as::<_, Account>(SELECT_ACCOUNT)
            .bind(from)
            .fetch_one(&mut *tx)
            .await?;

        if sender.balance < amount {
            return Err(StoreError::InsufficientBalance {
                available: sender.balance,
                required: amount,
            });
        }

        let debited = sqlx::query_as::<_, Account>(
            "UPDATE accounts \
             SET balance = balance - $2, total_spent = total_spent + $2, updated_at = NOW() \
             WHERE id = $1 \
             RETURNING id, balance, total_earned, total_spent, created_at, updated_at",
        )
        .bind(from)
        .bind(amount)
        .fetch_one(&mut *tx)
        .await?;

        let credited = sqlx::query_as::<_, Account>(
            "UPDATE accounts \
             SET balance = balance + $2, total_earned = total_earned + $2, updated_at = NOW() \
             WHERE id = $1 \
             RETURNING id, balance, total_earned, total_spent, created_at, updated_at",
        )
        .bind(to)
        .bind(amount)
        .fetch_one(&mut *tx)
        .await?;

        self.record_transaction(
            &mut tx,
            from,
            amount,
            TransactionKind::Spent,
            &format!("{} to {} (transfer {})", reason, to, transfer_id),
            "transfer",
        )
        .await?;

        self.record_transaction(
            &mut tx,
            to,
            amount,
            TransactionKind::Earned,
            &format!("{} from {} (transfer {})", reason, from, transfer_id),
            "transfer",
        )
        .await?;

        tx.commit().await?;

        Ok((debited, credited))
    }

    // =========================================================================
    // Transaction History
    // =========================================================================

    /// Paginated transaction history for an account, newest first
    pub async fn transactions(
        &self,
        id: &str,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<LedgerTransaction>, StoreError> {
        let rows = sqlx::query_as::<_, LedgerTransaction>(
            "SELECT id, account_id, amount, kind, description, source, created_at \
             FROM transactions \
             WHERE account_id = $1 \
             ORDER BY created_at DESC, id DESC \
             LIMIT $2 OFFSET $3",
        )
        .bind(id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    async fn record_transaction(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        account_id: &str,
        amount: i64,
        kind: TransactionKind,
        description: &str,
        source: &str,
    ) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO transactions (account_id, amount, kind, description, source) \
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(account_id)
        .bind(amount)
        .bind(kind.as_str())
        .bind(description)
        .bind(source)
        .execute(&mut **tx)
        .await?;

        Ok(())
    }
}
