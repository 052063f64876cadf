//! Account model for token balance tracking

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A ledger account keyed by an opaque identifier (wallet address or
/// Discord snowflake). The service never interprets the key format.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Account {
    pub id: String,
    pub balance: i64,
    pub total_earned: i64,
    pub total_spent: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Account {
    /// Invariant check: balance is the difference of the lifetime counters
    /// and never negative.
    pub fn is_consistent(&self) -> bool {
        self.balance >= 0 && self.balance == self.total_earned - self.total_spent
    }
}
