//! Transaction models for the audit trail

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Kinds of balance movement recorded in the audit log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    Earned,
    Spent,
    Bonus,
}

impl TransactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Earned => "earned",
            Self::Spent => "spent",
            Self::Bonus => "bonus",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "earned" => Some(Self::Earned),
            "spent" => Some(Self::Spent),
            "bonus" => Some(Self::Bonus),
            _ => None,
        }
    }
}

/// Append-only transaction record. One row per credit, debit, welcome
/// bonus or transfer leg; amounts are always positive.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct LedgerTransaction {
    pub id: i64,
    pub account_id: String,
    pub amount: i64,
    pub kind: String,
    pub description: String,
    pub source: String,
    pub created_at: DateTime<Utc>,
}

impl LedgerTransaction {
    pub fn kind(&self) -> Option<TransactionKind> {
        TransactionKind::from_str(&self.kind)
    }
}
