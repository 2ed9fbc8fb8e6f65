//! Wallet and ledger transaction types.
//!
//! Amounts are integers in the smallest currency unit. A wallet balance is
//! never negative and every change to it is paired with exactly one
//! [`Transaction`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use std::fmt;
use std::str::FromStr;

/// A user's wallet.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Wallet {
    pub user_id: Uuid,
    pub balance: i64,
    pub updated_at: DateTime<Utc>,
}

/// Direction of a ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    Credit,
    Debit,
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransactionKind::Credit => write!(f, "credit"),
            TransactionKind::Debit => write!(f, "debit"),
        }
    }
}

impl FromStr for TransactionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "credit" => Ok(TransactionKind::Credit),
            "debit" => Ok(TransactionKind::Debit),
            other => Err(format!("invalid transaction kind: '{other}'")),
        }
    }
}

/// Settlement status of a ledger entry.
///
/// Maps to the CHECK constraint in the SQLite schema:
/// `CHECK (status IN ('pending', 'completed', 'failed'))`
///
/// The only permitted transitions are `pending -> completed` and
/// `pending -> failed`, each at most once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    Pending,
    Completed,
    Failed,
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransactionStatus::Pending => write!(f, "pending"),
            TransactionStatus::Completed => write!(f, "completed"),
            TransactionStatus::Failed => write!(f, "failed"),
        }
    }
}

impl FromStr for TransactionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(TransactionStatus::Pending),
            "completed" => Ok(TransactionStatus::Completed),
            "failed" => Ok(TransactionStatus::Failed),
            other => Err(format!("invalid transaction status: '{other}'")),
        }
    }
}

/// An immutable ledger entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub id: Uuid,
    pub user_id: Uuid,
    pub kind: TransactionKind,
    /// Always positive; the direction is carried by `kind`.
    pub amount: i64,
    /// Wallet balance right after this entry was applied. `None` while the
    /// entry is pending or after it failed.
    pub resulting_balance: Option<i64>,
    pub description: String,
    /// Payment-gateway order id. Unique across all transactions when present.
    pub external_ref: Option<String>,
    /// Payment-gateway payment id, recorded when a credit settles.
    pub external_payment_id: Option<String>,
    pub status: TransactionStatus,
    pub created_at: DateTime<Utc>,
}

/// One page of a user's transaction history, most recent first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionPage {
    pub transactions: Vec<Transaction>,
    pub page: u32,
    pub limit: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_parse() {
        assert_eq!(
            "pending".parse::<TransactionStatus>().unwrap(),
            TransactionStatus::Pending
        );
        assert!("settled".parse::<TransactionStatus>().is_err());
    }

    #[test]
    fn test_kind_serde() {
        let json = serde_json::to_string(&TransactionKind::Debit).unwrap();
        assert_eq!(json, "\"debit\"");
        let parsed: TransactionKind = serde_json::from_str("\"credit\"").unwrap();
        assert_eq!(parsed, TransactionKind::Credit);
    }

    #[test]
    fn test_pending_transaction_serializes_without_balance() {
        let tx = Transaction {
            id: Uuid::now_v7(),
            user_id: Uuid::now_v7(),
            kind: TransactionKind::Credit,
            amount: 500,
            resulting_balance: None,
            description: "Wallet recharge".to_string(),
            external_ref: Some("order_1".to_string()),
            external_payment_id: None,
            status: TransactionStatus::Pending,
            created_at: Utc::now(),
        };
        let json = serde_json::to_value(&tx).unwrap();
        assert_eq!(json["status"], "pending");
        assert!(json["resulting_balance"].is_null());
    }
}
