//! Transaction domain model

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle state of a transaction
///
/// `Pending` only exists on the in-memory value while a mutation is being
/// applied. Persisted rows are always `Completed` or `Failed`, and neither
/// state ever changes again once written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    Pending,
    Completed,
    Failed,
}

impl TransactionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

/// What a transaction did, derived from which endpoints are present
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionKind {
    Deposit,
    Withdrawal,
    Transfer,
}

impl TransactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Deposit => "deposit",
            Self::Withdrawal => "withdrawal",
            Self::Transfer => "transfer",
        }
    }
}

/// A recorded money movement between zero, one, or two accounts
///
/// Deposits have no source (`from_account_id` is `None`), withdrawals have
/// no destination, transfers have both. The amount is strictly positive;
/// direction is carried by the endpoints, never by the sign.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub id: Uuid,
    pub from_account_id: Option<Uuid>,
    pub to_account_id: Option<Uuid>,
    pub amount: Decimal,
    pub description: Option<String>,
    /// Set once at creation, never mutated
    pub timestamp: DateTime<Utc>,
    pub status: TransactionStatus,
}

impl Transaction {
    fn new(
        from_account_id: Option<Uuid>,
        to_account_id: Option<Uuid>,
        amount: Decimal,
        description: Option<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            from_account_id,
            to_account_id,
            amount,
            description,
            timestamp: Utc::now(),
            status: TransactionStatus::Pending,
        }
    }

    /// A pending deposit into `to`
    pub fn deposit(to: Uuid, amount: Decimal, description: Option<String>) -> Self {
        Self::new(None, Some(to), amount, description)
    }

    /// A pending withdrawal out of `from`
    pub fn withdrawal(from: Uuid, amount: Decimal, description: Option<String>) -> Self {
        Self::new(Some(from), None, amount, description)
    }

    /// A pending transfer from `from` to `to`
    pub fn transfer(from: Uuid, to: Uuid, amount: Decimal, description: Option<String>) -> Self {
        Self::new(Some(from), Some(to), amount, description)
    }

    /// Mark as successfully applied
    pub fn completed(mut self) -> Self {
        self.status = TransactionStatus::Completed;
        self
    }

    /// Mark as attempted but not applied
    pub fn failed(mut self) -> Self {
        self.status = TransactionStatus::Failed;
        self
    }

    /// True if the account is either endpoint
    pub fn involves(&self, account_id: Uuid) -> bool {
        self.from_account_id == Some(account_id) || self.to_account_id == Some(account_id)
    }

    pub fn kind(&self) -> TransactionKind {
        match (self.from_account_id, self.to_account_id) {
            (Some(_), Some(_)) => TransactionKind::Transfer,
            (Some(_), None) => TransactionKind::Withdrawal,
            _ => TransactionKind::Deposit,
        }
    }
}
