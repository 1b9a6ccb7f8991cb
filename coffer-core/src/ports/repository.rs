//! Repository ports - storage backend abstraction
//!
//! These traits define everything the ledger requires from durable storage.
//! Any backend that can provide per-entity CRUD plus one atomic conditional
//! balance write can sit behind them; no particular technology is assumed.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::domain::result::Result;
use crate::domain::{Account, Transaction};

/// Outcome of a conditional balance write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BalanceWrite {
    /// The stored balance matched the expected value and was replaced
    Applied,
    /// The stored balance no longer matched; nothing was written
    Conflict,
    /// No account row with that id exists
    Missing,
}

/// Typed access to account records
#[async_trait]
pub trait AccountRepository: Send + Sync {
    /// Persist a new account
    async fn add_account(&self, account: &Account) -> Result<()>;

    /// Get all accounts (unordered snapshot)
    async fn get_accounts(&self) -> Result<Vec<Account>>;

    /// Get an account by id
    async fn get_account_by_id(&self, id: Uuid) -> Result<Option<Account>>;

    /// Update an account's name, advancing `updated_at`
    ///
    /// Metadata only: the balance column is untouched. Returns false if the
    /// account does not exist.
    async fn rename_account(
        &self,
        id: Uuid,
        name: &str,
        updated_at: DateTime<Utc>,
    ) -> Result<bool>;

    /// Delete an account row. Returns false if the account does not exist.
    async fn delete_account(&self, id: Uuid) -> Result<bool>;

    /// Conditionally replace an account's balance
    ///
    /// Writes `new` (and `updated_at`) only if the stored balance still
    /// equals `expected`, atomically with respect to every other writer of
    /// the same account. This is the only path by which a balance changes.
    async fn update_balance(
        &self,
        id: Uuid,
        expected: Decimal,
        new: Decimal,
        updated_at: DateTime<Utc>,
    ) -> Result<BalanceWrite>;
}

/// Typed access to the append-only transaction log
#[async_trait]
pub trait TransactionRepository: Send + Sync {
    /// Append a transaction record. Records are never updated or removed.
    async fn add_transaction(&self, tx: &Transaction) -> Result<()>;

    /// Get all transactions in insertion order
    async fn get_transactions(&self) -> Result<Vec<Transaction>>;

    /// Get a transaction by id
    async fn get_transaction_by_id(&self, id: Uuid) -> Result<Option<Transaction>>;

    /// Get transactions where the account is either endpoint, in insertion order
    async fn get_transactions_by_account(&self, account_id: Uuid) -> Result<Vec<Transaction>>;
}
