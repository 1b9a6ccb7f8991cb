//! In-memory repository implementation
//!
//! Backs the ledger with plain maps behind async read-write locks. The
//! conditional balance write does its compare and its write inside one
//! write-lock critical section, which gives it the same atomicity the
//! DuckDB adapter gets from a single UPDATE statement.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::result::{Error, Result};
use crate::domain::{Account, Transaction};
use crate::ports::{AccountRepository, BalanceWrite, TransactionRepository};

/// In-memory repository implementation
#[derive(Default)]
pub struct MemoryRepository {
    accounts: RwLock<HashMap<Uuid, Account>>,
    /// Append-only; vector order is insertion order
    transactions: RwLock<Vec<Transaction>>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AccountRepository for MemoryRepository {
    async fn add_account(&self, account: &Account) -> Result<()> {
        let mut accounts = self.accounts.write().await;
        if accounts.contains_key(&account.id) {
            return Err(Error::storage(format!(
                "account {} already exists",
                account.id
            )));
        }
        accounts.insert(account.id, account.clone());
        Ok(())
    }

    async fn get_accounts(&self) -> Result<Vec<Account>> {
        Ok(self.accounts.read().await.values().cloned().collect())
    }

    async fn get_account_by_id(&self, id: Uuid) -> Result<Option<Account>> {
        Ok(self.accounts.read().await.get(&id).cloned())
    }

    async fn rename_account(
        &self,
        id: Uuid,
        name: &str,
        updated_at: DateTime<Utc>,
    ) -> Result<bool> {
        let mut accounts = self.accounts.write().await;
        match accounts.get_mut(&id) {
            Some(account) => {
                account.name = name.to_string();
                account.updated_at = updated_at;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_account(&self, id: Uuid) -> Result<bool> {
        Ok(self.accounts.write().await.remove(&id).is_some())
    }

    async fn update_balance(
        &self,
        id: Uuid,
        expected: Decimal,
        new: Decimal,
        updated_at: DateTime<Utc>,
    ) -> Result<BalanceWrite> {
        let mut accounts = self.accounts.write().await;
        match accounts.get_mut(&id) {
            Some(account) if account.balance == expected => {
                account.balance = new;
                account.updated_at = updated_at;
                Ok(BalanceWrite::Applied)
            }
            Some(_) => Ok(BalanceWrite::Conflict),
            None => Ok(BalanceWrite::Missing),
        }
    }
}

#[async_trait]
impl TransactionRepository for MemoryRepository {
    async fn add_transaction(&self, tx: &Transaction) -> Result<()> {
        self.transactions.write().await.push(tx.clone());
        Ok(())
    }

    async fn get_transactions(&self) -> Result<Vec<Transaction>> {
        Ok(self.transactions.read().await.clone())
    }

    async fn get_transaction_by_id(&self, id: Uuid) -> Result<Option<Transaction>> {
        Ok(self
            .transactions
            .read()
            .await
            .iter()
            .find(|tx| tx.id == id)
            .cloned())
    }

    async fn get_transactions_by_account(&self, account_id: Uuid) -> Result<Vec<Transaction>> {
        Ok(self
            .transactions
            .read()
            .await
            .iter()
            .filter(|tx| tx.involves(account_id))
            .cloned()
            .collect())
    }
}
