//! Ledger service - account and money-movement orchestration
//!
//! Single entry point for every ledger operation. Validation happens before
//! any mutation right is taken; balance changes go through the repository's
//! conditional write while the account's right is held; every attempted
//! mutation ends as a persisted `Completed` or `Failed` transaction.

use std::future::Future;
use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use tracing::{debug, error, warn};
use uuid::Uuid;

use crate::domain::result::{Error, Result};
use crate::domain::{Account, Transaction};
use crate::ports::{AccountRepository, BalanceWrite, TransactionRepository};

use super::locks::AccountLocks;

/// Conditional balance writes attempted before a mutation is reported as a
/// conflict. The per-account rights serialize in-process writers, so only
/// an out-of-process writer can force a retry; the budget stays small to
/// bound latency under pathological contention.
pub const DEFAULT_BALANCE_RETRIES: u32 = 5;

/// The ledger service
///
/// Stateless apart from the lock table it shares with its clones; safe to
/// call from any number of concurrent tasks.
#[derive(Clone)]
pub struct LedgerService {
    accounts: Arc<dyn AccountRepository>,
    transactions: Arc<dyn TransactionRepository>,
    locks: Arc<AccountLocks>,
    balance_retries: u32,
}

impl LedgerService {
    pub fn new(
        accounts: Arc<dyn AccountRepository>,
        transactions: Arc<dyn TransactionRepository>,
        locks: Arc<AccountLocks>,
    ) -> Self {
        Self {
            accounts,
            transactions,
            locks,
            balance_retries: DEFAULT_BALANCE_RETRIES,
        }
    }

    /// Override the conditional-write retry budget
    pub fn with_balance_retries(mut self, retries: u32) -> Self {
        self.balance_retries = retries.max(1);
        self
    }

    /// A service backed entirely by the in-memory adapter
    pub fn in_memory() -> Self {
        let repository = Arc::new(crate::adapters::memory::MemoryRepository::new());
        Self::new(
            Arc::clone(&repository) as Arc<dyn AccountRepository>,
            repository,
            Arc::new(AccountLocks::new()),
        )
    }

    // === Accounts ===

    /// Create a new account with a zero balance
    pub async fn create_account(&self, name: &str) -> Result<Account> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::invalid_argument("account name cannot be empty"));
        }

        let account = Account::new(Uuid::new_v4(), name);
        self.accounts.add_account(&account).await?;
        debug!(account_id = %account.id, "account created");
        Ok(account)
    }

    /// Get an account by id
    pub async fn get_account(&self, id: &str) -> Result<Account> {
        let id = parse_account_id(id, "account")?;
        self.require_account(id).await
    }

    /// List all accounts (unordered snapshot)
    pub async fn list_accounts(&self) -> Result<Vec<Account>> {
        self.accounts.get_accounts().await
    }

    /// Change an account's name
    ///
    /// Serialized under the account's mutation right like any other change
    /// to the row; the balance column is never touched.
    pub async fn rename_account(&self, id: &str, name: &str) -> Result<Account> {
        let id = parse_account_id(id, "account")?;
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::invalid_argument("account name cannot be empty"));
        }

        let _guard = self.locks.acquire(id).await;
        if !self.accounts.rename_account(id, name, Utc::now()).await? {
            return Err(Error::not_found(format!("account {id}")));
        }
        self.require_account(id).await
    }

    /// Remove an account
    ///
    /// Administrative operation; refused while any transaction references
    /// the account so history lookups never dangle.
    pub async fn delete_account(&self, id: &str) -> Result<()> {
        let id = parse_account_id(id, "account")?;

        let _guard = self.locks.acquire(id).await;
        self.require_account(id).await?;
        let history = self.transactions.get_transactions_by_account(id).await?;
        if !history.is_empty() {
            return Err(Error::invalid_argument(format!(
                "account {id} has recorded transactions"
            )));
        }
        self.accounts.delete_account(id).await?;
        debug!(account_id = %id, "account deleted");
        Ok(())
    }

    /// All transactions where the account is either endpoint, oldest first
    pub async fn account_transactions(&self, account_id: &str) -> Result<Vec<Transaction>> {
        let account_id = parse_account_id(account_id, "account")?;
        self.require_account(account_id).await?;
        self.transactions.get_transactions_by_account(account_id).await
    }

    // === Money movements ===

    /// Add funds to an account
    pub async fn deposit(
        &self,
        account_id: &str,
        amount: Decimal,
        description: Option<&str>,
    ) -> Result<Transaction> {
        if account_id.trim().is_empty() {
            return Err(Error::invalid_argument("account id cannot be empty"));
        }
        ensure_positive(amount)?;
        let account_id = parse_account_id(account_id, "account")?;
        let description = normalize_description(description);
        self.require_account(account_id).await?;

        let service = self.clone();
        run_to_completion(async move {
            service.apply_deposit(account_id, amount, description).await
        })
        .await
    }

    /// Remove funds from an account
    ///
    /// The balance check runs under the account's mutation right, never
    /// against a stale read. A rejected withdrawal is a validation outcome:
    /// it writes no transaction row and changes nothing.
    pub async fn withdraw(
        &self,
        account_id: &str,
        amount: Decimal,
        description: Option<&str>,
    ) -> Result<Transaction> {
        if account_id.trim().is_empty() {
            return Err(Error::invalid_argument("account id cannot be empty"));
        }
        ensure_positive(amount)?;
        let account_id = parse_account_id(account_id, "account")?;
        let description = normalize_description(description);
        self.require_account(account_id).await?;

        let service = self.clone();
        run_to_completion(async move {
            service.apply_withdrawal(account_id, amount, description).await
        })
        .await
    }

    /// Move funds between two accounts
    ///
    /// Holds both accounts' mutation rights (taken in ascending id order)
    /// for the whole read-verify-write-record sequence. A completed
    /// transfer conserves the sum of the two balances exactly; a failed one
    /// leaves both untouched.
    pub async fn transfer(
        &self,
        from: &str,
        to: &str,
        amount: Decimal,
        description: Option<&str>,
    ) -> Result<Transaction> {
        let (from, to) = (from.trim(), to.trim());
        if from.is_empty() {
            return Err(Error::invalid_argument("source account id cannot be empty"));
        }
        if to.is_empty() {
            return Err(Error::invalid_argument(
                "destination account id cannot be empty",
            ));
        }
        if from == to {
            return Err(Error::invalid_argument(
                "source and destination accounts cannot be the same",
            ));
        }
        ensure_positive(amount)?;
        let from_id = parse_account_id(from, "source account")?;
        let to_id = parse_account_id(to, "destination account")?;
        if from_id == to_id {
            return Err(Error::invalid_argument(
                "source and destination accounts cannot be the same",
            ));
        }
        let description = normalize_description(description);

        // Existence checks name the missing endpoint and run before any
        // right is taken
        if self.accounts.get_account_by_id(from_id).await?.is_none() {
            return Err(Error::not_found(format!("source account {from_id}")));
        }
        if self.accounts.get_account_by_id(to_id).await?.is_none() {
            return Err(Error::not_found(format!("destination account {to_id}")));
        }

        let service = self.clone();
        run_to_completion(async move {
            service.apply_transfer(from_id, to_id, amount, description).await
        })
        .await
    }

    // === Locked mutation phases ===

    async fn apply_deposit(
        &self,
        account_id: Uuid,
        amount: Decimal,
        description: Option<String>,
    ) -> Result<Transaction> {
        let _guard = self.locks.acquire(account_id).await;
        let tx = Transaction::deposit(account_id, amount, description);

        if let Err(err) = self.write_balance(account_id, |balance| Ok(balance + amount)).await {
            return self.record_attempt_failure(tx, err).await;
        }

        let tx = tx.completed();
        if let Err(err) = self.transactions.add_transaction(&tx).await {
            // The credit is still in the balance because the account right
            // is held; take it back out so no change survives unrecorded
            self.reverse(account_id, amount, "unrecorded deposit").await;
            return Err(err);
        }
        debug!(transaction_id = %tx.id, account_id = %account_id, %amount, "deposit completed");
        Ok(tx)
    }

    async fn apply_withdrawal(
        &self,
        account_id: Uuid,
        amount: Decimal,
        description: Option<String>,
    ) -> Result<Transaction> {
        let _guard = self.locks.acquire(account_id).await;
        let tx = Transaction::withdrawal(account_id, amount, description);

        let debit = self
            .write_balance(account_id, |balance| {
                if balance < amount {
                    Err(Error::InsufficientFunds {
                        account_id,
                        balance,
                        requested: amount,
                    })
                } else {
                    Ok(balance - amount)
                }
            })
            .await;
        if let Err(err) = debit {
            return self.record_attempt_failure(tx, err).await;
        }

        let tx = tx.completed();
        if let Err(err) = self.transactions.add_transaction(&tx).await {
            self.restore(account_id, amount, "unrecorded withdrawal").await;
            return Err(err);
        }
        debug!(transaction_id = %tx.id, account_id = %account_id, %amount, "withdrawal completed");
        Ok(tx)
    }

    async fn apply_transfer(
        &self,
        from_id: Uuid,
        to_id: Uuid,
        amount: Decimal,
        description: Option<String>,
    ) -> Result<Transaction> {
        let _guards = self.locks.acquire_pair(from_id, to_id).await;
        let tx = Transaction::transfer(from_id, to_id, amount, description);

        // Debit side, re-read and re-verified under the held rights
        let debit = self
            .write_balance(from_id, |balance| {
                if balance < amount {
                    Err(Error::InsufficientFunds {
                        account_id: from_id,
                        balance,
                        requested: amount,
                    })
                } else {
                    Ok(balance - amount)
                }
            })
            .await;
        if let Err(err) = debit {
            return self.record_attempt_failure(tx, err).await;
        }

        // Credit side; on failure the applied debit is compensated before
        // the rights are released, so no partial transfer is observable
        if let Err(err) = self.write_balance(to_id, |balance| Ok(balance + amount)).await {
            warn!(from = %from_id, to = %to_id, "transfer credit failed, compensating debit");
            self.restore(from_id, amount, "debit of failed transfer").await;
            return self.record_attempt_failure(tx, err).await;
        }

        let tx = tx.completed();
        if let Err(err) = self.transactions.add_transaction(&tx).await {
            self.reverse(to_id, amount, "credit of unrecorded transfer").await;
            self.restore(from_id, amount, "debit of unrecorded transfer").await;
            return Err(err);
        }
        debug!(transaction_id = %tx.id, from = %from_id, to = %to_id, %amount, "transfer completed");
        Ok(tx)
    }

    // === Balance write machinery ===

    /// One read-compute-write cycle with bounded retries
    ///
    /// `op` maps the freshly read balance to the new one, or errors to
    /// abort without writing anything. Callers must hold the account's
    /// mutation right.
    async fn write_balance(
        &self,
        account_id: Uuid,
        op: impl Fn(Decimal) -> Result<Decimal>,
    ) -> Result<Decimal> {
        let mut attempts = 0;
        loop {
            let account = self.require_account(account_id).await?;
            let new_balance = op(account.balance)?;
            match self
                .accounts
                .update_balance(account_id, account.balance, new_balance, Utc::now())
                .await?
            {
                BalanceWrite::Applied => return Ok(new_balance),
                BalanceWrite::Missing => {
                    return Err(Error::not_found(format!("account {account_id}")))
                }
                BalanceWrite::Conflict => {
                    attempts += 1;
                    if attempts >= self.balance_retries {
                        return Err(Error::Conflict(account_id));
                    }
                    warn!(account_id = %account_id, attempts, "balance write conflicted, retrying");
                }
            }
        }
    }

    /// Record a `Failed` transaction for a mutation that was attempted
    /// against the backend but not applied, then surface the error
    ///
    /// Validation outcomes (insufficient funds, vanished account) write no
    /// row: nothing was attempted, or nothing could have been.
    async fn record_attempt_failure(&self, tx: Transaction, err: Error) -> Result<Transaction> {
        if matches!(err, Error::Conflict(_) | Error::Storage(_)) {
            let failed = tx.failed();
            if let Err(record_err) = self.transactions.add_transaction(&failed).await {
                error!(
                    transaction_id = %failed.id,
                    %record_err,
                    "could not record failed transaction"
                );
            }
        }
        Err(err)
    }

    /// Compensating debit: take `amount` back out of an account
    async fn reverse(&self, account_id: Uuid, amount: Decimal, what: &str) {
        if let Err(err) = self.write_balance(account_id, |balance| Ok(balance - amount)).await {
            error!(account_id = %account_id, %err, "could not reverse {what}; balance requires repair");
        }
    }

    /// Compensating credit: put `amount` back into an account
    async fn restore(&self, account_id: Uuid, amount: Decimal, what: &str) {
        if let Err(err) = self.write_balance(account_id, |balance| Ok(balance + amount)).await {
            error!(account_id = %account_id, %err, "could not restore {what}; balance requires repair");
        }
    }

    async fn require_account(&self, id: Uuid) -> Result<Account> {
        self.accounts
            .get_account_by_id(id)
            .await?
            .ok_or_else(|| Error::not_found(format!("account {id}")))
    }
}

/// Run the locked mutation phase on a detached task
///
/// Once the phase has started it always reaches a terminal
/// `Completed`/`Failed` outcome, even if the original caller stops polling
/// its future mid-flight.
async fn run_to_completion<T>(fut: impl Future<Output = Result<T>> + Send + 'static) -> Result<T>
where
    T: Send + 'static,
{
    match tokio::spawn(fut).await {
        Ok(result) => result,
        Err(err) => Err(Error::storage(format!("mutation task aborted: {err}"))),
    }
}

fn parse_account_id(raw: &str, role: &str) -> Result<Uuid> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(Error::invalid_argument(format!("{role} id cannot be empty")));
    }
    // A malformed id matches no account, same as an unknown one
    Uuid::parse_str(raw).map_err(|_| Error::not_found(format!("{role} {raw}")))
}

fn ensure_positive(amount: Decimal) -> Result<()> {
    if amount <= Decimal::ZERO {
        return Err(Error::invalid_argument("amount must be greater than zero"));
    }
    Ok(())
}

fn normalize_description(description: Option<&str>) -> Option<String> {
    description
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::TransactionStatus;

    #[tokio::test]
    async fn test_create_account_rejects_blank_name() {
        let ledger = LedgerService::in_memory();
        assert!(matches!(
            ledger.create_account("  ").await,
            Err(Error::InvalidArgument(_))
        ));
    }

    #[tokio::test]
    async fn test_deposit_validates_before_touching_storage() {
        let ledger = LedgerService::in_memory();
        let account = ledger.create_account("Checking").await.unwrap();
        let id = account.id.to_string();

        assert!(matches!(
            ledger.deposit("", Decimal::ONE, None).await,
            Err(Error::InvalidArgument(_))
        ));
        assert!(matches!(
            ledger.deposit(&id, Decimal::ZERO, None).await,
            Err(Error::InvalidArgument(_))
        ));
        assert_eq!(
            ledger.account_transactions(&id).await.unwrap().len(),
            0,
            "rejected deposits must not be recorded"
        );
    }

    #[tokio::test]
    async fn test_deposit_persists_completed_transaction() {
        let ledger = LedgerService::in_memory();
        let account = ledger.create_account("Checking").await.unwrap();
        let id = account.id.to_string();

        let tx = ledger
            .deposit(&id, Decimal::new(12550, 2), Some("payday"))
            .await
            .unwrap();
        assert_eq!(tx.status, TransactionStatus::Completed);
        assert_eq!(tx.to_account_id, Some(account.id));
        assert_eq!(tx.from_account_id, None);

        let account = ledger.get_account(&id).await.unwrap();
        assert_eq!(account.balance, Decimal::new(12550, 2));
    }

    #[tokio::test]
    async fn test_unknown_id_is_not_found() {
        let ledger = LedgerService::in_memory();
        assert!(matches!(
            ledger.get_account(&Uuid::new_v4().to_string()).await,
            Err(Error::NotFound(_))
        ));
        // Garbage ids match nothing rather than erroring as malformed
        assert!(matches!(
            ledger.get_account("not-a-uuid").await,
            Err(Error::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_rename_advances_updated_at_only() {
        let ledger = LedgerService::in_memory();
        let account = ledger.create_account("Old Name").await.unwrap();
        let id = account.id.to_string();

        let renamed = ledger.rename_account(&id, "New Name").await.unwrap();
        assert_eq!(renamed.name, "New Name");
        assert_eq!(renamed.balance, account.balance);
        assert!(renamed.updated_at >= account.updated_at);
    }

    #[tokio::test]
    async fn test_delete_refused_with_history() {
        let ledger = LedgerService::in_memory();
        let account = ledger.create_account("Checking").await.unwrap();
        let id = account.id.to_string();

        ledger.deposit(&id, Decimal::ONE, None).await.unwrap();
        assert!(matches!(
            ledger.delete_account(&id).await,
            Err(Error::InvalidArgument(_))
        ));

        let empty = ledger.create_account("Empty").await.unwrap();
        ledger.delete_account(&empty.id.to_string()).await.unwrap();
    }
}
