//! DuckDB repository implementation
//!
//! One file, two tables (accounts, transactions), connection behind a
//! mutex. Balances and amounts are persisted as canonical decimal strings
//! so the conditional balance write can compare the stored value exactly;
//! DOUBLE columns would reintroduce float drift.

use std::path::Path;
use std::sync::Mutex;
use std::thread;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use duckdb::{params, Connection};
use rust_decimal::Decimal;
use tracing::warn;
use uuid::Uuid;

use crate::domain::result::{Error, Result};
use crate::domain::{Account, Transaction, TransactionStatus};
use crate::ports::{AccountRepository, BalanceWrite, TransactionRepository};
use crate::services::{MigrationResult, MigrationService};

/// Maximum number of retries when the database file is locked
const MAX_OPEN_RETRIES: u32 = 5;

/// Initial retry delay in milliseconds (doubles each retry: 50, 100, 200, 400ms)
const INITIAL_RETRY_DELAY_MS: u64 = 50;

/// Check if an error message indicates a file locking issue that should be retried
fn is_retryable_error(err_msg: &str) -> bool {
    let lower = err_msg.to_lowercase();
    // Windows error messages
    lower.contains("being used by another process")
        || lower.contains("cannot access the file")
        // Unix/macOS error messages
        || lower.contains("resource temporarily unavailable")
        || lower.contains("database is locked")
        || lower.contains("file is already open")
}

impl From<duckdb::Error> for Error {
    fn from(err: duckdb::Error) -> Self {
        Error::Storage(err.to_string())
    }
}

/// DuckDB repository implementation
pub struct DuckDbRepository {
    conn: Mutex<Connection>,
}

impl DuckDbRepository {
    /// Open (or create) a ledger database file
    ///
    /// Includes retry logic with exponential backoff for file locking
    /// errors, which can occur when multiple processes reach for the same
    /// database at once.
    pub fn new(db_path: &Path) -> anyhow::Result<Self> {
        let mut last_error = None;

        for attempt in 0..MAX_OPEN_RETRIES {
            match Self::try_open_connection(db_path) {
                Ok(conn) => {
                    return Ok(Self {
                        conn: Mutex::new(conn),
                    });
                }
                Err(e) => {
                    let err_msg = e.to_string();
                    if is_retryable_error(&err_msg) && attempt < MAX_OPEN_RETRIES - 1 {
                        let delay =
                            Duration::from_millis(INITIAL_RETRY_DELAY_MS * 2u64.pow(attempt));
                        warn!(
                            attempt = attempt + 1,
                            delay_ms = delay.as_millis() as u64,
                            %err_msg,
                            "database busy, retrying"
                        );
                        thread::sleep(delay);
                        last_error = Some(e);
                        continue;
                    }
                    return Err(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| {
            anyhow::anyhow!("failed to open database after {} retries", MAX_OPEN_RETRIES)
        }))
    }

    fn try_open_connection(db_path: &Path) -> anyhow::Result<Connection> {
        // Extension autoloading is off: the schema needs nothing beyond
        // base DuckDB, and cached extensions can fail to load on macOS
        let config = duckdb::Config::default().enable_autoload_extension(false)?;
        Ok(Connection::open_with_flags(db_path, config)?)
    }

    /// Run database migrations using the MigrationService
    pub fn run_migrations(&self) -> anyhow::Result<MigrationResult> {
        let conn = self.conn.lock().unwrap();
        MigrationService::new(&conn).run_pending()
    }

    /// Ensure database schema exists (runs pending migrations)
    pub fn ensure_schema(&self) -> anyhow::Result<()> {
        self.run_migrations()?;
        Ok(())
    }
}

#[async_trait]
impl AccountRepository for DuckDbRepository {
    async fn add_account(&self, account: &Account) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO accounts (account_id, name, balance, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?)",
            params![
                account.id.to_string(),
                account.name,
                encode_decimal(account.balance),
                account.created_at.to_rfc3339(),
                account.updated_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    async fn get_accounts(&self) -> Result<Vec<Account>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT account_id, name, balance, created_at, updated_at FROM accounts",
        )?;

        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
            ))
        })?;

        let mut accounts = Vec::new();
        for row in rows {
            accounts.push(row_to_account(row?)?);
        }
        Ok(accounts)
    }

    async fn get_account_by_id(&self, id: Uuid) -> Result<Option<Account>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT account_id, name, balance, created_at, updated_at
             FROM accounts WHERE account_id = ?",
        )?;

        match stmt.query_map(params![id.to_string()], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
            ))
        })?
        .next()
        {
            Some(row) => Ok(Some(row_to_account(row?)?)),
            None => Ok(None),
        }
    }

    async fn rename_account(
        &self,
        id: Uuid,
        name: &str,
        updated_at: DateTime<Utc>,
    ) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        let affected = conn.execute(
            "UPDATE accounts SET name = ?, updated_at = ? WHERE account_id = ?",
            params![name, updated_at.to_rfc3339(), id.to_string()],
        )?;
        Ok(affected > 0)
    }

    async fn delete_account(&self, id: Uuid) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        let affected = conn.execute(
            "DELETE FROM accounts WHERE account_id = ?",
            params![id.to_string()],
        )?;
        Ok(affected > 0)
    }

    async fn update_balance(
        &self,
        id: Uuid,
        expected: Decimal,
        new: Decimal,
        updated_at: DateTime<Utc>,
    ) -> Result<BalanceWrite> {
        let conn = self.conn.lock().unwrap();
        // The compare and the write are one UPDATE statement; storage
        // applies it atomically with respect to every other writer
        let affected = conn.execute(
            "UPDATE accounts SET balance = ?, updated_at = ?
             WHERE account_id = ? AND balance = ?",
            params![
                encode_decimal(new),
                updated_at.to_rfc3339(),
                id.to_string(),
                encode_decimal(expected),
            ],
        )?;
        if affected > 0 {
            return Ok(BalanceWrite::Applied);
        }

        // Zero rows touched: tell a lost race apart from a missing account
        let exists: i64 = conn.query_row(
            "SELECT COUNT(*) FROM accounts WHERE account_id = ?",
            params![id.to_string()],
            |row| row.get(0),
        )?;
        if exists > 0 {
            Ok(BalanceWrite::Conflict)
        } else {
            Ok(BalanceWrite::Missing)
        }
    }
}

#[async_trait]
impl TransactionRepository for DuckDbRepository {
    async fn add_transaction(&self, tx: &Transaction) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO transactions (transaction_id, from_account_id, to_account_id,
                                       amount, description, timestamp, status)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
            params![
                tx.id.to_string(),
                tx.from_account_id.map(|id| id.to_string()),
                tx.to_account_id.map(|id| id.to_string()),
                encode_decimal(tx.amount),
                tx.description,
                tx.timestamp.to_rfc3339(),
                tx.status.as_str(),
            ],
        )?;
        Ok(())
    }

    async fn get_transactions(&self) -> Result<Vec<Transaction>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT transaction_id, from_account_id, to_account_id, amount,
                    description, timestamp, status
             FROM transactions ORDER BY seq",
        )?;

        let rows = stmt.query_map([], transaction_columns)?;
        let mut transactions = Vec::new();
        for row in rows {
            transactions.push(row_to_transaction(row?)?);
        }
        Ok(transactions)
    }

    async fn get_transaction_by_id(&self, id: Uuid) -> Result<Option<Transaction>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT transaction_id, from_account_id, to_account_id, amount,
                    description, timestamp, status
             FROM transactions WHERE transaction_id = ?",
        )?;

        match stmt
            .query_map(params![id.to_string()], transaction_columns)?
            .next()
        {
            Some(row) => Ok(Some(row_to_transaction(row?)?)),
            None => Ok(None),
        }
    }

    async fn get_transactions_by_account(&self, account_id: Uuid) -> Result<Vec<Transaction>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT transaction_id, from_account_id, to_account_id, amount,
                    description, timestamp, status
             FROM transactions
             WHERE from_account_id = ? OR to_account_id = ?
             ORDER BY seq",
        )?;

        let id = account_id.to_string();
        let rows = stmt.query_map(params![id, id], transaction_columns)?;
        let mut transactions = Vec::new();
        for row in rows {
            transactions.push(row_to_transaction(row?)?);
        }
        Ok(transactions)
    }
}

type TransactionRow = (
    String,
    Option<String>,
    Option<String>,
    String,
    Option<String>,
    String,
    String,
);

fn transaction_columns(row: &duckdb::Row) -> duckdb::Result<TransactionRow> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
        row.get(6)?,
    ))
}

fn row_to_account(row: (String, String, String, String, String)) -> Result<Account> {
    let (id, name, balance, created_at, updated_at) = row;
    Ok(Account {
        id: parse_uuid(&id)?,
        name,
        balance: parse_decimal(&balance)?,
        created_at: parse_timestamp(&created_at),
        updated_at: parse_timestamp(&updated_at),
    })
}

fn row_to_transaction(row: TransactionRow) -> Result<Transaction> {
    let (id, from_account_id, to_account_id, amount, description, timestamp, status) = row;
    Ok(Transaction {
        id: parse_uuid(&id)?,
        from_account_id: from_account_id.as_deref().map(parse_uuid).transpose()?,
        to_account_id: to_account_id.as_deref().map(parse_uuid).transpose()?,
        amount: parse_decimal(&amount)?,
        description,
        timestamp: parse_timestamp(&timestamp),
        status: TransactionStatus::parse(&status)
            .ok_or_else(|| Error::storage(format!("unknown transaction status: {status}")))?,
    })
}

/// Canonical string form used for storage and for the conditional write's
/// equality comparison; normalize() keeps `2.50` and `2.5` from diverging
fn encode_decimal(value: Decimal) -> String {
    value.normalize().to_string()
}

fn parse_decimal(s: &str) -> Result<Decimal> {
    s.parse()
        .map_err(|_| Error::storage(format!("corrupt amount in storage: {s}")))
}

fn parse_uuid(s: &str) -> Result<Uuid> {
    Uuid::parse_str(s).map_err(|_| Error::storage(format!("corrupt id in storage: {s}")))
}

fn parse_timestamp(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}
