//! Coffer Core - account balances and the movements that change them
//!
//! This crate implements the ledger logic following hexagonal architecture:
//!
//! - **domain**: Core business entities (Account, Transaction) and the error taxonomy
//! - **ports**: Trait definitions for storage backends (AccountRepository, TransactionRepository)
//! - **services**: Business logic orchestration (LedgerService, AccountLocks)
//! - **adapters**: Concrete storage implementations (DuckDB, in-memory)
//!
//! Every balance mutation is serialized per account, applied through a
//! conditional compare-and-set write, and recorded as a terminal
//! `Completed`/`Failed` transaction.

pub mod adapters;
pub mod config;
pub mod domain;
pub mod migrations;
pub mod ports;
pub mod services;

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;

use adapters::duckdb::DuckDbRepository;
use config::Config;
use ports::{AccountRepository, TransactionRepository};
use services::{AccountLocks, LedgerService};

// Re-export commonly used types at crate root
pub use domain::result::{Error, Result as LedgerResult};
pub use domain::{Account, Transaction, TransactionKind, TransactionStatus};

/// Main context for Coffer operations
///
/// This is the primary entry point for embedding the ledger. It opens the
/// database, runs migrations, and wires the service by hand - the service
/// takes its stores and lock table as plain constructor arguments, there is
/// no process-wide registry.
pub struct CofferContext {
    pub config: Config,
    pub repository: Arc<DuckDbRepository>,
    pub ledger: LedgerService,
}

impl CofferContext {
    /// Create a new Coffer context rooted at the given directory
    pub fn new(coffer_dir: &Path) -> Result<Self> {
        let config = Config::load(coffer_dir)?;

        // Demo mode works against a separate throwaway database file
        let db_filename = if config.demo_mode {
            "coffer-demo.duckdb"
        } else {
            "coffer.duckdb"
        };

        let repository = Arc::new(DuckDbRepository::new(&coffer_dir.join(db_filename))?);
        repository.ensure_schema()?;

        let ledger = LedgerService::new(
            Arc::clone(&repository) as Arc<dyn AccountRepository>,
            Arc::clone(&repository) as Arc<dyn TransactionRepository>,
            Arc::new(AccountLocks::new()),
        )
        .with_balance_retries(config.balance_retries);

        Ok(Self {
            config,
            repository,
            ledger,
        })
    }
}
