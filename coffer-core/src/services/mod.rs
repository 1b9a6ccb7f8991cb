//! Service layer - business logic orchestration
//!
//! Services coordinate domain logic and port interactions. The ledger
//! service is the single entry point for every account and money-movement
//! operation; the lock service serializes balance mutations per account.

mod ledger;
mod locks;
pub mod migration;

pub use ledger::{LedgerService, DEFAULT_BALANCE_RETRIES};
pub use locks::{AccountGuard, AccountLocks, PairGuard};
pub use migration::{MigrationResult, MigrationService};
