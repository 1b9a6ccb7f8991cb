//! Result and error types for the core library

use rust_decimal::Decimal;
use thiserror::Error;
use uuid::Uuid;

/// Core library error type
///
/// Every ledger operation returns one of these kinds explicitly; callers
/// match on the kind rather than on message text. `Conflict` is only
/// surfaced after the internal retry budget is spent.
#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("insufficient funds in account {account_id}: balance {balance}, requested {requested}")]
    InsufficientFunds {
        account_id: Uuid,
        balance: Decimal,
        requested: Decimal,
    },

    #[error("conflicting balance writes on account {0}: retries exhausted")]
    Conflict(Uuid),

    #[error("storage error: {0}")]
    Storage(String),
}

impl Error {
    /// Create an invalid argument error
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    /// Create a not found error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create a storage error
    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }
}

/// Core library result type
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages_name_the_kind() {
        let err = Error::invalid_argument("amount must be positive");
        assert!(err.to_string().contains("invalid argument"));

        let err = Error::not_found("account abc");
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn test_insufficient_funds_carries_amounts() {
        let err = Error::InsufficientFunds {
            account_id: Uuid::nil(),
            balance: Decimal::new(50000, 2),
            requested: Decimal::new(100000, 2),
        };
        let msg = err.to_string();
        assert!(msg.contains("500"));
        assert!(msg.contains("1000"));
    }
}
