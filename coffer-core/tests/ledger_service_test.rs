//! Behavioral tests for the ledger service
//!
//! These exercise every operation against the in-memory adapter: the
//! validation order, the status a transaction ends in, and the exact
//! balance arithmetic.

use rust_decimal::Decimal;

use coffer_core::domain::result::Error;
use coffer_core::domain::{TransactionKind, TransactionStatus};
use coffer_core::services::LedgerService;

// ============================================================================
// Test Helpers
// ============================================================================

fn dec(s: &str) -> Decimal {
    s.parse().unwrap()
}

/// Create an account holding the given balance (seeded through a deposit)
async fn funded_account(ledger: &LedgerService, name: &str, balance: &str) -> String {
    let account = ledger.create_account(name).await.unwrap();
    let id = account.id.to_string();
    ledger.deposit(&id, dec(balance), Some("opening")).await.unwrap();
    id
}

// ============================================================================
// Deposits and withdrawals
// ============================================================================

#[tokio::test]
async fn test_deposit_then_withdraw_restores_balance_exactly() {
    let ledger = LedgerService::in_memory();
    let id = funded_account(&ledger, "Checking", "500.00").await;

    // Awkward precision on purpose: no float could round-trip this
    let amount = dec("123.456789");
    ledger.deposit(&id, amount, None).await.unwrap();
    ledger.withdraw(&id, amount, None).await.unwrap();

    let account = ledger.get_account(&id).await.unwrap();
    assert_eq!(account.balance, dec("500.00"));
}

#[tokio::test]
async fn test_zero_deposit_changes_nothing() {
    let ledger = LedgerService::in_memory();
    let id = funded_account(&ledger, "Checking", "500.00").await;

    let err = ledger.withdraw(&id, Decimal::ZERO, Some("x")).await.unwrap_err();
    assert!(matches!(err, Error::InvalidArgument(_)));
    let err = ledger.deposit(&id, Decimal::ZERO, Some("x")).await.unwrap_err();
    assert!(matches!(err, Error::InvalidArgument(_)));

    let account = ledger.get_account(&id).await.unwrap();
    assert_eq!(account.balance, dec("500.00"));
    // Only the opening deposit is on record
    assert_eq!(ledger.account_transactions(&id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_overdraft_is_rejected_without_a_record() {
    let ledger = LedgerService::in_memory();
    let id = funded_account(&ledger, "Checking", "500.00").await;

    let err = ledger.withdraw(&id, dec("1000"), Some("x")).await.unwrap_err();
    match err {
        Error::InsufficientFunds { balance, requested, .. } => {
            assert_eq!(balance, dec("500.00"));
            assert_eq!(requested, dec("1000"));
        }
        other => panic!("expected InsufficientFunds, got {other}"),
    }

    let account = ledger.get_account(&id).await.unwrap();
    assert_eq!(account.balance, dec("500.00"));
    assert_eq!(ledger.account_transactions(&id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_withdrawal_record_has_no_destination() {
    let ledger = LedgerService::in_memory();
    let id = funded_account(&ledger, "Checking", "80.00").await;

    let tx = ledger.withdraw(&id, dec("30.25"), Some("groceries")).await.unwrap();
    assert_eq!(tx.kind(), TransactionKind::Withdrawal);
    assert_eq!(tx.status, TransactionStatus::Completed);
    assert!(tx.to_account_id.is_none());
    assert_eq!(tx.description.as_deref(), Some("groceries"));

    let account = ledger.get_account(&id).await.unwrap();
    assert_eq!(account.balance, dec("49.75"));
}

// ============================================================================
// Transfers
// ============================================================================

#[tokio::test]
async fn test_transfer_moves_funds_and_records_once() {
    let ledger = LedgerService::in_memory();
    let a = funded_account(&ledger, "A", "500.00").await;
    let b = funded_account(&ledger, "B", "200.00").await;

    let tx = ledger.transfer(&a, &b, dec("100"), Some("rent")).await.unwrap();
    assert_eq!(tx.status, TransactionStatus::Completed);
    assert_eq!(tx.amount, dec("100"));

    assert_eq!(ledger.get_account(&a).await.unwrap().balance, dec("400.00"));
    assert_eq!(ledger.get_account(&b).await.unwrap().balance, dec("300.00"));

    // Exactly one row beyond each opening deposit, shared by both histories
    let history_a = ledger.account_transactions(&a).await.unwrap();
    let history_b = ledger.account_transactions(&b).await.unwrap();
    assert_eq!(history_a.len(), 2);
    assert_eq!(history_b.len(), 2);
    assert_eq!(history_a.last().unwrap().id, tx.id);
    assert_eq!(history_b.last().unwrap().id, tx.id);
}

#[tokio::test]
async fn test_completed_transfer_conserves_total_funds() {
    let ledger = LedgerService::in_memory();
    let a = funded_account(&ledger, "A", "77.31").await;
    let b = funded_account(&ledger, "B", "12.69").await;

    ledger.transfer(&a, &b, dec("13.57"), None).await.unwrap();

    let total = ledger.get_account(&a).await.unwrap().balance
        + ledger.get_account(&b).await.unwrap().balance;
    assert_eq!(total, dec("90.00"));
}

#[tokio::test]
async fn test_self_transfer_is_invalid_and_unrecorded() {
    let ledger = LedgerService::in_memory();
    let a = funded_account(&ledger, "A", "500.00").await;

    let err = ledger.transfer(&a, &a, dec("10"), None).await.unwrap_err();
    assert!(matches!(err, Error::InvalidArgument(_)));

    // Holds even for ids that match no account
    let err = ledger.transfer("x", "x", dec("10"), None).await.unwrap_err();
    assert!(matches!(err, Error::InvalidArgument(_)));

    assert_eq!(ledger.account_transactions(&a).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_transfer_names_the_missing_endpoint() {
    let ledger = LedgerService::in_memory();
    let a = funded_account(&ledger, "A", "500.00").await;
    let ghost = uuid::Uuid::new_v4().to_string();

    let err = ledger.transfer(&ghost, &a, dec("10"), None).await.unwrap_err();
    match err {
        Error::NotFound(msg) => assert!(msg.contains("source"), "got: {msg}"),
        other => panic!("expected NotFound, got {other}"),
    }

    let err = ledger.transfer(&a, &ghost, dec("10"), None).await.unwrap_err();
    match err {
        Error::NotFound(msg) => assert!(msg.contains("destination"), "got: {msg}"),
        other => panic!("expected NotFound, got {other}"),
    }
}

#[tokio::test]
async fn test_insufficient_transfer_leaves_both_balances_untouched() {
    let ledger = LedgerService::in_memory();
    let a = funded_account(&ledger, "A", "50.00").await;
    let b = funded_account(&ledger, "B", "10.00").await;

    let err = ledger.transfer(&a, &b, dec("50.01"), None).await.unwrap_err();
    assert!(matches!(err, Error::InsufficientFunds { .. }));

    assert_eq!(ledger.get_account(&a).await.unwrap().balance, dec("50.00"));
    assert_eq!(ledger.get_account(&b).await.unwrap().balance, dec("10.00"));
    assert_eq!(ledger.account_transactions(&a).await.unwrap().len(), 1);
    assert_eq!(ledger.account_transactions(&b).await.unwrap().len(), 1);
}

// ============================================================================
// Records
// ============================================================================

#[tokio::test]
async fn test_persisted_rows_are_always_terminal() {
    let ledger = LedgerService::in_memory();
    let a = funded_account(&ledger, "A", "100.00").await;
    let b = funded_account(&ledger, "B", "100.00").await;

    ledger.withdraw(&a, dec("25"), None).await.unwrap();
    ledger.transfer(&a, &b, dec("25"), None).await.unwrap();
    let _ = ledger.withdraw(&a, dec("9999"), None).await;

    for id in [&a, &b] {
        for tx in ledger.account_transactions(id).await.unwrap() {
            assert_ne!(tx.status, TransactionStatus::Pending);
        }
    }
}

#[tokio::test]
async fn test_history_keeps_insertion_order() {
    let ledger = LedgerService::in_memory();
    let id = funded_account(&ledger, "Checking", "100.00").await;

    ledger.deposit(&id, dec("1"), Some("first")).await.unwrap();
    ledger.withdraw(&id, dec("2"), Some("second")).await.unwrap();
    ledger.deposit(&id, dec("3"), Some("third")).await.unwrap();

    let descriptions: Vec<_> = ledger
        .account_transactions(&id)
        .await
        .unwrap()
        .into_iter()
        .map(|tx| tx.description.unwrap_or_default())
        .collect();
    assert_eq!(descriptions, vec!["opening", "first", "second", "third"]);
}

#[tokio::test]
async fn test_blank_description_is_stored_as_none() {
    let ledger = LedgerService::in_memory();
    let id = funded_account(&ledger, "Checking", "100.00").await;

    let tx = ledger.deposit(&id, dec("1"), Some("   ")).await.unwrap();
    assert_eq!(tx.description, None);
    let tx = ledger.deposit(&id, dec("1"), None).await.unwrap();
    assert_eq!(tx.description, None);
}

#[tokio::test]
async fn test_list_accounts_sees_every_account() {
    let ledger = LedgerService::in_memory();
    ledger.create_account("One").await.unwrap();
    ledger.create_account("Two").await.unwrap();
    ledger.create_account("Three").await.unwrap();

    let mut names: Vec<_> = ledger
        .list_accounts()
        .await
        .unwrap()
        .into_iter()
        .map(|a| a.name)
        .collect();
    names.sort();
    assert_eq!(names, vec!["One", "Three", "Two"]);
}
