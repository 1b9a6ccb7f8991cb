//! Money movement commands - deposit, withdraw, transfer

use anyhow::Result;

use coffer_core::Transaction;

use super::{get_context, parse_amount, validate_description};
use crate::output;

pub async fn run_deposit(
    account_id: &str,
    amount: &str,
    description: Option<String>,
    json: bool,
) -> Result<()> {
    let amount = parse_amount(amount)?;
    validate_description(description.as_deref())?;

    let ctx = get_context()?;
    let tx = ctx
        .ledger
        .deposit(account_id, amount, description.as_deref())
        .await?;

    report(&tx, "Deposit completed", json)
}

pub async fn run_withdraw(
    account_id: &str,
    amount: &str,
    description: Option<String>,
    json: bool,
) -> Result<()> {
    let amount = parse_amount(amount)?;
    validate_description(description.as_deref())?;

    let ctx = get_context()?;
    let tx = ctx
        .ledger
        .withdraw(account_id, amount, description.as_deref())
        .await?;

    report(&tx, "Withdrawal completed", json)
}

pub async fn run_transfer(
    from: &str,
    to: &str,
    amount: &str,
    description: Option<String>,
    json: bool,
) -> Result<()> {
    let amount = parse_amount(amount)?;
    validate_description(description.as_deref())?;

    let ctx = get_context()?;
    let tx = ctx
        .ledger
        .transfer(from, to, amount, description.as_deref())
        .await?;

    report(&tx, "Transfer completed", json)
}

fn report(tx: &Transaction, headline: &str, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(tx)?);
        return Ok(());
    }

    output::success(headline);
    println!("  Transaction: {}", tx.id);
    if let Some(from) = tx.from_account_id {
        println!("  From:        {from}");
    }
    if let Some(to) = tx.to_account_id {
        println!("  To:          {to}");
    }
    println!("  Amount:      {}", output::format_money(tx.amount));
    if let Some(description) = &tx.description {
        println!("  Description: {description}");
    }
    println!("  Status:      {}", output::format_status(tx.status));
    Ok(())
}
