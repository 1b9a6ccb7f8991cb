//! History command - list an account's transactions

use anyhow::Result;

use super::get_context;
use crate::output;

pub async fn run(account_id: &str, json: bool) -> Result<()> {
    let ctx = get_context()?;
    let account = ctx.ledger.get_account(account_id).await?;
    let transactions = ctx.ledger.account_transactions(account_id).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&transactions)?);
        return Ok(());
    }

    println!("{} - {}", account.name, output::format_money(account.balance));
    if transactions.is_empty() {
        println!("  no transactions");
        return Ok(());
    }

    let mut table = output::create_table();
    table.set_header(vec!["Time", "Kind", "Amount", "Counterparty", "Description", "Status"]);
    for tx in &transactions {
        // The counterparty is whichever endpoint is not this account
        let counterparty = match (tx.from_account_id, tx.to_account_id) {
            (Some(from), _) if from != account.id => from.to_string(),
            (_, Some(to)) if to != account.id => to.to_string(),
            _ => "-".to_string(),
        };
        table.add_row(vec![
            tx.timestamp.format("%Y-%m-%d %H:%M").to_string(),
            tx.kind().as_str().to_string(),
            output::format_money(tx.amount),
            counterparty,
            tx.description.clone().unwrap_or_default(),
            output::format_status(tx.status),
        ]);
    }
    println!("{table}");
    Ok(())
}
