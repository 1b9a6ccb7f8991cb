//! Account commands - create, list, show, rename, remove

use anyhow::Result;
use clap::Subcommand;
use dialoguer::Confirm;

use coffer_core::Account;

use super::{get_context, validate_name};
use crate::output;

#[derive(Subcommand)]
pub enum AccountCommands {
    /// Create a new account
    New {
        /// Account name (3-100 characters)
        name: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// List all accounts
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show one account
    Show {
        /// Account ID
        id: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Rename an account
    Rename {
        /// Account ID
        id: String,
        /// New name (3-100 characters)
        name: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Remove an account without transaction history
    Remove {
        /// Account ID
        id: String,
        /// Skip confirmation prompt
        #[arg(long, short)]
        force: bool,
    },
}

pub async fn run(command: AccountCommands) -> Result<()> {
    match command {
        AccountCommands::New { name, json } => run_new(&name, json).await,
        AccountCommands::List { json } => run_list(json).await,
        AccountCommands::Show { id, json } => run_show(&id, json).await,
        AccountCommands::Rename { id, name, json } => run_rename(&id, &name, json).await,
        AccountCommands::Remove { id, force } => run_remove(&id, force).await,
    }
}

async fn run_new(name: &str, json: bool) -> Result<()> {
    validate_name(name)?;
    let ctx = get_context()?;
    let account = ctx.ledger.create_account(name).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&account)?);
    } else {
        output::success("Account created");
        print_account(&account);
    }
    Ok(())
}

async fn run_list(json: bool) -> Result<()> {
    let ctx = get_context()?;
    let mut accounts = ctx.ledger.list_accounts().await?;
    accounts.sort_by(|a, b| a.created_at.cmp(&b.created_at));

    if json {
        println!("{}", serde_json::to_string_pretty(&accounts)?);
        return Ok(());
    }

    let mut table = output::create_table();
    table.set_header(vec!["ID", "Name", "Balance", "Updated"]);
    for account in &accounts {
        table.add_row(vec![
            account.id.to_string(),
            account.name.clone(),
            output::format_money(account.balance),
            account.updated_at.format("%Y-%m-%d %H:%M").to_string(),
        ]);
    }
    println!("{table}");
    Ok(())
}

async fn run_show(id: &str, json: bool) -> Result<()> {
    let ctx = get_context()?;
    let account = ctx.ledger.get_account(id).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&account)?);
    } else {
        print_account(&account);
    }
    Ok(())
}

async fn run_rename(id: &str, name: &str, json: bool) -> Result<()> {
    validate_name(name)?;
    let ctx = get_context()?;
    let account = ctx.ledger.rename_account(id, name).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&account)?);
    } else {
        output::success("Account renamed");
        print_account(&account);
    }
    Ok(())
}

async fn run_remove(id: &str, force: bool) -> Result<()> {
    let ctx = get_context()?;
    let account = ctx.ledger.get_account(id).await?;

    if !force {
        let confirmed = Confirm::new()
            .with_prompt(format!("Remove account \"{}\"?", account.name))
            .default(false)
            .interact()?;
        if !confirmed {
            return Ok(());
        }
    }

    ctx.ledger.delete_account(id).await?;
    output::success("Account removed");
    Ok(())
}

fn print_account(account: &Account) {
    println!("  ID:      {}", account.id);
    println!("  Name:    {}", account.name);
    println!("  Balance: {}", output::format_money(account.balance));
    println!("  Created: {}", account.created_at.format("%Y-%m-%d %H:%M"));
    println!("  Updated: {}", account.updated_at.format("%Y-%m-%d %H:%M"));
}
