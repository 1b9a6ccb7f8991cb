//! Coffer CLI - account ledger in your terminal

use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod output;

use commands::{account, history, movement};

/// Coffer - account balances and the movements that change them
#[derive(Parser)]
#[command(name = "coffer", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage accounts
    Account {
        #[command(subcommand)]
        command: account::AccountCommands,
    },

    /// Add funds to an account
    Deposit {
        /// Account ID
        account_id: String,
        /// Amount, e.g. 125.50
        amount: String,
        /// Free-form note, up to 500 characters
        #[arg(long, short)]
        description: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Remove funds from an account
    Withdraw {
        /// Account ID
        account_id: String,
        /// Amount, e.g. 125.50
        amount: String,
        /// Free-form note, up to 500 characters
        #[arg(long, short)]
        description: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Move funds between two accounts
    Transfer {
        /// Source account ID
        from: String,
        /// Destination account ID
        to: String,
        /// Amount, e.g. 125.50
        amount: String,
        /// Free-form note, up to 500 characters
        #[arg(long, short)]
        description: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show an account's transaction history
    History {
        /// Account ID
        account_id: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            output::error(&e.to_string());
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Account { command } => account::run(command).await,
        Commands::Deposit { account_id, amount, description, json } => {
            movement::run_deposit(&account_id, &amount, description, json).await
        }
        Commands::Withdraw { account_id, amount, description, json } => {
            movement::run_withdraw(&account_id, &amount, description, json).await
        }
        Commands::Transfer { from, to, amount, description, json } => {
            movement::run_transfer(&from, &to, &amount, description, json).await
        }
        Commands::History { account_id, json } => history::run(&account_id, json).await,
    }
}
