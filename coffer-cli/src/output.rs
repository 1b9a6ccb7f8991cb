//! Output formatting utilities

use colored::Colorize;
use comfy_table::{presets::UTF8_FULL_CONDENSED, ContentArrangement, Table};
use rust_decimal::Decimal;

use coffer_core::TransactionStatus;

/// Print a success message
pub fn success(msg: &str) {
    println!("{}", msg.green());
}

/// Print an error message
pub fn error(msg: &str) {
    eprintln!("{}", msg.red());
}

/// Create a styled table
pub fn create_table() -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table
}

/// Format an amount with two decimal places, e.g. "125.50"
pub fn format_money(amount: Decimal) -> String {
    format!("{:.2}", amount)
}

/// Render a transaction status with color
pub fn format_status(status: TransactionStatus) -> String {
    match status {
        TransactionStatus::Completed => "completed".green().to_string(),
        TransactionStatus::Failed => "failed".red().to_string(),
        TransactionStatus::Pending => "pending".yellow().to_string(),
    }
}
