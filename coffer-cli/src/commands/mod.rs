//! CLI command implementations

pub mod account;
pub mod history;
pub mod movement;

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use rust_decimal::Decimal;

use coffer_core::CofferContext;

/// Shortest and longest account names accepted at this boundary
const NAME_MIN_LEN: usize = 3;
const NAME_MAX_LEN: usize = 100;

/// Longest description accepted at this boundary
const DESCRIPTION_MAX_LEN: usize = 500;

/// Get the coffer directory from environment or default
pub fn get_coffer_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("COFFER_DIR") {
        PathBuf::from(dir)
    } else {
        dirs::home_dir()
            .expect("could not find home directory")
            .join(".coffer")
    }
}

/// Get or create the coffer context
pub fn get_context() -> Result<CofferContext> {
    let coffer_dir = get_coffer_dir();

    std::fs::create_dir_all(&coffer_dir)
        .with_context(|| format!("failed to create coffer directory: {:?}", coffer_dir))?;

    CofferContext::new(&coffer_dir)
}

/// Input-shape check for account names; the core only rejects blank ones
pub fn validate_name(name: &str) -> Result<()> {
    let len = name.trim().chars().count();
    if !(NAME_MIN_LEN..=NAME_MAX_LEN).contains(&len) {
        bail!(
            "account name must be between {} and {} characters",
            NAME_MIN_LEN,
            NAME_MAX_LEN
        );
    }
    Ok(())
}

/// Input-shape check for descriptions
pub fn validate_description(description: Option<&str>) -> Result<()> {
    if let Some(d) = description {
        if d.chars().count() > DESCRIPTION_MAX_LEN {
            bail!("description cannot exceed {} characters", DESCRIPTION_MAX_LEN);
        }
    }
    Ok(())
}

/// Parse a decimal amount argument
pub fn parse_amount(raw: &str) -> Result<Decimal> {
    raw.trim()
        .parse::<Decimal>()
        .map_err(|_| anyhow::anyhow!("invalid amount: {raw}"))
}
