//! Configuration management
//!
//! Settings live in a settings.json next to the database file:
//! ```json
//! {
//!   "app": { "demoMode": false, "balanceRetries": 5 }
//! }
//! ```

use std::collections::HashMap;
use std::path::Path;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::services::DEFAULT_BALANCE_RETRIES;

/// Raw settings.json structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SettingsFile {
    #[serde(default)]
    app: AppSettings,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AppSettings {
    #[serde(default)]
    demo_mode: bool,
    #[serde(default)]
    balance_retries: Option<u32>,
    /// Unknown keys are preserved across save
    #[serde(flatten)]
    other: HashMap<String, serde_json::Value>,
}

/// Coffer configuration (simplified view of settings)
#[derive(Debug, Clone)]
pub struct Config {
    /// Route all operations to a separate throwaway database
    pub demo_mode: bool,
    /// Conditional balance write retry budget
    pub balance_retries: u32,
    // Keep the raw settings for preservation when saving
    _raw_settings: SettingsFile,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            demo_mode: false,
            balance_retries: DEFAULT_BALANCE_RETRIES,
            _raw_settings: SettingsFile::default(),
        }
    }
}

impl Config {
    /// Load config from the coffer directory
    ///
    /// Demo mode can be enabled via the settings file or the
    /// COFFER_DEMO_MODE environment variable (for CI/testing).
    pub fn load(coffer_dir: &Path) -> Result<Self> {
        let settings_path = coffer_dir.join("settings.json");

        let raw: SettingsFile = if settings_path.exists() {
            let content = std::fs::read_to_string(&settings_path)?;
            serde_json::from_str(&content).unwrap_or_default()
        } else {
            SettingsFile::default()
        };

        let demo_mode = match std::env::var("COFFER_DEMO_MODE").ok().as_deref() {
            Some("true" | "1" | "yes" | "TRUE" | "YES") => true,
            Some("false" | "0" | "no" | "FALSE" | "NO") => false,
            _ => raw.app.demo_mode,
        };

        Ok(Self {
            demo_mode,
            balance_retries: raw.app.balance_retries.unwrap_or(DEFAULT_BALANCE_RETRIES),
            _raw_settings: raw,
        })
    }

    /// Save config to the coffer directory
    /// Preserves settings keys the core doesn't manage
    pub fn save(&self, coffer_dir: &Path) -> Result<()> {
        let settings_path = coffer_dir.join("settings.json");

        let mut settings = if settings_path.exists() {
            let content = std::fs::read_to_string(&settings_path)?;
            serde_json::from_str::<SettingsFile>(&content).unwrap_or_default()
        } else {
            SettingsFile::default()
        };

        settings.app.demo_mode = self.demo_mode;
        settings.app.balance_retries = Some(self.balance_retries);

        let content = serde_json::to_string_pretty(&settings)?;
        std::fs::write(&settings_path, content)?;
        Ok(())
    }
}
