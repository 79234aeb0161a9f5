use std::path::{Path, PathBuf};

use chrono::Datelike;
use serde::Deserialize;

use crate::error::{Result, SeedError};
use crate::identity::MatchStrategy;
use crate::normalize::DateOrder;

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Calendar year the monthly columns refer to.
    #[serde(default = "default_year")]
    pub year: i32,
    #[serde(default)]
    pub date_order: DateOrder,
    #[serde(default)]
    pub match_strategy: MatchStrategy,
    #[serde(default = "default_output")]
    pub output: String,
    #[serde(default)]
    pub sheets: SheetNames,
}

/// Candidate names for each sheet, tried in order.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SheetNames {
    pub clients: Vec<String>,
    pub subscriptions: Vec<String>,
    pub vat: Vec<String>,
    pub payments: Vec<String>,
    pub affinitas: Vec<String>,
}

fn names(v: &[&str]) -> Vec<String> {
    v.iter().map(|s| s.to_string()).collect()
}

impl Default for SheetNames {
    fn default() -> Self {
        Self {
            clients: names(&["Estratti ", "Estratti"]),
            subscriptions: names(&["Subscription ", "Subscription"]),
            vat: names(&["VAT register new", "VAT register new "]),
            payments: names(&["Pagamenti"]),
            affinitas: names(&["Abbonati affinitas"]),
        }
    }
}

fn default_year() -> i32 {
    chrono::Local::now().year()
}

fn default_output() -> String {
    "seed_data.sql".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            year: default_year(),
            date_order: DateOrder::default(),
            match_strategy: MatchStrategy::default(),
            output: default_output(),
            sheets: SheetNames::default(),
        }
    }
}

fn config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("backoffice-seed")
}

pub fn settings_path() -> PathBuf {
    config_dir().join("settings.json")
}

pub fn load_settings() -> Result<Settings> {
    load_settings_from(&settings_path())
}

/// A missing file means defaults; a malformed one is an error.
pub fn load_settings_from(path: &Path) -> Result<Settings> {
    if !path.exists() {
        return Ok(Settings::default());
    }
    let content = std::fs::read_to_string(path)?;
    let settings = serde_json::from_str(&content)
        .map_err(|e| SeedError::Settings(format!("{}: {e}", path.display())))?;
    log::info!("Loaded settings from {}", path.display());
    Ok(settings)
}
