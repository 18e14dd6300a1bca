//! Settings for the application.
//!
//! Read from an optional `settings.{toml,yaml,json}` in the working directory,
//! then overridden by `DUITKU__*` environment variables (e.g.
//! `DUITKU__LEDGER__GRACE_WINDOW_MS=2000`).
use std::time::Duration;

use config::{Config, ConfigError, Environment, File};
use ledger::ReactorConfig;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct App {
    pub level: String,
}

impl Default for App {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Database {
    Memory,
    Sqlite(String),
}

impl Default for Database {
    fn default() -> Self {
        Self::Sqlite("duitku.db".to_string())
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Ledger {
    pub grace_window_ms: u64,
    pub change_buffer: usize,
}

impl Default for Ledger {
    fn default() -> Self {
        let defaults = ReactorConfig::default();
        Self {
            grace_window_ms: defaults.grace_window.as_millis() as u64,
            change_buffer: defaults.change_buffer,
        }
    }
}

impl Ledger {
    pub fn reactor_config(&self) -> ReactorConfig {
        ReactorConfig {
            grace_window: Duration::from_millis(self.grace_window_ms),
            change_buffer: self.change_buffer,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub app: App,
    pub database: Database,
    pub ledger: Ledger,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(File::with_name("settings").required(false))
            .add_source(Environment::with_prefix("DUITKU").separator("__"))
            .build()?
            .try_deserialize()
    }
}
