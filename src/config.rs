//! Configuration management for appdeck.
//!
//! This module defines the structure of the `appdeck.toml` configuration file
//! and provides functionality to load and parse it.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::registry::AppSpec;

/// Top-level configuration structure corresponding to `appdeck.toml`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Log location handed to every application start.
    pub log_path: Option<PathBuf>,
    /// Whether to use Unicode symbols in the TUI (default: true).
    pub symbols: Option<bool>,
    /// File that receives the dashboard's own trace output.
    pub trace_file: Option<PathBuf>,
    /// Trace level ("error", "warn", "info", "debug", "trace").
    pub log_level: Option<String>,
    /// Applications to supervise.
    #[serde(rename = "app", default)]
    pub apps: Vec<AppConfig>,
}

/// Configuration for a single application.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Display name of the application.
    pub name: String,
    /// First log line (default: "<name> initialized").
    pub initial_log: Option<String>,
    /// Whether to start the application when the dashboard opens (default: false).
    pub autostart: Option<bool>,
}

impl AppConfig {
    pub fn into_spec(self) -> AppSpec {
        let mut spec = AppSpec::named(self.name);
        if let Some(initial_log) = self.initial_log {
            spec.initial_log = initial_log;
        }
        spec.autostart = self.autostart.unwrap_or(false);
        spec
    }
}

/// Loads and parses the configuration from a file path.
pub fn load_config(path: &Path) -> Result<Config> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {}", path.display()))?;
    let config: Config = toml::from_str(&raw)
        .with_context(|| format!("failed to parse config file {}", path.display()))?;
    Ok(config)
}
