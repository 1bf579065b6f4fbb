//! The set of supervised applications.
//!
//! The key set is fixed at construction, so lookups and enumeration need no
//! lock of their own; each record carries its own guard.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;

use crate::launcher::Launcher;
use crate::record::AppRecord;

/// Definition of an application to supervise.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppSpec {
    /// Unique display name.
    pub name: String,
    /// First line placed in the application's log.
    pub initial_log: String,
    /// Whether the dashboard starts the application at launch.
    pub autostart: bool,
}

impl AppSpec {
    /// Spec with the default "<name> initialized" log line.
    pub fn named(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            initial_log: format!("{} initialized", name),
            name,
            autostart: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("duplicate application name: {0}")]
    DuplicateName(String),
}

/// Name-indexed collection of records, in definition order.
#[derive(Debug)]
pub struct Registry {
    records: Vec<Arc<AppRecord>>,
    index: HashMap<String, usize>,
    log_path: PathBuf,
}

impl Registry {
    pub fn new(
        specs: &[AppSpec],
        log_path: impl Into<PathBuf>,
        launcher: Arc<dyn Launcher>,
    ) -> Result<Self, RegistryError> {
        let mut records = Vec::with_capacity(specs.len());
        let mut index = HashMap::with_capacity(specs.len());
        for spec in specs {
            if index.insert(spec.name.clone(), records.len()).is_some() {
                return Err(RegistryError::DuplicateName(spec.name.clone()));
            }
            records.push(Arc::new(AppRecord::new(
                spec.name.clone(),
                spec.initial_log.clone(),
                Arc::clone(&launcher),
            )));
        }
        Ok(Self {
            records,
            index,
            log_path: log_path.into(),
        })
    }

    pub fn lookup(&self, name: &str) -> Option<Arc<AppRecord>> {
        self.index
            .get(name)
            .and_then(|&idx| self.records.get(idx))
            .cloned()
    }

    /// Application names in definition order.
    pub fn names(&self) -> Vec<String> {
        self.records
            .iter()
            .map(|record| record.name().to_string())
            .collect()
    }

    pub fn records(&self) -> impl Iterator<Item = &Arc<AppRecord>> {
        self.records.iter()
    }

    /// Opaque log location handed to every start.
    pub fn log_path(&self) -> &Path {
        &self.log_path
    }
}
