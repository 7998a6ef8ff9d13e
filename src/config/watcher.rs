//! Configuration file watcher for hot reload.
//!
//! Editors usually emit several events per save (truncate, write, rename).
//! Events are debounced so one save produces at most one reload, and a file
//! that fails to load or validate leaves the running configuration alone.

use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::{RecommendedWatcher, RecursiveMode};
use notify_debouncer_mini::{new_debouncer, DebounceEventResult, Debouncer};
use tokio::sync::mpsc;

use crate::config::loader::load_config;
use crate::config::schema::GuardConfig;

/// Quiet period before a burst of file events triggers a reload.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(500);

/// Watches the configuration file and publishes validated updates.
pub struct ConfigWatcher {
    path: PathBuf,
    debounce: Duration,
    update_tx: mpsc::UnboundedSender<GuardConfig>,
}

impl ConfigWatcher {
    /// Returns the watcher and a receiver for validated configuration updates.
    pub fn new(path: &Path) -> (Self, mpsc::UnboundedReceiver<GuardConfig>) {
        let (update_tx, update_rx) = mpsc::unbounded_channel();
        let watcher = Self {
            path: path.to_path_buf(),
            debounce: DEFAULT_DEBOUNCE,
            update_tx,
        };
        (watcher, update_rx)
    }

    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    /// Start watching the file. The returned handle must be kept alive.
    pub fn run(self) -> Result<Debouncer<RecommendedWatcher>, notify::Error> {
        let path = self.path.clone();
        let tx = self.update_tx.clone();

        let mut debouncer = new_debouncer(self.debounce, move |result: DebounceEventResult| {
            handle_events(&path, &tx, result);
        })?;
        debouncer
            .watcher()
            .watch(&self.path, RecursiveMode::NonRecursive)?;

        tracing::info!(path = ?self.path, debounce_ms = self.debounce.as_millis() as u64, "Config watcher started");
        Ok(debouncer)
    }
}

/// Reload once for a settled batch of events. Returns whether an update was sent.
fn handle_events(
    path: &Path,
    tx: &mpsc::UnboundedSender<GuardConfig>,
    result: DebounceEventResult,
) -> bool {
    match result {
        Ok(events) if events.is_empty() => false,
        Ok(events) => {
            tracing::info!(path = ?path, events = events.len(), "Config file change detected, reloading");
            match load_config(path) {
                Ok(config) => tx.send(config).is_ok(),
                Err(e) => {
                    tracing::error!(error = %e, "Failed to reload config, keeping current configuration");
                    false
                }
            }
        }
        Err(e) => {
            tracing::error!(error = ?e, "Config watch error");
            false
        }
    }
}
