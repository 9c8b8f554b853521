//! Configuration file watcher for hot reload.
//!
//! Watches the main configuration file and every rule set file. The watcher
//! only signals changes; reloading and rebuilding is left to the receiver so
//! that a broken file never replaces the active rule set.

use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

/// A watcher that monitors configuration files for changes.
pub struct ConfigWatcher {
    paths: Vec<PathBuf>,
    change_tx: mpsc::UnboundedSender<PathBuf>,
}

impl ConfigWatcher {
    /// Create a new ConfigWatcher.
    ///
    /// Returns the watcher and a receiver yielding the path of every changed file.
    pub fn new(paths: &[&Path]) -> (Self, mpsc::UnboundedReceiver<PathBuf>) {
        let (change_tx, change_rx) = mpsc::unbounded_channel();

        (
            Self {
                paths: paths.iter().map(|p| p.to_path_buf()).collect(),
                change_tx,
            },
            change_rx,
        )
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    /// Start watching in a background thread. Dropping the returned watcher stops it.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let tx = self.change_tx.clone();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    if event.kind.is_modify() || event.kind.is_create() {
                        for path in event.paths {
                            tracing::info!(path = ?path, "Configuration change detected");
                            let _ = tx.send(path);
                        }
                    }
                }
                Err(e) => tracing::error!("Watch error: {:?}", e),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        for path in &self.paths {
            watcher.watch(path, RecursiveMode::NonRecursive)?;
        }

        tracing::info!(paths = ?self.paths, "Config watcher started");
        Ok(watcher)
    }
}
