//! Config file watching for hot reload.
//!
//! The parent directory is watched rather than the file itself: editors that
//! save by writing a temp file and renaming it over the original would
//! otherwise detach the watch after the first save.

use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::config::loader::load_config;
use crate::config::schema::GatewayConfig;

/// Emits a freshly loaded [`GatewayConfig`] each time the file changes.
pub struct ConfigWatcher {
    path: PathBuf,
    current: GatewayConfig,
    update_tx: mpsc::UnboundedSender<GatewayConfig>,
}

impl ConfigWatcher {
    /// Returns the watcher and the receiving end of its updates.
    ///
    /// `current` is the config already in effect; rewriting the file with the
    /// same content produces no update.
    pub fn new(path: &Path, current: GatewayConfig) -> (Self, mpsc::UnboundedReceiver<GatewayConfig>) {
        let (update_tx, update_rx) = mpsc::unbounded_channel();
        let watcher = Self {
            path: path.to_path_buf(),
            current,
            update_tx,
        };
        (watcher, update_rx)
    }

    /// Start watching on notify's background thread.
    ///
    /// Reloads stop when the returned handle is dropped. Invalid edits are
    /// logged and skipped; identical reloads are not re-sent.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let Self { path, current, update_tx } = self;
        let file_name = path.file_name().map(|n| n.to_os_string());
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };

        let watched = path.clone();
        let mut last_sent = current;
        let handler = move |res: notify::Result<Event>| {
            let event = match res {
                Ok(event) => event,
                Err(e) => {
                    tracing::error!(error = %e, "Config watch error");
                    return;
                }
            };
            if !matches!(event.kind, EventKind::Create(_) | EventKind::Modify(_)) {
                return;
            }
            let touches_config = event
                .paths
                .iter()
                .any(|p| p.file_name().map(|n| n.to_os_string()) == file_name);
            if !touches_config {
                return;
            }

            match load_config(&watched) {
                Ok(config) if config == last_sent => {}
                Ok(config) => {
                    tracing::info!(path = %watched.display(), "Config file changed, reloading");
                    last_sent = config.clone();
                    let _ = update_tx.send(config);
                }
                Err(e) => {
                    tracing::error!(
                        path = %watched.display(),
                        error = %e,
                        "Reloaded config is invalid, keeping current configuration"
                    );
                }
            }
        };

        let mut watcher = RecommendedWatcher::new(handler, Config::default().with_poll_interval(Duration::from_secs(2)))?;
        watcher.watch(&dir, RecursiveMode::NonRecursive)?;

        tracing::info!(path = %path.display(), "Config watcher started");
        Ok(watcher)
    }
}
