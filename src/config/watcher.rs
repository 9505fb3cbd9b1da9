//! Configuration file watcher for hot reload.
//!
//! Editors usually emit several modify events per save; a reload is only
//! forwarded when the file's text actually changed and still validates.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::config::loader::parse_config;
use crate::config::schema::DiscoveryConfig;
use crate::config::source::ConfigSource;

/// Watches one configuration file and sends every valid new version.
pub struct ConfigWatcher {
    path: PathBuf,
    update_tx: mpsc::UnboundedSender<DiscoveryConfig>,
}

impl ConfigWatcher {
    /// Returns the watcher and the receiving end of its updates.
    pub fn new(path: &Path) -> (Self, mpsc::UnboundedReceiver<DiscoveryConfig>) {
        let (update_tx, update_rx) = mpsc::unbounded_channel();
        (
            Self {
                path: path.to_path_buf(),
                update_tx,
            },
            update_rx,
        )
    }

    /// Start watching. Dropping the returned watcher stops it.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let tx = self.update_tx;
        let path = self.path.clone();
        let mut last_text = fs::read_to_string(&path).ok();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) if event.kind.is_modify() || event.kind.is_create() => {
                    if let Some(config) = reload(&path, &mut last_text) {
                        let _ = tx.send(config);
                    }
                }
                Ok(_) => {}
                Err(e) => tracing::error!(error = ?e, "Config watch error"),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        watcher.watch(&self.path, RecursiveMode::NonRecursive)?;

        tracing::info!(path = ?self.path, "Config watcher started");
        Ok(watcher)
    }
}

/// Re-read `path`, returning a config only if the text differs from
/// `last_text` and parses and validates.
fn reload(path: &Path, last_text: &mut Option<String>) -> Option<DiscoveryConfig> {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) => {
            tracing::warn!(path = ?path, error = %e, "Config file unreadable, keeping current configuration");
            return None;
        }
    };

    if last_text.as_deref() == Some(text.as_str()) {
        tracing::trace!(path = ?path, "Config file event without content change");
        return None;
    }

    match parse_config(&text) {
        Ok(config) => {
            tracing::info!(path = ?path, "Config file changed, reloading");
            *last_text = Some(text);
            Some(config)
        }
        Err(e) => {
            tracing::error!(path = ?path, error = %e, "Failed to reload config, keeping current configuration");
            None
        }
    }
}

/// Apply every update from `updates` to `source` until the channel closes.
pub async fn apply_updates(source: ConfigSource, mut updates: mpsc::UnboundedReceiver<DiscoveryConfig>) {
    while let Some(config) = updates.recv().await {
        source.store(config);
    }
    tracing::debug!("Config update channel closed");
}
