//! Hot-reload configuration watcher

use crate::{validate_config, AppConfig, ConfigLoader, Result};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::PathBuf;
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Configuration watcher that monitors a config file for changes
///
/// Reloads the file when it changes. A reload that fails to parse or
/// validate keeps the previous configuration. Subscribers are notified
/// through a `watch` channel.
pub struct ConfigWatcher {
    /// Current configuration
    config: Arc<RwLock<AppConfig>>,
    /// Path to the config file being watched
    path: PathBuf,
    updates: watch::Sender<AppConfig>,
}

impl ConfigWatcher {
    /// Create a new config watcher
    ///
    /// Loads the initial configuration from the specified path
    pub fn new(path: PathBuf) -> Result<Self> {
        let config = ConfigLoader::from_file(&path)?;
        validate_config(&config)?;
        let (updates, _) = watch::channel(config.clone());

        Ok(Self {
            config: Arc::new(RwLock::new(config)),
            path,
            updates,
        })
    }

    /// Get a clone of the current configuration
    pub fn get_config(&self) -> AppConfig {
        self.config.read().expect("Config lock poisoned").clone()
    }

    /// Receiver that observes every successful reload
    pub fn subscribe(&self) -> watch::Receiver<AppConfig> {
        self.updates.subscribe()
    }

    /// Start watching the config file for changes
    ///
    /// Returns a join handle for the watcher task. The task will run until dropped.
    pub fn start_watching(&self) -> Result<JoinHandle<()>> {
        let config = Arc::clone(&self.config);
        let updates = self.updates.clone();
        let path = self.path.clone();

        // Create a channel for file system events
        let (tx, mut rx) = mpsc::channel(100);

        // Set up the file watcher
        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    if let Err(e) = tx.blocking_send(event) {
                        error!("Failed to send file event: {}", e);
                    }
                }
                Err(e) => error!("File watch error: {}", e),
            },
            notify::Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        // Watch the config file
        watcher.watch(&path, RecursiveMode::NonRecursive)?;

        info!("Started watching config file: {:?}", path);

        // Spawn the watcher task
        let handle = tokio::spawn(async move {
            // Keep the watcher alive by moving it into the task
            let _watcher = watcher;

            while let Some(event) = rx.recv().await {
                if !matches!(event.kind, EventKind::Modify(_) | EventKind::Create(_)) {
                    continue;
                }
                debug!("Config file changed, reloading...");

                let new_config = match ConfigLoader::from_file(&path)
                    .and_then(|c| validate_config(&c).map(|_| c))
                {
                    Ok(c) => c,
                    Err(e) => {
                        warn!("Failed to reload config: {}. Keeping old config.", e);
                        continue;
                    }
                };

                match config.write() {
                    Ok(mut guard) => {
                        *guard = new_config.clone();
                    }
                    Err(e) => {
                        error!("Failed to acquire write lock for config reload: {}", e);
                        continue;
                    }
                }

                updates.send_replace(new_config);
                info!("Config reloaded successfully");
            }

            debug!("Config watcher task stopped");
        });

        Ok(handle)
    }

    /// Create a watcher and start watching immediately
    ///
    /// This is a convenience method that combines `new` and `start_watching`
    pub fn watch(path: PathBuf) -> Result<(Self, JoinHandle<()>)> {
        let watcher = Self::new(path)?;
        let handle = watcher.start_watching()?;
        Ok((watcher, handle))
    }
}
