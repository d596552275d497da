//! Application state

use crate::config::{Config, CorsPolicy};
use anyhow::{Context, Result};
use bookshare_core::storage::{LocalSnapshotStore, SnapshotStore};
use bookshare_core::{Library, SnapshotError, SystemClock};
use std::sync::Arc;
use tokio::sync::{broadcast, Mutex};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub library: Arc<Library>,

    /// Where the library snapshot is saved after every mutation
    pub store: Arc<dyn SnapshotStore>,

    pub cors: CorsPolicy,

    /// Channel for SSE events
    pub event_tx: broadcast::Sender<ServerEvent>,

    /// Serializes snapshot writes so the newest state always lands last
    save_lock: Arc<Mutex<()>>,
}

/// Server-sent events
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerEvent {
    /// A book entered the review queue
    BookSubmitted { isbn: String, title: String },

    BookApproved { isbn: String },

    BookRejected { isbn: String, reason: String },

    /// A book and its engagement were removed
    BookDeleted { isbn: String },
}

impl AppState {
    /// Create application state, restoring the saved library if there is one
    pub async fn new(config: &Config) -> Result<Self> {
        tokio::fs::create_dir_all(&config.storage_path)
            .await
            .with_context(|| {
                format!("Failed to create storage directory {}", config.storage_path.display())
            })?;

        let snapshot_path = config.snapshot_path();
        let store = Arc::new(LocalSnapshotStore::new(&snapshot_path));

        // A snapshot that fails to load aborts startup
        let library = match store
            .load()
            .await
            .with_context(|| format!("Failed to read {}", snapshot_path.display()))?
        {
            Some(snapshot) => Library::from_snapshot(
                snapshot,
                config.admins.iter().cloned(),
                Arc::new(SystemClock),
            )
            .with_context(|| format!("Failed to restore {}", snapshot_path.display()))?,
            None => {
                tracing::info!("No saved library at {}, starting fresh", snapshot_path.display());
                Library::new(config.admins.iter().cloned())
            }
        };

        Ok(Self::with_store(library, store, config.cors.clone()))
    }

    pub fn with_store(library: Library, store: Arc<dyn SnapshotStore>, cors: CorsPolicy) -> Self {
        let (event_tx, _) = broadcast::channel(100);
        Self {
            library: Arc::new(library),
            store,
            cors,
            event_tx,
            save_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Save the current library snapshot
    pub async fn save_library(&self) -> Result<(), SnapshotError> {
        let _guard = self.save_lock.lock().await;
        let snapshot = self.library.snapshot();
        self.store.save(&snapshot).await
    }

    /// Subscribe to server events
    pub fn subscribe(&self) -> broadcast::Receiver<ServerEvent> {
        self.event_tx.subscribe()
    }

    /// Broadcast an event
    pub fn broadcast(&self, event: ServerEvent) {
        // Ignore errors (no subscribers)
        let _ = self.event_tx.send(event);
    }
}
