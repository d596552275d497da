//! Snapshot persistence backends

use crate::error::SnapshotError;
use crate::snapshot::LibrarySnapshot;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

/// Result type for storage operations
pub type StorageResult<T> = std::result::Result<T, SnapshotError>;

/// Where library snapshots are kept between runs
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Load the last saved snapshot, or `None` if nothing was saved yet
    async fn load(&self) -> StorageResult<Option<LibrarySnapshot>>;

    /// Replace the saved snapshot
    async fn save(&self, snapshot: &LibrarySnapshot) -> StorageResult<()>;
}

/// JSON file on the local filesystem
pub struct LocalSnapshotStore {
    path: PathBuf,
}

impl LocalSnapshotStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl SnapshotStore for LocalSnapshotStore {
    async fn load(&self) -> StorageResult<Option<LibrarySnapshot>> {
        // Handle NotFound as an empty library
        match tokio::fs::read_to_string(&self.path).await {
            Ok(data) => Ok(Some(LibrarySnapshot::from_json(&data)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Writes to a temp file then renames to avoid partial writes
    async fn save(&self, snapshot: &LibrarySnapshot) -> StorageResult<()> {
        let data = snapshot.to_json_pretty()?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        // Same directory, so the rename stays on one filesystem
        let temp_path = self.path.with_extension("json.tmp");
        tokio::fs::write(&temp_path, &data).await?;
        tokio::fs::rename(&temp_path, &self.path).await?;
        Ok(())
    }
}

/// In-memory snapshot store (for testing)
#[derive(Default)]
pub struct MemorySnapshotStore {
    saved: Mutex<Option<LibrarySnapshot>>,
}

impl MemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The most recently saved snapshot
    pub fn latest(&self) -> Option<LibrarySnapshot> {
        self.saved
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl SnapshotStore for MemorySnapshotStore {
    async fn load(&self) -> StorageResult<Option<LibrarySnapshot>> {
        Ok(self.latest())
    }

    async fn save(&self, snapshot: &LibrarySnapshot) -> StorageResult<()> {
        *self.saved.lock().unwrap_or_else(PoisonError::into_inner) = Some(snapshot.clone());
        Ok(())
    }
}
