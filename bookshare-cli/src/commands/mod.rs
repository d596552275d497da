//! CLI command implementations

mod info;
mod rank;
mod validate;

pub use info::info;
pub use rank::{recommend, trending};
pub use validate::validate;

use anyhow::{Context, Result};
use bookshare_core::storage::{LocalSnapshotStore, SnapshotStore};
use bookshare_core::LibrarySnapshot;

/// Read a snapshot file; a missing file is an error here
async fn load_snapshot(path: &str) -> Result<LibrarySnapshot> {
    let store = LocalSnapshotStore::new(path);
    let snapshot = store
        .load()
        .await
        .with_context(|| format!("Failed to read snapshot {}", path))?
        .with_context(|| format!("No snapshot found at {}", path))?;

    tracing::debug!(
        books = snapshot.books.len(),
        accounts = snapshot.accounts.len(),
        "Loaded snapshot"
    );
    Ok(snapshot)
}
