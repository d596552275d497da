//! Info command implementation

use super::load_snapshot;
use anyhow::Result;
use bookshare_core::aggregate;
use serde::Serialize;

/// Snapshot info output
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SnapshotInfo {
    version: u32,
    #[serde(flatten)]
    stats: bookshare_core::LibraryStats,
}

/// Display counts for a library snapshot
pub async fn info(input: &str, json: bool) -> Result<()> {
    let snapshot = load_snapshot(input).await?;
    let info = SnapshotInfo {
        version: snapshot.version,
        stats: aggregate::stats(&snapshot),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&info)?);
    } else {
        let stats = &info.stats;
        println!("Version:        {}", info.version);
        println!("Approved books: {}", stats.approved_books);
        println!("Pending books:  {}", stats.pending_books);
        println!("Rejected books: {}", stats.rejected_books);
        println!("Ratings:        {}", stats.ratings);
        println!("Bookmarks:      {}", stats.bookmarks);
        println!("Progress rows:  {}", stats.progress_entries);
        println!("Accounts:       {}", stats.accounts);
        println!("Edit requests:  {}", stats.open_edit_requests);
    }

    Ok(())
}
