//! Validate command implementation

use super::load_snapshot;
use anyhow::{bail, Result};
use bookshare_core::snapshot::SNAPSHOT_VERSION;

/// Validate a library snapshot
pub async fn validate(input: &str, strict: bool) -> Result<()> {
    let snapshot = load_snapshot(input).await?;

    let mut problems: Vec<String> = snapshot
        .violations()
        .iter()
        .map(ToString::to_string)
        .collect();
    if snapshot.version > SNAPSHOT_VERSION {
        problems.push(format!(
            "version {} is newer than supported version {}",
            snapshot.version, SNAPSHOT_VERSION
        ));
    } else if strict && snapshot.version < SNAPSHOT_VERSION {
        problems.push(format!(
            "version {} is older than current version {}",
            snapshot.version, SNAPSHOT_VERSION
        ));
    }

    if problems.is_empty() {
        println!("Valid snapshot");
        println!("  Books: {}", snapshot.books.len());
        println!("  Accounts: {}", snapshot.accounts.len());
        Ok(())
    } else {
        for problem in &problems {
            eprintln!("  - {}", problem);
        }
        bail!("Validation failed for {}: {} problem(s)", input, problems.len());
    }
}
