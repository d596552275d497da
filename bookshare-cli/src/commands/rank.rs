//! Trending and recommendation commands

use super::load_snapshot;
use anyhow::Result;
use bookshare_core::{aggregate, Principal};

/// Print the trending ranking
pub async fn trending(input: &str, limit: usize, json: bool) -> Result<()> {
    let snapshot = load_snapshot(input).await?;
    let ranked = aggregate::trending(&snapshot, limit);

    if json {
        println!("{}", serde_json::to_string_pretty(&ranked)?);
        return Ok(());
    }

    if ranked.is_empty() {
        println!("No listed books");
    }
    for (position, entry) in ranked.iter().enumerate() {
        let average = entry
            .average_rating
            .map(|avg| format!("{:.2}", avg))
            .unwrap_or_else(|| "unrated".to_string());
        println!(
            "{:>3}. {} {} ({}, {} ratings, score {:.3})",
            position + 1,
            entry.book.isbn,
            entry.book.details.title,
            average,
            entry.rating_count,
            entry.score
        );
    }
    Ok(())
}

/// Print recommendations for one user
pub async fn recommend(input: &str, user: &str, limit: usize, json: bool) -> Result<()> {
    let snapshot = load_snapshot(input).await?;
    let user = Principal::new(user);
    let picks = aggregate::recommendations(&snapshot, &user, limit);

    if json {
        println!("{}", serde_json::to_string_pretty(&picks)?);
        return Ok(());
    }

    if picks.is_empty() {
        println!("No recommendations for {}", user);
    }
    for (position, pick) in picks.iter().enumerate() {
        println!(
            "{:>3}. {} {} ({})",
            position + 1,
            pick.book.isbn,
            pick.book.details.title,
            pick.reason
        );
    }
    Ok(())
}
