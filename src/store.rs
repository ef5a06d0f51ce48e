//! Persisted artifacts: the forum list (JSON) and the summary table (CSV).
//!
//! Writes replace the whole file. Reads fail loudly on missing or malformed
//! input.

use crate::models::{Forum, MonthlySummary};
use anyhow::{Context, Result};
use std::path::Path;
use tracing::debug;

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }
    Ok(())
}

/// Write the forum list as pretty-printed JSON.
pub fn write_forums(path: &Path, forums: &[Forum]) -> Result<()> {
    ensure_parent(path)?;
    let content = serde_json::to_string_pretty(forums).context("Failed to serialize forums")?;
    std::fs::write(path, content)
        .with_context(|| format!("Failed to write forum list to {}", path.display()))?;

    debug!("Wrote {} forums to {}", forums.len(), path.display());
    Ok(())
}

/// Read a forum list written by [`write_forums`].
pub fn read_forums(path: &Path) -> Result<Vec<Forum>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read forum list: {}", path.display()))?;
    let forums: Vec<Forum> = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse forum list: {}", path.display()))?;
    Ok(forums)
}

/// Write the summary table as CSV with a header row.
pub fn write_summaries(path: &Path, rows: &[MonthlySummary]) -> Result<()> {
    ensure_parent(path)?;
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create summary table: {}", path.display()))?;

    if rows.is_empty() {
        writer.write_record([
            "subreddit",
            "month",
            "num_posts",
            "num_emdash",
            "last_emdash_example",
            "emdash_percent",
        ])?;
    }
    for row in rows {
        writer
            .serialize(row)
            .with_context(|| format!("Failed to write row for r/{}", row.forum_name))?;
    }
    writer.flush()?;

    debug!("Wrote {} summary rows to {}", rows.len(), path.display());
    Ok(())
}

/// Read a summary table written by [`write_summaries`].
pub fn read_summaries(path: &Path) -> Result<Vec<MonthlySummary>> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("Failed to open summary table: {}", path.display()))?;

    reader
        .deserialize::<MonthlySummary>()
        .enumerate()
        .map(|(i, row)| {
            row.with_context(|| format!("Malformed row {} in {}", i + 2, path.display()))
        })
        .collect()
}
