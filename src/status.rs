//! Sync status overview.
//!
//! Lists what the metadata store remembers per client: which files have
//! been uploaded, under which remote id, and when they last changed. Used
//! by `docsync status` to confirm that scheduled jobs are landing.

use anyhow::Result;
use chrono::{DateTime, Utc};

use crate::config::Config;
use crate::db;
use crate::models::ArtifactMetadata;
use crate::store::{MetadataStore, SqliteMetadataStore};

/// Run the status command: read the metadata store and print a summary.
pub async fn run_status(config: &Config, client: Option<&str>) -> Result<()> {
    let pool = db::connect(config).await?;
    let store = SqliteMetadataStore::new(pool.clone());
    let rows = store.list(client).await?;

    let db_size = std::fs::metadata(&config.db.path)
        .map(|m| m.len())
        .unwrap_or(0);

    println!("docsync status");
    println!("==============");
    println!();
    println!("  Database:    {}", config.db.path.display());
    println!("  Size:        {}", format_bytes(db_size));
    println!("  Artifacts:   {}", rows.len());
    println!();
    print!("{}", render_table(&rows, Utc::now()));

    pool.close().await;
    Ok(())
}

/// Render metadata rows grouped by client, newest sync shown relative to `now`.
pub fn render_table(rows: &[ArtifactMetadata], now: DateTime<Utc>) -> String {
    if rows.is_empty() {
        return "  Nothing synced yet.\n".to_string();
    }

    let mut out = String::new();
    out.push_str(&format!(
        "  {:<12} {:<40} {:<38} {:<12} {}\n",
        "CLIENT", "FILENAME", "DOCUMENT ID", "SIGNATURE", "LAST SYNC"
    ));
    out.push_str(&format!("  {}\n", "-".repeat(118)));

    for row in rows {
        let sig = row.signature.as_str();
        out.push_str(&format!(
            "  {:<12} {:<40} {:<38} {:<12} {}\n",
            row.client_id,
            row.filename,
            row.remote_document_id,
            &sig[..sig.len().min(12)],
            format_relative(row.last_updated, now)
        ));
    }
    out
}

fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}

/// Format a timestamp relative to `now` (e.g. "3 hours ago").
fn format_relative(ts: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let delta = (now - ts).num_seconds();

    if delta < 0 {
        return ts.format("%Y-%m-%d %H:%M").to_string();
    }

    if delta < 60 {
        "just now".to_string()
    } else if delta < 3600 {
        let mins = delta / 60;
        format!("{} min{} ago", mins, if mins == 1 { "" } else { "s" })
    } else if delta < 86400 {
        let hours = delta / 3600;
        format!("{} hour{} ago", hours, if hours == 1 { "" } else { "s" })
    } else if delta < 86400 * 30 {
        let days = delta / 86400;
        format!("{} day{} ago", days, if days == 1 { "" } else { "s" })
    } else {
        ts.format("%Y-%m-%d %H:%M").to_string()
    }
}
