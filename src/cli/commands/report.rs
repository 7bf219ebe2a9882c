//! Read-only reports over the store and the artifact directories.

use std::collections::BTreeMap;
use std::io;
use std::path::Path;

use console::style;

use crate::cli::helpers::{format_bytes, open_existing_store, percent, print_header, truncate};
use crate::config::Settings;
use crate::models::TrackedEntry;

/// Date-fragment lookups print at most this many rows.
const LOOKUP_LIMIT: usize = 20;

pub async fn cmd_overview(settings: &Settings) -> anyhow::Result<()> {
    let Some(ctx) = open_existing_store(settings).await? else {
        return Ok(());
    };
    let repo = ctx.entries();
    let stats = repo.stats().await?;

    print_header("Overview");
    println!("{:<20} {}", "Data Directory:", settings.data_dir.display());
    println!("{:<20} {}", "Total matches:", stats.total);
    if let Some((earliest, latest)) = repo.date_range().await? {
        println!("{:<20} {} to {}", "Date range:", earliest, latest);
    }

    println!("\nDownload status:");
    for (label, count) in [
        ("pending", stats.pending),
        ("retry", stats.retry),
        ("success", stats.success),
        ("failed", stats.failed),
    ] {
        println!(
            "  {:<15} {:>8} ({:>5.1}%)",
            label,
            count,
            percent(count, stats.total)
        );
    }
    println!(
        "\n{:<20} {} ({:.1}% of downloaded)",
        "Processed:",
        stats.processed,
        percent(stats.processed, stats.success)
    );

    let awaiting_processing = stats.success.saturating_sub(stats.processed);
    if stats.pending + stats.retry > 0 {
        println!(
            "  {} {} matches awaiting download: lc0acquire download",
            style("→").dim(),
            stats.pending + stats.retry
        );
    }
    if awaiting_processing > 0 {
        println!(
            "  {} {} matches awaiting processing: lc0acquire process",
            style("→").dim(),
            awaiting_processing
        );
    }
    Ok(())
}

pub async fn cmd_monthly(settings: &Settings) -> anyhow::Result<()> {
    let Some(ctx) = open_existing_store(settings).await? else {
        return Ok(());
    };
    let months = ctx.entries().month_breakdown().await?;

    print_header("Monthly Breakdown");
    println!(
        "{:<10} {:>8} {:>12} {:>11} {:>8}",
        "Month", "Total", "Downloaded", "Processed", "Rate"
    );
    println!("{}", "-".repeat(53));
    for month in months.iter().rev() {
        println!(
            "{:<10} {:>8} {:>12} {:>11} {:>7.1}%",
            month.month,
            month.total,
            month.downloaded,
            month.processed,
            percent(month.downloaded, month.total)
        );
    }
    Ok(())
}

pub async fn cmd_failures(settings: &Settings, limit: usize) -> anyhow::Result<()> {
    let Some(ctx) = open_existing_store(settings).await? else {
        return Ok(());
    };
    let repo = ctx.entries();
    let stats = repo.stats().await?;

    print_header("Failures");
    println!("{:<28} {}", "Permanently failed:", stats.failed);
    println!("{:<28} {}", "Awaiting retry:", stats.retry);
    println!("{:<28} {}", "Attempt limit:", repo.max_attempts());

    let failures = repo.recent_failures(limit).await?;
    if failures.is_empty() {
        println!("\n{} No failed attempts recorded", style("✓").green());
        return Ok(());
    }

    println!("\nRecent failed attempts:");
    println!("{:<12} {:<20} {:<8} {}", "Match ID", "Time", "Status", "Reason");
    println!("{}", "-".repeat(90));
    for failure in failures {
        println!(
            "{:<12} {:<20} {:<8} {}",
            failure.entry_id,
            failure.timestamp.format("%Y-%m-%d %H:%M:%S"),
            failure.status.as_str(),
            truncate(&failure.message, 48)
        );
    }
    Ok(())
}

pub async fn cmd_files(settings: &Settings) -> anyhow::Result<()> {
    let downloads_dir = settings.downloads_dir.clone();
    let processed_dir = settings.processed_dir.clone();
    let summary =
        tokio::task::spawn_blocking(move || scan_artifacts(&downloads_dir, &processed_dir))
            .await??;

    print_header("Files");
    println!(
        "{:<24} {} ({})",
        "Downloaded files:",
        summary.downloaded_files,
        format_bytes(summary.downloaded_bytes)
    );
    println!("{:<24} {}", "Aggregate files:", summary.aggregate_files);
    println!("{:<24} {}", "Games (estimated):", summary.games);

    if !summary.bytes_by_year.is_empty() {
        println!("\nAggregates by year:");
        for (year, bytes) in summary.bytes_by_year.iter().rev() {
            println!("  {}: {:>10}", year, format_bytes(*bytes));
        }
    }
    Ok(())
}

pub async fn cmd_lookup(
    settings: &Settings,
    id: Option<i64>,
    date: Option<&str>,
) -> anyhow::Result<()> {
    let Some(ctx) = open_existing_store(settings).await? else {
        return Ok(());
    };
    let repo = ctx.entries();

    if let Some(id) = id {
        let Some(entry) = repo.get(id).await? else {
            println!("{} No match with id {}", style("!").yellow(), id);
            return Ok(());
        };
        print_entries(std::slice::from_ref(&entry));

        let history = repo.audit_log_for(id).await?;
        if !history.is_empty() {
            println!("\nAttempt history:");
            for row in history {
                println!(
                    "  {} {:<8} {}",
                    row.timestamp.format("%Y-%m-%d %H:%M:%S"),
                    row.status.as_str(),
                    row.message
                );
            }
        }
        return Ok(());
    }

    if let Some(fragment) = date {
        let found = repo.find_by_date(fragment).await?;
        if found.is_empty() {
            println!("{} No matches dated like {:?}", style("!").yellow(), fragment);
            return Ok(());
        }
        let shown = found.len().min(LOOKUP_LIMIT);
        print_entries(&found[..shown]);
        if found.len() > shown {
            println!(
                "  {} {} more not shown",
                style("→").dim(),
                found.len() - shown
            );
        }
    }
    Ok(())
}

fn print_entries(entries: &[TrackedEntry]) {
    println!(
        "{:<12} {:<20} {:<8} {:>8} {:<10}",
        "Match ID", "Date", "Status", "Attempts", "Processed"
    );
    println!("{}", "-".repeat(64));
    for tracked in entries {
        let date: String = tracked.entry.occurred_at.chars().take(19).collect();
        println!(
            "{:<12} {:<20} {:<8} {:>8} {:<10}",
            tracked.entry.id,
            date,
            tracked.status.as_str(),
            tracked.attempts,
            if tracked.processed { "yes" } else { "no" }
        );
    }
}

/// What is on disk under the artifact directories.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ArtifactSummary {
    pub downloaded_files: u64,
    pub downloaded_bytes: u64,
    pub aggregate_files: u64,
    /// `[Event ` tags across all aggregates.
    pub games: u64,
    pub bytes_by_year: BTreeMap<String, u64>,
}

/// Scan the download and aggregate directories. Missing directories count as empty.
pub fn scan_artifacts(downloads_dir: &Path, processed_dir: &Path) -> io::Result<ArtifactSummary> {
    let mut summary = ArtifactSummary::default();

    if downloads_dir.is_dir() {
        for item in std::fs::read_dir(downloads_dir)? {
            let item = item?;
            let name = item.file_name().to_string_lossy().into_owned();
            let is_payload = name.ends_with(".pgn") || name.ends_with(".pgn.tar.gz");
            if is_payload && item.file_type()?.is_file() {
                summary.downloaded_files += 1;
                summary.downloaded_bytes += item.metadata()?.len();
            }
        }
    }

    if processed_dir.is_dir() {
        let mut stack = vec![processed_dir.to_path_buf()];
        while let Some(dir) = stack.pop() {
            for item in std::fs::read_dir(&dir)? {
                let path = item?.path();
                if path.is_dir() {
                    stack.push(path);
                    continue;
                }
                if path.extension().and_then(|e| e.to_str()) != Some("pgn") {
                    continue;
                }

                let bytes = std::fs::read(&path)?;
                let text = String::from_utf8_lossy(&bytes);
                summary.aggregate_files += 1;
                summary.games += text.matches("[Event ").count() as u64;

                let year = path
                    .strip_prefix(processed_dir)
                    .ok()
                    .and_then(|rel| rel.components().next())
                    .map(|c| c.as_os_str().to_string_lossy().into_owned())
                    .unwrap_or_else(|| "unknown".to_string());
                *summary.bytes_by_year.entry(year).or_default() += bytes.len() as u64;
            }
        }
    }

    Ok(summary)
}
