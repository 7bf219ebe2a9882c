//! Shared helper functions for CLI commands.

use console::style;

use crate::config::Settings;
use crate::models::StoreStats;
use crate::repository::DbContext;

/// Open the store, creating directories and applying migrations.
pub async fn open_store(settings: &Settings) -> anyhow::Result<DbContext> {
    settings.ensure_directories()?;
    let ctx = DbContext::new(&settings.database_path(), settings.max_attempts);
    ctx.init_schema().await?;
    Ok(ctx)
}

/// Open an existing store for reading. Returns `None` if nothing has been scraped.
///
/// Neither directories nor schema are touched, so reports leave the data
/// directory as they found it.
pub async fn open_existing_store(settings: &Settings) -> anyhow::Result<Option<DbContext>> {
    if !settings.database_exists() {
        println!(
            "{} No database at {}. Run 'lc0acquire scrape' first.",
            style("!").yellow(),
            settings.database_path().display()
        );
        return Ok(None);
    }
    Ok(Some(DbContext::new(
        &settings.database_path(),
        settings.max_attempts,
    )))
}

/// Format bytes as human-readable string.
pub fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

/// Percentage of `part` in `total`, 0 when the total is empty.
pub fn percent(part: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 / total as f64 * 100.0
    }
}

/// Truncate to `max` characters, marking the cut with an ellipsis.
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", cut)
    }
}

pub fn print_header(text: &str) {
    println!("\n{}", style(text).bold());
    println!("{}", "-".repeat(40));
}

/// Print the statistics block shown after every phase.
pub fn print_stats(stats: &StoreStats) {
    print_header("Match Statistics");
    println!("{:<20} {}", "Total:", stats.total);
    println!("{:<20} {}", "  pending:", stats.pending);
    println!("{:<20} {}", "  retry:", stats.retry);
    println!("{:<20} {}", "  success:", style(stats.success).green());
    println!("{:<20} {}", "  failed:", style(stats.failed).red());
    println!("{:<20} {}", "Processed:", stats.processed);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::migrations::run_migrations;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_open_existing_store_leaves_data_dir_alone() {
        let dir = tempdir().unwrap();
        let settings = Settings::with_data_dir(dir.path().to_path_buf());

        assert!(open_existing_store(&settings).await.unwrap().is_none());
        assert!(!settings.downloads_dir.exists());

        run_migrations(&settings.database_path().display().to_string())
            .await
            .unwrap();
        let ctx = open_existing_store(&settings).await.unwrap().unwrap();
        assert_eq!(ctx.entries().stats().await.unwrap().total, 0);
        assert!(!settings.downloads_dir.exists());
        assert!(!settings.processed_dir.exists());
    }

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(2048), "2.0 KB");
        assert_eq!(format_bytes(5 * 1024 * 1024), "5.0 MB");
        assert_eq!(format_bytes(3 * 1024 * 1024 * 1024), "3.00 GB");
    }

    #[test]
    fn test_percent_and_truncate() {
        assert_eq!(percent(1, 4), 25.0);
        assert_eq!(percent(3, 0), 0.0);
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("All 4 candidates failed", 10), "All 4 c...");
    }
}
