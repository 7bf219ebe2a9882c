//! Catalog discovery command.

use std::path::Path;
use std::time::Duration;

use console::style;
use indicatif::{ProgressBar, ProgressStyle};

use crate::cli::helpers::{open_store, print_stats};
use crate::config::Settings;
use crate::models::CatalogEntry;
use crate::scrapers::{export_csv, CatalogScraper};
use crate::shutdown::ShutdownFlag;

/// Walk the listing, export the catalog and record new entries.
pub async fn cmd_scrape(
    settings: &Settings,
    pages: Option<u32>,
    concurrency: Option<usize>,
    shutdown: &ShutdownFlag,
) -> anyhow::Result<()> {
    let ctx = open_store(settings).await?;
    let repo = ctx.entries();

    let config = settings.scrape_config();
    let pages = pages.unwrap_or(config.page_count);
    let concurrency = concurrency.unwrap_or(config.concurrency).max(1);
    let scraper = CatalogScraper::new(&config, shutdown.clone())?;

    println!(
        "{} Scraping {} listing pages with {} workers",
        style("→").cyan(),
        pages,
        concurrency
    );

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed_precise}] {msg}")?,
    );
    spinner.set_message(format!("Walking {}", settings.listing_url));
    spinner.enable_steady_tick(Duration::from_millis(120));

    let entries = scraper.scrape_all(pages, concurrency).await;
    spinner.finish_and_clear();

    if shutdown.is_requested() {
        println!(
            "{} Interrupted; keeping {} entries found so far",
            style("!").yellow(),
            entries.len()
        );
    }

    let csv_path = settings.csv_path();
    let exported = export_catalog(&entries, &csv_path, shutdown)?;
    let inserted = repo.insert_many(&entries).await?;

    println!(
        "{} Found {} matches ({} new)",
        style("✓").green(),
        entries.len(),
        inserted
    );
    if exported {
        println!("  {} Catalog exported to {}", style("→").dim(), csv_path.display());
    } else {
        println!(
            "  {} Catalog export skipped; {} left unchanged",
            style("→").dim(),
            csv_path.display()
        );
    }

    print_stats(&repo.stats().await?);
    Ok(())
}

/// Write the catalog CSV unless the walk was interrupted.
///
/// A partial list never replaces an earlier export. Returns whether the file
/// was written.
fn export_catalog(
    entries: &[CatalogEntry],
    path: &Path,
    shutdown: &ShutdownFlag,
) -> anyhow::Result<bool> {
    if shutdown.is_requested() {
        return Ok(false);
    }
    export_csv(entries, path)?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_interrupted_scrape_keeps_previous_export() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("catalog.csv");
        let full = vec![CatalogEntry::new(2, "2021-01-02"), CatalogEntry::new(1, "2021-01-01")];
        let shutdown = ShutdownFlag::new();

        assert!(export_catalog(&full, &path, &shutdown).unwrap());
        let before = std::fs::read_to_string(&path).unwrap();

        shutdown.request();
        assert!(!export_catalog(&full[..1], &path, &shutdown).unwrap());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), before);
        assert_eq!(before.lines().count(), 3);
    }
}
