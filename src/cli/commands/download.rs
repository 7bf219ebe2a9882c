//! Payload download command.

use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::mpsc;

use crate::cli::helpers::{open_store, print_stats, truncate};
use crate::config::Settings;
use crate::services::{FetchEvent, FetchService};
use crate::shutdown::ShutdownFlag;

/// Fetch pending entries, newest first.
pub async fn cmd_download(
    settings: &Settings,
    limit: usize,
    concurrency: Option<usize>,
    shutdown: &ShutdownFlag,
) -> anyhow::Result<()> {
    let ctx = open_store(settings).await?;
    let repo = ctx.entries();

    let limit_opt = if limit > 0 { Some(limit) } else { None };
    let pending = repo.list_pending(limit_opt).await?;

    if pending.is_empty() {
        println!("{} No pending matches to download", style("!").yellow());
        println!(
            "  {} Run 'lc0acquire scrape' to discover new matches",
            style("→").dim()
        );
        print_stats(&repo.stats().await?);
        return Ok(());
    }

    let mut config = settings.fetch_config();
    if let Some(n) = concurrency {
        config.concurrency = n.max(1);
    }

    println!(
        "{} Downloading {} matches with {} workers",
        style("→").cyan(),
        pending.len(),
        config.concurrency
    );

    // Event channel for progress updates
    let (event_tx, mut event_rx) = mpsc::channel::<FetchEvent>(100);
    let service = FetchService::new(repo.clone(), config, shutdown.clone())?.with_events(event_tx);

    let pb = ProgressBar::new(pending.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({per_sec}) {msg}")?
            .progress_chars("#>-"),
    );

    // Spawn event handler task (UI layer)
    let pb_events = pb.clone();
    let event_handler = tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            match event {
                FetchEvent::Started { id } => {
                    pb_events.set_message(format!("match {}", id));
                }
                FetchEvent::Completed { .. } => pb_events.inc(1),
                FetchEvent::Failed { id, error } => {
                    pb_events.inc(1);
                    pb_events.set_message(truncate(&format!("match {}: {}", id, error), 60));
                }
            }
        }
    });

    let result = service.fetch_all(pending).await;

    // Closing the channel lets the handler drain and exit
    drop(service);
    let _ = event_handler.await;
    pb.finish_and_clear();

    println!(
        "{} Downloaded {}/{} matches",
        style("✓").green(),
        result.succeeded,
        result.attempted()
    );
    if result.failed > 0 {
        println!("  {} {} failed this run", style("!").yellow(), result.failed);
    }
    if result.skipped > 0 {
        println!(
            "  {} {} skipped after interrupt",
            style("→").dim(),
            result.skipped
        );
    }

    print_stats(&repo.stats().await?);
    Ok(())
}
