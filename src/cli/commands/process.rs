//! Normalization command.

use console::style;

use crate::cli::helpers::{open_store, print_stats};
use crate::config::Settings;
use crate::services::NormalizeService;
use crate::shutdown::ShutdownFlag;

pub async fn cmd_process(settings: &Settings, shutdown: &ShutdownFlag) -> anyhow::Result<()> {
    let ctx = open_store(settings).await?;
    let repo = ctx.entries();

    let service = NormalizeService::new(repo.clone(), settings.normalize_config(), shutdown.clone());
    let result = service.process_all().await?;

    if result.processed + result.failed == 0 {
        println!("{} Nothing to process", style("!").yellow());
    } else {
        println!(
            "{} Processed {}/{} matches ({} games) into {}",
            style("✓").green(),
            result.processed,
            result.processed + result.failed,
            result.games,
            settings.processed_dir.display()
        );
    }

    print_stats(&repo.stats().await?);
    Ok(())
}
