//! Statistics command.

use crate::cli::helpers::{open_existing_store, print_stats};
use crate::config::Settings;

pub async fn cmd_stats(settings: &Settings, json: bool) -> anyhow::Result<()> {
    let Some(ctx) = open_existing_store(settings).await? else {
        return Ok(());
    };
    let stats = ctx.entries().stats().await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
    } else {
        print_stats(&stats);
    }
    Ok(())
}
