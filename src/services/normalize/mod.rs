//! Payload normalization service.
//!
//! Turns downloaded match artifacts into rewritten PGN games appended to
//! monthly aggregate files, then flags each entry processed.

pub mod archive;
pub mod pgn;

use std::path::PathBuf;

use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::models::{CatalogEntry, LabelTable};
use crate::repository::{DbError, EntryRepository};
use crate::shutdown::ShutdownFlag;
use crate::storage::{aggregate_path, append_unit, download_path};

/// Per-entry normalization failure. Never aborts a batch.
#[derive(Debug, Error)]
pub enum NormalizeError {
    #[error("Artifact not found: {}", .0.display())]
    MissingArtifact(PathBuf),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Extraction failed: {0}")]
    Extraction(String),

    #[error("Unparseable match date: {0:?}")]
    InvalidDate(String),

    #[error("Store error: {0}")]
    Store(#[from] DbError),
}

/// Configuration for the normalizer.
#[derive(Debug, Clone)]
pub struct NormalizeConfig {
    pub downloads_dir: PathBuf,
    pub processed_dir: PathBuf,
    /// File-name prefix of monthly aggregates.
    pub aggregate_prefix: String,
    pub labels: LabelTable,
}

/// Tally of a normalization run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct NormalizeResult {
    pub processed: usize,
    pub failed: usize,
    pub games: usize,
}

/// Service for normalizing downloaded artifacts.
pub struct NormalizeService {
    repo: EntryRepository,
    config: NormalizeConfig,
    shutdown: ShutdownFlag,
}

impl NormalizeService {
    pub fn new(repo: EntryRepository, config: NormalizeConfig, shutdown: ShutdownFlag) -> Self {
        Self {
            repo,
            config,
            shutdown,
        }
    }

    /// Normalize every downloaded, unprocessed entry, oldest first.
    ///
    /// Only a failure to query the store is returned as an error; per-entry
    /// failures are logged and counted.
    pub async fn process_all(&self) -> Result<NormalizeResult, DbError> {
        let entries = self.repo.list_unprocessed().await?;
        info!("Normalizing {} downloaded entries", entries.len());

        let mut result = NormalizeResult::default();
        for entry in &entries {
            if self.shutdown.is_requested() {
                warn!("Normalization interrupted; remaining entries stay unprocessed");
                break;
            }

            match self.process_one(entry).await {
                Ok(games) => {
                    result.processed += 1;
                    result.games += games;
                }
                Err(e) => {
                    error!("Failed to normalize match {}: {}", entry.id, e);
                    result.failed += 1;
                }
            }
        }

        info!(
            "Normalized {} entries ({} games), {} failed",
            result.processed, result.games, result.failed
        );
        Ok(result)
    }

    /// Normalize a single entry and return the number of games appended.
    ///
    /// The entry is marked processed only after every game has been
    /// appended. A failure partway leaves it unprocessed; games already
    /// appended stay.
    pub async fn process_one(&self, entry: &CatalogEntry) -> Result<usize, NormalizeError> {
        let date = entry
            .occurred_date()
            .ok_or_else(|| NormalizeError::InvalidDate(entry.occurred_at.clone()))?;

        let artifact = download_path(&self.config.downloads_dir, &entry.source_filename);
        if !tokio::fs::try_exists(&artifact).await? {
            return Err(NormalizeError::MissingArtifact(artifact));
        }
        let content = tokio::fs::read(&artifact).await?;

        let texts = tokio::task::spawn_blocking(move || archive::artifact_texts(&content))
            .await
            .map_err(|e| NormalizeError::Extraction(e.to_string()))?
            .map_err(|e| NormalizeError::Extraction(e.to_string()))?;
        if texts.is_empty() {
            return Err(NormalizeError::Extraction(format!(
                "no {} members in {}",
                archive::PGN_EXTENSION,
                artifact.display()
            )));
        }

        let label = self.config.labels.participant_label(Some(date));
        let target = aggregate_path(
            &self.config.processed_dir,
            &self.config.aggregate_prefix,
            date,
        );

        let mut games = 0;
        for text in &texts {
            for game in pgn::split_games(text) {
                let rewritten = pgn::rewrite_game(&game, entry.id, date, &label);
                append_unit(&target, &rewritten).await?;
                games += 1;
            }
        }

        self.repo.mark_processed(entry.id).await?;
        debug!(
            "Match {}: {} games -> {}",
            entry.id,
            games,
            target.display()
        );
        Ok(games)
    }
}
