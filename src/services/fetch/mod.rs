//! Payload fetch service.
//!
//! Resolves each pending entry against the candidate layouts, validates what
//! comes back, saves the first acceptable payload and records the attempt.
//! Separated from UI concerns - emits events for progress tracking.

pub mod layout;
mod types;
pub mod validate;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::{mpsc, Semaphore};
use tracing::{debug, error, info, warn};
use url::Url;

use crate::models::{AttemptOutcome, CatalogEntry, FetchStatus};
use crate::repository::{DbError, EntryRepository};
use crate::scrapers::HttpClient;
use crate::shutdown::ShutdownFlag;
use crate::storage::{content_hash, download_path, publish_atomic};

pub use layout::{default_layouts, Candidate, PayloadKind, StorageLayout};
pub use types::{FetchConfig, FetchError, FetchEvent, FetchResult};
use validate::validate_payload;

/// A payload that passed validation.
struct Accepted {
    url: Url,
    content: Vec<u8>,
}

/// Result of walking an entry's candidates.
enum Resolution {
    Accepted(Accepted),
    /// Every candidate was rejected; holds the summary for the audit log.
    Exhausted(String),
    /// An interrupt arrived before a payload was accepted.
    Interrupted,
}

/// Service for downloading match payloads.
pub struct FetchService {
    repo: EntryRepository,
    client: HttpClient,
    storage_root: Url,
    config: FetchConfig,
    shutdown: ShutdownFlag,
    events: Option<mpsc::Sender<FetchEvent>>,
}

impl FetchService {
    /// Create a new fetch service.
    pub fn new(
        repo: EntryRepository,
        config: FetchConfig,
        shutdown: ShutdownFlag,
    ) -> anyhow::Result<Self> {
        let client = HttpClient::raw_bodies(
            config.request_timeout,
            config.request_delay,
            config.user_agent.as_deref(),
        )?;
        let storage_root = layout::storage_root(&config.storage_url)?;

        Ok(Self {
            repo,
            client,
            storage_root,
            config,
            shutdown,
            events: None,
        })
    }

    /// Stream progress events to `tx`.
    pub fn with_events(mut self, tx: mpsc::Sender<FetchEvent>) -> Self {
        self.events = Some(tx);
        self
    }

    /// Candidate URLs for an entry, in try order.
    pub fn candidates(&self, id: i64) -> Vec<Candidate> {
        layout::candidates(&self.storage_root, &self.config.layouts, id)
    }

    /// Attempt every entry once, with bounded concurrency.
    ///
    /// Per-entry failures, store errors included, are counted rather than
    /// returned.
    pub async fn fetch_all(&self, entries: Vec<CatalogEntry>) -> FetchResult {
        let semaphore = Arc::new(Semaphore::new(self.config.concurrency.max(1)));
        let succeeded = Arc::new(AtomicUsize::new(0));
        let failed = Arc::new(AtomicUsize::new(0));
        let skipped = Arc::new(AtomicUsize::new(0));

        info!(
            "Fetching {} entries with {} workers",
            entries.len(),
            self.config.concurrency
        );

        let tasks = entries.iter().map(|entry| {
            let semaphore = semaphore.clone();
            let succeeded = succeeded.clone();
            let failed = failed.clone();
            let skipped = skipped.clone();
            async move {
                let Ok(_permit) = semaphore.acquire().await else {
                    skipped.fetch_add(1, Ordering::Relaxed);
                    return;
                };
                if self.shutdown.is_requested() {
                    skipped.fetch_add(1, Ordering::Relaxed);
                    return;
                }

                match self.fetch_one(entry).await {
                    Ok(Some(FetchStatus::Success)) => {
                        succeeded.fetch_add(1, Ordering::Relaxed);
                    }
                    Ok(Some(_)) => {
                        failed.fetch_add(1, Ordering::Relaxed);
                    }
                    Ok(None) => {
                        skipped.fetch_add(1, Ordering::Relaxed);
                    }
                    // fetch_one already emitted the entry's terminal event
                    Err(e) => {
                        error!("Could not record attempt for match {}: {}", entry.id, e);
                        failed.fetch_add(1, Ordering::Relaxed);
                    }
                }
            }
        });

        futures::future::join_all(tasks).await;

        let result = FetchResult {
            succeeded: succeeded.load(Ordering::Relaxed),
            failed: failed.load(Ordering::Relaxed),
            skipped: skipped.load(Ordering::Relaxed),
        };
        if result.skipped > 0 {
            warn!("{} entries skipped after interrupt", result.skipped);
        }
        info!(
            "Fetched {}/{} entries",
            result.succeeded,
            result.attempted()
        );
        result
    }

    /// Attempt one entry and record the outcome.
    ///
    /// Returns the status the store resolved, or `None` when an interrupt cut
    /// the candidate walk short; such an attempt is not recorded. Only store
    /// errors are errors.
    pub async fn fetch_one(&self, entry: &CatalogEntry) -> Result<Option<FetchStatus>, DbError> {
        self.emit(FetchEvent::Started { id: entry.id }).await;

        let (outcome, message) = match self.resolve(entry).await {
            Resolution::Interrupted => {
                debug!("Match {}: interrupted before a payload was accepted", entry.id);
                return Ok(None);
            }
            Resolution::Accepted(accepted) => match self.save(entry, &accepted).await {
                Ok(message) => {
                    self.emit(FetchEvent::Completed {
                        id: entry.id,
                        url: accepted.url.to_string(),
                        bytes: accepted.content.len() as u64,
                    })
                    .await;
                    (AttemptOutcome::Success, message)
                }
                Err(e) => {
                    let message = format!("{}: {}", accepted.url, e);
                    error!("Match {}: {}", entry.id, message);
                    self.emit(FetchEvent::Failed {
                        id: entry.id,
                        error: message.clone(),
                    })
                    .await;
                    (AttemptOutcome::Failure, message)
                }
            },
            Resolution::Exhausted(message) => {
                self.emit(FetchEvent::Failed {
                    id: entry.id,
                    error: message.clone(),
                })
                .await;
                (AttemptOutcome::Failure, message)
            }
        };

        let status = self
            .repo
            .record_attempt(entry.id, outcome, &message)
            .await?;
        match status {
            FetchStatus::Success => debug!("Match {}: {}", entry.id, message),
            FetchStatus::Failed => warn!("Match {} failed permanently: {}", entry.id, message),
            _ => debug!("Match {} will be retried: {}", entry.id, message),
        }
        Ok(Some(status))
    }

    /// Try candidates in order; the first valid payload wins.
    ///
    /// The interrupt flag is checked before every candidate after the first.
    async fn resolve(&self, entry: &CatalogEntry) -> Resolution {
        let candidates = self.candidates(entry.id);
        let mut failures = Vec::with_capacity(candidates.len());

        for candidate in candidates {
            if !failures.is_empty() && self.shutdown.is_requested() {
                return Resolution::Interrupted;
            }
            match self.try_candidate(&candidate).await {
                Ok(content) => {
                    return Resolution::Accepted(Accepted {
                        url: candidate.url,
                        content,
                    })
                }
                Err(e) => {
                    match &e {
                        FetchError::NotFound => debug!("{}: not found", candidate.url),
                        other => warn!("Match {} via {}: {}", entry.id, candidate.url, other),
                    }
                    failures.push(format!("{}: {}", candidate.url, e));
                }
            }
        }

        Resolution::Exhausted(format!(
            "All {} candidates failed: {}",
            failures.len(),
            failures.join("; ")
        ))
    }

    async fn try_candidate(&self, candidate: &Candidate) -> Result<Vec<u8>, FetchError> {
        let response = self.client.get(candidate.url.as_str()).await?;

        if response.is_not_found() {
            return Err(FetchError::NotFound);
        }
        if !response.is_success() {
            return Err(FetchError::Status(response.status.as_u16()));
        }

        let content = response.bytes().await?;
        let kind = candidate.kind;
        let content = tokio::task::spawn_blocking(move || {
            validate_payload(&content, kind).map(|_| content)
        })
        .await
        .map_err(|e| FetchError::Invalid(e.to_string()))?
        .map_err(FetchError::Invalid)?;

        Ok(content)
    }

    /// Publish an accepted payload under the entry's deterministic name.
    async fn save(&self, entry: &CatalogEntry, accepted: &Accepted) -> Result<String, FetchError> {
        let path = download_path(&self.config.downloads_dir, &entry.source_filename);
        let bytes = publish_atomic(&path, accepted.content.clone()).await?;

        Ok(format!(
            "Downloaded from {} ({} bytes, sha256 {})",
            accepted.url,
            bytes,
            content_hash(&accepted.content)
        ))
    }

    async fn emit(&self, event: FetchEvent) {
        if let Some(tx) = &self.events {
            let _ = tx.send(event).await;
        }
    }
}
