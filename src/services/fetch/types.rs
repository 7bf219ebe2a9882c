//! Types for the payload fetch service.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use super::layout::StorageLayout;

/// Why a single candidate URL was not accepted.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("not found")]
    NotFound,

    #[error("HTTP {0}")]
    Status(u16),

    #[error("timed out")]
    Timeout,

    #[error("network error: {0}")]
    Network(String),

    #[error("invalid payload: {0}")]
    Invalid(String),

    #[error("could not save payload: {0}")]
    Persist(#[from] std::io::Error),
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout
        } else {
            Self::Network(e.to_string())
        }
    }
}

/// Events emitted during a fetch run, for progress displays.
#[derive(Debug, Clone)]
pub enum FetchEvent {
    /// Work on an entry began.
    Started { id: i64 },
    /// A candidate was accepted and saved.
    Completed { id: i64, url: String, bytes: u64 },
    /// Every candidate failed or the result could not be recorded.
    Failed { id: i64, error: String },
}

/// Tally of a fetch run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FetchResult {
    pub succeeded: usize,
    pub failed: usize,
    /// Entries not started because of an interrupt.
    pub skipped: usize,
}

impl FetchResult {
    pub fn attempted(&self) -> usize {
        self.succeeded + self.failed
    }
}

/// Configuration for the fetch service.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub storage_url: String,
    /// Tried in order for every entry.
    pub layouts: Vec<StorageLayout>,
    pub downloads_dir: PathBuf,
    pub concurrency: usize,
    pub request_timeout: Duration,
    pub request_delay: Duration,
    pub user_agent: Option<String>,
}
