//! Catalog entry models for match acquisition.
//!
//! One entry exists per match discovered on the listing pages. Its fetch
//! status moves through a small state machine that the store resolves
//! transactionally on every attempt.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// Derive the container filename the archive stores a match under.
pub fn source_filename_for(id: i64) -> String {
    format!("match_{}.pgn.tar.gz", id)
}

/// One discoverable match on the remote archive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    /// Origin-assigned match id.
    pub id: i64,
    /// Timestamp text exactly as scraped from the listing.
    pub occurred_at: String,
    /// Expected container filename, derived from `id`.
    pub source_filename: String,
}

impl CatalogEntry {
    /// Create an entry, deriving the container filename from the id.
    pub fn new(id: i64, occurred_at: impl Into<String>) -> Self {
        Self {
            id,
            occurred_at: occurred_at.into(),
            source_filename: source_filename_for(id),
        }
    }

    /// Calendar date of the match, if the scraped timestamp parses.
    pub fn occurred_date(&self) -> Option<NaiveDate> {
        parse_occurred_at(&self.occurred_at)
    }
}

/// Parse the leading date of a scraped timestamp.
///
/// Only the first whitespace-separated token is considered. Accepts plain
/// `YYYY-MM-DD`, RFC 3339, and naive `YYYY-MM-DDTHH:MM:SS[.f]`.
pub fn parse_occurred_at(raw: &str) -> Option<NaiveDate> {
    let token = raw.split_whitespace().next()?;

    if let Ok(date) = NaiveDate::parse_from_str(token, "%Y-%m-%d") {
        return Some(date);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(token) {
        return Some(dt.date_naive());
    }
    NaiveDateTime::parse_from_str(token, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|dt| dt.date())
}

/// Download state of a catalog entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchStatus {
    Pending,
    Retry,
    Success,
    Failed,
}

impl FetchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Retry => "retry",
            Self::Success => "success",
            Self::Failed => "failed",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "retry" => Some(Self::Retry),
            "success" => Some(Self::Success),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

/// Result of a single fetch attempt, before the store resolves it to a status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptOutcome {
    Success,
    Failure,
}

impl AttemptOutcome {
    /// Resolve the status an entry lands in after `attempts` total attempts.
    ///
    /// A failure only becomes terminal once the attempt ceiling is reached.
    pub fn resolve(self, attempts: u32, max_attempts: u32) -> FetchStatus {
        match self {
            Self::Success => FetchStatus::Success,
            Self::Failure if attempts >= max_attempts => FetchStatus::Failed,
            Self::Failure => FetchStatus::Retry,
        }
    }
}

/// A catalog entry together with its fetch bookkeeping.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackedEntry {
    pub entry: CatalogEntry,
    pub status: FetchStatus,
    pub attempts: u32,
    pub processed: bool,
    pub created_at: DateTime<Utc>,
}

/// Append-only record of a status transition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: i64,
    pub entry_id: i64,
    pub status: FetchStatus,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

/// Counts by status and processed flag.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreStats {
    pub total: u64,
    pub pending: u64,
    pub retry: u64,
    pub success: u64,
    pub failed: u64,
    pub processed: u64,
}

impl StoreStats {
    /// Add `count` rows with the given status.
    pub fn add(&mut self, status: FetchStatus, count: u64) {
        self.total += count;
        match status {
            FetchStatus::Pending => self.pending += count,
            FetchStatus::Retry => self.retry += count,
            FetchStatus::Success => self.success += count,
            FetchStatus::Failed => self.failed += count,
        }
    }
}

/// Per-month rollup used by reporting.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthSummary {
    /// `YYYY-MM`, or the raw prefix when the date does not parse.
    pub month: String,
    pub total: u64,
    pub downloaded: u64,
    pub processed: u64,
}
