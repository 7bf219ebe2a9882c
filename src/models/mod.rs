//! Data models for lc0acquire.

mod entry;
mod label;

pub use entry::{
    parse_occurred_at, source_filename_for, AttemptOutcome, AuditEntry, CatalogEntry,
    FetchStatus, MonthSummary, StoreStats, TrackedEntry,
};
pub use label::{LabelTable, LabelThreshold};
