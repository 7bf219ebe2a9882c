//! Diesel ORM models for database tables.
//!
//! These models provide compile-time type checking for database operations.

use diesel::prelude::*;

use super::util::parse_datetime;
use crate::models::{AuditEntry, CatalogEntry, FetchStatus, TrackedEntry};
use crate::schema;

/// Entry record from the database.
#[derive(Queryable, Selectable, Identifiable, Debug, Clone)]
#[diesel(table_name = schema::entries)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct EntryRecord {
    pub id: i64,
    pub occurred_at: String,
    pub source_filename: String,
    pub status: String,
    pub attempts: i32,
    pub processed: bool,
    pub created_at: String,
}

/// New entry for insertion.
#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = schema::entries)]
pub struct NewEntry {
    pub id: i64,
    pub occurred_at: String,
    pub source_filename: String,
    pub status: String,
    pub attempts: i32,
    pub processed: bool,
    pub created_at: String,
}

impl NewEntry {
    /// A freshly discovered entry: pending, never attempted.
    pub fn pending(entry: &CatalogEntry, created_at: &str) -> Self {
        Self {
            id: entry.id,
            occurred_at: entry.occurred_at.clone(),
            source_filename: entry.source_filename.clone(),
            status: FetchStatus::Pending.as_str().to_string(),
            attempts: 0,
            processed: false,
            created_at: created_at.to_string(),
        }
    }
}

/// Audit log record from the database.
#[derive(Queryable, Selectable, Identifiable, Debug, Clone)]
#[diesel(table_name = schema::audit_log)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct AuditRecord {
    pub id: i32,
    pub entry_id: i64,
    pub status: String,
    pub message: String,
    pub logged_at: String,
}

/// New audit row for insertion.
#[derive(Insertable, Debug)]
#[diesel(table_name = schema::audit_log)]
pub struct NewAuditRecord<'a> {
    pub entry_id: i64,
    pub status: &'a str,
    pub message: &'a str,
    pub logged_at: &'a str,
}

impl From<EntryRecord> for CatalogEntry {
    fn from(record: EntryRecord) -> Self {
        CatalogEntry {
            id: record.id,
            occurred_at: record.occurred_at,
            source_filename: record.source_filename,
        }
    }
}

impl From<EntryRecord> for TrackedEntry {
    fn from(record: EntryRecord) -> Self {
        TrackedEntry {
            status: FetchStatus::from_str(&record.status).unwrap_or(FetchStatus::Pending),
            attempts: record.attempts.max(0) as u32,
            processed: record.processed,
            created_at: parse_datetime(&record.created_at),
            entry: CatalogEntry {
                id: record.id,
                occurred_at: record.occurred_at,
                source_filename: record.source_filename,
            },
        }
    }
}

impl From<AuditRecord> for AuditEntry {
    fn from(record: AuditRecord) -> Self {
        AuditEntry {
            id: record.id as i64,
            entry_id: record.entry_id,
            status: FetchStatus::from_str(&record.status).unwrap_or(FetchStatus::Pending),
            message: record.message,
            timestamp: parse_datetime(&record.logged_at),
        }
    }
}
