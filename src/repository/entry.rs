//! Diesel-based catalog entry repository for SQLite.
//!
//! This is the single source of truth for what has been discovered, fetched
//! and normalized. Every mutation runs in its own transaction so a crash
//! leaves either the full change or none of it.

use std::collections::BTreeMap;

use chrono::Utc;
use diesel::prelude::*;
use diesel_async::{AsyncConnection, RunQueryDsl};

use super::models::{AuditRecord, EntryRecord, NewAuditRecord, NewEntry};
use super::pool::{DbError, SqlitePool};
use crate::models::{
    parse_occurred_at, AttemptOutcome, AuditEntry, CatalogEntry, FetchStatus, MonthSummary,
    StoreStats, TrackedEntry,
};
use crate::schema::{audit_log, entries};

/// Diesel-based catalog entry repository.
#[derive(Clone)]
pub struct EntryRepository {
    pool: SqlitePool,
    max_attempts: u32,
}

impl EntryRepository {
    /// Create a new repository with an existing pool.
    pub fn new(pool: SqlitePool, max_attempts: u32) -> Self {
        Self { pool, max_attempts }
    }

    /// Attempt ceiling applied by `list_pending` and `record_attempt`.
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Insert newly discovered entries, skipping ids that already exist.
    ///
    /// Existing rows are never overwritten, so their status and attempts
    /// survive re-discovery. Returns the number of rows actually inserted.
    pub async fn insert_many(&self, batch: &[CatalogEntry]) -> Result<usize, DbError> {
        if batch.is_empty() {
            return Ok(0);
        }

        let mut conn = self.pool.get().await?;
        let now = Utc::now().to_rfc3339();
        let records: Vec<NewEntry> = batch.iter().map(|e| NewEntry::pending(e, &now)).collect();

        conn.transaction(|conn| {
            Box::pin(async move {
                let mut inserted = 0;
                for record in &records {
                    inserted += diesel::insert_or_ignore_into(entries::table)
                        .values(record)
                        .execute(conn)
                        .await?;
                }
                Ok(inserted)
            })
        })
        .await
    }

    /// Entries eligible for another fetch attempt, most recent first.
    pub async fn list_pending(&self, limit: Option<usize>) -> Result<Vec<CatalogEntry>, DbError> {
        let mut conn = self.pool.get().await?;

        let mut query = entries::table
            .filter(entries::status.eq_any(vec![
                FetchStatus::Pending.as_str(),
                FetchStatus::Retry.as_str(),
            ]))
            .filter(entries::attempts.lt(self.max_attempts as i32))
            .order((entries::occurred_at.desc(), entries::id.desc()))
            .into_boxed();

        if let Some(limit) = limit {
            query = query.limit(limit as i64);
        }

        query
            .load::<EntryRecord>(&mut conn)
            .await
            .map(|records| records.into_iter().map(CatalogEntry::from).collect())
    }

    /// Record one fetch attempt and return the status it resolved to.
    ///
    /// The attempt counter is incremented first so the write lock is taken
    /// before the new count is read back; status and audit row follow in the
    /// same transaction.
    pub async fn record_attempt(
        &self,
        id: i64,
        outcome: AttemptOutcome,
        message: &str,
    ) -> Result<FetchStatus, DbError> {
        let mut conn = self.pool.get().await?;
        let message = message.to_string();
        let max_attempts = self.max_attempts;

        conn.transaction(|conn| {
            Box::pin(async move {
                let updated = diesel::update(entries::table.find(id))
                    .set(entries::attempts.eq(entries::attempts + 1))
                    .execute(conn)
                    .await?;
                if updated == 0 {
                    return Err(DbError::NotFound);
                }

                let attempts: i32 = entries::table
                    .find(id)
                    .select(entries::attempts)
                    .first(conn)
                    .await?;
                let status = outcome.resolve(attempts.max(0) as u32, max_attempts);

                diesel::update(entries::table.find(id))
                    .set(entries::status.eq(status.as_str()))
                    .execute(conn)
                    .await?;

                let now = Utc::now().to_rfc3339();
                diesel::insert_into(audit_log::table)
                    .values(NewAuditRecord {
                        entry_id: id,
                        status: status.as_str(),
                        message: &message,
                        logged_at: &now,
                    })
                    .execute(conn)
                    .await?;

                Ok(status)
            })
        })
        .await
    }

    /// Flag a downloaded entry as normalized.
    ///
    /// Only rows with `success` status are touched. Returns whether the entry
    /// is processed after the call.
    pub async fn mark_processed(&self, id: i64) -> Result<bool, DbError> {
        let mut conn = self.pool.get().await?;

        diesel::update(
            entries::table
                .filter(entries::id.eq(id))
                .filter(entries::status.eq(FetchStatus::Success.as_str())),
        )
        .set(entries::processed.eq(true))
        .execute(&mut conn)
        .await?;

        let processed = entries::table
            .find(id)
            .select(entries::processed)
            .first::<bool>(&mut conn)
            .await
            .optional()?;

        Ok(processed.unwrap_or(false))
    }

    /// Counts by status and processed flag.
    pub async fn stats(&self) -> Result<StoreStats, DbError> {
        use diesel::dsl::count_star;
        let mut conn = self.pool.get().await?;

        let rows: Vec<(String, i64)> = entries::table
            .group_by(entries::status)
            .select((entries::status, count_star()))
            .load(&mut conn)
            .await?;

        let processed: i64 = entries::table
            .filter(entries::processed.eq(true))
            .select(count_star())
            .first(&mut conn)
            .await?;

        let mut stats = StoreStats::default();
        for (status, count) in rows {
            match FetchStatus::from_str(&status) {
                Some(status) => stats.add(status, count.max(0) as u64),
                None => stats.total += count.max(0) as u64,
            }
        }
        stats.processed = processed.max(0) as u64;

        Ok(stats)
    }

    /// Downloaded entries awaiting normalization, oldest first.
    pub async fn list_unprocessed(&self) -> Result<Vec<CatalogEntry>, DbError> {
        let mut conn = self.pool.get().await?;

        entries::table
            .filter(entries::status.eq(FetchStatus::Success.as_str()))
            .filter(entries::processed.eq(false))
            .order((entries::occurred_at.asc(), entries::id.asc()))
            .load::<EntryRecord>(&mut conn)
            .await
            .map(|records| records.into_iter().map(CatalogEntry::from).collect())
    }

    /// Get an entry by id.
    pub async fn get(&self, id: i64) -> Result<Option<TrackedEntry>, DbError> {
        let mut conn = self.pool.get().await?;

        entries::table
            .find(id)
            .first::<EntryRecord>(&mut conn)
            .await
            .optional()
            .map(|opt| opt.map(TrackedEntry::from))
    }

    /// Entries whose scraped timestamp contains `fragment`, oldest first.
    pub async fn find_by_date(&self, fragment: &str) -> Result<Vec<TrackedEntry>, DbError> {
        let mut conn = self.pool.get().await?;
        let pattern = format!("%{}%", fragment);

        entries::table
            .filter(entries::occurred_at.like(pattern))
            .order((entries::occurred_at.asc(), entries::id.asc()))
            .load::<EntryRecord>(&mut conn)
            .await
            .map(|records| records.into_iter().map(TrackedEntry::from).collect())
    }

    /// Full audit history of one entry, in write order.
    pub async fn audit_log_for(&self, id: i64) -> Result<Vec<AuditEntry>, DbError> {
        let mut conn = self.pool.get().await?;

        audit_log::table
            .filter(audit_log::entry_id.eq(id))
            .order(audit_log::id.asc())
            .load::<AuditRecord>(&mut conn)
            .await
            .map(|records| records.into_iter().map(AuditEntry::from).collect())
    }

    /// Most recent failed or retried attempts across all entries.
    pub async fn recent_failures(&self, limit: usize) -> Result<Vec<AuditEntry>, DbError> {
        let mut conn = self.pool.get().await?;

        audit_log::table
            .filter(audit_log::status.eq_any(vec![
                FetchStatus::Retry.as_str(),
                FetchStatus::Failed.as_str(),
            ]))
            .order(audit_log::id.desc())
            .limit(limit as i64)
            .load::<AuditRecord>(&mut conn)
            .await
            .map(|records| records.into_iter().map(AuditEntry::from).collect())
    }

    /// Earliest and latest scraped timestamps, if any entries exist.
    pub async fn date_range(&self) -> Result<Option<(String, String)>, DbError> {
        use diesel::dsl::{max, min};
        let mut conn = self.pool.get().await?;

        let (earliest, latest): (Option<String>, Option<String>) = entries::table
            .select((min(entries::occurred_at), max(entries::occurred_at)))
            .first(&mut conn)
            .await?;

        Ok(earliest.zip(latest))
    }

    /// Per-month totals, in chronological order.
    ///
    /// Rows whose timestamp does not parse are bucketed by their first seven
    /// characters so they still show up in reports.
    pub async fn month_breakdown(&self) -> Result<Vec<MonthSummary>, DbError> {
        let mut conn = self.pool.get().await?;

        let rows: Vec<(String, String, bool)> = entries::table
            .select((entries::occurred_at, entries::status, entries::processed))
            .load(&mut conn)
            .await?;

        let mut months: BTreeMap<String, MonthSummary> = BTreeMap::new();
        for (occurred_at, status, processed) in rows {
            let month = match parse_occurred_at(&occurred_at) {
                Some(date) => date.format("%Y-%m").to_string(),
                None => occurred_at.chars().take(7).collect(),
            };
            let summary = months.entry(month.clone()).or_insert_with(|| MonthSummary {
                month,
                ..Default::default()
            });
            summary.total += 1;
            if status == FetchStatus::Success.as_str() {
                summary.downloaded += 1;
            }
            if processed {
                summary.processed += 1;
            }
        }

        Ok(months.into_values().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::migrations::run_migrations;
    use tempfile::tempdir;

    async fn setup_repo(max_attempts: u32) -> (EntryRepository, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_url = dir.path().join("test.db").display().to_string();
        run_migrations(&db_url).await.unwrap();
        (
            EntryRepository::new(SqlitePool::new(&db_url), max_attempts),
            dir,
        )
    }

    #[tokio::test]
    async fn test_record_attempt_writes_audit_row() {
        let (repo, _dir) = setup_repo(3).await;
        repo.insert_many(&[CatalogEntry::new(1, "2021-01-01")])
            .await
            .unwrap();

        let status = repo
            .record_attempt(1, AttemptOutcome::Success, "saved 10 bytes")
            .await
            .unwrap();
        assert_eq!(status, FetchStatus::Success);

        let entry = repo.get(1).await.unwrap().unwrap();
        assert_eq!(entry.status, FetchStatus::Success);
        assert_eq!(entry.attempts, 1);

        let audit = repo.audit_log_for(1).await.unwrap();
        assert_eq!(audit.len(), 1);
        assert_eq!(audit[0].status, FetchStatus::Success);
        assert_eq!(audit[0].message, "saved 10 bytes");
    }

    #[tokio::test]
    async fn test_record_attempt_unknown_id() {
        let (repo, _dir) = setup_repo(3).await;
        let err = repo
            .record_attempt(99, AttemptOutcome::Failure, "nope")
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::NotFound));
        assert!(repo.audit_log_for(99).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_mark_processed_requires_success() {
        let (repo, _dir) = setup_repo(3).await;
        repo.insert_many(&[
            CatalogEntry::new(1, "2021-01-01"),
            CatalogEntry::new(2, "2021-01-02"),
        ])
        .await
        .unwrap();
        repo.record_attempt(1, AttemptOutcome::Success, "ok")
            .await
            .unwrap();

        assert!(!repo.mark_processed(2).await.unwrap());
        assert!(repo.mark_processed(1).await.unwrap());
        // Second call is a no-op.
        assert!(repo.mark_processed(1).await.unwrap());

        let stats = repo.stats().await.unwrap();
        assert_eq!(stats.total, 2);
        assert_eq!(stats.success, 1);
        assert_eq!(stats.pending, 1);
        assert_eq!(stats.processed, 1);
    }

    #[tokio::test]
    async fn test_list_unprocessed_oldest_first() {
        let (repo, _dir) = setup_repo(3).await;
        repo.insert_many(&[
            CatalogEntry::new(1, "2021-05-01"),
            CatalogEntry::new(2, "2020-01-01"),
            CatalogEntry::new(3, "2022-01-01"),
        ])
        .await
        .unwrap();
        for id in [1, 2, 3] {
            repo.record_attempt(id, AttemptOutcome::Success, "ok")
                .await
                .unwrap();
        }
        repo.mark_processed(3).await.unwrap();

        let ids: Vec<i64> = repo
            .list_unprocessed()
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.id)
            .collect();
        assert_eq!(ids, vec![2, 1]);
    }

    #[tokio::test]
    async fn test_reporting_queries() {
        let (repo, _dir) = setup_repo(1).await;
        repo.insert_many(&[
            CatalogEntry::new(1, "2021-03-15 10:00:00"),
            CatalogEntry::new(2, "2021-03-20 10:00:00"),
            CatalogEntry::new(3, "2021-04-01 10:00:00"),
        ])
        .await
        .unwrap();
        repo.record_attempt(1, AttemptOutcome::Success, "ok")
            .await
            .unwrap();
        repo.record_attempt(3, AttemptOutcome::Failure, "gone")
            .await
            .unwrap();

        let (earliest, latest) = repo.date_range().await.unwrap().unwrap();
        assert!(earliest.starts_with("2021-03-15"));
        assert!(latest.starts_with("2021-04-01"));

        let march = repo.find_by_date("2021-03").await.unwrap();
        assert_eq!(march.len(), 2);

        let months = repo.month_breakdown().await.unwrap();
        assert_eq!(months.len(), 2);
        assert_eq!(months[0].month, "2021-03");
        assert_eq!(months[0].total, 2);
        assert_eq!(months[0].downloaded, 1);
        assert_eq!(months[1].month, "2021-04");

        let failures = repo.recent_failures(10).await.unwrap();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].entry_id, 3);
        assert_eq!(failures[0].status, FetchStatus::Failed);
    }

    #[tokio::test]
    async fn test_empty_store() {
        let (repo, _dir) = setup_repo(3).await;
        assert_eq!(repo.insert_many(&[]).await.unwrap(), 0);
        assert!(repo.date_range().await.unwrap().is_none());
        assert!(repo.get(1).await.unwrap().is_none());
        assert_eq!(repo.stats().await.unwrap(), StoreStats::default());
    }
}
