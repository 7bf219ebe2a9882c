//! Database context for managing connections and repository access.
//!
//! The DbContext is the primary entry point for all database operations.
//! It holds the connection factory and hands out repositories.

use std::path::Path;

use super::entry::EntryRepository;
use super::migrations::run_migrations;
use super::pool::{DbError, SqlitePool};

/// Database context that owns the connection factory and provides repository access.
///
/// # Example
/// ```ignore
/// let ctx = DbContext::new(&settings.database_path(), settings.max_attempts);
/// ctx.init_schema().await?;
/// let pending = ctx.entries().list_pending(None).await?;
/// ```
#[derive(Clone)]
pub struct DbContext {
    pool: SqlitePool,
    max_attempts: u32,
}

impl DbContext {
    /// Create a context from a database file path.
    pub fn new(db_path: &Path, max_attempts: u32) -> Self {
        Self {
            pool: SqlitePool::from_path(db_path),
            max_attempts,
        }
    }

    /// Get the catalog entry repository.
    pub fn entries(&self) -> EntryRepository {
        EntryRepository::new(self.pool.clone(), self.max_attempts)
    }

    /// Create or upgrade the schema.
    pub async fn init_schema(&self) -> Result<(), DbError> {
        run_migrations(self.pool.database_url()).await?;
        Ok(())
    }
}
