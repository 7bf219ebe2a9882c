//! Repository layer for database persistence.
//!
//! All database access uses Diesel ORM with compile-time query checking
//! against a bundled SQLite database.

pub mod context;
pub mod entry;
pub mod migrations;
pub mod models;
pub mod pool;
pub mod util;

pub use context::DbContext;
pub use entry::EntryRepository;
pub use pool::{DbError, SqliteConn, SqlitePool};
pub use util::parse_datetime;
