//! lc0acquire - Lc0 match archive acquisition and normalization.
//!
//! Discovers matches from the paginated listing, mirrors their PGN payloads
//! with retry bookkeeping in SQLite, and folds the games into monthly
//! aggregate files with canonical participant labels.

pub mod cli;
pub mod config;
pub mod migrations;
pub mod models;
pub mod repository;
pub mod schema;
pub mod scrapers;
pub mod services;
pub mod shutdown;
pub mod storage;
