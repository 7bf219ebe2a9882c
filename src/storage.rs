//! On-disk layout for downloaded artifacts and monthly aggregates.
//!
//! Every path is derived from entry data alone, so no index is needed to
//! find a file:
//!
//! - `{downloads_dir}/{source_filename}`
//! - `{processed_dir}/{YYYY}/{MM}/{prefix}_{YYYY}_{MM}.pgn`

use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{Datelike, NaiveDate};
use sha2::{Digest, Sha256};
use tempfile::NamedTempFile;
use tokio::io::AsyncWriteExt;

/// Where a downloaded artifact lives.
pub fn download_path(downloads_dir: &Path, source_filename: &str) -> PathBuf {
    downloads_dir.join(source_filename)
}

/// Monthly aggregate file for a match date.
pub fn aggregate_path(processed_dir: &Path, prefix: &str, date: NaiveDate) -> PathBuf {
    processed_dir
        .join(format!("{:04}", date.year()))
        .join(format!("{:02}", date.month()))
        .join(format!(
            "{}_{:04}_{:02}.pgn",
            prefix,
            date.year(),
            date.month()
        ))
}

/// Hex SHA-256 of a payload.
pub fn content_hash(content: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content);
    hex::encode(hasher.finalize())
}

/// Write `content` to `path` so readers see either nothing or the whole file.
///
/// The bytes go to a temporary file in the destination directory, are synced,
/// then renamed over `path`. A failure at any point leaves no file behind.
pub async fn publish_atomic(path: &Path, content: Vec<u8>) -> std::io::Result<u64> {
    let path = path.to_path_buf();
    tokio::task::spawn_blocking(move || {
        let dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        std::fs::create_dir_all(&dir)?;

        let mut tmp = NamedTempFile::new_in(&dir)?;
        tmp.write_all(&content)?;
        tmp.as_file().sync_all()?;
        tmp.persist(&path).map_err(|e| e.error)?;

        Ok(content.len() as u64)
    })
    .await
    .map_err(std::io::Error::other)?
}

/// Append one normalized unit followed by a blank-line separator.
///
/// Creates the file and its year/month directories on first write.
pub async fn append_unit(path: &Path, unit: &str) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    let mut file = tokio::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await?;

    let mut record = String::with_capacity(unit.len() + 2);
    record.push_str(unit.trim_end_matches(['\r', '\n']));
    record.push_str("\n\n");
    file.write_all(record.as_bytes()).await?;
    file.flush().await?;
    Ok(())
}
