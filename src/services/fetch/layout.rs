//! Storage layout strategies for match payloads.
//!
//! The origin has moved files between directory schemes over time, so an
//! entry's location is guessed by trying an ordered list of layouts.

use serde::{Deserialize, Serialize};
use url::Url;

/// Payload format a layout points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PayloadKind {
    /// `match_<id>.pgn.tar.gz`
    Archive,
    /// `match_<id>.pgn`
    Plain,
}

impl PayloadKind {
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Archive => ".pgn.tar.gz",
            Self::Plain => ".pgn",
        }
    }
}

/// One guess at where the origin keeps a match file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageLayout {
    /// Sub-directory under the storage root, such as a training run id.
    pub directory: Option<String>,
    pub kind: PayloadKind,
}

impl StorageLayout {
    pub fn new(directory: Option<&str>, kind: PayloadKind) -> Self {
        Self {
            directory: directory.map(|d| d.trim_matches('/').to_string()),
            kind,
        }
    }

    /// Path of the file relative to the storage root.
    pub fn relative_path(&self, id: i64) -> String {
        let file = format!("match_{}{}", id, self.kind.extension());
        match &self.directory {
            Some(dir) if !dir.is_empty() => format!("{}/{}", dir, file),
            _ => file,
        }
    }
}

/// A concrete URL to try for one entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub url: Url,
    pub kind: PayloadKind,
}

/// Default order: per run id the archive then the plain file, then both
/// without a run directory.
pub fn default_layouts(run_ids: &[String]) -> Vec<StorageLayout> {
    let mut layouts = Vec::with_capacity(run_ids.len() * 2 + 2);
    for run in run_ids {
        layouts.push(StorageLayout::new(Some(run), PayloadKind::Archive));
        layouts.push(StorageLayout::new(Some(run), PayloadKind::Plain));
    }
    layouts.push(StorageLayout::new(None, PayloadKind::Archive));
    layouts.push(StorageLayout::new(None, PayloadKind::Plain));
    layouts
}

/// Parse the storage root, making sure relative joins land inside it.
pub fn storage_root(storage_url: &str) -> Result<Url, url::ParseError> {
    if storage_url.ends_with('/') {
        Url::parse(storage_url)
    } else {
        Url::parse(&format!("{}/", storage_url))
    }
}

/// Candidate URLs for an entry, in the order they must be tried.
pub fn candidates(root: &Url, layouts: &[StorageLayout], id: i64) -> Vec<Candidate> {
    layouts
        .iter()
        .filter_map(|layout| {
            root.join(&layout.relative_path(id))
                .ok()
                .map(|url| Candidate {
                    url,
                    kind: layout.kind,
                })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_candidate_order() {
        let root = storage_root("https://storage.lczero.org/files/match_pgns").unwrap();
        let layouts = default_layouts(&["1".to_string()]);
        let urls: Vec<String> = candidates(&root, &layouts, 42)
            .into_iter()
            .map(|c| c.url.to_string())
            .collect();
        assert_eq!(
            urls,
            vec![
                "https://storage.lczero.org/files/match_pgns/1/match_42.pgn.tar.gz",
                "https://storage.lczero.org/files/match_pgns/1/match_42.pgn",
                "https://storage.lczero.org/files/match_pgns/match_42.pgn.tar.gz",
                "https://storage.lczero.org/files/match_pgns/match_42.pgn",
            ]
        );
    }

    #[test]
    fn test_multiple_runs_are_tried_in_order() {
        let layouts = default_layouts(&["2".to_string(), "/1/".to_string()]);
        assert_eq!(layouts.len(), 6);
        assert_eq!(layouts[0].relative_path(7), "2/match_7.pgn.tar.gz");
        assert_eq!(layouts[3].relative_path(7), "1/match_7.pgn");
        assert_eq!(layouts[4].relative_path(7), "match_7.pgn.tar.gz");
    }
}
