//! Configuration management for lc0acquire using the prefer crate.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::models::{LabelTable, LabelThreshold};
use crate::scrapers::ScrapeConfig;
use crate::services::fetch::default_layouts;
use crate::services::{FetchConfig, NormalizeConfig};

/// Default database filename.
pub const DEFAULT_DATABASE_FILENAME: &str = "lc0_matches.db";

/// Default catalog export filename.
pub const DEFAULT_CSV_FILENAME: &str = "lc0_matches_full.csv";

/// Default prefix of monthly aggregate files.
pub const DEFAULT_AGGREGATE_PREFIX: &str = "lc0_matches";

const DOWNLOADS_SUBDIR: &str = "downloads";
const PROCESSED_SUBDIR: &str = "processed";

/// Application settings.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Base data directory.
    pub data_dir: PathBuf,
    /// Database filename, relative to `data_dir`.
    pub database_filename: String,
    /// Catalog export filename, relative to `data_dir`.
    pub csv_filename: String,
    /// Where accepted payloads are saved.
    pub downloads_dir: PathBuf,
    /// Where monthly aggregates are written.
    pub processed_dir: PathBuf,
    /// First listing page; page parameters are appended.
    pub listing_url: String,
    /// Root the storage layouts are resolved against.
    pub storage_url: String,
    /// Listing pages walked by a scrape.
    pub page_count: u32,
    pub scrape_concurrency: usize,
    pub fetch_concurrency: usize,
    /// Attempts before an entry is marked failed.
    pub max_attempts: u32,
    /// Listing request timeout in seconds.
    pub scrape_timeout: u64,
    /// Payload request timeout in seconds.
    pub fetch_timeout: u64,
    /// Delay between requests in milliseconds.
    pub request_delay_ms: u64,
    /// User agent for HTTP requests. `None` uses the crate default.
    pub user_agent: Option<String>,
    /// Training run directories tried before the flat layout.
    pub run_ids: Vec<String>,
    pub aggregate_prefix: String,
    pub labels: LabelTable,
}

impl Default for Settings {
    fn default() -> Self {
        // Falls back gracefully: Documents dir -> Home dir -> Current dir
        let data_dir = dirs::document_dir()
            .or_else(dirs::home_dir)
            .unwrap_or_else(|| PathBuf::from("."))
            .join("lc0_matches");

        Self {
            downloads_dir: data_dir.join(DOWNLOADS_SUBDIR),
            processed_dir: data_dir.join(PROCESSED_SUBDIR),
            data_dir,
            database_filename: DEFAULT_DATABASE_FILENAME.to_string(),
            csv_filename: DEFAULT_CSV_FILENAME.to_string(),
            listing_url: "https://training.lczero.org/matches/".to_string(),
            storage_url: "https://storage.lczero.org/files/match_pgns/".to_string(),
            page_count: 2440,
            scrape_concurrency: 25,
            fetch_concurrency: 10,
            max_attempts: 3,
            scrape_timeout: 30,
            fetch_timeout: 60,
            request_delay_ms: 0,
            user_agent: None,
            run_ids: vec!["1".to_string()],
            aggregate_prefix: DEFAULT_AGGREGATE_PREFIX.to_string(),
            labels: LabelTable::default(),
        }
    }
}

impl Settings {
    /// Create settings with a custom data directory.
    pub fn with_data_dir(data_dir: PathBuf) -> Self {
        let mut settings = Self::default();
        settings.set_data_dir(data_dir);
        settings
    }

    /// Move the data directory, keeping the artifact directories inside it.
    pub fn set_data_dir(&mut self, data_dir: PathBuf) {
        self.downloads_dir = data_dir.join(DOWNLOADS_SUBDIR);
        self.processed_dir = data_dir.join(PROCESSED_SUBDIR);
        self.data_dir = data_dir;
    }

    /// Get the full path to the database.
    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join(&self.database_filename)
    }

    /// Get the full path to the catalog export.
    pub fn csv_path(&self) -> PathBuf {
        self.data_dir.join(&self.csv_filename)
    }

    /// Check if the database appears to be initialized.
    pub fn database_exists(&self) -> bool {
        self.database_path().exists()
    }

    /// Ensure all directories exist.
    pub fn ensure_directories(&self) -> std::io::Result<()> {
        for (label, dir) in [
            ("data", &self.data_dir),
            ("downloads", &self.downloads_dir),
            ("processed", &self.processed_dir),
        ] {
            fs::create_dir_all(dir).map_err(|e| {
                std::io::Error::new(
                    e.kind(),
                    format!(
                        "Failed to create {} directory '{}': {}",
                        label,
                        dir.display(),
                        e
                    ),
                )
            })?;
        }
        Ok(())
    }

    pub fn scrape_config(&self) -> ScrapeConfig {
        ScrapeConfig {
            listing_url: self.listing_url.clone(),
            page_count: self.page_count,
            concurrency: self.scrape_concurrency,
            request_timeout: Duration::from_secs(self.scrape_timeout),
            request_delay: Duration::from_millis(self.request_delay_ms),
            user_agent: self.user_agent.clone(),
        }
    }

    pub fn fetch_config(&self) -> FetchConfig {
        FetchConfig {
            storage_url: self.storage_url.clone(),
            layouts: default_layouts(&self.run_ids),
            downloads_dir: self.downloads_dir.clone(),
            concurrency: self.fetch_concurrency,
            request_timeout: Duration::from_secs(self.fetch_timeout),
            request_delay: Duration::from_millis(self.request_delay_ms),
            user_agent: self.user_agent.clone(),
        }
    }

    pub fn normalize_config(&self) -> NormalizeConfig {
        NormalizeConfig {
            downloads_dir: self.downloads_dir.clone(),
            processed_dir: self.processed_dir.clone(),
            aggregate_prefix: self.aggregate_prefix.clone(),
            labels: self.labels.clone(),
        }
    }
}

/// One row of the label table as written in a config file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, prefer::FromValue)]
pub struct LabelConfig {
    /// First day the version applies, `YYYY-MM-DD`.
    pub since: String,
    pub version: String,
}

/// Configuration file structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize, prefer::FromValue)]
pub struct Config {
    /// Data directory path.
    #[serde(default, skip_serializing_if = "Option::is_none", alias = "target")]
    pub data_dir: Option<String>,
    /// Database filename.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,
    /// Catalog export filename.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub csv: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub listing_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[prefer(default)]
    pub page_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[prefer(default)]
    pub scrape_concurrency: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[prefer(default)]
    pub fetch_concurrency: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[prefer(default)]
    pub max_attempts: Option<u32>,
    /// Listing request timeout in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scrape_timeout: Option<u64>,
    /// Payload request timeout in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fetch_timeout: Option<u64>,
    /// Delay between requests in milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_delay_ms: Option<u64>,
    /// User agent string, or `"impersonate"` for a browser UA.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    /// Training run directories, tried in order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    #[prefer(default)]
    pub run_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aggregate_prefix: Option<String>,
    /// Replaces the built-in label table when non-empty.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    #[prefer(default)]
    pub labels: Vec<LabelConfig>,
    /// Label for dates older than every threshold.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback_label: Option<String>,
    /// Path to the config file this was loaded from (not serialized).
    #[serde(skip)]
    #[prefer(skip)]
    pub source_path: Option<PathBuf>,
}

impl Config {
    /// Load configuration using prefer crate for discovery.
    /// Automatically discovers lc0acquire config files in standard locations.
    pub async fn load() -> Self {
        // Use prefer for file discovery, then parse with serde
        match prefer::load("lc0acquire").await {
            Ok(pref_config) => match pref_config.source_path() {
                Some(path) => Self::load_from_path(path).await.unwrap_or_else(|e| {
                    tracing::warn!("{}; using defaults", e);
                    Self::default()
                }),
                None => Self::default(),
            },
            // No config file found
            Err(_) => Self::default(),
        }
    }

    /// Load configuration from a specific file path.
    /// Supports JSON, TOML and YAML based on file extension.
    pub async fn load_from_path(path: &Path) -> Result<Self, String> {
        let contents = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| format!("Failed to read config file: {}", e))?;

        let mut config = Self::parse(&contents, path)?;
        config.source_path = Some(path.to_path_buf());
        Ok(config)
    }

    fn parse(contents: &str, path: &Path) -> Result<Self, String> {
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("json");
        match ext {
            "toml" => {
                toml::from_str(contents).map_err(|e| format!("Failed to parse TOML config: {}", e))
            }
            "yaml" | "yml" => serde_yaml::from_str(contents)
                .map_err(|e| format!("Failed to parse YAML config: {}", e)),
            _ => serde_json::from_str(contents)
                .map_err(|e| format!("Failed to parse JSON config: {}", e)),
        }
    }

    /// Get the base directory for resolving relative paths.
    pub fn base_dir(&self) -> Option<PathBuf> {
        self.source_path
            .as_ref()
            .and_then(|p| p.parent().map(|p| p.to_path_buf()))
    }

    /// Resolve a path that may be relative to the config file.
    /// - Absolute paths are returned as-is
    /// - Paths starting with ~ are expanded
    /// - Relative paths are resolved relative to `base_dir`
    pub fn resolve_path(&self, path_str: &str, base_dir: &Path) -> PathBuf {
        let expanded = shellexpand::tilde(path_str);
        let path = Path::new(expanded.as_ref());
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            base_dir.join(path)
        }
    }

    /// Build the label table, if the file defines one.
    ///
    /// Rows with an unparseable date are skipped with a warning.
    pub fn label_table(&self) -> Option<LabelTable> {
        if self.labels.is_empty() {
            return None;
        }

        let thresholds = self
            .labels
            .iter()
            .filter_map(|row| match NaiveDate::parse_from_str(&row.since, "%Y-%m-%d") {
                Ok(since) => Some(LabelThreshold {
                    since,
                    version: row.version.clone(),
                }),
                Err(e) => {
                    tracing::warn!("Ignoring label row {:?}: {}", row.since, e);
                    None
                }
            })
            .collect();

        let fallback = self
            .fallback_label
            .clone()
            .unwrap_or_else(|| LabelTable::default().fallback().to_string());
        Some(LabelTable::new(thresholds, fallback))
    }

    /// Apply configuration to settings.
    /// `base_dir` is used to resolve relative paths (typically config file dir or CWD).
    pub fn apply_to_settings(&self, settings: &mut Settings, base_dir: &Path) {
        if let Some(ref data_dir) = self.data_dir {
            settings.set_data_dir(self.resolve_path(data_dir, base_dir));
        }
        if let Some(ref database) = self.database {
            settings.database_filename = database.clone();
        }
        if let Some(ref csv) = self.csv {
            settings.csv_filename = csv.clone();
        }
        if let Some(ref url) = self.listing_url {
            settings.listing_url = url.clone();
        }
        if let Some(ref url) = self.storage_url {
            settings.storage_url = url.clone();
        }
        if let Some(pages) = self.page_count {
            settings.page_count = pages;
        }
        if let Some(n) = self.scrape_concurrency {
            settings.scrape_concurrency = n.max(1) as usize;
        }
        if let Some(n) = self.fetch_concurrency {
            settings.fetch_concurrency = n.max(1) as usize;
        }
        if let Some(n) = self.max_attempts {
            settings.max_attempts = n.max(1);
        }
        if let Some(timeout) = self.scrape_timeout {
            settings.scrape_timeout = timeout;
        }
        if let Some(timeout) = self.fetch_timeout {
            settings.fetch_timeout = timeout;
        }
        if let Some(delay) = self.request_delay_ms {
            settings.request_delay_ms = delay;
        }
        if let Some(ref user_agent) = self.user_agent {
            settings.user_agent = Some(user_agent.clone());
        }
        if !self.run_ids.is_empty() {
            settings.run_ids = self.run_ids.clone();
        }
        if let Some(ref prefix) = self.aggregate_prefix {
            settings.aggregate_prefix = prefix.clone();
        }
        if let Some(labels) = self.label_table() {
            settings.labels = labels;
        }
    }
}

/// Options for loading settings.
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// Explicit config file path (overrides auto-discovery).
    pub config_path: Option<PathBuf>,
    /// Use CWD for relative paths instead of config file directory.
    pub use_cwd: bool,
    /// Data directory override (--target flag).
    pub target: Option<PathBuf>,
}

fn current_dir() -> PathBuf {
    std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
}

/// Load config from file sources.
async fn load_file_config(options: &LoadOptions) -> Config {
    // Priority 1: Explicit --config flag
    if let Some(ref config_path) = options.config_path {
        return Config::load_from_path(config_path)
            .await
            .unwrap_or_else(|e| {
                tracing::warn!("{} ({}); using defaults", e, config_path.display());
                Config::default()
            });
    }

    // Priority 2: Auto-discover via prefer
    Config::load().await
}

/// Load settings with explicit options.
/// Returns (Settings, Config) tuple.
pub async fn load_settings_with_options(options: LoadOptions) -> (Settings, Config) {
    let config = load_file_config(&options).await;
    let mut settings = Settings::default();

    // Determine base directory for resolving relative paths
    let base_dir = if options.use_cwd {
        current_dir()
    } else {
        config.base_dir().unwrap_or_else(current_dir)
    };

    config.apply_to_settings(&mut settings, &base_dir);

    // --target takes precedence over the config file
    if let Some(ref target) = options.target {
        let target = config.resolve_path(&target.to_string_lossy(), &current_dir());
        settings.set_data_dir(target);
    }

    if let Some(ref path) = config.source_path {
        tracing::debug!("Loaded config from {}", path.display());
    }

    (settings, config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_follow_data_dir() {
        let settings = Settings::with_data_dir(PathBuf::from("/srv/lc0"));
        assert_eq!(settings.database_path(), PathBuf::from("/srv/lc0/lc0_matches.db"));
        assert_eq!(settings.csv_path(), PathBuf::from("/srv/lc0/lc0_matches_full.csv"));
        assert_eq!(settings.downloads_dir, PathBuf::from("/srv/lc0/downloads"));
        assert_eq!(settings.processed_dir, PathBuf::from("/srv/lc0/processed"));
        assert_eq!(settings.page_count, 2440);
        assert_eq!(settings.max_attempts, 3);
    }

    #[test]
    fn test_toml_overrides_and_relative_paths() {
        let toml = r#"
            data_dir = "archive"
            fetch_concurrency = 4
            run_ids = ["2", "1"]
            fallback_label = "v0.20.0"

            [[labels]]
            since = "2021-01-01"
            version = "v0.27.0"

            [[labels]]
            since = "not a date"
            version = "v9"
        "#;
        let config = Config::parse(toml, Path::new("lc0acquire.toml")).unwrap();

        let mut settings = Settings::default();
        config.apply_to_settings(&mut settings, Path::new("/etc/lc0"));

        assert_eq!(settings.data_dir, PathBuf::from("/etc/lc0/archive"));
        assert_eq!(settings.downloads_dir, PathBuf::from("/etc/lc0/archive/downloads"));
        assert_eq!(settings.fetch_concurrency, 4);
        assert_eq!(settings.scrape_concurrency, 25);
        assert_eq!(settings.fetch_config().layouts.len(), 6);

        assert_eq!(settings.labels.thresholds().len(), 1);
        assert_eq!(
            settings.labels.version_for(NaiveDate::from_ymd_opt(2022, 5, 1)),
            "v0.27.0"
        );
        assert_eq!(
            settings.labels.version_for(NaiveDate::from_ymd_opt(2019, 5, 1)),
            "v0.20.0"
        );
    }

    #[test]
    fn test_yaml_and_json_parse() {
        let yaml = "storage_url: http://mirror.local/pgns\nmax_attempts: 5\n";
        let config = Config::parse(yaml, Path::new("c.yml")).unwrap();
        assert_eq!(config.max_attempts, Some(5));

        let json = r#"{"target": "/data", "request_delay_ms": 250}"#;
        let config = Config::parse(json, Path::new("c.json")).unwrap();
        let mut settings = Settings::default();
        config.apply_to_settings(&mut settings, Path::new("/ignored"));
        assert_eq!(settings.data_dir, PathBuf::from("/data"));
        assert_eq!(
            settings.scrape_config().request_delay,
            Duration::from_millis(250)
        );

        assert!(Config::parse("not = [valid", Path::new("c.toml")).is_err());
    }

    #[tokio::test]
    async fn test_target_overrides_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lc0acquire.json");
        std::fs::write(&path, r#"{"data_dir": "from-config"}"#).unwrap();

        let (settings, config) = load_settings_with_options(LoadOptions {
            config_path: Some(path.clone()),
            use_cwd: false,
            target: Some(dir.path().join("from-flag")),
        })
        .await;

        assert_eq!(config.source_path, Some(path));
        assert_eq!(settings.data_dir, dir.path().join("from-flag"));
        assert_eq!(settings.processed_dir, dir.path().join("from-flag/processed"));
    }
}
