//! Paginated catalog discovery.

use std::collections::HashSet;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};
use url::Url;

use super::http_client::HttpClient;
use super::listing::parse_listing;
use crate::models::CatalogEntry;
use crate::shutdown::ShutdownFlag;

/// Errors that abort a scrape before or after the page walk.
///
/// Individual page failures never surface here; they are logged and
/// contribute zero entries.
#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("Invalid listing URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("HTTP client error: {0}")]
    Client(#[from] reqwest::Error),

    #[error("Catalog export failed: {0}")]
    Export(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration for catalog discovery.
#[derive(Debug, Clone)]
pub struct ScrapeConfig {
    pub listing_url: String,
    pub page_count: u32,
    pub concurrency: usize,
    pub request_timeout: Duration,
    pub request_delay: Duration,
    pub user_agent: Option<String>,
}

/// Walks the listing pages and collects catalog entries.
pub struct CatalogScraper {
    client: HttpClient,
    listing_url: Url,
    shutdown: ShutdownFlag,
}

impl CatalogScraper {
    pub fn new(config: &ScrapeConfig, shutdown: ShutdownFlag) -> Result<Self, ScrapeError> {
        let client = HttpClient::with_user_agent(
            config.request_timeout,
            config.request_delay,
            config.user_agent.as_deref(),
        )?;
        Ok(Self {
            client,
            listing_url: Url::parse(&config.listing_url)?,
            shutdown,
        })
    }

    /// URL of one listing page, with every row shown.
    pub fn page_url(&self, page: u32) -> Url {
        let mut url = self.listing_url.clone();
        url.query_pairs_mut()
            .append_pair("page", &page.to_string())
            .append_pair("show_all", "1");
        url
    }

    /// Fetch and parse one page. Failures yield no entries.
    pub async fn fetch_page(&self, page: u32) -> Vec<CatalogEntry> {
        let url = self.page_url(page);

        let response = match self.client.get(url.as_str()).await {
            Ok(response) => response,
            Err(e) => {
                warn!("Listing page {} failed: {}", page, e);
                return Vec::new();
            }
        };

        if !response.is_success() {
            warn!("Listing page {} returned HTTP {}", page, response.status);
            return Vec::new();
        }

        match response.text().await {
            Ok(html) => {
                let entries = parse_listing(&html);
                debug!("Listing page {} yielded {} entries", page, entries.len());
                entries
            }
            Err(e) => {
                warn!("Listing page {} body unreadable: {}", page, e);
                Vec::new()
            }
        }
    }

    /// Walk pages `1..=page_count` with at most `concurrency` requests in flight.
    ///
    /// Results are de-duplicated by id; order is not meaningful.
    pub async fn scrape_all(&self, page_count: u32, concurrency: usize) -> Vec<CatalogEntry> {
        let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));
        let pages_done = Arc::new(AtomicUsize::new(0));

        let tasks = (1..=page_count).map(|page| {
            let semaphore = semaphore.clone();
            let pages_done = pages_done.clone();
            async move {
                let Ok(_permit) = semaphore.acquire().await else {
                    return Vec::new();
                };
                if self.shutdown.is_requested() {
                    return Vec::new();
                }

                let entries = self.fetch_page(page).await;
                let done = pages_done.fetch_add(1, Ordering::Relaxed) + 1;
                if done % 100 == 0 {
                    info!("Scraped {}/{} listing pages", done, page_count);
                }
                entries
            }
        });

        let pages = futures::future::join_all(tasks).await;

        let mut seen = HashSet::new();
        let entries: Vec<CatalogEntry> = pages
            .into_iter()
            .flatten()
            .filter(|entry| seen.insert(entry.id))
            .collect();

        if self.shutdown.is_requested() {
            warn!(
                "Scrape interrupted after {} pages",
                pages_done.load(Ordering::Relaxed)
            );
        }
        info!(
            "Discovered {} entries across {} pages",
            entries.len(),
            page_count
        );

        entries
    }
}

/// Write the catalog as CSV with columns `id, occurred_at, source_filename`.
///
/// The file is replaced wholesale on every run.
pub fn export_csv(entries: &[CatalogEntry], path: &Path) -> Result<(), ScrapeError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let mut writer = csv::Writer::from_path(path)?;
    for entry in entries {
        writer.serialize(entry)?;
    }
    writer.flush()?;

    info!("Exported {} entries to {}", entries.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(listing_url: String) -> ScrapeConfig {
        ScrapeConfig {
            listing_url,
            page_count: 3,
            concurrency: 2,
            request_timeout: Duration::from_secs(5),
            request_delay: Duration::ZERO,
            user_agent: None,
        }
    }

    fn page(rows: &[(i64, &str)]) -> String {
        let body: String = rows
            .iter()
            .map(|(id, date)| format!("<tr><td><a>{}</a></td><td>{}</td></tr>", id, date))
            .collect();
        format!(r#"<table class="table"><tbody>{}</tbody></table>"#, body)
    }

    #[test]
    fn test_page_url_keeps_base_query() {
        let scraper = CatalogScraper::new(
            &config("https://example.org/matches/?run=1".to_string()),
            ShutdownFlag::new(),
        )
        .unwrap();
        assert_eq!(
            scraper.page_url(7).as_str(),
            "https://example.org/matches/?run=1&page=7&show_all=1"
        );
    }

    #[tokio::test]
    async fn test_scrape_all_tolerates_failed_pages() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/matches/"))
            .and(query_param("page", "1"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(page(&[(3, "2021-01-03"), (2, "2021-01-02")])),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/matches/"))
            .and(query_param("page", "2"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/matches/"))
            .and(query_param("page", "3"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(page(&[(2, "2021-01-02"), (1, "2021-01-01")])),
            )
            .mount(&server)
            .await;

        let scraper = CatalogScraper::new(
            &config(format!("{}/matches/", server.uri())),
            ShutdownFlag::new(),
        )
        .unwrap();
        let mut ids: Vec<i64> = scraper
            .scrape_all(3, 2)
            .await
            .into_iter()
            .map(|e| e.id)
            .collect();
        ids.sort();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_scrape_all_stops_when_interrupted() {
        let shutdown = ShutdownFlag::new();
        shutdown.request();
        let scraper =
            CatalogScraper::new(&config("http://127.0.0.1:9/".to_string()), shutdown).unwrap();
        assert!(scraper.scrape_all(5, 2).await.is_empty());
    }

    #[test]
    fn test_export_csv_columns() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out").join("catalog.csv");
        export_csv(
            &[
                CatalogEntry::new(42, "2021-03-15"),
                CatalogEntry::new(7, "2020-01-01 10:00:00"),
            ],
            &path,
        )
        .unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = written.lines().collect();
        assert_eq!(lines[0], "id,occurred_at,source_filename");
        assert_eq!(lines[1], "42,2021-03-15,match_42.pgn.tar.gz");
        assert_eq!(lines[2], "7,2020-01-01 10:00:00,match_7.pgn.tar.gz");
    }
}
