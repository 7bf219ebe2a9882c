//! Catalog discovery against the match listing pages.

pub mod catalog;
pub mod http_client;
pub mod listing;

pub use catalog::{export_csv, CatalogScraper, ScrapeConfig, ScrapeError};
pub use http_client::{HttpClient, HttpResponse};
pub use listing::parse_listing;
