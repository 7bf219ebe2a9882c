//! HTTP client shared by the catalog scraper and the payload fetcher.

mod response;
mod user_agent;

pub use response::HttpResponse;
pub use user_agent::{resolve_user_agent, IMPERSONATE_USER_AGENTS, USER_AGENT};

use std::time::{Duration, Instant};

use reqwest::Client;
use tracing::debug;

/// HTTP client with a per-request timeout and politeness delay.
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
    request_delay: Duration,
}

impl HttpClient {
    /// Create a new HTTP client.
    pub fn new(timeout: Duration, request_delay: Duration) -> Result<Self, reqwest::Error> {
        Self::with_user_agent(timeout, request_delay, None)
    }

    /// Create a new HTTP client with custom user agent configuration.
    /// - None: Use default lc0acquire user agent
    /// - Some("impersonate"): Use a real browser user agent
    /// - Some(custom): Use custom user agent string
    pub fn with_user_agent(
        timeout: Duration,
        request_delay: Duration,
        user_agent_config: Option<&str>,
    ) -> Result<Self, reqwest::Error> {
        Self::build(timeout, request_delay, user_agent_config, true)
    }

    /// Client that hands back bodies exactly as served.
    ///
    /// Origins often label `.tar.gz` files `Content-Encoding: gzip`; decoding
    /// that layer would leave a bare tar behind.
    pub fn raw_bodies(
        timeout: Duration,
        request_delay: Duration,
        user_agent_config: Option<&str>,
    ) -> Result<Self, reqwest::Error> {
        Self::build(timeout, request_delay, user_agent_config, false)
    }

    fn build(
        timeout: Duration,
        request_delay: Duration,
        user_agent_config: Option<&str>,
        decompress: bool,
    ) -> Result<Self, reqwest::Error> {
        let user_agent = resolve_user_agent(user_agent_config);
        let client = Client::builder()
            .user_agent(&user_agent)
            .timeout(timeout)
            .gzip(decompress)
            .brotli(decompress)
            .build()?;

        Ok(Self {
            client,
            request_delay,
        })
    }

    /// Make a GET request.
    ///
    /// Only transport failures are errors; any HTTP status is returned for the
    /// caller to classify.
    pub async fn get(&self, url: &str) -> Result<HttpResponse, reqwest::Error> {
        let start = Instant::now();
        let response = self.client.get(url).send().await?;
        debug!(
            "GET {} -> {} in {}ms",
            url,
            response.status().as_u16(),
            start.elapsed().as_millis()
        );

        if !self.request_delay.is_zero() {
            tokio::time::sleep(self.request_delay).await;
        }

        Ok(HttpResponse {
            status: response.status(),
            response,
        })
    }
}
