// src/fetcher.rs
// =============================================================================
// Downloads pages over HTTP.
//
// Key functionality:
// - One GET per call, no retries
// - A fixed User-Agent so site owners can tell who we are
// - A request timeout so one slow server can't stall a worker forever
// - Anything that isn't a complete 2xx body is an error
//
// Rust concepts:
// - thiserror: derive a proper error enum instead of passing strings around
// - async/await: the worker waits on the network without blocking a thread
// =============================================================================

use reqwest::Client;
use std::time::Duration;
use thiserror::Error;

pub const USER_AGENT: &str = concat!(
    "Mozilla/5.0 (compatible; depthcrawl/",
    env!("CARGO_PKG_VERSION"),
    ")"
);

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(4);

// Why a fetch failed
//
// The crawler doesn't retry any of these. The URL is abandoned for this pass.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The server didn't answer within the timeout
    #[error("request timed out")]
    Timeout,
    /// The server answered, but not with a 2xx status
    #[error("HTTP {0}")]
    Status(u16),
    /// Connection, DNS, TLS or redirect problems
    #[error("request failed: {0}")]
    Request(#[source] reqwest::Error),
    /// The headers arrived but reading the body failed part way
    #[error("failed to read body: {0}")]
    Body(#[source] reqwest::Error),
}

impl FetchError {
    // Sorts a reqwest error into our variants
    fn from_request(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            FetchError::Timeout
        } else {
            FetchError::Request(error)
        }
    }

    fn from_body(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            FetchError::Timeout
        } else {
            FetchError::Body(error)
        }
    }
}

// A reusable HTTP client
//
// Cloning is cheap: reqwest::Client is an Arc around a connection pool, so
// every worker can hold its own copy and still share connections.
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: Client,
}

impl Fetcher {
    pub fn new(timeout: Duration) -> Result<Self, FetchError> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()
            .map_err(FetchError::Request)?;

        Ok(Self { client })
    }

    // Fetches a page and returns its body as text
    pub async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(FetchError::from_request)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        response.text().await.map_err(FetchError::from_body)
    }
}
