use std::collections::BTreeMap;
use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::redirect::Policy;
use thiserror::Error;

use super::CancelToken;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("invalid URL '{0}'")]
    InvalidUrl(String),
    #[error("request timed out: {0}")]
    Timeout(String),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("failed to build HTTP client: {0}")]
    Client(String),
    #[error("request cancelled")]
    Cancelled,
}

impl FetchError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, FetchError::Timeout(_) | FetchError::Transport(_))
    }
}

/// Outcome of fetching one URL. `url` is always the URL that was asked for,
/// so batch results can be matched back to their inputs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Response {
    pub status: u16,
    pub body: String,
    pub headers: BTreeMap<String, String>,
    pub url: String,
    pub error: Option<FetchError>,
}

impl Response {
    pub fn failed(url: impl Into<String>, error: FetchError) -> Self {
        Self { url: url.into(), error: Some(error), ..Default::default() }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none() && (200..300).contains(&self.status)
    }
}

/// Performs a single GET. Retrying is the caller's business.
pub trait Fetcher: Send + Sync {
    fn fetch(&self, url: &str) -> Result<Response, FetchError>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct FetchOptions {
    pub timeout: Duration,
    pub user_agent: String,
    pub follow_redirects: bool,
    pub max_retries: u32,
    pub retry_backoff: Duration,
    pub headers: BTreeMap<String, String>,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            user_agent: "Harvest Crawler/1.0".to_owned(),
            follow_redirects: true,
            max_retries: 3,
            retry_backoff: Duration::from_secs(1),
            headers: BTreeMap::new(),
        }
    }
}

impl FetchOptions {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy { max_retries: self.max_retries, backoff: self.retry_backoff }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub backoff: Duration,
}

impl RetryPolicy {
    pub fn none() -> Self {
        Self { max_retries: 0, backoff: Duration::ZERO }
    }

    /// Wait before retry number `attempt` (1-based). Grows linearly.
    pub fn delay(&self, attempt: u32) -> Duration {
        self.backoff * attempt
    }
}

/// Fetches `url`, retrying transport failures according to `policy`.
/// Responses with any status are returned as-is. Cancelling during a backoff
/// ends the retries with the last attempt's error.
pub fn fetch_with_retry(
    fetcher: &dyn Fetcher,
    url: &str,
    policy: &RetryPolicy,
    cancel: &CancelToken,
) -> Result<Response, FetchError> {
    let mut attempt = 0;
    loop {
        if cancel.is_cancelled() {
            return Err(FetchError::Cancelled);
        }

        tracing::debug!(url, attempt, "fetching");
        match fetcher.fetch(url) {
            Ok(response) => return Ok(response),
            Err(e) if e.is_retryable() && attempt < policy.max_retries => {
                attempt += 1;
                let delay = policy.delay(attempt);
                tracing::warn!(url, attempt, ?delay, error = %e, "fetch failed, retrying");
                if cancel.wait(delay) {
                    return Err(e);
                }
            }
            Err(e) => return Err(e),
        }
    }
}

/// Blocking HTTP fetcher.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(options: &FetchOptions) -> Result<Self, FetchError> {
        let mut headers = HeaderMap::new();
        for (name, value) in &options.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| FetchError::Client(format!("header '{name}': {e}")))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| FetchError::Client(format!("header '{name}': {e}")))?;
            headers.insert(name, value);
        }

        let redirect = if options.follow_redirects { Policy::limited(10) } else { Policy::none() };

        let client = Client::builder()
            .timeout(options.timeout)
            .user_agent(options.user_agent.as_str())
            .redirect(redirect)
            .default_headers(headers)
            .build()
            .map_err(|e| FetchError::Client(e.to_string()))?;

        Ok(Self { client })
    }
}

impl Fetcher for HttpFetcher {
    fn fetch(&self, url: &str) -> Result<Response, FetchError> {
        let response = self.client.get(url).send().map_err(|e| classify(url, e))?;

        let status = response.status().as_u16();
        let mut headers = BTreeMap::new();
        for (name, value) in response.headers() {
            let value = String::from_utf8_lossy(value.as_bytes()).into_owned();
            headers
                .entry(name.as_str().to_owned())
                .and_modify(|existing: &mut String| {
                    existing.push_str(", ");
                    existing.push_str(&value);
                })
                .or_insert(value);
        }

        let body = response.text().map_err(|e| classify(url, e))?;

        Ok(Response { status, body, headers, url: url.to_owned(), error: None })
    }
}

fn classify(url: &str, e: reqwest::Error) -> FetchError {
    if e.is_timeout() {
        FetchError::Timeout(format!("fetching '{url}'"))
    } else if e.is_builder() {
        FetchError::InvalidUrl(url.to_owned())
    } else {
        FetchError::Transport(e.to_string())
    }
}
