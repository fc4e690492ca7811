//! Production page fetcher over plain HTTP.
//!
//! Every fetch builds its own client with no cookie store, so no state leaks
//! from one listing to the next. The fetch budget is split across retry
//! attempts against a single deadline.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{self, HeaderMap, HeaderValue};
use scraper::Html;
use tokio::time::Instant;
use url::Url;

use super::extract::{extract_links, render_markdown};
use super::{CacheMode, FetchError, FetchOptions, FetchResult, PageFetcher};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

const MAX_PAGE_SIZE: usize = 5 * 1024 * 1024;
const MAX_RETRY_ATTEMPTS: u32 = 3;
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const MAX_REDIRECTS: usize = 10;

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 \
    (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";

// ---------------------------------------------------------------------------
// Fetcher
// ---------------------------------------------------------------------------

pub struct HttpPageFetcher {
    user_agent: String,
}

impl HttpPageFetcher {
    pub fn new(user_agent: impl Into<String>) -> Self {
        Self {
            user_agent: user_agent.into(),
        }
    }

    /// Fresh client for one fetch. Dropped with the fetch.
    fn session_client(&self, options: &FetchOptions) -> Result<reqwest::Client, FetchError> {
        reqwest::Client::builder()
            .user_agent(self.user_agent.as_str())
            .default_headers(request_headers(options.cache_mode))
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| FetchError::Session(e.to_string()))
    }
}

fn request_headers(cache_mode: CacheMode) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        header::ACCEPT,
        HeaderValue::from_static("text/html,application/xhtml+xml,*/*;q=0.8"),
    );
    headers.insert(
        header::ACCEPT_LANGUAGE,
        HeaderValue::from_static("en-US,en;q=0.9"),
    );
    match cache_mode {
        CacheMode::Bypass => {
            headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
            headers.insert(header::PRAGMA, HeaderValue::from_static("no-cache"));
        }
    }
    headers
}

/// Validated target of a fetch. Only http/https are fetched.
fn parse_target(raw: &str) -> Result<Url, FetchError> {
    let parsed = Url::parse(raw.trim()).map_err(|e| FetchError::InvalidUrl {
        url: raw.to_string(),
        reason: e.to_string(),
    })?;
    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        other => Err(FetchError::InvalidUrl {
            url: raw.to_string(),
            reason: format!("unsupported scheme '{}'", other),
        }),
    }
}

/// Outcome of the HTTP exchange before any HTML work.
enum Page {
    Loaded { body: String, final_url: Url, status: u16 },
    Failed { status: u16, final_url: Url },
}

fn remaining(deadline: Instant) -> Duration {
    deadline.saturating_duration_since(Instant::now())
}

/// GET with retries. Each attempt gets an equal share of what is left of
/// `budget`; backoff never takes more than a quarter of it.
async fn fetch_with_retry(
    client: &reqwest::Client,
    target: &Url,
    budget: Duration,
) -> Result<Page, FetchError> {
    let url = target.as_str();
    let deadline = Instant::now() + budget;
    let mut last_failure: Option<Page> = None;
    let mut timed_out = false;

    for attempt in 0..MAX_RETRY_ATTEMPTS {
        if attempt > 0 {
            let backoff = Duration::from_millis(500 * 2u64.pow(attempt));
            tokio::time::sleep(backoff.min(remaining(deadline) / 4)).await;
        }
        let left = remaining(deadline);
        if left.is_zero() {
            break;
        }
        let attempt_timeout = left / (MAX_RETRY_ATTEMPTS - attempt);

        let resp = match client.get(target.clone()).timeout(attempt_timeout).send().await {
            Ok(resp) => resp,
            Err(e) if e.is_timeout() => {
                tracing::debug!(url = %url, attempt, ?attempt_timeout, "fetch attempt timed out");
                timed_out = true;
                continue;
            }
            Err(e) => {
                return Err(FetchError::Network {
                    url: url.to_string(),
                    reason: e.to_string(),
                });
            }
        };

        let status = resp.status().as_u16();
        let final_url = resp.url().clone();
        if status == 429 || (500..600).contains(&status) {
            tracing::debug!(url = %url, status, attempt, "retryable HTTP status");
            last_failure = Some(Page::Failed { status, final_url });
            continue;
        }
        if !resp.status().is_success() {
            return Ok(Page::Failed { status, final_url });
        }

        let content_type = resp
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("");
        if !content_type.is_empty()
            && !content_type.contains("text/")
            && !content_type.contains("html")
            && !content_type.contains("xml")
        {
            return Err(FetchError::Content {
                url: url.to_string(),
                reason: format!("non-HTML content type {}", content_type),
            });
        }
        if resp.content_length().is_some_and(|len| len as usize > MAX_PAGE_SIZE) {
            return Err(FetchError::Content {
                url: url.to_string(),
                reason: "response too large".to_string(),
            });
        }

        let bytes = match resp.bytes().await {
            Ok(bytes) => bytes,
            Err(e) if e.is_timeout() => {
                tracing::debug!(url = %url, attempt, "body read timed out");
                timed_out = true;
                continue;
            }
            Err(e) => {
                return Err(FetchError::Network {
                    url: url.to_string(),
                    reason: format!("read body failed: {}", e),
                });
            }
        };
        if bytes.len() > MAX_PAGE_SIZE {
            return Err(FetchError::Content {
                url: url.to_string(),
                reason: format!("response too large: {} bytes", bytes.len()),
            });
        }

        return Ok(Page::Loaded {
            body: String::from_utf8_lossy(&bytes).into_owned(),
            final_url,
            status,
        });
    }

    match (last_failure, timed_out) {
        (Some(page), _) => Ok(page),
        (None, true) => Err(FetchError::Timeout {
            url: url.to_string(),
            secs: budget.as_secs(),
        }),
        (None, false) => Err(FetchError::Network {
            url: url.to_string(),
            reason: format!("failed after {} attempts", MAX_RETRY_ATTEMPTS),
        }),
    }
}

/// Turn a loaded HTML body into the resolver's view of the page.
pub fn parse_page(html: &str, final_url: &Url, status: u16) -> FetchResult {
    let doc = Html::parse_document(html);
    FetchResult {
        success: true,
        status_code: Some(status),
        final_url: Some(final_url.to_string()),
        links: extract_links(&doc, Some(final_url)),
        rendered_text: render_markdown(&doc),
    }
}

#[async_trait]
impl PageFetcher for HttpPageFetcher {
    async fn fetch(&self, url: &str, options: &FetchOptions) -> Result<FetchResult, FetchError> {
        let target = parse_target(url)?;
        let client = self.session_client(options)?;

        let page = fetch_with_retry(&client, &target, options.timeout).await?;
        drop(client);

        match page {
            Page::Loaded { body, final_url, status } => {
                let result = parse_page(&body, &final_url, status);
                tracing::debug!(
                    url = %target,
                    final_url = %final_url,
                    links = result.links.len(),
                    text_len = result.rendered_text.len(),
                    "page fetched"
                );
                Ok(result)
            }
            Page::Failed { status, final_url } => {
                tracing::debug!(url = %target, final_url = %final_url, status, "page did not load");
                Ok(FetchResult {
                    final_url: Some(final_url.to_string()),
                    ..FetchResult::unsuccessful(status)
                })
            }
        }
    }
}
