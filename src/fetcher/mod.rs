//! Page fetcher seam.
//!
//! The resolver never talks to the network directly. It asks a
//! [`PageFetcher`] for a rendered page and receives the structured link list
//! plus a markdown rendering of the visible text. Production uses
//! [`http::HttpPageFetcher`]; tests inject canned results.

pub mod extract;
pub mod http;

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Fetch options
// ---------------------------------------------------------------------------

/// When the fetcher may consider a page finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitUntil {
    /// Wait until network activity settles.
    NetworkIdle,
}

/// Whether a previously cached response may satisfy the fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheMode {
    /// Always hit the live page.
    Bypass,
}

#[derive(Debug, Clone)]
pub struct FetchOptions {
    pub wait_until: WaitUntil,
    pub cache_mode: CacheMode,
    /// Upper bound for the whole fetch, including retries.
    pub timeout: Duration,
}

impl FetchOptions {
    /// Options used for every resolution: settle the page, never use a cache.
    pub fn live(timeout: Duration) -> Self {
        Self {
            wait_until: WaitUntil::NetworkIdle,
            cache_mode: CacheMode::Bypass,
            timeout,
        }
    }
}

// ---------------------------------------------------------------------------
// Fetch result
// ---------------------------------------------------------------------------

/// One anchor-like element discovered on the page, in document order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchedLink {
    /// May be missing on anchors without a usable `href`.
    pub href: Option<String>,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
}

impl FetchedLink {
    pub fn new(href: impl Into<String>) -> Self {
        Self {
            href: Some(href.into()),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchResult {
    /// `false` when the page was reached but did not load successfully.
    pub success: bool,
    pub status_code: Option<u16>,
    pub final_url: Option<String>,
    pub links: Vec<FetchedLink>,
    pub rendered_text: String,
}

impl FetchResult {
    pub fn loaded(links: Vec<FetchedLink>, rendered_text: impl Into<String>) -> Self {
        Self {
            success: true,
            status_code: Some(200),
            final_url: None,
            links,
            rendered_text: rendered_text.into(),
        }
    }

    pub fn unsuccessful(status_code: u16) -> Self {
        Self {
            success: false,
            status_code: Some(status_code),
            ..Self::default()
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("invalid url '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("network error fetching '{url}': {reason}")]
    Network { url: String, reason: String },

    #[error("fetch of '{url}' timed out after {secs}s")]
    Timeout { url: String, secs: u64 },

    #[error("unsupported content from '{url}': {reason}")]
    Content { url: String, reason: String },

    #[error("fetch session unavailable: {0}")]
    Session(String),
}

// ---------------------------------------------------------------------------
// Fetcher trait
// ---------------------------------------------------------------------------

#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &str, options: &FetchOptions) -> Result<FetchResult, FetchError>;
}
