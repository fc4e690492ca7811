// Shared helpers for router-level integration tests.
#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::Request;
use http_body_util::BodyExt;
use serde_json::Value;

use gmb_website_finder::config::{ResolverConfig, ServerConfig};
use gmb_website_finder::fetcher::{FetchError, FetchOptions, FetchResult, FetchedLink, PageFetcher};
use gmb_website_finder::state::{AppState, LogRingBuffer};

/// Fetcher that serves pages by URL substring and counts calls.
/// URLs containing "fail" error out; URLs without a matching page get an
/// empty listing.
#[derive(Default)]
pub struct CannedFetcher {
    pub calls: AtomicUsize,
    pages: Vec<(String, FetchResult)>,
}

impl CannedFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(mut self, url_part: &str, hrefs: &[&str], text: &str) -> Self {
        let links = hrefs.iter().map(|h| FetchedLink::new(*h)).collect();
        self.pages.push((url_part.to_string(), FetchResult::loaded(links, text)));
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PageFetcher for CannedFetcher {
    async fn fetch(&self, url: &str, _options: &FetchOptions) -> Result<FetchResult, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if url.contains("fail") {
            return Err(FetchError::Network {
                url: url.to_string(),
                reason: "navigation error".to_string(),
            });
        }
        Ok(self
            .pages
            .iter()
            .find(|(part, _)| url.contains(part.as_str()))
            .map(|(_, page)| page.clone())
            .unwrap_or_else(|| FetchResult::loaded(Vec::new(), "")))
    }
}

pub fn state_with(fetcher: Arc<CannedFetcher>, server: ServerConfig) -> AppState {
    AppState::with_fetcher(
        fetcher,
        ResolverConfig::default(),
        server,
        Arc::new(LogRingBuffer::new(100)),
    )
}

pub fn app(fetcher: Arc<CannedFetcher>) -> axum::Router {
    let state = state_with(fetcher, ServerConfig::default());
    state.mark_ready();
    gmb_website_finder::create_router(state)
}

pub fn post_json(uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

/// Collect a response body into a `serde_json::Value`.
pub async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
