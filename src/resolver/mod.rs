//! Website resolution.
//!
//! validate → fetch → structured links → text fallback. The first qualifying
//! candidate wins. Every failure is logged and folded into
//! [`ResolutionStatus::NotFound`](crate::models::ResolutionStatus); nothing
//! here returns an error to the caller.

pub mod links;
pub mod text_scan;
pub mod validate;

use std::sync::Arc;

use futures_util::StreamExt;
use futures_util::stream;
use tokio::sync::Semaphore;

use crate::config::ResolverConfig;
use crate::fetcher::{FetchError, FetchOptions, FetchResult, PageFetcher};
use crate::models::{MapRecord, ResolutionOutcome, ResolutionSource, UnresolvedReason};

pub use links::first_external_link;
pub use text_scan::first_text_url;
pub use validate::is_maps_url;

/// A website candidate and the pass that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Discovery {
    pub url: String,
    pub source: ResolutionSource,
}

/// Pick the business website out of a fetched page.
///
/// Pure function of the link list and rendered text: the same page always
/// yields the same answer.
pub fn find_website(page: &FetchResult, config: &ResolverConfig) -> Option<Discovery> {
    let from_links = first_external_link(&page.links, &config.link_exclusions).map(|url| Discovery {
        url: url.to_string(),
        source: ResolutionSource::Link,
    });

    from_links
        .or_else(|| {
            first_text_url(&page.rendered_text, &config.text_exclusions).map(|url| Discovery {
                url,
                source: ResolutionSource::Text,
            })
        })
        .filter(|d| !d.url.is_empty())
}

/// Clones share the fetcher and the fetch session pool.
#[derive(Clone)]
pub struct WebsiteResolver {
    fetcher: Arc<dyn PageFetcher>,
    config: Arc<ResolverConfig>,
    /// One permit per live fetch session, across all requests.
    sessions: Arc<Semaphore>,
}

impl WebsiteResolver {
    pub fn new(fetcher: Arc<dyn PageFetcher>, config: ResolverConfig) -> Self {
        Self {
            fetcher,
            sessions: Arc::new(Semaphore::new(config.max_concurrent_fetches.max(1))),
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Fetch the listing behind `map_url` and look for its website.
    pub async fn discover(&self, map_url: &str) -> Result<Discovery, UnresolvedReason> {
        if !is_maps_url(map_url) {
            tracing::debug!(map_url = %map_url, "not a Google Maps link, skipping fetch");
            return Err(UnresolvedReason::InvalidInput);
        }

        // Queue time for a session does not count against the fetch budget.
        let _session = match self.sessions.acquire().await {
            Ok(permit) => permit,
            Err(e) => {
                tracing::warn!(map_url = %map_url, "fetch session pool closed: {}", e);
                return Err(UnresolvedReason::FetchFailed);
            }
        };

        let options = FetchOptions::live(self.config.fetch_timeout);
        let fetched = tokio::time::timeout(options.timeout, self.fetcher.fetch(map_url, &options))
            .await
            .unwrap_or_else(|_| {
                Err(FetchError::Timeout {
                    url: map_url.to_string(),
                    secs: options.timeout.as_secs(),
                })
            });
        let page = match fetched {
            Ok(page) => page,
            Err(e) => {
                tracing::warn!(map_url = %map_url, "fetch failed: {}", e);
                return Err(UnresolvedReason::FetchFailed);
            }
        };

        if !page.success {
            tracing::warn!(map_url = %map_url, status = ?page.status_code, "listing page did not load");
            return Err(UnresolvedReason::FetchFailed);
        }

        find_website(&page, &self.config).ok_or_else(|| {
            tracing::debug!(
                map_url = %map_url,
                links = page.links.len(),
                "no website candidate on listing"
            );
            UnresolvedReason::NoCandidate
        })
    }

    /// Resolve one record. Always produces an outcome.
    pub async fn resolve(&self, record: &MapRecord) -> ResolutionOutcome {
        match self.discover(&record.map_url).await {
            Ok(found) => {
                tracing::info!(
                    name = %record.name,
                    website = %found.url,
                    source = ?found.source,
                    "website found"
                );
                ResolutionOutcome::found(record, found.url, found.source)
            }
            Err(reason) => {
                tracing::info!(name = %record.name, reason = ?reason, "website not found");
                ResolutionOutcome::not_found(record, reason)
            }
        }
    }

    /// Resolve many records with bounded parallelism.
    ///
    /// Outcomes come back in input order. Each record runs in its own task,
    /// so a panicking fetch only costs that record.
    pub async fn resolve_batch(&self, records: Vec<MapRecord>) -> Vec<ResolutionOutcome> {
        let total = records.len();
        let parallelism = self.config.max_concurrent_fetches.max(1);
        tracing::info!(records = total, parallelism, "resolving batch");

        let outcomes: Vec<ResolutionOutcome> = stream::iter(records)
            .map(|record| {
                let resolver = self.clone();
                async move {
                    let fallback = record.clone();
                    match tokio::spawn(async move { resolver.resolve(&record).await }).await {
                        Ok(outcome) => outcome,
                        Err(e) => {
                            tracing::error!(name = %fallback.name, "resolution task aborted: {}", e);
                            ResolutionOutcome::not_found(&fallback, UnresolvedReason::FetchFailed)
                        }
                    }
                }
            })
            .buffered(parallelism)
            .collect()
            .await;

        let found = outcomes.iter().filter(|o| o.resolved_website().is_some()).count();
        tracing::info!(records = total, found, "batch complete");
        outcomes
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;

    use super::*;
    use crate::fetcher::FetchedLink;
    use crate::models::ResolutionStatus;

    const MAP_URL: &str = "https://google.com/maps/place/acme";

    /// Canned fetcher keyed on URL substrings, with a call counter.
    #[derive(Default)]
    struct StubFetcher {
        calls: AtomicUsize,
        in_flight: AtomicUsize,
        peak_in_flight: AtomicUsize,
        pages: Vec<(&'static str, Result<FetchResult, &'static str>)>,
        panic_on: Option<&'static str>,
        delay: Option<Duration>,
    }

    impl StubFetcher {
        fn serving(page: FetchResult) -> Self {
            Self {
                pages: vec![("", Ok(page))],
                ..Self::default()
            }
        }

        fn failing() -> Self {
            Self {
                pages: vec![("", Err("connection reset"))],
                ..Self::default()
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl PageFetcher for StubFetcher {
        async fn fetch(&self, url: &str, options: &FetchOptions) -> Result<FetchResult, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak_in_flight.fetch_max(now, Ordering::SeqCst);
            assert_eq!(options.wait_until, crate::fetcher::WaitUntil::NetworkIdle);
            assert_eq!(options.cache_mode, crate::fetcher::CacheMode::Bypass);
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            if self.panic_on.is_some_and(|p| url.contains(p)) {
                panic!("renderer crashed");
            }
            let (_, page) = self
                .pages
                .iter()
                .find(|(key, _)| url.contains(key))
                .expect("stub has no page for url");
            page.clone().map_err(|reason| FetchError::Network {
                url: url.to_string(),
                reason: reason.to_string(),
            })
        }
    }

    fn page(hrefs: &[&str], text: &str) -> FetchResult {
        FetchResult::loaded(hrefs.iter().map(|h| FetchedLink::new(*h)).collect(), text)
    }

    fn resolver(stub: Arc<StubFetcher>) -> WebsiteResolver {
        WebsiteResolver::new(stub, ResolverConfig::default())
    }

    #[tokio::test]
    async fn non_maps_urls_never_reach_the_fetcher() {
        let stub = Arc::new(StubFetcher::serving(page(&["https://acme.com"], "")));
        let resolver = resolver(stub.clone());

        for url in ["", "   ", "https://acme.com", "https://www.google.com/search?q=acme", "maps"] {
            let outcome = resolver.resolve(&MapRecord::new("Acme", url)).await;
            assert_eq!(outcome.status, ResolutionStatus::NotFound);
            assert_eq!(outcome.reason, Some(UnresolvedReason::InvalidInput));
        }
        assert_eq!(stub.calls(), 0);
    }

    #[tokio::test]
    async fn link_pass_wins_over_text_pass() {
        let stub = Arc::new(StubFetcher::serving(page(
            &["https://facebook.com/x", "https://example-pharmacy.com"],
            "Visit www.other-site.com",
        )));
        let outcome = resolver(stub.clone())
            .resolve(&MapRecord::new("Acme", MAP_URL))
            .await;
        assert_eq!(outcome.status, ResolutionStatus::Found);
        assert_eq!(outcome.website.as_deref(), Some("https://example-pharmacy.com"));
        assert_eq!(outcome.source, Some(ResolutionSource::Link));
        assert_eq!(stub.calls(), 1);
    }

    #[tokio::test]
    async fn text_pass_runs_when_links_are_all_excluded() {
        let stub = Arc::new(StubFetcher::serving(page(
            &["https://www.google.com/maps/dir", "https://instagram.com/acme"],
            "Visit us at www.mypharmacy.com.)",
        )));
        let outcome = resolver(stub)
            .resolve(&MapRecord::new("Acme", "https://maps.app.goo.gl/abc"))
            .await;
        assert_eq!(outcome.website.as_deref(), Some("www.mypharmacy.com"));
        assert_eq!(outcome.source, Some(ResolutionSource::Text));
    }

    #[tokio::test]
    async fn failed_fetch_keeps_empty_known_website() {
        let stub = Arc::new(StubFetcher::failing());
        let record = MapRecord::new("Acme Pharmacy", MAP_URL).with_known_website("");
        let outcome = resolver(stub).resolve(&record).await;
        assert_eq!(outcome.name, "Acme Pharmacy");
        assert_eq!(outcome.map_url, MAP_URL);
        assert_eq!(outcome.website.as_deref(), Some(""));
        assert_eq!(outcome.status, ResolutionStatus::NotFound);
        assert_eq!(outcome.reason, Some(UnresolvedReason::FetchFailed));
    }

    #[tokio::test]
    async fn unsuccessful_page_is_a_fetch_failure() {
        let stub = Arc::new(StubFetcher::serving(FetchResult::unsuccessful(503)));
        let outcome = resolver(stub).resolve(&MapRecord::new("Acme", MAP_URL)).await;
        assert_eq!(outcome.reason, Some(UnresolvedReason::FetchFailed));
    }

    #[tokio::test]
    async fn no_candidate_preserves_known_website() {
        let stub = Arc::new(StubFetcher::serving(page(
            &["https://www.google.com/maps"],
            "https://maps.app.goo.gl/xyz",
        )));
        let record = MapRecord::new("Acme", MAP_URL).with_known_website("http://old-site.com");
        let outcome = resolver(stub).resolve(&record).await;
        assert_eq!(outcome.website.as_deref(), Some("http://old-site.com"));
        assert_eq!(outcome.status, ResolutionStatus::NotFound);
        assert_eq!(outcome.reason, Some(UnresolvedReason::NoCandidate));
        assert_eq!(outcome.resolved_website(), None);
    }

    #[tokio::test]
    async fn slow_fetch_is_cut_off_by_timeout() {
        let stub = Arc::new(StubFetcher {
            delay: Some(Duration::from_secs(5)),
            ..StubFetcher::serving(page(&["https://acme.com"], ""))
        });
        let config = ResolverConfig {
            fetch_timeout: Duration::from_millis(50),
            ..ResolverConfig::default()
        };
        let outcome = WebsiteResolver::new(stub, config)
            .resolve(&MapRecord::new("Acme", MAP_URL))
            .await;
        assert_eq!(outcome.reason, Some(UnresolvedReason::FetchFailed));
    }

    #[tokio::test]
    async fn queued_resolutions_do_not_spend_the_fetch_budget() {
        let stub = Arc::new(StubFetcher {
            delay: Some(Duration::from_millis(300)),
            ..StubFetcher::serving(page(&["https://acme.com"], ""))
        });
        let config = ResolverConfig {
            fetch_timeout: Duration::from_millis(500),
            max_concurrent_fetches: 1,
            ..ResolverConfig::default()
        };
        let resolver = WebsiteResolver::new(stub.clone(), config);
        let other = resolver.clone();
        let first = MapRecord::new("One", "https://google.com/maps/place/one");
        let second = MapRecord::new("Two", "https://google.com/maps/place/two");

        // The second waits ~300ms for the only session, then gets its full 500ms.
        let (a, b) = tokio::join!(resolver.resolve(&first), other.resolve(&second));

        assert_eq!(a.status, ResolutionStatus::Found);
        assert_eq!(b.status, ResolutionStatus::Found);
        assert_eq!(stub.peak_in_flight.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn find_website_is_idempotent() {
        let config = ResolverConfig::default();
        let fetched = page(&["https://gstatic.com/x"], "Call or see https://acme-rx.com, thanks");
        let first = find_website(&fetched, &config);
        let second = find_website(&fetched, &config);
        assert_eq!(first, second);
        assert_eq!(first.map(|d| d.url), Some("https://acme-rx.com".to_string()));
    }

    #[tokio::test]
    async fn batch_isolates_a_panicking_record() {
        let stub = Arc::new(StubFetcher {
            panic_on: Some("place/two"),
            ..StubFetcher::serving(page(&["https://acme.com"], ""))
        });
        let records = vec![
            MapRecord::new("One", "https://google.com/maps/place/one"),
            MapRecord::new("Two", "https://google.com/maps/place/two").with_known_website("http://two.com"),
            MapRecord::new("Three", "https://google.com/maps/place/three"),
        ];
        let outcomes = resolver(stub.clone()).resolve_batch(records).await;

        assert_eq!(outcomes.len(), 3);
        assert_eq!(outcomes[0].name, "One");
        assert_eq!(outcomes[0].status, ResolutionStatus::Found);
        assert_eq!(outcomes[1].name, "Two");
        assert_eq!(outcomes[1].status, ResolutionStatus::NotFound);
        assert_eq!(outcomes[1].website.as_deref(), Some("http://two.com"));
        assert_eq!(outcomes[2].name, "Three");
        assert_eq!(outcomes[2].status, ResolutionStatus::Found);
        assert_eq!(stub.calls(), 3);
    }

    #[tokio::test]
    async fn batch_isolates_a_failing_record() {
        let stub = Arc::new(StubFetcher {
            pages: vec![
                ("place/two", Err("navigation error")),
                ("", Ok(page(&["https://acme.com"], ""))),
            ],
            ..StubFetcher::default()
        });
        let records = vec![
            MapRecord::new("One", "https://google.com/maps/place/one"),
            MapRecord::new("Two", "https://google.com/maps/place/two"),
            MapRecord::new("Three", "https://google.com/maps/place/three"),
        ];
        let outcomes = resolver(stub).resolve_batch(records).await;
        let statuses: Vec<_> = outcomes.iter().map(|o| o.status).collect();
        assert_eq!(
            statuses,
            vec![ResolutionStatus::Found, ResolutionStatus::NotFound, ResolutionStatus::Found]
        );
    }

    #[tokio::test]
    async fn empty_batch_yields_no_outcomes() {
        let stub = Arc::new(StubFetcher::failing());
        assert!(resolver(stub.clone()).resolve_batch(Vec::new()).await.is_empty());
        assert_eq!(stub.calls(), 0);
    }
}
