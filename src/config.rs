//! Environment-derived configuration.
//!
//! Nothing is read from disk apart from an optional `.env` (loaded by
//! `dotenvy` in `main`). Every knob has a default so the service starts with
//! an empty environment.

use std::time::Duration;

use crate::fetcher::http::DEFAULT_USER_AGENT;

/// Platform and self-referential domains never accepted from the link list.
pub const DEFAULT_LINK_EXCLUSIONS: &[&str] = &[
    "google.com",
    "gstatic.com",
    "apple.com",
    "facebook.com",
    "instagram.com",
    "twitter.com",
    "schema.org",
];

/// Narrower set applied to URLs found in the rendered text.
pub const DEFAULT_TEXT_EXCLUSIONS: &[&str] = &["google.com", "gstatic", "maps.app"];

const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 45;
const DEFAULT_MAX_CONCURRENT_FETCHES: usize = 4;
const DEFAULT_MAX_BATCH_RECORDS: usize = 500;
const DEFAULT_PORT: u16 = 8080;

#[derive(Debug, Clone)]
pub struct ResolverConfig {
    /// Lowercase substrings that disqualify a structured link.
    pub link_exclusions: Vec<String>,
    /// Lowercase substrings that disqualify a text-scanned URL.
    pub text_exclusions: Vec<String>,
    pub fetch_timeout: Duration,
    /// Fetch session pool size; also the batch parallelism.
    pub max_concurrent_fetches: usize,
    pub user_agent: String,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            link_exclusions: DEFAULT_LINK_EXCLUSIONS.iter().map(|s| s.to_string()).collect(),
            text_exclusions: DEFAULT_TEXT_EXCLUSIONS.iter().map(|s| s.to_string()).collect(),
            fetch_timeout: Duration::from_secs(DEFAULT_FETCH_TIMEOUT_SECS),
            max_concurrent_fetches: DEFAULT_MAX_CONCURRENT_FETCHES,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl ResolverConfig {
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(extra) = std::env::var("RESOLVER_EXTRA_EXCLUDED_DOMAINS") {
            config.add_link_exclusions(&extra);
        }
        if let Some(secs) = env_parse::<u64>("RESOLVER_FETCH_TIMEOUT_SECS").filter(|s| *s > 0) {
            config.fetch_timeout = Duration::from_secs(secs);
        }
        if let Some(n) = env_parse::<usize>("RESOLVER_MAX_CONCURRENT_FETCHES").filter(|n| *n > 0) {
            config.max_concurrent_fetches = n;
        }
        if let Ok(ua) = std::env::var("RESOLVER_USER_AGENT") {
            if !ua.trim().is_empty() {
                config.user_agent = ua.trim().to_string();
            }
        }

        tracing::info!(
            link_exclusions = config.link_exclusions.len(),
            text_exclusions = config.text_exclusions.len(),
            fetch_timeout_secs = config.fetch_timeout.as_secs(),
            max_concurrent_fetches = config.max_concurrent_fetches,
            "resolver config loaded"
        );
        config
    }

    /// Append comma-separated domains to the link exclusion set.
    /// Entries are trimmed, lowercased and de-duplicated.
    pub fn add_link_exclusions(&mut self, list: &str) {
        for domain in list.split(',').map(|d| d.trim().to_lowercase()) {
            if !domain.is_empty() && !self.link_exclusions.contains(&domain) {
                self.link_exclusions.push(domain);
            }
        }
    }
}

/// Service-level settings outside the resolver.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub max_batch_records: usize,
    /// `None` = auth disabled (dev mode).
    pub auth_secret: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            max_batch_records: DEFAULT_MAX_BATCH_RECORDS,
            auth_secret: None,
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Self {
        let auth_secret = std::env::var("AUTH_SECRET").ok().filter(|s| !s.is_empty());
        if auth_secret.is_some() {
            tracing::info!("AUTH_SECRET configured - authentication enabled");
        } else {
            tracing::info!("AUTH_SECRET not set - authentication disabled (dev mode)");
        }

        Self {
            port: env_parse("PORT").unwrap_or(DEFAULT_PORT),
            max_batch_records: env_parse::<usize>("MAX_BATCH_RECORDS")
                .filter(|n| *n > 0)
                .unwrap_or(DEFAULT_MAX_BATCH_RECORDS),
            auth_secret,
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    let raw = std::env::var(key).ok()?;
    match raw.trim().parse() {
        Ok(v) => Some(v),
        Err(_) => {
            tracing::warn!("{} has unparseable value '{}', using default", key, raw);
            None
        }
    }
}
