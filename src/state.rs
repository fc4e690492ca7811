// Application state

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use crate::config::{ResolverConfig, ServerConfig};
use crate::fetcher::http::HttpPageFetcher;
use crate::fetcher::PageFetcher;
use crate::resolver::WebsiteResolver;

// ── Log Ring Buffer ─────────────────────────────────────────────────────────
/// In-memory ring buffer for backend log entries (last N events).
/// Uses `std::sync::Mutex` because writes happen in the tracing Layer
/// (sync context, not inside a tokio runtime poll).

#[derive(Clone, serde::Serialize)]
pub struct LogEntry {
    pub timestamp: String,
    pub level: String,
    pub target: String,
    pub message: String,
}

pub struct LogRingBuffer {
    entries: std::sync::Mutex<VecDeque<LogEntry>>,
    capacity: usize,
}

impl LogRingBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: std::sync::Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
        }
    }

    pub fn push(&self, entry: LogEntry) {
        let mut buf = self.entries.lock().unwrap_or_else(|p| p.into_inner());
        if buf.len() >= self.capacity {
            buf.pop_front();
        }
        buf.push_back(entry);
    }

    /// Newest first.
    pub fn recent(&self, limit: usize, min_level: Option<&str>, search: Option<&str>) -> Vec<LogEntry> {
        let buf = self.entries.lock().unwrap_or_else(|p| p.into_inner());
        let search = search.map(str::to_lowercase);
        buf.iter()
            .rev()
            .filter(|e| min_level.is_none_or(|lvl| level_ord(&e.level) >= level_ord(lvl)))
            .filter(|e| {
                search.as_deref().is_none_or(|s| {
                    e.message.to_lowercase().contains(s) || e.target.to_lowercase().contains(s)
                })
            })
            .take(limit)
            .cloned()
            .collect()
    }

    pub fn clear(&self) {
        self.entries.lock().unwrap_or_else(|p| p.into_inner()).clear();
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(|p| p.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn level_ord(level: &str) -> u8 {
    match level.to_uppercase().as_str() {
        "ERROR" => 5,
        "WARN" => 4,
        "INFO" => 3,
        "DEBUG" => 2,
        "TRACE" => 1,
        _ => 0,
    }
}

// ── AppState ────────────────────────────────────────────────────────────────
/// Central application state. Clone-friendly, everything shared is behind Arc.
#[derive(Clone)]
pub struct AppState {
    pub resolver: WebsiteResolver,
    pub start_time: Instant,
    /// `true` once startup completes.
    pub ready: Arc<AtomicBool>,
    /// Upper bound on records per `/process-maps` call.
    pub max_batch_records: usize,
    /// Optional auth secret from AUTH_SECRET env. None = dev mode (no auth).
    pub auth_secret: Option<String>,
    /// In-memory ring buffer for backend log entries (last 1000).
    pub log_buffer: Arc<LogRingBuffer>,
}

impl AppState {
    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Relaxed)
    }

    pub fn mark_ready(&self) {
        self.ready.store(true, Ordering::Relaxed);
        tracing::info!("Backend marked as READY");
    }
}

impl AppState {
    /// State backed by the production HTTP fetcher.
    pub fn new(resolver_config: ResolverConfig, server: ServerConfig, log_buffer: Arc<LogRingBuffer>) -> Self {
        let fetcher = Arc::new(HttpPageFetcher::new(resolver_config.user_agent.clone()));
        Self::with_fetcher(fetcher, resolver_config, server, log_buffer)
    }

    /// State with an injected fetcher (tests, alternative renderers).
    pub fn with_fetcher(
        fetcher: Arc<dyn PageFetcher>,
        resolver_config: ResolverConfig,
        server: ServerConfig,
        log_buffer: Arc<LogRingBuffer>,
    ) -> Self {
        tracing::info!(
            max_batch_records = server.max_batch_records,
            "AppState initialised"
        );
        Self {
            resolver: WebsiteResolver::new(fetcher, resolver_config),
            start_time: Instant::now(),
            ready: Arc::new(AtomicBool::new(false)),
            max_batch_records: server.max_batch_records,
            auth_secret: server.auth_secret,
            log_buffer,
        }
    }
}
