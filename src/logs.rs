// Backend log capture + log endpoints.

use std::fmt::{self, Write as _};
use std::sync::Arc;

use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::{Context, Layer};

use crate::state::{AppState, LogEntry, LogRingBuffer};

// ── Tracing layer ───────────────────────────────────────────────────────────

/// Copies every tracing event into the in-memory ring buffer.
pub struct LogBufferLayer {
    buffer: Arc<LogRingBuffer>,
}

impl LogBufferLayer {
    pub fn new(buffer: Arc<LogRingBuffer>) -> Self {
        Self { buffer }
    }
}

impl<S: Subscriber> Layer<S> for LogBufferLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut visitor = MessageVisitor::default();
        event.record(&mut visitor);
        let meta = event.metadata();
        self.buffer.push(LogEntry {
            timestamp: chrono::Utc::now().to_rfc3339(),
            level: meta.level().to_string(),
            target: meta.target().to_string(),
            message: visitor.finish(),
        });
    }
}

#[derive(Default)]
struct MessageVisitor {
    message: String,
    fields: String,
}

impl MessageVisitor {
    /// `message key=value key=value`
    fn finish(self) -> String {
        if self.fields.is_empty() {
            self.message
        } else if self.message.is_empty() {
            self.fields.trim_start().to_string()
        } else {
            format!("{}{}", self.message, self.fields)
        }
    }
}

impl Visit for MessageVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message = value.to_string();
        } else {
            let _ = write!(self.fields, " {}={}", field.name(), value);
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{:?}", value);
        } else {
            let _ = write!(self.fields, " {}={:?}", field.name(), value);
        }
    }
}

// ── Query parameters ────────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct BackendLogsQuery {
    pub limit: Option<usize>,
    pub level: Option<String>,
    pub search: Option<String>,
}

// ── GET /api/logs/backend ───────────────────────────────────────────────────

pub async fn backend_logs(
    State(state): State<AppState>,
    Query(q): Query<BackendLogsQuery>,
) -> Json<Value> {
    let limit = q.limit.unwrap_or(200).min(500);
    let entries = state.log_buffer.recent(limit, q.level.as_deref(), q.search.as_deref());
    Json(json!({ "logs": entries, "total": entries.len() }))
}

// ── DELETE /api/logs/backend ────────────────────────────────────────────────

pub async fn clear_backend_logs(State(state): State<AppState>) -> Json<Value> {
    state.log_buffer.clear();
    Json(json!({ "cleared": true }))
}
