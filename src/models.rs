use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

// ---------------------------------------------------------------------------
// Map records
// ---------------------------------------------------------------------------

/// One business to resolve. Field names follow the upstream spreadsheet
/// columns; snake_case aliases are accepted too.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct MapRecord {
    #[serde(rename = "PharmacyName", alias = "name")]
    pub name: String,
    #[serde(rename = "Map", alias = "map_url")]
    pub map_url: String,
    #[serde(rename = "Website", alias = "known_website", default)]
    pub known_website: Option<String>,
}

impl MapRecord {
    pub fn new(name: impl Into<String>, map_url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            map_url: map_url.into(),
            known_website: None,
        }
    }

    pub fn with_known_website(mut self, website: impl Into<String>) -> Self {
        self.known_website = Some(website.into());
        self
    }
}

// ---------------------------------------------------------------------------
// Resolution outcome
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum ResolutionStatus {
    #[serde(rename = "Success")]
    Found,
    #[serde(rename = "Website Not Found")]
    NotFound,
}

/// Which pass produced the website.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionSource {
    Link,
    Text,
}

/// Why a record stayed unresolved. Diagnostic only; all reasons map to
/// [`ResolutionStatus::NotFound`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum UnresolvedReason {
    InvalidInput,
    FetchFailed,
    NoCandidate,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ResolutionOutcome {
    #[serde(rename = "PharmacyName")]
    pub name: String,
    #[serde(rename = "gmb link")]
    pub map_url: String,
    /// Discovered website, or the record's known website when unresolved.
    #[serde(rename = "Website")]
    pub website: Option<String>,
    #[serde(rename = "Status")]
    pub status: ResolutionStatus,
    #[serde(rename = "Source", default, skip_serializing_if = "Option::is_none")]
    pub source: Option<ResolutionSource>,
    #[serde(rename = "Reason", default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<UnresolvedReason>,
}

impl ResolutionOutcome {
    pub fn found(record: &MapRecord, website: String, source: ResolutionSource) -> Self {
        Self {
            name: record.name.clone(),
            map_url: record.map_url.clone(),
            website: Some(website),
            status: ResolutionStatus::Found,
            source: Some(source),
            reason: None,
        }
    }

    /// Unresolved: keeps whatever website the record already carried.
    pub fn not_found(record: &MapRecord, reason: UnresolvedReason) -> Self {
        Self {
            name: record.name.clone(),
            map_url: record.map_url.clone(),
            website: record.known_website.clone(),
            status: ResolutionStatus::NotFound,
            source: None,
            reason: Some(reason),
        }
    }

    /// The website this resolution discovered, if any.
    pub fn resolved_website(&self) -> Option<&str> {
        match self.status {
            ResolutionStatus::Found => self.website.as_deref(),
            ResolutionStatus::NotFound => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Process request / response
// ---------------------------------------------------------------------------

/// `POST /process-maps` body: one record or an array of records.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(untagged)]
pub enum ProcessMapsRequest {
    Batch(Vec<MapRecord>),
    Single(MapRecord),
}

/// Mirrors the request shape.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(untagged)]
pub enum ProcessMapsResponse {
    Batch(Vec<ResolutionOutcome>),
    Single(ResolutionOutcome),
}

// ---------------------------------------------------------------------------
// Health
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AliveResponse {
    pub status: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub app: String,
    pub uptime_seconds: u64,
}
