//! 📦 Result shapes: one variant per kind of answer the server can give.
//!
//! `TransportResult` is a tagged union. After a search you get a `Search`, after an
//! error you get an `Error`, and there is no stale `acknowledged` flag from three calls ago
//! lurking in a field you forgot to reset. We have all been that person. Never again.

use serde::Serialize;

/// 🏷️ Which operation's field table the extractor should use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResponseKind {
    Search,
    CreateIndex,
    DeleteIndex,
    IndexDocument,
    Refresh,
}

/// 🎭 Whatever the last call left behind. Exactly one variant is meaningful at a time.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TransportResult {
    #[default]
    None,
    Error(ServiceError),
    Search(SearchResult),
    CreateIndex(AcknowledgedResult),
    DeleteIndex(AcknowledgedResult),
    IndexDocument(IndexDocumentResult),
    Refresh(RefreshResult),
}

impl TransportResult {
    pub fn is_none(&self) -> bool {
        matches!(self, TransportResult::None)
    }
}

/// 🚨 The server's own account of what went wrong.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct ServiceError {
    pub error: String,
    /// Zero when the body did not say.
    pub status: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ShardCounts {
    pub total: i64,
    pub successful: i64,
    pub failed: i64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct SearchResult {
    pub took: i64,
    pub timed_out: bool,
    pub shards: ShardCounts,
    pub hits: HitsSummary,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct HitsSummary {
    pub total: i64,
    pub max_score: f64,
    /// 🎯 Capped at `limits.max_hits`. The rest were never here.
    pub hits: Vec<SearchHit>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct SearchHit {
    pub index: String,
    pub doc_type: String,
    pub id: String,
    pub score: f64,
    pub source: HitSource,
}

/// 📄 A hit's `_source`, in one of its three possible moods.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(into = "String")]
pub enum HitSource {
    /// Compact re-serialization of a JSON object.
    Object(String),
    /// A plain string, copied as-is.
    Raw(String),
    /// Absent, or some type that is neither. Reads as [`HitSource::MISSING_MARKER`].
    #[default]
    Missing,
}

impl HitSource {
    pub const MISSING_MARKER: &'static str = "Not an object!";

    pub fn as_str(&self) -> &str {
        match self {
            HitSource::Object(text) | HitSource::Raw(text) => text,
            HitSource::Missing => Self::MISSING_MARKER,
        }
    }
}

impl std::fmt::Display for HitSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<HitSource> for String {
    fn from(source: HitSource) -> Self {
        source.as_str().to_string()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct AcknowledgedResult {
    pub acknowledged: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct IndexDocumentResult {
    pub index: String,
    pub doc_type: String,
    pub id: String,
    pub version: i64,
    pub created: bool,
    /// `"created"` / `"updated"` on servers that say so. Empty otherwise.
    pub result: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct RefreshResult {
    pub shards: ShardCounts,
}
