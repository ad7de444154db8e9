//! 🎯 Response extraction: parse once, check for `error`, then read a fixed table of paths.
//!
//! 🧠 Knowledge graph:
//! - Parse failure → `TransportError::Parse`. No result. No partial credit.
//! - A top-level, non-null `error` field wins over everything. Whatever operation you thought you ran,
//!   you get `TransportResult::Error`. This check runs first and short-circuits the rest.
//! - Otherwise each kind reads its own path table. Any missing path leaves its field at zero,
//!   empty, or false. Missing fields are not errors. Servers are forgetful. We forgive.
//! - Flags are true only for a literal JSON `true`. `"true"`, `1`, and absence are all false.
//! - Search hits are capped at `max_hits`. The extras are ignored without a word.
//! - Strings that outgrow their field either fail with `FieldOverflow` or get trimmed,
//!   depending on `fields.truncate`. The service error message is the exception: it is
//!   always trimmed, so an overlong complaint never hides the complaint itself.

use serde_json::Value;
use tracing::{debug, trace};

use crate::app_config::{FieldLimits, TransportLimits};
use crate::error::TransportError;
use crate::results::{
    AcknowledgedResult, HitSource, HitsSummary, IndexDocumentResult, RefreshResult, ResponseKind,
    SearchHit, SearchResult, ServiceError, ShardCounts, TransportResult,
};
use crate::subtree::{serialize_subtree, serialize_subtree_bounded};

// 🗺️ the path tables. one slice per field, read straight off the response shape.
const ERROR: &[&str] = &["error"];
const ERROR_REASON: &[&str] = &["error", "reason"];
const STATUS: &[&str] = &["status"];
const TOOK: &[&str] = &["took"];
const TIMED_OUT: &[&str] = &["timed_out"];
const SHARDS_TOTAL: &[&str] = &["_shards", "total"];
const SHARDS_SUCCESSFUL: &[&str] = &["_shards", "successful"];
const SHARDS_FAILED: &[&str] = &["_shards", "failed"];
const HITS_TOTAL: &[&str] = &["hits", "total"];
const HITS_TOTAL_VALUE: &[&str] = &["hits", "total", "value"];
const HITS_MAX_SCORE: &[&str] = &["hits", "max_score"];
const HITS_HITS: &[&str] = &["hits", "hits"];
const ACKNOWLEDGED: &[&str] = &["acknowledged"];
const INDEX: &[&str] = &["_index"];
const TYPE: &[&str] = &["_type"];
const ID: &[&str] = &["_id"];
const SCORE: &[&str] = &["_score"];
const SOURCE: &[&str] = &["_source"];
const VERSION: &[&str] = &["_version"];
const CREATED: &[&str] = &["created"];
const RESULT: &[&str] = &["result"];

/// 🚀 Turn a raw body into the result variant for `kind`.
///
/// A service-reported error comes back as `Ok(TransportResult::Error(..))`: it is data, not a
/// crash. Deciding what status code that means is the session's business.
pub fn extract(
    kind: ResponseKind,
    raw: &[u8],
    limits: &TransportLimits,
) -> Result<TransportResult, TransportError> {
    let root: Value =
        serde_json::from_slice(raw).map_err(|err| TransportError::Parse(err.to_string()))?;

    if let Some(error) = service_error(&root, &limits.fields) {
        debug!(?kind, status = error.status, "🚨 response carries an error field");
        return Ok(TransportResult::Error(error));
    }

    let fields = &limits.fields;
    let result = match kind {
        ResponseKind::Search => TransportResult::Search(search(&root, limits)?),
        ResponseKind::CreateIndex => TransportResult::CreateIndex(AcknowledgedResult {
            acknowledged: flag(&root, ACKNOWLEDGED),
        }),
        ResponseKind::DeleteIndex => TransportResult::DeleteIndex(AcknowledgedResult {
            acknowledged: flag(&root, ACKNOWLEDGED),
        }),
        ResponseKind::IndexDocument => TransportResult::IndexDocument(IndexDocumentResult {
            index: text(&root, INDEX, "_index", fields.index_len, fields.truncate)?,
            doc_type: text(&root, TYPE, "_type", fields.type_len, fields.truncate)?,
            id: text(&root, ID, "_id", fields.id_len, fields.truncate)?,
            version: integer(&root, VERSION),
            created: flag(&root, CREATED),
            result: text(&root, RESULT, "result", fields.result_len, fields.truncate)?,
        }),
        ResponseKind::Refresh => TransportResult::Refresh(RefreshResult {
            shards: shards(&root),
        }),
    };
    trace!(?kind, "✅ extraction complete");
    Ok(result)
}

/// 🔍 Follow `path` key by key. Any non-object along the way means "not here".
fn lookup<'v>(root: &'v Value, path: &[&str]) -> Option<&'v Value> {
    path.iter().try_fold(root, |node, key| node.get(*key))
}

fn integer(root: &Value, path: &[&str]) -> i64 {
    lookup(root, path)
        .and_then(|v| v.as_i64().or_else(|| v.as_f64().map(|f| f as i64)))
        .unwrap_or(0)
}

fn float(root: &Value, path: &[&str]) -> f64 {
    lookup(root, path).and_then(Value::as_f64).unwrap_or(0.0)
}

fn flag(root: &Value, path: &[&str]) -> bool {
    matches!(lookup(root, path), Some(Value::Bool(true)))
}

fn text(
    root: &Value,
    path: &[&str],
    field: &'static str,
    limit: usize,
    truncate: bool,
) -> Result<String, TransportError> {
    match lookup(root, path).and_then(Value::as_str) {
        Some(s) => fit(field, s.to_string(), limit, truncate),
        None => Ok(String::new()),
    }
}

/// ✂️ Make `value` fit in `limit` bytes, or say why it can't.
fn fit(
    field: &'static str,
    mut value: String,
    limit: usize,
    truncate: bool,
) -> Result<String, TransportError> {
    if value.len() <= limit {
        return Ok(value);
    }
    if !truncate {
        return Err(TransportError::FieldOverflow { field, limit });
    }
    let mut end = limit;
    // -- 🔪 never cut a character in half. it's rude and it's also invalid UTF-8.
    while !value.is_char_boundary(end) {
        end -= 1;
    }
    value.truncate(end);
    Ok(value)
}

fn service_error(root: &Value, fields: &FieldLimits) -> Option<ServiceError> {
    // -- 🕊️ `"error": null` is a server saying "no error" out loud. believe it.
    let error = lookup(root, ERROR).filter(|v| !v.is_null())?;
    let message = match (error, lookup(root, ERROR_REASON)) {
        (Value::String(s), _) => s.clone(),
        (Value::Object(_), Some(Value::String(reason))) => reason.clone(),
        (other, _) => serialize_subtree(other),
    };
    // -- ✂️ always trimmed, never an overflow. fit() in truncate mode cannot fail.
    let error = fit("error", message, fields.error_len, true).unwrap_or_default();
    Some(ServiceError {
        error,
        status: integer(root, STATUS),
    })
}

fn shards(root: &Value) -> ShardCounts {
    ShardCounts {
        total: integer(root, SHARDS_TOTAL),
        successful: integer(root, SHARDS_SUCCESSFUL),
        failed: integer(root, SHARDS_FAILED),
    }
}

fn search(root: &Value, limits: &TransportLimits) -> Result<SearchResult, TransportError> {
    // -- 📊 `hits.total` is a number on older servers and `{"value": n, "relation": ..}` on newer ones
    let total = match lookup(root, HITS_TOTAL) {
        Some(Value::Object(_)) => integer(root, HITS_TOTAL_VALUE),
        _ => integer(root, HITS_TOTAL),
    };

    let hits = match lookup(root, HITS_HITS) {
        Some(Value::Array(items)) => {
            if items.len() > limits.max_hits {
                debug!(
                    returned = items.len(),
                    kept = limits.max_hits,
                    "✂️ more hits than the hit list holds, keeping the first ones"
                );
            }
            items
                .iter()
                .take(limits.max_hits)
                .map(|item| hit(item, &limits.fields))
                .collect::<Result<Vec<_>, _>>()?
        }
        _ => Vec::new(),
    };

    Ok(SearchResult {
        took: integer(root, TOOK),
        timed_out: flag(root, TIMED_OUT),
        shards: shards(root),
        hits: HitsSummary {
            total,
            max_score: float(root, HITS_MAX_SCORE),
            hits,
        },
    })
}

fn hit(item: &Value, fields: &FieldLimits) -> Result<SearchHit, TransportError> {
    Ok(SearchHit {
        index: text(item, INDEX, "_index", fields.index_len, fields.truncate)?,
        doc_type: text(item, TYPE, "_type", fields.type_len, fields.truncate)?,
        id: text(item, ID, "_id", fields.id_len, fields.truncate)?,
        score: float(item, SCORE),
        source: hit_source(item, fields)?,
    })
}

fn hit_source(item: &Value, fields: &FieldLimits) -> Result<HitSource, TransportError> {
    match lookup(item, SOURCE) {
        Some(object @ Value::Object(_)) => {
            if fields.truncate {
                let text = serialize_subtree(object);
                Ok(HitSource::Object(fit("_source", text, fields.source_len, true)?))
            } else {
                serialize_subtree_bounded(object, fields.source_len)
                    .map(HitSource::Object)
                    .ok_or(TransportError::FieldOverflow {
                        field: "_source",
                        limit: fields.source_len,
                    })
            }
        }
        Some(Value::String(raw)) => Ok(HitSource::Raw(fit(
            "_source",
            raw.clone(),
            fields.source_len,
            fields.truncate,
        )?)),
        _ => Ok(HitSource::Missing),
    }
}
