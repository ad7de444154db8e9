//! 🧭 Path building: `index`, `index/action`, `index/type`, `index/type/action`. That's the whole menu.
//!
//! No URL-encoding happens here. Segments go in exactly as handed over, so `_search` and
//! `_refresh` stay literal. If you pass a slash inside a segment, you get a slash in the path.
//! You were warned. In a doc comment. Which counts.

use crate::error::TransportError;

/// 🔗 Slash-join the segments. The index is mandatory, `doc_type` and `action` are optional,
/// and an empty string counts as absent.
///
/// `max_len` is the longest path we are willing to hand to the invoker.
pub fn build_path(
    index: &str,
    doc_type: Option<&str>,
    action: Option<&str>,
    max_len: usize,
) -> Result<String, TransportError> {
    if index.is_empty() {
        return Err(TransportError::Url(
            "an index is required for every operation".to_string(),
        ));
    }

    fn present(segment: Option<&str>) -> Option<&str> {
        segment.filter(|s| !s.is_empty())
    }
    let path = match (present(doc_type), present(action)) {
        (None, None) => index.to_string(),
        (None, Some(action)) => format!("{index}/{action}"),
        (Some(doc_type), None) => format!("{index}/{doc_type}"),
        (Some(doc_type), Some(action)) => format!("{index}/{doc_type}/{action}"),
    };

    if path.len() > max_len {
        return Err(TransportError::Url(format!(
            "path is {} bytes, longer than the {max_len} byte limit",
            path.len()
        )));
    }
    Ok(path)
}
