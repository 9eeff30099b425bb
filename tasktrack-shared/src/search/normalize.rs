//! Flattening raw index documents into [`SearchResult`]s.
//!
//! Index backends may hand back any field wrapped in an array. Every field of
//! a result is a single scalar, so an array is replaced by its first element;
//! an empty array means the entry can't be represented and it is rejected.

use serde_json::Value;

use super::{Document, SearchResult, SearchResultType};

/// Why a document couldn't become a [`SearchResult`]
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NormalizeError {
    #[error("missing field '{0}'")]
    MissingField(&'static str),

    #[error("field '{0}' is an empty array")]
    EmptyArray(&'static str),

    #[error("field '{0}' is not a scalar")]
    NotScalar(&'static str),
}

/// Reads `field` as a single scalar, unwrapping one level of array
///
/// `Ok(None)` means absent or null.
fn scalar(doc: &Document, field: &'static str) -> Result<Option<String>, NormalizeError> {
    let value = match doc.get(field) {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::Array(items)) => match items.first() {
            None => return Err(NormalizeError::EmptyArray(field)),
            Some(first) => first,
        },
        Some(value) => value,
    };

    match value {
        Value::Null => Ok(None),
        Value::String(s) => Ok(Some(s.clone())),
        Value::Number(n) => Ok(Some(n.to_string())),
        Value::Bool(b) => Ok(Some(b.to_string())),
        Value::Array(_) | Value::Object(_) => Err(NormalizeError::NotScalar(field)),
    }
}

/// Builds a result from one document
///
/// `fallback_type` applies when the document carries no `type`. The title is
/// read from `title`, or `name` for documents that have none.
pub fn normalize(
    doc: &Document,
    fallback_type: SearchResultType,
) -> Result<SearchResult, NormalizeError> {
    let id = scalar(doc, "id")?.ok_or(NormalizeError::MissingField("id"))?;

    let kind = scalar(doc, "type")?
        .map(SearchResultType::from)
        .unwrap_or(fallback_type);

    let title = match scalar(doc, "title")? {
        Some(title) => title,
        None => scalar(doc, "name")?.ok_or(NormalizeError::MissingField("title"))?,
    };

    let description = scalar(doc, "description")?.unwrap_or_default();

    Ok(SearchResult {
        id,
        kind,
        title,
        description,
    })
}
