//! Documents are open maps from field name to JSON value. Only string
//! values are tokenized; everything else is stored as-is.

use crate::error::{Result, SearchError};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sha1::{Digest, Sha1};
use std::fmt;

pub type Document = Map<String, Value>;

/// Hex SHA-1 of the document as first added. Never recomputed afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(String);

const ID_HEX_LEN: usize = 40;

impl DocumentId {
    /// Digest of the canonical JSON form. `Map` keeps keys sorted, so field
    /// order in the input does not change the id.
    pub fn of(doc: &Document) -> Result<Self> {
        let bytes = serde_json::to_vec(doc)
            .map_err(|e| SearchError::Validation(format!("document is not serializable: {e}")))?;
        let mut hasher = Sha1::new();
        hasher.update(&bytes);
        Ok(DocumentId(format!("{:x}", hasher.finalize())))
    }

    pub fn parse(raw: &str) -> Result<Self> {
        let raw = raw.trim();
        if raw.len() != ID_HEX_LEN || !raw.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(SearchError::Validation(format!("malformed document id {raw:?}")));
        }
        Ok(DocumentId(raw.to_ascii_lowercase()))
    }

    pub(crate) fn from_stored(raw: &[u8]) -> Result<Self> {
        std::str::from_utf8(raw)
            .map(|s| DocumentId(s.to_string()))
            .map_err(|_| SearchError::corrupt("index", "document id is not utf-8"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A document as returned by `get`, paired with its identifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredDocument {
    pub id: DocumentId,
    pub fields: Document,
}

/// Accepts only a non-empty JSON object.
pub fn parse_document(value: Value) -> Result<Document> {
    match value {
        Value::Object(map) if map.is_empty() => {
            Err(SearchError::Validation("document has no fields".into()))
        }
        Value::Object(map) => Ok(map),
        other => Err(SearchError::Validation(format!(
            "document must be a JSON object, got {}",
            kind_of(&other)
        ))),
    }
}

/// Like `parse_document` but an empty object is allowed.
pub fn parse_partial(value: Value) -> Result<Document> {
    match value {
        Value::Object(map) => Ok(map),
        other => Err(SearchError::Validation(format!(
            "partial update must be a JSON object, got {}",
            kind_of(&other)
        ))),
    }
}

/// Later values win; fields absent from `partial` are kept.
pub fn merge_fields(doc: &mut Document, partial: &Document) {
    for (name, value) in partial {
        doc.insert(name.clone(), value.clone());
    }
}

/// Indexable (string-valued) fields, in key order.
pub fn text_fields(doc: &Document) -> impl Iterator<Item = (&str, &str)> {
    doc.iter()
        .filter_map(|(name, value)| value.as_str().map(|text| (name.as_str(), text)))
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        parse_document(value).unwrap()
    }

    #[test]
    fn id_ignores_key_order() {
        let a = doc(json!({"title": "x", "body": "y"}));
        let b = doc(json!({"body": "y", "title": "x"}));
        assert_eq!(DocumentId::of(&a).unwrap(), DocumentId::of(&b).unwrap());
    }

    #[test]
    fn different_content_different_id() {
        let a = doc(json!({"title": "x"}));
        let b = doc(json!({"title": "y"}));
        assert_ne!(DocumentId::of(&a).unwrap(), DocumentId::of(&b).unwrap());
    }

    #[test]
    fn parse_round_trips_digest() {
        let id = DocumentId::of(&doc(json!({"a": 1}))).unwrap();
        assert_eq!(DocumentId::parse(&id.to_string().to_uppercase()).unwrap(), id);
        assert!(DocumentId::parse("nope").is_err());
    }

    #[test]
    fn rejects_non_objects() {
        assert!(matches!(parse_document(json!("text")), Err(SearchError::Validation(_))));
        assert!(matches!(parse_document(json!({})), Err(SearchError::Validation(_))));
        assert!(parse_partial(json!({})).is_ok());
    }

    #[test]
    fn merge_keeps_unmentioned_fields() {
        let mut base = doc(json!({"title": "old", "tags": ["a"]}));
        merge_fields(&mut base, &doc(json!({"title": "new", "year": 2020})));
        assert_eq!(base["title"], "new");
        assert_eq!(base["tags"], json!(["a"]));
        assert_eq!(base["year"], 2020);
    }

    #[test]
    fn only_strings_are_text() {
        let d = doc(json!({"id": 1, "title": "hello", "flag": true}));
        let fields: Vec<_> = text_fields(&d).collect();
        assert_eq!(fields, vec![("title", "hello")]);
    }
}
