//! sled-backed storage. Every logical namespace is its own tree so each can
//! be enumerated on its own.

use crate::document::{merge_fields, Document, DocumentId};
use crate::error::{Result, SearchError};
use crate::index::Posting;
use sled::transaction::{ConflictableTransactionError, ConflictableTransactionResult};
use sled::{Db, Transactional, Tree};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use time::format_description::well_known::Rfc3339;
use tracing::{debug, info};

pub(crate) const DOC_COUNT_KEY: &str = "doc_count";
pub(crate) const FIELD_SEQ_KEY: &str = "field_seq";
const VERSION_KEY: &str = "version";
const CREATED_AT_KEY: &str = "created_at";
const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Namespace {
    Documents,
    Index,
    FieldIds,
    FieldBoosts,
    Meta,
    Deleted,
}

impl Namespace {
    pub const ALL: [Namespace; 6] = [
        Namespace::Documents,
        Namespace::Index,
        Namespace::FieldIds,
        Namespace::FieldBoosts,
        Namespace::Meta,
        Namespace::Deleted,
    ];

    pub fn tree_name(self) -> &'static str {
        match self {
            Namespace::Documents => "docs",
            Namespace::Index => "index",
            Namespace::FieldIds => "field_ids",
            Namespace::FieldBoosts => "field_boosts",
            Namespace::Meta => "meta",
            Namespace::Deleted => "deleted",
        }
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tree_name())
    }
}

impl FromStr for Namespace {
    type Err = SearchError;

    fn from_str(s: &str) -> Result<Self> {
        Namespace::ALL
            .into_iter()
            .find(|ns| ns.tree_name() == s)
            .ok_or_else(|| SearchError::Validation(format!("unknown namespace {s:?}")))
    }
}

#[derive(Clone)]
pub struct Store {
    db: Db,
    pub(crate) docs: Tree,
    pub(crate) index: Tree,
    pub(crate) field_ids: Tree,
    pub(crate) field_boosts: Tree,
    pub(crate) meta: Tree,
    /// Ids removed from `docs` whose postings may still be in `index`.
    deleted: Tree,
}

impl Store {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        info!(path = %path.as_ref().display(), "opening store");
        Self::from_db(sled::open(path)?)
    }

    /// In-memory store removed on drop.
    pub fn temporary() -> Result<Self> {
        Self::from_db(sled::Config::new().temporary(true).open()?)
    }

    fn from_db(db: Db) -> Result<Self> {
        let store = Store {
            docs: db.open_tree(Namespace::Documents.tree_name())?,
            index: db.open_tree(Namespace::Index.tree_name())?,
            field_ids: db.open_tree(Namespace::FieldIds.tree_name())?,
            field_boosts: db.open_tree(Namespace::FieldBoosts.tree_name())?,
            meta: db.open_tree(Namespace::Meta.tree_name())?,
            deleted: db.open_tree(Namespace::Deleted.tree_name())?,
            db,
        };
        store.init_meta()?;
        Ok(store)
    }

    fn init_meta(&self) -> Result<()> {
        let version = FORMAT_VERSION.to_be_bytes().to_vec();
        if let Err(existing) = self
            .meta
            .compare_and_swap(VERSION_KEY, None as Option<&[u8]>, Some(version))?
        {
            let found = existing.current.as_deref().and_then(decode_u32);
            if found != Some(FORMAT_VERSION) {
                return Err(SearchError::corrupt(
                    "meta",
                    format!("unsupported store version {found:?}"),
                ));
            }
        }
        let created_at = time::OffsetDateTime::now_utc()
            .format(&Rfc3339)
            .unwrap_or_else(|_| "".into());
        // Losing this race just means someone else stamped it first.
        let _ = self.meta.compare_and_swap(
            CREATED_AT_KEY,
            None as Option<&[u8]>,
            Some(created_at.into_bytes()),
        )?;
        Ok(())
    }

    /// Persists the document and bumps the count in one transaction.
    /// Returns the post-increment count, or `None` if the id was already stored.
    pub fn insert_document(&self, id: &DocumentId, doc: &Document) -> Result<Option<u64>> {
        let key = id.as_str().as_bytes();
        let bytes = encode_document(doc)?;
        let inserted = (&self.docs, &self.meta).transaction(
            |(docs, meta)| -> ConflictableTransactionResult<Option<u64>, SearchError> {
                if docs.get(key)?.is_some() {
                    return Ok(None);
                }
                let count = match meta.get(DOC_COUNT_KEY)? {
                    Some(raw) => decode_u64(&raw).ok_or_else(|| {
                        ConflictableTransactionError::Abort(SearchError::corrupt(
                            "meta",
                            "document count is not a u64",
                        ))
                    })?,
                    None => 0,
                };
                docs.insert(key, bytes.as_slice())?;
                meta.insert(DOC_COUNT_KEY, (count + 1).to_be_bytes().to_vec())?;
                Ok(Some(count + 1))
            },
        )?;
        Ok(inserted)
    }

    pub fn get_document(&self, id: &DocumentId) -> Result<Option<Document>> {
        match self.docs.get(id.as_str())? {
            Some(raw) => decode_document(&raw).map(Some),
            None => Ok(None),
        }
    }

    /// Merges `partial` over the stored document. A compare-and-swap loop, so
    /// a concurrent delete is never undone by a late write-back.
    pub fn merge_document(&self, id: &DocumentId, partial: &Document) -> Result<Option<Document>> {
        let key = id.as_str().as_bytes();
        loop {
            let current = match self.docs.get(key)? {
                Some(raw) => raw,
                None => return Ok(None),
            };
            let mut merged = decode_document(&current)?;
            merge_fields(&mut merged, partial);
            let bytes = encode_document(&merged)?;
            match self.docs.compare_and_swap(key, Some(&current[..]), Some(bytes))? {
                Ok(()) => return Ok(Some(merged)),
                Err(_) => debug!(document = %id, "document changed during update, retrying"),
            }
        }
    }

    /// Removes the stored document and leaves a tombstone for its id. The
    /// count is left alone.
    pub fn remove_document(&self, id: &DocumentId) -> Result<bool> {
        let key = id.as_str().as_bytes();
        let removed = (&self.docs, &self.deleted).transaction(
            |(docs, deleted)| -> ConflictableTransactionResult<bool, SearchError> {
                if docs.remove(key)?.is_none() {
                    return Ok(false);
                }
                deleted.insert(key, &[] as &[u8])?;
                Ok(true)
            },
        )?;
        Ok(removed)
    }

    /// Clears the tombstone for `id`, returning whether there was one.
    pub fn take_tombstone(&self, id: &DocumentId) -> Result<bool> {
        Ok(self.deleted.remove(id.as_str())?.is_some())
    }

    pub fn document_count(&self) -> Result<u64> {
        match self.meta.get(DOC_COUNT_KEY)? {
            Some(raw) => decode_u64(&raw)
                .ok_or_else(|| SearchError::corrupt("meta", "document count is not a u64")),
            None => Ok(0),
        }
    }

    pub fn flush(&self) -> Result<()> {
        self.db.flush()?;
        Ok(())
    }

    /// Decodes one namespace into printable key/value pairs.
    pub fn dump(&self, namespace: Namespace) -> Result<Vec<(String, String)>> {
        let tree = match namespace {
            Namespace::Documents => &self.docs,
            Namespace::Index => &self.index,
            Namespace::FieldIds => &self.field_ids,
            Namespace::FieldBoosts => &self.field_boosts,
            Namespace::Meta => &self.meta,
            Namespace::Deleted => &self.deleted,
        };
        let mut out = Vec::new();
        for entry in tree.iter() {
            let (key, value) = entry?;
            out.push(render_entry(namespace, &key, &value)?);
        }
        Ok(out)
    }
}

fn render_entry(namespace: Namespace, key: &[u8], value: &[u8]) -> Result<(String, String)> {
    let text = |bytes: &[u8]| String::from_utf8_lossy(bytes).into_owned();
    let rendered = match namespace {
        Namespace::Documents => (text(key), text(value)),
        Namespace::Deleted => (text(key), String::new()),
        Namespace::Index => {
            let postings = decode_postings(value)?;
            (text(key).replace('\0', " "), format!("{postings:?}"))
        }
        Namespace::FieldIds => (text(key), field_number(value)?.to_string()),
        Namespace::FieldBoosts => (field_number(key)?.to_string(), decode_boost(value)?.to_string()),
        Namespace::Meta => {
            let rendered = match key {
                k if k == DOC_COUNT_KEY.as_bytes() => decode_u64(value).map(|n| n.to_string()),
                k if k == FIELD_SEQ_KEY.as_bytes() || k == VERSION_KEY.as_bytes() => {
                    decode_u32(value).map(|n| n.to_string())
                }
                _ => Some(text(value)),
            };
            (text(key), rendered.unwrap_or_else(|| format!("{value:?}")))
        }
    };
    Ok(rendered)
}

fn field_number(raw: &[u8]) -> Result<u32> {
    decode_u32(raw).ok_or_else(|| SearchError::corrupt("field_ids", "field id is not a u32"))
}

pub(crate) fn encode_document(doc: &Document) -> Result<Vec<u8>> {
    serde_json::to_vec(doc).map_err(|e| SearchError::corrupt("docs", e.to_string()))
}

pub(crate) fn decode_document(raw: &[u8]) -> Result<Document> {
    serde_json::from_slice(raw).map_err(|e| SearchError::corrupt("docs", e.to_string()))
}

pub(crate) fn encode_postings(postings: &[Posting]) -> Result<Vec<u8>> {
    bincode::serialize(postings).map_err(|e| SearchError::corrupt("index", e.to_string()))
}

pub(crate) fn decode_postings(raw: &[u8]) -> Result<Vec<Posting>> {
    bincode::deserialize(raw).map_err(|e| SearchError::corrupt("index", e.to_string()))
}

pub(crate) fn decode_boost(raw: &[u8]) -> Result<f32> {
    raw.try_into()
        .map(f32::from_be_bytes)
        .map_err(|_| SearchError::corrupt("field_boosts", "boost is not an f32"))
}

pub(crate) fn decode_u32(raw: &[u8]) -> Option<u32> {
    raw.try_into().ok().map(u32::from_be_bytes)
}

pub(crate) fn decode_u64(raw: &[u8]) -> Option<u64> {
    raw.try_into().ok().map(u64::from_be_bytes)
}
