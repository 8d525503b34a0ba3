use crate::document::DocumentId;
use crate::error::{Result, SearchError};
use crate::persist::{decode_postings, encode_postings, Store};
use serde::{Deserialize, Serialize};
use sled::Tree;

pub type FieldId = u32;

/// One token's statistics within one field of one document.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Posting {
    pub term_frequency: f32,
    /// IDF as of the moment the posting was written.
    pub idf: f32,
    pub field_norm: f32,
    pub field_id: FieldId,
}

impl Posting {
    pub fn weight(&self, boost: f32) -> f32 {
        self.term_frequency * self.idf * self.field_norm * boost
    }
}

/// Documents holding a token, in store key order, each with its postings.
pub type PostingList = Vec<(DocumentId, Vec<Posting>)>;

/// sqrt of the raw count.
pub fn term_frequency(count: usize) -> f32 {
    (count as f32).sqrt()
}

/// `1 + ln(N / (df + 1))`.
pub fn inverse_document_frequency(doc_count: u64, doc_freq: u64) -> f32 {
    1.0 + (doc_count as f32 / (doc_freq as f32 + 1.0)).ln()
}

pub fn field_length_norm(field_len: usize) -> f32 {
    1.0 / (field_len as f32).sqrt()
}

/// Token → document → postings, stored under `token \0 document_id` keys so a
/// token's posting list is one ordered prefix scan.
#[derive(Clone)]
pub struct InvertedIndex {
    tree: Tree,
}

const SEPARATOR: u8 = 0;

fn token_prefix(token: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(token.len() + 1);
    key.extend_from_slice(token.as_bytes());
    key.push(SEPARATOR);
    key
}

fn posting_key(token: &str, doc: &DocumentId) -> Vec<u8> {
    let mut key = token_prefix(token);
    key.extend_from_slice(doc.as_str().as_bytes());
    key
}

fn split_key(key: &[u8]) -> Result<(&[u8], &[u8])> {
    let at = key
        .iter()
        .position(|b| *b == SEPARATOR)
        .ok_or_else(|| SearchError::corrupt("index", "posting key has no separator"))?;
    Ok((&key[..at], &key[at + 1..]))
}

impl InvertedIndex {
    pub fn new(store: &Store) -> Self {
        Self { tree: store.index.clone() }
    }

    /// Appends under `(token, doc)`. sled's update is a CAS loop on the key,
    /// so concurrent appends to the same pair are never lost.
    pub fn append_posting(&self, token: &str, doc: &DocumentId, posting: Posting) -> Result<()> {
        if token.is_empty() || token.as_bytes().contains(&SEPARATOR) {
            return Err(SearchError::Validation(format!("unindexable token {token:?}")));
        }
        let key = posting_key(token, doc);
        let mut failure = None;
        self.tree.update_and_fetch(&key, |existing| {
            failure = None;
            let mut postings = match existing.map(decode_postings).transpose() {
                Ok(postings) => postings.unwrap_or_default(),
                Err(e) => {
                    failure = Some(e);
                    return existing.map(<[u8]>::to_vec);
                }
            };
            postings.push(posting);
            match encode_postings(&postings) {
                Ok(bytes) => Some(bytes),
                Err(e) => {
                    failure = Some(e);
                    existing.map(<[u8]>::to_vec)
                }
            }
        })?;
        failure.map_or(Ok(()), Err)
    }

    pub fn postings_for(&self, token: &str) -> Result<PostingList> {
        let mut out = Vec::new();
        for entry in self.tree.scan_prefix(token_prefix(token)) {
            let (key, value) = entry?;
            let (_, doc) = split_key(&key)?;
            out.push((DocumentId::from_stored(doc)?, decode_postings(&value)?));
        }
        Ok(out)
    }

    pub fn document_frequency(&self, token: &str) -> Result<u64> {
        let mut count = 0;
        for key in self.tree.scan_prefix(token_prefix(token)).keys() {
            key?;
            count += 1;
        }
        Ok(count)
    }

    /// Drops every posting that references `doc`. Walks the whole tree since
    /// keys are ordered by token first.
    pub fn remove_document(&self, doc: &DocumentId) -> Result<usize> {
        let mut removed = 0;
        for key in self.tree.iter().keys() {
            let key = key?;
            let (_, holder) = split_key(&key)?;
            if holder == doc.as_str().as_bytes() {
                self.tree.remove(&key)?;
                removed += 1;
            }
        }
        Ok(removed)
    }

    /// Number of distinct tokens.
    pub fn token_count(&self) -> Result<u64> {
        let mut count = 0;
        let mut last: Option<Vec<u8>> = None;
        for key in self.tree.iter().keys() {
            let key = key?;
            let (token, _) = split_key(&key)?;
            if last.as_deref() != Some(token) {
                count += 1;
                last = Some(token.to_vec());
            }
        }
        Ok(count)
    }
}
