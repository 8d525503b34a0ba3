//! Persistent full-text search: documents go into a sled store, their text
//! fields are indexed with TF-IDF statistics, and queries are ranked with
//! per-field boosts, query normalization and coordination.

pub mod config;
pub mod document;
pub mod engine;
pub mod error;
pub mod fields;
pub mod index;
pub mod persist;
pub mod pipeline;
pub mod query;
pub mod stopwords;
pub mod tokenizer;

pub use config::EngineConfig;
pub use document::{parse_document, parse_partial, Document, DocumentId, StoredDocument};
pub use engine::{Engine, SearchHit};
pub use error::{Result, SearchError};
pub use fields::{FieldInfo, FieldRegistry, DEFAULT_BOOST};
pub use index::{FieldId, InvertedIndex, Posting, PostingList};
pub use persist::{Namespace, Store};
