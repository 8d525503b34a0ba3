use crate::config::EngineConfig;
use crate::document::{Document, DocumentId, StoredDocument};
use crate::error::{Result, SearchError};
use crate::fields::{FieldInfo, FieldRegistry};
use crate::index::InvertedIndex;
use crate::persist::Store;
use crate::pipeline::{IndexReport, IndexingPipeline};
use crate::query::QueryEngine;
use crate::stopwords::{EnglishStopwords, StopwordSet};
use crate::tokenizer::{StemmingTokenizer, TermTokenizer};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    pub id: DocumentId,
    pub score: f32,
    pub document: Document,
}

/// The public face of the search engine. Cheap to clone; clones share the
/// same store and may be used from many threads at once.
#[derive(Clone)]
pub struct Engine {
    store: Store,
    fields: FieldRegistry,
    index: InvertedIndex,
    tokenizer: Arc<dyn TermTokenizer>,
    stopwords: Arc<dyn StopwordSet>,
    config: EngineConfig,
}

impl Engine {
    pub fn open(config: EngineConfig) -> Result<Self> {
        let store = match &config.path {
            Some(path) => Store::open(path)?,
            None => Store::temporary()?,
        };
        Ok(Self::with_collaborators(
            store,
            config,
            Arc::new(StemmingTokenizer),
            Arc::new(EnglishStopwords),
        ))
    }

    pub fn with_collaborators(
        store: Store,
        config: EngineConfig,
        tokenizer: Arc<dyn TermTokenizer>,
        stopwords: Arc<dyn StopwordSet>,
    ) -> Self {
        Self {
            fields: FieldRegistry::new(&store),
            index: InvertedIndex::new(&store),
            store,
            tokenizer,
            stopwords,
            config,
        }
    }

    fn pipeline(&self) -> IndexingPipeline<'_> {
        IndexingPipeline {
            tokenizer: self.tokenizer.as_ref(),
            stopwords: self.stopwords.as_ref(),
            fields: &self.fields,
            index: &self.index,
        }
    }

    /// Stores, counts and indexes `doc`. Re-adding identical content returns
    /// the existing id without counting or indexing again. Adding content
    /// that was deleted earlier first drops the postings it left behind.
    pub fn add(&self, doc: Document) -> Result<DocumentId> {
        if doc.is_empty() {
            return Err(SearchError::Validation("document has no fields".into()));
        }
        let id = DocumentId::of(&doc)?;
        let Some(doc_count) = self.store.insert_document(&id, &doc)? else {
            debug!(document = %id, "document already stored");
            return Ok(id);
        };
        if self.store.take_tombstone(&id)? {
            let purged = self.index.remove_document(&id)?;
            debug!(document = %id, purged, "cleared postings left by an earlier delete");
        }
        self.pipeline()
            .index_document(&id, &doc, doc_count)
            .map_err(|e| {
                warn!(document = %id, error = %e, "indexing failed");
                e
            })?;
        Ok(id)
    }

    pub fn get(&self, id: &DocumentId) -> Result<Option<StoredDocument>> {
        Ok(self
            .store
            .get_document(id)?
            .map(|fields| StoredDocument { id: id.clone(), fields }))
    }

    /// Merges `partial` over the stored document under the same id. The index
    /// is left as it was unless `reindex_on_update` is set.
    pub fn update(&self, id: &DocumentId, partial: Document) -> Result<()> {
        if self.store.merge_document(id, &partial)?.is_none() {
            return Err(SearchError::NotFound(id.to_string()));
        }
        debug!(document = %id, fields = partial.len(), "updated document");
        if self.config.reindex_on_update {
            self.reindex(id)?;
        }
        Ok(())
    }

    /// Removes the stored document. Returns false if it was not stored.
    /// Postings stay behind unless `purge_on_delete` is set; the count is
    /// never decremented.
    pub fn delete(&self, id: &DocumentId) -> Result<bool> {
        let removed = self.store.remove_document(id)?;
        if removed && self.config.purge_on_delete {
            let purged = self.index.remove_document(id)?;
            self.store.take_tombstone(id)?;
            debug!(document = %id, purged, "purged postings");
        }
        Ok(removed)
    }

    /// Replaces every posting of `id` with a fresh pass over the stored
    /// document. The document count is not touched.
    pub fn reindex(&self, id: &DocumentId) -> Result<IndexReport> {
        let doc = self
            .store
            .get_document(id)?
            .ok_or_else(|| SearchError::NotFound(id.to_string()))?;
        let purged = self.index.remove_document(id)?;
        let doc_count = self.store.document_count()?;
        debug!(document = %id, purged, "reindexing document");
        self.pipeline().index_document(id, &doc, doc_count)
    }

    pub fn search(&self, query: &str) -> Result<Vec<SearchHit>> {
        self.search_with_limit(query, None)
    }

    /// Ranked hits, most relevant first. Ids whose document is gone are
    /// skipped; `limit` counts only hits that resolved.
    pub fn search_with_limit(&self, query: &str, limit: Option<usize>) -> Result<Vec<SearchHit>> {
        let engine = QueryEngine {
            tokenizer: self.tokenizer.as_ref(),
            fields: &self.fields,
            index: &self.index,
        };
        let ranked = engine.rank(query, self.store.document_count()?)?;
        let limit = limit.unwrap_or(usize::MAX);
        let mut hits = Vec::new();
        for scored in ranked {
            if hits.len() >= limit {
                break;
            }
            match self.store.get_document(&scored.id)? {
                Some(document) => hits.push(SearchHit { id: scored.id, score: scored.score, document }),
                None => debug!(document = %scored.id, "skipping dangling posting"),
            }
        }
        Ok(hits)
    }

    pub fn set_field_boosts(&self, weights: &BTreeMap<String, f32>) -> Result<()> {
        self.fields.set_boosts(weights)
    }

    pub fn field_boosts(&self) -> Result<Vec<FieldInfo>> {
        self.fields.list()
    }

    pub fn count(&self) -> Result<u64> {
        self.store.document_count()
    }

    pub fn fields(&self) -> &FieldRegistry {
        &self.fields
    }

    pub fn index(&self) -> &InvertedIndex {
        &self.index
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn flush(&self) -> Result<()> {
        self.store.flush()
    }
}
