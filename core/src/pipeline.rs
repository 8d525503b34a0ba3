//! Turns one stored document into index mutations.

use crate::document::{text_fields, Document, DocumentId};
use crate::error::{Result, SearchError};
use crate::fields::FieldRegistry;
use crate::index::{
    field_length_norm, inverse_document_frequency, term_frequency, FieldId, InvertedIndex, Posting,
};
use crate::stopwords::StopwordSet;
use crate::tokenizer::TermTokenizer;
use std::collections::HashMap;
use tracing::debug;

/// Token counts for one text field after stopword removal.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalyzedField {
    pub name: String,
    pub field_id: FieldId,
    /// Length of the full token sequence, stopwords included.
    pub length: usize,
    /// Surviving tokens in order of first appearance, with their counts.
    pub counts: Vec<(String, usize)>,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct IndexReport {
    pub fields: usize,
    pub postings: usize,
}

pub struct IndexingPipeline<'a> {
    pub tokenizer: &'a dyn TermTokenizer,
    pub stopwords: &'a dyn StopwordSet,
    pub fields: &'a FieldRegistry,
    pub index: &'a InvertedIndex,
}

fn indexing_error(id: &DocumentId, field: &str, token: Option<&str>, err: SearchError) -> SearchError {
    SearchError::Indexing {
        document: id.to_string(),
        field: field.to_string(),
        token: token.map(str::to_string),
        message: err.to_string(),
    }
}

impl<'a> IndexingPipeline<'a> {
    /// Registers every text field and counts its non-stopword tokens.
    pub fn analyze(&self, id: &DocumentId, doc: &Document) -> Result<Vec<AnalyzedField>> {
        let mut analyzed = Vec::new();
        for (name, text) in text_fields(doc) {
            let field_id = self
                .fields
                .resolve_or_register(name)
                .map_err(|e| indexing_error(id, name, None, e))?;
            let tokens = self.tokenizer.tokenize(text);
            let mut counts: Vec<(String, usize)> = Vec::new();
            let mut position: HashMap<&str, usize> = HashMap::new();
            for token in &tokens {
                if self.stopwords.contains(token) {
                    continue;
                }
                match position.get(token.as_str()) {
                    Some(&at) => counts[at].1 += 1,
                    None => {
                        position.insert(token.as_str(), counts.len());
                        counts.push((token.clone(), 1));
                    }
                }
            }
            analyzed.push(AnalyzedField {
                name: name.to_string(),
                field_id,
                length: tokens.len(),
                counts,
            });
        }
        Ok(analyzed)
    }

    /// Writes one posting per (token, field). `doc_count` must already include
    /// this document. Document frequencies are read before any append, so a
    /// token shared by two fields sees the same df in both.
    ///
    /// A failure part way leaves earlier postings in place.
    pub fn index_document(&self, id: &DocumentId, doc: &Document, doc_count: u64) -> Result<IndexReport> {
        let analyzed = self.analyze(id, doc)?;

        let mut doc_freq: HashMap<&str, u64> = HashMap::new();
        for field in &analyzed {
            for (token, _) in &field.counts {
                if doc_freq.contains_key(token.as_str()) {
                    continue;
                }
                let df = self
                    .index
                    .document_frequency(token)
                    .map_err(|e| indexing_error(id, &field.name, Some(token.as_str()), e))?;
                doc_freq.insert(token, df);
            }
        }

        let mut report = IndexReport::default();
        for field in &analyzed {
            if field.length == 0 {
                continue;
            }
            report.fields += 1;
            let field_norm = field_length_norm(field.length);
            for (token, count) in &field.counts {
                let posting = Posting {
                    term_frequency: term_frequency(*count),
                    idf: inverse_document_frequency(doc_count, doc_freq[token.as_str()]),
                    field_norm,
                    field_id: field.field_id,
                };
                self.index
                    .append_posting(token, id, posting)
                    .map_err(|e| indexing_error(id, &field.name, Some(token.as_str()), e))?;
                report.postings += 1;
            }
        }
        debug!(document = %id, fields = report.fields, postings = report.postings, "indexed document");
        Ok(report)
    }
}
