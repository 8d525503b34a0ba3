//! Query-time scoring: per-posting weights summed per document, then scaled
//! by query normalization and coordination.

use crate::document::DocumentId;
use crate::error::Result;
use crate::fields::FieldRegistry;
use crate::index::{inverse_document_frequency, FieldId, InvertedIndex};
use crate::tokenizer::TermTokenizer;
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use tracing::debug;

#[derive(Debug, Clone, PartialEq)]
pub struct ScoredDocument {
    pub id: DocumentId,
    pub score: f32,
}

pub struct QueryEngine<'a> {
    pub tokenizer: &'a dyn TermTokenizer,
    pub fields: &'a FieldRegistry,
    pub index: &'a InvertedIndex,
}

struct Candidate {
    id: DocumentId,
    raw: f32,
    matched: usize,
}

/// Distinct tokens in order of first appearance.
fn distinct(tokens: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    tokens.into_iter().filter(|t| seen.insert(t.clone())).collect()
}

/// `1 / sqrt(sum of squared idf)`, or 1 when that is undefined.
pub fn query_norm(idfs: &[f32]) -> f32 {
    let sum: f32 = idfs.iter().map(|w| w * w).sum();
    if sum > 0.0 && sum.is_finite() {
        1.0 / sum.sqrt()
    } else {
        1.0
    }
}

impl<'a> QueryEngine<'a> {
    /// Ranks every document sharing a token with `query`. Ties keep the order
    /// in which documents were first met: query token order, then store key
    /// order within a token.
    pub fn rank(&self, query: &str, doc_count: u64) -> Result<Vec<ScoredDocument>> {
        let tokens = distinct(self.tokenizer.tokenize(query));
        if tokens.is_empty() || doc_count == 0 {
            return Ok(Vec::new());
        }

        let mut idfs = Vec::with_capacity(tokens.len());
        let mut candidates: Vec<Candidate> = Vec::new();
        let mut slot: HashMap<DocumentId, usize> = HashMap::new();
        let mut boosts: HashMap<FieldId, f32> = HashMap::new();

        for token in &tokens {
            let postings = self.index.postings_for(token)?;
            idfs.push(inverse_document_frequency(doc_count, postings.len() as u64));
            for (id, list) in postings {
                let mut contribution = 0.0;
                for posting in &list {
                    let boost = match boosts.get(&posting.field_id) {
                        Some(b) => *b,
                        None => {
                            let b = self.fields.boost_of(posting.field_id)?;
                            boosts.insert(posting.field_id, b);
                            b
                        }
                    };
                    contribution += posting.weight(boost);
                }
                let at = *slot.entry(id.clone()).or_insert_with(|| {
                    candidates.push(Candidate { id, raw: 0.0, matched: 0 });
                    candidates.len() - 1
                });
                candidates[at].raw += contribution;
                candidates[at].matched += 1;
            }
        }

        let norm = query_norm(&idfs);
        let total = tokens.len() as f32;
        let mut ranked: Vec<ScoredDocument> = candidates
            .into_iter()
            .map(|c| ScoredDocument {
                score: c.raw * norm * (c.matched as f32 / total),
                id: c.id,
            })
            .collect();
        ranked.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
        debug!(query, tokens = tokens.len(), hits = ranked.len(), "ranked query");
        Ok(ranked)
    }
}
