use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub type DocId = u32;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub text: String,
    /// Display name, usually the file name.
    pub title: String,
    /// Path used to re-open the original file.
    pub locator: String,
}

/// Per-document term counts after stop-word filtering.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TermStats {
    pub counts: HashMap<String, u32>,
    pub length: u32,
}

impl TermStats {
    pub fn from_tokens<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut stats = TermStats::default();
        for token in tokens {
            *stats.counts.entry(token.into()).or_insert(0) += 1;
            stats.length += 1;
        }
        stats
    }

    pub fn count(&self, token: &str) -> u32 { self.counts.get(token).copied().unwrap_or(0) }
}

/// Documents keyed by their position: id `n` lives at index `n`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentRegistry {
    docs: Vec<Document>,
}

impl DocumentRegistry {
    pub fn new() -> Self { Self::default() }

    pub fn register(&mut self, doc: Document) -> DocId {
        let id = self.docs.len() as DocId;
        self.docs.push(doc);
        id
    }

    pub fn get(&self, id: DocId) -> Option<&Document> { self.docs.get(id as usize) }

    pub fn len(&self) -> usize { self.docs.len() }

    pub fn is_empty(&self) -> bool { self.docs.is_empty() }

    pub fn iter(&self) -> impl Iterator<Item = (DocId, &Document)> {
        self.docs.iter().enumerate().map(|(i, d)| (i as DocId, d))
    }

    pub(crate) fn into_vec(self) -> Vec<Document> { self.docs }

    pub(crate) fn from_vec(docs: Vec<Document>) -> Self { Self { docs } }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvertedIndex {
    /// token -> number of documents containing it
    pub df: HashMap<String, u32>,
    /// per-document stats, indexed by doc id
    pub term_stats: Vec<TermStats>,
}

impl InvertedIndex {
    pub fn new() -> Self { Self::default() }

    /// Appends the next document's stats and bumps df once per distinct
    /// token. The new entry's position is its doc id.
    pub(crate) fn insert(&mut self, stats: TermStats) -> DocId {
        for token in stats.counts.keys() {
            *self.df.entry(token.clone()).or_insert(0) += 1;
        }
        self.term_stats.push(stats);
        (self.term_stats.len() - 1) as DocId
    }

    pub fn doc_frequency(&self, token: &str) -> u32 { self.df.get(token).copied().unwrap_or(0) }

    pub fn stats(&self, doc_id: DocId) -> Option<&TermStats> { self.term_stats.get(doc_id as usize) }

    pub fn num_terms(&self) -> usize { self.df.len() }
}

/// The complete mutable state of one engine: what gets snapshotted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexState {
    pub registry: DocumentRegistry,
    pub index: InvertedIndex,
    /// Identity of the folder this state was built from, if any.
    pub folder: Option<String>,
}

impl IndexState {
    pub fn new() -> Self { Self::default() }

    pub fn total_docs(&self) -> u32 { self.registry.len() as u32 }

    pub fn is_empty(&self) -> bool { self.registry.is_empty() }

    pub fn add(&mut self, doc: Document, stats: TermStats) -> DocId {
        let id = self.registry.register(doc);
        let stats_id = self.index.insert(stats);
        debug_assert_eq!(id, stats_id);
        id
    }

    /// Checks the engine-state invariants, returning the first violation found.
    pub fn validate(&self) -> std::result::Result<(), String> {
        let total = self.total_docs();
        if self.index.term_stats.len() != self.registry.len() {
            return Err(format!(
                "{} documents but {} term stat entries",
                self.registry.len(),
                self.index.term_stats.len()
            ));
        }
        for (token, &df) in &self.index.df {
            if df == 0 || df > total {
                return Err(format!("document frequency {df} for {token:?} outside 1..={total}"));
            }
        }
        for (id, stats) in self.index.term_stats.iter().enumerate() {
            let sum: u64 = stats.counts.values().map(|&c| c as u64).sum();
            if sum != stats.length as u64 {
                return Err(format!("document {id} has length {} but counts sum to {sum}", stats.length));
            }
        }
        Ok(())
    }
}
