use crate::analysis::Analyzer;
use crate::error::Result;
use crate::index::IndexState;
use crate::indexer::{Indexer, SourceItem};
use crate::persist::{self, IndexPaths, MetaFile};
use crate::ranker::{self, SearchHit};
use crate::stopwords::StopWords;
use crate::tokenizer::{JiebaTokenizer, Tokenizer};
use std::sync::Arc;

/// One search engine: analyzer, index state, and where snapshots live.
/// Not shared across threads for mutation; see `EngineWorker`.
#[derive(Debug)]
pub struct SearchEngine {
    analyzer: Analyzer,
    state: IndexState,
    paths: IndexPaths,
}

impl SearchEngine {
    /// An empty engine using the default (jieba) tokenizer.
    pub fn new<I, S>(stop_words: I, paths: IndexPaths) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self::with_tokenizer(StopWords::new(stop_words), Arc::new(JiebaTokenizer), paths)
    }

    pub fn with_tokenizer(stop_words: StopWords, tokenizer: Arc<dyn Tokenizer>, paths: IndexPaths) -> Self {
        Self { analyzer: Analyzer::new(tokenizer, stop_words), state: IndexState::default(), paths }
    }

    /// Replaces the whole index with one built from `source` and returns the
    /// number of documents indexed. The old state stays in place until the
    /// new one is complete.
    pub fn rebuild<I>(&mut self, source: I, folder: Option<String>) -> usize
    where
        I: IntoIterator<Item = SourceItem>,
    {
        let state = Indexer::new(&self.analyzer).build(source, folder);
        let count = state.total_docs() as usize;
        self.state = state;
        count
    }

    /// Rebuilds from `source` and saves the result under the key of
    /// `folder`, the normalized folder identity.
    pub fn rebuild_and_save<I>(&mut self, source: I, folder: String) -> Result<MetaFile>
    where
        I: IntoIterator<Item = SourceItem>,
    {
        let key = persist::identity_key(&folder);
        self.rebuild(source, Some(folder));
        self.save_snapshot(&key)
    }

    pub fn query(&self, raw_query: &str, top_k: usize) -> Result<Vec<SearchHit>> {
        ranker::rank(&self.state, &self.analyzer, raw_query, top_k)
    }

    pub fn save_snapshot(&self, key: &str) -> Result<MetaFile> {
        persist::save_snapshot(&self.paths, key, &self.state)
    }

    /// Restores the state saved under `key`. On failure the engine is left
    /// empty, exactly as if freshly constructed.
    pub fn load_snapshot(&mut self, key: &str) -> Result<()> {
        match persist::load_snapshot(&self.paths, key) {
            Ok(state) => {
                self.state = state;
                Ok(())
            }
            Err(e) => {
                self.reset();
                if e.is_no_index() {
                    tracing::warn!(key, error = %e, "no usable index, rebuild required");
                }
                Err(e)
            }
        }
    }

    pub fn reset(&mut self) { self.state = IndexState::default(); }

    pub fn state(&self) -> &IndexState { &self.state }

    pub fn total_docs(&self) -> u32 { self.state.total_docs() }

    pub fn folder(&self) -> Option<&str> { self.state.folder.as_deref() }

    pub fn analyzer(&self) -> &Analyzer { &self.analyzer }

    pub fn paths(&self) -> &IndexPaths { &self.paths }
}

