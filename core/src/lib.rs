//! Offline full-text search over a folder of documents: indexing, saturating
//! TF-IDF ranking, and per-folder snapshots.

pub mod analysis;
pub mod config;
pub mod engine;
pub mod error;
pub mod index;
pub mod indexer;
pub mod persist;
pub mod ranker;
pub mod scorer;
pub mod source;
pub mod stopwords;
pub mod tokenizer;
pub mod worker;

pub use analysis::Analyzer;
pub use config::EngineConfig;
pub use engine::SearchEngine;
pub use error::{EngineError, Result};
pub use index::{DocId, Document, DocumentRegistry, IndexState, InvertedIndex, TermStats};
pub use indexer::{Indexer, SourceItem};
pub use persist::{folder_key, identity_key, normalize_folder, IndexPaths, MetaFile};
pub use ranker::{SearchHit, DEFAULT_TOP_K};
pub use source::FolderSource;
pub use stopwords::StopWords;
pub use tokenizer::{JiebaTokenizer, Tokenizer, TokenizerKind, WordTokenizer};
pub use worker::{EngineWorker, JobKind, Pending, WorkerStatus};
