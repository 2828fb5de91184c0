use crate::engine::SearchEngine;
use crate::error::{EngineError, Result};
use crate::persist::IndexPaths;
use crate::ranker::DEFAULT_TOP_K;
use crate::stopwords::StopWords;
use crate::tokenizer::TokenizerKind;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const ENV_INDEX_DIR: &str = "LOCALSEARCH_INDEX_DIR";
pub const ENV_STOPWORDS: &str = "LOCALSEARCH_STOPWORDS";
pub const ENV_TOKENIZER: &str = "LOCALSEARCH_TOKENIZER";
pub const ENV_TOP_K: &str = "LOCALSEARCH_TOP_K";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Directory holding `index_<key>.bin` snapshots.
    pub index_dir: PathBuf,
    /// One stop word per line. None means no stop words.
    pub stop_words: Option<PathBuf>,
    pub tokenizer: TokenizerKind,
    pub default_top_k: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            index_dir: PathBuf::from("./indexes"),
            stop_words: None,
            tokenizer: TokenizerKind::default(),
            default_top_k: DEFAULT_TOP_K,
        }
    }
}

impl EngineConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)?;
        let config: EngineConfig = serde_json::from_str(&text)
            .map_err(|e| EngineError::Config(format!("{}: {e}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults, then the optional JSON file, then environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let base = match path {
            Some(p) => Self::from_file(p)?,
            None => Self::default(),
        };
        base.with_env(|k| std::env::var(k).ok())
    }

    /// Applies overrides from `lookup` (normally the process environment).
    pub fn with_env<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(dir) = lookup(ENV_INDEX_DIR) {
            self.index_dir = PathBuf::from(dir);
        }
        if let Some(file) = lookup(ENV_STOPWORDS) {
            self.stop_words = Some(PathBuf::from(file));
        }
        if let Some(kind) = lookup(ENV_TOKENIZER) {
            self.tokenizer = kind.parse().map_err(EngineError::Config)?;
        }
        if let Some(k) = lookup(ENV_TOP_K) {
            self.default_top_k = k
                .trim()
                .parse()
                .map_err(|e| EngineError::Config(format!("{ENV_TOP_K}={k:?}: {e}")))?;
        }
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<()> {
        if self.default_top_k == 0 {
            return Err(EngineError::Config("default_top_k must be at least 1".into()));
        }
        Ok(())
    }

    pub fn paths(&self) -> IndexPaths { IndexPaths::new(&self.index_dir) }

    /// Loads the stop words (a configured but unreadable file is an error)
    /// and builds an empty engine.
    pub fn build_engine(&self) -> Result<SearchEngine> {
        let stop_words = match &self.stop_words {
            Some(path) => StopWords::load(path)?,
            None => StopWords::default(),
        };
        tracing::debug!(tokenizer = %self.tokenizer, stop_words = stop_words.len(), index_dir = %self.index_dir.display(), "building engine");
        Ok(SearchEngine::with_tokenizer(stop_words, self.tokenizer.build(), self.paths()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |k| map.get(k).cloned()
    }

    #[test]
    fn env_overrides_defaults() {
        let cfg = EngineConfig::default()
            .with_env(env(&[(ENV_INDEX_DIR, "/var/idx"), (ENV_TOKENIZER, "word"), (ENV_TOP_K, "5")]))
            .unwrap();
        assert_eq!(cfg.index_dir, PathBuf::from("/var/idx"));
        assert_eq!(cfg.tokenizer, TokenizerKind::Word);
        assert_eq!(cfg.default_top_k, 5);
        assert_eq!(cfg.stop_words, None);
    }

    #[test]
    fn bad_env_values_are_config_errors() {
        let err = EngineConfig::default().with_env(env(&[(ENV_TOP_K, "lots")])).unwrap_err();
        assert!(matches!(err, EngineError::Config(_)));
        let err = EngineConfig::default().with_env(env(&[(ENV_TOP_K, "0")])).unwrap_err();
        assert!(matches!(err, EngineError::Config(_)));
        let err = EngineConfig::default().with_env(env(&[(ENV_TOKENIZER, "porter")])).unwrap_err();
        assert!(matches!(err, EngineError::Config(_)));
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{ "tokenizer": "word", "default_top_k": 3 }"#).unwrap();
        let cfg = EngineConfig::from_file(&path).unwrap();
        assert_eq!(cfg.tokenizer, TokenizerKind::Word);
        assert_eq!(cfg.default_top_k, 3);
        assert_eq!(cfg.index_dir, PathBuf::from("./indexes"));
    }

    #[test]
    fn unreadable_stop_words_fail_engine_build() {
        let cfg = EngineConfig { stop_words: Some("/definitely/missing/stop.txt".into()), ..EngineConfig::default() };
        assert!(matches!(cfg.build_engine(), Err(EngineError::StopWords { .. })));
    }
}
