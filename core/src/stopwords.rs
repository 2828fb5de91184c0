use crate::error::{EngineError, Result};
use std::collections::HashSet;
use std::fs;
use std::path::Path;

/// Tokens excluded from indexing and querying. Immutable once built.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StopWords {
    words: HashSet<String>,
}

impl StopWords {
    /// Builds the set from an ordered list; entries are trimmed and blanks dropped.
    pub fn new<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let words = words
            .into_iter()
            .filter_map(|w| {
                let w = w.as_ref().trim();
                (!w.is_empty()).then(|| w.to_string())
            })
            .collect();
        Self { words }
    }

    /// Reads one word per line from a UTF-8 file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .map_err(|source| EngineError::StopWords { path: path.to_path_buf(), source })?;
        let words = Self::new(text.lines());
        tracing::debug!(path = %path.display(), count = words.len(), "loaded stop words");
        Ok(words)
    }

    pub fn contains(&self, token: &str) -> bool { self.words.contains(token) }

    pub fn len(&self) -> usize { self.words.len() }

    pub fn is_empty(&self) -> bool { self.words.is_empty() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn blanks_are_ignored() {
        let sw = StopWords::new(["的", "  ", "", " 了 "]);
        assert_eq!(sw.len(), 2);
        assert!(sw.contains("了"));
    }

    #[test]
    fn load_reads_lines() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        writeln!(f, "的\n\n是\r\nthe").unwrap();
        let sw = StopWords::load(f.path()).unwrap();
        assert!(sw.contains("的"));
        assert!(sw.contains("是"));
        assert!(sw.contains("the"));
        assert_eq!(sw.len(), 3);
    }

    #[test]
    fn load_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = StopWords::load(dir.path().join("nope.txt")).unwrap_err();
        assert!(matches!(err, EngineError::StopWords { .. }));
    }
}
