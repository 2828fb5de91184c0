use crate::stopwords::StopWords;
use crate::tokenizer::Tokenizer;
use std::fmt;
use std::sync::Arc;

/// Tokenizer plus filters, shared by indexing and querying so both sides
/// see identical tokens.
#[derive(Clone)]
pub struct Analyzer {
    tokenizer: Arc<dyn Tokenizer>,
    stop_words: StopWords,
}

impl Analyzer {
    pub fn new(tokenizer: Arc<dyn Tokenizer>, stop_words: StopWords) -> Self {
        Self { tokenizer, stop_words }
    }

    /// Tokenizes and drops stop words and blank tokens. Order is preserved.
    pub fn analyze(&self, text: &str) -> Vec<String> {
        self.tokenizer
            .tokenize(text)
            .into_iter()
            .filter(|t| !t.trim().is_empty() && !self.stop_words.contains(t))
            .collect()
    }

    /// Like `analyze`, but a query made only of stop words falls back to the
    /// trimmed query as one literal token.
    pub fn analyze_query(&self, raw: &str) -> Vec<String> {
        let tokens = self.analyze(raw);
        let trimmed = raw.trim();
        if tokens.is_empty() && !trimmed.is_empty() {
            return vec![trimmed.to_string()];
        }
        tokens
    }

    pub fn stop_words(&self) -> &StopWords { &self.stop_words }

    pub fn tokenizer_name(&self) -> &str { self.tokenizer.name() }
}

impl fmt::Debug for Analyzer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Analyzer")
            .field("tokenizer", &self.tokenizer.name())
            .field("stop_words", &self.stop_words.len())
            .finish()
    }
}
