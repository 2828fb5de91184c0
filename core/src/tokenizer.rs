use jieba_rs::Jieba;
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use unicode_normalization::UnicodeNormalization;

lazy_static! {
    static ref WORD_RE: Regex = Regex::new(r"(?u)\p{L}[\p{L}\p{N}_']*").expect("valid regex");
    static ref JIEBA: Jieba = Jieba::new();
}

/// Splits raw text into an ordered sequence of tokens.
///
/// Implementations must be deterministic: the same text always yields the
/// same tokens, since index-time and query-time output are compared verbatim.
pub trait Tokenizer: Send + Sync {
    fn tokenize(&self, text: &str) -> Vec<String>;

    fn name(&self) -> &str;
}

/// Dictionary segmenter for Chinese (and mixed) text. Tokens are returned
/// as segmented, including whitespace runs; the analyzer drops blanks.
#[derive(Debug, Default, Clone, Copy)]
pub struct JiebaTokenizer;

impl Tokenizer for JiebaTokenizer {
    fn tokenize(&self, text: &str) -> Vec<String> {
        JIEBA.cut(text, true).into_iter().map(str::to_string).collect()
    }

    fn name(&self) -> &str { "jieba" }
}

/// NFKC-normalized, lowercased runs starting with a letter.
#[derive(Debug, Default, Clone, Copy)]
pub struct WordTokenizer;

impl Tokenizer for WordTokenizer {
    fn tokenize(&self, text: &str) -> Vec<String> {
        let normalized = text.nfkc().collect::<String>().to_lowercase();
        WORD_RE.find_iter(&normalized).map(|m| m.as_str().to_string()).collect()
    }

    fn name(&self) -> &str { "word" }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenizerKind {
    #[default]
    Jieba,
    Word,
}

impl TokenizerKind {
    pub fn build(self) -> Arc<dyn Tokenizer> {
        match self {
            TokenizerKind::Jieba => Arc::new(JiebaTokenizer),
            TokenizerKind::Word => Arc::new(WordTokenizer),
        }
    }
}

impl FromStr for TokenizerKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "jieba" => Ok(TokenizerKind::Jieba),
            "word" => Ok(TokenizerKind::Word),
            other => Err(format!("unknown tokenizer {other:?} (expected jieba or word)")),
        }
    }
}

impl fmt::Display for TokenizerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TokenizerKind::Jieba => "jieba",
            TokenizerKind::Word => "word",
        })
    }
}
