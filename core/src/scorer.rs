//! Saturating TF-IDF without document-length normalization.
//!
//! `tf = tc * 2.0 / (tc + 1.5)` approaches 2.0 as `tc` grows and is 0.8 for a
//! single occurrence. `idf = log10(N / (df + 1)) + 1.0` stays positive for any
//! `df <= N`, so a token present in every document still contributes.

use crate::index::{DocId, InvertedIndex};

pub const TF_CEILING: f64 = 2.0;
pub const TF_DAMPING: f64 = 1.5;
pub const IDF_OFFSET: f64 = 1.0;

#[inline]
pub fn saturated_tf(term_count: u32) -> f64 {
    let tc = term_count as f64;
    (tc * TF_CEILING) / (tc + TF_DAMPING)
}

#[inline]
pub fn idf(total_docs: u32, doc_frequency: u32) -> f64 {
    (total_docs as f64 / (doc_frequency as f64 + 1.0)).log10() + IDF_OFFSET
}

/// Scores one document. Query tokens are taken as given, so a token repeated
/// in the query contributes once per repetition.
pub fn score(index: &InvertedIndex, total_docs: u32, query_tokens: &[String], doc_id: DocId) -> f64 {
    let Some(stats) = index.stats(doc_id) else { return 0.0 };
    if stats.length == 0 {
        return 0.0;
    }
    let mut total = 0.0;
    for token in query_tokens {
        let tc = stats.count(token);
        if tc == 0 {
            continue;
        }
        total += saturated_tf(tc) * idf(total_docs, index.doc_frequency(token));
    }
    total
}
