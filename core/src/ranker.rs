use crate::analysis::Analyzer;
use crate::error::{EngineError, Result};
use crate::index::{DocId, IndexState};
use crate::scorer;
use serde::{Deserialize, Serialize};

pub const DEFAULT_TOP_K: usize = 20;
pub const MAX_DISPLAY_SCORE: u8 = 99;

/// One ranked result. `display_score` is only comparable within the result
/// set it came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub doc_id: DocId,
    pub display_score: u8,
    pub raw_score: f64,
    pub title: String,
    pub locator: String,
    pub text: String,
}

/// Scales `raw` against the best score of the result set into `0..=99`.
pub fn display_score(raw: f64, max_raw: f64) -> u8 {
    if max_raw <= 0.0 || !max_raw.is_finite() {
        return 0;
    }
    let scaled = ((raw / max_raw) * MAX_DISPLAY_SCORE as f64).floor();
    scaled.clamp(0.0, MAX_DISPLAY_SCORE as f64) as u8
}

/// Scores every document against `raw_query` and returns the best `top_k`,
/// most relevant first. Ties are broken by ascending document id.
pub fn rank(state: &IndexState, analyzer: &Analyzer, raw_query: &str, top_k: usize) -> Result<Vec<SearchHit>> {
    if top_k == 0 {
        return Err(EngineError::InvalidTopK);
    }
    let tokens = analyzer.analyze_query(raw_query);
    if tokens.is_empty() {
        return Ok(Vec::new());
    }

    let total_docs = state.total_docs();
    let mut scored: Vec<(DocId, f64)> = (0..total_docs)
        .filter_map(|doc_id| {
            let s = scorer::score(&state.index, total_docs, &tokens, doc_id);
            (s > 0.0).then_some((doc_id, s))
        })
        .collect();
    if scored.iter().any(|(_, s)| !s.is_finite()) {
        return Err(EngineError::Internal(format!("non-finite score for query {raw_query:?}")));
    }

    let max_raw = scored.iter().map(|&(_, s)| s).fold(0.0f64, f64::max);
    scored.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    let total_hits = scored.len();
    scored.truncate(top_k);

    let mut hits = Vec::with_capacity(scored.len());
    for (doc_id, raw) in scored {
        let doc = state
            .registry
            .get(doc_id)
            .ok_or_else(|| EngineError::Internal(format!("document {doc_id} missing from registry")))?;
        hits.push(SearchHit {
            doc_id,
            display_score: display_score(raw, max_raw),
            raw_score: raw,
            title: doc.title.clone(),
            locator: doc.locator.clone(),
            text: doc.text.clone(),
        });
    }
    tracing::debug!(query = raw_query, ?tokens, total_hits, returned = hits.len(), "ranked query");
    Ok(hits)
}
