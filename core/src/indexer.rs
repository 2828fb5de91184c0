use crate::analysis::Analyzer;
use crate::index::{DocId, Document, IndexState, TermStats};

/// One extracted document as handed over by a content source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceItem {
    pub text: String,
    pub locator: String,
    pub title: String,
}

impl SourceItem {
    pub fn new(text: impl Into<String>, locator: impl Into<String>, title: impl Into<String>) -> Self {
        Self { text: text.into(), locator: locator.into(), title: title.into() }
    }
}

const PROGRESS_EVERY: usize = 10;

pub struct Indexer<'a> {
    analyzer: &'a Analyzer,
}

impl<'a> Indexer<'a> {
    pub fn new(analyzer: &'a Analyzer) -> Self { Self { analyzer } }

    /// Adds one item to `state`. Items whose text is blank are skipped and
    /// yield `None`.
    pub fn add(&self, state: &mut IndexState, item: SourceItem) -> Option<DocId> {
        if item.text.trim().is_empty() {
            tracing::debug!(locator = %item.locator, "skipping document without text");
            return None;
        }
        let stats = TermStats::from_tokens(self.analyzer.analyze(&item.text));
        let doc = Document { text: item.text, title: item.title, locator: item.locator };
        Some(state.add(doc, stats))
    }

    /// Builds a fresh state from `items`. Nothing from any earlier state is kept.
    pub fn build<I>(&self, items: I, folder: Option<String>) -> IndexState
    where
        I: IntoIterator<Item = SourceItem>,
    {
        let mut state = IndexState { folder, ..IndexState::default() };
        let mut skipped = 0usize;
        for item in items {
            match self.add(&mut state, item) {
                Some(id) => {
                    let indexed = id as usize + 1;
                    if indexed % PROGRESS_EVERY == 0 {
                        tracing::info!(indexed, "indexing in progress");
                    }
                }
                None => skipped += 1,
            }
        }
        tracing::info!(
            num_docs = state.total_docs(),
            num_terms = state.index.num_terms(),
            skipped,
            "indexing complete"
        );
        state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stopwords::StopWords;
    use crate::tokenizer::WordTokenizer;
    use std::sync::Arc;

    fn analyzer() -> Analyzer {
        Analyzer::new(Arc::new(WordTokenizer), StopWords::new(["的"]))
    }

    #[test]
    fn blank_items_are_not_registered() {
        let a = analyzer();
        let state = Indexer::new(&a).build(
            vec![
                SourceItem::new("  \n", "/a", "a"),
                SourceItem::new("猫", "/b", "b"),
            ],
            None,
        );
        assert_eq!(state.total_docs(), 1);
        assert_eq!(state.registry.get(0).unwrap().title, "b");
    }

    #[test]
    fn stop_word_only_document_has_zero_length() {
        let a = analyzer();
        let state = Indexer::new(&a).build(vec![SourceItem::new("的 的", "/a", "a")], None);
        assert_eq!(state.total_docs(), 1);
        let stats = state.index.stats(0).unwrap();
        assert_eq!(stats.length, 0);
        assert!(stats.counts.is_empty());
        assert!(state.index.df.is_empty());
    }

    #[test]
    fn repeated_tokens_bump_df_once() {
        let a = analyzer();
        let state = Indexer::new(&a).build(
            vec![SourceItem::new("cat cat cat", "/a", "a"), SourceItem::new("cat dog", "/b", "b")],
            Some("/corpus".into()),
        );
        assert_eq!(state.index.doc_frequency("cat"), 2);
        assert_eq!(state.index.doc_frequency("dog"), 1);
        assert_eq!(state.index.stats(0).unwrap().count("cat"), 3);
        assert_eq!(state.folder.as_deref(), Some("/corpus"));
        assert!(state.validate().is_ok());
    }
}
