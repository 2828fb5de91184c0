use localsearch_core::{Analyzer, JiebaTokenizer, StopWords, Tokenizer, WordTokenizer};
use std::sync::Arc;

#[test]
fn it_normalizes_without_stemming() {
    let words = WordTokenizer.tokenize("Running Runners RUN! ｆｕｌｌｗｉｄｔｈ");
    assert_eq!(words, vec!["running", "runners", "run", "fullwidth"]);
}

#[test]
fn it_segments_chinese() {
    let words = JiebaTokenizer.tokenize("我喜欢猫");
    assert!(words.contains(&"喜欢".to_string()), "{words:?}");
    assert_eq!(words.concat(), "我喜欢猫");
}

#[test]
fn it_filters_stopwords() {
    let analyzer = Analyzer::new(Arc::new(JiebaTokenizer), StopWords::new(["的", "是"]));
    let words = analyzer.analyze("猫 是 我 的 朋友");
    assert!(!words.contains(&"的".to_string()));
    assert!(!words.contains(&"是".to_string()));
    assert!(words.iter().all(|w| !w.trim().is_empty()));
}

#[test]
fn query_and_document_analysis_agree() {
    let analyzer = Analyzer::new(Arc::new(WordTokenizer), StopWords::new(["the"]));
    assert_eq!(analyzer.analyze("The Quick fox"), analyzer.analyze_query("the quick FOX"));
}
