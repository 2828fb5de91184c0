use criterion::{criterion_group, criterion_main, Criterion};
use localsearch_core::{IndexPaths, SearchEngine, SourceItem, StopWords, WordTokenizer};
use std::sync::Arc;

const WORDS: &[&str] = &[
    "index", "search", "rank", "token", "folder", "snapshot", "query", "score", "engine", "worker", "document",
    "frequency", "saturation", "persist", "analyze",
];

fn corpus(n: usize) -> Vec<SourceItem> {
    (0..n)
        .map(|i| {
            let text: Vec<&str> = (0..200).map(|j| WORDS[(i * 7 + j * 13 + j / 5) % WORDS.len()]).collect();
            SourceItem::new(text.join(" "), format!("/bench/{i}.txt"), format!("{i}.txt"))
        })
        .collect()
}

fn engine() -> SearchEngine {
    SearchEngine::with_tokenizer(StopWords::new(["the"]), Arc::new(WordTokenizer), IndexPaths::new("./target/bench-index"))
}

fn bench_rebuild(c: &mut Criterion) {
    let docs = corpus(500);
    c.bench_function("rebuild_500_docs", |b| {
        b.iter(|| {
            let mut e = engine();
            e.rebuild(docs.clone(), None)
        })
    });
}

fn bench_query(c: &mut Criterion) {
    let mut e = engine();
    e.rebuild(corpus(2_000), None);
    c.bench_function("query_2000_docs", |b| b.iter(|| e.query("saturation snapshot worker", 20)));
}

criterion_group!(benches, bench_rebuild, bench_query);
criterion_main!(benches);
