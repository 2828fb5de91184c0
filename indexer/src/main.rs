use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use localsearch_core::persist::list_indexes;
use localsearch_core::{folder_key, EngineConfig, EngineWorker, FolderSource, SearchHit, TokenizerKind};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing_subscriber::{fmt, EnvFilter};

const PREVIEW_CHARS: usize = 60;

#[derive(Parser)]
#[command(name = "indexer")]
#[command(about = "Build and query local full-text indexes", long_about = None)]
struct Cli {
    /// JSON config file (index_dir, stop_words, tokenizer, default_top_k)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Directory holding index snapshots
    #[arg(long, global = true)]
    index_dir: Option<PathBuf>,
    /// Stop-word file, one word per line
    #[arg(long, global = true)]
    stopwords: Option<PathBuf>,
    /// Tokenizer: jieba or word
    #[arg(long, global = true)]
    tokenizer: Option<TokenizerKind>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Index every supported file under a folder, replacing any previous index
    Build {
        #[arg(long)]
        folder: PathBuf,
    },
    /// Query a folder's saved index
    Search {
        #[arg(long)]
        folder: PathBuf,
        #[arg(long, short = 'q')]
        query: String,
        /// Number of results (defaults to the configured top-k)
        #[arg(short = 'k', long = "top-k")]
        top_k: Option<usize>,
        /// Print results as JSON
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// List indexed folders
    List,
}

#[derive(Serialize)]
struct JsonHit<'a> {
    score: u8,
    title: &'a str,
    locator: &'a str,
    preview: String,
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();
    let config = resolve_config(&cli)?;

    match cli.command {
        Commands::Build { folder } => build_index(&config, &folder),
        Commands::Search { folder, query, top_k, json } => {
            search_index(&config, &folder, &query, top_k.unwrap_or(config.default_top_k), json)
        }
        Commands::List => list(&config),
    }
}

fn resolve_config(cli: &Cli) -> Result<EngineConfig> {
    let mut config = EngineConfig::load(cli.config.as_deref()).context("loading configuration")?;
    if let Some(dir) = &cli.index_dir {
        config.index_dir = dir.clone();
    }
    if let Some(file) = &cli.stopwords {
        config.stop_words = Some(file.clone());
    }
    if let Some(kind) = cli.tokenizer {
        config.tokenizer = kind;
    }
    Ok(config)
}

fn spawn_worker(config: &EngineConfig) -> Result<EngineWorker> {
    let engine = config.build_engine()?;
    Ok(EngineWorker::spawn(engine)?)
}

fn build_index(config: &EngineConfig, folder: &Path) -> Result<()> {
    if !folder.is_dir() {
        bail!("{} is not a directory", folder.display());
    }
    let worker = spawn_worker(config)?;
    tracing::info!(folder = %folder.display(), key = %folder_key(folder), "scanning folder");

    let meta = worker.rebuild_and_save(FolderSource::new(folder), folder)?.wait().context("building index")?;
    println!("indexed {} documents from {}", meta.num_docs, folder.display());
    Ok(())
}

fn search_index(config: &EngineConfig, folder: &Path, query: &str, top_k: usize, json: bool) -> Result<()> {
    let worker = spawn_worker(config)?;
    let key = folder_key(folder);
    if let Err(e) = worker.load_snapshot(key.as_str())?.wait() {
        if e.is_no_index() {
            eprintln!("no usable index for {} ({e}); run `indexer build --folder {}` first", folder.display(), folder.display());
            return Ok(());
        }
        return Err(e.into());
    }
    let hits = worker.query(query, top_k)?.wait()?;

    if json {
        let out: Vec<JsonHit> = hits
            .iter()
            .map(|h| JsonHit { score: h.display_score, title: &h.title, locator: &h.locator, preview: preview(h, query) })
            .collect();
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    println!("found {} matching documents", hits.len());
    for hit in &hits {
        println!("[{}] ({})", hit.title, hit.display_score);
        println!("   path: {}", hit.locator);
        println!("   preview: {}", preview(hit, query));
    }
    Ok(())
}

fn list(config: &EngineConfig) -> Result<()> {
    let metas = list_indexes(&config.paths())?;
    if metas.is_empty() {
        println!("no indexes in {}", config.index_dir.display());
    }
    for meta in metas {
        println!(
            "{}  {:>6} docs  {}  {}",
            meta.key,
            meta.num_docs,
            meta.created_at,
            meta.folder.as_deref().unwrap_or("-")
        );
    }
    Ok(())
}

/// A single-line excerpt around the first literal occurrence of the query,
/// or the start of the text when it does not occur verbatim.
fn preview(hit: &SearchHit, query: &str) -> String {
    let text = hit.text.as_str();
    let needle = query.trim();
    let start = match (!needle.is_empty()).then(|| text.find(needle)).flatten() {
        Some(byte_idx) => {
            let chars_before = text[..byte_idx].chars().count();
            let skip = chars_before.saturating_sub(PREVIEW_CHARS / 3);
            text.char_indices().nth(skip).map(|(i, _)| i).unwrap_or(0)
        }
        None => 0,
    };
    let excerpt: String = text[start..].chars().take(PREVIEW_CHARS).collect();
    let mut line = excerpt.split_whitespace().collect::<Vec<_>>().join(" ");
    if text[start..].chars().count() > PREVIEW_CHARS {
        line.push_str("...");
    }
    line
}
