use anyhow::{Context, Result};
use axum::Router;
use clap::Parser;
use localsearch_core::EngineConfig;
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing_subscriber::{fmt, EnvFilter};
use server::{build_app, ServerOptions};
use tokio::net::TcpListener;

#[derive(Parser)]
struct Args {
    /// JSON config file
    #[arg(long)]
    config: Option<PathBuf>,
    /// Directory holding index snapshots
    #[arg(long)]
    index_dir: Option<PathBuf>,
    /// Folder whose saved index is loaded at startup
    #[arg(long)]
    folder: Option<PathBuf>,
    /// Host to bind
    #[arg(long, default_value = "0.0.0.0")]
    host: String,
    /// Port to bind
    #[arg(long, default_value_t = 8080)]
    port: u16,
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let args = Args::parse();
    let mut config = EngineConfig::load(args.config.as_deref()).context("loading configuration")?;
    if let Some(dir) = args.index_dir {
        config.index_dir = dir;
    }
    let options = ServerOptions { preload: args.folder, ..ServerOptions::from_env() };
    let app: Router = build_app(config, options)?;

    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, "server listening");
    axum::serve(listener, app).await?;
    Ok(())
}
