use anyhow::Result;
use axum::Router;
use clap::Parser;
use retrieval::{Bm25Params, IndexConfig, Normalization};
use server::{build_app, ServerOptions};
use std::net::SocketAddr;
use std::path::PathBuf;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
struct Args {
    /// Corpus file, one `<title>TAB<description>` per line
    #[arg(long)]
    corpus: PathBuf,
    /// JSON file with `bm25` and `normalization` settings
    #[arg(long)]
    config: Option<PathBuf>,
    /// BM25 length normalization strength
    #[arg(long)]
    b: Option<f64>,
    /// BM25 term frequency saturation
    #[arg(long)]
    k: Option<f64>,
    /// Column normalization used by `mode=vsm`: none, l1, l2, l3
    #[arg(long)]
    normalization: Option<Normalization>,
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

    let base = match &args.config {
        Some(path) => IndexConfig::from_json_file(path)?,
        None => IndexConfig { bm25: Bm25Params::default(), normalization: Normalization::L2 },
    };
    let config = base.with_overrides(args.b, args.k, args.normalization);
    config.validate()?;

    let app: Router = build_app(ServerOptions::new(args.corpus.clone(), config))?.layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, "server listening");
    axum::serve(listener, app).await?;
    Ok(())
}
