use anyhow::{bail, Result};
use axum::Router;
use clap::Parser;
use songsift_preview::{ResolverConfig, DEFAULT_BASE_URL};
use songsift_server::{build_app, AppConfig};
use std::net::SocketAddr;
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
struct Args {
    /// Directory holding the catalog JSON/JSONL files
    #[arg(long, default_value = "data/")]
    data_dir: PathBuf,
    /// Tracks per result page
    #[arg(long, default_value_t = 20)]
    songs_per_page: usize,
    /// Host to bind
    #[arg(long, default_value = "0.0.0.0")]
    host: String,
    /// Port to bind
    #[arg(long, default_value_t = 8080)]
    port: u16,
    /// Embed page prefix used to resolve preview URLs
    #[arg(long, default_value = DEFAULT_BASE_URL)]
    preview_base_url: String,
    /// Timeout for one preview lookup, in seconds
    #[arg(long, default_value_t = 10)]
    preview_timeout_secs: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let args = Args::parse();
    let Some(songs_per_page) = NonZeroUsize::new(args.songs_per_page) else {
        bail!("--songs-per-page must be at least 1");
    };

    let config = AppConfig {
        data_dir: args.data_dir,
        songs_per_page,
        preview: ResolverConfig {
            base_url: args.preview_base_url,
            timeout: Duration::from_secs(args.preview_timeout_secs),
            ..Default::default()
        },
        admin_token: std::env::var("ADMIN_TOKEN").ok(),
        cors_allow_origin: std::env::var("CORS_ALLOW_ORIGIN").ok(),
    };
    let app: Router = build_app(config)?;

    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, "server listening");
    axum::serve(listener, app).await?;
    Ok(())
}
