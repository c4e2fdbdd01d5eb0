use anyhow::Result;
use clap::Parser;
use songsift_preview::{PreviewResolver, ResolverConfig, DEFAULT_BASE_URL, DEFAULT_MARKER_ID};
use std::time::Duration;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "preview")]
#[command(about = "Resolve the preview audio URL of one track and print it as JSON")]
struct Cli {
    /// Streaming service track id
    #[arg(long)]
    track_id: String,
    /// Embed page prefix the track id is appended to
    #[arg(long, default_value = DEFAULT_BASE_URL)]
    base_url: String,
    /// Request timeout seconds
    #[arg(long, default_value_t = 10)]
    timeout_secs: u64,
    /// User-Agent string sent with the request
    #[arg(long, default_value = "songsift-preview/0.1")]
    user_agent: String,
    /// id of the script element holding the encoded track data
    #[arg(long, default_value = DEFAULT_MARKER_ID)]
    marker_id: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).with_writer(std::io::stderr).init();
    let args = Cli::parse();

    let resolver = PreviewResolver::new(ResolverConfig {
        base_url: args.base_url,
        marker_id: args.marker_id,
        timeout: Duration::from_secs(args.timeout_secs),
        user_agent: args.user_agent,
    })?;

    let preview = resolver.resolve(&args.track_id).await?;
    println!("{}", serde_json::to_string(&preview)?);
    Ok(())
}
