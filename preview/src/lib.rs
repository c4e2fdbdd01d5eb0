//! Resolve a streamable preview URL for a track by scraping the streaming service's embed page.
//!
//! Each call runs Fetch → Parse → Extract → Decode once: no retries, no caching.

use anyhow::{anyhow, Result};
use reqwest::{header, Client, Url};
use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_BASE_URL: &str = "https://open.spotify.com/embed/track/";
pub const DEFAULT_MARKER_ID: &str = "resource";

#[derive(Debug, Clone)]
pub struct ResolverConfig {
    /// Embed page prefix, the track id is appended as the last path segment.
    pub base_url: String,
    /// `id` of the script element that carries the encoded track JSON.
    pub marker_id: String,
    pub timeout: Duration,
    pub user_agent: String,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            marker_id: DEFAULT_MARKER_ID.to_string(),
            timeout: Duration::from_secs(10),
            user_agent: concat!("songsift/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

#[derive(Debug, Error)]
pub enum PreviewError {
    #[error("invalid track id {0:?}")]
    InvalidTrackId(String),

    #[error("upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("embed document has no <script id=\"{marker}\"> element")]
    ResourceNotFound { marker: String },

    #[error("embed document has {count} <script id=\"{marker}\"> elements, expected one")]
    AmbiguousResource { marker: String, count: usize },

    #[error("malformed resource: {0}")]
    MalformedResource(String),
}

impl PreviewError {
    pub fn kind(&self) -> &'static str {
        match self {
            PreviewError::InvalidTrackId(_) => "InvalidTrackId",
            PreviewError::UpstreamUnavailable(_) => "UpstreamUnavailable",
            PreviewError::ResourceNotFound { .. } => "ResourceNotFound",
            PreviewError::AmbiguousResource { .. } => "AmbiguousResource",
            PreviewError::MalformedResource(_) => "MalformedResource",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preview {
    pub preview_url: String,
}

/// Find the single marker script element and return its trimmed text.
pub fn extract_resource(html: &str, marker_id: &str) -> Result<String, PreviewError> {
    let selector = marker_selector(marker_id).map_err(|e| PreviewError::MalformedResource(e.to_string()))?;
    let doc = Html::parse_document(html);
    let mut found = doc.select(&selector);
    let first = found.next().ok_or_else(|| PreviewError::ResourceNotFound { marker: marker_id.to_string() })?;
    let extra = found.count();
    if extra > 0 {
        return Err(PreviewError::AmbiguousResource { marker: marker_id.to_string(), count: extra + 1 });
    }
    let text = first.text().collect::<String>();
    let text = text.trim();
    if text.is_empty() {
        return Err(PreviewError::MalformedResource("marker element is empty".into()));
    }
    Ok(text.to_string())
}

/// Percent-decode the extracted text, parse it as JSON and read `preview_url`.
pub fn decode_resource(encoded: &str) -> Result<String, PreviewError> {
    let decoded = urlencoding::decode(encoded)
        .map_err(|e| PreviewError::MalformedResource(format!("percent-decoding: {e}")))?;
    let json: serde_json::Value = serde_json::from_str(&decoded)
        .map_err(|e| PreviewError::MalformedResource(format!("resource is not JSON: {e}")))?;
    match json.get("preview_url") {
        Some(serde_json::Value::String(url)) => Ok(url.clone()),
        Some(serde_json::Value::Null) | None => Err(PreviewError::MalformedResource("preview_url is absent".into())),
        Some(other) => Err(PreviewError::MalformedResource(format!("preview_url is not a string: {other}"))),
    }
}

fn marker_selector(marker_id: &str) -> Result<Selector> {
    let escaped = marker_id.replace('\\', "\\\\").replace('"', "\\\"");
    Selector::parse(&format!("script[id=\"{escaped}\"]")).map_err(|e| anyhow!("invalid marker id {marker_id:?}: {e}"))
}

fn valid_track_id(track_id: &str) -> bool {
    !track_id.is_empty() && track_id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// Stateless between calls; share one instance across tasks.
#[derive(Debug, Clone)]
pub struct PreviewResolver {
    client: Client,
    base_url: Url,
    marker_id: String,
}

impl PreviewResolver {
    pub fn new(config: ResolverConfig) -> Result<Self> {
        let mut base = config.base_url.clone();
        if !base.ends_with('/') {
            base.push('/');
        }
        let base_url = Url::parse(&base).map_err(|e| anyhow!("invalid preview base url {:?}: {e}", config.base_url))?;
        marker_selector(&config.marker_id)?;

        let client = Client::builder()
            .user_agent(config.user_agent)
            .redirect(reqwest::redirect::Policy::limited(5))
            .timeout(config.timeout)
            .build()?;
        Ok(Self { client, base_url, marker_id: config.marker_id })
    }

    pub fn embed_url(&self, track_id: &str) -> Result<Url, PreviewError> {
        if !valid_track_id(track_id) {
            return Err(PreviewError::InvalidTrackId(track_id.to_string()));
        }
        self.base_url
            .join(track_id)
            .map_err(|_| PreviewError::InvalidTrackId(track_id.to_string()))
    }

    async fn fetch(&self, url: Url) -> Result<String, PreviewError> {
        let resp = self
            .client
            .get(url.clone())
            .header(header::ACCEPT, "text/html")
            .send()
            .await
            .map_err(|e| {
                tracing::warn!(%url, error = %e, "embed fetch failed");
                PreviewError::UpstreamUnavailable(e.to_string())
            })?;
        let status = resp.status();
        if !status.is_success() {
            tracing::warn!(%url, %status, "embed fetch returned non-success status");
            return Err(PreviewError::UpstreamUnavailable(format!("{url} returned {status}")));
        }
        resp.text().await.map_err(|e| PreviewError::UpstreamUnavailable(e.to_string()))
    }

    pub async fn resolve(&self, track_id: &str) -> Result<Preview, PreviewError> {
        let url = self.embed_url(track_id)?;
        tracing::debug!(%url, "fetching embed document");
        let body = self.fetch(url).await?;
        let encoded = extract_resource(&body, &self.marker_id)?;
        tracing::debug!(track_id, bytes = encoded.len(), "resource element extracted");
        let preview_url = decode_resource(&encoded)?;
        Ok(Preview { preview_url })
    }
}
