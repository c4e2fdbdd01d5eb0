use anyhow::Result;
use axum::{
    extract::{Form, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use songsift_core::load::load_catalog;
use songsift_core::{Attribute, Catalog, QueryEngine, QueryError, QueryRequest, SharedCatalog, Track, Weights};
use songsift_preview::{Preview, PreviewError, PreviewResolver, ResolverConfig};
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub data_dir: PathBuf,
    pub songs_per_page: NonZeroUsize,
    pub preview: ResolverConfig,
    /// Enables `POST /admin/reload` when set.
    pub admin_token: Option<String>,
    /// Comma-separated allowed origins; any origin when unset or empty.
    pub cors_allow_origin: Option<String>,
}

#[derive(Clone)]
pub struct AppState {
    pub catalog: Arc<SharedCatalog>,
    pub page_size: NonZeroUsize,
    pub resolver: PreviewResolver,
    pub data_dir: PathBuf,
    pub admin_token: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub records: Vec<Track>,
    pub page: usize,
    pub max_page: usize,
    pub page_size: usize,
    pub total_hits: usize,
    pub took_s: f64,
}

#[derive(Debug, Serialize)]
pub struct CatalogMeta {
    pub tracks: usize,
    pub max_tempo: u32,
    pub max_duration_seconds: u32,
    pub page_size: usize,
    pub attributes: Vec<&'static str>,
}

#[derive(Deserialize)]
pub struct PreviewParams {
    pub track_id: String,
}

pub enum ApiError {
    Query(QueryError),
    Preview(PreviewError),
    Unauthorized(String),
    Internal(anyhow::Error),
}

impl From<QueryError> for ApiError {
    fn from(e: QueryError) -> Self {
        ApiError::Query(e)
    }
}

impl From<PreviewError> for ApiError {
    fn from(e: PreviewError) -> Self {
        ApiError::Preview(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, kind, message) = match self {
            ApiError::Query(e) => {
                let status = match e {
                    QueryError::InvalidQuery(_) => StatusCode::BAD_REQUEST,
                    QueryError::DegenerateNormalization { .. } => StatusCode::UNPROCESSABLE_ENTITY,
                };
                (status, e.kind(), e.to_string())
            }
            ApiError::Preview(e) => {
                let status = match e {
                    PreviewError::InvalidTrackId(_) => StatusCode::BAD_REQUEST,
                    PreviewError::ResourceNotFound { .. } => StatusCode::NOT_FOUND,
                    PreviewError::AmbiguousResource { .. }
                    | PreviewError::MalformedResource(_)
                    | PreviewError::UpstreamUnavailable(_) => StatusCode::BAD_GATEWAY,
                };
                (status, e.kind(), e.to_string())
            }
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "Unauthorized", msg),
            ApiError::Internal(e) => {
                tracing::error!(error = %format!("{e:#}"), "request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal", format!("{e:#}"))
            }
        };
        (status, Json(serde_json::json!({ "error": kind, "message": message }))).into_response()
    }
}

pub fn build_app(config: AppConfig) -> Result<Router> {
    let catalog = load_catalog(&config.data_dir)?;
    build_app_with_catalog(config, catalog)
}

pub fn build_app_with_catalog(config: AppConfig, catalog: Catalog) -> Result<Router> {
    let resolver = PreviewResolver::new(config.preview.clone())?;
    let app_state = AppState {
        catalog: Arc::new(SharedCatalog::new(catalog)),
        page_size: config.songs_per_page,
        resolver,
        data_dir: config.data_dir.clone(),
        admin_token: config.admin_token.clone(),
    };

    let app = Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/search", get(search_handler))
        .route("/json", post(form_search_handler))
        .route("/preview_url", get(preview_handler))
        .route("/catalog/meta", get(meta_handler))
        .route("/admin/reload", post(reload_handler))
        .with_state(app_state)
        .layer(cors_layer(config.cors_allow_origin.as_deref()))
        .layer(TraceLayer::new_for_http());
    Ok(app)
}

fn cors_layer(allow_origin: Option<&str>) -> CorsLayer {
    let origins: Vec<_> = allow_origin
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .filter_map(|s| s.parse().ok())
        .collect();
    if origins.is_empty() {
        CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any)
    } else {
        CorsLayer::new().allow_origin(AllowOrigin::list(origins)).allow_methods(Any).allow_headers(Any)
    }
}

/// Turn decoded `search`, `page` and `<attribute>=<weight>` fields into a query.
/// Missing page means 1, an empty weight means 0.
pub fn parse_query_params(params: &[(String, String)]) -> Result<QueryRequest, QueryError> {
    let mut request = QueryRequest::default();
    let mut weights = Weights::new();
    for (key, value) in params {
        let value = value.trim();
        match key.as_str() {
            "search" => request.search_term = value.to_string(),
            "page" if value.is_empty() => request.page = 1,
            "page" => {
                request.page = value
                    .parse()
                    .map_err(|_| QueryError::invalid(format!("page must be an integer, got {value:?}")))?;
            }
            name => {
                let attribute: Attribute = name.parse()?;
                let weight = if value.is_empty() {
                    0.0
                } else {
                    value
                        .parse::<f64>()
                        .map_err(|_| QueryError::invalid(format!("weight for {attribute} must be a number, got {value:?}")))?
                };
                weights.set(attribute, weight)?;
            }
        }
    }
    request.weights = weights;
    Ok(request)
}

fn run_query(state: &AppState, params: &[(String, String)]) -> Result<SearchResponse, ApiError> {
    let start = std::time::Instant::now();
    let request = parse_query_params(params)?;
    let engine = QueryEngine::new(state.catalog.snapshot(), state.page_size);
    let result = engine.query(&request)?;
    Ok(SearchResponse {
        records: result.records.into_iter().cloned().collect(),
        page: result.page,
        max_page: result.max_page,
        page_size: result.page_size,
        total_hits: result.total_hits,
        took_s: start.elapsed().as_secs_f64(),
    })
}

pub async fn search_handler(
    State(state): State<AppState>,
    Query(params): Query<Vec<(String, String)>>,
) -> Result<Json<SearchResponse>, ApiError> {
    run_query(&state, &params).map(Json)
}

pub async fn form_search_handler(
    State(state): State<AppState>,
    Form(params): Form<Vec<(String, String)>>,
) -> Result<Json<SearchResponse>, ApiError> {
    run_query(&state, &params).map(Json)
}

pub async fn preview_handler(
    State(state): State<AppState>,
    Query(params): Query<PreviewParams>,
) -> Result<Json<Preview>, ApiError> {
    let preview = state.resolver.resolve(params.track_id.trim()).await?;
    Ok(Json(preview))
}

pub async fn meta_handler(State(state): State<AppState>) -> Json<CatalogMeta> {
    let catalog = state.catalog.snapshot();
    Json(CatalogMeta {
        tracks: catalog.len(),
        max_tempo: catalog.normalization().max_tempo(),
        max_duration_seconds: catalog.normalization().max_duration_seconds(),
        page_size: state.page_size.get(),
        attributes: Attribute::ALL.iter().map(|a| a.name()).collect(),
    })
}

/// Reload the catalog from the data directory and swap it in. A failed load keeps the live catalog.
async fn reload_handler(State(state): State<AppState>, headers: HeaderMap) -> Result<Json<serde_json::Value>, ApiError> {
    authorize(&state, &headers)?;
    let data_dir = state.data_dir.clone();
    let catalog = tokio::task::spawn_blocking(move || load_catalog(data_dir))
        .await
        .map_err(|e| ApiError::Internal(e.into()))?
        .map_err(ApiError::Internal)?;
    let tracks = catalog.len();
    let previous = state.catalog.replace(catalog);
    tracing::info!(tracks, previous = previous.len(), "catalog reloaded");
    Ok(Json(serde_json::json!({ "tracks": tracks, "previous": previous.len() })))
}

fn authorize(state: &AppState, headers: &HeaderMap) -> Result<(), ApiError> {
    let required = match &state.admin_token {
        Some(t) => t,
        None => return Err(ApiError::Unauthorized("ADMIN_TOKEN not set".into())),
    };
    let provided = headers.get("X-ADMIN-TOKEN").and_then(|v| v.to_str().ok()).unwrap_or("");
    if provided == required {
        Ok(())
    } else {
        Err(ApiError::Unauthorized("invalid admin token".into()))
    }
}
