use anyhow::Result;
use axum::{extract::{Path, Query, State}, http::{HeaderMap, StatusCode}, routing::{get, post}, Json, Router};
use parking_lot::RwLock;
use retrieval::render::{highlight, keyword_pattern};
use retrieval::tokenizer::tokenize;
use retrieval::{DocId, IndexConfig, InvertedIndex, Posting, VsmModel};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchMode {
    #[default]
    Ranked,
    Vsm,
}

#[derive(Deserialize)]
pub struct SearchParams {
    pub q: String,
    #[serde(default = "default_k")]
    pub k: usize,
    #[serde(default)]
    pub mode: SearchMode,
}
fn default_k() -> usize { 10 }

#[derive(Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub took_s: f64,
    pub total_hits: usize,
    pub results: Vec<SearchHit>,
}

#[derive(Serialize)]
pub struct SearchHit {
    pub doc_id: DocId,
    pub score: f64,
    pub title: String,
    pub snippet: String,
}

#[derive(Serialize)]
pub struct Stats {
    pub num_docs: u32,
    pub num_terms: usize,
    pub avdl: f64,
    pub b: f64,
    pub k: f64,
    pub normalization: String,
    pub built_at: String,
}

/// Everything a query reads. Built once, never mutated afterwards.
pub struct Snapshot {
    pub index: InvertedIndex,
    pub vsm: VsmModel,
    pub built_at: String,
}

impl Snapshot {
    pub fn build(corpus: &std::path::Path, config: &IndexConfig) -> retrieval::Result<Self> {
        let index = InvertedIndex::read_from_file(corpus, config.bm25)?;
        let vsm = VsmModel::build(&index, config.normalization);
        let built_at = time::OffsetDateTime::now_utc()
            .format(&time::format_description::well_known::Rfc3339)
            .unwrap_or_default();
        Ok(Self { index, vsm, built_at })
    }

    fn stats(&self) -> Stats {
        let params = self.index.params();
        Stats {
            num_docs: self.index.num_docs(),
            num_terms: self.index.num_terms(),
            avdl: self.index.avdl(),
            b: params.b,
            k: params.k, // null in JSON when infinite
            normalization: self.vsm.normalization().to_string(),
            built_at: self.built_at.clone(),
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    /// Readers clone the inner `Arc` and release the lock before querying;
    /// only a rebuild takes the write lock, and only to swap.
    pub snapshot: Arc<RwLock<Arc<Snapshot>>>,
    pub corpus: PathBuf,
    pub config: IndexConfig,
    pub admin_token: Option<String>,
}

impl AppState {
    fn current(&self) -> Arc<Snapshot> {
        self.snapshot.read().clone()
    }
}

pub struct ServerOptions {
    pub corpus: PathBuf,
    pub config: IndexConfig,
    pub admin_token: Option<String>,
}

impl ServerOptions {
    /// `ADMIN_TOKEN` from the environment guards the rebuild endpoint.
    pub fn new(corpus: PathBuf, config: IndexConfig) -> Self {
        Self { corpus, config, admin_token: std::env::var("ADMIN_TOKEN").ok() }
    }
}

pub fn build_app(opts: ServerOptions) -> Result<Router> {
    // Build the index at startup; a corpus error aborts before serving.
    let snapshot = Snapshot::build(&opts.corpus, &opts.config)?;
    tracing::info!(corpus = %opts.corpus.display(), num_docs = snapshot.index.num_docs(), "index ready");
    let app_state = AppState {
        snapshot: Arc::new(RwLock::new(Arc::new(snapshot))),
        corpus: opts.corpus,
        config: opts.config,
        admin_token: opts.admin_token,
    };

    // CORS: read CORS_ALLOW_ORIGIN (comma-separated) or allow Any by default
    let cors = match std::env::var("CORS_ALLOW_ORIGIN") {
        Ok(val) => {
            let origins: Vec<_> = val
                .split(',')
                .filter_map(|s| s.trim().parse().ok())
                .collect();
            if origins.is_empty() {
                CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any)
            } else {
                CorsLayer::new().allow_origin(AllowOrigin::list(origins)).allow_methods(Any).allow_headers(Any)
            }
        }
        Err(_) => CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any),
    };

    let app = Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/search", get(search_handler))
        .route("/doc/:doc_id", get(doc_handler))
        .route("/stats", get(stats_handler))
        .route("/index/rebuild", post(rebuild_handler))
        .with_state(app_state)
        .layer(cors);
    Ok(app)
}

type ApiError = (StatusCode, Json<serde_json::Value>);

fn api_error(status: StatusCode, msg: impl Into<String>) -> ApiError {
    (status, Json(serde_json::json!({ "error": msg.into() })))
}

pub async fn search_handler(State(state): State<AppState>, Query(params): Query<SearchParams>) -> Result<Json<SearchResponse>, ApiError> {
    let start = std::time::Instant::now();
    let snapshot = state.current();
    let keywords = tokenize(&params.q);

    // Ranked mode skips unknown words, VSM mode rejects the query.
    let hits: Vec<Posting> = match params.mode {
        SearchMode::Ranked => snapshot.index.process_query(&keywords, false),
        SearchMode::Vsm => snapshot
            .vsm
            .process_query(&keywords)
            .map_err(|e| api_error(StatusCode::BAD_REQUEST, e.to_string()))?,
    };

    let k = params.k.clamp(1, 100);
    let pattern = keyword_pattern(&keywords);
    let results: Vec<SearchHit> = hits
        .iter()
        .take(k)
        .filter_map(|hit| {
            let doc = snapshot.index.document(hit.doc_id)?;
            Some(SearchHit {
                doc_id: hit.doc_id,
                score: hit.weight,
                title: doc.title.clone(),
                snippet: highlight(&doc.description, pattern.as_ref(), "<em>", "</em>"),
            })
        })
        .collect();

    tracing::debug!(query = %params.q, mode = ?params.mode, total_hits = hits.len(), "search");
    Ok(Json(SearchResponse { query: params.q, took_s: start.elapsed().as_secs_f64(), total_hits: hits.len(), results }))
}

pub async fn doc_handler(State(state): State<AppState>, Path(doc_id): Path<DocId>) -> Result<Json<serde_json::Value>, ApiError> {
    let snapshot = state.current();
    match snapshot.index.document(doc_id) {
        Some(doc) => Ok(Json(serde_json::json!({
            "doc_id": doc.id,
            "title": doc.title,
            "description": doc.description,
            "length": doc.length,
        }))),
        None => Err(api_error(StatusCode::NOT_FOUND, "not found")),
    }
}

pub async fn stats_handler(State(state): State<AppState>) -> Json<Stats> {
    Json(state.current().stats())
}

async fn rebuild_handler(State(state): State<AppState>, headers: HeaderMap) -> Result<Json<Stats>, ApiError> {
    authorize(&state, &headers)?;
    let corpus = state.corpus.clone();
    let config = state.config;
    let fresh = tokio::task::spawn_blocking(move || Snapshot::build(&corpus, &config))
        .await
        .map_err(|e| api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?
        .map_err(|e| api_error(StatusCode::UNPROCESSABLE_ENTITY, e.to_string()))?;
    let stats = fresh.stats();
    *state.snapshot.write() = Arc::new(fresh);
    tracing::info!(num_docs = stats.num_docs, num_terms = stats.num_terms, "index rebuilt");
    Ok(Json(stats))
}

fn authorize(state: &AppState, headers: &HeaderMap) -> Result<(), ApiError> {
    let required = match &state.admin_token {
        Some(t) => t,
        None => return Err(api_error(StatusCode::UNAUTHORIZED, "ADMIN_TOKEN not set")),
    };
    let provided = headers.get("X-ADMIN-TOKEN").and_then(|v| v.to_str().ok()).unwrap_or("");
    if provided == required {
        Ok(())
    } else {
        Err(api_error(StatusCode::UNAUTHORIZED, "invalid admin token"))
    }
}
