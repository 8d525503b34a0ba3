use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post, put},
    Json, Router,
};
use searchcore::{
    parse_document, parse_partial, DocumentId, Engine, FieldInfo, SearchError, SearchHit,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

type ApiResult<T> = Result<Json<T>, (StatusCode, String)>;

#[derive(Deserialize)]
pub struct SearchParams {
    pub q: String,
    #[serde(default = "default_k")]
    pub k: usize,
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
pub struct StatsResponse {
    pub documents: u64,
    pub fields: Vec<FieldInfo>,
}

#[derive(Clone)]
pub struct AppState {
    pub engine: Engine,
    pub admin_token: Option<String>,
}

pub fn build_app(engine: Engine, admin_token: Option<String>) -> Router {
    let app_state = AppState { engine, admin_token };

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

    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/search", get(search_handler))
        .route("/stats", get(stats_handler))
        .route("/doc", post(add_handler))
        .route("/doc/:doc_id", get(doc_handler).patch(update_handler).delete(delete_handler))
        .route("/boosts", put(boosts_handler))
        .with_state(app_state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

fn error_response(err: SearchError) -> (StatusCode, String) {
    let status = match &err {
        SearchError::NotFound(_) => StatusCode::NOT_FOUND,
        SearchError::Validation(_) => StatusCode::BAD_REQUEST,
        SearchError::Indexing { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        SearchError::Storage(_) | SearchError::Corrupt { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if status.is_server_error() {
        tracing::error!(error = %err, "request failed");
    }
    (status, err.to_string())
}

/// sled is blocking, so engine calls leave the async workers.
async fn blocking<T, F>(f: F) -> Result<T, (StatusCode, String)>
where
    F: FnOnce() -> searchcore::Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?
        .map_err(error_response)
}

fn parse_id(raw: &str) -> Result<DocumentId, (StatusCode, String)> {
    DocumentId::parse(raw).map_err(error_response)
}

pub async fn search_handler(State(state): State<AppState>, Query(params): Query<SearchParams>) -> ApiResult<SearchResponse> {
    let start = std::time::Instant::now();
    let k = params.k.clamp(1, 100);
    let query = params.q.clone();
    let results = blocking(move || state.engine.search_with_limit(&query, Some(k))).await?;
    Ok(Json(SearchResponse {
        query: params.q,
        took_s: start.elapsed().as_secs_f64(),
        total_hits: results.len(),
        results,
    }))
}

pub async fn doc_handler(State(state): State<AppState>, Path(doc_id): Path<String>) -> ApiResult<searchcore::StoredDocument> {
    let id = parse_id(&doc_id)?;
    let found = blocking(move || state.engine.get(&id)).await?;
    found
        .map(Json)
        .ok_or((StatusCode::NOT_FOUND, format!("document {doc_id} not found")))
}

pub async fn stats_handler(State(state): State<AppState>) -> ApiResult<StatsResponse> {
    let stats = blocking(move || {
        Ok(StatsResponse { documents: state.engine.count()?, fields: state.engine.field_boosts()? })
    })
    .await?;
    Ok(Json(stats))
}

async fn add_handler(State(state): State<AppState>, headers: HeaderMap, Json(body): Json<serde_json::Value>) -> ApiResult<serde_json::Value> {
    authorize(&state, &headers)?;
    let doc = parse_document(body).map_err(error_response)?;
    let id = blocking(move || state.engine.add(doc)).await?;
    Ok(Json(serde_json::json!({ "id": id })))
}

async fn update_handler(State(state): State<AppState>, headers: HeaderMap, Path(doc_id): Path<String>, Json(body): Json<serde_json::Value>) -> ApiResult<serde_json::Value> {
    authorize(&state, &headers)?;
    let id = parse_id(&doc_id)?;
    let partial = parse_partial(body).map_err(error_response)?;
    let engine = state.engine.clone();
    let updated = id.clone();
    blocking(move || engine.update(&updated, partial)).await?;
    Ok(Json(serde_json::json!({ "id": id })))
}

async fn delete_handler(State(state): State<AppState>, headers: HeaderMap, Path(doc_id): Path<String>) -> ApiResult<serde_json::Value> {
    authorize(&state, &headers)?;
    let id = parse_id(&doc_id)?;
    let deleted = blocking(move || state.engine.delete(&id)).await?;
    Ok(Json(serde_json::json!({ "deleted": deleted })))
}

async fn boosts_handler(State(state): State<AppState>, headers: HeaderMap, Json(weights): Json<BTreeMap<String, f32>>) -> ApiResult<Vec<FieldInfo>> {
    authorize(&state, &headers)?;
    let fields = blocking(move || {
        state.engine.set_field_boosts(&weights)?;
        state.engine.field_boosts()
    })
    .await?;
    Ok(Json(fields))
}

fn authorize(state: &AppState, headers: &HeaderMap) -> Result<(), (StatusCode, String)> {
    let required = match &state.admin_token {
        Some(t) => t,
        None => return Err((StatusCode::UNAUTHORIZED, "ADMIN_TOKEN not set".into())),
    };
    let provided = headers.get("X-ADMIN-TOKEN").and_then(|v| v.to_str().ok()).unwrap_or("");
    if provided == required {
        Ok(())
    } else {
        Err((StatusCode::UNAUTHORIZED, "invalid admin token".into()))
    }
}
