//! HTTP API routes
//!
//! The JSON surface over the aggregation engine:
//! - `GET /api/search` — run one federated search
//! - `GET /api/suggest` — grouped autocomplete suggestions
//! - `GET /api/sources` — registered provider descriptors
//! - `GET /api/health/providers` — provider configuration summary
//! - `GET /api/metrics/providers` — rolling latency/error metrics
//! - `GET /api/item` — point lookup into the in-memory item index
//!
//! Responses are never cached by intermediaries (`cache-control:
//! no-store`); CORS is permissive so browser frontends on other origins
//! can call the API directly.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Query, State},
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use serde::Deserialize;
use serde_json::json;
use tower_http::cors::CorsLayer;
use tower_http::set_header::SetResponseHeaderLayer;

use fabsearch_core::{SearchEngine, SearchError, SearchRequest};

/// Build the API router around one engine instance.
pub fn router(engine: Arc<SearchEngine>) -> Router {
    Router::new()
        .route("/api/search", get(search))
        .route("/api/suggest", get(suggest))
        .route("/api/sources", get(sources))
        .route("/api/health/providers", get(provider_health))
        .route("/api/metrics/providers", get(provider_metrics))
        .route("/api/item", get(item))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::CACHE_CONTROL,
            HeaderValue::from_static("no-store"),
        ))
        .layer(CorsLayer::permissive())
        .with_state(engine)
}

async fn search(
    State(engine): State<Arc<SearchEngine>>,
    Query(request): Query<SearchRequest>,
) -> Response {
    match engine.execute(&request).await {
        Ok(payload) => (StatusCode::OK, Json(payload)).into_response(),
        Err(SearchError::EmptyQuery) => (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "Missing ?q= query" })),
        )
            .into_response(),
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SuggestParams {
    q: String,
}

async fn suggest(
    State(engine): State<Arc<SearchEngine>>,
    Query(params): Query<SuggestParams>,
) -> Response {
    Json(json!({ "suggestions": engine.suggestions(&params.q) })).into_response()
}

async fn sources(State(engine): State<Arc<SearchEngine>>) -> Response {
    Json(json!({ "sources": engine.registry().descriptors() })).into_response()
}

async fn provider_health(State(engine): State<Arc<SearchEngine>>) -> Response {
    let providers: Vec<_> = engine
        .registry()
        .descriptors()
        .into_iter()
        .map(|descriptor| {
            json!({
                "id": descriptor.id,
                "label": descriptor.label,
                "mode": descriptor.mode,
                "configured": descriptor.configured,
                "isPublic": descriptor.is_public,
                "supports": descriptor.supports,
            })
        })
        .collect();
    Json(json!({
        "ok": true,
        "total": providers.len(),
        "providers": providers,
    }))
    .into_response()
}

async fn provider_metrics(State(engine): State<Arc<SearchEngine>>) -> Response {
    Json(json!({ "metrics": engine.metrics() })).into_response()
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ItemParams {
    source: String,
    id: String,
}

async fn item(
    State(engine): State<Arc<SearchEngine>>,
    Query(params): Query<ItemParams>,
) -> Response {
    match engine.item(&params.source, &params.id) {
        Some(item) => Json(json!({ "item": item })).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "Item not found in cache" })),
        )
            .into_response(),
    }
}
