//! REST search surface: `GET /search?q=…&limit=5`.
//!
//! The handler is a pass-through: embed the query text, run the pgvector
//! similarity query, return the ranked rows unchanged as JSON. Connection
//! pooling lives in [`ChunkStore`]; the pool is created before the listener
//! starts and closed after graceful shutdown, so no request can observe a
//! half-initialised process.

use crate::error::MultidexError;
use crate::pipeline::embed::TextEmbedder;
use crate::store::postgres::ChunkStore;
use crate::store::ChunkHit;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{error, info};

/// Everything a request handler needs, cloned per request.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<ChunkStore>,
    pub embedder: Arc<dyn TextEmbedder>,
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    /// Search query text.
    pub q: String,
    /// Number of results to return.
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_limit() -> usize {
    5
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub results: Vec<ChunkHit>,
}

/// Build the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/search", get(search_endpoint))
        .with_state(state)
}

async fn search_endpoint(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<SearchResponse>, ApiError> {
    let limit = params.limit.clamp(1, 100);
    let embedding = state.embedder.embed_text(&params.q).await?;
    let results = state.store.search(embedding, limit).await?;
    Ok(Json(SearchResponse { results }))
}

/// Bind `addr`, serve until ctrl-c, then close the pool.
pub async fn serve(addr: SocketAddr, state: AppState) -> Result<(), MultidexError> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| MultidexError::Internal(format!("bind {addr}: {e}")))?;
    info!("search API listening on http://{addr}");

    let store = Arc::clone(&state.store);
    let result = axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| MultidexError::Internal(format!("server: {e}")));

    // Release the pool on every exit path, error included.
    store.close().await;
    info!("search API stopped, pool closed");
    result
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("shutdown signal received");
}

/// Maps library errors onto a JSON 500. The handler has no caller-induced
/// failure modes beyond an unreachable store or embedder.
struct ApiError(MultidexError);

impl From<MultidexError> for ApiError {
    fn from(e: MultidexError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        error!("search request failed: {}", self.0);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": self.0.to_string() })),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Uri;

    #[test]
    fn search_params_default_limit() {
        let uri: Uri = "http://localhost/search?q=hello".parse().unwrap();
        let Query(params) = Query::<SearchParams>::try_from_uri(&uri).unwrap();
        assert_eq!(params.q, "hello");
        assert_eq!(params.limit, 5);
    }

    #[test]
    fn search_params_explicit_limit() {
        let uri: Uri = "http://localhost/search?q=hi&limit=12".parse().unwrap();
        let Query(params) = Query::<SearchParams>::try_from_uri(&uri).unwrap();
        assert_eq!(params.limit, 12);
    }

    #[test]
    fn search_params_require_query() {
        let uri: Uri = "http://localhost/search".parse().unwrap();
        assert!(Query::<SearchParams>::try_from_uri(&uri).is_err());
    }

    #[test]
    fn search_response_serialises_rows_unchanged() {
        let response = SearchResponse {
            results: vec![ChunkHit {
                filename: "notes.md".into(),
                text: "snippet".into(),
                score: 0.91,
            }],
        };
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["results"][0]["filename"], "notes.md");
        assert_eq!(json["results"][0]["score"], 0.91);
    }
}
