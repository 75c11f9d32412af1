//! Embedding clients: text and page-image vectors over HTTP.
//!
//! Two trait seams keep the pipelines independent of any particular model
//! server. [`HttpTextEmbedder`] speaks the OpenAI-compatible `/embeddings`
//! shape; [`HttpImageEmbedder`] speaks a late-interaction server that returns
//! one vector per image patch (and per query token), so a page embeds to
//! `Vec<Vec<f32>>` rather than a single vector.
//!
//! Transient failures (transport errors, 429, 5xx) are retried with
//! exponential backoff: `retry_backoff_ms * 2^(attempt-1)`. Other HTTP errors
//! fail immediately — a 401 will not get better with waiting.

use crate::config::IndexingConfig;
use crate::error::MultidexError;
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

/// Produces one vector per input text.
#[async_trait]
pub trait TextEmbedder: Send + Sync {
    async fn embed_text(&self, text: &str) -> Result<Vec<f32>, MultidexError>;
}

/// Produces late-interaction (multi-vector) embeddings for page images and
/// for the queries matched against them.
#[async_trait]
pub trait ImageEmbedder: Send + Sync {
    async fn embed_image(&self, png: &[u8]) -> Result<Vec<Vec<f32>>, MultidexError>;
    async fn embed_query(&self, text: &str) -> Result<Vec<Vec<f32>>, MultidexError>;
}

/// Shared HTTP plumbing for both embedder flavours.
#[derive(Debug, Clone)]
struct HttpClient {
    client: reqwest::Client,
    base_url: String,
    model: String,
    max_retries: u32,
    retry_backoff_ms: u64,
}

impl HttpClient {
    fn new(base_url: &str, model: &str, config: &IndexingConfig) -> Result<Self, MultidexError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| MultidexError::Internal(format!("http client: {e}")))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            max_retries: config.max_retries,
            retry_backoff_ms: config.retry_backoff_ms,
        })
    }

    fn retryable(status: StatusCode) -> bool {
        status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
    }

    async fn post_json<T: DeserializeOwned>(
        &self,
        path: &str,
        body: &serde_json::Value,
    ) -> Result<T, MultidexError> {
        let url = format!("{}{}", self.base_url, path);
        let mut last_err = String::new();

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let backoff = self.retry_backoff_ms * 2u64.pow(attempt - 1);
                warn!("retry {}/{} for {url} after {backoff}ms", attempt, self.max_retries);
                sleep(Duration::from_millis(backoff)).await;
            }

            let response = match self.client.post(&url).json(body).send().await {
                Ok(r) => r,
                Err(e) => {
                    last_err = format!("transport: {e}");
                    continue;
                }
            };

            let status = response.status();
            if status.is_success() {
                return response
                    .json::<T>()
                    .await
                    .map_err(|e| MultidexError::EmbeddingFailed(format!("bad response body: {e}")));
            }

            let body_text = response.text().await.unwrap_or_default();
            last_err = format!("HTTP {status}: {body_text}");
            if !Self::retryable(status) {
                break;
            }
        }

        Err(MultidexError::EmbeddingFailed(format!("{url}: {last_err}")))
    }
}

// ── Text ─────────────────────────────────────────────────────────────────

/// OpenAI-compatible `/embeddings` client (single vector per text).
#[derive(Debug, Clone)]
pub struct HttpTextEmbedder {
    http: HttpClient,
}

#[derive(Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingRow>,
}

#[derive(Deserialize)]
struct EmbeddingRow {
    embedding: Vec<f32>,
}

impl HttpTextEmbedder {
    pub fn new(
        base_url: &str,
        model: &str,
        config: &IndexingConfig,
    ) -> Result<Self, MultidexError> {
        Ok(Self {
            http: HttpClient::new(base_url, model, config)?,
        })
    }
}

#[async_trait]
impl TextEmbedder for HttpTextEmbedder {
    async fn embed_text(&self, text: &str) -> Result<Vec<f32>, MultidexError> {
        let body = json!({ "model": self.http.model, "input": [text] });
        let mut response: EmbeddingsResponse = self.http.post_json("/embeddings", &body).await?;
        let row = response
            .data
            .pop()
            .ok_or_else(|| MultidexError::EmbeddingFailed("empty data array".into()))?;
        debug!("embedded {} bytes of text → dim {}", text.len(), row.embedding.len());
        Ok(row.embedding)
    }
}

// ── Images / queries ─────────────────────────────────────────────────────

/// Late-interaction embedding client: `/embed/images` for page images,
/// `/embed/queries` for query text. Images travel base64-encoded.
#[derive(Debug, Clone)]
pub struct HttpImageEmbedder {
    http: HttpClient,
}

#[derive(Deserialize)]
struct MultiVectorResponse {
    embeddings: Vec<Vec<Vec<f32>>>,
}

impl HttpImageEmbedder {
    pub fn new(
        base_url: &str,
        model: &str,
        config: &IndexingConfig,
    ) -> Result<Self, MultidexError> {
        Ok(Self {
            http: HttpClient::new(base_url, model, config)?,
        })
    }

    async fn single(
        &self,
        path: &str,
        body: serde_json::Value,
    ) -> Result<Vec<Vec<f32>>, MultidexError> {
        let mut response: MultiVectorResponse = self.http.post_json(path, &body).await?;
        response
            .embeddings
            .pop()
            .ok_or_else(|| MultidexError::EmbeddingFailed("empty embeddings array".into()))
    }
}

#[async_trait]
impl ImageEmbedder for HttpImageEmbedder {
    async fn embed_image(&self, png: &[u8]) -> Result<Vec<Vec<f32>>, MultidexError> {
        let body = json!({
            "model": self.http.model,
            "images": [STANDARD.encode(png)],
        });
        self.single("/embed/images", body).await
    }

    async fn embed_query(&self, text: &str) -> Result<Vec<Vec<f32>>, MultidexError> {
        let body = json!({
            "model": self.http.model,
            "queries": [text],
        });
        self.single("/embed/queries", body).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    fn test_config(max_retries: u32) -> IndexingConfig {
        IndexingConfig::builder()
            .max_retries(max_retries)
            .retry_backoff_ms(1)
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn embed_text_parses_openai_shape() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/embeddings")
                    .json_body_partial(r#"{"input": ["hello"]}"#);
                then.status(200)
                    .json_body(serde_json::json!({"data": [{"embedding": [0.1, 0.2, 0.3]}]}));
            })
            .await;

        let embedder =
            HttpTextEmbedder::new(&server.base_url(), "test-model", &test_config(0)).unwrap();
        let v = embedder.embed_text("hello").await.unwrap();
        assert_eq!(v, vec![0.1, 0.2, 0.3]);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn embed_image_sends_base64_and_parses_multivector() {
        let server = MockServer::start_async().await;
        let encoded = STANDARD.encode(b"pngbytes");
        let mock = server
            .mock_async(move |when, then| {
                when.method(POST)
                    .path("/embed/images")
                    .body_contains(&encoded);
                then.status(200).json_body(serde_json::json!({
                    "embeddings": [[[1.0, 0.0], [0.0, 1.0]]]
                }));
            })
            .await;

        let embedder =
            HttpImageEmbedder::new(&server.base_url(), "test-model", &test_config(0)).unwrap();
        let v = embedder.embed_image(b"pngbytes").await.unwrap();
        assert_eq!(v, vec![vec![1.0, 0.0], vec![0.0, 1.0]]);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn server_errors_are_retried_until_exhausted() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/embeddings");
                then.status(503).body("overloaded");
            })
            .await;

        let embedder =
            HttpTextEmbedder::new(&server.base_url(), "test-model", &test_config(2)).unwrap();
        let err = embedder.embed_text("hello").await.unwrap_err();
        assert!(err.to_string().contains("503"));
        // initial attempt + 2 retries
        mock.assert_hits_async(3).await;
    }

    #[tokio::test]
    async fn client_errors_fail_fast() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/embed/queries");
                then.status(401).body("bad key");
            })
            .await;

        let embedder =
            HttpImageEmbedder::new(&server.base_url(), "test-model", &test_config(3)).unwrap();
        let err = embedder.embed_query("q").await.unwrap_err();
        assert!(err.to_string().contains("401"));
        mock.assert_hits_async(1).await;
    }
}
