//! LLM extraction: document summaries and concept relationships.
//!
//! The extractor drives an OpenAI-compatible chat-completions endpoint and
//! parses JSON replies with serde. Models occasionally disobey the
//! JSON-only instruction and wrap their reply in fences; those are stripped
//! before parsing, and a reply that still fails to parse counts as a failed
//! attempt and is retried like a transport error.

use crate::config::IndexingConfig;
use crate::error::MultidexError;
use crate::prompts::{EXTRACTION_SYSTEM_PROMPT, RELATIONSHIPS_INSTRUCTION, SUMMARY_INSTRUCTION};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

/// A document summary extracted by the LLM.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentSummary {
    pub title: String,
    pub summary: String,
}

/// A `(subject, predicate, object)` relationship between two concepts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relationship {
    pub subject: String,
    pub predicate: String,
    pub object: String,
}

/// Extraction seam: the knowledge-graph pipeline depends on this trait,
/// not on any particular model endpoint.
#[async_trait]
pub trait Extractor: Send + Sync {
    async fn summarize(&self, content: &str) -> Result<DocumentSummary, MultidexError>;
    async fn relationships(&self, content: &str) -> Result<Vec<Relationship>, MultidexError>;
}

/// Chat-completions client for extraction.
#[derive(Debug, Clone)]
pub struct HttpExtractor {
    client: reqwest::Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
    max_retries: u32,
    retry_backoff_ms: u64,
}

impl HttpExtractor {
    pub fn new(
        base_url: &str,
        model: &str,
        api_key: Option<&str>,
        config: &IndexingConfig,
    ) -> Result<Self, MultidexError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| MultidexError::Internal(format!("http client: {e}")))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            api_key: api_key.map(str::to_string),
            max_retries: config.max_retries,
            retry_backoff_ms: config.retry_backoff_ms,
        })
    }

    /// One instruction + document → parsed JSON value of type `T`.
    ///
    /// Parse failures are treated as retryable: the next attempt re-asks
    /// the model rather than giving up on the document immediately.
    async fn extract<T: DeserializeOwned>(
        &self,
        instruction: &str,
        content: &str,
    ) -> Result<T, MultidexError> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = json!({
            "model": self.model,
            "temperature": 0.0,
            "response_format": { "type": "json_object" },
            "messages": [
                { "role": "system", "content": EXTRACTION_SYSTEM_PROMPT },
                { "role": "user", "content": format!("{instruction}\n\n{content}") },
            ],
        });

        let mut last_err = String::new();

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let backoff = self.retry_backoff_ms * 2u64.pow(attempt - 1);
                warn!("extraction retry {}/{} after {backoff}ms", attempt, self.max_retries);
                sleep(Duration::from_millis(backoff)).await;
            }

            let mut request = self.client.post(&url).json(&body);
            if let Some(key) = &self.api_key {
                request = request.bearer_auth(key);
            }

            let response = match request.send().await {
                Ok(r) => r,
                Err(e) => {
                    last_err = format!("transport: {e}");
                    continue;
                }
            };

            let status = response.status();
            if !status.is_success() {
                let text = response.text().await.unwrap_or_default();
                last_err = format!("HTTP {status}: {text}");
                if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
                    continue;
                }
                break;
            }

            let chat: ChatResponse = match response.json().await {
                Ok(c) => c,
                Err(e) => {
                    last_err = format!("bad response body: {e}");
                    continue;
                }
            };
            let content = match chat.choices.into_iter().next() {
                Some(choice) => choice.message.content,
                None => {
                    last_err = "empty choices array".into();
                    continue;
                }
            };

            match parse_json_reply::<T>(&content) {
                Ok(value) => {
                    debug!("extraction succeeded on attempt {}", attempt + 1);
                    return Ok(value);
                }
                Err(e) => {
                    last_err = format!("unparseable reply: {e}");
                }
            }
        }

        Err(MultidexError::ExtractionFailed(last_err))
    }
}

#[async_trait]
impl Extractor for HttpExtractor {
    async fn summarize(&self, content: &str) -> Result<DocumentSummary, MultidexError> {
        self.extract(SUMMARY_INSTRUCTION, content).await
    }

    async fn relationships(&self, content: &str) -> Result<Vec<Relationship>, MultidexError> {
        let wrapper: RelationshipList = self.extract(RELATIONSHIPS_INSTRUCTION, content).await?;
        Ok(wrapper.relationships)
    }
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    content: String,
}

/// Accepts either the requested `{"relationships": [...]}` wrapper or a
/// bare top-level array.
#[derive(Deserialize)]
#[serde(untagged)]
enum RelationshipListRepr {
    Wrapped { relationships: Vec<Relationship> },
    Bare(Vec<Relationship>),
}

struct RelationshipList {
    relationships: Vec<Relationship>,
}

impl<'de> Deserialize<'de> for RelationshipList {
    fn deserialize<D: serde::Deserializer<'de>>(de: D) -> Result<Self, D::Error> {
        let repr = RelationshipListRepr::deserialize(de)?;
        let relationships = match repr {
            RelationshipListRepr::Wrapped { relationships } => relationships,
            RelationshipListRepr::Bare(relationships) => relationships,
        };
        Ok(RelationshipList { relationships })
    }
}

static RE_JSON_FENCES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^```(?:json)?\s*\n(.*)\n```\s*$").unwrap());

/// Strip an outer code fence (if any) and parse the remainder as JSON.
fn parse_json_reply<T: DeserializeOwned>(reply: &str) -> Result<T, serde_json::Error> {
    let trimmed = reply.trim();
    let inner = match RE_JSON_FENCES.captures(trimmed) {
        Some(caps) => caps.get(1).unwrap().as_str().trim(),
        None => trimmed,
    };
    serde_json::from_str(inner)
}
