//! Embedding backends for the semantic signal.
//!
//! `AppState` holds an `Arc<dyn EmbeddingProvider>`, chosen once at startup.
//! A failing provider never fails a ranking run; the ranker degrades to
//! lexical-only scoring and reports why.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::EmbeddingSettings;

const MAX_RETRIES: u32 = 3;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("no embedding backend configured")]
    NotConfigured,

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("embedding API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("expected {expected} embeddings, got {got}")]
    CountMismatch { expected: usize, got: usize },

    #[error("embedding API still failing after {retries} attempts")]
    Exhausted { retries: u32 },
}

// ────────────────────────────────────────────────────────────────────────────
// Trait definition
// ────────────────────────────────────────────────────────────────────────────

/// Turns texts into dense vectors. One vector per input, in input order.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Backend name, for logs.
    fn name(&self) -> &'static str;

    /// Whether calling `embed` can succeed at all.
    fn is_available(&self) -> bool {
        true
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError>;
}

/// Placeholder backend used when semantic matching is off or unconfigured.
pub struct NoEmbeddings;

#[async_trait]
impl EmbeddingProvider for NoEmbeddings {
    fn name(&self) -> &'static str {
        "none"
    }

    fn is_available(&self) -> bool {
        false
    }

    async fn embed(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        Err(EmbeddingError::NotConfigured)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// HttpEmbeddingProvider (OpenAI-compatible /v1/embeddings)
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingDatum>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingDatum {
    embedding: Vec<f32>,
    index: usize,
}

#[derive(Clone)]
pub struct HttpEmbeddingProvider {
    client: Client,
    api_url: String,
    api_key: Option<String>,
    model: String,
}

impl HttpEmbeddingProvider {
    pub fn new(
        api_url: String,
        api_key: Option<String>,
        model: String,
    ) -> Result<Self, EmbeddingError> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            client,
            api_url,
            api_key,
            model,
        })
    }
}

#[async_trait]
impl EmbeddingProvider for HttpEmbeddingProvider {
    fn name(&self) -> &'static str {
        "http"
    }

    /// Retries on 429 and 5xx with exponential backoff (1s, 2s).
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let body = EmbeddingRequest {
            model: &self.model,
            input: texts,
        };

        let mut last_error: Option<EmbeddingError> = None;

        for attempt in 0..MAX_RETRIES {
            if attempt > 0 {
                let delay = Duration::from_millis(1000 * (1 << (attempt - 1)));
                warn!(
                    "Embedding call attempt {} failed, retrying after {}ms...",
                    attempt,
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
            }

            let mut request = self.client.post(&self.api_url).json(&body);
            if let Some(key) = &self.api_key {
                request = request.bearer_auth(key);
            }

            let response = match request.send().await {
                Ok(r) => r,
                Err(e) => {
                    last_error = Some(EmbeddingError::Http(e));
                    continue;
                }
            };

            let status = response.status();
            if status.as_u16() == 429 || status.is_server_error() {
                let message = response.text().await.unwrap_or_default();
                warn!("Embedding API returned {}: {}", status, message);
                last_error = Some(EmbeddingError::Api {
                    status: status.as_u16(),
                    message,
                });
                continue;
            }
            if !status.is_success() {
                return Err(EmbeddingError::Api {
                    status: status.as_u16(),
                    message: response.text().await.unwrap_or_default(),
                });
            }

            let mut parsed: EmbeddingResponse = response.json().await?;
            if parsed.data.len() != texts.len() {
                return Err(EmbeddingError::CountMismatch {
                    expected: texts.len(),
                    got: parsed.data.len(),
                });
            }
            parsed.data.sort_by_key(|d| d.index);
            debug!(count = parsed.data.len(), model = %self.model, "Embedding call succeeded");
            return Ok(parsed.data.into_iter().map(|d| d.embedding).collect());
        }

        Err(last_error.unwrap_or(EmbeddingError::Exhausted {
            retries: MAX_RETRIES,
        }))
    }
}

/// Picks the backend at startup. Semantic matching needs both the toggle and an API URL.
pub fn build_provider(
    settings: &EmbeddingSettings,
    enabled: bool,
) -> Result<Arc<dyn EmbeddingProvider>, EmbeddingError> {
    match (&settings.api_url, enabled) {
        (Some(url), true) => {
            info!(model = %settings.model, "Semantic matching enabled");
            let provider = HttpEmbeddingProvider::new(
                url.clone(),
                settings.api_key.clone(),
                settings.model.clone(),
            )?;
            Ok(Arc::new(provider))
        }
        (None, true) => {
            warn!("Semantic matching enabled but EMBEDDING_API_URL is not set; running lexical-only");
            Ok(Arc::new(NoEmbeddings))
        }
        (_, false) => {
            info!("Semantic matching disabled");
            Ok(Arc::new(NoEmbeddings))
        }
    }
}

/// Cosine of two dense vectors. `None` for mismatched lengths or zero vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Option<f64> {
    if a.len() != b.len() || a.is_empty() {
        return None;
    }

    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;

    for (&x, &y) in a.iter().zip(b.iter()) {
        let xf = f64::from(x);
        let yf = f64::from(y);
        dot += xf * yf;
        norm_a += xf * xf;
        norm_b += yf * yf;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return None;
    }

    Some(dot / (norm_a.sqrt() * norm_b.sqrt()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_settings(url: Option<&str>) -> EmbeddingSettings {
        EmbeddingSettings {
            api_url: url.map(str::to_string),
            api_key: None,
            model: "text-embedding-3-small".to_string(),
        }
    }

    #[test]
    fn test_cosine_similarity_basic() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]).unwrap() - 1.0).abs() < 1e-9);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).unwrap().abs() < 1e-9);
        assert!(cosine_similarity(&[1.0, 0.0], &[-1.0, 0.0]).unwrap() < 0.0);
    }

    #[test]
    fn test_cosine_similarity_rejects_degenerate_input() {
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 2.0]), None);
        assert_eq!(cosine_similarity(&[], &[]), None);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 2.0]), None);
    }

    #[tokio::test]
    async fn test_no_embeddings_is_unavailable() {
        let provider = NoEmbeddings;
        assert!(!provider.is_available());
        let err = provider.embed(&["text".to_string()]).await.unwrap_err();
        assert!(matches!(err, EmbeddingError::NotConfigured));
    }

    #[test]
    fn test_build_provider_selection() {
        let disabled = build_provider(&make_settings(Some("http://localhost:9/v1/embeddings")), false).unwrap();
        assert_eq!(disabled.name(), "none");

        let unconfigured = build_provider(&make_settings(None), true).unwrap();
        assert!(!unconfigured.is_available());

        let http = build_provider(&make_settings(Some("http://localhost:9/v1/embeddings")), true).unwrap();
        assert_eq!(http.name(), "http");
        assert!(http.is_available());
    }

    #[tokio::test]
    async fn test_http_provider_skips_call_for_empty_input() {
        let provider =
            HttpEmbeddingProvider::new("http://localhost:9/v1/embeddings".into(), None, "m".into())
                .unwrap();
        assert!(provider.embed(&[]).await.unwrap().is_empty());
    }
}
