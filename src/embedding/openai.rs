//! `OpenAI` embeddings client.

use super::{Embedder, ensure_batch_len};
use crate::llm::{LlmHttpConfig, build_http_client, request_error, status_error};
use crate::{Error, Result};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Client for an `OpenAI`-compatible `/embeddings` endpoint.
pub struct OpenAiEmbedder {
    api_key: SecretString,
    endpoint: String,
    model: String,
    batch_size: usize,
    client: reqwest::blocking::Client,
}

impl OpenAiEmbedder {
    /// Default API endpoint.
    pub const DEFAULT_ENDPOINT: &'static str = "https://api.openai.com/v1";

    /// Default model.
    pub const DEFAULT_MODEL: &'static str = "text-embedding-3-small";

    /// Default texts per request.
    pub const DEFAULT_BATCH_SIZE: usize = 64;

    /// Creates a client.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if no API key is given.
    pub fn new(api_key: Option<SecretString>) -> Result<Self> {
        let api_key = api_key
            .filter(|k| !k.expose_secret().trim().is_empty())
            .ok_or_else(|| Error::configuration("openai-embeddings", "OPENAI_API_KEY not set"))?;

        Ok(Self {
            api_key,
            endpoint: Self::DEFAULT_ENDPOINT.to_string(),
            model: Self::DEFAULT_MODEL.to_string(),
            batch_size: Self::DEFAULT_BATCH_SIZE,
            client: build_http_client(LlmHttpConfig::default()),
        })
    }

    /// Sets the API endpoint.
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into().trim_end_matches('/').to_string();
        self
    }

    /// Sets the model.
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Sets the maximum texts per request (zero is treated as one).
    #[must_use]
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Sets HTTP client timeouts.
    #[must_use]
    pub fn with_http_config(mut self, config: LlmHttpConfig) -> Self {
        self.client = build_http_client(config);
        self
    }

    /// Returns the model name.
    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    fn request(&self, inputs: &[&str]) -> Result<Vec<Vec<f32>>> {
        let start = Instant::now();
        let body = EmbeddingRequest {
            model: &self.model,
            input: inputs,
        };

        let response = self
            .client
            .post(format!("{}/embeddings", self.endpoint))
            .bearer_auth(self.api_key.expose_secret())
            .json(&body)
            .send()
            .map_err(|e| {
                metrics::counter!("embedding_requests_total", "backend" => "openai", "status" => "error")
                    .increment(1);
                request_error("openai-embeddings", &self.model, &e)
            })?;

        if !response.status().is_success() {
            metrics::counter!("embedding_requests_total", "backend" => "openai", "status" => "error")
                .increment(1);
            return Err(status_error("openai-embeddings", &self.model, response));
        }

        let parsed: EmbeddingResponse = response
            .json()
            .map_err(|e| Error::operation("openai_embeddings_response", e.to_string()))?;

        let embeddings = order_by_index(parsed.data);
        ensure_batch_len("openai", inputs.len(), embeddings.len())?;

        metrics::counter!("embedding_requests_total", "backend" => "openai", "status" => "success")
            .increment(1);
        metrics::histogram!("embedding_request_duration_ms", "backend" => "openai")
            .record(start.elapsed().as_secs_f64() * 1000.0);
        tracing::debug!(
            model = %self.model,
            count = inputs.len(),
            elapsed_ms = start.elapsed().as_millis(),
            "Embedded batch"
        );

        Ok(embeddings)
    }
}

/// Sorts response items by their `index` and drops the wrapper.
fn order_by_index(mut data: Vec<EmbeddingData>) -> Vec<Vec<f32>> {
    data.sort_by_key(|d| d.index);
    data.into_iter().map(|d| d.embedding).collect()
}

/// Known output sizes of `OpenAI` embedding models.
fn model_dimensions(model: &str) -> usize {
    match model {
        "text-embedding-3-large" => 3072,
        _ => 1536,
    }
}

impl Embedder for OpenAiEmbedder {
    fn name(&self) -> &'static str {
        "openai"
    }

    fn dimensions(&self) -> usize {
        model_dimensions(&self.model)
    }

    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.request(&[text])?
            .into_iter()
            .next()
            .ok_or_else(|| Error::operation("openai_embeddings_response", "no embedding returned"))
    }

    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let mut out = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.batch_size) {
            out.extend(self.request(batch)?);
        }
        Ok(out)
    }
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [&'a str],
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    index: usize,
    embedding: Vec<f32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_key_is_configuration_error() {
        let err = OpenAiEmbedder::new(None).err().unwrap();
        assert!(err.is_configuration());

        let err = OpenAiEmbedder::new(Some(SecretString::from("  ".to_string())))
            .err()
            .unwrap();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_builder() {
        let embedder = OpenAiEmbedder::new(Some(SecretString::from("sk-test".to_string())))
            .unwrap()
            .with_endpoint("http://localhost:9999/v1/")
            .with_model("text-embedding-3-large")
            .with_batch_size(0);

        assert_eq!(embedder.endpoint, "http://localhost:9999/v1");
        assert_eq!(embedder.model(), "text-embedding-3-large");
        assert_eq!(embedder.batch_size, 1);
        assert_eq!(embedder.dimensions(), 3072);
        assert_eq!(embedder.name(), "openai");
    }

    #[test]
    fn test_response_reordered_by_index() {
        let parsed: EmbeddingResponse = serde_json::from_str(
            r#"{"data":[
                {"index":1,"embedding":[0.0,1.0]},
                {"index":0,"embedding":[1.0,0.0]}
            ]}"#,
        )
        .unwrap();

        let ordered = order_by_index(parsed.data);
        assert_eq!(ordered, vec![vec![1.0, 0.0], vec![0.0, 1.0]]);
    }

    #[test]
    fn test_unreachable_endpoint_is_backend_unavailable() {
        let embedder = OpenAiEmbedder::new(Some(SecretString::from("sk-test".to_string())))
            .unwrap()
            .with_endpoint("http://127.0.0.1:1/v1")
            .with_http_config(LlmHttpConfig {
                timeout_ms: 2_000,
                connect_timeout_ms: 500,
            });

        let err = embedder.embed("hello").unwrap_err();
        assert!(err.is_retryable(), "unexpected error: {err}");
    }
}
