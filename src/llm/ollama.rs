//! Ollama (local) client.

use super::{LlmHttpConfig, LlmProvider, build_http_client, request_error, status_error};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// Ollama local LLM client.
pub struct OllamaClient {
    /// API endpoint.
    endpoint: String,
    /// Model to use.
    model: String,
    /// HTTP client.
    client: reqwest::blocking::Client,
}

impl OllamaClient {
    /// Default API endpoint.
    pub const DEFAULT_ENDPOINT: &'static str = "http://localhost:11434";

    /// Default model.
    pub const DEFAULT_MODEL: &'static str = "llama3.2";

    /// Creates a client for the default endpoint and model.
    #[must_use]
    pub fn new() -> Self {
        Self {
            endpoint: Self::DEFAULT_ENDPOINT.to_string(),
            model: Self::DEFAULT_MODEL.to_string(),
            client: build_http_client(LlmHttpConfig::default()),
        }
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

    /// Sets HTTP client timeouts for LLM requests.
    #[must_use]
    pub fn with_http_config(mut self, config: LlmHttpConfig) -> Self {
        self.client = build_http_client(config);
        self
    }
}

impl Default for OllamaClient {
    fn default() -> Self {
        Self::new()
    }
}

impl LlmProvider for OllamaClient {
    fn name(&self) -> &'static str {
        "ollama"
    }

    fn complete(&self, prompt: &str) -> Result<String> {
        let request = GenerateRequest {
            model: &self.model,
            prompt,
            stream: false,
        };

        let response = self
            .client
            .post(format!("{}/api/generate", self.endpoint))
            .json(&request)
            .send()
            .map_err(|e| request_error("ollama", &self.model, &e))?;

        if !response.status().is_success() {
            return Err(status_error("ollama", &self.model, response));
        }

        let response: GenerateResponse = response.json().map_err(|e| {
            tracing::error!(
                provider = "ollama",
                model = %self.model,
                error = %e,
                "Failed to parse LLM response"
            );
            Error::operation("ollama_response", e.to_string())
        })?;

        Ok(response.response)
    }
}

/// Request to the generate API.
#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

/// Response from the generate API.
#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_configuration() {
        let client = OllamaClient::new()
            .with_endpoint("http://gpu-box:11434/")
            .with_model("mistral");
        assert_eq!(client.name(), "ollama");
        assert_eq!(client.endpoint, "http://gpu-box:11434");
        assert_eq!(client.model, "mistral");
    }

    #[test]
    fn test_unreachable_server() {
        let client = OllamaClient::new()
            .with_endpoint("http://127.0.0.1:1")
            .with_http_config(LlmHttpConfig {
                timeout_ms: 2_000,
                connect_timeout_ms: 500,
            });

        let err = client.complete("hello").unwrap_err();
        assert!(err.is_retryable(), "unexpected error: {err}");
    }
}
