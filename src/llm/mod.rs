//! LLM client abstraction.
//!
//! Provides a unified interface for the generation backends, plus the HTTP
//! plumbing shared with the embedding and vector index clients.

mod gemini;
mod ollama;
mod openai;
mod resilience;

pub use gemini::GeminiClient;
pub use ollama::OllamaClient;
pub use openai::OpenAiClient;
pub use resilience::{LlmResilienceConfig, ResilientLlmProvider};

use crate::config::LlmConfig;
use crate::{Error, Result};
use std::time::Duration;

/// Trait for LLM providers.
pub trait LlmProvider: Send + Sync {
    /// The provider name.
    fn name(&self) -> &'static str;

    /// Generates a completion for the given prompt.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if the provider lacks credentials and
    /// [`Error::BackendUnavailable`] if the service cannot be reached.
    fn complete(&self, prompt: &str) -> Result<String>;
}

impl<T: LlmProvider + ?Sized> LlmProvider for Box<T> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn complete(&self, prompt: &str) -> Result<String> {
        (**self).complete(prompt)
    }
}

/// HTTP client configuration for remote providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LlmHttpConfig {
    /// Request timeout in milliseconds (0 to disable).
    pub timeout_ms: u64,
    /// Connect timeout in milliseconds (0 to disable).
    pub connect_timeout_ms: u64,
}

impl Default for LlmHttpConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 30_000,
            connect_timeout_ms: 3_000,
        }
    }
}

impl LlmHttpConfig {
    /// Takes timeouts from the LLM section of the configuration.
    #[must_use]
    pub const fn from_config(config: &LlmConfig) -> Self {
        Self {
            timeout_ms: config.timeout_ms,
            connect_timeout_ms: config.connect_timeout_ms,
        }
    }

    /// Uses `timeout_ms` for the request timeout and keeps the connect timeout.
    #[must_use]
    pub const fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }
}

/// Builds a blocking HTTP client with configured timeouts.
#[must_use]
pub fn build_http_client(config: LlmHttpConfig) -> reqwest::blocking::Client {
    let mut builder = reqwest::blocking::Client::builder();
    if config.timeout_ms > 0 {
        builder = builder.timeout(Duration::from_millis(config.timeout_ms));
    }
    if config.connect_timeout_ms > 0 {
        builder = builder.connect_timeout(Duration::from_millis(config.connect_timeout_ms));
    }

    builder.build().unwrap_or_else(|err| {
        tracing::warn!("Failed to build HTTP client: {err}");
        reqwest::blocking::Client::new()
    })
}

/// Maps a transport failure to [`Error::BackendUnavailable`], logging its kind.
pub(crate) fn request_error(backend: &str, model: &str, e: &reqwest::Error) -> Error {
    let error_kind = if e.is_timeout() {
        "timeout"
    } else if e.is_connect() {
        "connect"
    } else if e.is_request() {
        "request"
    } else {
        "unknown"
    };
    tracing::error!(
        backend = backend,
        model = model,
        error = %e,
        error_kind = error_kind,
        "Remote request failed"
    );
    Error::unavailable(backend, format!("{error_kind} error: {e}"))
}

/// Maps a non-success HTTP response to an error.
///
/// Authentication failures are configuration problems. Server errors,
/// timeouts and rate limiting mean the backend is unavailable; any other
/// client error rejects the request itself and is not retryable.
pub(crate) fn status_error(
    backend: &str,
    model: &str,
    response: reqwest::blocking::Response,
) -> Error {
    let status = response.status();
    let body = response.text().unwrap_or_default();
    tracing::error!(
        backend = backend,
        model = model,
        status = %status,
        body = %body,
        "Remote API returned error status"
    );
    classify_status(backend, status, &body)
}

fn classify_status(backend: &str, status: reqwest::StatusCode, body: &str) -> Error {
    use reqwest::StatusCode;

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            Error::configuration(backend, format!("credentials rejected ({status})"))
        },
        StatusCode::REQUEST_TIMEOUT | StatusCode::TOO_MANY_REQUESTS => {
            Error::unavailable(backend, format!("API returned status: {status} - {body}"))
        },
        s if s.is_client_error() => Error::operation(
            format!("{backend}_request"),
            format!("API rejected request: {status} - {body}"),
        ),
        _ => Error::unavailable(backend, format!("API returned status: {status} - {body}")),
    }
}
