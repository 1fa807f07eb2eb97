//! Google Gemini client.

use super::{LlmHttpConfig, LlmProvider, build_http_client, request_error, status_error};
use crate::{Error, Result};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

/// Client for the Gemini `generateContent` API.
pub struct GeminiClient {
    api_key: Option<SecretString>,
    endpoint: String,
    model: String,
    client: reqwest::blocking::Client,
}

impl GeminiClient {
    /// Default API endpoint.
    pub const DEFAULT_ENDPOINT: &'static str = "https://generativelanguage.googleapis.com/v1beta";

    /// Default model.
    pub const DEFAULT_MODEL: &'static str = "gemini-1.5-flash";

    /// Creates a client without credentials.
    #[must_use]
    pub fn new() -> Self {
        Self {
            api_key: None,
            endpoint: Self::DEFAULT_ENDPOINT.to_string(),
            model: Self::DEFAULT_MODEL.to_string(),
            client: build_http_client(LlmHttpConfig::default()),
        }
    }

    /// Sets the API key.
    #[must_use]
    pub fn with_api_key(mut self, key: SecretString) -> Self {
        self.api_key = Some(key);
        self
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

    /// Sets HTTP client timeouts.
    #[must_use]
    pub fn with_http_config(mut self, config: LlmHttpConfig) -> Self {
        self.client = build_http_client(config);
        self
    }

    /// Checks that an API key is present.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if neither `GEMINI_API_KEY` nor
    /// `GOOGLE_API_KEY` was provided.
    pub fn validate(&self) -> Result<()> {
        self.api_key()?;
        Ok(())
    }

    fn api_key(&self) -> Result<&SecretString> {
        self.api_key
            .as_ref()
            .filter(|k| !k.expose_secret().trim().is_empty())
            .ok_or_else(|| {
                Error::configuration("gemini", "GEMINI_API_KEY or GOOGLE_API_KEY not set")
            })
    }

    fn url(&self) -> String {
        format!("{}/models/{}:generateContent", self.endpoint, self.model)
    }
}

impl Default for GeminiClient {
    fn default() -> Self {
        Self::new()
    }
}

impl LlmProvider for GeminiClient {
    fn name(&self) -> &'static str {
        "gemini"
    }

    fn complete(&self, prompt: &str) -> Result<String> {
        let api_key = self.api_key()?;
        let request = GenerateContentRequest {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![Part {
                    text: prompt.to_string(),
                }],
            }],
        };

        let response = self
            .client
            .post(self.url())
            .header("x-goog-api-key", api_key.expose_secret())
            .json(&request)
            .send()
            .map_err(|e| request_error("gemini", &self.model, &e))?;

        if !response.status().is_success() {
            return Err(status_error("gemini", &self.model, response));
        }

        let response: GenerateContentResponse = response
            .json()
            .map_err(|e| Error::operation("gemini_response", e.to_string()))?;

        extract_text(response)
    }
}

/// Joins the text parts of the first candidate.
fn extract_text(response: GenerateContentResponse) -> Result<String> {
    let candidate = response
        .candidates
        .into_iter()
        .next()
        .ok_or_else(|| Error::operation("gemini_response", "no candidates in response"))?;

    let text = candidate
        .content
        .parts
        .into_iter()
        .map(|p| p.text)
        .collect::<Vec<_>>()
        .join("\n");
    Ok(text)
}

#[derive(Debug, Serialize)]
struct GenerateContentRequest {
    contents: Vec<Content>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Content,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url() {
        let client = GeminiClient::new()
            .with_endpoint("http://localhost:1234/v1beta/")
            .with_model("gemini-2.0-flash");
        assert_eq!(
            client.url(),
            "http://localhost:1234/v1beta/models/gemini-2.0-flash:generateContent"
        );
    }

    #[test]
    fn test_missing_key_is_configuration_error() {
        let err = GeminiClient::new().complete("hello").unwrap_err();
        assert!(err.is_configuration());
        assert!(
            GeminiClient::new()
                .with_api_key(SecretString::from("k".to_string()))
                .validate()
                .is_ok()
        );
    }

    #[test]
    fn test_extract_text_joins_parts() {
        let response: GenerateContentResponse = serde_json::from_str(
            r#"{"candidates":[{"content":{"role":"model","parts":[{"text":"Revenue grew."},{"text":"Margins held."}]}}]}"#,
        )
        .unwrap();
        assert_eq!(extract_text(response).unwrap(), "Revenue grew.\nMargins held.");
    }

    #[test]
    fn test_extract_text_without_candidates() {
        let response: GenerateContentResponse = serde_json::from_str("{}").unwrap();
        assert!(extract_text(response).is_err());
    }
}
