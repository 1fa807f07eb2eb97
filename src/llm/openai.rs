//! `OpenAI` client.

use super::{LlmHttpConfig, LlmProvider, build_http_client, request_error, status_error};
use crate::{Error, Result};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

/// `OpenAI` chat completions client.
pub struct OpenAiClient {
    /// API key.
    api_key: Option<SecretString>,
    /// API endpoint.
    endpoint: String,
    /// Model to use.
    model: String,
    /// HTTP client.
    client: reqwest::blocking::Client,
}

impl OpenAiClient {
    /// Default API endpoint.
    pub const DEFAULT_ENDPOINT: &'static str = "https://api.openai.com/v1";

    /// Default model.
    pub const DEFAULT_MODEL: &'static str = "gpt-4o-mini";

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

    /// Returns the configured model.
    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Checks that an API key is present.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if `OPENAI_API_KEY` is missing.
    pub fn validate(&self) -> Result<()> {
        self.api_key()?;
        Ok(())
    }

    fn api_key(&self) -> Result<&SecretString> {
        self.api_key
            .as_ref()
            .filter(|k| !k.expose_secret().trim().is_empty())
            .ok_or_else(|| Error::configuration("openai", "OPENAI_API_KEY not set"))
    }

    /// Checks if the model is a reasoning-family model.
    ///
    /// These use `max_completion_tokens` instead of `max_tokens` and only
    /// accept the default temperature.
    fn is_reasoning_model(&self) -> bool {
        self.model.starts_with("gpt-5")
            || self.model.starts_with("o1")
            || self.model.starts_with("o3")
    }

    fn build_request(&self, prompt: &str) -> ChatCompletionRequest {
        let messages = vec![ChatMessage {
            role: "user".to_string(),
            content: prompt.to_string(),
        }];

        if self.is_reasoning_model() {
            ChatCompletionRequest {
                model: self.model.clone(),
                messages,
                max_tokens: None,
                max_completion_tokens: Some(1024),
                temperature: None,
            }
        } else {
            ChatCompletionRequest {
                model: self.model.clone(),
                messages,
                max_tokens: Some(1024),
                max_completion_tokens: None,
                temperature: Some(0.2),
            }
        }
    }
}

impl Default for OpenAiClient {
    fn default() -> Self {
        Self::new()
    }
}

impl LlmProvider for OpenAiClient {
    fn name(&self) -> &'static str {
        "openai"
    }

    fn complete(&self, prompt: &str) -> Result<String> {
        let api_key = self.api_key()?;
        let request = self.build_request(prompt);

        let response = self
            .client
            .post(format!("{}/chat/completions", self.endpoint))
            .bearer_auth(api_key.expose_secret())
            .json(&request)
            .send()
            .map_err(|e| request_error("openai", &self.model, &e))?;

        if !response.status().is_success() {
            return Err(status_error("openai", &self.model, response));
        }

        let response: ChatCompletionResponse = response
            .json()
            .map_err(|e| Error::operation("openai_response", e.to_string()))?;

        response
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| Error::operation("openai_response", "no choices in response"))
    }
}

/// Request to the Chat Completions API.
#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_completion_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

/// A message in the chat.
#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

/// Response from the Chat Completions API.
#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

/// A choice in the response.
#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key() -> SecretString {
        SecretString::from("sk-test".to_string())
    }

    #[test]
    fn test_client_configuration() {
        let client = OpenAiClient::new()
            .with_api_key(key())
            .with_endpoint("https://custom.endpoint/")
            .with_model("gpt-4o");

        assert_eq!(client.name(), "openai");
        assert_eq!(client.endpoint, "https://custom.endpoint");
        assert_eq!(client.model(), "gpt-4o");
        assert!(client.validate().is_ok());
    }

    #[test]
    fn test_missing_key_is_configuration_error() {
        let client = OpenAiClient::new();
        let err = client.complete("hello").unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_reasoning_model_request_shape() {
        let client = OpenAiClient::new().with_model("o3-mini");
        let json = serde_json::to_value(client.build_request("q")).unwrap();
        assert_eq!(json["max_completion_tokens"], 1024);
        assert!(json.get("max_tokens").is_none());
        assert!(json.get("temperature").is_none());

        let client = OpenAiClient::new().with_model("gpt-4o-mini");
        let json = serde_json::to_value(client.build_request("q")).unwrap();
        assert_eq!(json["max_tokens"], 1024);
        assert_eq!(json["messages"][0]["role"], "user");
        assert_eq!(json["messages"][0]["content"], "q");
    }
}
