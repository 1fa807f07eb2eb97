//! Backend factory for service initialization.
//!
//! This module centralizes backend creation so the container and tests pick
//! backends the same way.
//!
//! # Architecture
//!
//! ```text
//! BackendFactory
//!   ├── create_capabilities() → Capabilities { embedder, generator }
//!   ├── create_embedder()     → Arc<dyn Embedder>       (ordered fallback chain)
//!   ├── create_generator()    → Generator               (failure recorded, not raised)
//!   ├── create_vector_store() → Arc<dyn VectorStore>    (Chroma, else memory)
//!   └── create_web_search()   → Arc<dyn WebSearch>
//! ```
//!
//! # Graceful Degradation
//!
//! Embedding falls through [`EmbeddingBackend::candidates`] until one backend
//! builds; every failed attempt is logged at warn with its reason. A generator
//! that cannot be built does not stop startup: the error is kept in
//! [`Generator::Unavailable`] and returned when generation is requested.

use super::web::{NoopWebSearch, WebSearch, WikipediaSearch};
use crate::config::{EmbeddingBackend, GenerationBackend, RagConfig, VectorConfig, WebConfig};
use crate::embedding::{Embedder, FastEmbedEmbedder, HashEmbedder, OpenAiEmbedder};
use crate::llm::{
    GeminiClient, LlmHttpConfig, LlmProvider, LlmResilienceConfig, OllamaClient, OpenAiClient,
    ResilientLlmProvider,
};
use crate::storage::{VectorStore, open_vector_store};
use crate::{Error, Result};
use std::sync::Arc;

/// A generation provider, or the reason it could not be built.
#[derive(Clone)]
pub enum Generator {
    /// Ready to use.
    Ready(Arc<dyn LlmProvider>),
    /// Construction failed; calls report this as a configuration error.
    Unavailable {
        /// Backend that failed to build.
        backend: String,
        /// Why it failed.
        reason: String,
    },
}

impl Generator {
    /// Returns the provider.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if the provider failed to build.
    pub fn provider(&self) -> Result<&Arc<dyn LlmProvider>> {
        match self {
            Self::Ready(provider) => Ok(provider),
            Self::Unavailable { backend, reason } => {
                Err(Error::configuration(backend.clone(), reason.clone()))
            },
        }
    }

    /// Returns true if generation can be attempted.
    #[must_use]
    pub const fn is_ready(&self) -> bool {
        matches!(self, Self::Ready(_))
    }

    fn from_result(backend: GenerationBackend, result: Result<Arc<dyn LlmProvider>>) -> Self {
        match result {
            Ok(provider) => Self::Ready(provider),
            Err(e) => {
                let reason = match e {
                    Error::Configuration { reason, .. } => reason,
                    other => other.to_string(),
                };
                Self::Unavailable {
                    backend: backend.as_str().to_string(),
                    reason,
                }
            },
        }
    }
}

impl std::fmt::Debug for Generator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ready(provider) => f.debug_tuple("Ready").field(&provider.name()).finish(),
            Self::Unavailable { backend, reason } => f
                .debug_struct("Unavailable")
                .field("backend", backend)
                .field("reason", reason)
                .finish(),
        }
    }
}

/// Embedding and generation backends selected for a configuration.
#[derive(Clone)]
pub struct Capabilities {
    /// Embedding backend shared by ingestion and retrieval.
    pub embedder: Arc<dyn Embedder>,
    /// Generation backend.
    pub generator: Generator,
}

impl Capabilities {
    /// Creates capabilities from explicit parts.
    #[must_use]
    pub fn new(embedder: Arc<dyn Embedder>, generator: Generator) -> Self {
        Self {
            embedder,
            generator,
        }
    }
}

/// Factory for creating backends from configuration.
pub struct BackendFactory;

impl BackendFactory {
    /// Builds the embedder and generator for `config`.
    ///
    /// # Errors
    ///
    /// Returns an error only if no embedding backend could be built. With
    /// fallback enabled the deterministic backend always succeeds.
    pub fn create_capabilities(config: &RagConfig) -> Result<Capabilities> {
        let embedder = Self::create_embedder(config)?;
        let generator = Self::create_generator(config);
        tracing::info!(
            provider = %config.provider,
            embedder = embedder.name(),
            generator_ready = generator.is_ready(),
            "Selected backends"
        );
        Ok(Capabilities {
            embedder,
            generator,
        })
    }

    /// Creates the embedder, walking the fallback chain.
    ///
    /// # Errors
    ///
    /// Returns the last failure if every candidate failed.
    pub fn create_embedder(config: &RagConfig) -> Result<Arc<dyn Embedder>> {
        let preferred = config.embedding_backend();
        let mut last_error = None;

        for backend in preferred.candidates(config.embedding.allow_fallback) {
            match Self::try_embedder(backend, config) {
                Ok(embedder) => {
                    if backend != preferred {
                        metrics::counter!("embedding_fallbacks_total", "backend" => backend.as_str())
                            .increment(1);
                    }
                    tracing::debug!(backend = %backend, "Created embedder");
                    return Ok(embedder);
                },
                Err(e) => {
                    tracing::warn!(backend = %backend, error = %e, "Embedding backend unavailable");
                    last_error = Some(e);
                },
            }
        }

        Err(last_error
            .unwrap_or_else(|| Error::configuration(preferred.as_str(), "no embedding backend")))
    }

    fn try_embedder(backend: EmbeddingBackend, config: &RagConfig) -> Result<Arc<dyn Embedder>> {
        let embedding = &config.embedding;
        match backend {
            EmbeddingBackend::RemoteApi => {
                let embedder = OpenAiEmbedder::new(config.llm.openai_api_key.clone())?
                    .with_endpoint(config.llm.openai_base_url.clone())
                    .with_model(embedding.openai_model.clone())
                    .with_batch_size(embedding.batch_size)
                    .with_http_config(LlmHttpConfig::from_config(&config.llm));
                Ok(Arc::new(embedder))
            },
            EmbeddingBackend::LocalModel => {
                Ok(Arc::new(FastEmbedEmbedder::new(&embedding.local_model)?))
            },
            EmbeddingBackend::Deterministic => {
                Ok(Arc::new(HashEmbedder::new(embedding.dimensions)))
            },
        }
    }

    /// Creates the generator for the configured provider.
    ///
    /// Never fails; see [`Generator::Unavailable`].
    #[must_use]
    pub fn create_generator(config: &RagConfig) -> Generator {
        let backend = config.provider.generation();
        let result = Self::try_generator(backend, config);
        if let Err(e) = &result {
            tracing::warn!(backend = %backend, error = %e, "Generation backend unavailable");
        }
        Generator::from_result(backend, result)
    }

    fn try_generator(
        backend: GenerationBackend,
        config: &RagConfig,
    ) -> Result<Arc<dyn LlmProvider>> {
        let llm = &config.llm;
        let http = LlmHttpConfig::from_config(llm);
        let resilience = LlmResilienceConfig::from_config(llm);

        match backend {
            GenerationBackend::RemoteApi => {
                let mut client = OpenAiClient::new()
                    .with_endpoint(llm.openai_base_url.clone())
                    .with_model(llm.openai_model.clone())
                    .with_http_config(http);
                if let Some(key) = llm.openai_api_key.clone() {
                    client = client.with_api_key(key);
                }
                client.validate()?;
                Ok(Arc::new(ResilientLlmProvider::new(client, resilience)))
            },
            GenerationBackend::Gemini => {
                let mut client = GeminiClient::new()
                    .with_endpoint(llm.gemini_base_url.clone())
                    .with_model(llm.gemini_model.clone())
                    .with_http_config(http);
                if let Some(key) = llm.gemini_api_key.clone() {
                    client = client.with_api_key(key);
                }
                client.validate()?;
                Ok(Arc::new(ResilientLlmProvider::new(client, resilience)))
            },
            GenerationBackend::LocalModel => {
                let client = OllamaClient::new()
                    .with_endpoint(llm.ollama_host.clone())
                    .with_model(llm.ollama_model.clone())
                    .with_http_config(http);
                Ok(Arc::new(ResilientLlmProvider::new(client, resilience)))
            },
        }
    }

    /// Opens the vector store: Chroma when configured and reachable, else
    /// in-memory.
    #[must_use]
    pub fn create_vector_store(config: &VectorConfig) -> Arc<dyn VectorStore> {
        open_vector_store(config)
    }

    /// Creates the web context source.
    #[must_use]
    pub fn create_web_search(config: &WebConfig) -> Arc<dyn WebSearch> {
        if config.enabled {
            Arc::new(WikipediaSearch::from_config(config))
        } else {
            tracing::debug!("Web context disabled");
            Arc::new(NoopWebSearch)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProviderKind;
    use secrecy::SecretString;

    fn config(provider: ProviderKind) -> RagConfig {
        RagConfig::default().with_provider(provider)
    }

    #[test]
    fn test_remote_embedder_without_key_falls_back() {
        let embedder = BackendFactory::create_embedder(&config(ProviderKind::OpenAi)).unwrap();
        // Without the fastembed feature the chain ends at the hash embedder.
        if !cfg!(feature = "fastembed-embeddings") {
            assert_eq!(embedder.name(), "deterministic");
            assert_eq!(embedder.dimensions(), 384);
        }
    }

    #[test]
    fn test_no_fallback_surfaces_configuration_error() {
        let mut cfg = config(ProviderKind::OpenAi);
        cfg.embedding.allow_fallback = false;
        let err = BackendFactory::create_embedder(&cfg).err().unwrap();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_deterministic_embedder_uses_configured_dimensions() {
        let mut cfg = config(ProviderKind::Gemini);
        cfg.embedding.dimensions = 32;
        let embedder = BackendFactory::create_embedder(&cfg).unwrap();
        assert_eq!(embedder.name(), "deterministic");
        assert_eq!(embedder.dimensions(), 32);
    }

    #[test]
    fn test_remote_embedder_with_key() {
        let mut cfg = config(ProviderKind::OpenAi);
        cfg.llm.openai_api_key = Some(SecretString::from("sk-test".to_string()));
        let embedder = BackendFactory::create_embedder(&cfg).unwrap();
        assert_eq!(embedder.name(), "openai");
    }

    #[test]
    fn test_generator_without_key_is_unavailable() {
        let generator = BackendFactory::create_generator(&config(ProviderKind::OpenAi));
        assert!(!generator.is_ready());
        let err = generator.provider().err().unwrap();
        assert!(err.is_configuration());
        assert!(err.to_string().contains("openai"));

        let generator = BackendFactory::create_generator(&config(ProviderKind::Gemini));
        assert!(generator.provider().err().unwrap().is_configuration());
    }

    #[test]
    fn test_local_generator_is_ready_without_network() {
        let generator = BackendFactory::create_generator(&config(ProviderKind::Local));
        assert!(generator.is_ready());
        assert_eq!(generator.provider().unwrap().name(), "ollama");
    }

    #[test]
    fn test_web_search_respects_enabled_flag() {
        let disabled = WebConfig {
            enabled: false,
            ..WebConfig::default()
        };
        let search = BackendFactory::create_web_search(&disabled);
        assert!(search.search("What is inflation?", 2).is_empty());
    }
}
