//! Backend selection enums.

use crate::{Error, Result};
use std::fmt;

/// Provider family selected by `LLM_PROVIDER`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ProviderKind {
    /// `OpenAI` chat completions and embeddings.
    OpenAi,
    /// Google Gemini generation with deterministic embeddings.
    Gemini,
    /// Ollama generation with local model embeddings.
    #[default]
    Local,
}

impl ProviderKind {
    /// Parses a provider string.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] for names outside the closed set.
    pub fn parse(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "openai" => Ok(Self::OpenAi),
            "gemini" | "google" => Ok(Self::Gemini),
            "local" | "ollama" => Ok(Self::Local),
            other => Err(Error::InvalidInput(format!(
                "unknown provider '{other}' (expected openai, gemini or local)"
            ))),
        }
    }

    /// Returns the canonical provider name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::Gemini => "gemini",
            Self::Local => "local",
        }
    }

    /// Embedding backend used when none is set explicitly.
    #[must_use]
    pub const fn default_embedding(&self) -> EmbeddingBackend {
        match self {
            Self::OpenAi => EmbeddingBackend::RemoteApi,
            Self::Gemini => EmbeddingBackend::Deterministic,
            Self::Local => EmbeddingBackend::LocalModel,
        }
    }

    /// Generation backend for this provider.
    #[must_use]
    pub const fn generation(&self) -> GenerationBackend {
        match self {
            Self::OpenAi => GenerationBackend::RemoteApi,
            Self::Gemini => GenerationBackend::Gemini,
            Self::Local => GenerationBackend::LocalModel,
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Embedding strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EmbeddingBackend {
    /// `OpenAI`-compatible `/embeddings` endpoint.
    RemoteApi,
    /// In-process ONNX model.
    LocalModel,
    /// Byte-hash embedding; always available.
    Deterministic,
}

impl EmbeddingBackend {
    /// Parses a backend name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] for unknown names.
    pub fn parse(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "remote" | "remote-api" | "remote_api" | "openai" => Ok(Self::RemoteApi),
            "local" | "local-model" | "local_model" | "fastembed" => Ok(Self::LocalModel),
            "deterministic" | "hash" => Ok(Self::Deterministic),
            other => Err(Error::InvalidInput(format!(
                "unknown embedding backend '{other}' (expected remote, local or deterministic)"
            ))),
        }
    }

    /// Returns the canonical backend name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::RemoteApi => "remote",
            Self::LocalModel => "local",
            Self::Deterministic => "deterministic",
        }
    }

    /// Ordered candidates starting at `self`.
    ///
    /// With fallback enabled the chain moves toward cheaper backends and
    /// always ends with [`EmbeddingBackend::Deterministic`].
    #[must_use]
    pub fn candidates(self, allow_fallback: bool) -> Vec<Self> {
        if !allow_fallback {
            return vec![self];
        }
        match self {
            Self::RemoteApi => vec![Self::RemoteApi, Self::LocalModel, Self::Deterministic],
            Self::LocalModel => vec![Self::LocalModel, Self::Deterministic],
            Self::Deterministic => vec![Self::Deterministic],
        }
    }
}

impl fmt::Display for EmbeddingBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Text generation strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GenerationBackend {
    /// `OpenAI` chat completions.
    RemoteApi,
    /// Google generative language API.
    Gemini,
    /// Ollama server.
    LocalModel,
}

impl GenerationBackend {
    /// Returns the canonical backend name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::RemoteApi => "openai",
            Self::Gemini => "gemini",
            Self::LocalModel => "ollama",
        }
    }
}

impl fmt::Display for GenerationBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
