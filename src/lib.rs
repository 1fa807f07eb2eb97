//! # finrag
//!
//! Retrieval-augmented generation core for a financial assistant backend.
//!
//! finrag turns uploaded documents into searchable, embedded chunks and
//! answers questions grounded in them.
//!
//! ## Features
//!
//! - Fixed-window character chunking with overlap
//! - Pluggable embeddings (`OpenAI` API, local ONNX model, deterministic hash)
//! - Vector index with a Chroma adapter and an in-memory cosine fallback
//! - Prompt assembly from retrieved, web, conversation and financial context
//! - Pluggable generation (`OpenAI`, Gemini, Ollama) with retry and circuit breaking
//!
//! ## Example
//!
//! ```rust,ignore
//! use finrag::{RagConfig, ServiceContainer};
//!
//! let services = ServiceContainer::from_config(RagConfig::default())?;
//! let result = services.ingest("report.txt", b"Apple revenue grew 10% year-over-year.")?;
//! assert_eq!(result.chunk_count, 1);
//!
//! let retrieved = services.retrieve("What happened to Apple revenue?", 3)?;
//! ```

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(missing_docs)]
#![forbid(unsafe_code)]
// Current duplicates come from reqwest and pdf-extract transitive deps.
#![allow(clippy::multiple_crate_versions)]

use thiserror::Error as ThisError;

// Module declarations
pub mod cli;
pub mod config;
pub mod embedding;
pub mod llm;
pub mod models;
pub mod observability;
pub mod services;
pub mod storage;

// Re-exports for convenience
pub use config::{EmbeddingBackend, GenerationBackend, ProviderKind, RagConfig};
pub use embedding::Embedder;
pub use llm::LlmProvider;
pub use models::{
    Answer, ChatAnswer, ChatRequest, CollectionStats, ConversationTurn, DocumentChunk,
    FinancialSnapshot, IngestResult, Metadata, QueryInclude, QueryMatch, QueryResult,
    ResetOutcome, Retrieved, Role,
};
pub use services::{
    BackendFactory, Capabilities, ChatService, IngestService, PromptBuilder, RetrievalService,
    ServiceContainer,
};
pub use storage::{MemoryVectorStore, VectorCollection, VectorStore};

/// Error type for finrag operations.
///
/// # Error Variant Triggers
///
/// | Variant | Raised When |
/// |---------|-------------|
/// | `InvalidInput` | Invalid configuration values, malformed caller input |
/// | `Configuration` | A backend is selected but its credentials or feature are missing |
/// | `BackendUnavailable` | Network or remote-service failure (model APIs, Chroma) |
/// | `OperationFailed` | Local failures: I/O, parsing, protocol violations |
///
/// Extraction failures never surface here: unreadable documents degrade to
/// empty text and ingest zero chunks.
#[derive(Debug, ThisError)]
pub enum Error {
    /// Invalid input was provided.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A backend is not usable with the current configuration.
    ///
    /// Raised when:
    /// - `OPENAI_API_KEY` / `GEMINI_API_KEY` is not set for a remote backend
    /// - The local embedding model is selected without the
    ///   `fastembed-embeddings` feature
    /// - Generation is requested but no provider could be built at startup
    ///
    /// Never retried.
    #[error("backend '{backend}' is not configured: {reason}")]
    Configuration {
        /// The backend that could not be used.
        backend: String,
        /// What is missing.
        reason: String,
    },

    /// A remote backend could not be reached or returned an error status.
    #[error("backend '{backend}' unavailable: {cause}")]
    BackendUnavailable {
        /// The backend that failed.
        backend: String,
        /// The underlying cause.
        cause: String,
    },

    /// An operation failed.
    #[error("operation '{operation}' failed: {cause}")]
    OperationFailed {
        /// The operation that failed.
        operation: String,
        /// The underlying cause.
        cause: String,
    },
}

impl Error {
    /// Builds a [`Error::Configuration`].
    pub fn configuration(backend: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Configuration {
            backend: backend.into(),
            reason: reason.into(),
        }
    }

    /// Builds a [`Error::BackendUnavailable`].
    pub fn unavailable(backend: impl Into<String>, cause: impl Into<String>) -> Self {
        Self::BackendUnavailable {
            backend: backend.into(),
            cause: cause.into(),
        }
    }

    /// Builds a [`Error::OperationFailed`].
    pub fn operation(operation: impl Into<String>, cause: impl Into<String>) -> Self {
        Self::OperationFailed {
            operation: operation.into(),
            cause: cause.into(),
        }
    }

    /// Returns true for transient failures that a caller may retry.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::BackendUnavailable { .. })
    }

    /// Returns true if the caller has to fix configuration before retrying.
    #[must_use]
    pub const fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration { .. })
    }
}

/// Result type alias for finrag operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::InvalidInput("chunk size".to_string());
        assert_eq!(err.to_string(), "invalid input: chunk size");

        let err = Error::configuration("openai", "OPENAI_API_KEY not set");
        assert_eq!(
            err.to_string(),
            "backend 'openai' is not configured: OPENAI_API_KEY not set"
        );

        let err = Error::unavailable("chroma", "connect error");
        assert_eq!(err.to_string(), "backend 'chroma' unavailable: connect error");

        let err = Error::operation("embed", "count mismatch");
        assert_eq!(err.to_string(), "operation 'embed' failed: count mismatch");
    }

    #[test]
    fn test_error_classification() {
        assert!(Error::unavailable("ollama", "timeout").is_retryable());
        assert!(!Error::configuration("openai", "missing key").is_retryable());
        assert!(Error::configuration("openai", "missing key").is_configuration());
        assert!(!Error::operation("parse", "bad json").is_configuration());
    }
}
