//! Configuration management.
//!
//! Configuration is layered: built-in defaults, then an optional TOML file,
//! then environment variables. The environment lookup is injectable so the
//! override layer can be exercised without touching the process environment.

mod backend;

pub use backend::{EmbeddingBackend, GenerationBackend, ProviderKind};

use crate::{Error, Result};
use secrecy::SecretString;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Environment variable naming an explicit config file.
pub const CONFIG_PATH_ENV: &str = "FINRAG_CONFIG_PATH";

/// Main configuration for finrag.
#[derive(Debug, Clone)]
pub struct RagConfig {
    /// Which provider family backs generation and embeddings.
    pub provider: ProviderKind,
    /// Chunking parameters.
    pub chunking: ChunkingConfig,
    /// Default number of chunks retrieved per query.
    pub retrieval_k: usize,
    /// Embedding settings.
    pub embedding: EmbeddingConfig,
    /// Generation settings.
    pub llm: LlmConfig,
    /// Vector index settings.
    pub vector: VectorConfig,
    /// Web context settings.
    pub web: WebConfig,
    /// Logging and metrics settings.
    pub observability: ObservabilitySettings,
}

/// Chunking parameters, measured in characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkingConfig {
    /// Window size.
    pub size: usize,
    /// Characters shared between consecutive windows.
    pub overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            size: 800,
            overlap: 100,
        }
    }
}

/// Embedding configuration.
#[derive(Debug, Clone)]
pub struct EmbeddingConfig {
    /// Explicit backend; derived from the provider when unset.
    pub backend: Option<EmbeddingBackend>,
    /// Model for the remote embeddings API.
    pub openai_model: String,
    /// Model name for the local embedding backend.
    pub local_model: String,
    /// Dimensionality of the deterministic hash embedding.
    pub dimensions: usize,
    /// Maximum texts per remote embeddings request.
    pub batch_size: usize,
    /// Whether an unusable backend falls through to the next candidate.
    pub allow_fallback: bool,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            backend: None,
            openai_model: "text-embedding-3-small".to_string(),
            local_model: "all-MiniLM-L6-v2".to_string(),
            dimensions: 384,
            batch_size: 64,
            allow_fallback: true,
        }
    }
}

/// Generation provider configuration.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    /// `OpenAI` chat model.
    pub openai_model: String,
    /// `OpenAI`-compatible API base URL.
    pub openai_base_url: String,
    /// `OpenAI` API key.
    pub openai_api_key: Option<SecretString>,
    /// Gemini model.
    pub gemini_model: String,
    /// Gemini API base URL.
    pub gemini_base_url: String,
    /// Gemini API key.
    pub gemini_api_key: Option<SecretString>,
    /// Ollama server URL.
    pub ollama_host: String,
    /// Ollama model.
    pub ollama_model: String,
    /// Request timeout in milliseconds (0 disables).
    pub timeout_ms: u64,
    /// Connect timeout in milliseconds (0 disables).
    pub connect_timeout_ms: u64,
    /// Retries for transient generation failures.
    pub max_retries: u32,
    /// Base backoff between retries in milliseconds.
    pub retry_backoff_ms: u64,
    /// Consecutive failures before the circuit opens (0 disables).
    pub breaker_failure_threshold: u32,
    /// Time an open circuit waits before a trial request, in milliseconds.
    pub breaker_reset_ms: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            openai_model: "gpt-4o-mini".to_string(),
            openai_base_url: "https://api.openai.com/v1".to_string(),
            openai_api_key: None,
            gemini_model: "gemini-1.5-flash".to_string(),
            gemini_base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            gemini_api_key: None,
            ollama_host: "http://localhost:11434".to_string(),
            ollama_model: "llama3.2".to_string(),
            timeout_ms: 30_000,
            connect_timeout_ms: 3_000,
            max_retries: 2,
            retry_backoff_ms: 200,
            breaker_failure_threshold: 3,
            breaker_reset_ms: 30_000,
        }
    }
}

/// Vector index configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VectorConfig {
    /// Chroma host; the in-memory index is used when unset.
    pub host: Option<String>,
    /// Chroma port.
    pub port: u16,
    /// Collection chunks are written to and read from.
    pub collection: String,
    /// Chroma tenant.
    pub tenant: String,
    /// Chroma database.
    pub database: String,
    /// Request timeout in milliseconds.
    pub timeout_ms: u64,
}

impl Default for VectorConfig {
    fn default() -> Self {
        Self {
            host: None,
            port: 8000,
            collection: "documents".to_string(),
            tenant: "default_tenant".to_string(),
            database: "default_database".to_string(),
            timeout_ms: 10_000,
        }
    }
}

impl VectorConfig {
    /// Returns the Chroma base URL, if a host is configured.
    #[must_use]
    pub fn base_url(&self) -> Option<String> {
        let host = self.host.as_deref()?.trim().trim_end_matches('/');
        if host.is_empty() {
            return None;
        }
        if host.starts_with("http://") || host.starts_with("https://") {
            Some(format!("{host}:{}", self.port))
        } else {
            Some(format!("http://{host}:{}", self.port))
        }
    }
}

/// Web context configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WebConfig {
    /// Whether chat fetches web context.
    pub enabled: bool,
    /// Request timeout in milliseconds.
    pub timeout_ms: u64,
    /// Web documents fetched per chat turn.
    pub max_docs: usize,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            timeout_ms: 5_000,
            max_docs: 2,
        }
    }
}

/// Logging and metrics settings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObservabilitySettings {
    /// `json` or `pretty`.
    pub log_format: Option<String>,
    /// Default filter directive when `RUST_LOG` is unset.
    pub log_level: Option<String>,
    /// Append logs to this file instead of stderr.
    pub log_file: Option<PathBuf>,
    /// Install the Prometheus recorder.
    pub metrics_enabled: bool,
}

/// Configuration file structure (for TOML parsing).
#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    /// Provider name.
    pub provider: Option<String>,
    /// Chunking section.
    pub chunking: Option<ConfigFileChunking>,
    /// Retrieval section.
    pub retrieval: Option<ConfigFileRetrieval>,
    /// Embedding section.
    pub embedding: Option<ConfigFileEmbedding>,
    /// LLM section.
    pub llm: Option<ConfigFileLlm>,
    /// Vector section.
    pub vector: Option<ConfigFileVector>,
    /// Web section.
    pub web: Option<ConfigFileWeb>,
    /// Observability section.
    pub observability: Option<ConfigFileObservability>,
}

/// Chunking section in config file.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFileChunking {
    /// Window size.
    pub size: Option<usize>,
    /// Overlap.
    pub overlap: Option<usize>,
}

/// Retrieval section in config file.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFileRetrieval {
    /// Default top-k.
    pub top_k: Option<usize>,
}

/// Embedding section in config file.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFileEmbedding {
    /// Backend name.
    pub backend: Option<String>,
    /// Remote model.
    pub openai_model: Option<String>,
    /// Local model.
    pub local_model: Option<String>,
    /// Hash embedding dimensions.
    pub dimensions: Option<usize>,
    /// Remote batch size.
    pub batch_size: Option<usize>,
    /// Fallback toggle.
    pub allow_fallback: Option<bool>,
}

/// LLM section in config file.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFileLlm {
    /// `OpenAI` model.
    pub openai_model: Option<String>,
    /// `OpenAI` base URL.
    pub openai_base_url: Option<String>,
    /// `OpenAI` API key.
    pub openai_api_key: Option<String>,
    /// Gemini model.
    pub gemini_model: Option<String>,
    /// Gemini base URL.
    pub gemini_base_url: Option<String>,
    /// Gemini API key.
    pub gemini_api_key: Option<String>,
    /// Ollama host.
    pub ollama_host: Option<String>,
    /// Ollama model.
    pub ollama_model: Option<String>,
    /// Request timeout.
    pub timeout_ms: Option<u64>,
    /// Connect timeout.
    pub connect_timeout_ms: Option<u64>,
    /// Retry count.
    pub max_retries: Option<u32>,
    /// Retry backoff.
    pub retry_backoff_ms: Option<u64>,
    /// Breaker threshold.
    pub breaker_failure_threshold: Option<u32>,
    /// Breaker reset.
    pub breaker_reset_ms: Option<u64>,
}

/// Vector section in config file.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFileVector {
    /// Chroma host.
    pub host: Option<String>,
    /// Chroma port.
    pub port: Option<u16>,
    /// Collection name.
    pub collection: Option<String>,
    /// Chroma tenant.
    pub tenant: Option<String>,
    /// Chroma database.
    pub database: Option<String>,
    /// Request timeout.
    pub timeout_ms: Option<u64>,
}

/// Web section in config file.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFileWeb {
    /// Enable web context.
    pub enabled: Option<bool>,
    /// Request timeout.
    pub timeout_ms: Option<u64>,
    /// Documents per chat turn.
    pub max_docs: Option<usize>,
}

/// Observability section in config file.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFileObservability {
    /// Log format.
    pub log_format: Option<String>,
    /// Log level.
    pub log_level: Option<String>,
    /// Log file.
    pub log_file: Option<String>,
    /// Metrics toggle.
    pub metrics_enabled: Option<bool>,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::Local,
            chunking: ChunkingConfig::default(),
            retrieval_k: 5,
            embedding: EmbeddingConfig::default(),
            llm: LlmConfig::default(),
            vector: VectorConfig::default(),
            web: WebConfig::default(),
            observability: ObservabilitySettings::default(),
        }
    }
}

impl RagConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            Error::operation("read_config_file", format!("{}: {e}", path.display()))
        })?;
        Self::from_toml_str(&contents)
    }

    /// Parses configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not a valid config file.
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let file: ConfigFile = toml::from_str(contents)
            .map_err(|e| Error::operation("parse_config_file", e.to_string()))?;
        Self::from_config_file(file)
    }

    /// Loads configuration from the default location.
    ///
    /// Checks `FINRAG_CONFIG_PATH`, then `<config_dir>/finrag/config.toml`,
    /// then `~/.config/finrag/config.toml`. Returns defaults if none exists.
    ///
    /// # Errors
    ///
    /// Returns an error if a config file exists but cannot be parsed.
    pub fn load_default() -> Result<Self> {
        if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
            return Self::load_from_file(Path::new(&path));
        }

        let Some(base_dirs) = directories::BaseDirs::new() else {
            return Ok(Self::default());
        };

        let platform_config = base_dirs.config_dir().join("finrag").join("config.toml");
        if platform_config.exists() {
            return Self::load_from_file(&platform_config);
        }

        let xdg_config = base_dirs
            .home_dir()
            .join(".config")
            .join("finrag")
            .join("config.toml");
        if xdg_config.exists() {
            return Self::load_from_file(&xdg_config);
        }

        Ok(Self::default())
    }

    /// Converts a `ConfigFile` to `RagConfig`.
    fn from_config_file(file: ConfigFile) -> Result<Self> {
        let mut config = Self::default();

        if let Some(provider) = file.provider {
            config.provider = ProviderKind::parse(&provider)?;
        }
        if let Some(chunking) = file.chunking {
            if let Some(size) = chunking.size {
                config.chunking.size = size;
            }
            if let Some(overlap) = chunking.overlap {
                config.chunking.overlap = overlap;
            }
        }
        if let Some(top_k) = file.retrieval.and_then(|r| r.top_k) {
            config.retrieval_k = top_k;
        }
        if let Some(embedding) = file.embedding {
            config.apply_embedding_section(embedding)?;
        }
        if let Some(llm) = file.llm {
            config.apply_llm_section(llm);
        }
        if let Some(vector) = file.vector {
            config.apply_vector_section(vector);
        }
        if let Some(web) = file.web {
            if let Some(enabled) = web.enabled {
                config.web.enabled = enabled;
            }
            if let Some(timeout_ms) = web.timeout_ms {
                config.web.timeout_ms = timeout_ms;
            }
            if let Some(max_docs) = web.max_docs {
                config.web.max_docs = max_docs;
            }
        }
        if let Some(obs) = file.observability {
            config.observability.log_format = obs.log_format;
            config.observability.log_level = obs.log_level;
            config.observability.log_file = obs.log_file.map(PathBuf::from);
            if let Some(enabled) = obs.metrics_enabled {
                config.observability.metrics_enabled = enabled;
            }
        }

        Ok(config)
    }

    fn apply_embedding_section(&mut self, section: ConfigFileEmbedding) -> Result<()> {
        if let Some(backend) = section.backend {
            self.embedding.backend = Some(EmbeddingBackend::parse(&backend)?);
        }
        if let Some(model) = section.openai_model {
            self.embedding.openai_model = model;
        }
        if let Some(model) = section.local_model {
            self.embedding.local_model = model;
        }
        if let Some(dimensions) = section.dimensions {
            self.embedding.dimensions = dimensions;
        }
        if let Some(batch_size) = section.batch_size {
            self.embedding.batch_size = batch_size;
        }
        if let Some(allow) = section.allow_fallback {
            self.embedding.allow_fallback = allow;
        }
        Ok(())
    }

    fn apply_llm_section(&mut self, section: ConfigFileLlm) {
        let llm = &mut self.llm;
        if let Some(v) = section.openai_model {
            llm.openai_model = v;
        }
        if let Some(v) = section.openai_base_url {
            llm.openai_base_url = v;
        }
        if let Some(v) = section.openai_api_key {
            llm.openai_api_key = Some(SecretString::from(v));
        }
        if let Some(v) = section.gemini_model {
            llm.gemini_model = v;
        }
        if let Some(v) = section.gemini_base_url {
            llm.gemini_base_url = v;
        }
        if let Some(v) = section.gemini_api_key {
            llm.gemini_api_key = Some(SecretString::from(v));
        }
        if let Some(v) = section.ollama_host {
            llm.ollama_host = v;
        }
        if let Some(v) = section.ollama_model {
            llm.ollama_model = v;
        }
        if let Some(v) = section.timeout_ms {
            llm.timeout_ms = v;
        }
        if let Some(v) = section.connect_timeout_ms {
            llm.connect_timeout_ms = v;
        }
        if let Some(v) = section.max_retries {
            llm.max_retries = v;
        }
        if let Some(v) = section.retry_backoff_ms {
            llm.retry_backoff_ms = v;
        }
        if let Some(v) = section.breaker_failure_threshold {
            llm.breaker_failure_threshold = v;
        }
        if let Some(v) = section.breaker_reset_ms {
            llm.breaker_reset_ms = v;
        }
    }

    fn apply_vector_section(&mut self, section: ConfigFileVector) {
        if section.host.is_some() {
            self.vector.host = section.host;
        }
        if let Some(port) = section.port {
            self.vector.port = port;
        }
        if let Some(collection) = section.collection {
            self.vector.collection = collection;
        }
        if let Some(tenant) = section.tenant {
            self.vector.tenant = tenant;
        }
        if let Some(database) = section.database {
            self.vector.database = database;
        }
        if let Some(timeout_ms) = section.timeout_ms {
            self.vector.timeout_ms = timeout_ms;
        }
    }

    /// Applies overrides from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if a variable holds an unparseable value.
    pub fn with_env_overrides(self) -> Result<Self> {
        self.with_env_overrides_from(|key| std::env::var(key).ok())
    }

    /// Applies overrides read through `lookup`.
    ///
    /// Empty values are treated as unset.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if a variable holds an unparseable value.
    pub fn with_env_overrides_from<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        if let Some(v) = get("LLM_PROVIDER") {
            self.provider = ProviderKind::parse(&v)?;
        }
        if let Some(v) = get("FINRAG_CHUNK_SIZE") {
            self.chunking.size = parse_env("FINRAG_CHUNK_SIZE", &v)?;
        }
        if let Some(v) = get("FINRAG_CHUNK_OVERLAP") {
            self.chunking.overlap = parse_env("FINRAG_CHUNK_OVERLAP", &v)?;
        }
        if let Some(v) = get("RETRIEVAL_K") {
            self.retrieval_k = parse_env("RETRIEVAL_K", &v)?;
        }

        if let Some(v) = get("FINRAG_EMBED_BACKEND") {
            self.embedding.backend = Some(EmbeddingBackend::parse(&v)?);
        }
        if let Some(v) = get("OPENAI_EMBEDDING") {
            self.embedding.openai_model = v;
        }
        if let Some(v) = get("LOCAL_EMBED_MODEL") {
            self.embedding.local_model = v;
        }
        if let Some(v) = get("LOCAL_EMBED_DIM") {
            self.embedding.dimensions = parse_env("LOCAL_EMBED_DIM", &v)?;
        }
        if let Some(v) = get("FINRAG_EMBED_FALLBACK") {
            self.embedding.allow_fallback = parse_bool(&v);
        }

        if let Some(v) = get("OPENAI_API_KEY") {
            self.llm.openai_api_key = Some(SecretString::from(v));
        }
        if let Some(v) = get("OPENAI_MODEL") {
            self.llm.openai_model = v;
        }
        if let Some(v) = get("OPENAI_BASE_URL") {
            self.llm.openai_base_url = v;
        }
        if let Some(v) = get("GEMINI_API_KEY").or_else(|| get("GOOGLE_API_KEY")) {
            self.llm.gemini_api_key = Some(SecretString::from(v));
        }
        if let Some(v) = get("GEMINI_MODEL") {
            self.llm.gemini_model = v;
        }
        if let Some(v) = get("OLLAMA_HOST") {
            self.llm.ollama_host = v;
        }
        if let Some(v) = get("OLLAMA_MODEL") {
            self.llm.ollama_model = v;
        }
        if let Some(v) = get("FINRAG_LLM_TIMEOUT_MS") {
            self.llm.timeout_ms = parse_env("FINRAG_LLM_TIMEOUT_MS", &v)?;
        }
        if let Some(v) = get("FINRAG_LLM_CONNECT_TIMEOUT_MS") {
            self.llm.connect_timeout_ms = parse_env("FINRAG_LLM_CONNECT_TIMEOUT_MS", &v)?;
        }

        if let Some(v) = get("CHROMA_HOST") {
            self.vector.host = Some(v);
        }
        if let Some(v) = get("CHROMA_PORT") {
            self.vector.port = parse_env("CHROMA_PORT", &v)?;
        }
        if let Some(v) = get("CHROMA_COLLECTION") {
            self.vector.collection = v;
        }

        if let Some(v) = get("FINRAG_WEB_ENABLED") {
            self.web.enabled = parse_bool(&v);
        }

        if let Some(v) = get("FINRAG_LOG_FORMAT") {
            self.observability.log_format = Some(v);
        }
        if let Some(v) = get("FINRAG_LOG_LEVEL") {
            self.observability.log_level = Some(v);
        }
        if let Some(v) = get("FINRAG_LOG_FILE") {
            self.observability.log_file = Some(PathBuf::from(v));
        }
        if let Some(v) = get("FINRAG_METRICS_ENABLED") {
            self.observability.metrics_enabled = parse_bool(&v);
        }

        Ok(self)
    }

    /// Checks cross-field constraints.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if chunking or collection settings are unusable.
    pub fn validate(&self) -> Result<()> {
        if self.chunking.size == 0 {
            return Err(Error::InvalidInput(
                "chunk size must be greater than zero".to_string(),
            ));
        }
        if self.chunking.overlap >= self.chunking.size {
            return Err(Error::InvalidInput(format!(
                "chunk overlap ({}) must be smaller than chunk size ({})",
                self.chunking.overlap, self.chunking.size
            )));
        }
        if self.embedding.dimensions == 0 {
            return Err(Error::InvalidInput(
                "embedding dimensions must be greater than zero".to_string(),
            ));
        }
        if self.embedding.batch_size == 0 {
            return Err(Error::InvalidInput(
                "embedding batch size must be greater than zero".to_string(),
            ));
        }
        if self.vector.collection.trim().is_empty() {
            return Err(Error::InvalidInput(
                "collection name must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Returns the embedding backend in effect: the explicit override, or the
    /// provider's default.
    #[must_use]
    pub fn embedding_backend(&self) -> EmbeddingBackend {
        self.embedding
            .backend
            .unwrap_or_else(|| self.provider.default_embedding())
    }

    /// Sets the provider.
    #[must_use]
    pub fn with_provider(mut self, provider: ProviderKind) -> Self {
        self.provider = provider;
        self
    }

    /// Sets the embedding backend explicitly.
    #[must_use]
    pub fn with_embedding_backend(mut self, backend: EmbeddingBackend) -> Self {
        self.embedding.backend = Some(backend);
        self
    }

    /// Sets chunk size and overlap.
    #[must_use]
    pub fn with_chunking(mut self, size: usize, overlap: usize) -> Self {
        self.chunking = ChunkingConfig { size, overlap };
        self
    }

    /// Sets the collection name.
    #[must_use]
    pub fn with_collection(mut self, name: impl Into<String>) -> Self {
        self.vector.collection = name.into();
        self
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, value: &str) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    value
        .parse::<T>()
        .map_err(|e| Error::InvalidInput(format!("{key}={value}: {e}")))
}

fn parse_bool(value: &str) -> bool {
    let value = value.to_lowercase();
    value == "true" || value == "1" || value == "yes"
}
