//! Configuration loading and the `config` command.

use super::write_json;
use crate::Result;
use crate::config::RagConfig;
use secrecy::ExposeSecret;
use serde_json::{Value, json};
use std::io::Write;
use std::path::Path;

/// Loads configuration from `path` or the default location, then applies
/// environment overrides.
///
/// # Errors
///
/// Returns an error if a config file cannot be read or parsed, or an
/// environment variable holds an invalid value.
pub fn load_config(path: Option<&Path>) -> Result<RagConfig> {
    let config = match path {
        Some(path) => RagConfig::load_from_file(path)?,
        None => RagConfig::load_default()?,
    };
    config.with_env_overrides()
}

/// Renders the effective configuration with API keys redacted.
#[must_use]
pub fn config_summary(config: &RagConfig) -> Value {
    let redact = |key: Option<&secrecy::SecretString>| {
        key.filter(|k| !k.expose_secret().is_empty())
            .map(|_| "<set>")
    };

    json!({
        "provider": config.provider.as_str(),
        "generation": config.provider.generation().as_str(),
        "chunking": {
            "size": config.chunking.size,
            "overlap": config.chunking.overlap,
        },
        "retrieval_k": config.retrieval_k,
        "embedding": {
            "backend": config.embedding_backend().as_str(),
            "openai_model": config.embedding.openai_model,
            "local_model": config.embedding.local_model,
            "dimensions": config.embedding.dimensions,
            "batch_size": config.embedding.batch_size,
            "allow_fallback": config.embedding.allow_fallback,
        },
        "llm": {
            "openai_model": config.llm.openai_model,
            "openai_base_url": config.llm.openai_base_url,
            "openai_api_key": redact(config.llm.openai_api_key.as_ref()),
            "gemini_model": config.llm.gemini_model,
            "gemini_base_url": config.llm.gemini_base_url,
            "gemini_api_key": redact(config.llm.gemini_api_key.as_ref()),
            "ollama_host": config.llm.ollama_host,
            "ollama_model": config.llm.ollama_model,
            "timeout_ms": config.llm.timeout_ms,
            "max_retries": config.llm.max_retries,
        },
        "vector": {
            "url": config.vector.base_url(),
            "collection": config.vector.collection,
            "tenant": config.vector.tenant,
            "database": config.vector.database,
        },
        "web": {
            "enabled": config.web.enabled,
            "max_docs": config.web.max_docs,
        },
        "observability": {
            "log_format": config.observability.log_format,
            "log_level": config.observability.log_level,
            "log_file": config.observability.log_file,
            "metrics_enabled": config.observability.metrics_enabled,
        },
    })
}

pub(super) fn cmd_config(config: &RagConfig, show: bool, out: &mut dyn Write) -> Result<()> {
    config.validate()?;
    if show {
        write_json(out, &config_summary(config))
    } else {
        write_json(out, &json!({ "valid": true }))
    }
}
