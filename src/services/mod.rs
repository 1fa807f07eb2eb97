//! Business logic services.
//!
//! Services orchestrate the embedding, storage and generation backends and
//! provide the high-level RAG operations. [`ServiceContainer`] wires them
//! together.

mod backend_factory;
mod chat;
mod chunker;
mod container;
mod extract;
mod ingest;
mod prompt;
mod retrieval;
mod web;

pub use backend_factory::{BackendFactory, Capabilities, Generator};
pub use chat::ChatService;
pub use chunker::{Chunker, DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE, chunk};
pub use container::ServiceContainer;
pub use extract::{DocumentKind, extract_text};
pub use ingest::IngestService;
pub use prompt::{
    MAX_HISTORY_TURNS, MAX_RAG_DOCS, MAX_TURN_CHARS, MAX_WEB_DOCS, PromptBuilder, build_prompt,
    build_rag_prompt,
};
pub use retrieval::RetrievalService;
pub use web::{NoopWebSearch, WebResults, WebSearch, WikipediaSearch, slugify, topic_for};
