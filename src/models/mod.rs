//! Data models for finrag.
//!
//! This module contains the core data structures passed between the chunker,
//! embedding providers, vector index, and the answer services.

mod chat;
mod chunk;
mod ingest;
mod search;

pub use chat::{
    Answer, ChatAnswer, ChatRequest, ChatSources, ChatUsage, ConversationTurn, FinancialSnapshot,
    Role,
};
pub use chunk::{DocumentChunk, Metadata, chunk_id, source_metadata};
pub use ingest::{CollectionStats, IngestResult, ResetOutcome};
pub use search::{QueryInclude, QueryMatch, QueryResult, Retrieved};
