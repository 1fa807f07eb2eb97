//! Service container: the composition root.
//!
//! Owns the vector store and every backend, and wires them into the
//! ingestion, retrieval and chat services.

use super::backend_factory::{BackendFactory, Capabilities};
use super::chat::ChatService;
use super::chunker::Chunker;
use super::ingest::IngestService;
use super::retrieval::RetrievalService;
use super::web::WebSearch;
use crate::Result;
use crate::config::RagConfig;
use crate::models::{
    Answer, ChatAnswer, ChatRequest, CollectionStats, IngestResult, ResetOutcome, Retrieved,
};
use crate::storage::VectorStore;
use std::sync::Arc;

/// Container holding the configured services.
pub struct ServiceContainer {
    config: RagConfig,
    embedder_name: &'static str,
    store: Arc<dyn VectorStore>,
    ingest: IngestService,
    retrieval: Arc<RetrievalService>,
    chat: ChatService,
}

impl ServiceContainer {
    /// Builds every backend from configuration.
    ///
    /// The vector store is Chroma when a host is configured and reachable,
    /// otherwise in-memory. A generator that cannot be built is reported on
    /// first use, not here.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::InvalidInput`] for invalid configuration, or a
    /// configuration error if no embedding backend could be built.
    pub fn from_config(config: RagConfig) -> Result<Self> {
        config.validate()?;
        let capabilities = BackendFactory::create_capabilities(&config)?;
        let store = BackendFactory::create_vector_store(&config.vector);
        let web = BackendFactory::create_web_search(&config.web);
        Ok(Self::with_parts(config, capabilities, store, web))
    }

    /// Wires the services from explicit parts.
    #[must_use]
    pub fn with_parts(
        config: RagConfig,
        capabilities: Capabilities,
        store: Arc<dyn VectorStore>,
        web: Arc<dyn WebSearch>,
    ) -> Self {
        let collection = config.vector.collection.clone();
        let Capabilities {
            embedder,
            generator,
        } = capabilities;

        let ingest = IngestService::new(
            Arc::clone(&embedder),
            Arc::clone(&store),
            Chunker::from_config(&config.chunking),
            collection.clone(),
        );
        let retrieval = Arc::new(RetrievalService::new(
            Arc::clone(&embedder),
            Arc::clone(&store),
            collection,
        ));
        let chat = ChatService::new(Arc::clone(&retrieval), generator, web, config.provider)
            .with_top_k(config.retrieval_k)
            .with_web_max_docs(config.web.max_docs);

        Self {
            embedder_name: embedder.name(),
            config,
            store,
            ingest,
            retrieval,
            chat,
        }
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &RagConfig {
        &self.config
    }

    /// Returns the active vector store backend name.
    #[must_use]
    pub fn vector_backend(&self) -> &'static str {
        self.store.backend()
    }

    /// Returns the active embedding backend name.
    #[must_use]
    pub const fn embedder_name(&self) -> &'static str {
        self.embedder_name
    }

    /// Ingests one uploaded document.
    ///
    /// # Errors
    ///
    /// Returns an error if embedding or storage fails.
    pub fn ingest(&self, filename: &str, bytes: &[u8]) -> Result<IngestResult> {
        self.ingest.ingest(filename, bytes)
    }

    /// Retrieves the `top_k` chunks closest to `query`.
    ///
    /// # Errors
    ///
    /// Returns an error if embedding or the index query fails.
    pub fn retrieve(&self, query: &str, top_k: usize) -> Result<Retrieved> {
        self.retrieval.retrieve(query, top_k)
    }

    /// Answers a single question from stored documents.
    ///
    /// # Errors
    ///
    /// See [`ChatService::ask`].
    pub fn ask(&self, query: &str) -> Result<Answer> {
        self.chat.ask(query)
    }

    /// Answers a chat message.
    ///
    /// # Errors
    ///
    /// See [`ChatService::chat`].
    pub fn chat(&self, request: &ChatRequest) -> Result<ChatAnswer> {
        self.chat.chat(request)
    }

    /// Returns the size of the configured collection.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be reached.
    pub fn stats(&self) -> Result<CollectionStats> {
        let name = &self.config.vector.collection;
        let count = self.store.collection(name)?.count()?;
        Ok(CollectionStats {
            collection: name.clone(),
            count,
        })
    }

    /// Clears the configured collection.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be reached.
    pub fn reset(&self) -> Result<ResetOutcome> {
        let name = &self.config.vector.collection;
        let before = self.store.reset_collection(name)?;
        let after = self.store.collection(name)?.count()?;
        tracing::info!(collection = %name, before, after, "Reset collection");
        Ok(ResetOutcome {
            collection: name.clone(),
            before,
            after,
        })
    }
}
