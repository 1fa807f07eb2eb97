//! Question answering over retrieved context.
//!
//! Two entry points:
//! - [`ChatService::ask`]: strict, context-only answer to a single question
//! - [`ChatService::chat`]: conversational answer that also draws on web
//!   context, recent turns and the user's financial snapshot

use super::backend_factory::Generator;
use super::prompt::{PromptBuilder, build_rag_prompt};
use super::retrieval::RetrievalService;
use super::web::WebSearch;
use crate::Result;
use crate::config::ProviderKind;
use crate::llm::LlmProvider;
use crate::models::{Answer, ChatAnswer, ChatRequest, ChatSources, ChatUsage};
use std::sync::Arc;
use std::time::Instant;

/// Service that assembles prompts and asks the generator.
pub struct ChatService {
    retrieval: Arc<RetrievalService>,
    generator: Generator,
    web: Arc<dyn WebSearch>,
    provider: ProviderKind,
    top_k: usize,
    web_max_docs: usize,
}

impl ChatService {
    /// Creates a chat service.
    #[must_use]
    pub fn new(
        retrieval: Arc<RetrievalService>,
        generator: Generator,
        web: Arc<dyn WebSearch>,
        provider: ProviderKind,
    ) -> Self {
        Self {
            retrieval,
            generator,
            web,
            provider,
            top_k: 5,
            web_max_docs: 2,
        }
    }

    /// Sets how many chunks are retrieved per question.
    #[must_use]
    pub const fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    /// Sets how many web documents are fetched per chat turn.
    #[must_use]
    pub const fn with_web_max_docs(mut self, max_docs: usize) -> Self {
        self.web_max_docs = max_docs;
        self
    }

    /// Answers `query` using only retrieved context.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Configuration`] if no generator is available,
    /// or the retrieval or generation error.
    pub fn ask(&self, query: &str) -> Result<Answer> {
        let _span = tracing::info_span!("ask", top_k = self.top_k).entered();
        let generator = self.generator.provider()?;

        let retrieved = self.retrieval.retrieve(query, self.top_k)?;
        let prompt = build_rag_prompt(query, &retrieved.documents);
        let response = Self::generate(generator.as_ref(), &prompt)?;

        Ok(Answer {
            query: query.to_string(),
            response,
            sources: retrieved.metadatas,
        })
    }

    /// Answers a chat message.
    ///
    /// `used.model` reports the configured provider kind.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Configuration`] if no generator is available,
    /// or the retrieval or generation error. Web failures never surface.
    pub fn chat(&self, request: &ChatRequest) -> Result<ChatAnswer> {
        let _span = tracing::info_span!(
            "chat",
            top_k = self.top_k,
            history = request.history.len(),
            financial = request.financial.is_some()
        )
        .entered();
        let generator = self.generator.provider()?;

        let retrieved = self.retrieval.retrieve(&request.prompt, self.top_k)?;
        let web = self.web.search(&request.prompt, self.web_max_docs);

        let prompt = PromptBuilder::new(&request.prompt)
            .with_retrieved(&retrieved.documents)
            .with_web(&web.docs)
            .with_history(&request.history)
            .with_financial(request.financial.as_ref())
            .build();
        let answer = Self::generate(generator.as_ref(), &prompt)?;

        Ok(ChatAnswer {
            answer,
            used: ChatUsage {
                rag: !retrieved.documents.is_empty(),
                web: !web.docs.is_empty(),
                model: self.provider.as_str().to_string(),
            },
            sources: ChatSources {
                rag: retrieved.metadatas,
                web: web.sources,
            },
        })
    }

    fn generate(generator: &dyn LlmProvider, prompt: &str) -> Result<String> {
        let start = Instant::now();
        let result = generator.complete(prompt);
        let status = if result.is_ok() { "success" } else { "error" };
        metrics::counter!(
            "generation_requests_total",
            "provider" => generator.name(),
            "status" => status
        )
        .increment(1);
        metrics::histogram!("generation_duration_ms", "provider" => generator.name())
            .record(start.elapsed().as_secs_f64() * 1000.0);
        tracing::debug!(
            provider = generator.name(),
            prompt_chars = prompt.chars().count(),
            status,
            "Generated answer"
        );
        result
    }
}
