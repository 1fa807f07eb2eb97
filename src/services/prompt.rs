//! Prompt assembly.
//!
//! Prompts are plain deterministic concatenations. Sections without content
//! are left out, and inputs over a section's cap are truncated silently.
//!
//! # Chat prompt layout
//!
//! ```text
//! You are an enterprise-grade financial assistant.
//! ...preamble...
//! <financial context block>          (optional)
//! Conversation History:              (optional, last 5 turns)
//! RAG Context:                       (optional, up to 5 docs)
//! Web Context:                       (optional, up to 3 docs)
//! User question: <question>
//!
//! Answer:
//! ```

use crate::models::{ConversationTurn, FinancialSnapshot};

/// Retrieved documents included in a prompt.
pub const MAX_RAG_DOCS: usize = 5;

/// Web documents included in a chat prompt.
pub const MAX_WEB_DOCS: usize = 3;

/// Most recent conversation turns included in a chat prompt.
pub const MAX_HISTORY_TURNS: usize = 5;

/// Characters kept from each conversation turn.
pub const MAX_TURN_CHARS: usize = 500;

const CHAT_PREAMBLE: [&str; 4] = [
    "You are an enterprise-grade financial assistant.",
    "Synthesize a concise, decision-oriented answer.",
    "Cite data-driven points when possible.",
    "If something is uncertain, state assumptions succinctly.",
];

const RAG_INSTRUCTIONS: &str = "You are a financial analysis assistant. Use ONLY the provided context to answer the question.\n\
If the answer isn't in the context, say you don't have enough information. Be concise.\n";

/// Builder for the chat prompt.
///
/// # Example
///
/// ```rust
/// use finrag::PromptBuilder;
///
/// let prompt = PromptBuilder::new("How is my cash flow?")
///     .with_retrieved(&["Q3 cash flow was positive.".to_string()])
///     .build();
/// assert!(prompt.ends_with("User question: How is my cash flow?\n\nAnswer:"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct PromptBuilder<'a> {
    question: &'a str,
    retrieved: &'a [String],
    web: &'a [String],
    history: &'a [ConversationTurn],
    financial: Option<&'a FinancialSnapshot>,
}

impl<'a> PromptBuilder<'a> {
    /// Starts a prompt for `question`.
    #[must_use]
    pub const fn new(question: &'a str) -> Self {
        Self {
            question,
            retrieved: &[],
            web: &[],
            history: &[],
            financial: None,
        }
    }

    /// Adds retrieved documents, best first.
    #[must_use]
    pub const fn with_retrieved(mut self, docs: &'a [String]) -> Self {
        self.retrieved = docs;
        self
    }

    /// Adds web documents.
    #[must_use]
    pub const fn with_web(mut self, docs: &'a [String]) -> Self {
        self.web = docs;
        self
    }

    /// Adds the conversation so far, oldest first.
    #[must_use]
    pub const fn with_history(mut self, history: &'a [ConversationTurn]) -> Self {
        self.history = history;
        self
    }

    /// Adds the user's financial snapshot.
    #[must_use]
    pub const fn with_financial(mut self, financial: Option<&'a FinancialSnapshot>) -> Self {
        self.financial = financial;
        self
    }

    /// Renders the prompt.
    #[must_use]
    pub fn build(&self) -> String {
        let mut parts: Vec<String> = CHAT_PREAMBLE.iter().map(|s| (*s).to_string()).collect();

        if let Some(financial) = self.financial {
            parts.push(financial.render());
        }

        if !self.history.is_empty() {
            let skip = self.history.len().saturating_sub(MAX_HISTORY_TURNS);
            let turns: Vec<String> = self.history[skip..]
                .iter()
                .map(|turn| {
                    let content = truncate_chars(&turn.content, MAX_TURN_CHARS);
                    format!("{}: {content}", turn.role.label())
                })
                .collect();
            parts.push(format!("\nConversation History:\n{}", turns.join("\n")));
        }

        if !self.retrieved.is_empty() {
            parts.push(format!("\nRAG Context:\n{}", join_docs(self.retrieved, MAX_RAG_DOCS)));
        }

        if !self.web.is_empty() {
            parts.push(format!("\nWeb Context:\n{}", join_docs(self.web, MAX_WEB_DOCS)));
        }

        parts.push(format!("\nUser question: {}\n\nAnswer:", self.question));
        parts.join("\n")
    }
}

/// Builds the chat prompt from all context sources.
#[must_use]
pub fn build_prompt(
    question: &str,
    retrieved: &[String],
    web: &[String],
    history: &[ConversationTurn],
    financial: Option<&FinancialSnapshot>,
) -> String {
    PromptBuilder::new(question)
        .with_retrieved(retrieved)
        .with_web(web)
        .with_history(history)
        .with_financial(financial)
        .build()
}

/// Builds the strict context-only prompt used for single-shot questions.
#[must_use]
pub fn build_rag_prompt(question: &str, docs: &[String]) -> String {
    let context = join_docs(docs, MAX_RAG_DOCS);
    format!("{RAG_INSTRUCTIONS}\n\nContext:\n{context}\n\nQuestion: {question}\nAnswer:")
}

fn join_docs(docs: &[String], cap: usize) -> String {
    docs.iter()
        .take(cap)
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Role;

    fn docs(n: usize, prefix: &str) -> Vec<String> {
        (0..n).map(|i| format!("{prefix}{i}")).collect()
    }

    #[test]
    fn test_minimal_prompt() {
        let prompt = build_prompt("What is EBITDA?", &[], &[], &[], None);
        assert_eq!(
            prompt,
            "You are an enterprise-grade financial assistant.\n\
             Synthesize a concise, decision-oriented answer.\n\
             Cite data-driven points when possible.\n\
             If something is uncertain, state assumptions succinctly.\n\
             \n\
             User question: What is EBITDA?\n\
             \n\
             Answer:"
        );
    }

    #[test]
    fn test_context_sections_and_caps() {
        let prompt = build_prompt("q", &docs(7, "rag"), &docs(4, "web"), &[], None);

        assert!(prompt.contains("\n\nRAG Context:\nrag0\n\nrag1\n\nrag2\n\nrag3\n\nrag4\n"));
        assert!(!prompt.contains("rag5"));
        assert!(prompt.contains("\n\nWeb Context:\nweb0\n\nweb1\n\nweb2\n"));
        assert!(!prompt.contains("web3"));

        let rag = prompt.find("RAG Context").unwrap();
        let web = prompt.find("Web Context").unwrap();
        let question = prompt.find("User question").unwrap();
        assert!(rag < web && web < question);
    }

    #[test]
    fn test_history_keeps_last_turns_truncated() {
        let mut history: Vec<ConversationTurn> = (0..7)
            .map(|i| ConversationTurn::user(format!("turn{i}")))
            .collect();
        history.push(ConversationTurn::new(Role::Assistant, "é".repeat(600)));

        let prompt = build_prompt("q", &[], &[], &history, None);
        assert!(!prompt.contains("turn2"));
        assert!(prompt.contains("\n\nConversation History:\nUser: turn3\nUser: turn4"));
        assert!(prompt.contains(&format!("Assistant: {}\n", "é".repeat(500))));
        assert!(!prompt.contains(&"é".repeat(501)));
    }

    #[test]
    fn test_section_order_with_everything() {
        let financial = FinancialSnapshot {
            net_worth: 1_000.0,
            ..FinancialSnapshot::default()
        };
        let history = vec![ConversationTurn::user("hi")];
        let prompt = build_prompt(
            "q",
            &docs(1, "rag"),
            &docs(1, "web"),
            &history,
            Some(&financial),
        );

        let positions: Vec<usize> = [
            "succinctly.",
            "=== USER'S FINANCIAL CONTEXT ===",
            "Conversation History:",
            "RAG Context:",
            "Web Context:",
            "User question: q",
        ]
        .iter()
        .map(|needle| prompt.find(needle).unwrap())
        .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));
        assert!(prompt.contains("Net Worth: $1,000.00"));
    }

    #[test]
    fn test_rag_prompt() {
        let prompt = build_rag_prompt("Why?", &docs(6, "d"));
        assert!(prompt.starts_with(
            "You are a financial analysis assistant. Use ONLY the provided context to answer the question.\n"
        ));
        assert!(prompt.contains("Be concise.\n\n\nContext:\nd0\n\nd1\n\nd2\n\nd3\n\nd4\n\nQuestion: Why?\nAnswer:"));
        assert!(!prompt.contains("d5"));
    }

    #[test]
    fn test_rag_prompt_without_docs() {
        let prompt = build_rag_prompt("Why?", &[]);
        assert!(prompt.ends_with("\n\nContext:\n\n\nQuestion: Why?\nAnswer:"));
    }

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("abc", 5), "abc");
        assert_eq!(truncate_chars("abcdef", 3), "abc");
        assert_eq!(truncate_chars("€€€", 2), "€€");
    }
}
