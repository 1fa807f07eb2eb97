//! Retrieval and answer commands.

use super::write_json;
use crate::models::{ChatRequest, ConversationTurn, FinancialSnapshot};
use crate::services::ServiceContainer;
use crate::{Error, Result};
use serde::Deserialize;
use std::io::Write;
use std::path::Path;

/// Optional chat context loaded from a JSON file.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ChatContext {
    #[serde(default)]
    history: Vec<ConversationTurn>,
    #[serde(default)]
    financial: Option<FinancialSnapshot>,
}

pub(super) fn cmd_retrieve(
    services: &ServiceContainer,
    query: &str,
    top_k: Option<usize>,
    out: &mut dyn Write,
) -> Result<()> {
    let top_k = top_k.unwrap_or(services.config().retrieval_k);
    let retrieved = services.retrieve(query, top_k)?;
    write_json(out, &retrieved)
}

pub(super) fn cmd_ask(services: &ServiceContainer, query: &str, out: &mut dyn Write) -> Result<()> {
    let answer = services.ask(query)?;
    write_json(out, &answer)
}

pub(super) fn cmd_chat(
    services: &ServiceContainer,
    prompt: &str,
    context: Option<&Path>,
    out: &mut dyn Write,
) -> Result<()> {
    let context = context.map(load_context).transpose()?.unwrap_or_default();
    let mut request = ChatRequest::new(prompt).with_history(context.history);
    request.financial = context.financial;

    let answer = services.chat(&request)?;
    write_json(out, &answer)
}

fn load_context(path: &Path) -> Result<ChatContext> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| Error::operation("read_chat_context", format!("{}: {e}", path.display())))?;
    serde_json::from_str(&contents).map_err(|e| {
        Error::InvalidInput(format!("chat context {}: {e}", path.display()))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Role;

    #[test]
    fn test_load_context() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("context.json");
        std::fs::write(
            &path,
            r#"{
                "history": [{"role": "user", "content": "hi"}],
                "financial": {"monthly_cash_flow": 500.0}
            }"#,
        )
        .unwrap();

        let context = load_context(&path).unwrap();
        assert_eq!(context.history.len(), 1);
        assert_eq!(context.history[0].role, Role::User);
        assert!(context.financial.is_some());
    }

    #[test]
    fn test_load_context_rejects_unknown_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("context.json");
        std::fs::write(&path, r#"{"prompt": "x"}"#).unwrap();
        assert!(matches!(load_context(&path), Err(Error::InvalidInput(_))));
    }
}
