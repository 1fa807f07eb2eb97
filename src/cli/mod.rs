//! Command-line interface.
//!
//! Every command writes one JSON document to the given writer.
//!
//! # Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `ingest` | Chunk, embed and store one or more documents |
//! | `retrieve` | Show the chunks closest to a query |
//! | `ask` | Answer a question from stored documents only |
//! | `chat` | Conversational answer with optional history and financial context |
//! | `stats` | Show collection size and active backends |
//! | `reset` | Clear the collection |
//! | `config` | Validate or show the effective configuration |
//!
//! # Example Usage
//!
//! ```bash
//! finrag ingest annual-report.pdf notes.txt
//! finrag retrieve "operating margin" -k 3
//! finrag chat "Can I afford a new car?" --context context.json
//! ```
//!
//! The in-memory index lives for a single invocation; set `CHROMA_HOST` to
//! keep documents between commands.

mod config;
mod documents;
mod query;

pub use config::{config_summary, load_config};

use crate::config::RagConfig;
use crate::services::ServiceContainer;
use crate::{Error, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::io::Write;
use std::path::PathBuf;

/// finrag - retrieval-augmented answers over financial documents.
#[derive(Debug, Parser)]
#[command(name = "finrag")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to configuration file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Command to run.
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Ingest documents (PDF or text).
    Ingest {
        /// Files to ingest.
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Retrieve the chunks closest to a query.
    Retrieve {
        /// The search query.
        query: String,

        /// Number of chunks to return.
        #[arg(short = 'k', long)]
        top_k: Option<usize>,
    },

    /// Answer a question using only stored documents.
    Ask {
        /// The question.
        query: String,
    },

    /// Chat with document, web and financial context.
    Chat {
        /// The user's message.
        prompt: String,

        /// JSON file with `history` and `financial` fields.
        #[arg(long)]
        context: Option<PathBuf>,
    },

    /// Show collection statistics.
    Stats {
        /// Include Prometheus metrics text.
        #[arg(long)]
        metrics: bool,
    },

    /// Clear the collection.
    Reset,

    /// Validate or show configuration.
    Config {
        /// Show the effective configuration.
        #[arg(long)]
        show: bool,
    },
}

impl Command {
    /// Returns true if the command needs the service backends.
    #[must_use]
    pub const fn needs_services(&self) -> bool {
        !matches!(self, Self::Config { .. })
    }
}

/// Runs a command and writes its JSON output to `out`.
///
/// # Errors
///
/// Returns the first service, I/O or serialization error.
pub fn run(command: &Command, config: RagConfig, out: &mut dyn Write) -> Result<()> {
    if !command.needs_services() {
        let show = matches!(command, Command::Config { show: true });
        return config::cmd_config(&config, show, out);
    }

    let services = ServiceContainer::from_config(config)?;
    run_with(command, &services, out)
}

/// Runs a command against existing services.
///
/// # Errors
///
/// Returns the first service, I/O or serialization error.
pub fn run_with(command: &Command, services: &ServiceContainer, out: &mut dyn Write) -> Result<()> {
    match command {
        Command::Ingest { files } => documents::cmd_ingest(services, files, out),
        Command::Retrieve { query, top_k } => query::cmd_retrieve(services, query, *top_k, out),
        Command::Ask { query } => query::cmd_ask(services, query, out),
        Command::Chat { prompt, context } => {
            query::cmd_chat(services, prompt, context.as_deref(), out)
        },
        Command::Stats { metrics } => documents::cmd_stats(services, *metrics, out),
        Command::Reset => documents::cmd_reset(services, out),
        Command::Config { show } => config::cmd_config(services.config(), *show, out),
    }
}

/// Writes `value` as pretty JSON followed by a newline.
fn write_json<T: Serialize + ?Sized>(out: &mut dyn Write, value: &T) -> Result<()> {
    serde_json::to_writer_pretty(&mut *out, value)
        .map_err(|e| Error::operation("write_output", e.to_string()))?;
    writeln!(out).map_err(|e| Error::operation("write_output", e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProviderKind;
    use serde_json::Value;

    fn services() -> ServiceContainer {
        let mut config = RagConfig::default().with_provider(ProviderKind::OpenAi);
        config.web.enabled = false;
        ServiceContainer::from_config(config).unwrap()
    }

    fn output(command: &Command, services: &ServiceContainer) -> Value {
        let mut out = Vec::new();
        run_with(command, services, &mut out).unwrap();
        serde_json::from_slice(&out).unwrap()
    }

    #[test]
    fn test_parse_commands() {
        let cli = Cli::try_parse_from(["finrag", "-v", "retrieve", "revenue", "-k", "3"]).unwrap();
        assert!(cli.verbose);
        assert!(matches!(
            cli.command,
            Command::Retrieve { ref query, top_k: Some(3) } if query == "revenue"
        ));

        let cli = Cli::try_parse_from(["finrag", "ingest", "a.pdf", "b.txt"]).unwrap();
        assert!(matches!(cli.command, Command::Ingest { ref files } if files.len() == 2));

        assert!(Cli::try_parse_from(["finrag", "ingest"]).is_err());
        assert!(!Command::Config { show: true }.needs_services());
        assert!(Command::Reset.needs_services());
    }

    #[test]
    fn test_ingest_retrieve_stats_reset() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.txt");
        std::fs::write(&path, "Apple revenue grew 10% year-over-year.").unwrap();
        let services = services();

        let ingested = output(&Command::Ingest { files: vec![path] }, &services);
        assert_eq!(ingested[0]["filename"], "report.txt");
        assert_eq!(ingested[0]["chunk_count"], 1);

        let retrieved = output(
            &Command::Retrieve {
                query: "Apple revenue".to_string(),
                top_k: None,
            },
            &services,
        );
        assert_eq!(
            retrieved["documents"][0],
            "Apple revenue grew 10% year-over-year."
        );

        let stats = output(&Command::Stats { metrics: false }, &services);
        assert_eq!(stats["count"], 1);
        assert_eq!(stats["vector_backend"], "memory");
        assert!(stats.get("metrics").is_none());

        let reset = output(&Command::Reset, &services);
        assert_eq!(reset["before"], 1);
        assert_eq!(reset["after"], 0);
    }

    #[test]
    fn test_missing_file_fails() {
        let services = services();
        let mut out = Vec::new();
        let err = run_with(
            &Command::Ingest {
                files: vec![PathBuf::from("/nonexistent/finrag/report.pdf")],
            },
            &services,
            &mut out,
        )
        .unwrap_err();
        assert!(
            matches!(err, Error::OperationFailed { ref operation, .. } if operation == "read_document")
        );
    }

    #[test]
    fn test_ask_without_generator_fails() {
        let services = services();
        let mut out = Vec::new();
        let err = run_with(
            &Command::Ask {
                query: "q".to_string(),
            },
            &services,
            &mut out,
        )
        .unwrap_err();
        assert!(err.is_configuration());
        assert!(out.is_empty());
    }

    #[test]
    fn test_config_runs_without_services() {
        let mut out = Vec::new();
        run(&Command::Config { show: false }, RagConfig::default(), &mut out).unwrap();
        let value: Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(value["valid"], true);
    }
}
