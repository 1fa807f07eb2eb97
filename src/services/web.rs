//! Web context for chat answers.
//!
//! Web lookups are best effort: any failure yields no documents and is only
//! logged.

use crate::config::WebConfig;
use crate::llm::{LlmHttpConfig, build_http_client};
use regex::Regex;
use serde::Deserialize;
use std::sync::LazyLock;

/// Characters dropped from a topic: anything but word chars, whitespace and `-`.
static DISALLOWED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\w\s-]").unwrap_or_else(|_| unreachable!()));

/// Runs of whitespace and hyphens, collapsed to `_`.
static SEPARATORS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\s-]+").unwrap_or_else(|_| unreachable!()));

/// Maximum topic length in characters.
const MAX_TOPIC_CHARS: usize = 120;

/// Topic used when nothing usable is left of the query.
const DEFAULT_TOPIC: &str = "Finance";

/// Documents and their source URLs, index-aligned.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WebResults {
    /// Text snippets.
    pub docs: Vec<String>,
    /// Source URL for each snippet.
    pub sources: Vec<String>,
}

impl WebResults {
    /// Returns true when nothing was found.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    fn truncate(mut self, max_docs: usize) -> Self {
        self.docs.truncate(max_docs);
        self.sources.truncate(max_docs);
        self
    }
}

/// Source of public web context.
pub trait WebSearch: Send + Sync {
    /// Fetches up to `max_docs` documents related to `query`. Never fails.
    fn search(&self, query: &str, max_docs: usize) -> WebResults;
}

/// Web search that never returns anything; used when web context is off.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopWebSearch;

impl WebSearch for NoopWebSearch {
    fn search(&self, _query: &str, _max_docs: usize) -> WebResults {
        WebResults::default()
    }
}

/// Fetches the Wikipedia page summary for the query's topic.
pub struct WikipediaSearch {
    summary_endpoint: String,
    page_base: String,
    client: reqwest::blocking::Client,
}

impl WikipediaSearch {
    /// Default REST summary endpoint.
    pub const DEFAULT_SUMMARY_ENDPOINT: &'static str =
        "https://en.wikipedia.org/api/rest_v1/page/summary";

    /// Default article base URL.
    pub const DEFAULT_PAGE_BASE: &'static str = "https://en.wikipedia.org/wiki";

    /// Creates a client with the default 5 second timeout.
    #[must_use]
    pub fn new() -> Self {
        Self::from_config(&WebConfig::default())
    }

    /// Creates a client using the configured timeout.
    #[must_use]
    pub fn from_config(config: &WebConfig) -> Self {
        Self {
            summary_endpoint: Self::DEFAULT_SUMMARY_ENDPOINT.to_string(),
            page_base: Self::DEFAULT_PAGE_BASE.to_string(),
            client: build_http_client(LlmHttpConfig::default().with_timeout_ms(config.timeout_ms)),
        }
    }

    /// Sets the summary endpoint.
    #[must_use]
    pub fn with_summary_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.summary_endpoint = endpoint.into().trim_end_matches('/').to_string();
        self
    }

    fn fetch(&self, topic: &str) -> Option<WebResults> {
        let url = format!("{}/{topic}", self.summary_endpoint);
        let response = match self.client.get(&url).send() {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(topic, error = %e, "Wikipedia request failed");
                return None;
            },
        };

        if response.status() != reqwest::StatusCode::OK {
            tracing::debug!(topic, status = %response.status(), "No Wikipedia summary");
            return None;
        }

        let summary: Summary = match response.json() {
            Ok(summary) => summary,
            Err(e) => {
                tracing::warn!(topic, error = %e, "Malformed Wikipedia summary");
                return None;
            },
        };

        let extract = summary.extract.filter(|e| !e.is_empty())?;
        let page = summary
            .content_urls
            .and_then(|u| u.desktop)
            .and_then(|d| d.page)
            .unwrap_or_else(|| format!("{}/{topic}", self.page_base));

        Some(WebResults {
            docs: vec![extract],
            sources: vec![page],
        })
    }
}

impl Default for WikipediaSearch {
    fn default() -> Self {
        Self::new()
    }
}

impl WebSearch for WikipediaSearch {
    fn search(&self, query: &str, max_docs: usize) -> WebResults {
        let topic = topic_for(query);
        let results = self.fetch(&topic).unwrap_or_default();

        let outcome = if results.is_empty() { "empty" } else { "hit" };
        metrics::counter!("web_requests_total", "source" => "wikipedia", "outcome" => outcome)
            .increment(1);
        results.truncate(max_docs)
    }
}

/// Turns free text into a page title slug.
///
/// Drops characters other than word chars, whitespace and `-`, trims, then
/// collapses whitespace and hyphen runs to `_`. Empty input becomes
/// `Finance`.
#[must_use]
pub fn slugify(title: &str) -> String {
    let cleaned = DISALLOWED.replace_all(title, "");
    let slug = SEPARATORS.replace_all(cleaned.trim(), "_");
    if slug.is_empty() {
        DEFAULT_TOPIC.to_string()
    } else {
        slug.into_owned()
    }
}

/// The lookup topic for a query: the slug of the text before the first `?`,
/// capped at 120 characters.
#[must_use]
pub fn topic_for(query: &str) -> String {
    let head = query.split('?').next().unwrap_or_default();
    slugify(head).chars().take(MAX_TOPIC_CHARS).collect()
}

#[derive(Debug, Deserialize)]
struct Summary {
    #[serde(default)]
    extract: Option<String>,
    #[serde(default)]
    content_urls: Option<ContentUrls>,
}

#[derive(Debug, Deserialize)]
struct ContentUrls {
    #[serde(default)]
    desktop: Option<PageUrls>,
}

#[derive(Debug, Deserialize)]
struct PageUrls {
    #[serde(default)]
    page: Option<String>,
}
