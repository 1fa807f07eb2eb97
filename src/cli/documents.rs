//! Document and collection commands.

use super::write_json;
use crate::observability;
use crate::services::ServiceContainer;
use crate::{Error, Result};
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Collection statistics with the active backends.
#[derive(Debug, Serialize)]
struct StatsOutput {
    collection: String,
    count: usize,
    vector_backend: &'static str,
    embedder: &'static str,
    provider: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    metrics: Option<String>,
}

/// Ingests each file in order and writes the per-file results.
pub(super) fn cmd_ingest(
    services: &ServiceContainer,
    files: &[PathBuf],
    out: &mut dyn Write,
) -> Result<()> {
    let mut results = Vec::with_capacity(files.len());
    for path in files {
        let bytes = std::fs::read(path).map_err(|e| {
            Error::operation("read_document", format!("{}: {e}", path.display()))
        })?;
        results.push(services.ingest(&display_name(path), &bytes)?);
    }
    write_json(out, &results)
}

pub(super) fn cmd_stats(
    services: &ServiceContainer,
    include_metrics: bool,
    out: &mut dyn Write,
) -> Result<()> {
    let stats = services.stats()?;
    let output = StatsOutput {
        collection: stats.collection,
        count: stats.count,
        vector_backend: services.vector_backend(),
        embedder: services.embedder_name(),
        provider: services.config().provider.as_str(),
        metrics: include_metrics.then(|| observability::render_global().unwrap_or_default()),
    };
    write_json(out, &output)
}

pub(super) fn cmd_reset(services: &ServiceContainer, out: &mut dyn Write) -> Result<()> {
    let outcome = services.reset()?;
    write_json(out, &outcome)
}

/// The file name chunks are attributed to.
fn display_name(path: &Path) -> String {
    path.file_name().map_or_else(
        || path.display().to_string(),
        |name| name.to_string_lossy().into_owned(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_name_uses_file_name() {
        assert_eq!(display_name(Path::new("/data/q3/report.pdf")), "report.pdf");
        assert_eq!(display_name(Path::new("notes.txt")), "notes.txt");
        assert_eq!(display_name(Path::new("/")), "/");
    }
}
