//! Prometheus metrics.
//!
//! Metrics are recorded through the `metrics` facade everywhere in the crate;
//! without an installed recorder they are no-ops. Installing the Prometheus
//! recorder makes them renderable in the text exposition format.

use crate::{Error, Result};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;

/// Metrics configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MetricsConfig {
    /// Whether the Prometheus recorder is installed.
    pub enabled: bool,
}

/// Handle to the installed recorder.
#[derive(Debug, Clone)]
pub struct MetricsHandle {
    prometheus: PrometheusHandle,
}

impl MetricsHandle {
    /// Renders all recorded metrics in the Prometheus text format.
    #[must_use]
    pub fn render(&self) -> String {
        self.prometheus.render()
    }
}

/// Global handle so any caller can render metrics.
static GLOBAL_METRICS: OnceLock<MetricsHandle> = OnceLock::new();

/// Installs the Prometheus recorder if enabled.
///
/// # Errors
///
/// Returns an error if another recorder is already installed.
pub fn install_prometheus(config: &MetricsConfig) -> Result<Option<MetricsHandle>> {
    if !config.enabled {
        return Ok(None);
    }

    let prometheus = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| Error::OperationFailed {
            operation: "metrics_recorder_install".to_string(),
            cause: e.to_string(),
        })?;

    let handle = MetricsHandle { prometheus };
    let _ = GLOBAL_METRICS.set(handle.clone());
    tracing::debug!("Installed Prometheus recorder");

    Ok(Some(handle))
}

/// Renders metrics from the global recorder, if one is installed.
#[must_use]
pub fn render_global() -> Option<String> {
    GLOBAL_METRICS.get().map(MetricsHandle::render)
}
