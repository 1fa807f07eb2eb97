//! Structured logging configuration.

use crate::config::ObservabilitySettings;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// One JSON object per event.
    Json,
    /// Human-readable multi-line output.
    #[default]
    Pretty,
}

impl LogFormat {
    /// Parses `json` or `pretty`, case-insensitively.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "json" => Some(Self::Json),
            "pretty" | "text" => Some(Self::Pretty),
            _ => None,
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    /// Output format.
    pub format: LogFormat,
    /// Filter directive used when `RUST_LOG` is unset.
    pub directive: String,
    /// Append to this file instead of writing to stderr.
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::default(),
            directive: "warn".to_string(),
            file: None,
        }
    }
}

impl LoggingConfig {
    /// Builds logging configuration from settings.
    ///
    /// `verbose` raises the default level to `debug`; an explicit level in
    /// the settings wins over both.
    #[must_use]
    pub fn from_settings(settings: &ObservabilitySettings, verbose: bool) -> Self {
        let format = settings
            .log_format
            .as_deref()
            .and_then(LogFormat::parse)
            .unwrap_or_default();
        let directive = settings
            .log_level
            .clone()
            .filter(|level| !level.trim().is_empty())
            .unwrap_or_else(|| if verbose { "debug" } else { "warn" }.to_string());

        Self {
            format,
            directive,
            file: settings.log_file.clone(),
        }
    }

    /// Builds the filter, preferring `RUST_LOG` when it is set and valid.
    #[must_use]
    pub fn filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(&self.directive))
            .unwrap_or_else(|_| EnvFilter::new("warn"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("json", Some(LogFormat::Json); "json")]
    #[test_case(" JSON ", Some(LogFormat::Json); "case and whitespace")]
    #[test_case("pretty", Some(LogFormat::Pretty); "pretty")]
    #[test_case("xml", None; "unknown")]
    fn test_log_format_parse(input: &str, expected: Option<LogFormat>) {
        assert_eq!(LogFormat::parse(input), expected);
    }

    #[test]
    fn test_defaults() {
        let config = LoggingConfig::from_settings(&ObservabilitySettings::default(), false);
        assert_eq!(config, LoggingConfig::default());

        let verbose = LoggingConfig::from_settings(&ObservabilitySettings::default(), true);
        assert_eq!(verbose.directive, "debug");
    }

    #[test]
    fn test_settings_override_verbose() {
        let settings = ObservabilitySettings {
            log_format: Some("json".to_string()),
            log_level: Some("finrag=trace".to_string()),
            log_file: Some(PathBuf::from("/tmp/finrag.log")),
            metrics_enabled: false,
        };
        let config = LoggingConfig::from_settings(&settings, true);
        assert_eq!(config.format, LogFormat::Json);
        assert_eq!(config.directive, "finrag=trace");
        assert_eq!(config.file, Some(PathBuf::from("/tmp/finrag.log")));
    }
}
