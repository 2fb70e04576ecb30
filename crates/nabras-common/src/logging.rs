//! Tracing subscriber setup shared by the worker and page crates.
//!
//! `RUST_LOG` wins over the configured level unless `directives` is set.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::Level;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Layer, Registry,
};

use crate::{NabrasError, Result};

/// Crates whose events pass the level filter.
const NABRAS_TARGETS: &[&str] = &["nabras_sw", "nabras_page", "nabras_common"];

/// Output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Multi-line, for terminals.
    #[default]
    Pretty,
    Compact,
    /// One JSON object per event.
    Json,
}

/// Logging configuration, loadable from the same JSON files as the rest of
/// the workspace config.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// `error`, `warn`, `info`, `debug` or `trace`.
    pub level: String,
    pub format: LogFormat,
    /// Print file and line of each event.
    pub with_location: bool,
    /// Print span open/close events.
    pub span_events: bool,
    /// Full `EnvFilter` directives, e.g. `nabras_sw=trace,reqwest=warn`.
    pub directives: Option<String>,
    /// Send output through libtest's capture instead of stdout.
    #[serde(skip)]
    pub capture_for_tests: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
            with_location: false,
            span_events: false,
            directives: None,
            capture_for_tests: false,
        }
    }
}

impl LogConfig {
    /// Verbose terminal output with locations and spans.
    pub fn debug() -> Self {
        Self {
            level: "debug".to_string(),
            with_location: true,
            span_events: true,
            ..Default::default()
        }
    }

    /// JSON lines at info.
    pub fn production() -> Self {
        Self {
            format: LogFormat::Json,
            ..Default::default()
        }
    }

    /// Everything, compact, captured per test.
    pub fn for_tests() -> Self {
        Self {
            level: "trace".to_string(),
            format: LogFormat::Compact,
            capture_for_tests: true,
            ..Default::default()
        }
    }

    pub fn with_directives(mut self, directives: impl Into<String>) -> Self {
        self.directives = Some(directives.into());
        self
    }

    /// Parse a JSON document.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| NabrasError::config_with_source("invalid log config", e))?;
        config.level()?;
        Ok(config)
    }

    /// The configured level.
    pub fn level(&self) -> Result<Level> {
        Level::from_str(&self.level).map_err(|e| {
            NabrasError::config_with_source(format!("bad log level {:?}", self.level), e)
        })
    }

    /// `target=level` for every Nabras crate.
    pub fn target_directives(&self) -> Result<String> {
        let level = self.level()?.to_string().to_lowercase();
        Ok(NABRAS_TARGETS
            .iter()
            .map(|target| format!("{}={}", target, level))
            .collect::<Vec<_>>()
            .join(","))
    }

    fn env_filter(&self) -> Result<EnvFilter> {
        if let Some(directives) = &self.directives {
            return EnvFilter::try_new(directives).map_err(|e| {
                NabrasError::config_with_source(format!("bad directives {:?}", directives), e)
            });
        }
        match EnvFilter::try_from_default_env() {
            Ok(filter) => Ok(filter),
            Err(_) => Ok(EnvFilter::new(self.target_directives()?)),
        }
    }

    fn fmt_layer(&self) -> Box<dyn Layer<Registry> + Send + Sync> {
        let spans = if self.span_events {
            FmtSpan::NEW | FmtSpan::CLOSE
        } else {
            FmtSpan::NONE
        };
        let base = fmt::layer()
            .with_target(true)
            .with_file(self.with_location)
            .with_line_number(self.with_location)
            .with_span_events(spans);

        match (self.format, self.capture_for_tests) {
            (LogFormat::Pretty, false) => base.pretty().boxed(),
            (LogFormat::Pretty, true) => base.pretty().with_test_writer().boxed(),
            (LogFormat::Compact, false) => base.compact().boxed(),
            (LogFormat::Compact, true) => base.compact().with_test_writer().boxed(),
            (LogFormat::Json, false) => base.json().boxed(),
            (LogFormat::Json, true) => base.json().with_test_writer().boxed(),
        }
    }
}

/// Install the global subscriber.
///
/// Errors on a bad level or directive, and when a subscriber is already set.
pub fn init_logging(config: LogConfig) -> Result<()> {
    let filter = config.env_filter()?;

    tracing_subscriber::registry()
        .with(config.fmt_layer())
        .with(filter)
        .try_init()
        .map_err(|e| NabrasError::config_with_source("logging already initialized", e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets() {
        assert_eq!(LogConfig::default().level().unwrap(), Level::INFO);
        assert_eq!(LogConfig::production().format, LogFormat::Json);
        assert!(LogConfig::for_tests().capture_for_tests);
    }

    #[test]
    fn test_target_directives() {
        assert_eq!(
            LogConfig::debug().target_directives().unwrap(),
            "nabras_sw=debug,nabras_page=debug,nabras_common=debug"
        );
    }

    #[test]
    fn test_from_json() {
        let config = LogConfig::from_json(r#"{ "level": "warn", "format": "compact" }"#).unwrap();
        assert_eq!(config.level().unwrap(), Level::WARN);
        assert_eq!(config.format, LogFormat::Compact);
        assert!(!config.capture_for_tests);

        let err = LogConfig::from_json(r#"{ "level": "loud" }"#).unwrap_err();
        assert_eq!(err.category(), "config");
    }

    #[test]
    fn test_bad_directives_rejected() {
        let config = LogConfig::for_tests().with_directives("nabras_sw=loudest");
        assert!(init_logging(config).is_err());
    }

    #[test]
    fn test_second_init_fails() {
        // Whichever call comes first may win; the second must report an error.
        let _ = init_logging(LogConfig::for_tests());
        assert!(init_logging(LogConfig::for_tests()).is_err());
    }
}
