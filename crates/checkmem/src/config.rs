//! Configuration for a measurement

use crate::error::{MeasureError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Which counters a report is computed from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    /// Every thread in the process
    #[default]
    Process,

    /// Only the thread running the target
    Thread,
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Process => f.write_str("process"),
            Self::Thread => f.write_str("thread"),
        }
    }
}

impl FromStr for Scope {
    type Err = MeasureError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "process" => Ok(Self::Process),
            "thread" => Ok(Self::Thread),
            other => Err(MeasureError::invalid_config(format!(
                "unknown scope '{other}' (expected 'process' or 'thread')"
            ))),
        }
    }
}

/// How a report is rendered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Two lines: delta and peak, in bytes
    #[default]
    Summary,

    /// Before/after blocks followed by the summary lines
    Verbose,

    /// One JSON object per report
    Json,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Summary => f.write_str("summary"),
            Self::Verbose => f.write_str("verbose"),
            Self::Json => f.write_str("json"),
        }
    }
}

impl FromStr for OutputFormat {
    type Err = MeasureError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "summary" => Ok(Self::Summary),
            "verbose" => Ok(Self::Verbose),
            "json" => Ok(Self::Json),
            other => Err(MeasureError::invalid_config(format!(
                "unknown format '{other}' (expected 'summary', 'verbose' or 'json')"
            ))),
        }
    }
}

/// Settings shared by every measurement a [`crate::Meter`] performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeasureConfig {
    scope: Scope,

    format: OutputFormat,

    /// Emit a report before resuming a panic from the target
    report_on_panic: bool,
}

impl Default for MeasureConfig {
    fn default() -> Self {
        Self {
            scope: Scope::Process,
            format: OutputFormat::Summary,
            report_on_panic: true,
        }
    }
}

impl MeasureConfig {
    /// Process scope, summary output, reports on panic.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn with_scope(mut self, scope: Scope) -> Self {
        self.scope = scope;
        self
    }

    #[must_use]
    pub const fn with_format(mut self, format: OutputFormat) -> Self {
        self.format = format;
        self
    }

    #[must_use]
    pub const fn with_report_on_panic(mut self, enabled: bool) -> Self {
        self.report_on_panic = enabled;
        self
    }

    /// Get the measurement scope
    #[must_use]
    pub const fn scope(&self) -> Scope {
        self.scope
    }

    /// Get the output format
    #[must_use]
    pub const fn format(&self) -> OutputFormat {
        self.format
    }

    /// Whether a panicking target still produces a report
    #[must_use]
    pub const fn report_on_panic(&self) -> bool {
        self.report_on_panic
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = MeasureConfig::new();
        assert_eq!(config.scope(), Scope::Process);
        assert_eq!(config.format(), OutputFormat::Summary);
        assert!(config.report_on_panic());
    }

    #[test]
    fn test_builder_overrides() {
        let config = MeasureConfig::new()
            .with_scope(Scope::Thread)
            .with_format(OutputFormat::Json)
            .with_report_on_panic(false);

        assert_eq!(config.scope(), Scope::Thread);
        assert_eq!(config.format(), OutputFormat::Json);
        assert!(!config.report_on_panic());
    }

    #[test]
    fn test_parse_scope() {
        assert_eq!("Thread".parse::<Scope>().ok(), Some(Scope::Thread));
        assert_eq!(" process ".parse::<Scope>().ok(), Some(Scope::Process));
        assert!(matches!(
            "global".parse::<Scope>(),
            Err(MeasureError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_parse_format() {
        assert_eq!("json".parse::<OutputFormat>().ok(), Some(OutputFormat::Json));
        assert!(matches!(
            "xml".parse::<OutputFormat>(),
            Err(MeasureError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_display_parses_back() {
        for format in [OutputFormat::Summary, OutputFormat::Verbose, OutputFormat::Json] {
            assert_eq!(format.to_string().parse::<OutputFormat>().ok(), Some(format));
        }
    }
}
