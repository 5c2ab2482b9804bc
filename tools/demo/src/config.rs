#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

//! Configuration for the leak demonstration

use checkmem::{MeasureConfig, MeasureError, OutputFormat, Result, Scope};
use std::path::PathBuf;

/// Bytes retained by a default run
pub const DEFAULT_LEAK_BYTES: usize = 1_048_576;

/// Largest amount a single run may retain (safety limit)
const MAX_LEAK_BYTES: usize = 1_073_741_824; // 1 GiB

/// Validated settings for one demonstration run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DemoConfig {
    /// Total bytes to retain
    leak_bytes: usize,

    /// Size of each retained block
    chunk_bytes: usize,

    /// How the measurement is taken and printed
    measure: MeasureConfig,

    /// Optional JSON-lines file that also receives the report
    output_path: Option<PathBuf>,
}

impl DemoConfig {
    /// Create a demonstration configuration with validation
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - `leak_bytes` exceeds 1 GiB
    /// - `chunk_bytes` is zero
    /// - `output_path` is empty
    pub fn new(
        leak_bytes: usize,
        chunk_bytes: usize,
        scope: Scope,
        format: OutputFormat,
        output_path: Option<PathBuf>,
    ) -> Result<Self> {
        Self::validate_leak_bytes(leak_bytes)?;
        Self::validate_chunk_bytes(chunk_bytes)?;
        if let Some(path) = &output_path {
            Self::validate_output_path(path)?;
        }

        Ok(Self {
            leak_bytes,
            chunk_bytes,
            measure: MeasureConfig::new().with_scope(scope).with_format(format),
            output_path,
        })
    }

    /// 1 MiB in one block, process scope, summary output
    ///
    /// # Errors
    ///
    /// Returns error if configuration validation fails
    pub fn one_mebibyte_default() -> Result<Self> {
        Self::new(
            DEFAULT_LEAK_BYTES,
            DEFAULT_LEAK_BYTES,
            Scope::Process,
            OutputFormat::Summary,
            None,
        )
    }

    #[must_use]
    pub const fn leak_bytes(&self) -> usize {
        self.leak_bytes
    }

    #[must_use]
    pub const fn chunk_bytes(&self) -> usize {
        self.chunk_bytes
    }

    #[must_use]
    pub const fn measure(&self) -> &MeasureConfig {
        &self.measure
    }

    #[must_use]
    pub const fn output_path(&self) -> Option<&PathBuf> {
        self.output_path.as_ref()
    }

    fn validate_leak_bytes(bytes: usize) -> Result<()> {
        if bytes > MAX_LEAK_BYTES {
            Err(MeasureError::invalid_config(format!(
                "size {bytes} exceeds the {MAX_LEAK_BYTES} byte limit"
            )))
        } else {
            Ok(())
        }
    }

    fn validate_chunk_bytes(bytes: usize) -> Result<()> {
        if bytes == 0 {
            Err(MeasureError::invalid_config("chunk must be greater than 0"))
        } else {
            Ok(())
        }
    }

    fn validate_output_path(path: &PathBuf) -> Result<()> {
        if path.as_os_str().is_empty() {
            Err(MeasureError::invalid_config("output path cannot be empty"))
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::arithmetic_side_effects)]

    use super::*;

    #[test]
    fn test_default_retains_one_mebibyte() {
        let config = DemoConfig::one_mebibyte_default();
        assert!(config.is_ok());
        if let Ok(config) = config {
            assert_eq!(config.leak_bytes(), 1_048_576);
            assert_eq!(config.measure().scope(), Scope::Process);
            assert!(config.output_path().is_none());
        }
    }

    #[test]
    fn test_zero_leak_is_allowed() {
        let config = DemoConfig::new(0, 4096, Scope::Thread, OutputFormat::Json, None);
        assert!(config.is_ok());
    }

    #[test]
    fn test_zero_chunk_rejected() {
        let config = DemoConfig::new(1024, 0, Scope::Process, OutputFormat::Summary, None);
        assert!(matches!(config, Err(MeasureError::InvalidConfig(_))));
    }

    #[test]
    fn test_oversized_leak_rejected() {
        let config = DemoConfig::new(
            MAX_LEAK_BYTES + 1,
            4096,
            Scope::Process,
            OutputFormat::Summary,
            None,
        );
        assert!(matches!(config, Err(MeasureError::InvalidConfig(_))));
    }

    #[test]
    fn test_empty_output_path_rejected() {
        let config = DemoConfig::new(
            1024,
            1024,
            Scope::Process,
            OutputFormat::Summary,
            Some(PathBuf::new()),
        );
        assert!(matches!(config, Err(MeasureError::InvalidConfig(_))));
    }
}
