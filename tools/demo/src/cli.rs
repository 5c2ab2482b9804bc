//! CLI definitions using clap.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

use std::path::PathBuf;

use checkmem::{OutputFormat, Result, Scope};
use clap::Parser;

use crate::config::{DEFAULT_LEAK_BYTES, DemoConfig};

/// Retain memory on purpose and report how much the call kept alive
#[derive(Parser, Debug)]
#[command(name = "checkmem-demo")]
#[command(version)]
#[command(
    long_about = "Runs one target function that keeps SIZE bytes reachable from a module-level \
                  accumulator, measures the call with checkmem and prints the heap delta and peak."
)]
pub struct Cli {
    /// Bytes the target retains
    #[arg(short, long, default_value_t = DEFAULT_LEAK_BYTES)]
    pub size: usize,

    /// Size of each retained block (defaults to SIZE)
    #[arg(short, long)]
    pub chunk: Option<usize>,

    /// Counters to report: process or thread
    #[arg(long, default_value_t = Scope::Process)]
    pub scope: Scope,

    /// Report format: summary, verbose or json
    #[arg(short, long, default_value_t = OutputFormat::Summary)]
    pub format: OutputFormat,

    /// Also append the report to this JSON-lines file
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

impl Cli {
    /// Validate the arguments into a run configuration
    ///
    /// # Errors
    ///
    /// Returns error if the sizes or output path are rejected
    pub fn into_config(self) -> Result<DemoConfig> {
        let chunk = self.chunk.unwrap_or_else(|| self.size.max(1));
        DemoConfig::new(self.size, chunk, self.scope, self.format, self.output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cli = Cli::try_parse_from(["checkmem-demo"]);
        assert!(cli.is_ok());
        if let Ok(cli) = cli {
            assert_eq!(cli.size, 1_048_576);
            assert_eq!(cli.scope, Scope::Process);
            assert_eq!(cli.format, OutputFormat::Summary);

            let config = cli.into_config();
            assert!(config.is_ok_and(|c| c.chunk_bytes() == 1_048_576));
        }
    }

    #[test]
    fn test_parses_scope_and_format() {
        let cli = Cli::try_parse_from([
            "checkmem-demo",
            "--size",
            "2048",
            "--chunk",
            "512",
            "--scope",
            "thread",
            "--format",
            "json",
        ]);
        assert!(cli.is_ok());
        if let Ok(cli) = cli {
            assert_eq!(cli.scope, Scope::Thread);
            assert_eq!(cli.format, OutputFormat::Json);
            assert_eq!(cli.chunk, Some(512));
        }
    }

    #[test]
    fn test_rejects_unknown_scope() {
        let cli = Cli::try_parse_from(["checkmem-demo", "--scope", "galaxy"]);
        assert!(cli.is_err());
    }

    #[test]
    fn test_zero_size_gets_nonzero_chunk() {
        let cli = Cli::try_parse_from(["checkmem-demo", "--size", "0"]);
        let config = cli.ok().map(Cli::into_config);
        assert!(matches!(config, Some(Ok(c)) if c.chunk_bytes() == 1));
    }
}
