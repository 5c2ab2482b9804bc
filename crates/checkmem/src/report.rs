//! Measurement reports and their text renderings.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::{OutputFormat, Scope};
use crate::error::Result;
use crate::snapshot::{Snapshot, SnapshotDiff};

/// Bytes per "MB" in the verbose rendering.
const MB: f64 = 1024.0 * 1000.0;

const RULE: &str = "------------------------------------------------------";

/// How the measured target finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Returned,
    Failed,
    Panicked,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Returned => f.write_str("returned"),
            Self::Failed => f.write_str("failed"),
            Self::Panicked => f.write_str("panicked"),
        }
    }
}

/// Result of measuring one call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    /// Name of the measured target
    label: String,

    scope: Scope,

    outcome: Outcome,

    /// Snapshot taken immediately before the call
    before: Snapshot,

    /// Snapshot taken immediately after the call
    after: Snapshot,

    /// Live bytes gained across the call
    delta_bytes: i64,

    /// Growth of the high-water mark above the live bytes at the start
    peak_bytes: u64,

    allocations: u64,
    deallocations: u64,
    reallocations: u64,

    /// Another thread measured concurrently; process-scope figures include it
    overlapped: bool,

    elapsed_micros: u64,

    /// When the report was produced
    timestamp: DateTime<Utc>,
}

impl Report {
    /// Build a report from the two snapshots bracketing a call.
    #[must_use]
    pub fn new(
        label: impl Into<String>,
        scope: Scope,
        outcome: Outcome,
        before: Snapshot,
        after: Snapshot,
        overlapped: bool,
        elapsed: Duration,
    ) -> Self {
        let diff = SnapshotDiff::between(&before, &after, scope);
        Self {
            label: label.into(),
            scope,
            outcome,
            before,
            after,
            delta_bytes: diff.delta_bytes,
            peak_bytes: diff.peak_bytes,
            allocations: diff.allocations,
            deallocations: diff.deallocations,
            reallocations: diff.reallocations,
            overlapped,
            elapsed_micros: u64::try_from(elapsed.as_micros()).unwrap_or(u64::MAX),
            timestamp: Utc::now(),
        }
    }

    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    #[must_use]
    pub const fn scope(&self) -> Scope {
        self.scope
    }

    #[must_use]
    pub const fn outcome(&self) -> Outcome {
        self.outcome
    }

    #[must_use]
    pub const fn before(&self) -> &Snapshot {
        &self.before
    }

    #[must_use]
    pub const fn after(&self) -> &Snapshot {
        &self.after
    }

    /// Live bytes gained across the call (negative if the call freed memory)
    #[must_use]
    pub const fn delta_bytes(&self) -> i64 {
        self.delta_bytes
    }

    /// Highest growth above the starting live bytes observed during the call
    #[must_use]
    pub const fn peak_bytes(&self) -> u64 {
        self.peak_bytes
    }

    #[must_use]
    pub const fn allocations(&self) -> u64 {
        self.allocations
    }

    #[must_use]
    pub const fn deallocations(&self) -> u64 {
        self.deallocations
    }

    #[must_use]
    pub const fn reallocations(&self) -> u64 {
        self.reallocations
    }

    #[must_use]
    pub const fn overlapped(&self) -> bool {
        self.overlapped
    }

    #[must_use]
    pub const fn elapsed(&self) -> Duration {
        Duration::from_micros(self.elapsed_micros)
    }

    #[must_use]
    pub const fn timestamp(&self) -> &DateTime<Utc> {
        &self.timestamp
    }

    /// The two-line delta/peak rendering.
    #[must_use]
    pub const fn summary(&self) -> Summary<'_> {
        Summary(self)
    }

    /// The before/after block rendering.
    #[must_use]
    pub const fn verbose(&self) -> Verbose<'_> {
        Verbose(self)
    }

    /// Render in the given format, without a trailing newline.
    ///
    /// # Errors
    ///
    /// Returns error if JSON serialization fails
    pub fn render(&self, format: OutputFormat) -> Result<String> {
        match format {
            OutputFormat::Summary => Ok(self.summary().to_string()),
            OutputFormat::Verbose => Ok(self.verbose().to_string()),
            OutputFormat::Json => Ok(serde_json::to_string(self)?),
        }
    }
}

/// Display adapter for [`Report::summary`].
#[derive(Debug, Clone, Copy)]
pub struct Summary<'a>(&'a Report);

impl fmt::Display for Summary<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Memory delta: {} bytes", self.0.delta_bytes)?;
        write!(f, "Peak usage: {} bytes", self.0.peak_bytes)
    }
}

/// Display adapter for [`Report::verbose`].
#[derive(Debug, Clone, Copy)]
pub struct Verbose<'a>(&'a Report);

#[allow(clippy::cast_precision_loss)] // Display only
fn as_mb(bytes: i64) -> f64 {
    bytes as f64 / MB
}

impl fmt::Display for Verbose<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let report = self.0;
        let before = report.before.scoped(report.scope);
        let after = report.after.scoped(report.scope);

        writeln!(f, "{RULE}")?;
        writeln!(f, "Before calling        : {}", report.label)?;
        writeln!(f, "Current Heap Size MB  : {:.4}", as_mb(before.current_bytes))?;
        writeln!(f, "Peak Heap Size MB     : {:.4}", as_mb(before.peak_bytes))?;
        writeln!(f, "{RULE}")?;
        writeln!(f)?;
        writeln!(f, "After calling         : {}", report.label)?;
        writeln!(f, "Current Heap Size MB  : {:.4}", as_mb(after.current_bytes))?;
        writeln!(f, "Peak Heap Size MB     : {:.4}", as_mb(after.peak_bytes))?;
        writeln!(f, "Outcome               : {}", report.outcome)?;
        writeln!(f, "Scope                 : {}", report.scope)?;
        writeln!(f, "Allocations           : {}", report.allocations)?;
        writeln!(f, "Deallocations         : {}", report.deallocations)?;
        writeln!(f, "Reallocations         : {}", report.reallocations)?;
        writeln!(f, "Elapsed               : {:?}", report.elapsed())?;
        if report.overlapped {
            writeln!(f, "Overlapped            : another thread was measuring")?;
        }
        writeln!(f)?;
        writeln!(f, "{}", report.summary())?;
        write!(f, "{RULE}")
    }
}
