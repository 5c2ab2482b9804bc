//! Destinations for measurement reports

use crate::config::OutputFormat;
use crate::error::{MeasureError, Result};
use crate::report::Report;
use parking_lot::Mutex;
use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

/// Something that accepts finished reports.
pub trait Reporter: Send + Sync {
    /// Deliver one report.
    ///
    /// # Errors
    ///
    /// Returns error if the report cannot be rendered or written
    fn emit(&self, report: &Report) -> Result<()>;
}

impl<R: Reporter + ?Sized> Reporter for std::sync::Arc<R> {
    fn emit(&self, report: &Report) -> Result<()> {
        (**self).emit(report)
    }
}

/// Writes reports to standard output.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdoutReporter {
    format: OutputFormat,
}

impl StdoutReporter {
    #[must_use]
    pub const fn new(format: OutputFormat) -> Self {
        Self { format }
    }
}

impl Reporter for StdoutReporter {
    fn emit(&self, report: &Report) -> Result<()> {
        let rendered = report.render(self.format)?;
        let mut stdout = std::io::stdout().lock();
        writeln!(stdout, "{rendered}").map_err(|e| MeasureError::ReportWriteFailed(e.to_string()))
    }
}

/// Appends each report as one JSON line to a file.
#[derive(Debug, Clone)]
pub struct JsonlReporter {
    output_path: PathBuf,
}

impl JsonlReporter {
    #[must_use]
    pub const fn new(output_path: PathBuf) -> Self {
        Self { output_path }
    }

    /// Get the output path
    #[must_use]
    pub fn output_path(&self) -> &Path {
        &self.output_path
    }

    /// Read all reports written so far
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read or a line is not a report
    pub fn read_reports(&self) -> Result<Vec<Report>> {
        if !self.output_path.exists() {
            return Ok(Vec::new());
        }

        let file =
            File::open(&self.output_path).map_err(|e| MeasureError::IoError(e.to_string()))?;

        BufReader::new(file)
            .lines()
            .map(|line_result| {
                let line = line_result.map_err(|e| MeasureError::IoError(e.to_string()))?;
                serde_json::from_str(&line).map_err(Into::into)
            })
            .collect()
    }
}

impl Reporter for JsonlReporter {
    fn emit(&self, report: &Report) -> Result<()> {
        let json = serde_json::to_string(report)?;

        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.output_path)
            .map_err(|e| MeasureError::ReportWriteFailed(e.to_string()))?;

        writeln!(file, "{json}").map_err(|e| MeasureError::ReportWriteFailed(e.to_string()))
    }
}

/// Keeps reports in memory.
#[derive(Debug, Default)]
pub struct MemoryReporter {
    reports: Mutex<Vec<Report>>,
}

impl MemoryReporter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Copies of every report received
    #[must_use]
    pub fn reports(&self) -> Vec<Report> {
        self.reports.lock().clone()
    }

    /// Remove and return every report received
    #[must_use]
    pub fn take(&self) -> Vec<Report> {
        std::mem::take(&mut *self.reports.lock())
    }
}

impl Reporter for MemoryReporter {
    fn emit(&self, report: &Report) -> Result<()> {
        self.reports.lock().push(report.clone());
        Ok(())
    }
}

/// Sends each report to every inner reporter, stopping at the first failure.
#[derive(Default)]
pub struct FanoutReporter {
    reporters: Vec<Box<dyn Reporter>>,
}

impl FanoutReporter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, reporter: impl Reporter + 'static) -> Self {
        self.reporters.push(Box::new(reporter));
        self
    }
}

impl std::fmt::Debug for FanoutReporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FanoutReporter")
            .field("reporters", &self.reporters.len())
            .finish()
    }
}

impl Reporter for FanoutReporter {
    fn emit(&self, report: &Report) -> Result<()> {
        self.reporters
            .iter()
            .try_for_each(|reporter| reporter.emit(report))
    }
}
