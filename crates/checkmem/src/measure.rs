//! The instrumentation wrapper.
//!
//! A measurement acquires the tracer, snapshots the counters, runs the target
//! inside `catch_unwind`, snapshots again and releases the tracer before
//! anything else happens. Reporting and logging come after the window closes
//! so they never show up in the figures.
//!
//! The target's value, error or panic payload is handed back untouched.

use std::any::{Any, type_name};
use std::panic::{self, AssertUnwindSafe};
use std::time::Instant;

use tracing::{debug, warn};

use crate::config::{MeasureConfig, Scope};
use crate::report::{Outcome, Report};
use crate::reporter::{Reporter, StdoutReporter};
use crate::snapshot::Snapshot;
use crate::tracer;

enum Finished<R> {
    Value(R),
    Panic(Box<dyn Any + Send + 'static>),
}

/// Runs calls under measurement and hands the reports to a [`Reporter`].
pub struct Meter {
    config: MeasureConfig,
    reporter: Box<dyn Reporter>,
}

impl Default for Meter {
    fn default() -> Self {
        Self::new(MeasureConfig::default())
    }
}

impl std::fmt::Debug for Meter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Meter")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Meter {
    /// A meter printing to stdout in the configured format.
    #[must_use]
    pub fn new(config: MeasureConfig) -> Self {
        Self {
            config,
            reporter: Box::new(StdoutReporter::new(config.format())),
        }
    }

    /// Replace where reports are sent
    #[must_use]
    pub fn with_reporter(mut self, reporter: impl Reporter + 'static) -> Self {
        self.reporter = Box::new(reporter);
        self
    }

    #[must_use]
    pub const fn config(&self) -> &MeasureConfig {
        &self.config
    }

    /// Measure `target`, emit the report and return the target's value.
    ///
    /// A panic in `target` is resumed with its original payload after the
    /// report has been emitted (unless `report_on_panic` is off).
    pub fn run<F, R>(&self, label: &str, target: F) -> R
    where
        F: FnOnce() -> R,
    {
        let (finished, report) = self.session(label, target, |_| Outcome::Returned);
        if let Some(report) = &report {
            self.emit(report);
        }
        resolve(finished)
    }

    /// Measure `target` and return the report instead of emitting it.
    ///
    /// The report is `None` when the tracer is unavailable. A panicking
    /// target has no value to return alongside its report, so that report
    /// goes to the reporter before the panic is resumed.
    pub fn run_with_report<F, R>(&self, label: &str, target: F) -> (R, Option<Report>)
    where
        F: FnOnce() -> R,
    {
        let (finished, report) = self.session(label, target, |_| Outcome::Returned);
        match finished {
            Finished::Value(value) => (value, report),
            Finished::Panic(payload) => {
                if let Some(report) = &report {
                    self.emit(report);
                }
                panic::resume_unwind(payload)
            }
        }
    }

    /// Measure a fallible `target`, emit the report and return its result
    /// unchanged. An `Err` is reported with outcome [`Outcome::Failed`].
    ///
    /// # Errors
    ///
    /// Returns exactly the error returned by `target`.
    pub fn try_run<F, T, E>(&self, label: &str, target: F) -> Result<T, E>
    where
        F: FnOnce() -> Result<T, E>,
    {
        let (finished, report) = self.session(label, target, |result: &Result<T, E>| {
            if result.is_ok() {
                Outcome::Returned
            } else {
                Outcome::Failed
            }
        });
        if let Some(report) = &report {
            self.emit(report);
        }
        resolve(finished)
    }

    fn session<F, R>(
        &self,
        label: &str,
        target: F,
        outcome_of: impl FnOnce(&R) -> Outcome,
    ) -> (Finished<R>, Option<Report>)
    where
        F: FnOnce() -> R,
    {
        let guard = match tracer::acquire() {
            Ok(guard) => guard,
            Err(err) => {
                warn!(label, error = %err, "running target without measurement");
                return (Finished::Value(target()), None);
            }
        };

        let started = Instant::now();
        let before = Snapshot::capture();
        let result = panic::catch_unwind(AssertUnwindSafe(target));
        let after = Snapshot::capture();
        let elapsed = started.elapsed();
        let overlapped = guard.release();

        let outcome = match &result {
            Ok(value) => outcome_of(value),
            Err(_) => Outcome::Panicked,
        };
        let scope = self.config.scope();
        let report = Report::new(label, scope, outcome, before, after, overlapped, elapsed);

        if overlapped && scope == Scope::Process {
            warn!(
                label,
                "another thread was measuring concurrently; process-scope figures include its allocations"
            );
        }
        debug!(
            label,
            %scope,
            %outcome,
            delta_bytes = report.delta_bytes(),
            peak_bytes = report.peak_bytes(),
            "measured call"
        );

        let finished = match result {
            Ok(value) => Finished::Value(value),
            Err(payload) => Finished::Panic(payload),
        };
        (finished, Some(report))
    }

    fn emit(&self, report: &Report) {
        if report.outcome() == Outcome::Panicked && !self.config.report_on_panic() {
            return;
        }
        if let Err(err) = self.reporter.emit(report) {
            warn!(label = report.label(), error = %err, "failed to emit report");
        }
    }
}

fn resolve<R>(finished: Finished<R>) -> R {
    match finished {
        Finished::Value(value) => value,
        Finished::Panic(payload) => panic::resume_unwind(payload),
    }
}

/// Measure `target`, print the summary to stdout and return its value.
///
/// ```rust,ignore
/// let data = checkmem::measure(|| vec![0_u8; 1024]);
/// // Memory delta: 1024 bytes
/// // Peak usage: 1024 bytes
/// ```
pub fn measure<F, R>(target: F) -> R
where
    F: FnOnce() -> R,
{
    Meter::default().run(type_name::<F>(), target)
}

/// Measure `target(args)`, labelled with the function's name.
pub fn measure_with<F, A, R>(target: F, args: A) -> R
where
    F: FnOnce(A) -> R,
{
    Meter::default().run(type_name::<F>(), move || target(args))
}

/// Measure a fallible `target`; see [`Meter::try_run`].
///
/// # Errors
///
/// Returns exactly the error returned by `target`.
pub fn try_measure<F, T, E>(target: F) -> Result<T, E>
where
    F: FnOnce() -> Result<T, E>,
{
    Meter::default().try_run(type_name::<F>(), target)
}

/// Measure `target` without printing, returning the value and the report.
///
/// A panicking target is resumed without any report.
pub fn with_measurement<F, R>(target: F) -> (R, Option<Report>)
where
    F: FnOnce() -> R,
{
    silent_meter().run_with_report(type_name::<F>(), target)
}

fn silent_meter() -> Meter {
    Meter::new(MeasureConfig::default().with_report_on_panic(false))
}
