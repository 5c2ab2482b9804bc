//! Measure heap growth across a single function call.
//!
//! Register [`TracingAllocator`] as the global allocator, then wrap the call
//! you want to inspect:
//!
//! ```rust,ignore
//! use checkmem::{MeasureConfig, Meter, Scope, TracingAllocator};
//!
//! #[global_allocator]
//! static ALLOCATOR: TracingAllocator = TracingAllocator::system();
//!
//! fn main() {
//!     // Prints "Memory delta: <N> bytes" and "Peak usage: <N> bytes"
//!     let table = checkmem::measure(|| build_table());
//!
//!     // Or keep the report
//!     let meter = Meter::new(MeasureConfig::new().with_scope(Scope::Thread));
//!     let (table, report) = meter.run_with_report("build_table", build_table);
//! }
//! ```
//!
//! Live bytes are tracked from the moment the allocator serves its first
//! request, so deltas are exact regardless of when tracing is enabled. Peaks
//! and event counts only cover the time tracing is on, which the tracer
//! manages with a reference count: measurements may nest on one thread
//! without disturbing each other.
//!
//! Measurements running concurrently on several threads each get correct
//! [`Scope::Thread`] figures. In [`Scope::Process`] they see each other's
//! allocations, and the report is marked as overlapped.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod alloc;
pub mod config;
pub mod error;
pub mod measure;
pub mod report;
pub mod reporter;
pub mod snapshot;
pub mod tracer;

pub use alloc::{TracingAllocator, is_installed};
pub use config::{MeasureConfig, OutputFormat, Scope};
pub use error::{MeasureError, Result};
pub use measure::{Meter, measure, measure_with, try_measure, with_measurement};
pub use report::{Outcome, Report};
pub use reporter::{FanoutReporter, JsonlReporter, MemoryReporter, Reporter, StdoutReporter};
pub use snapshot::{Counters, Snapshot, SnapshotDiff};
pub use tracer::TraceGuard;

#[cfg(test)]
#[global_allocator]
static TEST_ALLOCATOR: TracingAllocator = TracingAllocator::system();
