//! Point-in-time copies of the allocator counters.

use serde::{Deserialize, Serialize};

use crate::alloc;
use crate::config::Scope;

/// Heap counters for one scope.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Counters {
    /// Live bytes
    pub current_bytes: i64,

    /// Highest live byte count seen while tracing in the innermost window
    pub peak_bytes: i64,

    /// Allocations seen while tracing
    pub allocations: u64,

    /// Deallocations seen while tracing
    pub deallocations: u64,

    /// Reallocations seen while tracing
    pub reallocations: u64,
}

/// Counters for the whole process and for the calling thread.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    process: Counters,
    thread: Counters,
}

impl Snapshot {
    /// Read the counters without allocating.
    #[must_use]
    pub fn capture() -> Self {
        Self {
            process: alloc::process_counters(),
            thread: alloc::thread_counters(),
        }
    }

    /// Construct a snapshot from explicit counters
    #[must_use]
    pub const fn from_counters(process: Counters, thread: Counters) -> Self {
        Self { process, thread }
    }

    /// Process-wide counters
    #[must_use]
    pub const fn process(&self) -> &Counters {
        &self.process
    }

    /// Calling-thread counters
    #[must_use]
    pub const fn thread(&self) -> &Counters {
        &self.thread
    }

    /// Counters for the given scope
    #[must_use]
    pub const fn scoped(&self, scope: Scope) -> &Counters {
        match scope {
            Scope::Process => &self.process,
            Scope::Thread => &self.thread,
        }
    }
}

/// Difference between two snapshots in one scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SnapshotDiff {
    /// Live bytes gained (negative when memory was released)
    pub delta_bytes: i64,

    /// Growth of the high-water mark above the starting live bytes
    pub peak_bytes: u64,

    pub allocations: u64,
    pub deallocations: u64,
    pub reallocations: u64,
}

impl SnapshotDiff {
    /// Compare `after` against `before` in `scope`.
    #[must_use]
    pub fn between(before: &Snapshot, after: &Snapshot, scope: Scope) -> Self {
        let start = before.scoped(scope);
        let end = after.scoped(scope);

        // The window may close below where it opened; the peak never goes
        // below the starting point.
        let peak_growth = end
            .peak_bytes
            .max(end.current_bytes)
            .saturating_sub(start.current_bytes);

        Self {
            delta_bytes: end.current_bytes.saturating_sub(start.current_bytes),
            peak_bytes: u64::try_from(peak_growth).unwrap_or(0),
            allocations: end.allocations.saturating_sub(start.allocations),
            deallocations: end.deallocations.saturating_sub(start.deallocations),
            reallocations: end.reallocations.saturating_sub(start.reallocations),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counters(current: i64, peak: i64, allocations: u64) -> Counters {
        Counters {
            current_bytes: current,
            peak_bytes: peak,
            allocations,
            ..Counters::default()
        }
    }

    #[test]
    fn test_diff_reports_growth_and_peak() {
        let before = Snapshot::from_counters(counters(1000, 1000, 5), Counters::default());
        let after = Snapshot::from_counters(counters(3048, 5000, 9), Counters::default());

        let diff = SnapshotDiff::between(&before, &after, Scope::Process);

        assert_eq!(diff.delta_bytes, 2048);
        assert_eq!(diff.peak_bytes, 4000);
        assert_eq!(diff.allocations, 4);
    }

    #[test]
    fn test_diff_negative_delta_clamps_peak() {
        let before = Snapshot::from_counters(Counters::default(), counters(500, 500, 0));
        let after = Snapshot::from_counters(Counters::default(), counters(100, 400, 0));

        let diff = SnapshotDiff::between(&before, &after, Scope::Thread);

        assert_eq!(diff.delta_bytes, -400);
        assert_eq!(diff.peak_bytes, 0);
    }

    #[test]
    fn test_peak_never_below_end_current() {
        // Peak untouched because tracing was off: fall back to live bytes.
        let before = Snapshot::from_counters(counters(0, 0, 0), Counters::default());
        let after = Snapshot::from_counters(counters(256, 0, 0), Counters::default());

        let diff = SnapshotDiff::between(&before, &after, Scope::Process);
        assert_eq!(diff.peak_bytes, 256);
    }

    #[test]
    fn test_scoped_selects_counters() {
        let snapshot = Snapshot::from_counters(counters(1, 1, 0), counters(2, 2, 0));
        assert_eq!(snapshot.scoped(Scope::Process).current_bytes, 1);
        assert_eq!(snapshot.scoped(Scope::Thread).current_bytes, 2);
    }
}
