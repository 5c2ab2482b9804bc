//! Property: the thread-scope delta equals the bytes the target keeps alive.

#![allow(clippy::unwrap_used)]
#![allow(clippy::arithmetic_side_effects)]

use checkmem::{MeasureConfig, MemoryReporter, Meter, Scope, TracingAllocator};
use proptest::prelude::*;

#[global_allocator]
static ALLOCATOR: TracingAllocator = TracingAllocator::system();

fn meter() -> Meter {
    Meter::new(MeasureConfig::new().with_scope(Scope::Thread))
        .with_reporter(MemoryReporter::new())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn returned_buffers_match_delta(sizes in prop::collection::vec(1_usize..8192, 0..8)) {
        let meter = meter();
        let (buffers, report) = meter.run_with_report("buffers", || {
            let mut buffers: Vec<Vec<u8>> = Vec::with_capacity(sizes.len());
            for size in &sizes {
                buffers.push(Vec::with_capacity(*size));
            }
            buffers
        });
        let report = report.unwrap();

        let payload: usize = sizes.iter().sum();
        let container = sizes.len() * std::mem::size_of::<Vec<u8>>();
        prop_assert_eq!(report.delta_bytes(), i64::try_from(payload + container).unwrap());
        prop_assert_eq!(report.peak_bytes(), u64::try_from(payload + container).unwrap());
        prop_assert_eq!(report.allocations(), u64::try_from(buffers.len()).unwrap() + u64::from(!sizes.is_empty()));
        drop(buffers);
    }

    #[test]
    fn dropped_buffers_leave_no_delta(sizes in prop::collection::vec(1_usize..65_536, 1..8)) {
        let meter = meter();
        let ((), report) = meter.run_with_report("scratch", || {
            for size in &sizes {
                drop(std::hint::black_box(Vec::<u8>::with_capacity(*size)));
            }
        });
        let report = report.unwrap();

        prop_assert_eq!(report.delta_bytes(), 0);
        let largest = sizes.iter().copied().max().unwrap_or(0);
        prop_assert_eq!(report.peak_bytes(), u64::try_from(largest).unwrap());
    }
}
