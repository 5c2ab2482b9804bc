//! Global allocator wrapper that accounts heap usage.
//!
//! Live bytes are accounted on every allocation so that a delta taken across
//! any window is exact, independent of when tracing was switched on. Peaks
//! and event counts are only maintained while tracing is enabled.
//!
//! Nothing in this module allocates or logs: it runs inside the allocator.

use std::alloc::{GlobalAlloc, Layout, System};
use std::cell::Cell;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, Ordering};

use crate::snapshot::Counters;

static INSTALLED: AtomicBool = AtomicBool::new(false);
static TRACING: AtomicBool = AtomicBool::new(false);
static PROCESS: AtomicCounters = AtomicCounters::new();

thread_local! {
    static THREAD: LocalCounters = const { LocalCounters::new() };
}

/// A global allocator that accounts every allocation before delegating.
///
/// Register it once per binary:
///
/// ```rust,ignore
/// use checkmem::TracingAllocator;
///
/// #[global_allocator]
/// static ALLOCATOR: TracingAllocator = TracingAllocator::system();
/// ```
pub struct TracingAllocator<A: GlobalAlloc = System> {
    inner: A,
}

impl<A: GlobalAlloc> fmt::Debug for TracingAllocator<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TracingAllocator")
            .field("inner", &"<allocator>")
            .finish()
    }
}

impl TracingAllocator<System> {
    /// Wrap the system allocator.
    #[must_use]
    pub const fn system() -> Self {
        Self { inner: System }
    }
}

impl<A: GlobalAlloc> TracingAllocator<A> {
    /// Wrap an arbitrary allocator.
    #[must_use]
    pub const fn new(allocator: A) -> Self {
        Self { inner: allocator }
    }
}

#[allow(unsafe_code)]
// SAFETY: every call is forwarded to the wrapped allocator with the caller's
// arguments unchanged; accounting only touches atomics and const-initialised
// thread locals, neither of which allocates.
unsafe impl<A: GlobalAlloc> GlobalAlloc for TracingAllocator<A> {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        // SAFETY: forwarded under the same contract.
        let ptr = unsafe { self.inner.alloc(layout) };
        if !ptr.is_null() {
            account(to_signed(layout.size()), Event::Allocation);
        }
        ptr
    }

    unsafe fn alloc_zeroed(&self, layout: Layout) -> *mut u8 {
        // SAFETY: forwarded under the same contract.
        let ptr = unsafe { self.inner.alloc_zeroed(layout) };
        if !ptr.is_null() {
            account(to_signed(layout.size()), Event::Allocation);
        }
        ptr
    }

    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        // SAFETY: ptr was returned by this allocator with the same layout.
        unsafe { self.inner.dealloc(ptr, layout) };
        account(to_signed(layout.size()).wrapping_neg(), Event::Deallocation);
    }

    unsafe fn realloc(&self, ptr: *mut u8, layout: Layout, new_size: usize) -> *mut u8 {
        // SAFETY: forwarded under the same contract.
        let new_ptr = unsafe { self.inner.realloc(ptr, layout, new_size) };
        if !new_ptr.is_null() {
            let delta = to_signed(new_size).wrapping_sub(to_signed(layout.size()));
            account(delta, Event::Reallocation);
        }
        new_ptr
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Event {
    Allocation,
    Deallocation,
    Reallocation,
}

struct AtomicCounters {
    current: AtomicI64,
    peak: AtomicI64,
    allocations: AtomicU64,
    deallocations: AtomicU64,
    reallocations: AtomicU64,
}

impl AtomicCounters {
    const fn new() -> Self {
        Self {
            current: AtomicI64::new(0),
            peak: AtomicI64::new(0),
            allocations: AtomicU64::new(0),
            deallocations: AtomicU64::new(0),
            reallocations: AtomicU64::new(0),
        }
    }

    fn record(&self, delta: i64, event: Event, tracing: bool) {
        let now = self
            .current
            .fetch_add(delta, Ordering::Relaxed)
            .wrapping_add(delta);
        if !tracing {
            return;
        }
        if delta > 0 {
            self.peak.fetch_max(now, Ordering::Relaxed);
        }
        let counter = match event {
            Event::Allocation => &self.allocations,
            Event::Deallocation => &self.deallocations,
            Event::Reallocation => &self.reallocations,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn load(&self) -> Counters {
        Counters {
            current_bytes: self.current.load(Ordering::Acquire),
            peak_bytes: self.peak.load(Ordering::Acquire),
            allocations: self.allocations.load(Ordering::Acquire),
            deallocations: self.deallocations.load(Ordering::Acquire),
            reallocations: self.reallocations.load(Ordering::Acquire),
        }
    }
}

struct LocalCounters {
    current: Cell<i64>,
    peak: Cell<i64>,
    allocations: Cell<u64>,
    deallocations: Cell<u64>,
    reallocations: Cell<u64>,
}

impl LocalCounters {
    const fn new() -> Self {
        Self {
            current: Cell::new(0),
            peak: Cell::new(0),
            allocations: Cell::new(0),
            deallocations: Cell::new(0),
            reallocations: Cell::new(0),
        }
    }

    fn record(&self, delta: i64, event: Event, tracing: bool) {
        let now = self.current.get().wrapping_add(delta);
        self.current.set(now);
        if !tracing {
            return;
        }
        if now > self.peak.get() {
            self.peak.set(now);
        }
        let counter = match event {
            Event::Allocation => &self.allocations,
            Event::Deallocation => &self.deallocations,
            Event::Reallocation => &self.reallocations,
        };
        counter.set(counter.get().wrapping_add(1));
    }

    fn load(&self) -> Counters {
        Counters {
            current_bytes: self.current.get(),
            peak_bytes: self.peak.get(),
            allocations: self.allocations.get(),
            deallocations: self.deallocations.get(),
            reallocations: self.reallocations.get(),
        }
    }
}

fn account(delta: i64, event: Event) {
    if !INSTALLED.load(Ordering::Relaxed) {
        INSTALLED.store(true, Ordering::Release);
    }
    let tracing = TRACING.load(Ordering::Relaxed);
    PROCESS.record(delta, event, tracing);
    // Fails only during thread teardown, when there is nothing left to report.
    let _ = THREAD.try_with(|local| local.record(delta, event, tracing));
}

fn to_signed(size: usize) -> i64 {
    i64::try_from(size).unwrap_or(i64::MAX)
}

/// Whether a [`TracingAllocator`] is serving this process's allocations.
///
/// Performs one probe allocation the first time it is asked before anything
/// has been accounted.
#[must_use]
pub fn is_installed() -> bool {
    if INSTALLED.load(Ordering::Acquire) {
        return true;
    }
    drop(std::hint::black_box(Box::new(0_u8)));
    INSTALLED.load(Ordering::Acquire)
}

pub(crate) fn set_tracing(enabled: bool) {
    TRACING.store(enabled, Ordering::Release);
}

pub(crate) fn tracing_enabled() -> bool {
    TRACING.load(Ordering::Acquire)
}

pub(crate) fn process_counters() -> Counters {
    PROCESS.load()
}

pub(crate) fn thread_counters() -> Counters {
    THREAD.try_with(LocalCounters::load).unwrap_or_default()
}

/// Peaks that were running before a window was opened.
///
/// `process` is `None` when the window left the process peak untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct PeakMark {
    process: Option<i64>,
    thread: i64,
}

/// Reset the thread peak to the live byte count, and the process peak too
/// when `reset_process` is set, returning the previous peaks.
pub(crate) fn open_peak_window(reset_process: bool) -> PeakMark {
    let process = reset_process.then(|| {
        let live = PROCESS.current.load(Ordering::Acquire);
        PROCESS.peak.swap(live, Ordering::AcqRel)
    });
    let thread = THREAD
        .try_with(|local| local.peak.replace(local.current.get()))
        .unwrap_or(0);
    PeakMark { process, thread }
}

/// Fold the window's peaks back into the peaks saved by [`open_peak_window`].
///
/// The saved process peak is only folded back when `restore_process` is set,
/// that is when an older session still needs it.
pub(crate) fn close_peak_window(mark: PeakMark, restore_process: bool) {
    if let Some(saved) = mark.process.filter(|_| restore_process) {
        PROCESS.peak.fetch_max(saved, Ordering::AcqRel);
    }
    let _ = THREAD.try_with(|local| {
        if mark.thread > local.peak.get() {
            local.peak.set(mark.thread);
        }
    });
}
