//! Reference-counted control of the allocation tracer.
//!
//! Tracing is process-wide. Every measurement acquires a [`TraceGuard`];
//! the first acquisition enables tracing and the last release disables it,
//! unless tracing was switched on explicitly with [`start`]. Guards nest on a
//! thread in LIFO order, so an inner measurement never cuts tracing off
//! under an outer one.
//!
//! Sessions that overlap across threads are detected, not corrected: their
//! process-scope figures include each other's allocations.

use std::marker::PhantomData;
use std::thread::{self, ThreadId};

use parking_lot::Mutex;

use crate::alloc::{self, PeakMark};
use crate::error::{MeasureError, Result};

static STATE: Mutex<TracerState> = Mutex::new(TracerState::new());

#[derive(Debug)]
struct TracerState {
    /// Live guards
    depth: usize,

    /// Tracing was enabled by `start()` rather than by a guard
    external: bool,

    /// Every live guard, oldest first
    active: Vec<Session>,

    /// Last sequence number handed out
    sequence: u64,

    /// Bumped whenever a guard is acquired while another thread holds one
    overlaps: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Session {
    thread: ThreadId,
    sequence: u64,
}

impl TracerState {
    const fn new() -> Self {
        Self {
            depth: 0,
            external: false,
            active: Vec::new(),
            sequence: 0,
            overlaps: 0,
        }
    }
}

/// Scoped acquisition of the tracer.
///
/// Dropping the guard releases it; [`TraceGuard::release`] does the same and
/// reports whether the session overlapped one on another thread.
#[derive(Debug)]
#[must_use = "tracing is released as soon as the guard is dropped"]
pub struct TraceGuard {
    mark: Option<PeakMark>,
    session: Session,
    overlapped_at_start: bool,
    overlaps_at_start: u64,
    /// Peaks are restored into thread-local counters of the acquiring thread
    _not_send: PhantomData<*const ()>,
}

impl TraceGuard {
    /// Whether another thread's session has been active during this one so far.
    #[must_use]
    pub fn overlapped(&self) -> bool {
        self.overlapped_at_start || STATE.lock().overlaps != self.overlaps_at_start
    }

    /// Release the guard, returning whether the session overlapped another.
    pub fn release(mut self) -> bool {
        self.finish()
    }

    fn finish(&mut self) -> bool {
        let Some(mark) = self.mark.take() else {
            return false;
        };

        let mut state = STATE.lock();
        let overlapped = self.overlapped_at_start || state.overlaps != self.overlaps_at_start;
        if let Some(pos) = state.active.iter().position(|s| *s == self.session) {
            state.active.remove(pos);
        }
        // Only a session opened before this one can still need the older peak.
        let older_running = state
            .active
            .iter()
            .any(|s| s.sequence < self.session.sequence);
        alloc::close_peak_window(mark, older_running);
        state.depth = state.depth.saturating_sub(1);
        if state.depth == 0 && !state.external {
            alloc::set_tracing(false);
        }
        overlapped
    }
}

impl Drop for TraceGuard {
    fn drop(&mut self) {
        self.finish();
    }
}

fn ensure_installed() -> Result<()> {
    if alloc::is_installed() {
        Ok(())
    } else {
        Err(MeasureError::TracerUnavailable(
            "no TracingAllocator is registered as the #[global_allocator]".to_string(),
        ))
    }
}

/// Acquire the tracer for one measurement session.
///
/// Enables tracing if this is the first live guard, then resets the running
/// peaks so they cover only this session. The process peak is left alone
/// while another thread is measuring, so it only ever grows under that
/// thread's session.
///
/// # Errors
///
/// Returns [`MeasureError::TracerUnavailable`] if the process is not
/// allocating through a [`crate::TracingAllocator`].
pub fn acquire() -> Result<TraceGuard> {
    ensure_installed()?;

    let me = thread::current().id();
    let mut state = STATE.lock();
    let foreign = state.active.iter().any(|s| s.thread != me);
    if foreign {
        state.overlaps = state.overlaps.wrapping_add(1);
    }
    state.sequence = state.sequence.wrapping_add(1);
    let session = Session {
        thread: me,
        sequence: state.sequence,
    };
    state.active.push(session);
    state.depth = state.depth.saturating_add(1);
    alloc::set_tracing(true);
    let overlaps_at_start = state.overlaps;

    // Last step so nothing allocated above lands in the window's peak.
    let mark = alloc::open_peak_window(!foreign);
    drop(state);

    Ok(TraceGuard {
        mark: Some(mark),
        session,
        overlapped_at_start: foreign,
        overlaps_at_start,
        _not_send: PhantomData,
    })
}

/// Enable tracing independently of any measurement.
///
/// Measurements taken while started this way leave tracing enabled when they
/// finish. Peaks are reset unless a measurement is already running.
///
/// # Errors
///
/// Returns [`MeasureError::TracerUnavailable`] if no tracing allocator is
/// registered.
pub fn start() -> Result<()> {
    ensure_installed()?;

    let mut state = STATE.lock();
    state.external = true;
    alloc::set_tracing(true);
    if state.depth == 0 {
        let _ = alloc::open_peak_window(true);
    }
    Ok(())
}

/// Undo [`start`]. Tracing stays on while measurements are still running.
pub fn stop() {
    let mut state = STATE.lock();
    state.external = false;
    if state.depth == 0 {
        alloc::set_tracing(false);
    }
}

/// Whether tracing is currently enabled.
#[must_use]
pub fn is_tracing() -> bool {
    alloc::tracing_enabled()
}

/// Number of live guards across all threads.
#[must_use]
pub fn depth() -> usize {
    STATE.lock().depth
}
