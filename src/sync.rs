//! The synchronization engine: staleness policy and background refresh.
//!
//! The engine owns the snapshot lifecycle. Reads are always served from the current snapshot; a
//! staleness check may additionally trigger a fire-and-forget background refresh that replaces
//! the snapshot once the fetch settles (stale-while-revalidate). Evaluation callers are never
//! blocked on network I/O.
use std::{
    sync::{
        atomic::{AtomicBool, AtomicU32, Ordering},
        Arc, Condvar, Mutex,
    },
    time::{Duration, Instant},
};

use crate::{
    flags::FlagsSnapshot, rate_limiter::RateLimiter, snapshot_store::SnapshotStore,
    transport::Transport, Result,
};

/// Throttle key for background refresh attempts.
const FETCH_RATE_LIMIT_KEY: &str = "fetch_flags";

/// Drives snapshot refreshes based on a time threshold and an evaluation-count threshold.
///
/// At most one refresh is in flight at a time; the guard is an atomically checked-and-set flag,
/// so the invariant holds even with truly parallel callers.
pub struct SyncEngine {
    inner: Arc<SyncInner>,
}

struct SyncInner {
    store: Arc<SnapshotStore>,
    transport: Arc<dyn Transport>,
    rate_limiter: Arc<RateLimiter>,
    refresh_interval: Duration,
    max_evaluations_before_refresh: u32,
    debug: bool,
    /// `None` until the first successful fetch (the cold state).
    last_refreshed_at: Mutex<Option<Instant>>,
    evaluations_since_refresh: AtomicU32,
    refresh_in_flight: AtomicBool,
    idle: (Mutex<()>, Condvar),
}

impl SyncEngine {
    /// Create an engine over the given store and transport.
    pub fn new(
        store: Arc<SnapshotStore>,
        transport: Arc<dyn Transport>,
        rate_limiter: Arc<RateLimiter>,
        refresh_interval: Duration,
        max_evaluations_before_refresh: u32,
        debug: bool,
    ) -> SyncEngine {
        SyncEngine {
            inner: Arc::new(SyncInner {
                store,
                transport,
                rate_limiter,
                refresh_interval,
                max_evaluations_before_refresh,
                debug,
                last_refreshed_at: Mutex::new(None),
                evaluations_since_refresh: AtomicU32::new(0),
                refresh_in_flight: AtomicBool::new(false),
                idle: (Mutex::new(()), Condvar::new()),
            }),
        }
    }

    /// Fetch flags on the caller's thread, replacing the snapshot on success.
    ///
    /// This is the cold path used by `initialize()`; it is not gated by staleness or the rate
    /// limiter. If a background refresh is already in flight, waits for it instead of fetching
    /// again.
    pub fn refresh_blocking(&self) -> Result<()> {
        if !self.inner.begin_refresh() {
            self.wait_until_idle();
            return Ok(());
        }
        let result = self.inner.try_refresh();
        self.inner.finish_refresh();
        result
    }

    /// Trigger a background refresh if the snapshot is stale and no refresh is in flight.
    ///
    /// Returns immediately in all cases; the caller keeps being served from the current
    /// (possibly stale) snapshot while the refresh runs.
    pub fn maybe_refresh(&self) {
        if !self.inner.is_stale() {
            return;
        }
        if !self.inner.begin_refresh() {
            // A refresh is already in flight; staleness checks are suppressed until it settles.
            return;
        }
        if self
            .inner
            .rate_limiter
            .rate_limited(FETCH_RATE_LIMIT_KEY, || ())
            .is_none()
        {
            self.inner.finish_refresh();
            return;
        }

        log::debug!(target: "flagkit", "flags are stale, triggering background refresh");

        let inner = Arc::clone(&self.inner);
        let spawned = std::thread::Builder::new()
            .name("flagkit-refresh".to_owned())
            .spawn(move || {
                if let Err(err) = inner.try_refresh() {
                    log::error!(target: "flagkit", "failed to refresh flags: {}", err);
                }
                inner.finish_refresh();
            });
        if let Err(err) = spawned {
            log::error!(target: "flagkit", "failed to spawn refresh thread: {}", err);
            self.inner.finish_refresh();
        }
    }

    /// Record one evaluation against the count-based staleness threshold.
    pub fn record_evaluation(&self) {
        self.inner
            .evaluations_since_refresh
            .fetch_add(1, Ordering::AcqRel);
    }

    /// Block until no refresh is in flight.
    pub fn wait_until_idle(&self) {
        let mut guard = self
            .inner
            .idle
            .0
            .lock()
            .expect("thread holding idle lock should not panic");
        while self.inner.refresh_in_flight.load(Ordering::Acquire) {
            guard = self
                .inner
                .idle
                .1
                .wait(guard)
                .expect("thread holding idle lock should not panic");
        }
    }
}

impl SyncInner {
    fn is_stale(&self) -> bool {
        let last_refreshed_at = *self
            .last_refreshed_at
            .lock()
            .expect("thread holding refresh timestamp lock should not panic");
        match last_refreshed_at {
            // Cold: nothing has been fetched yet.
            None => true,
            Some(at) => {
                at.elapsed() > self.refresh_interval
                    || self.evaluations_since_refresh.load(Ordering::Acquire)
                        >= self.max_evaluations_before_refresh
            }
        }
    }

    /// Claim the refresh slot. Returns `false` if a refresh is already in flight.
    fn begin_refresh(&self) -> bool {
        self.refresh_in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    fn finish_refresh(&self) {
        // Flip the flag while holding the idle lock so waiters can't miss the wakeup.
        let _guard = self
            .idle
            .0
            .lock()
            .expect("thread holding idle lock should not panic");
        self.refresh_in_flight.store(false, Ordering::Release);
        self.idle.1.notify_all();
    }

    /// Fetch and, on success, atomically replace the snapshot and reset the staleness counters.
    /// On failure the previous snapshot is left untouched.
    fn try_refresh(&self) -> Result<()> {
        let flags = self.transport.fetch_flags()?;
        let count = flags.len();

        self.store
            .set_snapshot(Arc::new(FlagsSnapshot::from_flags(flags)));
        *self
            .last_refreshed_at
            .lock()
            .expect("thread holding refresh timestamp lock should not panic") = Some(Instant::now());
        self.evaluations_since_refresh.store(0, Ordering::Release);

        if self.debug {
            log::info!(target: "flagkit", count; "flags refreshed");
        } else {
            log::debug!(target: "flagkit", count; "flags refreshed");
        }
        Ok(())
    }
}
