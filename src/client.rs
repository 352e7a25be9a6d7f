use std::{
    collections::{hash_map::Entry, HashMap},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use crate::{
    context::Context,
    eval::evaluate_flag,
    events::{EventTask, TelemetryEvent},
    flags::{Flag, FlagsSnapshot},
    overrides::OverrideStore,
    rate_limiter::RateLimiter,
    snapshot_store::SnapshotStore,
    sync::SyncEngine,
    transport::{HttpTransport, Transport},
    ClientConfig, Error, Result,
};

/// The per-call entry point for flag evaluation.
///
/// A client owns a cached snapshot of flag definitions and decides, per call, whether a flag is
/// enabled for a caller-supplied [`Context`]. Reads are always served synchronously from the
/// snapshot; staleness triggers a background refresh that never blocks the evaluating caller.
///
/// In order to create a client instance, first create a [`ClientConfig`].
///
/// # Examples
/// ```no_run
/// # use flagkit::{ClientConfig, Context};
/// let client = ClientConfig::from_secret_key("secret-key").to_client().unwrap();
/// client.initialize().unwrap();
/// let enabled = client.get_flag("new-checkout", &Context::for_user("user-1"), false);
/// ```
pub struct FlagsClient {
    store: Arc<SnapshotStore>,
    engine: SyncEngine,
    overrides: Arc<OverrideStore>,
    rate_limiter: Arc<RateLimiter>,
    transport: Arc<dyn Transport>,
    initialized: AtomicBool,
}

impl FlagsClient {
    /// Create a new `FlagsClient` using the specified configuration.
    pub fn new(config: ClientConfig) -> Result<FlagsClient> {
        let transport: Arc<dyn Transport> = match config.transport {
            Some(transport) => transport,
            None => Arc::new(HttpTransport::new(
                &config.base_url,
                config.secret_key,
                config.timeout,
            )?),
        };

        let store = Arc::new(match config.default_flags {
            Some(default_flags) => {
                SnapshotStore::with_snapshot(FlagsSnapshot::from_map(default_flags))
            }
            None => SnapshotStore::new(),
        });

        let rate_limiter = Arc::new(RateLimiter::new(config.events_per_minute));

        let engine = SyncEngine::new(
            Arc::clone(&store),
            Arc::clone(&transport),
            Arc::clone(&rate_limiter),
            config.refresh_interval,
            config.max_evaluations_before_refresh,
            config.debug,
        );

        Ok(FlagsClient {
            store,
            engine,
            overrides: Arc::new(OverrideStore::new()),
            rate_limiter,
            transport,
            initialized: AtomicBool::new(false),
        })
    }

    /// Fetch flags for the first time, blocking until the fetch settles.
    ///
    /// Optional: `get_flag` triggers fetches on demand, but calling this once at startup ensures
    /// flags are ready before the first evaluation.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AlreadyInitialized`] on a second call (a lifecycle bug in the
    /// integrating application), or a transport error if the first fetch fails. A fetch failure
    /// leaves the client usable: evaluations serve the configured defaults until a later refresh
    /// succeeds.
    pub fn initialize(&self) -> Result<()> {
        if self
            .initialized
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(Error::AlreadyInitialized);
        }
        self.engine.refresh_blocking()
    }

    /// Whether [`initialize`](FlagsClient::initialize) has been called.
    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Acquire)
    }

    /// Get the evaluated value of a flag for the given context. Always returns a boolean.
    ///
    /// An override, when set, is returned verbatim and bypasses rule evaluation entirely.
    /// Otherwise the staleness check runs *before* evaluation, so a just-crossed threshold means
    /// this very call is served from the about-to-be-superseded snapshot while the refresh runs
    /// in the background.
    ///
    /// `default_value` is returned when the flag key is absent from the snapshot — distinct from
    /// a flag that exists but whose rules say disabled.
    pub fn get_flag(&self, flag_key: &str, context: &Context, default_value: bool) -> bool {
        if let Some(value) = self.overrides.get(flag_key) {
            log::trace!(target: "flagkit", flag_key, value; "serving override");
            return value;
        }

        self.engine.maybe_refresh();

        let snapshot = self.store.get_snapshot();
        let evaluation = evaluate_flag(flag_key, &snapshot.flags, context);
        self.engine.record_evaluation();

        log::trace!(target: "flagkit",
                    flag_key,
                    context:serde,
                    is_enabled = evaluation.is_enabled;
                    "evaluated flag");

        // Best-effort; throttled or failed sends never affect the verdict.
        let _ = self.send_event(TelemetryEvent::check_flag_access(flag_key, context.clone()));

        if !snapshot.flags.contains_key(flag_key) {
            return default_value;
        }
        evaluation.is_enabled
    }

    /// All flags from the current snapshot with overrides merged on top.
    ///
    /// An override for a key absent from the snapshot yields a synthesized placeholder record,
    /// so the merged view is complete for display purposes.
    pub fn get_flags(&self) -> HashMap<String, Flag> {
        let snapshot = self.store.get_snapshot();
        let mut merged = snapshot.flags.clone();

        for (key, is_enabled) in self.overrides.get_all() {
            match merged.entry(key) {
                Entry::Occupied(mut entry) => entry.get_mut().is_enabled = is_enabled,
                Entry::Vacant(entry) => {
                    let flag = Flag::synthetic(entry.key().clone(), is_enabled);
                    entry.insert(flag);
                }
            }
        }

        merged
    }

    /// The raw snapshot, without overrides. Useful for debugging.
    pub fn snapshot(&self) -> Arc<FlagsSnapshot> {
        self.store.get_snapshot()
    }

    /// Force `flag_key` to `value` for the rest of the session.
    pub fn set_override(&self, flag_key: impl Into<String>, value: bool) {
        self.overrides.set(flag_key, value);
    }

    /// Remove the override for `flag_key`, restoring rule-based evaluation.
    pub fn clear_override(&self, flag_key: &str) {
        self.overrides.clear(flag_key);
    }

    /// Remove all overrides.
    pub fn clear_all_overrides(&self) {
        self.overrides.clear_all();
    }

    /// The override store, e.g. for subscribing to override changes.
    pub fn overrides(&self) -> Arc<OverrideStore> {
        Arc::clone(&self.overrides)
    }

    /// Send a telemetry event, rate-limited per event key.
    ///
    /// Returns `None` when the event was throttled, otherwise a handle to the in-flight send
    /// that the caller may [`wait`](EventTask::wait) on or simply drop. Send failures are
    /// logged, never surfaced.
    pub fn send_event(&self, event: TelemetryEvent) -> Option<EventTask> {
        let key = event.rate_limit_key();
        self.rate_limiter.rate_limited(&key, || ())?;

        let transport = Arc::clone(&self.transport);
        let spawned = std::thread::Builder::new()
            .name("flagkit-events".to_owned())
            .spawn(move || {
                if let Err(err) = transport.send_event(&event) {
                    log::error!(target: "flagkit", "failed to send telemetry event: {}", err);
                }
            });

        match spawned {
            Ok(handle) => Some(EventTask::new(handle)),
            Err(err) => {
                log::error!(target: "flagkit", "failed to spawn telemetry thread: {}", err);
                None
            }
        }
    }

    /// Block until any in-flight background refresh settles.
    pub fn wait_for_refresh(&self) {
        self.engine.wait_until_idle();
    }
}
