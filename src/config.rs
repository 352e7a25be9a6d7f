use std::{collections::HashMap, sync::Arc, time::Duration};

use crate::{flags::Flag, transport::Transport, FlagsClient, Result};

/// Configuration for [`FlagsClient`].
pub struct ClientConfig {
    pub(crate) secret_key: String,
    pub(crate) base_url: String,
    pub(crate) refresh_interval: Duration,
    pub(crate) max_evaluations_before_refresh: u32,
    pub(crate) events_per_minute: u32,
    pub(crate) timeout: Duration,
    pub(crate) debug: bool,
    pub(crate) default_flags: Option<HashMap<String, Flag>>,
    pub(crate) transport: Option<Arc<dyn Transport>>,
}

impl ClientConfig {
    /// Default base URL for API calls.
    pub const DEFAULT_BASE_URL: &'static str = "https://api.flagkit.dev";
    /// Default staleness time threshold.
    pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(60);
    /// Default staleness count threshold.
    pub const DEFAULT_MAX_EVALUATIONS_BEFORE_REFRESH: u32 = 200;
    /// Default telemetry budget per throttle key. Deliberately strict to bound telemetry volume.
    pub const DEFAULT_EVENTS_PER_MINUTE: u32 = 1;
    /// Default request timeout for the HTTP transport.
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

    /// Create a default configuration using the specified secret key.
    ///
    /// ```
    /// # use flagkit::ClientConfig;
    /// ClientConfig::from_secret_key("secret-key");
    /// ```
    pub fn from_secret_key(secret_key: impl Into<String>) -> ClientConfig {
        ClientConfig {
            secret_key: secret_key.into(),
            base_url: ClientConfig::DEFAULT_BASE_URL.to_owned(),
            refresh_interval: ClientConfig::DEFAULT_REFRESH_INTERVAL,
            max_evaluations_before_refresh: ClientConfig::DEFAULT_MAX_EVALUATIONS_BEFORE_REFRESH,
            events_per_minute: ClientConfig::DEFAULT_EVENTS_PER_MINUTE,
            timeout: ClientConfig::DEFAULT_TIMEOUT,
            debug: false,
            default_flags: None,
            transport: None,
        }
    }

    /// Override base URL for API calls. Clients should use the default setting in most cases.
    pub fn base_url(mut self, base_url: impl Into<String>) -> ClientConfig {
        self.base_url = base_url.into();
        self
    }

    /// How long a snapshot stays fresh before an evaluation triggers a background refresh.
    pub fn refresh_interval(mut self, refresh_interval: Duration) -> ClientConfig {
        self.refresh_interval = refresh_interval;
        self
    }

    /// How many evaluations are served from a snapshot before a background refresh is forced.
    pub fn max_evaluations_before_refresh(mut self, max_evaluations: u32) -> ClientConfig {
        self.max_evaluations_before_refresh = max_evaluations;
        self
    }

    /// Telemetry budget: accepted events per throttle key per minute.
    pub fn events_per_minute(mut self, events_per_minute: u32) -> ClientConfig {
        self.events_per_minute = events_per_minute;
        self
    }

    /// Request timeout for the HTTP transport.
    pub fn timeout(mut self, timeout: Duration) -> ClientConfig {
        self.timeout = timeout;
        self
    }

    /// Enable verbose logging of SDK operations.
    pub fn debug(mut self, debug: bool) -> ClientConfig {
        self.debug = debug;
        self
    }

    /// Seed snapshot served before the first fetch completes (and after failed fetches).
    pub fn default_flags(mut self, default_flags: HashMap<String, Flag>) -> ClientConfig {
        self.default_flags = Some(default_flags);
        self
    }

    /// Inject a custom [`Transport`] instead of the HTTP transport built from `base_url`.
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> ClientConfig {
        self.transport = Some(transport);
        self
    }

    /// Create a new [`FlagsClient`] using this configuration.
    ///
    /// ```no_run
    /// # use flagkit::{ClientConfig, FlagsClient};
    /// let client: FlagsClient = ClientConfig::from_secret_key("secret-key").to_client().unwrap();
    /// ```
    pub fn to_client(self) -> Result<FlagsClient> {
        FlagsClient::new(self)
    }
}
