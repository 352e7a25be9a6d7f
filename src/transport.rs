//! The network boundary: fetching flag definitions and delivering telemetry.
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use reqwest::{StatusCode, Url};

use crate::{events::TelemetryEvent, flags::Flag, Error, Result};

/// The injected network collaborator.
///
/// The synchronization engine and the evaluation facade only ever talk to the network through
/// this trait, which keeps them testable and transport-agnostic.
pub trait Transport: Send + Sync {
    /// Fetch the full set of flag definitions.
    fn fetch_flags(&self) -> Result<Vec<Flag>>;

    /// Deliver a single telemetry event.
    fn send_event(&self, event: &TelemetryEvent) -> Result<()>;
}

const FLAGS_ENDPOINT: &str = "/flags-server";
const EVENTS_ENDPOINT: &str = "/events";

/// HTTP implementation of [`Transport`].
pub struct HttpTransport {
    // Client holds a connection pool internally, so we're reusing the client between requests.
    client: reqwest::blocking::Client,
    flags_url: Url,
    events_url: Url,
    secret_key: String,
    /// If we receive a 401 Unauthorized error during a request, it means the secret key is not
    /// valid. We cache this so we don't keep issuing requests with a bad key.
    unauthorized: AtomicBool,
}

impl HttpTransport {
    /// Create a transport for the given base URL and secret key.
    ///
    /// The `timeout` bounds every request; without it a fetch that never resolves would keep the
    /// refresh guard set forever and permanently suppress further refreshes.
    pub fn new(
        base_url: &str,
        secret_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<HttpTransport> {
        let flags_url =
            Url::parse(&format!("{}{}", base_url, FLAGS_ENDPOINT)).map_err(Error::InvalidBaseUrl)?;
        let events_url =
            Url::parse(&format!("{}{}", base_url, EVENTS_ENDPOINT)).map_err(Error::InvalidBaseUrl)?;

        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()?;

        Ok(HttpTransport {
            client,
            flags_url,
            events_url,
            secret_key: secret_key.into(),
            unauthorized: AtomicBool::new(false),
        })
    }

    fn check_status(&self, response: reqwest::blocking::Response) -> Result<reqwest::blocking::Response> {
        match response.error_for_status() {
            Ok(response) => Ok(response),
            Err(err) if err.status() == Some(StatusCode::UNAUTHORIZED) => {
                log::warn!(target: "flagkit", "client is not authorized, check your secret key");
                self.unauthorized.store(true, Ordering::Release);
                Err(Error::Unauthorized)
            }
            Err(err) => {
                log::warn!(target: "flagkit", "received non-success response: {:?}", err);
                Err(Error::from(err))
            }
        }
    }
}

impl Transport for HttpTransport {
    fn fetch_flags(&self) -> Result<Vec<Flag>> {
        if self.unauthorized.load(Ordering::Acquire) {
            return Err(Error::Unauthorized);
        }

        log::debug!(target: "flagkit", "fetching flags");
        let response = self
            .client
            .get(self.flags_url.clone())
            .bearer_auth(&self.secret_key)
            .header("X-Source", "rust-sdk")
            .send()?;
        let response = self.check_status(response)?;

        let flags = response
            .json()
            .map_err(|_| Error::InvalidFlagsResponse)?;
        Ok(flags)
    }

    fn send_event(&self, event: &TelemetryEvent) -> Result<()> {
        if self.unauthorized.load(Ordering::Acquire) {
            return Err(Error::Unauthorized);
        }

        let payload = match &event.flag_key {
            Some(flag_key) => {
                serde_json::json!({ "flagKey": flag_key, "context": event.context })
            }
            None => serde_json::json!(event.context),
        };
        let body = serde_json::json!({
            "event": event.event,
            "payload": payload,
            "context": event.context,
        });

        let response = self
            .client
            .post(self.events_url.clone())
            .bearer_auth(&self.secret_key)
            .header("X-Source", "rust-sdk")
            .json(&body)
            .send()?;
        self.check_status(response)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_invalid_base_url() {
        let result = HttpTransport::new("not a url", "secret", Duration::from_secs(10));
        assert!(matches!(result, Err(Error::InvalidBaseUrl(_))));
    }
}
