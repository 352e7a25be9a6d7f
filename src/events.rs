//! Telemetry events emitted by the evaluation facade.
use std::thread::JoinHandle;

use serde::Serialize;

use crate::context::Context;

/// Kind of a telemetry event.
#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// A context was attached to the session.
    UserContext,
    /// A flag's value was checked.
    CheckFlagAccess,
}

impl EventKind {
    pub(crate) fn as_str(&self) -> &'static str {
        match self {
            EventKind::UserContext => "user_context",
            EventKind::CheckFlagAccess => "check_flag_access",
        }
    }
}

/// A telemetry event recording a flag access or a context attach.
#[derive(Debug, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct TelemetryEvent {
    #[allow(missing_docs)]
    pub event: EventKind,
    /// Set for [`EventKind::CheckFlagAccess`] events.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flag_key: Option<String>,
    /// The context active at the time of the event.
    pub context: Context,
}

impl TelemetryEvent {
    /// A flag-access event for `flag_key`.
    pub fn check_flag_access(flag_key: impl Into<String>, context: Context) -> TelemetryEvent {
        TelemetryEvent {
            event: EventKind::CheckFlagAccess,
            flag_key: Some(flag_key.into()),
            context,
        }
    }

    /// A context-attach event.
    pub fn user_context(context: Context) -> TelemetryEvent {
        TelemetryEvent {
            event: EventKind::UserContext,
            flag_key: None,
            context,
        }
    }

    /// The throttle key for this event.
    ///
    /// Flag-access events are keyed per flag, so telemetry for one flag does not starve telemetry
    /// for another.
    pub(crate) fn rate_limit_key(&self) -> String {
        match &self.flag_key {
            Some(flag_key) => format!("{}:{}", self.event.as_str(), flag_key),
            None => self.event.as_str().to_owned(),
        }
    }
}

/// Handle to an in-flight telemetry send.
///
/// The send runs on its own thread; dropping the handle detaches it (fire-and-forget), while
/// [`wait`](EventTask::wait) blocks until it settles. Send failures are logged by the sender and
/// never surface here.
pub struct EventTask {
    handle: JoinHandle<()>,
}

impl EventTask {
    pub(crate) fn new(handle: JoinHandle<()>) -> EventTask {
        EventTask { handle }
    }

    /// Block until the send settles, success or failure.
    pub fn wait(self) {
        // Error means the sender thread panicked; there's nothing useful to do with that here.
        let _ = self.handle.join();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_kinds_serialize_to_wire_names() {
        assert_eq!(
            serde_json::to_value(EventKind::CheckFlagAccess).unwrap(),
            serde_json::json!("check_flag_access")
        );
        assert_eq!(
            serde_json::to_value(EventKind::UserContext).unwrap(),
            serde_json::json!("user_context")
        );
    }

    #[test]
    fn flag_access_events_are_throttled_per_flag() {
        let event = TelemetryEvent::check_flag_access("my-flag", Context::new());
        assert_eq!(event.rate_limit_key(), "check_flag_access:my-flag");

        let event = TelemetryEvent::user_context(Context::new());
        assert_eq!(event.rate_limit_key(), "user_context");
    }
}
