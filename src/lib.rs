//! A client-side feature-flag evaluation and synchronization engine.
//!
//! # Overview
//!
//! The SDK revolves around a [`FlagsClient`] that decides whether a feature flag is enabled for
//! a caller-supplied [`Context`] (a user and/or company identity). Decisions are made locally
//! against a cached snapshot of flag definitions: deterministic rollout bucketing guarantees the
//! same identity always gets the same verdict for a given flag and percentage.
//!
//! The snapshot is kept up to date with a stale-while-revalidate policy: evaluation calls are
//! always answered synchronously from the cache, and a snapshot judged stale (by age or by
//! number of evaluations served) triggers a background refresh for subsequent calls. Session
//! overrides let a caller force a flag's value, taking precedence over anything fetched.
//!
//! # Error Handling
//!
//! Errors are represented by the [`enum@Error`] enum, but the evaluation path never fails: a
//! missing flag resolves to the caller-supplied default and transport failures degrade to the
//! last-known snapshot. Errors surface only from lifecycle calls like
//! [`FlagsClient::initialize`].
//!
//! # Logging
//!
//! The crate uses the [`log`](https://docs.rs/log/latest/log/) crate for logging messages under
//! the `flagkit` target. Consider integrating a `log`-compatible logger implementation for
//! better visibility into SDK operations.

#![warn(rustdoc::missing_crate_level_docs)]
#![warn(missing_docs)]

mod client;
mod config;
mod context;
mod error;
mod eval;
mod events;
mod flags;
mod overrides;
mod rate_limiter;
mod registry;
pub mod rollout;
mod snapshot_store;
mod sync;
mod transport;

pub use client::FlagsClient;
pub use config::ClientConfig;
pub use context::{CompanyContext, Context, UserContext};
pub use error::{Error, Result};
pub use eval::{evaluate_flag, FlagEvaluation};
pub use events::{EventKind, EventTask, TelemetryEvent};
pub use flags::{Flag, FlagsSnapshot, Rule, RuleOperator, Timestamp};
pub use overrides::{OverrideStore, SubscriptionId};
pub use rate_limiter::RateLimiter;
pub use registry::ClientRegistry;
pub use snapshot_store::SnapshotStore;
pub use sync::SyncEngine;
pub use transport::{HttpTransport, Transport};
