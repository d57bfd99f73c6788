//! Analysis throttle policy.
//!
//! Decides, for each incoming sensor reading, whether the remote LLM
//! analysis should run, and enforces minimum spacing between calls:
//! a debounce collapses bursts of triggers, a minimum-interval floor and an
//! in-flight guard protect the remote API, and a post-call cooldown keeps
//! rapid re-triggers quiet right after a response.

pub mod throttle;
pub mod trigger;

pub use throttle::{AnalysisThrottle, ThrottleConfig, ANALYSIS_UNAVAILABLE_MESSAGE};
pub use trigger::{PolicyState, TriggerConfig, TriggerReason};

use crate::models::Reading;
use std::fmt;
use std::future::Future;
use tracing::{debug, info, warn};

/// A remote analysis backend.
///
/// An idempotent but cost-bearing call; the policy treats it as opaque and
/// never retries on its behalf.
pub trait Analyzer: Send + Sync + 'static {
    type Error: fmt::Display + Send + 'static;

    /// Produce a natural-language analysis of one reading.
    fn analyze(
        &self,
        reading: &Reading,
    ) -> impl Future<Output = Result<String, Self::Error>> + Send;
}

/// Observability events emitted by the throttle.
///
/// Guard skips are not errors; the policy keeps running after every one of
/// these.
#[derive(Debug, Clone, PartialEq)]
pub enum PolicyEvent {
    /// A reading qualified for analysis; the debounce timer was armed.
    Triggered { reason: TriggerReason },
    /// A reading arrived while the debounce was pending; the timer was
    /// reset and the pending reading replaced (last reading wins).
    DebounceRearmed,
    /// The debounce fired too soon after the previous call start.
    SkippedMinInterval,
    /// The debounce fired while a call was still outstanding.
    SkippedInFlight,
    /// A remote call was dispatched.
    CallStarted,
    /// The remote call returned text.
    CallSucceeded,
    /// The remote call failed; `error` carries the underlying cause.
    CallFailed { error: String },
    /// The call settled and the cooldown window opened.
    CooldownStarted,
    /// The cooldown elapsed; the policy is idle again.
    CooldownEnded,
}

/// Receives policy events. Implementations must not block.
pub trait DiagnosticSink: Send + 'static {
    fn record(&self, event: &PolicyEvent);
}

/// Default sink: forwards events to the `tracing` subscriber.
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn record(&self, event: &PolicyEvent) {
        match event {
            PolicyEvent::Triggered { reason } => info!("Analysis triggered: {}", reason),
            PolicyEvent::DebounceRearmed => debug!("Debounce re-armed, keeping latest reading"),
            PolicyEvent::SkippedMinInterval => {
                debug!("Analysis skipped: too soon since the last call")
            }
            PolicyEvent::SkippedInFlight => debug!("Analysis skipped: a call is already running"),
            PolicyEvent::CallStarted => info!("Requesting remote analysis"),
            PolicyEvent::CallSucceeded => info!("Analysis received"),
            PolicyEvent::CallFailed { error } => warn!("Analysis failed: {}", error),
            PolicyEvent::CooldownStarted => debug!("Cooldown started"),
            PolicyEvent::CooldownEnded => debug!("Cooldown ended"),
        }
    }
}

/// Sink for contexts where policy events should disappear.
#[allow(dead_code)] // Available for embedding the throttle without tracing
pub struct NullSink;

impl DiagnosticSink for NullSink {
    fn record(&self, _event: &PolicyEvent) {}
}
