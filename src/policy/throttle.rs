//! Event-driven throttle around the remote analyzer.
//!
//! One task owns all policy state. Reading arrival, debounce expiry, call
//! completion, and cooldown expiry are delivered to a single `select!` loop,
//! so every handler runs to completion before the next event is processed.
//! The remote call itself runs on a spawned task and is joined back into the
//! loop; nothing else ever mutates [`PolicyState`].

use crate::models::{AnalysisOutcome, AnalysisUpdate, Reading};
use crate::policy::trigger::{PolicyState, TriggerConfig};
use crate::policy::{Analyzer, DiagnosticSink, PolicyEvent};
use chrono::Utc;
use futures::future::OptionFuture;
use std::pin::Pin;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::{JoinError, JoinHandle};
use tokio::time::{self, Duration, Instant, Sleep};
use tracing::debug;

/// Generic user-facing message published when a call fails. The actual
/// cause only reaches the diagnostic sink.
pub const ANALYSIS_UNAVAILABLE_MESSAGE: &str =
    "Failed to fetch analysis. The monitor will try again on the next trigger.";

/// Timing knobs for the throttle.
#[derive(Debug, Clone)]
pub struct ThrottleConfig {
    /// Delay collapsing bursts of triggers into one call.
    pub debounce: Duration,
    /// Hard floor between call starts, independent of the debounce.
    pub min_interval: Duration,
    /// Quiet period after a call settles before another may start.
    pub cooldown: Duration,
    /// Trigger thresholds.
    pub trigger: TriggerConfig,
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self {
            debounce: Duration::from_secs(5),
            min_interval: Duration::from_secs(10),
            cooldown: Duration::from_secs(15),
            trigger: TriggerConfig::default(),
        }
    }
}

impl From<&crate::config::PolicyConfig> for ThrottleConfig {
    fn from(config: &crate::config::PolicyConfig) -> Self {
        Self {
            debounce: Duration::from_secs(config.debounce_seconds),
            min_interval: Duration::from_secs(config.min_interval_seconds),
            cooldown: Duration::from_secs(config.cooldown_seconds),
            trigger: TriggerConfig {
                staleness: Duration::from_secs(config.staleness_seconds),
                temperature_delta: config.temperature_delta_c,
            },
        }
    }
}

/// The analysis throttle. Construct with [`AnalysisThrottle::new`], then
/// drive it by feeding readings into the channel passed to [`run`].
///
/// [`run`]: AnalysisThrottle::run
pub struct AnalysisThrottle<A: Analyzer, S> {
    config: ThrottleConfig,
    state: PolicyState,
    analyzer: Arc<A>,
    sink: S,
    updates: watch::Sender<Option<AnalysisUpdate>>,
    /// Latest reading waiting behind the debounce timer.
    pending: Option<Reading>,
    /// Reading handed to the currently outstanding call.
    current: Option<Reading>,
}

impl<A, S> AnalysisThrottle<A, S>
where
    A: Analyzer,
    S: DiagnosticSink,
{
    /// Create a throttle and the channel on which settled analyses appear.
    pub fn new(
        config: ThrottleConfig,
        analyzer: Arc<A>,
        sink: S,
    ) -> (Self, watch::Receiver<Option<AnalysisUpdate>>) {
        let (updates, updates_rx) = watch::channel(None);
        let throttle = Self {
            config,
            state: PolicyState::new(),
            analyzer,
            sink,
            updates,
            pending: None,
            current: None,
        };
        (throttle, updates_rx)
    }

    /// Process events until the reading channel closes.
    pub async fn run(mut self, mut readings: mpsc::Receiver<Reading>) {
        let debounce = time::sleep(Duration::ZERO);
        tokio::pin!(debounce);
        let mut debounce_armed = false;

        let cooldown = time::sleep(Duration::ZERO);
        tokio::pin!(cooldown);
        let mut cooldown_armed = false;

        let mut call: Option<JoinHandle<Result<String, A::Error>>> = None;

        loop {
            tokio::select! {
                maybe = readings.recv() => {
                    match maybe {
                        Some(reading) => {
                            self.on_reading(reading, debounce.as_mut(), &mut debounce_armed);
                        }
                        None => {
                            debug!("Reading channel closed, stopping throttle");
                            break;
                        }
                    }
                }
                _ = debounce.as_mut(), if debounce_armed => {
                    debounce_armed = false;
                    self.on_debounce_expired(&mut call);
                }
                Some(joined) = OptionFuture::from(call.as_mut()) => {
                    call = None;
                    self.on_call_settled(joined, cooldown.as_mut(), &mut cooldown_armed);
                }
                _ = cooldown.as_mut(), if cooldown_armed => {
                    cooldown_armed = false;
                    self.state.finish_cooldown();
                    self.sink.record(&PolicyEvent::CooldownEnded);
                }
            }
        }
    }

    /// A new reading arrived.
    ///
    /// While the debounce is pending, any reading resets the timer and
    /// replaces the pending snapshot (last reading wins). Otherwise the
    /// trigger rules decide whether to arm; readings seen during a call or
    /// its cooldown never arm, the next qualifying reading after the
    /// cooldown does.
    fn on_reading(&mut self, reading: Reading, debounce: Pin<&mut Sleep>, armed: &mut bool) {
        let now = Instant::now();

        if *armed {
            debounce.reset(now + self.config.debounce);
            self.pending = Some(reading);
            self.sink.record(&PolicyEvent::DebounceRearmed);
            return;
        }

        if self.state.in_flight() {
            return;
        }

        if let Some(reason) = self.state.should_analyze(&reading, now, &self.config.trigger) {
            self.sink.record(&PolicyEvent::Triggered { reason });
            debounce.reset(now + self.config.debounce);
            self.pending = Some(reading);
            *armed = true;
        }
    }

    /// The debounce fired: dispatch unless a guard says otherwise.
    fn on_debounce_expired(&mut self, call: &mut Option<JoinHandle<Result<String, A::Error>>>) {
        let now = Instant::now();
        let Some(reading) = self.pending.take() else {
            return;
        };

        // Second, independent guard beyond the debounce itself. Skips are
        // logged, never retried.
        if !self.state.min_interval_elapsed(now, self.config.min_interval) {
            self.sink.record(&PolicyEvent::SkippedMinInterval);
            return;
        }
        if self.state.in_flight() {
            self.sink.record(&PolicyEvent::SkippedInFlight);
            return;
        }

        self.state.begin_call(now);
        self.sink.record(&PolicyEvent::CallStarted);

        let analyzer = Arc::clone(&self.analyzer);
        let snapshot = reading.clone();
        self.current = Some(reading);
        *call = Some(tokio::spawn(
            async move { analyzer.analyze(&snapshot).await },
        ));
    }

    /// The remote call settled (including a panicked analyzer task, which
    /// counts as a failure). Publishes the update and opens the cooldown.
    fn on_call_settled(
        &mut self,
        joined: Result<Result<String, A::Error>, JoinError>,
        cooldown: Pin<&mut Sleep>,
        cooldown_armed: &mut bool,
    ) {
        let now = Instant::now();
        let completed_at = Utc::now();
        let reading = match self.current.take() {
            Some(reading) => reading,
            None => {
                // A call settled without a dispatched reading; state is out
                // of sync, which a serialized loop cannot produce.
                debug!("Call settled with no reading recorded");
                return;
            }
        };

        let outcome = match joined {
            Ok(Ok(text)) => {
                self.state.settle_call(now, Some(reading.temperature));
                self.sink.record(&PolicyEvent::CallSucceeded);
                AnalysisOutcome::Text(text)
            }
            Ok(Err(error)) => {
                self.state.settle_call(now, None);
                self.sink.record(&PolicyEvent::CallFailed {
                    error: error.to_string(),
                });
                AnalysisOutcome::Unavailable(ANALYSIS_UNAVAILABLE_MESSAGE.to_string())
            }
            Err(join_error) => {
                self.state.settle_call(now, None);
                self.sink.record(&PolicyEvent::CallFailed {
                    error: join_error.to_string(),
                });
                AnalysisOutcome::Unavailable(ANALYSIS_UNAVAILABLE_MESSAGE.to_string())
            }
        };

        self.updates.send_replace(Some(AnalysisUpdate {
            reading,
            completed_at,
            outcome,
        }));

        cooldown.reset(now + self.config.cooldown);
        *cooldown_armed = true;
        self.sink.record(&PolicyEvent::CooldownStarted);
    }
}
