//! Trigger evaluation for remote analysis.
//!
//! Pure decision layer: no timers, no network. The throttle driver feeds
//! these functions the current instant, so tests can exercise every rule
//! without sleeping.

use crate::models::Reading;
use std::fmt;
use tokio::time::{Duration, Instant};

/// Thresholds governing when a new analysis is warranted.
#[derive(Debug, Clone)]
pub struct TriggerConfig {
    /// Maximum tolerated age of the last analysis before a refresh is forced.
    pub staleness: Duration,
    /// Temperature change (degrees Celsius) that forces a refresh.
    pub temperature_delta: f64,
}

impl Default for TriggerConfig {
    fn default() -> Self {
        Self {
            staleness: Duration::from_secs(5 * 60),
            temperature_delta: 5.0,
        }
    }
}

/// Why an analysis was requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerReason {
    /// No analysis has ever completed.
    FirstReading,
    /// The last analysis is older than the staleness threshold.
    StaleAnalysis,
    /// The gas sensor reports an alarm.
    GasAlarm,
    /// Temperature moved more than the configured delta since the last
    /// successful analysis.
    TemperatureDelta,
}

impl fmt::Display for TriggerReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TriggerReason::FirstReading => write!(f, "first reading"),
            TriggerReason::StaleAnalysis => write!(f, "analysis stale"),
            TriggerReason::GasAlarm => write!(f, "gas alarm"),
            TriggerReason::TemperatureDelta => write!(f, "temperature delta"),
        }
    }
}

/// Mutable throttle state, single instance per monitor.
///
/// All transitions happen inside one task; see the throttle driver for the
/// serialization guarantee.
#[derive(Debug, Clone)]
pub struct PolicyState {
    /// When the last analysis settled (success or failure).
    last_analysis_at: Option<Instant>,
    /// When the last remote call started. Basis for the minimum-interval
    /// guard, which must hold even if a call settles quickly.
    last_call_started_at: Option<Instant>,
    /// Temperature captured by the last successful analysis. Failures leave
    /// this untouched so a persistent delta keeps retrying after cooldown.
    last_analysis_temperature: f64,
    /// True from call start until the post-call cooldown elapses.
    in_flight: bool,
}

impl PolicyState {
    pub fn new() -> Self {
        Self {
            last_analysis_at: None,
            last_call_started_at: None,
            last_analysis_temperature: 0.0,
            in_flight: false,
        }
    }

    /// Decide whether `reading` warrants a new analysis.
    ///
    /// Returns the first matching reason, or `None` when the last analysis
    /// is still fresh enough.
    pub fn should_analyze(
        &self,
        reading: &Reading,
        now: Instant,
        config: &TriggerConfig,
    ) -> Option<TriggerReason> {
        let Some(last) = self.last_analysis_at else {
            return Some(TriggerReason::FirstReading);
        };

        if now.duration_since(last) > config.staleness {
            return Some(TriggerReason::StaleAnalysis);
        }
        if !reading.gas_normal {
            return Some(TriggerReason::GasAlarm);
        }
        if (reading.temperature - self.last_analysis_temperature).abs() > config.temperature_delta {
            return Some(TriggerReason::TemperatureDelta);
        }

        None
    }

    /// Whether enough time has passed since the last call started.
    ///
    /// Vacuously true before the first call.
    pub fn min_interval_elapsed(&self, now: Instant, floor: Duration) -> bool {
        match self.last_call_started_at {
            Some(started) => now.duration_since(started) >= floor,
            None => true,
        }
    }

    pub fn in_flight(&self) -> bool {
        self.in_flight
    }

    /// Record the start of a remote call.
    pub fn begin_call(&mut self, now: Instant) {
        self.last_call_started_at = Some(now);
        self.in_flight = true;
    }

    /// Record a settled call. `success_temperature` carries the analyzed
    /// reading's temperature on success; failures pass `None` so the delta
    /// baseline is preserved.
    ///
    /// `in_flight` stays set; the driver clears it after the cooldown via
    /// [`finish_cooldown`](Self::finish_cooldown).
    pub fn settle_call(&mut self, now: Instant, success_temperature: Option<f64>) {
        self.last_analysis_at = Some(now);
        if let Some(temperature) = success_temperature {
            self.last_analysis_temperature = temperature;
        }
    }

    /// Cooldown elapsed; the policy may dispatch again.
    pub fn finish_cooldown(&mut self) {
        self.in_flight = false;
    }
}

impl Default for PolicyState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn reading(temperature: f64, gas_normal: bool) -> Reading {
        Reading {
            temperature,
            humidity: 40.0,
            gas_normal,
            observed_at: Utc::now(),
        }
    }

    fn secs(s: u64) -> Duration {
        Duration::from_secs(s)
    }

    /// State as it looks after a successful analysis settled at `base`.
    fn settled_state(base: Instant, temperature: f64) -> PolicyState {
        let mut state = PolicyState::new();
        state.begin_call(base);
        state.settle_call(base, Some(temperature));
        state.finish_cooldown();
        state
    }

    #[test]
    fn test_first_reading_always_triggers() {
        let state = PolicyState::new();
        let config = TriggerConfig::default();
        let now = Instant::now();

        let decision = state.should_analyze(&reading(25.0, true), now, &config);
        assert_eq!(decision, Some(TriggerReason::FirstReading));

        // Values are irrelevant on the first reading.
        let decision = state.should_analyze(&reading(-40.0, false), now, &config);
        assert_eq!(decision, Some(TriggerReason::FirstReading));
    }

    #[test]
    fn test_gas_alarm_always_triggers() {
        let base = Instant::now();
        let state = settled_state(base, 25.0);
        let config = TriggerConfig::default();

        // One second later, identical temperature: only the gas alarm fires.
        let decision = state.should_analyze(&reading(25.0, false), base + secs(1), &config);
        assert_eq!(decision, Some(TriggerReason::GasAlarm));
    }

    #[test]
    fn test_fresh_and_stable_declines() {
        let base = Instant::now();
        let state = settled_state(base, 25.0);
        let config = TriggerConfig::default();

        // 1s elapsed, delta 0, gas normal.
        let decision = state.should_analyze(&reading(25.0, true), base + secs(1), &config);
        assert_eq!(decision, None);

        // Delta of exactly 5 degrees does not trigger (strictly greater).
        let decision = state.should_analyze(&reading(30.0, true), base + secs(1), &config);
        assert_eq!(decision, None);
        let decision = state.should_analyze(&reading(20.0, true), base + secs(1), &config);
        assert_eq!(decision, None);
    }

    #[test]
    fn test_temperature_delta_triggers() {
        let base = Instant::now();
        let state = settled_state(base, 25.0);
        let config = TriggerConfig::default();

        // Scenario from the field: 31 vs 25 one second after the last run.
        let decision = state.should_analyze(&reading(31.0, true), base + secs(1), &config);
        assert_eq!(decision, Some(TriggerReason::TemperatureDelta));

        // Drops count too.
        let decision = state.should_analyze(&reading(18.9, true), base + secs(1), &config);
        assert_eq!(decision, Some(TriggerReason::TemperatureDelta));
    }

    #[test]
    fn test_staleness_triggers() {
        let base = Instant::now();
        let state = settled_state(base, 25.0);
        let config = TriggerConfig::default();

        // Just inside the window: fresh.
        let decision = state.should_analyze(&reading(25.0, true), base + secs(299), &config);
        assert_eq!(decision, None);

        // Past five minutes: stale wins even with a stable reading.
        let decision = state.should_analyze(&reading(25.0, true), base + secs(301), &config);
        assert_eq!(decision, Some(TriggerReason::StaleAnalysis));
    }

    #[test]
    fn test_failure_preserves_temperature_baseline() {
        let base = Instant::now();
        let mut state = settled_state(base, 25.0);

        // A later call fails; the baseline must stay at 25.
        state.begin_call(base + secs(20));
        state.settle_call(base + secs(21), None);
        state.finish_cooldown();

        let config = TriggerConfig::default();
        let decision = state.should_analyze(&reading(31.0, true), base + secs(40), &config);
        assert_eq!(decision, Some(TriggerReason::TemperatureDelta));
    }

    #[test]
    fn test_min_interval_guard() {
        let base = Instant::now();
        let mut state = PolicyState::new();

        // No call yet: the guard passes.
        assert!(state.min_interval_elapsed(base, secs(10)));

        state.begin_call(base);
        assert!(!state.min_interval_elapsed(base + secs(9), secs(10)));
        assert!(state.min_interval_elapsed(base + secs(10), secs(10)));
    }

    #[test]
    fn test_in_flight_spans_cooldown() {
        let base = Instant::now();
        let mut state = PolicyState::new();

        assert!(!state.in_flight());
        state.begin_call(base);
        assert!(state.in_flight());

        // Settling does not clear the flag; only the cooldown does.
        state.settle_call(base + secs(2), Some(25.0));
        assert!(state.in_flight());
        state.finish_cooldown();
        assert!(!state.in_flight());
    }
}
