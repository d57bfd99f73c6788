//! Bounded history of recent readings.
//!
//! The monitor keeps a short rolling window of samples for trend context
//! in its periodic summaries. Oldest samples fall off once the window is
//! full.

use crate::models::Reading;
use std::collections::VecDeque;

/// Rolling window of the most recent readings.
#[derive(Debug)]
pub struct ReadingHistory {
    capacity: usize,
    readings: VecDeque<Reading>,
}

/// Aggregate statistics over the current window.
#[derive(Debug, Clone, PartialEq)]
pub struct HistorySummary {
    pub samples: usize,
    pub temperature_min: f64,
    pub temperature_max: f64,
    pub temperature_mean: f64,
    pub humidity_min: f64,
    pub humidity_max: f64,
    pub humidity_mean: f64,
    /// Samples in the window with the gas sensor in alarm.
    pub gas_alarms: usize,
}

impl ReadingHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            readings: VecDeque::with_capacity(capacity.max(1)),
        }
    }

    /// Append a reading, evicting the oldest when the window is full.
    pub fn push(&mut self, reading: Reading) {
        if self.readings.len() == self.capacity {
            self.readings.pop_front();
        }
        self.readings.push_back(reading);
    }

    #[allow(dead_code)] // Accessor pair for window introspection
    pub fn len(&self) -> usize {
        self.readings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }

    /// Most recent reading, if any.
    #[allow(dead_code)] // Utility accessor (the monitor prints as it polls)
    pub fn latest(&self) -> Option<&Reading> {
        self.readings.back()
    }

    /// Statistics over the window. `None` while empty.
    pub fn summary(&self) -> Option<HistorySummary> {
        if self.is_empty() {
            return None;
        }

        let samples = self.readings.len();
        let mut temperature_min = f64::INFINITY;
        let mut temperature_max = f64::NEG_INFINITY;
        let mut temperature_sum = 0.0;
        let mut humidity_min = f64::INFINITY;
        let mut humidity_max = f64::NEG_INFINITY;
        let mut humidity_sum = 0.0;
        let mut gas_alarms = 0;

        for reading in &self.readings {
            temperature_min = temperature_min.min(reading.temperature);
            temperature_max = temperature_max.max(reading.temperature);
            temperature_sum += reading.temperature;
            humidity_min = humidity_min.min(reading.humidity);
            humidity_max = humidity_max.max(reading.humidity);
            humidity_sum += reading.humidity;
            if !reading.gas_normal {
                gas_alarms += 1;
            }
        }

        Some(HistorySummary {
            samples,
            temperature_min,
            temperature_max,
            temperature_mean: temperature_sum / samples as f64,
            humidity_min,
            humidity_max,
            humidity_mean: humidity_sum / samples as f64,
            gas_alarms,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn reading(temperature: f64, humidity: f64, gas_normal: bool) -> Reading {
        Reading {
            temperature,
            humidity,
            gas_normal,
            observed_at: Utc::now(),
        }
    }

    #[test]
    fn test_empty_history_has_no_summary() {
        let history = ReadingHistory::new(50);
        assert!(history.is_empty());
        assert_eq!(history.summary(), None);
        assert!(history.latest().is_none());
    }

    #[test]
    fn test_capacity_evicts_oldest() {
        let mut history = ReadingHistory::new(3);
        for t in 0..5 {
            history.push(reading(20.0 + t as f64, 50.0, true));
        }

        assert_eq!(history.len(), 3);
        let summary = history.summary().unwrap();
        // Readings 22, 23, 24 remain.
        assert_eq!(summary.temperature_min, 22.0);
        assert_eq!(summary.temperature_max, 24.0);
        assert_eq!(history.latest().unwrap().temperature, 24.0);
    }

    #[test]
    fn test_summary_statistics() {
        let mut history = ReadingHistory::new(50);
        history.push(reading(20.0, 40.0, true));
        history.push(reading(30.0, 60.0, false));
        history.push(reading(25.0, 50.0, true));

        let summary = history.summary().unwrap();
        assert_eq!(summary.samples, 3);
        assert_eq!(summary.temperature_min, 20.0);
        assert_eq!(summary.temperature_max, 30.0);
        assert_eq!(summary.temperature_mean, 25.0);
        assert_eq!(summary.humidity_min, 40.0);
        assert_eq!(summary.humidity_max, 60.0);
        assert_eq!(summary.humidity_mean, 50.0);
        assert_eq!(summary.gas_alarms, 1);
    }

    #[test]
    fn test_zero_capacity_still_keeps_one() {
        let mut history = ReadingHistory::new(0);
        history.push(reading(21.0, 45.0, true));
        history.push(reading(22.0, 45.0, true));
        assert_eq!(history.len(), 1);
        assert_eq!(history.latest().unwrap().temperature, 22.0);
    }
}
