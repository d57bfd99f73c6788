//! Data models for the environmental monitor.
//!
//! This module contains the core data structures shared across the
//! application: sensor readings as they arrive on the wire, the processed
//! snapshot the rest of the code works with, and analysis results.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A reading as produced by the sensor bridge.
///
/// Field names are fixed by the bridge firmware (`gas` is `1` for normal
/// atmosphere, `0` when the MQ-2 sensor trips). Values arrive as integers
/// but are parsed as floats for downstream math.
#[derive(Debug, Clone, Deserialize)]
pub struct RawReading {
    #[serde(rename = "temperatura")]
    pub temperature: f64,
    #[serde(rename = "umidade")]
    pub humidity: f64,
    pub gas: u8,
}

impl RawReading {
    /// Convert into a processed [`Reading`] stamped with the observation time.
    pub fn into_reading(self, observed_at: DateTime<Utc>) -> Reading {
        Reading {
            temperature: self.temperature,
            humidity: self.humidity,
            gas_normal: self.gas == 1,
            observed_at,
        }
    }
}

/// One immutable snapshot of sensor values.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Reading {
    /// Air temperature in degrees Celsius.
    pub temperature: f64,
    /// Relative humidity in percent.
    pub humidity: f64,
    /// Whether the gas sensor reports a normal atmosphere.
    pub gas_normal: bool,
    /// When this snapshot was taken.
    pub observed_at: DateTime<Utc>,
}

impl Reading {
    /// Human-readable gas state.
    pub fn gas_label(&self) -> &'static str {
        if self.gas_normal {
            "Normal"
        } else {
            "ALERT"
        }
    }
}

/// Outcome of one analysis attempt, as surfaced to the caller.
#[derive(Debug, Clone, PartialEq)]
pub enum AnalysisOutcome {
    /// The analyzer produced text.
    Text(String),
    /// The call failed; carries a generic user-facing message. The
    /// underlying cause goes to the diagnostic sink, not here.
    Unavailable(String),
}

/// A completed analysis, published whenever a remote call settles.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisUpdate {
    /// The reading that was analyzed.
    pub reading: Reading,
    /// When the call settled.
    pub completed_at: DateTime<Utc>,
    /// Text on success, a generic message on failure.
    pub outcome: AnalysisOutcome,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_reading_wire_format() {
        let json = r#"{"temperatura": 25, "umidade": 40, "gas": 1}"#;
        let raw: RawReading = serde_json::from_str(json).unwrap();
        assert_eq!(raw.temperature, 25.0);
        assert_eq!(raw.humidity, 40.0);
        assert_eq!(raw.gas, 1);
    }

    #[test]
    fn test_gas_mapping() {
        let json = r#"{"temperatura": 31, "umidade": 85, "gas": 0}"#;
        let raw: RawReading = serde_json::from_str(json).unwrap();
        let reading = raw.into_reading(Utc::now());

        assert!(!reading.gas_normal);
        assert_eq!(reading.gas_label(), "ALERT");

        let json = r#"{"temperatura": 22, "umidade": 50, "gas": 1}"#;
        let raw: RawReading = serde_json::from_str(json).unwrap();
        let reading = raw.into_reading(Utc::now());

        assert!(reading.gas_normal);
        assert_eq!(reading.gas_label(), "Normal");
    }

    #[test]
    fn test_fractional_values_accepted() {
        let json = r#"{"temperatura": 24.6, "umidade": 51.2, "gas": 1}"#;
        let raw: RawReading = serde_json::from_str(json).unwrap();
        assert_eq!(raw.temperature, 24.6);
        assert_eq!(raw.humidity, 51.2);
    }
}
