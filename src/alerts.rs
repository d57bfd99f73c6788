//! Threshold alerts and per-metric status levels.
//!
//! Mirrors what the status strip on a monitoring dashboard shows: each
//! metric gets a green/yellow/red level, and crossing the hard limits
//! produces an alert with a human-readable message.

use crate::models::Reading;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Status level of a single metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Status {
    Ok,
    Warn,
    Critical,
}

impl Status {
    /// Returns a symbol representation of the status.
    pub fn symbol(&self) -> &'static str {
        match self {
            Status::Ok => "🟢",
            Status::Warn => "🟡",
            Status::Critical => "🔴",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Ok => write!(f, "Ok"),
            Status::Warn => write!(f, "Warn"),
            Status::Critical => write!(f, "Critical"),
        }
    }
}

/// Which metric raised an alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertKind {
    Temperature,
    Humidity,
    Gas,
}

impl fmt::Display for AlertKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AlertKind::Temperature => write!(f, "TEMPERATURE"),
            AlertKind::Humidity => write!(f, "HUMIDITY"),
            AlertKind::Gas => write!(f, "GAS"),
        }
    }
}

/// An active alert derived from one reading.
#[derive(Debug, Clone, PartialEq)]
pub struct Alert {
    pub kind: AlertKind,
    pub message: String,
    pub value: String,
}

/// Alert thresholds, configurable via `[alerts]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertThresholds {
    /// Temperature above this is a warning.
    #[serde(default = "default_temperature_warn")]
    pub temperature_warn: f64,
    /// Temperature above this is critical and raises an alert.
    #[serde(default = "default_temperature_critical")]
    pub temperature_critical: f64,
    /// Humidity below this is a warning.
    #[serde(default = "default_humidity_low")]
    pub humidity_low: f64,
    /// Humidity above this is critical and raises an alert.
    #[serde(default = "default_humidity_high")]
    pub humidity_high: f64,
}

impl Default for AlertThresholds {
    fn default() -> Self {
        Self {
            temperature_warn: default_temperature_warn(),
            temperature_critical: default_temperature_critical(),
            humidity_low: default_humidity_low(),
            humidity_high: default_humidity_high(),
        }
    }
}

fn default_temperature_warn() -> f64 {
    25.0
}

fn default_temperature_critical() -> f64 {
    30.0
}

fn default_humidity_low() -> f64 {
    30.0
}

fn default_humidity_high() -> f64 {
    80.0
}

impl AlertThresholds {
    pub fn temperature_status(&self, value: f64) -> Status {
        if value > self.temperature_critical {
            Status::Critical
        } else if value > self.temperature_warn {
            Status::Warn
        } else {
            Status::Ok
        }
    }

    pub fn humidity_status(&self, value: f64) -> Status {
        if value > self.humidity_high {
            Status::Critical
        } else if value < self.humidity_low {
            Status::Warn
        } else {
            Status::Ok
        }
    }

    pub fn gas_status(&self, gas_normal: bool) -> Status {
        if gas_normal {
            Status::Ok
        } else {
            Status::Critical
        }
    }

    /// Alerts raised by one reading.
    pub fn evaluate(&self, reading: &Reading) -> Vec<Alert> {
        let mut alerts = Vec::new();

        if reading.temperature > self.temperature_critical {
            alerts.push(Alert {
                kind: AlertKind::Temperature,
                message: "Temperature too high!".to_string(),
                value: format!("{:.1}C", reading.temperature),
            });
        }

        if reading.humidity > self.humidity_high {
            alerts.push(Alert {
                kind: AlertKind::Humidity,
                message: "Critical humidity!".to_string(),
                value: format!("{:.1}%", reading.humidity),
            });
        }

        if !reading.gas_normal {
            alerts.push(Alert {
                kind: AlertKind::Gas,
                message: "Gas detected! Check the environment!".to_string(),
                value: "Alert".to_string(),
            });
        }

        alerts
    }
}
