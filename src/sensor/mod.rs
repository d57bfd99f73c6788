//! HTTP client for the local sensor bridge.
//!
//! The bridge is a small HTTP server sitting on the serial port of the
//! sensor board. It exposes `GET /data` returning the latest reading and
//! `GET /connect` to (re)open the serial connection and report its state.

use crate::models::{RawReading, Reading};
use chrono::Utc;
use serde::Deserialize;
use thiserror::Error;
use tokio::time::Duration;
use tracing::debug;

/// Errors talking to the sensor bridge.
#[derive(Debug, Error)]
pub enum SensorError {
    #[error("cannot connect to the sensor bridge at {0}")]
    Connect(String),

    #[error("sensor bridge request timed out after {0}s")]
    Timeout(u64),

    #[error("sensor bridge returned HTTP {0}")]
    Status(u16),

    #[error("could not decode sensor payload: {0}")]
    Decode(#[source] reqwest::Error),

    #[error("sensor bridge request failed: {0}")]
    Http(#[from] reqwest::Error),
}

/// Serial link state as reported by the bridge.
#[derive(Debug, Clone, Deserialize)]
pub struct BridgeStatus {
    pub success: bool,
    pub port: String,
}

/// Client for one sensor bridge endpoint.
pub struct SensorClient {
    http_client: reqwest::Client,
    base_url: String,
    timeout_seconds: u64,
}

impl SensorClient {
    pub fn new(base_url: &str, timeout_seconds: u64) -> anyhow::Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_seconds))
            .build()?;

        Ok(Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout_seconds,
        })
    }

    /// Fetch the latest reading, stamped with the current time.
    pub async fn fetch(&self) -> Result<Reading, SensorError> {
        let url = format!("{}/data", self.base_url);
        let response = self
            .http_client
            .get(&url)
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SensorError::Status(status.as_u16()));
        }

        let raw: RawReading = response.json().await.map_err(SensorError::Decode)?;
        let reading = raw.into_reading(Utc::now());
        debug!("Fetched reading: {:?}", reading);
        Ok(reading)
    }

    /// Ask the bridge to (re)open its serial connection.
    pub async fn connect(&self) -> Result<BridgeStatus, SensorError> {
        let url = format!("{}/connect", self.base_url);
        let response = self
            .http_client
            .get(&url)
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SensorError::Status(status.as_u16()));
        }

        Ok(response.json().await.map_err(SensorError::Decode)?)
    }

    fn classify(&self, error: reqwest::Error) -> SensorError {
        if error.is_timeout() {
            SensorError::Timeout(self.timeout_seconds)
        } else if error.is_connect() {
            SensorError::Connect(self.base_url.clone())
        } else {
            SensorError::Http(error)
        }
    }
}
