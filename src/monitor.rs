//! The polling loop.
//!
//! Fetches readings on a fixed cadence, prints a status line with alerts,
//! maintains the rolling history, forwards readings to the analysis
//! throttle, and prints analyses as they settle.

use crate::alerts::{Alert, AlertThresholds};
use crate::config::Config;
use crate::history::{HistorySummary, ReadingHistory};
use crate::models::{AnalysisOutcome, AnalysisUpdate, Reading};
use crate::sensor::SensorClient;
use anyhow::Result;
use tokio::sync::{mpsc, watch};
use tokio::time::{self, Duration, MissedTickBehavior};
use tracing::{debug, warn};

pub struct Monitor {
    sensor: SensorClient,
    thresholds: AlertThresholds,
    history: ReadingHistory,
    poll_interval: Duration,
    summary_every: u64,
    /// Forwarding channel to the throttle; absent with --no-analysis.
    readings_tx: Option<mpsc::Sender<Reading>>,
}

impl Monitor {
    pub fn new(
        sensor: SensorClient,
        config: &Config,
        readings_tx: Option<mpsc::Sender<Reading>>,
    ) -> Self {
        Self {
            sensor,
            thresholds: config.alerts.clone(),
            history: ReadingHistory::new(config.general.history_size),
            poll_interval: Duration::from_secs(config.sensor.poll_interval_seconds),
            summary_every: config.general.summary_every,
            readings_tx,
        }
    }

    /// Poll forever. Shutdown happens by cancelling this future (ctrl-c in
    /// `main`).
    pub async fn run(
        mut self,
        mut updates: Option<watch::Receiver<Option<AnalysisUpdate>>>,
    ) -> Result<()> {
        let mut ticker = time::interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut ticks: u64 = 0;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    ticks += 1;
                    self.poll_tick(ticks).await;
                }
                changed = next_update(&mut updates) => {
                    match changed {
                        Ok(()) => {
                            let update = updates.as_ref().and_then(|rx| rx.borrow().clone());
                            if let Some(update) = update {
                                print_analysis(&update);
                            }
                        }
                        Err(_) => {
                            debug!("Analysis channel closed");
                            updates = None;
                        }
                    }
                }
            }
        }
    }

    async fn poll_tick(&mut self, ticks: u64) {
        let reading = match self.sensor.fetch().await {
            Ok(reading) => reading,
            Err(e) => {
                // A missed poll is not fatal; the bridge serves the last
                // valid reading once it recovers.
                warn!("Failed to fetch reading: {}", e);
                return;
            }
        };

        print_status_line(&reading, &self.thresholds);
        print_alerts(&self.thresholds.evaluate(&reading));

        self.history.push(reading.clone());
        if self.summary_every > 0 && ticks % self.summary_every == 0 {
            if let Some(summary) = self.history.summary() {
                print_summary(&summary);
            }
        }

        if let Some(tx) = &self.readings_tx {
            // The throttle coalesces bursts anyway; when its queue is full
            // the freshest readings it misses are about to be replaced.
            if let Err(e) = tx.try_send(reading) {
                debug!("Dropping reading for the throttle: {}", e);
            }
        }
    }
}

/// One status line per reading, with a colored marker per metric.
pub fn print_status_line(reading: &Reading, thresholds: &AlertThresholds) {
    println!(
        "{} 🌡 {:.1}C   {} 💧 {:.1}%   {} 🔥 Gas: {}   [{}]",
        thresholds
            .temperature_status(reading.temperature)
            .symbol(),
        reading.temperature,
        thresholds.humidity_status(reading.humidity).symbol(),
        reading.humidity,
        thresholds.gas_status(reading.gas_normal).symbol(),
        reading.gas_label(),
        reading.observed_at.format("%H:%M:%S"),
    );
}

pub fn print_alerts(alerts: &[Alert]) {
    for alert in alerts {
        println!("   ⚠️  {}: {} ({})", alert.kind, alert.message, alert.value);
    }
}

fn print_summary(summary: &HistorySummary) {
    println!(
        "📊 Last {} samples: temp {:.1}-{:.1}C (mean {:.1}), humidity {:.1}-{:.1}% (mean {:.1}), gas alarms: {}",
        summary.samples,
        summary.temperature_min,
        summary.temperature_max,
        summary.temperature_mean,
        summary.humidity_min,
        summary.humidity_max,
        summary.humidity_mean,
        summary.gas_alarms,
    );
}

fn print_analysis(update: &AnalysisUpdate) {
    println!(
        "\n🤖 Analysis ({}) for {:.1}C / {:.1}% / gas {}:",
        update.completed_at.format("%H:%M:%S"),
        update.reading.temperature,
        update.reading.humidity,
        update.reading.gas_label(),
    );
    match &update.outcome {
        AnalysisOutcome::Text(text) => println!("{}\n", text),
        AnalysisOutcome::Unavailable(message) => println!("⚠️  {}\n", message),
    }
}

/// Wait for the next settled analysis; parks forever once the channel is
/// gone so the `select!` arm stays quiet.
async fn next_update(
    updates: &mut Option<watch::Receiver<Option<AnalysisUpdate>>>,
) -> Result<(), watch::error::RecvError> {
    match updates {
        Some(rx) => rx.changed().await,
        None => std::future::pending().await,
    }
}
