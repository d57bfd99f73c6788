//! AmbientMon - LLM-assisted environmental monitor
//!
//! A CLI that polls a local sensor bridge for temperature, humidity, and
//! gas readings, derives threshold alerts, and periodically asks a
//! Groq-hosted LLM to assess the conditions. Analysis calls are throttled
//! by a debounce, a minimum-interval floor, and a post-call cooldown.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Runtime error (connection, config, invalid arguments, etc.)

mod alerts;
mod analyzer;
mod cli;
mod config;
mod history;
mod models;
mod monitor;
mod policy;
mod sensor;

use analyzer::{AnalyzerConfig, GroqAnalyzer};
use anyhow::{Context, Result};
use cli::Args;
use config::Config;
use indicatif::{ProgressBar, ProgressStyle};
use monitor::Monitor;
use policy::{AnalysisThrottle, ThrottleConfig, TracingSink};
use sensor::SensorClient;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::time::Duration;
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    // Initialize logging
    init_logging(&args);

    info!("AmbientMon v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    match run_monitor(args).await {
        Ok(()) => Ok(()),
        Err(e) => {
            error!("Monitor failed: {}", e);
            eprintln!("\n❌ Error: {}", e);
            std::process::exit(1);
        }
    }
}

/// Handle --init-config: generate a default .ambientmon.toml.
fn handle_init_config() -> Result<()> {
    let path = std::path::Path::new(".ambientmon.toml");

    if path.exists() {
        eprintln!("⚠️  .ambientmon.toml already exists. Remove it first or edit it manually.");
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content).context("Failed to write .ambientmon.toml")?;

    println!("✅ Created .ambientmon.toml with default settings.");
    println!("   Edit it to customize the bridge endpoint, model, thresholds, and more.");
    Ok(())
}

/// Initialize logging based on verbosity settings.
fn init_logging(args: &Args) {
    let level = args.log_level();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");
}

/// Run the monitor until ctrl-c.
async fn run_monitor(args: Args) -> Result<()> {
    // Load configuration
    let mut config = load_config(&args)?;
    config.merge_with_args(&args);

    let sensor = SensorClient::new(&config.sensor.endpoint, config.sensor.timeout_seconds)?;

    println!("🌡  AmbientMon");
    println!("   Bridge: {}", config.sensor.endpoint);
    println!("   Poll interval: {}s", config.sensor.poll_interval_seconds);

    probe_bridge(&sensor).await;

    // Handle --once: single poll, no analysis
    if args.once {
        return run_once(&sensor, &config).await;
    }

    // Set up the analysis pipeline unless it was disabled
    let (readings_tx, updates) = if args.no_analysis {
        println!("   Analysis: disabled (--no-analysis)");
        (None, None)
    } else {
        let api_key = args
            .api_key
            .clone()
            .context("An API key is required for analysis")?;

        println!("   Model: {}", config.model.name);
        println!("   API: {}", config.model.api_url);

        let analyzer = Arc::new(GroqAnalyzer::new(AnalyzerConfig {
            api_url: config.model.api_url.clone(),
            api_key,
            model: config.model.name.clone(),
            temperature: config.model.temperature,
            max_tokens: config.model.max_tokens,
            timeout_seconds: config.model.timeout_seconds,
        })?);

        let throttle_config = ThrottleConfig::from(&config.policy);
        let (throttle, updates) = AnalysisThrottle::new(throttle_config, analyzer, TracingSink);

        let (readings_tx, readings_rx) = mpsc::channel(16);
        tokio::spawn(throttle.run(readings_rx));

        (Some(readings_tx), Some(updates))
    };

    let monitor = Monitor::new(sensor, &config, readings_tx);

    println!("\n📡 Monitoring... press Ctrl-C to stop.\n");

    tokio::select! {
        result = monitor.run(updates) => result,
        _ = tokio::signal::ctrl_c() => {
            println!("\n👋 Shutting down.");
            Ok(())
        }
    }
}

/// Handle --once: poll the bridge a single time, print, exit.
async fn run_once(sensor: &SensorClient, config: &Config) -> Result<()> {
    let reading = sensor
        .fetch()
        .await
        .context("Failed to fetch a reading from the sensor bridge")?;

    println!();
    monitor::print_status_line(&reading, &config.alerts);
    monitor::print_alerts(&config.alerts.evaluate(&reading));

    println!("\n✅ Single poll complete. No analysis was requested.");
    Ok(())
}

/// Probe the bridge's serial link, with a spinner while we wait.
async fn probe_bridge(sensor: &SensorClient) {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap(),
    );
    spinner.set_message("Probing sensor bridge...");
    spinner.enable_steady_tick(Duration::from_millis(100));

    match sensor.connect().await {
        Ok(status) if status.success => {
            spinner.finish_and_clear();
            println!("🔌 Serial bridge connected on {}", status.port);
        }
        Ok(status) => {
            spinner.finish_and_clear();
            warn!(
                "Bridge reachable but serial port {} is not open; it retries on demand",
                status.port
            );
        }
        Err(e) => {
            spinner.finish_and_clear();
            warn!("Could not probe the sensor bridge: {}. Polling will keep retrying.", e);
        }
    }
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<Config> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        info!("Loading config from: {}", config_path.display());
        return Config::load(config_path);
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => {
            info!("Loaded default config from .ambientmon.toml");
            Ok(config)
        }
        Ok(None) => {
            debug!("No config file found, using defaults");
            Ok(Config::default())
        }
        Err(e) => {
            warn!("Failed to load config: {}", e);
            Ok(Config::default())
        }
    }
}
