//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.ambientmon.toml` files.

use crate::alerts::AlertThresholds;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Sensor bridge settings.
    #[serde(default)]
    pub sensor: SensorConfig,

    /// Model settings.
    #[serde(default)]
    pub model: ModelConfig,

    /// Analysis throttle settings.
    #[serde(default)]
    pub policy: PolicyConfig,

    /// Alert thresholds.
    #[serde(default)]
    pub alerts: AlertThresholds,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// How many readings to keep in the rolling history.
    #[serde(default = "default_history_size")]
    pub history_size: usize,

    /// Print a history summary every N polls.
    #[serde(default = "default_summary_every")]
    pub summary_every: u64,

    /// Enable verbose logging by default.
    #[serde(default)]
    pub verbose: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            history_size: default_history_size(),
            summary_every: default_summary_every(),
            verbose: false,
        }
    }
}

fn default_history_size() -> usize {
    50
}

fn default_summary_every() -> u64 {
    30
}

/// Sensor bridge settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensorConfig {
    /// Base URL of the sensor bridge.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Seconds between polls.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_seconds: u64,

    /// Request timeout in seconds.
    #[serde(default = "default_sensor_timeout")]
    pub timeout_seconds: u64,
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            poll_interval_seconds: default_poll_interval(),
            timeout_seconds: default_sensor_timeout(),
        }
    }
}

fn default_endpoint() -> String {
    "http://localhost:5000".to_string()
}

fn default_poll_interval() -> u64 {
    2
}

fn default_sensor_timeout() -> u64 {
    5
}

/// LLM model settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Default model name.
    #[serde(default = "default_model")]
    pub name: String,

    /// Chat-completions API URL.
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Temperature for generation.
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Maximum tokens in the response.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Request timeout in seconds.
    #[serde(default = "default_model_timeout")]
    pub timeout_seconds: u64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            name: default_model(),
            api_url: default_api_url(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            timeout_seconds: default_model_timeout(),
        }
    }
}

fn default_model() -> String {
    "mixtral-8x7b-32768".to_string()
}

fn default_api_url() -> String {
    "https://api.groq.com/openai/v1/chat/completions".to_string()
}

fn default_temperature() -> f32 {
    0.7
}

fn default_max_tokens() -> u32 {
    1024
}

fn default_model_timeout() -> u64 {
    30
}

/// Analysis throttle settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyConfig {
    /// Maximum age of the last analysis before a refresh is forced.
    #[serde(default = "default_staleness")]
    pub staleness_seconds: u64,

    /// Debounce delay collapsing bursts of triggers.
    #[serde(default = "default_debounce")]
    pub debounce_seconds: u64,

    /// Hard floor between call starts.
    #[serde(default = "default_min_interval")]
    pub min_interval_seconds: u64,

    /// Quiet period after a call settles.
    #[serde(default = "default_cooldown")]
    pub cooldown_seconds: u64,

    /// Temperature change (degrees Celsius) that forces a refresh.
    #[serde(default = "default_temperature_delta")]
    pub temperature_delta_c: f64,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            staleness_seconds: default_staleness(),
            debounce_seconds: default_debounce(),
            min_interval_seconds: default_min_interval(),
            cooldown_seconds: default_cooldown(),
            temperature_delta_c: default_temperature_delta(),
        }
    }
}

fn default_staleness() -> u64 {
    300
}

fn default_debounce() -> u64 {
    5
}

fn default_min_interval() -> u64 {
    10
}

fn default_cooldown() -> u64 {
    15
}

fn default_temperature_delta() -> f64 {
    5.0
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(".ambientmon.toml");

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings.
    /// This method only overrides config when CLI provides explicit values.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        // Model settings - always override since they have defaults in CLI
        self.model.name = args.model.clone();
        self.model.api_url = args.api_url.clone();
        self.model.temperature = args.temperature;

        // Timeout - only override if explicitly provided via CLI
        if let Some(timeout) = args.timeout {
            self.model.timeout_seconds = timeout;
        }

        // Sensor settings - always override
        self.sensor.endpoint = args.endpoint.clone();
        self.sensor.poll_interval_seconds = args.poll_interval;

        // Flags always override
        if args.verbose {
            self.general.verbose = true;
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.model.name, "mixtral-8x7b-32768");
        assert_eq!(config.sensor.endpoint, "http://localhost:5000");
        assert_eq!(config.sensor.poll_interval_seconds, 2);
        assert_eq!(config.policy.staleness_seconds, 300);
        assert_eq!(config.policy.debounce_seconds, 5);
        assert_eq!(config.policy.min_interval_seconds, 10);
        assert_eq!(config.policy.cooldown_seconds, 15);
        assert_eq!(config.policy.temperature_delta_c, 5.0);
        assert_eq!(config.general.history_size, 50);
    }

    #[test]
    fn test_parse_config() {
        let toml_content = r#"
[general]
history_size = 100
verbose = true

[sensor]
endpoint = "http://192.168.1.20:5000"
poll_interval_seconds = 5

[model]
name = "llama-3.3-70b-versatile"
temperature = 0.2

[policy]
staleness_seconds = 600
cooldown_seconds = 30

[alerts]
temperature_critical = 35.0
"#;

        let config: Config = toml::from_str(toml_content).unwrap();
        assert_eq!(config.general.history_size, 100);
        assert!(config.general.verbose);
        assert_eq!(config.sensor.endpoint, "http://192.168.1.20:5000");
        assert_eq!(config.sensor.poll_interval_seconds, 5);
        assert_eq!(config.model.name, "llama-3.3-70b-versatile");
        assert_eq!(config.model.temperature, 0.2);
        assert_eq!(config.policy.staleness_seconds, 600);
        assert_eq!(config.policy.cooldown_seconds, 30);
        // Unset fields fall back to defaults.
        assert_eq!(config.policy.debounce_seconds, 5);
        assert_eq!(config.alerts.temperature_critical, 35.0);
        assert_eq!(config.alerts.humidity_high, 80.0);
    }

    #[test]
    fn test_default_toml_generation() {
        let toml_str = Config::default_toml();
        assert!(!toml_str.is_empty());
        assert!(toml_str.contains("[general]"));
        assert!(toml_str.contains("[sensor]"));
        assert!(toml_str.contains("[model]"));
        assert!(toml_str.contains("[policy]"));
        assert!(toml_str.contains("[alerts]"));
    }
}
