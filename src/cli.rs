//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use clap::Parser;
use std::path::PathBuf;

/// AmbientMon - LLM-assisted environmental monitor
///
/// Polls a local sensor bridge for temperature, humidity, and gas readings,
/// raises threshold alerts, and periodically asks a Groq-hosted LLM for a
/// natural-language assessment of the conditions.
///
/// Examples:
///   ambientmon
///   ambientmon --endpoint http://192.168.1.20:5000
///   ambientmon --model llama-3.3-70b-versatile --poll-interval 5
///   ambientmon --once
///   ambientmon --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Sensor bridge base URL
    ///
    /// The bridge serves `GET /data` with the latest reading.
    #[arg(
        short,
        long,
        default_value = "http://localhost:5000",
        env = "AMBIENTMON_ENDPOINT",
        value_name = "URL"
    )]
    pub endpoint: String,

    /// Model to use for the analysis
    ///
    /// Any model served by the configured chat-completions API.
    /// Can also be set via AMBIENTMON_MODEL or .ambientmon.toml.
    #[arg(
        short,
        long,
        default_value = "mixtral-8x7b-32768",
        env = "AMBIENTMON_MODEL"
    )]
    pub model: String,

    /// Chat-completions API endpoint URL
    #[arg(
        long,
        default_value = "https://api.groq.com/openai/v1/chat/completions",
        env = "GROQ_API_URL"
    )]
    pub api_url: String,

    /// API key for the analysis service
    ///
    /// Required unless --once or --no-analysis is used.
    #[arg(long, env = "GROQ_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Seconds between sensor polls
    #[arg(long, default_value = "2", value_name = "SECS")]
    pub poll_interval: u64,

    /// Analysis request timeout in seconds
    ///
    /// If not specified, uses the config file value or 30s.
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Temperature for LLM responses (0.0 - 1.0)
    #[arg(long, default_value = "0.7")]
    pub temperature: f32,

    /// Path to configuration file
    ///
    /// If not specified, looks for .ambientmon.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,

    /// Poll the bridge once, print the reading and alerts, then exit
    ///
    /// No analysis call is made.
    #[arg(long)]
    pub once: bool,

    /// Run the monitor without requesting analyses
    #[arg(long)]
    pub no_analysis: bool,

    /// Generate a default .ambientmon.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        // Skip validation for --init-config
        if self.init_config {
            return Ok(());
        }

        // Validate endpoint URL format
        if !self.endpoint.starts_with("http://") && !self.endpoint.starts_with("https://") {
            return Err("Endpoint URL must start with 'http://' or 'https://'".to_string());
        }

        // Validate API URL format (not needed when no analysis will run)
        if !self.once && !self.no_analysis {
            if !self.api_url.starts_with("http://") && !self.api_url.starts_with("https://") {
                return Err("API URL must start with 'http://' or 'https://'".to_string());
            }

            if self.api_key.as_deref().unwrap_or("").is_empty() {
                return Err(
                    "An API key is required for analysis. Set GROQ_API_KEY or pass --api-key \
                     (or run with --no-analysis)"
                        .to_string(),
                );
            }
        }

        // Validate temperature range
        if !(0.0..=1.0).contains(&self.temperature) {
            return Err("Temperature must be between 0.0 and 1.0".to_string());
        }

        // Validate poll interval
        if self.poll_interval == 0 {
            return Err("Poll interval must be at least 1 second".to_string());
        }

        // Check for conflicting options
        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        // Validate timeout if provided
        if let Some(timeout) = self.timeout {
            if timeout == 0 {
                return Err("Timeout must be at least 1 second".to_string());
            }
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_args() -> Args {
        Args {
            endpoint: "http://localhost:5000".to_string(),
            model: "mixtral-8x7b-32768".to_string(),
            api_url: "https://api.groq.com/openai/v1/chat/completions".to_string(),
            api_key: Some("gsk_test".to_string()),
            poll_interval: 2,
            timeout: None,
            temperature: 0.7,
            config: None,
            verbose: false,
            quiet: false,
            once: false,
            no_analysis: false,
            init_config: false,
        }
    }

    #[test]
    fn test_valid_args() {
        assert!(make_args().validate().is_ok());
    }

    #[test]
    fn test_validation_invalid_endpoint() {
        let mut args = make_args();
        args.endpoint = "localhost:5000".to_string();
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_missing_api_key() {
        let mut args = make_args();
        args.api_key = None;
        assert!(args.validate().is_err());

        // No key needed when no analysis will run.
        args.no_analysis = true;
        assert!(args.validate().is_ok());

        args.no_analysis = false;
        args.once = true;
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_validation_zero_poll_interval() {
        let mut args = make_args();
        args.poll_interval = 0;
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_conflicting_options() {
        let mut args = make_args();
        args.verbose = true;
        args.quiet = true;
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_temperature_range() {
        let mut args = make_args();
        args.temperature = 1.5;
        assert!(args.validate().is_err());
        args.temperature = -0.1;
        assert!(args.validate().is_err());
        args.temperature = 0.0;
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_log_level() {
        let mut args = make_args();
        assert_eq!(args.log_level(), tracing::Level::INFO);

        args.verbose = true;
        assert_eq!(args.log_level(), tracing::Level::DEBUG);

        args.verbose = false;
        args.quiet = true;
        assert_eq!(args.log_level(), tracing::Level::ERROR);
    }
}
