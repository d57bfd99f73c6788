//! Groq chat-completions client.
//!
//! Sends one reading per request to an OpenAI-compatible chat endpoint and
//! extracts the assistant's reply. Failures are classified so the caller
//! can log a meaningful cause while showing users a generic message; the
//! client never retries on its own.

use crate::models::Reading;
use crate::policy::Analyzer;
use serde::{Deserialize, Serialize};
use std::future::Future;
use thiserror::Error;
use tokio::time::Duration;
use tracing::debug;

/// Errors from the remote analyzer.
#[derive(Debug, Error)]
pub enum AnalyzerError {
    #[error("request timed out after {0}s")]
    Timeout(u64),

    #[error("cannot connect to the analysis API at {0}")]
    Connect(String),

    #[error("quota exhausted, the API asked us to slow down")]
    RateLimited,

    #[error("analysis API error {status}: {body}")]
    Api { status: u16, body: String },

    #[error("the API returned no choices")]
    EmptyResponse,

    #[error("failed to send request: {0}")]
    Http(#[from] reqwest::Error),
}

/// Settings for the Groq client.
#[derive(Debug, Clone)]
pub struct AnalyzerConfig {
    /// Chat-completions endpoint URL.
    pub api_url: String,
    /// Bearer token.
    pub api_key: String,
    /// Model name.
    pub model: String,
    /// Sampling temperature.
    pub temperature: f32,
    /// Response token cap.
    pub max_tokens: u32,
    /// Request timeout in seconds.
    pub timeout_seconds: u64,
}

/// Chat-completions request body.
#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

/// Chat-completions response body (the fields we consume).
#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChatMessage,
}

const SYSTEM_PROMPT: &str = "You are an expert in environmental analysis. \
Analyze the provided data and give relevant insights about the ambient \
conditions, potential risks, and practical recommendations.";

/// The production [`Analyzer`]: one reading in, one assessment out.
pub struct GroqAnalyzer {
    config: AnalyzerConfig,
    http_client: reqwest::Client,
}

impl GroqAnalyzer {
    pub fn new(config: AnalyzerConfig) -> anyhow::Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;

        Ok(Self {
            config,
            http_client,
        })
    }

    async fn request(&self, reading: &Reading) -> Result<String, AnalyzerError> {
        let request = ChatRequest {
            model: self.config.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: SYSTEM_PROMPT.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: build_prompt(reading),
                },
            ],
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
        };

        debug!("Sending analysis request for reading: {:?}", reading);

        let response = self
            .http_client
            .post(&self.config.api_url)
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AnalyzerError::Timeout(self.config.timeout_seconds)
                } else if e.is_connect() {
                    AnalyzerError::Connect(self.config.api_url.clone())
                } else {
                    AnalyzerError::Http(e)
                }
            })?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(AnalyzerError::RateLimited);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AnalyzerError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let chat_response: ChatResponse = response.json().await?;
        extract_text(chat_response)
    }
}

impl Analyzer for GroqAnalyzer {
    type Error = AnalyzerError;

    fn analyze(
        &self,
        reading: &Reading,
    ) -> impl Future<Output = Result<String, AnalyzerError>> + Send {
        self.request(reading)
    }
}

/// Render the user prompt for one reading.
fn build_prompt(reading: &Reading) -> String {
    format!(
        "Analyze the following environmental data:\n\
         - Temperature: {:.1}C\n\
         - Humidity: {:.1}%\n\
         - Gas: {}\n\n\
         Provide:\n\
         1. An assessment of the current conditions\n\
         2. Potential risks\n\
         3. Practical recommendations\n\
         4. Suggested immediate actions, if needed.",
        reading.temperature,
        reading.humidity,
        reading.gas_label()
    )
}

/// Pull the assistant's reply out of a response.
fn extract_text(response: ChatResponse) -> Result<String, AnalyzerError> {
    let choice = response
        .choices
        .into_iter()
        .next()
        .ok_or(AnalyzerError::EmptyResponse)?;

    let text = choice.message.content.trim().to_string();
    if text.is_empty() {
        return Err(AnalyzerError::EmptyResponse);
    }
    Ok(text)
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
    fn test_prompt_contains_reading_values() {
        let prompt = build_prompt(&reading(25.5, 40.0, true));
        assert!(prompt.contains("Temperature: 25.5C"));
        assert!(prompt.contains("Humidity: 40.0%"));
        assert!(prompt.contains("Gas: Normal"));

        let prompt = build_prompt(&reading(31.0, 85.0, false));
        assert!(prompt.contains("Gas: ALERT"));
    }

    #[test]
    fn test_extract_text() {
        let json = r#"{
            "choices": [
                {"message": {"role": "assistant", "content": "  All conditions nominal.  "}}
            ]
        }"#;
        let response: ChatResponse = serde_json::from_str(json).unwrap();
        let text = extract_text(response).unwrap();
        assert_eq!(text, "All conditions nominal.");
    }

    #[test]
    fn test_extract_text_rejects_empty_choices() {
        let response: ChatResponse = serde_json::from_str(r#"{"choices": []}"#).unwrap();
        assert!(matches!(
            extract_text(response),
            Err(AnalyzerError::EmptyResponse)
        ));

        // A missing choices array behaves the same.
        let response: ChatResponse = serde_json::from_str("{}").unwrap();
        assert!(matches!(
            extract_text(response),
            Err(AnalyzerError::EmptyResponse)
        ));
    }

    #[test]
    fn test_extract_text_rejects_blank_reply() {
        let json = r#"{
            "choices": [{"message": {"role": "assistant", "content": "   "}}]
        }"#;
        let response: ChatResponse = serde_json::from_str(json).unwrap();
        assert!(matches!(
            extract_text(response),
            Err(AnalyzerError::EmptyResponse)
        ));
    }
}
