//! Remote analysis backend.
//!
//! This module provides the Groq-hosted LLM client that turns a sensor
//! reading into a natural-language assessment.

pub mod client;

pub use client::{AnalyzerConfig, AnalyzerError, GroqAnalyzer};
