// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Llm
//!
//! Generative model interface shared by the classifier, the synthesis fuser
//! and `llm:` providers.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Vendor-neutral LLM interface (adapters live in `infrastructure::llm`)

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A concrete model endpoint (OpenAI, Ollama, Gemini...).
#[async_trait]
pub trait LLMProvider: Send + Sync {
    /// Generate a completion for a single user prompt
    async fn generate(
        &self,
        prompt: &str,
        options: &GenerationOptions,
    ) -> Result<GenerationResponse, LLMError>;

    /// Check if the endpoint is reachable
    async fn health_check(&self) -> Result<(), LLMError>;
}

/// Prompt-in, text-out capability. This is the only shape the dispatch
/// pipeline needs from a model.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate_text(&self, prompt: &str) -> Result<String, LLMError>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationOptions {
    /// Maximum tokens to generate
    pub max_tokens: Option<u32>,

    /// Sampling temperature
    pub temperature: Option<f32>,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            max_tokens: Some(1024),
            temperature: Some(0.2),
        }
    }
}

#[derive(Debug, Clone)]
pub struct GenerationResponse {
    pub text: String,
    pub usage: TokenUsage,
    /// Adapter type that served the request (e.g. "openai", "gemini")
    pub provider: String,
    pub model: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
}

impl TokenUsage {
    pub fn total(&self) -> u32 {
        self.prompt_tokens + self.completion_tokens
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LLMError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Rate limit exceeded")]
    RateLimit,

    #[error("Model not found: {0}")]
    ModelNotFound(String),

    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Empty response from model")]
    EmptyResponse,
}

impl LLMError {
    /// Map a non-success HTTP status from a model endpoint.
    pub fn from_status(status: u16, model: &str, body: String) -> Self {
        match status {
            401 | 403 => LLMError::Authentication(body),
            404 => LLMError::ModelNotFound(model.to_string()),
            429 => LLMError::RateLimit,
            _ => LLMError::Provider(format!("HTTP {}: {}", status, body)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert!(matches!(LLMError::from_status(401, "m", String::new()), LLMError::Authentication(_)));
        assert!(matches!(LLMError::from_status(429, "m", String::new()), LLMError::RateLimit));
        match LLMError::from_status(404, "llama3.2", String::new()) {
            LLMError::ModelNotFound(model) => assert_eq!(model, "llama3.2"),
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(
            LLMError::from_status(500, "m", "boom".into()).to_string(),
            "Provider error: HTTP 500: boom"
        );
    }
}
