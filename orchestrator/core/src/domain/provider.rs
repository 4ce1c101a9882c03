// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Provider
//!
//! Capability providers ("agents") and the result each invocation produces.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Provider capability interface, registry descriptor and result model

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::domain::llm::LLMError;

/// Provider name used for the synthetic result returned when a batch deadline elapses.
pub const UNKNOWN_PROVIDER: &str = "unknown";

/// Error detail carried by results that did not finish before the deadline.
pub const TIMEOUT_DETAIL: &str = "timeout";

/// Catalog entry for one provider, loaded once from the registry file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderDescriptor {
    /// Unique key across the registry
    pub name: String,

    /// Free-form description of the provider
    #[serde(default)]
    pub description: String,

    /// Ordered capability tags used for selection
    #[serde(default)]
    pub capability_tags: Vec<String>,

    /// Opaque reference resolved into a provider handle at startup
    pub invocation_ref: String,
}

impl ProviderDescriptor {
    pub fn new(name: impl Into<String>, capability_tags: &[&str], invocation_ref: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            capability_tags: capability_tags.iter().map(|t| t.to_string()).collect(),
            invocation_ref: invocation_ref.into(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

/// What a provider answers with: plain text or a JSON object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProviderOutput {
    Text(String),
    Structured(Map<String, Value>),
}

impl ProviderOutput {
    /// Text used for fusion.
    ///
    /// A structured payload carrying a `message` field yields that field;
    /// anything else is rendered as-is (compact JSON for objects).
    pub fn extract_text(&self) -> String {
        match self {
            ProviderOutput::Text(text) => text.clone(),
            ProviderOutput::Structured(map) => match map.get("message") {
                Some(Value::String(message)) => message.clone(),
                Some(other) => other.to_string(),
                None => Value::Object(map.clone()).to_string(),
            },
        }
    }

    /// Convert an arbitrary JSON value. Objects stay structured, strings stay
    /// text, every other value is wrapped under `message`.
    pub fn from_json(value: Value) -> Self {
        match value {
            Value::Object(map) => ProviderOutput::Structured(map),
            Value::String(text) => ProviderOutput::Text(text),
            other => {
                let mut map = Map::new();
                map.insert("message".to_string(), other);
                ProviderOutput::Structured(map)
            }
        }
    }
}

impl From<String> for ProviderOutput {
    fn from(text: String) -> Self {
        ProviderOutput::Text(text)
    }
}

impl From<&str> for ProviderOutput {
    fn from(text: &str) -> Self {
        ProviderOutput::Text(text.to_string())
    }
}

/// Outcome of invoking one selected provider in one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderResult {
    pub provider_name: String,
    pub succeeded: bool,
    pub payload: ProviderOutput,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_detail: Option<String>,
}

impl ProviderResult {
    pub fn success(provider_name: impl Into<String>, payload: ProviderOutput) -> Self {
        Self {
            provider_name: provider_name.into(),
            succeeded: true,
            payload,
            error_detail: None,
        }
    }

    pub fn failure(provider_name: impl Into<String>, detail: impl Into<String>) -> Self {
        let detail = detail.into();
        let mut payload = Map::new();
        payload.insert("error".to_string(), Value::String(detail.clone()));
        Self {
            provider_name: provider_name.into(),
            succeeded: false,
            payload: ProviderOutput::Structured(payload),
            error_detail: Some(detail),
        }
    }

    /// The single result standing in for a whole batch that missed its deadline.
    pub fn batch_timeout() -> Self {
        Self::failure(UNKNOWN_PROVIDER, TIMEOUT_DETAIL)
    }

    pub fn is_batch_timeout(&self) -> bool {
        !self.succeeded
            && self.provider_name == UNKNOWN_PROVIDER
            && self.error_detail.as_deref() == Some(TIMEOUT_DETAIL)
    }

    /// Text contributed to fusion: the extracted payload, or the error detail for failures.
    pub fn fusion_text(&self) -> String {
        if self.succeeded {
            self.payload.extract_text()
        } else {
            self.error_detail
                .clone()
                .unwrap_or_else(|| self.payload.extract_text())
        }
    }
}

/// Errors a provider invocation can end with. Never crosses the dispatcher boundary.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("{0}")]
    Failed(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("generation failed: {0}")]
    Generation(#[from] LLMError),

    #[error("provider panicked: {0}")]
    Panicked(String),
}

/// Capability interface every provider variant exposes.
#[async_trait]
pub trait Provider: Send + Sync {
    async fn invoke(&self, query: &str) -> Result<ProviderOutput, ProviderError>;
}

/// Providers whose work completes without suspending.
pub trait SyncProvider: Send + Sync {
    fn process(&self, query: &str) -> Result<ProviderOutput, ProviderError>;
}

/// Lifts a [`SyncProvider`] into the [`Provider`] interface.
///
/// The call runs to completion on the polling task and blocks it for its duration.
pub struct Immediate<P>(pub P);

#[async_trait]
impl<P: SyncProvider> Provider for Immediate<P> {
    async fn invoke(&self, query: &str) -> Result<ProviderOutput, ProviderError> {
        self.0.process(query)
    }
}
