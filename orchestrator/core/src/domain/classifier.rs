// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Classifier
//!
//! Contract for the external capability that maps a request plus a registry
//! summary to the names of relevant providers, and the tolerant parser for
//! its replies.

use async_trait::async_trait;
use serde_json::Value;

use crate::domain::llm::LLMError;

#[derive(Debug, thiserror::Error)]
pub enum ClassifierError {
    #[error("Classifier model call failed: {0}")]
    Generation(#[from] LLMError),

    #[error("Classifier reply is not a JSON list: {0}")]
    Unparseable(String),
}

#[async_trait]
pub trait Classifier: Send + Sync {
    /// Names of the providers that should handle `request_text`. An empty
    /// list means the classifier could not decide.
    async fn classify(
        &self,
        request_text: &str,
        registry_summary: &str,
    ) -> Result<Vec<String>, ClassifierError>;
}

/// Remove a surrounding markdown code fence (```` ``` ```` or ```` ```json ````).
pub fn strip_code_fence(raw: &str) -> &str {
    let mut text = raw.trim();
    if let Some(rest) = text.strip_prefix("```") {
        let rest = rest.trim_start();
        text = match rest.get(..4) {
            Some(tag) if tag.eq_ignore_ascii_case("json") => &rest[4..],
            _ => rest,
        };
    }
    if let Some(rest) = text.trim_end().strip_suffix("```") {
        text = rest;
    }
    text.trim()
}

/// Parse a classifier reply into provider names.
///
/// A JSON value that is not a list yields an empty selection. Text that is
/// not JSON at all is searched for an embedded `[...]` span before giving up.
pub fn parse_agent_names(raw: &str) -> Result<Vec<String>, ClassifierError> {
    let cleaned = strip_code_fence(raw);
    match serde_json::from_str::<Value>(cleaned) {
        Ok(value) => Ok(names_from_value(value)),
        Err(parse_err) => {
            let embedded = match (raw.find('['), raw.rfind(']')) {
                (Some(start), Some(end)) if start < end => &raw[start..=end],
                _ => return Err(ClassifierError::Unparseable(parse_err.to_string())),
            };
            serde_json::from_str::<Value>(embedded)
                .map(names_from_value)
                .map_err(|e| ClassifierError::Unparseable(e.to_string()))
        }
    }
}

fn names_from_value(value: Value) -> Vec<String> {
    match value {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|item| match item {
                Value::String(name) => Some(name.trim().to_string()),
                _ => None,
            })
            .filter(|name| !name.is_empty())
            .collect(),
        other => {
            tracing::warn!("Classifier returned non-list structure: {}", other);
            Vec::new()
        }
    }
}
