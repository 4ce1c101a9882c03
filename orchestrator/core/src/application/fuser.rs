// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Fuser
//
// Combines provider results into the single answer returned to the caller,
// either by plain concatenation or by asking a model to summarize them.

use std::fmt::Write as _;
use std::sync::Arc;

use crate::domain::dispatch_config::FusionMode;
use crate::domain::llm::{LLMError, TextGenerator};
use crate::domain::provider::ProviderResult;

#[derive(Debug, thiserror::Error)]
pub enum FusionError {
    #[error("Synthesis fusion requires a model but none is configured")]
    NoGenerator,

    #[error("Synthesis failed: {0}")]
    Generation(#[from] LLMError),
}

pub struct Fuser {
    mode: FusionMode,
    generator: Option<Arc<dyn TextGenerator>>,
}

impl Fuser {
    pub fn deterministic() -> Self {
        Self {
            mode: FusionMode::Deterministic,
            generator: None,
        }
    }

    pub fn synthesis(generator: Arc<dyn TextGenerator>) -> Self {
        Self {
            mode: FusionMode::Synthesis,
            generator: Some(generator),
        }
    }

    pub fn mode(&self) -> FusionMode {
        self.mode
    }

    pub async fn fuse(
        &self,
        request_text: &str,
        results: &[ProviderResult],
    ) -> Result<String, FusionError> {
        match self.mode {
            FusionMode::Deterministic => Ok(concatenate(results)),
            FusionMode::Synthesis => {
                let generator = self.generator.as_ref().ok_or(FusionError::NoGenerator)?;
                let prompt = synthesis_prompt(request_text, results);
                Ok(generator.generate_text(&prompt).await?)
            }
        }
    }
}

/// `[name] text` per result, joined with ` | `.
pub fn concatenate(results: &[ProviderResult]) -> String {
    results
        .iter()
        .map(|r| format!("[{}] {}", r.provider_name, r.fusion_text()))
        .collect::<Vec<_>>()
        .join(" | ")
}

pub fn synthesis_prompt(request_text: &str, results: &[ProviderResult]) -> String {
    let mut prompt = format!(
        "Combine these agent responses into a concise and helpful summary.\n\n\
         User request: {}\n\n",
        request_text
    );
    for result in results {
        let _ = writeln!(prompt, "- {}: {}", result.provider_name, result.fusion_text());
    }
    prompt
}
