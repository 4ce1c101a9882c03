// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// LLM-backed agent classifier
//
// Asks a model for a JSON array of agent names and parses the reply
// tolerantly (code fences, prose around the array).

use async_trait::async_trait;
use std::sync::Arc;

use crate::domain::classifier::{parse_agent_names, Classifier, ClassifierError};
use crate::domain::llm::TextGenerator;

pub struct LlmClassifier {
    generator: Arc<dyn TextGenerator>,
}

impl LlmClassifier {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self { generator }
    }

    pub fn build_prompt(request_text: &str, registry_summary: &str) -> String {
        format!(
            "You are an orchestrator assistant that selects relevant agents.\n\
             Given the user request and list of available agents with capabilities, \
             return the names of the agents that should handle this task. \
             If multiple agents are needed return all. \
             Return ONLY a JSON array of agent names.\n\n\
             Agents:\n{registry_summary}\n\n\
             User request: {request_text}\n\
             Return format example: [\"monitoring_agent\", \"cost_agent\"]"
        )
    }
}

#[async_trait]
impl Classifier for LlmClassifier {
    async fn classify(
        &self,
        request_text: &str,
        registry_summary: &str,
    ) -> Result<Vec<String>, ClassifierError> {
        let prompt = Self::build_prompt(request_text, registry_summary);
        let raw = self.generator.generate_text(&prompt).await?;
        tracing::debug!("Classifier raw output: {}", raw);
        parse_agent_names(&raw)
    }
}
