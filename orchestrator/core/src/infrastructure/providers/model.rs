// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Model-backed agent: the query is sent verbatim as the prompt.

use async_trait::async_trait;

use crate::domain::llm::TextGenerator;
use crate::domain::provider::{Provider, ProviderError, ProviderOutput};

pub struct ModelProvider<G> {
    generator: G,
}

impl<G: TextGenerator> ModelProvider<G> {
    pub fn new(generator: G) -> Self {
        Self { generator }
    }
}

#[async_trait]
impl<G: TextGenerator> Provider for ModelProvider<G> {
    async fn invoke(&self, query: &str) -> Result<ProviderOutput, ProviderError> {
        let text = self.generator.generate_text(query).await?;
        Ok(ProviderOutput::Text(text))
    }
}
