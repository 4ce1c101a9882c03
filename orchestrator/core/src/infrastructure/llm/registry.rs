// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// LLM Provider Registry - Model Alias Resolution
//
// Builds one adapter per enabled provider and resolves model aliases to them.
// Generation retries with exponential backoff and may fall back to a second
// provider. These retries cover model calls only; agents are never retried.

use crate::domain::dispatch_config::{DispatchConfigManifest, LLMProviderConfig};
use crate::domain::llm::{GenerationOptions, GenerationResponse, LLMError, LLMProvider, TextGenerator};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use super::gemini::GeminiAdapter;
use super::ollama::OllamaAdapter;
use super::openai::OpenAIAdapter;

const GEMINI_DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com";

pub struct ProviderRegistry {
    providers: HashMap<String, Arc<dyn LLMProvider>>,
    /// alias -> provider name
    alias_map: HashMap<String, String>,
    fallback_provider: Option<String>,
    max_retries: u32,
    retry_delay: Duration,
}

impl ProviderRegistry {
    pub fn from_config(config: &DispatchConfigManifest) -> anyhow::Result<Self> {
        let mut registry = Self::empty();
        let selection = &config.spec.llm_selection;
        registry.fallback_provider = selection.fallback_provider.clone();
        registry.max_retries = selection.max_retries.max(1);
        registry.retry_delay = Duration::from_millis(selection.retry_delay_ms);

        for provider_config in &config.spec.llm_providers {
            if !provider_config.enabled {
                info!("LLM provider '{}' disabled, skipping", provider_config.name);
                continue;
            }

            let provider = Self::create_provider(provider_config)?;
            let aliases = provider_config.models.iter().map(|m| m.alias.clone());
            registry.register(&provider_config.name, provider, aliases);
        }

        if registry.providers.is_empty() {
            info!("No LLM providers configured; classification and synthesis are unavailable");
        }

        Ok(registry)
    }

    pub fn empty() -> Self {
        Self {
            providers: HashMap::new(),
            alias_map: HashMap::new(),
            fallback_provider: None,
            max_retries: 1,
            retry_delay: Duration::from_millis(0),
        }
    }

    /// Register an adapter under `name` and map each alias to it.
    pub fn register(
        &mut self,
        name: &str,
        provider: Arc<dyn LLMProvider>,
        aliases: impl IntoIterator<Item = String>,
    ) {
        for alias in aliases {
            info!("Mapping model alias '{}' -> {}", alias, name);
            self.alias_map.insert(alias, name.to_string());
        }
        self.providers.insert(name.to_string(), provider);
    }

    pub fn with_retries(mut self, max_retries: u32, retry_delay: Duration) -> Self {
        self.max_retries = max_retries.max(1);
        self.retry_delay = retry_delay;
        self
    }

    pub fn with_fallback(mut self, provider: impl Into<String>) -> Self {
        self.fallback_provider = Some(provider.into());
        self
    }

    fn create_provider(config: &LLMProviderConfig) -> anyhow::Result<Arc<dyn LLMProvider>> {
        let api_key = Self::resolve_api_key(&config.api_key)?;
        let model = config
            .models
            .first()
            .ok_or_else(|| anyhow::anyhow!("No models configured for provider '{}'", config.name))?
            .model
            .clone();

        let provider: Arc<dyn LLMProvider> = match config.provider_type.as_str() {
            "openai" | "openai-compatible" => {
                Arc::new(OpenAIAdapter::new(config.endpoint.clone(), api_key, model))
            }
            "ollama" => Arc::new(OllamaAdapter::new(config.endpoint.clone(), model)),
            "gemini" => {
                let endpoint = if config.endpoint.is_empty() {
                    GEMINI_DEFAULT_ENDPOINT.to_string()
                } else {
                    config.endpoint.clone()
                };
                Arc::new(GeminiAdapter::new(endpoint, api_key, model))
            }
            other => anyhow::bail!("Unsupported LLM provider type: {}", other),
        };

        Ok(provider)
    }

    /// Resolve API key from config (supports "env:VAR_NAME" syntax)
    fn resolve_api_key(key: &Option<String>) -> anyhow::Result<String> {
        match key.as_deref() {
            Some(k) => match k.strip_prefix("env:") {
                Some(var_name) => std::env::var(var_name)
                    .map_err(|_| anyhow::anyhow!("Environment variable not set: {}", var_name)),
                None => Ok(k.to_string()),
            },
            None => Ok(String::new()),
        }
    }

    pub async fn generate(
        &self,
        alias: &str,
        prompt: &str,
        options: &GenerationOptions,
    ) -> Result<GenerationResponse, LLMError> {
        let provider_name = self
            .alias_map
            .get(alias)
            .ok_or_else(|| LLMError::ModelNotFound(format!("Model alias '{}' not found", alias)))?;

        let provider = self.providers.get(provider_name).ok_or_else(|| {
            LLMError::Provider(format!("Provider '{}' not found", provider_name))
        })?;

        let mut last_error = None;

        for attempt in 0..self.max_retries {
            match provider.generate(prompt, options).await {
                Ok(response) => return Ok(response),
                Err(e) => {
                    warn!(
                        "Generation with '{}' failed (attempt {}/{}): {}",
                        alias,
                        attempt + 1,
                        self.max_retries,
                        e
                    );
                    last_error = Some(e);

                    if attempt + 1 < self.max_retries {
                        let backoff = self.retry_delay.saturating_mul(2_u32.saturating_pow(attempt));
                        tokio::time::sleep(backoff).await;
                    }
                }
            }
        }

        if let Some(fallback) = &self.fallback_provider {
            if fallback != provider_name {
                if let Some(fallback_provider) = self.providers.get(fallback) {
                    info!("Trying fallback LLM provider: {}", fallback);
                    return fallback_provider.generate(prompt, options).await;
                }
            }
        }

        Err(last_error.unwrap_or_else(|| LLMError::Provider("Unknown error".into())))
    }

    /// Probe every enabled provider, keyed by provider name.
    pub async fn health_check_all(&self) -> BTreeMap<String, Result<(), LLMError>> {
        let mut results = BTreeMap::new();
        for (name, provider) in &self.providers {
            results.insert(name.clone(), provider.health_check().await);
        }
        results
    }

    pub fn has_alias(&self, alias: &str) -> bool {
        self.alias_map.contains_key(alias)
    }

    pub fn available_aliases(&self) -> Vec<String> {
        let mut aliases: Vec<_> = self.alias_map.keys().cloned().collect();
        aliases.sort();
        aliases
    }
}

/// A model alias bound to a registry, usable wherever a [`TextGenerator`] is expected.
#[derive(Clone)]
pub struct AliasedModel {
    registry: Arc<ProviderRegistry>,
    alias: String,
    options: GenerationOptions,
}

impl AliasedModel {
    pub fn new(registry: Arc<ProviderRegistry>, alias: impl Into<String>) -> Self {
        Self {
            registry,
            alias: alias.into(),
            options: GenerationOptions::default(),
        }
    }
}

#[async_trait]
impl TextGenerator for AliasedModel {
    async fn generate_text(&self, prompt: &str) -> Result<String, LLMError> {
        let response = self.registry.generate(&self.alias, prompt, &self.options).await?;
        tracing::debug!(
            model = %response.model,
            provider = %response.provider,
            tokens = response.usage.total(),
            "Model call completed"
        );
        Ok(response.text)
    }
}
