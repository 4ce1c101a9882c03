// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Dispatch Pipeline
//!
//! Runs one request through Selector → Dispatcher → Fuser.
//!
//! # Architecture
//!
//! - **Layer:** Application Layer
//! - **Purpose:** Request use case, session memory ownership and bootstrap from configuration

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Context;
use tokio::sync::Mutex as AsyncMutex;
use tracing::Instrument;

use crate::application::dispatcher::Dispatcher;
use crate::application::fuser::{Fuser, FusionError};
use crate::application::selector::Selector;
use crate::domain::classifier::Classifier;
use crate::domain::dispatch_config::{DispatchConfigManifest, FusionMode};
use crate::domain::memory::ConversationMemory;
use crate::domain::registry::AgentRegistry;
use crate::domain::request::{DispatchRequest, DispatchResponse};
use crate::infrastructure::classifier::LlmClassifier;
use crate::infrastructure::llm::{AliasedModel, ProviderRegistry};
use crate::infrastructure::providers::ProviderArena;
use crate::infrastructure::registry_loader::RegistryLoader;

pub const DEFAULT_SESSION: &str = "default";

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Fusion(#[from] FusionError),
}

/// One bounded conversation buffer per session id.
///
/// Each buffer sits behind its own async mutex, so requests on one session
/// run their selection step one at a time while other sessions proceed.
pub struct SessionMemories {
    capacity: usize,
    sessions: parking_lot::Mutex<HashMap<String, Arc<AsyncMutex<ConversationMemory>>>>,
}

impl SessionMemories {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            sessions: parking_lot::Mutex::new(HashMap::new()),
        }
    }

    pub fn session(&self, id: &str) -> Arc<AsyncMutex<ConversationMemory>> {
        self.sessions
            .lock()
            .entry(id.to_string())
            .or_insert_with(|| Arc::new(AsyncMutex::new(ConversationMemory::new(self.capacity))))
            .clone()
    }

    pub fn len(&self) -> usize {
        self.sessions.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.lock().is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub top_k: usize,
    pub time_budget: Duration,
    pub use_memory: bool,
    pub memory_capacity: usize,
}

impl PipelineSettings {
    pub fn from_config(config: &DispatchConfigManifest) -> Self {
        Self {
            top_k: config.spec.selector.top_k,
            time_budget: config.spec.dispatcher.time_budget,
            use_memory: config.spec.selector.use_memory,
            memory_capacity: config.spec.selector.memory_capacity,
        }
    }
}

pub struct DispatchPipeline {
    selector: Selector,
    dispatcher: Dispatcher,
    fuser: Fuser,
    memories: SessionMemories,
    settings: PipelineSettings,
    models: Arc<ProviderRegistry>,
}

impl DispatchPipeline {
    pub fn new(selector: Selector, dispatcher: Dispatcher, fuser: Fuser, settings: PipelineSettings) -> Self {
        Self {
            selector,
            dispatcher,
            fuser,
            memories: SessionMemories::new(settings.memory_capacity),
            settings,
            models: Arc::new(ProviderRegistry::empty()),
        }
    }

    /// Attach the model registry whose providers `/health` reports on.
    pub fn with_models(mut self, models: Arc<ProviderRegistry>) -> Self {
        self.models = models;
        self
    }

    /// Load the registry, resolve every provider and wire the optional model
    /// capabilities. Any failure here is fatal to startup.
    pub fn from_config(config: &DispatchConfigManifest) -> anyhow::Result<Self> {
        let spec = &config.spec;

        let registry = RegistryLoader::load_file(&spec.registry.path)
            .with_context(|| format!("Failed to load agent registry from {:?}", spec.registry.path))?;
        let registry = Arc::new(registry);

        let models = Arc::new(ProviderRegistry::from_config(config)?);
        let base_dir = spec.registry.path.parent().unwrap_or_else(|| Path::new(""));
        let arena = Arc::new(ProviderArena::build(&registry, &models, base_dir)?);
        tracing::info!("Resolved {} provider handles", arena.len());

        let classifier: Option<Arc<dyn Classifier>> = match &spec.selector.classifier_model {
            Some(alias) => {
                if !models.has_alias(alias) {
                    anyhow::bail!("Classifier model alias '{}' is not configured", alias);
                }
                tracing::info!("Classifier using model alias '{}'", alias);
                let model = AliasedModel::new(models.clone(), alias.clone());
                Some(Arc::new(LlmClassifier::new(Arc::new(model))))
            }
            None => {
                tracing::info!("No classifier model configured; selection uses keyword matching");
                None
            }
        };

        let fuser = match spec.fuser.mode {
            FusionMode::Deterministic => Fuser::deterministic(),
            FusionMode::Synthesis => {
                let alias = spec
                    .fuser
                    .model
                    .as_deref()
                    .context("spec.fuser.model is required in synthesis mode")?;
                if !models.has_alias(alias) {
                    anyhow::bail!("Fuser model alias '{}' is not configured", alias);
                }
                Fuser::synthesis(Arc::new(AliasedModel::new(models.clone(), alias)))
            }
        };

        Ok(Self::new(
            Selector::new(registry, classifier),
            Dispatcher::new(arena, spec.dispatcher.timeout_policy),
            fuser,
            PipelineSettings::from_config(config),
        )
        .with_models(models))
    }

    pub fn registry(&self) -> &AgentRegistry {
        self.selector.registry()
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    pub fn memories(&self) -> &SessionMemories {
        &self.memories
    }

    pub fn models(&self) -> &ProviderRegistry {
        &self.models
    }

    pub async fn handle_request(
        &self,
        message: &str,
        session: Option<&str>,
    ) -> Result<DispatchResponse, PipelineError> {
        let request = DispatchRequest::new(message, self.settings.time_budget);
        let session = session.unwrap_or(DEFAULT_SESSION);
        let span = tracing::info_span!("dispatch", request_id = %request.id, session = %session);

        async {
            let started = Instant::now();
            metrics::counter!("dispatch_requests_total").increment(1);
            tracing::info!("Received request: {}", request.text);

            let shortlist = if self.settings.use_memory {
                let slot = self.memories.session(session);
                let mut memory = slot.lock().await;
                self.selector
                    .select_agents(&request, self.settings.top_k, Some(&mut *memory))
                    .await
            } else {
                self.selector
                    .select_agents(&request, self.settings.top_k, None)
                    .await
            };

            let agents_called: Vec<String> = shortlist.iter().map(|a| a.name.clone()).collect();
            tracing::info!("Selected agents: {:?}", agents_called);

            let responses = self.dispatcher.dispatch(&shortlist, &request).await;

            let fused = match self.fuser.fuse(&request.text, &responses).await {
                Ok(fused) => fused,
                Err(e) => {
                    metrics::counter!("dispatch_fusion_failures_total").increment(1);
                    tracing::error!("Fusion failed: {}", e);
                    return Err(PipelineError::from(e));
                }
            };

            metrics::histogram!("dispatch_request_duration_seconds")
                .record(started.elapsed().as_secs_f64());
            tracing::info!("Request completed in {:?}", started.elapsed());

            Ok(DispatchResponse {
                agents_called,
                responses,
                fused,
            })
        }
        .instrument(span)
        .await
    }
}
