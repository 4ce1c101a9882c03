// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Registry
//!
//! Write-once catalog of provider descriptors. Built at startup, then shared
//! read-only behind an `Arc`.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Holds validated [`ProviderDescriptor`]s in file order

use std::collections::HashSet;
use std::path::PathBuf;

use crate::domain::provider::ProviderDescriptor;

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("Failed to read registry file {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed registry {path:?}: {message}")]
    Malformed { path: PathBuf, message: String },

    #[error("Registry entry #{index} has an empty name")]
    EmptyName { index: usize },

    #[error("Agent '{name}' has an empty invocationRef")]
    EmptyInvocationRef { name: String },

    #[error("Duplicate agent name '{0}'")]
    DuplicateName(String),
}

#[derive(Debug, Clone, Default)]
pub struct AgentRegistry {
    agents: Vec<ProviderDescriptor>,
}

impl AgentRegistry {
    /// Validate and freeze a set of descriptors.
    pub fn new(agents: Vec<ProviderDescriptor>) -> Result<Self, RegistryError> {
        let mut seen = HashSet::new();
        for (index, agent) in agents.iter().enumerate() {
            if agent.name.trim().is_empty() {
                return Err(RegistryError::EmptyName { index });
            }
            if agent.invocation_ref.trim().is_empty() {
                return Err(RegistryError::EmptyInvocationRef {
                    name: agent.name.clone(),
                });
            }
            if !seen.insert(agent.name.as_str()) {
                return Err(RegistryError::DuplicateName(agent.name.clone()));
            }
        }
        Ok(Self { agents })
    }

    /// All descriptors in file order.
    pub fn list_all(&self) -> &[ProviderDescriptor] {
        &self.agents
    }

    pub fn get(&self, name: &str) -> Option<&ProviderDescriptor> {
        self.agents.iter().find(|a| a.name == name)
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    /// `name: tag, tag` per line, as shown to the classifier.
    pub fn summary(&self) -> String {
        self.agents
            .iter()
            .map(|a| format!("{}: {}", a.name, a.capability_tags.join(", ")))
            .collect::<Vec<_>>()
            .join("\n")
    }
}
