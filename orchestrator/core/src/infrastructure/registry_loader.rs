// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Agent Registry Loader
//!
//! Parses the agent registry file into a validated [`AgentRegistry`].
//!
//! # Architecture
//!
//! - **Layer:** Infrastructure
//! - **Purpose:** Parse external JSON/YAML → Domain objects
//!
//! # Registry Format
//!
//! ```json
//! [
//!   {
//!     "name": "cost",
//!     "description": "Cloud cost summaries",
//!     "capabilityTags": ["cost", "spend"],
//!     "invocationRef": "catalog:cost_summary"
//!   }
//! ]
//! ```
//!
//! Any malformed record fails the whole load; callers treat that as fatal.

use std::path::Path;

use crate::domain::provider::ProviderDescriptor;
use crate::domain::registry::{AgentRegistry, RegistryError};

pub struct RegistryLoader;

impl RegistryLoader {
    /// Load a registry file. `.yaml`/`.yml` files are read as YAML, anything else as JSON.
    pub fn load_file<P: AsRef<Path>>(path: P) -> Result<AgentRegistry, RegistryError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| RegistryError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let is_yaml = matches!(
            path.extension().and_then(|e| e.to_str()),
            Some("yaml") | Some("yml")
        );

        let descriptors = if is_yaml {
            Self::parse_yaml(&content)
        } else {
            Self::parse_json(&content)
        }
        .map_err(|message| RegistryError::Malformed {
            path: path.to_path_buf(),
            message,
        })?;

        let registry = AgentRegistry::new(descriptors)?;
        tracing::info!("Loaded {} agents from {:?}", registry.len(), path);
        Ok(registry)
    }

    pub fn parse_json(content: &str) -> Result<Vec<ProviderDescriptor>, String> {
        serde_json::from_str(content).map_err(|e| e.to_string())
    }

    pub fn parse_yaml(content: &str) -> Result<Vec<ProviderDescriptor>, String> {
        serde_yaml::from_str(content).map_err(|e| e.to_string())
    }
}
