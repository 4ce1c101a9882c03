// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Provider Infrastructure
//!
//! Concrete provider variants and the arena that resolves every registry
//! entry's `invocationRef` into a handle, once, at startup.
//!
//! | invocationRef | Variant | Kind |
//! |---------------|---------|------|
//! | `echo` | [`builtin::EchoProvider`] | sync |
//! | `notifications` | [`builtin::NotificationsProvider`] | sync |
//! | `catalog:<key>` | [`builtin::CatalogProvider`] | sync |
//! | `docs:<dir>` | [`docs::DocsProvider`] | sync |
//! | `summary:<dir>[@<alias>]` | [`summary::SummaryProvider`] | async |
//! | `http:<url>` | [`http::HttpProvider`] | async |
//! | `llm:<alias>` | [`model::ModelProvider`] | async |
//!
//! Relative `docs:` and `summary:` directories are resolved against the
//! directory holding the registry file.

pub mod builtin;
pub mod docs;
pub mod http;
pub mod model;
pub mod summary;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use crate::domain::provider::{Immediate, Provider};
use crate::domain::registry::AgentRegistry;
use crate::infrastructure::llm::{AliasedModel, ProviderRegistry};

use builtin::{CatalogEntry, CatalogProvider, EchoProvider, NotificationsProvider};
use docs::DocsProvider;
use http::HttpProvider;
use model::ModelProvider;
use summary::SummaryProvider;

#[derive(Debug, thiserror::Error)]
pub enum ProviderResolveError {
    #[error("Agent '{agent}': unknown invocationRef '{reference}'")]
    UnknownReference { agent: String, reference: String },

    #[error("Agent '{agent}': unknown catalog entry '{key}'")]
    UnknownCatalogEntry { agent: String, key: String },

    #[error("Agent '{agent}': model alias '{alias}' is not configured")]
    UnknownModelAlias { agent: String, alias: String },

    #[error("Agent '{agent}': failed to load documents from {dir:?}: {source}")]
    Documents {
        agent: String,
        dir: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Agent '{agent}': monitoring directory {dir:?} does not exist")]
    MissingDirectory { agent: String, dir: PathBuf },
}

/// Parsed form of a registry `invocationRef`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvocationRef {
    Echo,
    Notifications,
    Catalog(String),
    Docs(PathBuf),
    Summary {
        dir: PathBuf,
        model: Option<String>,
    },
    Http(String),
    Llm(String),
}

impl FromStr for InvocationRef {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        match s.split_once(':') {
            None if s == "echo" => Ok(InvocationRef::Echo),
            None if s == "notifications" => Ok(InvocationRef::Notifications),
            Some(("catalog", key)) if !key.is_empty() => Ok(InvocationRef::Catalog(key.to_string())),
            Some(("docs", dir)) if !dir.is_empty() => Ok(InvocationRef::Docs(PathBuf::from(dir))),
            Some(("summary", rest)) if !rest.is_empty() => match rest.rsplit_once('@') {
                Some((dir, alias)) if !dir.is_empty() && !alias.is_empty() => Ok(InvocationRef::Summary {
                    dir: PathBuf::from(dir),
                    model: Some(alias.to_string()),
                }),
                Some(_) => Err(s.to_string()),
                None => Ok(InvocationRef::Summary {
                    dir: PathBuf::from(rest),
                    model: None,
                }),
            },
            Some(("http", rest)) if !rest.is_empty() => {
                // `http:http://host/path` and `http:https://...` carry a full URL
                Ok(InvocationRef::Http(rest.to_string()))
            }
            Some(("llm", alias)) if !alias.is_empty() => Ok(InvocationRef::Llm(alias.to_string())),
            _ => Err(s.to_string()),
        }
    }
}

/// Provider handles indexed by agent name. Read-only once built.
#[derive(Default, Clone)]
pub struct ProviderArena {
    handles: HashMap<String, Arc<dyn Provider>>,
}

impl ProviderArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve every registry entry. Any unresolvable entry fails startup.
    ///
    /// `base_dir` anchors relative data directories, normally the folder of
    /// the registry file.
    pub fn build(
        registry: &AgentRegistry,
        models: &Arc<ProviderRegistry>,
        base_dir: &Path,
    ) -> Result<Self, ProviderResolveError> {
        let mut arena = Self::new();
        for agent in registry.list_all() {
            let reference: InvocationRef = agent.invocation_ref.parse().map_err(|reference| {
                ProviderResolveError::UnknownReference {
                    agent: agent.name.clone(),
                    reference,
                }
            })?;
            let handle = Self::resolve(&agent.name, reference, models, base_dir)?;
            tracing::debug!("Resolved agent '{}' -> {}", agent.name, agent.invocation_ref);
            arena.insert(agent.name.clone(), handle);
        }
        Ok(arena)
    }

    fn resolve(
        agent: &str,
        reference: InvocationRef,
        models: &Arc<ProviderRegistry>,
        base_dir: &Path,
    ) -> Result<Arc<dyn Provider>, ProviderResolveError> {
        let handle: Arc<dyn Provider> = match reference {
            InvocationRef::Echo => Arc::new(Immediate(EchoProvider)),
            InvocationRef::Notifications => Arc::new(Immediate(NotificationsProvider::default())),
            InvocationRef::Catalog(key) => {
                let entry = CatalogEntry::from_key(&key).ok_or_else(|| {
                    ProviderResolveError::UnknownCatalogEntry {
                        agent: agent.to_string(),
                        key,
                    }
                })?;
                Arc::new(Immediate(CatalogProvider::new(entry)))
            }
            InvocationRef::Docs(dir) => {
                let dir = base_dir.join(dir);
                let provider = DocsProvider::load_dir(&dir).map_err(|source| {
                    ProviderResolveError::Documents {
                        agent: agent.to_string(),
                        dir,
                        source,
                    }
                })?;
                Arc::new(Immediate(provider))
            }
            InvocationRef::Summary { dir, model } => {
                let dir = base_dir.join(dir);
                if !dir.is_dir() {
                    return Err(ProviderResolveError::MissingDirectory {
                        agent: agent.to_string(),
                        dir,
                    });
                }
                let mut provider = SummaryProvider::new(dir);
                if let Some(alias) = model {
                    if !models.has_alias(&alias) {
                        return Err(ProviderResolveError::UnknownModelAlias {
                            agent: agent.to_string(),
                            alias,
                        });
                    }
                    provider = provider.with_model(Arc::new(AliasedModel::new(models.clone(), alias)));
                }
                Arc::new(provider)
            }
            InvocationRef::Http(url) => Arc::new(HttpProvider::new(url)),
            InvocationRef::Llm(alias) => {
                if !models.has_alias(&alias) {
                    return Err(ProviderResolveError::UnknownModelAlias {
                        agent: agent.to_string(),
                        alias,
                    });
                }
                Arc::new(ModelProvider::new(AliasedModel::new(models.clone(), alias)))
            }
        };
        Ok(handle)
    }

    pub fn insert(&mut self, name: impl Into<String>, handle: Arc<dyn Provider>) {
        self.handles.insert(name.into(), handle);
    }

    pub fn handle(&self, name: &str) -> Option<Arc<dyn Provider>> {
        self.handles.get(name).cloned()
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::provider::ProviderDescriptor;

    #[test]
    fn test_parse_invocation_refs() {
        assert_eq!("echo".parse::<InvocationRef>(), Ok(InvocationRef::Echo));
        assert_eq!(
            "catalog:cost_summary".parse::<InvocationRef>(),
            Ok(InvocationRef::Catalog("cost_summary".into()))
        );
        assert_eq!(
            "http:http://localhost:9000/agent".parse::<InvocationRef>(),
            Ok(InvocationRef::Http("http://localhost:9000/agent".into()))
        );
        assert_eq!("llm:fast".parse::<InvocationRef>(), Ok(InvocationRef::Llm("fast".into())));
        assert!("agents.static_agent".parse::<InvocationRef>().is_err());
        assert!("catalog:".parse::<InvocationRef>().is_err());
        assert_eq!(
            "summary:monitoring@fast".parse::<InvocationRef>(),
            Ok(InvocationRef::Summary {
                dir: "monitoring".into(),
                model: Some("fast".into()),
            })
        );
        assert_eq!(
            "summary:/var/lib/monitoring".parse::<InvocationRef>(),
            Ok(InvocationRef::Summary {
                dir: "/var/lib/monitoring".into(),
                model: None,
            })
        );
        assert!("summary:monitoring@".parse::<InvocationRef>().is_err());
    }

    #[test]
    fn test_build_resolves_every_agent() {
        let registry = AgentRegistry::new(vec![
            ProviderDescriptor::new("cost", &["cost"], "catalog:cost_summary"),
            ProviderDescriptor::new("dummy", &["test"], "echo"),
            ProviderDescriptor::new("api", &["alert"], "notifications"),
        ])
        .unwrap();

        let arena = ProviderArena::build(&registry, &Arc::new(ProviderRegistry::empty()), Path::new("")).unwrap();
        assert_eq!(arena.len(), 3);
        assert!(arena.handle("cost").is_some());
        assert!(arena.handle("missing").is_none());
    }

    #[test]
    fn test_build_fails_on_unknown_reference() {
        let registry = AgentRegistry::new(vec![ProviderDescriptor::new("x", &[], "python:agents.x")]).unwrap();
        let err = ProviderArena::build(&registry, &Arc::new(ProviderRegistry::empty()), Path::new("")).err().unwrap();
        assert!(matches!(err, ProviderResolveError::UnknownReference { .. }));
    }

    #[test]
    fn test_build_fails_on_unconfigured_model_alias() {
        let registry = AgentRegistry::new(vec![ProviderDescriptor::new("writer", &[], "llm:smart")]).unwrap();
        let err = ProviderArena::build(&registry, &Arc::new(ProviderRegistry::empty()), Path::new("")).err().unwrap();
        assert!(matches!(err, ProviderResolveError::UnknownModelAlias { alias, .. } if alias == "smart"));
    }

    #[test]
    fn test_build_fails_on_unknown_catalog_entry() {
        let registry = AgentRegistry::new(vec![ProviderDescriptor::new("x", &[], "catalog:weather")]).unwrap();
        let err = ProviderArena::build(&registry, &Arc::new(ProviderRegistry::empty()), Path::new("")).err().unwrap();
        assert!(matches!(err, ProviderResolveError::UnknownCatalogEntry { .. }));
    }

    #[test]
    fn test_data_directories_resolve_against_base_dir() {
        let base = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(base.path().join("docs")).unwrap();
        std::fs::write(base.path().join("docs/vpc.txt"), "VPC peering connects networks").unwrap();
        std::fs::create_dir_all(base.path().join("monitoring")).unwrap();

        let registry = AgentRegistry::new(vec![
            ProviderDescriptor::new("knowledge", &["docs"], "docs:docs"),
            ProviderDescriptor::new("summary", &["summary"], "summary:monitoring"),
        ])
        .unwrap();

        let arena = ProviderArena::build(&registry, &Arc::new(ProviderRegistry::empty()), base.path()).unwrap();
        assert_eq!(arena.len(), 2);

        // the same registry does not resolve from an unrelated directory
        let elsewhere = tempfile::tempdir().unwrap();
        let err = ProviderArena::build(&registry, &Arc::new(ProviderRegistry::empty()), elsewhere.path())
            .err()
            .unwrap();
        assert!(matches!(err, ProviderResolveError::Documents { dir, .. } if dir == elsewhere.path().join("docs")));
    }

    #[test]
    fn test_build_fails_on_missing_summary_directory() {
        let base = tempfile::tempdir().unwrap();
        let registry = AgentRegistry::new(vec![ProviderDescriptor::new("summary", &[], "summary:monitoring")]).unwrap();
        let err = ProviderArena::build(&registry, &Arc::new(ProviderRegistry::empty()), base.path()).err().unwrap();
        assert!(matches!(err, ProviderResolveError::MissingDirectory { .. }));
    }

    #[test]
    fn test_build_fails_on_unconfigured_summary_model() {
        let base = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(base.path().join("monitoring")).unwrap();
        let registry = AgentRegistry::new(vec![ProviderDescriptor::new("summary", &[], "summary:monitoring@smart")]).unwrap();
        let err = ProviderArena::build(&registry, &Arc::new(ProviderRegistry::empty()), base.path()).err().unwrap();
        assert!(matches!(err, ProviderResolveError::UnknownModelAlias { alias, .. } if alias == "smart"));
    }
}
