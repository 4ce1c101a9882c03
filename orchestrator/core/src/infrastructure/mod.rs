// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

pub mod classifier;
pub mod llm;
pub mod providers;
pub mod registry_loader;

pub use classifier::LlmClassifier;
pub use providers::{ProviderArena, ProviderResolveError};
pub use registry_loader::RegistryLoader;
