// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// LLM Provider Infrastructure
//
// Each adapter translates between the domain `LLMProvider` interface and one
// vendor API. The registry resolves model aliases to adapters.

pub mod gemini;
pub mod ollama;
pub mod openai;
pub mod registry;

pub use registry::{AliasedModel, ProviderRegistry};
