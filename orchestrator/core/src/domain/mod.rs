// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Mod
//!
//! Domain model of the dispatch pipeline.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Provider, registry, memory and configuration types plus the
//!   traits at the external-capability seams (classifier, text generator)

pub mod classifier;
pub mod dispatch_config;
pub mod llm;
pub mod memory;
pub mod provider;
pub mod registry;
pub mod request;
