// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Command implementations for the dispatch CLI

pub mod agents;
pub mod config;
pub mod query;

pub use self::config::ConfigCommand;
