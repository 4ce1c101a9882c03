// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Agent dispatch core
//!
//! Routes a natural-language request to the registry agents able to answer
//! it, invokes them concurrently under one deadline and fuses their answers.
//!
//! # Architecture
//!
//! - **Layer:** Core System
//! - **Purpose:** Domain model, pipeline use case, adapters and HTTP surface

pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod presentation;

pub use domain::*;
