// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

pub mod dispatcher;
pub mod fuser;
pub mod pipeline;
pub mod selector;

pub use dispatcher::Dispatcher;
pub use fuser::{Fuser, FusionError};
pub use pipeline::{DispatchPipeline, PipelineError, PipelineSettings, SessionMemories, DEFAULT_SESSION};
pub use selector::{keyword_fallback, Selector};
