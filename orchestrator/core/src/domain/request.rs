// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

use crate::domain::provider::ProviderResult;

/// One incoming request, owned by a single pipeline run.
#[derive(Debug, Clone)]
pub struct DispatchRequest {
    pub id: Uuid,
    pub text: String,
    /// Deadline for the whole provider batch
    pub time_budget: Duration,
}

impl DispatchRequest {
    pub fn new(text: impl Into<String>, time_budget: Duration) -> Self {
        Self {
            id: Uuid::new_v4(),
            text: text.into(),
            time_budget,
        }
    }
}

/// Response returned to the caller for every request whose fusion succeeded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchResponse {
    pub agents_called: Vec<String>,
    pub responses: Vec<ProviderResult>,
    pub fused: String,
}
