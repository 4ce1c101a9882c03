// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Built-in providers
//
// Self-contained agents that answer without leaving the process: an echo
// agent for testing, a notifications/billing stub and a fixed operations catalog.

use rand::Rng;
use serde_json::{json, Value};

use crate::domain::provider::{ProviderError, ProviderOutput, SyncProvider};

/// Answers every query with a canned acknowledgement.
pub struct EchoProvider;

impl SyncProvider for EchoProvider {
    fn process(&self, query: &str) -> Result<ProviderOutput, ProviderError> {
        Ok(format!("Dummy response for query: '{}'", query).into())
    }
}

const RECENT_NOTIFICATIONS: [(&str, &str); 3] = [
    ("Security", "IAM role unused for 30 days"),
    ("Cost", "EC2 instance i-02 exceeded budget by 15%"),
    ("Performance", "Load balancer latency increased"),
];

/// Notifications and billing lookups.
pub struct NotificationsProvider {
    cost_range: std::ops::RangeInclusive<u32>,
}

impl Default for NotificationsProvider {
    fn default() -> Self {
        Self { cost_range: 400..=600 }
    }
}

impl SyncProvider for NotificationsProvider {
    fn process(&self, query: &str) -> Result<ProviderOutput, ProviderError> {
        let query = query.to_lowercase();

        if query.contains("notification") || query.contains("alert") {
            let listing = RECENT_NOTIFICATIONS
                .iter()
                .map(|(kind, msg)| format!("- {}: {}", kind, msg))
                .collect::<Vec<_>>()
                .join("\n");
            return Ok(format!("Recent notifications:\n{}", listing).into());
        }

        if query.contains("cost") || query.contains("spend") {
            let cost = rand::rng().random_range(self.cost_range.clone());
            return Ok(format!("Your current monthly cost is approximately ${}.", cost).into());
        }

        Ok("API agent couldn't find matching data.".into())
    }
}

/// Fixed operational answers served by [`CatalogProvider`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogEntry {
    CostSummary,
    CostRecommendations,
    CurrentErrors,
    ErrorTrend,
    CpuUsage,
    InstanceStatus,
}

impl CatalogEntry {
    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "cost_summary" => Some(CatalogEntry::CostSummary),
            "cost_recommendations" => Some(CatalogEntry::CostRecommendations),
            "current_errors" => Some(CatalogEntry::CurrentErrors),
            "error_trend" => Some(CatalogEntry::ErrorTrend),
            "cpu_usage" => Some(CatalogEntry::CpuUsage),
            "instance_status" => Some(CatalogEntry::InstanceStatus),
            _ => None,
        }
    }

    fn answer(self) -> Value {
        match self {
            CatalogEntry::CostSummary => json!({
                "estimated_monthly_cost": "$120.45",
                "services": ["EC2", "S3", "Lambda"]
            }),
            CatalogEntry::CostRecommendations => json!([
                "Stop unused EC2 instances",
                "Switch to spot instances",
                "Use S3 lifecycle policies"
            ]),
            CatalogEntry::CurrentErrors => json!([
                {"service": "EC2", "error": "InstanceNotReachable"},
                {"service": "S3", "error": "AccessDenied"}
            ]),
            CatalogEntry::ErrorTrend => json!("Errors increased by 15% in the last 24 hours."),
            CatalogEntry::CpuUsage => json!({
                "instance_id": "i-1234567890",
                "cpu_usage": "23.5%"
            }),
            CatalogEntry::InstanceStatus => json!({
                "instance_id": "i-1234567890",
                "status": "running"
            }),
        }
    }
}

pub struct CatalogProvider {
    entry: CatalogEntry,
}

impl CatalogProvider {
    pub fn new(entry: CatalogEntry) -> Self {
        Self { entry }
    }
}

impl SyncProvider for CatalogProvider {
    fn process(&self, _query: &str) -> Result<ProviderOutput, ProviderError> {
        Ok(ProviderOutput::from_json(self.entry.answer()))
    }
}
