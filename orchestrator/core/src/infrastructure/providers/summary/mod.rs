// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Monitoring summary provider
//
// Reads logs, metric samples and forwarded alerts from a data directory,
// keeps what falls inside the time window named by the query, and answers
// with one paragraph. With a model attached the paragraph is generated from
// the computed statistics; without one (or when generation fails) it is
// assembled locally.

pub mod analysis;
pub mod sources;
pub mod time_window;

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::llm::TextGenerator;
use crate::domain::provider::{Provider, ProviderError, ProviderOutput};

use analysis::{analyze_logs, analyze_metrics, local_summary, LogStats, MetricStats};
use sources::MonitoringData;
use time_window::TimeWindow;

const PROMPT_LOG_EXAMPLES: usize = 5;
const PROMPT_METRIC_EXAMPLES: usize = 10;

pub struct SummaryProvider {
    root: PathBuf,
    model: Option<Arc<dyn TextGenerator>>,
}

impl SummaryProvider {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            model: None,
        }
    }

    pub fn with_model(mut self, model: Arc<dyn TextGenerator>) -> Self {
        self.model = Some(model);
        self
    }

    /// Summarize the window `query` refers to, taking `now` as the current time.
    pub async fn summarize_at(
        &self,
        query: &str,
        now: DateTime<Utc>,
    ) -> Result<String, ProviderError> {
        let window = TimeWindow::parse(query, now);
        let data = MonitoringData::load(&self.root).await?.within(&window);
        let logs = analyze_logs(&data.logs);
        let metrics = analyze_metrics(&data.metrics);

        tracing::debug!(
            start = %window.start,
            end = %window.end,
            log_lines = logs.total_lines,
            metric_samples = data.metrics.len(),
            "Summarizing monitoring window"
        );

        if let Some(model) = &self.model {
            let prompt = build_prompt(query, &window, &data, &logs, &metrics);
            match model.generate_text(&prompt).await {
                Ok(reply) => {
                    let paragraph = single_paragraph(&reply);
                    if !paragraph.is_empty() {
                        return Ok(paragraph);
                    }
                    tracing::warn!("Summary model returned no text, using local summary");
                }
                Err(e) => tracing::warn!("Summary model failed, using local summary: {}", e),
            }
        }

        Ok(local_summary(&window, &data, &logs, &metrics))
    }
}

#[async_trait]
impl Provider for SummaryProvider {
    async fn invoke(&self, query: &str) -> Result<ProviderOutput, ProviderError> {
        Ok(self.summarize_at(query, Utc::now()).await?.into())
    }
}

fn to_json<T: serde::Serialize>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_default()
}

fn to_pretty_json<T: serde::Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_default()
}

fn build_prompt(
    query: &str,
    window: &TimeWindow,
    data: &MonitoringData,
    logs: &LogStats,
    metrics: &MetricStats,
) -> String {
    let log_examples: Vec<&String> = data.logs.iter().take(PROMPT_LOG_EXAMPLES).collect();
    let metric_examples: Vec<_> = data.metrics.iter().take(PROMPT_METRIC_EXAMPLES).collect();

    format!(
        "System monitoring summary request.\n\
         User query: {query}\n\
         Time window: {start} to {end}\n\n\
         Key metrics summary (computed): {metric_stats}\n\
         Key log summary (computed): {log_stats}\n\n\
         Log anomalies (matched alerts): {log_alerts}\n\
         Metric anomalies (matched alerts): {metric_alerts}\n\n\
         Example log lines (up to {PROMPT_LOG_EXAMPLES}):\n{log_examples}\n\n\
         Example metric samples (up to {PROMPT_METRIC_EXAMPLES}):\n{metric_examples}\n\n\
         Please produce a single concise paragraph (one paragraph only) that:\n\
         - Summarizes the overall activity and health in the window.\n\
         - Prioritizes errors and anomalies and notes they were forwarded to remediation agent (do not describe remediation steps).\n\
         - Includes estimated API call success rate if available, average CPU and memory, number of CPU spikes, and notable HTTP status counts.\n\
         - If no anomalies, state the system appears stable and provide the main metrics.\n\
         Keep the paragraph short and precise.",
        start = window.start.to_rfc3339(),
        end = window.end.to_rfc3339(),
        metric_stats = to_json(metrics),
        log_stats = to_json(logs),
        log_alerts = to_json(&data.log_alerts),
        metric_alerts = to_json(&data.metric_alerts),
        log_examples = to_pretty_json(&log_examples),
        metric_examples = to_pretty_json(&metric_examples),
    )
}

/// Join the non-blank lines of the first paragraph of `reply`.
fn single_paragraph(reply: &str) -> String {
    let first = reply.trim().split("\n\n").next().unwrap_or_default();
    first
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}
