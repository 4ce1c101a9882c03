// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Log and metric statistics for monitoring summaries.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use serde_json::Value;

use super::sources::{MonitoringData, Record};
use super::time_window::TimeWindow;

static HTTP_STATUS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b([2-5]\d{2})\b").expect("Invalid status regex"));

static SUCCESS_WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(?:success|ok|completed)\b").expect("Invalid success regex"));

const ERROR_MARKERS: [&str; 4] = ["error", "exception", "traceback", "fatal"];

/// CPU samples this many population standard deviations from the mean are spikes.
const SPIKE_Z_SCORE: f64 = 2.5;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LogStats {
    pub total_lines: usize,
    pub error_count: usize,
    pub warn_count: usize,
    pub status_counts: BTreeMap<String, usize>,
    pub examples: Vec<String>,
    pub estimated_success_rate_percent: Option<f64>,
}

pub fn analyze_logs(lines: &[String]) -> LogStats {
    let mut stats = LogStats {
        total_lines: lines.len(),
        ..LogStats::default()
    };
    let mut successes = 0usize;

    for line in lines {
        let lower = line.to_lowercase();
        if ERROR_MARKERS.iter().any(|marker| lower.contains(marker)) {
            stats.error_count += 1;
            if stats.examples.len() < 3 {
                stats.examples.push(line.clone());
            }
        }
        if lower.contains("warn") {
            stats.warn_count += 1;
        }

        match HTTP_STATUS.captures(line) {
            Some(caps) => {
                let code = caps[1].to_string();
                if code.starts_with('2') || code.starts_with('3') {
                    successes += 1;
                }
                *stats.status_counts.entry(code).or_insert(0) += 1;
            }
            None if SUCCESS_WORD.is_match(line) => successes += 1,
            None => {}
        }
    }

    let attempts = successes + stats.error_count;
    if attempts > 0 {
        stats.estimated_success_rate_percent = Some(successes as f64 / attempts as f64 * 100.0);
    }

    stats
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesStats {
    pub count: usize,
    pub avg: f64,
    pub min: f64,
    pub max: f64,
    pub median: f64,
}

impl SeriesStats {
    fn of(values: &[f64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        let mut sorted = values.to_vec();
        sorted.sort_by(f64::total_cmp);
        let mid = sorted.len() / 2;
        let median = if sorted.len() % 2 == 0 {
            (sorted[mid - 1] + sorted[mid]) / 2.0
        } else {
            sorted[mid]
        };
        Some(Self {
            count: values.len(),
            avg: mean(values),
            min: sorted[0],
            max: sorted[sorted.len() - 1],
            median,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Spike {
    pub index: usize,
    pub value: f64,
    pub z: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MetricStats {
    pub cpu: Option<SeriesStats>,
    pub memory: Option<SeriesStats>,
    pub db_connections: Option<SeriesStats>,
    pub request_rate: Option<SeriesStats>,
    pub cpu_spikes_count: usize,
    pub cpu_spike_examples: Vec<Spike>,
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

/// Numeric values of `key`, accepting numbers and numeric strings.
fn series(records: &[Record], key: &str) -> Vec<f64> {
    records
        .iter()
        .filter_map(|record| match record.get(key)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        })
        .collect()
}

fn spikes(values: &[f64]) -> Vec<Spike> {
    if values.len() < 3 {
        return Vec::new();
    }
    let mean = mean(values);
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;
    let stdev = variance.sqrt();
    if stdev == 0.0 {
        return Vec::new();
    }
    values
        .iter()
        .enumerate()
        .map(|(index, &value)| Spike {
            index,
            value,
            z: (value - mean) / stdev,
        })
        .filter(|spike| spike.z.abs() >= SPIKE_Z_SCORE)
        .collect()
}

pub fn analyze_metrics(records: &[Record]) -> MetricStats {
    let cpu = series(records, "CPU_Usage");
    let spikes = spikes(&cpu);

    MetricStats {
        cpu: SeriesStats::of(&cpu),
        memory: SeriesStats::of(&series(records, "Memory_Usage")),
        db_connections: SeriesStats::of(&series(records, "DB_Connections")),
        request_rate: SeriesStats::of(&series(records, "Request_Rate")),
        cpu_spikes_count: spikes.len(),
        cpu_spike_examples: spikes.into_iter().take(3).collect(),
    }
}

/// One-paragraph summary built without a model.
pub fn local_summary(
    window: &TimeWindow,
    data: &MonitoringData,
    logs: &LogStats,
    metrics: &MetricStats,
) -> String {
    let mut parts = vec![format!(
        "Between {} and {}",
        window.start.to_rfc3339(),
        window.end.to_rfc3339()
    )];

    if logs.total_lines == 0 {
        parts.push("no log entries were recorded".to_string());
    } else {
        parts.push(format!(
            "{} log lines recorded with {} errors and {} warnings",
            logs.total_lines, logs.error_count, logs.warn_count
        ));
        if let Some(rate) = logs.estimated_success_rate_percent {
            parts.push(format!("estimated success rate {:.0}%", rate));
        }
    }

    let mut metric_parts = Vec::new();
    if let Some(cpu) = &metrics.cpu {
        metric_parts.push(format!("avg CPU {:.1}% (max {:.1}%)", cpu.avg, cpu.max));
    }
    if let Some(memory) = &metrics.memory {
        metric_parts.push(format!("avg memory {:.1}%", memory.avg));
    }
    if let Some(db) = &metrics.db_connections {
        metric_parts.push(format!("avg DB connections {:.1}", db.avg));
    }
    if !metric_parts.is_empty() {
        parts.push(format!("metrics: {}", metric_parts.join(", ")));
    }

    if metrics.cpu_spikes_count > 0 {
        parts.push(format!("{} CPU spike(s) detected", metrics.cpu_spikes_count));
    }
    if !data.log_alerts.is_empty() {
        parts.push(format!(
            "{} log anomaly(ies) forwarded to remediation",
            data.log_alerts.len()
        ));
    }
    if !data.metric_alerts.is_empty() {
        parts.push(format!(
            "{} metric anomaly(ies) forwarded to remediation",
            data.metric_alerts.len()
        ));
    }

    if !logs.status_counts.is_empty() {
        let mut statuses: Vec<(&String, &usize)> = logs.status_counts.iter().collect();
        // stable: equal counts stay in code order
        statuses.sort_by(|a, b| b.1.cmp(a.1));
        let notable: Vec<String> = statuses
            .iter()
            .take(2)
            .map(|(code, count)| format!("{} x{}", code, count))
            .collect();
        parts.push(format!("notable HTTP statuses: {}", notable.join(", ")));
    }

    format!("{}.", parts.join("; "))
}
