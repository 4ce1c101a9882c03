// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Monitoring files read by the summary provider
//
// Layout under the data root:
//   logs/monitor_logs.log          plain text, one entry per line
//   metrics/metrics_history.log    NDJSON samples (or one JSON document)
//   storage/log_alerts.json        JSON array/object (or NDJSON)
//   storage/metric_alerts.json     JSON array/object (or NDJSON)

use std::path::Path;

use chrono::{DateTime, Utc};
use serde_json::Value;

use super::time_window::{find_timestamp, parse_timestamp, TimeWindow};
use crate::domain::provider::ProviderError;

pub const LOGS_FILE: &str = "logs/monitor_logs.log";
pub const METRICS_FILE: &str = "metrics/metrics_history.log";
pub const LOG_ALERTS_FILE: &str = "storage/log_alerts.json";
pub const METRIC_ALERTS_FILE: &str = "storage/metric_alerts.json";

pub type Record = serde_json::Map<String, Value>;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MonitoringData {
    pub logs: Vec<String>,
    pub metrics: Vec<Record>,
    pub log_alerts: Vec<Record>,
    pub metric_alerts: Vec<Record>,
}

impl MonitoringData {
    /// Read every source under `root`. Missing files count as empty.
    pub async fn load(root: &Path) -> Result<Self, ProviderError> {
        let logs = read_text(&root.join(LOGS_FILE))
            .await?
            .lines()
            .map(str::trim_end)
            .filter(|line| !line.trim().is_empty())
            .map(str::to_string)
            .collect();

        Ok(Self {
            logs,
            metrics: parse_samples(&read_text(&root.join(METRICS_FILE)).await?),
            log_alerts: parse_alerts(&read_text(&root.join(LOG_ALERTS_FILE)).await?),
            metric_alerts: parse_alerts(&read_text(&root.join(METRIC_ALERTS_FILE)).await?),
        })
    }

    /// Entries whose timestamp falls inside `window`. Untimed entries are dropped.
    pub fn within(&self, window: &TimeWindow) -> Self {
        let in_window = |t: Option<DateTime<Utc>>| t.is_some_and(|t| window.contains(t));

        Self {
            logs: self
                .logs
                .iter()
                .filter(|line| in_window(line_timestamp(line)))
                .cloned()
                .collect(),
            metrics: self
                .metrics
                .iter()
                .filter(|r| in_window(record_timestamp(r, &["timestamp", "time", "ts"])))
                .cloned()
                .collect(),
            log_alerts: self
                .log_alerts
                .iter()
                .filter(|r| in_window(record_timestamp(r, &["timestamp"])))
                .cloned()
                .collect(),
            metric_alerts: self
                .metric_alerts
                .iter()
                .filter(|r| in_window(record_timestamp(r, &["timestamp"])))
                .cloned()
                .collect(),
        }
    }
}

async fn read_text(path: &Path) -> Result<String, ProviderError> {
    match tokio::fs::read(path).await {
        Ok(bytes) => Ok(String::from_utf8_lossy(&bytes).into_owned()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!(path = %path.display(), "Monitoring source missing");
            Ok(String::new())
        }
        Err(e) => Err(ProviderError::Failed(format!(
            "Failed to read {}: {}",
            path.display(),
            e
        ))),
    }
}

fn line_timestamp(line: &str) -> Option<DateTime<Utc>> {
    line.split_whitespace()
        .next()
        .and_then(parse_timestamp)
        .or_else(|| find_timestamp(line))
}

fn record_timestamp(record: &Record, keys: &[&str]) -> Option<DateTime<Utc>> {
    keys.iter()
        .filter_map(|key| record.get(*key)?.as_str())
        .find_map(parse_timestamp)
}

/// Objects from a JSON value, descending into arrays.
fn flatten(value: Value, out: &mut Vec<Record>) {
    match value {
        Value::Object(map) => out.push(map),
        Value::Array(items) => items.into_iter().for_each(|item| flatten(item, out)),
        _ => {}
    }
}

fn parse_ndjson(text: &str) -> Vec<Record> {
    let mut out = Vec::new();
    for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
        match serde_json::from_str::<Value>(line) {
            Ok(value) => flatten(value, &mut out),
            Err(e) => tracing::debug!(error = %e, "Skipping unparseable monitoring line"),
        }
    }
    out
}

/// Metric samples are NDJSON; a file that is one pretty-printed document is also accepted.
fn parse_samples(text: &str) -> Vec<Record> {
    let lines_parse = text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .all(|l| serde_json::from_str::<Value>(l).is_ok());

    if !lines_parse {
        if let Ok(document) = serde_json::from_str::<Value>(text) {
            let mut out = Vec::new();
            flatten(document, &mut out);
            return out;
        }
    }
    parse_ndjson(text)
}

/// Alert files are a JSON document; NDJSON is accepted as a fallback.
fn parse_alerts(text: &str) -> Vec<Record> {
    if text.trim().is_empty() {
        return Vec::new();
    }
    match serde_json::from_str::<Value>(text) {
        Ok(document) => {
            let mut out = Vec::new();
            flatten(document, &mut out);
            out
        }
        Err(_) => parse_ndjson(text),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn write(root: &Path, rel: &str, contents: &str) {
        let path = root.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, contents).unwrap();
    }

    fn march_11() -> TimeWindow {
        TimeWindow::new(
            Utc.with_ymd_and_hms(2025, 3, 11, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2025, 3, 11, 23, 59, 59).unwrap(),
        )
    }

    #[tokio::test]
    async fn test_missing_root_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let data = MonitoringData::load(&dir.path().join("absent")).await.unwrap();
        assert_eq!(data, MonitoringData::default());
    }

    #[tokio::test]
    async fn test_load_and_filter_by_window() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            LOGS_FILE,
            "2025-03-10T23:59:00Z INFO late\n\
             2025-03-11T08:00:00Z ERROR boom\n\
             \n\
             [worker-2] 2025-03-11 09:30:00 WARN retry\n\
             no timestamp here\n",
        );
        write(
            dir.path(),
            METRICS_FILE,
            "{\"timestamp\":\"2025-03-11T08:00:00Z\",\"CPU_Usage\":40}\n\
             {\"time\":\"2025-03-11 09:00:00\",\"CPU_Usage\":50}\n\
             {\"ts\":\"2025-03-12T01:00:00Z\",\"CPU_Usage\":60}\n",
        );
        write(
            dir.path(),
            LOG_ALERTS_FILE,
            r#"[{"timestamp":"2025-03-11T08:00:00Z","message":"boom"},[{"timestamp":"2025-03-09T08:00:00Z"}]]"#,
        );
        write(
            dir.path(),
            METRIC_ALERTS_FILE,
            "{\"timestamp\":\"2025-03-11T08:00:00Z\",\"metric\":\"CPU_Usage\"}\n\
             {\"timestamp\":\"2025-03-11T09:00:00Z\",\"metric\":\"Memory_Usage\"}\n",
        );

        let data = MonitoringData::load(dir.path()).await.unwrap();
        assert_eq!(data.logs.len(), 4);
        assert_eq!(data.metrics.len(), 3);
        assert_eq!(data.log_alerts.len(), 2);
        assert_eq!(data.metric_alerts.len(), 2);

        let day = data.within(&march_11());
        assert_eq!(
            day.logs,
            vec![
                "2025-03-11T08:00:00Z ERROR boom".to_string(),
                "[worker-2] 2025-03-11 09:30:00 WARN retry".to_string(),
            ]
        );
        assert_eq!(day.metrics.len(), 2);
        assert_eq!(day.log_alerts.len(), 1);
        assert_eq!(day.metric_alerts.len(), 2);
    }

    #[test]
    fn test_pretty_printed_metrics_document() {
        let text = "[\n  {\"timestamp\": \"2025-03-11T08:00:00Z\", \"CPU_Usage\": 40},\n  {\"timestamp\": \"2025-03-11T09:00:00Z\", \"CPU_Usage\": 45}\n]\n";
        assert_eq!(parse_samples(text).len(), 2);
    }

    #[test]
    fn test_bad_metric_lines_are_skipped() {
        let text = "{\"CPU_Usage\":40}\nnot json\n{\"CPU_Usage\":41}\n";
        assert_eq!(parse_samples(text).len(), 2);
    }
}
