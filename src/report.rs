// Renderer-facing report types: stable serializable shapes (entity name ->
// metric name -> fields) with explicit unavailability markers, never zeros
// standing in for missing data.

use std::collections::BTreeMap;

use chrono::{Local, TimeZone};
use serde::Serialize;

use crate::gaps::MissingDataReport;
use crate::models::{Document, Entity, Window};

/// One failed unit of work, attached to the report instead of aborting it.
/// `metric` names the metric or comma-joined metric group that failed, so a
/// caller can retry that unit alone.
#[derive(Debug, Clone, Serialize)]
pub struct UnitError {
    pub entity: String,
    pub metric: String,
    pub message: String,
}

/// Document-level result: computed aggregates, or an explicit sentinel when
/// the document's window made aggregation impossible.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum UsageReport {
    Available(ReportBody),
    Unavailable { reason: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportBody {
    pub document: DocumentTimes,
    /// Per-entity results, with the composite under its "ALL" key.
    pub entities: BTreeMap<String, Entity>,
    pub missing_data: MissingDataReport,
    pub errors: Vec<UnitError>,
}

/// Human-readable window bounds and duration for the report header.
#[derive(Debug, Clone, Serialize)]
pub struct DocumentTimes {
    pub name: String,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub duration_secs: Option<i64>,
    pub duration_minutes: Option<String>,
}

impl DocumentTimes {
    pub fn from_document(document: &Document) -> Self {
        let (start_time, end_time) = match document.window {
            Window::Bounded { start, end } => (format_local(start), format_local(end)),
            Window::Unbounded => (None, None),
        };
        let duration_secs = document.duration_secs();
        Self {
            name: document.name.clone(),
            start_time,
            end_time,
            duration_secs,
            duration_minutes: duration_secs.map(|d| format!("{:.2}", d as f64 / 60.0)),
        }
    }
}

fn format_local(ts: i64) -> Option<String> {
    Local
        .timestamp_opt(ts, 0)
        .single()
        .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
}
