// Domain models: series, documents, entities, aggregates.
// Aggregate field names mirror the report JSON of the store-era tooling
// (SUM/AVG/...), so prior reports stay comparable.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Series construction errors. Raised at the store boundary so every series
/// the engine sees is ordered by construction.
#[derive(Debug, Error)]
pub enum SeriesError {
    #[error("non-monotonic timestamp {current} after {previous}")]
    NonMonotonic { previous: i64, current: i64 },
}

/// Ordered mapping from Unix timestamp (seconds) to sampled value.
/// Timestamps are strictly increasing; a series may be empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MetricSeries(BTreeMap<i64, f64>);

impl MetricSeries {
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Builds a series from raw points, rejecting non-increasing timestamps.
    pub fn from_points(points: impl IntoIterator<Item = (i64, f64)>) -> Result<Self, SeriesError> {
        let mut map = BTreeMap::new();
        let mut previous: Option<i64> = None;
        for (ts, value) in points {
            if let Some(prev) = previous
                && ts <= prev
            {
                return Err(SeriesError::NonMonotonic {
                    previous: prev,
                    current: ts,
                });
            }
            map.insert(ts, value);
            previous = Some(ts);
        }
        Ok(Self(map))
    }

    pub fn insert(&mut self, ts: i64, value: f64) {
        self.0.insert(ts, value);
    }

    /// Adds `value` at `ts`, summing with any value already present.
    pub fn add(&mut self, ts: i64, value: f64) {
        *self.0.entry(ts).or_insert(0.0) += value;
    }

    pub fn get(&self, ts: i64) -> Option<f64> {
        self.0.get(&ts).copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (i64, f64)> + '_ {
        self.0.iter().map(|(ts, value)| (*ts, *value))
    }

    pub fn first(&self) -> Option<(i64, f64)> {
        self.0.first_key_value().map(|(ts, value)| (*ts, *value))
    }

    pub fn last(&self) -> Option<(i64, f64)> {
        self.0.last_key_value().map(|(ts, value)| (*ts, *value))
    }

    /// Clamps all values into [ymin, ymax] for rendering. No-op when the
    /// range is empty or inverted.
    pub fn clamp_values(&mut self, ymin: f64, ymax: f64) {
        if ymin >= ymax {
            return;
        }
        for value in self.0.values_mut() {
            if *value > ymax {
                *value = ymax;
            } else if *value < ymin {
                *value = ymin;
            }
        }
    }
}

impl FromIterator<(i64, f64)> for MetricSeries {
    fn from_iter<T: IntoIterator<Item = (i64, f64)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// One (metric, tag scope) pair to fetch for an entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricQuery {
    pub name: String,
    /// Tag key the entity name is matched against (e.g. "structure", "host").
    pub tag_scope: String,
}

/// Which metrics to fetch for one entity, plus the store-side downsample.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetrievalSpec {
    pub metrics: Vec<MetricQuery>,
    pub downsample_secs: u64,
}

impl RetrievalSpec {
    /// Comma-joined metric names, used to tag per-unit fetch errors.
    pub fn metric_names(&self) -> String {
        let names: Vec<&str> = self.metrics.iter().map(|m| m.name.as_str()).collect();
        names.join(",")
    }
}

/// Derived metric synthesized by pointwise summation of its sources.
/// The first source's timestamp domain is the reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageMetricSpec {
    pub target: String,
    pub sources: Vec<String>,
}

/// Windowed statistics for one metric. AVG is the time-normalized integral
/// (SUM / window length), not the arithmetic mean of points; it is None when
/// the window has zero length while the other fields stay valid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub struct AggregateRecord {
    pub sum: f64,
    pub avg: Option<f64>,
    pub max: f64,
    pub min: f64,
    pub diff_max_min: f64,
    pub first: f64,
    pub last: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Node,
    App,
    User,
    /// Synthetic composite representing the union of a group.
    All,
}

/// A monitored object: one series and one aggregate per metric name.
#[derive(Debug, Clone, Serialize)]
pub struct Entity {
    pub name: String,
    pub role: Role,
    pub series: BTreeMap<String, MetricSeries>,
    pub aggregates: BTreeMap<String, AggregateRecord>,
}

impl Entity {
    pub fn new(name: impl Into<String>, role: Role) -> Self {
        Self {
            name: name.into(),
            role,
            series: BTreeMap::new(),
            aggregates: BTreeMap::new(),
        }
    }
}

/// Report window: either both bounds are known or the document is unusable
/// for aggregation. Replaces presence/absence checks on start/end fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Window {
    Bounded { start: i64, end: i64 },
    Unbounded,
}

impl Window {
    pub fn from_optional_bounds(start: Option<i64>, end: Option<i64>) -> Self {
        match (start, end) {
            (Some(start), Some(end)) => Window::Bounded { start, end },
            _ => Window::Unbounded,
        }
    }
}

/// One benchmark run or experiment to report on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Document {
    pub name: String,
    pub window: Window,
}

impl Document {
    pub fn new(name: impl Into<String>, window: Window) -> Self {
        Self {
            name: name.into(),
            window,
        }
    }

    /// Parses the document-store JSON shape, where missing bounds mean the
    /// run never finished timestamping.
    pub fn from_json(raw: &str) -> serde_json::Result<Self> {
        #[derive(Deserialize)]
        struct RawDocument {
            test_name: String,
            start_time: Option<i64>,
            end_time: Option<i64>,
        }
        let raw: RawDocument = serde_json::from_str(raw)?;
        Ok(Self {
            name: raw.test_name,
            window: Window::from_optional_bounds(raw.start_time, raw.end_time),
        })
    }

    /// Window length in seconds; None for unbounded documents.
    pub fn duration_secs(&self) -> Option<i64> {
        match self.window {
            Window::Bounded { start, end } => Some(end - start),
            Window::Unbounded => None,
        }
    }
}

/// One silence interval in one metric of one entity. Field names match the
/// historical report JSON.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GapRecord {
    pub time: i64,
    pub diff_time: i64,
}
