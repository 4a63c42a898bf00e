// Telemetry gap detection and the missing-data report shape.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::models::{GapRecord, MetricSeries};

/// Scans `series` in timestamp order and reports every consecutive pair
/// whose delta is >= `max_allowed_gap_secs`, anchored at the earlier sample.
/// An empty series yields no gaps here; the caller is responsible for
/// reporting total data loss (see [`total_loss`]) so that "no data at all"
/// is never conflated with "no gaps in present data".
pub fn find_gaps(series: &MetricSeries, max_allowed_gap_secs: i64) -> Vec<GapRecord> {
    let mut gaps = Vec::new();
    let mut points = series.iter();
    let Some((mut previous, _)) = points.next() else {
        return gaps;
    };
    for (ts, _) in points {
        let diff_time = ts - previous;
        if diff_time >= max_allowed_gap_secs {
            gaps.push(GapRecord {
                time: previous,
                diff_time,
            });
        }
        previous = ts;
    }
    gaps
}

/// The single full-window gap recorded when a metric returned no points at
/// all over the requested window.
pub fn total_loss(window_start: i64, duration_secs: i64) -> GapRecord {
    GapRecord {
        time: window_start,
        diff_time: duration_secs,
    }
}

/// Silence intervals per metric per entity.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct MissingDataReport {
    gaps: BTreeMap<String, BTreeMap<String, Vec<GapRecord>>>,
}

/// Missed seconds for one entity, as an absolute total and as a share of the
/// document window.
#[derive(Debug, Clone, Serialize)]
pub struct EntityLoss {
    pub entity: String,
    pub missed_secs: i64,
    pub window_pct: f64,
}

/// Per-metric roll-up of the gap lists: one row per affected entity plus the
/// all-entities share (total missed over entity_count windows).
#[derive(Debug, Clone, Serialize)]
pub struct MetricLoss {
    pub metric: String,
    pub entities: Vec<EntityLoss>,
    pub total_missed_secs: i64,
    pub overall_pct: f64,
}

impl MissingDataReport {
    pub fn record(&mut self, metric: &str, entity: &str, gaps: Vec<GapRecord>) {
        if gaps.is_empty() {
            return;
        }
        self.gaps
            .entry(metric.to_string())
            .or_default()
            .insert(entity.to_string(), gaps);
    }

    pub fn is_empty(&self) -> bool {
        self.gaps.is_empty()
    }

    pub fn gaps_for(&self, metric: &str, entity: &str) -> Option<&[GapRecord]> {
        self.gaps
            .get(metric)
            .and_then(|by_entity| by_entity.get(entity))
            .map(|gaps| gaps.as_slice())
    }

    /// Summarizes gap lists into missed-time totals and percentages.
    /// `entity_count` is the number of entities scanned, not just the ones
    /// with losses. Empty when the window has zero length.
    pub fn summarize(&self, duration_secs: i64, entity_count: usize) -> Vec<MetricLoss> {
        if duration_secs <= 0 || entity_count == 0 {
            return Vec::new();
        }
        let mut out = Vec::with_capacity(self.gaps.len());
        for (metric, by_entity) in &self.gaps {
            let mut entities = Vec::with_capacity(by_entity.len());
            let mut total_missed_secs = 0;
            for (entity, gaps) in by_entity {
                let missed_secs: i64 = gaps.iter().map(|g| g.diff_time).sum();
                total_missed_secs += missed_secs;
                entities.push(EntityLoss {
                    entity: entity.clone(),
                    missed_secs,
                    window_pct: 100.0 * missed_secs as f64 / duration_secs as f64,
                });
            }
            out.push(MetricLoss {
                metric: metric.clone(),
                entities,
                total_missed_secs,
                overall_pct: 100.0 * total_missed_secs as f64
                    / (entity_count as f64 * duration_secs as f64),
            });
        }
        out
    }
}
