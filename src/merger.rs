// Composite ("ALL") entity construction: merge per-entity series and
// aggregates into one synthetic entity representing the whole group.

use std::collections::BTreeSet;

use crate::models::{AggregateRecord, Entity, MetricSeries, Role};

/// Pointwise sum of `metric` across all entities carrying it: the union of
/// the timestamp domains, where an entity lacking a timestamp contributes
/// nothing (not zero) at that instant.
pub fn merge_series(entities: &[&Entity], metric: &str) -> MetricSeries {
    let mut merged = MetricSeries::new();
    for entity in entities {
        if let Some(series) = entity.series.get(metric) {
            for (ts, value) in series.iter() {
                merged.add(ts, value);
            }
        }
    }
    merged
}

/// Element-wise field sums of the precomputed records for `metric`; entities
/// without a record for it are skipped, never treated as zero-filled. None
/// when no entity carries the metric.
///
/// Summing MAX/MIN/AVG directly is a known approximation: when constituent
/// timestamp domains diverge, the result differs from re-aggregating the
/// merged series. Kept on purpose so that numbers stay comparable with
/// prior reports.
pub fn merge_aggregates(entities: &[&Entity], metric: &str) -> Option<AggregateRecord> {
    let mut merged: Option<AggregateRecord> = None;
    for entity in entities {
        let Some(record) = entity.aggregates.get(metric) else {
            continue;
        };
        merged = Some(match merged {
            None => record.clone(),
            Some(acc) => {
                let max = acc.max + record.max;
                let min = acc.min + record.min;
                AggregateRecord {
                    sum: acc.sum + record.sum,
                    avg: match (acc.avg, record.avg) {
                        (Some(a), Some(b)) => Some(a + b),
                        (Some(a), None) => Some(a),
                        (None, b) => b,
                    },
                    max,
                    min,
                    diff_max_min: max - min,
                    first: acc.first + record.first,
                    last: acc.last + record.last,
                }
            }
        });
    }
    merged
}

/// Folds `entities` into one composite entity covering every metric any of
/// them carries, in series and aggregate form.
pub fn merge_entities(name: &str, entities: &[&Entity]) -> Entity {
    let mut all = Entity::new(name, Role::All);

    let mut metrics: BTreeSet<&str> = BTreeSet::new();
    for entity in entities {
        metrics.extend(entity.series.keys().map(String::as_str));
        metrics.extend(entity.aggregates.keys().map(String::as_str));
    }

    for metric in metrics {
        let series = merge_series(entities, metric);
        if !series.is_empty() {
            all.series.insert(metric.to_string(), series);
        }
        if let Some(record) = merge_aggregates(entities, metric) {
            all.aggregates.insert(metric.to_string(), record);
        }
    }
    all
}

/// Injects the app-only maximum-capacity metric into the composite. Node
/// entities do not carry it natively, so it is summed across the application
/// entities and added to both the composite series and aggregates.
pub fn inject_capacity(all: &mut Entity, apps: &[&Entity], metric: &str) {
    let series = merge_series(apps, metric);
    if !series.is_empty() {
        all.series.insert(metric.to_string(), series);
    }
    if let Some(record) = merge_aggregates(apps, metric) {
        all.aggregates.insert(metric.to_string(), record);
    }
}
