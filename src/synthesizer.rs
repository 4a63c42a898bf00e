// Usage-metric synthesis: pointwise sums of raw constituent metrics.

use std::collections::BTreeMap;

use crate::models::{MetricSeries, UsageMetricSpec};

/// Extends `series_by_metric` with one derived series per spec.
///
/// The first source's timestamp domain is the reference: derived points exist
/// exactly there, and a source missing a reference timestamp contributes zero
/// at that instant (head/tail points of a series commonly differ between
/// metrics). A spec whose first source is absent or empty adds no entry.
/// Re-running with the same inputs overwrites, so the result never
/// accumulates across calls.
pub fn synthesize(series_by_metric: &mut BTreeMap<String, MetricSeries>, specs: &[UsageMetricSpec]) {
    for spec in specs {
        let Some(first_source) = spec.sources.first() else {
            continue;
        };
        let Some(reference) = series_by_metric.get(first_source) else {
            continue;
        };
        if reference.is_empty() {
            continue;
        }

        let mut derived = MetricSeries::new();
        for (ts, _) in reference.iter() {
            let mut total = 0.0;
            for source in &spec.sources {
                if let Some(value) = series_by_metric.get(source).and_then(|s| s.get(ts)) {
                    total += value;
                }
            }
            derived.insert(ts, total);
        }
        series_by_metric.insert(spec.target.clone(), derived);
    }
}
