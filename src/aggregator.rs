// Windowed statistics over one metric's series, via trapezoidal integration
// of the piecewise-linear interpolant between consecutive samples.

use crate::models::{AggregateRecord, MetricSeries};
use tracing::warn;

/// Aggregates `series` over [start, end]. Returns None for an empty series;
/// callers must treat that as "no aggregate", never as zero-valued fields.
///
/// A single-point series integrates to SUM = 0 with MAX = MIN = FIRST =
/// LAST = the point's value. A zero-length window leaves AVG unavailable
/// while the remaining fields stay valid.
pub fn aggregate(start: i64, end: i64, series: &MetricSeries) -> Option<AggregateRecord> {
    let mut points = series.iter();
    let (first_ts, first_value) = points.next()?;

    let mut sum = 0.0;
    let mut max = first_value;
    let mut min = first_value;
    let mut prev_ts = first_ts;
    let mut prev_value = first_value;
    let mut last_value = first_value;

    for (ts, value) in points {
        sum += (value + prev_value) / 2.0 * (ts - prev_ts) as f64;
        max = max.max(value);
        min = min.min(value);
        prev_ts = ts;
        prev_value = value;
        last_value = value;
    }

    let avg = if end == start {
        warn!(start, end, "zero-length window, AVG unavailable");
        None
    } else {
        Some(sum / (end - start) as f64)
    };

    Some(AggregateRecord {
        sum,
        avg,
        max,
        min,
        diff_max_min: max - min,
        first: first_value,
        last: last_value,
    })
}
