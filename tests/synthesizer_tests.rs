// Usage-metric synthesis tests: reference domain, zero contribution, idempotence

use std::collections::BTreeMap;

use benchreport::models::{MetricSeries, UsageMetricSpec};
use benchreport::synthesizer::synthesize;

fn series(points: &[(i64, f64)]) -> MetricSeries {
    MetricSeries::from_points(points.iter().copied()).expect("ordered points")
}

fn spec(target: &str, sources: &[&str]) -> UsageMetricSpec {
    UsageMetricSpec {
        target: target.into(),
        sources: sources.iter().map(|s| s.to_string()).collect(),
    }
}

#[test]
fn sums_sources_over_first_source_domain() {
    let mut metrics = BTreeMap::new();
    metrics.insert("a".to_string(), series(&[(100, 3.0), (105, 4.0)]));
    metrics.insert("b".to_string(), series(&[(100, 2.0)]));

    synthesize(&mut metrics, &[spec("used", &["a", "b"])]);

    let derived = metrics.get("used").expect("derived series");
    assert_eq!(derived.get(100), Some(5.0));
    assert_eq!(derived.get(105), Some(4.0), "b contributes 0 at t=105");
    assert_eq!(derived.len(), 2);
}

#[test]
fn secondary_source_timestamps_never_grow_the_domain() {
    let mut metrics = BTreeMap::new();
    metrics.insert("a".to_string(), series(&[(100, 3.0), (105, 4.0)]));
    metrics.insert("b".to_string(), series(&[(100, 2.0), (110, 9.0)]));

    synthesize(&mut metrics, &[spec("used", &["a", "b"])]);

    let derived = metrics.get("used").unwrap();
    assert_eq!(derived.get(110), None, "t=110 is outside the reference domain");
    assert_eq!(derived.len(), 2);
}

#[test]
fn absent_first_source_adds_no_entry() {
    let mut metrics = BTreeMap::new();
    metrics.insert("b".to_string(), series(&[(100, 2.0)]));

    synthesize(&mut metrics, &[spec("used", &["a", "b"])]);

    assert!(!metrics.contains_key("used"), "no entry, not a zero series");
}

#[test]
fn empty_first_source_adds_no_entry() {
    let mut metrics = BTreeMap::new();
    metrics.insert("a".to_string(), MetricSeries::new());
    metrics.insert("b".to_string(), series(&[(100, 2.0)]));

    synthesize(&mut metrics, &[spec("used", &["a", "b"])]);

    assert!(!metrics.contains_key("used"));
}

#[test]
fn synthesis_is_idempotent() {
    let mut metrics = BTreeMap::new();
    metrics.insert("a".to_string(), series(&[(100, 3.0), (105, 4.0)]));
    metrics.insert("b".to_string(), series(&[(100, 2.0)]));
    let specs = [spec("used", &["a", "b"])];

    synthesize(&mut metrics, &specs);
    let first = metrics.get("used").unwrap().clone();
    synthesize(&mut metrics, &specs);
    let second = metrics.get("used").unwrap();

    assert_eq!(&first, second, "values must not accumulate across calls");
}

#[test]
fn multiple_specs_are_applied_independently() {
    let mut metrics = BTreeMap::new();
    metrics.insert("user".to_string(), series(&[(0, 1.0), (5, 2.0)]));
    metrics.insert("kernel".to_string(), series(&[(0, 0.5), (5, 0.5)]));
    metrics.insert("resident".to_string(), series(&[(0, 100.0)]));

    synthesize(
        &mut metrics,
        &[
            spec("cpu.used", &["user", "kernel"]),
            spec("mem.used", &["resident"]),
        ],
    );

    assert_eq!(metrics.get("cpu.used").unwrap().get(0), Some(1.5));
    assert_eq!(metrics.get("cpu.used").unwrap().get(5), Some(2.5));
    assert_eq!(metrics.get("mem.used").unwrap().get(0), Some(100.0));
}
