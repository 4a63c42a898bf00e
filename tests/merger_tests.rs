// Composite-entity merge tests: series union sums, field-wise aggregate sums,
// capacity-metric injection

use benchreport::aggregator::aggregate;
use benchreport::merger::{inject_capacity, merge_aggregates, merge_entities, merge_series};
use benchreport::models::{AggregateRecord, Entity, MetricSeries, Role};

fn series(points: &[(i64, f64)]) -> MetricSeries {
    MetricSeries::from_points(points.iter().copied()).expect("ordered points")
}

fn entity_with(name: &str, role: Role, metric: &str, points: &[(i64, f64)]) -> Entity {
    let mut entity = Entity::new(name, role);
    let s = series(points);
    if let Some(record) = aggregate(points[0].0, points[points.len() - 1].0, &s) {
        entity.aggregates.insert(metric.to_string(), record);
    }
    entity.series.insert(metric.to_string(), s);
    entity
}

#[test]
fn series_merge_is_a_union_sum() {
    let e1 = entity_with("n1", Role::Node, "cpu", &[(10, 5.0)]);
    let e2 = entity_with("n2", Role::Node, "cpu", &[(10, 3.0), (20, 7.0)]);

    let merged = merge_series(&[&e1, &e2], "cpu");
    assert_eq!(merged.get(10), Some(8.0));
    assert_eq!(merged.get(20), Some(7.0), "lone timestamps still appear");
    assert_eq!(merged.len(), 2);
}

#[test]
fn single_entity_merge_round_trips() {
    let e = entity_with("n1", Role::Node, "cpu", &[(0, 1.0), (10, 3.0), (20, 2.0)]);

    let merged_series = merge_series(&[&e], "cpu");
    assert_eq!(&merged_series, e.series.get("cpu").unwrap());

    let merged_agg = merge_aggregates(&[&e], "cpu").unwrap();
    assert_eq!(&merged_agg, e.aggregates.get("cpu").unwrap());
}

#[test]
fn aggregate_merge_sums_field_wise() {
    let e1 = entity_with("n1", Role::Node, "cpu", &[(0, 10.0), (10, 20.0)]);
    let e2 = entity_with("n2", Role::Node, "cpu", &[(0, 1.0), (10, 3.0)]);

    let merged = merge_aggregates(&[&e1, &e2], "cpu").unwrap();
    // e1: sum 150, avg 15, max 20, min 10; e2: sum 20, avg 2, max 3, min 1
    assert_eq!(merged.sum, 170.0);
    assert_eq!(merged.avg, Some(17.0));
    assert_eq!(merged.max, 23.0);
    assert_eq!(merged.min, 11.0);
    assert_eq!(merged.diff_max_min, 12.0);
    assert_eq!(merged.first, 11.0);
    assert_eq!(merged.last, 23.0);
}

#[test]
fn entities_without_a_record_are_skipped_not_zeroed() {
    let e1 = entity_with("n1", Role::Node, "cpu", &[(0, 10.0), (10, 20.0)]);
    let mut e2 = Entity::new("n2", Role::Node);
    e2.series.insert("cpu".to_string(), MetricSeries::new());

    let merged = merge_aggregates(&[&e1, &e2], "cpu").unwrap();
    assert_eq!(&merged, e1.aggregates.get("cpu").unwrap());

    assert!(merge_aggregates(&[&e2], "cpu").is_none());
}

#[test]
fn unavailable_constituent_avg_does_not_poison_the_sum() {
    let mut e1 = Entity::new("n1", Role::Node);
    e1.aggregates.insert(
        "cpu".to_string(),
        AggregateRecord {
            sum: 10.0,
            avg: None,
            max: 2.0,
            min: 1.0,
            diff_max_min: 1.0,
            first: 1.0,
            last: 2.0,
        },
    );
    let e2 = entity_with("n2", Role::Node, "cpu", &[(0, 1.0), (10, 3.0)]);

    let merged = merge_aggregates(&[&e1, &e2], "cpu").unwrap();
    assert_eq!(merged.sum, 30.0);
    assert_eq!(merged.avg, Some(2.0), "only available AVGs participate");
}

#[test]
fn merge_entities_covers_the_metric_union() {
    let e1 = entity_with("n1", Role::Node, "cpu", &[(0, 1.0), (10, 2.0)]);
    let e2 = entity_with("n2", Role::Node, "mem", &[(0, 100.0), (10, 100.0)]);

    let all = merge_entities("ALL", &[&e1, &e2]);
    assert_eq!(all.role, Role::All);
    assert!(all.series.contains_key("cpu"));
    assert!(all.series.contains_key("mem"));
    assert!(all.aggregates.contains_key("cpu"));
    assert!(all.aggregates.contains_key("mem"));
}

#[test]
fn capacity_metric_is_injected_from_apps() {
    let nodes = [
        entity_with("n1", Role::Node, "cpu", &[(0, 1.0), (10, 2.0)]),
        entity_with("n2", Role::Node, "cpu", &[(0, 3.0), (10, 4.0)]),
    ];
    let apps = [
        entity_with("app0", Role::App, "structure.energy.max", &[(0, 50.0), (10, 50.0)]),
        entity_with("app1", Role::App, "structure.energy.max", &[(0, 30.0), (10, 30.0)]),
    ];

    let node_refs: Vec<&Entity> = nodes.iter().collect();
    let app_refs: Vec<&Entity> = apps.iter().collect();
    let mut all = merge_entities("ALL", &node_refs);
    assert!(!all.series.contains_key("structure.energy.max"));

    inject_capacity(&mut all, &app_refs, "structure.energy.max");
    let injected = all.series.get("structure.energy.max").unwrap();
    assert_eq!(injected.get(0), Some(80.0));
    let record = all.aggregates.get("structure.energy.max").unwrap();
    assert_eq!(record.sum, 800.0);
}
