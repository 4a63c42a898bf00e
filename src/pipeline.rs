// Document orchestration: bounded-concurrency fetch fan-out into pure
// compute stages, then composite merge and the missing-data scan.
// Per-unit failures are collected into the report, never fatal to it.

use std::collections::BTreeMap;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{info, warn};

use crate::aggregator;
use crate::config::ReportConfig;
use crate::gaps::{self, MissingDataReport};
use crate::merger;
use crate::models::{Document, Entity, MetricSeries, RetrievalSpec, Role, Window};
use crate::report::{DocumentTimes, ReportBody, UnitError, UsageReport};
use crate::store::SeriesStore;
use crate::synthesizer;

/// Name of the synthetic composite entity in report maps.
pub const ALL_ENTITY: &str = "ALL";

pub struct ReportPipeline {
    store: Arc<dyn SeriesStore>,
    config: Arc<ReportConfig>,
}

impl ReportPipeline {
    pub fn new(store: Arc<dyn SeriesStore>, config: Arc<ReportConfig>) -> Self {
        Self { store, config }
    }

    /// Builds the full usage report for one document. An unbounded window
    /// short-circuits to the unavailable sentinel before any store call.
    pub async fn run(&self, document: &Document) -> UsageReport {
        let Window::Bounded { start, end } = document.window else {
            warn!(document = %document.name, "window unbounded, skipping aggregation");
            return UsageReport::Unavailable {
                reason: "document lacks start or end bound".into(),
            };
        };

        let mut units: Vec<(String, Role, RetrievalSpec)> = Vec::new();
        for user in &self.config.entities.users {
            units.push((user.clone(), Role::User, self.config.user_metrics()));
        }
        for node in &self.config.entities.nodes {
            units.push((node.clone(), Role::Node, self.config.node_metrics()));
        }
        for app in &self.config.entities.apps {
            units.push((app.clone(), Role::App, self.config.app_metrics()));
        }

        // Fetches dominate wall-clock time; fan out across entities with a
        // bounded permit pool. Each entity's aggregation starts as soon as
        // its own retrieval set is complete, independent of the others.
        let semaphore = Arc::new(Semaphore::new(self.config.reporting.fetch_concurrency));
        let mut tasks = JoinSet::new();
        for (name, role, spec) in units {
            let store = self.store.clone();
            let config = self.config.clone();
            let semaphore = semaphore.clone();
            tasks.spawn(async move {
                let _permit = semaphore.acquire_owned().await.ok();
                match store.fetch(&name, start, end, &spec).await {
                    Ok(series) => {
                        let (entity, errors) = compute_entity(name, role, series, start, end, &config);
                        (Some(entity), errors)
                    }
                    Err(e) => {
                        warn!(entity = %name, error = %e, "fetch failed");
                        let error = UnitError {
                            entity: name,
                            metric: spec.metric_names(),
                            message: e.to_string(),
                        };
                        (None, vec![error])
                    }
                }
            });
        }

        let mut entities: BTreeMap<String, Entity> = BTreeMap::new();
        let mut errors: Vec<UnitError> = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((entity, unit_errors)) => {
                    errors.extend(unit_errors);
                    if let Some(entity) = entity {
                        entities.insert(entity.name.clone(), entity);
                    }
                }
                Err(e) => warn!(error = %e, "entity task failed"),
            }
        }

        // Composite merge and gap scan wait for every constituent,
        // regardless of fetch completion order.
        let (all, missing_data) = {
            let nodes: Vec<&Entity> = entities.values().filter(|e| e.role == Role::Node).collect();
            let apps: Vec<&Entity> = entities.values().filter(|e| e.role == Role::App).collect();

            let mut all = merger::merge_entities(ALL_ENTITY, &nodes);
            if let Some(capacity_metric) = self.config.capacity_metric() {
                merger::inject_capacity(&mut all, &apps, capacity_metric);
            }

            let duration = end - start;
            let max_gap = self.config.reporting.max_diff_time_secs;
            let mut missing_data = MissingDataReport::default();
            for metric in self.config.missing_data_metrics() {
                for node in &nodes {
                    let node_gaps = match node.series.get(&metric) {
                        Some(series) if !series.is_empty() => gaps::find_gaps(series, max_gap),
                        // No points at all: a full-window loss, distinct from
                        // "present data without gaps".
                        _ => vec![gaps::total_loss(start, duration)],
                    };
                    missing_data.record(&metric, &node.name, node_gaps);
                }
            }
            (all, missing_data)
        };
        entities.insert(ALL_ENTITY.to_string(), all);

        info!(
            document = %document.name,
            entities = entities.len(),
            errors = errors.len(),
            "report computed"
        );
        UsageReport::Available(ReportBody {
            document: DocumentTimes::from_document(document),
            entities,
            missing_data,
            errors,
        })
    }
}

/// Pure per-entity stage: synthesize usage metrics (nodes only), then
/// aggregate every metric. Empty series produce no aggregate; a zero-length
/// window is reported per metric while the record's other fields stand.
fn compute_entity(
    name: String,
    role: Role,
    mut series: BTreeMap<String, MetricSeries>,
    start: i64,
    end: i64,
    config: &ReportConfig,
) -> (Entity, Vec<UnitError>) {
    if role == Role::Node {
        synthesizer::synthesize(&mut series, &config.usage_metric_specs());
    }

    let mut entity = Entity::new(name, role);
    let mut errors = Vec::new();
    for (metric, metric_series) in series {
        if let Some(record) = aggregator::aggregate(start, end, &metric_series) {
            if record.avg.is_none() {
                errors.push(UnitError {
                    entity: entity.name.clone(),
                    metric: metric.clone(),
                    message: "zero-length window, AVG unavailable".into(),
                });
            }
            entity.aggregates.insert(metric.clone(), record);
        }
        entity.series.insert(metric, metric_series);
    }
    (entity, errors)
}
