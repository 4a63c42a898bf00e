// Time-series store client (OpenTSDB-style HTTP API).
// One batch query per (entity, retrieval spec); retry/backoff belongs to the
// collaborator deploying the store, not to this client.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::config::StoreConfig;
use crate::models::{MetricSeries, RetrievalSpec, SeriesError};

#[derive(Debug, Error)]
pub enum StoreError {
    /// Transport failure; the caller decides whether to retry the unit.
    #[error("store connectivity: {0}")]
    Connectivity(#[source] reqwest::Error),
    #[error("store returned status {status}")]
    Status { status: u16 },
    #[error("store response decode: {0}")]
    Decode(#[source] serde_json::Error),
    #[error("bad timestamp {key:?} in series for {metric}")]
    BadTimestamp { metric: String, key: String },
    #[error("series for {metric}: {source}")]
    Malformed {
        metric: String,
        #[source]
        source: SeriesError,
    },
}

/// Fetches raw point sets for one entity over a window. Returns an entry for
/// every requested metric; metrics with no data map to an empty series, and
/// only transport/protocol problems are errors.
#[async_trait]
pub trait SeriesStore: Send + Sync {
    async fn fetch(
        &self,
        entity: &str,
        start: i64,
        end: i64,
        spec: &RetrievalSpec,
    ) -> Result<BTreeMap<String, MetricSeries>, StoreError>;
}

pub struct OpenTsdbStore {
    base_url: String,
    client: reqwest::Client,
}

impl OpenTsdbStore {
    pub fn new(config: &StoreConfig) -> Self {
        Self {
            base_url: format!("http://{}:{}{}", config.host, config.port, config.subdir),
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl SeriesStore for OpenTsdbStore {
    async fn fetch(
        &self,
        entity: &str,
        start: i64,
        end: i64,
        spec: &RetrievalSpec,
    ) -> Result<BTreeMap<String, MetricSeries>, StoreError> {
        let subqueries: Vec<serde_json::Value> = spec
            .metrics
            .iter()
            .map(|m| {
                let mut tags = serde_json::Map::new();
                tags.insert(
                    m.tag_scope.clone(),
                    serde_json::Value::String(entity.to_string()),
                );
                serde_json::json!({
                    "aggregator": "zimsum",
                    "metric": m.name,
                    "tags": tags,
                    "downsample": format!("{}s-avg", spec.downsample_secs),
                })
            })
            .collect();
        let query = serde_json::json!({
            "start": start,
            "end": end,
            "queries": subqueries,
        });

        debug!(entity, start, end, metrics = %spec.metric_names(), "store query");
        let response = self
            .client
            .post(format!("{}/api/query", self.base_url))
            .json(&query)
            .send()
            .await
            .map_err(StoreError::Connectivity)?;
        let status = response.status();
        if !status.is_success() {
            return Err(StoreError::Status {
                status: status.as_u16(),
            });
        }
        let text = response.text().await.map_err(StoreError::Connectivity)?;

        // Every requested metric gets an entry even when the store returned
        // nothing for it, so absence of data is visible downstream.
        let mut usages: BTreeMap<String, MetricSeries> = spec
            .metrics
            .iter()
            .map(|m| (m.name.clone(), MetricSeries::new()))
            .collect();
        for (metric, series) in decode_query_results(&text)? {
            usages.insert(metric, series);
        }
        Ok(usages)
    }
}

#[derive(Deserialize)]
struct QueryResult {
    metric: String,
    /// Data points keyed by stringified Unix timestamp.
    dps: HashMap<String, f64>,
}

/// Decodes an `/api/query` response body into per-metric series. Timestamp
/// keys arrive as strings in arbitrary order; they are parsed, sorted, and
/// validated into ordered series.
pub fn decode_query_results(text: &str) -> Result<Vec<(String, MetricSeries)>, StoreError> {
    let results: Vec<QueryResult> = serde_json::from_str(text).map_err(StoreError::Decode)?;
    let mut out = Vec::with_capacity(results.len());
    for result in results {
        let mut points = Vec::with_capacity(result.dps.len());
        for (key, value) in &result.dps {
            let ts: i64 = key.parse().map_err(|_| StoreError::BadTimestamp {
                metric: result.metric.clone(),
                key: key.clone(),
            })?;
            points.push((ts, *value));
        }
        points.sort_unstable_by_key(|(ts, _)| *ts);
        let series =
            MetricSeries::from_points(points).map_err(|source| StoreError::Malformed {
                metric: result.metric.clone(),
                source,
            })?;
        out.push((result.metric, series));
    }
    Ok(out)
}
