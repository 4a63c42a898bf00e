use serde::Deserialize;

use crate::models::{MetricQuery, RetrievalSpec, UsageMetricSpec};

/// Metric groups that can be switched on per report. Each group expands into
/// fixed per-role retrieval specs and usage-metric sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Resource {
    Cpu,
    Mem,
    Energy,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReportConfig {
    pub store: StoreConfig,
    pub entities: EntitiesConfig,
    pub reporting: ReportingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    pub host: String,
    pub port: u16,
    /// URL path prefix when the store sits behind a reverse proxy ("" for none).
    #[serde(default)]
    pub subdir: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EntitiesConfig {
    pub nodes: Vec<String>,
    #[serde(default)]
    pub apps: Vec<String>,
    #[serde(default)]
    pub users: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReportingConfig {
    pub resources: Vec<Resource>,
    /// Store-side bucketing period applied before points are returned.
    pub downsample_secs: u64,
    /// Consecutive samples further apart than this are reported as a gap.
    pub max_diff_time_secs: i64,
    /// Upper bound on simultaneous store fetches across entities.
    pub fetch_concurrency: usize,
}

impl ReportConfig {
    pub fn load() -> anyhow::Result<Self> {
        let path = std::env::var("CONFIG_FILE").unwrap_or_else(|_| "config.toml".into());
        let s = std::fs::read_to_string(&path)?;
        Self::load_from_str(&s)
    }

    /// Parse and validate config from a string (e.g. for tests).
    pub fn load_from_str(s: &str) -> anyhow::Result<Self> {
        let config: ReportConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(!self.store.host.is_empty(), "store.host must be non-empty");
        anyhow::ensure!(
            self.store.port > 0,
            "store.port must be between 1 and 65535, got {}",
            self.store.port
        );
        anyhow::ensure!(
            !self.entities.nodes.is_empty(),
            "entities.nodes must list at least one node"
        );
        anyhow::ensure!(
            !self.reporting.resources.is_empty(),
            "reporting.resources must list at least one resource"
        );
        anyhow::ensure!(
            self.reporting.downsample_secs > 0,
            "reporting.downsample_secs must be > 0, got {}",
            self.reporting.downsample_secs
        );
        anyhow::ensure!(
            self.reporting.max_diff_time_secs > 0,
            "reporting.max_diff_time_secs must be > 0, got {}",
            self.reporting.max_diff_time_secs
        );
        anyhow::ensure!(
            self.reporting.fetch_concurrency > 0,
            "reporting.fetch_concurrency must be > 0, got {}",
            self.reporting.fetch_concurrency
        );
        Ok(())
    }

    fn reports(&self, resource: Resource) -> bool {
        self.reporting.resources.contains(&resource)
    }

    fn spec(&self, metrics: Vec<(&str, &str)>) -> RetrievalSpec {
        RetrievalSpec {
            metrics: metrics
                .into_iter()
                .map(|(name, tag_scope)| MetricQuery {
                    name: name.into(),
                    tag_scope: tag_scope.into(),
                })
                .collect(),
            downsample_secs: self.reporting.downsample_secs,
        }
    }

    /// Metrics fetched for each compute node.
    pub fn node_metrics(&self) -> RetrievalSpec {
        let mut metrics = Vec::new();
        if self.reports(Resource::Cpu) {
            metrics.push(("structure.cpu.current", "structure"));
            metrics.push(("proc.cpu.user", "host"));
            metrics.push(("proc.cpu.kernel", "host"));
            metrics.push(("limit.cpu.upper", "structure"));
            metrics.push(("limit.cpu.lower", "structure"));
        }
        if self.reports(Resource::Mem) {
            metrics.push(("structure.mem.current", "structure"));
            metrics.push(("proc.mem.resident", "host"));
            metrics.push(("proc.mem.virtual", "host"));
            metrics.push(("limit.mem.upper", "structure"));
            metrics.push(("limit.mem.lower", "structure"));
        }
        if self.reports(Resource::Energy) {
            metrics.push(("sys.cpu.energy", "host"));
        }
        self.spec(metrics)
    }

    /// Metrics fetched for each application entity.
    pub fn app_metrics(&self) -> RetrievalSpec {
        let mut metrics = Vec::new();
        if self.reports(Resource::Cpu) {
            metrics.push(("structure.cpu.current", "structure"));
            metrics.push(("structure.cpu.used", "structure"));
        }
        if self.reports(Resource::Mem) {
            metrics.push(("structure.mem.current", "structure"));
            metrics.push(("structure.mem.used", "structure"));
        }
        if self.reports(Resource::Energy) {
            metrics.push(("structure.energy.max", "structure"));
            metrics.push(("structure.energy.used", "structure"));
        }
        self.spec(metrics)
    }

    /// Metrics fetched for each user entity.
    pub fn user_metrics(&self) -> RetrievalSpec {
        let mut metrics = Vec::new();
        if self.reports(Resource::Cpu) {
            metrics.push(("user.cpu.current", "user"));
            metrics.push(("user.cpu.used", "user"));
        }
        if self.reports(Resource::Energy) {
            metrics.push(("user.energy.max", "user"));
            metrics.push(("user.energy.used", "user"));
        }
        self.spec(metrics)
    }

    /// Derived per-node usage metrics and the raw metrics they sum.
    pub fn usage_metric_specs(&self) -> Vec<UsageMetricSpec> {
        let mut specs = Vec::new();
        if self.reports(Resource::Cpu) {
            specs.push(UsageMetricSpec {
                target: "structure.cpu.used".into(),
                sources: vec!["proc.cpu.user".into(), "proc.cpu.kernel".into()],
            });
        }
        if self.reports(Resource::Mem) {
            specs.push(UsageMetricSpec {
                target: "structure.mem.used".into(),
                sources: vec!["proc.mem.resident".into()],
            });
        }
        if self.reports(Resource::Energy) {
            specs.push(UsageMetricSpec {
                target: "structure.energy.used".into(),
                sources: vec!["sys.cpu.energy".into()],
            });
        }
        specs
    }

    /// Node metrics scanned for telemetry gaps.
    pub fn missing_data_metrics(&self) -> Vec<String> {
        let mut metrics = Vec::new();
        if self.reports(Resource::Cpu) {
            metrics.push("structure.cpu.current".to_string());
            metrics.push("proc.cpu.user".to_string());
            metrics.push("proc.cpu.kernel".to_string());
        }
        if self.reports(Resource::Mem) {
            metrics.push("structure.mem.current".to_string());
            metrics.push("proc.mem.resident".to_string());
        }
        if self.reports(Resource::Energy) {
            metrics.push("structure.energy.used".to_string());
        }
        metrics
    }

    /// The app-only maximum-capacity metric injected into the ALL composite,
    /// if the energy group is reported. Nodes never carry it natively.
    pub fn capacity_metric(&self) -> Option<&'static str> {
        if self.reports(Resource::Energy) {
            Some("structure.energy.max")
        } else {
            None
        }
    }
}
