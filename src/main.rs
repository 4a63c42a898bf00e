use std::sync::Arc;

use anyhow::{Context, Result};
use benchreport::*;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::time::FormatTime;

struct LocalTimer;

impl FormatTime for LocalTimer {
    fn format_time(&self, w: &mut tracing_subscriber::fmt::format::Writer<'_>) -> std::fmt::Result {
        write!(
            w,
            "{}",
            chrono::Local::now().format("%Y-%m-%dT%H:%M:%S%.3f%:z")
        )
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_timer(LocalTimer)
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config = config::ReportConfig::load()?;

    let document_path = std::env::args()
        .nth(1)
        .context("usage: benchreport <document.json>")?;
    let raw = std::fs::read_to_string(&document_path)
        .with_context(|| format!("reading document {}", document_path))?;
    let document = models::Document::from_json(&raw)
        .with_context(|| format!("parsing document {}", document_path))?;

    tracing::info!(
        version = version::VERSION,
        document = %document.name,
        "generating usage report"
    );

    let store = Arc::new(store::OpenTsdbStore::new(&config.store));
    let pipeline = pipeline::ReportPipeline::new(store, Arc::new(config));
    let report = pipeline.run(&document).await;

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
