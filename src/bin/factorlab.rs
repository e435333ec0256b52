//! Dry-run a factorial experiment with the offline echo backend.
//!
//! ```text
//! factorlab experiment.json > report.json
//! ```
//!
//! Every provider named in the configuration is served by
//! [`EchoGenerator`], so designs, templates and local response variables
//! can be checked without network access. Logs go to stderr, filtered by
//! `RUST_LOG`.

use std::sync::Arc;

use anyhow::{bail, Context};
use factorlab::config::ExperimentConfig;
use factorlab::execution::ProgressSnapshot;
use factorlab::pipeline::Experiment;
use factorlab::provider::{EchoGenerator, ProviderRegistry};
use tracing::info;
use tracing_subscriber::prelude::*;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let Some(path) = std::env::args().nth(1) else {
        bail!("usage: factorlab <config.json>");
    };
    let config = ExperimentConfig::from_path(&path)
        .with_context(|| format!("failed to load experiment config from {path}"))?;

    let mut registry = ProviderRegistry::new();
    let echo = Arc::new(EchoGenerator::new());
    for model in &config.models {
        if !registry.contains(model.provider()) {
            registry.register_shared(model.provider(), Arc::clone(&echo));
        }
    }

    let sink = |snapshot: &ProgressSnapshot| {
        info!(
            stage = %snapshot.stage,
            completed = snapshot.completed,
            failed = snapshot.failed,
            total = snapshot.total,
            "progress"
        );
    };

    let outcome = Experiment::new(registry)
        .run(&config, Arc::new(sink))
        .await
        .context("experiment run failed")?;
    info!(
        calls = echo.calls(),
        estimated_cost_usd = outcome.data.estimated_cost(),
        "dry run complete"
    );

    println!("{}", serde_json::to_string_pretty(&outcome.report)?);
    Ok(())
}
