//! CLI helper functions

use crate::{
    client::{Connector, MssqlConnector, PostgresConnector},
    config::EtlConfig,
    etl::{Pipeline, PipelineOptions, RetryPolicy, RunVerdict, with_retry},
    schema::SchemaRules,
};
use eyre::{Context, Result};
use owo_colors::OwoColorize;
use std::path::Path;

/// Source and destination connectors for a configuration
pub fn load_connectors(config: &EtlConfig) -> (MssqlConnector, PostgresConnector) {
    (
        MssqlConnector::new(config.source.clone()),
        PostgresConnector::new(config.destination.clone()),
    )
}

/// Rules from a YAML file, or the built-in rules when no file is given
pub fn load_rules(path: Option<&Path>) -> Result<SchemaRules> {
    match path {
        Some(path) => {
            log::info!("Loading rules from {}", path.display().bright_black());
            SchemaRules::read(path)
        }
        None => Ok(SchemaRules::builtin()),
    }
}

/// Run the full pipeline
///
/// Pipeline: connect-source → extract → transform → connect-destination → load → merge
///
/// The verdict is returned even when a phase was exhausted; only problems
/// writing the report are errors.
pub async fn run_pipeline(
    config: &EtlConfig,
    rules: SchemaRules,
    stage_raw: bool,
    report: Option<&Path>,
) -> Result<RunVerdict> {
    let (source, destination) = load_connectors(config);
    let options = PipelineOptions {
        tables: config.tables.clone(),
        stage_raw,
        ..PipelineOptions::default()
    };

    let pipeline = Pipeline::new(source, destination)
        .with_rules(rules)
        .with_policy(config.policy.clone())
        .with_options(options);
    let verdict = pipeline.run().await;

    if let Some(path) = report {
        write_report(&verdict, path)?;
    }
    Ok(verdict)
}

/// Write a verdict as JSON
pub fn write_report(verdict: &RunVerdict, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let json = verdict.to_json().context("Failed to serialize run report")?;
    std::fs::write(path, json)
        .with_context(|| format!("Failed to write run report: {}", path.display()))?;
    log::info!("Run report written to {}", path.display().bright_black());
    Ok(())
}

/// Make a single connection attempt to the source and the destination
///
/// Returns true if both targets accepted the connection.
pub async fn check_connections(config: &EtlConfig) -> bool {
    let (source, destination) = load_connectors(config);
    let policy = RetryPolicy::new(1, std::time::Duration::ZERO)
        .with_attempt_timeout(config.policy.attempt_timeout);

    let source_ok = check_target(&source, &policy).await;
    let destination_ok = check_target(&destination, &policy).await;
    source_ok && destination_ok
}

/// One connection attempt against `connector`, dropping the handle right away
pub async fn check_target<C: Connector>(connector: &C, policy: &RetryPolicy) -> bool {
    let target = connector.describe();
    match with_retry(policy, "check", || connector.connect()).await.into_result() {
        Ok(_handle) => {
            log::info!("Connected to {}", target.green());
            true
        }
        Err(e) => {
            log::error!("Cannot connect to {}: {}", target.red(), e);
            false
        }
    }
}

/// Effective rules rendered as YAML
pub fn render_rules(rules: &SchemaRules) -> Result<String> {
    rules.to_yaml()
}
