//! Run configuration from environment variables
//!
//! Expected environment variables:
//! - `ETL_USER`, `ETL_PASS`: credentials for both databases (required)
//! - `SA_SERVER`, `SA_PORT`, `SA_DB`: SQL Server source (default `sqlserver:1433/AdventureWorksDW2022`)
//! - `PG_SERVER`, `PG_PORT`, `PG_DB`: PostgreSQL destination (default `postgres:5432/AdventureWorksDW2022`)
//! - `ETL_MAX_ATTEMPTS`: attempts per phase (default 100)
//! - `ETL_RETRY_DELAY_SECS`: pause between attempts (default 3)
//! - `ETL_ATTEMPT_TIMEOUT_SECS`: per-attempt limit, `0` disables (default 300)
//! - `ETL_TABLES`: comma-separated allow-list of source tables

use crate::client::{ConnectionTarget, Engine};
use crate::etl::RetryPolicy;
use crate::schema::CANDIDATE_TABLES;
use eyre::{Context, Result};
use std::str::FromStr;
use std::time::Duration;

const DEFAULT_DATABASE: &str = "AdventureWorksDW2022";

/// Everything a run needs besides its rules
#[derive(Debug, Clone, PartialEq)]
pub struct EtlConfig {
    pub source: ConnectionTarget,
    pub destination: ConnectionTarget,
    pub policy: RetryPolicy,
    pub tables: Vec<String>,
}

impl EtlConfig {
    /// Build the configuration from the process environment
    ///
    /// # Errors
    /// Fails when credentials are missing or a numeric variable does not parse
    pub fn from_env() -> Result<Self> {
        let user = std::env::var("ETL_USER").context("ETL_USER environment variable not set")?;
        let password =
            std::env::var("ETL_PASS").context("ETL_PASS environment variable not set")?;

        let source = ConnectionTarget::new(
            Engine::SqlServer,
            var_or("SA_SERVER", "sqlserver"),
            parse_var("SA_PORT", Engine::SqlServer.default_port())?,
            user.as_str(),
            password.as_str(),
            var_or("SA_DB", DEFAULT_DATABASE),
        );
        let destination = ConnectionTarget::new(
            Engine::Postgres,
            var_or("PG_SERVER", "postgres"),
            parse_var("PG_PORT", Engine::Postgres.default_port())?,
            user,
            password,
            var_or("PG_DB", DEFAULT_DATABASE),
        );

        let defaults = RetryPolicy::default();
        let timeout_secs = parse_var(
            "ETL_ATTEMPT_TIMEOUT_SECS",
            defaults.attempt_timeout.map_or(0, |t| t.as_secs()),
        )?;
        let policy = RetryPolicy::new(
            parse_var("ETL_MAX_ATTEMPTS", defaults.max_attempts)?,
            Duration::from_secs(parse_var("ETL_RETRY_DELAY_SECS", defaults.delay.as_secs())?),
        )
        .with_attempt_timeout((timeout_secs > 0).then(|| Duration::from_secs(timeout_secs)));

        let tables = match std::env::var("ETL_TABLES") {
            Ok(list) => split_tables(&list),
            Err(_) => CANDIDATE_TABLES.iter().map(|t| t.to_string()).collect(),
        };

        Ok(Self {
            source,
            destination,
            policy,
            tables,
        })
    }
}

/// Split a comma-separated table list, ignoring blanks
pub fn split_tables(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(String::from)
        .collect()
}

fn var_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_var<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("Invalid {}: {}", key, raw)),
        Err(_) => Ok(default),
    }
}
