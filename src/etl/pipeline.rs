//! Pipeline orchestration for ETL operations

use super::{
    Extractor, Loader, Merger, RetryOutcome, RetryPolicy, SchemaTransformer, TableExtractor,
    TableLoader, Transformer, with_retry,
};
use crate::client::{Connector, SourceCatalog, TableSink};
use crate::error::{EtlError, Result};
use crate::schema::{CANDIDATE_TABLES, MERGED_TABLE, SchemaRules};
use crate::table::TableSnapshot;
use chrono::{DateTime, Utc};
use owo_colors::OwoColorize;
use serde::{Serialize, Serializer};
use std::fmt;
use std::future::Future;

/// Stages of a run, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Phase {
    ConnectSource,
    Extract,
    Transform,
    ConnectDestination,
    Load,
    Merge,
}

impl Phase {
    pub const ALL: [Phase; 6] = [
        Phase::ConnectSource,
        Phase::Extract,
        Phase::Transform,
        Phase::ConnectDestination,
        Phase::Load,
        Phase::Merge,
    ];

    /// 1-based position in the run
    pub fn number(&self) -> usize {
        Self::ALL.iter().position(|p| p == self).unwrap_or_default() + 1
    }

    pub fn description(&self) -> &'static str {
        match self {
            Phase::ConnectSource => "Connecting to the source database",
            Phase::Extract => "Extracting tables",
            Phase::Transform => "Transforming tables",
            Phase::ConnectDestination => "Connecting to the destination database",
            Phase::Load => "Loading staged tables",
            Phase::Merge => "Merging product dimensions",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::ConnectSource => "connect-source",
            Phase::Extract => "extract",
            Phase::Transform => "transform",
            Phase::ConnectDestination => "connect-destination",
            Phase::Load => "load",
            Phase::Merge => "merge",
        };
        f.write_str(name)
    }
}

/// How a phase ended
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PhaseReport {
    pub phase: Phase,
    pub succeeded: bool,
    pub attempts: u32,
}

/// A destination table written during the run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoadedTable {
    pub table: String,
    pub rows: usize,
}

/// The phase that exhausted its retries and the last error it saw
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PhaseFailure {
    pub phase: Phase,
    pub attempts: u32,
    #[serde(serialize_with = "serialize_error")]
    pub error: EtlError,
}

fn serialize_error<S: Serializer>(
    error: &EtlError,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    use serde::ser::SerializeStruct;

    let mut state = serializer.serialize_struct("EtlError", 2)?;
    state.serialize_field("kind", &error.kind())?;
    state.serialize_field("message", &error.to_string())?;
    state.end()
}

/// Outcome of one pipeline invocation
///
/// `success` is true iff every phase succeeded; otherwise `failure` names the
/// exhausted phase. Phases after a failure never run and are absent from
/// `phases`.
#[derive(Debug, Clone, Serialize)]
pub struct RunVerdict {
    pub success: bool,
    pub failure: Option<PhaseFailure>,
    pub phases: Vec<PhaseReport>,
    pub loaded: Vec<LoadedTable>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl RunVerdict {
    /// Process exit code: `0` on success, `1` otherwise
    pub fn exit_code(&self) -> u8 {
        match self.success {
            true => 0,
            false => 1,
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// Knobs of a run that are not retry parameters
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineOptions {
    /// Allow-list of source tables to extract
    pub tables: Vec<String>,
    /// Name of the denormalized product table
    pub merged_table: String,
    /// Also write untransformed `src_` copies during the load phase
    pub stage_raw: bool,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            tables: CANDIDATE_TABLES.iter().map(|t| t.to_string()).collect(),
            merged_table: MERGED_TABLE.to_string(),
            stage_raw: false,
        }
    }
}

/// Phases completed so far in a run
struct RunLog {
    started_at: DateTime<Utc>,
    phases: Vec<PhaseReport>,
    loaded: Vec<LoadedTable>,
}

impl RunLog {
    fn start() -> Self {
        Self {
            started_at: Utc::now(),
            phases: Vec::with_capacity(Phase::ALL.len()),
            loaded: Vec::new(),
        }
    }

    fn finish(self, failure: Option<PhaseFailure>) -> RunVerdict {
        RunVerdict {
            success: failure.is_none(),
            failure,
            phases: self.phases,
            loaded: self.loaded,
            started_at: self.started_at,
            finished_at: Utc::now(),
        }
    }
}

/// Sequential six-phase ETL run from a source connector to a destination connector
///
/// Each phase runs inside the [`RetryPolicy`] envelope. The first exhausted
/// phase aborts the run. Connection handles are owned by the run and dropped
/// before [`Pipeline::run`] returns, whatever the outcome.
///
/// # Example
/// ```no_run
/// use dw_etl::client::{ConnectionTarget, Engine, MssqlConnector, PostgresConnector};
/// use dw_etl::etl::Pipeline;
///
/// # async fn example() {
/// let source = MssqlConnector::new(ConnectionTarget::new(
///     Engine::SqlServer, "sqlserver", 1433, "etl", "secret", "AdventureWorksDW2022",
/// ));
/// let destination = PostgresConnector::new(ConnectionTarget::new(
///     Engine::Postgres, "postgres", 5432, "etl", "secret", "AdventureWorksDW2022",
/// ));
///
/// let verdict = Pipeline::new(source, destination).run().await;
/// std::process::exit(verdict.exit_code().into());
/// # }
/// ```
pub struct Pipeline<S, D> {
    source: S,
    destination: D,
    rules: SchemaRules,
    policy: RetryPolicy,
    options: PipelineOptions,
}

impl<S, D> Pipeline<S, D>
where
    S: Connector,
    S::Handle: SourceCatalog,
    D: Connector,
    D::Handle: TableSink,
{
    /// Create a pipeline with the built-in rules and default policy
    pub fn new(source: S, destination: D) -> Self {
        Self {
            source,
            destination,
            rules: SchemaRules::builtin(),
            policy: RetryPolicy::default(),
            options: PipelineOptions::default(),
        }
    }

    pub fn with_rules(mut self, rules: SchemaRules) -> Self {
        self.rules = rules;
        self
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_options(mut self, options: PipelineOptions) -> Self {
        self.options = options;
        self
    }

    /// Run all phases and produce the verdict
    pub async fn run(&self) -> RunVerdict {
        log::info!(
            "Starting ETL run from {} to {}",
            self.source.describe().bright_black(),
            self.destination.describe().bright_black()
        );

        let mut progress = RunLog::start();
        let failure = self.execute(&mut progress).await.err();
        let verdict = progress.finish(failure);

        match &verdict.failure {
            None => log::info!(
                "ETL run {} ({} table(s) written)",
                "succeeded".green(),
                verdict.loaded.len().cyan()
            ),
            Some(failure) => log::error!(
                "ETL run {} in stage {} after {} attempt(s): {}",
                "failed".red(),
                failure.phase,
                failure.attempts,
                failure.error
            ),
        }

        verdict
    }

    async fn execute(&self, progress: &mut RunLog) -> std::result::Result<(), PhaseFailure> {
        let connector = &self.source;
        let source = self
            .phase(progress, Phase::ConnectSource, move || connector.connect())
            .await?;

        let raw = {
            let extractor = &TableExtractor::new(&source, &self.options.tables);
            self.phase(progress, Phase::Extract, move || extractor.extract())
                .await?
        };
        drop(source);
        log::debug!("Released source connection");

        let transformer = &SchemaTransformer::new(&self.rules);
        let raw_ref = &raw;
        let staged = self
            .phase(progress, Phase::Transform, move || async move {
                transformer.transform_many(raw_ref.clone())
            })
            .await?;

        let connector = &self.destination;
        let destination = self
            .phase(progress, Phase::ConnectDestination, move || connector.connect())
            .await?;

        let (sink, staged_ref) = (&destination, &staged);
        let stage_raw = self.options.stage_raw;
        let loaded = self
            .phase(progress, Phase::Load, move || async move {
                let mut loaded = Vec::new();
                if stage_raw {
                    loaded.extend(load_each(&TableLoader::raw(sink), raw_ref).await?);
                }
                loaded.extend(load_each(&TableLoader::staged(sink), staged_ref).await?);
                Ok::<_, EtlError>(loaded)
            })
            .await?;
        progress.loaded.extend(loaded);

        let merger = &Merger::new(self.options.merged_table.as_str());
        let merged = self
            .phase(progress, Phase::Merge, move || async move {
                let merged = merger.merge_tables(staged_ref)?;
                let rows = TableLoader::with_prefix(sink, "")
                    .load(std::slice::from_ref(&merged))
                    .await?;
                Ok::<_, EtlError>(LoadedTable {
                    table: merged.name().to_string(),
                    rows,
                })
            })
            .await?;
        progress.loaded.push(merged);

        drop(destination);
        log::debug!("Released destination connection");
        Ok(())
    }

    async fn phase<T, F, Fut>(
        &self,
        progress: &mut RunLog,
        phase: Phase,
        op: F,
    ) -> std::result::Result<T, PhaseFailure>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        log::info!("{}", "=".repeat(40).bright_black());
        log::info!(
            "Initiating stage {}/{}: {}",
            phase.number().cyan(),
            Phase::ALL.len(),
            phase.description()
        );

        match with_retry(&self.policy, &phase.to_string(), op).await {
            RetryOutcome::Succeeded { value, attempts } => {
                log::info!("Stage {}/{} successful", phase.number(), Phase::ALL.len());
                progress.phases.push(PhaseReport {
                    phase,
                    succeeded: true,
                    attempts,
                });
                Ok(value)
            }
            RetryOutcome::Exhausted { error, attempts } => {
                progress.phases.push(PhaseReport {
                    phase,
                    succeeded: false,
                    attempts,
                });
                Err(PhaseFailure {
                    phase,
                    attempts,
                    error,
                })
            }
        }
    }
}

async fn load_each<D: TableSink>(
    loader: &TableLoader<'_, D>,
    snapshots: &[TableSnapshot],
) -> Result<Vec<LoadedTable>> {
    let mut loaded = Vec::with_capacity(snapshots.len());
    for snapshot in snapshots {
        let table = loader.target_name(snapshot.name());
        let rows = loader.load_as(snapshot, &table).await?;
        loaded.push(LoadedTable { table, rows });
    }
    Ok(loaded)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_order_and_names() {
        let names: Vec<String> = Phase::ALL.iter().map(|p| p.to_string()).collect();
        assert_eq!(
            names,
            [
                "connect-source",
                "extract",
                "transform",
                "connect-destination",
                "load",
                "merge"
            ]
        );
        assert_eq!(Phase::ConnectSource.number(), 1);
        assert_eq!(Phase::Merge.number(), 6);
    }

    #[test]
    fn test_verdict_exit_code_and_report() {
        let failed = RunLog::start().finish(Some(PhaseFailure {
            phase: Phase::Extract,
            attempts: 3,
            error: EtlError::query("Invalid object name 'DimProduct'"),
        }));
        assert!(!failed.success);
        assert_eq!(failed.exit_code(), 1);

        let report: serde_json::Value = serde_json::from_str(&failed.to_json().unwrap()).unwrap();
        assert_eq!(report["success"], false);
        assert_eq!(report["failure"]["phase"], "extract");
        assert_eq!(report["failure"]["attempts"], 3);
        assert_eq!(report["failure"]["error"]["kind"], "query");

        let succeeded = RunLog::start().finish(None);
        assert!(succeeded.success);
        assert_eq!(succeeded.exit_code(), 0);
    }

    #[test]
    fn test_default_options() {
        let options = PipelineOptions::default();
        assert_eq!(options.tables.len(), CANDIDATE_TABLES.len());
        assert_eq!(options.merged_table, "prd_DimProductCategory");
        assert!(!options.stage_raw);
    }
}
