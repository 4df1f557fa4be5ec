//! The EDA pipeline state machine.
//!
//! A run moves strictly forward through [`PipelineState`]:
//!
//! ```text
//! Start -> SchemaChecked -> ColumnsFetched -> Profiled -> Inferred
//!       -> HumanConfirmed -> QueriesPlanned -> QueriesExecuted -> Reported -> Closed
//! ```
//!
//! Any failure aborts the run. The error is wrapped with the last state the
//! run reached, and the executor is closed on every exit path.
//!
//! # Example
//!
//! ```rust,no_run
//! use hilo_eda::config::{EdaConfig, TableConfig};
//! use hilo_eda::executor::DataFusionExecutor;
//! use hilo_eda::human::PresetInput;
//! use hilo_eda::orchestrator::EdaPipeline;
//! use hilo_eda::report::FileReportSink;
//!
//! # async fn example() -> hilo_eda::error::Result<()> {
//! let config = EdaConfig::builder(TableConfig::new("warehouse", "analytics", "orders"))
//!     .top_k(3)
//!     .build()?;
//! let executor = DataFusionExecutor::connect(&config.warehouse, &config.table).await?;
//!
//! let mut pipeline = EdaPipeline::new(
//!     config,
//!     Box::new(PresetInput::default()),
//!     Box::new(FileReportSink::new()),
//! );
//! let run = pipeline.run(executor).await?;
//! println!("{} queries executed", run.report.executed_queries.len());
//! # Ok(())
//! # }
//! ```

use std::fmt;
use std::time::Instant;

use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::config::EdaConfig;
use crate::discovery::{fetch_columns, table_exists};
use crate::error::{EdaError, Result};
use crate::executor::{execute_guarded, QueryExecutor};
use crate::human::{apply_ignored, HumanInputSource};
use crate::inference::infer_all;
use crate::planner::{build_eda_queries, ColumnRoles, PlannedQuery};
use crate::profiler::TableProfiler;
use crate::report::{ReportArtifacts, ReportBundle, ReportSink};
use crate::types::{ColumnInfo, EdaQueryResult, InferenceResult};

/// Progress of a pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum PipelineState {
    Start,
    SchemaChecked,
    ColumnsFetched,
    Profiled,
    Inferred,
    HumanConfirmed,
    QueriesPlanned,
    QueriesExecuted,
    Reported,
    Closed,
}

impl PipelineState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Start => "Start",
            Self::SchemaChecked => "SchemaChecked",
            Self::ColumnsFetched => "ColumnsFetched",
            Self::Profiled => "Profiled",
            Self::Inferred => "Inferred",
            Self::HumanConfirmed => "HumanConfirmed",
            Self::QueriesPlanned => "QueriesPlanned",
            Self::QueriesExecuted => "QueriesExecuted",
            Self::Reported => "Reported",
            Self::Closed => "Closed",
        }
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Artifacts of a completed run.
#[derive(Debug, Clone)]
pub struct EdaRun {
    /// Discovered columns, in physical order.
    pub columns: Vec<ColumnInfo>,
    /// Inference results left after removing ignored columns.
    pub considered: Vec<InferenceResult>,
    pub planned_queries: Vec<PlannedQuery>,
    pub report: ReportBundle,
    pub artifacts: ReportArtifacts,
}

/// Sequences discovery, profiling, inference, the human checkpoint, query
/// planning, execution and reporting.
pub struct EdaPipeline {
    config: EdaConfig,
    human: Box<dyn HumanInputSource>,
    sink: Box<dyn ReportSink>,
    state: PipelineState,
}

impl fmt::Debug for EdaPipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EdaPipeline")
            .field("config", &self.config)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl EdaPipeline {
    pub fn new(
        config: EdaConfig,
        human: Box<dyn HumanInputSource>,
        sink: Box<dyn ReportSink>,
    ) -> Self {
        Self {
            config,
            human,
            sink,
            state: PipelineState::Start,
        }
    }

    pub fn config(&self) -> &EdaConfig {
        &self.config
    }

    /// The last state reached by the most recent run.
    pub fn state(&self) -> PipelineState {
        self.state
    }

    /// Runs the pipeline to completion, taking ownership of `executor`.
    ///
    /// The executor is closed before this returns, whether the run succeeded
    /// or not. The human checkpoint is collected synchronously.
    #[instrument(skip(self, executor), fields(
        table = %self.config.table.table,
        executor = %executor.description()
    ))]
    pub async fn run<E: QueryExecutor>(&mut self, executor: E) -> Result<EdaRun> {
        let start = Instant::now();
        self.state = PipelineState::Start;

        let outcome = self.run_stages(&executor).await;
        let reached = self.state;
        let closed = executor.close().await;
        self.state = PipelineState::Closed;

        match (outcome, closed) {
            (Ok(run), Ok(())) => {
                info!(
                    queries = run.report.executed_queries.len(),
                    time_ms = start.elapsed().as_millis() as u64,
                    "EDA pipeline completed"
                );
                Ok(run)
            }
            (Ok(_), Err(close_error)) => Err(close_error.at_stage(reached)),
            (Err(error), closed) => {
                if let Err(close_error) = closed {
                    warn!(error = %close_error, "Failed to close executor after pipeline error");
                }
                warn!(stage = %reached, error = %error, "EDA pipeline failed");
                Err(error.at_stage(reached))
            }
        }
    }

    fn advance(&mut self, next: PipelineState) {
        info!(from = %self.state, to = %next, "Pipeline stage reached");
        self.state = next;
    }

    async fn run_stages(&mut self, executor: &dyn QueryExecutor) -> Result<EdaRun> {
        let table = self.config.table.clone();
        let table_fqn = table.qualified_name()?;

        if !table_exists(executor, &table).await? {
            return Err(EdaError::precondition(format!(
                "Table not found in INFORMATION_SCHEMA: {table_fqn}"
            )));
        }
        self.advance(PipelineState::SchemaChecked);

        let columns = fetch_columns(executor, &table).await?;
        if columns.is_empty() {
            return Err(EdaError::precondition(format!(
                "No columns found for table {table_fqn}"
            )));
        }
        self.advance(PipelineState::ColumnsFetched);

        let profiler = TableProfiler::new(self.config.profiling);
        let (table_profile, sample_rows) =
            profiler.profile_table(executor, &table, &columns).await?;
        self.advance(PipelineState::Profiled);

        let inferences = infer_all(&table_profile.columns, table_profile.row_count);
        let behaviors = inferences
            .iter()
            .map(|inference| inference.behavior_class.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        info!(behaviors = %behaviors, "Inferred column behaviors");
        self.advance(PipelineState::Inferred);

        let names: Vec<String> = columns.iter().map(|column| column.name.clone()).collect();
        let selections = self.human.collect(&names)?.resolve_against(&columns)?;
        self.advance(PipelineState::HumanConfirmed);

        let considered = apply_ignored(&inferences, &selections);
        let roles = ColumnRoles::from_inferences(&considered);
        let planned_queries = build_eda_queries(
            &table,
            &roles.numeric,
            &roles.categorical,
            selections.time_column.as_deref(),
        )?;
        self.advance(PipelineState::QueriesPlanned);

        let mut executed_queries = Vec::with_capacity(planned_queries.len());
        for query in &planned_queries {
            let rows = execute_guarded(executor, &query.sql).await?;
            executed_queries.push(EdaQueryResult {
                title: query.title.clone(),
                sql: query.sql.clone(),
                rows,
            });
        }
        self.advance(PipelineState::QueriesExecuted);

        let report = ReportBundle {
            table_profile,
            inferences,
            selections,
            executed_queries,
            sample_rows,
        };
        let artifacts = self.sink.write(&report, &self.config.output.output_dir)?;
        self.advance(PipelineState::Reported);

        Ok(EdaRun {
            columns,
            considered,
            planned_queries,
            report,
            artifacts,
        })
    }
}
