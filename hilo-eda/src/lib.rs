//! # HILO EDA - Human-in-the-loop exploratory data analysis
//!
//! HILO EDA profiles a single relational table, infers a behavior class for
//! every column, pauses once for a human to confirm column roles, and then
//! runs a small, deterministic battery of read-only follow-up queries. The
//! results are written as a Markdown report with CSV exports.
//!
//! ## Pipeline
//!
//! 1. **Discovery** ([`discovery`]): confirm the table exists and list its
//!    columns through `INFORMATION_SCHEMA`.
//! 2. **Profiling** ([`profiler`]): counts, nulls, distinct values, min/max
//!    and top-k values per column, plus a sample of rows.
//! 3. **Inference** ([`inference`]): an ordered, first-match-wins rule chain
//!    assigns each column a [`BehaviorClass`](types::BehaviorClass).
//! 4. **Human checkpoint** ([`human`]): identifier, time and status columns,
//!    columns to ignore and an analysis direction.
//! 5. **Planning** ([`planner`]): at most eight follow-up queries built from
//!    the numeric and categorical columns that were not ignored.
//! 6. **Execution and reporting** ([`orchestrator`], [`report`]).
//!
//! Every statement goes through the SQL guard in [`security`] before it
//! reaches a [`QueryExecutor`](executor::QueryExecutor). The bundled
//! [`DataFusionExecutor`](executor::DataFusionExecutor) runs queries
//! in-process against CSV, Parquet or NDJSON files registered as tables.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use hilo_eda::prelude::*;
//!
//! # async fn example() -> Result<()> {
//! let table = TableConfig::new("warehouse", "analytics", "orders");
//! let config = EdaConfig::builder(table)
//!     .warehouse(WarehouseConfig::default().with_table(TableSource::new("orders", "data/orders.csv")))
//!     .output(OutputConfig::new("eda_output"))
//!     .build()?;
//!
//! let executor = DataFusionExecutor::connect(&config.warehouse, &config.table).await?;
//! let selections = HumanSelections {
//!     time_column: Some("created_at".to_string()),
//!     ..Default::default()
//! };
//!
//! let mut pipeline = EdaPipeline::new(
//!     config,
//!     Box::new(PresetInput::new(selections)),
//!     Box::new(FileReportSink::new()),
//! );
//! let run = pipeline.run(executor).await?;
//!
//! for path in run.artifacts.paths() {
//!     println!("wrote {}", path.display());
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Logging
//!
//! The library emits `tracing` spans and events only. Binaries install a
//! subscriber with [`logging::setup::init_logging`].

pub mod config;
pub mod discovery;
pub mod error;
pub mod executor;
pub mod human;
pub mod inference;
pub mod logging;
pub mod orchestrator;
pub mod planner;
pub mod prelude;
pub mod profiler;
pub mod report;
pub mod security;
pub mod sources;
pub mod types;
