//! Per-column statistical profiling.
//!
//! Each column is profiled with independent read-only queries, issued one
//! after another:
//!
//! 1. total, non-null and distinct counts in a single aggregate;
//! 2. `MIN`/`MAX`, only for numeric-like and date/time-like declared types;
//! 3. the `top_k` most frequent non-null values. Nulls are only counted.
//!
//! The row count and the sample rows are fetched once per table. Any failing
//! query aborts the whole profile; there is no partial result.
//!
//! # Example
//!
//! ```rust,no_run
//! use hilo_eda::config::{ProfilingConfig, TableConfig};
//! use hilo_eda::discovery::fetch_columns;
//! use hilo_eda::executor::DataFusionExecutor;
//! use hilo_eda::profiler::TableProfiler;
//!
//! # async fn example() -> hilo_eda::error::Result<()> {
//! let table = TableConfig::new("datafusion", "public", "orders");
//! let executor = DataFusionExecutor::new(&table.database, &table.schema);
//! let columns = fetch_columns(&executor, &table).await?;
//!
//! let profiler = TableProfiler::new(ProfilingConfig::default().with_top_k(3));
//! let (profile, sample_rows) = profiler.profile_table(&executor, &table, &columns).await?;
//! println!("{} rows, {} sampled", profile.row_count, sample_rows.len());
//! # Ok(())
//! # }
//! ```

use std::time::Instant;

use tracing::{debug, info, instrument};

use crate::config::{ProfilingConfig, TableConfig};
use crate::error::{EdaError, Result};
use crate::executor::{execute_guarded, QueryExecutor};
use crate::security::quote_ident;
use crate::types::{ColumnInfo, ColumnProfile, Row, TableProfile, Value};

/// Declared-type substrings that mark a numeric column.
pub const NUMERIC_TYPE_TOKENS: &[&str] = &["NUMBER", "INT", "FLOAT", "DOUBLE", "DECIMAL"];

/// Declared-type substrings that mark a date or time column.
pub const TEMPORAL_TYPE_TOKENS: &[&str] = &["DATE", "TIMESTAMP"];

fn contains_any(data_type: &str, tokens: &[&str]) -> bool {
    let upper = data_type.to_uppercase();
    tokens.iter().any(|token| upper.contains(token))
}

/// Returns true if the declared type is numeric-like.
pub fn is_numeric_type(data_type: &str) -> bool {
    contains_any(data_type, NUMERIC_TYPE_TOKENS)
}

/// Returns true if the declared type is date/time-like.
pub fn is_temporal_type(data_type: &str) -> bool {
    contains_any(data_type, TEMPORAL_TYPE_TOKENS)
}

/// Profiles every column of a table.
#[derive(Debug, Clone, Default)]
pub struct TableProfiler {
    config: ProfilingConfig,
}

impl TableProfiler {
    pub fn new(config: ProfilingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ProfilingConfig {
        &self.config
    }

    /// Profiles `columns` of `table` and fetches the sample rows.
    #[instrument(skip(self, executor, table, columns), fields(
        table = %table.table,
        columns = columns.len(),
        top_k = self.config.top_k
    ))]
    pub async fn profile_table(
        &self,
        executor: &dyn QueryExecutor,
        table: &TableConfig,
        columns: &[ColumnInfo],
    ) -> Result<(TableProfile, Vec<Row>)> {
        let start = Instant::now();
        let table_fqn = table.qualified_name()?;

        let row_count_sql = format!("SELECT COUNT(*) AS ROW_COUNT FROM {table_fqn}");
        let rows = execute_guarded(executor, &row_count_sql).await?;
        let row_count = required_count(&rows, "ROW_COUNT", &row_count_sql)?;

        let mut profiles = Vec::with_capacity(columns.len());
        for column in columns {
            profiles.push(self.profile_column(executor, &table_fqn, column).await?);
        }

        let sample_sql = format!(
            "SELECT * FROM {table_fqn} LIMIT {}",
            self.config.sample_limit
        );
        let sample_rows = execute_guarded(executor, &sample_sql).await?;

        info!(
            row_count,
            sampled = sample_rows.len(),
            time_ms = start.elapsed().as_millis() as u64,
            "Completed table profiling"
        );

        Ok((
            TableProfile {
                table_fqn,
                row_count,
                columns: profiles,
            },
            sample_rows,
        ))
    }

    /// Profiles a single column of the table referenced by `table_fqn`.
    #[instrument(skip(self, executor, table_fqn, column), fields(column = %column.name))]
    pub async fn profile_column(
        &self,
        executor: &dyn QueryExecutor,
        table_fqn: &str,
        column: &ColumnInfo,
    ) -> Result<ColumnProfile> {
        let col = quote_ident(&column.name)?;

        let counts_sql = format!(
            "SELECT COUNT(*) AS TOTAL_COUNT, COUNT({col}) AS NON_NULL_COUNT, \
             COUNT(DISTINCT {col}) AS DISTINCT_COUNT FROM {table_fqn}"
        );
        let rows = execute_guarded(executor, &counts_sql).await?;
        let total_count = required_count(&rows, "TOTAL_COUNT", &counts_sql)?;
        let non_null_count = required_count(&rows, "NON_NULL_COUNT", &counts_sql)?;
        let distinct_count = required_count(&rows, "DISTINCT_COUNT", &counts_sql)?;
        let null_count = total_count.saturating_sub(non_null_count);

        let (min_value, max_value) =
            if is_numeric_type(&column.data_type) || is_temporal_type(&column.data_type) {
                let min_max_sql = format!(
                    "SELECT MIN({col}) AS MIN_VALUE, MAX({col}) AS MAX_VALUE FROM {table_fqn}"
                );
                let rows = execute_guarded(executor, &min_max_sql).await?;
                let row = rows.first();
                let bound = |key: &str| {
                    row.and_then(|r| r.get(key))
                        .filter(|value| !value.is_null())
                        .cloned()
                };
                (bound("MIN_VALUE"), bound("MAX_VALUE"))
            } else {
                (None, None)
            };

        let top_values = self.top_values(executor, table_fqn, &col).await?;

        debug!(
            total_count,
            null_count,
            distinct_count,
            top_values = top_values.len(),
            "Profiled column"
        );

        Ok(ColumnProfile {
            name: column.name.clone(),
            data_type: column.data_type.clone(),
            total_count,
            null_count,
            distinct_count,
            min_value,
            max_value,
            top_values,
        })
    }

    async fn top_values(
        &self,
        executor: &dyn QueryExecutor,
        table_fqn: &str,
        col: &str,
    ) -> Result<Vec<(Value, u64)>> {
        let sql = format!(
            "SELECT {col} AS TOP_VALUE, COUNT(*) AS VALUE_COUNT FROM {table_fqn} \
             WHERE {col} IS NOT NULL GROUP BY {col} \
             ORDER BY VALUE_COUNT DESC, TOP_VALUE ASC LIMIT {}",
            self.config.top_k
        );
        let rows = execute_guarded(executor, &sql).await?;

        let mut top_values = rows
            .iter()
            .map(|row| {
                let value = row.get("TOP_VALUE").cloned().unwrap_or(Value::Null);
                let count = row
                    .get("VALUE_COUNT")
                    .and_then(Value::as_u64)
                    .ok_or_else(|| EdaError::execution(&sql, "Missing VALUE_COUNT"))?;
                Ok((value, count))
            })
            .collect::<Result<Vec<_>>>()?;

        // Executors that ignore LIMIT or ORDER BY must not break the invariant.
        top_values.retain(|(value, _)| !value.is_null());
        top_values.sort_by(|a, b| b.1.cmp(&a.1));
        top_values.truncate(usize::try_from(self.config.top_k).unwrap_or(usize::MAX));
        Ok(top_values)
    }
}

fn required_count(rows: &[Row], key: &str, sql: &str) -> Result<u64> {
    rows.first()
        .and_then(|row| row.get(key))
        .and_then(Value::as_u64)
        .ok_or_else(|| EdaError::execution(sql, format!("Query returned no {key}")))
}
