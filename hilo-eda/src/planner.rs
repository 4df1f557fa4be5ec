//! Deterministic follow-up query planning.
//!
//! The planner turns the human-filtered inference results into a short,
//! bounded list of read-only analytical queries. It never executes anything;
//! the orchestrator runs each planned query through the guard.

use serde::Serialize;
use tracing::debug;

use crate::config::TableConfig;
use crate::error::Result;
use crate::security::quote_ident;
use crate::types::InferenceResult;

/// Numeric columns that receive a summary query.
pub const MAX_NUMERIC_SUMMARIES: usize = 3;

/// Categorical columns that receive a top-values query.
pub const MAX_CATEGORICAL_SUMMARIES: usize = 3;

/// Rows returned by each top-values query.
pub const TOP_VALUES_LIMIT: usize = 10;

/// Upper bound on the number of planned queries.
pub const MAX_PLANNED_QUERIES: usize = MAX_NUMERIC_SUMMARIES + MAX_CATEGORICAL_SUMMARIES + 2;

/// A titled query awaiting execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedQuery {
    pub title: String,
    pub sql: String,
}

impl PlannedQuery {
    fn new(title: impl Into<String>, sql: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            sql: sql.into(),
        }
    }
}

/// Columns grouped by the role the planner cares about, in inference order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnRoles {
    pub numeric: Vec<String>,
    pub categorical: Vec<String>,
}

impl ColumnRoles {
    pub fn from_inferences(inferences: &[InferenceResult]) -> Self {
        let pick = |keep: fn(&InferenceResult) -> bool| {
            inferences
                .iter()
                .filter(|inference| keep(inference))
                .map(|inference| inference.column.clone())
                .collect::<Vec<_>>()
        };

        Self {
            numeric: pick(|inference| inference.behavior_class.is_numeric()),
            categorical: pick(|inference| inference.behavior_class.is_categorical()),
        }
    }
}

/// Builds the follow-up queries for `table`.
///
/// In order: a summary for each of the first three numeric columns, a
/// top-values breakdown for each of the first three categorical columns (the
/// null group, if any, sorted after every value), a
/// range query for the time column, and a correlation between the first two
/// numeric columns. Every identifier is quoted.
///
/// ```rust
/// use hilo_eda::config::TableConfig;
/// use hilo_eda::planner::build_eda_queries;
///
/// let table = TableConfig::new("DB", "PUBLIC", "ORDERS");
/// let queries = build_eda_queries(
///     &table,
///     &["amount".to_string(), "qty".to_string()],
///     &[],
///     Some("created_at"),
/// )
/// .unwrap();
///
/// let titles: Vec<_> = queries.iter().map(|q| q.title.as_str()).collect();
/// assert_eq!(
///     titles,
///     vec![
///         "Summary stats for amount",
///         "Summary stats for qty",
///         "Recent range for created_at",
///         "Correlation amount vs qty",
///     ]
/// );
/// ```
pub fn build_eda_queries(
    table: &TableConfig,
    numeric_columns: &[String],
    categorical_columns: &[String],
    time_column: Option<&str>,
) -> Result<Vec<PlannedQuery>> {
    let table_fqn = table.qualified_name()?;
    let mut queries = Vec::new();

    for column in numeric_columns.iter().take(MAX_NUMERIC_SUMMARIES) {
        let col = quote_ident(column)?;
        queries.push(PlannedQuery::new(
            format!("Summary stats for {column}"),
            format!(
                "SELECT MIN({col}) AS MIN_VALUE, MAX({col}) AS MAX_VALUE, \
                 AVG({col}) AS AVG_VALUE, STDDEV({col}) AS STDDEV_VALUE FROM {table_fqn}"
            ),
        ));
    }

    for column in categorical_columns.iter().take(MAX_CATEGORICAL_SUMMARIES) {
        let col = quote_ident(column)?;
        queries.push(PlannedQuery::new(
            format!("Top values for {column}"),
            format!(
                "SELECT {col} AS TOP_VALUE, COUNT(*) AS VALUE_COUNT FROM {table_fqn} \
                 GROUP BY {col} ORDER BY {col} IS NULL, VALUE_COUNT DESC, TOP_VALUE ASC \
                 LIMIT {TOP_VALUES_LIMIT}"
            ),
        ));
    }

    if let Some(time_column) = time_column {
        let col = quote_ident(time_column)?;
        queries.push(PlannedQuery::new(
            format!("Recent range for {time_column}"),
            format!("SELECT MIN({col}) AS MIN_TS, MAX({col}) AS MAX_TS FROM {table_fqn}"),
        ));
    }

    if let [first, second, ..] = numeric_columns {
        let col_a = quote_ident(first)?;
        let col_b = quote_ident(second)?;
        queries.push(PlannedQuery::new(
            format!("Correlation {first} vs {second}"),
            format!("SELECT CORR({col_a}, {col_b}) AS CORR_VALUE FROM {table_fqn}"),
        ));
    }

    debug!(planned = queries.len(), "Planned follow-up queries");
    Ok(queries)
}
