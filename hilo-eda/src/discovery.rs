//! Schema discovery through the catalog's `INFORMATION_SCHEMA`.

use tracing::{debug, instrument};

use crate::config::TableConfig;
use crate::error::{EdaError, Result};
use crate::executor::{execute_guarded, QueryExecutor};
use crate::security::{quote_ident, quote_literal};
use crate::types::{ColumnInfo, Value};

fn catalog_filter(table: &TableConfig) -> String {
    format!(
        "WHERE TABLE_CATALOG = {} AND TABLE_SCHEMA = {} AND TABLE_NAME = {}",
        quote_literal(&table.database),
        quote_literal(&table.schema),
        quote_literal(&table.table)
    )
}

/// Returns true iff the catalog reports exactly one table with this schema
/// and name. Names are compared as stored, case-sensitively.
#[instrument(skip(executor, table), fields(table = %table.table))]
pub async fn table_exists(executor: &dyn QueryExecutor, table: &TableConfig) -> Result<bool> {
    let sql = format!(
        "SELECT COUNT(*) AS TABLE_COUNT FROM {}.INFORMATION_SCHEMA.TABLES {}",
        quote_ident(&table.database)?,
        catalog_filter(table)
    );

    let rows = execute_guarded(executor, &sql).await?;
    let count = rows
        .first()
        .and_then(|row| row.get("TABLE_COUNT"))
        .and_then(Value::as_u64)
        .ok_or_else(|| EdaError::execution(&sql, "Catalog returned no table count"))?;

    debug!(count, "Checked table existence");
    Ok(count == 1)
}

/// Lists the table's columns in physical order.
///
/// An empty result is returned as-is; deciding that it is fatal is up to the
/// caller.
#[instrument(skip(executor, table), fields(table = %table.table))]
pub async fn fetch_columns(
    executor: &dyn QueryExecutor,
    table: &TableConfig,
) -> Result<Vec<ColumnInfo>> {
    let sql = format!(
        "SELECT COLUMN_NAME, DATA_TYPE, IS_NULLABLE FROM {}.INFORMATION_SCHEMA.COLUMNS {} \
         ORDER BY ORDINAL_POSITION",
        quote_ident(&table.database)?,
        catalog_filter(table)
    );

    let rows = execute_guarded(executor, &sql).await?;
    let columns = rows
        .iter()
        .map(|row| {
            let text = |key: &str| {
                row.get(key)
                    .filter(|value| !value.is_null())
                    .map(Value::to_string)
                    .ok_or_else(|| {
                        EdaError::execution(&sql, format!("Catalog row is missing {key}"))
                    })
            };
            Ok(ColumnInfo {
                name: text("COLUMN_NAME")?,
                data_type: text("DATA_TYPE")?,
                is_nullable: text("IS_NULLABLE")?.eq_ignore_ascii_case("YES"),
            })
        })
        .collect::<Result<Vec<_>>>()?;

    debug!(columns = columns.len(), "Fetched column metadata");
    Ok(columns)
}

/// Returns true if `name` matches a discovered column, case-insensitively.
pub fn column_in_table(columns: &[ColumnInfo], name: &str) -> bool {
    resolve_column(columns, name).is_some()
}

/// Returns the catalog spelling of `name`, matched case-insensitively.
pub fn resolve_column<'a>(columns: &'a [ColumnInfo], name: &str) -> Option<&'a str> {
    let normalized = name.trim().to_lowercase();
    columns
        .iter()
        .find(|column| column.name.to_lowercase() == normalized)
        .map(|column| column.name.as_str())
}
