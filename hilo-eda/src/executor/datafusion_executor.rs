//! DataFusion-backed query executor.
//!
//! Stands in for the warehouse: tables are registered in a `SessionContext`
//! whose default catalog and schema match the target table, with the
//! information schema enabled so catalog lookups work the same way they do
//! against a hosted warehouse.

use async_trait::async_trait;
use datafusion::arrow::array::{Array, ArrayRef, AsArray};
use datafusion::arrow::datatypes::{
    DataType, Date32Type, Date64Type, Decimal128Type, Float16Type, Float32Type, Float64Type,
    Int16Type, Int32Type, Int64Type, Int8Type, TimeUnit, TimestampMicrosecondType,
    TimestampMillisecondType, TimestampNanosecondType, TimestampSecondType, UInt16Type,
    UInt32Type, UInt64Type, UInt8Type,
};
use datafusion::arrow::record_batch::RecordBatch;
use datafusion::arrow::util::display::array_value_to_string;
use datafusion::execution::context::{SQLOptions, SessionConfig};
use datafusion::prelude::*;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{debug, info, instrument};

use super::QueryExecutor;
use crate::config::{TableConfig, WarehouseConfig};
use crate::error::{EdaError, Result};
use crate::security::ensure_read_only;
use crate::types::{Row, Value};

/// Query executor over an in-process DataFusion session.
///
/// # Example
///
/// ```rust,no_run
/// use hilo_eda::config::{TableConfig, WarehouseConfig};
/// use hilo_eda::executor::{DataFusionExecutor, QueryExecutor};
/// use hilo_eda::sources::TableSource;
///
/// # async fn example() -> hilo_eda::error::Result<()> {
/// let table = TableConfig::new("datafusion", "public", "orders");
/// let warehouse = WarehouseConfig::default()
///     .with_table(TableSource::new("orders", "data/orders.csv"));
///
/// let executor = DataFusionExecutor::connect(&warehouse, &table).await?;
/// let rows = executor.execute_query("SELECT COUNT(*) AS N FROM orders").await?;
/// executor.close().await?;
/// # Ok(())
/// # }
/// ```
pub struct DataFusionExecutor {
    ctx: SessionContext,
    query_timeout: Option<Duration>,
    closed: AtomicBool,
}

impl std::fmt::Debug for DataFusionExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataFusionExecutor")
            .field("query_timeout", &self.query_timeout)
            .field("closed", &self.closed.load(Ordering::SeqCst))
            .finish()
    }
}

impl DataFusionExecutor {
    /// Creates an executor whose default catalog and schema are `database`
    /// and `schema`.
    pub fn new(database: &str, schema: &str) -> Self {
        let config = SessionConfig::new()
            .with_information_schema(true)
            .with_default_catalog_and_schema(database, schema);
        Self::from_context(SessionContext::new_with_config(config))
    }

    /// Wraps an existing session. The caller is responsible for enabling the
    /// information schema if schema discovery will run against it.
    pub fn from_context(ctx: SessionContext) -> Self {
        Self {
            ctx,
            query_timeout: None,
            closed: AtomicBool::new(false),
        }
    }

    /// Creates an executor for `table` and registers the configured sources.
    #[instrument(skip(warehouse, table), fields(tables = warehouse.tables.len()))]
    pub async fn connect(warehouse: &WarehouseConfig, table: &TableConfig) -> Result<Self> {
        let mut executor = Self::new(&table.database, &table.schema);
        if let Some(timeout_ms) = warehouse.query_timeout_ms {
            executor = executor.with_query_timeout(Duration::from_millis(timeout_ms));
        }

        for source in &warehouse.tables {
            source.register(&executor.ctx).await?;
        }

        info!(
            database = %table.database,
            schema = %table.schema,
            "Connected DataFusion executor"
        );
        Ok(executor)
    }

    /// Sets a timeout applied to each statement.
    ///
    /// The deadline is only observed when the running plan yields to the
    /// runtime. CPU-bound work over in-memory batches can run past it.
    pub fn with_query_timeout(mut self, timeout: Duration) -> Self {
        self.query_timeout = Some(timeout);
        self
    }

    /// The underlying session, for registering additional tables.
    pub fn context(&self) -> &SessionContext {
        &self.ctx
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    async fn run(&self, sql: &str) -> Result<Vec<RecordBatch>> {
        let options = SQLOptions::new()
            .with_allow_ddl(false)
            .with_allow_dml(false)
            .with_allow_statements(false);

        let df = self
            .ctx
            .sql_with_options(sql, options)
            .await
            .map_err(|e| EdaError::execution_with_source(sql, e.to_string(), Box::new(e)))?;
        df.collect()
            .await
            .map_err(|e| EdaError::execution_with_source(sql, e.to_string(), Box::new(e)))
    }
}

#[async_trait]
impl QueryExecutor for DataFusionExecutor {
    async fn execute_query(&self, sql: &str) -> Result<Vec<Row>> {
        if self.is_closed() {
            return Err(EdaError::ExecutorClosed);
        }
        ensure_read_only(sql)?;

        let batches = match self.query_timeout {
            Some(timeout) => tokio::time::timeout(timeout, self.run(sql))
                .await
                .map_err(|_| EdaError::Timeout {
                    sql: sql.to_string(),
                    timeout_ms: timeout.as_millis() as u64,
                })??,
            None => self.run(sql).await?,
        };

        batches_to_rows(&batches)
    }

    async fn close(&self) -> Result<()> {
        if !self.closed.swap(true, Ordering::SeqCst) {
            debug!("Closed DataFusion executor");
        }
        Ok(())
    }

    fn description(&self) -> String {
        let options = self.ctx.copied_config();
        let catalog = &options.options().catalog;
        format!(
            "DataFusion session ({}.{})",
            catalog.default_catalog, catalog.default_schema
        )
    }
}

/// Converts record batches into typed rows, keeping column order.
pub(crate) fn batches_to_rows(batches: &[RecordBatch]) -> Result<Vec<Row>> {
    let mut rows = Vec::with_capacity(batches.iter().map(RecordBatch::num_rows).sum());

    for batch in batches {
        let schema = batch.schema();
        for row_idx in 0..batch.num_rows() {
            let mut row = Row::new();
            for (field, column) in schema.fields().iter().zip(batch.columns()) {
                row.insert(field.name().clone(), array_value(column, row_idx)?);
            }
            rows.push(row);
        }
    }

    Ok(rows)
}

fn array_value(array: &ArrayRef, row: usize) -> Result<Value> {
    if array.is_null(row) {
        return Ok(Value::Null);
    }

    let value = match array.data_type() {
        DataType::Boolean => Value::Boolean(array.as_boolean().value(row)),
        DataType::Int8 => Value::Integer(array.as_primitive::<Int8Type>().value(row).into()),
        DataType::Int16 => Value::Integer(array.as_primitive::<Int16Type>().value(row).into()),
        DataType::Int32 => Value::Integer(array.as_primitive::<Int32Type>().value(row).into()),
        DataType::Int64 => Value::Integer(array.as_primitive::<Int64Type>().value(row)),
        DataType::UInt8 => Value::Integer(array.as_primitive::<UInt8Type>().value(row).into()),
        DataType::UInt16 => Value::Integer(array.as_primitive::<UInt16Type>().value(row).into()),
        DataType::UInt32 => Value::Integer(array.as_primitive::<UInt32Type>().value(row).into()),
        DataType::UInt64 => {
            let v = array.as_primitive::<UInt64Type>().value(row);
            i64::try_from(v)
                .map(Value::Integer)
                .unwrap_or(Value::Float(v as f64))
        }
        DataType::Float16 => Value::Float(array.as_primitive::<Float16Type>().value(row).to_f64()),
        DataType::Float32 => Value::Float(array.as_primitive::<Float32Type>().value(row).into()),
        DataType::Float64 => Value::Float(array.as_primitive::<Float64Type>().value(row)),
        DataType::Decimal128(_, scale) => {
            let raw = array.as_primitive::<Decimal128Type>().value(row);
            Value::Float(raw as f64 / 10f64.powi(i32::from(*scale)))
        }
        DataType::Utf8 => Value::String(array.as_string::<i32>().value(row).to_string()),
        DataType::LargeUtf8 => Value::String(array.as_string::<i64>().value(row).to_string()),
        DataType::Utf8View => Value::String(array.as_string_view().value(row).to_string()),
        DataType::Date32 => datetime_or_text(
            array,
            row,
            array.as_primitive::<Date32Type>().value_as_datetime(row),
        )?,
        DataType::Date64 => datetime_or_text(
            array,
            row,
            array.as_primitive::<Date64Type>().value_as_datetime(row),
        )?,
        DataType::Timestamp(unit, _) => {
            let datetime = match unit {
                TimeUnit::Second => array
                    .as_primitive::<TimestampSecondType>()
                    .value_as_datetime(row),
                TimeUnit::Millisecond => array
                    .as_primitive::<TimestampMillisecondType>()
                    .value_as_datetime(row),
                TimeUnit::Microsecond => array
                    .as_primitive::<TimestampMicrosecondType>()
                    .value_as_datetime(row),
                TimeUnit::Nanosecond => array
                    .as_primitive::<TimestampNanosecondType>()
                    .value_as_datetime(row),
            };
            datetime_or_text(array, row, datetime)?
        }
        _ => Value::String(array_value_to_string(array, row)?),
    };

    Ok(value)
}

fn datetime_or_text(
    array: &ArrayRef,
    row: usize,
    datetime: Option<chrono::NaiveDateTime>,
) -> Result<Value> {
    match datetime {
        Some(ts) => Ok(Value::Timestamp(ts)),
        None => Ok(Value::String(array_value_to_string(array, row)?)),
    }
}
