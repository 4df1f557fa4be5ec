//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use arrow::array::{ArrayRef, Int64Array, StringArray, TimestampMillisecondArray};
use arrow::datatypes::{DataType, Field, Schema, TimeUnit};
use arrow::record_batch::RecordBatch;
use async_trait::async_trait;
use datafusion::datasource::MemTable;

use hilo_eda::config::TableConfig;
use hilo_eda::error::Result;
use hilo_eda::executor::{DataFusionExecutor, QueryExecutor};
use hilo_eda::types::Row;

pub const DATABASE: &str = "warehouse";
pub const SCHEMA: &str = "analytics";

pub fn table_config(table: &str) -> TableConfig {
    TableConfig::new(DATABASE, SCHEMA, table)
}

/// `orders(id, status, created_at)` with `rows` rows: `id` is all-distinct,
/// `status` alternates between two values, `created_at` advances a minute
/// per row.
pub fn orders_batch(rows: usize) -> RecordBatch {
    let schema = Arc::new(Schema::new(vec![
        Field::new("id", DataType::Int64, false),
        Field::new("status", DataType::Utf8, true),
        Field::new(
            "created_at",
            DataType::Timestamp(TimeUnit::Millisecond, None),
            true,
        ),
    ]));

    let base_ms: i64 = 1_700_000_000_000;
    let ids: Vec<i64> = (1..=rows as i64).collect();
    let statuses: Vec<&str> = (0..rows)
        .map(|i| if i % 2 == 0 { "OPEN" } else { "CLOSED" })
        .collect();
    let created: Vec<i64> = (0..rows as i64).map(|i| base_ms + i * 60_000).collect();

    RecordBatch::try_new(
        schema,
        vec![
            Arc::new(Int64Array::from(ids)) as ArrayRef,
            Arc::new(StringArray::from(statuses)) as ArrayRef,
            Arc::new(TimestampMillisecondArray::from(created)) as ArrayRef,
        ],
    )
    .unwrap()
}

/// An executor with `batch` registered as `name` in the default schema.
pub fn executor_with(name: &str, batch: RecordBatch) -> DataFusionExecutor {
    let executor = DataFusionExecutor::new(DATABASE, SCHEMA);
    let table = MemTable::try_new(batch.schema(), vec![vec![batch]]).unwrap();
    executor
        .context()
        .register_table(name, Arc::new(table))
        .unwrap();
    executor
}

/// Lets a test keep a handle on an executor the pipeline takes ownership of.
#[derive(Clone)]
pub struct SharedExecutor(pub Arc<DataFusionExecutor>);

#[async_trait]
impl QueryExecutor for SharedExecutor {
    async fn execute_query(&self, sql: &str) -> Result<Vec<Row>> {
        self.0.execute_query(sql).await
    }

    async fn close(&self) -> Result<()> {
        self.0.close().await
    }
}

/// Returns canned rows for any statement containing a key, and records every
/// statement it receives.
#[derive(Clone, Default)]
pub struct RecordingExecutor {
    responses: Vec<(&'static str, Vec<Row>)>,
    pub received: Arc<Mutex<Vec<String>>>,
    pub closed: Arc<AtomicBool>,
}

impl RecordingExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(mut self, key: &'static str, rows: Vec<Row>) -> Self {
        self.responses.push((key, rows));
        self
    }

    pub fn received(&self) -> Vec<String> {
        self.received.lock().unwrap().clone()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl QueryExecutor for RecordingExecutor {
    async fn execute_query(&self, sql: &str) -> Result<Vec<Row>> {
        self.received.lock().unwrap().push(sql.to_string());
        Ok(self
            .responses
            .iter()
            .find(|(key, _)| sql.contains(key))
            .map(|(_, rows)| rows.clone())
            .unwrap_or_default())
    }

    async fn close(&self) -> Result<()> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}
