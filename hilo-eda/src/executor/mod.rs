//! The query executor boundary.
//!
//! The pipeline depends only on [`QueryExecutor`]; the warehouse transport
//! behind it is a collaborator. [`execute_guarded`] is the single path by
//! which pipeline stages dispatch SQL, so no statement reaches an executor
//! without passing the SQL guard first.

use async_trait::async_trait;
use std::time::Instant;
use tracing::{debug, instrument};

use crate::error::Result;
use crate::logging::truncate_field;
use crate::security::ensure_read_only;
use crate::types::Row;

mod datafusion_executor;

pub use datafusion_executor::DataFusionExecutor;

/// Maximum SQL length written to logs.
const LOGGED_SQL_LENGTH: usize = 256;

/// Runs read-only SQL against a warehouse.
///
/// The pipeline always runs the guard first. Implementations should still
/// reject non-`SELECT` statements on their own.
#[async_trait]
pub trait QueryExecutor: Send + Sync {
    /// Executes one statement and returns its rows in executor order.
    async fn execute_query(&self, sql: &str) -> Result<Vec<Row>>;

    /// Releases all resources. Calling it more than once is a no-op.
    async fn close(&self) -> Result<()>;

    /// Returns a human-readable description of this executor.
    fn description(&self) -> String {
        "query executor".to_string()
    }
}

#[async_trait]
impl<T: QueryExecutor + ?Sized> QueryExecutor for Box<T> {
    async fn execute_query(&self, sql: &str) -> Result<Vec<Row>> {
        (**self).execute_query(sql).await
    }

    async fn close(&self) -> Result<()> {
        (**self).close().await
    }

    fn description(&self) -> String {
        (**self).description()
    }
}

/// Validates `sql` with the guard, then dispatches it to `executor`.
#[instrument(skip(executor, sql), fields(sql = %truncate_field(sql, LOGGED_SQL_LENGTH)))]
pub async fn execute_guarded(executor: &dyn QueryExecutor, sql: &str) -> Result<Vec<Row>> {
    ensure_read_only(sql)?;

    let start = Instant::now();
    let rows = executor.execute_query(sql).await?;

    debug!(
        rows = rows.len(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Query completed"
    );
    Ok(rows)
}
