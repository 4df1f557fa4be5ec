//! Error types for the HILO EDA pipeline.
//!
//! Every failure in the pipeline is represented by [`EdaError`]. Failures are
//! never retried: they are surfaced to the caller with enough context (the
//! pipeline stage and, where relevant, the offending SQL) to diagnose them.

use thiserror::Error;

use crate::orchestrator::PipelineState;

/// The main error type for the EDA pipeline.
#[derive(Error, Debug)]
pub enum EdaError {
    /// A generated or supplied statement was rejected by the SQL guard.
    #[error("Unsafe SQL rejected: {reason}")]
    UnsafeSql {
        /// Why the guard rejected the statement
        reason: String,
        /// The rejected statement
        sql: String,
    },

    /// An identifier could not be quoted (for example, it was empty).
    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(String),

    /// A precondition between pipeline stages did not hold.
    #[error("Precondition failed: {0}")]
    Precondition(String),

    /// The executor failed to run a statement.
    #[error("Query execution failed: {message}")]
    Execution {
        /// The statement that failed
        sql: String,
        /// Detailed error message
        message: String,
        /// Optional underlying error
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A statement exceeded the executor's timeout.
    #[error("Query timed out after {timeout_ms}ms")]
    Timeout {
        /// The statement that timed out
        sql: String,
        /// The configured timeout
        timeout_ms: u64,
    },

    /// The executor was used after `close()`.
    #[error("Query executor is closed")]
    ExecutorClosed,

    /// Error from DataFusion operations.
    #[error("DataFusion error: {0}")]
    DataFusion(#[from] datafusion::error::DataFusionError),

    /// Error from Arrow operations.
    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    /// Error while collecting the human checkpoint answers.
    #[error("Human input error: {0}")]
    HumanInput(String),

    /// Error related to configuration.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Error from I/O operations.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Error while writing CSV exports.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Error from serialization/deserialization operations.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// A failure annotated with the pipeline stage it happened in.
    #[error("Pipeline failed after reaching {stage}: {source}")]
    Stage {
        /// The last state the pipeline reached before failing
        stage: PipelineState,
        /// The underlying failure
        #[source]
        source: Box<EdaError>,
    },
}

/// A type alias for `Result<T, EdaError>`.
pub type Result<T> = std::result::Result<T, EdaError>;

impl EdaError {
    /// Creates a new unsafe SQL error.
    pub fn unsafe_sql(reason: impl Into<String>, sql: impl Into<String>) -> Self {
        Self::UnsafeSql {
            reason: reason.into(),
            sql: sql.into(),
        }
    }

    /// Creates a new precondition error.
    pub fn precondition(message: impl Into<String>) -> Self {
        Self::Precondition(message.into())
    }

    /// Creates a new execution error.
    pub fn execution(sql: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Execution {
            sql: sql.into(),
            message: message.into(),
            source: None,
        }
    }

    /// Creates a new execution error with a source error.
    pub fn execution_with_source(
        sql: impl Into<String>,
        message: impl Into<String>,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        Self::Execution {
            sql: sql.into(),
            message: message.into(),
            source: Some(source),
        }
    }

    /// Wraps this error with the pipeline stage it happened in.
    pub fn at_stage(self, stage: PipelineState) -> Self {
        Self::Stage {
            stage,
            source: Box::new(self),
        }
    }

    /// Returns the innermost error, skipping stage annotations.
    pub fn root_cause(&self) -> &EdaError {
        match self {
            Self::Stage { source, .. } => source.root_cause(),
            other => other,
        }
    }

    /// Returns the stage annotation, if any.
    pub fn stage(&self) -> Option<PipelineState> {
        match self {
            Self::Stage { stage, .. } => Some(*stage),
            _ => None,
        }
    }

    /// Returns the SQL statement associated with this error, if any.
    pub fn sql(&self) -> Option<&str> {
        match self.root_cause() {
            Self::UnsafeSql { sql, .. }
            | Self::Execution { sql, .. }
            | Self::Timeout { sql, .. } => Some(sql),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for EdaError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
