//! Run configuration.
//!
//! All configuration is passed into the pipeline explicitly at construction
//! time; nothing is read from the working directory or the environment.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{EdaError, Result};
use crate::security::qualify_table;
use crate::sources::TableSource;

/// Default number of rows fetched for the sample export.
pub const DEFAULT_SAMPLE_LIMIT: u64 = 50;

/// Default number of most frequent values kept per column.
pub const DEFAULT_TOP_K: u64 = 5;

/// The table under analysis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableConfig {
    pub database: String,
    pub schema: String,
    pub table: String,
}

impl TableConfig {
    pub fn new(
        database: impl Into<String>,
        schema: impl Into<String>,
        table: impl Into<String>,
    ) -> Self {
        Self {
            database: database.into(),
            schema: schema.into(),
            table: table.into(),
        }
    }

    /// Fully quoted `database.schema.table` reference.
    pub fn qualified_name(&self) -> Result<String> {
        qualify_table(&self.database, &self.schema, &self.table)
    }
}

/// Profiling parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfilingConfig {
    /// Rows fetched once for the sample export
    #[serde(default = "default_sample_limit")]
    pub sample_limit: u64,
    /// Most frequent values kept per column
    #[serde(default = "default_top_k")]
    pub top_k: u64,
}

fn default_sample_limit() -> u64 {
    DEFAULT_SAMPLE_LIMIT
}

fn default_top_k() -> u64 {
    DEFAULT_TOP_K
}

impl Default for ProfilingConfig {
    fn default() -> Self {
        Self {
            sample_limit: DEFAULT_SAMPLE_LIMIT,
            top_k: DEFAULT_TOP_K,
        }
    }
}

impl ProfilingConfig {
    /// Sets the sample row limit.
    pub fn with_sample_limit(mut self, limit: u64) -> Self {
        self.sample_limit = limit;
        self
    }

    /// Sets the number of top values kept per column.
    pub fn with_top_k(mut self, top_k: u64) -> Self {
        self.top_k = top_k;
        self
    }
}

/// Where and how the report is written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputConfig {
    pub output_dir: PathBuf,
    /// Also write `column_profiles.csv` and `sample_rows.csv`
    #[serde(default = "default_write_csv")]
    pub write_csv: bool,
    /// Also write the whole run as `eda_report.json`
    #[serde(default)]
    pub write_json: bool,
}

fn default_write_csv() -> bool {
    true
}

impl OutputConfig {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            write_csv: true,
            write_json: false,
        }
    }

    /// Sets whether CSV exports are written.
    pub fn with_csv(mut self, write_csv: bool) -> Self {
        self.write_csv = write_csv;
        self
    }

    /// Sets whether the JSON export is written.
    pub fn with_json(mut self, write_json: bool) -> Self {
        self.write_json = write_json;
        self
    }
}

/// Connection parameters for the in-process DataFusion warehouse.
///
/// Tables are registered under the target database and schema of the
/// [`TableConfig`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WarehouseConfig {
    /// Files to expose as tables
    #[serde(default)]
    pub tables: Vec<TableSource>,
    /// Optional per-query timeout in milliseconds
    #[serde(default)]
    pub query_timeout_ms: Option<u64>,
}

impl WarehouseConfig {
    /// Adds a file-backed table.
    pub fn with_table(mut self, source: TableSource) -> Self {
        self.tables.push(source);
        self
    }

    /// Sets the per-query timeout.
    pub fn with_query_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.query_timeout_ms = Some(timeout_ms);
        self
    }
}

/// Complete configuration for one pipeline run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdaConfig {
    #[serde(default)]
    pub warehouse: WarehouseConfig,
    pub table: TableConfig,
    #[serde(default)]
    pub profiling: ProfilingConfig,
    pub output: OutputConfig,
}

impl EdaConfig {
    /// Creates a builder for the given target table.
    pub fn builder(table: TableConfig) -> EdaConfigBuilder {
        EdaConfigBuilder {
            warehouse: WarehouseConfig::default(),
            table,
            profiling: ProfilingConfig::default(),
            output: OutputConfig::new("eda_output"),
        }
    }

    /// Loads a configuration from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            EdaError::Configuration(format!("Cannot read {}: {e}", path.display()))
        })?;
        let config: Self = serde_json::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks that the target table is fully specified.
    pub fn validate(&self) -> Result<()> {
        for (field, value) in [
            ("database", &self.table.database),
            ("schema", &self.table.schema),
            ("table", &self.table.table),
        ] {
            if value.trim().is_empty() {
                return Err(EdaError::Configuration(format!(
                    "Target {field} name cannot be empty"
                )));
            }
        }
        Ok(())
    }
}

/// Builder for [`EdaConfig`].
#[derive(Debug, Clone)]
pub struct EdaConfigBuilder {
    warehouse: WarehouseConfig,
    table: TableConfig,
    profiling: ProfilingConfig,
    output: OutputConfig,
}

impl EdaConfigBuilder {
    pub fn warehouse(mut self, warehouse: WarehouseConfig) -> Self {
        self.warehouse = warehouse;
        self
    }

    pub fn profiling(mut self, profiling: ProfilingConfig) -> Self {
        self.profiling = profiling;
        self
    }

    pub fn sample_limit(mut self, limit: u64) -> Self {
        self.profiling.sample_limit = limit;
        self
    }

    pub fn top_k(mut self, top_k: u64) -> Self {
        self.profiling.top_k = top_k;
        self
    }

    pub fn output(mut self, output: OutputConfig) -> Self {
        self.output = output;
        self
    }

    /// Builds and validates the configuration.
    pub fn build(self) -> Result<EdaConfig> {
        let config = EdaConfig {
            warehouse: self.warehouse,
            table: self.table,
            profiling: self.profiling,
            output: self.output,
        };
        config.validate()?;
        Ok(config)
    }
}
