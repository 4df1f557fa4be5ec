//! File-backed tables for the in-process DataFusion warehouse.

use datafusion::common::TableReference;
use datafusion::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{info, instrument};

use crate::error::{EdaError, Result};

/// Supported file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceFormat {
    Csv,
    Parquet,
    /// Newline-delimited JSON
    Json,
}

impl SourceFormat {
    /// Detects the format from the file extension.
    pub fn from_path(path: &str) -> Option<Self> {
        let lower = path.to_lowercase();
        if lower.ends_with(".csv") || lower.ends_with(".tsv") {
            Some(Self::Csv)
        } else if lower.ends_with(".parquet") || lower.ends_with(".pq") {
            Some(Self::Parquet)
        } else if lower.ends_with(".json") || lower.ends_with(".ndjson") || lower.ends_with(".jsonl")
        {
            Some(Self::Json)
        } else {
            None
        }
    }
}

/// A file exposed as a table in the warehouse.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSource {
    /// Table name, registered case-sensitively
    pub name: String,
    pub path: PathBuf,
    /// Explicit format; detected from the extension when absent
    #[serde(default)]
    pub format: Option<SourceFormat>,
}

impl TableSource {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            format: None,
        }
    }

    /// Overrides extension-based format detection.
    pub fn with_format(mut self, format: SourceFormat) -> Self {
        self.format = Some(format);
        self
    }

    fn resolve_format(&self) -> Result<SourceFormat> {
        self.format
            .or_else(|| SourceFormat::from_path(&self.path.to_string_lossy()))
            .ok_or_else(|| {
                EdaError::Configuration(format!(
                    "Cannot detect file format of {}; set it explicitly",
                    self.path.display()
                ))
            })
    }

    /// Registers the file in the context's default catalog and schema.
    #[instrument(skip(self, ctx), fields(table = %self.name, path = %self.path.display()))]
    pub async fn register(&self, ctx: &SessionContext) -> Result<()> {
        let format = self.resolve_format()?;
        let path = self.path.to_string_lossy().to_string();
        let table_ref = TableReference::bare(self.name.clone());
        // Listing tables filter by extension; use the file's own.
        let extension = self
            .path
            .extension()
            .map(|ext| format!(".{}", ext.to_string_lossy()))
            .unwrap_or_default();

        match format {
            SourceFormat::Csv => {
                let delimiter = if extension.eq_ignore_ascii_case(".tsv") {
                    b'\t'
                } else {
                    b','
                };
                let options = CsvReadOptions::new()
                    .has_header(true)
                    .delimiter(delimiter)
                    .file_extension(&extension);
                ctx.register_csv(table_ref, &path, options).await?;
            }
            SourceFormat::Parquet => {
                let options = ParquetReadOptions {
                    file_extension: &extension,
                    ..Default::default()
                };
                ctx.register_parquet(table_ref, &path, options).await?;
            }
            SourceFormat::Json => {
                let options = NdJsonReadOptions::default().file_extension(&extension);
                ctx.register_json(table_ref, &path, options).await?;
            }
        }

        info!(format = ?format, "Registered table source");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_format_detection() {
        assert_eq!(SourceFormat::from_path("a/b.CSV"), Some(SourceFormat::Csv));
        assert_eq!(SourceFormat::from_path("b.tsv"), Some(SourceFormat::Csv));
        assert_eq!(
            SourceFormat::from_path("b.parquet"),
            Some(SourceFormat::Parquet)
        );
        assert_eq!(SourceFormat::from_path("b.jsonl"), Some(SourceFormat::Json));
        assert_eq!(SourceFormat::from_path("b.xlsx"), None);
    }

    #[tokio::test]
    async fn test_unknown_format_is_configuration_error() {
        let ctx = SessionContext::new();
        let result = TableSource::new("t", "data.bin").register(&ctx).await;
        assert!(matches!(result, Err(EdaError::Configuration(_))));
    }

    #[tokio::test]
    async fn test_register_csv_keeps_table_name_case() {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        writeln!(file, "id,status").unwrap();
        writeln!(file, "1,open").unwrap();
        writeln!(file, "2,closed").unwrap();

        let ctx = SessionContext::new();
        TableSource::new("Orders", file.path())
            .register(&ctx)
            .await
            .unwrap();

        let batches = ctx
            .sql("SELECT COUNT(*) FROM \"Orders\"")
            .await
            .unwrap()
            .collect()
            .await
            .unwrap();
        assert_eq!(batches[0].num_rows(), 1);
    }
}
