//! Report rendering and export.
//!
//! A finished run is collected into a [`ReportBundle`] and handed to a
//! [`ReportSink`]. [`FileReportSink`] writes:
//!
//! - `eda_report.md`, the human-readable report;
//! - `column_profiles.csv` and `sample_rows.csv` when CSV export is enabled;
//! - `eda_report.json`, the whole bundle, when JSON export is enabled.

use std::fmt::{self, Write as _};
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{info, instrument};

use crate::error::{EdaError, Result};
use crate::types::{EdaQueryResult, HumanSelections, InferenceResult, Row, TableProfile};

pub const MARKDOWN_REPORT_FILE: &str = "eda_report.md";
pub const COLUMN_PROFILES_FILE: &str = "column_profiles.csv";
pub const SAMPLE_ROWS_FILE: &str = "sample_rows.csv";
pub const JSON_REPORT_FILE: &str = "eda_report.json";

/// Result rows shown per query in the Markdown report.
pub const MAX_RENDERED_ROWS: usize = 20;

const COLUMN_PROFILE_HEADERS: [&str; 8] = [
    "name",
    "data_type",
    "total_count",
    "null_count",
    "null_pct",
    "distinct_count",
    "min_value",
    "max_value",
];

/// Everything a report is rendered from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportBundle {
    pub table_profile: TableProfile,
    /// All inference results, including columns the human chose to ignore.
    pub inferences: Vec<InferenceResult>,
    pub selections: HumanSelections,
    pub executed_queries: Vec<EdaQueryResult>,
    pub sample_rows: Vec<Row>,
}

/// Paths written by a sink.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReportArtifacts {
    pub markdown: Option<PathBuf>,
    pub column_profiles: Option<PathBuf>,
    pub sample_rows: Option<PathBuf>,
    pub json: Option<PathBuf>,
}

impl ReportArtifacts {
    /// Every written path, Markdown first.
    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        [
            &self.markdown,
            &self.column_profiles,
            &self.sample_rows,
            &self.json,
        ]
        .into_iter()
        .filter_map(|path| path.as_deref())
    }
}

/// Destination of a finished report.
pub trait ReportSink: Send + Sync {
    fn write(&self, bundle: &ReportBundle, output_dir: &Path) -> Result<ReportArtifacts>;
}

/// Writes the report files into a directory, creating it if needed.
#[derive(Debug, Clone)]
pub struct FileReportSink {
    write_csv: bool,
    write_json: bool,
}

impl Default for FileReportSink {
    fn default() -> Self {
        Self {
            write_csv: true,
            write_json: false,
        }
    }
}

impl FileReportSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_csv(mut self, enabled: bool) -> Self {
        self.write_csv = enabled;
        self
    }

    pub fn with_json(mut self, enabled: bool) -> Self {
        self.write_json = enabled;
        self
    }
}

impl ReportSink for FileReportSink {
    #[instrument(skip(self, bundle), fields(output_dir = %output_dir.display()))]
    fn write(&self, bundle: &ReportBundle, output_dir: &Path) -> Result<ReportArtifacts> {
        std::fs::create_dir_all(output_dir)?;

        let mut artifacts = ReportArtifacts::default();

        let markdown_path = output_dir.join(MARKDOWN_REPORT_FILE);
        std::fs::write(&markdown_path, render_markdown(bundle)?)?;
        artifacts.markdown = Some(markdown_path);

        if self.write_csv {
            let profiles_path = output_dir.join(COLUMN_PROFILES_FILE);
            write_column_profiles(&profiles_path, &bundle.table_profile)?;
            artifacts.column_profiles = Some(profiles_path);

            if !bundle.sample_rows.is_empty() {
                let sample_path = output_dir.join(SAMPLE_ROWS_FILE);
                write_sample_rows(&sample_path, &bundle.sample_rows)?;
                artifacts.sample_rows = Some(sample_path);
            }
        }

        if self.write_json {
            let json_path = output_dir.join(JSON_REPORT_FILE);
            std::fs::write(&json_path, serde_json::to_string_pretty(bundle)?)?;
            artifacts.json = Some(json_path);
        }

        info!(files = artifacts.paths().count(), "Report written");
        Ok(artifacts)
    }
}

/// Renders the Markdown report.
pub fn render_markdown(bundle: &ReportBundle) -> Result<String> {
    let mut output = String::new();
    write_markdown(&mut output, bundle)
        .map_err(|e| EdaError::Serialization(format!("Failed to render report: {e}")))?;
    Ok(output)
}

fn write_markdown(output: &mut String, bundle: &ReportBundle) -> fmt::Result {
    let profile = &bundle.table_profile;
    let human = &bundle.selections;
    let or_none = |value: &Option<String>| value.clone().unwrap_or_else(|| "None".to_string());

    writeln!(output, "# EDA Report: {}", profile.table_fqn)?;
    writeln!(output)?;
    writeln!(output, "Rows: {}", profile.row_count)?;
    writeln!(output)?;

    writeln!(output, "## Assumptions")?;
    writeln!(output)?;
    writeln!(output, "- Identifier: {}", or_none(&human.identifier))?;
    writeln!(output, "- Time column: {}", or_none(&human.time_column))?;
    writeln!(output, "- Status column: {}", or_none(&human.status_column))?;
    let ignored = if human.ignore_columns.is_empty() {
        "None".to_string()
    } else {
        human.ignore_columns.join(", ")
    };
    writeln!(output, "- Ignored columns: {ignored}")?;
    writeln!(output, "- EDA direction: {}", human.eda_direction)?;
    writeln!(output)?;

    writeln!(output, "## Column Profiles")?;
    writeln!(output)?;
    for column in &profile.columns {
        writeln!(
            output,
            "- **{}** ({}): null % {:.2}%, distinct {}",
            column.name,
            column.data_type,
            column.null_pct() * 100.0,
            column.distinct_count
        )?;
    }
    writeln!(output)?;

    writeln!(output, "## Behavioral Inference")?;
    writeln!(output)?;
    for inference in &bundle.inferences {
        writeln!(
            output,
            "- **{}**: {} (confidence {:.2}) - {}",
            inference.column, inference.behavior_class, inference.confidence, inference.rationale
        )?;
    }
    writeln!(output)?;

    writeln!(output, "## SQL Executed")?;
    for result in &bundle.executed_queries {
        writeln!(output)?;
        writeln!(output, "### {}", result.title)?;
        writeln!(output)?;
        writeln!(output, "```sql")?;
        writeln!(output, "{}", result.sql)?;
        writeln!(output, "```")?;
        writeln!(output)?;
        writeln!(output, "Rows returned: {}", result.rows.len())?;
        if !result.rows.is_empty() {
            writeln!(output)?;
            write_rows_table(output, &result.rows)?;
        }
    }

    Ok(())
}

fn write_rows_table(output: &mut String, rows: &[Row]) -> fmt::Result {
    let Some(first) = rows.first() else {
        return Ok(());
    };
    let columns: Vec<&str> = first.columns().collect();

    writeln!(output, "| {} |", columns.join(" | "))?;
    writeln!(output, "|{}", "---|".repeat(columns.len()))?;
    for row in rows.iter().take(MAX_RENDERED_ROWS) {
        let cells: Vec<String> = columns
            .iter()
            .map(|column| {
                row.get(column)
                    .map(|value| value.to_string().replace('|', "\\|"))
                    .unwrap_or_default()
            })
            .collect();
        writeln!(output, "| {} |", cells.join(" | "))?;
    }
    if rows.len() > MAX_RENDERED_ROWS {
        writeln!(output)?;
        writeln!(output, "_{} more rows not shown_", rows.len() - MAX_RENDERED_ROWS)?;
    }
    Ok(())
}

/// Writes one line per column profile.
pub fn write_column_profiles(path: &Path, profile: &TableProfile) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(COLUMN_PROFILE_HEADERS)?;

    for column in &profile.columns {
        let optional = |value: &Option<crate::types::Value>| {
            value
                .as_ref()
                .map(|v| v.to_csv_field())
                .unwrap_or_default()
        };
        writer.write_record([
            column.name.clone(),
            column.data_type.clone(),
            column.total_count.to_string(),
            column.null_count.to_string(),
            format!("{:.4}", column.null_pct()),
            column.distinct_count.to_string(),
            optional(&column.min_value),
            optional(&column.max_value),
        ])?;
    }

    writer.flush()?;
    Ok(())
}

/// Writes the sample rows, using the first row's columns as the header.
pub fn write_sample_rows(path: &Path, rows: &[Row]) -> Result<()> {
    let Some(first) = rows.first() else {
        return Ok(());
    };
    let headers: Vec<&str> = first.columns().collect();

    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(&headers)?;
    for row in rows {
        writer.write_record(headers.iter().map(|column| {
            row.get(column)
                .map(|value| value.to_csv_field())
                .unwrap_or_default()
        }))?;
    }

    writer.flush()?;
    Ok(())
}
