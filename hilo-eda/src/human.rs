//! The human-in-the-loop checkpoint.
//!
//! After profiling and inference the pipeline pauses once and asks for column
//! roles: an identifier, a time column, a status/outcome column, columns to
//! ignore and a free-form analysis direction. Where the answers come from is
//! abstracted behind [`HumanInputSource`]; the terminal and a preset source
//! ship with the crate.
//!
//! The checkpoint can only narrow the analysis. [`HumanSelections::resolve_against`]
//! rejects role columns that are not in the discovered schema, and
//! [`apply_ignored`] only ever removes inference results.

use std::io::{BufRead, BufReader, Stdin, Stdout, Write};
use std::path::Path;

use tracing::{debug, warn};

use crate::discovery::resolve_column;
use crate::error::{EdaError, Result};
use crate::types::{ColumnInfo, HumanSelections, InferenceResult, DEFAULT_EDA_DIRECTION};

/// A source of checkpoint answers.
pub trait HumanInputSource: Send {
    /// Collects selections given the discovered column names.
    fn collect(&mut self, columns: &[String]) -> Result<HumanSelections>;
}

/// Trims an answer; blank becomes `None`.
pub fn parse_optional(value: &str) -> Option<String> {
    let cleaned = value.trim();
    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned.to_string())
    }
}

/// Splits a comma-separated answer, dropping blank items.
pub fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(String::from)
        .collect()
}

/// Drops inference results for ignored columns, keeping order.
pub fn apply_ignored(
    inferences: &[InferenceResult],
    selections: &HumanSelections,
) -> Vec<InferenceResult> {
    inferences
        .iter()
        .filter(|inference| !selections.is_ignored(&inference.column))
        .cloned()
        .collect()
}

impl HumanSelections {
    /// Canonicalises every named column against the discovered schema.
    ///
    /// Role columns (identifier, time, status) must exist; an unknown role
    /// column is a precondition failure. Unknown ignore entries are dropped
    /// with a warning since ignoring a missing column is a no-op anyway.
    pub fn resolve_against(self, columns: &[ColumnInfo]) -> Result<Self> {
        let resolve_role = |role: &str, name: Option<String>| -> Result<Option<String>> {
            match name {
                None => Ok(None),
                Some(name) => resolve_column(columns, &name)
                    .map(|canonical| Some(canonical.to_string()))
                    .ok_or_else(|| {
                        EdaError::precondition(format!(
                            "{role} column '{name}' is not a column of the table"
                        ))
                    }),
            }
        };

        let identifier = resolve_role("Identifier", self.identifier)?;
        let time_column = resolve_role("Time", self.time_column)?;
        let status_column = resolve_role("Status", self.status_column)?;

        let mut ignore_columns = Vec::with_capacity(self.ignore_columns.len());
        for name in &self.ignore_columns {
            match resolve_column(columns, name) {
                Some(canonical) => {
                    if !ignore_columns.iter().any(|c: &String| c == canonical) {
                        ignore_columns.push(canonical.to_string());
                    }
                }
                None => warn!(column = %name, "Ignoring unknown column in ignore list"),
            }
        }

        let eda_direction = if self.eda_direction.trim().is_empty() {
            DEFAULT_EDA_DIRECTION.to_string()
        } else {
            self.eda_direction
        };

        Ok(Self {
            identifier,
            time_column,
            status_column,
            ignore_columns,
            eda_direction,
        })
    }
}

/// Prompts for answers on a line-oriented reader/writer pair.
///
/// ```rust
/// use std::io::Cursor;
/// use hilo_eda::human::{HumanInputSource, TerminalInput};
///
/// let answers = "id\n\nstatus\nemail, notes\n\n";
/// let mut input = TerminalInput::new(Cursor::new(answers), Vec::new());
/// let selections = input.collect(&["id".to_string(), "status".to_string()]).unwrap();
///
/// assert_eq!(selections.identifier.as_deref(), Some("id"));
/// assert_eq!(selections.time_column, None);
/// assert_eq!(selections.ignore_columns, vec!["email", "notes"]);
/// assert_eq!(selections.eda_direction, "behavior-based exploration");
/// ```
pub struct TerminalInput<R, W> {
    reader: R,
    writer: W,
}

impl TerminalInput<BufReader<Stdin>, Stdout> {
    /// Prompts on stdout and reads answers from stdin.
    pub fn stdio() -> Self {
        Self::new(BufReader::new(std::io::stdin()), std::io::stdout())
    }
}

impl<R: BufRead, W: Write> TerminalInput<R, W> {
    pub fn new(reader: R, writer: W) -> Self {
        Self { reader, writer }
    }

    /// Consumes the source, returning the writer (useful to inspect prompts).
    pub fn into_writer(self) -> W {
        self.writer
    }

    fn prompt(&mut self, question: &str, default: &str) -> Result<String> {
        if default.is_empty() {
            write!(self.writer, "{question}: ")?;
        } else {
            write!(self.writer, "{question} [{default}]: ")?;
        }
        self.writer.flush()?;

        let mut line = String::new();
        if self.reader.read_line(&mut line)? == 0 {
            return Err(EdaError::HumanInput(format!(
                "Input closed while waiting for: {question}"
            )));
        }

        let answer = line.trim();
        Ok(if answer.is_empty() {
            default.to_string()
        } else {
            answer.to_string()
        })
    }
}

impl<R: BufRead + Send, W: Write + Send> HumanInputSource for TerminalInput<R, W> {
    fn collect(&mut self, columns: &[String]) -> Result<HumanSelections> {
        writeln!(
            self.writer,
            "\nHuman-in-the-loop checkpoint: confirm column roles."
        )?;
        writeln!(self.writer, "Available columns: {}", columns.join(", "))?;

        let identifier = parse_optional(&self.prompt("Identifier column (blank if none)", "")?);
        let time_column = parse_optional(&self.prompt("Time column (blank if none)", "")?);
        let status_column =
            parse_optional(&self.prompt("Status/outcome column (blank if none)", "")?);
        let ignore_columns = parse_list(&self.prompt("Columns to ignore (comma-separated)", "")?);
        let eda_direction = self.prompt(
            "EDA direction (e.g., quality, outcomes, relationships)",
            DEFAULT_EDA_DIRECTION,
        )?;

        Ok(HumanSelections {
            identifier,
            time_column,
            status_column,
            ignore_columns,
            eda_direction,
        })
    }
}

/// Answers supplied up front, for non-interactive runs and tests.
#[derive(Debug, Clone, Default)]
pub struct PresetInput {
    selections: HumanSelections,
}

impl PresetInput {
    pub fn new(selections: HumanSelections) -> Self {
        Self { selections }
    }

    /// Loads answers from a JSON object with the [`HumanSelections`] fields.
    /// Missing fields take their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let selections: HumanSelections = serde_json::from_str(&content).map_err(|e| {
            EdaError::HumanInput(format!(
                "Invalid answers file {}: {e}",
                path.display()
            ))
        })?;
        Ok(Self::new(selections))
    }

    pub fn selections(&self) -> &HumanSelections {
        &self.selections
    }
}

impl HumanInputSource for PresetInput {
    fn collect(&mut self, columns: &[String]) -> Result<HumanSelections> {
        debug!(columns = columns.len(), "Using preset checkpoint answers");
        Ok(self.selections.clone())
    }
}
