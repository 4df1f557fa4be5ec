//! Data model shared by every pipeline stage.
//!
//! Values in this module are created once per run and handed forward; no
//! stage mutates the output of a previous one.

use chrono::NaiveDateTime;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A typed scalar returned by a query executor.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    /// SQL `NULL`.
    Null,
    /// Any integer column, widened to `i64`.
    Integer(i64),
    /// Any floating point or decimal column, widened to `f64`.
    Float(f64),
    /// Text.
    String(String),
    /// Boolean.
    Boolean(bool),
    /// Dates and timestamps, without time zone.
    Timestamp(NaiveDateTime),
}

impl Value {
    /// Returns true for [`Value::Null`].
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Attempts to get the value as i64.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(v) => Some(*v),
            Value::Float(v) if v.fract() == 0.0 => Some(*v as i64),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Attempts to get the value as a non-negative count.
    pub fn as_u64(&self) -> Option<u64> {
        self.as_i64().and_then(|v| u64::try_from(v).ok())
    }

    /// Attempts to get the numeric value as f64.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Integer(v) => Some(*v as f64),
            Value::Float(v) => Some(*v),
            _ => None,
        }
    }

    /// Attempts to get the value as a string slice.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Renders the value for a CSV cell; `NULL` becomes an empty cell.
    pub fn to_csv_field(&self) -> String {
        match self {
            Value::Null => String::new(),
            other => other.to_string(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Integer(v) => write!(f, "{v}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::String(s) => write!(f, "{s}"),
            Value::Boolean(b) => write!(f, "{b}"),
            Value::Timestamp(ts) => write!(f, "{ts}"),
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Integer(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Boolean(v)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(v: NaiveDateTime) -> Self {
        Value::Timestamp(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}

/// One result row: an ordered mapping from column name to value.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Row(IndexMap<String, Value>);

impl Row {
    /// Creates an empty row.
    pub fn new() -> Self {
        Self(IndexMap::new())
    }

    /// Appends a column, keeping insertion order.
    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(column.into(), value.into());
    }

    /// Builder-style variant of [`Row::insert`].
    pub fn with(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(column, value);
        self
    }

    /// Looks up a column by exact name, then ASCII case-insensitively.
    ///
    /// Warehouses disagree on whether unquoted aliases are upper- or
    /// lower-cased, so callers always ask for the spelling they wrote.
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.0.get(column).or_else(|| {
            self.0
                .iter()
                .find(|(name, _)| name.eq_ignore_ascii_case(column))
                .map(|(_, value)| value)
        })
    }

    /// Column names in executor order.
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Iterates over `(column, value)` pairs in executor order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of columns in the row.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if the row has no columns.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Row {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// Column metadata reported by the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnInfo {
    pub name: String,
    pub data_type: String,
    pub is_nullable: bool,
}

/// Per-column statistics produced by the profiler.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnProfile {
    pub name: String,
    pub data_type: String,
    pub total_count: u64,
    pub null_count: u64,
    pub distinct_count: u64,
    pub min_value: Option<Value>,
    pub max_value: Option<Value>,
    /// Most frequent values, sorted by count descending.
    pub top_values: Vec<(Value, u64)>,
}

impl ColumnProfile {
    /// Fraction of null values; 0 for an empty column.
    pub fn null_pct(&self) -> f64 {
        if self.total_count == 0 {
            0.0
        } else {
            self.null_count as f64 / self.total_count as f64
        }
    }
}

/// All column profiles of one table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableProfile {
    /// Fully quoted `database.schema.table` reference.
    pub table_fqn: String,
    pub row_count: u64,
    pub columns: Vec<ColumnProfile>,
}

/// The inferred semantic role of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BehaviorClass {
    #[serde(rename = "semi-structured")]
    SemiStructured,
    #[serde(rename = "empty")]
    Empty,
    #[serde(rename = "constant")]
    Constant,
    #[serde(rename = "sparse")]
    Sparse,
    #[serde(rename = "boolean-like")]
    BooleanLike,
    #[serde(rename = "low-cardinality categorical")]
    LowCardinalityCategorical,
    #[serde(rename = "text")]
    Text,
    #[serde(rename = "datetime")]
    Datetime,
    #[serde(rename = "numeric discrete")]
    NumericDiscrete,
    #[serde(rename = "numeric continuous")]
    NumericContinuous,
    #[serde(rename = "high-cardinality categorical")]
    HighCardinalityCategorical,
    #[serde(rename = "unknown")]
    Unknown,
}

impl BehaviorClass {
    /// The stable string tag of this class.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SemiStructured => "semi-structured",
            Self::Empty => "empty",
            Self::Constant => "constant",
            Self::Sparse => "sparse",
            Self::BooleanLike => "boolean-like",
            Self::LowCardinalityCategorical => "low-cardinality categorical",
            Self::Text => "text",
            Self::Datetime => "datetime",
            Self::NumericDiscrete => "numeric discrete",
            Self::NumericContinuous => "numeric continuous",
            Self::HighCardinalityCategorical => "high-cardinality categorical",
            Self::Unknown => "unknown",
        }
    }

    /// Classes that receive a numeric summary in the follow-up queries.
    pub fn is_numeric(&self) -> bool {
        self.as_str().contains("numeric")
    }

    /// Classes that receive a top-values query in the follow-up queries.
    pub fn is_categorical(&self) -> bool {
        self.as_str().contains("categorical")
    }
}

impl fmt::Display for BehaviorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Behavior classification of a single column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InferenceResult {
    pub column: String,
    pub behavior_class: BehaviorClass,
    /// Confidence in `[0, 1]`.
    pub confidence: f64,
    pub rationale: String,
}

/// Answers collected at the human checkpoint.
///
/// `None` fields mean "no constraint", never an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HumanSelections {
    #[serde(default)]
    pub identifier: Option<String>,
    #[serde(default)]
    pub time_column: Option<String>,
    #[serde(default)]
    pub status_column: Option<String>,
    #[serde(default)]
    pub ignore_columns: Vec<String>,
    #[serde(default = "default_eda_direction")]
    pub eda_direction: String,
}

/// Direction used when the human leaves the hint blank.
pub const DEFAULT_EDA_DIRECTION: &str = "behavior-based exploration";

fn default_eda_direction() -> String {
    DEFAULT_EDA_DIRECTION.to_string()
}

impl Default for HumanSelections {
    fn default() -> Self {
        Self {
            identifier: None,
            time_column: None,
            status_column: None,
            ignore_columns: Vec::new(),
            eda_direction: default_eda_direction(),
        }
    }
}

impl HumanSelections {
    /// Returns true if `column` is in the ignore list (case-insensitive).
    pub fn is_ignored(&self, column: &str) -> bool {
        let normalized = column.to_lowercase();
        self.ignore_columns
            .iter()
            .any(|ignored| ignored.to_lowercase() == normalized)
    }
}

/// The outcome of one follow-up query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EdaQueryResult {
    pub title: String,
    pub sql: String,
    /// Rows in executor order; empty is a valid outcome.
    pub rows: Vec<Row>,
}
