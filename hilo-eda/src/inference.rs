//! Rule-based behavior inference.
//!
//! Each column profile is classified by an ordered list of rules evaluated
//! top to bottom; the first rule whose predicate holds decides the class.
//! Predicates overlap on purpose (a `VARIANT` column with one distinct value
//! is `semi-structured`, never `constant`), so the order of [`RULES`] is part
//! of the contract.
//!
//! Inference is a pure function of `(profile, row_count)`.

use tracing::{debug, instrument};

use crate::profiler::{is_numeric_type, is_temporal_type};
use crate::types::{BehaviorClass, ColumnProfile, InferenceResult};

/// Columns with at most this many distinct values count as low-cardinality.
pub const LOW_CARDINALITY_MAX_DISTINCT: u64 = 20;

/// Null fraction at or above which a column is sparse.
pub const SPARSE_NULL_PCT: f64 = 0.9;

/// Distinct-to-row ratio above which an untyped column is high-cardinality.
pub const HIGH_CARDINALITY_RATIO: f64 = 0.9;

const SEMI_STRUCTURED_TYPE_TOKENS: &[&str] = &["VARIANT", "OBJECT"];
const TEXT_TYPE_TOKENS: &[&str] = &["TEXT", "CHAR", "STRING", "UTF8"];

/// Everything a rule may look at.
#[derive(Debug, Clone, Copy)]
pub struct RuleInput<'a> {
    pub profile: &'a ColumnProfile,
    pub row_count: u64,
}

impl RuleInput<'_> {
    fn data_type(&self) -> String {
        self.profile.data_type.to_uppercase()
    }

    fn distinct(&self) -> u64 {
        self.profile.distinct_count
    }

    fn is_low_cardinality(&self) -> bool {
        self.distinct() <= LOW_CARDINALITY_MAX_DISTINCT
    }
}

/// The class, confidence and rationale a rule assigns.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Classification {
    pub behavior_class: BehaviorClass,
    pub confidence: f64,
    pub rationale: &'static str,
}

const fn classification(
    behavior_class: BehaviorClass,
    confidence: f64,
    rationale: &'static str,
) -> Classification {
    Classification {
        behavior_class,
        confidence,
        rationale,
    }
}

/// One entry of the ordered rule chain.
pub struct InferenceRule {
    pub name: &'static str,
    predicate: fn(&RuleInput<'_>) -> bool,
    classify: fn(&RuleInput<'_>) -> Classification,
}

impl InferenceRule {
    pub fn matches(&self, input: &RuleInput<'_>) -> bool {
        (self.predicate)(input)
    }

    pub fn classify(&self, input: &RuleInput<'_>) -> Classification {
        (self.classify)(input)
    }
}

impl std::fmt::Debug for InferenceRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InferenceRule")
            .field("name", &self.name)
            .finish()
    }
}

/// The rule chain, in priority order. The last rule always matches.
pub static RULES: &[InferenceRule] = &[
    InferenceRule {
        name: "semi-structured type",
        predicate: is_semi_structured,
        classify: |_| classification(BehaviorClass::SemiStructured, 0.8, "VARIANT type"),
    },
    InferenceRule {
        name: "empty table",
        predicate: is_empty_table,
        classify: |_| classification(BehaviorClass::Empty, 0.5, "Empty table"),
    },
    InferenceRule {
        name: "single distinct value",
        predicate: is_constant,
        classify: |_| classification(BehaviorClass::Constant, 0.9, "Single distinct"),
    },
    InferenceRule {
        name: "high null rate",
        predicate: is_sparse,
        classify: |_| classification(BehaviorClass::Sparse, 0.8, "High null rate"),
    },
    InferenceRule {
        name: "boolean type",
        predicate: is_boolean,
        classify: |_| classification(BehaviorClass::BooleanLike, 0.9, "Boolean type"),
    },
    InferenceRule {
        name: "text type",
        predicate: is_text,
        classify: classify_text,
    },
    InferenceRule {
        name: "date/time type",
        predicate: is_datetime,
        classify: |_| classification(BehaviorClass::Datetime, 0.85, "Date/time type"),
    },
    InferenceRule {
        name: "numeric type",
        predicate: is_numeric,
        classify: classify_numeric,
    },
    InferenceRule {
        name: "cardinality fallback",
        predicate: always,
        classify: classify_fallback,
    },
];

fn is_semi_structured(input: &RuleInput<'_>) -> bool {
    let data_type = input.data_type();
    SEMI_STRUCTURED_TYPE_TOKENS
        .iter()
        .any(|token| data_type.contains(token))
}

fn is_empty_table(input: &RuleInput<'_>) -> bool {
    input.row_count == 0
}

fn is_constant(input: &RuleInput<'_>) -> bool {
    input.distinct() == 1
}

fn is_sparse(input: &RuleInput<'_>) -> bool {
    input.profile.null_pct() >= SPARSE_NULL_PCT
}

fn is_boolean(input: &RuleInput<'_>) -> bool {
    input.data_type() == "BOOLEAN"
}

fn is_text(input: &RuleInput<'_>) -> bool {
    let data_type = input.data_type();
    TEXT_TYPE_TOKENS.iter().any(|token| data_type.contains(token))
}

fn is_datetime(input: &RuleInput<'_>) -> bool {
    is_temporal_type(&input.profile.data_type)
}

fn is_numeric(input: &RuleInput<'_>) -> bool {
    is_numeric_type(&input.profile.data_type)
}

fn always(_: &RuleInput<'_>) -> bool {
    true
}

fn classify_text(input: &RuleInput<'_>) -> Classification {
    if input.is_low_cardinality() {
        classification(BehaviorClass::LowCardinalityCategorical, 0.7, "Low distinct")
    } else {
        classification(BehaviorClass::Text, 0.6, "Text type")
    }
}

fn classify_numeric(input: &RuleInput<'_>) -> Classification {
    if input.is_low_cardinality() {
        classification(BehaviorClass::NumericDiscrete, 0.7, "Low distinct")
    } else {
        classification(BehaviorClass::NumericContinuous, 0.7, "Numeric type")
    }
}

fn classify_fallback(input: &RuleInput<'_>) -> Classification {
    if input.is_low_cardinality() {
        return classification(BehaviorClass::LowCardinalityCategorical, 0.6, "Low distinct");
    }

    let ratio = input.distinct() as f64 / input.row_count.max(1) as f64;
    if ratio > HIGH_CARDINALITY_RATIO {
        classification(
            BehaviorClass::HighCardinalityCategorical,
            0.6,
            "High distinct ratio",
        )
    } else {
        classification(BehaviorClass::Unknown, 0.4, "Fallback")
    }
}

/// Classifies one column profile.
pub fn infer_behavior(profile: &ColumnProfile, row_count: u64) -> InferenceResult {
    let input = RuleInput { profile, row_count };

    let (rule, assigned) = RULES
        .iter()
        .find(|rule| rule.matches(&input))
        .map(|rule| (rule.name, rule.classify(&input)))
        .unwrap_or((
            "none",
            classification(BehaviorClass::Unknown, 0.4, "Fallback"),
        ));

    debug!(
        column = %profile.name,
        rule,
        behavior = %assigned.behavior_class,
        "Inferred column behavior"
    );

    InferenceResult {
        column: profile.name.clone(),
        behavior_class: assigned.behavior_class,
        confidence: assigned.confidence,
        rationale: assigned.rationale.to_string(),
    }
}

/// Classifies every profile, preserving input order.
#[instrument(skip(profiles), fields(columns = profiles.len()))]
pub fn infer_all(profiles: &[ColumnProfile], row_count: u64) -> Vec<InferenceResult> {
    profiles
        .iter()
        .map(|profile| infer_behavior(profile, row_count))
        .collect()
}
