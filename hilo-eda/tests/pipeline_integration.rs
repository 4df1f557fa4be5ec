//! End-to-end tests of the EDA pipeline against an in-memory warehouse.

mod common;

use std::sync::Arc;

use arrow::array::{ArrayRef, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;

use common::{executor_with, orders_batch, table_config, RecordingExecutor, SharedExecutor};
use hilo_eda::config::{EdaConfig, OutputConfig};
use hilo_eda::error::EdaError;
use hilo_eda::human::PresetInput;
use hilo_eda::discovery::fetch_columns;
use hilo_eda::executor::QueryExecutor;
use hilo_eda::orchestrator::{EdaPipeline, PipelineState};
use hilo_eda::planner::build_eda_queries;
use hilo_eda::profiler::TableProfiler;
use hilo_eda::report::{
    FileReportSink, COLUMN_PROFILES_FILE, MARKDOWN_REPORT_FILE, SAMPLE_ROWS_FILE,
};
use hilo_eda::types::{BehaviorClass, HumanSelections, Row, Value};

fn pipeline(table: &str, output_dir: &std::path::Path, selections: HumanSelections) -> EdaPipeline {
    let config = EdaConfig::builder(table_config(table))
        .output(OutputConfig::new(output_dir))
        .build()
        .unwrap();
    EdaPipeline::new(
        config,
        Box::new(PresetInput::new(selections)),
        Box::new(FileReportSink::new()),
    )
}

fn class_of(run: &hilo_eda::orchestrator::EdaRun, column: &str) -> BehaviorClass {
    run.report
        .inferences
        .iter()
        .find(|inference| inference.column == column)
        .map(|inference| inference.behavior_class)
        .unwrap()
}

#[tokio::test]
async fn test_end_to_end_orders_scenario() {
    let dir = tempfile::tempdir().unwrap();
    let executor = Arc::new(executor_with("orders", orders_batch(1000)));
    let selections = HumanSelections {
        identifier: Some("ID".to_string()),
        time_column: Some("created_at".to_string()),
        ..Default::default()
    };

    let mut pipeline = pipeline("orders", dir.path(), selections);
    let run = pipeline
        .run(SharedExecutor(Arc::clone(&executor)))
        .await
        .unwrap();

    assert_eq!(pipeline.state(), PipelineState::Closed);
    assert!(executor.is_closed());

    let profile = &run.report.table_profile;
    assert_eq!(profile.row_count, 1000);
    assert_eq!(profile.table_fqn, "\"warehouse\".\"analytics\".\"orders\"");
    let names: Vec<_> = profile.columns.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["id", "status", "created_at"]);

    let status = &profile.columns[1];
    assert_eq!(status.distinct_count, 2);
    assert_eq!(status.null_count, 0);
    assert_eq!(status.top_values.len(), 2);
    assert_eq!(status.top_values[0].1, 500);
    assert!(status.min_value.is_none());

    let id = &profile.columns[0];
    assert_eq!(id.min_value, Some(Value::Integer(1)));
    assert_eq!(id.max_value, Some(Value::Integer(1000)));
    assert_eq!(id.top_values.len(), 5);

    assert_eq!(class_of(&run, "id"), BehaviorClass::NumericContinuous);
    assert_eq!(class_of(&run, "status"), BehaviorClass::LowCardinalityCategorical);
    assert_eq!(class_of(&run, "created_at"), BehaviorClass::Datetime);

    // Names from the checkpoint are canonicalised against the schema.
    assert_eq!(run.report.selections.identifier.as_deref(), Some("id"));

    let titles: Vec<_> = run.planned_queries.iter().map(|q| q.title.as_str()).collect();
    assert_eq!(
        titles,
        vec![
            "Summary stats for id",
            "Top values for status",
            "Recent range for created_at",
        ]
    );

    let summary = &run.report.executed_queries[0].rows[0];
    assert_eq!(summary.get("MIN_VALUE"), Some(&Value::Integer(1)));
    assert_eq!(summary.get("AVG_VALUE").and_then(Value::as_f64), Some(500.5));

    let top_status = &run.report.executed_queries[1].rows;
    assert_eq!(top_status.len(), 2);
    assert_eq!(top_status[0].get("VALUE_COUNT").and_then(Value::as_u64), Some(500));

    let range = &run.report.executed_queries[2].rows[0];
    assert!(matches!(range.get("MIN_TS"), Some(Value::Timestamp(_))));

    assert_eq!(run.report.sample_rows.len(), 50);
    assert!(dir.path().join(MARKDOWN_REPORT_FILE).exists());
    assert!(dir.path().join(COLUMN_PROFILES_FILE).exists());
    assert!(dir.path().join(SAMPLE_ROWS_FILE).exists());

    let markdown = std::fs::read_to_string(dir.path().join(MARKDOWN_REPORT_FILE)).unwrap();
    assert!(markdown.contains("### Top values for status"));
    assert!(markdown.contains("- **status**: low-cardinality categorical"));
}

#[tokio::test]
async fn test_ignored_columns_are_not_planned() {
    let dir = tempfile::tempdir().unwrap();
    let executor = executor_with("orders", orders_batch(100));
    let selections = HumanSelections {
        ignore_columns: vec!["STATUS".to_string()],
        ..Default::default()
    };

    let run = pipeline("orders", dir.path(), selections)
        .run(executor)
        .await
        .unwrap();

    assert!(run.planned_queries.iter().all(|q| !q.sql.contains("\"status\"")));
    assert!(run.considered.iter().all(|i| i.column != "status"));
    // The report still lists every inference.
    assert_eq!(run.report.inferences.len(), 3);
    assert_eq!(run.planned_queries.len(), 1);
}

#[tokio::test]
async fn test_missing_table_fails_before_profiling() {
    let dir = tempfile::tempdir().unwrap();
    let executor = Arc::new(executor_with("orders", orders_batch(10)));

    let mut pipeline = pipeline("customers", dir.path(), HumanSelections::default());
    let err = pipeline
        .run(SharedExecutor(Arc::clone(&executor)))
        .await
        .unwrap_err();

    assert_eq!(err.stage(), Some(PipelineState::Start));
    assert!(matches!(err.root_cause(), EdaError::Precondition(_)));
    assert!(executor.is_closed());
    assert!(!dir.path().join(MARKDOWN_REPORT_FILE).exists());
}

#[tokio::test]
async fn test_unknown_checkpoint_column_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let executor = Arc::new(executor_with("orders", orders_batch(10)));
    let selections = HumanSelections {
        time_column: Some("updated_at".to_string()),
        ..Default::default()
    };

    let err = pipeline("orders", dir.path(), selections)
        .run(SharedExecutor(Arc::clone(&executor)))
        .await
        .unwrap_err();

    assert_eq!(err.stage(), Some(PipelineState::Inferred));
    assert!(matches!(err.root_cause(), EdaError::Precondition(_)));
    assert!(executor.is_closed());
}

#[tokio::test]
async fn test_empty_table_profiles_as_empty() {
    let dir = tempfile::tempdir().unwrap();
    let executor = executor_with("orders", orders_batch(0));

    let run = pipeline("orders", dir.path(), HumanSelections::default())
        .run(executor)
        .await
        .unwrap();

    assert_eq!(run.report.table_profile.row_count, 0);
    assert!(run
        .report
        .inferences
        .iter()
        .all(|i| i.behavior_class == BehaviorClass::Empty));
    assert!(run.planned_queries.is_empty());
    assert!(run.report.sample_rows.is_empty());
    assert!(dir.path().join(COLUMN_PROFILES_FILE).exists());
    assert!(!dir.path().join(SAMPLE_ROWS_FILE).exists());
}

#[tokio::test]
async fn test_unsafe_generated_sql_never_reaches_executor() {
    let dir = tempfile::tempdir().unwrap();
    let executor = RecordingExecutor::new()
        .respond("TABLE_COUNT", vec![Row::new().with("TABLE_COUNT", 1_i64)])
        .respond(
            "INFORMATION_SCHEMA.COLUMNS",
            vec![Row::new()
                .with("COLUMN_NAME", "get")
                .with("DATA_TYPE", "TEXT")
                .with("IS_NULLABLE", "YES")],
        )
        .respond("ROW_COUNT", vec![Row::new().with("ROW_COUNT", 3_i64)]);

    let err = pipeline("orders", dir.path(), HumanSelections::default())
        .run(executor.clone())
        .await
        .unwrap_err();

    assert!(matches!(err.root_cause(), EdaError::UnsafeSql { .. }));
    assert_eq!(err.stage(), Some(PipelineState::ColumnsFetched));
    assert!(err.sql().unwrap_or_default().contains("\"get\""));
    assert!(executor.is_closed());

    let received = executor.received();
    assert_eq!(received.len(), 3);
    assert!(received.iter().all(|sql| !sql.contains("\"get\"")));
}

#[tokio::test]
async fn test_table_count_other_than_one_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let executor = RecordingExecutor::new()
        .respond("TABLE_COUNT", vec![Row::new().with("TABLE_COUNT", 2_i64)]);

    let err = pipeline("orders", dir.path(), HumanSelections::default())
        .run(executor.clone())
        .await
        .unwrap_err();

    assert!(matches!(err.root_cause(), EdaError::Precondition(_)));
    assert_eq!(executor.received().len(), 1);
    assert!(executor.is_closed());
}

#[tokio::test]
async fn test_zero_columns_is_precondition_failure() {
    let dir = tempfile::tempdir().unwrap();
    let executor = RecordingExecutor::new()
        .respond("TABLE_COUNT", vec![Row::new().with("TABLE_COUNT", 1_i64)]);

    let err = pipeline("orders", dir.path(), HumanSelections::default())
        .run(executor.clone())
        .await
        .unwrap_err();

    assert_eq!(err.stage(), Some(PipelineState::SchemaChecked));
    assert!(matches!(err.root_cause(), EdaError::Precondition(_)));
    assert!(executor.is_closed());
}

fn mostly_null_batch() -> RecordBatch {
    let schema = Arc::new(Schema::new(vec![Field::new("status", DataType::Utf8, true)]));
    let statuses = vec![None, None, None, Some("a"), Some("b"), Some("b")];
    RecordBatch::try_new(schema, vec![Arc::new(StringArray::from(statuses)) as ArrayRef]).unwrap()
}

#[tokio::test]
async fn test_top_values_skip_a_dominant_null_group() {
    let executor = executor_with("tickets", mostly_null_batch());
    let table = table_config("tickets");
    let columns = fetch_columns(&executor, &table).await.unwrap();

    let (profile, _) = TableProfiler::default()
        .profile_table(&executor, &table, &columns)
        .await
        .unwrap();
    let status = &profile.columns[0];

    assert_eq!(status.null_count, 3);
    assert_eq!(
        status.top_values,
        vec![
            (Value::String("b".to_string()), 2),
            (Value::String("a".to_string()), 1),
        ]
    );
}

#[tokio::test]
async fn test_planned_top_values_order_null_group_last() {
    let executor = executor_with("tickets", mostly_null_batch());
    let queries =
        build_eda_queries(&table_config("tickets"), &[], &["status".to_string()], None).unwrap();
    let rows = executor.execute_query(&queries[0].sql).await.unwrap();

    let values: Vec<_> = rows
        .iter()
        .map(|row| {
            (
                row.get("TOP_VALUE").cloned().unwrap(),
                row.get("VALUE_COUNT").and_then(Value::as_u64).unwrap(),
            )
        })
        .collect();
    assert_eq!(
        values,
        vec![
            (Value::String("b".to_string()), 2),
            (Value::String("a".to_string()), 1),
            (Value::Null, 3),
        ]
    );
}
