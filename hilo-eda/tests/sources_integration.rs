//! Runs the pipeline over files registered as warehouse tables.

use std::io::{Cursor, Write};
use std::time::Duration;

use hilo_eda::config::{EdaConfig, OutputConfig, TableConfig, WarehouseConfig};
use hilo_eda::error::EdaError;
use hilo_eda::executor::{DataFusionExecutor, QueryExecutor};
use hilo_eda::human::TerminalInput;
use hilo_eda::orchestrator::EdaPipeline;
use hilo_eda::report::{FileReportSink, JSON_REPORT_FILE, SAMPLE_ROWS_FILE};
use hilo_eda::sources::{SourceFormat, TableSource};
use hilo_eda::types::BehaviorClass;

fn write_payments_csv(dir: &std::path::Path) -> std::path::PathBuf {
    let path = dir.join("payments.csv");
    let mut file = std::fs::File::create(&path).unwrap();
    writeln!(file, "payment_id,amount,method,note").unwrap();
    for i in 0..200 {
        let method = ["card", "cash", "wire"][i % 3];
        let note = if i % 25 == 0 { "manual" } else { "" };
        writeln!(file, "{i},{}.{:02},{method},{note}", 10 + i * 3, i % 100).unwrap();
    }
    path
}

#[tokio::test]
async fn test_csv_table_with_terminal_answers() {
    let data_dir = tempfile::tempdir().unwrap();
    let out_dir = tempfile::tempdir().unwrap();
    let csv_path = write_payments_csv(data_dir.path());

    let config = EdaConfig::builder(TableConfig::new("warehouse", "finance", "payments"))
        .warehouse(
            WarehouseConfig::default()
                .with_table(TableSource::new("payments", &csv_path))
                .with_query_timeout_ms(30_000),
        )
        .sample_limit(10)
        .output(OutputConfig::new(out_dir.path()).with_json(true))
        .build()
        .unwrap();

    let executor = DataFusionExecutor::connect(&config.warehouse, &config.table)
        .await
        .unwrap();

    // identifier, time, status, ignore list, direction
    let answers = "payment_id\n\nmethod\nnote\nquality\n";
    let human = TerminalInput::new(Cursor::new(answers), Vec::new());
    let sink = FileReportSink::new().with_json(config.output.write_json);

    let mut pipeline = EdaPipeline::new(config, Box::new(human), Box::new(sink));
    let run = pipeline.run(executor).await.unwrap();

    let selections = &run.report.selections;
    assert_eq!(selections.status_column.as_deref(), Some("method"));
    assert_eq!(selections.ignore_columns, vec!["note"]);
    assert_eq!(selections.eda_direction, "quality");

    let class = |column: &str| {
        run.report
            .inferences
            .iter()
            .find(|i| i.column == column)
            .map(|i| i.behavior_class)
            .unwrap()
    };
    assert_eq!(class("payment_id"), BehaviorClass::NumericContinuous);
    assert_eq!(class("amount"), BehaviorClass::NumericContinuous);
    assert_eq!(class("method"), BehaviorClass::LowCardinalityCategorical);

    let titles: Vec<_> = run.planned_queries.iter().map(|q| q.title.as_str()).collect();
    assert_eq!(
        titles,
        vec![
            "Summary stats for payment_id",
            "Summary stats for amount",
            "Top values for method",
            "Correlation payment_id vs amount",
        ]
    );

    assert_eq!(run.report.sample_rows.len(), 10);
    assert!(out_dir.path().join(SAMPLE_ROWS_FILE).exists());
    assert!(out_dir.path().join(JSON_REPORT_FILE).exists());
}

#[tokio::test]
async fn test_explicit_format_overrides_extension() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("events.data");
    std::fs::write(&path, "{\"kind\":\"a\",\"n\":1}\n{\"kind\":\"b\",\"n\":2}\n").unwrap();

    let table = TableConfig::new("warehouse", "raw", "events");
    let warehouse = WarehouseConfig::default()
        .with_table(TableSource::new("events", &path).with_format(SourceFormat::Json));
    let executor = DataFusionExecutor::connect(&warehouse, &table)
        .await
        .unwrap()
        .with_query_timeout(Duration::from_secs(30));

    let rows = executor
        .execute_query("SELECT COUNT(*) AS N FROM \"warehouse\".\"raw\".\"events\"")
        .await
        .unwrap();
    assert_eq!(rows[0].get("N").and_then(|v| v.as_u64()), Some(2));
    executor.close().await.unwrap();
}

#[tokio::test]
async fn test_undetectable_format_is_configuration_error() {
    let table = TableConfig::new("warehouse", "raw", "events");
    let warehouse =
        WarehouseConfig::default().with_table(TableSource::new("events", "/tmp/events.data"));

    let result = DataFusionExecutor::connect(&warehouse, &table).await;
    assert!(matches!(result, Err(EdaError::Configuration(_))));
}
