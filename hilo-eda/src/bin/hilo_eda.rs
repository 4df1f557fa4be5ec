//! hilo-eda command line interface.
//!
//! Registers local data files as tables of an in-process DataFusion
//! warehouse, runs the EDA pipeline against one of them and writes the
//! report to the output directory.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, ValueEnum};
use tracing::Level;

use hilo_eda::config::{EdaConfig, TableConfig};
use hilo_eda::error::{EdaError, Result};
use hilo_eda::executor::DataFusionExecutor;
use hilo_eda::human::{HumanInputSource, PresetInput, TerminalInput};
use hilo_eda::logging::setup::{init_logging, LoggingConfig};
use hilo_eda::orchestrator::EdaPipeline;
use hilo_eda::report::FileReportSink;
use hilo_eda::sources::{SourceFormat, TableSource};

const DEFAULT_DATABASE: &str = "warehouse";
const DEFAULT_SCHEMA: &str = "analytics";

/// Human-in-the-loop exploratory data analysis over a single table
#[derive(Parser, Debug)]
#[command(name = "hilo-eda")]
#[command(version, about, long_about = None)]
struct Cli {
    /// JSON run configuration; flags below override its values
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Data file to register as a table, as PATH or NAME=PATH (repeatable)
    #[arg(short, long, value_name = "SOURCE")]
    file: Vec<String>,

    /// File format, detected from the extension by default
    #[arg(long)]
    format: Option<FormatChoice>,

    /// Catalog (database) holding the table [default: warehouse]
    #[arg(long)]
    database: Option<String>,

    /// Schema holding the table [default: analytics]
    #[arg(long)]
    schema: Option<String>,

    /// Table to analyze; defaults to the name of the single registered file
    #[arg(short, long)]
    table: Option<String>,

    /// Rows fetched for the sample export
    #[arg(long)]
    sample_limit: Option<u64>,

    /// Most frequent values kept per column
    #[arg(long)]
    top_k: Option<u64>,

    /// Directory the report is written to
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Skip column_profiles.csv and sample_rows.csv
    #[arg(long)]
    no_csv: bool,

    /// Also write eda_report.json
    #[arg(long)]
    json_report: bool,

    /// JSON file with checkpoint answers; prompts on the terminal otherwise
    #[arg(short, long, value_name = "FILE")]
    answers: Option<PathBuf>,

    /// Per-query timeout in milliseconds
    #[arg(long)]
    query_timeout_ms: Option<u64>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    json_logs: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum FormatChoice {
    Csv,
    Parquet,
    Json,
}

impl From<FormatChoice> for SourceFormat {
    fn from(choice: FormatChoice) -> Self {
        match choice {
            FormatChoice::Csv => SourceFormat::Csv,
            FormatChoice::Parquet => SourceFormat::Parquet,
            FormatChoice::Json => SourceFormat::Json,
        }
    }
}

fn parse_source(arg: &str, format: Option<FormatChoice>) -> TableSource {
    let source = match arg.split_once('=') {
        Some((name, path)) if !name.trim().is_empty() => TableSource::new(name.trim(), path),
        _ => {
            let path = PathBuf::from(arg);
            let name = path
                .file_stem()
                .map(|stem| stem.to_string_lossy().to_string())
                .unwrap_or_else(|| arg.to_string());
            TableSource::new(name, path)
        }
    };
    match format {
        Some(format) => source.with_format(format.into()),
        None => source,
    }
}

fn build_config(cli: &Cli) -> Result<EdaConfig> {
    let sources: Vec<TableSource> = cli
        .file
        .iter()
        .map(|arg| parse_source(arg, cli.format))
        .collect();

    let mut config = match &cli.config {
        Some(path) => EdaConfig::from_json_file(path)?,
        None => {
            let table = match (&cli.table, sources.as_slice()) {
                (Some(table), _) => table.clone(),
                (None, [only]) => only.name.clone(),
                (None, _) => {
                    return Err(EdaError::Configuration(
                        "--table is required unless exactly one --file is given".to_string(),
                    ))
                }
            };
            let database = cli.database.as_deref().unwrap_or(DEFAULT_DATABASE);
            let schema = cli.schema.as_deref().unwrap_or(DEFAULT_SCHEMA);
            EdaConfig::builder(TableConfig::new(database, schema, table)).build()?
        }
    };

    if cli.config.is_some() {
        if let Some(database) = &cli.database {
            config.table.database = database.clone();
        }
        if let Some(schema) = &cli.schema {
            config.table.schema = schema.clone();
        }
        if let Some(table) = &cli.table {
            config.table.table = table.clone();
        }
    }
    config.warehouse.tables.extend(sources);
    if let Some(timeout_ms) = cli.query_timeout_ms {
        config.warehouse.query_timeout_ms = Some(timeout_ms);
    }
    if let Some(limit) = cli.sample_limit {
        config.profiling.sample_limit = limit;
    }
    if let Some(top_k) = cli.top_k {
        config.profiling.top_k = top_k;
    }
    if let Some(dir) = &cli.output_dir {
        config.output.output_dir = dir.clone();
    }
    if cli.no_csv {
        config.output.write_csv = false;
    }
    if cli.json_report {
        config.output.write_json = true;
    }

    config.validate()?;
    Ok(config)
}

async fn run(cli: Cli) -> Result<()> {
    let config = build_config(&cli)?;

    let human: Box<dyn HumanInputSource> = match &cli.answers {
        Some(path) => Box::new(PresetInput::from_json_file(path)?),
        None => Box::new(TerminalInput::stdio()),
    };
    let sink = FileReportSink::new()
        .with_csv(config.output.write_csv)
        .with_json(config.output.write_json);

    let executor = DataFusionExecutor::connect(&config.warehouse, &config.table).await?;

    let mut pipeline = EdaPipeline::new(config, human, Box::new(sink));
    let run = pipeline.run(executor).await?;

    println!("\nProfiling completed.");
    println!(
        "Columns: {}",
        run.columns
            .iter()
            .map(|column| column.name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    );
    println!("Executed {} follow-up queries.", run.report.executed_queries.len());
    for path in run.artifacts.paths() {
        println!("Report written to {}", path.display());
    }
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let logging = if cli.verbose {
        LoggingConfig::development()
    } else {
        LoggingConfig::default().with_eda_level(Level::WARN)
    }
    .with_json_format(cli.json_logs);
    if let Err(e) = init_logging(logging) {
        eprintln!("Failed to initialize logging: {e}");
    }

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            if let Some(sql) = e.sql() {
                eprintln!("SQL: {sql}");
            }
            ExitCode::FAILURE
        }
    }
}
