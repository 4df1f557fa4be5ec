//! Prelude for commonly used types and traits in hilo-eda.

pub use crate::config::{EdaConfig, OutputConfig, ProfilingConfig, TableConfig, WarehouseConfig};
pub use crate::error::{EdaError, Result};
pub use crate::executor::{DataFusionExecutor, QueryExecutor};
pub use crate::human::{HumanInputSource, PresetInput, TerminalInput};
pub use crate::orchestrator::{EdaPipeline, EdaRun, PipelineState};
pub use crate::report::{FileReportSink, ReportSink};
pub use crate::sources::TableSource;
pub use crate::types::{BehaviorClass, HumanSelections, Row, Value};
