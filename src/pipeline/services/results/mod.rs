pub mod report;
pub mod result_sink;

pub use report::AnalysisReport;
pub use result_sink::{JsonFileResultSink, LogResultSink, ResultSink};

use crate::config::{ResultsConfig, SinkKind};
use std::sync::Arc;

pub fn sink_from_config(config: &ResultsConfig) -> Arc<dyn ResultSink> {
    match config.sink {
        SinkKind::Log => Arc::new(LogResultSink),
        SinkKind::Json => Arc::new(JsonFileResultSink::new(config.dir.clone())),
    }
}
