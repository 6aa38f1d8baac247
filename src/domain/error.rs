// Chart domain errors
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ChartError {
    #[error("Too many datapoints aborting render: series '{series}' would hold {len} points (max {max})")]
    Overflow { series: String, len: u64, max: usize },

    #[error("Padding step must be positive, got {0}")]
    InvalidStep(i64),

    #[error("Padding series '{series}' by {step} runs past the representable time range")]
    StepOutOfRange { series: String, step: i64 },

    #[error("Unknown data item '{0}'")]
    UnknownDataItem(String),

    #[error("Unknown resolution '{0}'")]
    UnknownResolution(String),

    #[error("Malformed CSV at line {line}: {reason}")]
    Csv { line: usize, reason: String },
}
