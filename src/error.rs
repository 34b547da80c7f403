use std::path::PathBuf;
use thiserror::Error;
#[derive(Debug, Error)]
pub enum SpellerError {
    #[error("sample rate must be greater than zero")]
    InvalidSampleRate,
    #[error("channel count mismatch: expected {expected}, got {actual}")]
    ChannelMismatch { expected: usize, actual: usize },
    #[error("chunk carries {samples} samples but {timestamps} timestamps")]
    TimestampMismatch { samples: usize, timestamps: usize },
    #[error("indicator {value} at column {column} is outside 0..=12")]
    InvalidIndicator { column: usize, value: f64 },
    #[error("malformed event window: {0}")]
    MalformedWindow(String),
    #[error("window range {start}..{end} is out of bounds for a buffer of {len} samples")]
    RangeOutOfBounds { start: usize, end: usize, len: usize },
    #[error("failed to persist artifact {path:?}: {source}")]
    Persistence {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to encode artifact {name}: {source}")]
    Encode {
        name: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("indexed artifact {name} is missing at {path:?}")]
    MissingArtifact { name: String, path: PathBuf },
    #[error("archive error: {0}")]
    Archive(#[from] zip::result::ZipError),
    #[error("no stream matches the requested configuration")]
    StreamNotFound,
    #[error("acquisition source failed: {0}")]
    Source(String),
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("trial {trial} aborted: {reason}")]
    TrialAborted { trial: usize, reason: String },
    #[error("failed to render plot: {0}")]
    Plot(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
pub type Result<T> = std::result::Result<T, SpellerError>;
/// Recoverable conditions detected by the pipeline. These are recorded on
/// sequence outcomes and logged where they happen; they never abort a trial.
#[derive(Clone, Debug, PartialEq)]
pub enum Anomaly {
    /// Fewer samples were buffered than the window asked for.
    Underrun { requested: usize, available: usize },
    /// Chunk length matched neither standard length and the chunk was dropped.
    MalformedChunk {
        position: usize,
        indicator: u8,
        observed: usize,
        expected_flash: usize,
        expected_isi: usize,
    },
    /// Lenient policy cut a chunk down to the length implied by its predecessor.
    Truncated {
        position: usize,
        indicator: u8,
        observed: usize,
        kept: usize,
    },
    /// Odd chunk count after normalization; the trailing chunk was dropped.
    BoundaryMismatch { indicator: u8, length: usize },
}
impl<E: std::error::Error + Send + Sync + 'static> From<plotters::drawing::DrawingAreaErrorKind<E>>
    for SpellerError
{
    fn from(value: plotters::drawing::DrawingAreaErrorKind<E>) -> Self {
        SpellerError::Plot(format!("{value:?}"))
    }
}
impl From<image::ImageError> for SpellerError {
    fn from(value: image::ImageError) -> Self {
        SpellerError::Plot(value.to_string())
    }
}
