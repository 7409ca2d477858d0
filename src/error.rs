use thiserror::Error;

use crate::data::model::Direction;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, SeismicError>;

/// Everything the geometry, model and spectral layers can report.
#[derive(Debug, Error)]
pub enum SeismicError {
    /// `ninlines × nxlines` does not account for every trace.
    #[error("geometry mismatch: {ninlines} inlines × {nxlines} xlines does not match {ntraces} traces")]
    GeometryMismatch {
        ninlines: usize,
        nxlines: usize,
        ntraces: usize,
    },

    /// No known pattern in the named header sequence.
    #[error("no recognisable pattern in header '{header}'")]
    PatternUndetected { header: String },

    /// Line index outside the requested axis.
    #[error("{axis} index {index} out of range (axis has {len} lines)")]
    IndexOutOfRange {
        index: f64,
        axis: Direction,
        len: usize,
    },

    /// The spectrum never crosses the threshold (flat or silent).
    #[error("spectrum has no threshold crossings; bandwidth is undefined")]
    EmptyBandwidth,

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("trace source: {0}")]
    Source(String),

    #[error(transparent)]
    Shape(#[from] ndarray::ShapeError),
}
