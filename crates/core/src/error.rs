//! Error types for the textweave layout compression engine.

use thiserror::Error;

/// Primary error type for markup emission.
///
/// Layout-level problems (missing initial style state, degenerate
/// metrics, fold guards) are handled locally and logged; they never
/// surface here. Only the output sink can fail.
#[derive(Error, Debug)]
pub enum WeaveError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("no page is open")]
    NoOpenPage,
}

/// Convenience Result type alias for WeaveError.
pub type Result<T> = std::result::Result<T, WeaveError>;
