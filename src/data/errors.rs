//! Errors for observation containers (shape and finiteness checks).
//!
//! ## Conventions
//! - **Indices are 0-based**; panel positions are reported as `(row, column)`
//!   with rows indexing time.
//! - `NaN` marks a missing observation and is never an error; only `±inf` is
//!   rejected.

/// Result alias for observation construction.
pub type DataResult<T> = Result<T, DataError>;

/// Validation failures raised while building [`SeriesData`](super::SeriesData)
/// or [`PanelData`](super::PanelData).
#[derive(Debug, Clone, PartialEq)]
pub enum DataError {
    // ---- Shape ----
    /// Series has no observations.
    EmptySeries,

    /// Panel has no components (zero columns).
    NoComponents,

    // ---- Values ----
    /// An observation is ±inf.
    InfiniteValue { position: usize, component: usize, value: f64 },
}

impl std::error::Error for DataError {}

impl std::fmt::Display for DataError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DataError::EmptySeries => write!(f, "Observation series is empty."),
            DataError::NoComponents => write!(f, "Observation panel has no components."),
            DataError::InfiniteValue { position, component, value } => write!(
                f,
                "Observation at position {position}, component {component} is infinite: {value}"
            ),
        }
    }
}
