//! Errors for filter construction (model support, initial factorization,
//! options).
//!
//! ## Conventions
//! - Initialization failures are returned from the filter constructors and
//!   leave nothing half-built.
//! - Numerical trouble *during* a run is never an error: it is absorbed by
//!   tolerance-gated branches (`zero`, `epsilon`) and logged at trace level.
//! - Model/data dimension mismatches are programming errors and panic.

/// Result alias for filter construction.
pub type FilterResult<T> = Result<T, FilterError>;

/// Why a filter cannot run a given model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnsupportedReason {
    /// The number of measured components varies with time.
    NonHomogeneousMeasurements,
    /// Dynamics or measurement depend on time.
    TimeVarying,
    /// Part of the initial state has a diffuse prior.
    Diffuse,
    /// The initial covariance is not the stationary one.
    NonStationaryInitialization,
}

impl std::fmt::Display for UnsupportedReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            UnsupportedReason::NonHomogeneousMeasurements => "measurement count varies with time",
            UnsupportedReason::TimeVarying => "model is time varying",
            UnsupportedReason::Diffuse => "diffuse initialization is not supported",
            UnsupportedReason::NonStationaryInitialization => {
                "initial covariance is not the stationary covariance"
            }
        };
        write!(f, "{text}")
    }
}

/// Filter construction failures.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterError {
    // ---- Model support ----
    /// The filter does not support this model.
    UnsupportedModel { filter: &'static str, reason: UnsupportedReason },

    // ---- Numerical ----
    /// The initial covariance could not be factorized, or the initial
    /// innovation variance is not positive.
    NumericallyDegenerate { filter: &'static str, reason: &'static str },

    // ---- Options ----
    /// An option value is out of range.
    InvalidOption { name: &'static str, value: f64, reason: &'static str },
}

impl std::error::Error for FilterError {}

impl std::fmt::Display for FilterError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FilterError::UnsupportedModel { filter, reason } => {
                write!(f, "{filter} filter cannot run this model: {reason}.")
            }
            FilterError::NumericallyDegenerate { filter, reason } => {
                write!(f, "{filter} filter initialization is numerically degenerate: {reason}.")
            }
            FilterError::InvalidOption { name, value, reason } => {
                write!(f, "Invalid filter option {name} = {value}: {reason}")
            }
        }
    }
}

impl FilterError {
    /// `true` for model-support failures (as opposed to numerical ones).
    pub fn is_unsupported(&self) -> bool {
        matches!(self, FilterError::UnsupportedModel { .. })
    }
}
