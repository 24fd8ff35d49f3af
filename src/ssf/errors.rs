//! Errors for state-space model construction (shapes, covariance checks,
//! stationarity, dynamic-factor descriptors).
//!
//! ## Conventions
//! - `what` fields name the offending matrix or vector (`"transition"`,
//!   `"noise_loading"`, ...), so messages stay readable without extra context.
//! - Indices are 0-based.

/// Result alias for model construction.
pub type SsfResult<T> = Result<T, SsfError>;

/// Model-construction failures.
#[derive(Debug, Clone, PartialEq)]
pub enum SsfError {
    // ---- Shape ----
    /// State dimension is zero.
    EmptyState,

    /// A matrix or vector has the wrong shape.
    DimensionMismatch { what: &'static str, expected: (usize, usize), actual: (usize, usize) },

    // ---- Values ----
    /// A matrix or vector carries NaN/±inf.
    NonFiniteEntry { what: &'static str, index: (usize, usize) },

    /// A variance is negative or non-finite.
    InvalidVariance { what: &'static str, index: usize, value: f64 },

    /// A covariance matrix is not symmetric positive (semi)definite.
    NotPositiveDefinite { what: &'static str },

    // ---- Stationarity ----
    /// The transition has spectral radius ≥ 1; no stationary covariance exists.
    NonStationary { spectral_radius: f64 },

    /// The stationary covariance iteration did not converge.
    StationaryCovarianceNotConverged { iterations: usize },

    // ---- Dynamic factor descriptors ----
    /// No measurement descriptor was supplied.
    NoMeasurements,

    /// Factor count or block length is zero.
    InvalidFactorLayout { nfactors: usize, block_len: usize },

    /// A measurement structure contributes more lags than a factor block holds.
    StructureTooLong { index: usize, len: usize, block_len: usize },

    /// A descriptor has the wrong number of factor coefficients.
    CoefficientCount { index: usize, expected: usize, actual: usize },

    /// VAR order exceeds the factor block length.
    TooManyLags { nlags: usize, block_len: usize },

    /// ARMA polynomials are inconsistent (e.g. non-finite coefficients).
    InvalidArma { reason: &'static str },
}

impl std::error::Error for SsfError {}

impl std::fmt::Display for SsfError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            // ---- Shape ----
            SsfError::EmptyState => write!(f, "State dimension must be at least 1."),
            SsfError::DimensionMismatch { what, expected, actual } => write!(
                f,
                "{what} has shape {actual:?}; expected {expected:?}."
            ),
            // ---- Values ----
            SsfError::NonFiniteEntry { what, index } => {
                write!(f, "{what} has a non-finite entry at {index:?}.")
            }
            SsfError::InvalidVariance { what, index, value } => write!(
                f,
                "{what} variance at index {index} must be finite and >= 0; got: {value}"
            ),
            SsfError::NotPositiveDefinite { what } => {
                write!(f, "{what} is not symmetric positive definite.")
            }
            // ---- Stationarity ----
            SsfError::NonStationary { spectral_radius } => write!(
                f,
                "Transition is not stable (spectral radius {spectral_radius}); no stationary covariance."
            ),
            SsfError::StationaryCovarianceNotConverged { iterations } => write!(
                f,
                "Stationary covariance did not converge after {iterations} doubling steps."
            ),
            // ---- Dynamic factor descriptors ----
            SsfError::NoMeasurements => write!(f, "At least one measurement descriptor is required."),
            SsfError::InvalidFactorLayout { nfactors, block_len } => write!(
                f,
                "Factor layout must have nfactors >= 1 and block_len >= 1; got ({nfactors}, {block_len})."
            ),
            SsfError::StructureTooLong { index, len, block_len } => write!(
                f,
                "Measurement {index} spans {len} lags but factor blocks hold {block_len}."
            ),
            SsfError::CoefficientCount { index, expected, actual } => write!(
                f,
                "Measurement {index} must carry {expected} factor coefficients; got {actual}."
            ),
            SsfError::TooManyLags { nlags, block_len } => write!(
                f,
                "VAR order {nlags} exceeds the factor block length {block_len}."
            ),
            SsfError::InvalidArma { reason } => write!(f, "Invalid ARMA specification: {reason}"),
        }
    }
}
