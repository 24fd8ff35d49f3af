//! prediction_error — per-step record handed to results sinks.
//!
//! Purpose
//! -------
//! Carry the one-step-ahead prediction error of a filter step without
//! copying: every field is a view into the filter's own buffers and lives
//! only for the duration of [`ResultsSink::save`](super::sink::ResultsSink::save).
//!
//! Invariants & assumptions
//! ------------------------
//! - All vectors have length `k = components.len()` (observed components at
//!   this step); `cholesky` is `k×k` lower triangular with `diag >= 0`.
//! - `standardized = cholesky⁻¹·errors`, with entries set to 0 where the
//!   pivot is degenerate.
//! - A fully missing step has `k = 0`.
use ndarray::{ArrayView1, ArrayView2};

/// PredictionError — views on the innovation of one filter step.
///
/// Fields
/// ------
/// - `components`: indices (into the measurement family) of the observed
///   components, in increasing order.
/// - `forecasts`: `Z·a` for the observed components.
/// - `errors`: raw innovations `y − Z·a`.
/// - `variances`: diagonal of the innovation covariance `F`.
/// - `standardized`: `L_F⁻¹·(y − Z·a)`.
/// - `cholesky`: lower Cholesky factor `L_F` of `F`.
#[derive(Debug, Clone, Copy)]
pub struct PredictionError<'a> {
    pub components: &'a [usize],
    pub forecasts: ArrayView1<'a, f64>,
    pub errors: ArrayView1<'a, f64>,
    pub variances: ArrayView1<'a, f64>,
    pub standardized: ArrayView1<'a, f64>,
    pub cholesky: ArrayView2<'a, f64>,
}

impl<'a> PredictionError<'a> {
    /// Number of observed components.
    pub fn len(&self) -> usize {
        self.components.len()
    }

    /// `true` when the whole observation vector was missing.
    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// `(error, variance)` of a univariate step, `None` when missing.
    pub fn univariate(&self) -> Option<(f64, f64)> {
        match self.components.len() {
            1 => Some((self.errors[0], self.variances[0])),
            _ => None,
        }
    }
}
