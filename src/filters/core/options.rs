//! options — numerical tolerances shared by the filters.
//!
//! Purpose
//! -------
//! Keep the two tolerances of the filtering engine in one validated bundle:
//! the structural-zero threshold used by the square-root filter and the
//! convergence threshold of the fast filter.
//!
//! Key behaviors
//! -------------
//! - [`FilterOptions::default`] uses `ZERO = 1e-9` and `EPSILON = 1e-12`.
//! - [`FilterOptions::new`] and the `with_*` builders validate that both
//!   values are finite and strictly positive.
//!
//! Conventions
//! -----------
//! - `zero` is compared against Cholesky pivots and innovation variances;
//!   values at or below it carry no information.
//! - `epsilon` is an absolute bound on the norm of the fast filter's
//!   covariance-decrease direction; it is also scaled by the initial
//!   innovation variance to gate the rank-one update.
use crate::filters::errors::{FilterError, FilterResult};

/// Default structural-zero threshold.
pub const ZERO: f64 = 1e-9;

/// Default steady-state convergence threshold.
pub const EPSILON: f64 = 1e-12;

/// FilterOptions — tolerances for the array and fast filters.
///
/// Fields
/// ------
/// - `zero`: pivots and variances `<= zero` are treated as exact zeros.
/// - `epsilon`: the fast filter declares steady state once the decrease
///   direction has norm `< epsilon`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FilterOptions {
    pub zero: f64,
    pub epsilon: f64,
}

impl FilterOptions {
    /// Errors
    /// ------
    /// - `FilterError::InvalidOption` when a value is not finite and > 0.
    pub fn new(zero: f64, epsilon: f64) -> FilterResult<Self> {
        validate("zero", zero)?;
        validate("epsilon", epsilon)?;
        Ok(FilterOptions { zero, epsilon })
    }

    pub fn with_zero(self, zero: f64) -> FilterResult<Self> {
        Self::new(zero, self.epsilon)
    }

    pub fn with_epsilon(self, epsilon: f64) -> FilterResult<Self> {
        Self::new(self.zero, epsilon)
    }
}

impl Default for FilterOptions {
    fn default() -> Self {
        FilterOptions { zero: ZERO, epsilon: EPSILON }
    }
}

fn validate(name: &'static str, value: f64) -> FilterResult<()> {
    if !value.is_finite() || value <= 0.0 {
        return Err(FilterError::InvalidOption { name, value, reason: "must be finite and > 0" });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    // Purpose
    // -------
    // Defaults carry the documented tolerances and builders validate.
    //
    // Given
    // -----
    // - `FilterOptions::default()`, a valid epsilon and a negative zero.
    //
    // Expect
    // ------
    // - `(1e-9, 1e-12)`; `with_epsilon(1e-10)` keeps `zero`; a negative
    //   `zero` is rejected with `InvalidOption { name: "zero", .. }`.
    fn defaults_and_validation() {
        // Arrange
        let options = FilterOptions::default();

        // Act
        let relaxed = options.with_epsilon(1e-10).expect("valid epsilon");
        let err = options.with_zero(-1.0).unwrap_err();

        // Assert
        assert_eq!(options, FilterOptions { zero: 1e-9, epsilon: 1e-12 });
        assert_eq!(relaxed.zero, 1e-9);
        assert_eq!(relaxed.epsilon, 1e-10);
        assert!(matches!(err, FilterError::InvalidOption { name: "zero", .. }));
    }
}
