//! time_invariant — dense, time-invariant implementations of the contracts.
//!
//! Purpose
//! -------
//! Provide ready-to-use models backed by explicit matrices:
//! [`TimeInvariantDynamics`] (`T`, `U`, `a_0`, `Pf_0`),
//! [`TimeInvariantMeasurement`] (one loading row and a variance) and
//! [`TimeInvariantMeasurements`] (`Z`, `H` with a precomputed factor).
//!
//! Key behaviors
//! -------------
//! - Constructors validate shapes and finiteness and return [`SsfResult`].
//! - [`TimeInvariantDynamics::stationary`] derives `Pf_0` by solving the
//!   Lyapunov equation and marks the model as stationary, which is what the
//!   fast filter requires.
//! - Loadings remember the span of nonzero coefficients, so `zx` only touches
//!   that span.
//!
//! Invariants & assumptions
//! ------------------------
//! - `T` is `n×n`, `U` is `n×r`, `a_0` has length `n`, `Pf_0` is `n×n`
//!   symmetric PSD.
//! - `Z` is `m×n`, `H` is `m×m` symmetric PSD.
//!
//! Testing notes
//! -------------
//! - Unit tests cover validation failures, `tx`/`tm` consistency, and the
//!   stationary flag.
use crate::ssf::{
    core::{
        dynamics::Dynamics,
        linalg::{psd_cholesky, stationary_covariance},
        measurement::{Measurement, Measurements},
    },
    errors::{SsfError, SsfResult},
};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, ArrayViewMut1, ArrayViewMut2, s};
use std::ops::Range;

/// Tolerance used when factorizing `H` at construction.
const H_ZERO: f64 = 1e-9;

// ---- Validation helpers ----

fn check_shape(
    what: &'static str, actual: (usize, usize), expected: (usize, usize),
) -> SsfResult<()> {
    if actual != expected {
        return Err(SsfError::DimensionMismatch { what, expected, actual });
    }
    Ok(())
}

fn check_finite(what: &'static str, m: ArrayView2<'_, f64>) -> SsfResult<()> {
    match m.indexed_iter().find(|(_, v)| !v.is_finite()) {
        Some((index, _)) => Err(SsfError::NonFiniteEntry { what, index }),
        None => Ok(()),
    }
}

fn check_symmetric(what: &'static str, m: ArrayView2<'_, f64>) -> SsfResult<()> {
    let n = m.nrows();
    for i in 0..n {
        for j in 0..i {
            let (a, b) = (m[[i, j]], m[[j, i]]);
            if (a - b).abs() > 1e-10 * (1.0 + a.abs().max(b.abs())) {
                return Err(SsfError::NotPositiveDefinite { what });
            }
        }
    }
    Ok(())
}

/// Range covering the nonzero coefficients of `z` (empty when `z` is zero).
pub(crate) fn nonzero_span(z: ArrayView1<'_, f64>) -> Range<usize> {
    let first = z.iter().position(|&v| v != 0.0);
    let last = z.iter().rposition(|&v| v != 0.0);
    match (first, last) {
        (Some(a), Some(b)) => a..b + 1,
        _ => 0..0,
    }
}

// ---- Dynamics ----

/// TimeInvariantDynamics — `α_{t+1} = T·α_t + U·ε_t` with fixed matrices.
///
/// Fields
/// ------
/// - `transition`: `n×n` matrix `T`.
/// - `noise_loading`: `n×r` matrix `U` with `U·Uᵀ = V`.
/// - `initial_mean`: `a_0`.
/// - `initial_covariance`: `Pf_0`.
/// - `stationary`: `Pf_0` solves `P = T·P·Tᵀ + V`.
/// - `diffuse_states`: indices of states with a diffuse prior (none by default).
#[derive(Debug, Clone, PartialEq)]
pub struct TimeInvariantDynamics {
    transition: Array2<f64>,
    noise_loading: Array2<f64>,
    initial_mean: Array1<f64>,
    initial_covariance: Array2<f64>,
    stationary: bool,
    diffuse_states: Vec<usize>,
}

impl TimeInvariantDynamics {
    /// Build from explicit matrices and an explicit initial distribution.
    ///
    /// Errors
    /// ------
    /// - `SsfError::EmptyState` when `T` is `0×0`.
    /// - `SsfError::DimensionMismatch` on any inconsistent shape.
    /// - `SsfError::NonFiniteEntry` on NaN/±inf.
    /// - `SsfError::NotPositiveDefinite` when `Pf_0` is not symmetric PSD.
    pub fn new(
        transition: Array2<f64>, noise_loading: Array2<f64>, initial_mean: Array1<f64>,
        initial_covariance: Array2<f64>,
    ) -> SsfResult<Self> {
        let n = Self::validate_transition(&transition, &noise_loading)?;
        check_shape("initial_mean", (initial_mean.len(), 1), (n, 1))?;
        check_shape("initial_covariance", initial_covariance.dim(), (n, n))?;
        check_finite("initial_mean", initial_mean.view().insert_axis(ndarray::Axis(1)))?;
        check_finite("initial_covariance", initial_covariance.view())?;
        check_symmetric("initial_covariance", initial_covariance.view())?;
        psd_cholesky(initial_covariance.view(), H_ZERO)
            .map_err(|_| SsfError::NotPositiveDefinite { what: "initial_covariance" })?;
        Ok(TimeInvariantDynamics {
            transition,
            noise_loading,
            initial_mean,
            initial_covariance,
            stationary: false,
            diffuse_states: Vec::new(),
        })
    }

    /// Build a stationary model: `a_0 = 0`, `Pf_0` the stationary covariance.
    ///
    /// Errors
    /// ------
    /// - Shape/finiteness errors as in [`TimeInvariantDynamics::new`].
    /// - `SsfError::NonStationary` when `T` is not stable.
    pub fn stationary(transition: Array2<f64>, noise_loading: Array2<f64>) -> SsfResult<Self> {
        let n = Self::validate_transition(&transition, &noise_loading)?;
        let v = noise_loading.dot(&noise_loading.t());
        let initial_covariance = stationary_covariance(transition.view(), v.view())?;
        Ok(TimeInvariantDynamics {
            transition,
            noise_loading,
            initial_mean: Array1::zeros(n),
            initial_covariance,
            stationary: true,
            diffuse_states: Vec::new(),
        })
    }

    /// Mark `states` as diffuse. Filters in this crate reject such models.
    pub fn with_diffuse_states(mut self, states: Vec<usize>) -> Self {
        self.stationary = self.stationary && states.is_empty();
        self.diffuse_states = states;
        self
    }

    pub fn transition(&self) -> ArrayView2<'_, f64> {
        self.transition.view()
    }

    pub fn noise_covariance(&self) -> Array2<f64> {
        self.noise_loading.dot(&self.noise_loading.t())
    }

    pub fn initial_covariance_matrix(&self) -> ArrayView2<'_, f64> {
        self.initial_covariance.view()
    }

    fn validate_transition(t: &Array2<f64>, u: &Array2<f64>) -> SsfResult<usize> {
        let n = t.nrows();
        if n == 0 {
            return Err(SsfError::EmptyState);
        }
        check_shape("transition", t.dim(), (n, n))?;
        check_shape("noise_loading", (u.nrows(), u.ncols()), (n, u.ncols()))?;
        check_finite("transition", t.view())?;
        check_finite("noise_loading", u.view())?;
        Ok(n)
    }
}

impl Dynamics for TimeInvariantDynamics {
    fn state_dim(&self) -> usize {
        self.transition.nrows()
    }

    fn noise_dim(&self) -> usize {
        self.noise_loading.ncols()
    }

    fn is_time_invariant(&self) -> bool {
        true
    }

    fn is_diffuse(&self) -> bool {
        !self.diffuse_states.is_empty()
    }

    fn is_stationary(&self) -> bool {
        self.stationary
    }

    fn initial_mean(&self, mut a0: ArrayViewMut1<'_, f64>) {
        a0.assign(&self.initial_mean);
    }

    fn initial_covariance(&self, mut pf0: ArrayViewMut2<'_, f64>) {
        pf0.assign(&self.initial_covariance);
    }

    fn tx(&self, _pos: usize, mut x: ArrayViewMut1<'_, f64>) {
        let y = self.transition.dot(&x);
        x.assign(&y);
    }

    fn tm(&self, _pos: usize, mut m: ArrayViewMut2<'_, f64>) {
        let y = self.transition.dot(&m);
        m.assign(&y);
    }

    fn noise_loading(&self, _pos: usize, mut u: ArrayViewMut2<'_, f64>) {
        u.assign(&self.noise_loading);
    }
}

// ---- Univariate measurement ----

/// TimeInvariantMeasurement — `y_t = z·α_t + η_t`, `η_t ~ N(0, h)`.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeInvariantMeasurement {
    loading: Array1<f64>,
    variance: f64,
    span: Range<usize>,
}

impl TimeInvariantMeasurement {
    /// Errors
    /// ------
    /// - `SsfError::NonFiniteEntry` for a non-finite loading.
    /// - `SsfError::InvalidVariance` for a negative or non-finite `variance`.
    pub fn new(loading: Array1<f64>, variance: f64) -> SsfResult<Self> {
        if loading.is_empty() {
            return Err(SsfError::EmptyState);
        }
        check_finite("loading", loading.view().insert_axis(ndarray::Axis(0)))?;
        if !variance.is_finite() || variance < 0.0 {
            return Err(SsfError::InvalidVariance { what: "measurement", index: 0, value: variance });
        }
        let span = nonzero_span(loading.view());
        Ok(TimeInvariantMeasurement { loading, variance, span })
    }

    /// Measurement of the first state component, `z = e_1`.
    pub fn first_state(n: usize, variance: f64) -> SsfResult<Self> {
        let mut loading = Array1::zeros(n);
        if n > 0 {
            loading[0] = 1.0;
        }
        Self::new(loading, variance)
    }

    pub fn loading(&self) -> ArrayView1<'_, f64> {
        self.loading.view()
    }
}

impl Measurement for TimeInvariantMeasurement {
    fn is_time_invariant(&self) -> bool {
        true
    }

    fn zx(&self, _pos: usize, x: ArrayView1<'_, f64>) -> f64 {
        let span = self.span.clone();
        self.loading.slice(s![span.clone()]).dot(&x.slice(s![span]))
    }

    fn error_variance(&self, _pos: usize) -> f64 {
        self.variance
    }
}

// ---- Multivariate measurements ----

/// TimeInvariantMeasurements — `y_t = Z·α_t + η_t`, `η_t ~ N(0, H)`.
///
/// Fields
/// ------
/// - `loadings`: `m×n` matrix `Z`.
/// - `covariance`: `m×m` matrix `H`.
/// - `factor`: lower-triangular `R` with `R·Rᵀ = H`.
/// - `independent`: `H` is diagonal.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeInvariantMeasurements {
    loadings: Array2<f64>,
    covariance: Array2<f64>,
    factor: Array2<f64>,
    independent: bool,
    spans: Vec<Range<usize>>,
}

impl TimeInvariantMeasurements {
    /// Errors
    /// ------
    /// - `SsfError::DimensionMismatch` when `H` is not `m×m`.
    /// - `SsfError::NonFiniteEntry` on NaN/±inf.
    /// - `SsfError::NotPositiveDefinite` when `H` is not symmetric PSD.
    pub fn new(loadings: Array2<f64>, covariance: Array2<f64>) -> SsfResult<Self> {
        let m = loadings.nrows();
        if loadings.ncols() == 0 {
            return Err(SsfError::EmptyState);
        }
        check_shape("error_covariance", covariance.dim(), (m, m))?;
        check_finite("loadings", loadings.view())?;
        check_finite("error_covariance", covariance.view())?;
        check_symmetric("error_covariance", covariance.view())?;
        let factor = psd_cholesky(covariance.view(), H_ZERO)
            .map_err(|_| SsfError::NotPositiveDefinite { what: "error_covariance" })?;
        let independent =
            covariance.indexed_iter().all(|((i, j), &v)| i == j || v == 0.0);
        let spans = loadings.rows().into_iter().map(nonzero_span).collect();
        Ok(TimeInvariantMeasurements { loadings, covariance, factor, independent, spans })
    }

    /// Independent errors with the given variances.
    pub fn with_variances(loadings: Array2<f64>, variances: &[f64]) -> SsfResult<Self> {
        if let Some((index, &value)) =
            variances.iter().enumerate().find(|(_, v)| !v.is_finite() || **v < 0.0)
        {
            return Err(SsfError::InvalidVariance { what: "measurement", index, value });
        }
        Self::new(loadings, Array2::from_diag(&Array1::from(variances.to_vec())))
    }

    pub fn loadings(&self) -> ArrayView2<'_, f64> {
        self.loadings.view()
    }
}

impl Measurements for TimeInvariantMeasurements {
    fn max_count(&self) -> usize {
        self.loadings.nrows()
    }

    fn count(&self, _pos: usize) -> usize {
        self.loadings.nrows()
    }

    fn is_homogeneous(&self) -> bool {
        true
    }

    fn is_time_invariant(&self) -> bool {
        true
    }

    fn has_independent_errors(&self) -> bool {
        self.independent
    }

    fn zx(&self, _pos: usize, i: usize, x: ArrayView1<'_, f64>) -> f64 {
        let span = self.spans[i].clone();
        self.loadings.slice(s![i, span.clone()]).dot(&x.slice(s![span]))
    }

    fn error_variance(&self, _pos: usize, i: usize) -> f64 {
        self.covariance[[i, i]]
    }

    fn error_covariance(&self, _pos: usize, mut h: ArrayViewMut2<'_, f64>) {
        h.assign(&self.covariance);
    }

    fn error_factor(&self, _pos: usize, mut r: ArrayViewMut2<'_, f64>) {
        r.assign(&self.factor);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Shape and covariance validation of the dense constructors.
    // - `tx`/`tm`/`zx`/`zm` against explicit matrix products.
    // - Stationary and diffuse flags.
    // -------------------------------------------------------------------------

    fn ar2() -> (Array2<f64>, Array2<f64>) {
        (array![[0.5, 0.3], [1.0, 0.0]], array![[1.0], [0.0]])
    }

    #[test]
    // Purpose
    // -------
    // Check that `tm` equals `tx` applied per column and `T·M`.
    //
    // Given
    // -----
    // - AR(2) companion dynamics and a 2×3 matrix.
    //
    // Expect
    // ------
    // - Identical results from `tm`, column-wise `tx` and `T.dot(M)`.
    fn tm_matches_columnwise_tx() {
        // Arrange
        let (t, u) = ar2();
        let dynamics = TimeInvariantDynamics::stationary(t.clone(), u).expect("stable AR(2)");
        let m = array![[1.0, 2.0, -1.0], [0.5, 0.0, 3.0]];
        let mut by_tm = m.clone();
        let mut by_tx = m.clone();

        // Act
        dynamics.tm(0, by_tm.view_mut());
        for j in 0..3 {
            dynamics.tx(0, by_tx.column_mut(j));
        }

        // Assert
        assert_eq!(by_tm, t.dot(&m));
        assert_eq!(by_tx, by_tm);
        assert!(dynamics.is_stationary());
        assert!(!dynamics.is_diffuse());
    }

    #[test]
    // Purpose
    // -------
    // Verify that the stationary covariance solves the Lyapunov equation.
    //
    // Given
    // -----
    // - Stable AR(2) companion dynamics.
    //
    // Expect
    // ------
    // - `T·P·Tᵀ + V = P` to 1e-12.
    fn stationary_covariance_is_fixed_point() {
        // Arrange
        let (t, u) = ar2();

        // Act
        let dynamics = TimeInvariantDynamics::stationary(t.clone(), u.clone()).expect("stable");
        let p = dynamics.initial_covariance_matrix().to_owned();

        // Assert
        let next = t.dot(&p).dot(&t.t()) + u.dot(&u.t());
        for (a, b) in next.iter().zip(p.iter()) {
            assert_relative_eq!(*a, *b, epsilon = 1e-12);
        }
    }

    #[test]
    // Purpose
    // -------
    // Reject inconsistent shapes and invalid covariances.
    //
    // Given
    // -----
    // - A 2×2 transition with a 3-row loading; an asymmetric `Pf_0`;
    //   a negative measurement variance.
    //
    // Expect
    // ------
    // - `DimensionMismatch`, `NotPositiveDefinite`, `InvalidVariance`.
    fn constructors_reject_invalid_inputs() {
        // Arrange
        let (t, _) = ar2();

        // Act
        let shape = TimeInvariantDynamics::new(
            t.clone(),
            Array2::zeros((3, 1)),
            Array1::zeros(2),
            Array2::eye(2),
        )
        .unwrap_err();
        let asym = TimeInvariantDynamics::new(
            t,
            Array2::zeros((2, 1)),
            Array1::zeros(2),
            array![[1.0, 0.5], [0.0, 1.0]],
        )
        .unwrap_err();
        let var = TimeInvariantMeasurement::new(array![1.0, 0.0], -1.0).unwrap_err();

        // Assert
        assert!(matches!(shape, SsfError::DimensionMismatch { what: "noise_loading", .. }));
        assert_eq!(asym, SsfError::NotPositiveDefinite { what: "initial_covariance" });
        assert!(matches!(var, SsfError::InvalidVariance { .. }));
    }

    #[test]
    // Purpose
    // -------
    // Check multivariate loadings, covariance factor and independence flag.
    //
    // Given
    // -----
    // - `Z` with a zero leading column and a correlated 2×2 `H`.
    //
    // Expect
    // ------
    // - `zx` equals the row dot product; `R·Rᵀ = H`; errors not independent.
    fn measurements_apply_rows_and_factor() {
        // Arrange
        let z = array![[0.0, 1.0, 2.0], [0.0, 0.0, 1.0]];
        let h = array![[1.0, 0.3], [0.3, 2.0]];
        let x = array![5.0, -1.0, 0.5];

        // Act
        let meas = TimeInvariantMeasurements::new(z.clone(), h.clone()).expect("valid");
        let mut r = Array2::<f64>::zeros((2, 2));
        meas.error_factor(0, r.view_mut());

        // Assert
        assert_eq!(meas.zx(0, 0, x.view()), z.row(0).dot(&x));
        assert_eq!(meas.zx(0, 1, x.view()), 0.5);
        assert!(!meas.has_independent_errors());
        let back = r.dot(&r.t());
        for (a, b) in back.iter().zip(h.iter()) {
            assert_relative_eq!(*a, *b, epsilon = 1e-14);
        }
    }
}
