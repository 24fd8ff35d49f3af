//! measurement — observation contracts (univariate and multivariate).
//!
//! Purpose
//! -------
//! Describe the observation equation `y_t = Z_t·α_t + η_t` through the
//! operations the filters need: applying loading rows to state vectors and
//! matrices, and reporting the error covariance `H_t`.
//!
//! Key behaviors
//! -------------
//! - [`Measurement`] is the univariate contract used by the fast filter.
//! - [`Measurements`] is the multivariate contract used by the array filter.
//!   Every `Measurement` is a one-component `Measurements` through a blanket
//!   implementation, so univariate models run through both filters.
//!
//! Invariants & assumptions
//! ------------------------
//! - `count(pos) <= max_count()` for every `pos`; a *homogeneous* family has
//!   `count(pos) == max_count()` everywhere.
//! - `error_covariance` writes a symmetric PSD matrix whose diagonal equals
//!   `error_variance`; `error_factor` writes a lower-triangular `R` with
//!   `R·Rᵀ = H`.
use crate::ssf::core::linalg::psd_cholesky;
use ndarray::{ArrayView1, ArrayView2, ArrayViewMut1, ArrayViewMut2, Axis};

/// Tolerance for the default PSD factorization in [`Measurements::error_factor`].
const FACTOR_ZERO: f64 = 1e-9;

/// Univariate measurement: one loading row `Z_t` and a scalar variance `h_t`.
pub trait Measurement {
    /// `true` when `Z`, `h` do not depend on `pos`.
    fn is_time_invariant(&self) -> bool;

    /// `Z_pos·x`.
    fn zx(&self, pos: usize, x: ArrayView1<'_, f64>) -> f64;

    /// `out[j] ← Z_pos·m[:, j]`.
    fn zm(&self, pos: usize, m: ArrayView2<'_, f64>, mut out: ArrayViewMut1<'_, f64>) {
        for (o, col) in out.iter_mut().zip(m.axis_iter(Axis(1))) {
            *o = self.zx(pos, col);
        }
    }

    /// Error variance `h_pos` (≥ 0).
    fn error_variance(&self, pos: usize) -> f64;
}

/// Multivariate measurement family.
pub trait Measurements {
    /// Largest number of components at any position.
    fn max_count(&self) -> usize;

    /// Number of components at `pos`.
    fn count(&self, pos: usize) -> usize;

    /// `true` when `count(pos) == max_count()` for every `pos`.
    fn is_homogeneous(&self) -> bool;

    fn is_time_invariant(&self) -> bool;

    /// `true` when `H_pos` is diagonal.
    fn has_independent_errors(&self) -> bool;

    /// `Z_pos[i, :]·x`.
    fn zx(&self, pos: usize, i: usize, x: ArrayView1<'_, f64>) -> f64;

    /// `out[j] ← Z_pos[i, :]·m[:, j]`.
    fn zm(&self, pos: usize, i: usize, m: ArrayView2<'_, f64>, mut out: ArrayViewMut1<'_, f64>) {
        for (o, col) in out.iter_mut().zip(m.axis_iter(Axis(1))) {
            *o = self.zx(pos, i, col);
        }
    }

    /// `H_pos[i, i]`.
    fn error_variance(&self, pos: usize, i: usize) -> f64;

    /// Write `H_pos` (`count×count`). Defaults to the diagonal of variances.
    fn error_covariance(&self, pos: usize, mut h: ArrayViewMut2<'_, f64>) {
        h.fill(0.0);
        for i in 0..self.count(pos) {
            h[[i, i]] = self.error_variance(pos, i);
        }
    }

    /// Write a lower-triangular `R` with `R·Rᵀ = H_pos`.
    ///
    /// The default factorizes [`Measurements::error_covariance`] with a
    /// semidefinite Cholesky; models holding a precomputed square root should
    /// override it.
    fn error_factor(&self, pos: usize, mut r: ArrayViewMut2<'_, f64>) {
        if self.has_independent_errors() {
            r.fill(0.0);
            for i in 0..self.count(pos) {
                r[[i, i]] = self.error_variance(pos, i).max(0.0).sqrt();
            }
            return;
        }
        self.error_covariance(pos, r.view_mut());
        let h = r.to_owned();
        match psd_cholesky(h.view(), FACTOR_ZERO) {
            Ok(factor) => r.assign(&factor),
            Err(_) => {
                log::warn!("error covariance at position {pos} is not PSD; using its diagonal");
                r.fill(0.0);
                for i in 0..h.nrows() {
                    r[[i, i]] = h[[i, i]].max(0.0).sqrt();
                }
            }
        }
    }
}

impl<M: Measurement> Measurements for M {
    fn max_count(&self) -> usize {
        1
    }

    fn count(&self, _pos: usize) -> usize {
        1
    }

    fn is_homogeneous(&self) -> bool {
        true
    }

    fn is_time_invariant(&self) -> bool {
        Measurement::is_time_invariant(self)
    }

    fn has_independent_errors(&self) -> bool {
        true
    }

    fn zx(&self, pos: usize, _i: usize, x: ArrayView1<'_, f64>) -> f64 {
        Measurement::zx(self, pos, x)
    }

    fn zm(&self, pos: usize, _i: usize, m: ArrayView2<'_, f64>, out: ArrayViewMut1<'_, f64>) {
        Measurement::zm(self, pos, m, out)
    }

    fn error_variance(&self, pos: usize, _i: usize) -> f64 {
        Measurement::error_variance(self, pos)
    }
}
