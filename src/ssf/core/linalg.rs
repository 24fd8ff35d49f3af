//! linalg — dense covariance helpers shared by models and filters.
//!
//! Purpose
//! -------
//! Collect the small set of dense matrix routines the state-space layer needs:
//! a semidefinite-tolerant Cholesky factorization (initial covariances are
//! often singular), positive-definite Cholesky and spectral radius through
//! `nalgebra`, and the stationary covariance of a stable transition.
//!
//! Key behaviors
//! -------------
//! - [`psd_cholesky`] treats pivots in `[-zero, zero]` as structural zeros and
//!   fails only on clearly negative pivots.
//! - [`pd_cholesky`] and [`spectral_radius`] copy into a `nalgebra::DMatrix`
//!   via [`fill_dmatrix`] and use its decompositions.
//! - [`stationary_covariance`] solves `P = T·P·Tᵀ + V` by doubling
//!   (`P ← P + A·P·Aᵀ`, `A ← A²`), after checking that `T` is stable. When
//!   the Schur step cannot produce a radius the check is logged at debug
//!   level and a divergent doubling reports non-convergence instead.
//!
//! Invariants & assumptions
//! ------------------------
//! - Inputs are square where required; shape mismatches are programming
//!   errors and panic through ndarray indexing.
//! - Returned factors are lower triangular with a non-negative diagonal.
//!
//! Testing notes
//! -------------
//! - Unit tests reconstruct `L·Lᵀ`, exercise singular inputs, and compare the
//!   doubling solution with the closed form of a scalar AR(1).
use crate::ssf::errors::{SsfError, SsfResult};
use nalgebra::{DMatrix, Schur};
use ndarray::{Array2, ArrayView2, s};

/// Maximum doubling steps; each step doubles the number of summed terms.
const MAX_DOUBLING: usize = 100;

/// Relative convergence tolerance of the doubling iteration.
const DOUBLING_TOL: f64 = 1e-15;

/// Spectral radius at or above which a transition is treated as non-stationary.
const STABILITY_LIMIT: f64 = 1.0 - 1e-10;

/// psd_cholesky — lower Cholesky factor of a symmetric PSD matrix.
///
/// Parameters
/// ----------
/// - `p`: `ArrayView2<f64>`
///   Symmetric `n×n` matrix; only the lower triangle is read.
/// - `zero`: `f64`
///   Pivot tolerance. Pivots with `|d| <= zero` produce a zero column.
///
/// Returns
/// -------
/// - `Array2<f64>` lower-triangular `L` with `L·Lᵀ ≈ p` and `diag(L) >= 0`.
///
/// Errors
/// ------
/// - `SsfError::NotPositiveDefinite` when a pivot is below `-zero`.
pub fn psd_cholesky(p: ArrayView2<'_, f64>, zero: f64) -> SsfResult<Array2<f64>> {
    let n = p.nrows();
    let mut l = Array2::<f64>::zeros((n, n));
    for j in 0..n {
        let d = p[[j, j]] - l.slice(s![j, ..j]).dot(&l.slice(s![j, ..j]));
        if d < -zero || d.is_nan() {
            return Err(SsfError::NotPositiveDefinite { what: "covariance" });
        }
        if d <= zero {
            continue;
        }
        let pivot = d.sqrt();
        l[[j, j]] = pivot;
        for i in j + 1..n {
            let v = p[[i, j]] - l.slice(s![i, ..j]).dot(&l.slice(s![j, ..j]));
            l[[i, j]] = v / pivot;
        }
    }
    Ok(l)
}

/// Lower Cholesky factor of a symmetric positive definite matrix.
///
/// Errors
/// ------
/// - `SsfError::NotPositiveDefinite { what }` when `nalgebra` rejects `m`.
pub fn pd_cholesky(m: ArrayView2<'_, f64>, what: &'static str) -> SsfResult<Array2<f64>> {
    let mut dm = DMatrix::<f64>::zeros(m.nrows(), m.ncols());
    fill_dmatrix(m, &mut dm);
    let chol = nalgebra::Cholesky::new(dm).ok_or(SsfError::NotPositiveDefinite { what })?;
    let lower = chol.l();
    Ok(Array2::from_shape_fn((m.nrows(), m.ncols()), |(i, j)| lower[(i, j)]))
}

/// Largest eigenvalue modulus of a square matrix, `None` if the Schur
/// iteration does not converge.
pub fn spectral_radius(t: ArrayView2<'_, f64>) -> Option<f64> {
    let n = t.nrows();
    if n == 0 {
        return Some(0.0);
    }
    let mut dm = DMatrix::<f64>::zeros(n, n);
    fill_dmatrix(t, &mut dm);
    let schur = Schur::try_new(dm, f64::EPSILON, 10_000)?;
    Some(schur.complex_eigenvalues().iter().map(|z| z.norm()).fold(0.0, f64::max))
}

/// stationary_covariance — solve `P = T·P·Tᵀ + V` for a stable `T`.
///
/// Parameters
/// ----------
/// - `t`: `ArrayView2<f64>`
///   `n×n` transition.
/// - `v`: `ArrayView2<f64>`
///   `n×n` symmetric PSD innovation covariance.
///
/// Returns
/// -------
/// - Symmetric `n×n` stationary covariance.
///
/// Errors
/// ------
/// - `SsfError::NonStationary` when the spectral radius of `T` is ≥ 1.
/// - `SsfError::StationaryCovarianceNotConverged` when doubling fails to
///   settle (e.g. the Schur step could not certify stability).
pub fn stationary_covariance(t: ArrayView2<'_, f64>, v: ArrayView2<'_, f64>) -> SsfResult<Array2<f64>> {
    check_stability(spectral_radius(t))?;
    solve_by_doubling(t, v)
}

/// Reject a spectral radius at or above the stability limit. An unknown
/// radius is let through; the doubling iteration then decides.
fn check_stability(radius: Option<f64>) -> SsfResult<()> {
    match radius {
        Some(rho) if rho >= STABILITY_LIMIT => Err(SsfError::NonStationary { spectral_radius: rho }),
        Some(_) => Ok(()),
        None => {
            log::debug!("stationary covariance: Schur iteration did not converge, stability left to the doubling iteration");
            Ok(())
        }
    }
}

fn solve_by_doubling(t: ArrayView2<'_, f64>, v: ArrayView2<'_, f64>) -> SsfResult<Array2<f64>> {
    let mut a = t.to_owned();
    let mut p = v.to_owned();
    for _ in 0..MAX_DOUBLING {
        let increment = a.dot(&p).dot(&a.t());
        let scale = p.iter().fold(0.0_f64, |acc, x| acc.max(x.abs()));
        let delta = increment.iter().fold(0.0_f64, |acc, x| acc.max(x.abs()));
        p += &increment;
        if !delta.is_finite() {
            break;
        }
        if delta <= DOUBLING_TOL * (1.0 + scale) {
            symmetrize(&mut p);
            return Ok(p);
        }
        a = a.dot(&a);
    }
    Err(SsfError::StationaryCovarianceNotConverged { iterations: MAX_DOUBLING })
}

/// fill_dmatrix — copy an `ndarray` matrix into a preallocated `DMatrix`.
///
/// Notes
/// -----
/// - The copy proceeds column by column, matching `DMatrix` storage.
/// - Shapes must agree; a mismatch panics through indexing.
pub fn fill_dmatrix(src: ArrayView2<'_, f64>, dst: &mut DMatrix<f64>) {
    for j in 0..src.ncols() {
        for i in 0..src.nrows() {
            dst[(i, j)] = src[[i, j]];
        }
    }
}

/// `p ← (p + pᵀ)/2`.
pub fn symmetrize(p: &mut Array2<f64>) {
    let n = p.nrows();
    for i in 0..n {
        for j in 0..i {
            let avg = 0.5 * (p[[i, j]] + p[[j, i]]);
            p[[i, j]] = avg;
            p[[j, i]] = avg;
        }
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
    // - PSD Cholesky on definite and singular inputs, and its failure mode.
    // - nalgebra-backed Cholesky and spectral radius.
    // - Stationary covariance by doubling (AR(1), nilpotent shift).
    // - The fallback when no spectral radius is available.
    //
    // They intentionally DO NOT cover:
    // - Use of the factors inside the filters.
    // -------------------------------------------------------------------------

    #[test]
    // Purpose
    // -------
    // Reconstruct a definite matrix from its PSD Cholesky factor.
    //
    // Given
    // -----
    // - A 3×3 symmetric positive definite matrix.
    //
    // Expect
    // ------
    // - `L` lower triangular with positive diagonal and `L·Lᵀ = P`.
    fn psd_cholesky_reconstructs_definite_matrix() {
        // Arrange
        let p = array![[4.0, 2.0, 0.4], [2.0, 3.0, 0.5], [0.4, 0.5, 2.0]];

        // Act
        let l = psd_cholesky(p.view(), 1e-9).expect("matrix is definite");

        // Assert
        assert_eq!(l[[0, 1]], 0.0);
        assert!(l.diag().iter().all(|&d| d > 0.0));
        let back = l.dot(&l.t());
        for (a, b) in back.iter().zip(p.iter()) {
            assert_relative_eq!(*a, *b, epsilon = 1e-12);
        }
    }

    #[test]
    // Purpose
    // -------
    // Accept singular PSD inputs and reject indefinite ones.
    //
    // Given
    // -----
    // - A rank-one matrix `v·vᵀ` with `v = (1, 2)` and an indefinite matrix.
    //
    // Expect
    // ------
    // - Rank-one: second pivot is zero and the factor reconstructs the input.
    // - Indefinite: `NotPositiveDefinite`.
    fn psd_cholesky_handles_singular_and_indefinite() {
        // Arrange
        let rank_one = array![[1.0, 2.0], [2.0, 4.0]];
        let indefinite = array![[1.0, 2.0], [2.0, 1.0]];

        // Act
        let l = psd_cholesky(rank_one.view(), 1e-9).expect("rank-one PSD matrix");
        let err = psd_cholesky(indefinite.view(), 1e-9).unwrap_err();

        // Assert
        assert_eq!(l[[1, 1]], 0.0);
        assert_eq!(l.dot(&l.t()), rank_one);
        assert_eq!(err, SsfError::NotPositiveDefinite { what: "covariance" });
    }

    #[test]
    // Purpose
    // -------
    // Check the nalgebra-backed helpers on matrices with known answers.
    //
    // Given
    // -----
    // - A diagonal SPD matrix and an upper-triangular transition with
    //   eigenvalues 0.5 and −0.9.
    //
    // Expect
    // ------
    // - `pd_cholesky` returns the element-wise square root of the diagonal.
    // - `spectral_radius` returns 0.9.
    fn nalgebra_helpers_match_known_values() {
        // Arrange
        let d = array![[4.0, 0.0], [0.0, 9.0]];
        let t = array![[0.5, 3.0], [0.0, -0.9]];

        // Act
        let l = pd_cholesky(d.view(), "test").expect("diagonal SPD");
        let rho = spectral_radius(t.view()).expect("Schur converges on 2x2");

        // Assert
        assert_relative_eq!(l[[0, 0]], 2.0, epsilon = 1e-14);
        assert_relative_eq!(l[[1, 1]], 3.0, epsilon = 1e-14);
        assert_relative_eq!(rho, 0.9, epsilon = 1e-12);
    }

    #[test]
    // Purpose
    // -------
    // Compare the doubling solution with closed forms.
    //
    // Given
    // -----
    // - Scalar AR(1) with φ = 0.8 and unit noise: P = 1/(1−φ²).
    // - A 3×3 shift (nilpotent) with V = e1·e1ᵀ: P = I.
    // - An explosive scalar transition φ = 1.2.
    //
    // Expect
    // ------
    // - Matching values, and `NonStationary` for the explosive case.
    fn stationary_covariance_matches_closed_forms() {
        // Arrange
        let ar = array![[0.8]];
        let shift = array![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]];
        let mut v_shift = Array2::<f64>::zeros((3, 3));
        v_shift[[0, 0]] = 1.0;

        // Act
        let p_ar = stationary_covariance(ar.view(), array![[1.0]].view()).expect("stable AR(1)");
        let p_shift = stationary_covariance(shift.view(), v_shift.view()).expect("nilpotent shift");
        let err = stationary_covariance(array![[1.2]].view(), array![[1.0]].view()).unwrap_err();

        // Assert
        assert_relative_eq!(p_ar[[0, 0]], 1.0 / (1.0 - 0.64), epsilon = 1e-12);
        assert_eq!(p_shift, Array2::<f64>::eye(3));
        assert!(matches!(err, SsfError::NonStationary { .. }));
    }

    #[test]
    // Purpose
    // -------
    // Without a spectral radius, an explosive transition must still fail,
    // now through the doubling iteration.
    //
    // Given
    // -----
    // - No radius for the stability check; the explosive scalar φ = 1.5.
    // - A known radius of exactly 1.
    //
    // Expect
    // ------
    // - The check passes, and doubling reports
    //   `StationaryCovarianceNotConverged` after `MAX_DOUBLING` steps.
    // - Radius 1 is `NonStationary`.
    fn missing_radius_defers_to_doubling() {
        // Arrange
        let t = array![[1.5]];
        let v = array![[1.0]];

        // Act
        let unknown = check_stability(None);
        let err = solve_by_doubling(t.view(), v.view()).unwrap_err();
        let unit = check_stability(Some(1.0)).unwrap_err();

        // Assert
        assert!(unknown.is_ok());
        assert_eq!(err, SsfError::StationaryCovarianceNotConverged { iterations: MAX_DOUBLING });
        assert!(matches!(unit, SsfError::NonStationary { spectral_radius } if spectral_radius == 1.0));
        assert!(check_stability(Some(0.5)).is_ok());
    }
}
