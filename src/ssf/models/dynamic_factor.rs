//! dynamic_factor — measurement and factor dynamics of a dynamic factor model.
//!
//! Purpose
//! -------
//! Translate a list of per-indicator descriptors into the loading matrix and
//! measurement-noise covariance of a dynamic factor model, and assemble the
//! VAR transition driving the factors. The result plugs into the array
//! filter through the [`Measurements`] and [`Dynamics`](crate::ssf::core::Dynamics)
//! contracts.
//!
//! Key behaviors
//! -------------
//! - The state holds one block of `block_len` lags per factor:
//!   `[f_{i,t}, f_{i,t−1}, …, f_{i,t−block_len+1}]`, factor-major.
//! - A [`MeasurementStructure`] states how an indicator aggregates the lags of
//!   a factor (level, difference, cumulation, cumulated differences).
//!   Indicator `k` loads factor `i` on positions
//!   `i·block_len .. i·block_len + structure.len()` with weights
//!   `coefficient_{k,i}·structure.weights()`.
//! - Coefficients that are `NaN` or `0` mark an unused factor; its block is
//!   left out of the loading row entirely.
//! - Measurement errors are independent; the builder keeps the diagonal
//!   covariance and its square root, the latter being handed to the array
//!   filter as the error factor.
//! - [`factor_dynamics`] builds the companion-form VAR(p) transition with
//!   noise loading `chol(Σ)` on the leading position of each block and a
//!   stationary initial covariance.
//!
//! Invariants & assumptions
//! ------------------------
//! - Every structure length and the VAR order fit inside `block_len`.
//! - Variances are finite and ≥ 0 (0 = exactly measured indicator).
//!
//! Conventions
//! -----------
//! - VAR coefficients are lag-major: `A_l[i, j]` sits at column
//!   `(l − 1)·nfactors + j` of row `i`.
use crate::ssf::{
    core::{
        linalg::pd_cholesky,
        measurement::Measurements,
        model::Ssf,
    },
    errors::{SsfError, SsfResult},
    models::time_invariant::TimeInvariantDynamics,
};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, ArrayViewMut1, ArrayViewMut2, s};
use std::ops::Range;

/// How an indicator aggregates the lags of a factor.
#[derive(Debug, Clone, PartialEq)]
pub enum MeasurementStructure {
    /// `f_t`.
    Level,
    /// `f_t − f_{t−1}`.
    Difference,
    /// `f_t + … + f_{t−l+1}`.
    Cumulative(usize),
    /// Differences of an `l`-period cumulation observed at the low frequency:
    /// weights `1, 2, …, l, …, 2, 1` (length `2l − 1`).
    CumulatedDifferences(usize),
    /// Arbitrary weights on `f_t, f_{t−1}, …`.
    Custom(Vec<f64>),
}

impl MeasurementStructure {
    /// Number of factor lags touched.
    pub fn len(&self) -> usize {
        match self {
            MeasurementStructure::Level => 1,
            MeasurementStructure::Difference => 2,
            MeasurementStructure::Cumulative(l) => *l,
            MeasurementStructure::CumulatedDifferences(l) => (2 * l).saturating_sub(1),
            MeasurementStructure::Custom(w) => w.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Weights applied to `f_t, f_{t−1}, …`.
    pub fn weights(&self) -> Vec<f64> {
        match self {
            MeasurementStructure::Level => vec![1.0],
            MeasurementStructure::Difference => vec![1.0, -1.0],
            MeasurementStructure::Cumulative(l) => vec![1.0; *l],
            MeasurementStructure::CumulatedDifferences(l) => {
                let l = *l;
                (0..self.len()).map(|k| if k < l { (k + 1) as f64 } else { (2 * l - 1 - k) as f64 }).collect()
            }
            MeasurementStructure::Custom(w) => w.clone(),
        }
    }
}

/// One indicator of the model.
///
/// Fields
/// ------
/// - `structure`: aggregation of factor lags.
/// - `coefficients`: one loading per factor; `NaN` or `0` = factor unused.
/// - `variance`: measurement-error variance (≥ 0).
#[derive(Debug, Clone, PartialEq)]
pub struct MeasurementDescriptor {
    pub structure: MeasurementStructure,
    pub coefficients: Vec<f64>,
    pub variance: f64,
}

impl MeasurementDescriptor {
    pub fn new(structure: MeasurementStructure, coefficients: Vec<f64>, variance: f64) -> Self {
        MeasurementDescriptor { structure, coefficients, variance }
    }

    fn uses(&self, factor: usize) -> bool {
        let c = self.coefficients[factor];
        !c.is_nan() && c != 0.0
    }
}

/// DynamicFactorMeasurements — loadings and noise of a dynamic factor model.
///
/// Fields
/// ------
/// - `loadings`: `nind×(nfactors·block_len)` matrix `Z`.
/// - `noise`: diagonal `nind×nind` matrix `H`.
/// - `noise_sqrt`: diagonal square root of `H`.
/// - `spans`: per indicator, the state ranges with nonzero loadings.
#[derive(Debug, Clone, PartialEq)]
pub struct DynamicFactorMeasurements {
    nfactors: usize,
    block_len: usize,
    loadings: Array2<f64>,
    noise: Array2<f64>,
    noise_sqrt: Array2<f64>,
    spans: Vec<Vec<Range<usize>>>,
}

impl DynamicFactorMeasurements {
    /// build — assemble loadings and noise from indicator descriptors.
    ///
    /// Parameters
    /// ----------
    /// - `nfactors`: number of factors (≥ 1).
    /// - `block_len`: lags kept per factor (≥ 1).
    /// - `descriptors`: one entry per indicator.
    ///
    /// Errors
    /// ------
    /// - `SsfError::NoMeasurements` when `descriptors` is empty.
    /// - `SsfError::InvalidFactorLayout` for zero factors or block length.
    /// - `SsfError::CoefficientCount` when a descriptor does not carry one
    ///   coefficient per factor.
    /// - `SsfError::StructureTooLong` when a structure exceeds `block_len`.
    /// - `SsfError::NonFiniteEntry` for an infinite coefficient or weight.
    /// - `SsfError::InvalidVariance` for a negative or non-finite variance.
    pub fn build(
        nfactors: usize, block_len: usize, descriptors: &[MeasurementDescriptor],
    ) -> SsfResult<Self> {
        if descriptors.is_empty() {
            return Err(SsfError::NoMeasurements);
        }
        if nfactors == 0 || block_len == 0 {
            return Err(SsfError::InvalidFactorLayout { nfactors, block_len });
        }
        let nind = descriptors.len();
        let mut loadings = Array2::<f64>::zeros((nind, nfactors * block_len));
        let mut variances = Array1::<f64>::zeros(nind);
        let mut spans = Vec::with_capacity(nind);

        for (k, desc) in descriptors.iter().enumerate() {
            if desc.coefficients.len() != nfactors {
                return Err(SsfError::CoefficientCount {
                    index: k,
                    expected: nfactors,
                    actual: desc.coefficients.len(),
                });
            }
            let len = desc.structure.len();
            if len > block_len {
                return Err(SsfError::StructureTooLong { index: k, len, block_len });
            }
            if !desc.variance.is_finite() || desc.variance < 0.0 {
                return Err(SsfError::InvalidVariance {
                    what: "indicator",
                    index: k,
                    value: desc.variance,
                });
            }
            let weights = desc.structure.weights();
            if weights.iter().any(|w| !w.is_finite()) {
                return Err(SsfError::NonFiniteEntry { what: "structure weights", index: (k, 0) });
            }

            let mut row_spans = Vec::new();
            for factor in 0..nfactors {
                if !desc.uses(factor) {
                    continue;
                }
                let c = desc.coefficients[factor];
                if c.is_infinite() {
                    return Err(SsfError::NonFiniteEntry {
                        what: "loading coefficient",
                        index: (k, factor),
                    });
                }
                let start = factor * block_len;
                for (lag, w) in weights.iter().enumerate() {
                    loadings[[k, start + lag]] = c * w;
                }
                row_spans.push(start..start + len);
            }
            variances[k] = desc.variance;
            spans.push(row_spans);
        }

        log::debug!(
            "dynamic factor measurements: {nind} indicators, {nfactors} factors, block length {block_len}"
        );
        Ok(DynamicFactorMeasurements {
            nfactors,
            block_len,
            loadings,
            noise_sqrt: Array2::from_diag(&variances.mapv(f64::sqrt)),
            noise: Array2::from_diag(&variances),
            spans,
        })
    }

    pub fn nfactors(&self) -> usize {
        self.nfactors
    }

    pub fn block_len(&self) -> usize {
        self.block_len
    }

    /// Loading matrix `Z`.
    pub fn loadings(&self) -> ArrayView2<'_, f64> {
        self.loadings.view()
    }

    /// Noise covariance `H`.
    pub fn noise_covariance(&self) -> ArrayView2<'_, f64> {
        self.noise.view()
    }

    /// Square root of `H`.
    pub fn noise_sqrt(&self) -> ArrayView2<'_, f64> {
        self.noise_sqrt.view()
    }
}

impl Measurements for DynamicFactorMeasurements {
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
        true
    }

    fn zx(&self, _pos: usize, i: usize, x: ArrayView1<'_, f64>) -> f64 {
        self.spans[i]
            .iter()
            .map(|span| self.loadings.slice(s![i, span.clone()]).dot(&x.slice(s![span.clone()])))
            .sum()
    }

    fn zm(&self, _pos: usize, i: usize, m: ArrayView2<'_, f64>, mut out: ArrayViewMut1<'_, f64>) {
        out.fill(0.0);
        for span in &self.spans[i] {
            let contribution = self.loadings.slice(s![i, span.clone()]).dot(&m.slice(s![span.clone(), ..]));
            out += &contribution;
        }
    }

    fn error_variance(&self, _pos: usize, i: usize) -> f64 {
        self.noise[[i, i]]
    }

    fn error_covariance(&self, _pos: usize, mut h: ArrayViewMut2<'_, f64>) {
        h.assign(&self.noise);
    }

    fn error_factor(&self, _pos: usize, mut r: ArrayViewMut2<'_, f64>) {
        r.assign(&self.noise_sqrt);
    }
}

// ---- Factor dynamics ----

/// VarDescriptor — VAR(p) driving the factors.
///
/// Fields
/// ------
/// - `coefficients`: `nfactors×(nfactors·p)`, lag-major.
/// - `covariance`: `nfactors×nfactors` innovation covariance (SPD).
#[derive(Debug, Clone, PartialEq)]
pub struct VarDescriptor {
    pub coefficients: Array2<f64>,
    pub covariance: Array2<f64>,
}

impl VarDescriptor {
    /// Errors
    /// ------
    /// - `SsfError::InvalidFactorLayout` when there are no factors.
    /// - `SsfError::DimensionMismatch` when the shapes are inconsistent.
    pub fn new(coefficients: Array2<f64>, covariance: Array2<f64>) -> SsfResult<Self> {
        let nf = coefficients.nrows();
        if nf == 0 {
            return Err(SsfError::InvalidFactorLayout { nfactors: 0, block_len: 0 });
        }
        if coefficients.ncols() % nf != 0 || coefficients.ncols() == 0 {
            return Err(SsfError::DimensionMismatch {
                what: "var_coefficients",
                expected: (nf, nf * (coefficients.ncols() / nf).max(1)),
                actual: coefficients.dim(),
            });
        }
        if covariance.dim() != (nf, nf) {
            return Err(SsfError::DimensionMismatch {
                what: "var_covariance",
                expected: (nf, nf),
                actual: covariance.dim(),
            });
        }
        Ok(VarDescriptor { coefficients, covariance })
    }

    pub fn nfactors(&self) -> usize {
        self.coefficients.nrows()
    }

    pub fn nlags(&self) -> usize {
        self.coefficients.ncols() / self.coefficients.nrows()
    }
}

/// factor_dynamics — companion-form VAR transition over factor blocks.
///
/// Errors
/// ------
/// - `SsfError::TooManyLags` when `var.nlags() > block_len`.
/// - `SsfError::NotPositiveDefinite` when the innovation covariance is not SPD.
/// - `SsfError::NonStationary` when the VAR is not stable.
pub fn factor_dynamics(var: &VarDescriptor, block_len: usize) -> SsfResult<TimeInvariantDynamics> {
    let nf = var.nfactors();
    let nlags = var.nlags();
    if block_len == 0 {
        return Err(SsfError::InvalidFactorLayout { nfactors: nf, block_len });
    }
    if nlags > block_len {
        return Err(SsfError::TooManyLags { nlags, block_len });
    }
    let n = nf * block_len;
    let mut transition = Array2::<f64>::zeros((n, n));
    for i in 0..nf {
        let row = i * block_len;
        for lag in 0..nlags {
            for j in 0..nf {
                transition[[row, j * block_len + lag]] = var.coefficients[[i, lag * nf + j]];
            }
        }
        for k in 1..block_len {
            transition[[row + k, row + k - 1]] = 1.0;
        }
    }
    let chol = pd_cholesky(var.covariance.view(), "var_covariance")?;
    let mut noise_loading = Array2::<f64>::zeros((n, nf));
    for i in 0..nf {
        noise_loading.row_mut(i * block_len).assign(&chol.row(i));
    }
    TimeInvariantDynamics::stationary(transition, noise_loading)
}

/// Full dynamic factor model: VAR factor dynamics plus indicator loadings.
///
/// Errors
/// ------
/// - Errors of [`factor_dynamics`] and [`DynamicFactorMeasurements::build`].
/// - `SsfError::CoefficientCount` when descriptors disagree with the VAR
///   factor count.
pub fn dynamic_factor_ssf(
    var: &VarDescriptor, block_len: usize, descriptors: &[MeasurementDescriptor],
) -> SsfResult<Ssf<TimeInvariantDynamics, DynamicFactorMeasurements>> {
    let measurements = DynamicFactorMeasurements::build(var.nfactors(), block_len, descriptors)?;
    let dynamics = factor_dynamics(var, block_len)?;
    Ok(Ssf::new(dynamics, measurements))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ssf::core::Dynamics;
    use approx::assert_relative_eq;
    use ndarray::array;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Structure weights (cumulated differences in particular).
    // - Loading layout, unused factors, noise and its square root.
    // - `zx`/`zm` against the dense loading matrix.
    // - VAR companion layout and descriptor validation.
    //
    // They intentionally DO NOT cover:
    // - Filtering with these models (see the integration tests).
    // -------------------------------------------------------------------------

    fn descriptors() -> Vec<MeasurementDescriptor> {
        vec![
            MeasurementDescriptor::new(MeasurementStructure::Level, vec![1.0, f64::NAN], 0.5),
            MeasurementDescriptor::new(MeasurementStructure::CumulatedDifferences(2), vec![0.5, 2.0], 1.0),
            MeasurementDescriptor::new(MeasurementStructure::Difference, vec![0.0, -1.0], 0.0),
        ]
    }

    #[test]
    // Purpose
    // -------
    // Check the triangular weights of cumulated differences.
    //
    // Given
    // -----
    // - `CumulatedDifferences(3)` and `CumulatedDifferences(1)`.
    //
    // Expect
    // ------
    // - `[1, 2, 3, 2, 1]` (length 5) and `[1]`.
    fn cumulated_differences_weights_are_triangular() {
        assert_eq!(MeasurementStructure::CumulatedDifferences(3).weights(), vec![1.0, 2.0, 3.0, 2.0, 1.0]);
        assert_eq!(MeasurementStructure::CumulatedDifferences(3).len(), 5);
        assert_eq!(MeasurementStructure::CumulatedDifferences(1).weights(), vec![1.0]);
    }

    #[test]
    // Purpose
    // -------
    // Verify the loading layout and noise matrices.
    //
    // Given
    // -----
    // - Two factors, block length 4, three indicators (level on factor 0,
    //   cumulated differences on both, difference on factor 1 only).
    //
    // Expect
    // ------
    // - Rows `[1,0,0,0 | 0,0,0,0]`, `[0.5,1,0.5,0 | 2,4,2,0]`,
    //   `[0,0,0,0 | −1,1,0,0]`.
    // - `H = diag(0.5, 1, 0)`, square root `diag(√0.5, 1, 0)`.
    fn build_lays_out_loadings_by_factor_block() {
        // Arrange / Act
        let meas = DynamicFactorMeasurements::build(2, 4, &descriptors()).expect("valid");

        // Assert
        let expected = array![
            [1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0],
            [0.5, 1.0, 0.5, 0.0, 2.0, 4.0, 2.0, 0.0],
            [0.0, 0.0, 0.0, 0.0, -1.0, 1.0, 0.0, 0.0]
        ];
        assert_eq!(meas.loadings(), expected);
        assert_eq!(meas.noise_covariance().diag().to_vec(), vec![0.5, 1.0, 0.0]);
        assert_relative_eq!(meas.noise_sqrt()[[0, 0]], 0.5_f64.sqrt());
        assert_eq!(meas.noise_sqrt()[[0, 1]], 0.0);
    }

    #[test]
    // Purpose
    // -------
    // Span-restricted products must equal dense products.
    //
    // Given
    // -----
    // - The three-indicator model, a state vector and a 8×3 matrix.
    //
    // Expect
    // ------
    // - `zx` and `zm` equal `Z·x` and `Z·M` row by row (to 1e-14).
    fn zx_and_zm_match_dense_products() {
        // Arrange
        let meas = DynamicFactorMeasurements::build(2, 4, &descriptors()).expect("valid");
        let x = Array1::from_iter((0..8).map(|k| 0.3 * k as f64 - 1.0));
        let m = Array2::from_shape_fn((8, 3), |(i, j)| (i as f64 + 1.0) * (j as f64 - 0.5));
        let dense_x = meas.loadings().dot(&x);
        let dense_m = meas.loadings().dot(&m);

        for i in 0..3 {
            // Act
            let zx = meas.zx(0, i, x.view());
            let mut out = Array1::<f64>::zeros(3);
            meas.zm(0, i, m.view(), out.view_mut());

            // Assert
            assert_relative_eq!(zx, dense_x[i], epsilon = 1e-14);
            for j in 0..3 {
                assert_relative_eq!(out[j], dense_m[[i, j]], epsilon = 1e-13);
            }
        }
    }

    #[test]
    // Purpose
    // -------
    // Reject descriptors inconsistent with the layout.
    //
    // Given
    // -----
    // - A structure of 5 lags with block length 4, and a descriptor with one
    //   coefficient for two factors.
    //
    // Expect
    // ------
    // - `StructureTooLong` and `CoefficientCount`.
    fn build_rejects_inconsistent_descriptors() {
        // Arrange
        let long = vec![MeasurementDescriptor::new(
            MeasurementStructure::CumulatedDifferences(3),
            vec![1.0, 1.0],
            1.0,
        )];
        let short = vec![MeasurementDescriptor::new(MeasurementStructure::Level, vec![1.0], 1.0)];

        // Act
        let e1 = DynamicFactorMeasurements::build(2, 4, &long).unwrap_err();
        let e2 = DynamicFactorMeasurements::build(2, 4, &short).unwrap_err();

        // Assert
        assert_eq!(e1, SsfError::StructureTooLong { index: 0, len: 5, block_len: 4 });
        assert_eq!(e2, SsfError::CoefficientCount { index: 0, expected: 2, actual: 1 });
    }

    #[test]
    // Purpose
    // -------
    // Check the companion layout of the factor VAR.
    //
    // Given
    // -----
    // - Two factors, VAR(2), block length 3.
    //
    // Expect
    // ------
    // - Row 0 holds `A_1[0,:]`, `A_2[0,:]` at block positions 0 and 1.
    // - Shift ones below the leading row of each block.
    // - Stationary initial covariance; 2 noise columns.
    fn factor_dynamics_builds_companion_blocks() {
        // Arrange
        let coefficients = array![[0.5, 0.1, 0.2, 0.0], [0.0, 0.3, -0.1, 0.1]];
        let var = VarDescriptor::new(coefficients, array![[1.0, 0.2], [0.2, 0.5]]).expect("valid");

        // Act
        let dynamics = factor_dynamics(&var, 3).expect("stable VAR");
        let t = dynamics.transition();

        // Assert
        assert_eq!(var.nlags(), 2);
        assert_eq!(t.row(0).to_vec(), vec![0.5, 0.2, 0.0, 0.1, 0.0, 0.0]);
        assert_eq!(t.row(3).to_vec(), vec![0.0, -0.1, 0.0, 0.3, 0.1, 0.0]);
        assert_eq!(t[[1, 0]], 1.0);
        assert_eq!(t[[2, 1]], 1.0);
        assert_eq!(t[[5, 4]], 1.0);
        assert_eq!(dynamics.noise_dim(), 2);
        assert!(dynamics.is_stationary());
    }

    #[test]
    // Purpose
    // -------
    // Reject a VAR order larger than the block.
    //
    // Given
    // -----
    // - One factor, VAR(3), block length 2.
    //
    // Expect
    // ------
    // - `TooManyLags { nlags: 3, block_len: 2 }`.
    fn factor_dynamics_rejects_too_many_lags() {
        let var = VarDescriptor::new(array![[0.1, 0.1, 0.1]], array![[1.0]]).expect("valid");
        let err = factor_dynamics(&var, 2).unwrap_err();
        assert_eq!(err, SsfError::TooManyLags { nlags: 3, block_len: 2 });
    }
}
