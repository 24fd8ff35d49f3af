//! array_filter — square-root (array) Kalman filter.
//!
//! Purpose
//! -------
//! Run the Kalman recursion on the Cholesky factor `L` of the predicted state
//! covariance (`P = L·Lᵀ`) instead of `P` itself. Each step assembles the
//! pre-array of [`CompoundMatrix`], triangularizes it with Givens rotations
//! and reads the innovation factor, the normalized gain and the next factor
//! off the result. Orthogonal updates keep `P` symmetric PSD over arbitrarily
//! long series.
//!
//! Key behaviors
//! -------------
//! - Multivariate measurements with missing components: only the observed
//!   components of a step enter the pre-array; a fully missing step reduces
//!   to the prediction `[T·L | U]`.
//! - Error covariance square root: the model's own factor when every
//!   component is observed, the diagonal of standard deviations for
//!   independent errors, and a PSD Cholesky of the observed sub-block
//!   otherwise.
//! - Innovations are standardized by forward substitution on `L_F`; pivots at
//!   or below `zero` contribute nothing to the state update and remove no
//!   state variance (e.g. an exactly measured indicator observed twice).
//! - Each step hands a [`PredictionError`] view to the caller; `process`
//!   forwards it to a [`ResultsSink`].
//!
//! Invariants & assumptions
//! ------------------------
//! - Measurement families must be homogeneous; diffuse initializations are
//!   rejected. Time-varying models are supported.
//! - After every step `L` is lower triangular with a non-negative diagonal.
//! - The model is borrowed immutably for the whole run.
//!
//! Conventions
//! -----------
//! - `a` and `L` are one-step-ahead quantities: before step `t` they describe
//!   `α_t | y_0..y_{t−1}`.
//!
//! Testing notes
//! -------------
//! - Unit tests compare against a covariance-form Kalman filter written
//!   inline, check the factor invariants, and the initialization errors.
//! - Integration tests compare with the fast filter on the airline model.
use crate::data::observations::Observations;
use crate::filters::{
    core::{
        compound::{CompoundLayout, CompoundMatrix},
        options::FilterOptions,
        prediction_error::PredictionError,
        sink::ResultsSink,
    },
    errors::{FilterError, FilterResult, UnsupportedReason},
};
use crate::ssf::core::{
    dynamics::Dynamics,
    linalg::psd_cholesky,
    measurement::Measurements,
    model::{Ssf, SsfDims},
};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, s};

const NAME: &str = "array";

/// ArrayFilter — square-root Kalman filter over a borrowed model.
///
/// Fields
/// ------
/// - `ssf`: model, borrowed for the whole run.
/// - `pos`: index of the next step.
/// - `a`, `l`: predicted mean and covariance factor.
/// - `compound`: pre/post-array work buffer.
/// - `observed`, `forecasts`, `errors`, `variances`, `standardized`:
///   per-step record buffers (capacity `max_obs`).
/// - `h_scratch`: error covariance scratch for partially observed steps.
#[derive(Debug)]
pub struct ArrayFilter<'m, D, M> {
    ssf: &'m Ssf<D, M>,
    options: FilterOptions,
    dims: SsfDims,
    pos: usize,
    a: Array1<f64>,
    l: Array2<f64>,
    compound: CompoundMatrix,
    observed: Vec<usize>,
    forecasts: Array1<f64>,
    errors: Array1<f64>,
    variances: Array1<f64>,
    standardized: Array1<f64>,
    h_scratch: Array2<f64>,
}

impl<'m, D: Dynamics, M: Measurements> ArrayFilter<'m, D, M> {
    /// Initialize a run: `a ← a_0`, `L ← chol(Pf_0)`.
    ///
    /// Errors
    /// ------
    /// - `FilterError::UnsupportedModel` for non-homogeneous measurements or
    ///   diffuse dynamics.
    /// - `FilterError::NumericallyDegenerate` when `Pf_0` has a pivot below
    ///   `-zero`.
    pub fn new(ssf: &'m Ssf<D, M>, options: FilterOptions) -> FilterResult<Self> {
        if !ssf.measurement.is_homogeneous() {
            log::debug!("array filter rejected model: non-homogeneous measurements");
            return Err(FilterError::UnsupportedModel {
                filter: NAME,
                reason: UnsupportedReason::NonHomogeneousMeasurements,
            });
        }
        if ssf.dynamics.is_diffuse() {
            log::debug!("array filter rejected model: diffuse initialization");
            return Err(FilterError::UnsupportedModel { filter: NAME, reason: UnsupportedReason::Diffuse });
        }
        let dims = ssf.dims();
        let n = dims.state_dim;
        let mut a = Array1::<f64>::zeros(n);
        let mut pf0 = Array2::<f64>::zeros((n, n));
        ssf.dynamics.initial_mean(a.view_mut());
        ssf.dynamics.initial_covariance(pf0.view_mut());
        let l = psd_cholesky(pf0.view(), options.zero).map_err(|_| FilterError::NumericallyDegenerate {
            filter: NAME,
            reason: "initial covariance is not positive semidefinite",
        })?;
        let m = dims.max_obs;
        log::debug!(
            "array filter initialized: n = {n}, r = {}, m = {m}",
            dims.noise_dim
        );
        Ok(ArrayFilter {
            ssf,
            options,
            dims,
            pos: 0,
            a,
            l,
            compound: CompoundMatrix::new(n, dims.noise_dim, m),
            observed: Vec::with_capacity(m),
            forecasts: Array1::zeros(m),
            errors: Array1::zeros(m),
            variances: Array1::zeros(m),
            standardized: Array1::zeros(m),
            h_scratch: Array2::zeros((m, m)),
        })
    }

    /// Index of the next step.
    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn dims(&self) -> SsfDims {
        self.dims
    }

    /// Predicted state mean `a_t`.
    pub fn mean(&self) -> ArrayView1<'_, f64> {
        self.a.view()
    }

    /// Lower Cholesky factor `L_t` of the predicted state covariance.
    pub fn covariance_factor(&self) -> ArrayView2<'_, f64> {
        self.l.view()
    }

    /// Predicted state covariance `L_t·L_tᵀ`.
    pub fn covariance(&self) -> Array2<f64> {
        self.l.dot(&self.l.t())
    }

    /// Run from the current position to the end of `data`.
    ///
    /// Calls `sink.open` once, `sink.save` once per step and `sink.close`
    /// once at the end.
    ///
    /// Panics
    /// ------
    /// - If `data.dim()` differs from the measurement family's `max_count()`.
    pub fn process<O: Observations, S: ResultsSink>(&mut self, data: &O, sink: &mut S) {
        assert_eq!(
            data.dim(),
            self.dims.max_obs,
            "observation dimension does not match the measurement family"
        );
        sink.open(self.dims, data);
        let mut y = Array1::<f64>::zeros(data.dim());
        for pos in self.pos..data.len() {
            for (i, v) in y.iter_mut().enumerate() {
                *v = data.get(pos, i);
            }
            let record = self.step(y.view());
            sink.save(pos, &record);
        }
        sink.close();
    }

    /// Filter one observation vector (`NaN` entries are missing) and advance.
    ///
    /// Panics
    /// ------
    /// - If `y.len()` differs from the measurement count at this position.
    pub fn step(&mut self, y: ArrayView1<'_, f64>) -> PredictionError<'_> {
        let ssf = self.ssf;
        let pos = self.pos;
        let count = ssf.measurement.count(pos);
        assert_eq!(y.len(), count, "observation vector length does not match the measurement count");

        self.observed.clear();
        self.observed.extend((0..count).filter(|&i| !y[i].is_nan()));
        let m = self.observed.len();
        let layout = self.compound.layout(m);
        self.assemble(&layout, count);
        let zero = self.options.zero;
        self.compound.triangularize(&layout, zero);

        // Innovations and their standardization by forward substitution on L_F.
        let lf = layout.innovation_factor();
        for (k, &i) in self.observed.iter().enumerate() {
            let forecast = ssf.measurement.zx(pos, i, self.a.view());
            self.forecasts[k] = forecast;
            self.errors[k] = y[i] - forecast;
        }
        for k in 0..m {
            let solved = self.standardized.as_slice().map_or(0.0, |u| self.compound.row_dot(lf, k, &u[..k]));
            let pivot = self.compound.block(lf)[[k, k]];
            self.standardized[k] = if pivot > zero {
                (self.errors[k] - solved) / pivot
            } else {
                log::trace!("array filter: degenerate innovation pivot at position {pos}, component {k}");
                0.0
            };
            let factor = self.compound.block(lf);
            let row = factor.slice(s![k, ..=k]);
            self.variances[k] = row.dot(&row);
        }

        // a ← T·a + K̄·u
        ssf.dynamics.tx(pos, self.a.view_mut());
        let gain = self.compound.block(layout.gain());
        for k in 0..m {
            let u = self.standardized[k];
            if u != 0.0 {
                self.a.scaled_add(u, &gain.column(k));
            }
        }
        self.l.assign(&self.compound.block(layout.covariance_factor()));
        self.pos += 1;

        PredictionError {
            components: &self.observed,
            forecasts: self.forecasts.slice(s![..m]),
            errors: self.errors.slice(s![..m]),
            variances: self.variances.slice(s![..m]),
            standardized: self.standardized.slice(s![..m]),
            cholesky: self.compound.block(lf),
        }
    }

    /// Fill the pre-array `[Z·L, 0, R_H; T·L, U, 0]` for the current step.
    fn assemble(&mut self, layout: &CompoundLayout, count: usize) {
        let ssf = self.ssf;
        let pos = self.pos;
        self.compound.clear(layout);
        {
            let mut zl = self.compound.block_mut(layout.loading());
            for (k, &i) in self.observed.iter().enumerate() {
                ssf.measurement.zm(pos, i, self.l.view(), zl.row_mut(k));
            }
        }
        {
            let mut tl = self.compound.block_mut(layout.transition());
            tl.assign(&self.l);
            ssf.dynamics.tm(pos, tl);
        }
        ssf.dynamics.noise_loading(pos, self.compound.block_mut(layout.noise()));

        let m = layout.m;
        if m == 0 {
            return;
        }
        if m == count {
            ssf.measurement.error_factor(pos, self.compound.block_mut(layout.error_factor()));
        } else if ssf.measurement.has_independent_errors() {
            let mut rh = self.compound.block_mut(layout.error_factor());
            for (k, &i) in self.observed.iter().enumerate() {
                rh[[k, k]] = ssf.measurement.error_variance(pos, i).max(0.0).sqrt();
            }
        } else {
            ssf.measurement.error_covariance(pos, self.h_scratch.slice_mut(s![..count, ..count]));
            let observed = &self.observed;
            let sub = Array2::from_shape_fn((m, m), |(p, q)| self.h_scratch[[observed[p], observed[q]]]);
            let mut rh = self.compound.block_mut(layout.error_factor());
            match psd_cholesky(sub.view(), self.options.zero) {
                Ok(factor) => rh.assign(&factor),
                Err(_) => {
                    log::warn!("array filter: observed error covariance at position {pos} is not PSD; using its diagonal");
                    for k in 0..m {
                        rh[[k, k]] = sub[[k, k]].max(0.0).sqrt();
                    }
                }
            }
        }
    }
}
