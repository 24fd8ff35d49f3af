//! sink — consumers of per-step filter output.
//!
//! Purpose
//! -------
//! Define the [`ResultsSink`] contract through which filters publish their
//! prediction errors, and provide the two sinks most callers need:
//! [`PredictionErrorStore`] (copies every record into dense arrays) and
//! [`LikelihoodSink`] (accumulates the Gaussian log-likelihood of the
//! prediction-error decomposition).
//!
//! Key behaviors
//! -------------
//! - `open` is called once before the first step with the model dimensions
//!   and the data; `save` once per step in time order; `close` once after
//!   the last step.
//! - Records are borrowed views; sinks copy what they keep.
//! - Unit tuple `()` is a sink that discards everything.
//!
//! Invariants & assumptions
//! ------------------------
//! - `LikelihoodSink` skips components whose Cholesky pivot is `<= zero`
//!   (zero-information components), so exactly measured deterministic
//!   positions do not produce `ln 0`. A skipped component whose innovation
//!   is not explained by the earlier components is counted in
//!   `n_inconsistent` and logged at trace level.
//!
//! Testing notes
//! -------------
//! - Unit tests feed hand-built records and compare the accumulated
//!   likelihood with the closed-form Gaussian density.
use crate::data::observations::Observations;
use crate::filters::core::{options::ZERO, prediction_error::PredictionError};
use crate::ssf::core::model::SsfDims;
use ndarray::{Array2, ArrayView1, ArrayView2, s};
use statrs::distribution::{Continuous, Normal};

/// Receiver of filter output.
pub trait ResultsSink {
    /// Called once before the first step.
    fn open(&mut self, _dims: SsfDims, _data: &dyn Observations) {}

    /// Called once per step with that step's record.
    fn save(&mut self, pos: usize, record: &PredictionError<'_>);

    /// Called once after the last step.
    fn close(&mut self) {}
}

impl ResultsSink for () {
    fn save(&mut self, _pos: usize, _record: &PredictionError<'_>) {}
}

// ---- Stored prediction errors ----

/// PredictionErrorStore — dense copy of every prediction error.
///
/// Fields
/// ------
/// Each array is `len×max_obs` (time by component); entries of missing
/// components stay `NaN`.
/// - `forecasts`, `errors`, `variances`, `standardized`.
#[derive(Debug, Clone, Default)]
pub struct PredictionErrorStore {
    forecasts: Array2<f64>,
    errors: Array2<f64>,
    variances: Array2<f64>,
    standardized: Array2<f64>,
    closed: bool,
}

impl PredictionErrorStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn forecasts(&self) -> ArrayView2<'_, f64> {
        self.forecasts.view()
    }

    pub fn errors(&self) -> ArrayView2<'_, f64> {
        self.errors.view()
    }

    pub fn variances(&self) -> ArrayView2<'_, f64> {
        self.variances.view()
    }

    pub fn standardized(&self) -> ArrayView2<'_, f64> {
        self.standardized.view()
    }

    /// Errors of component `i` over time.
    pub fn component_errors(&self, i: usize) -> ArrayView1<'_, f64> {
        self.errors.column(i)
    }

    /// Variances of component `i` over time.
    pub fn component_variances(&self, i: usize) -> ArrayView1<'_, f64> {
        self.variances.column(i)
    }

    /// `true` once the producing run has finished.
    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl ResultsSink for PredictionErrorStore {
    fn open(&mut self, dims: SsfDims, data: &dyn Observations) {
        let shape = (data.len(), dims.max_obs);
        self.forecasts = Array2::from_elem(shape, f64::NAN);
        self.errors = Array2::from_elem(shape, f64::NAN);
        self.variances = Array2::from_elem(shape, f64::NAN);
        self.standardized = Array2::from_elem(shape, f64::NAN);
        self.closed = false;
    }

    fn save(&mut self, pos: usize, record: &PredictionError<'_>) {
        for (k, &i) in record.components.iter().enumerate() {
            self.forecasts[[pos, i]] = record.forecasts[k];
            self.errors[[pos, i]] = record.errors[k];
            self.variances[[pos, i]] = record.variances[k];
            self.standardized[[pos, i]] = record.standardized[k];
        }
    }

    fn close(&mut self) {
        self.closed = true;
    }
}

// ---- Likelihood ----

/// LikelihoodSink — Gaussian log-likelihood of the prediction errors.
///
/// Purpose
/// -------
/// Accumulate `Σ_t Σ_k [ln φ(u_{t,k}) − ln L_{t,kk}]`, the exact
/// log-likelihood of the prediction-error decomposition, together with the
/// pieces needed for the concentrated (σ²-profiled) likelihood.
///
/// Fields
/// ------
/// - `zero`: pivots `<= zero` are skipped.
/// - `n_obs`: components that contributed.
/// - `n_inconsistent`: skipped components whose innovation, net of the
///   earlier components, still exceeds `zero` (data the model rules out).
/// - `log_det`: `Σ ln |F_t|` over contributing components.
/// - `ssq`: `Σ u²`.
/// - `log_likelihood`: accumulated exact log-likelihood.
#[derive(Debug, Clone)]
pub struct LikelihoodSink {
    zero: f64,
    standard: Normal,
    n_obs: usize,
    n_inconsistent: usize,
    log_det: f64,
    ssq: f64,
    log_likelihood: f64,
}

impl LikelihoodSink {
    pub fn new() -> Self {
        Self::with_zero(ZERO)
    }

    /// Sink skipping pivots `<= zero`.
    pub fn with_zero(zero: f64) -> Self {
        LikelihoodSink {
            zero,
            standard: Normal::new(0.0, 1.0).expect("standard normal parameters are valid"),
            n_obs: 0,
            n_inconsistent: 0,
            log_det: 0.0,
            ssq: 0.0,
            log_likelihood: 0.0,
        }
    }

    pub fn n_obs(&self) -> usize {
        self.n_obs
    }

    /// Skipped components whose data contradicts a zero innovation variance.
    pub fn n_inconsistent(&self) -> usize {
        self.n_inconsistent
    }

    pub fn log_det(&self) -> f64 {
        self.log_det
    }

    pub fn ssq(&self) -> f64 {
        self.ssq
    }

    /// Exact Gaussian log-likelihood.
    pub fn log_likelihood(&self) -> f64 {
        self.log_likelihood
    }

    /// Maximum-likelihood scale `σ̂² = ssq / n`.
    pub fn sigma2(&self) -> f64 {
        if self.n_obs == 0 { f64::NAN } else { self.ssq / self.n_obs as f64 }
    }

    /// Log-likelihood with the common scale factor concentrated out:
    /// `−½·[n·(ln 2π + 1 + ln σ̂²) + log_det]`.
    pub fn concentrated_log_likelihood(&self) -> f64 {
        let n = self.n_obs as f64;
        -0.5 * (n * ((2.0 * std::f64::consts::PI).ln() + 1.0 + self.sigma2().ln()) + self.log_det)
    }
}

impl Default for LikelihoodSink {
    fn default() -> Self {
        Self::new()
    }
}

impl ResultsSink for LikelihoodSink {
    fn open(&mut self, _dims: SsfDims, _data: &dyn Observations) {
        self.n_obs = 0;
        self.n_inconsistent = 0;
        self.log_det = 0.0;
        self.ssq = 0.0;
        self.log_likelihood = 0.0;
    }

    fn save(&mut self, pos: usize, record: &PredictionError<'_>) {
        for k in 0..record.len() {
            let pivot = record.cholesky[[k, k]];
            if pivot <= self.zero {
                let explained = record.cholesky.slice(s![k, ..k]).dot(&record.standardized.slice(s![..k]));
                let residual = record.errors[k] - explained;
                if residual.abs() > self.zero {
                    self.n_inconsistent += 1;
                    log::trace!(
                        "likelihood: position {pos}, component {}: residual {residual:e} with zero innovation variance",
                        record.components[k]
                    );
                }
                continue;
            }
            let u = record.standardized[k];
            self.n_obs += 1;
            self.ssq += u * u;
            self.log_det += 2.0 * pivot.ln();
            self.log_likelihood += self.standard.ln_pdf(u) - pivot.ln();
        }
    }
}
