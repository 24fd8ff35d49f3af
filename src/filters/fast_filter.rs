//! fast_filter — Chandrasekhar recursions with steady-state detection.
//!
//! Purpose
//! -------
//! Filter univariate, time-invariant models started at their stationary
//! distribution without ever forming the state covariance. The filter
//! propagates only the gain `k = T·P·Zᵀ`, the innovation variance `f` and the
//! covariance increment `ΔP_t = P_{t+1} − P_t`, held in factored form
//! `ΔP = Σᵢⱼ lᵢ·Mᵢⱼ·lⱼᵀ`.
//!
//! Key behaviors
//! -------------
//! - Complete data keeps a single direction: the rank-one Chandrasekhar
//!   downdate `f ← f + zl·g`, `k ← k + (T·l)·g`, `l ← T·l − k·zl/f`,
//!   `M ← M − g·gᵀ/f` with `zl = Z·l` and `g = M·zl`.
//! - A missing value moves the covariance by a rank-one positive term. The
//!   filter appends the corresponding direction (`k_old` with weight
//!   `+1/f_old` after an observed step, `k_new` with weight `−1/f_new` before
//!   one) so `f` and `k` stay exact around gaps.
//! - Once the increment vanishes (`‖ΔP‖ < epsilon`) the gain phase becomes
//!   [`GainPhase::Steady`]: `k` and `f` are frozen and the recursion is
//!   skipped. A later missing value re-opens accumulation.
//!
//! Invariants & assumptions
//! ------------------------
//! - Models must be time invariant, non-diffuse and stationary
//!   (`Pf_0` solves the Lyapunov equation); construction enforces it.
//! - Directions whose norm falls below `epsilon` are dropped while more than
//!   one remains.
//!
//! Conventions
//! -----------
//! - `epsilon` is absolute for the steady-state test; the rank-update gate
//!   uses `epsilon·f_0`.
//!
//! Testing notes
//! -------------
//! - Unit tests follow an AR(1) through its closed-form path (steady at
//!   step 2, re-opened by a gap) and the construction errors.
//! - Agreement with the array filter is covered by integration tests.
use crate::data::observations::Observations;
use crate::filters::{
    core::{options::FilterOptions, prediction_error::PredictionError, sink::ResultsSink},
    errors::{FilterError, FilterResult, UnsupportedReason},
};
use crate::ssf::core::{
    dynamics::Dynamics,
    measurement::Measurement,
    model::{Ssf, SsfDims},
};
use ndarray::{Array1, Array2, ArrayView1, Axis, s};

const NAME: &str = "fast";

/// Phase of the gain recursion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GainPhase {
    /// `ΔP` is still non-negligible.
    Accumulating,
    /// Gain and variance frozen since `position`.
    Steady { position: usize },
}

/// FastFilter — Chandrasekhar filter over a borrowed univariate model.
///
/// Fields
/// ------
/// - `a`: predicted mean.
/// - `k`, `f`: gain `T·P·Zᵀ` and innovation variance for the current step.
/// - `directions`, `weights`: factors `lᵢ` and signature matrix `M` of `ΔP`.
/// - `neps`: rank-update gate `epsilon·f_0`.
/// - `prev_observed`: whether the previous step had an observation.
/// - `component`, `forecast`, `error`, `variance`, `standardized`,
///   `cholesky`: one-component record buffers.
#[derive(Debug)]
pub struct FastFilter<'m, D, M> {
    ssf: &'m Ssf<D, M>,
    options: FilterOptions,
    dims: SsfDims,
    pos: usize,
    a: Array1<f64>,
    k: Array1<f64>,
    f: f64,
    neps: f64,
    directions: Vec<Array1<f64>>,
    weights: Array2<f64>,
    phase: GainPhase,
    prev_observed: bool,
    zl: Vec<f64>,
    g: Vec<f64>,
    component: [usize; 1],
    forecast: Array1<f64>,
    error: Array1<f64>,
    variance: Array1<f64>,
    standardized: Array1<f64>,
    cholesky: Array2<f64>,
}

impl<'m, D: Dynamics, M: Measurement> FastFilter<'m, D, M> {
    /// Initialize a run from the stationary distribution:
    /// `C = P_0·Zᵀ`, `f = Z·C + h`, `k = T·C`.
    ///
    /// Errors
    /// ------
    /// - `FilterError::UnsupportedModel` for time-varying, diffuse or
    ///   non-stationary models.
    /// - `FilterError::NumericallyDegenerate` when `f <= zero`.
    pub fn new(ssf: &'m Ssf<D, M>, options: FilterOptions) -> FilterResult<Self> {
        let measurement = &ssf.measurement;
        let reason = if !ssf.dynamics.is_time_invariant() || !Measurement::is_time_invariant(measurement) {
            Some(UnsupportedReason::TimeVarying)
        } else if ssf.dynamics.is_diffuse() {
            Some(UnsupportedReason::Diffuse)
        } else if !ssf.dynamics.is_stationary() {
            Some(UnsupportedReason::NonStationaryInitialization)
        } else {
            None
        };
        if let Some(reason) = reason {
            log::debug!("fast filter rejected model: {reason}");
            return Err(FilterError::UnsupportedModel { filter: NAME, reason });
        }

        let dims = ssf.dims();
        let n = dims.state_dim;
        let mut a = Array1::<f64>::zeros(n);
        let mut p0 = Array2::<f64>::zeros((n, n));
        ssf.dynamics.initial_mean(a.view_mut());
        ssf.dynamics.initial_covariance(p0.view_mut());

        // P_0 is symmetric, so Z·P_0 row-wise equals P_0·Zᵀ.
        let mut k = Array1::<f64>::zeros(n);
        Measurement::zm(measurement, 0, p0.view(), k.view_mut());
        let f = Measurement::zx(measurement, 0, k.view()) + Measurement::error_variance(measurement, 0);
        if !(f > options.zero) {
            return Err(FilterError::NumericallyDegenerate {
                filter: NAME,
                reason: "initial innovation variance is not positive",
            });
        }
        ssf.dynamics.tx(0, k.view_mut());
        log::debug!("fast filter initialized: n = {n}, f0 = {f}");

        Ok(FastFilter {
            ssf,
            options,
            dims,
            pos: 0,
            a,
            k,
            f,
            neps: options.epsilon * f,
            directions: Vec::new(),
            weights: Array2::zeros((0, 0)),
            phase: GainPhase::Accumulating,
            prev_observed: false,
            zl: Vec::new(),
            g: Vec::new(),
            component: [0],
            forecast: Array1::zeros(1),
            error: Array1::zeros(1),
            variance: Array1::zeros(1),
            standardized: Array1::zeros(1),
            cholesky: Array2::zeros((1, 1)),
        })
    }

    /// Index of the next step.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Predicted state mean.
    pub fn mean(&self) -> ArrayView1<'_, f64> {
        self.a.view()
    }

    /// Current gain `k = T·P·Zᵀ`.
    pub fn gain(&self) -> ArrayView1<'_, f64> {
        self.k.view()
    }

    /// Innovation variance of the last processed step.
    pub fn innovation_variance(&self) -> f64 {
        self.f
    }

    pub fn phase(&self) -> GainPhase {
        self.phase
    }

    /// Step at which the gain froze, if it is currently frozen.
    pub fn steady_state_position(&self) -> Option<usize> {
        match self.phase {
            GainPhase::Steady { position } => Some(position),
            GainPhase::Accumulating => None,
        }
    }

    /// Run from the current position to the end of `data`.
    ///
    /// Panics
    /// ------
    /// - If `data` is not univariate.
    pub fn process<O: Observations, S: ResultsSink>(&mut self, data: &O, sink: &mut S) {
        assert_eq!(data.dim(), 1, "the fast filter needs univariate observations");
        sink.open(self.dims, data);
        for pos in self.pos..data.len() {
            let record = self.step(data.get(pos, 0));
            sink.save(pos, &record);
        }
        sink.close();
    }

    /// Filter one observation (`NaN` = missing) and advance.
    pub fn step(&mut self, y: f64) -> PredictionError<'_> {
        let ssf = self.ssf;
        let pos = self.pos;
        let observed = !y.is_nan();
        if pos == 0 {
            self.seed(observed);
        } else {
            self.update_gain(observed);
        }

        let forecast = Measurement::zx(&ssf.measurement, pos, self.a.view());
        ssf.dynamics.tx(pos, self.a.view_mut());
        let m = usize::from(observed);
        if observed {
            let e = y - forecast;
            let (u, pivot) = if self.f > self.options.zero {
                self.a.scaled_add(e / self.f, &self.k);
                let pivot = self.f.sqrt();
                (e / pivot, pivot)
            } else {
                log::trace!("fast filter: degenerate innovation variance at position {pos}");
                (0.0, 0.0)
            };
            self.forecast[0] = forecast;
            self.error[0] = e;
            self.variance[0] = self.f;
            self.standardized[0] = u;
            self.cholesky[[0, 0]] = pivot;
        }
        self.prev_observed = observed;
        self.pos += 1;

        PredictionError {
            components: &self.component[..m],
            forecasts: self.forecast.slice(s![..m]),
            errors: self.error.slice(s![..m]),
            variances: self.variance.slice(s![..m]),
            standardized: self.standardized.slice(s![..m]),
            cholesky: self.cholesky.slice(s![..m, ..m]),
        }
    }

    /// `ΔP_0 = −k·kᵀ/f` after an observed first value, zero otherwise.
    fn seed(&mut self, observed: bool) {
        self.directions.clear();
        if observed {
            self.directions.push(self.k.clone());
            self.weights = Array2::from_elem((1, 1), -1.0 / self.f);
        } else {
            self.weights = Array2::zeros((0, 0));
        }
    }

    /// Advance `f`, `k` to the current step and form `ΔP` for the next one.
    fn update_gain(&mut self, observed: bool) {
        let pos = self.pos;
        if let GainPhase::Steady { position } = self.phase {
            if observed {
                return;
            }
            log::debug!(
                "fast filter: missing value at {pos} re-opens the gain recursion (steady since {position})"
            );
            self.phase = GainPhase::Accumulating;
            self.directions.clear();
            self.directions.push(self.k.clone());
            self.weights = Array2::from_elem((1, 1), 1.0 / self.f);
            return;
        }

        let ssf = self.ssf;
        self.zl.clear();
        for l in self.directions.iter_mut() {
            self.zl.push(Measurement::zx(&ssf.measurement, pos, l.view()));
            ssf.dynamics.tx(pos, l.view_mut());
        }
        let zl = &self.zl;
        self.g.clear();
        self.g.extend(self.weights.rows().into_iter().map(|row| row.iter().zip(zl).map(|(w, z)| w * z).sum::<f64>()));

        let f_old = self.f;
        match (self.prev_observed, observed) {
            (true, true) => {
                if self.zl.iter().any(|z| z.abs() > self.neps) {
                    self.downdate(f_old);
                } else if self.direction_norm() < self.options.epsilon {
                    log::debug!("fast filter reached steady state at position {pos}");
                    self.phase = GainPhase::Steady { position: pos };
                    self.directions.clear();
                    self.weights = Array2::zeros((0, 0));
                    return;
                }
            }
            (true, false) => {
                let k_old = self.k.clone();
                self.exact_update();
                self.push_direction(k_old, 1.0 / f_old);
            }
            (false, true) => {
                self.exact_update();
                self.push_direction(self.k.clone(), -1.0 / self.f);
            }
            (false, false) => self.exact_update(),
        }
        self.drop_negligible();
    }

    /// Both steps observed: rank-preserving Chandrasekhar update.
    fn downdate(&mut self, f_old: f64) {
        let f_new = f_old + self.zl.iter().zip(&self.g).map(|(z, g)| z * g).sum::<f64>();
        for r in 0..self.k.len() {
            let kr = self.k[r];
            let mut acc = kr;
            for (i, l) in self.directions.iter_mut().enumerate() {
                acc += l[r] * self.g[i];
                l[r] -= kr * self.zl[i] / f_old;
            }
            self.k[r] = acc;
        }
        let q = self.g.len();
        for i in 0..q {
            for j in 0..q {
                self.weights[[i, j]] -= self.g[i] * self.g[j] / f_new;
            }
        }
        self.f = f_new;
    }

    /// `f ← f + zl·g`, `k ← k + Σ (T·lᵢ)·gᵢ`.
    fn exact_update(&mut self) {
        self.f += self.zl.iter().zip(&self.g).map(|(z, g)| z * g).sum::<f64>();
        for (l, &g) in self.directions.iter().zip(&self.g) {
            self.k.scaled_add(g, l);
        }
    }

    fn push_direction(&mut self, direction: Array1<f64>, weight: f64) {
        let q = self.directions.len();
        let mut weights = Array2::<f64>::zeros((q + 1, q + 1));
        weights.slice_mut(s![..q, ..q]).assign(&self.weights);
        weights[[q, q]] = weight;
        self.weights = weights;
        self.directions.push(direction);
    }

    fn drop_negligible(&mut self) {
        if self.directions.len() <= 1 {
            return;
        }
        let eps = self.options.epsilon;
        let mut keep: Vec<usize> = (0..self.directions.len())
            .filter(|&i| self.directions[i].dot(&self.directions[i]).sqrt() >= eps)
            .collect();
        if keep.len() == self.directions.len() {
            return;
        }
        if keep.is_empty() {
            keep.push(0);
        }
        self.weights = self.weights.select(Axis(0), &keep).select(Axis(1), &keep);
        let mut index = 0;
        self.directions.retain(|_| {
            let kept = keep.contains(&index);
            index += 1;
            kept
        });
    }

    /// Frobenius norm over all directions.
    fn direction_norm(&self) -> f64 {
        self.directions.iter().map(|l| l.dot(l)).sum::<f64>().sqrt()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::observations::SeriesData;
    use crate::filters::core::sink::PredictionErrorStore;
    use crate::ssf::models::time_invariant::{TimeInvariantDynamics, TimeInvariantMeasurement};
    use approx::assert_relative_eq;
    use ndarray::array;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - The closed-form AR(1) path: f, k, and the steady position.
    // - Re-opening the recursion on a missing value, including the exact
    //   two-step prediction variance.
    // - Construction errors.
    //
    // They intentionally DO NOT cover:
    // - Multi-lag models and agreement with the array filter (integration
    //   tests).
    // -------------------------------------------------------------------------

    fn ar1(phi: f64) -> Ssf<TimeInvariantDynamics, TimeInvariantMeasurement> {
        let dynamics = TimeInvariantDynamics::stationary(array![[phi]], array![[1.0]]).expect("stable");
        let measurement = TimeInvariantMeasurement::first_state(1, 0.0).expect("valid");
        Ssf::new(dynamics, measurement)
    }

    #[test]
    // Purpose
    // -------
    // Follow an exactly observed AR(1) to its steady state.
    //
    // Given
    // -----
    // - φ = 0.5, σ² = 1: f_0 = 4/3, then f = 1 and k = φ from step 1 on.
    //
    // Expect
    // ------
    // - Variances `[4/3, 1, 1, ...]`; steady at step 2; gain 0.5 thereafter.
    fn ar1_reaches_steady_state_at_step_two() {
        // Arrange
        let ssf = ar1(0.5);
        let data = SeriesData::new(array![1.0, 0.2, -0.4, 0.3, 0.9]).expect("valid");
        let mut store = PredictionErrorStore::new();
        let mut filter = FastFilter::new(&ssf, FilterOptions::default()).expect("supported");

        // Act
        filter.process(&data, &mut store);

        // Assert
        let variances = store.component_variances(0);
        assert_relative_eq!(variances[0], 4.0 / 3.0, epsilon = 1e-14);
        for t in 1..5 {
            assert_relative_eq!(variances[t], 1.0, epsilon = 1e-14);
        }
        assert_eq!(filter.steady_state_position(), Some(2));
        assert_relative_eq!(filter.gain()[0], 0.5, epsilon = 1e-14);
        assert_relative_eq!(store.forecasts()[[4, 0]], 0.15, epsilon = 1e-14);
    }

    #[test]
    // Purpose
    // -------
    // A missing value during the steady phase re-opens the recursion and the
    // variance after the gap is the exact two-step one.
    //
    // Given
    // -----
    // - φ = 0.5 AR(1); series with a gap at step 3.
    //
    // Expect
    // ------
    // - Accumulating right after the gap; f_4 = 1 + φ² = 1.25; f_5 = 1;
    //   steady again at step 6.
    fn missing_value_reopens_recursion() {
        // Arrange
        let ssf = ar1(0.5);
        let y = [1.0, 0.2, -0.4, f64::NAN, 0.3, 0.9, -0.1, 0.4];
        let mut filter = FastFilter::new(&ssf, FilterOptions::default()).expect("supported");
        let mut variances = Vec::new();

        // Act
        for (t, &v) in y.iter().enumerate() {
            let f = filter.step(v).univariate().map(|(_, f)| f);
            variances.push(f);
            if t == 3 {
                assert_eq!(filter.phase(), GainPhase::Accumulating);
            }
        }

        // Assert
        assert_eq!(variances[3], None);
        assert_relative_eq!(variances[4].expect("observed"), 1.25, epsilon = 1e-14);
        assert_relative_eq!(variances[5].expect("observed"), 1.0, epsilon = 1e-14);
        assert_eq!(filter.steady_state_position(), Some(6));
    }

    #[test]
    // Purpose
    // -------
    // Only stationary, non-diffuse models are accepted.
    //
    // Given
    // -----
    // - AR(1) with an explicit (non-stationary) initial covariance.
    // - Stationary AR(1) marked diffuse.
    //
    // Expect
    // ------
    // - `NonStationaryInitialization` and `Diffuse` respectively.
    fn rejects_unsupported_initializations() {
        // Arrange
        let explicit = TimeInvariantDynamics::new(array![[0.5]], array![[1.0]], array![0.0], array![[2.0]])
            .expect("valid");
        let diffuse = TimeInvariantDynamics::stationary(array![[0.5]], array![[1.0]])
            .expect("stable")
            .with_diffuse_states(vec![0]);
        let meas = TimeInvariantMeasurement::first_state(1, 0.0).expect("valid");
        let explicit = Ssf::new(explicit, meas.clone());
        let diffuse = Ssf::new(diffuse, meas);

        // Act
        let err_explicit = FastFilter::new(&explicit, FilterOptions::default()).unwrap_err();
        let err_diffuse = FastFilter::new(&diffuse, FilterOptions::default()).unwrap_err();

        // Assert
        assert_eq!(
            err_explicit,
            FilterError::UnsupportedModel {
                filter: "fast",
                reason: UnsupportedReason::NonStationaryInitialization
            }
        );
        assert_eq!(
            err_diffuse,
            FilterError::UnsupportedModel { filter: "fast", reason: UnsupportedReason::Diffuse }
        );
    }

    #[test]
    // Purpose
    // -------
    // A degenerate initial variance is reported, not filtered.
    //
    // Given
    // -----
    // - Stationary AR(1) with zero noise (P_0 = 0) and exact measurement.
    //
    // Expect
    // ------
    // - `NumericallyDegenerate`.
    fn rejects_zero_initial_variance() {
        // Arrange
        let dynamics = TimeInvariantDynamics::stationary(array![[0.5]], array![[0.0]]).expect("stable");
        let ssf = Ssf::new(dynamics, TimeInvariantMeasurement::first_state(1, 0.0).expect("valid"));

        // Act
        let err = FastFilter::new(&ssf, FilterOptions::default()).unwrap_err();

        // Assert
        assert!(matches!(err, FilterError::NumericallyDegenerate { filter: "fast", .. }));
        assert!(!err.is_unsupported());
    }
}
