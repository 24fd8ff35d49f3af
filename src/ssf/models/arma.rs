//! arma — state-space form of a stationary ARMA process.
//!
//! Purpose
//! -------
//! Assemble the state-space representation of
//! `Φ(B)·w_t = Θ(B)·ε_t`, `ε_t ~ N(0, σ²)`, from already-known polynomial
//! coefficients, including the differenced airline model
//! `(1 + θB)(1 + ΘB^s)`. No estimation is performed here.
//!
//! Key behaviors
//! -------------
//! - State dimension `r = max(p, q + 1)`; the state holds the one-step-ahead
//!   forecasts `w_{t+i|t-1}`, `i = 0..r`.
//! - `T` is the upper shift with last row `−(φ_r, …, φ_1)`; `U = σ·ψ` with the
//!   first `r` ψ-weights; `Z = e_1` with zero measurement variance.
//! - The initial covariance is the stationary one, so the resulting model is
//!   accepted by the fast filter.
//!
//! Conventions
//! -----------
//! - Polynomials are stored without their leading 1 and with their sign:
//!   `Φ(B) = 1 + φ_1·B + … + φ_p·B^p`, `Θ(B) = 1 + θ_1·B + … + θ_q·B^q`.
//!   An AR(1) `w_t = 0.6·w_{t−1} + ε_t` therefore has `ar = [-0.6]`.
use crate::data::strided::{BackwardCursor, ForwardCursor, dot};
use crate::ssf::{
    core::model::Ssf,
    errors::{SsfError, SsfResult},
    models::time_invariant::{TimeInvariantDynamics, TimeInvariantMeasurement},
};
use ndarray::Array2;

/// ArmaSpec — coefficients and innovation variance of an ARMA(p, q) process.
///
/// Fields
/// ------
/// - `ar`: `[φ_1, …, φ_p]`.
/// - `ma`: `[θ_1, …, θ_q]`.
/// - `variance`: `σ² > 0`.
#[derive(Debug, Clone, PartialEq)]
pub struct ArmaSpec {
    ar: Vec<f64>,
    ma: Vec<f64>,
    variance: f64,
}

impl ArmaSpec {
    /// Errors
    /// ------
    /// - `SsfError::InvalidArma` on non-finite coefficients.
    /// - `SsfError::InvalidVariance` when `variance` is not finite and > 0.
    pub fn new(ar: Vec<f64>, ma: Vec<f64>, variance: f64) -> SsfResult<Self> {
        if ar.iter().chain(ma.iter()).any(|c| !c.is_finite()) {
            return Err(SsfError::InvalidArma { reason: "coefficients must be finite" });
        }
        if !variance.is_finite() || variance <= 0.0 {
            return Err(SsfError::InvalidVariance { what: "innovation", index: 0, value: variance });
        }
        Ok(ArmaSpec { ar, ma, variance })
    }

    /// Differenced airline model: MA polynomial `(1 + θB)(1 + ΘB^period)`.
    ///
    /// Errors
    /// ------
    /// - `SsfError::InvalidArma` when `period == 0`.
    /// - Errors of [`ArmaSpec::new`].
    pub fn airline(theta: f64, seasonal_theta: f64, period: usize, variance: f64) -> SsfResult<Self> {
        if period == 0 {
            return Err(SsfError::InvalidArma { reason: "seasonal period must be >= 1" });
        }
        let mut seasonal = vec![0.0; period + 1];
        seasonal[0] = 1.0;
        seasonal[period] = seasonal_theta;
        let ma = polynomial_product(&[1.0, theta], &seasonal);
        Self::new(Vec::new(), ma[1..].to_vec(), variance)
    }

    pub fn ar(&self) -> &[f64] {
        &self.ar
    }

    pub fn ma(&self) -> &[f64] {
        &self.ma
    }

    pub fn variance(&self) -> f64 {
        self.variance
    }

    /// Dimension of the state vector, `max(p, q + 1)`.
    pub fn state_dim(&self) -> usize {
        self.ar.len().max(self.ma.len() + 1)
    }

    /// First `count` ψ-weights of `Θ(B)/Φ(B)`.
    ///
    /// `ψ_0 = 1`, `ψ_j = θ_j − Σ_{i=1..min(j,p)} φ_i·ψ_{j−i}`.
    pub fn psi_weights(&self, count: usize) -> Vec<f64> {
        let mut psi = vec![0.0; count];
        for j in 0..count {
            let theta = match j {
                0 => 1.0,
                _ => self.ma.get(j - 1).copied().unwrap_or(0.0),
            };
            let k = j.min(self.ar.len());
            let ar_part = if k == 0 {
                0.0
            } else {
                dot(&mut ForwardCursor::new(&self.ar[..], 0, k), &mut BackwardCursor::new(&psi[..], j - 1, k))
            };
            psi[j] = theta - ar_part;
        }
        psi
    }

    /// Build the stationary state-space form.
    ///
    /// Errors
    /// ------
    /// - `SsfError::NonStationary` when `Φ(B)` has a root on or inside the
    ///   unit circle.
    pub fn ssf(&self) -> SsfResult<Ssf<TimeInvariantDynamics, TimeInvariantMeasurement>> {
        let r = self.state_dim();
        let mut transition = Array2::<f64>::zeros((r, r));
        for i in 0..r - 1 {
            transition[[i, i + 1]] = 1.0;
        }
        for (i, &phi) in self.ar.iter().enumerate() {
            transition[[r - 1, r - 1 - i]] = -phi;
        }
        let sigma = self.variance.sqrt();
        let psi = self.psi_weights(r);
        let noise_loading = Array2::from_shape_fn((r, 1), |(i, _)| sigma * psi[i]);
        let dynamics = TimeInvariantDynamics::stationary(transition, noise_loading)?;
        let measurement = TimeInvariantMeasurement::first_state(r, 0.0)?;
        Ok(Ssf::new(dynamics, measurement))
    }
}

/// Coefficients of the product of two polynomials given in ascending powers.
pub fn polynomial_product(a: &[f64], b: &[f64]) -> Vec<f64> {
    if a.is_empty() || b.is_empty() {
        return Vec::new();
    }
    let mut out = vec![0.0; a.len() + b.len() - 1];
    for (i, &x) in a.iter().enumerate() {
        for (j, &y) in b.iter().enumerate() {
            out[i + j] += x * y;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ssf::core::{Dynamics, Measurement};
    use approx::assert_relative_eq;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - ψ-weights and polynomial products against hand-computed values.
    // - Stationary covariance of MA(1) and AR(1) forms.
    // - Shape of the airline form.
    // -------------------------------------------------------------------------

    #[test]
    // Purpose
    // -------
    // Check ψ-weights of an ARMA(1, 1).
    //
    // Given
    // -----
    // - `Φ(B) = 1 − 0.5B`, `Θ(B) = 1 + 0.4B`.
    //
    // Expect
    // ------
    // - `ψ = (1, 0.9, 0.45, 0.225)`.
    fn psi_weights_of_arma11() {
        // Arrange
        let spec = ArmaSpec::new(vec![-0.5], vec![0.4], 1.0).expect("valid");

        // Act
        let psi = spec.psi_weights(4);

        // Assert
        let expected = [1.0, 0.9, 0.45, 0.225];
        for (a, b) in psi.iter().zip(expected.iter()) {
            assert_relative_eq!(*a, *b, epsilon = 1e-15);
        }
    }

    #[test]
    // Purpose
    // -------
    // Verify the stationary variance of simple forms.
    //
    // Given
    // -----
    // - MA(1) with θ = 0.6, σ² = 2 and AR(1) with `w_t = 0.8·w_{t−1} + ε_t`.
    //
    // Expect
    // ------
    // - `Var(w) = σ²(1 + θ²)` and `1/(1 − 0.64)` respectively.
    fn stationary_variance_matches_closed_forms() {
        // Arrange
        let ma1 = ArmaSpec::new(vec![], vec![0.6], 2.0).expect("valid").ssf().expect("ssf");
        let ar1 = ArmaSpec::new(vec![-0.8], vec![], 1.0).expect("valid").ssf().expect("ssf");
        let mut p_ma = Array2::<f64>::zeros((2, 2));
        let mut p_ar = Array2::<f64>::zeros((1, 1));

        // Act
        ma1.dynamics.initial_covariance(p_ma.view_mut());
        ar1.dynamics.initial_covariance(p_ar.view_mut());

        // Assert
        assert_relative_eq!(p_ma[[0, 0]], 2.0 * 1.36, epsilon = 1e-12);
        assert_relative_eq!(p_ma[[0, 1]], 2.0 * 0.6, epsilon = 1e-12);
        assert_relative_eq!(p_ar[[0, 0]], 1.0 / 0.36, epsilon = 1e-12);
    }

    #[test]
    // Purpose
    // -------
    // Check the airline MA polynomial and its state-space shape.
    //
    // Given
    // -----
    // - θ = −0.6, Θ = −0.6, period 12.
    //
    // Expect
    // ------
    // - 13 MA coefficients with θ_1 = −0.6, θ_12 = −0.6, θ_13 = 0.36.
    // - State dimension 14, stationary, observing the first state exactly.
    fn airline_form_has_expected_shape() {
        // Arrange / Act
        let spec = ArmaSpec::airline(-0.6, -0.6, 12, 1.0).expect("valid airline");
        let ssf = spec.ssf().expect("MA models are always stationary");

        // Assert
        assert_eq!(spec.ma().len(), 13);
        assert_relative_eq!(spec.ma()[0], -0.6);
        assert_relative_eq!(spec.ma()[11], -0.6);
        assert_relative_eq!(spec.ma()[12], 0.36, epsilon = 1e-15);
        assert_eq!(ssf.dynamics.state_dim(), 14);
        assert!(ssf.dynamics.is_stationary());
        assert_eq!(Measurement::error_variance(&ssf.measurement, 0), 0.0);
    }

    #[test]
    // Purpose
    // -------
    // Reject explosive AR polynomials.
    //
    // Given
    // -----
    // - `w_t = 1.1·w_{t−1} + ε_t`.
    //
    // Expect
    // ------
    // - `SsfError::NonStationary`.
    fn explosive_ar_is_rejected() {
        let err = ArmaSpec::new(vec![-1.1], vec![], 1.0).expect("valid").ssf().unwrap_err();
        assert!(matches!(err, SsfError::NonStationary { .. }));
    }
}
