//! dynamics — transition contract of a linear Gaussian state-space model.
//!
//! Purpose
//! -------
//! Describe the state equation `α_{t+1} = T_t·α_t + U_t·ε_t`,
//! `ε_t ~ N(0, I_r)`, together with the initial distribution
//! `α_0 ~ N(a_0, Pf_0)`, through the narrow set of operations the filters
//! need. Implementations never expose `T` directly; they apply it.
//!
//! Invariants & assumptions
//! ------------------------
//! - `state_dim()` (`n`) and `noise_dim()` (`r`) are fixed for the lifetime
//!   of a model.
//! - `noise_loading` writes an `n×r` matrix `U` with `U·Uᵀ = V`.
//! - `initial_covariance` writes a symmetric PSD `n×n` matrix.
//! - `is_stationary()` promises that `Pf_0 = T·Pf_0·Tᵀ + V`, which is what
//!   the fast filter relies on.
//!
//! Conventions
//! -----------
//! - `pos` is the 0-based time index; time-invariant models ignore it.
//! - Buffers passed in are fully overwritten (`initial_*`, `noise_loading`)
//!   or transformed in place (`tx`, `tm`).
use ndarray::{ArrayViewMut1, ArrayViewMut2, Axis};

/// Transition side of a state-space model.
pub trait Dynamics {
    /// State dimension `n`.
    fn state_dim(&self) -> usize;

    /// Noise dimension `r` (columns of `U`).
    fn noise_dim(&self) -> usize;

    /// `true` when `T`, `U` do not depend on `pos`.
    fn is_time_invariant(&self) -> bool;

    /// `true` when part of the initial state has infinite variance.
    fn is_diffuse(&self) -> bool;

    /// `true` when `Pf_0` is the stationary covariance of the transition.
    fn is_stationary(&self) -> bool;

    /// Write `a_0` into `a0` (length `n`).
    fn initial_mean(&self, a0: ArrayViewMut1<'_, f64>);

    /// Write `Pf_0` into `pf0` (`n×n`).
    fn initial_covariance(&self, pf0: ArrayViewMut2<'_, f64>);

    /// `x ← T_pos·x`.
    fn tx(&self, pos: usize, x: ArrayViewMut1<'_, f64>);

    /// `m ← T_pos·m`, column by column.
    fn tm(&self, pos: usize, mut m: ArrayViewMut2<'_, f64>) {
        for col in m.axis_iter_mut(Axis(1)) {
            self.tx(pos, col);
        }
    }

    /// Write `U_pos` (`n×r`) into `u`.
    fn noise_loading(&self, pos: usize, u: ArrayViewMut2<'_, f64>);
}
