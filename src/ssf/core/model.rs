//! model — a state-space form assembled from dynamics and measurements.
use crate::ssf::core::{dynamics::Dynamics, measurement::Measurements};

/// Dimensions shared between a model, its filters and results sinks.
///
/// Fields
/// ------
/// - `state_dim`: state dimension `n`.
/// - `noise_dim`: transition noise dimension `r`.
/// - `max_obs`: largest number of measured components `m`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SsfDims {
    pub state_dim: usize,
    pub noise_dim: usize,
    pub max_obs: usize,
}

/// Ssf — state-space form `(Dynamics, Measurement(s))`.
///
/// Purpose
/// -------
/// Pair a transition with a measurement family. Filters borrow an `Ssf`
/// immutably for the whole run, so one model can back several runs at once.
///
/// Fields
/// ------
/// - `dynamics`: `D`
///   Transition, noise loading and initial distribution.
/// - `measurement`: `M`
///   Univariate [`Measurement`](crate::ssf::core::Measurement) or
///   multivariate [`Measurements`].
#[derive(Debug, Clone, PartialEq)]
pub struct Ssf<D, M> {
    pub dynamics: D,
    pub measurement: M,
}

impl<D, M> Ssf<D, M> {
    pub fn new(dynamics: D, measurement: M) -> Self {
        Ssf { dynamics, measurement }
    }
}

impl<D: Dynamics, M: Measurements> Ssf<D, M> {
    pub fn dims(&self) -> SsfDims {
        SsfDims {
            state_dim: self.dynamics.state_dim(),
            noise_dim: self.dynamics.noise_dim(),
            max_obs: self.measurement.max_count(),
        }
    }

    /// `true` when both sides are time invariant.
    pub fn is_time_invariant(&self) -> bool {
        self.dynamics.is_time_invariant() && self.measurement.is_time_invariant()
    }
}
