//! filters — Kalman filters over state-space forms.
//!
//! Purpose
//! -------
//! Run the one-step-ahead Kalman recursion over an [`Ssf`](crate::ssf::Ssf)
//! and a series of observations, publishing one [`PredictionError`] per step
//! to a [`ResultsSink`].
//!
//! Key behaviors
//! -------------
//! - [`ArrayFilter`]: square-root filter on the Cholesky factor of the state
//!   covariance. Multivariate, time-varying models and missing components
//!   are supported; diffuse initializations are not.
//! - [`FastFilter`]: Chandrasekhar recursions for univariate, time-invariant
//!   models started at their stationary distribution. Freezes the gain once
//!   it has converged ([`GainPhase::Steady`]).
//! - Both expose `new` (validating the model), `step` (manual driving) and
//!   `process` (whole series into a sink).
//!
//! Invariants & assumptions
//! ------------------------
//! - Models are borrowed immutably for the lifetime of a filter; several
//!   filters may share one model.
//! - Construction failures are [`FilterError`]s. Numerical trouble during a
//!   run is absorbed by the `zero` / `epsilon` tolerances of
//!   [`FilterOptions`]. Dimension mismatches between model and data panic.
//!
//! Downstream usage
//! ----------------
//! - Typical flow:
//!   1. Build a model (e.g. [`ArmaSpec::ssf`](crate::ssf::ArmaSpec::ssf)).
//!   2. Wrap the data in [`SeriesData`](crate::data::SeriesData) or
//!      [`PanelData`](crate::data::PanelData).
//!   3. `FastFilter::new(&ssf, options)` when the model qualifies
//!      (check [`FilterError::is_unsupported`]), `ArrayFilter::new`
//!      otherwise.
//!   4. `process(&data, &mut sink)` with a [`LikelihoodSink`] or a
//!      [`PredictionErrorStore`].
//!
//! Testing notes
//! -------------
//! - Unit tests live next to each filter; cross-filter agreement and the
//!   airline scenario live in `tests/integration_filters.rs`.
pub mod array_filter;
pub mod core;
pub mod errors;
pub mod fast_filter;

// ---- Re-exports (primary public surface) ----------------------------------

pub use self::array_filter::ArrayFilter;
pub use self::core::{
    FilterOptions, LikelihoodSink, PredictionError, PredictionErrorStore, ResultsSink,
};
pub use self::errors::{FilterError, FilterResult, UnsupportedReason};
pub use self::fast_filter::{FastFilter, GainPhase};

pub mod prelude {
    pub use super::{
        ArrayFilter, FastFilter, FilterError, FilterOptions, FilterResult, GainPhase,
        LikelihoodSink, PredictionError, PredictionErrorStore, ResultsSink, UnsupportedReason,
    };
}
