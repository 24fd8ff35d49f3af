//! rust_statespace — Kalman filtering for linear Gaussian state-space models.
//!
//! Purpose
//! -------
//! Serve as the crate root for the state-space stack: strided data access
//! and observation containers, model contracts with concrete model builders,
//! and two one-step-ahead Kalman filters that publish their prediction
//! errors to pluggable sinks.
//!
//! Key behaviors
//! -------------
//! - [`data`]: strided cursors and dot/axpy/rotation kernels, plus validated
//!   univariate and panel observation containers (`NaN` = missing).
//! - [`ssf`]: the `Dynamics` / `Measurement(s)` contracts, time-invariant
//!   models, ARMA and airline models, and the dynamic-factor measurement
//!   builder with VAR factor dynamics.
//! - [`filters`]: the square-root array filter, the Chandrasekhar fast
//!   filter with steady-state detection, prediction-error records and
//!   results sinks (stored errors, Gaussian log-likelihood).
//!
//! Invariants & assumptions
//! ------------------------
//! - Models are immutable after construction and borrowed by filters.
//! - Every numeric container is dense `f64` (`ndarray`); covariance factors
//!   are lower triangular with a non-negative diagonal.
//!
//! Conventions
//! -----------
//! - Time runs along rows of panel data and along positions of filters,
//!   0-based. Filtered quantities are one-step-ahead: `a_t`, `P_t` describe
//!   `α_t | y_0..y_{t−1}`.
//! - Errors are layer-specific enums (`DataError`, `SsfError`,
//!   `FilterError`) with `…Result<T>` aliases; contract violations panic.
//! - Diagnostics go through the `log` facade; the crate installs no logger.
//!
//! Downstream usage
//! ----------------
//! - `use rust_statespace::prelude::*;` brings the everyday surface into
//!   scope; see [`filters`] for the typical end-to-end flow.
//!
//! Testing notes
//! -------------
//! - Unit tests live in each module; `tests/integration_filters.rs` runs
//!   both filters on the airline scenario and a dynamic-factor panel.
pub mod data;
pub mod filters;
pub mod ssf;

pub mod prelude {
    pub use crate::data::{DataError, DataResult, Observations, PanelData, SeriesData};
    pub use crate::filters::prelude::*;
    pub use crate::ssf::prelude::*;
}
