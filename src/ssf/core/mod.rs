//! ssf::core — contracts and dense helpers of the state-space layer.
//!
//! Purpose
//! -------
//! Define what the filters require from a model, and nothing more:
//! [`Dynamics`] (transition, noise loading, initial distribution),
//! [`Measurement`] / [`Measurements`] (loadings and error covariance), the
//! [`Ssf`] pairing with its [`SsfDims`], and the covariance helpers in
//! [`linalg`] that concrete models and filters share.
//!
//! Key behaviors
//! -------------
//! - Contracts apply operators to caller buffers (`tx`, `tm`, `zx`, `zm`);
//!   no model hands out its internal matrices, so structured models (shift
//!   transitions, sparse loadings) can run in less than `O(n²)` per apply.
//! - Every univariate `Measurement` is a one-component `Measurements`.
//!
//! Invariants & assumptions
//! ------------------------
//! - Models are immutable once built and are shared read-only across steps
//!   and runs.
//! - Covariances are symmetric PSD; factors are lower triangular with a
//!   non-negative diagonal.
//!
//! Downstream usage
//! ----------------
//! - Implement `Dynamics` plus `Measurement` (fast filter) or `Measurements`
//!   (array filter) for a new model family; no filter changes are needed.
pub mod dynamics;
pub mod linalg;
pub mod measurement;
pub mod model;

pub use self::dynamics::Dynamics;
pub use self::measurement::{Measurement, Measurements};
pub use self::model::{Ssf, SsfDims};
