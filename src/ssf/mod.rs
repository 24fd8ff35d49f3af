//! ssf — linear Gaussian state-space forms: contracts, models and errors.
//!
//! Purpose
//! -------
//! Describe the models the filters run on. A state-space form is
//!
//! ```text
//! y_t      = Z_t·α_t + η_t,          η_t ~ N(0, H_t)
//! α_{t+1}  = T_t·α_t + U_t·ε_t,      ε_t ~ N(0, I_r)
//! α_0      ~ N(a_0, Pf_0)
//! ```
//!
//! and is consumed only through the capability traits in [`core`]. Concrete
//! dense and structured models live in [`models`].
//!
//! Key behaviors
//! -------------
//! - [`core`]: `Dynamics`, `Measurement`, `Measurements`, `Ssf`, `SsfDims` and
//!   the covariance helpers in `core::linalg`.
//! - [`models`]: time-invariant dense models, the ARMA/airline builder and the
//!   dynamic factor builder.
//! - [`errors`]: `SsfError` / `SsfResult` for every construction failure.
//!
//! Invariants & assumptions
//! ------------------------
//! - Models are immutable after construction and safe to share read-only.
//! - Covariances are symmetric PSD and validated where they are built.
//!
//! Conventions
//! -----------
//! - Indexing is 0-based; `pos` denotes the time index.
//! - `n` = state dimension, `r` = noise dimension, `m` = measured components.
//!
//! Downstream usage
//! ----------------
//! - Build a model (e.g. `ArmaSpec::airline(..)?.ssf()?` or
//!   `dynamic_factor_ssf(..)?`) and hand a reference to a filter.
pub mod core;
pub mod errors;
pub mod models;

pub use self::core::{Dynamics, Measurement, Measurements, Ssf, SsfDims};
pub use self::errors::{SsfError, SsfResult};
pub use self::models::{
    ArmaSpec, DynamicFactorMeasurements, MeasurementDescriptor, MeasurementStructure,
    TimeInvariantDynamics, TimeInvariantMeasurement, TimeInvariantMeasurements, VarDescriptor,
    dynamic_factor_ssf, factor_dynamics,
};

pub mod prelude {
    pub use super::core::{Dynamics, Measurement, Measurements, Ssf, SsfDims};
    pub use super::errors::{SsfError, SsfResult};
    pub use super::models::{
        ArmaSpec, DynamicFactorMeasurements, MeasurementDescriptor, MeasurementStructure,
        TimeInvariantDynamics, TimeInvariantMeasurement, TimeInvariantMeasurements, VarDescriptor,
    };
}
