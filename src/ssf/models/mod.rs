//! ssf::models — concrete models implementing the state-space contracts.
//!
//! Purpose
//! -------
//! Ship dense time-invariant building blocks and two assemblers that turn
//! known parameters into state-space forms: ARMA (including the differenced
//! airline model) and the dynamic factor model (indicator loadings plus VAR
//! factor dynamics).
//!
//! Key behaviors
//! -------------
//! - [`time_invariant`]: `TimeInvariantDynamics`, `TimeInvariantMeasurement`,
//!   `TimeInvariantMeasurements`, validated on construction.
//! - [`arma`]: `ArmaSpec` and its stationary state-space form.
//! - [`dynamic_factor`]: `MeasurementStructure`, `MeasurementDescriptor`,
//!   `DynamicFactorMeasurements`, `VarDescriptor`, `factor_dynamics`.
//!
//! Invariants & assumptions
//! ------------------------
//! - Builders only assemble matrices; estimation lives outside this crate.
pub mod arma;
pub mod dynamic_factor;
pub mod time_invariant;

pub use self::arma::{ArmaSpec, polynomial_product};
pub use self::dynamic_factor::{
    DynamicFactorMeasurements, MeasurementDescriptor, MeasurementStructure, VarDescriptor,
    dynamic_factor_ssf, factor_dynamics,
};
pub use self::time_invariant::{
    TimeInvariantDynamics, TimeInvariantMeasurement, TimeInvariantMeasurements,
};
