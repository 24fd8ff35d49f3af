//! filters::core — building blocks shared by the array and fast filters.
//!
//! Purpose
//! -------
//! Hold what both filters need besides the model: tolerances
//! ([`options`]), the per-step record ([`prediction_error`]), the output
//! contract and its stock consumers ([`sink`]), and the array filter's work
//! matrix ([`compound`]).
//!
//! Testing notes
//! -------------
//! - Each submodule carries its own unit tests; filter semantics are tested
//!   in the filter modules.
pub mod compound;
pub mod options;
pub mod prediction_error;
pub mod sink;

pub use self::compound::{Block, CompoundLayout, CompoundMatrix};
pub use self::options::{EPSILON, FilterOptions, ZERO};
pub use self::prediction_error::PredictionError;
pub use self::sink::{LikelihoodSink, PredictionErrorStore, ResultsSink};
