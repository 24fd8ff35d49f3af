//! data — observation containers and strided buffer access.
//!
//! Purpose
//! -------
//! Hold the inputs the filters read: validated observation sources
//! ([`SeriesData`], [`PanelData`] behind the [`Observations`] trait) and the
//! strided cursor family used to walk rows and columns of flat buffers.
//!
//! Key behaviors
//! -------------
//! - [`observations`]: missing values are `NaN`; infinite values are rejected
//!   with a [`DataError`].
//! - [`strided`]: forward, backward and generic-stride cursors with identical
//!   semantics, plus `dot`/`axpy`/`rotate` kernels.
//!
//! Downstream usage
//! ----------------
//! - Wrap raw arrays with `SeriesData::new` / `PanelData::new` before handing
//!   them to a filter's `process`.
pub mod errors;
pub mod observations;
pub mod strided;

pub use self::errors::{DataError, DataResult};
pub use self::observations::{Observations, PanelData, SeriesData};
pub use self::strided::{
    BackwardCursor, Cursor, CursorMut, DataCursor, ForwardCursor, StepCursor, axpy, dot, rotate,
};
