//! observations — read-only observation sources for the filters.
//!
//! Purpose
//! -------
//! Define the [`Observations`] contract the filters iterate over and provide
//! two validated containers: [`SeriesData`] for univariate series and
//! [`PanelData`] for multivariate panels (rows = time, columns = components).
//!
//! Invariants & assumptions
//! ------------------------
//! - `NaN` marks a missing value; `±inf` is rejected at construction.
//! - Containers own their data and are immutable after construction, so a
//!   filter run can borrow them for its whole duration.
//!
//! Conventions
//! -----------
//! - `get(pos, i)` addresses time `pos` and component `i`; univariate sources
//!   only accept `i == 0`.
use crate::data::errors::{DataError, DataResult};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2};

/// Observation source consumed by the filters.
pub trait Observations {
    /// Number of time positions.
    fn len(&self) -> usize;

    /// Number of components per position.
    fn dim(&self) -> usize;

    /// Observation at time `pos`, component `i`; `NaN` when missing.
    fn get(&self, pos: usize, i: usize) -> f64;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn is_missing(&self, pos: usize, i: usize) -> bool {
        self.get(pos, i).is_nan()
    }

    /// `true` when at least one value is missing.
    fn has_missing(&self) -> bool {
        (0..self.len()).any(|pos| (0..self.dim()).any(|i| self.is_missing(pos, i)))
    }

    /// Count of non-missing values.
    fn observed_count(&self) -> usize {
        (0..self.len())
            .map(|pos| (0..self.dim()).filter(|&i| !self.is_missing(pos, i)).count())
            .sum()
    }
}

/// SeriesData — validated univariate observation series.
///
/// Fields
/// ------
/// - `values`: `Array1<f64>`
///   Observations in time order; `NaN` entries are missing.
///
/// Invariants
/// ----------
/// - Non-empty; no `±inf`.
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesData {
    values: Array1<f64>,
}

impl SeriesData {
    /// Validate and wrap a univariate series.
    ///
    /// Errors
    /// ------
    /// - `DataError::EmptySeries` when `values` is empty.
    /// - `DataError::InfiniteValue` for the first `±inf` entry.
    pub fn new(values: Array1<f64>) -> DataResult<Self> {
        if values.is_empty() {
            return Err(DataError::EmptySeries);
        }
        if let Some((position, &value)) = values.iter().enumerate().find(|(_, v)| v.is_infinite()) {
            return Err(DataError::InfiniteValue { position, component: 0, value });
        }
        Ok(SeriesData { values })
    }

    pub fn values(&self) -> ArrayView1<'_, f64> {
        self.values.view()
    }
}

impl Observations for SeriesData {
    fn len(&self) -> usize {
        self.values.len()
    }

    fn dim(&self) -> usize {
        1
    }

    fn get(&self, pos: usize, i: usize) -> f64 {
        assert!(i == 0, "univariate series has a single component, got index {i}");
        self.values[pos]
    }
}

/// PanelData — validated multivariate observation panel.
///
/// Fields
/// ------
/// - `values`: `Array2<f64>`
///   One row per time position, one column per component; `NaN` entries are
///   missing.
///
/// Invariants
/// ----------
/// - At least one row and one column; no `±inf`.
#[derive(Debug, Clone, PartialEq)]
pub struct PanelData {
    values: Array2<f64>,
}

impl PanelData {
    /// Validate and wrap a panel.
    ///
    /// Errors
    /// ------
    /// - `DataError::EmptySeries` when the panel has no rows.
    /// - `DataError::NoComponents` when the panel has no columns.
    /// - `DataError::InfiniteValue` for the first `±inf` entry (row-major scan).
    pub fn new(values: Array2<f64>) -> DataResult<Self> {
        let (rows, cols) = values.dim();
        if rows == 0 {
            return Err(DataError::EmptySeries);
        }
        if cols == 0 {
            return Err(DataError::NoComponents);
        }
        for ((position, component), &value) in values.indexed_iter() {
            if value.is_infinite() {
                return Err(DataError::InfiniteValue { position, component, value });
            }
        }
        Ok(PanelData { values })
    }

    pub fn values(&self) -> ArrayView2<'_, f64> {
        self.values.view()
    }
}

impl Observations for PanelData {
    fn len(&self) -> usize {
        self.values.nrows()
    }

    fn dim(&self) -> usize {
        self.values.ncols()
    }

    fn get(&self, pos: usize, i: usize) -> f64 {
        self.values[[pos, i]]
    }
}
