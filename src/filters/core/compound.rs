//! compound — the array filter's work matrix and its Givens triangularization.
//!
//! Purpose
//! -------
//! Own the single column-major buffer the square-root filter works in and
//! describe its sub-blocks with [`Block`] descriptors, so that every step
//! assembles, rotates and reads results without allocating or copying.
//!
//! Key behaviors
//! -------------
//! - The buffer is `(m_max + n)×(n + r + m_max)`; a step with `m` observed
//!   components works in the top-left `(m + n)×(n + r + m)` region.
//! - Pre-array layout ([`CompoundLayout`]):
//!
//!   ```text
//!            cols 0..n     n..n+r     n+r..n+r+m
//!   rows 0..m     Z·L          0          R_H
//!   rows m..m+n   T·L          U           0
//!   ```
//!
//! - [`CompoundMatrix::triangularize`] zeroes everything right of the
//!   diagonal with column rotations, leaving
//!
//!   ```text
//!            cols 0..m     m..m+n     rest
//!   rows 0..m     L_F          0          0
//!   rows m..m+n   K̄          L_{t+1}      0
//!   ```
//!
//!   with non-negative diagonal entries. A row with a degenerate pivot
//!   (at or below the caller's `zero`) ends with an all-zero column.
//!
//! Invariants & assumptions
//! ------------------------
//! - `Z·L` and `T·L` share columns `0..n` and are disjoint by rows; the
//!   gain block of the result overlaps the former `Z·L`/`T·L` columns. No
//!   block is read after the rotations except the three result blocks.
//! - Rotations are orthogonal, so `A·Aᵀ` of the active region is preserved.
//! - Columns of the buffer are contiguous; rotations walk them with
//!   forward cursors.
//!
//! Testing notes
//! -------------
//! - Unit tests check `A·Aᵀ` preservation, the zero upper part, the sign of
//!   the diagonal, block offsets, and the zero columns of degenerate rows.
use crate::data::strided::{ForwardCursor, StepCursor, dot, rotate};
use ndarray::{
    Array2, ArrayView1, ArrayView2, ArrayViewMut1, ArrayViewMut2, ShapeBuilder, Zip, s,
};

/// Offset/extent descriptor of a sub-block of the compound buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Block {
    pub row: usize,
    pub col: usize,
    pub nrows: usize,
    pub ncols: usize,
}

impl Block {
    pub fn new(row: usize, col: usize, nrows: usize, ncols: usize) -> Self {
        Block { row, col, nrows, ncols }
    }

    pub fn view<'a>(&self, a: &'a Array2<f64>) -> ArrayView2<'a, f64> {
        a.slice(s![self.row..self.row + self.nrows, self.col..self.col + self.ncols])
    }

    pub fn view_mut<'a>(&self, a: &'a mut Array2<f64>) -> ArrayViewMut2<'a, f64> {
        a.slice_mut(s![self.row..self.row + self.nrows, self.col..self.col + self.ncols])
    }
}

/// Block layout for one step with `m` observed components.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompoundLayout {
    pub n: usize,
    pub r: usize,
    pub m: usize,
}

impl CompoundLayout {
    /// Whole working region.
    pub fn active(&self) -> Block {
        Block::new(0, 0, self.m + self.n, self.n + self.r + self.m)
    }

    /// `Z·L` (pre-array).
    pub fn loading(&self) -> Block {
        Block::new(0, 0, self.m, self.n)
    }

    /// `T·L` (pre-array).
    pub fn transition(&self) -> Block {
        Block::new(self.m, 0, self.n, self.n)
    }

    /// `U` (pre-array).
    pub fn noise(&self) -> Block {
        Block::new(self.m, self.n, self.n, self.r)
    }

    /// Square root of the observed error covariance (pre-array).
    pub fn error_factor(&self) -> Block {
        Block::new(0, self.n + self.r, self.m, self.m)
    }

    /// `L_F` (post-array).
    pub fn innovation_factor(&self) -> Block {
        Block::new(0, 0, self.m, self.m)
    }

    /// `K̄ = T·P·Zᵀ·L_F⁻ᵀ` (post-array).
    pub fn gain(&self) -> Block {
        Block::new(self.m, 0, self.n, self.m)
    }

    /// `L_{t+1}` (post-array).
    pub fn covariance_factor(&self) -> Block {
        Block::new(self.m, self.m, self.n, self.n)
    }
}

/// CompoundMatrix — column-major work buffer of the array filter.
#[derive(Debug, Clone)]
pub struct CompoundMatrix {
    buffer: Array2<f64>,
    n: usize,
    r: usize,
    max_obs: usize,
    pivots: Vec<Option<usize>>,
}

impl CompoundMatrix {
    /// Allocate the buffer for state dimension `n`, noise dimension `r` and
    /// at most `max_obs` observed components.
    pub fn new(n: usize, r: usize, max_obs: usize) -> Self {
        let buffer = Array2::zeros((max_obs + n, n + r + max_obs).f());
        CompoundMatrix { buffer, n, r, max_obs, pivots: Vec::with_capacity(max_obs + n) }
    }

    /// Layout for `m` observed components.
    ///
    /// Panics
    /// ------
    /// - If `m > max_obs`.
    pub fn layout(&self, m: usize) -> CompoundLayout {
        assert!(m <= self.max_obs, "{m} observed components exceed capacity {}", self.max_obs);
        CompoundLayout { n: self.n, r: self.r, m }
    }

    /// Zero the working region of `layout`.
    pub fn clear(&mut self, layout: &CompoundLayout) {
        layout.active().view_mut(&mut self.buffer).fill(0.0);
    }

    pub fn block(&self, block: Block) -> ArrayView2<'_, f64> {
        block.view(&self.buffer)
    }

    pub fn block_mut(&mut self, block: Block) -> ArrayViewMut2<'_, f64> {
        block.view_mut(&mut self.buffer)
    }

    /// Dot product of the leading `x.len()` entries of row `row` of `block`
    /// with `x`. Rows are strided by the buffer's leading dimension.
    pub fn row_dot(&self, block: Block, row: usize, x: &[f64]) -> f64 {
        let ld = self.buffer.nrows();
        match self.buffer.as_slice_memory_order() {
            Some(raw) => {
                let start = block.col * ld + block.row + row;
                dot(&mut ForwardCursor::over(x), &mut StepCursor::new(raw, start, ld as isize, x.len()))
            }
            None => block.view(&self.buffer).row(row).slice(s![..x.len()]).dot(&ArrayView1::from(x)),
        }
    }

    /// Lower-triangularize the working region of `layout` in place.
    ///
    /// Row `i` is processed against a pivot column `p ≤ i`: every nonzero
    /// entry right of `p` is annihilated by rotating column `p` with that
    /// column over rows `i..`, and a negative pivot flips the sign of its
    /// column. Rows above `i` are already zero in all columns `≥ p`.
    ///
    /// A row whose pivot ends at or below `zero` carries no information. It
    /// keeps column `p` for the next row, so whatever that column holds below
    /// the row is still rotated toward `L_{t+1}` instead of being left in the
    /// gain block. Once all rows are done, columns are moved back so that
    /// row `i` has its pivot at column `i`, and degenerate rows get an
    /// all-zero column.
    pub fn triangularize(&mut self, layout: &CompoundLayout, zero: f64) {
        let block = layout.active();
        let mut active = block.view_mut(&mut self.buffer);
        let (rows, cols) = (block.nrows, block.ncols);
        self.pivots.clear();
        let mut p = 0;
        for i in 0..rows {
            for j in p + 1..cols {
                let b = active[[i, j]];
                if b == 0.0 {
                    continue;
                }
                let a = active[[i, p]];
                let rho = a.hypot(b);
                let (cos, sin) = (a / rho, b / rho);
                let (x, y) = active.multi_slice_mut((s![i.., p], s![i.., j]));
                rotate_columns(cos, sin, x, y);
                active[[i, j]] = 0.0;
            }
            if active[[i, p]] < 0.0 {
                active.slice_mut(s![i.., p]).mapv_inplace(|v| -v);
            }
            if active[[i, p]] <= zero {
                active[[i, p]] = 0.0;
                self.pivots.push(None);
            } else {
                self.pivots.push(Some(p));
                p += 1;
            }
        }
        if p == rows {
            return;
        }

        log::trace!("compound: {} of {rows} pivots degenerate", rows - p);
        // Columns p.. are zero in every row. Walking rows upward, each pivot
        // column moves to its row's position and hands its zero slot down.
        for (i, pivot) in self.pivots.iter().enumerate().rev() {
            if let Some(col) = pivot.filter(|&col| col != i) {
                let (x, y) = active.multi_slice_mut((s![.., col], s![.., i]));
                Zip::from(x).and(y).for_each(|a, b| std::mem::swap(a, b));
            }
        }
    }
}

/// `(x, y) ← (c·x + s·y, c·y − s·x)` over two equally long columns.
fn rotate_columns(
    cos: f64, sin: f64, mut x: ArrayViewMut1<'_, f64>, mut y: ArrayViewMut1<'_, f64>,
) {
    if let (Some(xs), Some(ys)) = (x.as_slice_mut(), y.as_slice_mut()) {
        rotate(cos, sin, &mut ForwardCursor::over(xs), &mut ForwardCursor::over(ys));
        return;
    }
    Zip::from(&mut x).and(&mut y).for_each(|xv, yv| {
        let (a, b) = (*xv, *yv);
        *xv = cos * a + sin * b;
        *yv = cos * b - sin * a;
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Block offsets for a given (n, r, m).
    // - Triangularization invariants on a dense working region.
    // - Column placement when an observation row is degenerate.
    //
    // They intentionally DO NOT cover:
    // - Filter semantics of the blocks (see the array filter tests).
    // -------------------------------------------------------------------------

    #[test]
    // Purpose
    // -------
    // Check block offsets of the pre- and post-array layout.
    //
    // Given
    // -----
    // - n = 3, r = 2, m = 2.
    //
    // Expect
    // ------
    // - Offsets as documented in the module header.
    fn layout_blocks_have_documented_offsets() {
        let layout = CompoundMatrix::new(3, 2, 2).layout(2);
        assert_eq!(layout.active(), Block::new(0, 0, 5, 7));
        assert_eq!(layout.loading(), Block::new(0, 0, 2, 3));
        assert_eq!(layout.transition(), Block::new(2, 0, 3, 3));
        assert_eq!(layout.noise(), Block::new(2, 3, 3, 2));
        assert_eq!(layout.error_factor(), Block::new(0, 5, 2, 2));
        assert_eq!(layout.innovation_factor(), Block::new(0, 0, 2, 2));
        assert_eq!(layout.gain(), Block::new(2, 0, 3, 2));
        assert_eq!(layout.covariance_factor(), Block::new(2, 2, 3, 3));
    }

    #[test]
    // Purpose
    // -------
    // Triangularization must be an orthogonal column transform.
    //
    // Given
    // -----
    // - A dense 4×6 working region (n = 2, r = 2, m = 2) with mixed signs,
    //   and a zero row so a rotation-free pivot appears.
    //
    // Expect
    // ------
    // - Zero entries right of the diagonal.
    // - Non-negative diagonal.
    // - `A·Aᵀ` preserved to 1e-12.
    fn triangularize_preserves_gram_matrix() {
        // Arrange
        let mut compound = CompoundMatrix::new(2, 2, 2);
        let layout = compound.layout(2);
        compound
            .block_mut(layout.active())
            .assign(&Array2::from_shape_fn((4, 6), |(i, j)| {
                if i == 2 { 0.0 } else { ((i * 7 + j * 3) % 5) as f64 - 2.0 + 0.1 * j as f64 }
            }));
        let before = compound.block(layout.active()).to_owned();
        let gram = before.dot(&before.t());

        // Act
        compound.triangularize(&layout, 1e-9);

        // Assert
        let after = compound.block(layout.active()).to_owned();
        for i in 0..4 {
            for j in i + 1..6 {
                assert_eq!(after[[i, j]], 0.0);
            }
            assert!(after[[i, i]] >= 0.0);
        }
        let gram_after = after.dot(&after.t());
        for (a, b) in gram_after.iter().zip(gram.iter()) {
            assert_relative_eq!(*a, *b, epsilon = 1e-12);
        }
    }

    #[test]
    // Purpose
    // -------
    // A degenerate observation row must leave its gain column empty, with
    // the residual state variance rotated into the next factor.
    //
    // Given
    // -----
    // - n = 1, r = 1, m = 2 with the pre-array of a random walk observed
    //   twice without error: rows [1, 0, 0, 0], [1, 0, 0, 0], [1, 1, 0, 0].
    //
    // Expect
    // ------
    // - `L_F = [[1, 0], [1, 0]]`, `K̄ = [1, 0]`, `L_{t+1} = [1]`.
    // - `A·Aᵀ` preserved and the upper part exactly zero.
    fn degenerate_row_routes_residual_to_next_factor() {
        // Arrange
        let mut compound = CompoundMatrix::new(1, 1, 2);
        let layout = compound.layout(2);
        compound
            .block_mut(layout.active())
            .assign(&ndarray::array![[1.0, 0.0, 0.0, 0.0], [1.0, 0.0, 0.0, 0.0], [1.0, 1.0, 0.0, 0.0]]);
        let before = compound.block(layout.active()).to_owned();

        // Act
        compound.triangularize(&layout, 1e-9);

        // Assert
        let after = compound.block(layout.active()).to_owned();
        assert_eq!(compound.block(layout.innovation_factor()), ndarray::array![[1.0, 0.0], [1.0, 0.0]]);
        assert_eq!(compound.block(layout.gain()), ndarray::array![[1.0, 0.0]]);
        assert_eq!(compound.block(layout.covariance_factor()), ndarray::array![[1.0]]);
        for i in 0..3 {
            for j in i + 1..4 {
                assert_eq!(after[[i, j]], 0.0);
            }
        }
        let (gram, gram_after) = (before.dot(&before.t()), after.dot(&after.t()));
        for (a, b) in gram_after.iter().zip(gram.iter()) {
            assert_relative_eq!(*a, *b, epsilon = 1e-14);
        }
    }

    #[test]
    // Purpose
    // -------
    // Strided row access must agree with indexed access.
    //
    // Given
    // -----
    // - A filled 4×6 buffer and the block starting at (1, 2).
    //
    // Expect
    // ------
    // - `row_dot` of row 1 of the block with `[1, 2, 3]` equals the indexed
    //   sum over buffer entries (2, 2..5).
    fn row_dot_walks_buffer_rows() {
        // Arrange
        let mut compound = CompoundMatrix::new(2, 2, 2);
        let layout = compound.layout(2);
        compound
            .block_mut(layout.active())
            .assign(&Array2::from_shape_fn((4, 6), |(i, j)| (10 * i + j) as f64));
        let block = Block::new(1, 2, 3, 3);

        // Act
        let value = compound.row_dot(block, 1, &[1.0, 2.0, 3.0]);

        // Assert
        assert_eq!(value, 22.0 + 2.0 * 23.0 + 3.0 * 24.0);
    }

    #[test]
    // Purpose
    // -------
    // A smaller step must leave the rest of the buffer untouched.
    //
    // Given
    // -----
    // - Capacity m_max = 2, a step with m = 1, and a marker outside the
    //   working region.
    //
    // Expect
    // ------
    // - `clear` and `triangularize` do not touch the marker.
    fn smaller_steps_stay_inside_their_region() {
        // Arrange
        let mut compound = CompoundMatrix::new(1, 1, 2);
        let full = compound.layout(2);
        compound.block_mut(full.active()).fill(7.0);
        let layout = compound.layout(1);

        // Act
        compound.clear(&layout);
        compound.block_mut(layout.active()).assign(&ndarray::array![[1.0, 0.0, 1.0], [2.0, 1.0, 0.0]]);
        compound.triangularize(&layout, 1e-9);

        // Assert
        assert_eq!(compound.block(Block::new(2, 0, 1, 4))[[0, 0]], 7.0);
        assert_eq!(compound.block(Block::new(0, 3, 3, 1))[[0, 0]], 7.0);
        assert_relative_eq!(compound.block(layout.innovation_factor())[[0, 0]], 2.0_f64.sqrt());
    }
}
