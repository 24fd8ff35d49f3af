//! strided — cursor access over strided numeric buffers.
//!
//! Purpose
//! -------
//! Provide a small family of cursors that walk a contiguous `f64` buffer with
//! a fixed start, a nonzero stride (possibly negative) and an element count.
//! The filters use them to read rows of column-major work matrices, rotate
//! pairs of contiguous columns, and evaluate loadings against state vectors
//! without materializing intermediate copies.
//!
//! Key behaviors
//! -------------
//! - [`Cursor`] is the read contract (`has_next`, `get`, `next`, `advance`,
//!   `remaining`); [`CursorMut`] adds `set` and `set_and_next`.
//! - Three specializations share identical observable semantics:
//!   [`ForwardCursor`] (stride +1), [`BackwardCursor`] (stride −1) and
//!   [`StepCursor`] (any nonzero stride). The unit-stride variants keep a
//!   single moving index and never branch on the stride.
//! - [`DataCursor`] picks the specialization from a runtime stride.
//! - [`dot`] and [`axpy`] are written once against the traits and therefore
//!   work for every pairing of specializations.
//!
//! Invariants & assumptions
//! ------------------------
//! - Construction validates that every visited position lies inside the
//!   buffer; a violation is a programming error and panics.
//! - `advance(k)` clamps at the end of the walk; it never moves past it.
//! - `get`/`next`/`set` on an exhausted cursor panic with "strided cursor
//!   exhausted", for every specialization, even when the buffer extends past
//!   the walk.
//!
//! Conventions
//! -----------
//! - `start` is a buffer index, `count` the number of elements visited.
//! - Reading works over any `S: AsRef<[f64]>` (slices, `Vec`, `&mut [f64]`);
//!   writing additionally requires `S: AsMut<[f64]>`.
//!
//! Testing notes
//! -------------
//! - Unit tests check that all specializations visit the same sequence as an
//!   indexed loop, that `remaining()` counts are exact under `advance`, and
//!   that `dot` is bit-identical to the indexed reference.
//! - Exhaustion is checked per specialization on sub-range walks, where an
//!   unguarded read would land on a valid neighbouring element.

/// Read contract shared by every cursor specialization.
pub trait Cursor {
    /// `true` while at least one element remains.
    fn has_next(&self) -> bool;

    /// Current element without moving.
    fn get(&self) -> f64;

    /// Current element, then move one position.
    fn next(&mut self) -> f64;

    /// Skip `k` elements (clamped at the end). Returns `has_next()`.
    fn advance(&mut self, k: usize) -> bool;

    /// Number of elements left in the walk.
    fn remaining(&self) -> usize;
}

/// Write extension of [`Cursor`].
pub trait CursorMut: Cursor {
    /// Overwrite the current element without moving.
    fn set(&mut self, value: f64);

    /// Overwrite the current element, then move one position.
    fn set_and_next(&mut self, value: f64);
}

// ---- Forward (stride +1) ----

/// Unit-stride cursor walking toward higher indices.
#[derive(Debug, Clone)]
pub struct ForwardCursor<S> {
    data: S,
    pos: usize,
    end: usize,
}

impl<S: AsRef<[f64]>> ForwardCursor<S> {
    /// Walk `count` elements starting at `start`.
    ///
    /// Panics
    /// ------
    /// - If `start + count` exceeds the buffer length.
    pub fn new(data: S, start: usize, count: usize) -> Self {
        let len = data.as_ref().len();
        assert!(
            start.checked_add(count).is_some_and(|end| end <= len),
            "forward cursor out of range: start {start}, count {count}, len {len}"
        );
        ForwardCursor { data, pos: start, end: start + count }
    }

    /// Walk the whole buffer.
    pub fn over(data: S) -> Self {
        let len = data.as_ref().len();
        ForwardCursor { data, pos: 0, end: len }
    }
}

impl<S: AsRef<[f64]>> Cursor for ForwardCursor<S> {
    #[inline]
    fn has_next(&self) -> bool {
        self.pos != self.end
    }

    #[inline]
    fn get(&self) -> f64 {
        assert!(self.pos != self.end, "strided cursor exhausted");
        self.data.as_ref()[self.pos]
    }

    #[inline]
    fn next(&mut self) -> f64 {
        let value = self.get();
        self.pos += 1;
        value
    }

    fn advance(&mut self, k: usize) -> bool {
        self.pos += k.min(self.end - self.pos);
        self.has_next()
    }

    #[inline]
    fn remaining(&self) -> usize {
        self.end - self.pos
    }
}

impl<S: AsRef<[f64]> + AsMut<[f64]>> CursorMut for ForwardCursor<S> {
    #[inline]
    fn set(&mut self, value: f64) {
        assert!(self.pos != self.end, "strided cursor exhausted");
        self.data.as_mut()[self.pos] = value;
    }

    #[inline]
    fn set_and_next(&mut self, value: f64) {
        self.set(value);
        self.pos += 1;
    }
}

// ---- Backward (stride -1) ----

/// Unit-stride cursor walking toward lower indices.
///
/// The moving index is kept one past the current element so that a walk
/// ending at index 0 never needs a signed position.
#[derive(Debug, Clone)]
pub struct BackwardCursor<S> {
    data: S,
    pos: usize,
    end: usize,
}

impl<S: AsRef<[f64]>> BackwardCursor<S> {
    /// Walk `count` elements downward starting at `start`.
    ///
    /// Panics
    /// ------
    /// - If `start` is outside the buffer while `count > 0`, or if the walk
    ///   would pass below index 0.
    pub fn new(data: S, start: usize, count: usize) -> Self {
        let len = data.as_ref().len();
        if count == 0 {
            return BackwardCursor { data, pos: 0, end: 0 };
        }
        assert!(
            start < len && count <= start + 1,
            "backward cursor out of range: start {start}, count {count}, len {len}"
        );
        BackwardCursor { data, pos: start + 1, end: start + 1 - count }
    }

    /// Walk the whole buffer from its last element.
    pub fn over(data: S) -> Self {
        let len = data.as_ref().len();
        BackwardCursor { data, pos: len, end: 0 }
    }
}

impl<S: AsRef<[f64]>> Cursor for BackwardCursor<S> {
    #[inline]
    fn has_next(&self) -> bool {
        self.pos != self.end
    }

    #[inline]
    fn get(&self) -> f64 {
        assert!(self.pos != self.end, "strided cursor exhausted");
        self.data.as_ref()[self.pos - 1]
    }

    #[inline]
    fn next(&mut self) -> f64 {
        let value = self.get();
        self.pos -= 1;
        value
    }

    fn advance(&mut self, k: usize) -> bool {
        self.pos -= k.min(self.pos - self.end);
        self.has_next()
    }

    #[inline]
    fn remaining(&self) -> usize {
        self.pos - self.end
    }
}

impl<S: AsRef<[f64]> + AsMut<[f64]>> CursorMut for BackwardCursor<S> {
    #[inline]
    fn set(&mut self, value: f64) {
        assert!(self.pos != self.end, "strided cursor exhausted");
        self.data.as_mut()[self.pos - 1] = value;
    }

    #[inline]
    fn set_and_next(&mut self, value: f64) {
        self.set(value);
        self.pos -= 1;
    }
}

// ---- Generic stride ----

/// Cursor with an arbitrary nonzero stride.
#[derive(Debug, Clone)]
pub struct StepCursor<S> {
    data: S,
    pos: isize,
    stride: isize,
    left: usize,
}

impl<S: AsRef<[f64]>> StepCursor<S> {
    /// Walk `count` elements from `start`, moving `stride` positions each time.
    ///
    /// Panics
    /// ------
    /// - If `stride == 0`.
    /// - If the first or the last visited position is outside the buffer.
    pub fn new(data: S, start: usize, stride: isize, count: usize) -> Self {
        assert!(stride != 0, "strided cursor requires a nonzero stride");
        let len = data.as_ref().len() as isize;
        if count > 0 {
            let first = start as isize;
            let last = first + (count as isize - 1) * stride;
            assert!(
                first < len && last >= 0 && last < len,
                "strided cursor out of range: start {start}, stride {stride}, count {count}, len {len}"
            );
        }
        StepCursor { data, pos: start as isize, stride, left: count }
    }
}

impl<S: AsRef<[f64]>> Cursor for StepCursor<S> {
    #[inline]
    fn has_next(&self) -> bool {
        self.left != 0
    }

    #[inline]
    fn get(&self) -> f64 {
        assert!(self.left != 0, "strided cursor exhausted");
        self.data.as_ref()[self.pos as usize]
    }

    #[inline]
    fn next(&mut self) -> f64 {
        let value = self.get();
        self.pos += self.stride;
        self.left -= 1;
        value
    }

    fn advance(&mut self, k: usize) -> bool {
        let k = k.min(self.left);
        self.pos += k as isize * self.stride;
        self.left -= k;
        self.has_next()
    }

    #[inline]
    fn remaining(&self) -> usize {
        self.left
    }
}

impl<S: AsRef<[f64]> + AsMut<[f64]>> CursorMut for StepCursor<S> {
    #[inline]
    fn set(&mut self, value: f64) {
        assert!(self.left != 0, "strided cursor exhausted");
        self.data.as_mut()[self.pos as usize] = value;
    }

    #[inline]
    fn set_and_next(&mut self, value: f64) {
        self.set(value);
        self.pos += self.stride;
        self.left -= 1;
    }
}

// ---- Runtime dispatch ----

/// Cursor whose specialization is chosen from a runtime stride.
#[derive(Debug, Clone)]
pub enum DataCursor<S> {
    Forward(ForwardCursor<S>),
    Backward(BackwardCursor<S>),
    Step(StepCursor<S>),
}

impl<S: AsRef<[f64]>> DataCursor<S> {
    /// Build the cheapest cursor for `stride`: unit strides get the
    /// branch-free specializations.
    pub fn new(data: S, start: usize, stride: isize, count: usize) -> Self {
        match stride {
            1 => DataCursor::Forward(ForwardCursor::new(data, start, count)),
            -1 => DataCursor::Backward(BackwardCursor::new(data, start, count)),
            _ => DataCursor::Step(StepCursor::new(data, start, stride, count)),
        }
    }
}

macro_rules! dispatch {
    ($self:ident, $c:ident => $body:expr) => {
        match $self {
            DataCursor::Forward($c) => $body,
            DataCursor::Backward($c) => $body,
            DataCursor::Step($c) => $body,
        }
    };
}

impl<S: AsRef<[f64]>> Cursor for DataCursor<S> {
    fn has_next(&self) -> bool {
        dispatch!(self, c => c.has_next())
    }

    fn get(&self) -> f64 {
        dispatch!(self, c => c.get())
    }

    fn next(&mut self) -> f64 {
        dispatch!(self, c => c.next())
    }

    fn advance(&mut self, k: usize) -> bool {
        dispatch!(self, c => c.advance(k))
    }

    fn remaining(&self) -> usize {
        dispatch!(self, c => c.remaining())
    }
}

impl<S: AsRef<[f64]> + AsMut<[f64]>> CursorMut for DataCursor<S> {
    fn set(&mut self, value: f64) {
        dispatch!(self, c => c.set(value))
    }

    fn set_and_next(&mut self, value: f64) {
        dispatch!(self, c => c.set_and_next(value))
    }
}

// ---- Kernels ----

/// Inner product of the remaining elements of `x` with the next elements of `y`.
///
/// Both cursors are consumed. Summation runs in walk order, so the result is
/// bit-identical to an indexed loop visiting the same positions.
///
/// Panics
/// ------
/// - If `y` has fewer remaining elements than `x`.
pub fn dot<A: Cursor, B: Cursor>(x: &mut A, y: &mut B) -> f64 {
    assert!(y.remaining() >= x.remaining(), "dot: second cursor is shorter than the first");
    let mut acc = 0.0;
    while x.has_next() {
        acc += x.next() * y.next();
    }
    acc
}

/// `y ← y + alpha·x` over the remaining elements of `x`.
///
/// Panics
/// ------
/// - If `y` has fewer remaining elements than `x`.
pub fn axpy<A: Cursor, B: CursorMut>(alpha: f64, x: &mut A, y: &mut B) {
    assert!(y.remaining() >= x.remaining(), "axpy: target cursor is shorter than the source");
    while x.has_next() {
        let value = y.get() + alpha * x.next();
        y.set_and_next(value);
    }
}

/// Apply the plane rotation `(x, y) ← (c·x + s·y, c·y − s·x)` element-wise.
///
/// Panics
/// ------
/// - If `y` has fewer remaining elements than `x`.
pub fn rotate<A: CursorMut, B: CursorMut>(c: f64, s: f64, x: &mut A, y: &mut B) {
    assert!(y.remaining() >= x.remaining(), "rotate: second cursor is shorter than the first");
    while x.has_next() {
        let xv = x.get();
        let yv = y.get();
        x.set_and_next(c * xv + s * yv);
        y.set_and_next(c * yv - s * xv);
    }
}
