//! Matrix elements and their handles.

use std::fmt;

use crate::scalar::Scalar;

/// Stable handle to an element owned by a [`SparseMatrix`](super::SparseMatrix).
///
/// Handles stay valid across row and column swaps and fill-in creation.
/// They are invalidated by [`SparseMatrix::clear`](super::SparseMatrix::clear).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementId(pub(crate) usize);

impl ElementId {
    /// Position of the element in the arena.
    pub fn index(&self) -> usize {
        self.0
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "E{}", self.0)
    }
}

/// A (row, column) pair.
///
/// Whether the indices are internal or external depends on where the
/// location comes from; index 0 is the ground node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MatrixLocation {
    /// Row index
    pub row: usize,
    /// Column index
    pub column: usize,
}

impl MatrixLocation {
    /// Create a new location.
    pub fn new(row: usize, column: usize) -> Self {
        Self { row, column }
    }

    /// Check whether the location touches the ground row or column.
    pub fn is_ground(&self) -> bool {
        self.row == 0 || self.column == 0
    }
}

impl From<(usize, usize)> for MatrixLocation {
    fn from((row, column): (usize, usize)) -> Self {
        Self::new(row, column)
    }
}

impl fmt::Display for MatrixLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.column)
    }
}

/// Direction of a linked chain of elements.
///
/// A chain along [`Axis::Row`] links the elements of one row through
/// `left`/`right` and is sorted by column. A chain along [`Axis::Column`]
/// links the elements of one column through `above`/`below` and is sorted
/// by row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Axis {
    Row,
    Column,
}

/// A single nonzero entry of the matrix.
///
/// Only the value can be changed from outside the crate; the position and
/// the links are owned by the matrix.
#[derive(Debug, Clone)]
pub struct Element<T> {
    pub(crate) row: usize,
    pub(crate) column: usize,
    pub(crate) value: T,
    pub(crate) left: Option<ElementId>,
    pub(crate) right: Option<ElementId>,
    pub(crate) above: Option<ElementId>,
    pub(crate) below: Option<ElementId>,
}

impl<T: Scalar> Element<T> {
    /// Create a detached element with a zero value.
    pub(crate) fn new(row: usize, column: usize) -> Self {
        Self {
            row,
            column,
            value: T::zero(),
            left: None,
            right: None,
            above: None,
            below: None,
        }
    }

    /// Current (internal) row.
    pub fn row(&self) -> usize {
        self.row
    }

    /// Current (internal) column.
    pub fn column(&self) -> usize {
        self.column
    }

    /// Current internal location.
    pub fn location(&self) -> MatrixLocation {
        MatrixLocation::new(self.row, self.column)
    }

    /// Get the value.
    pub fn value(&self) -> T {
        self.value
    }

    /// Overwrite the value.
    pub fn set_value(&mut self, value: T) {
        self.value = value;
    }

    /// Accumulate a contribution.
    ///
    /// MNA stamping is additive: several devices sharing a node all add
    /// into the same element.
    pub fn add(&mut self, value: T) {
        self.value += value;
    }

    /// Previous element in the row.
    pub fn left(&self) -> Option<ElementId> {
        self.left
    }

    /// Next element in the row.
    pub fn right(&self) -> Option<ElementId> {
        self.right
    }

    /// Previous element in the column.
    pub fn above(&self) -> Option<ElementId> {
        self.above
    }

    /// Next element in the column.
    pub fn below(&self) -> Option<ElementId> {
        self.below
    }
}

impl<T> Element<T> {
    /// Sort key of the element inside a chain along `axis`.
    pub(crate) fn key(&self, axis: Axis) -> usize {
        match axis {
            Axis::Row => self.column,
            Axis::Column => self.row,
        }
    }

    pub(crate) fn set_key(&mut self, axis: Axis, key: usize) {
        match axis {
            Axis::Row => self.column = key,
            Axis::Column => self.row = key,
        }
    }

    pub(crate) fn next(&self, axis: Axis) -> Option<ElementId> {
        match axis {
            Axis::Row => self.right,
            Axis::Column => self.below,
        }
    }

    pub(crate) fn set_next(&mut self, axis: Axis, next: Option<ElementId>) {
        match axis {
            Axis::Row => self.right = next,
            Axis::Column => self.below = next,
        }
    }

    pub(crate) fn prev(&self, axis: Axis) -> Option<ElementId> {
        match axis {
            Axis::Row => self.left,
            Axis::Column => self.above,
        }
    }

    pub(crate) fn set_prev(&mut self, axis: Axis, prev: Option<ElementId>) {
        match axis {
            Axis::Row => self.left = prev,
            Axis::Column => self.above = prev,
        }
    }
}
