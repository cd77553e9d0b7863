//! Sparse matrix storage.
//!
//! This module provides the structural half of the solver: a square matrix
//! whose nonzero entries are [`Element`]s linked into sorted row and column
//! chains.
//!
//! ## Storage
//!
//! ```text
//!            col 1      col 2      col 3
//!  row 1   [ a11 ] ---------------> [ a13 ]
//!             |                       |
//!  row 2      |        [ a22 ] ---> [ a23 ]
//!             v           |           |
//!  row 3   [ a31 ] ---> [ a32 ]       v
//! ```
//!
//! Elements are stored in an arena and addressed by [`ElementId`] handles,
//! so the frequent splice, swap and fill-in operations of pivoting never
//! invalidate a handle held by the caller. Index 0 is the ground node and is
//! never part of the matrix.

mod chain;
mod element;
mod sparse;

pub use element::{Element, ElementId, MatrixLocation};
pub use sparse::{ChainIter, SparseMatrix};
