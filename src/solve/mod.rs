//! LU factorization and solution of MNA systems.
//!
//! This module turns a [`SparseMatrix`](crate::SparseMatrix) plus a
//! right-hand side into the solution of `A · x = b`.
//!
//! ## Factorization
//!
//! The matrix is factored in place as `P · A · Q = L · U`, where the row
//! and column permutations `P` and `Q` come from Markowitz pivoting:
//!
//! ```text
//!   external (caller) indices          internal (pivoted) indices
//!   row r  ──── rows.to_internal ───▶  row r'
//!   col c  ── columns.to_internal ──▶  col c'
//! ```
//!
//! The first factorization (or any factorization after a structural change)
//! orders the matrix; later ones reuse that ordering and only redo the
//! numeric work, which is the common case inside a Newton-Raphson loop or a
//! transient sweep where only the values change.
//!
//! ## Partial decomposition
//!
//! [`Solver::set_order`] limits how many pivots are eliminated. The rows
//! after the order are updated by the eliminated pivots but are never
//! pivoted themselves.

mod kernel;
mod markowitz;
mod solver;
mod translation;

pub use markowitz::Markowitz;
pub use solver::{Solver, SolverConfig};
pub use translation::Translation;

/// Default relative pivot threshold.
///
/// A pivot candidate must be at least this fraction of the largest
/// magnitude in its column.
pub const DEFAULT_RELATIVE_PIVOT_THRESHOLD: f64 = 1e-3;

/// Default absolute pivot threshold. A pivot candidate must exceed it.
pub const DEFAULT_ABSOLUTE_PIVOT_THRESHOLD: f64 = 0.0;

/// Solver for real systems (DC and transient analysis).
pub type RealSolver = Solver<f64>;

/// Solver for complex systems (AC analysis).
#[cfg(feature = "complex")]
pub type ComplexSolver = Solver<num_complex::Complex64>;
