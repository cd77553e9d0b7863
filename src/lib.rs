//! # Sparse MNA
//!
//! A sparse linear solver for circuit simulation.
//!
//! This library provides:
//! - A sparse matrix of linked row and column chains with stable element handles
//! - Markowitz pivoting that balances fill-in against numerical stability
//! - In-place LU factorization, with a fast path that reuses the pivot order
//! - Forward/backward substitution, including the transposed system
//! - Real (DC, transient) and complex (AC) solvers sharing one implementation
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - [`matrix`] - Element storage, row/column chains and row/column swaps
//! - [`vector`] - Sparse right-hand side
//! - [`solve`] - Pivoting, factorization and substitution
//! - [`scalar`] - The numeric types the solver accepts
//! - [`error`] - Error type shared by every operation
//!
//! ## Usage
//!
//! ```
//! use sparse_mna::RealSolver;
//!
//! // Two resistors in series driven by a 1 A source:
//! // [ 2 -1 ] [v1]   [1]
//! // [-1  2 ] [v2] = [0]
//! let mut solver = RealSolver::new();
//! solver[(1, 1)] = 2.0;
//! solver[(1, 2)] = -1.0;
//! solver[(2, 1)] = -1.0;
//! solver[(2, 2)] = 2.0;
//! solver.add_rhs(1, 1.0)?;
//!
//! solver.order_and_factor()?;
//! let v = solver.solve()?;
//! assert!((v[1] - 2.0 / 3.0).abs() < 1e-12);
//! assert!((v[2] - 1.0 / 3.0).abs() < 1e-12);
//! # Ok::<(), sparse_mna::SparseError>(())
//! ```
//!
//! ## Solving Method
//!
//! Modified Nodal Analysis produces matrices that are very sparse, nearly
//! structurally symmetric, and frequently have zeros on the diagonal (ideal
//! voltage sources, inductors at DC). Each new operating point or time step:
//!
//! 1. Restamps the values into the existing elements
//! 2. Factors with the previous pivot order ([`Solver::factor`])
//! 3. Falls back to a full reordering only when a pivot becomes unusable
//!    ([`Solver::order_and_factor`])
//! 4. Substitutes the right-hand side ([`Solver::solve`])

pub mod error;
pub mod matrix;
pub mod scalar;
pub mod solve;
pub mod vector;

// Re-export main types for convenience
pub use error::{Result, SparseError};
pub use matrix::{Element, ElementId, MatrixLocation, SparseMatrix};
pub use scalar::Scalar;
pub use solve::{Markowitz, RealSolver, Solver, SolverConfig, Translation};
pub use vector::SparseVector;

#[cfg(feature = "complex")]
pub use solve::ComplexSolver;
