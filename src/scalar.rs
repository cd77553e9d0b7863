//! Numeric types the solver can factor.
//!
//! The factorization and substitution kernels only need a handful of
//! operations: ring arithmetic, a reciprocal, an exact zero test and a
//! magnitude for pivot selection. The identities come from `num_traits`,
//! and [`Scalar`] adds the rest so that one generic
//! [`Solver`](crate::Solver) serves both the real (DC, transient) and
//! complex (AC) analyses.

use num_traits::{One, Zero};
use std::fmt;
use std::ops::{Add, AddAssign, Mul, MulAssign, Neg, Sub, SubAssign};

/// Arithmetic required from a matrix entry type.
pub trait Scalar:
    Copy
    + fmt::Debug
    + fmt::Display
    + PartialEq
    + Add<Output = Self>
    + Sub<Output = Self>
    + Mul<Output = Self>
    + Neg<Output = Self>
    + AddAssign
    + SubAssign
    + MulAssign
    + Zero
    + One
    + Send
    + Sync
    + 'static
{
    /// Magnitude used to compare pivot candidates.
    fn magnitude(self) -> f64;

    /// Multiplicative inverse. Never called on an exact zero.
    fn reciprocal(self) -> Self;
}

impl Scalar for f64 {
    fn magnitude(self) -> f64 {
        self.abs()
    }

    fn reciprocal(self) -> Self {
        1.0 / self
    }
}

#[cfg(feature = "complex")]
impl Scalar for num_complex::Complex64 {
    /// Taxicab magnitude `|re| + |im|`, cheaper than the modulus and good
    /// enough to rank pivots.
    fn magnitude(self) -> f64 {
        self.re.abs() + self.im.abs()
    }

    fn reciprocal(self) -> Self {
        self.inv()
    }
}
