//! Factorization and substitution loops.
//!
//! The factored matrix is stored in place:
//!
//! - the diagonal holds the *reciprocal* of each pivot,
//! - the strict upper triangle holds U normalized by its pivot (unit
//!   diagonal),
//! - the strict lower triangle holds L unscaled.
//!
//! so that `A = L · U` with `L[i][i] = 1 / diagonal[i]`.

use crate::error::{Result, SparseError};
use crate::matrix::{ElementId, SparseMatrix};
use crate::scalar::Scalar;

use super::markowitz::Markowitz;

/// Numeric factorization reusing the current ordering.
///
/// Left-looking: each column is scattered into `dest`, updated with the
/// already factored columns to its left, and its pivot is inverted. Only the
/// first `order` pivots are eliminated; the remaining rows are updated but
/// left unpivoted. Missing elements are created as fill-ins.
pub(crate) fn factor<T: Scalar>(
    matrix: &mut SparseMatrix<T>,
    dest: &mut [Option<ElementId>],
    order: usize,
) -> Result<()> {
    let size = matrix.size();
    if order >= 1 {
        invert_pivot(matrix, 1)?;
    }

    for step in 2..=size {
        // Scatter
        let mut current = matrix.first_in_column(step);
        while let Some(id) = current {
            dest[matrix.element(id).row()] = Some(id);
            current = matrix.element(id).below();
        }

        // Update the column with every eliminated row above the diagonal
        let limit = step.min(order + 1);
        let mut column = matrix.first_in_column(step);
        while let Some(cid) = column {
            let row = matrix.element(cid).row();
            if row >= limit {
                break;
            }
            let pivot = matrix
                .diagonal(row)
                .ok_or(SparseError::ZeroPivot { step: row })?;

            let mult = matrix.element(cid).value() * matrix.element(pivot).value();
            matrix.element_mut(cid).set_value(mult);

            let mut below = matrix.element(pivot).below();
            while let Some(lower) = below {
                let target_row = matrix.element(lower).row();
                let target = match dest[target_row] {
                    Some(target) => target,
                    None => {
                        let fillin = matrix.create_fillin(target_row, step);
                        dest[target_row] = Some(fillin);
                        fillin
                    }
                };
                let update = mult * matrix.element(lower).value();
                matrix.element_mut(target).value -= update;
                below = matrix.element(lower).below();
            }
            column = matrix.element(cid).below();
        }

        // Gather
        let mut current = matrix.first_in_column(step);
        while let Some(id) = current {
            dest[matrix.element(id).row()] = None;
            current = matrix.element(id).below();
        }

        if step <= order {
            invert_pivot(matrix, step)?;
        }
    }
    Ok(())
}

fn invert_pivot<T: Scalar>(matrix: &mut SparseMatrix<T>, step: usize) -> Result<()> {
    match matrix.diagonal(step) {
        Some(pivot) if !matrix.element(pivot).value().is_zero() => {
            let element = matrix.element_mut(pivot);
            element.value = element.value.reciprocal();
            Ok(())
        }
        _ => Err(SparseError::ZeroPivot { step }),
    }
}

/// Right-looking elimination of one pivot already on the diagonal.
///
/// The pivot is replaced by its reciprocal, the rest of its row is scaled by
/// it, and every element of the submatrix lining up with an upper and a
/// lower element is updated with `-= upper * lower`. When a strategy is
/// given, its counts follow the fill-ins and the elimination.
pub(crate) fn eliminate<T: Scalar>(
    matrix: &mut SparseMatrix<T>,
    pivot: ElementId,
    step: usize,
    mut strategy: Option<&mut Markowitz>,
) -> Result<()> {
    let value = matrix.element(pivot).value();
    if value.is_zero() {
        return Err(SparseError::ZeroPivot { step });
    }
    let reciprocal = value.reciprocal();
    matrix.element_mut(pivot).set_value(reciprocal);

    let mut upper = matrix.element(pivot).right();
    while let Some(u) = upper {
        let scaled = matrix.element(u).value() * reciprocal;
        matrix.element_mut(u).set_value(scaled);
        let column = matrix.element(u).column();

        let mut sub = matrix.element(u).below();
        let mut lower = matrix.element(pivot).below();
        while let Some(l) = lower {
            let row = matrix.element(l).row();

            // Find the element lining up with the lower element
            while let Some(s) = sub {
                if matrix.element(s).row() >= row {
                    break;
                }
                sub = matrix.element(s).below();
            }
            let target = match sub {
                Some(s) if matrix.element(s).row() == row => s,
                _ => {
                    let fillin = matrix.create_fillin(row, column);
                    if let Some(strategy) = strategy.as_deref_mut() {
                        strategy.on_fillin(row, column);
                    }
                    fillin
                }
            };

            let update = scaled * matrix.element(l).value();
            matrix.element_mut(target).value -= update;
            sub = matrix.element(target).below();
            lower = matrix.element(l).below();
        }
        upper = matrix.element(u).right();
    }

    if let Some(strategy) = strategy {
        strategy.update(matrix, pivot);
    }
    Ok(())
}

/// Forward and backward substitution on a scrambled right-hand side.
///
/// Unknowns beyond `order` are taken as zero.
pub(crate) fn substitute<T: Scalar>(
    matrix: &SparseMatrix<T>,
    intermediate: &mut [T],
    order: usize,
) -> Result<()> {
    let size = matrix.size();

    // Forward substitution: L · y = b
    for i in 1..=order {
        let mut temp = intermediate[i];
        if temp.is_zero() {
            continue;
        }
        let pivot = matrix.diagonal(i).ok_or(SparseError::NotFactored)?;
        temp *= matrix.element(pivot).value();
        intermediate[i] = temp;

        let mut below = matrix.element(pivot).below();
        while let Some(id) = below {
            let e = matrix.element(id);
            intermediate[e.row()] -= temp * e.value();
            below = e.below();
        }
    }
    for value in intermediate.iter_mut().take(size + 1).skip(order + 1) {
        *value = T::zero();
    }

    // Backward substitution: U · x = y
    for i in (1..=order).rev() {
        let mut temp = intermediate[i];
        let pivot = matrix.diagonal(i).ok_or(SparseError::NotFactored)?;
        let mut right = matrix.element(pivot).right();
        while let Some(id) = right {
            let e = matrix.element(id);
            temp -= e.value() * intermediate[e.column()];
            right = e.right();
        }
        intermediate[i] = temp;
    }
    Ok(())
}

/// Substitution for the transposed system `Aᵀ · x = b`.
///
/// `Aᵀ = Uᵀ · Lᵀ`, so the unit triangle comes first and walks the rows,
/// then the scaled triangle walks the columns.
pub(crate) fn substitute_transposed<T: Scalar>(
    matrix: &SparseMatrix<T>,
    intermediate: &mut [T],
    order: usize,
) -> Result<()> {
    let size = matrix.size();

    // Forward elimination: Uᵀ · y = b
    for i in 1..=order {
        let temp = intermediate[i];
        if temp.is_zero() {
            continue;
        }
        let pivot = matrix.diagonal(i).ok_or(SparseError::NotFactored)?;
        let mut right = matrix.element(pivot).right();
        while let Some(id) = right {
            let e = matrix.element(id);
            intermediate[e.column()] -= temp * e.value();
            right = e.right();
        }
    }
    for value in intermediate.iter_mut().take(size + 1).skip(order + 1) {
        *value = T::zero();
    }

    // Backward substitution: Lᵀ · x = y
    for i in (1..=order).rev() {
        let mut temp = intermediate[i];
        let pivot = matrix.diagonal(i).ok_or(SparseError::NotFactored)?;
        let mut below = matrix.element(pivot).below();
        while let Some(id) = below {
            let e = matrix.element(id);
            temp -= intermediate[e.row()] * e.value();
            below = e.below();
        }
        intermediate[i] = temp * matrix.element(pivot).value();
    }
    Ok(())
}
