//! Markowitz pivot selection.
//!
//! At every elimination step the pivot is picked among the elements of the
//! unreduced submatrix. The Markowitz product
//!
//! ```text
//! (row_count[r] - 1) * (column_count[c] - 1)
//! ```
//!
//! bounds the number of fill-ins that eliminating with the element at
//! (r, c) can create. Candidates must also pass a threshold test against the
//! largest magnitude in their column so that the factorization stays
//! numerically stable.
//!
//! The search tries, in order:
//!
//! 1. singletons (a row or column with a single element), which create no
//!    fill-in at all;
//! 2. diagonal elements, since MNA matrices are structurally symmetric and
//!    pivoting on the diagonal keeps them that way;
//! 3. every element of the unreduced submatrix.

use log::trace;

use crate::matrix::{ElementId, SparseMatrix};
use crate::scalar::Scalar;
use crate::vector::SparseVector;

use super::translation::Translation;
use super::{DEFAULT_ABSOLUTE_PIVOT_THRESHOLD, DEFAULT_RELATIVE_PIVOT_THRESHOLD};

/// Markowitz pivot strategy with live row and column counts.
#[derive(Debug, Clone)]
pub struct Markowitz {
    /// Relative magnitude a pivot needs against the largest in its column
    pub relative_threshold: f64,
    /// Magnitude a pivot must exceed
    pub absolute_threshold: f64,
    /// Elements (and rhs entry) per unreduced row, by internal index
    row_count: Vec<usize>,
    /// Elements per unreduced column, by internal index
    column_count: Vec<usize>,
    /// Number of singleton diagonal indices in the unreduced submatrix
    singletons: usize,
}

impl Default for Markowitz {
    fn default() -> Self {
        Self::new(
            DEFAULT_RELATIVE_PIVOT_THRESHOLD,
            DEFAULT_ABSOLUTE_PIVOT_THRESHOLD,
        )
    }
}

impl Markowitz {
    /// Create a strategy with the given thresholds.
    pub fn new(relative_threshold: f64, absolute_threshold: f64) -> Self {
        Self {
            relative_threshold,
            absolute_threshold,
            row_count: Vec::new(),
            column_count: Vec::new(),
            singletons: 0,
        }
    }

    /// Number of singletons left in the unreduced submatrix.
    pub fn singletons(&self) -> usize {
        self.singletons
    }

    /// Live element count of an internal row.
    pub fn row_count(&self, row: usize) -> usize {
        self.row_count.get(row).copied().unwrap_or(0)
    }

    /// Live element count of an internal column.
    pub fn column_count(&self, column: usize) -> usize {
        self.column_count.get(column).copied().unwrap_or(0)
    }

    /// Markowitz product of an element at internal (row, column).
    pub fn product(&self, row: usize, column: usize) -> usize {
        self.row_count(row).saturating_sub(1) * self.column_count(column).saturating_sub(1)
    }

    fn is_singleton(&self, index: usize) -> bool {
        self.row_count[index] <= 1 || self.column_count[index] <= 1
    }

    /// Adjust the singleton tally after the counts of `index` changed.
    fn note(&mut self, index: usize, was_singleton: bool) {
        match (was_singleton, self.is_singleton(index)) {
            (false, true) => self.singletons += 1,
            (true, false) => self.singletons = self.singletons.saturating_sub(1),
            _ => {}
        }
    }

    /// Count the unreduced submatrix starting at `step`.
    ///
    /// A nonzero right-hand-side entry counts towards its row.
    pub fn setup<T: Scalar>(
        &mut self,
        matrix: &SparseMatrix<T>,
        rhs: &SparseVector<T>,
        rows: &Translation,
        step: usize,
    ) {
        let size = matrix.size();
        self.row_count = vec![0; size + 1];
        self.column_count = vec![0; size + 1];

        for index in step..=size {
            self.row_count[index] = matrix
                .row_elements(index)
                .filter(|(_, e)| e.column() >= step)
                .count();
            self.column_count[index] = matrix
                .column_elements(index)
                .filter(|(_, e)| e.row() >= step)
                .count();
        }
        for (external, value) in rhs.iter() {
            if value.is_zero() {
                continue;
            }
            let row = rows.to_internal(external);
            if row >= step && row <= size {
                self.row_count[row] += 1;
            }
        }

        self.singletons = (step..=size).filter(|&i| self.is_singleton(i)).count();
    }

    /// Check a pivot reused from an earlier ordering.
    ///
    /// The pivot must exceed the absolute threshold and be at least the
    /// relative threshold times the largest element below it.
    pub fn is_valid_pivot<T: Scalar>(&self, matrix: &SparseMatrix<T>, pivot: ElementId) -> bool {
        let element = matrix.element(pivot);
        let magnitude = element.value().magnitude();
        if magnitude <= self.absolute_threshold {
            return false;
        }

        let mut largest = 0.0f64;
        let mut below = element.below();
        while let Some(id) = below {
            let e = matrix.element(id);
            largest = largest.max(e.value().magnitude());
            below = e.below();
        }
        magnitude >= self.relative_threshold * largest
    }

    /// Find the pivot for elimination step `step`, or `None` if the
    /// unreduced submatrix holds no acceptable element.
    pub fn find_pivot<T: Scalar>(&self, matrix: &SparseMatrix<T>, step: usize) -> Option<ElementId> {
        self.find_pivot_within(matrix, step, matrix.size())
    }

    /// Find a pivot among the internal rows and columns `step..=limit`.
    ///
    /// Rows and columns after `limit` still count towards the products but
    /// never provide a pivot.
    pub fn find_pivot_within<T: Scalar>(
        &self,
        matrix: &SparseMatrix<T>,
        step: usize,
        limit: usize,
    ) -> Option<ElementId> {
        let chosen = self
            .search_singletons(matrix, step, limit)
            .or_else(|| self.search_diagonal(matrix, step, limit))
            .or_else(|| self.search_submatrix(matrix, step, limit));
        if let Some(id) = chosen {
            let e = matrix.element(id);
            trace!(
                "step {step}: pivot at ({}, {}) with product {}",
                e.row(),
                e.column(),
                self.product(e.row(), e.column())
            );
        }
        chosen
    }

    /// Largest magnitude of the unreduced part of a column.
    fn largest_in_column<T: Scalar>(matrix: &SparseMatrix<T>, column: usize, step: usize) -> f64 {
        matrix
            .column_elements(column)
            .filter(|(_, e)| e.row() >= step)
            .map(|(_, e)| e.value().magnitude())
            .fold(0.0, f64::max)
    }

    fn is_stable(&self, magnitude: f64, largest: f64) -> bool {
        magnitude > self.absolute_threshold && magnitude >= self.relative_threshold * largest
    }

    fn search_singletons<T: Scalar>(
        &self,
        matrix: &SparseMatrix<T>,
        step: usize,
        limit: usize,
    ) -> Option<ElementId> {
        if self.singletons == 0 {
            return None;
        }

        // Last index first
        for index in (step..=limit).rev() {
            if !self.is_singleton(index) {
                continue;
            }

            // Column singleton: the only element of its column
            if self.column_count[index] == 1 {
                let only = matrix
                    .column_elements(index)
                    .find(|(_, e)| e.row() >= step);
                if let Some((id, e)) = only {
                    if e.row() <= limit && e.value().magnitude() > self.absolute_threshold {
                        return Some(id);
                    }
                }
            }

            // Row singleton: still has to be stable within its column
            if self.row_count[index] == 1 {
                let only = matrix.row_elements(index).find(|(_, e)| e.column() >= step);
                if let Some((id, e)) = only {
                    let largest = Self::largest_in_column(matrix, e.column(), step);
                    if e.column() <= limit && self.is_stable(e.value().magnitude(), largest) {
                        return Some(id);
                    }
                }
            }
        }
        None
    }

    fn search_diagonal<T: Scalar>(
        &self,
        matrix: &SparseMatrix<T>,
        step: usize,
        limit: usize,
    ) -> Option<ElementId> {
        let mut best: Option<(ElementId, usize, f64)> = None;
        for index in step..=limit {
            let Some(id) = matrix.diagonal(index) else {
                continue;
            };
            let magnitude = matrix.element(id).value().magnitude();
            let largest = Self::largest_in_column(matrix, index, step);
            if !self.is_stable(magnitude, largest) {
                continue;
            }
            let product = self.product(index, index);
            if Self::is_better(best, product, magnitude) {
                best = Some((id, product, magnitude));
            }
        }
        best.map(|(id, _, _)| id)
    }

    fn search_submatrix<T: Scalar>(
        &self,
        matrix: &SparseMatrix<T>,
        step: usize,
        limit: usize,
    ) -> Option<ElementId> {
        let mut best: Option<(ElementId, usize, f64)> = None;
        for column in step..=limit {
            let largest = Self::largest_in_column(matrix, column, step);
            let candidates = matrix
                .column_elements(column)
                .filter(|(_, e)| e.row() >= step && e.row() <= limit);
            for (id, e) in candidates {
                let magnitude = e.value().magnitude();
                if !self.is_stable(magnitude, largest) {
                    continue;
                }
                let product = self.product(e.row(), column);
                if Self::is_better(best, product, magnitude) {
                    best = Some((id, product, magnitude));
                }
            }
        }
        best.map(|(id, _, _)| id)
    }

    /// Smaller product wins, ties go to the larger magnitude.
    fn is_better(best: Option<(ElementId, usize, f64)>, product: usize, magnitude: f64) -> bool {
        match best {
            None => true,
            Some((_, p, m)) => product < p || (product == p && magnitude > m),
        }
    }

    /// Account for the pivot at internal (row, column) being moved to the
    /// diagonal position `step`. Must be called before the matrix is
    /// swapped.
    pub fn move_pivot(&mut self, row: usize, column: usize, step: usize) {
        let touched = [step, row, column];
        let was: Vec<bool> = touched.iter().map(|&i| self.is_singleton(i)).collect();

        self.row_count.swap(row, step);
        self.column_count.swap(column, step);

        let mut seen = Vec::with_capacity(3);
        for (&index, &was_singleton) in touched.iter().zip(&was) {
            if !seen.contains(&index) {
                seen.push(index);
                self.note(index, was_singleton);
            }
        }

        // The pivot position leaves the unreduced submatrix
        if self.is_singleton(step) {
            self.singletons = self.singletons.saturating_sub(1);
        }
    }

    /// Update the counts after the pivot at diagonal position `step` has been
    /// eliminated.
    pub fn update<T: Scalar>(&mut self, matrix: &SparseMatrix<T>, pivot: ElementId) {
        let element = matrix.element(pivot);

        let mut below = element.below();
        while let Some(id) = below {
            let row = matrix.element(id).row();
            let was = self.is_singleton(row);
            self.row_count[row] = self.row_count[row].saturating_sub(1);
            self.note(row, was);
            below = matrix.element(id).below();
        }

        let mut right = element.right();
        while let Some(id) = right {
            let column = matrix.element(id).column();
            let was = self.is_singleton(column);
            self.column_count[column] = self.column_count[column].saturating_sub(1);
            self.note(column, was);
            right = matrix.element(id).right();
        }
    }

    /// Account for a fill-in created at internal (row, column).
    pub fn on_fillin(&mut self, row: usize, column: usize) {
        let was = self.is_singleton(row);
        self.row_count[row] += 1;
        self.note(row, was);

        let was = self.is_singleton(column);
        self.column_count[column] += 1;
        self.note(column, was);
    }
}
