//! Sparse LU solver front end.

use std::ops::{Index, IndexMut};

use log::{debug, warn};

use crate::error::{Result, SparseError};
use crate::matrix::{Element, ElementId, MatrixLocation, SparseMatrix};
use crate::scalar::Scalar;
use crate::vector::SparseVector;

use super::kernel;
use super::markowitz::Markowitz;
use super::translation::Translation;
use super::{DEFAULT_ABSOLUTE_PIVOT_THRESHOLD, DEFAULT_RELATIVE_PIVOT_THRESHOLD};

/// Configuration for the solver.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolverConfig {
    /// Fraction of the largest magnitude in its column a pivot must reach.
    pub relative_pivot_threshold: f64,
    /// Magnitude a pivot must exceed.
    pub absolute_pivot_threshold: f64,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            relative_pivot_threshold: DEFAULT_RELATIVE_PIVOT_THRESHOLD,
            absolute_pivot_threshold: DEFAULT_ABSOLUTE_PIVOT_THRESHOLD,
        }
    }
}

impl SolverConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the relative pivot threshold.
    ///
    /// Lower values favor sparsity, higher values favor accuracy.
    /// - 1e-3 (default): the usual trade-off for circuit matrices
    /// - 1.0: partial pivoting, largest element of the column only
    pub fn with_relative_pivot_threshold(mut self, threshold: f64) -> Self {
        self.relative_pivot_threshold = threshold;
        self
    }

    /// Set the absolute pivot threshold.
    pub fn with_absolute_pivot_threshold(mut self, threshold: f64) -> Self {
        self.absolute_pivot_threshold = threshold;
        self
    }
}

/// Sparse LU solver for `A · x = b`.
///
/// Elements and right-hand-side entries are addressed with *external*
/// indices, the equation and variable numbers of the caller. Pivoting
/// permutes the matrix behind a pair of [`Translation`]s, so those indices
/// stay valid across reorderings. [`Element::row`] and [`Element::column`]
/// report *internal* indices.
///
/// Index 0 is the ground node: it is not part of the system, and the
/// solution vectors have length `size + 1` with a zero in position 0.
///
/// # Lifecycle
///
/// ```text
/// unfixed ── fix_equations ──▶ fixed ── order_and_factor ──▶ factored
///                                 ▲                            │
///                                 └──── new element / clear ───┘
/// ```
///
/// Once factored, new values can be factored again with [`Solver::factor`],
/// which reuses the pivot order and only does the numeric work.
#[derive(Debug, Clone)]
pub struct Solver<T> {
    matrix: SparseMatrix<T>,
    rhs: SparseVector<T>,
    /// External ↔ internal row map
    rows: Translation,
    /// External ↔ internal column map
    columns: Translation,
    strategy: Markowitz,
    config: SolverConfig,
    /// Scrambled right-hand side and solution
    intermediate: Vec<T>,
    /// Column scatter map used by `factor`
    scatter: Vec<Option<ElementId>>,
    is_fixed: bool,
    is_factored: bool,
    needs_reordering: bool,
    /// First step that is reordered on the next `order_and_factor`
    reorder_start: usize,
    order: isize,
    /// Returned by `Index` for missing elements
    zero: T,
}

impl<T: Scalar> Default for Solver<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Scalar> Solver<T> {
    /// Create an empty solver with the default configuration.
    pub fn new() -> Self {
        Self::with_config(SolverConfig::default())
    }

    /// Create a solver for a system of the given size.
    pub fn with_size(size: usize) -> Self {
        let mut solver = Self::new();
        solver.expand(size);
        solver
    }

    /// Create an empty solver with a custom configuration.
    pub fn with_config(config: SolverConfig) -> Self {
        Self {
            matrix: SparseMatrix::new(),
            rhs: SparseVector::new(),
            rows: Translation::new(0),
            columns: Translation::new(0),
            strategy: Markowitz::new(
                config.relative_pivot_threshold,
                config.absolute_pivot_threshold,
            ),
            config,
            intermediate: Vec::new(),
            scatter: Vec::new(),
            is_fixed: false,
            is_factored: false,
            needs_reordering: true,
            reorder_start: 1,
            order: 0,
            zero: T::zero(),
        }
    }

    /// Size of the system.
    pub fn size(&self) -> usize {
        self.matrix.size()
    }

    /// Current configuration.
    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    /// Check whether the size of the system is frozen.
    pub fn is_fixed(&self) -> bool {
        self.is_fixed
    }

    /// Check whether the matrix holds a valid factorization.
    pub fn is_factored(&self) -> bool {
        self.is_factored
    }

    /// Check whether the next `order_and_factor` reorders the matrix.
    pub fn needs_reordering(&self) -> bool {
        self.needs_reordering
    }

    /// Internal (pivoted) view of the matrix.
    pub fn matrix(&self) -> &SparseMatrix<T> {
        &self.matrix
    }

    /// Right-hand side, indexed by external row.
    pub fn rhs(&self) -> &SparseVector<T> {
        &self.rhs
    }

    /// Mutable right-hand side, indexed by external row.
    pub fn rhs_mut(&mut self) -> &mut SparseVector<T> {
        &mut self.rhs
    }

    fn expand(&mut self, size: usize) {
        self.matrix.expand(size);
        self.rows.expand(size);
        self.columns.expand(size);
    }

    fn check_location(&self, row: usize, column: usize) -> Result<()> {
        if row == 0 || column == 0 {
            return Err(SparseError::GroundLocation { row, column });
        }
        let size = self.matrix.size();
        if self.is_fixed && (row > size || column > size) {
            return Err(SparseError::OutOfRange { row, column, size });
        }
        Ok(())
    }

    /// Get the element at an external location, creating it if needed.
    ///
    /// Before the equations are fixed the system grows to fit the location.
    /// Creating an element is a structural change: the next
    /// [`order_and_factor`](Self::order_and_factor) reorders the matrix.
    pub fn get_element(&mut self, row: usize, column: usize) -> Result<ElementId> {
        self.check_location(row, column)?;
        self.expand(row.max(column));

        let (id, found) = self
            .matrix
            .create_or_get(self.rows.to_internal(row), self.columns.to_internal(column))?;
        if !found {
            self.needs_reordering = true;
            self.reorder_start = 1;
            self.is_factored = false;
        }
        Ok(id)
    }

    /// Find the element at an external location without creating it.
    pub fn find_element(&self, row: usize, column: usize) -> Option<ElementId> {
        self.matrix
            .find_element(self.rows.to_internal(row), self.columns.to_internal(column))
    }

    /// Element behind a handle.
    pub fn element(&self, id: ElementId) -> &Element<T> {
        self.matrix.element(id)
    }

    /// Mutable element behind a handle.
    pub fn element_mut(&mut self, id: ElementId) -> &mut Element<T> {
        self.matrix.element_mut(id)
    }

    /// Add a contribution to the right-hand side at an external row.
    pub fn add_rhs(&mut self, row: usize, value: T) -> Result<()> {
        self.check_location(row, 1)?;
        self.rhs.add(row, value)
    }

    /// Freeze the size of the system and allocate the work buffers.
    pub fn fix_equations(&mut self) {
        if self.is_fixed {
            return;
        }
        let size = self.matrix.size();
        self.intermediate = vec![T::zero(); size + 1];
        self.scatter = vec![None; size + 1];
        self.is_fixed = true;
        debug!("solver fixed at size {size}");
    }

    /// Allow the system to grow again.
    pub fn unfix_equations(&mut self) {
        if !self.is_fixed {
            return;
        }
        self.intermediate = Vec::new();
        self.scatter = Vec::new();
        self.is_fixed = false;
        debug!("solver unfixed");
    }

    /// Number of pivots to eliminate.
    ///
    /// A positive order eliminates that many steps, zero or a negative
    /// order eliminates `size + order` steps.
    pub fn order(&self) -> isize {
        self.order
    }

    /// Limit the number of eliminated pivots. The rows after the order are
    /// updated but never pivoted, and their unknowns solve to zero.
    pub fn set_order(&mut self, order: isize) {
        if order != self.order {
            self.order = order;
            self.force_reordering();
        }
    }

    fn effective_order(&self) -> usize {
        let size = self.matrix.size() as isize;
        let order = if self.order <= 0 {
            size + self.order
        } else {
            self.order.min(size)
        };
        order.max(0) as usize
    }

    /// Reorder the whole matrix on the next
    /// [`order_and_factor`](Self::order_and_factor).
    pub fn force_reordering(&mut self) {
        self.needs_reordering = true;
        self.reorder_start = 1;
        self.is_factored = false;
    }

    /// Keep the pivots before `step` and reorder from `step` on the next
    /// [`order_and_factor`](Self::order_and_factor).
    pub fn reorder_from(&mut self, step: usize) {
        let step = step.max(1);
        self.reorder_start = if self.needs_reordering {
            self.reorder_start.min(step)
        } else {
            step
        };
        self.needs_reordering = true;
        self.is_factored = false;
    }

    /// Factor the matrix with the current pivot order.
    ///
    /// Returns `Ok(false)` when a pivot is exactly zero; the solver is then
    /// left unfactored and the caller should call
    /// [`order_and_factor`](Self::order_and_factor).
    pub fn factor(&mut self) -> Result<bool> {
        if !self.is_fixed {
            return Err(SparseError::NotFixed);
        }
        self.is_factored = false;

        let order = self.effective_order();
        self.scatter.clear();
        self.scatter.resize(self.matrix.size() + 1, None);
        match kernel::factor(&mut self.matrix, &mut self.scatter, order) {
            Ok(()) => {
                self.is_factored = true;
                Ok(true)
            }
            Err(SparseError::ZeroPivot { step }) => {
                warn!("zero pivot at step {step}, reordering needed");
                self.scatter.fill(None);
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    /// Order the matrix for sparsity and stability, then factor it.
    ///
    /// Pivots of an earlier ordering are reused as long as they stay
    /// numerically acceptable; Markowitz reordering takes over from the
    /// first step that is not.
    pub fn order_and_factor(&mut self) -> Result<()> {
        self.fix_equations();
        self.is_factored = false;

        let result = self.eliminate_all();
        match &result {
            Ok(()) => {
                self.is_factored = true;
                self.needs_reordering = false;
                self.reorder_start = 1;
            }
            Err(e) => {
                warn!("order and factor failed: {e}");
                self.needs_reordering = true;
                self.reorder_start = 1;
            }
        }
        result
    }

    fn eliminate_all(&mut self) -> Result<()> {
        let order = self.effective_order();

        // Reuse the existing pivots while they remain valid
        let reuse_until = if self.needs_reordering {
            order.min(self.reorder_start - 1)
        } else {
            order
        };
        let mut step = 1;
        while step <= reuse_until {
            let pivot = match self.matrix.diagonal(step) {
                Some(pivot) if self.strategy.is_valid_pivot(&self.matrix, pivot) => pivot,
                _ => break,
            };
            kernel::eliminate(&mut self.matrix, pivot, step, None)?;
            step += 1;
        }
        if step > order {
            return Ok(());
        }

        debug!("reordering from step {step} of {}", self.matrix.size());
        self.strategy.setup(&self.matrix, &self.rhs, &self.rows, step);
        while step <= order {
            let pivot = self
                .strategy
                .find_pivot_within(&self.matrix, step, order)
                .ok_or(SparseError::singular(step))?;
            self.move_to_diagonal(pivot, step)?;
            kernel::eliminate(&mut self.matrix, pivot, step, Some(&mut self.strategy))?;
            step += 1;
        }
        Ok(())
    }

    fn move_to_diagonal(&mut self, pivot: ElementId, step: usize) -> Result<()> {
        let MatrixLocation { row, column } = self.matrix.element(pivot).location();
        self.strategy.move_pivot(row, column, step);
        if row != step {
            self.matrix.swap_rows(row, step)?;
            self.rows.swap(row, step);
        }
        if column != step {
            self.matrix.swap_columns(column, step)?;
            self.columns.swap(column, step);
        }
        Ok(())
    }

    /// Solve `A · x = b` for the current right-hand side.
    ///
    /// The solution is indexed by external column, position 0 is zero.
    pub fn solve(&mut self) -> Result<Vec<T>> {
        let mut solution = vec![T::zero(); self.matrix.size() + 1];
        self.solve_into(&mut solution)?;
        Ok(solution)
    }

    /// Solve `A · x = b` into a slice of length `size + 1`.
    pub fn solve_into(&mut self, solution: &mut [T]) -> Result<()> {
        self.prepare(solution.len())?;
        for (external, value) in self.rhs.iter() {
            if external < self.intermediate.len() {
                self.intermediate[self.rows.to_internal(external)] = value;
            }
        }
        let order = self.effective_order();
        kernel::substitute(&self.matrix, &mut self.intermediate, order)?;
        self.columns.unscramble(&self.intermediate, solution);
        solution[0] = T::zero();
        Ok(())
    }

    /// Solve the transposed system `Aᵀ · x = b`.
    ///
    /// The solution is indexed by external row, position 0 is zero.
    pub fn solve_transposed(&mut self) -> Result<Vec<T>> {
        let mut solution = vec![T::zero(); self.matrix.size() + 1];
        self.solve_transposed_into(&mut solution)?;
        Ok(solution)
    }

    /// Solve `Aᵀ · x = b` into a slice of length `size + 1`.
    pub fn solve_transposed_into(&mut self, solution: &mut [T]) -> Result<()> {
        self.prepare(solution.len())?;
        for (external, value) in self.rhs.iter() {
            if external < self.intermediate.len() {
                self.intermediate[self.columns.to_internal(external)] = value;
            }
        }
        let order = self.effective_order();
        kernel::substitute_transposed(&self.matrix, &mut self.intermediate, order)?;
        self.rows.unscramble(&self.intermediate, solution);
        solution[0] = T::zero();
        Ok(())
    }

    fn prepare(&mut self, length: usize) -> Result<()> {
        if !self.is_factored {
            return Err(SparseError::NotFactored);
        }
        let size = self.matrix.size();
        if length != size + 1 {
            return Err(SparseError::invalid_argument(format!(
                "solution has length {length}, expected {}",
                size + 1
            )));
        }
        self.intermediate.clear();
        self.intermediate.resize(size + 1, T::zero());
        Ok(())
    }

    /// Swap columns so that symmetric pairs of unit entries end up on zero
    /// diagonals.
    ///
    /// An ideal voltage source stamps `±1` at (n, b) and (b, n) while its
    /// branch equation has nothing on the diagonal. Moving such pairs onto
    /// the diagonal before ordering avoids pivoting on tiny values.
    pub fn preorder_mna(&mut self) -> Result<()> {
        let size = self.matrix.size();
        let mut start = 1;
        loop {
            let mut swapped = false;
            let mut another_pass = false;

            // Lone twins can be swapped without choice
            for j in start..=size {
                if !self.is_zero_diagonal(j) {
                    continue;
                }
                match self.count_twins(j) {
                    (1, Some(twin)) => {
                        self.swap_columns(twin, j)?;
                        swapped = true;
                    }
                    (count, _) if count > 1 && !another_pass => {
                        another_pass = true;
                        start = j;
                    }
                    _ => {}
                }
            }
            if !another_pass {
                break;
            }

            // Then settle the first zero diagonal with several twins
            for j in start..=size {
                if swapped {
                    break;
                }
                if !self.is_zero_diagonal(j) {
                    continue;
                }
                if let (_, Some(twin)) = self.count_twins(j) {
                    self.swap_columns(twin, j)?;
                    swapped = true;
                }
            }
            if !swapped {
                break;
            }
        }
        self.force_reordering();
        Ok(())
    }

    fn is_zero_diagonal(&self, index: usize) -> bool {
        self.matrix
            .diagonal(index)
            .map_or(true, |id| self.matrix.element(id).value().magnitude() == 0.0)
    }

    /// Count the unit pairs (r, column) and (column, r). Returns the count,
    /// capped at 2, and the column to swap with for the first pair found.
    fn count_twins(&self, column: usize) -> (usize, Option<usize>) {
        let mut count = 0;
        let mut first = None;
        for (_, e) in self.matrix.column_elements(column) {
            if e.value().magnitude() != 1.0 {
                continue;
            }
            let row = e.row();
            let twin = self
                .matrix
                .column_elements(row)
                .find(|(_, t)| t.row() == column);
            if let Some((_, t)) = twin {
                if t.value().magnitude() == 1.0 {
                    count += 1;
                    if count >= 2 {
                        break;
                    }
                    first = Some(row);
                }
            }
        }
        (count, first)
    }

    fn swap_columns(&mut self, a: usize, b: usize) -> Result<()> {
        self.matrix.swap_columns(a, b)?;
        self.columns.swap(a, b);
        Ok(())
    }

    /// Zero every matrix value and right-hand-side entry, keeping the
    /// structure and the pivot order.
    pub fn reset(&mut self) {
        self.matrix.reset();
        self.rhs.reset();
        self.is_factored = false;
    }

    /// Drop every element and right-hand-side entry.
    ///
    /// The solver goes back to an empty, unfixed state.
    pub fn clear(&mut self) {
        self.matrix = SparseMatrix::new();
        self.rhs.clear();
        self.rows = Translation::new(0);
        self.columns = Translation::new(0);
        self.intermediate = Vec::new();
        self.scatter = Vec::new();
        self.is_fixed = false;
        self.force_reordering();
    }

    /// Map an internal location to the external one.
    pub fn internal_to_external(&self, location: MatrixLocation) -> MatrixLocation {
        MatrixLocation::new(
            self.rows.to_external(location.row),
            self.columns.to_external(location.column),
        )
    }

    /// Map an external location to the internal one.
    pub fn external_to_internal(&self, location: MatrixLocation) -> MatrixLocation {
        MatrixLocation::new(
            self.rows.to_internal(location.row),
            self.columns.to_internal(location.column),
        )
    }
}

impl<T: Scalar> Index<(usize, usize)> for Solver<T> {
    type Output = T;

    /// Value at an external location, zero when no element exists.
    fn index(&self, (row, column): (usize, usize)) -> &T {
        match self.find_element(row, column) {
            Some(id) => &self.matrix.element(id).value,
            None => &self.zero,
        }
    }
}

impl<T: Scalar> IndexMut<(usize, usize)> for Solver<T> {
    /// Value at an external location, creating the element if needed.
    ///
    /// # Panics
    ///
    /// Panics on the ground row or column, and outside a fixed system.
    fn index_mut(&mut self, (row, column): (usize, usize)) -> &mut T {
        match self.get_element(row, column) {
            Ok(id) => &mut self.matrix.element_mut(id).value,
            Err(e) => panic!("{e}"),
        }
    }
}
