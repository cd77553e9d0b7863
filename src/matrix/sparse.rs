//! Arena-backed sparse matrix with row and column chains.

use std::fmt;

use log::trace;

use crate::error::{Result, SparseError};
use crate::scalar::Scalar;

use super::chain::Chain;
use super::element::{Axis, Element, ElementId, MatrixLocation};

/// Square sparse matrix addressed by internal indices `1..=size`.
///
/// Every element lives in a single arena and is linked into exactly one row
/// chain and one column chain. Only the methods of this type relink
/// elements, so the two views can never drift apart.
#[derive(Debug, Clone)]
pub struct SparseMatrix<T> {
    /// Element arena
    elements: Vec<Element<T>>,
    /// Row headers, index 0 unused
    rows: Vec<Chain>,
    /// Column headers, index 0 unused
    columns: Vec<Chain>,
    /// Diagonal cache, index 0 unused
    diagonal: Vec<Option<ElementId>>,
    /// Matrix dimension
    size: usize,
    /// Number of elements created by elimination
    fillins: usize,
}

impl<T: Scalar> Default for SparseMatrix<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Scalar> SparseMatrix<T> {
    /// Create an empty matrix of size 0.
    pub fn new() -> Self {
        Self::with_size(0)
    }

    /// Create an empty matrix of the given size.
    pub fn with_size(size: usize) -> Self {
        Self {
            elements: Vec::new(),
            rows: vec![Chain::default(); size + 1],
            columns: vec![Chain::default(); size + 1],
            diagonal: vec![None; size + 1],
            size,
            fillins: 0,
        }
    }

    /// Matrix dimension.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Number of elements, fill-ins included.
    pub fn element_count(&self) -> usize {
        self.elements.len()
    }

    /// Number of fill-ins created so far.
    pub fn fillins(&self) -> usize {
        self.fillins
    }

    /// Grow the matrix to at least `size`. Never shrinks.
    pub fn expand(&mut self, size: usize) {
        if size <= self.size {
            return;
        }
        self.rows.resize(size + 1, Chain::default());
        self.columns.resize(size + 1, Chain::default());
        self.diagonal.resize(size + 1, None);
        self.size = size;
    }

    /// Get the element at a location, creating it if needed.
    ///
    /// The matrix grows when the location lies outside of it.
    pub fn get_element(&mut self, row: usize, column: usize) -> Result<ElementId> {
        self.create_or_get(row, column).map(|(id, _)| id)
    }

    /// Get or create an element; the flag tells whether it already existed.
    pub fn create_or_get(&mut self, row: usize, column: usize) -> Result<(ElementId, bool)> {
        if row == 0 || column == 0 {
            return Err(SparseError::GroundLocation { row, column });
        }
        self.expand(row.max(column));

        let (id, found) = self.rows[row].create_or_get(Axis::Row, &mut self.elements, row, column);
        if !found {
            self.columns[column].insert(Axis::Column, &mut self.elements, id);
            if row == column {
                self.diagonal[row] = Some(id);
            }
        }
        Ok((id, found))
    }

    /// Find an element without creating it.
    pub fn find_element(&self, row: usize, column: usize) -> Option<ElementId> {
        if row == 0 || column == 0 || row > self.size || column > self.size {
            return None;
        }
        if row == column {
            return self.diagonal[row];
        }
        self.rows[row].find(Axis::Row, &self.elements, column)
    }

    /// Cached diagonal element.
    pub fn diagonal(&self, index: usize) -> Option<ElementId> {
        self.diagonal.get(index).copied().flatten()
    }

    /// First element of a row.
    pub fn first_in_row(&self, row: usize) -> Option<ElementId> {
        self.rows.get(row).and_then(Chain::first)
    }

    /// Last element of a row.
    pub fn last_in_row(&self, row: usize) -> Option<ElementId> {
        self.rows.get(row).and_then(Chain::last)
    }

    /// First element of a column.
    pub fn first_in_column(&self, column: usize) -> Option<ElementId> {
        self.columns.get(column).and_then(Chain::first)
    }

    /// Last element of a column.
    pub fn last_in_column(&self, column: usize) -> Option<ElementId> {
        self.columns.get(column).and_then(Chain::last)
    }

    /// Access an element.
    ///
    /// # Panics
    ///
    /// Panics if the handle does not belong to this matrix.
    pub fn element(&self, id: ElementId) -> &Element<T> {
        &self.elements[id.0]
    }

    /// Mutable access to an element's value.
    ///
    /// # Panics
    ///
    /// Panics if the handle does not belong to this matrix.
    pub fn element_mut(&mut self, id: ElementId) -> &mut Element<T> {
        &mut self.elements[id.0]
    }

    /// Value at a location, zero if there is no element.
    pub fn value(&self, row: usize, column: usize) -> T {
        self.find_element(row, column)
            .map_or_else(T::zero, |id| self.elements[id.0].value)
    }

    /// Create a fill-in element during elimination.
    ///
    /// The location must not hold an element yet.
    pub fn create_fillin(&mut self, row: usize, column: usize) -> ElementId {
        debug_assert!(row > 0 && column > 0 && row <= self.size && column <= self.size);
        let id = ElementId(self.elements.len());
        self.elements.push(Element::new(row, column));
        self.rows[row].insert(Axis::Row, &mut self.elements, id);
        self.columns[column].insert(Axis::Column, &mut self.elements, id);
        if row == column {
            self.diagonal[row] = Some(id);
        }
        self.fillins += 1;
        trace!("fill-in created at ({row}, {column})");
        id
    }

    /// Swap two rows.
    ///
    /// Every element keeps its handle; only the row indices change.
    pub fn swap_rows(&mut self, row1: usize, row2: usize) -> Result<()> {
        self.swap_axis(Axis::Row, row1, row2)
    }

    /// Swap two columns.
    ///
    /// Every element keeps its handle; only the column indices change.
    pub fn swap_columns(&mut self, column1: usize, column2: usize) -> Result<()> {
        self.swap_axis(Axis::Column, column1, column2)
    }

    /// Swap two rows (`Axis::Row`) or two columns (`Axis::Column`).
    ///
    /// Walks both chains in step and, for every crossing chain that holds an
    /// element of either of them, lets that crossing chain exchange the keys.
    fn swap_axis(&mut self, axis: Axis, a: usize, b: usize) -> Result<()> {
        if a == b {
            return Ok(());
        }
        let (low, high) = (a.min(b), a.max(b));
        if high > self.size {
            return Err(SparseError::invalid_argument(format!(
                "cannot swap index {high} of a matrix of size {}",
                self.size
            )));
        }
        if low == 0 {
            return Err(SparseError::invalid_argument("cannot swap the ground index"));
        }

        let cross = match axis {
            Axis::Row => Axis::Column,
            Axis::Column => Axis::Row,
        };
        let (own, crossing) = match axis {
            Axis::Row => (&mut self.rows, &mut self.columns),
            Axis::Column => (&mut self.columns, &mut self.rows),
        };
        let elements = &mut self.elements;

        // Links along `axis` are never modified by the crossing swaps
        let mut low_element = own[low].first();
        let mut high_element = own[high].first();
        loop {
            let (first, second) = match (low_element, high_element) {
                (None, None) => break,
                (Some(l), None) => (Some(l), None),
                (None, Some(h)) => (None, Some(h)),
                (Some(l), Some(h)) => {
                    let lk = elements[l.0].key(axis);
                    let hk = elements[h.0].key(axis);
                    if lk < hk {
                        (Some(l), None)
                    } else if hk < lk {
                        (None, Some(h))
                    } else {
                        (Some(l), Some(h))
                    }
                }
            };

            let position = match first.or(second) {
                Some(id) => elements[id.0].key(axis),
                None => break,
            };
            if let Some(l) = first {
                low_element = elements[l.0].next(axis);
            }
            if let Some(h) = second {
                high_element = elements[h.0].next(axis);
            }
            crossing[position].swap(cross, elements, first, second, low, high)?;
        }

        own.swap(low, high);
        self.diagonal[low] = self.locate(low, low);
        self.diagonal[high] = self.locate(high, high);
        Ok(())
    }

    /// Row scan that bypasses the diagonal cache.
    fn locate(&self, row: usize, column: usize) -> Option<ElementId> {
        self.rows[row].find(Axis::Row, &self.elements, column)
    }

    /// Zero every value, keeping the structure.
    pub fn reset(&mut self) {
        for element in &mut self.elements {
            element.value = T::zero();
        }
    }

    /// Release every element. The size is kept.
    pub fn clear(&mut self) {
        for row in 1..=self.size {
            self.rows[row].clear(Axis::Row, &mut self.elements);
            self.columns[row].clear(Axis::Column, &mut self.elements);
        }
        self.elements.clear();
        self.diagonal.fill(None);
        self.fillins = 0;
    }

    /// Iterate over the elements of a row, left to right.
    pub fn row_elements(&self, row: usize) -> ChainIter<'_, T> {
        ChainIter {
            matrix: self,
            axis: Axis::Row,
            current: self.first_in_row(row),
        }
    }

    /// Iterate over the elements of a column, top to bottom.
    pub fn column_elements(&self, column: usize) -> ChainIter<'_, T> {
        ChainIter {
            matrix: self,
            axis: Axis::Column,
            current: self.first_in_column(column),
        }
    }

    /// Internal locations of all elements, in row-major order.
    pub fn locations(&self) -> Vec<MatrixLocation> {
        (1..=self.size)
            .flat_map(|row| self.row_elements(row).map(|(_, e)| e.location()))
            .collect()
    }
}

/// Iterator over one row or column chain.
pub struct ChainIter<'a, T> {
    matrix: &'a SparseMatrix<T>,
    axis: Axis,
    current: Option<ElementId>,
}

impl<'a, T> Iterator for ChainIter<'a, T> {
    type Item = (ElementId, &'a Element<T>);

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.current?;
        let element = &self.matrix.elements[id.0];
        self.current = element.next(self.axis);
        Some((id, element))
    }
}

impl<T: Scalar> fmt::Display for SparseMatrix<T> {
    /// Dense rendering of the internal matrix; `.` marks missing elements.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in 1..=self.size {
            let mut elements = self.row_elements(row).peekable();
            for column in 1..=self.size {
                if column > 1 {
                    write!(f, "\t")?;
                }
                match elements.peek() {
                    Some((_, e)) if e.column == column => {
                        write!(f, "{}", e.value)?;
                        elements.next();
                    }
                    _ => write!(f, ".")?,
                }
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled(entries: &[(usize, usize, f64)]) -> SparseMatrix<f64> {
        let mut matrix = SparseMatrix::new();
        for &(r, c, v) in entries {
            let id = matrix.get_element(r, c).unwrap();
            matrix.element_mut(id).set_value(v);
        }
        matrix
    }

    /// Check the dual linkage and ordering invariants of the whole matrix.
    fn assert_invariants(matrix: &SparseMatrix<f64>) {
        let mut from_rows = Vec::new();
        for row in 1..=matrix.size() {
            let mut last = 0;
            let mut prev = None;
            for (id, e) in matrix.row_elements(row) {
                assert_eq!(e.row, row);
                assert!(e.column > last, "row {row} unsorted");
                assert_eq!(e.left, prev);
                last = e.column;
                prev = Some(id);
                from_rows.push(id);
            }
            assert_eq!(matrix.last_in_row(row), prev);
        }

        let mut from_columns = Vec::new();
        for column in 1..=matrix.size() {
            let mut last = 0;
            let mut prev = None;
            for (id, e) in matrix.column_elements(column) {
                assert_eq!(e.column, column);
                assert!(e.row > last, "column {column} unsorted");
                assert_eq!(e.above, prev);
                last = e.row;
                prev = Some(id);
                from_columns.push(id);
            }
            assert_eq!(matrix.last_in_column(column), prev);
        }

        from_rows.sort();
        from_columns.sort();
        assert_eq!(from_rows, from_columns);
        assert_eq!(from_rows.len(), matrix.element_count());

        for i in 1..=matrix.size() {
            assert_eq!(matrix.diagonal(i), matrix.locate(i, i));
        }
    }

    #[test]
    fn test_get_element_creates_once() {
        let mut matrix = SparseMatrix::<f64>::new();
        let a = matrix.get_element(2, 3).unwrap();
        let b = matrix.get_element(2, 3).unwrap();
        assert_eq!(a, b);
        assert_eq!(matrix.size(), 3);
        assert_eq!(matrix.element_count(), 1);
        assert_eq!(matrix.find_element(2, 3), Some(a));
        assert_eq!(matrix.find_element(3, 2), None);
    }

    #[test]
    fn test_ground_location_rejected() {
        let mut matrix = SparseMatrix::<f64>::new();
        assert_eq!(
            matrix.get_element(0, 1),
            Err(SparseError::GroundLocation { row: 0, column: 1 })
        );
        assert_eq!(matrix.find_element(0, 0), None);
    }

    #[test]
    fn test_diagonal_cache() {
        let matrix = filled(&[(1, 1, 1.0), (2, 1, 2.0), (3, 3, 3.0)]);
        assert!(matrix.diagonal(1).is_some());
        assert!(matrix.diagonal(2).is_none());
        assert_eq!(matrix.element(matrix.diagonal(3).unwrap()).value(), 3.0);
        assert_invariants(&matrix);
    }

    #[test]
    fn test_swap_rows_relabels_elements() {
        let mut matrix = filled(&[
            (1, 1, 11.0),
            (1, 3, 13.0),
            (2, 2, 22.0),
            (3, 1, 31.0),
            (3, 2, 32.0),
            (4, 4, 44.0),
        ]);
        matrix.swap_rows(1, 3).unwrap();

        assert_eq!(matrix.value(1, 1), 31.0);
        assert_eq!(matrix.value(1, 2), 32.0);
        assert_eq!(matrix.value(3, 1), 11.0);
        assert_eq!(matrix.value(3, 3), 13.0);
        assert_eq!(matrix.value(1, 3), 0.0);
        assert_eq!(matrix.value(4, 4), 44.0);
        assert_eq!(matrix.element(matrix.diagonal(3).unwrap()).value(), 13.0);
        assert_eq!(matrix.element(matrix.diagonal(1).unwrap()).value(), 31.0);
        assert_invariants(&matrix);
    }

    #[test]
    fn test_swap_columns_relabels_elements() {
        let mut matrix = filled(&[
            (1, 1, 11.0),
            (1, 4, 14.0),
            (2, 2, 22.0),
            (3, 4, 34.0),
            (4, 1, 41.0),
            (4, 3, 43.0),
        ]);
        matrix.swap_columns(4, 1).unwrap();

        assert_eq!(matrix.value(1, 1), 14.0);
        assert_eq!(matrix.value(1, 4), 11.0);
        assert_eq!(matrix.value(3, 1), 34.0);
        assert_eq!(matrix.value(4, 4), 41.0);
        assert_eq!(matrix.value(4, 3), 43.0);
        assert!(matrix.diagonal(4).is_some());
        assert_invariants(&matrix);
    }

    #[test]
    fn test_swap_twice_restores() {
        let entries = [(1, 2, 1.0), (2, 1, 2.0), (2, 3, 3.0), (3, 3, 4.0), (4, 2, 5.0)];
        let mut matrix = filled(&entries);
        matrix.swap_rows(2, 4).unwrap();
        matrix.swap_columns(1, 3).unwrap();
        matrix.swap_columns(3, 1).unwrap();
        matrix.swap_rows(4, 2).unwrap();
        for &(r, c, v) in &entries {
            assert_eq!(matrix.value(r, c), v);
        }
        assert_invariants(&matrix);
    }

    #[test]
    fn test_swap_out_of_range() {
        let mut matrix = filled(&[(1, 1, 1.0)]);
        assert!(matrix.swap_rows(1, 2).is_err());
        assert!(matrix.swap_rows(1, 1).is_ok());
    }

    #[test]
    fn test_fillin() {
        let mut matrix = filled(&[(1, 1, 1.0), (1, 3, 1.0), (3, 1, 1.0), (3, 3, 1.0), (2, 2, 1.0)]);
        let id = matrix.create_fillin(2, 3);
        assert_eq!(matrix.find_element(2, 3), Some(id));
        assert_eq!(matrix.fillins(), 1);
        assert_eq!(matrix.element(id).value(), 0.0);
        assert_invariants(&matrix);
    }

    #[test]
    fn test_reset_and_clear() {
        let mut matrix = filled(&[(1, 1, 1.0), (2, 2, 2.0)]);
        matrix.reset();
        assert_eq!(matrix.element_count(), 2);
        assert_eq!(matrix.value(2, 2), 0.0);

        matrix.clear();
        assert_eq!(matrix.element_count(), 0);
        assert_eq!(matrix.size(), 2);
        assert_eq!(matrix.diagonal(1), None);
        assert_eq!(matrix.first_in_row(1), None);
        assert_invariants(&matrix);
    }

    #[test]
    fn test_display() {
        let matrix = filled(&[(1, 1, 1.0), (2, 1, 2.0)]);
        assert_eq!(matrix.to_string(), "1\t.\n2\t.\n");
    }
}
