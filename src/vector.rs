//! Sparse right-hand-side vector.

use crate::error::{Result, SparseError};
use crate::scalar::Scalar;

/// A sparse vector indexed by external row, `1..=len`.
///
/// Entries are kept sorted by index. The vector has its own lifecycle: it
/// is never permuted by the solver, which scrambles it through the row
/// translation when solving.
#[derive(Debug, Clone)]
pub struct SparseVector<T> {
    /// Entries sorted by index
    entries: Vec<(usize, T)>,
    /// Largest index ever requested
    len: usize,
}

impl<T: Scalar> Default for SparseVector<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Scalar> SparseVector<T> {
    /// Create an empty vector.
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            len: 0,
        }
    }

    /// Largest index in use.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Check whether the vector has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of stored entries.
    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    /// Get a mutable reference to an entry, creating it if needed.
    pub fn get_element(&mut self, index: usize) -> Result<&mut T> {
        if index == 0 {
            return Err(SparseError::GroundLocation { row: 0, column: 0 });
        }
        self.len = self.len.max(index);
        let position = match self.entries.binary_search_by_key(&index, |&(i, _)| i) {
            Ok(position) => position,
            Err(position) => {
                self.entries.insert(position, (index, T::zero()));
                position
            }
        };
        Ok(&mut self.entries[position].1)
    }

    /// Find an entry without creating it.
    pub fn find(&self, index: usize) -> Option<T> {
        self.entries
            .binary_search_by_key(&index, |&(i, _)| i)
            .ok()
            .map(|position| self.entries[position].1)
    }

    /// Value at an index, zero if absent.
    pub fn value(&self, index: usize) -> T {
        self.find(index).unwrap_or_else(T::zero)
    }

    /// Add a contribution to an entry.
    pub fn add(&mut self, index: usize, value: T) -> Result<()> {
        *self.get_element(index)? += value;
        Ok(())
    }

    /// Iterate over the stored entries in index order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, T)> + '_ {
        self.entries.iter().copied()
    }

    /// Zero every entry, keeping the structure.
    pub fn reset(&mut self) {
        for (_, value) in &mut self.entries {
            *value = T::zero();
        }
    }

    /// Remove every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.len = 0;
    }
}
