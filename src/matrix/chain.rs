//! Sorted doubly-linked chains of elements.
//!
//! Each row and each column of the matrix is a [`Chain`]. The same code
//! serves both: the [`Axis`] argument selects which pair of links and which
//! index is used as the sort key. Chains never own elements; they only hold
//! the handles of the first and last element and rewire links inside the
//! arena they are given.

use crate::error::{Result, SparseError};
use crate::scalar::Scalar;

use super::element::{Axis, Element, ElementId};

/// Header of one row or column.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct Chain {
    first: Option<ElementId>,
    last: Option<ElementId>,
}

impl Chain {
    pub(crate) fn first(&self) -> Option<ElementId> {
        self.first
    }

    pub(crate) fn last(&self) -> Option<ElementId> {
        self.last
    }

    /// Find the element with the given key. Stops as soon as a larger key
    /// is seen.
    pub(crate) fn find<T>(
        &self,
        axis: Axis,
        elements: &[Element<T>],
        key: usize,
    ) -> Option<ElementId> {
        let mut current = self.first;
        while let Some(id) = current {
            let element = &elements[id.0];
            let k = element.key(axis);
            if k == key {
                return Some(id);
            }
            if k > key {
                return None;
            }
            current = element.next(axis);
        }
        None
    }

    /// Splice an element in at its sorted position.
    ///
    /// The caller guarantees that no element with the same key is in the
    /// chain.
    pub(crate) fn insert<T>(&mut self, axis: Axis, elements: &mut [Element<T>], id: ElementId) {
        let key = elements[id.0].key(axis);
        let mut prev = None;
        let mut next = self.first;
        while let Some(n) = next {
            if elements[n.0].key(axis) > key {
                break;
            }
            prev = next;
            next = elements[n.0].next(axis);
        }
        debug_assert!(
            prev.map_or(true, |p| elements[p.0].key(axis) != key),
            "duplicate key {key} inserted in chain"
        );
        self.splice(axis, elements, id, prev, next);
    }

    /// Return the element with the given key, creating it if needed.
    ///
    /// The boolean is `true` if the element already existed. A created
    /// element is only linked into this chain; linking it into the crossing
    /// chain is up to the caller.
    pub(crate) fn create_or_get<T: Scalar>(
        &mut self,
        axis: Axis,
        elements: &mut Vec<Element<T>>,
        row: usize,
        column: usize,
    ) -> (ElementId, bool) {
        let key = match axis {
            Axis::Row => column,
            Axis::Column => row,
        };

        let mut prev = None;
        let mut next = self.first;
        while let Some(n) = next {
            let k = elements[n.0].key(axis);
            if k == key {
                return (n, true);
            }
            if k > key {
                break;
            }
            prev = next;
            next = elements[n.0].next(axis);
        }

        let id = ElementId(elements.len());
        elements.push(Element::new(row, column));
        self.splice(axis, elements, id, prev, next);
        (id, false)
    }

    /// Unlink an element. Its own links are left dangling.
    pub(crate) fn remove<T>(&mut self, axis: Axis, elements: &mut [Element<T>], id: ElementId) {
        let prev = elements[id.0].prev(axis);
        let next = elements[id.0].next(axis);
        match prev {
            None => self.first = next,
            Some(p) => elements[p.0].set_next(axis, next),
        }
        match next {
            None => self.last = prev,
            Some(n) => elements[n.0].set_prev(axis, prev),
        }
    }

    /// Detach every element of the chain.
    pub(crate) fn clear<T>(&mut self, axis: Axis, elements: &mut [Element<T>]) {
        let mut current = self.first;
        while let Some(id) = current {
            current = elements[id.0].next(axis);
            elements[id.0].set_prev(axis, None);
            elements[id.0].set_next(axis, None);
        }
        self.first = None;
        self.last = None;
    }

    /// Exchange the keys of two positions of the chain.
    ///
    /// `first` is the element currently at `key_first` and `second` the one
    /// at `key_second`, with `key_first < key_second`; either may be absent.
    /// Afterwards `first` sits at `key_second` and `second` at `key_first`,
    /// and the chain is sorted again. The crossing chains are not touched.
    pub(crate) fn swap<T>(
        &mut self,
        axis: Axis,
        elements: &mut [Element<T>],
        first: Option<ElementId>,
        second: Option<ElementId>,
        key_first: usize,
        key_second: usize,
    ) -> Result<()> {
        match (first, second) {
            (None, None) => Err(SparseError::invalid_argument(
                "both matrix elements of a swap cannot be absent",
            )),
            (None, Some(second)) => {
                self.move_back(axis, elements, second, key_first);
                Ok(())
            }
            (Some(first), None) => {
                self.move_forward(axis, elements, first, key_second);
                Ok(())
            }
            (Some(first), Some(second)) => {
                if elements[first.0].next(axis) == Some(second) {
                    self.swap_adjacent(axis, elements, first, second);
                } else {
                    self.swap_apart(axis, elements, first, second);
                }
                elements[first.0].set_key(axis, key_second);
                elements[second.0].set_key(axis, key_first);
                Ok(())
            }
        }
    }

    /// Move an element towards the head of the chain to a smaller key.
    fn move_back<T>(&mut self, axis: Axis, elements: &mut [Element<T>], id: ElementId, key: usize) {
        let mut element = match elements[id.0].prev(axis) {
            Some(prev) if elements[prev.0].key(axis) > key => prev,
            _ => {
                elements[id.0].set_key(axis, key);
                return;
            }
        };

        self.remove(axis, elements, id);
        while let Some(prev) = elements[element.0].prev(axis) {
            if elements[prev.0].key(axis) <= key {
                break;
            }
            element = prev;
        }

        // `element` is the first one that must come after `id`
        let before = elements[element.0].prev(axis);
        self.splice(axis, elements, id, before, Some(element));
        elements[id.0].set_key(axis, key);
    }

    /// Move an element towards the tail of the chain to a larger key.
    fn move_forward<T>(
        &mut self,
        axis: Axis,
        elements: &mut [Element<T>],
        id: ElementId,
        key: usize,
    ) {
        let mut element = match elements[id.0].next(axis) {
            Some(next) if elements[next.0].key(axis) < key => next,
            _ => {
                elements[id.0].set_key(axis, key);
                return;
            }
        };

        self.remove(axis, elements, id);
        while let Some(next) = elements[element.0].next(axis) {
            if elements[next.0].key(axis) >= key {
                break;
            }
            element = next;
        }

        // `element` is the last one that must come before `id`
        let after = elements[element.0].next(axis);
        self.splice(axis, elements, id, Some(element), after);
        elements[id.0].set_key(axis, key);
    }

    fn swap_adjacent<T>(
        &mut self,
        axis: Axis,
        elements: &mut [Element<T>],
        first: ElementId,
        second: ElementId,
    ) {
        let before = elements[first.0].prev(axis);
        let after = elements[second.0].next(axis);

        match before {
            None => self.first = Some(second),
            Some(b) => elements[b.0].set_next(axis, Some(second)),
        }
        match after {
            None => self.last = Some(first),
            Some(a) => elements[a.0].set_prev(axis, Some(first)),
        }

        elements[first.0].set_next(axis, after);
        elements[first.0].set_prev(axis, Some(second));
        elements[second.0].set_prev(axis, before);
        elements[second.0].set_next(axis, Some(first));
    }

    fn swap_apart<T>(
        &mut self,
        axis: Axis,
        elements: &mut [Element<T>],
        first: ElementId,
        second: ElementId,
    ) {
        let first_prev = elements[first.0].prev(axis);
        let first_next = elements[first.0].next(axis);
        let second_prev = elements[second.0].prev(axis);
        let second_next = elements[second.0].next(axis);

        match first_prev {
            None => self.first = Some(second),
            Some(p) => elements[p.0].set_next(axis, Some(second)),
        }
        if let Some(n) = first_next {
            elements[n.0].set_prev(axis, Some(second));
        }
        match second_next {
            None => self.last = Some(first),
            Some(n) => elements[n.0].set_prev(axis, Some(first)),
        }
        if let Some(p) = second_prev {
            elements[p.0].set_next(axis, Some(first));
        }

        elements[first.0].set_prev(axis, second_prev);
        elements[first.0].set_next(axis, second_next);
        elements[second.0].set_prev(axis, first_prev);
        elements[second.0].set_next(axis, first_next);
    }

    /// Link `id` between `prev` and `next`, which must be neighbours.
    fn splice<T>(
        &mut self,
        axis: Axis,
        elements: &mut [Element<T>],
        id: ElementId,
        prev: Option<ElementId>,
        next: Option<ElementId>,
    ) {
        match prev {
            None => self.first = Some(id),
            Some(p) => elements[p.0].set_next(axis, Some(id)),
        }
        elements[id.0].set_prev(axis, prev);

        match next {
            None => self.last = Some(id),
            Some(n) => elements[n.0].set_prev(axis, Some(id)),
        }
        elements[id.0].set_next(axis, next);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Build a single row (row 1) with elements at the given columns.
    fn row_with(columns: &[usize]) -> (Chain, Vec<Element<f64>>, Vec<ElementId>) {
        let mut chain = Chain::default();
        let mut elements = Vec::new();
        let ids = columns
            .iter()
            .map(|&c| chain.create_or_get(Axis::Row, &mut elements, 1, c).0)
            .collect();
        (chain, elements, ids)
    }

    fn keys(chain: &Chain, elements: &[Element<f64>]) -> Vec<usize> {
        let mut out = Vec::new();
        let mut current = chain.first();
        while let Some(id) = current {
            out.push(elements[id.0].column);
            current = elements[id.0].right;
        }
        out
    }

    /// Walk backwards and check that the links agree with the forward walk.
    fn assert_consistent(chain: &Chain, elements: &[Element<f64>]) {
        let forward = keys(chain, elements);
        let mut backward = Vec::new();
        let mut current = chain.last();
        while let Some(id) = current {
            backward.push(elements[id.0].column);
            current = elements[id.0].left;
        }
        backward.reverse();
        assert_eq!(forward, backward);
        assert!(forward.windows(2).all(|w| w[0] < w[1]), "unsorted: {forward:?}");
    }

    #[test]
    fn test_create_or_get_sorts() {
        let (mut chain, mut elements, ids) = row_with(&[5, 2, 9, 1]);
        assert_eq!(keys(&chain, &elements), vec![1, 2, 5, 9]);
        assert_consistent(&chain, &elements);

        let (id, found) = chain.create_or_get(Axis::Row, &mut elements, 1, 5);
        assert!(found);
        assert_eq!(id, ids[0]);
        assert_eq!(elements.len(), 4);
    }

    #[test]
    fn test_find_stops_early() {
        let (chain, elements, ids) = row_with(&[2, 4, 6]);
        assert_eq!(chain.find(Axis::Row, &elements, 4), Some(ids[1]));
        assert_eq!(chain.find(Axis::Row, &elements, 3), None);
        assert_eq!(chain.find(Axis::Row, &elements, 7), None);
    }

    #[test]
    fn test_insert_and_remove() {
        let (mut chain, mut elements, ids) = row_with(&[2, 6]);
        elements.push(Element::new(1, 4));
        let id = ElementId(elements.len() - 1);
        chain.insert(Axis::Row, &mut elements, id);
        assert_eq!(keys(&chain, &elements), vec![2, 4, 6]);

        chain.remove(Axis::Row, &mut elements, ids[0]);
        assert_eq!(keys(&chain, &elements), vec![4, 6]);
        chain.remove(Axis::Row, &mut elements, ids[1]);
        assert_eq!(keys(&chain, &elements), vec![4]);
        assert_eq!(chain.first(), chain.last());
        assert_consistent(&chain, &elements);
    }

    #[test]
    fn test_clear() {
        let (mut chain, mut elements, ids) = row_with(&[1, 2, 3]);
        chain.clear(Axis::Row, &mut elements);
        assert_eq!(chain.first(), None);
        assert_eq!(chain.last(), None);
        assert!(ids.iter().all(|id| elements[id.0].left.is_none() && elements[id.0].right.is_none()));
    }

    #[test]
    fn test_swap_both_absent_is_error() {
        let (mut chain, mut elements, _) = row_with(&[1]);
        let result = chain.swap(Axis::Row, &mut elements, None, None, 1, 2);
        assert!(matches!(result, Err(SparseError::InvalidArgument { .. })));
    }

    #[test]
    fn test_swap_only_first_in_place() {
        // Element at 2 goes to 4, nothing in between
        let (mut chain, mut elements, ids) = row_with(&[1, 2, 6]);
        chain.swap(Axis::Row, &mut elements, Some(ids[1]), None, 2, 4).unwrap();
        assert_eq!(keys(&chain, &elements), vec![1, 4, 6]);
        assert_consistent(&chain, &elements);
    }

    #[test]
    fn test_swap_only_first_moves_forward() {
        let (mut chain, mut elements, ids) = row_with(&[1, 3, 5, 7]);
        chain.swap(Axis::Row, &mut elements, Some(ids[0]), None, 1, 6).unwrap();
        assert_eq!(keys(&chain, &elements), vec![3, 5, 6, 7]);
        assert_eq!(elements[ids[0].0].left, Some(ids[2]));
        assert_eq!(elements[ids[0].0].right, Some(ids[3]));
        assert_consistent(&chain, &elements);

        // To the very end
        chain.swap(Axis::Row, &mut elements, Some(ids[1]), None, 3, 9).unwrap();
        assert_eq!(keys(&chain, &elements), vec![5, 6, 7, 9]);
        assert_eq!(chain.last(), Some(ids[1]));
        assert_consistent(&chain, &elements);
    }

    #[test]
    fn test_swap_only_second_moves_back() {
        let (mut chain, mut elements, ids) = row_with(&[2, 4, 6, 8]);
        chain.swap(Axis::Row, &mut elements, None, Some(ids[3]), 1, 8).unwrap();
        assert_eq!(keys(&chain, &elements), vec![1, 2, 4, 6]);
        assert_eq!(chain.first(), Some(ids[3]));
        assert_consistent(&chain, &elements);

        chain.swap(Axis::Row, &mut elements, None, Some(ids[2]), 3, 6).unwrap();
        assert_eq!(keys(&chain, &elements), vec![1, 2, 3, 4]);
        assert_consistent(&chain, &elements);
    }

    #[test]
    fn test_swap_adjacent() {
        let (mut chain, mut elements, ids) = row_with(&[1, 2, 3, 4]);
        chain.swap(Axis::Row, &mut elements, Some(ids[1]), Some(ids[2]), 2, 3).unwrap();
        assert_eq!(keys(&chain, &elements), vec![1, 2, 3, 4]);
        assert_eq!(elements[ids[1].0].column, 3);
        assert_eq!(elements[ids[2].0].column, 2);
        assert_eq!(elements[ids[0].0].right, Some(ids[2]));
        assert_consistent(&chain, &elements);

        // Adjacent at both ends of the chain
        let (mut chain, mut elements, ids) = row_with(&[1, 2]);
        chain.swap(Axis::Row, &mut elements, Some(ids[0]), Some(ids[1]), 1, 2).unwrap();
        assert_eq!(chain.first(), Some(ids[1]));
        assert_eq!(chain.last(), Some(ids[0]));
        assert_consistent(&chain, &elements);
    }

    #[test]
    fn test_swap_apart_leaves_others_untouched() {
        let (mut chain, mut elements, ids) = row_with(&[1, 3, 5, 7, 9]);
        let middle_before = (elements[ids[2].0].left, elements[ids[2].0].right);

        chain.swap(Axis::Row, &mut elements, Some(ids[1]), Some(ids[3]), 3, 7).unwrap();
        assert_eq!(keys(&chain, &elements), vec![1, 3, 5, 7, 9]);
        assert_eq!(elements[ids[1].0].column, 7);
        assert_eq!(elements[ids[3].0].column, 3);
        assert_consistent(&chain, &elements);

        // The middle element now points at the swapped elements
        assert_eq!(middle_before, (Some(ids[1]), Some(ids[3])));
        assert_eq!(elements[ids[2].0].left, Some(ids[3]));
        assert_eq!(elements[ids[2].0].right, Some(ids[1]));
        assert_eq!(elements[ids[0].0].right, Some(ids[3]));
        assert_eq!(elements[ids[4].0].left, Some(ids[1]));
    }
}
