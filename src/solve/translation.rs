//! External ↔ internal index maps.

/// A bijection between external indices (the caller's equation or variable
/// numbers) and internal indices (positions in the pivoted matrix).
///
/// Index 0 always maps to itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Translation {
    /// external → internal
    to_internal: Vec<usize>,
    /// internal → external
    to_external: Vec<usize>,
}

impl Default for Translation {
    fn default() -> Self {
        Self::new(0)
    }
}

impl Translation {
    /// Create the identity map over `1..=size`.
    pub fn new(size: usize) -> Self {
        Self {
            to_internal: (0..=size).collect(),
            to_external: (0..=size).collect(),
        }
    }

    /// Number of mapped indices.
    pub fn size(&self) -> usize {
        self.to_internal.len() - 1
    }

    /// Extend the map with identity entries up to `size`.
    pub fn expand(&mut self, size: usize) {
        for index in self.to_internal.len()..=size {
            self.to_internal.push(index);
            self.to_external.push(index);
        }
    }

    /// Internal index of an external one. Indices outside the map are
    /// returned unchanged.
    pub fn to_internal(&self, external: usize) -> usize {
        self.to_internal.get(external).copied().unwrap_or(external)
    }

    /// External index of an internal one. Indices outside the map are
    /// returned unchanged.
    pub fn to_external(&self, internal: usize) -> usize {
        self.to_external.get(internal).copied().unwrap_or(internal)
    }

    /// Exchange two internal indices.
    pub fn swap(&mut self, a: usize, b: usize) {
        self.to_external.swap(a, b);
        self.to_internal[self.to_external[a]] = a;
        self.to_internal[self.to_external[b]] = b;
    }

    /// Write internally ordered values into an externally indexed slice.
    pub fn unscramble<T: Copy>(&self, internal: &[T], external: &mut [T]) {
        for (index, slot) in external.iter_mut().enumerate().skip(1) {
            *slot = internal[self.to_internal(index)];
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity() {
        let t = Translation::new(3);
        assert_eq!(t.size(), 3);
        for i in 0..=3 {
            assert_eq!(t.to_internal(i), i);
            assert_eq!(t.to_external(i), i);
        }
        assert_eq!(t.to_internal(7), 7);
    }

    #[test]
    fn test_swap_keeps_inverse() {
        let mut t = Translation::new(4);
        t.swap(1, 3);
        t.swap(3, 4);
        assert_eq!(t.to_external(1), 3);
        assert_eq!(t.to_external(3), 4);
        assert_eq!(t.to_external(4), 1);
        for i in 1..=4 {
            assert_eq!(t.to_external(t.to_internal(i)), i);
            assert_eq!(t.to_internal(t.to_external(i)), i);
        }
    }

    #[test]
    fn test_expand_after_swap() {
        let mut t = Translation::new(2);
        t.swap(1, 2);
        t.expand(4);
        assert_eq!(t.size(), 4);
        assert_eq!(t.to_internal(1), 2);
        assert_eq!(t.to_internal(4), 4);
    }

    #[test]
    fn test_unscramble() {
        let mut t = Translation::new(3);
        t.swap(1, 3);
        let internal = [0.0, 10.0, 20.0, 30.0];
        let mut external = [0.0; 4];
        t.unscramble(&internal, &mut external);
        assert_eq!(external, [0.0, 30.0, 20.0, 10.0]);
    }
}
