//! Arena allocation for stable tree-node references.
//!
//! Both the derivation tree and the abstract syntax tree are built out of
//! nodes that reference their children through arena slices. One untyped
//! bump arena serves both allocations, so a tree needs a single arena
//! rather than one per node type, and every reference stays valid for the
//! whole compilation unit.
//!
//! Values placed here are never dropped individually; the arena releases
//! all memory at once when it goes out of scope. Callers must therefore
//! only allocate types without drop glue (tree nodes are plain data:
//! symbols, line numbers and references).
//!
//! ## Example
//!
//! ```
//! use ppjc_base::Arena;
//!
//! let arena = Arena::new();
//! let a: &u32 = arena.alloc(1);
//! let pair: &[&u32] = arena.alloc_slice(&[a, a]);
//! assert_eq!(*pair[0] + *pair[1], 2);
//! ```

use bumpalo::Bump;

/// A bump allocator handing out references that live as long as the arena.
pub struct Arena {
    bump: Bump,
}

impl Arena {
    /// Creates an empty arena.
    pub fn new() -> Self {
        Arena { bump: Bump::new() }
    }

    /// Allocates a value and returns a reference valid for the arena's
    /// lifetime.
    pub fn alloc<T>(&self, value: T) -> &T {
        self.bump.alloc(value)
    }

    /// Copies a slice into the arena.
    ///
    /// Used for child lists: a node's children are collected into a `Vec`
    /// while reducing, then frozen into an arena slice. The `Copy` bound
    /// fits that use (the elements are node references) and guarantees the
    /// slice carries no drop obligations.
    pub fn alloc_slice<T: Copy>(&self, items: &[T]) -> &[T] {
        self.bump.alloc_slice_copy(items)
    }
}

impl Default for Arena {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alloc_returns_stable_reference() {
        let arena = Arena::new();
        let r1 = arena.alloc(42);
        let r2 = arena.alloc(100);
        assert_eq!(*r1, 42);
        assert_eq!(*r2, 100);
    }

    #[test]
    fn references_remain_valid_after_many_allocations() {
        let arena = Arena::new();
        let refs: Vec<&usize> = (0..10_000).map(|i| arena.alloc(i)).collect();
        for (i, r) in refs.iter().enumerate() {
            assert_eq!(**r, i);
        }
    }

    #[test]
    fn one_arena_serves_mixed_types() {
        let arena = Arena::new();
        let n = arena.alloc(7u32);
        let flag = arena.alloc(true);
        assert_eq!(*n, 7);
        assert!(*flag);
    }

    #[test]
    fn alloc_slice_freezes_children() {
        let arena = Arena::new();
        let children = vec![1, 2, 3];
        let slice = arena.alloc_slice(&children);
        assert_eq!(slice, &[1, 2, 3]);
    }

    #[test]
    fn alloc_slice_of_references() {
        let arena = Arena::new();
        let a = arena.alloc(1);
        let b = arena.alloc(2);
        let slice = arena.alloc_slice(&[a, b]);
        assert_eq!(*slice[0] + *slice[1], 3);
    }

    #[test]
    fn alloc_empty_slice() {
        let arena = Arena::new();
        let empty: &[u8] = arena.alloc_slice(&[]);
        assert!(empty.is_empty());
    }
}
