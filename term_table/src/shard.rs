//! Ownership-partitioned access to bucket arrays.
//!
//! Parallel redistribution writes to destination buckets whose indices are
//! scattered, not contiguous, so plain `split_at_mut` slicing cannot express
//! the partition. [`SharedBuckets`] makes the partition explicit instead:
//! workers share one view and the disjointness of their index sets is the
//! documented safety contract.

use std::cell::UnsafeCell;

use crate::bucket::Bucket;

/// Shared view of a bucket slice whose indices are partitioned among workers.
///
/// The view is created from an exclusive borrow, so for its lifetime no other
/// access to the underlying buckets exists. Each worker must confine itself
/// to an index set disjoint from every other worker's; under that contract
/// the concurrent [`get_mut`][Self::get_mut] calls never alias.
pub(crate) struct SharedBuckets<'a, T> {
    cells: &'a [UnsafeCell<Bucket<T>>],
}

// SAFETY: a `SharedBuckets` only hands out access through the unsafe
// `get_mut`, whose contract restricts every thread to a private index set, so
// sharing the view between threads cannot introduce aliasing.
unsafe impl<T: Send> Sync for SharedBuckets<'_, T> {}

impl<'a, T> SharedBuckets<'a, T> {
    pub(crate) fn new(buckets: &'a mut [Bucket<T>]) -> Self {
        let cells = buckets as *mut [Bucket<T>] as *const [UnsafeCell<Bucket<T>>];
        // SAFETY: `UnsafeCell<Bucket<T>>` has the same layout as `Bucket<T>`
        // and we consume the unique borrow of the slice, so reinterpreting it
        // as a cell slice is sound.
        Self {
            cells: unsafe { &*cells },
        }
    }

    /// Returns a mutable reference to the bucket at `index`.
    ///
    /// # Safety
    ///
    /// Threads accessing the view concurrently must do so with pairwise
    /// disjoint index sets. Within one thread, a returned reference must be
    /// dropped before `get_mut` is called again.
    pub(crate) unsafe fn get_mut(&self, index: usize) -> &mut Bucket<T> {
        // SAFETY: the caller guarantees this index is owned exclusively by
        // the current thread and that no previous reference is still live.
        unsafe { &mut *self.cells[index].get() }
    }
}

/// Splits `slice` into `parts` contiguous chunks of near-equal length, the
/// last chunk absorbing the remainder.
///
/// The chunks are disjoint by construction, which makes this the safe way to
/// hand each merge worker exclusive access to its contiguous bucket range.
///
/// # Panics
///
/// Panics when `parts` is zero.
pub fn split_chunks<T>(mut slice: &mut [T], parts: usize) -> Vec<&mut [T]> {
    assert!(parts > 0, "cannot split a slice into zero chunks");
    let base = slice.len() / parts;
    let mut chunks = Vec::with_capacity(parts);
    for _ in 0..parts - 1 {
        let (head, tail) = slice.split_at_mut(base);
        chunks.push(head);
        slice = tail;
    }
    chunks.push(slice);
    chunks
}
