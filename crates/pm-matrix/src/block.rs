use std::cell::Cell;
use std::marker::PhantomData;
use std::ptr::NonNull;

use crate::element::Element;
use crate::matrix::Matrix;
use crate::region::Region;

/// A thread-crossing handle to the elements of a [`Matrix`] view.
///
/// `Matrix` is single-threaded because its buffer is an `Rc` of `Cell`s. The
/// engines validate their operands up front, then lower them to blocks that
/// can be sent to pool workers. Concurrently running tasks only ever hold
/// blocks whose written regions are disjoint quadrants.
pub(crate) struct Block<'a, T> {
    base: NonNull<T>,
    region: Region,
    _buffer: PhantomData<&'a [Cell<T>]>,
}

// SAFETY: a block is only created through `Block::new`, whose contract rules
// out concurrent writes to overlapping elements. Elements are plain values
// that may move between threads.
unsafe impl<T: Send + Sync> Send for Block<'_, T> {}
unsafe impl<T: Send + Sync> Sync for Block<'_, T> {}

impl<T> Clone for Block<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Block<'_, T> {}

impl<'a, T: Element> Block<'a, T> {
    /// Lowers a matrix view to a block borrowing its buffer.
    ///
    /// # Safety
    /// For as long as this block, or any block derived from it, is in use:
    /// - nothing outside the blocks may write the elements the view covers,
    /// - blocks used from different threads at the same time must not write
    ///   overlapping regions, nor write a region another thread reads.
    pub(crate) unsafe fn new(matrix: &'a Matrix<T>) -> Self {
        let ptr = matrix.storage().as_mut_ptr();
        Block {
            // Storage of a valid matrix is never empty, but an Rc slice
            // pointer is non-null regardless.
            base: NonNull::new(ptr).unwrap_or(NonNull::dangling()),
            region: matrix.region(),
            _buffer: PhantomData,
        }
    }

    #[inline]
    pub(crate) fn size(&self) -> usize {
        self.region.size()
    }

    #[inline]
    pub(crate) fn get(&self, row: usize, col: usize) -> T {
        debug_assert!(self.region.contains(row, col));
        // SAFETY: in-range rows/cols of a region derived from the root stay
        // inside the buffer; no concurrent writer per the `new` contract.
        unsafe { self.base.as_ptr().add(self.region.index(row, col)).read() }
    }

    #[inline]
    pub(crate) fn set(&self, row: usize, col: usize, value: T) {
        debug_assert!(self.region.contains(row, col));
        // SAFETY: as for `get`; the element sits in a `Cell`, so writing
        // through a shared borrow is allowed.
        unsafe { self.base.as_ptr().add(self.region.index(row, col)).write(value) }
    }

    /// Quadrant blocks in row-major order. The size must already be known to
    /// be even.
    pub(crate) fn quadrants(&self) -> [Block<'a, T>; 4] {
        debug_assert!(self.size() % 2 == 0 && self.size() > 0);
        let base = self.base;
        self.region.split().map(|region| Block {
            base,
            region,
            _buffer: PhantomData,
        })
    }
}
