use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

use crate::element::Element;

/// Reference-counted element buffer shared by a root matrix and every view
/// derived from it.
///
/// Elements live in `Cell`s so a write through any handle is visible through
/// all others. Cloning the storage clones the handle, never the data. The
/// buffer is freed when the last handle is dropped.
pub struct Storage<T> {
    cells: Rc<[Cell<T>]>,
}

impl<T: Element> Storage<T> {
    /// Create zero-filled storage holding `n` elements.
    pub fn zeros(n: usize) -> Self {
        Storage {
            cells: (0..n).map(|_| Cell::new(T::zero())).collect(),
        }
    }

    /// Create storage taking ownership of `data`.
    pub fn from_vec(data: Vec<T>) -> Self {
        Storage {
            cells: data.into_iter().map(Cell::new).collect(),
        }
    }

    /// Number of elements in this storage.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Returns true if the storage contains no elements.
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Reads element `idx`.
    ///
    /// # Panics
    /// Panics if `idx >= len()`.
    #[inline]
    pub fn get(&self, idx: usize) -> T {
        self.cells[idx].get()
    }

    /// Writes element `idx`.
    ///
    /// # Panics
    /// Panics if `idx >= len()`.
    #[inline]
    pub fn set(&self, idx: usize, value: T) {
        self.cells[idx].set(value)
    }

    /// Returns true if both handles refer to the same buffer.
    pub fn ptr_eq(&self, other: &Storage<T>) -> bool {
        Rc::ptr_eq(&self.cells, &other.cells)
    }

    /// Number of live handles to this buffer.
    pub fn handle_count(&self) -> usize {
        Rc::strong_count(&self.cells)
    }

    /// Raw pointer to the first element.
    ///
    /// Writing through the pointer is permitted because every element sits
    /// in a `Cell`; it stays valid for as long as this handle is alive.
    pub(crate) fn as_mut_ptr(&self) -> *mut T {
        // Cell<T> is repr(transparent) over T.
        self.cells.as_ptr().cast::<T>().cast_mut()
    }
}

impl<T> fmt::Debug for Storage<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Storage")
            .field("len", &self.cells.len())
            .field("handles", &Rc::strong_count(&self.cells))
            .finish()
    }
}

impl<T> Clone for Storage<T> {
    fn clone(&self) -> Self {
        Storage {
            cells: Rc::clone(&self.cells),
        }
    }
}
