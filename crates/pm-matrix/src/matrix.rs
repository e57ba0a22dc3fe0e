use std::fmt;

use crate::backend::MatmulBackend;
use crate::element::Element;
use crate::error::{MatrixError, Result};
use crate::region::Region;
use crate::storage::Storage;

/// A dense square matrix view over a shared, reference-counted buffer.
///
/// A root matrix owns a fresh `size x size` buffer. [`Matrix::partition`]
/// derives four quadrant views that alias the same buffer: writing through a
/// quadrant is visible through the parent and vice versa. Element access
/// therefore goes through `&self`, like a `Cell`.
///
/// Views are single-threaded handles. The multiply engines hand work to other
/// threads internally once they have validated that their operands cannot
/// race.
pub struct Matrix<T> {
    storage: Storage<T>,
    region: Region,
}

impl<T: Element> Matrix<T> {
    /// Create a zero-filled `size x size` matrix.
    pub fn new(size: usize) -> Result<Self> {
        if size == 0 {
            return Err(MatrixError::InvalidSize { size });
        }
        Ok(Self::scratch(size))
    }

    /// Create a matrix from row-major data of length `size * size`.
    pub fn from_vec(size: usize, data: Vec<T>) -> Result<Self> {
        if size == 0 || data.len() != size * size {
            return Err(MatrixError::InvalidSize { size });
        }
        Ok(Matrix {
            storage: Storage::from_vec(data),
            region: Region::root(size),
        })
    }

    /// Create a matrix whose element `(row, col)` is `f(row, col)`.
    pub fn from_fn<F>(size: usize, f: F) -> Result<Self>
    where
        F: FnMut(usize, usize) -> T,
    {
        let m = Self::new(size)?;
        m.fill_with(f);
        Ok(m)
    }

    /// Zeroed root allocation without the size check. Callers guarantee
    /// `size > 0`.
    pub(crate) fn scratch(size: usize) -> Self {
        Matrix {
            storage: Storage::zeros(size * size),
            region: Region::root(size),
        }
    }

    /// Side length of the matrix.
    pub fn size(&self) -> usize {
        self.region.size()
    }

    /// Row stride of the underlying buffer.
    pub fn stride(&self) -> usize {
        self.region.stride()
    }

    /// Buffer index of this view's top-left element.
    pub fn offset(&self) -> usize {
        self.region.offset()
    }

    /// The view geometry.
    pub fn region(&self) -> Region {
        self.region
    }

    pub(crate) fn storage(&self) -> &Storage<T> {
        &self.storage
    }

    /// Reads element `(row, col)`.
    pub fn get(&self, row: usize, col: usize) -> Result<T> {
        let idx = self.region.checked_index(row, col)?;
        Ok(self.storage.get(idx))
    }

    /// Writes element `(row, col)`.
    pub fn set(&self, row: usize, col: usize, value: T) -> Result<()> {
        let idx = self.region.checked_index(row, col)?;
        self.storage.set(idx, value);
        Ok(())
    }

    /// Replaces element `(row, col)` with `f(old)` and returns the new value.
    pub fn update<F>(&self, row: usize, col: usize, f: F) -> Result<T>
    where
        F: FnOnce(T) -> T,
    {
        let idx = self.region.checked_index(row, col)?;
        let value = f(self.storage.get(idx));
        self.storage.set(idx, value);
        Ok(value)
    }

    /// Overwrites every element with `f(row, col)`.
    pub fn fill_with<F>(&self, mut f: F)
    where
        F: FnMut(usize, usize) -> T,
    {
        let n = self.size();
        for row in 0..n {
            for col in 0..n {
                self.storage.set(self.region.index(row, col), f(row, col));
            }
        }
    }

    /// Copies the logical grid out in row-major order.
    pub fn to_vec(&self) -> Vec<T> {
        let n = self.size();
        let mut out = Vec::with_capacity(n * n);
        for row in 0..n {
            for col in 0..n {
                out.push(self.storage.get(self.region.index(row, col)));
            }
        }
        out
    }

    /// Splits the view into its four quadrants, in row-major order
    /// (top-left, top-right, bottom-left, bottom-right).
    ///
    /// The quadrants share this matrix's buffer; nothing is copied.
    ///
    /// # Errors
    /// `InvalidPartition` if the size is odd.
    pub fn partition(&self) -> Result<[Matrix<T>; 4]> {
        let regions = self.region.quadrants()?;
        Ok(regions.map(|region| Matrix {
            storage: self.storage.clone(),
            region,
        }))
    }

    /// Element-wise comparison, stopping at the first difference.
    ///
    /// # Errors
    /// `SizeMismatch` if the matrices differ in size.
    pub fn equals(&self, other: &Matrix<T>) -> Result<bool> {
        check_same_size(self.size(), other.size())?;
        let n = self.size();
        for row in 0..n {
            for col in 0..n {
                let a = self.storage.get(self.region.index(row, col));
                let b = other.storage.get(other.region.index(row, col));
                if a != b {
                    return Ok(false);
                }
            }
        }
        Ok(true)
    }

    /// Returns true if both views are backed by the same buffer.
    pub fn shares_buffer(&self, other: &Matrix<T>) -> bool {
        self.storage.ptr_eq(&other.storage)
    }

    /// Returns true if the two views share at least one element.
    pub fn overlaps(&self, other: &Matrix<T>) -> bool {
        self.shares_buffer(other) && self.region.overlaps(&other.region)
    }

    /// Multiplies `self @ other` into a newly allocated matrix using the
    /// given backend.
    pub fn product(
        &self,
        other: &Matrix<T>,
        backend: &dyn MatmulBackend<T>,
    ) -> Result<Matrix<T>> {
        check_same_size(self.size(), other.size())?;
        let out = Matrix::new(self.size())?;
        backend.multiply(self, other, &out)?;
        Ok(out)
    }
}

/// Fails with `SizeMismatch` unless `got == expected`.
pub(crate) fn check_same_size(expected: usize, got: usize) -> Result<()> {
    if expected != got {
        return Err(MatrixError::SizeMismatch { expected, got });
    }
    Ok(())
}

impl<T: Element> fmt::Display for Matrix<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let n = self.size();
        for row in 0..n {
            for col in 0..n {
                if col > 0 {
                    write!(f, " ")?;
                }
                write!(f, "{}", self.storage.get(self.region.index(row, col)))?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

impl<T: Element> fmt::Debug for Matrix<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Matrix")
            .field("dtype", &T::DTYPE)
            .field("size", &self.size())
            .field("stride", &self.stride())
            .field("offset", &self.offset())
            .finish()
    }
}
