use crate::error::{MatrixError, Result};
use std::fmt;

/// The geometry of a square view into a row-major buffer.
///
/// A region never owns data. It records where its top-left element lives
/// (`offset`), how far apart consecutive rows are in the underlying buffer
/// (`stride`), and its side length (`size`). The stride is fixed by the root
/// allocation; deriving a quadrant only changes `offset` and `size`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Region {
    stride: usize,
    offset: usize,
    size: usize,
}

impl Region {
    /// The region covering an entire freshly allocated `size x size` buffer.
    pub fn root(size: usize) -> Self {
        Region {
            stride: size,
            offset: 0,
            size,
        }
    }

    /// Side length of the region.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Distance between consecutive rows in the underlying buffer.
    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Buffer index of the top-left element.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Returns true if `(row, col)` lies inside the region.
    pub fn contains(&self, row: usize, col: usize) -> bool {
        row < self.size && col < self.size
    }

    /// Buffer index of the logical element `(row, col)`.
    ///
    /// No bounds check; see [`Region::checked_index`].
    #[inline]
    pub fn index(&self, row: usize, col: usize) -> usize {
        self.offset + row * self.stride + col
    }

    /// Buffer index of `(row, col)`, or `OutOfRange` if it falls outside.
    pub fn checked_index(&self, row: usize, col: usize) -> Result<usize> {
        if !self.contains(row, col) {
            return Err(MatrixError::OutOfRange {
                row,
                col,
                size: self.size,
            });
        }
        Ok(self.index(row, col))
    }

    /// Row and column of the top-left element within the root buffer.
    pub fn origin(&self) -> (usize, usize) {
        if self.stride == 0 {
            return (0, 0);
        }
        (self.offset / self.stride, self.offset % self.stride)
    }

    /// The four quadrants in row-major order: top-left, top-right,
    /// bottom-left, bottom-right.
    ///
    /// Quadrant `i` starts at row `(i / 2) * size/2` and column
    /// `(i % 2) * size/2` of this region.
    pub fn quadrants(&self) -> Result<[Region; 4]> {
        if self.size == 0 || self.size % 2 != 0 {
            return Err(MatrixError::InvalidPartition { size: self.size });
        }
        Ok(self.split())
    }

    /// Quadrants without the evenness check.
    pub(crate) fn split(&self) -> [Region; 4] {
        let half = self.size / 2;
        std::array::from_fn(|i| Region {
            stride: self.stride,
            offset: self.index((i / 2) * half, (i % 2) * half),
            size: half,
        })
    }

    /// Returns true if the two regions share at least one element, assuming
    /// both describe the same buffer.
    pub fn overlaps(&self, other: &Region) -> bool {
        if self.size == 0 || other.size == 0 {
            return false;
        }
        let (r0, c0) = self.origin();
        let (r1, c1) = other.origin();
        let rows = r0 < r1 + other.size && r1 < r0 + self.size;
        let cols = c0 < c1 + other.size && c1 < c0 + self.size;
        rows && cols
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (row, col) = self.origin();
        write!(f, "{0}x{0} at ({1}, {2})", self.size, row, col)
    }
}
