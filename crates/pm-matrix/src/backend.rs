use std::fmt::Debug;

use crate::element::Element;
use crate::error::Result;
use crate::matrix::Matrix;

/// Trait for interchangeable multiplication strategies.
///
/// Every operand is a square [`Matrix`] view of the same size. Results are
/// written into the caller-provided `c`, which must not overlap `a` or `b`
/// for `multiply`. All preconditions are checked before `c` is touched.
pub trait MatmulBackend<T: Element>: Send + Sync + Debug {
    /// Returns the name of this backend (e.g., "sequential", "parallel").
    fn name(&self) -> &str;

    /// Matrix multiplication: C = A @ B.
    fn multiply(&self, a: &Matrix<T>, b: &Matrix<T>, c: &Matrix<T>) -> Result<()>;

    /// Element-wise addition: C = A + B.
    fn add(&self, a: &Matrix<T>, b: &Matrix<T>, c: &Matrix<T>) -> Result<()>;
}
