pub(crate) mod kernel;

use tracing::trace;

use crate::backend::MatmulBackend;
use crate::block::Block;
use crate::element::Element;
use crate::error::{MatrixError, Result};
use crate::matrix::{check_same_size, Matrix};

/// Sequential triple-loop multiplication: `c[i][j] = sum_k a[i][k] * b[k][j]`.
///
/// Every element of `c` is reset before summation, so prior contents never
/// leak into the result. This is the correctness reference for the parallel
/// engine.
///
/// # Errors
/// - `SizeMismatch` unless all three matrices have the same size.
/// - `AliasedOutput` if `c` overlaps `a` or `b`.
pub fn multiply<T: Element>(a: &Matrix<T>, b: &Matrix<T>, c: &Matrix<T>) -> Result<()> {
    check_sizes(a, b, c)?;
    check_product_output(a, b, c)?;
    trace!(size = a.size(), dtype = %T::DTYPE, "sequential multiply");

    // SAFETY: single-threaded, and `c` shares no element with `a` or `b`.
    let (a, b, c) = unsafe { (Block::new(a), Block::new(b), Block::new(c)) };
    kernel::multiply_block(a, b, c);
    Ok(())
}

/// Element-wise addition: `c[i][j] = a[i][j] + b[i][j]`.
///
/// `c` may be exactly the same view as `a` or `b` (in-place accumulation),
/// but must not partially overlap either of them.
///
/// # Errors
/// - `SizeMismatch` unless all three matrices have the same size.
/// - `AliasedOutput` on a partial overlap.
pub fn add<T: Element>(a: &Matrix<T>, b: &Matrix<T>, c: &Matrix<T>) -> Result<()> {
    check_sizes(a, b, c)?;
    for input in [a, b] {
        if c.overlaps(input) && c.region() != input.region() {
            return Err(MatrixError::AliasedOutput);
        }
    }
    trace!(size = a.size(), dtype = %T::DTYPE, "sequential add");

    // SAFETY: single-threaded; each element of `c` is written only after the
    // matching elements of `a` and `b` have been read.
    let (a, b, c) = unsafe { (Block::new(a), Block::new(b), Block::new(c)) };
    kernel::add_block(a, b, c);
    Ok(())
}

/// Fails with `SizeMismatch` unless `a`, `b` and `c` share one size.
pub(crate) fn check_sizes<T: Element>(
    a: &Matrix<T>,
    b: &Matrix<T>,
    c: &Matrix<T>,
) -> Result<()> {
    check_same_size(a.size(), b.size())?;
    check_same_size(a.size(), c.size())
}

/// Fails with `AliasedOutput` if the product destination overlaps an input.
pub(crate) fn check_product_output<T: Element>(
    a: &Matrix<T>,
    b: &Matrix<T>,
    c: &Matrix<T>,
) -> Result<()> {
    if c.overlaps(a) || c.overlaps(b) {
        return Err(MatrixError::AliasedOutput);
    }
    Ok(())
}

/// Single-threaded reference backend.
///
/// Implements all operations with straightforward loops optimized for
/// correctness rather than peak performance.
#[derive(Debug, Clone)]
pub struct SequentialBackend;

impl SequentialBackend {
    pub fn new() -> Self {
        SequentialBackend
    }
}

impl Default for SequentialBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Element> MatmulBackend<T> for SequentialBackend {
    fn name(&self) -> &str {
        "sequential"
    }

    fn multiply(&self, a: &Matrix<T>, b: &Matrix<T>, c: &Matrix<T>) -> Result<()> {
        multiply(a, b, c)
    }

    fn add(&self, a: &Matrix<T>, b: &Matrix<T>, c: &Matrix<T>) -> Result<()> {
        add(a, b, c)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use half::f16;

    fn m(size: usize, data: Vec<i64>) -> Matrix<i64> {
        Matrix::from_vec(size, data).unwrap()
    }

    #[test]
    fn test_multiply_identity() {
        let a = m(2, vec![1, 0, 0, 1]);
        let x = m(2, vec![1, 2, 3, 4]);
        let c = Matrix::new(2).unwrap();
        multiply(&a, &x, &c).unwrap();
        assert_eq!(c.to_vec(), vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_multiply_basic() {
        // [1,2;3,4] @ [5,6;7,8] = [19,22;43,50]
        let a = m(2, vec![1, 2, 3, 4]);
        let b = m(2, vec![5, 6, 7, 8]);
        let c = Matrix::new(2).unwrap();
        multiply(&a, &b, &c).unwrap();
        assert_eq!(c.to_vec(), vec![19, 22, 43, 50]);
    }

    #[test]
    fn test_multiply_overwrites_output() {
        let a = m(2, vec![1, 2, 3, 4]);
        let b = m(2, vec![5, 6, 7, 8]);
        let c = m(2, vec![100, 100, 100, 100]);
        multiply(&a, &b, &c).unwrap();
        assert_eq!(c.to_vec(), vec![19, 22, 43, 50]);
    }

    #[test]
    fn test_multiply_quadrant_views() {
        // Multiply the top-left quadrant by the bottom-right one, writing into
        // a quadrant of a third matrix.
        let a = Matrix::from_fn(4, |r, c| (r * 4 + c) as i64).unwrap();
        let out = Matrix::<i64>::new(4).unwrap();
        let qa = a.partition().unwrap();
        let qo = out.partition().unwrap();
        multiply(&qa[0], &qa[3], &qo[1]).unwrap();
        // [0,1;4,5] @ [10,11;14,15] = [14,15;110,119]
        assert_eq!(qo[1].to_vec(), vec![14, 15, 110, 119]);
        assert_eq!(out.to_vec()[..4], [0, 0, 14, 15]);
    }

    #[test]
    fn test_multiply_same_input_twice() {
        let a = m(2, vec![1, 2, 3, 4]);
        let c = Matrix::new(2).unwrap();
        multiply(&a, &a, &c).unwrap();
        assert_eq!(c.to_vec(), vec![7, 10, 15, 22]);
    }

    #[test]
    fn test_multiply_size_mismatch() {
        let a = m(2, vec![1, 2, 3, 4]);
        let b = Matrix::<i64>::new(4).unwrap();
        let c = Matrix::<i64>::new(2).unwrap();
        assert!(matches!(
            multiply(&a, &b, &c),
            Err(MatrixError::SizeMismatch { expected: 2, got: 4 })
        ));
        assert!(multiply(&a, &c, &b).is_err());
    }

    #[test]
    fn test_multiply_rejects_aliased_output() {
        let a = m(2, vec![1, 2, 3, 4]);
        let b = m(2, vec![5, 6, 7, 8]);
        assert!(matches!(
            multiply(&a, &b, &a),
            Err(MatrixError::AliasedOutput)
        ));
        assert_eq!(a.to_vec(), vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_add() {
        let a = m(2, vec![1, 2, 3, 4]);
        let b = m(2, vec![10, 20, 30, 40]);
        let c = Matrix::new(2).unwrap();
        add(&a, &b, &c).unwrap();
        assert_eq!(c.to_vec(), vec![11, 22, 33, 44]);
    }

    #[test]
    fn test_add_commutative() {
        let a = Matrix::from_fn(4, |r, c| (r * 7 + c * 3) as i64).unwrap();
        let b = Matrix::from_fn(4, |r, c| (r as i64) - (c as i64) * 5).unwrap();
        let ab = Matrix::new(4).unwrap();
        let ba = Matrix::new(4).unwrap();
        add(&a, &b, &ab).unwrap();
        add(&b, &a, &ba).unwrap();
        assert!(ab.equals(&ba).unwrap());
    }

    #[test]
    fn test_add_in_place() {
        let a = m(2, vec![1, 2, 3, 4]);
        let b = m(2, vec![1, 1, 1, 1]);
        add(&a, &b, &a).unwrap();
        assert_eq!(a.to_vec(), vec![2, 3, 4, 5]);
    }

    #[test]
    fn test_add_into_quadrant_of_input_buffer() {
        // Output aliases the second input exactly; the first input is another
        // quadrant of the same buffer.
        let big = Matrix::from_fn(4, |r, c| (r * 4 + c) as i64).unwrap();
        let q = big.partition().unwrap();
        add(&q[0], &q[3], &q[3]).unwrap();
        assert_eq!(q[3].to_vec(), vec![10, 12, 18, 20]);
        assert_eq!(q[0].to_vec(), vec![0, 1, 4, 5]);
    }

    #[test]
    fn test_add_size_mismatch() {
        let a = m(2, vec![1, 2, 3, 4]);
        let b = Matrix::<i64>::new(4).unwrap();
        assert!(add(&a, &b, &a).is_err());
    }

    #[test]
    fn test_float_multiply() {
        let a = Matrix::from_vec(2, vec![0.5f64, 1.5, -2.0, 0.25]).unwrap();
        let b = Matrix::from_vec(2, vec![4.0f64, 0.1, 0.3, -8.0]).unwrap();
        let c = Matrix::new(2).unwrap();
        multiply(&a, &b, &c).unwrap();
        let r = c.to_vec();
        assert_relative_eq!(r[0], 2.45, epsilon = 1e-12);
        assert_relative_eq!(r[1], -11.95, epsilon = 1e-12);
        assert_relative_eq!(r[2], -7.925, epsilon = 1e-12);
        assert_relative_eq!(r[3], -2.2, epsilon = 1e-12);
    }

    #[test]
    fn test_f16_multiply() {
        let h = |v: f32| f16::from_f32(v);
        let a = Matrix::from_vec(2, vec![h(1.0), h(2.0), h(3.0), h(4.0)]).unwrap();
        let b = Matrix::from_vec(2, vec![h(5.0), h(6.0), h(7.0), h(8.0)]).unwrap();
        let c = Matrix::new(2).unwrap();
        multiply(&a, &b, &c).unwrap();
        let got: Vec<f32> = c.to_vec().into_iter().map(f16::to_f32).collect();
        assert_eq!(got, vec![19.0, 22.0, 43.0, 50.0]);
    }

    #[test]
    fn test_backend_dispatch() {
        let backend = SequentialBackend::new();
        let dyn_backend: &dyn MatmulBackend<i64> = &backend;
        assert_eq!(dyn_backend.name(), "sequential");
        let a = m(2, vec![1, 2, 3, 4]);
        let b = m(2, vec![5, 6, 7, 8]);
        let c = Matrix::new(2).unwrap();
        dyn_backend.multiply(&a, &b, &c).unwrap();
        dyn_backend.add(&c, &a, &c).unwrap();
        assert_eq!(c.to_vec(), vec![20, 24, 46, 54]);
    }
}
