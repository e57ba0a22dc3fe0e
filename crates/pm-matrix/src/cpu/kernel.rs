// Triple-loop kernels over blocks.
//
// Shared by the sequential entry points and by the leaves of the parallel
// recursion. Callers have already checked sizes and aliasing.

use crate::block::Block;
use crate::element::Element;

/// `c = a @ b`. Every element of `c` is overwritten.
pub(crate) fn multiply_block<T: Element>(a: Block<'_, T>, b: Block<'_, T>, c: Block<'_, T>) {
    let n = a.size();
    for i in 0..n {
        for j in 0..n {
            let mut sum = T::zero();
            for k in 0..n {
                sum = sum + a.get(i, k) * b.get(k, j);
            }
            c.set(i, j, sum);
        }
    }
}

/// `c = a + b`, element-wise. `c` may be the same region as `a` or `b`.
pub(crate) fn add_block<T: Element>(a: Block<'_, T>, b: Block<'_, T>, c: Block<'_, T>) {
    let n = a.size();
    for i in 0..n {
        for j in 0..n {
            c.set(i, j, a.get(i, j) + b.get(i, j));
        }
    }
}
