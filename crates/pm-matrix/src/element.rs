use std::fmt::{Debug, Display};
use std::ops::{Add, Mul};

use half::f16;

use crate::dtype::DType;

/// A numeric type that can be stored in a [`Matrix`](crate::Matrix) and
/// multiplied by the engines in this crate.
///
/// Only `+`, `*`, equality and a zero value are needed by the algorithms.
/// The conversions exist for filling and checking matrices in tests and
/// harnesses.
pub trait Element:
    Copy
    + PartialEq
    + Add<Output = Self>
    + Mul<Output = Self>
    + Display
    + Debug
    + Send
    + Sync
    + 'static
{
    /// The runtime tag for this element type.
    const DTYPE: DType;

    /// The additive identity.
    fn zero() -> Self;

    /// Lossy conversion from an index-derived value.
    fn from_usize(v: usize) -> Self;

    /// Lossy conversion to `f64`, used for tolerance comparisons.
    fn to_f64(self) -> f64;
}

macro_rules! impl_element {
    ($t:ty, $dtype:expr, $zero:expr) => {
        impl Element for $t {
            const DTYPE: DType = $dtype;

            #[inline]
            fn zero() -> Self {
                $zero
            }

            #[inline]
            fn from_usize(v: usize) -> Self {
                v as $t
            }

            #[inline]
            fn to_f64(self) -> f64 {
                self as f64
            }
        }
    };
}

impl_element!(i32, DType::I32, 0);
impl_element!(i64, DType::I64, 0);
impl_element!(u32, DType::U32, 0);
impl_element!(u64, DType::U64, 0);
impl_element!(f32, DType::F32, 0.0);
impl_element!(f64, DType::F64, 0.0);

impl Element for f16 {
    const DTYPE: DType = DType::F16;

    #[inline]
    fn zero() -> Self {
        f16::ZERO
    }

    #[inline]
    fn from_usize(v: usize) -> Self {
        f16::from_f64(v as f64)
    }

    #[inline]
    fn to_f64(self) -> f64 {
        f16::to_f64(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dtype_tags() {
        assert_eq!(<i32 as Element>::DTYPE, DType::I32);
        assert_eq!(<u64 as Element>::DTYPE, DType::U64);
        assert_eq!(<f16 as Element>::DTYPE, DType::F16);
        assert_eq!(<f64 as Element>::DTYPE, DType::F64);
    }

    #[test]
    fn test_zero() {
        assert_eq!(<i64 as Element>::zero(), 0);
        assert_eq!(<f32 as Element>::zero(), 0.0);
        assert_eq!(<f16 as Element>::zero(), f16::from_f32(0.0));
    }

    #[test]
    fn test_conversions() {
        assert_eq!(<u32 as Element>::from_usize(7), 7);
        assert_eq!(<f16 as Element>::from_usize(12).to_f64(), 12.0);
        assert_eq!(Element::to_f64(-3i32), -3.0);
    }
}
