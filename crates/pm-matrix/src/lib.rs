//! `pm-matrix` - Square matrix views and recursive parallel multiplication.
//!
//! This crate provides:
//! - A `Matrix` view over a shared, reference-counted buffer, with zero-copy
//!   quadrant partitioning
//! - A sequential triple-loop reference multiply and element-wise add
//! - A recursive divide-and-conquer multiply that runs quadrant products as
//!   concurrent rayon tasks
//! - A `MatmulBackend` trait so callers can drive either strategy uniformly

mod block;
pub mod backend;
pub mod config;
pub mod cpu;
pub mod dtype;
pub mod element;
pub mod error;
pub mod matrix;
pub mod parallel;
pub mod region;
pub mod storage;

// Re-export primary types at the crate root for convenience.
pub use backend::MatmulBackend;
pub use config::{ParallelConfig, DEFAULT_THRESHOLD};
pub use cpu::SequentialBackend;
pub use dtype::DType;
pub use element::Element;
pub use error::{MatrixError, Result};
pub use matrix::Matrix;
pub use parallel::ParallelBackend;
pub use region::Region;
pub use storage::Storage;
