use thiserror::Error;

#[derive(Error, Debug)]
pub enum MatrixError {
    #[error("invalid matrix size {size}: side length must be positive and match the buffer")]
    InvalidSize { size: usize },
    #[error("cannot partition a {size}x{size} view into equal quadrants")]
    InvalidPartition { size: usize },
    #[error("size mismatch: expected {expected}x{expected}, got {got}x{got}")]
    SizeMismatch { expected: usize, got: usize },
    #[error("index ({row}, {col}) out of range for {size}x{size} matrix")]
    OutOfRange { row: usize, col: usize, size: usize },
    #[error("output matrix overlaps an input matrix in the same buffer")]
    AliasedOutput,
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("failed to build thread pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

pub type Result<T> = std::result::Result<T, MatrixError>;
