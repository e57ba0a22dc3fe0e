//! Recursive divide-and-conquer multiplication.
//!
//! Each level splits `A`, `B` and `C` into quadrants and allocates a private
//! scratch matrix `D` of the same size. Using the block decomposition
//! `C_ij = A_i0 B_0j + A_i1 B_1j`, the first addend of every destination
//! quadrant goes into `C` and the second into `D`:
//!
//! ```text
//! C_i = A[(i/2)*2]     @ B[i%2]
//! D_i = A[(i/2)*2 + 1] @ B[i%2 + 2]
//! ```
//!
//! The eight products run as concurrent rayon tasks, followed by a barrier,
//! then four concurrent `C_i += D_i` tasks, followed by a second barrier.
//! A product whose quadrant side is at least `threshold` recurses; smaller
//! ones run the sequential kernel on the worker that picked them up.

use rayon::{ThreadPool, ThreadPoolBuilder};
use tracing::{debug, debug_span, info, trace};

use crate::backend::MatmulBackend;
use crate::block::Block;
use crate::config::ParallelConfig;
use crate::cpu::{self, kernel};
use crate::element::Element;
use crate::error::{MatrixError, Result};
use crate::matrix::Matrix;

/// Number of partition levels the recursion performs for a `size x size`
/// problem, or `InvalidPartition` naming the first side length that cannot
/// be halved exactly.
///
/// The top level always partitions. A level of side `n` recurses into its
/// quadrants when `n / 2 >= threshold`.
pub fn recursion_depth(size: usize, threshold: usize) -> Result<usize> {
    if threshold == 0 {
        return Err(MatrixError::InvalidConfig(
            "threshold must be at least 1".to_string(),
        ));
    }
    let mut n = size;
    let mut depth = 0;
    loop {
        if n == 0 || n % 2 != 0 {
            return Err(MatrixError::InvalidPartition { size: n });
        }
        depth += 1;
        let half = n / 2;
        if half < threshold {
            return Ok(depth);
        }
        n = half;
    }
}

/// Parallel multiplication `c = a @ b` on the ambient rayon pool.
///
/// Sizes, aliasing and the whole recursion plan are checked before any task
/// starts, so on error `c` is left untouched.
///
/// # Errors
/// - `SizeMismatch` unless all three matrices have the same size.
/// - `AliasedOutput` if `c` overlaps `a` or `b`.
/// - `InvalidPartition` if some level of the recursion has an odd size.
/// - `InvalidConfig` if `threshold` is zero.
pub fn multiply<T: Element>(
    a: &Matrix<T>,
    b: &Matrix<T>,
    c: &Matrix<T>,
    threshold: usize,
) -> Result<()> {
    let depth = prepare(a, b, c, threshold)?;
    let _span = debug_span!("parallel_multiply", size = a.size(), threshold, depth).entered();

    // SAFETY: `prepare` rejected outputs overlapping the inputs, and the
    // caller stays blocked until every task has finished.
    let (a, b, c) = unsafe { (Block::new(a), Block::new(b), Block::new(c)) };
    multiply_blocks(a, b, c, threshold);
    Ok(())
}

fn prepare<T: Element>(
    a: &Matrix<T>,
    b: &Matrix<T>,
    c: &Matrix<T>,
    threshold: usize,
) -> Result<usize> {
    cpu::check_sizes(a, b, c)?;
    cpu::check_product_output(a, b, c)?;
    recursion_depth(a.size(), threshold)
}

fn multiply_blocks<T: Element>(
    a: Block<'_, T>,
    b: Block<'_, T>,
    c: Block<'_, T>,
    threshold: usize,
) {
    let n = a.size();
    // Re-entered by every spawned task; pool workers carry no span otherwise.
    let level = debug_span!("level", size = n);
    let _entered = level.enter();

    let scratch = Matrix::<T>::scratch(n);
    // SAFETY: `scratch` is private to this frame. Each of its quadrants is
    // written by exactly one product task and read by one add task after the
    // barrier.
    let d = unsafe { Block::new(&scratch) };

    let aq = a.quadrants();
    let bq = b.quadrants();
    let cq = c.quadrants();
    let dq = d.quadrants();
    debug!(quadrant = n / 2, "scheduling quadrant products");

    rayon::scope(|s| {
        for i in 0..4 {
            let row = (i / 2) * 2;
            let col = i % 2;
            let (a0, b0, c_i) = (aq[row], bq[col], cq[i]);
            let (a1, b1, d_i) = (aq[row + 1], bq[col + 2], dq[i]);
            let (first, second) = (level.clone(), level.clone());
            s.spawn(move |_| first.in_scope(|| product(a0, b0, c_i, threshold)));
            s.spawn(move |_| second.in_scope(|| product(a1, b1, d_i, threshold)));
        }
    });

    rayon::scope(|s| {
        for i in 0..4 {
            let (c_i, d_i) = (cq[i], dq[i]);
            let span = level.clone();
            s.spawn(move |_| span.in_scope(|| kernel::add_block(c_i, d_i, c_i)));
        }
    });
}

fn product<T: Element>(a: Block<'_, T>, b: Block<'_, T>, c: Block<'_, T>, threshold: usize) {
    if a.size() >= threshold {
        multiply_blocks(a, b, c, threshold);
    } else {
        trace!(size = a.size(), "sequential leaf");
        kernel::multiply_block(a, b, c);
    }
}

/// Recursive parallel backend running on its own bounded rayon pool.
#[derive(Debug)]
pub struct ParallelBackend {
    config: ParallelConfig,
    pool: ThreadPool,
}

impl ParallelBackend {
    /// Validates `config` and builds the worker pool.
    pub fn new(config: ParallelConfig) -> Result<Self> {
        config.validate()?;
        let pool = ThreadPoolBuilder::new()
            .num_threads(config.num_threads)
            .thread_name(|i| format!("pm-worker-{i}"))
            .build()?;
        info!(
            threshold = config.threshold,
            threads = pool.current_num_threads(),
            "parallel backend ready"
        );
        Ok(ParallelBackend { config, pool })
    }

    /// Backend configured from `PM_THRESHOLD` / `PM_NUM_THREADS`.
    pub fn from_env() -> Result<Self> {
        Self::new(ParallelConfig::from_env()?)
    }

    pub fn config(&self) -> &ParallelConfig {
        &self.config
    }

    /// Number of worker threads in the pool.
    pub fn num_threads(&self) -> usize {
        self.pool.current_num_threads()
    }
}

impl<T: Element> MatmulBackend<T> for ParallelBackend {
    fn name(&self) -> &str {
        "parallel"
    }

    fn multiply(&self, a: &Matrix<T>, b: &Matrix<T>, c: &Matrix<T>) -> Result<()> {
        let threshold = self.config.threshold;
        let depth = prepare(a, b, c, threshold)?;
        let span = debug_span!("parallel_multiply", size = a.size(), threshold, depth);

        // SAFETY: as in `multiply`; this thread blocks in `install` until the
        // task tree completes.
        let (a, b, c) = unsafe { (Block::new(a), Block::new(b), Block::new(c)) };
        self.pool
            .install(move || span.in_scope(|| multiply_blocks(a, b, c, threshold)));
        Ok(())
    }

    /// Sequential; see [`cpu::add`].
    fn add(&self, a: &Matrix<T>, b: &Matrix<T>, c: &Matrix<T>) -> Result<()> {
        cpu::add(a, b, c)
    }
}
