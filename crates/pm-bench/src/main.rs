//! Timing and validation harness.
//!
//! Sweeps square sizes by doubling, fills `A[i][j] = B[i][j] = i * j`, times
//! the sequential and parallel multiplies and checks that they agree.

mod logging;

use std::time::Instant;

use anyhow::{ensure, Context, Result};
use clap::Parser;
use half::f16;
use tracing::{info, warn};

use pm_matrix::parallel::recursion_depth;
use pm_matrix::{
    DType, Element, MatmulBackend, Matrix, ParallelBackend, ParallelConfig, SequentialBackend,
    DEFAULT_THRESHOLD,
};

/// Largest size whose operands and result are printed with `--show`.
const SHOW_LIMIT: usize = 8;

#[derive(Parser, Debug)]
#[command(
    name = "pm-bench",
    about = "Compare sequential and recursive parallel matrix multiplication"
)]
struct Args {
    /// First matrix size of the sweep
    #[arg(long, default_value_t = 32)]
    min_size: usize,

    /// Last matrix size of the sweep; sizes double from --min-size
    #[arg(long, default_value_t = 2048)]
    max_size: usize,

    /// Quadrant size at or above which the parallel multiply recurses
    #[arg(long, default_value_t = DEFAULT_THRESHOLD)]
    threshold: usize,

    /// Worker threads for the parallel pool, 0 for one per logical CPU
    #[arg(long, default_value_t = 0)]
    threads: usize,

    /// Element type of the matrices: i32, i64, u32, u64, f16, f32 or f64
    #[arg(long, default_value = "i64", value_parser = parse_dtype)]
    element: DType,

    /// Print operands and results for sizes up to 8
    #[arg(long)]
    show: bool,
}

fn parse_dtype(name: &str) -> Result<DType, String> {
    DType::from_name(&name.to_ascii_lowercase())
        .ok_or_else(|| format!("unknown element type {name:?}"))
}

fn main() -> Result<()> {
    logging::init_subscriber();
    let args = Args::parse();

    ensure!(args.min_size > 0, "--min-size must be positive");
    ensure!(
        args.min_size <= args.max_size,
        "--min-size {} exceeds --max-size {}",
        args.min_size,
        args.max_size
    );

    match args.element {
        DType::I32 => run::<i32>(&args),
        DType::I64 => run::<i64>(&args),
        DType::U32 => run::<u32>(&args),
        DType::U64 => run::<u64>(&args),
        DType::F16 => run::<f16>(&args),
        DType::F32 => run::<f32>(&args),
        DType::F64 => run::<f64>(&args),
    }
}

fn run<T: Element>(args: &Args) -> Result<()> {
    let config = ParallelConfig::default()
        .with_threshold(args.threshold)
        .with_num_threads(args.threads);
    let sequential = SequentialBackend::new();
    let parallel = ParallelBackend::new(config)?;
    info!(
        dtype = %T::DTYPE,
        threshold = args.threshold,
        threads = parallel.num_threads(),
        "starting sweep"
    );

    let mut mismatches = 0;
    let mut size = args.min_size;
    while size <= args.max_size {
        let depth = recursion_depth(size, args.threshold).with_context(|| {
            format!("size {size} cannot be split with threshold {}", args.threshold)
        })?;

        let a = Matrix::from_fn(size, |i, j| T::from_usize(i * j))?;
        let b = Matrix::from_fn(size, |i, j| T::from_usize(i * j))?;
        let single_out = Matrix::new(size)?;
        let multi_out = Matrix::new(size)?;

        let single = timed(&sequential, &a, &b, &single_out)?;
        println!("{size} Single-threaded: {single:.6}s");
        let multi = timed(&parallel, &a, &b, &multi_out)?;
        println!("{size} Multi-threaded: {multi:.6}s");
        println!("Speedup: {:.3}x", single / multi);
        info!(size, depth, single, multi, "size complete");

        if !results_agree(&single_out, &multi_out)? {
            println!("Matrix multiplication incorrect");
            warn!(size, "parallel result differs from sequential");
            mismatches += 1;
        }

        if args.show && size <= SHOW_LIMIT {
            println!("A =\n{a}");
            println!("B =\n{b}");
            println!("A @ B =\n{multi_out}");
        }

        size = match size.checked_mul(2) {
            Some(next) => next,
            None => break,
        };
    }

    ensure!(mismatches == 0, "{mismatches} size(s) produced mismatched results");
    Ok(())
}

/// Wall-clock seconds taken by one `backend.multiply` call.
fn timed<T: Element>(
    backend: &dyn MatmulBackend<T>,
    a: &Matrix<T>,
    b: &Matrix<T>,
    c: &Matrix<T>,
) -> Result<f64> {
    let start = Instant::now();
    backend
        .multiply(a, b, c)
        .with_context(|| format!("{} multiply failed", backend.name()))?;
    Ok(start.elapsed().as_secs_f64())
}

/// Exact comparison for integers. Floating point sums are evaluated in a
/// different order by the two algorithms, so those are compared with a
/// relative tolerance.
fn results_agree<T: Element>(x: &Matrix<T>, y: &Matrix<T>) -> Result<bool> {
    if !T::DTYPE.is_float() {
        return Ok(x.equals(y)?);
    }
    let tolerance = match T::DTYPE.size_in_bytes() {
        2 => 1e-2,
        4 => 1e-4,
        _ => 1e-9,
    };
    let agree = x.to_vec().into_iter().zip(y.to_vec()).all(|(p, q)| {
        let (p, q) = (p.to_f64(), q.to_f64());
        (p - q).abs() <= tolerance * p.abs().max(q.abs()).max(1.0)
    });
    Ok(agree)
}
