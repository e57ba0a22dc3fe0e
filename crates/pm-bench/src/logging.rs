use tracing_subscriber::{filter::LevelFilter, fmt, prelude::*, EnvFilter};

/// Installs a subscriber that logs to `stderr` and respects `RUST_LOG`.
///
/// Defaults to the "info" level when the variable is not set. Results go to
/// `stdout`, so the two streams can be separated.
pub fn init_subscriber() {
    let fmt_layer = fmt::layer().with_target(true).with_writer(std::io::stderr);

    let filter_layer = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy();

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt_layer)
        .init();
}
