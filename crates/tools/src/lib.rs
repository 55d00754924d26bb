//! Sweeprun Tools
//!
//! Run plans and the command line tool for sweeprun.

pub mod overrides;
pub mod plan;

pub use overrides::Overrides;

use tracing_subscriber::{fmt, EnvFilter};

/// Initialize logging with a default filter.
///
/// Use `RUST_LOG` environment variable to override the default filter.
/// Logs go to stderr so that tables printed on stdout stay clean.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,sweeprun_runtime=info,sweeprun_tools=info"));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
