//! Sweeprun Runtime
//!
//! Runs a command template once per scenario, feeds each run's captured
//! output through an analyzer chain and hands the aggregated table to
//! output sinks.
//!
//! ```no_run
//! use sweeprun_runtime::analyzers::PatternAnalyzer;
//! use sweeprun_runtime::sinks::TableSink;
//! use sweeprun_runtime::sources::TableScenarios;
//! use sweeprun_runtime::Sweep;
//!
//! # fn main() -> sweeprun_runtime::Result<()> {
//! Sweep::new()
//!     .with_command("ls {args}")
//!     .with_source(TableScenarios::new("argslist.csv"))
//!     .with_analyzer(PatternAnalyzer::new(r"(?P<first>\S+)")?)
//!     .with_sink(TableSink::to_path("output.csv"))
//!     .run()?;
//! # Ok(())
//! # }
//! ```

pub mod analyzers;
pub mod error;
pub mod executor;
pub mod launch;
pub mod options;
pub mod sinks;
pub mod sources;
pub mod template;
pub mod types;

pub use analyzers::Analyzer;
pub use error::{Error, Result};
pub use executor::Sweep;
pub use options::{Execution, RunOptions, TextEncoding};
pub use sinks::OutputSink;
pub use sources::ScenarioSource;
pub use types::*;
