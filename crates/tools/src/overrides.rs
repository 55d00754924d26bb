//! Command line overrides applied on top of a plan's options.

use std::num::NonZeroUsize;

use tracing::info;

use sweeprun_runtime::{Execution, Sweep};

/// Execution settings given on the command line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Overrides {
    pub serial: bool,
    pub jobs: Option<NonZeroUsize>,
}

impl Overrides {
    /// `serial` forces serial execution. `jobs` runs in parallel with that
    /// bound, even when the plan itself asks for serial execution.
    pub fn apply(&self, sweep: &Sweep) -> Sweep {
        if self.serial {
            return sweep.with_execution(Execution::Serial);
        }
        let Some(jobs) = self.jobs else {
            return sweep.clone();
        };
        if sweep.options().execution == Execution::Serial {
            info!(jobs = jobs.get(), "--jobs overrides serial execution from the plan");
        }
        sweep
            .with_execution(Execution::Parallel)
            .with_max_in_flight(jobs)
    }
}
