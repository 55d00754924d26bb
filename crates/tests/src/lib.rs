//! Integration test harness for sweeprun.
//!
//! This crate provides utilities for end-to-end testing of the full
//! pipeline: Scenarios → Substitute → Launch → Analyze → Aggregate.

use sweeprun_runtime::analyzers::Analyzer;
use sweeprun_runtime::sinks::MemorySink;
use sweeprun_runtime::sources::{ScenarioList, ScenarioSource};
use sweeprun_runtime::{scenario, Execution, Record, Result, Sweep, Table};

/// Test harness that runs sweeps against real processes and keeps the
/// dispatched tables in memory.
pub struct TestHarness {
    sweep: Sweep,
    sink: MemorySink,
}

impl TestHarness {
    /// Create a harness for `command`, already wired to an in-memory sink.
    pub fn new(command: &str) -> Self {
        let sink = MemorySink::new();
        let sweep = Sweep::new().with_command(command).with_sink(sink.clone());
        Self { sweep, sink }
    }

    /// Add a fixed list of scenarios.
    pub fn with_scenarios(self, scenarios: &[&[(&str, &str)]]) -> Self {
        let list: ScenarioList = scenarios
            .iter()
            .map(|pairs| scenario(pairs.iter().copied()))
            .collect();
        self.with_source(list)
    }

    pub fn with_source(mut self, source: impl ScenarioSource + 'static) -> Self {
        self.sweep = self.sweep.with_source(source);
        self
    }

    pub fn with_analyzer(mut self, analyzer: impl Analyzer + 'static) -> Self {
        self.sweep = self.sweep.with_analyzer(analyzer);
        self
    }

    pub fn with_execution(mut self, execution: Execution) -> Self {
        self.sweep = self.sweep.with_execution(execution);
        self
    }

    /// Replace the sweep, keeping the in-memory sink attached.
    pub fn map_sweep(mut self, f: impl FnOnce(Sweep) -> Sweep) -> Self {
        self.sweep = f(self.sweep);
        self
    }

    pub fn sweep(&self) -> &Sweep {
        &self.sweep
    }

    pub fn sink(&self) -> &MemorySink {
        &self.sink
    }

    /// Run the sweep.
    ///
    /// # Panics
    ///
    /// Panics if the run fails.
    pub fn run(&self) -> Table {
        match self.sweep.run() {
            Ok(table) => table,
            Err(e) => panic!("sweep failed: {e}"),
        }
    }

    /// Run the sweep, returning the error instead of panicking.
    pub fn try_run(&self) -> Result<Table> {
        self.sweep.run()
    }

    /// Run the sweep and return one field of every record, in id order.
    pub fn column(&self, key: &str) -> Vec<Option<String>> {
        self.run()
            .records
            .iter()
            .map(|record: &Record| record.get(key).map(str::to_string))
            .collect()
    }
}
