//! Sweep executor
//!
//! Expands scenarios into commands, runs them, pushes each run's output
//! through the analyzer chain and dispatches the aggregated table.

use std::collections::VecDeque;
use std::fmt;
use std::num::NonZeroUsize;
use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use crate::analyzers::Analyzer;
use crate::error::{Error, Result};
use crate::launch::{launch, Completed, Launched};
use crate::options::{Execution, RunOptions, TextEncoding};
use crate::sinks::OutputSink;
use crate::sources::ScenarioSource;
use crate::template::{CommandTemplate, Invocation};
use crate::types::{Record, Scenario, Table};

/// Configuration of a parameter sweep.
///
/// Every `with_*` method returns a new value and leaves `self` untouched, so
/// a partially built sweep can be branched into several variants:
///
/// ```
/// use sweeprun_runtime::analyzers::RawOutputAnalyzer;
/// use sweeprun_runtime::Sweep;
///
/// let base = Sweep::new().with_analyzer(RawOutputAnalyzer);
/// let listing = base.with_command("ls {dir}");
/// let counting = base.with_command("wc -l {file}");
/// assert!(base.command().is_empty());
/// assert_ne!(listing.command(), counting.command());
/// ```
#[derive(Clone, Default)]
pub struct Sweep {
    options: RunOptions,
    command: String,
    sources: Vec<Arc<dyn ScenarioSource>>,
    analyzers: Vec<Arc<dyn Analyzer>>,
    sinks: Vec<Arc<dyn OutputSink>>,
}

impl fmt::Debug for Sweep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sweep")
            .field("options", &self.options)
            .field("command", &self.command)
            .field("sources", &self.sources.len())
            .field("analyzers", &self.analyzers.len())
            .field("sinks", &self.sinks.len())
            .finish()
    }
}

impl Sweep {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_command(&self, command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            ..self.clone()
        }
    }

    pub fn with_source(&self, source: impl ScenarioSource + 'static) -> Self {
        let mut next = self.clone();
        next.sources.push(Arc::new(source));
        next
    }

    pub fn with_analyzer(&self, analyzer: impl Analyzer + 'static) -> Self {
        let mut next = self.clone();
        next.analyzers.push(Arc::new(analyzer));
        next
    }

    pub fn with_sink(&self, sink: impl OutputSink + 'static) -> Self {
        let mut next = self.clone();
        next.sinks.push(Arc::new(sink));
        next
    }

    pub fn with_options(&self, options: RunOptions) -> Self {
        Self {
            options,
            ..self.clone()
        }
    }

    pub fn with_execution(&self, execution: Execution) -> Self {
        self.with_options(RunOptions {
            execution,
            ..self.options
        })
    }

    /// Bound the number of children running at once in parallel mode.
    pub fn with_max_in_flight(&self, limit: NonZeroUsize) -> Self {
        self.with_options(RunOptions {
            max_in_flight: Some(limit),
            ..self.options
        })
    }

    pub fn with_encoding(&self, encoding: TextEncoding) -> Self {
        self.with_options(RunOptions {
            encoding,
            ..self.options
        })
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    pub fn options(&self) -> &RunOptions {
        &self.options
    }

    /// Concatenates every source's scenarios in configuration order.
    pub fn scenarios(&self) -> Result<Vec<Scenario>> {
        let mut scenarios = Vec::new();
        for source in &self.sources {
            scenarios.extend(source.scenarios()?);
        }
        Ok(scenarios)
    }

    /// Resolves the command for every scenario without launching anything.
    ///
    /// # Errors
    /// Configuration errors for the command and sources, source input errors,
    /// and substitution errors. All of them surface before any process starts.
    pub fn invocations(&self) -> Result<Vec<Invocation>> {
        let template = self.template()?;
        if self.sources.is_empty() {
            return Err(Error::NoScenarioSource);
        }
        self.expand(&template)
    }

    /// Runs every scenario and dispatches the table to every sink.
    ///
    /// # Errors
    /// Any failure aborts the run: configuration errors are raised before
    /// the first launch, and on launch, wait or decode errors every process
    /// still running is killed. No sink is called when a run fails.
    ///
    /// Sinks are called in configuration order once the table is complete.
    /// The first sink error is returned and later sinks are skipped; sinks
    /// that already ran keep what they wrote.
    #[instrument(skip(self), fields(command = %self.command))]
    pub fn run(&self) -> Result<Table> {
        let template = self.template()?;
        if self.sources.is_empty() {
            return Err(Error::NoScenarioSource);
        }
        if self.analyzers.is_empty() {
            return Err(Error::NoAnalyzer);
        }
        if self.sinks.is_empty() {
            return Err(Error::NoOutputSink);
        }

        let invocations = self.expand(&template)?;
        info!(
            scenarios = invocations.len(),
            execution = ?self.options.execution,
            "starting sweep"
        );

        let records: Vec<Record> = self
            .execute(invocations)?
            .into_iter()
            .map(|completed| self.analyze(completed))
            .collect();
        let table = Table::new(records);

        for sink in &self.sinks {
            sink.output(&table.fields, &table.records)?;
        }
        info!(
            records = table.records.len(),
            fields = table.fields.len(),
            "sweep finished"
        );
        Ok(table)
    }

    fn template(&self) -> Result<CommandTemplate> {
        if self.command.is_empty() {
            return Err(Error::EmptyCommand);
        }
        CommandTemplate::parse(&self.command).map_err(Error::InvalidTemplate)
    }

    fn expand(&self, template: &CommandTemplate) -> Result<Vec<Invocation>> {
        let scenarios = self.scenarios()?;
        if scenarios.is_empty() {
            return Err(Error::NoScenarios);
        }
        scenarios
            .iter()
            .enumerate()
            .map(|(id, scenario)| {
                template
                    .render(scenario)
                    .map(|argv| Invocation { id, argv })
                    .map_err(|source| Error::Template { id, source })
            })
            .collect()
    }

    fn execute(&self, invocations: Vec<Invocation>) -> Result<Vec<Completed>> {
        let mut in_flight = VecDeque::new();
        let result = self.drive(invocations, &mut in_flight);
        if result.is_err() && !in_flight.is_empty() {
            warn!(
                count = in_flight.len(),
                "terminating launched processes after fatal error"
            );
            for launched in in_flight.drain(..) {
                launched.terminate();
            }
        }
        result
    }

    /// Launches in id order while keeping at most `in_flight_limit` children
    /// alive; when the window is full the oldest child is collected first.
    fn drive(
        &self,
        invocations: Vec<Invocation>,
        in_flight: &mut VecDeque<Launched>,
    ) -> Result<Vec<Completed>> {
        let limit = self.options.in_flight_limit();
        let encoding = self.options.encoding;
        let mut completed = Vec::with_capacity(invocations.len());

        for invocation in invocations {
            if in_flight.len() >= limit {
                if let Some(oldest) = in_flight.pop_front() {
                    completed.push(oldest.collect(encoding)?);
                }
            }
            in_flight.push_back(launch(invocation)?);
        }
        while let Some(oldest) = in_flight.pop_front() {
            completed.push(oldest.collect(encoding)?);
        }
        Ok(completed)
    }

    fn analyze(&self, completed: Completed) -> Record {
        let Completed {
            invocation, output, ..
        } = completed;
        let mut record = Record::new(invocation.id, invocation.command_line());
        for analyzer in &self.analyzers {
            let fields = analyzer.analyze(&output.stdout, &output.stderr);
            for key in record.merge(fields) {
                warn!(id = invocation.id, %key, "analyzer output for reserved field ignored");
            }
        }
        debug!(id = invocation.id, fields = record.len(), "analyzed");
        record
    }
}
