//! Run plan type definitions and loading.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use sweeprun_runtime::analyzers::{Anchor, Analyzer, PatternAnalyzer, RawOutputAnalyzer};
use sweeprun_runtime::sinks::{OutputSink, TableSink};
use sweeprun_runtime::sources::{
    Combine, CombineMode, ScenarioList, ScenarioSource, TableFormat, TableScenarios,
};
use sweeprun_runtime::{RunOptions, Scenario, Stream, Sweep};

/// Errors that can occur when loading a run plan or building its sweep.
#[derive(Debug, Error)]
pub enum PlanError {
    /// Failed to read the plan file.
    #[error("failed to read run plan: {0}")]
    IoError(#[from] std::io::Error),

    /// Failed to parse the plan YAML.
    #[error("failed to parse run plan YAML: {0}")]
    YamlError(#[from] serde_yaml::Error),

    /// The plan parsed but describes an invalid sweep.
    #[error(transparent)]
    Runtime(#[from] sweeprun_runtime::Error),
}

/// Result type for run plan operations.
pub type PlanResult<T> = Result<T, PlanError>;

/// A complete sweep description.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Plan {
    /// Command template with `{name}` placeholders.
    #[serde(default)]
    pub command: String,

    #[serde(default)]
    pub options: RunOptions,

    /// Sources whose scenarios are concatenated, in order.
    #[serde(default, with = "serde_yaml::with::singleton_map_recursive")]
    pub sources: Vec<SourceSpec>,

    /// Analyzer chain, applied in order.
    #[serde(default, with = "serde_yaml::with::singleton_map_recursive")]
    pub analyzers: Vec<AnalyzerSpec>,

    #[serde(default, with = "serde_yaml::with::singleton_map_recursive")]
    pub outputs: Vec<OutputSpec>,
}

fn default_delimiter() -> char {
    ','
}

fn default_quote() -> char {
    '"'
}

/// Location and format of a delimited table file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TableSpec {
    pub path: PathBuf,
    #[serde(default = "default_delimiter")]
    pub delimiter: char,
    #[serde(default = "default_quote")]
    pub quote: char,
}

impl TableSpec {
    fn format(&self) -> PlanResult<TableFormat> {
        Ok(TableFormat::from_chars(self.delimiter, self.quote)?)
    }
}

/// Where scenarios come from.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceSpec {
    /// Scenarios written inline.
    ///
    /// Values are read as strings, so `version: 1.10` substitutes `1.10`
    /// exactly as written rather than a reformatted number.
    List(Vec<IndexMap<String, String>>),
    /// Scenarios read from a table file.
    Table(TableSpec),
    /// Several sources merged by zip or product.
    Combine {
        #[serde(default)]
        mode: CombineMode,
        sources: Vec<SourceSpec>,
    },
}

impl SourceSpec {
    pub fn build(&self) -> PlanResult<Arc<dyn ScenarioSource>> {
        Ok(match self {
            SourceSpec::List(entries) => Arc::new(
                entries
                    .iter()
                    .map(|entry| entry.iter().map(|(k, v)| (k.clone(), v.clone())).collect::<Scenario>())
                    .collect::<ScenarioList>(),
            ),
            SourceSpec::Table(table) => {
                Arc::new(TableScenarios::new(&table.path).with_format(table.format()?))
            }
            SourceSpec::Combine { mode, sources } => {
                let sources = sources
                    .iter()
                    .map(SourceSpec::build)
                    .collect::<PlanResult<Vec<_>>>()?;
                Arc::new(Combine::new(sources, *mode)?)
            }
        })
    }
}

/// An analyzer in the chain.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalyzerSpec {
    /// Raw stdout as `output`, stderr as `error` when non-empty.
    Raw,
    /// Named capture groups of a regular expression.
    Pattern {
        pattern: String,
        #[serde(default)]
        stream: Stream,
        #[serde(default)]
        anchor: Anchor,
    },
}

impl AnalyzerSpec {
    pub fn build(&self) -> PlanResult<Arc<dyn Analyzer>> {
        Ok(match self {
            AnalyzerSpec::Raw => Arc::new(RawOutputAnalyzer),
            AnalyzerSpec::Pattern {
                pattern,
                stream,
                anchor,
            } => Arc::new(PatternAnalyzer::with_anchor(pattern, *anchor)?.in_stream(*stream)),
        })
    }
}

/// Where the result table goes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputSpec {
    /// A table file, overwritten on every run.
    Table(TableSpec),
    /// Tab-separated rows on stdout.
    Console,
}

impl OutputSpec {
    pub fn build(&self) -> PlanResult<Arc<dyn OutputSink>> {
        Ok(match self {
            OutputSpec::Table(table) => {
                Arc::new(TableSink::to_path(&table.path).with_format(table.format()?))
            }
            OutputSpec::Console => Arc::new(TableSink::to_stdout()),
        })
    }
}

impl Plan {
    /// Load a plan from a YAML file.
    pub fn load(path: impl AsRef<Path>) -> PlanResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse a plan from a YAML string.
    pub fn from_yaml(yaml: &str) -> PlanResult<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Build the sweep this plan describes.
    ///
    /// Patterns are compiled and table formats checked here; missing
    /// stages (no sources, no analyzers, ...) are reported by the sweep
    /// itself when it runs.
    pub fn to_sweep(&self) -> PlanResult<Sweep> {
        let mut sweep = Sweep::new()
            .with_command(self.command.as_str())
            .with_options(self.options);
        for source in &self.sources {
            sweep = sweep.with_source(source.build()?);
        }
        for analyzer in &self.analyzers {
            sweep = sweep.with_analyzer(analyzer.build()?);
        }
        for output in &self.outputs {
            sweep = sweep.with_sink(output.build()?);
        }
        Ok(sweep)
    }
}
