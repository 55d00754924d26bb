//! Runtime errors

use std::path::PathBuf;

use thiserror::Error;

use crate::options::TextEncoding;
use crate::template::TemplateError;
use crate::types::Stream;

/// Runtime result type
pub type Result<T> = std::result::Result<T, Error>;

/// Runtime errors
///
/// Every variant is fatal for the run that raised it. Nothing is retried and
/// no sink sees a partial table.
#[derive(Debug, Error)]
pub enum Error {
    #[error("no command configured")]
    EmptyCommand,

    #[error("no scenario source configured")]
    NoScenarioSource,

    #[error("no analyzer configured")]
    NoAnalyzer,

    #[error("no output sink configured")]
    NoOutputSink,

    #[error("scenario sources produced no scenarios")]
    NoScenarios,

    #[error("combining scenarios requires at least one source")]
    EmptyCombine,

    #[error("invalid pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    #[error("invalid command template: {0}")]
    InvalidTemplate(#[source] TemplateError),

    #[error("invalid table {role} {value:?}: expected a single ASCII character")]
    InvalidTableChar { role: &'static str, value: String },

    #[error("scenario table not found: {}", path.display())]
    TableNotFound { path: PathBuf },

    #[error("failed to read scenario table {}: {source}", path.display())]
    TableRead {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("scenario {id}: {source}")]
    Template {
        id: usize,
        #[source]
        source: TemplateError,
    },

    #[error("scenario {id}: failed to launch `{program}`: {source}")]
    Spawn {
        id: usize,
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("scenario {id}: failed to collect process output: {source}")]
    Wait {
        id: usize,
        #[source]
        source: std::io::Error,
    },

    #[error("scenario {id}: {stream} is not valid {encoding}")]
    Decode {
        id: usize,
        stream: Stream,
        encoding: TextEncoding,
    },

    #[error("failed to write results to {destination}: {source}")]
    TableWrite {
        destination: String,
        #[source]
        source: csv::Error,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
