//! Analyzers
//!
//! An analyzer turns one scenario's captured stdout and stderr into fields.
//! Analyzers should stay narrow: to gather several unrelated values, chain
//! several analyzers rather than writing one that does everything.
//!
//! Finding nothing is not an error. An analyzer that has nothing to report
//! returns an empty map and the record simply lacks those keys.

use std::sync::Arc;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::types::{Fields, Stream};

/// Derives fields from a finished scenario's output.
pub trait Analyzer: Send + Sync {
    fn analyze(&self, stdout: &str, stderr: &str) -> Fields;
}

impl<T: Analyzer + ?Sized> Analyzer for Arc<T> {
    fn analyze(&self, stdout: &str, stderr: &str) -> Fields {
        (**self).analyze(stdout, stderr)
    }
}

/// Passes raw output through as `output`, plus `error` when stderr is
/// non-empty.
#[derive(Debug, Clone, Copy, Default)]
pub struct RawOutputAnalyzer;

impl RawOutputAnalyzer {
    pub const OUTPUT_KEY: &'static str = "output";
    pub const ERROR_KEY: &'static str = "error";
}

impl Analyzer for RawOutputAnalyzer {
    fn analyze(&self, stdout: &str, stderr: &str) -> Fields {
        let mut fields = Fields::new();
        fields.insert(Self::OUTPUT_KEY.to_string(), stdout.to_string());
        if !stderr.is_empty() {
            fields.insert(Self::ERROR_KEY.to_string(), stderr.to_string());
        }
        fields
    }
}

/// Where a [`PatternAnalyzer`] match may begin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Anchor {
    /// The match must begin at the first byte of the stream.
    #[default]
    Start,
    /// The leftmost match anywhere in the stream.
    Anywhere,
}

/// Extracts the named capture groups of a regular expression.
///
/// `status (?P<code>\d+)` run against `status 42 ok` yields `code = 42`.
/// Groups that did not take part in the match are left out.
#[derive(Debug, Clone)]
pub struct PatternAnalyzer {
    regex: Regex,
    anchor: Anchor,
    stream: Stream,
}

impl PatternAnalyzer {
    /// Compile `pattern`, anchored at the start of stdout.
    pub fn new(pattern: &str) -> Result<Self> {
        Self::with_anchor(pattern, Anchor::Start)
    }

    pub fn with_anchor(pattern: &str, anchor: Anchor) -> Result<Self> {
        let regex = Regex::new(pattern)?;
        Ok(Self {
            regex,
            anchor,
            stream: Stream::Stdout,
        })
    }

    /// Match against `stream` instead of stdout.
    pub fn in_stream(mut self, stream: Stream) -> Self {
        self.stream = stream;
        self
    }

    pub fn anchor(&self) -> Anchor {
        self.anchor
    }

    pub fn stream(&self) -> Stream {
        self.stream
    }
}

impl Analyzer for PatternAnalyzer {
    fn analyze(&self, stdout: &str, stderr: &str) -> Fields {
        let text = match self.stream {
            Stream::Stdout => stdout,
            Stream::Stderr => stderr,
        };
        let Some(captures) = self.regex.captures(text) else {
            return Fields::new();
        };
        // Leftmost-first search: if any match starts at 0, the one found does.
        if self.anchor == Anchor::Start && captures.get(0).map_or(true, |m| m.start() != 0) {
            return Fields::new();
        }
        self.regex
            .capture_names()
            .flatten()
            .filter_map(|name| {
                captures
                    .name(name)
                    .map(|m| (name.to_string(), m.as_str().to_string()))
            })
            .collect()
    }
}
