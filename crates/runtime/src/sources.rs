//! Scenario sources
//!
//! A source yields an ordered list of scenarios and may be asked for it any
//! number of times. Built-in sources are a fixed list, a delimited table
//! file, and [`Combine`], which merges several sources into one.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};
use crate::types::Scenario;

/// Anything that provides scenarios to a [`Sweep`](crate::Sweep).
pub trait ScenarioSource: Send + Sync {
    fn scenarios(&self) -> Result<Vec<Scenario>>;
}

impl<T: ScenarioSource + ?Sized> ScenarioSource for Arc<T> {
    fn scenarios(&self) -> Result<Vec<Scenario>> {
        (**self).scenarios()
    }
}

/// A hardcoded list of scenarios, returned verbatim.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScenarioList {
    scenarios: Vec<Scenario>,
}

impl ScenarioList {
    pub fn new(scenarios: Vec<Scenario>) -> Self {
        Self { scenarios }
    }
}

impl FromIterator<Scenario> for ScenarioList {
    fn from_iter<I: IntoIterator<Item = Scenario>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl ScenarioSource for ScenarioList {
    fn scenarios(&self) -> Result<Vec<Scenario>> {
        Ok(self.scenarios.clone())
    }
}

/// Delimiter and quote character of a table file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableFormat {
    pub delimiter: u8,
    pub quote: u8,
}

impl Default for TableFormat {
    fn default() -> Self {
        Self {
            delimiter: b',',
            quote: b'"',
        }
    }
}

impl TableFormat {
    /// Build a format from characters, rejecting anything that is not ASCII.
    pub fn from_chars(delimiter: char, quote: char) -> Result<Self> {
        Ok(Self {
            delimiter: ascii_byte("delimiter", delimiter)?,
            quote: ascii_byte("quote", quote)?,
        })
    }
}

fn ascii_byte(role: &'static str, c: char) -> Result<u8> {
    if c.is_ascii() {
        Ok(c as u8)
    } else {
        Err(Error::InvalidTableChar {
            role,
            value: c.to_string(),
        })
    }
}

/// Scenarios read from a delimited table file.
///
/// The first row names the keys, each following row is one scenario. Short
/// rows yield scenarios with fewer keys; extra cells are dropped. The file
/// is only touched when scenarios are requested.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableScenarios {
    path: PathBuf,
    format: TableFormat,
}

impl TableScenarios {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            format: TableFormat::default(),
        }
    }

    pub fn with_format(mut self, format: TableFormat) -> Self {
        self.format = format;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_err(&self, source: csv::Error) -> Error {
        Error::TableRead {
            path: self.path.clone(),
            source,
        }
    }
}

impl ScenarioSource for TableScenarios {
    fn scenarios(&self) -> Result<Vec<Scenario>> {
        if !self.path.is_file() {
            return Err(Error::TableNotFound {
                path: self.path.clone(),
            });
        }

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .delimiter(self.format.delimiter)
            .quote(self.format.quote)
            .from_path(&self.path)
            .map_err(|e| self.read_err(e))?;

        let mut rows = reader.records();
        let keys = match rows.next() {
            Some(header) => header.map_err(|e| self.read_err(e))?,
            None => return Ok(Vec::new()),
        };

        let mut scenarios = Vec::new();
        for row in rows {
            let row = row.map_err(|e| self.read_err(e))?;
            scenarios.push(
                keys.iter()
                    .zip(row.iter())
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
            );
        }

        debug!(
            path = %self.path.display(),
            count = scenarios.len(),
            "read scenario table"
        );
        Ok(scenarios)
    }
}

/// How [`Combine`] merges its sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CombineMode {
    /// Pair the i-th scenario of every source, stopping at the shortest.
    #[default]
    Zip,
    /// Every combination across sources; the last source varies fastest.
    Product,
}

/// Merges several sources into one.
///
/// Each output scenario is a shallow merge of one scenario per source, in
/// source order, so later sources win on key collisions.
#[derive(Clone)]
pub struct Combine {
    sources: Vec<Arc<dyn ScenarioSource>>,
    mode: CombineMode,
}

impl Combine {
    pub fn new(sources: Vec<Arc<dyn ScenarioSource>>, mode: CombineMode) -> Result<Self> {
        if sources.is_empty() {
            return Err(Error::EmptyCombine);
        }
        Ok(Self { sources, mode })
    }

    pub fn zip(sources: Vec<Arc<dyn ScenarioSource>>) -> Result<Self> {
        Self::new(sources, CombineMode::Zip)
    }

    pub fn product(sources: Vec<Arc<dyn ScenarioSource>>) -> Result<Self> {
        Self::new(sources, CombineMode::Product)
    }

    pub fn mode(&self) -> CombineMode {
        self.mode
    }
}

impl std::fmt::Debug for Combine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Combine")
            .field("sources", &self.sources.len())
            .field("mode", &self.mode)
            .finish()
    }
}

impl ScenarioSource for Combine {
    fn scenarios(&self) -> Result<Vec<Scenario>> {
        let lists = self
            .sources
            .iter()
            .map(|source| source.scenarios())
            .collect::<Result<Vec<_>>>()?;

        Ok(match self.mode {
            CombineMode::Zip => zip(&lists),
            CombineMode::Product => product(&lists),
        })
    }
}

fn merged<'a>(parts: impl IntoIterator<Item = &'a Scenario>) -> Scenario {
    let mut out = Scenario::new();
    for part in parts {
        out.extend(part.iter().map(|(k, v)| (k.clone(), v.clone())));
    }
    out
}

fn zip(lists: &[Vec<Scenario>]) -> Vec<Scenario> {
    let len = lists.iter().map(Vec::len).min().unwrap_or(0);
    (0..len)
        .map(|i| merged(lists.iter().map(|list| &list[i])))
        .collect()
}

fn product(lists: &[Vec<Scenario>]) -> Vec<Scenario> {
    lists.iter().fold(vec![Scenario::new()], |prefixes, list| {
        prefixes
            .iter()
            .flat_map(|prefix| list.iter().map(move |s| merged([prefix, s])))
            .collect()
    })
}
