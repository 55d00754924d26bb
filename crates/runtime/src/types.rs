//! Core data types
//!
//! Scenarios go in, records come out. Both are plain string maps that keep
//! insertion order so tables come out the same way on every run.

use std::fmt;

use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};

/// Reserved record key holding the scenario's launch index.
pub const ID_KEY: &str = "id";

/// Reserved record key holding the substituted command line.
pub const COMMAND_KEY: &str = "command";

/// One parameter set, substituted into the command template.
pub type Scenario = IndexMap<String, String>;

/// Key/value pairs derived by an analyzer.
pub type Fields = IndexMap<String, String>;

/// Builds a scenario from borrowed pairs.
pub fn scenario<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Scenario
where
    K: Into<String>,
    V: Into<String>,
{
    pairs
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}

/// Captured output stream of a child process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stream {
    #[default]
    Stdout,
    Stderr,
}

impl fmt::Display for Stream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stream::Stdout => write!(f, "stdout"),
            Stream::Stderr => write!(f, "stderr"),
        }
    }
}

/// Decoded output of one finished child process.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CapturedOutput {
    pub stdout: String,
    pub stderr: String,
}

impl CapturedOutput {
    /// Text of the selected stream.
    pub fn stream(&self, stream: Stream) -> &str {
        match stream {
            Stream::Stdout => &self.stdout,
            Stream::Stderr => &self.stderr,
        }
    }
}

/// The full result of one scenario: `id`, `command`, then analyzer fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    values: IndexMap<String, String>,
}

impl Record {
    /// Seed a record with the reserved keys.
    pub fn new(id: usize, command: impl Into<String>) -> Self {
        let mut values = IndexMap::new();
        values.insert(ID_KEY.to_string(), id.to_string());
        values.insert(COMMAND_KEY.to_string(), command.into());
        Self { values }
    }

    /// Merge analyzer output, later values replacing earlier ones.
    ///
    /// Reserved keys are never replaced; the offending keys are returned.
    pub fn merge(&mut self, fields: Fields) -> Vec<String> {
        let mut rejected = Vec::new();
        for (key, value) in fields {
            if is_reserved(&key) {
                rejected.push(key);
            } else {
                self.values.insert(key, value);
            }
        }
        rejected
    }

    pub fn id(&self) -> &str {
        self.values.get(ID_KEY).map(String::as_str).unwrap_or_default()
    }

    pub fn command(&self) -> &str {
        self.values
            .get(COMMAND_KEY)
            .map(String::as_str)
            .unwrap_or_default()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Keys in insertion order, reserved keys first.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Values in `fields` order, empty for keys this record lacks.
    pub fn row<'a>(&'a self, fields: &'a FieldSet) -> impl Iterator<Item = &'a str> + 'a {
        fields.iter().map(move |key| self.get(key).unwrap_or(""))
    }
}

fn is_reserved(key: &str) -> bool {
    key == ID_KEY || key == COMMAND_KEY
}

/// Ordered union of all record keys for one run.
///
/// Always starts with `id` then `command`. The remaining keys follow in the
/// order they are first seen, scanning records in id order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSet {
    keys: IndexSet<String>,
}

impl FieldSet {
    pub fn from_records(records: &[Record]) -> Self {
        let mut keys = IndexSet::new();
        keys.insert(ID_KEY.to_string());
        keys.insert(COMMAND_KEY.to_string());
        for record in records {
            for key in record.keys() {
                if !keys.contains(key) {
                    keys.insert(key.to_string());
                }
            }
        }
        Self { keys }
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.keys.iter().map(String::as_str)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.keys.contains(key)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn to_vec(&self) -> Vec<String> {
        self.keys.iter().cloned().collect()
    }
}

impl<'a> IntoIterator for &'a FieldSet {
    type Item = &'a String;
    type IntoIter = indexmap::set::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.keys.iter()
    }
}

impl<S: Into<String>> FromIterator<S> for FieldSet {
    /// Collects keys as given; `id` and `command` are moved to the front.
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut keys = IndexSet::new();
        keys.insert(ID_KEY.to_string());
        keys.insert(COMMAND_KEY.to_string());
        keys.extend(iter.into_iter().map(Into::into));
        Self { keys }
    }
}

/// Aggregated result of a run, as dispatched to every sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    pub fields: FieldSet,
    pub records: Vec<Record>,
}

impl Table {
    pub fn new(records: Vec<Record>) -> Self {
        Self {
            fields: FieldSet::from_records(&records),
            records,
        }
    }
}
