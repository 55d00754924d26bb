//! Output sinks
//!
//! A sink receives the run's ordered field set and every record, and
//! renders or persists them. Sinks are called one after another with the
//! same data and never see each other's effects.

use std::fs::File;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use tracing::debug;

use crate::error::{Error, Result};
use crate::sources::TableFormat;
use crate::types::{FieldSet, Record, Table};

/// Anything that outputs the aggregated results of a run.
pub trait OutputSink: Send + Sync {
    fn output(&self, fields: &FieldSet, records: &[Record]) -> Result<()>;
}

impl<T: OutputSink + ?Sized> OutputSink for Arc<T> {
    fn output(&self, fields: &FieldSet, records: &[Record]) -> Result<()> {
        (**self).output(fields, records)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Destination {
    Path(PathBuf),
    Stdout,
}

impl Destination {
    fn describe(&self) -> String {
        match self {
            Destination::Path(path) => path.display().to_string(),
            Destination::Stdout => "stdout".to_string(),
        }
    }
}

/// Writes a header row followed by one row per record.
///
/// Values follow field-set order; a field a record lacks is written as an
/// empty cell. Files are overwritten, never appended to. Cells are quoted
/// only when they need it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSink {
    destination: Destination,
    format: TableFormat,
}

impl TableSink {
    pub fn to_path(path: impl Into<PathBuf>) -> Self {
        Self {
            destination: Destination::Path(path.into()),
            format: TableFormat::default(),
        }
    }

    /// Tab-separated rows on stdout.
    pub fn to_stdout() -> Self {
        Self {
            destination: Destination::Stdout,
            format: TableFormat {
                delimiter: b'\t',
                ..TableFormat::default()
            },
        }
    }

    pub fn with_format(mut self, format: TableFormat) -> Self {
        self.format = format;
        self
    }

    fn write_to<W: Write>(&self, out: W, fields: &FieldSet, records: &[Record]) -> Result<()> {
        let err = |source: csv::Error| Error::TableWrite {
            destination: self.destination.describe(),
            source,
        };

        let mut writer = csv::WriterBuilder::new()
            .delimiter(self.format.delimiter)
            .quote(self.format.quote)
            .quote_style(csv::QuoteStyle::Necessary)
            .terminator(csv::Terminator::Any(b'\n'))
            .from_writer(out);

        writer.write_record(fields.iter()).map_err(err)?;
        for record in records {
            writer.write_record(record.row(fields)).map_err(err)?;
        }
        writer.flush()?;
        Ok(())
    }
}

impl OutputSink for TableSink {
    fn output(&self, fields: &FieldSet, records: &[Record]) -> Result<()> {
        match &self.destination {
            Destination::Path(path) => {
                let file = File::create(path)?;
                self.write_to(file, fields, records)?;
            }
            Destination::Stdout => self.write_to(io::stdout().lock(), fields, records)?,
        }
        debug!(
            destination = %self.destination.describe(),
            rows = records.len(),
            "wrote result table"
        );
        Ok(())
    }
}

/// Keeps every dispatched table in memory.
///
/// Clones share storage, so a clone handed to a sweep can be inspected
/// after the run.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    tables: Arc<Mutex<Vec<Table>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tables received so far, oldest first.
    pub fn tables(&self) -> Vec<Table> {
        self.tables
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// The most recently received table.
    pub fn last(&self) -> Option<Table> {
        self.tables
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .last()
            .cloned()
    }
}

impl OutputSink for MemorySink {
    fn output(&self, fields: &FieldSet, records: &[Record]) -> Result<()> {
        self.tables
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(Table {
                fields: fields.clone(),
                records: records.to_vec(),
            });
        Ok(())
    }
}
