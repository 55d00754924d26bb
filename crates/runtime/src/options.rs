//! Run options
//!
//! Options are plain data so they can be deserialized from a run plan as
//! well as set through the [`Sweep`](crate::Sweep) builder.

use std::fmt;
use std::num::NonZeroUsize;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::types::Stream;

/// How child processes are scheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Execution {
    /// Launch without waiting, bounded only by `max_in_flight`.
    #[default]
    Parallel,
    /// Launch the next process only after the previous one exited.
    Serial,
}

/// Text encoding used to decode captured stdout and stderr.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TextEncoding {
    #[default]
    #[serde(rename = "utf-8", alias = "utf8")]
    Utf8,
    #[serde(rename = "ascii")]
    Ascii,
    #[serde(rename = "latin-1", alias = "latin1", alias = "iso-8859-1")]
    Latin1,
}

impl TextEncoding {
    /// Decode captured bytes. Returns `None` if they are not valid text.
    pub fn decode(self, bytes: Vec<u8>) -> Option<String> {
        match self {
            TextEncoding::Utf8 => String::from_utf8(bytes).ok(),
            TextEncoding::Ascii => {
                if bytes.is_ascii() {
                    String::from_utf8(bytes).ok()
                } else {
                    None
                }
            }
            TextEncoding::Latin1 => Some(bytes.into_iter().map(char::from).collect()),
        }
    }

    /// Decode one stream of scenario `id`, mapping failure to [`Error::Decode`].
    pub(crate) fn decode_stream(self, id: usize, stream: Stream, bytes: Vec<u8>) -> Result<String> {
        self.decode(bytes).ok_or(Error::Decode {
            id,
            stream,
            encoding: self,
        })
    }
}

impl fmt::Display for TextEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TextEncoding::Utf8 => write!(f, "utf-8"),
            TextEncoding::Ascii => write!(f, "ascii"),
            TextEncoding::Latin1 => write!(f, "latin-1"),
        }
    }
}

/// Options applied to every run of a [`Sweep`](crate::Sweep).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RunOptions {
    pub execution: Execution,
    /// Upper bound on concurrently running children in parallel mode.
    /// `None` launches every scenario before waiting on any of them.
    pub max_in_flight: Option<NonZeroUsize>,
    pub encoding: TextEncoding,
}

impl RunOptions {
    /// Number of children allowed to run at once.
    pub fn in_flight_limit(&self) -> usize {
        match self.execution {
            Execution::Serial => 1,
            Execution::Parallel => self.max_in_flight.map_or(usize::MAX, NonZeroUsize::get),
        }
    }
}
