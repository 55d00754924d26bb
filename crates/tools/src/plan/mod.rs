//! Run Plans
//!
//! A run plan describes a whole sweep in one YAML document: the command
//! template, where scenarios come from, how output is analyzed and where
//! the result table goes.
//!
//! # File Format
//!
//! ```yaml
//! command: "ls {args} {dir}"
//!
//! options:
//!   execution: parallel      # or serial
//!   max_in_flight: 8         # omit for no bound
//!   encoding: utf-8          # utf-8, ascii or latin-1
//!
//! sources:
//!   - combine:
//!       mode: product        # or zip
//!       sources:
//!         - table:
//!             path: argslist.csv
//!         - list:
//!             - { dir: /tmp }
//!             - { dir: /var }
//!
//! analyzers:
//!   - raw
//!   - pattern:
//!       pattern: "(?P<first>\\S+)"
//!       stream: stdout       # or stderr
//!       anchor: start        # or anywhere
//!
//! outputs:
//!   - table:
//!       path: output.csv
//!       delimiter: ","
//!       quote: "\""
//!   - console
//! ```
//!
//! Relative paths are resolved against the working directory, not the plan.

mod types;


pub use types::*;
