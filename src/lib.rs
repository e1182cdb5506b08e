//! # fastaselect-rs
//!
//! Select records from a header-delimited stream (FASTA and similar) by key,
//! and emit them in the order given by a selection list rather than the order
//! they appear in the stream.
//!
//! ## Overview
//!
//! A run makes one pass over each input:
//! - **Selection list**: one key per line, optionally followed by a group
//!   tag. Parsed, sorted and deduplicated into a [`SelectorIndex`].
//! - **Record stream**: each record is a header line starting with `>` plus
//!   its body lines. The header key is looked up in the index.
//! - **Reorder buffer**: matched records wait until every earlier position
//!   has been written, then go out at once. Only the open gap is held in
//!   memory, and scanning stops as soon as the last position is written.
//! - **Group routing**: in fragment mode each group tag gets its own output.
//!
//! ## Example
//!
//! ```
//! use fastaselect_rs::{SelectConfig, run_select};
//! use std::io::Cursor;
//!
//! let selection = "B\nA\nC\n";
//! let stream = ">A\nAAAA\n>B\nCCCC\n>C\nGGGG\n>D\nTTTT\n";
//!
//! let mut out = Vec::new();
//! let report = run_select(
//!     &SelectConfig::default(),
//!     Cursor::new(selection),
//!     Cursor::new(stream),
//!     &mut out,
//! )
//! .unwrap();
//!
//! assert_eq!(out, b">B\nCCCC\n>A\nAAAA\n>C\nGGGG\n");
//! assert_eq!(report.records_emitted, 3);
//! ```

pub mod completeness;
pub mod config;
pub mod error;
pub mod escape;
pub mod line;
pub mod record;
pub mod reorder;
pub mod router;
pub mod scanner;
pub mod select;
pub mod selector;
pub mod sink;

pub use config::{
    DelimiterSet, DuplicatePolicy, FragmentMode, OutputTemplate, Polarity, SelectConfig,
};
pub use error::{InputKind, SelectError, Warning};
pub use escape::decode_escapes;
pub use record::{RecordReader, StreamRecord};
pub use reorder::ReorderBuffer;
pub use router::GroupRouter;
pub use scanner::{ScanStats, scan_reject, scan_select};
pub use select::{SelectReport, run_fragmented, run_select, run_select_to};
pub use selector::{Selector, SelectorIndex};
pub use sink::{FileOpener, FlushTarget, MemoryOpener, SingleSink, SinkOpener};
