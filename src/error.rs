//! Error and warning types for record selection.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Which input a line came from, for error messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    /// The list of selector keys.
    Selection,
    /// The header-delimited record stream.
    Records,
}

impl fmt::Display for InputKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InputKind::Selection => f.write_str("selection list"),
            InputKind::Records => f.write_str("record stream"),
        }
    }
}

/// Fatal conditions. Any of these ends the run.
#[derive(Debug, Error)]
pub enum SelectError {
    /// A line is longer than the configured maximum.
    #[error("{input} line {line} exceeds {max} bytes")]
    LineTooLong {
        input: InputKind,
        line: u64,
        max: usize,
    },

    /// The same key appears more than once in the selection list.
    #[error(
        "duplicate selector \"{}\" in selection list, alternate delimiters may be needed",
        show(.key)
    )]
    DuplicateSelector { key: Vec<u8> },

    /// A stream record matched a selector that was already matched.
    #[error("duplicate record for selector \"{}\" at header: {}", show(.key), show(.header))]
    DuplicateMatch { key: Vec<u8>, header: Vec<u8> },

    /// The stream ended with selectors left unmatched.
    #[error("{} selector(s) not found: {}", .keys.len(), preview_keys(.keys))]
    MissingSelectors { keys: Vec<Vec<u8>> },

    /// A create-exclusive sink already exists, so its group was not contiguous.
    #[error(
        "output file {} already exists or group \"{}\" is not contiguous",
        .path.display(),
        show(.group)
    )]
    GroupContiguity { group: Vec<u8>, path: PathBuf },

    /// An input file could not be opened.
    #[error("could not open {input} {}: {source}", .path.display())]
    Input {
        input: InputKind,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A sink could not be opened.
    #[error("could not open output {}: {source}", .path.display())]
    Sink {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Fragment mode is on but a selector has no group field.
    #[error("fragment mode requires a group for every selector, \"{}\" has none", show(.key))]
    MissingGroup { key: Vec<u8> },

    /// Nothing usable was read from the selection list.
    #[error("nothing was read from the selection list")]
    EmptySelection,

    /// A delimiter string has bad escape syntax.
    #[error("bad escape sequence in \"{text}\": {reason}")]
    InvalidEscape { text: String, reason: &'static str },

    /// The configuration is inconsistent.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Read or write failure on an already-open stream.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Non-fatal conditions, reported and then ignored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Warning {
    /// The last line of an input had no line terminator.
    MissingFinalNewline { input: InputKind },
    /// A duplicate selector was dropped, the first occurrence kept.
    DuplicateSelector { key: Vec<u8> },
    /// A selector never matched a record.
    MissingSelector { key: Vec<u8> },
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Warning::MissingFinalNewline { input } => {
                write!(f, "last line of {input} lacks a line terminator")
            }
            Warning::DuplicateSelector { key } => write!(
                f,
                "duplicate selector \"{}\" in selection list, keeping the first",
                show(key)
            ),
            Warning::MissingSelector { key } => {
                write!(f, "did not find selector: {}", show(key))
            }
        }
    }
}

/// Render an opaque key for humans.
pub(crate) fn show(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

/// Keys named in full in a [`SelectError::MissingSelectors`] message.
const PREVIEW_KEYS: usize = 5;

/// First few keys, then a count of the rest.
fn preview_keys(keys: &[Vec<u8>]) -> String {
    let shown = keys
        .iter()
        .take(PREVIEW_KEYS)
        .map(|k| show(k))
        .collect::<Vec<_>>()
        .join(", ");
    match keys.len().saturating_sub(PREVIEW_KEYS) {
        0 => shown,
        rest => format!("{shown} and {rest} more"),
    }
}
