//! Run configuration.
//!
//! A [`SelectConfig`] is built once by the caller, validated, and then
//! borrowed by every component. Nothing in the crate keeps global state.

use std::fmt;
use std::path::PathBuf;

use crate::error::SelectError;

/// Default cap on a single input line, in bytes.
pub const DEFAULT_MAX_LINE_LENGTH: usize = 10_000_000;

/// Default bytes that end a field in the selection list.
pub const DEFAULT_SELECTOR_DELIMITERS: &[u8] = b"|\t :";

/// Default bytes that end a key in a record header line.
pub const DEFAULT_HEADER_KEY_DELIMITERS: &[u8] = b"\x01\t ";

/// Default first byte of a record header line.
pub const DEFAULT_RECORD_MARKER: u8 = b'>';

/// Placeholder in a fragment output template that receives the group tag.
pub const GROUP_PLACEHOLDER: &str = "%s";

/// A set of single-byte delimiters.
///
/// NUL, CR and LF always terminate a field whether or not they are listed.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct DelimiterSet {
    bits: [u64; 4],
}

impl DelimiterSet {
    /// Build a set from the given bytes plus the implicit terminators.
    pub fn new(bytes: &[u8]) -> Self {
        let mut set = Self { bits: [0; 4] };
        for &b in bytes.iter().chain(b"\0\r\n") {
            set.bits[(b >> 6) as usize] |= 1u64 << (b & 63);
        }
        set
    }

    /// Is `b` a delimiter?
    #[inline]
    pub fn contains(&self, b: u8) -> bool {
        self.bits[(b >> 6) as usize] & (1u64 << (b & 63)) != 0
    }

    /// Length of the leading run of non-delimiter bytes.
    pub fn span_until(&self, bytes: &[u8]) -> usize {
        bytes
            .iter()
            .position(|&b| self.contains(b))
            .unwrap_or(bytes.len())
    }

    /// Length of the leading run of delimiter bytes.
    pub fn span_while(&self, bytes: &[u8]) -> usize {
        bytes
            .iter()
            .position(|&b| !self.contains(b))
            .unwrap_or(bytes.len())
    }
}

impl fmt::Debug for DelimiterSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let members: Vec<u8> = (0..=255u8).filter(|&b| self.contains(b)).collect();
        write!(f, "DelimiterSet({:?})", members.escape_ascii().to_string())
    }
}

/// Whether matched records are kept or dropped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Polarity {
    /// Emit matched records, in selection-list order.
    #[default]
    Select,
    /// Emit records that do not match, in stream order.
    Reject,
}

/// How flushed output is split across group sinks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FragmentMode {
    /// Everything goes to one sink.
    #[default]
    None,
    /// One new file per group; an existing file is fatal.
    CreateExclusive,
    /// One file per group, appended to and created if absent.
    Append,
}

impl FragmentMode {
    pub fn is_active(&self) -> bool {
        !matches!(self, FragmentMode::None)
    }
}

/// What to do when the selection list repeats a key.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DuplicatePolicy {
    /// Abort naming the key.
    #[default]
    Fatal,
    /// Keep the earliest occurrence and warn.
    Warn,
}

/// Output path pattern for fragment mode, with exactly one `%s`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputTemplate {
    prefix: String,
    suffix: String,
}

impl OutputTemplate {
    pub fn parse(template: &str) -> Result<Self, SelectError> {
        let mut parts = template.split(GROUP_PLACEHOLDER);
        match (parts.next(), parts.next(), parts.next()) {
            (Some(prefix), Some(suffix), None) => Ok(Self {
                prefix: prefix.to_string(),
                suffix: suffix.to_string(),
            }),
            _ => Err(SelectError::InvalidConfig(format!(
                "output template \"{template}\" must contain exactly one {GROUP_PLACEHOLDER}"
            ))),
        }
    }

    /// Path for a group tag.
    pub fn path_for(&self, group: &[u8]) -> PathBuf {
        PathBuf::from(format!(
            "{}{}{}",
            self.prefix,
            String::from_utf8_lossy(group),
            self.suffix
        ))
    }
}

/// Immutable configuration for one selection run.
#[derive(Debug, Clone)]
pub struct SelectConfig {
    pub selector_delimiters: DelimiterSet,
    pub header_key_delimiters: DelimiterSet,
    pub record_marker: u8,
    pub polarity: Polarity,
    pub fragment: FragmentMode,
    pub continue_on_miss: bool,
    pub duplicates: DuplicatePolicy,
    pub max_line_length: usize,
}

impl Default for SelectConfig {
    fn default() -> Self {
        Self {
            selector_delimiters: DelimiterSet::new(DEFAULT_SELECTOR_DELIMITERS),
            header_key_delimiters: DelimiterSet::new(DEFAULT_HEADER_KEY_DELIMITERS),
            record_marker: DEFAULT_RECORD_MARKER,
            polarity: Polarity::Select,
            fragment: FragmentMode::None,
            continue_on_miss: false,
            duplicates: DuplicatePolicy::Fatal,
            max_line_length: DEFAULT_MAX_LINE_LENGTH,
        }
    }
}

impl SelectConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_selector_delimiters(mut self, bytes: &[u8]) -> Self {
        self.selector_delimiters = DelimiterSet::new(bytes);
        self
    }

    pub fn with_header_key_delimiters(mut self, bytes: &[u8]) -> Self {
        self.header_key_delimiters = DelimiterSet::new(bytes);
        self
    }

    pub fn with_record_marker(mut self, marker: u8) -> Self {
        self.record_marker = marker;
        self
    }

    pub fn with_polarity(mut self, polarity: Polarity) -> Self {
        self.polarity = polarity;
        self
    }

    pub fn with_fragment(mut self, fragment: FragmentMode) -> Self {
        self.fragment = fragment;
        self
    }

    pub fn with_continue_on_miss(mut self, yes: bool) -> Self {
        self.continue_on_miss = yes;
        self
    }

    pub fn with_continue_on_duplicates(mut self, yes: bool) -> Self {
        self.duplicates = if yes {
            DuplicatePolicy::Warn
        } else {
            DuplicatePolicy::Fatal
        };
        self
    }

    pub fn with_max_line_length(mut self, max: usize) -> Self {
        self.max_line_length = max;
        self
    }

    /// Reject combinations that cannot be run.
    pub fn validate(&self) -> Result<(), SelectError> {
        if self.fragment.is_active() && self.polarity == Polarity::Reject {
            return Err(SelectError::InvalidConfig(
                "fragment mode cannot be combined with reject mode".to_string(),
            ));
        }
        if self.max_line_length == 0 {
            return Err(SelectError::InvalidConfig(
                "maximum line length must be at least 1".to_string(),
            ));
        }
        if matches!(self.record_marker, b'\n' | b'\r') {
            return Err(SelectError::InvalidConfig(
                "record marker cannot be a line terminator".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delimiter_set_implicit_terminators() {
        let set = DelimiterSet::new(b"|");
        assert!(set.contains(b'|'));
        assert!(set.contains(b'\n'));
        assert!(set.contains(b'\r'));
        assert!(set.contains(0));
        assert!(!set.contains(b' '));
    }

    #[test]
    fn test_delimiter_set_high_bytes() {
        let set = DelimiterSet::new(&[0xff, 0x80]);
        assert!(set.contains(0xff));
        assert!(set.contains(0x80));
        assert!(!set.contains(0x7f));
    }

    #[test]
    fn test_spans() {
        let set = DelimiterSet::new(b" |");
        assert_eq!(set.span_until(b"abc def"), 3);
        assert_eq!(set.span_until(b"abc"), 3);
        assert_eq!(set.span_while(b" | x"), 3);
        assert_eq!(set.span_while(b"   "), 3);
    }

    #[test]
    fn test_template_parse() {
        let t = OutputTemplate::parse("out_%s.fasta").unwrap();
        assert_eq!(t.path_for(b"g1"), PathBuf::from("out_g1.fasta"));
    }

    #[test]
    fn test_template_requires_one_placeholder() {
        assert!(OutputTemplate::parse("out.fasta").is_err());
        assert!(OutputTemplate::parse("%s_%s").is_err());
    }

    #[test]
    fn test_validate_fragment_with_reject() {
        let config = SelectConfig::new()
            .with_fragment(FragmentMode::Append)
            .with_polarity(Polarity::Reject);
        assert!(matches!(
            config.validate(),
            Err(SelectError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_validate_defaults() {
        assert!(SelectConfig::default().validate().is_ok());
    }

    #[test]
    fn test_continue_on_duplicates() {
        let config = SelectConfig::new().with_continue_on_duplicates(true);
        assert_eq!(config.duplicates, DuplicatePolicy::Warn);
    }
}
