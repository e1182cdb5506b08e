//! Record framing over a line stream.
//!
//! A record is one header line (starting with the record marker) and every
//! following line up to the next header or end of input. Lines before the
//! first header belong to no record.

use std::io::BufRead;

use crate::config::{DelimiterSet, SelectConfig};
use crate::error::{InputKind, SelectError, Warning};
use crate::line::LineReader;

/// One line of the stream, classified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Line<'a> {
    /// Before the first header.
    Preamble(&'a [u8]),
    /// Starts a new record.
    Header { line: &'a [u8], key: &'a [u8] },
    /// Belongs to the current record.
    Body(&'a [u8]),
}

/// Key of a header line: the bytes after the marker up to the first delimiter.
pub fn header_key<'a>(line: &'a [u8], delims: &DelimiterSet) -> &'a [u8] {
    let name = &line[1..];
    &name[..delims.span_until(name)]
}

/// A matched record's key and its text with normalised line endings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamRecord {
    pub header_key: Vec<u8>,
    pub payload: Vec<u8>,
}

impl StreamRecord {
    pub fn new(header_key: &[u8]) -> Self {
        Self {
            header_key: header_key.to_vec(),
            payload: Vec::new(),
        }
    }

    /// Append one line and an LF.
    pub fn push_line(&mut self, line: &[u8]) {
        self.payload.reserve(line.len() + 1);
        self.payload.extend_from_slice(line);
        self.payload.push(b'\n');
    }

    pub fn into_payload(self) -> Vec<u8> {
        self.payload
    }
}

/// Classifies stream lines into headers and bodies.
pub struct RecordReader<R> {
    lines: LineReader<R>,
    buf: Vec<u8>,
    marker: u8,
    delims: DelimiterSet,
    in_record: bool,
    headers: u64,
}

impl<R: BufRead> RecordReader<R> {
    pub fn new(inner: R, config: &SelectConfig) -> Self {
        Self {
            lines: LineReader::new(inner, InputKind::Records, config.max_line_length),
            buf: Vec::new(),
            marker: config.record_marker,
            delims: config.header_key_delimiters,
            in_record: false,
            headers: 0,
        }
    }

    /// Next classified line, or `None` at end of input.
    pub fn next_line(&mut self) -> Result<Option<Line<'_>>, SelectError> {
        if !self.lines.read_line(&mut self.buf)? {
            return Ok(None);
        }
        let line = self.buf.as_slice();
        if line.first() == Some(&self.marker) {
            self.in_record = true;
            self.headers += 1;
            Ok(Some(Line::Header {
                line,
                key: header_key(line, &self.delims),
            }))
        } else if self.in_record {
            Ok(Some(Line::Body(line)))
        } else {
            Ok(Some(Line::Preamble(line)))
        }
    }

    /// Header lines read so far.
    pub fn headers(&self) -> u64 {
        self.headers
    }

    pub fn warning(&self) -> Option<Warning> {
        self.lines.warning()
    }
}
