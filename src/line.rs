//! Bounded line reading.
//!
//! Lines are split on LF with a trailing CR removed. A line longer than the
//! configured maximum is fatal; reading stops at the cap instead of
//! buffering the whole overlong line.

use std::io::{BufRead, ErrorKind};

use memchr::memchr;
use tracing::warn;

use crate::error::{InputKind, SelectError, Warning};

/// Reads one line at a time into a caller-owned buffer.
pub struct LineReader<R> {
    inner: R,
    input: InputKind,
    max: usize,
    line_no: u64,
    unterminated: bool,
}

impl<R: BufRead> LineReader<R> {
    pub fn new(inner: R, input: InputKind, max: usize) -> Self {
        Self {
            inner,
            input,
            max,
            line_no: 0,
            unterminated: false,
        }
    }

    /// Read the next line into `buf`, without its terminator.
    ///
    /// Returns `false` at end of input.
    pub fn read_line(&mut self, buf: &mut Vec<u8>) -> Result<bool, SelectError> {
        buf.clear();
        let mut terminated = false;
        let mut any = false;

        loop {
            let available = match self.inner.fill_buf() {
                Ok(b) => b,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            };
            if available.is_empty() {
                break;
            }
            any = true;
            let (take, consume) = match memchr(b'\n', available) {
                Some(i) => {
                    terminated = true;
                    (i, i + 1)
                }
                None => (available.len(), available.len()),
            };
            buf.extend_from_slice(&available[..take]);
            self.inner.consume(consume);

            // One spare byte for a CR that will be stripped.
            if buf.len() > self.max.saturating_add(1) {
                return Err(self.too_long());
            }
            if terminated {
                break;
            }
        }

        if !any {
            return Ok(false);
        }
        if buf.last() == Some(&b'\r') {
            buf.pop();
        }
        if buf.len() > self.max {
            return Err(self.too_long());
        }
        self.line_no += 1;
        if !terminated {
            self.unterminated = true;
            warn!("{}", Warning::MissingFinalNewline { input: self.input });
        }
        Ok(true)
    }

    /// Number of lines read so far.
    pub fn line_no(&self) -> u64 {
        self.line_no
    }

    /// Warning for a final line without terminator, if one was seen.
    pub fn warning(&self) -> Option<Warning> {
        self.unterminated
            .then_some(Warning::MissingFinalNewline { input: self.input })
    }

    fn too_long(&self) -> SelectError {
        SelectError::LineTooLong {
            input: self.input,
            line: self.line_no + 1,
            max: self.max,
        }
    }
}
