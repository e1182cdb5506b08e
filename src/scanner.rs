//! Stream scanner.
//!
//! Walks the record stream once, looking up each header's key in the
//! selector index. In select mode matched records are collected whole and
//! handed to the reorder buffer; in reject mode unmatched records are
//! written straight through in stream order.

use std::io::{BufRead, Write};
use std::rc::Rc;

use tracing::debug;

use crate::error::SelectError;
use crate::record::{Line, RecordReader, StreamRecord};
use crate::reorder::{Pending, ReorderBuffer};
use crate::selector::SelectorIndex;
use crate::sink::FlushTarget;

/// Counters from one pass over the stream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanStats {
    /// Records whose header was examined.
    pub records_scanned: u64,
    /// Records selected for output.
    pub records_emitted: u64,
    /// The scan stopped before end of input because every position was written.
    pub stopped_early: bool,
}

/// A matched record still collecting body lines.
struct OpenRecord {
    position: usize,
    group: Option<Rc<[u8]>>,
    record: StreamRecord,
}

impl OpenRecord {
    fn into_pending(self) -> (usize, Pending) {
        (
            self.position,
            Pending {
                payload: self.record.into_payload(),
                group: self.group,
            },
        )
    }
}

/// Park a finished record and flush whatever became writable.
fn settle<T: FlushTarget + ?Sized>(
    open: OpenRecord,
    buffer: &mut ReorderBuffer,
    target: &mut T,
) -> Result<(), SelectError> {
    let (position, pending) = open.into_pending();
    buffer.insert(position, pending);
    buffer.drain(target)?;
    Ok(())
}

/// Select mode: emit matches in output-position order.
///
/// Stops reading as soon as every position has been written.
pub fn scan_select<R, T>(
    records: &mut RecordReader<R>,
    index: &mut SelectorIndex,
    buffer: &mut ReorderBuffer,
    target: &mut T,
) -> Result<ScanStats, SelectError>
where
    R: BufRead,
    T: FlushTarget + ?Sized,
{
    let mut stats = ScanStats::default();
    let mut current: Option<OpenRecord> = None;

    while let Some(line) = records.next_line()? {
        match line {
            Line::Preamble(_) => {}
            Line::Header { line, key } => {
                if let Some(open) = current.take() {
                    settle(open, buffer, target)?;
                    if buffer.is_complete() {
                        stats.stopped_early = true;
                        break;
                    }
                }
                stats.records_scanned += 1;

                let Some(slot) = index.lookup(key) else {
                    continue;
                };
                if !index.mark_matched(slot) {
                    return Err(SelectError::DuplicateMatch {
                        key: key.to_vec(),
                        header: line.to_vec(),
                    });
                }
                stats.records_emitted += 1;
                let selector = index.get(slot);
                let mut record = StreamRecord::new(key);
                record.push_line(line);
                current = Some(OpenRecord {
                    position: selector.position,
                    group: selector.group.clone(),
                    record,
                });
            }
            Line::Body(body) => {
                if let Some(open) = current.as_mut() {
                    open.record.push_line(body);
                }
            }
        }
    }

    if let Some(open) = current.take() {
        settle(open, buffer, target)?;
    }

    debug!(
        scanned = stats.records_scanned,
        emitted = stats.records_emitted,
        early = stats.stopped_early,
        peak = buffer.peak(),
        "select scan finished"
    );
    Ok(stats)
}

/// Reject mode: write every non-matching record, unbuffered, in stream order.
pub fn scan_reject<R, W>(
    records: &mut RecordReader<R>,
    index: &mut SelectorIndex,
    out: &mut W,
) -> Result<ScanStats, SelectError>
where
    R: BufRead,
    W: Write + ?Sized,
{
    let mut stats = ScanStats::default();
    let mut emitting = false;

    while let Some(line) = records.next_line()? {
        let text = match line {
            Line::Preamble(_) => continue,
            Line::Header { line, key } => {
                stats.records_scanned += 1;
                emitting = match index.lookup(key) {
                    Some(slot) => {
                        index.mark_matched(slot);
                        false
                    }
                    None => true,
                };
                if emitting {
                    stats.records_emitted += 1;
                }
                line
            }
            Line::Body(body) => body,
        };
        if emitting {
            out.write_all(text)?;
            out.write_all(b"\n")?;
        }
    }

    debug!(
        scanned = stats.records_scanned,
        emitted = stats.records_emitted,
        "reject scan finished"
    );
    Ok(stats)
}
