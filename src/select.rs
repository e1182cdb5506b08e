//! Top-level selection run.
//!
//! Builds the selector index, scans the stream once, finalises the reorder
//! buffer and checks completeness. On a fatal error whatever is already in
//! the open sink is flushed before the error is returned; nothing is rolled
//! back.

use std::fmt;
use std::io::{BufRead, Write};

use tracing::{info, warn};

use crate::completeness;
use crate::config::{Polarity, SelectConfig};
use crate::error::{InputKind, SelectError, Warning};
use crate::line::LineReader;
use crate::record::RecordReader;
use crate::reorder::ReorderBuffer;
use crate::router::GroupRouter;
use crate::scanner::{ScanStats, scan_reject, scan_select};
use crate::selector::SelectorIndex;
use crate::sink::{FlushTarget, SingleSink, SinkOpener};

/// Outcome of a successful run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectReport {
    /// Selectors after deduplication.
    pub selectors: usize,
    pub records_scanned: u64,
    pub records_emitted: u64,
    /// Most payloads held in the reorder buffer at once.
    pub peak_buffered: usize,
    /// Scanning stopped before end of stream.
    pub stopped_early: bool,
    /// Non-fatal conditions, in the order they were raised.
    pub warnings: Vec<Warning>,
}

impl fmt::Display for SelectReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "selectors: {}, records read: {}, emitted: {}",
            self.selectors, self.records_scanned, self.records_emitted
        )
    }
}

/// Run a selection writing to a single output.
///
/// Works in both polarities.
pub fn run_select<S, R, W>(
    config: &SelectConfig,
    selection: S,
    stream: R,
    out: W,
) -> Result<SelectReport, SelectError>
where
    S: BufRead,
    R: BufRead,
    W: Write,
{
    run_select_to(config, selection, stream, || Ok(out))
}

/// Like [`run_select`], but the output is only opened once the selection
/// list has been read and indexed.
///
/// A selection list that fails to load leaves the destination untouched.
pub fn run_select_to<S, R, W, F>(
    config: &SelectConfig,
    selection: S,
    stream: R,
    open: F,
) -> Result<SelectReport, SelectError>
where
    S: BufRead,
    R: BufRead,
    W: Write,
    F: FnOnce() -> Result<W, SelectError>,
{
    if config.fragment.is_active() {
        return Err(SelectError::InvalidConfig(
            "fragment mode needs a sink opener, not a single output".to_string(),
        ));
    }
    let (report, _) = run(config, selection, stream, || open().map(SingleSink::new))?;
    Ok(report)
}

/// Run a selection in fragment mode, one sink per group tag.
pub fn run_fragmented<S, R, O>(
    config: &SelectConfig,
    selection: S,
    stream: R,
    opener: O,
) -> Result<SelectReport, SelectError>
where
    S: BufRead,
    R: BufRead,
    O: SinkOpener,
{
    if !config.fragment.is_active() {
        return Err(SelectError::InvalidConfig(
            "a sink opener needs fragment mode".to_string(),
        ));
    }
    let mode = config.fragment;
    let (report, mut router) = run(config, selection, stream, || {
        Ok(GroupRouter::new(opener, mode))
    })?;
    router.close()?;
    Ok(report)
}

fn run<S, R, T, F>(
    config: &SelectConfig,
    selection: S,
    stream: R,
    open: F,
) -> Result<(SelectReport, T), SelectError>
where
    S: BufRead,
    R: BufRead,
    T: FlushTarget,
    F: FnOnce() -> Result<T, SelectError>,
{
    config.validate()?;

    let mut warnings = Vec::new();
    let mut selection = LineReader::new(selection, InputKind::Selection, config.max_line_length);
    let mut index = SelectorIndex::read(&mut selection, config)?;
    warnings.extend(selection.warning());
    warnings.extend(index.warnings().iter().cloned());

    let mut target = open()?;
    let mut records = RecordReader::new(stream, config);
    let result = match config.polarity {
        Polarity::Select => select(config, &mut records, &mut index, &mut target),
        Polarity::Reject => reject(&mut records, &mut index, &mut target),
    };
    let (stats, peak, more_warnings) = match result {
        Ok(done) => done,
        Err(e) => {
            // Keep what was already written; the scan error wins.
            if let Err(flush) = target.flush() {
                warn!("could not flush output after fatal error: {flush}");
            }
            return Err(e);
        }
    };
    warnings.extend(records.warning());
    warnings.extend(more_warnings);

    let report = SelectReport {
        selectors: index.len(),
        records_scanned: stats.records_scanned,
        records_emitted: stats.records_emitted,
        peak_buffered: peak,
        stopped_early: stats.stopped_early,
        warnings,
    };
    info!("status: {report}");
    Ok((report, target))
}

type Finished = (ScanStats, usize, Vec<Warning>);

fn select<R, T>(
    config: &SelectConfig,
    records: &mut RecordReader<R>,
    index: &mut SelectorIndex,
    target: &mut T,
) -> Result<Finished, SelectError>
where
    R: BufRead,
    T: FlushTarget,
{
    let mut buffer = ReorderBuffer::new(index.len());
    let stats = scan_select(records, index, &mut buffer, target)?;
    buffer.finish(target)?;
    target.flush()?;
    let warnings = completeness::check(index, config.continue_on_miss)?;
    Ok((stats, buffer.peak(), warnings))
}

fn reject<R, T>(
    records: &mut RecordReader<R>,
    index: &mut SelectorIndex,
    target: &mut T,
) -> Result<Finished, SelectError>
where
    R: BufRead,
    T: FlushTarget,
{
    let out = target.passthrough().ok_or_else(|| {
        SelectError::InvalidConfig("reject mode needs a single output".to_string())
    })?;
    let stats = scan_reject(records, index, out)?;
    target.flush()?;
    Ok((stats, 0, Vec::new()))
}
