//! Output destinations.
//!
//! The reorder buffer writes through [`FlushTarget`]. A plain writer is a
//! target on its own via [`SingleSink`]; fragment mode goes through the
//! group router, which opens per-group sinks from a [`SinkOpener`].

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, ErrorKind, Write};
use std::rc::Rc;

use tracing::debug;

use crate::config::{FragmentMode, OutputTemplate};
use crate::error::SelectError;

/// Receives payloads in final output order.
pub trait FlushTarget {
    /// Write one payload. `group` is the position's group tag, if any.
    fn emit(&mut self, group: Option<&Rc<[u8]>>, payload: Vec<u8>) -> Result<(), SelectError>;

    /// Push buffered bytes down to the open sink.
    fn flush(&mut self) -> Result<(), SelectError> {
        Ok(())
    }

    /// Writer for output that bypasses ordering, if this target has one.
    fn passthrough(&mut self) -> Option<&mut dyn Write> {
        None
    }
}

/// Everything to one writer; group tags are ignored.
pub struct SingleSink<W: Write> {
    inner: W,
    written: usize,
}

impl<W: Write> SingleSink<W> {
    pub fn new(inner: W) -> Self {
        Self { inner, written: 0 }
    }

    /// Payloads written so far.
    pub fn written(&self) -> usize {
        self.written
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: Write> FlushTarget for SingleSink<W> {
    fn emit(&mut self, _group: Option<&Rc<[u8]>>, payload: Vec<u8>) -> Result<(), SelectError> {
        self.inner.write_all(&payload)?;
        self.written += 1;
        Ok(())
    }

    fn flush(&mut self) -> Result<(), SelectError> {
        self.inner.flush()?;
        Ok(())
    }

    fn passthrough(&mut self) -> Option<&mut dyn Write> {
        Some(&mut self.inner)
    }
}

/// Opens the sink for a group tag under a fragment policy.
pub trait SinkOpener {
    type Sink: Write;

    fn open(&mut self, group: &[u8], mode: FragmentMode) -> Result<Self::Sink, SelectError>;
}

// ---------------------------------------------------------------------------
// Files
// ---------------------------------------------------------------------------

/// Opens one file per group, named by substituting the tag into a template.
#[derive(Debug, Clone)]
pub struct FileOpener {
    template: OutputTemplate,
}

impl FileOpener {
    pub fn new(template: OutputTemplate) -> Self {
        Self { template }
    }
}

impl SinkOpener for FileOpener {
    type Sink = BufWriter<File>;

    fn open(&mut self, group: &[u8], mode: FragmentMode) -> Result<Self::Sink, SelectError> {
        let path = self.template.path_for(group);
        let mut options = OpenOptions::new();
        match mode {
            FragmentMode::Append => options.append(true).create(true),
            _ => options.write(true).create_new(true),
        };
        match options.open(&path) {
            Ok(file) => {
                debug!(path = %path.display(), "opened group output");
                Ok(BufWriter::new(file))
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => Err(SelectError::GroupContiguity {
                group: group.to_vec(),
                path,
            }),
            Err(source) => Err(SelectError::Sink { path, source }),
        }
    }
}

// ---------------------------------------------------------------------------
// Memory
// ---------------------------------------------------------------------------

type Store = Rc<RefCell<BTreeMap<Vec<u8>, Vec<u8>>>>;

/// Keeps each group's output in memory, keyed by tag.
///
/// Follows the same existence rules as [`FileOpener`]: a create-exclusive
/// open of a tag that already has output fails.
#[derive(Debug, Clone, Default)]
pub struct MemoryOpener {
    store: Store,
}

impl MemoryOpener {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-existing output for a tag.
    pub fn with_existing(self, group: &[u8], contents: &[u8]) -> Self {
        self.store
            .borrow_mut()
            .insert(group.to_vec(), contents.to_vec());
        self
    }

    /// Output written so far for a tag.
    pub fn contents(&self, group: &[u8]) -> Option<Vec<u8>> {
        self.store.borrow().get(group).cloned()
    }

    /// Tags with output, in byte order.
    pub fn groups(&self) -> Vec<Vec<u8>> {
        self.store.borrow().keys().cloned().collect()
    }
}

/// Writer handed out by [`MemoryOpener`].
pub struct MemorySink {
    group: Vec<u8>,
    store: Store,
}

impl Write for MemorySink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.store
            .borrow_mut()
            .entry(self.group.clone())
            .or_default()
            .extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl SinkOpener for MemoryOpener {
    type Sink = MemorySink;

    fn open(&mut self, group: &[u8], mode: FragmentMode) -> Result<Self::Sink, SelectError> {
        let mut store = self.store.borrow_mut();
        if mode == FragmentMode::CreateExclusive && store.contains_key(group) {
            return Err(SelectError::GroupContiguity {
                group: group.to_vec(),
                path: String::from_utf8_lossy(group).into_owned().into(),
            });
        }
        store.entry(group.to_vec()).or_default();
        Ok(MemorySink {
            group: group.to_vec(),
            store: Rc::clone(&self.store),
        })
    }
}
