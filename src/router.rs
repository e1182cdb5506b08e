//! Group router for fragment mode.
//!
//! Flushed payloads carry their position's group tag. While consecutive
//! payloads share a tag they go to the same open sink; a new tag closes the
//! current sink and opens the next one. Under create-exclusive a tag that
//! comes back after another group has been opened collides with its own
//! earlier output.

use std::io::Write;
use std::rc::Rc;

use tracing::debug;

use crate::config::FragmentMode;
use crate::error::{SelectError, show};
use crate::sink::{FlushTarget, SinkOpener};

pub struct GroupRouter<O: SinkOpener> {
    opener: O,
    mode: FragmentMode,
    current: Option<(Rc<[u8]>, O::Sink)>,
    switches: usize,
    written: usize,
}

impl<O: SinkOpener> GroupRouter<O> {
    pub fn new(opener: O, mode: FragmentMode) -> Self {
        Self {
            opener,
            mode,
            current: None,
            switches: 0,
            written: 0,
        }
    }

    /// Tag of the open sink.
    pub fn current_group(&self) -> Option<&[u8]> {
        self.current.as_ref().map(|(g, _)| g.as_ref())
    }

    /// How many sinks have been opened.
    pub fn switches(&self) -> usize {
        self.switches
    }

    pub fn written(&self) -> usize {
        self.written
    }

    /// Flush and drop the open sink.
    pub fn close(&mut self) -> Result<(), SelectError> {
        if let Some((group, mut sink)) = self.current.take() {
            sink.flush()?;
            debug!(group = %show(&group), "closed group output");
        }
        Ok(())
    }

    pub fn into_opener(mut self) -> Result<O, SelectError> {
        self.close()?;
        Ok(self.opener)
    }

    fn switch_to(&mut self, group: &Rc<[u8]>) -> Result<(), SelectError> {
        let same = match &self.current {
            Some((open, _)) => Rc::ptr_eq(open, group) || open[..] == group[..],
            None => false,
        };
        if !same {
            self.close()?;
            let sink = self.opener.open(group, self.mode)?;
            self.switches += 1;
            self.current = Some((Rc::clone(group), sink));
        }
        Ok(())
    }
}

impl<O: SinkOpener> FlushTarget for GroupRouter<O> {
    fn emit(&mut self, group: Option<&Rc<[u8]>>, payload: Vec<u8>) -> Result<(), SelectError> {
        let group = group.ok_or_else(|| {
            SelectError::InvalidConfig("fragment mode output without a group".to_string())
        })?;
        self.switch_to(group)?;
        if let Some((_, sink)) = self.current.as_mut() {
            sink.write_all(&payload)?;
            self.written += 1;
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<(), SelectError> {
        if let Some((_, sink)) = self.current.as_mut() {
            sink.flush()?;
        }
        Ok(())
    }
}
