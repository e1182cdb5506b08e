//! Reorder buffer.
//!
//! Matched payloads arrive in stream order but must leave in output-position
//! order. Each payload is parked in its position's slot; after every insert
//! the contiguous filled prefix starting at `next_to_flush` is written out
//! and released. Only the gap between the lowest unflushed position and the
//! highest filled one is ever resident.

use std::rc::Rc;

use tracing::trace;

use crate::error::SelectError;
use crate::sink::FlushTarget;

/// A payload waiting for its turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pending {
    pub payload: Vec<u8>,
    pub group: Option<Rc<[u8]>>,
}

#[derive(Debug, Default)]
pub struct ReorderBuffer {
    slots: Vec<Option<Pending>>,
    next_to_flush: usize,
    resident: usize,
    peak: usize,
    highest_filled: Option<usize>,
}

impl ReorderBuffer {
    /// Buffer for positions `0..len`.
    pub fn new(len: usize) -> Self {
        let mut slots = Vec::new();
        slots.resize_with(len, || None);
        Self {
            slots,
            ..Self::default()
        }
    }

    /// Park a payload at `position`.
    ///
    /// The slot must be empty and not yet flushed; the scanner's duplicate
    /// match check guarantees both.
    pub fn insert(&mut self, position: usize, pending: Pending) {
        debug_assert!(position >= self.next_to_flush);
        debug_assert!(self.slots[position].is_none());
        self.slots[position] = Some(pending);
        self.resident += 1;
        self.peak = self.peak.max(self.resident);
        self.highest_filled = Some(self.highest_filled.map_or(position, |h| h.max(position)));
    }

    /// Write out the filled prefix starting at `next_to_flush`.
    ///
    /// Returns how many payloads were written.
    pub fn drain<T: FlushTarget + ?Sized>(&mut self, target: &mut T) -> Result<usize, SelectError> {
        let mut flushed = 0;
        while let Some(slot) = self.slots.get_mut(self.next_to_flush) {
            let Some(pending) = slot.take() else {
                break;
            };
            self.resident -= 1;
            target.emit(pending.group.as_ref(), pending.payload)?;
            self.next_to_flush += 1;
            flushed += 1;
        }
        if flushed > 0 {
            trace!(
                flushed,
                next = self.next_to_flush,
                resident = self.resident,
                "drained"
            );
        }
        Ok(flushed)
    }

    /// Write out everything still resident in position order, skipping holes.
    pub fn finish<T: FlushTarget + ?Sized>(&mut self, target: &mut T) -> Result<usize, SelectError> {
        let mut flushed = 0;
        while self.next_to_flush < self.slots.len() {
            if let Some(pending) = self.slots[self.next_to_flush].take() {
                self.resident -= 1;
                target.emit(pending.group.as_ref(), pending.payload)?;
                flushed += 1;
            }
            self.next_to_flush += 1;
        }
        Ok(flushed)
    }

    /// Every position has been written.
    pub fn is_complete(&self) -> bool {
        self.next_to_flush == self.slots.len()
    }

    pub fn next_to_flush(&self) -> usize {
        self.next_to_flush
    }

    /// Payloads currently held.
    pub fn resident(&self) -> usize {
        self.resident
    }

    /// Most payloads ever held at once.
    pub fn peak(&self) -> usize {
        self.peak
    }

    /// Largest number of payloads the current gap could hold.
    pub fn gap(&self) -> usize {
        match self.highest_filled {
            Some(h) if h >= self.next_to_flush => h - self.next_to_flush + 1,
            _ => 0,
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}
