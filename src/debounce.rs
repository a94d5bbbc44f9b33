//! Deferred commits for text-like fields.
//!
//! A commit is scheduled with a snapshot of its target (the element and the entry as they
//! were when the user typed), so flushing it later writes to the same logical target even
//! if the selection moved on in between.

use crate::entries::{Entry, FieldValue};
use crate::model::Element;

/// A scheduled write.
#[derive(Debug, Clone)]
pub struct PendingCommit {
    /// Element the value belongs to
    pub element: Element,
    /// Entry that produced the value
    pub entry: Entry,
    /// Value to commit
    pub value: FieldValue,
    /// Time (seconds) at which the commit becomes due
    pub due: f64,
}

/// Collects text edits and releases each one once it has been quiet for the delay.
#[derive(Debug)]
pub struct Debouncer {
    delay_secs: f64,
    pending: Vec<PendingCommit>,
}

impl Debouncer {
    /// Creates a debouncer with the given delay in milliseconds.
    pub fn new(delay_ms: u64) -> Self {
        Self {
            delay_secs: delay_ms as f64 / 1000.0,
            pending: Vec::new(),
        }
    }

    /// Schedules `value`, replacing (and restarting the timer of) any pending value for the
    /// same element and entry.
    pub fn schedule(&mut self, now: f64, element: &Element, entry: &Entry, value: FieldValue) {
        let due = now + self.delay_secs;
        match self
            .pending
            .iter_mut()
            .find(|p| p.element.id == element.id && p.entry.id == entry.id)
        {
            Some(pending) => {
                pending.value = value;
                pending.due = due;
            }
            None => self.pending.push(PendingCommit {
                element: element.clone(),
                entry: entry.clone(),
                value,
                due,
            }),
        }
    }

    /// Removes and returns every commit due at `now`, in scheduling order.
    pub fn take_due(&mut self, now: f64) -> Vec<PendingCommit> {
        let (due, pending): (Vec<_>, Vec<_>) = std::mem::take(&mut self.pending)
            .into_iter()
            .partition(|p| p.due <= now);
        self.pending = pending;
        due
    }

    /// Removes and returns every pending commit regardless of its deadline.
    pub fn flush(&mut self) -> Vec<PendingCommit> {
        std::mem::take(&mut self.pending)
    }

    /// Removes and returns the pending commit of one entry, if any.
    pub fn flush_entry(&mut self, element_id: &str, entry_id: &str) -> Option<PendingCommit> {
        let index = self
            .pending
            .iter()
            .position(|p| p.element.id == element_id && p.entry.id == entry_id)?;
        Some(self.pending.remove(index))
    }

    /// Value typed but not yet committed for an entry.
    pub fn pending_value(&self, element_id: &str, entry_id: &str) -> Option<&FieldValue> {
        self.pending
            .iter()
            .find(|p| p.element.id == element_id && p.entry.id == entry_id)
            .map(|p| &p.value)
    }

    /// Earliest deadline among pending commits.
    pub fn next_due(&self) -> Option<f64> {
        self.pending.iter().map(|p| p.due).reduce(f64::min)
    }

    /// Returns true if nothing is waiting.
    pub fn is_idle(&self) -> bool {
        self.pending.is_empty()
    }
}
