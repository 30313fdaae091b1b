//! Fixed-capacity slot table.
//!
//! The table is an arena of `Option<RunningInstance>` indexed by slot number. Its length is the
//! runner capacity and never changes, so "at most N running commands" holds mechanically.

use std::time::{Duration, Instant};

use crate::error::RunError;

/// A command occupying a slot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct RunningInstance {
    /// Process-group id of the started command; `None` until the process exists.
    pub pgid: Option<i32>,
    /// When the command becomes eligible for escalation; `None` means not started yet.
    pub deadline: Option<Instant>,
    pub interrupt_sent_at: Option<Instant>,
    pub terminate_sent_at: Option<Instant>,
    /// Set once SIGKILL went out; the instance is left alone after that.
    pub kill_sent_at: Option<Instant>,
}

pub(crate) struct SlotTable {
    slots: Vec<Option<RunningInstance>>,
    /// Moment the drain grace window expires; `None` while accepting work.
    drain_at: Option<Instant>,
}

impl SlotTable {
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: vec![None; capacity],
            drain_at: None,
        }
    }

    #[cfg(test)]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Claim the first free slot.
    pub fn allocate(&mut self) -> Result<usize, RunError> {
        if self.drain_at.is_some() {
            return Err(RunError::ShuttingDown);
        }
        let index = self
            .slots
            .iter()
            .position(Option::is_none)
            .ok_or(RunError::CapacityExceeded)?;
        self.slots[index] = Some(RunningInstance::default());
        Ok(index)
    }

    pub fn release(&mut self, index: usize) {
        if let Some(slot) = self.slots.get_mut(index) {
            *slot = None;
        }
    }

    /// Publish the started process into its slot.
    pub fn mark_started(&mut self, index: usize, pgid: i32, deadline: Instant) {
        if let Some(Some(inst)) = self.slots.get_mut(index) {
            inst.pgid = Some(pgid);
            inst.deadline = Some(deadline);
        }
    }

    /// Process group of the slot, once started.
    pub fn pgid(&self, index: usize) -> Option<i32> {
        self.slots.get(index)?.as_ref()?.pgid
    }

    #[cfg(test)]
    pub fn get(&self, index: usize) -> Option<&RunningInstance> {
        self.slots.get(index).and_then(Option::as_ref)
    }

    /// Occupied slots whose process has started.
    pub fn started_mut(&mut self) -> impl Iterator<Item = (usize, &mut RunningInstance)> {
        self.slots
            .iter_mut()
            .enumerate()
            .filter_map(|(i, s)| s.as_mut().map(|inst| (i, inst)))
            .filter(|(_, inst)| inst.deadline.is_some())
    }

    pub fn occupied(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(Option::is_none)
    }

    /// Stamp the drain deadline once. Returns `false` if the drain had already begun.
    pub fn begin_drain(&mut self, now: Instant, grace: Duration) -> bool {
        if self.drain_at.is_some() {
            return false;
        }
        self.drain_at = Some(now + grace);
        true
    }

    #[inline]
    pub fn drain_at(&self) -> Option<Instant> {
        self.drain_at
    }
}
