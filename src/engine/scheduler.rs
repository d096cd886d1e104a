//! Scheduler - dirty tracking and pass planning.
//!
//! The dirty set doubles as the "has work" flag of every instance: an
//! instance is dirty exactly while it is in the set. A pass works on a
//! depth-sorted snapshot of the set, taking each instance out right before
//! reconciling it:
//!
//! ```text
//! mark_dirty(B)  mark_dirty(A)        begin_pass          reconcile A -> dirties B, creates C
//!     {B}    ->     {B, A}       ->   batch [A, B]   ->   {B, C}   (B still in batch, C waits)
//!                                                          reconcile B
//!                                                          {C}      next pass
//! ```
//!
//! An instance dirtied again after it was taken simply lands in the next
//! pass; one that leaves the set before its turn (destroyed, or already
//! handled) is skipped.

use std::cell::{Cell, RefCell};

use indexmap::IndexSet;

use super::tree::{InstanceId, Tree};

pub(crate) struct Scheduler {
    dirty: RefCell<IndexSet<InstanceId>>,
    scheduled: Cell<bool>,
    flushing: Cell<bool>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self {
            dirty: RefCell::new(IndexSet::new()),
            scheduled: Cell::new(false),
            flushing: Cell::new(false),
        }
    }

    /// Queue an instance for re-execution and schedule a flush if none is
    /// pending.
    pub fn mark_dirty(&self, id: InstanceId) -> bool {
        let inserted = self.dirty.borrow_mut().insert(id);
        if !self.scheduled.replace(true) {
            log::trace!("flush scheduled");
        }
        inserted
    }

    pub fn is_dirty(&self, id: InstanceId) -> bool {
        self.dirty.borrow().contains(&id)
    }

    pub fn has_work(&self) -> bool {
        !self.dirty.borrow().is_empty()
    }

    pub fn is_scheduled(&self) -> bool {
        self.scheduled.get()
    }

    /// Claim an instance from the current batch. `false` means it is no
    /// longer dirty and must be skipped.
    pub fn take(&self, id: InstanceId) -> bool {
        self.dirty.borrow_mut().shift_remove(&id)
    }

    /// Drop destroyed instances from the set.
    pub fn forget(&self, ids: impl IntoIterator<Item = InstanceId>) {
        let mut dirty = self.dirty.borrow_mut();
        for id in ids {
            dirty.shift_remove(&id);
        }
    }

    /// Start a pass: clear the scheduled flag and return the dirty instances
    /// by ascending depth, insertion order breaking ties.
    pub fn begin_pass(&self, tree: &Tree) -> Vec<InstanceId> {
        self.scheduled.set(false);

        let mut dirty = self.dirty.borrow_mut();
        dirty.retain(|&id| {
            let alive = tree.contains(id);
            if !alive {
                log::warn!("dropping update for an instance that no longer exists");
            }
            alive
        });

        let mut batch: Vec<(usize, InstanceId)> = dirty
            .iter()
            .filter_map(|&id| tree.depth(id).map(|depth| (depth, id)))
            .collect();
        batch.sort_by_key(|&(depth, _)| depth);
        batch.into_iter().map(|(_, id)| id).collect()
    }

    /// Mark the start of a drain. Returns `None` when one is already running,
    /// in which case the outer drain picks the work up.
    pub fn enter(&self) -> Option<FlushGuard<'_>> {
        if self.flushing.replace(true) {
            return None;
        }
        Some(FlushGuard { scheduler: self })
    }
}

/// Clears the flushing flag when the drain ends, including by error.
pub(crate) struct FlushGuard<'a> {
    scheduler: &'a Scheduler,
}

impl Drop for FlushGuard<'_> {
    fn drop(&mut self) {
        self.scheduler.flushing.set(false);
    }
}
