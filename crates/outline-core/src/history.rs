//! Undo history for [`OutlineEditor`](crate::OutlineEditor).
//!
//! Every committed transaction becomes a [`Revision`] holding its steps and their inverses.
//! Revisions are grouped into batches that undo and redo as one; consecutive typing shares a
//! batch. Each revision carries a serial number, and the saved state is remembered as the serial
//! of the revision it follows, so discarding redo entries or evicting old revisions never needs
//! to rewrite the saved point.

use std::collections::VecDeque;

use tracing::trace;

use crate::transform::{Selection, Step, Transaction};

/// One committed transaction, replayable in both directions.
#[derive(Debug, Clone)]
pub(crate) struct Revision {
    serial: u64,
    steps: Vec<Step>,
    inverted: Vec<Step>,
    selection_before: Selection,
    selection_after: Selection,
}

impl Revision {
    pub(crate) fn of(tr: &Transaction) -> Self {
        Self {
            serial: 0,
            steps: tr.steps().to_vec(),
            inverted: tr.inverted().to_vec(),
            selection_before: tr.selection_before(),
            selection_after: tr.selection(),
        }
    }

    pub(crate) fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub(crate) fn inverted(&self) -> &[Step] {
        &self.inverted
    }

    pub(crate) fn selection_before(&self) -> Selection {
        self.selection_before
    }

    pub(crate) fn selection_after(&self) -> Selection {
        self.selection_after
    }
}

/// Revisions undone together, oldest first.
#[derive(Debug, Clone)]
pub(crate) struct Batch {
    revisions: Vec<Revision>,
}

impl Batch {
    pub(crate) fn revisions(&self) -> &[Revision] {
        &self.revisions
    }
}

#[derive(Debug)]
pub(crate) struct History {
    done: VecDeque<Batch>,
    undone: Vec<Batch>,
    /// Revision cap; 0 keeps everything.
    limit: usize,
    next_serial: u64,
    /// Serial of the state before the oldest kept revision.
    base: u64,
    saved: Option<u64>,
    /// Whether the newest batch still accepts typing.
    open: bool,
}

impl History {
    pub(crate) fn new(limit: usize) -> Self {
        Self {
            done: VecDeque::new(),
            undone: Vec::new(),
            limit,
            next_serial: 1,
            base: 0,
            saved: Some(0),
            open: false,
        }
    }

    /// Serial of the revision the document currently reflects.
    fn current(&self) -> u64 {
        self.done
            .back()
            .and_then(|batch| batch.revisions.last())
            .map_or(self.base, |revision| revision.serial)
    }

    pub(crate) fn undo_depth(&self) -> usize {
        self.done.iter().map(|batch| batch.revisions.len()).sum()
    }

    pub(crate) fn redo_depth(&self) -> usize {
        self.undone.iter().map(|batch| batch.revisions.len()).sum()
    }

    pub(crate) fn can_undo(&self) -> bool {
        !self.done.is_empty()
    }

    pub(crate) fn can_redo(&self) -> bool {
        !self.undone.is_empty()
    }

    pub(crate) fn is_clean(&self) -> bool {
        self.saved == Some(self.current())
    }

    pub(crate) fn mark_clean(&mut self) {
        self.saved = Some(self.current());
        self.close_batch();
    }

    /// Stop typing from joining the newest batch.
    pub(crate) fn close_batch(&mut self) {
        self.open = false;
    }

    /// Record a committed revision. Redo entries are dropped. A `typing` revision joins the
    /// newest batch when that batch is still open.
    pub(crate) fn record(&mut self, mut revision: Revision, typing: bool) {
        self.undone.clear();
        while self.limit > 0 && self.undo_depth() >= self.limit {
            self.evict_oldest();
        }

        revision.serial = self.next_serial;
        self.next_serial += 1;
        match self.done.back_mut() {
            Some(batch) if typing && self.open => batch.revisions.push(revision),
            _ => self.done.push_back(Batch {
                revisions: vec![revision],
            }),
        }
        self.open = typing;
    }

    fn evict_oldest(&mut self) {
        let Some(front) = self.done.front_mut() else {
            return;
        };
        if !front.revisions.is_empty() {
            let evicted = front.revisions.remove(0);
            self.base = evicted.serial;
            trace!(serial = evicted.serial, "revision evicted from history");
        }
        if front.revisions.is_empty() {
            self.done.pop_front();
        }
    }

    /// Replay the newest batch backwards through `replay`. The batch moves to the redo side
    /// only when `replay` succeeds; on failure it stays where it was. `None` when there is
    /// nothing to undo.
    pub(crate) fn undo<T, E>(
        &mut self,
        replay: impl FnOnce(&Batch) -> Result<T, E>,
    ) -> Option<Result<T, E>> {
        let batch = self.done.pop_back()?;
        self.open = false;
        let result = replay(&batch);
        match result {
            Ok(_) => self.undone.push(batch),
            Err(_) => self.done.push_back(batch),
        }
        Some(result)
    }

    /// Replay the most recently undone batch through `replay`, with the same failure rule as
    /// [`History::undo`].
    pub(crate) fn redo<T, E>(
        &mut self,
        replay: impl FnOnce(&Batch) -> Result<T, E>,
    ) -> Option<Result<T, E>> {
        let batch = self.undone.pop()?;
        self.open = false;
        let result = replay(&batch);
        match result {
            Ok(_) => self.done.push_back(batch),
            Err(_) => self.undone.push(batch),
        }
        Some(result)
    }
}
