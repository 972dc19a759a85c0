//! Primitive edits, position mapping, and transactions.
//!
//! A [`Transaction`] accumulates [`Step`]s against a working copy of a document. Each applied
//! step records a [`StepMap`] so that positions computed before the step can be carried forward
//! with [`Mapping::map`], and an inverse step for undo. Nothing is committed to the caller's
//! document until the transaction is handed back, so a failing operation leaves it untouched.

use crate::error::TransformError;
use crate::model::{Document, Node};

/// Which side of an insertion a mapped position sticks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Assoc {
    /// Stay before content inserted at the position.
    Before,
    /// Move after content inserted at the position.
    After,
}

/// Position map of a single step: `from..to` was replaced by `inserted` positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepMap {
    /// Start of the replaced range.
    pub from: usize,
    /// End of the replaced range (pre-step coordinates).
    pub to: usize,
    /// Size of the replacement.
    pub inserted: usize,
}

impl StepMap {
    /// Map a pre-step position to post-step coordinates.
    pub fn map(&self, pos: usize, assoc: Assoc) -> usize {
        if pos < self.from {
            return pos;
        }
        if pos > self.to {
            return pos - (self.to - self.from) + self.inserted;
        }
        let after = if self.from == self.to {
            assoc == Assoc::After
        } else if pos == self.from {
            false
        } else if pos == self.to {
            true
        } else {
            assoc == Assoc::After
        };
        if after {
            self.from + self.inserted
        } else {
            self.from
        }
    }
}

/// An ordered list of step maps.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Mapping {
    maps: Vec<StepMap>,
}

impl Mapping {
    /// Number of recorded maps. Use as a checkpoint for [`Mapping::slice`].
    pub fn len(&self) -> usize {
        self.maps.len()
    }

    /// `true` when no step has been recorded.
    pub fn is_empty(&self) -> bool {
        self.maps.is_empty()
    }

    /// Maps recorded from checkpoint `start` onwards.
    pub fn slice(&self, start: usize) -> Mapping {
        Mapping {
            maps: self.maps.get(start..).unwrap_or(&[]).to_vec(),
        }
    }

    /// Map a position through every recorded step.
    pub fn map(&self, pos: usize, assoc: Assoc) -> usize {
        self.maps.iter().fold(pos, |pos, map| map.map(pos, assoc))
    }

    /// The recorded maps.
    pub fn maps(&self) -> &[StepMap] {
        &self.maps
    }

    fn push(&mut self, map: StepMap) {
        self.maps.push(map);
    }
}

/// A primitive document edit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// Remove `from..to`.
    Delete {
        /// Range start.
        from: usize,
        /// Range end.
        to: usize,
    },
    /// Insert nodes at `pos`.
    Insert {
        /// Insertion position.
        pos: usize,
        /// Inserted nodes.
        content: Vec<Node>,
    },
    /// Replace `from..to` with nodes.
    Replace {
        /// Range start.
        from: usize,
        /// Range end.
        to: usize,
        /// Replacement nodes.
        content: Vec<Node>,
    },
}

impl Step {
    fn parts(&self) -> (usize, usize, &[Node]) {
        match self {
            Step::Delete { from, to } => (*from, *to, &[]),
            Step::Insert { pos, content } => (*pos, *pos, content),
            Step::Replace { from, to, content } => (*from, *to, content),
        }
    }

    /// Apply to `doc`, returning the position map and the inverse step.
    pub fn apply(&self, doc: &mut Document) -> Result<(StepMap, Step), TransformError> {
        let (from, to, content) = self.parts();
        let inserted: usize = content.iter().map(Node::node_size).sum();
        let removed = doc.replace(from, to, content.to_vec())?;

        let inverse = match (removed.is_empty(), inserted) {
            (true, _) => Step::Delete {
                from,
                to: from + inserted,
            },
            (false, 0) => Step::Insert {
                pos: from,
                content: removed,
            },
            (false, _) => Step::Replace {
                from,
                to: from + inserted,
                content: removed,
            },
        };
        Ok((StepMap { from, to, inserted }, inverse))
    }
}

/// Caret or range selection. `anchor` stays put while `head` moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Selection {
    /// Fixed end.
    pub anchor: usize,
    /// Moving end.
    pub head: usize,
}

impl Selection {
    /// Selection from `anchor` to `head`.
    pub fn new(anchor: usize, head: usize) -> Self {
        Self { anchor, head }
    }

    /// Collapsed selection.
    pub fn caret(pos: usize) -> Self {
        Self::new(pos, pos)
    }

    /// Smaller end.
    pub fn from(&self) -> usize {
        self.anchor.min(self.head)
    }

    /// Larger end.
    pub fn to(&self) -> usize {
        self.anchor.max(self.head)
    }

    /// `true` for a caret.
    pub fn is_empty(&self) -> bool {
        self.anchor == self.head
    }

    /// Carry the selection through a step map.
    pub fn map(&self, map: &StepMap) -> Self {
        Self {
            anchor: map.map(self.anchor, Assoc::After),
            head: map.map(self.head, Assoc::After),
        }
    }
}

/// What produced a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EditOrigin {
    /// Typing and plain edits.
    #[default]
    User,
    /// Heading level change.
    LevelChange,
    /// Wrapping a paragraph into a heading.
    Wrap,
    /// Structured paste.
    Paste,
    /// Structural range deletion.
    RangeDelete,
    /// Hierarchy repair.
    Validator,
    /// Undo or redo replay.
    History,
}

/// Transaction metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransactionMeta {
    /// What produced the transaction.
    pub origin: EditOrigin,
    /// Whether the transaction should be recorded in the undo history.
    pub add_to_history: bool,
}

impl Default for TransactionMeta {
    fn default() -> Self {
        Self {
            origin: EditOrigin::User,
            add_to_history: true,
        }
    }
}

/// A batch of steps applied to a working copy of a document.
#[derive(Debug, Clone)]
pub struct Transaction {
    before: Document,
    doc: Document,
    steps: Vec<Step>,
    inverted: Vec<Step>,
    mapping: Mapping,
    selection_before: Selection,
    selection: Selection,
    meta: TransactionMeta,
}

impl Transaction {
    /// Start a transaction on a copy of `doc`.
    pub fn new(doc: &Document, selection: Selection) -> Self {
        Self {
            before: doc.clone(),
            doc: doc.clone(),
            steps: Vec::new(),
            inverted: Vec::new(),
            mapping: Mapping::default(),
            selection_before: selection,
            selection,
            meta: TransactionMeta::default(),
        }
    }

    /// Builder-style origin override.
    pub fn with_origin(mut self, origin: EditOrigin) -> Self {
        self.meta.origin = origin;
        self
    }

    /// Set the origin in place.
    pub fn set_origin(&mut self, origin: EditOrigin) -> &mut Self {
        self.meta.origin = origin;
        self
    }

    /// Exclude this transaction from the undo history.
    pub fn without_history(mut self) -> Self {
        self.meta.add_to_history = false;
        self
    }

    /// Transaction metadata.
    pub fn meta(&self) -> TransactionMeta {
        self.meta
    }

    /// The document as it was when the transaction started.
    pub fn before(&self) -> &Document {
        &self.before
    }

    /// The working document.
    pub fn doc(&self) -> &Document {
        &self.doc
    }

    /// Applied steps, in order.
    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// Inverse steps, in application order (undo replays them back to front).
    pub fn inverted(&self) -> &[Step] {
        &self.inverted
    }

    /// Position maps of the applied steps.
    pub fn mapping(&self) -> &Mapping {
        &self.mapping
    }

    /// `true` when at least one step was applied.
    pub fn doc_changed(&self) -> bool {
        !self.steps.is_empty()
    }

    /// Selection at the start of the transaction.
    pub fn selection_before(&self) -> Selection {
        self.selection_before
    }

    /// Current selection, mapped through every step applied since it was set.
    pub fn selection(&self) -> Selection {
        self.selection
    }

    /// Replace the current selection. Clamped to the working document.
    pub fn set_selection(&mut self, selection: Selection) -> &mut Self {
        let size = self.doc.size();
        self.selection = Selection::new(selection.anchor.min(size), selection.head.min(size));
        self
    }

    /// Apply a step. On error the working document is unchanged.
    pub fn step(&mut self, step: Step) -> Result<&mut Self, TransformError> {
        let (map, inverse) = step.apply(&mut self.doc)?;
        self.selection = self.selection.map(&map);
        self.mapping.push(map);
        self.steps.push(step);
        self.inverted.push(inverse);
        Ok(self)
    }

    /// Replace `from..to` with `content`.
    pub fn replace(
        &mut self,
        from: usize,
        to: usize,
        content: Vec<Node>,
    ) -> Result<&mut Self, TransformError> {
        self.step(Step::Replace { from, to, content })
    }

    /// Delete `from..to`. Empty ranges are a no-op.
    pub fn delete(&mut self, from: usize, to: usize) -> Result<&mut Self, TransformError> {
        if from == to {
            return Ok(self);
        }
        self.step(Step::Delete { from, to })
    }

    /// Insert `content` at `pos`. Empty content is a no-op.
    pub fn insert(&mut self, pos: usize, content: Vec<Node>) -> Result<&mut Self, TransformError> {
        if content.is_empty() {
            return Ok(self);
        }
        self.step(Step::Insert { pos, content })
    }

    /// Fold another transaction that started from this one's result into it.
    pub fn absorb(&mut self, other: Transaction) {
        self.doc = other.doc;
        self.steps.extend(other.steps);
        self.inverted.extend(other.inverted);
        for map in other.mapping.maps {
            self.mapping.push(map);
        }
        self.selection = other.selection;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{HeadingId, Node, inline_text};
    use pretty_assertions::assert_eq;

    fn doc() -> Document {
        Document::new(vec![Node::heading(
            HeadingId::new("a"),
            1,
            inline_text("Title"),
            vec![Node::paragraph_text("body")],
        )])
    }

    #[test]
    fn test_step_map_assoc() {
        let insert = StepMap {
            from: 4,
            to: 4,
            inserted: 3,
        };
        assert_eq!(insert.map(4, Assoc::Before), 4);
        assert_eq!(insert.map(4, Assoc::After), 7);
        assert_eq!(insert.map(9, Assoc::Before), 12);

        let delete = StepMap {
            from: 2,
            to: 6,
            inserted: 0,
        };
        assert_eq!(delete.map(1, Assoc::After), 1);
        assert_eq!(delete.map(4, Assoc::After), 2);
        assert_eq!(delete.map(6, Assoc::Before), 2);
        assert_eq!(delete.map(10, Assoc::Before), 6);
    }

    #[test]
    fn test_inverse_steps_restore_document() {
        let original = doc();
        let mut tr = Transaction::new(&original, Selection::caret(3));
        tr.insert(3, vec![Node::text("XY")]).unwrap();
        tr.delete(12, 16).unwrap();
        assert_eq!(tr.doc().content()[0].title_text(), "TXYitle");
        assert_eq!(tr.selection(), Selection::caret(5));

        let mut undo = Transaction::new(tr.doc(), tr.selection());
        for inverse in tr.inverted().iter().rev() {
            undo.step(inverse.clone()).unwrap();
        }
        assert_eq!(undo.doc(), &original);
    }

    #[test]
    fn test_failed_step_leaves_document_untouched() {
        let original = doc();
        let mut tr = Transaction::new(&original, Selection::caret(0));
        assert!(tr.insert(2, vec![Node::paragraph_text("no")]).is_err());
        assert!(!tr.doc_changed());
        assert_eq!(tr.doc(), &original);
    }

    #[test]
    fn test_mapping_slice() {
        let mut tr = Transaction::new(&doc(), Selection::caret(0));
        tr.insert(3, vec![Node::text("a")]).unwrap();
        let checkpoint = tr.mapping().len();
        tr.insert(3, vec![Node::text("b")]).unwrap();
        assert_eq!(tr.mapping().map(5, Assoc::Before), 7);
        assert_eq!(tr.mapping().slice(checkpoint).map(5, Assoc::Before), 6);
    }
}
