//! Per-document session state: heading fold state, the single-flight guard for structural
//! operations, and the heading identifier generator.

use std::collections::BTreeSet;

use tracing::{debug, warn};

use crate::error::EngineError;
use crate::model::{Document, HeadingId};

/// Which headings are collapsed. Headings are expanded unless listed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FoldState {
    collapsed: BTreeSet<HeadingId>,
}

impl FoldState {
    /// All headings expanded.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `id` is collapsed.
    pub fn is_collapsed(&self, id: &HeadingId) -> bool {
        self.collapsed.contains(id)
    }

    /// Collapse `id`. Returns `false` if it already was.
    pub fn collapse(&mut self, id: &HeadingId) -> bool {
        self.collapsed.insert(id.clone())
    }

    /// Expand `id`. Returns `false` if it already was.
    pub fn expand(&mut self, id: &HeadingId) -> bool {
        self.collapsed.remove(id)
    }

    /// Flip `id`, returning the new collapsed state.
    pub fn toggle(&mut self, id: &HeadingId) -> bool {
        if self.expand(id) {
            false
        } else {
            self.collapse(id)
        }
    }

    /// Collapse every heading of `doc`.
    pub fn collapse_all(&mut self, doc: &Document) {
        self.collapsed.extend(doc.heading_ids());
    }

    /// Expand everything.
    pub fn expand_all(&mut self) {
        self.collapsed.clear();
    }

    /// Forget headings that no longer exist in `doc`.
    pub fn retain_existing(&mut self, doc: &Document) {
        let live: BTreeSet<HeadingId> = doc.heading_ids().into_iter().collect();
        self.collapsed.retain(|id| live.contains(id));
    }

    /// Collapsed headings, in identifier order.
    pub fn collapsed(&self) -> impl Iterator<Item = &HeadingId> {
        self.collapsed.iter()
    }

    /// Number of collapsed headings.
    pub fn len(&self) -> usize {
        self.collapsed.len()
    }

    /// `true` when nothing is collapsed.
    pub fn is_empty(&self) -> bool {
        self.collapsed.is_empty()
    }
}

/// Generates heading identifiers as `prefix` followed by a counter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdGenerator {
    prefix: String,
    next: u64,
}

impl IdGenerator {
    /// Generator starting at `{prefix}1`.
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            next: 1,
        }
    }

    /// A fresh identifier.
    pub fn next_id(&mut self) -> HeadingId {
        let id = HeadingId::new(format!("{}{}", self.prefix, self.next));
        self.next += 1;
        id
    }

    /// Skip past identifiers of the form `{prefix}N` already used in `doc`.
    pub fn observe(&mut self, doc: &Document) {
        let highest = doc
            .heading_ids()
            .iter()
            .filter_map(|id| id.as_str().strip_prefix(self.prefix.as_str())?.parse::<u64>().ok())
            .max();
        if let Some(highest) = highest {
            self.next = self.next.max(highest + 1);
        }
    }
}

/// Session state tied to one open document.
#[derive(Debug, Clone)]
pub struct Session {
    document_key: String,
    fold: FoldState,
    in_progress: bool,
    ids: IdGenerator,
}

impl Session {
    /// Fresh session for the document identified by `document_key`.
    pub fn new(document_key: impl Into<String>, id_prefix: &str) -> Self {
        Self {
            document_key: document_key.into(),
            fold: FoldState::new(),
            in_progress: false,
            ids: IdGenerator::new(id_prefix),
        }
    }

    /// Key of the current document.
    pub fn document_key(&self) -> &str {
        &self.document_key
    }

    /// Switch to another document, dropping fold state and any stale guard.
    pub fn reset(&mut self, document_key: impl Into<String>) {
        self.document_key = document_key.into();
        self.fold.expand_all();
        self.in_progress = false;
        debug!(document = %self.document_key, "session reset");
    }

    /// Whether a structural operation is running.
    pub fn in_progress(&self) -> bool {
        self.in_progress
    }

    /// Run `f` unless another structural operation is already running.
    pub fn single_flight<R>(&mut self, f: impl FnOnce(&mut Self) -> R) -> Result<R, EngineError> {
        if self.in_progress {
            warn!(document = %self.document_key, "structural operation rejected: busy");
            return Err(EngineError::Busy);
        }
        self.in_progress = true;
        let result = f(self);
        self.in_progress = false;
        Ok(result)
    }

    /// Fold state.
    pub fn fold(&self) -> &FoldState {
        &self.fold
    }

    /// Mutable fold state.
    pub fn fold_mut(&mut self) -> &mut FoldState {
        &mut self.fold
    }

    /// Identifier generator.
    pub fn ids_mut(&mut self) -> &mut IdGenerator {
        &mut self.ids
    }
}
