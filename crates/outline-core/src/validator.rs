//! Post-edit hierarchy validator.
//!
//! Scans for level-1 headings nested in another heading and for children whose level does not
//! exceed their parent's, and repairs them by moving the offending heading right after the
//! heading it escapes from. Repairs run in passes until a scan comes back clean, capped at a
//! fixed number of passes.

use tracing::{debug, error, info, warn};

use crate::block_map::{BlockInfo, document_block_map};
use crate::config::EngineConfig;
use crate::model::Document;
use crate::transform::{Assoc, EditOrigin, Selection, Transaction};

/// Kind of hierarchy violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViolationKind {
    /// A level-1 heading inside another heading's body.
    H1Nested,
    /// A child heading whose level is not deeper than its parent's.
    InvalidChildLevel,
}

/// A violation and where its repair moves the heading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// What is wrong.
    pub kind: ViolationKind,
    /// The offending heading.
    pub heading: BlockInfo,
    /// Position the heading is moved to, in scan coordinates.
    pub target: usize,
}

/// Every violation in `doc`, in document order.
pub fn find_violations(doc: &Document) -> Vec<Violation> {
    let mut violations = Vec::new();
    let mut ancestors: Vec<BlockInfo> = Vec::new();
    for entry in document_block_map(doc) {
        while ancestors.last().is_some_and(|top| entry.start >= top.end) {
            ancestors.pop();
        }
        if let Some(parent) = ancestors.last() {
            if entry.level == 1 {
                let escape = ancestors
                    .iter()
                    .rev()
                    .find(|a| a.level == 1)
                    .unwrap_or(&ancestors[0]);
                violations.push(Violation {
                    kind: ViolationKind::H1Nested,
                    heading: entry.clone(),
                    target: escape.end,
                });
            } else if entry.level <= parent.level {
                violations.push(Violation {
                    kind: ViolationKind::InvalidChildLevel,
                    heading: entry.clone(),
                    target: parent.end,
                });
            }
        }
        ancestors.push(entry);
    }
    violations
}

/// Runs repair passes over a document.
#[derive(Debug, Clone)]
pub struct HierarchyValidator {
    max_iterations: usize,
}

impl Default for HierarchyValidator {
    fn default() -> Self {
        Self::new(&EngineConfig::default())
    }
}

impl HierarchyValidator {
    /// Validator using the pass cap from `config`.
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            max_iterations: config.max_repair_iterations,
        }
    }

    /// The repaired document, or `None` when `doc` has no violations.
    pub fn validate(&self, doc: &Document) -> Option<Document> {
        self.repair(doc, Selection::default())
            .map(|tr| tr.doc().clone())
    }

    /// A repair transaction tagged [`EditOrigin::Validator`], or `None` when nothing changed.
    pub fn repair(&self, doc: &Document, selection: Selection) -> Option<Transaction> {
        let mut tr = Transaction::new(doc, selection).with_origin(EditOrigin::Validator);
        for pass in 0..self.max_iterations {
            let violations = find_violations(tr.doc());
            if violations.is_empty() {
                return finish(tr, pass);
            }
            debug!(pass, count = violations.len(), "repairing hierarchy");
            if !fix_pass(&mut tr, &violations) {
                return finish(tr, pass);
            }
        }

        if !find_violations(tr.doc()).is_empty() {
            error!(
                passes = self.max_iterations,
                "hierarchy still invalid after the repair cap, giving up"
            );
        }
        finish(tr, self.max_iterations)
    }
}

fn finish(tr: Transaction, passes: usize) -> Option<Transaction> {
    if !tr.doc_changed() {
        return None;
    }
    info!(passes, steps = tr.steps().len(), "hierarchy repaired");
    Some(tr)
}

/// Fix every violation that does not sit inside another one being fixed in this pass. Returns
/// `false` when no repair could be applied.
fn fix_pass(tr: &mut Transaction, violations: &[Violation]) -> bool {
    let mut chosen: Vec<&Violation> = Vec::new();
    for violation in violations {
        let nested = chosen.iter().any(|c| {
            c.heading.start <= violation.heading.start && violation.heading.end <= c.heading.end
        });
        if !nested {
            chosen.push(violation);
        }
    }

    let checkpoint = tr.mapping().len();
    let mut applied = 0;
    for violation in chosen {
        let mut attempt = tr.clone();
        match relocate(&mut attempt, violation, checkpoint) {
            Ok(()) => {
                *tr = attempt;
                applied += 1;
            }
            Err(err) => warn!(id = %violation.heading.id, %err, "hierarchy repair skipped"),
        }
    }
    applied > 0
}

fn relocate(
    tr: &mut Transaction,
    violation: &Violation,
    checkpoint: usize,
) -> Result<(), crate::error::TransformError> {
    let mapping = tr.mapping().slice(checkpoint);
    let from = mapping.map(violation.heading.start, Assoc::After);
    let to = mapping.map(violation.heading.end, Assoc::Before);
    let Some(node) = tr.doc().node_at(from).cloned() else {
        return Err(crate::error::TransformError::PositionOutOfBounds {
            pos: from,
            size: tr.doc().size(),
        });
    };
    tr.delete(from, to)?;
    let target = tr
        .mapping()
        .slice(checkpoint)
        .map(violation.target, Assoc::After);
    tr.insert(target, vec![node])?;
    debug!(
        id = %violation.heading.id,
        kind = ?violation.kind,
        from,
        target,
        "heading relocated"
    );
    Ok(())
}
