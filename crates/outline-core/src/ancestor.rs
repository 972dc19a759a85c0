//! STACK-ATTACH: choosing the parent of a heading from the headings that precede it.
//!
//! The rule mirrors how a reader nests an outline: a heading belongs under the most recent
//! heading with a smaller level. When nothing shallower precedes it, it becomes a sibling of the
//! most recent heading instead.

use tracing::{debug, error};

use crate::block_map::{BlockInfo, heading_block_map, open_spine};
use crate::error::EngineError;
use crate::model::{Document, Node};
use crate::transform::Transaction;

/// Where an incoming heading attaches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    /// The heading found by the scan.
    pub parent: BlockInfo,
    /// `true` to nest inside `parent`, `false` to follow it as a sibling.
    pub should_nest: bool,
}

/// Scan `block_map` from the end for the nearest heading shallower than `incoming_level`.
///
/// Falls back to the last entry with `should_nest = false`. An empty map is a caller error.
pub fn find_prev_block(
    block_map: &[BlockInfo],
    incoming_level: u8,
) -> Result<Attachment, EngineError> {
    let Some(last) = block_map.last() else {
        error!(incoming_level, "ancestor lookup on an empty block map");
        return Err(EngineError::EmptyBlockMap);
    };

    let attachment = match block_map.iter().rev().find(|b| b.level < incoming_level) {
        Some(parent) => Attachment {
            parent: parent.clone(),
            should_nest: true,
        },
        None => Attachment {
            parent: last.clone(),
            should_nest: false,
        },
    };
    Ok(attachment)
}

/// Insertion position for a heading attached per `attachment`, given the spine at `anchor`.
///
/// A nesting parent that still contains `anchor` receives the heading at `anchor`, unless a
/// deeper spine entry also contains it; then the heading follows that entry so it does not land
/// inside a heading of the wrong level. A parent that already closed receives the heading at the
/// end of its body. A sibling attachment inserts after the parent.
pub fn insertion_point(spine: &[BlockInfo], attachment: &Attachment, anchor: usize) -> usize {
    let parent = &attachment.parent;
    if !attachment.should_nest {
        return parent.end;
    }
    if parent.contains(anchor) {
        return spine
            .iter()
            .find(|b| b.start > parent.start && b.contains(anchor))
            .map_or(anchor, |child| child.end);
    }
    parent.body_end()
}

/// Insertion position for a level-1 heading: after the root heading containing `anchor`, or at
/// `anchor` when it sits between root headings.
pub fn root_insertion_point(doc: &Document, anchor: usize) -> usize {
    let mut pos = 0;
    for child in doc.content() {
        let end = pos + child.node_size();
        if pos < anchor && anchor < end {
            return end;
        }
        pos = end;
    }
    anchor.min(pos)
}

/// Insert `node` where STACK-ATTACH places a heading arriving at `anchor`. Returns the position
/// the heading was inserted at.
pub fn attach_heading(
    tr: &mut Transaction,
    node: Node,
    anchor: usize,
) -> Result<usize, EngineError> {
    let level = node.heading_level().ok_or(EngineError::NotAHeading)?;
    let map = heading_block_map(tr.doc(), 0, anchor);
    let spine = open_spine(&map, anchor);
    let pos = if level == 1 || spine.is_empty() {
        // Nothing precedes the anchor, so there is no parent to attach to.
        root_insertion_point(tr.doc(), anchor)
    } else {
        let attachment = find_prev_block(&spine, level)?;
        insertion_point(&spine, &attachment, anchor)
    };
    debug!(level, anchor, pos, "attaching heading");
    tr.insert(pos, vec![node])?;
    Ok(pos)
}

/// Nest a flat, reading-ordered list of headings by level. Each heading is attached under the
/// most recent shallower heading; headings with nothing shallower before them become roots.
pub fn nest_flat_headings(flat: Vec<Node>) -> Vec<Node> {
    fn close(done: Node, stack: &mut [Node], roots: &mut Vec<Node>) {
        match stack.last_mut() {
            Some(parent) => parent.push_child_heading(done),
            None => roots.push(done),
        }
    }

    let mut roots = Vec::new();
    let mut stack: Vec<Node> = Vec::new();
    for node in flat {
        let level = node.heading_level().unwrap_or(1);
        while let Some(top) = stack.pop_if(|top| top.heading_level().unwrap_or(1) >= level) {
            close(top, &mut stack, &mut roots);
        }
        stack.push(node);
    }
    while let Some(top) = stack.pop() {
        close(top, &mut stack, &mut roots);
    }
    roots
}
