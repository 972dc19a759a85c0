//! Level transitions: retargeting a heading to another level, and wrapping a body paragraph into
//! a new heading.
//!
//! Every transition follows the same shape. The heading is cut out of the document together with
//! the headings that read as its content after the change (its own nested headings, plus the
//! deeper headings that follow it up to the first one at or above the new level, unless a wrapped
//! paragraph stays inside its owner's body). The heading is
//! then reinserted where STACK-ATTACH places it, and the carried headings are re-threaded one at
//! a time from the position right after it. Positions computed before the cut are carried forward
//! through the transaction mapping.
//!
//! The result preserves the outline's reading order, which is what makes a promote followed by
//! the matching demote restore the original structure.

use std::ops::Range;

use tracing::{debug, info, warn};

use crate::ancestor::{attach_heading, find_prev_block, root_insertion_point};
use crate::block_map::{BlockInfo, heading_block_map, open_spine};
use crate::config::EngineConfig;
use crate::error::{EngineError, LocateError};
use crate::locate::{BlockDescriptor, PositionContext, blocks_in_range, heading_at, position_context};
use crate::model::{Document, HeadingId, HeadingLayout, MIN_LEVEL, Node, NodeKind};
use crate::session::IdGenerator;
use crate::transform::{Assoc, Selection, Transaction};

/// Which placement path a level change takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionKind {
    /// Deeper level, placed by STACK-ATTACH.
    Forward,
    /// Shallower level above 1, placed by STACK-ATTACH.
    Backward,
    /// Level 1: never nested, placed after the root heading it came from.
    Root,
}

/// Classify a change from `current` to `target`. `None` when the level does not change.
pub fn transition_kind(current: u8, target: u8) -> Option<TransitionKind> {
    match target {
        t if t == current => None,
        1 => Some(TransitionKind::Root),
        t if t > current => Some(TransitionKind::Forward),
        _ => Some(TransitionKind::Backward),
    }
}

/// Result of [`change_heading_level`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransitionOutcome {
    /// The heading now starts at `pos` with the requested level.
    Moved {
        /// Identifier of the moved heading (unchanged by the move).
        id: HeadingId,
        /// Position before the heading after the move.
        pos: usize,
    },
    /// The heading already had the requested level.
    Unchanged,
    /// The first heading of the document cannot go deeper than level 1.
    Pinned,
}

/// A heading on its way to a new position.
struct Relocation {
    /// The heading to place, without nested headings.
    node: Node,
    /// Pre-edit range the heading (or the wrapped paragraph) is cut from.
    vacated: Range<usize>,
    /// Former nested headings, re-threaded after the heading is placed.
    carried: Vec<Node>,
    /// Whether deeper headings after `vacated` move into the placed heading. Off when the heading
    /// lands inside the body it was cut from, so those headings keep their owner.
    gather_trailing: bool,
}

/// Change the level of the heading starting at `heading_pos` to `target`.
///
/// The caret ends at the end of the moved heading's title.
pub fn change_heading_level(
    tr: &mut Transaction,
    heading_pos: usize,
    target: u8,
    config: &EngineConfig,
) -> Result<TransitionOutcome, EngineError> {
    let target = target.clamp(MIN_LEVEL, config.level_cap());
    let doc = tr.doc().clone();
    let heading = heading_at(&doc, heading_pos).ok_or(EngineError::HeadingNotFound {
        pos: heading_pos,
    })?;
    let node = doc.node_at(heading.start).ok_or(EngineError::HeadingNotFound {
        pos: heading_pos,
    })?;

    let Some(kind) = transition_kind(heading.level, target) else {
        return Ok(TransitionOutcome::Unchanged);
    };
    if target > 1 && heading.start == 0 {
        debug!(id = %heading.id, target, "first heading is pinned to the top level");
        return Ok(TransitionOutcome::Pinned);
    }

    let mut moved = node.without_child_headings();
    moved.set_heading_level(target);
    let relocation = Relocation {
        node: moved,
        vacated: heading.start..heading.end,
        carried: node.child_headings().cloned().collect(),
        gather_trailing: true,
    };

    let pos = relocate(tr, &doc, relocation, target, kind == TransitionKind::Root)?;
    tr.set_selection(Selection::caret(title_end(tr.doc(), pos)));
    info!(
        id = %heading.id,
        from = heading.level,
        to = target,
        ?kind,
        pos,
        "heading level changed"
    );
    Ok(TransitionOutcome::Moved {
        id: heading.id,
        pos,
    })
}

/// Turn the body paragraph holding the selection into a new heading at `target`.
///
/// The new heading takes the paragraph's inline content as its title and the plain blocks that
/// followed the paragraph as its body. A heading deeper than the body's owner stops there; the
/// owner's nested headings stay where they are. Returns `false` (and leaves the transaction untouched) for
/// selections in a title, outside a body paragraph, or spanning headings.
pub fn wrap_as_heading(
    tr: &mut Transaction,
    target: u8,
    config: &EngineConfig,
    ids: &mut IdGenerator,
) -> Result<bool, EngineError> {
    let target = target.clamp(MIN_LEVEL, config.level_cap());
    let doc = tr.doc().clone();
    let selection = tr.selection();

    let blocks = match blocks_in_range(&doc, selection.from(), selection.to()) {
        Ok(blocks) => blocks,
        Err(LocateError::InsideTitle { pos }) => {
            debug!(pos, "wrap requested inside a title");
            return Ok(false);
        }
        Err(err) => return Err(err.into()),
    };
    if blocks.iter().any(BlockDescriptor::is_heading) {
        warn!(
            from = selection.from(),
            to = selection.to(),
            "wrapping a selection that spans headings is not supported"
        );
        return Ok(false);
    }

    let PositionContext::Body {
        heading: owner_info,
        block: Some((block_start, _)),
    } = position_context(&doc, selection.from())?
    else {
        debug!(pos = selection.from(), "wrap requested outside a body block");
        return Ok(false);
    };
    let Some(paragraph) = doc
        .node_at(block_start)
        .filter(|n| matches!(n.kind(), NodeKind::Paragraph))
    else {
        debug!(pos = block_start, "only paragraphs can become headings");
        return Ok(false);
    };
    let owner = doc.node_at(owner_info.start).ok_or(EngineError::HeadingNotFound {
        pos: owner_info.start,
    })?;
    let layout = HeadingLayout::of(owner, owner_info.start).ok_or(EngineError::NotAHeading)?;

    let mut pos = layout.body_content_start;
    let mut body = Vec::new();
    for block in owner.plain_blocks() {
        if pos > block_start {
            body.push(block.clone());
        }
        pos += block.node_size();
    }
    if body.is_empty() {
        body.push(Node::paragraph(Vec::new()));
    }

    let id = ids.next_id();
    let relocation = Relocation {
        node: Node::heading(id.clone(), target, paragraph.content().to_vec(), body),
        vacated: block_start..layout.plain_end,
        carried: Vec::new(),
        gather_trailing: target <= owner_info.level,
    };
    let pos = relocate(tr, &doc, relocation, target, target == 1)?;
    tr.set_selection(Selection::caret(title_end(tr.doc(), pos)));
    info!(%id, level = target, parent = %owner_info.id, "paragraph wrapped into heading");
    Ok(true)
}

/// Apply `target` at the selection head: retarget the heading when the head is in a title, wrap
/// the paragraph when it is in a body. Returns `false` when nothing applies.
pub fn set_heading_level(
    tr: &mut Transaction,
    target: u8,
    config: &EngineConfig,
    ids: &mut IdGenerator,
) -> Result<bool, EngineError> {
    match position_context(tr.doc(), tr.selection().head)? {
        PositionContext::Title { heading } => {
            let outcome = change_heading_level(tr, heading.start, target, config)?;
            Ok(outcome != TransitionOutcome::Unchanged)
        }
        PositionContext::Body { .. } => wrap_as_heading(tr, target, config, ids),
        PositionContext::Root => Ok(false),
    }
}

/// Move the heading at the selection to a deeper `level`, or wrap the paragraph at the selection.
pub fn promote(
    tr: &mut Transaction,
    level: u8,
    config: &EngineConfig,
    ids: &mut IdGenerator,
) -> Result<bool, EngineError> {
    directed(tr, level, config, ids, |current, level| level > current)
}

/// Move the heading at the selection to a shallower `level`, or wrap the paragraph at the
/// selection.
pub fn demote(
    tr: &mut Transaction,
    level: u8,
    config: &EngineConfig,
    ids: &mut IdGenerator,
) -> Result<bool, EngineError> {
    directed(tr, level, config, ids, |current, level| level < current)
}

fn directed(
    tr: &mut Transaction,
    level: u8,
    config: &EngineConfig,
    ids: &mut IdGenerator,
    allowed: impl Fn(u8, u8) -> bool,
) -> Result<bool, EngineError> {
    if let PositionContext::Title { heading } = position_context(tr.doc(), tr.selection().head)?
        && !allowed(heading.level, level)
    {
        debug!(current = heading.level, level, "level change goes the wrong way");
        return Ok(false);
    }
    set_heading_level(tr, level, config, ids)
}

/// End of the title content of the heading starting at `pos`.
pub(crate) fn title_end(doc: &Document, pos: usize) -> usize {
    doc.node_at(pos)
        .and_then(|node| HeadingLayout::of(node, pos))
        .map_or(pos, |layout| layout.title_content_end)
}

/// Cut, place, and re-thread. `doc` is the document before any of this relocation's steps.
fn relocate(
    tr: &mut Transaction,
    doc: &Document,
    relocation: Relocation,
    target: u8,
    root: bool,
) -> Result<usize, EngineError> {
    let anchor = relocation.vacated.start;
    let spine = open_spine(&heading_block_map(doc, 0, anchor), anchor);
    let ancestors: Vec<&BlockInfo> = spine.iter().filter(|b| b.contains(anchor)).collect();
    let scope = if root {
        None
    } else {
        placement_scope(&spine, target, anchor)?
    };
    let trailing = if relocation.gather_trailing {
        trailing_headings(
            doc,
            &ancestors,
            scope.as_ref(),
            relocation.vacated.end,
            target,
        )
    } else {
        Vec::new()
    };

    let mut ranges = vec![relocation.vacated.clone()];
    for (info, _) in &trailing {
        match ranges.last_mut() {
            Some(last) if last.end == info.start => last.end = info.end,
            _ => ranges.push(info.start..info.end),
        }
    }

    let checkpoint = tr.mapping().len();
    for range in &ranges {
        let mapping = tr.mapping().slice(checkpoint);
        tr.delete(
            mapping.map(range.start, Assoc::After),
            mapping.map(range.end, Assoc::Before),
        )?;
    }
    let anchor = tr.mapping().slice(checkpoint).map(anchor, Assoc::Before);

    let size = relocation.node.node_size();
    let pos = if root {
        let at = root_insertion_point(tr.doc(), anchor);
        tr.insert(at, vec![relocation.node])?;
        at
    } else {
        attach_heading(tr, relocation.node, anchor)?
    };
    debug!(
        anchor,
        pos,
        carried = relocation.carried.len(),
        trailing = trailing.len(),
        "heading placed"
    );

    let placed = tr.mapping().len();
    let mut cursor = pos + size;
    let rethread = relocation
        .carried
        .into_iter()
        .chain(trailing.into_iter().map(|(_, node)| node.clone()));
    for node in rethread {
        let size = node.node_size();
        cursor = attach_heading(tr, node, cursor)? + size;
    }
    Ok(tr.mapping().slice(placed).map(pos, Assoc::Before))
}

/// The heading whose body bounds the trailing-heading walk: the STACK-ATTACH parent when it
/// contains `anchor`, otherwise the innermost heading containing `anchor`. `None` means the
/// document root.
fn placement_scope(
    spine: &[BlockInfo],
    target: u8,
    anchor: usize,
) -> Result<Option<BlockInfo>, EngineError> {
    let attachment = find_prev_block(spine, target)?;
    if attachment.should_nest && attachment.parent.contains(anchor) {
        return Ok(Some(attachment.parent));
    }
    Ok(spine.iter().rev().find(|b| b.contains(anchor)).cloned())
}

/// Headings after `after` that read as content of a heading at `target`: following siblings in
/// each enclosing body, innermost first, up to `scope`, stopping at the first heading whose level
/// is `target` or shallower.
fn trailing_headings<'d>(
    doc: &'d Document,
    ancestors: &[&BlockInfo],
    scope: Option<&BlockInfo>,
    after: usize,
    target: u8,
) -> Vec<(BlockInfo, &'d Node)> {
    let mut out = Vec::new();
    let mut cursor = after;
    let mut containers: Vec<Option<&BlockInfo>> =
        ancestors.iter().rev().map(|b| Some(*b)).collect();
    if scope.is_none() {
        containers.push(None);
    }

    for container in containers {
        for (info, node) in child_headings(doc, container) {
            if info.start < cursor {
                continue;
            }
            if info.level <= target {
                return out;
            }
            out.push((info, node));
        }
        match container {
            Some(c) if scope.is_some_and(|s| s.start == c.start) => return out,
            Some(c) => cursor = c.end,
            None => {}
        }
    }
    out
}

fn child_headings<'d>(
    doc: &'d Document,
    container: Option<&BlockInfo>,
) -> Vec<(BlockInfo, &'d Node)> {
    let (children, mut pos, depth) = match container {
        None => (doc.content(), 0, 0),
        Some(c) => {
            let Some((node, layout)) = doc
                .node_at(c.start)
                .and_then(|node| Some((node, HeadingLayout::of(node, c.start)?)))
            else {
                return Vec::new();
            };
            let body = node.body_node().map(Node::content).unwrap_or(&[]);
            (body, layout.body_content_start, c.depth + 1)
        }
    };

    let mut out = Vec::new();
    for child in children {
        let start = pos;
        pos += child.node_size();
        if let Some(info) = BlockInfo::of(child, start, depth) {
            out.push((info, child));
        }
    }
    out
}
