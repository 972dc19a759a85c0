//! Deleting a selection that crosses heading boundaries.
//!
//! The affected region is flattened into reading order: every heading contributes its title,
//! every body block contributes itself. The textblock holding `from` keeps its type and identity
//! and absorbs what remains of the textblock holding `to`; everything in between goes. The
//! surviving items are then rebuilt into headings and placed back one at a time with
//! STACK-ATTACH, so headings that followed the deletion end up under whichever heading now
//! precedes them.

use tracing::{debug, info};

use crate::ancestor::attach_heading;
use crate::error::EngineError;
use crate::model::{HeadingId, HeadingLayout, Node, NodeKind, slice_inline};
use crate::transform::{Assoc, Selection, Transaction};

/// One entry of the flattened region.
#[derive(Debug, Clone)]
enum FlatItem {
    Title {
        id: HeadingId,
        level: u8,
        inline: Vec<Node>,
        content_start: usize,
    },
    Block {
        node: Node,
        start: usize,
    },
}

impl FlatItem {
    fn inline(&self) -> &[Node] {
        match self {
            FlatItem::Title { inline, .. } => inline,
            FlatItem::Block { node, .. } => node.content(),
        }
    }

    /// Absolute position of the first inline position.
    fn content_start(&self) -> usize {
        match self {
            FlatItem::Title { content_start, .. } => *content_start,
            FlatItem::Block { start, .. } => start + 1,
        }
    }

    /// Whether this item is exactly the textblock whose content starts at `textblock_start`.
    fn is_textblock_at(&self, textblock_start: usize) -> bool {
        match self {
            FlatItem::Title { content_start, .. } => *content_start == textblock_start,
            FlatItem::Block { node, start } => {
                matches!(node.kind(), NodeKind::Paragraph) && start + 1 == textblock_start
            }
        }
    }

    fn with_inline(self, inline: Vec<Node>) -> Self {
        match self {
            FlatItem::Title {
                id,
                level,
                content_start,
                ..
            } => FlatItem::Title {
                id,
                level,
                inline,
                content_start,
            },
            FlatItem::Block { start, .. } => FlatItem::Block {
                node: Node::paragraph(inline),
                start,
            },
        }
    }
}

fn flatten(node: &Node, start: usize, out: &mut Vec<FlatItem>) {
    let (Some(id), Some(level), Some(layout)) = (
        node.heading_id(),
        node.heading_level(),
        HeadingLayout::of(node, start),
    ) else {
        out.push(FlatItem::Block {
            node: node.clone(),
            start,
        });
        return;
    };

    out.push(FlatItem::Title {
        id: id.clone(),
        level,
        inline: node.title_inline().to_vec(),
        content_start: layout.title_content_start,
    });
    let mut pos = layout.body_content_start;
    for child in node.body_node().map(Node::content).unwrap_or(&[]) {
        flatten(child, pos, out);
        pos += child.node_size();
    }
}

/// Where the merged textblock ended up after regrouping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MergedAt {
    Leading(usize),
    Title(usize),
    Body(usize, usize),
}

/// Delete the selection of `tr` when it spans more than one textblock.
///
/// Returns `false` without touching the transaction when the selection is empty, lies within one
/// textblock, or has an end outside a title or a top-level body paragraph; the caller falls back
/// to a plain deletion.
pub fn delete_range(tr: &mut Transaction) -> Result<bool, EngineError> {
    let selection = tr.selection();
    let (from, to) = (selection.from(), selection.to());
    if from == to {
        return Ok(false);
    }

    let doc = tr.doc().clone();
    let rf = doc.resolve(from)?;
    let rt = doc.resolve(to)?;
    if !rf.parent().kind().is_textblock() || !rt.parent().kind().is_textblock() {
        debug!(from, to, "range deletion endpoints are not in textblocks");
        return Ok(false);
    }
    let (from_block, to_block) = (rf.start(rf.depth()), rt.start(rt.depth()));
    if from_block == to_block {
        return Ok(false);
    }

    let shared = (0..=rf.depth().min(rt.depth()))
        .take_while(|&d| rf.start(d) == rt.start(d))
        .last()
        .unwrap_or(0);
    let Some(scope) = (0..=shared).rev().find(|&d| {
        matches!(
            rf.node(d).kind(),
            NodeKind::ContentWrapper | NodeKind::Doc
        )
    }) else {
        return Ok(false);
    };

    let container = rf.node(scope);
    let (first, last) = (rf.index(scope), rt.index(scope));
    let region_start = rf.before(scope + 1);
    let region_end = rt.after(scope + 1);

    let mut items = Vec::new();
    let mut pos = region_start;
    for child in &container.content()[first..=last] {
        flatten(child, pos, &mut items);
        pos += child.node_size();
    }

    let ia = items.iter().position(|item| item.is_textblock_at(from_block));
    let ib = items.iter().position(|item| item.is_textblock_at(to_block));
    let (Some(ia), Some(ib)) = (ia, ib) else {
        debug!(from, to, "range deletion inside nested blocks is left to the default handler");
        return Ok(false);
    };

    let head = &items[ia];
    let tail = &items[ib];
    let mut inline = slice_inline(head.inline(), 0, from - head.content_start());
    let left_len: usize = inline.iter().map(Node::node_size).sum();
    let tail_offset = to - tail.content_start();
    let tail_size: usize = tail.inline().iter().map(Node::node_size).sum();
    inline.extend(slice_inline(tail.inline(), tail_offset, tail_size));
    let merged = items[ia].clone().with_inline(inline);

    let removed_headings = items[ia + 1..=ib]
        .iter()
        .filter(|item| matches!(item, FlatItem::Title { .. }))
        .count();
    let survivors = items[..ia]
        .iter()
        .cloned()
        .chain(std::iter::once(merged))
        .chain(items[ib + 1..].iter().cloned());

    let mut leading: Vec<Node> = Vec::new();
    let mut flat: Vec<Node> = Vec::new();
    let mut merged_at = None;
    for (index, item) in survivors.enumerate() {
        let is_merged = index == ia;
        match item {
            FlatItem::Title {
                id, level, inline, ..
            } => {
                if is_merged {
                    merged_at = Some(MergedAt::Title(flat.len()));
                }
                flat.push(Node::heading(id, level, inline, Vec::new()));
            }
            FlatItem::Block { node, .. } => {
                let last = flat.len().checked_sub(1);
                match last.zip(flat.last_mut()) {
                    Some((k, heading)) => {
                        if is_merged {
                            merged_at = Some(MergedAt::Body(k, heading.plain_blocks().len()));
                        }
                        heading.push_plain_block(node);
                    }
                    None => {
                        if is_merged {
                            merged_at = Some(MergedAt::Leading(leading.len()));
                        }
                        leading.push(node);
                    }
                }
            }
        }
    }

    tr.delete(region_start, region_end)?;

    let mut caret = None;
    if let Some(MergedAt::Leading(j)) = merged_at {
        let before: usize = leading[..j].iter().map(Node::node_size).sum();
        caret = Some(region_start + before + 1 + left_len);
    }
    let leading_size: usize = leading.iter().map(Node::node_size).sum();
    tr.insert(region_start, leading)?;

    let mut caret_step = tr.mapping().len();
    let mut anchor = region_start + leading_size;
    for (k, node) in flat.into_iter().enumerate() {
        let offset = match merged_at {
            Some(MergedAt::Title(t)) if t == k => Some(2 + left_len),
            Some(MergedAt::Body(t, j)) if t == k => HeadingLayout::of(&node, 0).map(|layout| {
                let before: usize = node.plain_blocks()[..j].iter().map(Node::node_size).sum();
                layout.body_content_start + before + 1 + left_len
            }),
            _ => None,
        };
        let size = node.node_size();
        let at = attach_heading(tr, node, anchor)?;
        if let Some(offset) = offset {
            caret = Some(at + offset);
            caret_step = tr.mapping().len();
        }
        anchor = at + size;
    }

    let caret = caret.map_or(region_start, |pos| {
        tr.mapping().slice(caret_step).map(pos, Assoc::Before)
    });
    tr.set_selection(Selection::caret(caret));
    info!(from, to, removed_headings, "cross-boundary range deleted");
    Ok(true)
}
