//! Clipboard structurer: turns a pasted fragment into loose paragraphs plus nested headings,
//! shifts the heading levels to fit the paste target, and inserts the result.

use tracing::{debug, info};

use crate::ancestor::{attach_heading, nest_flat_headings, root_insertion_point};
use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::locate::{PositionContext, enclosing_heading, position_context};
use crate::model::{HeadingLayout, MAX_LEVEL, MIN_LEVEL, Node, NodeKind, slice_inline};
use crate::range_delete::delete_range;
use crate::session::IdGenerator;
use crate::transform::{Assoc, Selection, Transaction};
use crate::transition::title_end;

/// A pasted fragment split into its structural parts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StructuredClipboard {
    /// Blocks that came before the first heading title.
    pub paragraphs: Vec<Node>,
    /// Headings, nested by level.
    pub headings: Vec<Node>,
}

impl StructuredClipboard {
    /// `true` when the fragment held nothing usable.
    pub fn is_empty(&self) -> bool {
        self.paragraphs.is_empty() && self.headings.is_empty()
    }
}

enum ClipItem {
    Title { level: u8, inline: Vec<Node> },
    Block(Node),
}

fn flatten(node: &Node, out: &mut Vec<ClipItem>) {
    match node.kind() {
        NodeKind::Heading { level, .. } => {
            out.push(ClipItem::Title {
                level: *level,
                inline: node.title_inline().to_vec(),
            });
            for child in node.body_node().map(Node::content).unwrap_or(&[]) {
                flatten(child, out);
            }
        }
        NodeKind::ContentHeading { level } => out.push(ClipItem::Title {
            level: *level,
            inline: node.content().to_vec(),
        }),
        NodeKind::ContentWrapper | NodeKind::Doc => {
            node.content().iter().for_each(|child| flatten(child, out));
        }
        NodeKind::ListItem => out.push(ClipItem::Block(Node::bullet_list(vec![node.clone()]))),
        _ => out.push(ClipItem::Block(node.clone())),
    }
}

/// Split a fragment into loose paragraphs and nested headings.
///
/// Headings and titles in the fragment start new heading accumulators (with fresh identifiers);
/// the blocks that follow a title become that heading's body. Runs of loose inline nodes are
/// wrapped in a paragraph.
pub fn transform(fragment: &[Node], ids: &mut IdGenerator) -> StructuredClipboard {
    let mut items = Vec::new();
    let mut inline_run: Vec<Node> = Vec::new();
    for node in fragment {
        if node.is_text() {
            inline_run.push(node.clone());
            continue;
        }
        if !inline_run.is_empty() {
            items.push(ClipItem::Block(Node::paragraph(std::mem::take(&mut inline_run))));
        }
        flatten(node, &mut items);
    }
    if !inline_run.is_empty() {
        items.push(ClipItem::Block(Node::paragraph(inline_run)));
    }

    let mut paragraphs = Vec::new();
    let mut flat: Vec<Node> = Vec::new();
    for item in items {
        match item {
            ClipItem::Title { level, inline } => flat.push(Node::heading(
                ids.next_id(),
                level.clamp(MIN_LEVEL, MAX_LEVEL),
                inline,
                Vec::new(),
            )),
            ClipItem::Block(block) => match flat.last_mut() {
                Some(heading) => heading.push_plain_block(block),
                None => paragraphs.push(block),
            },
        }
    }

    StructuredClipboard {
        paragraphs,
        headings: nest_flat_headings(flat),
    }
}

/// Headings after level adjustment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdjustedHeadings {
    /// Headings to place relative to the paste position.
    pub nested: Vec<Node>,
    /// Level-1 headings pulled out for insertion at the document root.
    pub root: Vec<Node>,
}

fn min_level(node: &Node) -> Option<u8> {
    let own = node.heading_level()?;
    Some(node.child_headings().filter_map(min_level).fold(own, u8::min))
}

fn shift_levels(node: &mut Node, offset: i16, max_level: u8) {
    if let Some(level) = node.heading_level() {
        let shifted = (i16::from(level) + offset).clamp(i16::from(MIN_LEVEL), i16::from(max_level));
        node.set_heading_level(u8::try_from(shifted).unwrap_or(MIN_LEVEL));
    }
    if let Some(body) = node.body_node_mut() {
        for child in body.content_mut().iter_mut().filter(|n| n.is_heading()) {
            shift_levels(child, offset, max_level);
        }
    }
}

fn extract_roots(node: &mut Node, roots: &mut Vec<Node>) {
    let Some(body) = node.body_node_mut() else {
        return;
    };
    for mut child in std::mem::take(body.content_mut()) {
        if child.heading_level() == Some(1) {
            roots.push(child);
            continue;
        }
        extract_roots(&mut child, roots);
        body.content_mut().push(child);
    }
}

/// Shift every heading so the shallowest becomes `context_level + 1`, clamped to
/// `1..=max_level`. Titles follow their headings.
///
/// When `context_level > 0`, headings that still end up at level 1 cannot nest under the paste
/// target and are returned separately in [`AdjustedHeadings::root`].
pub fn adjust_heading_levels_for_context(
    headings: Vec<Node>,
    context_level: u8,
    max_level: u8,
) -> AdjustedHeadings {
    let max_level = max_level.clamp(MIN_LEVEL, MAX_LEVEL);
    let Some(min) = headings.iter().filter_map(min_level).min() else {
        return AdjustedHeadings {
            nested: headings,
            root: Vec::new(),
        };
    };
    let desired = context_level.saturating_add(1).min(max_level);
    let offset = i16::from(desired) - i16::from(min);

    let mut adjusted = AdjustedHeadings::default();
    for mut heading in headings {
        shift_levels(&mut heading, offset, max_level);
        if context_level == 0 {
            adjusted.nested.push(heading);
            continue;
        }
        extract_roots(&mut heading, &mut adjusted.root);
        if heading.heading_level() == Some(1) {
            adjusted.root.push(heading);
        } else {
            adjusted.nested.push(heading);
        }
    }
    debug!(min, desired, offset, roots = adjusted.root.len(), "paste levels adjusted");
    adjusted
}

/// Paste `fragment` at the selection of `tr`.
///
/// A non-empty selection is deleted first. Loose paragraphs merge into the textblock at the
/// caret; at the document root they are wrapped in a new untitled level-1 heading. Headings are
/// placed from the end of the enclosing heading's plain blocks, one at a time, and level-1
/// headings chain after the root heading holding the caret.
pub fn paste(
    tr: &mut Transaction,
    fragment: &[Node],
    config: &EngineConfig,
    ids: &mut IdGenerator,
) -> Result<bool, EngineError> {
    let structured = transform(fragment, ids);
    if structured.is_empty() {
        return Ok(false);
    }

    let selection = tr.selection();
    if !selection.is_empty() && !delete_range(tr)? {
        tr.delete(selection.from(), selection.to())?;
        tr.set_selection(Selection::caret(selection.from()));
    }

    let caret = tr.selection().head;
    let doc = tr.doc().clone();
    let context = position_context(&doc, caret)?;
    let adjusted = adjust_heading_levels_for_context(
        structured.headings,
        context.level(),
        config.level_cap(),
    );

    let checkpoint = tr.mapping().len();
    let mut nested = adjusted.nested;
    let mut caret_after = caret;
    let mut caret_step = checkpoint;
    if !structured.paragraphs.is_empty() {
        if context == PositionContext::Root {
            let wrapper = Node::heading(ids.next_id(), 1, Vec::new(), structured.paragraphs);
            nested.insert(0, wrapper);
        } else {
            caret_after = merge_blocks(tr, caret, structured.paragraphs)?;
            caret_step = tr.mapping().len();
        }
    }

    let anchor = match context.heading() {
        Some(heading) => doc
            .node_at(heading.start)
            .and_then(|node| HeadingLayout::of(node, heading.start))
            .map_or(caret, |layout| layout.plain_end),
        None => caret,
    };
    let mut anchor = tr.mapping().slice(checkpoint).map(anchor, Assoc::After);

    let mut last_title = None;
    let (nested_count, root_count) = (nested.len(), adjusted.root.len());
    for node in nested {
        let size = node.node_size();
        let at = attach_heading(tr, node, anchor)?;
        last_title = Some((title_end(tr.doc(), at), tr.mapping().len()));
        anchor = at + size;
    }

    if !adjusted.root.is_empty() {
        let caret_now = tr.mapping().slice(checkpoint).map(caret, Assoc::Before);
        let mut root_anchor = root_insertion_point(tr.doc(), caret_now);
        for node in adjusted.root {
            let size = node.node_size();
            tr.insert(root_anchor, vec![node])?;
            last_title = Some((title_end(tr.doc(), root_anchor), tr.mapping().len()));
            root_anchor += size;
        }
    }

    let (pos, step) = last_title.unwrap_or((caret_after, caret_step));
    let pos = tr.mapping().slice(step).map(pos, Assoc::Before);
    tr.set_selection(Selection::caret(pos));
    info!(
        context_level = context.level(),
        nested = nested_count,
        root = root_count,
        "fragment pasted"
    );
    Ok(true)
}

/// Insert `blocks` at `caret`, merging the first and last with the textblock around the caret.
/// Returns the caret position after the pasted content.
fn merge_blocks(
    tr: &mut Transaction,
    caret: usize,
    mut blocks: Vec<Node>,
) -> Result<usize, EngineError> {
    let doc = tr.doc().clone();
    let resolved = doc.resolve(caret)?;
    let depth = resolved.depth();
    let parent = resolved.parent();

    match parent.kind() {
        NodeKind::Paragraph => {
            let offset = resolved.parent_offset();
            let left = slice_inline(parent.content(), 0, offset);
            let right = slice_inline(parent.content(), offset, parent.content_size());

            let mut out: Vec<Node> = Vec::with_capacity(blocks.len() + 1);
            let mut rest = blocks.into_iter();
            match rest.next() {
                Some(first) if matches!(first.kind(), NodeKind::Paragraph) => {
                    out.push(Node::paragraph([left, first.content().to_vec()].concat()));
                }
                Some(first) => {
                    out.push(Node::paragraph(left));
                    out.push(first);
                }
                None => return Ok(caret),
            }
            out.extend(rest);

            let start = resolved.before(depth);
            let caret = match out.pop() {
                Some(last) if matches!(last.kind(), NodeKind::Paragraph) => {
                    let before: usize = out.iter().map(Node::node_size).sum();
                    let caret = start + before + 1 + last.content_size();
                    out.push(Node::paragraph([last.content().to_vec(), right].concat()));
                    caret
                }
                Some(last) => {
                    out.push(last);
                    let before: usize = out.iter().map(Node::node_size).sum();
                    out.push(Node::paragraph(right));
                    start + before + 1
                }
                None => return Ok(caret),
            };
            tr.replace(start, resolved.after(depth), out)?;
            Ok(caret)
        }
        NodeKind::ContentHeading { .. } => {
            let inline = if blocks
                .first()
                .is_some_and(|b| matches!(b.kind(), NodeKind::Paragraph))
            {
                blocks.remove(0).content().to_vec()
            } else {
                Vec::new()
            };
            let inline_size: usize = inline.iter().map(Node::node_size).sum();
            let heading_start = resolved.before(depth - 1);
            let body_start = HeadingLayout::of(resolved.node(depth - 1), heading_start)
                .map_or(caret, |layout| layout.body_content_start);
            tr.insert(caret, inline)?;
            tr.insert(body_start + inline_size, blocks)?;
            Ok(caret + inline_size)
        }
        NodeKind::ListItem | NodeKind::Blockquote => {
            let size: usize = blocks.iter().map(Node::node_size).sum();
            tr.insert(caret, blocks)?;
            Ok(caret + size)
        }
        _ => {
            let plain_end = enclosing_heading(&doc, caret)
                .and_then(|heading| {
                    HeadingLayout::of(doc.node_at(heading.start)?, heading.start)
                })
                .map(|layout| layout.plain_end);
            // Between plain blocks of a body the caret is already a block boundary.
            let at = match plain_end {
                Some(end) if matches!(parent.kind(), NodeKind::ContentWrapper) && caret <= end => {
                    caret
                }
                Some(end) => end,
                None => caret,
            };
            let size: usize = blocks.iter().map(Node::node_size).sum();
            tr.insert(at, blocks)?;
            Ok(at + size)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Document, HeadingId, inline_text};
    use pretty_assertions::assert_eq;

    fn h(id: &str, level: u8, body: Vec<Node>) -> Node {
        Node::heading(HeadingId::new(id), level, inline_text(id), body)
    }

    fn levels(nodes: &[Node]) -> Vec<u8> {
        let doc = Document::new(nodes.to_vec());
        let mut out = Vec::new();
        doc.descendants(&mut |node, _| {
            out.extend(node.heading_level());
            true
        });
        out
    }

    #[test]
    fn test_transform_splits_loose_and_titled_content() {
        let fragment = vec![
            Node::paragraph_text("loose"),
            Node::title(3, inline_text("T1")),
            Node::paragraph_text("under t1"),
            Node::title(4, inline_text("T2")),
            Node::title(3, inline_text("T3")),
        ];
        let mut ids = IdGenerator::new("c");
        let clip = transform(&fragment, &mut ids);
        assert_eq!(clip.paragraphs, vec![Node::paragraph_text("loose")]);
        let doc = Document::new(clip.headings);
        assert_eq!(doc.outline(), vec!["### T1", "  #### T2", "### T3"]);
        let (_, t1) = doc.find_heading(&HeadingId::new("c1")).unwrap();
        assert_eq!(t1.plain_blocks(), &[Node::paragraph_text("under t1")]);
    }

    #[test]
    fn test_transform_wraps_inline_runs() {
        let mut ids = IdGenerator::new("c");
        let clip = transform(&[Node::text("a"), Node::text("b")], &mut ids);
        assert_eq!(clip.paragraphs, vec![Node::paragraph_text("ab")]);
        assert!(clip.headings.is_empty());
    }

    #[test]
    fn test_adjust_levels_for_context() {
        let headings = vec![h("a", 3, vec![h("b", 4, vec![h("c", 5, vec![])])])];
        let inside = adjust_heading_levels_for_context(headings.clone(), 2, 10);
        assert_eq!(levels(&inside.nested), vec![3, 4, 5]);

        let at_root = adjust_heading_levels_for_context(headings, 0, 10);
        assert_eq!(levels(&at_root.nested), vec![1, 2, 3]);
        assert!(at_root.root.is_empty());
    }

    #[test]
    fn test_adjust_clamps_and_keeps_titles_in_lockstep() {
        let adjusted = adjust_heading_levels_for_context(vec![h("a", 2, vec![h("b", 9, vec![])])], 4, 10);
        assert_eq!(levels(&adjusted.nested), vec![5, 10]);
        assert!(adjusted.nested[0].check().is_ok());
    }

    #[test]
    fn test_paste_paragraph_merges_into_caret_block() {
        let doc = Document::new(vec![h("r", 1, vec![Node::paragraph_text("head tail")])]);
        // Body content at 5, paragraph content at 6, "head " is 5 chars.
        let mut tr = Transaction::new(&doc, Selection::caret(11));
        let mut ids = IdGenerator::new("c");
        let pasted = paste(&mut tr, &[Node::paragraph_text("NEW ")], &EngineConfig::default(), &mut ids);
        assert!(pasted.unwrap());
        let body = tr.doc().content()[0].plain_blocks().to_vec();
        assert_eq!(body, vec![Node::paragraph_text("head NEW tail")]);
        assert_eq!(tr.selection(), Selection::caret(15));
    }
}
