//! Range locator: which top-level blocks and headings a selection touches, and where a position
//! sits relative to the heading structure.

use crate::block_map::BlockInfo;
use crate::error::{LocateError, TransformError};
use crate::model::{Document, HeadingLayout, Node, NodeKind};

/// A block intersecting a located range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockDescriptor {
    /// Heading level, or `None` for plain blocks.
    pub level: Option<u8>,
    /// Position before the block.
    pub start: usize,
    /// Position after the block.
    pub end: usize,
    /// Number of heading ancestors.
    pub depth: usize,
    /// The block itself.
    pub node: Node,
}

impl BlockDescriptor {
    /// `true` for headings.
    pub fn is_heading(&self) -> bool {
        self.level.is_some()
    }
}

/// Maximal blocks intersecting `from..to`.
///
/// `from` is first moved back to the start of the block that contains it. A heading is reported
/// once; its nested content is reported individually only when the range covers the heading
/// partially or lies inside it.
///
/// Fails with [`LocateError::InsideTitle`] when `from` is inside a heading title.
pub fn blocks_in_range(
    doc: &Document,
    from: usize,
    to: usize,
) -> Result<Vec<BlockDescriptor>, LocateError> {
    let to = to.min(doc.size());
    let from = from.min(to);
    let resolved = doc.resolve(from)?;
    if matches!(resolved.parent().kind(), NodeKind::ContentHeading { .. }) {
        return Err(LocateError::InsideTitle { pos: from });
    }

    let from = (1..=resolved.depth())
        .find(|&d| {
            resolved.node(d).kind().is_plain_block()
                && matches!(
                    resolved.node(d - 1).kind(),
                    NodeKind::ContentWrapper | NodeKind::Doc
                )
        })
        .map_or(from, |d| resolved.before(d));

    let mut out = Vec::new();
    collect(doc.content(), 0, 0, from, to, &mut out);
    Ok(out)
}

fn collect(
    children: &[Node],
    content_start: usize,
    depth: usize,
    from: usize,
    to: usize,
    out: &mut Vec<BlockDescriptor>,
) {
    let mut pos = content_start;
    for child in children {
        let (start, end) = (pos, pos + child.node_size());
        pos = end;
        if end <= from {
            continue;
        }
        if start >= to {
            break;
        }

        match child.kind() {
            NodeKind::Heading { level, .. } => {
                let covered = from <= start && end <= to;
                let encloses = start < from && to < end;
                if !encloses {
                    out.push(BlockDescriptor {
                        level: Some(*level),
                        start,
                        end,
                        depth,
                        node: child.clone(),
                    });
                }
                if !covered
                    && let (Some(layout), Some(body)) =
                        (HeadingLayout::of(child, start), child.body_node())
                {
                    collect(body.content(), layout.body_content_start, depth + 1, from, to, out);
                }
            }
            kind if kind.is_plain_block() => out.push(BlockDescriptor {
                level: None,
                start,
                end,
                depth,
                node: child.clone(),
            }),
            _ => {}
        }
    }
}

/// Where a position sits relative to the heading structure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PositionContext {
    /// Outside every heading.
    Root,
    /// Inside the title of `heading`.
    Title {
        /// The heading owning the title.
        heading: BlockInfo,
    },
    /// Inside the body of `heading`.
    Body {
        /// The innermost heading whose body holds the position.
        heading: BlockInfo,
        /// The top-level body block holding the position, as `(start, end)`. `None` when the
        /// position sits between blocks.
        block: Option<(usize, usize)>,
    },
}

impl PositionContext {
    /// The enclosing heading, if any.
    pub fn heading(&self) -> Option<&BlockInfo> {
        match self {
            PositionContext::Root => None,
            PositionContext::Title { heading } | PositionContext::Body { heading, .. } => {
                Some(heading)
            }
        }
    }

    /// Level of the enclosing heading, `0` at the root.
    pub fn level(&self) -> u8 {
        self.heading().map_or(0, |h| h.level)
    }
}

/// Classify `pos`.
pub fn position_context(doc: &Document, pos: usize) -> Result<PositionContext, TransformError> {
    let resolved = doc.resolve(pos)?;
    let Some(hd) = resolved.heading_depth() else {
        return Ok(PositionContext::Root);
    };

    let node = resolved.node(hd);
    let depth = (1..hd).filter(|&d| resolved.node(d).is_heading()).count();
    let start = resolved.before(hd);
    let heading = BlockInfo::of(node, start, depth).ok_or(TransformError::CrossesNodeBoundary { pos })?;

    if resolved.depth() == hd {
        // Between the title and the body.
        return Ok(PositionContext::Body {
            heading,
            block: None,
        });
    }

    if matches!(resolved.node(hd + 1).kind(), NodeKind::ContentHeading { .. }) {
        return Ok(PositionContext::Title { heading });
    }

    let block = (resolved.depth() >= hd + 2)
        .then(|| (resolved.before(hd + 2), resolved.after(hd + 2)));
    Ok(PositionContext::Body { heading, block })
}

/// The innermost heading strictly containing `pos`.
pub fn enclosing_heading(doc: &Document, pos: usize) -> Option<BlockInfo> {
    position_context(doc, pos)
        .ok()
        .and_then(|ctx| ctx.heading().cloned())
}

/// The heading starting exactly at `pos`.
pub fn heading_at(doc: &Document, pos: usize) -> Option<BlockInfo> {
    let node = doc.node_at(pos)?;
    let depth = enclosing_heading(doc, pos).map_or(0, |parent| parent.depth + 1);
    BlockInfo::of(node, pos, depth)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{HeadingId, inline_text};
    use pretty_assertions::assert_eq;

    fn h(id: &str, level: u8, body: Vec<Node>) -> Node {
        Node::heading(HeadingId::new(id), level, inline_text(id), body)
    }

    // # a            0..
    //   p "xy"       5..9
    //   ## b         9..16
    //   ## c         16..23
    fn doc() -> Document {
        Document::new(vec![h(
            "a",
            1,
            vec![Node::paragraph_text("xy"), h("b", 2, vec![]), h("c", 2, vec![])],
        )])
    }

    #[test]
    fn test_rejects_title_start() {
        assert_eq!(
            blocks_in_range(&doc(), 2, 7),
            Err(LocateError::InsideTitle { pos: 2 })
        );
    }

    #[test]
    fn test_caret_in_paragraph_reports_paragraph() {
        let blocks = blocks_in_range(&doc(), 7, 7).unwrap();
        assert_eq!(blocks.len(), 1);
        assert_eq!((blocks[0].start, blocks[0].end, blocks[0].level), (5, 9, None));
        assert_eq!(blocks[0].depth, 1);
    }

    #[test]
    fn test_range_into_heading_reports_heading() {
        let blocks = blocks_in_range(&doc(), 7, 12).unwrap();
        let spans: Vec<_> = blocks.iter().map(|b| (b.start, b.level)).collect();
        // b is partially covered: reported, then searched (its empty body adds nothing).
        assert_eq!(spans, vec![(5, None), (9, Some(2))]);
    }

    #[test]
    fn test_position_context() {
        let d = doc();
        assert_eq!(position_context(&d, 0).unwrap(), PositionContext::Root);
        assert!(matches!(position_context(&d, 2).unwrap(), PositionContext::Title { .. }));
        match position_context(&d, 7).unwrap() {
            PositionContext::Body { heading, block } => {
                assert_eq!(heading.id.as_str(), "a");
                assert_eq!(block, Some((5, 9)));
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(heading_at(&d, 16).map(|b| (b.level, b.depth)), Some((2, 1)));
        assert_eq!(enclosing_heading(&d, 11).map(|b| b.id), Some(HeadingId::new("b")));
    }
}
