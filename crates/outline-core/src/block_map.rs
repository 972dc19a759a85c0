//! Flat, document-ordered view of the headings in a range.

use crate::model::{BODY_CLOSE_OFFSET, Document, HeadingId, HeadingLayout, Node};

/// One heading in a block map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockInfo {
    /// Heading identifier.
    pub id: HeadingId,
    /// Heading level.
    pub level: u8,
    /// Position before the heading.
    pub start: usize,
    /// Position after the heading.
    pub end: usize,
    /// Number of heading ancestors.
    pub depth: usize,
}

impl BlockInfo {
    pub(crate) fn of(node: &Node, start: usize, depth: usize) -> Option<Self> {
        Some(Self {
            id: node.heading_id()?.clone(),
            level: node.heading_level()?,
            start,
            end: start + node.node_size(),
            depth,
        })
    }

    /// `true` when `pos` lies strictly inside the heading.
    pub fn contains(&self, pos: usize) -> bool {
        self.start < pos && pos < self.end
    }

    /// Last position inside the heading's body.
    pub fn body_end(&self) -> usize {
        self.end - BODY_CLOSE_OFFSET
    }
}

/// Every heading overlapping `from..to`, in document order, descending into nested bodies.
///
/// An empty range selects the headings containing `from`.
pub fn heading_block_map(doc: &Document, from: usize, to: usize) -> Vec<BlockInfo> {
    let to = to.min(doc.size()).max(from);
    let mut out = Vec::new();
    collect(doc.content(), 0, 0, from, to, &mut out);
    out
}

/// Every heading in the document.
pub fn document_block_map(doc: &Document) -> Vec<BlockInfo> {
    heading_block_map(doc, 0, doc.size())
}

fn collect(
    children: &[Node],
    content_start: usize,
    depth: usize,
    from: usize,
    to: usize,
    out: &mut Vec<BlockInfo>,
) {
    let mut pos = content_start;
    for child in children {
        let start = pos;
        pos += child.node_size();
        if start >= to.max(from + 1) {
            break;
        }
        if pos <= from {
            continue;
        }
        let Some(info) = BlockInfo::of(child, start, depth) else {
            continue;
        };
        out.push(info);
        if let (Some(layout), Some(body)) = (HeadingLayout::of(child, start), child.body_node()) {
            collect(body.content(), layout.body_content_start, depth + 1, from, to, out);
        }
    }
}

/// The heading chain seen at `anchor` in reading order: a stack walk over the map entries that
/// start before it. Each entry contains the next one; the last entry is the most recent heading.
///
/// Entries that already closed before `anchor` stay on the stack until a later sibling replaces
/// them, so a deeper heading inserted at `anchor` nests under the last heading a reader saw.
pub fn open_spine(map: &[BlockInfo], anchor: usize) -> Vec<BlockInfo> {
    let mut stack: Vec<BlockInfo> = Vec::new();
    for entry in map.iter().filter(|b| b.start < anchor) {
        while stack.last().is_some_and(|top| entry.start >= top.end) {
            stack.pop();
        }
        stack.push(entry.clone());
    }
    stack
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::inline_text;
    use pretty_assertions::assert_eq;

    fn h(id: &str, level: u8, body: Vec<Node>) -> Node {
        Node::heading(HeadingId::new(id), level, inline_text(id), body)
    }

    // # a
    //   ## b
    //     ### c
    //   ## d
    fn doc() -> Document {
        Document::new(vec![h(
            "a",
            1,
            vec![h("b", 2, vec![h("c", 3, vec![])]), h("d", 2, vec![])],
        )])
    }

    fn ids(map: &[BlockInfo]) -> Vec<&str> {
        map.iter().map(|b| b.id.as_str()).collect()
    }

    #[test]
    fn test_full_map_is_document_ordered() {
        let map = document_block_map(&doc());
        assert_eq!(ids(&map), vec!["a", "b", "c", "d"]);
        assert_eq!(map.iter().map(|b| b.depth).collect::<Vec<_>>(), vec![0, 1, 2, 1]);
        // c: 3 + 2 + 2 = 7, b: 3 + (7 + 2) + 2 = 14, d: 7, a: 3 + (14 + 7 + 2) + 2 = 28
        assert_eq!((map[0].start, map[0].end), (0, 28));
        assert_eq!((map[1].start, map[1].end), (5, 19));
        assert_eq!((map[2].start, map[2].end), (10, 17));
        assert_eq!((map[3].start, map[3].end), (19, 26));
    }

    #[test]
    fn test_partial_map_only_covers_range() {
        assert_eq!(ids(&heading_block_map(&doc(), 0, 10)), vec!["a", "b"]);
        assert_eq!(ids(&heading_block_map(&doc(), 20, 20)), vec!["a", "d"]);
    }

    #[test]
    fn test_open_spine() {
        let map = document_block_map(&doc());
        assert_eq!(ids(&open_spine(&map, 19)), vec!["a", "b", "c"]);
        assert_eq!(ids(&open_spine(&map, 12)), vec!["a", "b", "c"]);
        assert_eq!(ids(&open_spine(&map, 26)), vec!["a", "d"]);
        assert!(open_spine(&map, 0).is_empty());
    }
}
