//! Document model: a nested node tree addressed by flat integer positions.
//!
//! # Position encoding
//!
//! Every non-text node occupies `content_size + 2` positions (one for its opening boundary, one
//! for its closing boundary); a text node occupies one position per `char`. Position `0` is the
//! start of the document content.
//!
//! A heading starting at position `s` is laid out as:
//!
//! ```text
//! s            heading opens
//! s + 1        title opens
//! s + 2        title content start
//! ...          title content end, title closes, body opens
//! ...          body content (plain blocks, then nested headings)
//! end - 2      body content end
//! end          heading closes
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{SchemaError, TransformError};

/// Shallowest heading level.
pub const MIN_LEVEL: u8 = 1;
/// Deepest heading level.
pub const MAX_LEVEL: u8 = 10;
/// Distance from a heading's end to its body content end (body close plus heading close).
pub const BODY_CLOSE_OFFSET: usize = 2;

/// Stable identifier of a heading. Survives level changes and moves.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HeadingId(String);

impl HeadingId {
    /// Wrap an identifier string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the identifier string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for HeadingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for HeadingId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Inline formatting carried by text nodes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Mark {
    /// Strong emphasis.
    Bold,
    /// Emphasis.
    Italic,
    /// Inline code.
    Code,
    /// Strike-through.
    Strike,
    /// Hyperlink.
    Link {
        /// Link target.
        href: String,
    },
}

impl Mark {
    /// Schema name used in the JSON form.
    pub fn name(&self) -> &'static str {
        match self {
            Mark::Bold => "bold",
            Mark::Italic => "italic",
            Mark::Code => "code",
            Mark::Strike => "strike",
            Mark::Link { .. } => "link",
        }
    }
}

/// The closed set of node kinds in the document schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    /// Document root; content is `heading*`.
    Doc,
    /// Structural heading; content is exactly `contentHeading contentWrapper`.
    Heading {
        /// Stable identifier.
        id: HeadingId,
        /// Heading level, `1..=10`.
        level: u8,
    },
    /// Heading title; inline content only. Its level mirrors the owning heading.
    ContentHeading {
        /// Mirrored heading level.
        level: u8,
    },
    /// Heading body; content is `plain* heading*`.
    ContentWrapper,
    /// Paragraph textblock.
    Paragraph,
    /// Bullet list of list items.
    BulletList,
    /// List item holding plain blocks.
    ListItem,
    /// Block quote holding plain blocks.
    Blockquote,
    /// Inline text run.
    Text {
        /// The characters.
        text: String,
        /// Formatting marks, in a stable order.
        marks: Vec<Mark>,
    },
}

impl NodeKind {
    /// Schema name used in the JSON form and in error messages.
    pub fn name(&self) -> &'static str {
        match self {
            NodeKind::Doc => "doc",
            NodeKind::Heading { .. } => "heading",
            NodeKind::ContentHeading { .. } => "contentHeading",
            NodeKind::ContentWrapper => "contentWrapper",
            NodeKind::Paragraph => "paragraph",
            NodeKind::BulletList => "bulletList",
            NodeKind::ListItem => "listItem",
            NodeKind::Blockquote => "blockquote",
            NodeKind::Text { .. } => "text",
        }
    }

    /// `true` for text runs.
    pub fn is_text(&self) -> bool {
        matches!(self, NodeKind::Text { .. })
    }

    /// `true` for nodes whose content is inline text.
    pub fn is_textblock(&self) -> bool {
        matches!(self, NodeKind::Paragraph | NodeKind::ContentHeading { .. })
    }

    /// `true` for the non-heading block kinds allowed in a body.
    pub fn is_plain_block(&self) -> bool {
        matches!(
            self,
            NodeKind::Paragraph | NodeKind::BulletList | NodeKind::Blockquote
        )
    }

    /// `true` for structural headings.
    pub fn is_heading(&self) -> bool {
        matches!(self, NodeKind::Heading { .. })
    }

    /// Whether `child` may appear directly inside a node of this kind.
    ///
    /// Ordering constraints (title before body, plain blocks before headings) are checked by
    /// [`Node::check`], not here.
    pub fn allows(&self, child: &NodeKind) -> bool {
        match self {
            NodeKind::Doc => child.is_heading(),
            NodeKind::Heading { .. } => matches!(
                child,
                NodeKind::ContentHeading { .. } | NodeKind::ContentWrapper
            ),
            NodeKind::ContentHeading { .. } | NodeKind::Paragraph => child.is_text(),
            NodeKind::ContentWrapper => child.is_plain_block() || child.is_heading(),
            NodeKind::BulletList => matches!(child, NodeKind::ListItem),
            NodeKind::ListItem | NodeKind::Blockquote => child.is_plain_block(),
            NodeKind::Text { .. } => false,
        }
    }
}

/// A node of the document tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    kind: NodeKind,
    content: Vec<Node>,
}

impl Node {
    /// Build a node from its parts without checking the schema.
    pub fn new(kind: NodeKind, content: Vec<Node>) -> Self {
        Self { kind, content }
    }

    /// Plain text run.
    pub fn text(text: impl Into<String>) -> Self {
        Self::text_with_marks(text, Vec::new())
    }

    /// Text run with marks.
    pub fn text_with_marks(text: impl Into<String>, marks: Vec<Mark>) -> Self {
        Self::new(
            NodeKind::Text {
                text: text.into(),
                marks,
            },
            Vec::new(),
        )
    }

    /// Paragraph holding the given inline nodes.
    pub fn paragraph(inline: Vec<Node>) -> Self {
        Self::new(NodeKind::Paragraph, normalize_inline(inline))
    }

    /// Paragraph holding a single unmarked text run (empty when `text` is empty).
    pub fn paragraph_text(text: &str) -> Self {
        Self::paragraph(inline_text(text))
    }

    /// Heading title at `level`.
    pub fn title(level: u8, inline: Vec<Node>) -> Self {
        Self::new(NodeKind::ContentHeading { level }, normalize_inline(inline))
    }

    /// Heading body.
    pub fn body(blocks: Vec<Node>) -> Self {
        Self::new(NodeKind::ContentWrapper, blocks)
    }

    /// Heading with a title and body. The title level follows `level`.
    pub fn heading(id: HeadingId, level: u8, title: Vec<Node>, body: Vec<Node>) -> Self {
        Self::new(
            NodeKind::Heading { id, level },
            vec![Self::title(level, title), Self::body(body)],
        )
    }

    /// Bullet list.
    pub fn bullet_list(items: Vec<Node>) -> Self {
        Self::new(NodeKind::BulletList, items)
    }

    /// List item.
    pub fn list_item(blocks: Vec<Node>) -> Self {
        Self::new(NodeKind::ListItem, blocks)
    }

    /// Block quote.
    pub fn blockquote(blocks: Vec<Node>) -> Self {
        Self::new(NodeKind::Blockquote, blocks)
    }

    /// The node kind.
    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    /// Child nodes.
    pub fn content(&self) -> &[Node] {
        &self.content
    }

    pub(crate) fn content_mut(&mut self) -> &mut Vec<Node> {
        &mut self.content
    }

    /// Text of a text node.
    pub fn as_text(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Text { text, .. } => Some(text),
            _ => None,
        }
    }

    /// `true` for text runs.
    pub fn is_text(&self) -> bool {
        self.kind.is_text()
    }

    /// `true` for structural headings.
    pub fn is_heading(&self) -> bool {
        self.kind.is_heading()
    }

    /// Number of positions this node occupies in its parent.
    pub fn node_size(&self) -> usize {
        match &self.kind {
            NodeKind::Text { text, .. } => text.chars().count(),
            _ => self.content_size() + 2,
        }
    }

    /// Number of positions occupied by the children.
    pub fn content_size(&self) -> usize {
        self.content.iter().map(Node::node_size).sum()
    }

    /// Concatenated text of all descendants.
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        match &self.kind {
            NodeKind::Text { text, .. } => out.push_str(text),
            _ => self.content.iter().for_each(|child| child.collect_text(out)),
        }
    }

    /// Level of a heading.
    pub fn heading_level(&self) -> Option<u8> {
        match &self.kind {
            NodeKind::Heading { level, .. } => Some(*level),
            _ => None,
        }
    }

    /// Identifier of a heading.
    pub fn heading_id(&self) -> Option<&HeadingId> {
        match &self.kind {
            NodeKind::Heading { id, .. } => Some(id),
            _ => None,
        }
    }

    /// Title of a heading.
    pub fn title_node(&self) -> Option<&Node> {
        if !self.is_heading() {
            return None;
        }
        self.content
            .first()
            .filter(|n| matches!(n.kind, NodeKind::ContentHeading { .. }))
    }

    /// Body of a heading.
    pub fn body_node(&self) -> Option<&Node> {
        if !self.is_heading() {
            return None;
        }
        self.content
            .get(1)
            .filter(|n| matches!(n.kind, NodeKind::ContentWrapper))
    }

    pub(crate) fn body_node_mut(&mut self) -> Option<&mut Node> {
        if !self.is_heading() {
            return None;
        }
        self.content
            .get_mut(1)
            .filter(|n| matches!(n.kind, NodeKind::ContentWrapper))
    }

    /// Title text of a heading.
    pub fn title_text(&self) -> String {
        self.title_node().map(Node::text_content).unwrap_or_default()
    }

    /// Inline content of a heading title.
    pub fn title_inline(&self) -> &[Node] {
        self.title_node().map(Node::content).unwrap_or(&[])
    }

    /// Leading non-heading blocks of a heading body.
    pub fn plain_blocks(&self) -> &[Node] {
        let body = self.body_node().map(Node::content).unwrap_or(&[]);
        let split = body.iter().position(Node::is_heading).unwrap_or(body.len());
        &body[..split]
    }

    /// Headings nested directly in this heading's body.
    pub fn child_headings(&self) -> impl Iterator<Item = &Node> {
        self.body_node()
            .map(Node::content)
            .unwrap_or(&[])
            .iter()
            .filter(|n| n.is_heading())
    }

    /// Append a nested heading at the end of this heading's body.
    pub(crate) fn push_child_heading(&mut self, child: Node) {
        if let Some(body) = self.body_node_mut() {
            body.content.push(child);
        }
    }

    /// Append a plain block to this heading's body, ahead of any nested headings.
    pub(crate) fn push_plain_block(&mut self, block: Node) {
        if let Some(body) = self.body_node_mut() {
            let at = body
                .content
                .iter()
                .position(Node::is_heading)
                .unwrap_or(body.content.len());
            body.content.insert(at, block);
        }
    }

    /// Change a heading's level, keeping its title in lockstep.
    pub fn set_heading_level(&mut self, new_level: u8) {
        if let NodeKind::Heading { level, .. } = &mut self.kind {
            *level = new_level;
            if let Some(NodeKind::ContentHeading { level }) =
                self.content.first_mut().map(|t| &mut t.kind)
            {
                *level = new_level;
            }
        }
    }

    /// Copy of a heading with only its title and plain blocks (nested headings dropped).
    pub(crate) fn without_child_headings(&self) -> Node {
        match (&self.kind, self.title_node()) {
            (NodeKind::Heading { id, level }, Some(title)) => Node::new(
                NodeKind::Heading {
                    id: id.clone(),
                    level: *level,
                },
                vec![title.clone(), Node::body(self.plain_blocks().to_vec())],
            ),
            _ => self.clone(),
        }
    }

    /// Index and relative start of the child containing content offset `pos`.
    ///
    /// Returns `(content.len(), content_size)` when `pos` is the content end.
    pub(crate) fn find_index(&self, pos: usize) -> (usize, usize) {
        let mut offset = 0;
        for (index, child) in self.content.iter().enumerate() {
            let end = offset + child.node_size();
            if end > pos {
                return (index, offset);
            }
            offset = end;
        }
        (self.content.len(), offset)
    }

    /// Call `f` for every descendant overlapping `from..to` (content-relative), passing its
    /// absolute start. Returning `false` skips the node's children.
    pub fn nodes_between<'a>(
        &'a self,
        from: usize,
        to: usize,
        f: &mut dyn FnMut(&'a Node, usize) -> bool,
    ) {
        self.nodes_between_at(from, to, 0, f);
    }

    fn nodes_between_at<'a>(
        &'a self,
        from: usize,
        to: usize,
        base: usize,
        f: &mut dyn FnMut(&'a Node, usize) -> bool,
    ) {
        let mut pos = 0;
        for child in &self.content {
            if pos >= to {
                break;
            }
            let end = pos + child.node_size();
            if end > from && f(child, base + pos) && !child.content.is_empty() {
                let start = pos + 1;
                child.nodes_between_at(
                    from.saturating_sub(start),
                    to.saturating_sub(start).min(child.content_size()),
                    base + start,
                    f,
                );
            }
            pos = end;
        }
    }

    /// Check this subtree against the node schema.
    ///
    /// Hierarchy rules between heading levels are not schema rules; the validator repairs those.
    pub fn check(&self) -> Result<(), SchemaError> {
        for child in &self.content {
            if !self.kind.allows(&child.kind) {
                return Err(SchemaError::InvalidContent {
                    parent: self.kind.name(),
                    child: child.kind.name(),
                });
            }
        }

        match &self.kind {
            NodeKind::Heading { id, level } => {
                if !(MIN_LEVEL..=MAX_LEVEL).contains(level) {
                    return Err(SchemaError::InvalidLevel(i64::from(*level)));
                }
                let (Some(title), Some(body), 2) =
                    (self.title_node(), self.body_node(), self.content.len())
                else {
                    return Err(SchemaError::MalformedHeading {
                        id: id.to_string(),
                    });
                };
                if let NodeKind::ContentHeading { level: title_level } = title.kind
                    && title_level != *level
                {
                    return Err(SchemaError::TitleLevelMismatch {
                        id: id.to_string(),
                        heading: *level,
                        title: title_level,
                    });
                }
                let mut seen_heading = false;
                for block in &body.content {
                    if block.is_heading() {
                        seen_heading = true;
                    } else if seen_heading {
                        return Err(SchemaError::BlockAfterHeading { id: id.to_string() });
                    }
                }
            }
            NodeKind::BulletList | NodeKind::ListItem | NodeKind::Blockquote
                if self.content.is_empty() =>
            {
                return Err(SchemaError::EmptyNode(self.kind.name()));
            }
            NodeKind::Text { text, .. } if text.is_empty() => {
                return Err(SchemaError::EmptyNode("text"));
            }
            _ => {}
        }

        self.content.iter().try_for_each(Node::check)
    }

    /// Replace content-relative `from..to` with `insert`, descending into the deepest node that
    /// contains the whole range. Returns the removed nodes.
    pub(crate) fn replace(
        &mut self,
        from: usize,
        to: usize,
        insert: Vec<Node>,
    ) -> Result<Vec<Node>, TransformError> {
        let size = self.content_size();
        if from > to || to > size {
            return Err(TransformError::InvalidRange { from, to });
        }

        let mut offset = 0;
        for index in 0..self.content.len() {
            let end = offset + self.content[index].node_size();
            if offset >= to {
                break;
            }
            if !self.content[index].is_text() && from > offset && to < end {
                return self.content[index]
                    .replace(from - offset - 1, to - offset - 1, insert)
                    .map_err(|err| shift_error(err, offset + 1));
            }
            offset = end;
        }

        self.splice(from, to, insert)
    }

    fn splice(
        &mut self,
        from: usize,
        to: usize,
        insert: Vec<Node>,
    ) -> Result<Vec<Node>, TransformError> {
        if let Some(bad) = insert.iter().find(|n| !self.kind.allows(&n.kind)) {
            return Err(TransformError::ContentNotAllowed {
                parent: self.kind.name(),
                child: bad.kind.name(),
            });
        }

        let start = self.split_at(from)?;
        let end = self.split_at(to)?;
        let removed: Vec<Node> = self.content.splice(start..end, insert).collect();
        if self.kind.is_textblock() {
            self.content = normalize_inline(std::mem::take(&mut self.content));
        }
        Ok(removed)
    }

    /// Make `offset` a child boundary, splitting a text run if needed. Returns the child index
    /// that starts at `offset`.
    fn split_at(&mut self, offset: usize) -> Result<usize, TransformError> {
        let mut pos = 0;
        for index in 0..self.content.len() {
            if pos == offset {
                return Ok(index);
            }
            let size = self.content[index].node_size();
            if offset < pos + size {
                let NodeKind::Text { text, marks } = &self.content[index].kind else {
                    return Err(TransformError::CrossesNodeBoundary { pos: offset });
                };
                let (left, right) = split_chars(text, offset - pos);
                let left = Node::text_with_marks(left, marks.clone());
                let right = Node::text_with_marks(right, marks.clone());
                self.content.splice(index..=index, [left, right]);
                return Ok(index + 1);
            }
            pos += size;
        }
        if pos == offset {
            Ok(self.content.len())
        } else {
            Err(TransformError::PositionOutOfBounds {
                pos: offset,
                size: pos,
            })
        }
    }
}

fn shift_error(err: TransformError, by: usize) -> TransformError {
    match err {
        TransformError::PositionOutOfBounds { pos, size } => TransformError::PositionOutOfBounds {
            pos: pos + by,
            size,
        },
        TransformError::InvalidRange { from, to } => TransformError::InvalidRange {
            from: from + by,
            to: to + by,
        },
        TransformError::CrossesNodeBoundary { pos } => {
            TransformError::CrossesNodeBoundary { pos: pos + by }
        }
        other => other,
    }
}

fn split_chars(text: &str, at: usize) -> (String, String) {
    let byte = text
        .char_indices()
        .nth(at)
        .map(|(i, _)| i)
        .unwrap_or(text.len());
    (text[..byte].to_string(), text[byte..].to_string())
}

/// A single unmarked text run, or nothing for an empty string.
pub fn inline_text(text: &str) -> Vec<Node> {
    if text.is_empty() {
        Vec::new()
    } else {
        vec![Node::text(text)]
    }
}

/// Drop empty text runs and merge adjacent runs with equal marks.
pub fn normalize_inline(inline: Vec<Node>) -> Vec<Node> {
    let mut out: Vec<Node> = Vec::with_capacity(inline.len());
    for node in inline {
        if node.as_text().is_some_and(str::is_empty) {
            continue;
        }
        if let (
            Some(Node {
                kind:
                    NodeKind::Text {
                        text: prev,
                        marks: prev_marks,
                    },
                ..
            }),
            NodeKind::Text { text, marks },
        ) = (out.last_mut(), &node.kind)
            && *prev_marks == *marks
        {
            prev.push_str(text);
            continue;
        }
        out.push(node);
    }
    out
}

/// Cut content-relative `from..to` out of a list of inline nodes.
pub fn slice_inline(inline: &[Node], from: usize, to: usize) -> Vec<Node> {
    let mut out = Vec::new();
    let mut pos = 0;
    for node in inline {
        let size = node.node_size();
        let (start, end) = (pos, pos + size);
        pos = end;
        if end <= from || start >= to {
            continue;
        }
        let NodeKind::Text { text, marks } = &node.kind else {
            out.push(node.clone());
            continue;
        };
        let lo = from.saturating_sub(start);
        let hi = (to - start).min(size);
        let piece: String = text.chars().skip(lo).take(hi - lo).collect();
        out.push(Node::text_with_marks(piece, marks.clone()));
    }
    normalize_inline(out)
}

/// Absolute positions of the parts of a heading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeadingLayout {
    /// Position before the heading.
    pub start: usize,
    /// First position inside the title.
    pub title_content_start: usize,
    /// Last position inside the title.
    pub title_content_end: usize,
    /// First position inside the body.
    pub body_content_start: usize,
    /// End of the body's leading plain blocks.
    pub plain_end: usize,
    /// Last position inside the body.
    pub body_content_end: usize,
    /// Position after the heading.
    pub end: usize,
}

impl HeadingLayout {
    /// Layout of `heading` placed at `start`. `None` when the node is not heading-shaped.
    pub fn of(heading: &Node, start: usize) -> Option<Self> {
        let title = heading.title_node()?;
        heading.body_node()?;
        let title_content_start = start + 2;
        let title_content_end = title_content_start + title.content_size();
        let body_content_start = title_content_end + 2;
        let plain_size: usize = heading.plain_blocks().iter().map(Node::node_size).sum();
        let end = start + heading.node_size();
        Some(Self {
            start,
            title_content_start,
            title_content_end,
            body_content_start,
            plain_end: body_content_start + plain_size,
            body_content_end: end - BODY_CLOSE_OFFSET,
            end,
        })
    }
}

/// One level of a resolved position's path.
#[derive(Debug, Clone, Copy)]
struct PathStep<'a> {
    node: &'a Node,
    index: usize,
    start: usize,
}

/// A position resolved against a document: the chain of ancestors and the offset into the
/// innermost one.
#[derive(Debug, Clone)]
pub struct ResolvedPos<'a> {
    pos: usize,
    path: Vec<PathStep<'a>>,
    parent_offset: usize,
}

impl<'a> ResolvedPos<'a> {
    pub(crate) fn resolve(root: &'a Node, pos: usize) -> Result<Self, TransformError> {
        let size = root.content_size();
        if pos > size {
            return Err(TransformError::PositionOutOfBounds { pos, size });
        }

        let mut path = Vec::new();
        let mut node = root;
        let mut start = 0;
        let mut parent_offset = pos;
        loop {
            let (index, offset) = node.find_index(parent_offset);
            path.push(PathStep { node, index, start });
            let rem = parent_offset - offset;
            if rem == 0 {
                break;
            }
            let child = &node.content[index];
            if child.is_text() {
                break;
            }
            parent_offset = rem - 1;
            start += offset + 1;
            node = child;
        }

        Ok(Self {
            pos,
            path,
            parent_offset,
        })
    }

    /// The resolved position.
    pub fn pos(&self) -> usize {
        self.pos
    }

    /// Depth of the innermost ancestor (the document is depth 0).
    pub fn depth(&self) -> usize {
        self.path.len() - 1
    }

    /// Ancestor at `depth`.
    pub fn node(&self, depth: usize) -> &'a Node {
        self.path[depth].node
    }

    /// Innermost ancestor.
    pub fn parent(&self) -> &'a Node {
        self.node(self.depth())
    }

    /// Offset into the innermost ancestor's content.
    pub fn parent_offset(&self) -> usize {
        self.parent_offset
    }

    /// Child index in the ancestor at `depth` that the path continues through.
    pub fn index(&self, depth: usize) -> usize {
        self.path[depth].index
    }

    /// Content start of the ancestor at `depth`.
    pub fn start(&self, depth: usize) -> usize {
        self.path[depth].start
    }

    /// Content end of the ancestor at `depth`.
    pub fn end(&self, depth: usize) -> usize {
        self.start(depth) + self.node(depth).content_size()
    }

    /// Position before the ancestor at `depth` (`depth >= 1`).
    pub fn before(&self, depth: usize) -> usize {
        self.start(depth) - 1
    }

    /// Position after the ancestor at `depth` (`depth >= 1`).
    pub fn after(&self, depth: usize) -> usize {
        self.end(depth) + 1
    }

    /// Depth of the innermost heading ancestor.
    pub fn heading_depth(&self) -> Option<usize> {
        (1..=self.depth())
            .rev()
            .find(|&d| self.node(d).is_heading())
    }
}

/// A document: the root node plus convenience accessors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    root: Node,
}

impl Default for Document {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl Document {
    /// Document with the given top-level headings.
    pub fn new(content: Vec<Node>) -> Self {
        Self {
            root: Node::new(NodeKind::Doc, content),
        }
    }

    /// Wrap a `doc` node. Returns `None` for any other kind.
    pub fn from_root(root: Node) -> Option<Self> {
        matches!(root.kind, NodeKind::Doc).then_some(Self { root })
    }

    /// The root node.
    pub fn root(&self) -> &Node {
        &self.root
    }

    pub(crate) fn root_mut(&mut self) -> &mut Node {
        &mut self.root
    }

    /// Top-level nodes.
    pub fn content(&self) -> &[Node] {
        &self.root.content
    }

    /// Content size of the document.
    pub fn size(&self) -> usize {
        self.root.content_size()
    }

    /// Resolve a position.
    pub fn resolve(&self, pos: usize) -> Result<ResolvedPos<'_>, TransformError> {
        ResolvedPos::resolve(&self.root, pos)
    }

    /// The node starting at `pos`, or the text run containing it.
    pub fn node_at(&self, pos: usize) -> Option<&Node> {
        let mut node = &self.root;
        let mut pos = pos;
        loop {
            let (index, offset) = node.find_index(pos);
            let child = node.content.get(index)?;
            if offset == pos || child.is_text() {
                return Some(child);
            }
            pos -= offset + 1;
            node = child;
        }
    }

    /// See [`Node::nodes_between`].
    pub fn nodes_between<'a>(
        &'a self,
        from: usize,
        to: usize,
        f: &mut dyn FnMut(&'a Node, usize) -> bool,
    ) {
        self.root.nodes_between(from, to, f);
    }

    /// Visit every node with its absolute start position.
    pub fn descendants<'a>(&'a self, f: &mut dyn FnMut(&'a Node, usize) -> bool) {
        self.root.nodes_between(0, self.size(), f);
    }

    /// Check the whole document against the node schema.
    pub fn check(&self) -> Result<(), SchemaError> {
        self.root.check()
    }

    /// Find a heading by identifier, returning its start position.
    pub fn find_heading(&self, id: &HeadingId) -> Option<(usize, &Node)> {
        let mut found = None;
        self.descendants(&mut |node, pos| {
            if found.is_some() {
                return false;
            }
            if node.heading_id() == Some(id) {
                found = Some((pos, node));
                return false;
            }
            node.is_heading() || matches!(node.kind, NodeKind::ContentWrapper)
        });
        found
    }

    /// Every heading identifier, in document order.
    pub fn heading_ids(&self) -> Vec<HeadingId> {
        let mut ids = Vec::new();
        self.descendants(&mut |node, _| {
            if let Some(id) = node.heading_id() {
                ids.push(id.clone());
            }
            node.is_heading() || matches!(node.kind, NodeKind::ContentWrapper)
        });
        ids
    }

    /// Indented one-line-per-heading rendering, e.g. `"  ## Setup"`.
    pub fn outline(&self) -> Vec<String> {
        fn walk(node: &Node, depth: usize, out: &mut Vec<String>) {
            for child in node.body_node().map(Node::content).unwrap_or(node.content()) {
                if let Some(level) = child.heading_level() {
                    out.push(format!(
                        "{}{} {}",
                        "  ".repeat(depth),
                        "#".repeat(usize::from(level)),
                        child.title_text()
                    ));
                    walk(child, depth + 1, out);
                }
            }
        }

        let mut out = Vec::new();
        walk(&self.root, 0, &mut out);
        out
    }

    pub(crate) fn replace(
        &mut self,
        from: usize,
        to: usize,
        insert: Vec<Node>,
    ) -> Result<Vec<Node>, TransformError> {
        self.root.replace(from, to, insert)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn h(id: &str, level: u8, title: &str, body: Vec<Node>) -> Node {
        Node::heading(HeadingId::new(id), level, inline_text(title), body)
    }

    fn sample() -> Document {
        Document::new(vec![h(
            "a",
            1,
            "Ab",
            vec![Node::paragraph_text("xy"), h("b", 2, "C", vec![])],
        )])
    }

    #[test]
    fn test_sizes_follow_position_encoding() {
        let doc = sample();
        // b: title "C" = 3, empty body = 2 => 7
        // a: title "Ab" = 4, body = paragraph(4) + b(7) + 2 = 13 => 19
        assert_eq!(doc.size(), 19);
        let layout = HeadingLayout::of(&doc.content()[0], 0).unwrap();
        assert_eq!(layout.title_content_start, 2);
        assert_eq!(layout.title_content_end, 4);
        assert_eq!(layout.body_content_start, 6);
        assert_eq!(layout.plain_end, 10);
        assert_eq!(layout.body_content_end, 17);
        assert_eq!(layout.end, 19);
    }

    #[test]
    fn test_resolve_and_node_at() {
        let doc = sample();
        let r = doc.resolve(3).unwrap();
        assert_eq!(r.depth(), 2);
        assert!(matches!(r.parent().kind(), NodeKind::ContentHeading { level: 1 }));
        assert_eq!(r.parent_offset(), 1);
        assert_eq!(r.heading_depth(), Some(1));

        let r = doc.resolve(8).unwrap();
        assert!(matches!(r.parent().kind(), NodeKind::Paragraph));
        assert_eq!(r.before(r.depth()), 6);

        assert_eq!(doc.node_at(10).and_then(Node::heading_id), Some(&HeadingId::new("b")));
        assert!(doc.resolve(20).is_err());
    }

    #[test]
    fn test_replace_splits_and_merges_text() {
        let mut doc = sample();
        let removed = doc.replace(8, 8, vec![Node::text("--")]).unwrap();
        assert!(removed.is_empty());
        let para = &doc.content()[0].plain_blocks()[0];
        assert_eq!(para.content(), &[Node::text("x--y")]);

        let removed = doc.replace(8, 10, Vec::new()).unwrap();
        assert_eq!(removed, vec![Node::text("--")]);
        assert_eq!(doc, sample());
    }

    #[test]
    fn test_replace_rejects_schema_violations() {
        let mut doc = sample();
        let err = doc.replace(6, 6, vec![Node::text("loose")]).unwrap_err();
        assert!(matches!(err, TransformError::ContentNotAllowed { .. }));
        let err = doc.replace(5, 9, Vec::new()).unwrap_err();
        assert!(matches!(err, TransformError::CrossesNodeBoundary { .. }));
    }

    #[test]
    fn test_check_enforces_body_order_and_title_level() {
        assert!(sample().check().is_ok());

        let bad = Document::new(vec![h(
            "a",
            1,
            "A",
            vec![h("b", 2, "B", vec![]), Node::paragraph_text("late")],
        )]);
        assert!(matches!(bad.check(), Err(SchemaError::BlockAfterHeading { .. })));

        let mut drifted = h("a", 2, "A", vec![]);
        if let NodeKind::Heading { level, .. } = &mut drifted.kind {
            *level = 3;
        }
        let doc = Document::new(vec![drifted]);
        assert!(matches!(doc.check(), Err(SchemaError::TitleLevelMismatch { .. })));
    }

    #[test]
    fn test_set_level_keeps_title_in_lockstep() {
        let mut node = h("a", 2, "A", vec![]);
        node.set_heading_level(5);
        assert_eq!(node.heading_level(), Some(5));
        assert!(matches!(node.title_node().unwrap().kind(), NodeKind::ContentHeading { level: 5 }));
        assert!(node.check().is_ok());
    }

    #[test]
    fn test_slice_inline_keeps_marks() {
        let inline = vec![
            Node::text("ab"),
            Node::text_with_marks("cd", vec![Mark::Bold]),
        ];
        assert_eq!(
            slice_inline(&inline, 1, 3),
            vec![Node::text("b"), Node::text_with_marks("c", vec![Mark::Bold])]
        );
    }

    #[test]
    fn test_outline_rendering() {
        assert_eq!(sample().outline(), vec!["# Ab", "  ## C"]);
    }
}
