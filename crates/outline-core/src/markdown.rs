//! Plain-text outline import and export.
//!
//! Lines starting with one to ten `#` followed by whitespace are headings; `- ` lines are bullet
//! items, `> ` lines are quoted, and every other run of non-blank lines is a paragraph. Content
//! before the first heading lands in an untitled level-1 heading.

use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use crate::ancestor::nest_flat_headings;
use crate::model::{Document, Node, NodeKind, inline_text};
use crate::session::IdGenerator;

static HEADING_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(#{1,10})(?:[ \t]+(.*?))?[ \t]*$").expect("valid heading regex")
});

static HEADING_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(#{1,10}) $").expect("valid marker regex"));

/// Level of a typed heading marker such as `"## "`, or `None` when `text` is anything else.
pub fn heading_marker(text: &str) -> Option<u8> {
    let caps = HEADING_MARKER.captures(text)?;
    u8::try_from(caps[1].len()).ok()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pending {
    None,
    Paragraph,
    List,
    Quote,
}

struct Builder<'a> {
    ids: &'a mut IdGenerator,
    leading: Vec<Node>,
    flat: Vec<Node>,
    lines: Vec<String>,
    pending: Pending,
}

impl Builder<'_> {
    fn flush(&mut self) {
        let lines = std::mem::take(&mut self.lines);
        let block = match self.pending {
            Pending::None => return,
            Pending::Paragraph => Node::paragraph(inline_text(&lines.join(" "))),
            Pending::List => Node::bullet_list(
                lines
                    .iter()
                    .map(|line| Node::list_item(vec![Node::paragraph_text(line)]))
                    .collect(),
            ),
            Pending::Quote => {
                Node::blockquote(vec![Node::paragraph(inline_text(&lines.join(" ")))])
            }
        };
        self.pending = Pending::None;
        match self.flat.last_mut() {
            Some(heading) => heading.push_plain_block(block),
            None => self.leading.push(block),
        }
    }

    fn push_line(&mut self, kind: Pending, line: &str) {
        if self.pending != kind {
            self.flush();
            self.pending = kind;
        }
        self.lines.push(line.to_string());
    }
}

/// Parse outline text into a document, giving every heading a fresh identifier.
pub fn parse_outline(text: &str, ids: &mut IdGenerator) -> Document {
    let mut builder = Builder {
        ids,
        leading: Vec::new(),
        flat: Vec::new(),
        lines: Vec::new(),
        pending: Pending::None,
    };

    for line in text.lines() {
        let trimmed = line.trim_end();
        if let Some(caps) = HEADING_LINE.captures(trimmed) {
            builder.flush();
            let level = u8::try_from(caps[1].len()).unwrap_or(1);
            let title = caps.get(2).map_or("", |m| m.as_str());
            let id = builder.ids.next_id();
            builder
                .flat
                .push(Node::heading(id, level, inline_text(title), Vec::new()));
        } else if trimmed.trim().is_empty() {
            builder.flush();
        } else if let Some(item) = trimmed.strip_prefix("- ") {
            builder.push_line(Pending::List, item.trim());
        } else if let Some(quoted) = trimmed.strip_prefix("> ") {
            builder.push_line(Pending::Quote, quoted.trim());
        } else {
            builder.push_line(Pending::Paragraph, trimmed.trim());
        }
    }
    builder.flush();

    let Builder {
        ids,
        leading,
        mut flat,
        ..
    } = builder;
    // Text before the first heading opens an untitled top-level heading; deeper headings nest in it.
    if !leading.is_empty() {
        flat.insert(0, Node::heading(ids.next_id(), 1, Vec::new(), leading));
    }
    let headings = nest_flat_headings(flat);
    debug!(headings = headings.len(), "outline text parsed");
    Document::new(headings)
}

fn write_block(block: &Node, out: &mut String) {
    match block.kind() {
        NodeKind::BulletList => {
            for item in block.content() {
                out.push_str("- ");
                out.push_str(&item.text_content());
                out.push('\n');
            }
        }
        NodeKind::Blockquote => {
            out.push_str("> ");
            out.push_str(&block.text_content());
            out.push('\n');
        }
        _ => {
            out.push_str(&block.text_content());
            out.push('\n');
        }
    }
    out.push('\n');
}

fn write_heading(heading: &Node, out: &mut String) {
    let level = heading.heading_level().unwrap_or(1);
    out.push_str(&"#".repeat(usize::from(level)));
    out.push(' ');
    out.push_str(&heading.title_text());
    out.push_str("\n\n");
    for block in heading.plain_blocks() {
        write_block(block, out);
    }
    for child in heading.child_headings() {
        write_heading(child, out);
    }
}

/// Render `doc` as outline text.
pub fn to_outline(doc: &Document) -> String {
    let mut out = String::new();
    for heading in doc.content() {
        write_heading(heading, &mut out);
    }
    let trimmed = out.trim_end().len();
    out.truncate(trimmed);
    out.push('\n');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_heading_marker() {
        assert_eq!(heading_marker("# "), Some(1));
        assert_eq!(heading_marker("### "), Some(3));
        assert_eq!(heading_marker("#"), None);
        assert_eq!(heading_marker("#x "), None);
        assert_eq!(heading_marker(&format!("{} ", "#".repeat(11))), None);
    }

    #[test]
    fn test_parse_nests_by_level() {
        let text = "# Intro\n\nhello\nworld\n\n## Setup\n\n- one\n- two\n\n# Usage\n";
        let doc = parse_outline(text, &mut IdGenerator::new("h"));
        assert_eq!(doc.outline(), vec!["# Intro", "  ## Setup", "# Usage"]);
        let intro = &doc.content()[0];
        assert_eq!(intro.plain_blocks(), &[Node::paragraph_text("hello world")]);
        assert!(doc.check().is_ok());
    }

    #[test]
    fn test_leading_text_gets_untitled_heading() {
        let doc = parse_outline("preface\n\n## Later\n", &mut IdGenerator::new("h"));
        assert_eq!(doc.outline(), vec!["# ", "  ## Later"]);
        assert_eq!(
            doc.content()[0].plain_blocks(),
            &[Node::paragraph_text("preface")]
        );
    }

    #[test]
    fn test_bare_marker_line_is_untitled_heading() {
        let doc = parse_outline("#\n\ntext\n", &mut IdGenerator::new("h"));
        assert_eq!(doc.outline(), vec!["# "]);
        assert_eq!(to_outline(&doc), "# \n\ntext\n");
    }

    #[test]
    fn test_export_then_import_keeps_structure() {
        let text = "# A\n\nbody\n\n## B\n\n> quoted\n\n### C\n\n# D\n";
        let doc = parse_outline(text, &mut IdGenerator::new("h"));
        assert_eq!(to_outline(&doc), text);
    }
}
