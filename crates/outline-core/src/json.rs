//! JSON interchange form of the document model.
//!
//! Nodes are objects with a `type`, optional `attrs`, `content`, `text` and `marks`:
//!
//! ```json
//! { "type": "heading", "attrs": { "id": "h1", "level": 1 }, "content": [
//!     { "type": "contentHeading", "attrs": { "level": 1 }, "content": [
//!         { "type": "text", "text": "Intro", "marks": [{ "type": "bold" }] }
//!     ] },
//!     { "type": "contentWrapper", "content": [] }
//! ] }
//! ```
//!
//! Loading a document checks it against the node schema. Heading hierarchy rules are not part
//! of the schema, so an invalid outline loads fine and is left to the validator.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::SchemaError;
use crate::model::{Document, HeadingId, MAX_LEVEL, MIN_LEVEL, Mark, Node, NodeKind};

/// Raw JSON shape of a node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeJson {
    /// Schema name.
    #[serde(rename = "type")]
    pub node_type: String,
    /// Node attributes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attrs: Option<Map<String, Value>>,
    /// Child nodes.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub content: Vec<NodeJson>,
    /// Characters of a text node.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Marks of a text node.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub marks: Vec<MarkJson>,
}

/// Raw JSON shape of a mark.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkJson {
    /// Mark name.
    #[serde(rename = "type")]
    pub mark_type: String,
    /// Mark attributes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attrs: Option<Map<String, Value>>,
}

impl MarkJson {
    fn from_mark(mark: &Mark) -> Self {
        let attrs = match mark {
            Mark::Link { href } => {
                let mut attrs = Map::new();
                attrs.insert("href".to_string(), Value::String(href.clone()));
                Some(attrs)
            }
            _ => None,
        };
        Self {
            mark_type: mark.name().to_string(),
            attrs,
        }
    }

    fn to_mark(&self) -> Result<Mark, SchemaError> {
        Ok(match self.mark_type.as_str() {
            "bold" => Mark::Bold,
            "italic" => Mark::Italic,
            "code" => Mark::Code,
            "strike" => Mark::Strike,
            "link" => Mark::Link {
                href: self
                    .attrs
                    .as_ref()
                    .and_then(|attrs| attrs.get("href"))
                    .and_then(Value::as_str)
                    .ok_or(SchemaError::MissingAttr {
                        node: "link",
                        attr: "href",
                    })?
                    .to_string(),
            },
            other => return Err(SchemaError::UnknownMark(other.to_string())),
        })
    }
}

fn level_attr(attrs: Option<&Map<String, Value>>, node: &'static str) -> Result<u8, SchemaError> {
    let level = attrs
        .and_then(|attrs| attrs.get("level"))
        .and_then(Value::as_i64)
        .ok_or(SchemaError::MissingAttr {
            node,
            attr: "level",
        })?;
    u8::try_from(level)
        .ok()
        .filter(|level| (MIN_LEVEL..=MAX_LEVEL).contains(level))
        .ok_or(SchemaError::InvalidLevel(level))
}

impl NodeJson {
    /// JSON shape of `node`.
    pub fn from_node(node: &Node) -> Self {
        let mut attrs = Map::new();
        let mut text = None;
        let mut marks = Vec::new();
        match node.kind() {
            NodeKind::Heading { id, level } => {
                attrs.insert("id".to_string(), Value::String(id.to_string()));
                attrs.insert("level".to_string(), Value::from(*level));
            }
            NodeKind::ContentHeading { level } => {
                attrs.insert("level".to_string(), Value::from(*level));
            }
            NodeKind::Text {
                text: chars,
                marks: node_marks,
            } => {
                text = Some(chars.clone());
                marks = node_marks.iter().map(MarkJson::from_mark).collect();
            }
            _ => {}
        }
        Self {
            node_type: node.kind().name().to_string(),
            attrs: (!attrs.is_empty()).then_some(attrs),
            content: node.content().iter().map(Self::from_node).collect(),
            text,
            marks,
        }
    }

    /// Build the node this JSON describes. The result is not schema-checked.
    pub fn to_node(&self) -> Result<Node, SchemaError> {
        let attrs = self.attrs.as_ref();
        let kind = match self.node_type.as_str() {
            "doc" => NodeKind::Doc,
            "heading" => NodeKind::Heading {
                id: attrs
                    .and_then(|attrs| attrs.get("id"))
                    .and_then(Value::as_str)
                    .map(HeadingId::new)
                    .ok_or(SchemaError::MissingAttr {
                        node: "heading",
                        attr: "id",
                    })?,
                level: level_attr(attrs, "heading")?,
            },
            "contentHeading" => NodeKind::ContentHeading {
                level: level_attr(attrs, "contentHeading")?,
            },
            "contentWrapper" => NodeKind::ContentWrapper,
            "paragraph" => NodeKind::Paragraph,
            "bulletList" => NodeKind::BulletList,
            "listItem" => NodeKind::ListItem,
            "blockquote" => NodeKind::Blockquote,
            "text" => {
                let marks = self
                    .marks
                    .iter()
                    .map(MarkJson::to_mark)
                    .collect::<Result<Vec<_>, _>>()?;
                return Ok(Node::text_with_marks(
                    self.text.clone().unwrap_or_default(),
                    marks,
                ));
            }
            other => return Err(SchemaError::UnknownNodeType(other.to_string())),
        };
        let content = self
            .content
            .iter()
            .map(Self::to_node)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Node::new(kind, content))
    }
}

/// Parse a single node and check it against the schema.
pub fn node_from_json(json: &str) -> Result<Node, SchemaError> {
    let raw: NodeJson = serde_json::from_str(json)?;
    let node = raw.to_node()?;
    node.check()?;
    Ok(node)
}

/// Parse and check a whole document. The top-level value must be a `doc` node.
pub fn document_from_json(json: &str) -> Result<Document, SchemaError> {
    let root = node_from_json(json)?;
    let doc = Document::from_root(root).ok_or_else(|| SchemaError::InvalidContent {
        parent: "document",
        child: "non-doc root",
    })?;
    Ok(doc)
}

/// Pretty-printed JSON for `node`.
pub fn node_to_json(node: &Node) -> Result<String, SchemaError> {
    Ok(serde_json::to_string_pretty(&NodeJson::from_node(node))?)
}

/// Pretty-printed JSON for `doc`.
pub fn document_to_json(doc: &Document) -> Result<String, SchemaError> {
    node_to_json(doc.root())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::inline_text;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_heading_round_trip_keeps_marks() {
        let heading = Node::heading(
            HeadingId::new("h1"),
            2,
            vec![
                Node::text("plain "),
                Node::text_with_marks(
                    "link",
                    vec![Mark::Link {
                        href: "https://example.com".to_string(),
                    }],
                ),
            ],
            vec![Node::paragraph(inline_text("body"))],
        );
        let json = node_to_json(&heading).unwrap();
        assert!(json.contains("\"contentHeading\""));
        assert_eq!(node_from_json(&json).unwrap(), heading);
    }

    #[test]
    fn test_nested_h1_loads_without_repair() {
        let json = r#"{"type":"doc","content":[
            {"type":"heading","attrs":{"id":"a","level":2},"content":[
                {"type":"contentHeading","attrs":{"level":2},"content":[{"type":"text","text":"A"}]},
                {"type":"contentWrapper","content":[
                    {"type":"heading","attrs":{"id":"b","level":1},"content":[
                        {"type":"contentHeading","attrs":{"level":1}},
                        {"type":"contentWrapper"}
                    ]}
                ]}
            ]}
        ]}"#;
        let doc = document_from_json(json).unwrap();
        assert_eq!(doc.outline(), vec!["## A", "  # "]);
    }

    #[test]
    fn test_rejects_bad_input() {
        assert!(matches!(
            node_from_json(r#"{"type":"table"}"#),
            Err(SchemaError::UnknownNodeType(name)) if name == "table"
        ));
        assert!(matches!(
            node_from_json(
                r#"{"type":"heading","attrs":{"id":"x","level":11},"content":[]}"#
            ),
            Err(SchemaError::InvalidLevel(11))
        ));
        assert!(matches!(
            node_from_json(r#"{"type":"heading","attrs":{"level":1}}"#),
            Err(SchemaError::MissingAttr { attr: "id", .. })
        ));
        assert!(matches!(
            node_from_json(r#"{"type":"paragraph","content":[{"type":"paragraph"}]}"#),
            Err(SchemaError::InvalidContent { .. })
        ));
        assert!(matches!(
            document_from_json(r#"{"type":"paragraph"}"#),
            Err(SchemaError::InvalidContent { .. })
        ));
    }
}
