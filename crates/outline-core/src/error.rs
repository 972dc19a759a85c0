//! Error types shared by the document model, the locator, and the hierarchy engine.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
/// Errors raised while resolving positions or applying primitive edits.
pub enum TransformError {
    #[error("position {pos} is outside the document (size {size})")]
    /// A position lies past the end of the addressed node.
    PositionOutOfBounds {
        /// The offending position.
        pos: usize,
        /// Content size of the node the position was resolved against.
        size: usize,
    },

    #[error("invalid range {from}..{to}")]
    /// The range is reversed or extends past the node.
    InvalidRange {
        /// Range start.
        from: usize,
        /// Range end.
        to: usize,
    },

    #[error("position {pos} cuts through a non-text node")]
    /// A replace boundary falls inside a block that cannot be split.
    CrossesNodeBoundary {
        /// The offending position.
        pos: usize,
    },

    #[error("'{child}' is not allowed inside '{parent}'")]
    /// Inserted content does not fit the schema of its new parent.
    ContentNotAllowed {
        /// Schema name of the parent node.
        parent: &'static str,
        /// Schema name of the rejected child.
        child: &'static str,
    },
}

#[derive(Debug, Error)]
/// Errors raised while loading or checking a document against the node schema.
pub enum SchemaError {
    #[error("JSON error: {0}")]
    /// Parsing or shaping the JSON interchange form failed.
    Json(#[from] serde_json::Error),

    #[error("unknown node type '{0}'")]
    /// The node type is not part of the schema.
    UnknownNodeType(String),

    #[error("unknown mark type '{0}'")]
    /// The mark type is not part of the schema.
    UnknownMark(String),

    #[error("node '{node}' is missing attribute '{attr}'")]
    /// A required attribute was absent.
    MissingAttr {
        /// Schema name of the node.
        node: &'static str,
        /// The missing attribute.
        attr: &'static str,
    },

    #[error("heading level {0} is outside 1..=10")]
    /// A heading or title carried an out-of-range level.
    InvalidLevel(i64),

    #[error("'{child}' is not allowed inside '{parent}'")]
    /// A child node does not fit its parent's content expression.
    InvalidContent {
        /// Schema name of the parent node.
        parent: &'static str,
        /// Schema name of the rejected child.
        child: &'static str,
    },

    #[error("heading '{id}' must hold exactly one title followed by one body")]
    /// A heading does not have the `contentHeading contentWrapper` shape.
    MalformedHeading {
        /// Identifier of the heading.
        id: String,
    },

    #[error("heading '{id}' has level {heading} but its title has level {title}")]
    /// The title level drifted from the heading level.
    TitleLevelMismatch {
        /// Identifier of the heading.
        id: String,
        /// Level stored on the heading.
        heading: u8,
        /// Level stored on the title.
        title: u8,
    },

    #[error("heading '{id}' has a plain block after a nested heading")]
    /// A body mixes plain blocks after nested headings.
    BlockAfterHeading {
        /// Identifier of the heading.
        id: String,
    },

    #[error("'{0}' must not be empty")]
    /// A node that requires content has none (empty text, empty list).
    EmptyNode(&'static str),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
/// Errors raised by the range locator.
pub enum LocateError {
    #[error("range starts inside the title at {pos}")]
    /// The range begins inside a heading title, which is not a block boundary.
    InsideTitle {
        /// The rejected start position.
        pos: usize,
    },

    #[error(transparent)]
    /// Position resolution failed.
    Transform(#[from] TransformError),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
/// Errors raised by the hierarchy engine operations.
pub enum EngineError {
    #[error("ancestor lookup requires a non-empty block map")]
    /// STACK-ATTACH was asked to place a heading with nothing before it.
    EmptyBlockMap,

    #[error("no heading starts at position {pos}")]
    /// The position does not address a heading node.
    HeadingNotFound {
        /// The offending position.
        pos: usize,
    },

    #[error("node is not a heading")]
    /// A heading-only operation received another node kind.
    NotAHeading,

    #[error("a structural operation is already in progress")]
    /// The single-flight guard rejected a re-entrant operation.
    Busy,

    #[error(transparent)]
    /// The range locator rejected the selection.
    Locate(#[from] LocateError),

    #[error(transparent)]
    /// A primitive edit failed.
    Transform(#[from] TransformError),
}
