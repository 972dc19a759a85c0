#![warn(missing_docs)]
//! Outline Core - Headless Heading Hierarchy Engine
//!
//! # Overview
//!
//! `outline-core` keeps a rich-text document organized as a strict nested outline: every heading
//! owns a body that holds plain blocks followed by deeper sub-headings. The document itself is
//! addressed by flat integer positions, the way conventional rich-text editors address content,
//! and every structural edit (level changes, wrapping, paste, cross-heading deletion) is
//! expressed as primitive steps on that flat space.
//!
//! Two rules hold after every command:
//!
//! - a nested heading is strictly deeper than its parent;
//! - a level-1 heading is never nested.
//!
//! # Core Features
//!
//! - **STACK-ATTACH placement**: headings are placed under the nearest preceding shallower
//!   heading, found by a reverse scan over the open heading spine
//! - **Level transitions**: promote, demote, move to the root, and wrap a paragraph as a heading
//! - **Structured paste**: clipboard fragments are re-nested and level-shifted to the target
//! - **Range deletion**: selections across heading boundaries merge into the first textblock
//! - **Hierarchy repair**: a validator pass after every edit fixes whatever slipped through
//! - **Undo/redo**: one undo step per command, repairs included
//!
//! # Architecture Layers
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │  OutlineEditor (commands, undo, fold state) │  ← Public API
//! ├─────────────────────────────────────────────┤
//! │  Transitions / Clipboard / Range Delete     │  ← Structural edits
//! ├─────────────────────────────────────────────┤
//! │  Hierarchy Validator                        │  ← Post-edit repair
//! ├─────────────────────────────────────────────┤
//! │  Ancestor Finder + Heading Block Map        │  ← Placement
//! ├─────────────────────────────────────────────┤
//! │  Locator                                    │  ← Position queries
//! ├─────────────────────────────────────────────┤
//! │  Document Model + Transactions              │  ← Storage
//! └─────────────────────────────────────────────┘
//! ```
//!
//! # Quick Start
//!
//! ```rust
//! use outline_core::{Command, EngineConfig, HeadingId, OutlineEditor};
//!
//! let mut editor = OutlineEditor::from_outline(
//!     "# Guide\n\nIntro text\n\n## Install\n",
//!     EngineConfig::default(),
//! );
//! assert_eq!(editor.document().outline(), vec!["# Guide", "  ## Install"]);
//!
//! // Select from the start of "Guide" to the end of "Install" and delete: the outline
//! // collapses into the first heading.
//! let (install, _) = editor.document().find_heading(&HeadingId::new("h2")).unwrap();
//! let head = install + 2 + "Install".len();
//! editor.execute(Command::SetSelection { anchor: 2, head }).unwrap();
//! editor.execute(Command::DeleteSelection).unwrap();
//! assert_eq!(editor.document().outline(), vec!["# "]);
//! ```
//!
//! # Module Description
//!
//! - [`model`] - Node tree, positions, schema checks
//! - [`transform`] - Steps, position mapping, transactions
//! - [`locate`] - Block/range locator and position context
//! - [`block_map`] - Heading block map and open spine
//! - [`ancestor`] - STACK-ATTACH ancestor finder
//! - [`transition`] - Level transitions and paragraph wrapping
//! - [`clipboard`] - Clipboard structurer and paste
//! - [`range_delete`] - Cross-heading range deletion
//! - [`validator`] - Hierarchy validator
//! - [`session`] - Fold state, single-flight guard, identifiers
//! - [`editor`] - Command interface and undo/redo
//! - [`json`] / [`markdown`] - Interchange formats

pub mod ancestor;
pub mod block_map;
pub mod clipboard;
pub mod config;
pub mod editor;
pub mod error;
mod history;
pub mod json;
pub mod locate;
pub mod markdown;
pub mod model;
pub mod range_delete;
pub mod session;
pub mod transform;
pub mod transition;
pub mod validator;

pub use ancestor::{
    Attachment, attach_heading, find_prev_block, insertion_point, nest_flat_headings,
    root_insertion_point,
};
pub use block_map::{BlockInfo, document_block_map, heading_block_map, open_spine};
pub use clipboard::{AdjustedHeadings, StructuredClipboard, adjust_heading_levels_for_context};
pub use config::EngineConfig;
pub use editor::{Command, CommandError, CommandResult, OutlineEditor};
pub use error::{EngineError, LocateError, SchemaError, TransformError};
pub use json::{document_from_json, document_to_json, node_from_json, node_to_json};
pub use locate::{BlockDescriptor, PositionContext, blocks_in_range, position_context};
pub use markdown::{heading_marker, parse_outline, to_outline};
pub use model::{
    BODY_CLOSE_OFFSET, Document, HeadingId, HeadingLayout, MAX_LEVEL, MIN_LEVEL, Mark, Node,
    NodeKind, ResolvedPos,
};
pub use range_delete::delete_range;
pub use session::{FoldState, IdGenerator, Session};
pub use transform::{
    Assoc, EditOrigin, Mapping, Selection, Step, StepMap, Transaction, TransactionMeta,
};
pub use transition::{
    TransitionKind, TransitionOutcome, change_heading_level, demote, promote, set_heading_level,
    transition_kind, wrap_as_heading,
};
pub use validator::{HierarchyValidator, Violation, ViolationKind, find_violations};
