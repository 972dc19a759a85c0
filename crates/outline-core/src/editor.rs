//! Command layer: the host-facing entry point of the engine.
//!
//! [`OutlineEditor`] owns the document, the selection and the per-document [`Session`]. Every
//! structural command runs inside the session's single-flight guard on a fresh
//! [`Transaction`]; once the handler succeeds the hierarchy validator repairs the result, the
//! repair is folded into the same transaction, and the whole thing becomes one undo step.

use thiserror::Error;
use tracing::{debug, warn};

use crate::clipboard::paste;
use crate::config::EngineConfig;
use crate::error::{EngineError, TransformError};
use crate::history::{History, Revision};
use crate::markdown::{heading_marker, parse_outline};
use crate::model::{Document, HeadingId, Node, NodeKind, inline_text, slice_inline};
use crate::range_delete::delete_range;
use crate::session::{FoldState, IdGenerator, Session};
use crate::transform::{EditOrigin, Selection, Step, Transaction};
use crate::transition::{demote, promote, set_heading_level, wrap_as_heading};
use crate::validator::HierarchyValidator;

/// Commands understood by [`OutlineEditor::execute`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Move the selection.
    SetSelection {
        /// Fixed end.
        anchor: usize,
        /// Moving end.
        head: usize,
    },
    /// Type text at the selection, replacing it. `#`…`# ` at the start of a body paragraph
    /// turns the paragraph into a heading.
    InsertText {
        /// Text to insert.
        text: String,
    },
    /// Move the heading at the caret deeper, or wrap the paragraph at the caret.
    Promote {
        /// Target level.
        level: u8,
    },
    /// Move the heading at the caret shallower, or wrap the paragraph at the caret.
    Demote {
        /// Target level.
        level: u8,
    },
    /// Set the level of the heading at the caret in either direction.
    SetLevel {
        /// Target level.
        level: u8,
    },
    /// Wrap the body paragraph at the caret into a heading.
    WrapAsHeading {
        /// Level of the new heading.
        level: u8,
    },
    /// Paste a clipboard fragment at the selection.
    Paste {
        /// Nodes taken from the clipboard.
        fragment: Vec<Node>,
    },
    /// Delete the selection.
    DeleteSelection,
    /// Collapse or expand a heading.
    ToggleFold {
        /// The heading to toggle.
        id: HeadingId,
    },
    /// Undo the last change group.
    Undo,
    /// Redo the last undone change group.
    Redo,
    /// Close the current typing group so the next edit starts a new undo step.
    EndUndoGroup,
}

/// Command execution result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandResult {
    /// The command ran.
    Applied,
    /// The command did not apply at the current selection; nothing changed.
    Ignored,
    /// A fold toggle ran; `collapsed` is the new state.
    FoldToggled {
        /// Whether the heading is now collapsed.
        collapsed: bool,
    },
}

/// Command error type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    /// The engine rejected the operation.
    #[error(transparent)]
    Engine(#[from] EngineError),
    /// A primitive edit failed.
    #[error(transparent)]
    Transform(#[from] TransformError),
    /// The undo stack is empty.
    #[error("nothing to undo")]
    NothingToUndo,
    /// The redo stack is empty.
    #[error("nothing to redo")]
    NothingToRedo,
    /// A selection endpoint lies outside the document.
    #[error("selection {anchor}..{head} is outside the document (size {size})")]
    InvalidSelection {
        /// Requested anchor.
        anchor: usize,
        /// Requested head.
        head: usize,
        /// Document size.
        size: usize,
    },
}

/// Host-facing editor over one outline document.
///
/// ```rust
/// use outline_core::{Command, CommandResult, EngineConfig, OutlineEditor};
///
/// let mut editor = OutlineEditor::from_outline("# Intro\n\n# Setup\n", EngineConfig::default());
/// // Caret in the "Setup" title.
/// let setup = editor.document().content()[1].clone();
/// let (pos, _) = editor.document().find_heading(setup.heading_id().unwrap()).unwrap();
/// editor.execute(Command::SetSelection { anchor: pos + 2, head: pos + 2 }).unwrap();
///
/// let result = editor.execute(Command::Promote { level: 2 }).unwrap();
/// assert_eq!(result, CommandResult::Applied);
/// assert_eq!(editor.document().outline(), vec!["# Intro", "  ## Setup"]);
///
/// editor.execute(Command::Undo).unwrap();
/// assert_eq!(editor.document().outline(), vec!["# Intro", "# Setup"]);
/// ```
#[derive(Debug)]
pub struct OutlineEditor {
    doc: Document,
    selection: Selection,
    config: EngineConfig,
    session: Session,
    validator: HierarchyValidator,
    command_history: Vec<Command>,
    history: History,
    last_transaction: Option<Transaction>,
}

impl OutlineEditor {
    /// Editor over `doc` with the caret at the start.
    pub fn new(doc: Document, config: EngineConfig) -> Self {
        let mut session = Session::new("untitled", &config.id_prefix);
        session.ids_mut().observe(&doc);
        Self {
            doc,
            selection: Selection::default(),
            validator: HierarchyValidator::new(&config),
            history: History::new(config.max_undo),
            config,
            session,
            command_history: Vec::new(),
            last_transaction: None,
        }
    }

    /// Editor over a document parsed from outline text.
    pub fn from_outline(text: &str, config: EngineConfig) -> Self {
        let mut ids = IdGenerator::new(config.id_prefix.clone());
        let doc = parse_outline(text, &mut ids);
        Self::new(doc, config)
    }

    /// Switch to another document. Fold state, the guard and the history are reset.
    pub fn load_document(&mut self, document_key: impl Into<String>, doc: Document) {
        self.session.reset(document_key);
        self.session.ids_mut().observe(&doc);
        self.doc = doc;
        self.selection = Selection::default();
        self.history = History::new(self.config.max_undo);
        self.last_transaction = None;
    }

    /// Execute a command.
    pub fn execute(&mut self, command: Command) -> Result<CommandResult, CommandError> {
        self.command_history.push(command.clone());

        if !matches!(command, Command::InsertText { .. }) {
            self.history.close_batch();
        }

        match command {
            Command::SetSelection { anchor, head } => self.set_selection(anchor, head),
            Command::InsertText { text } => {
                self.run_edit(EditOrigin::User, true, |tr, config, ids| {
                    insert_text(tr, &text, config, ids)
                })
            }
            Command::Promote { level } => {
                self.run_edit(EditOrigin::LevelChange, false, |tr, config, ids| {
                    promote(tr, level, config, ids)
                })
            }
            Command::Demote { level } => {
                self.run_edit(EditOrigin::LevelChange, false, |tr, config, ids| {
                    demote(tr, level, config, ids)
                })
            }
            Command::SetLevel { level } => {
                self.run_edit(EditOrigin::LevelChange, false, |tr, config, ids| {
                    set_heading_level(tr, level, config, ids)
                })
            }
            Command::WrapAsHeading { level } => {
                self.run_edit(EditOrigin::Wrap, false, |tr, config, ids| {
                    wrap_as_heading(tr, level, config, ids)
                })
            }
            Command::Paste { fragment } => {
                self.run_edit(EditOrigin::Paste, false, |tr, config, ids| {
                    paste(tr, &fragment, config, ids)
                })
            }
            Command::DeleteSelection => {
                self.run_edit(EditOrigin::RangeDelete, false, |tr, _, _| delete_selection(tr))
            }
            Command::ToggleFold { id } => self.toggle_fold(&id),
            Command::Undo => self.undo(),
            Command::Redo => self.redo(),
            Command::EndUndoGroup => Ok(CommandResult::Applied),
        }
    }

    /// Execute commands in order, stopping at the first error.
    pub fn execute_batch(
        &mut self,
        commands: Vec<Command>,
    ) -> Result<Vec<CommandResult>, CommandError> {
        commands
            .into_iter()
            .map(|command| self.execute(command))
            .collect()
    }

    /// The current document.
    pub fn document(&self) -> &Document {
        &self.doc
    }

    /// The current selection.
    pub fn selection(&self) -> Selection {
        self.selection
    }

    /// Engine configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Session state of the open document.
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Fold state of the open document.
    pub fn fold_state(&self) -> &FoldState {
        self.session.fold()
    }

    /// Commands executed so far.
    pub fn command_history(&self) -> &[Command] {
        &self.command_history
    }

    /// The transaction committed by the last document-changing command.
    pub fn last_transaction(&self) -> Option<&Transaction> {
        self.last_transaction.as_ref()
    }

    /// Can undo
    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    /// Can redo
    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    /// Undo stack depth, in steps. Grouped typing may undo several steps at once.
    pub fn undo_depth(&self) -> usize {
        self.history.undo_depth()
    }

    /// Redo stack depth, in steps.
    pub fn redo_depth(&self) -> usize {
        self.history.redo_depth()
    }

    /// Whether the document is at the last clean point.
    pub fn is_clean(&self) -> bool {
        self.history.is_clean()
    }

    /// Mark the current state as clean (after saving).
    pub fn mark_clean(&mut self) {
        self.history.mark_clean();
    }

    fn set_selection(&mut self, anchor: usize, head: usize) -> Result<CommandResult, CommandError> {
        let size = self.doc.size();
        if anchor > size || head > size {
            return Err(CommandError::InvalidSelection { anchor, head, size });
        }
        self.selection = Selection::new(anchor, head);
        Ok(CommandResult::Applied)
    }

    fn toggle_fold(&mut self, id: &HeadingId) -> Result<CommandResult, CommandError> {
        if self.doc.find_heading(id).is_none() {
            warn!(%id, "fold toggle for an unknown heading");
            return Ok(CommandResult::Ignored);
        }
        let collapsed = self
            .session
            .single_flight(|session| session.fold_mut().toggle(id))?;
        debug!(%id, collapsed, "fold toggled");
        Ok(CommandResult::FoldToggled { collapsed })
    }

    fn run_edit(
        &mut self,
        origin: EditOrigin,
        coalescible: bool,
        handler: impl FnOnce(
            &mut Transaction,
            &EngineConfig,
            &mut IdGenerator,
        ) -> Result<bool, EngineError>,
    ) -> Result<CommandResult, CommandError> {
        let mut tr = Transaction::new(&self.doc, self.selection).with_origin(origin);
        let config = &self.config;
        let handled = self
            .session
            .single_flight(|session| handler(&mut tr, config, session.ids_mut()))??;
        if !handled {
            debug!(?origin, "command did not apply");
            return Ok(CommandResult::Ignored);
        }
        self.commit(tr, coalescible);
        Ok(CommandResult::Applied)
    }

    fn commit(&mut self, mut tr: Transaction, coalescible: bool) {
        let mut repaired = false;
        if self.config.validate_after_edit
            && tr.meta().origin != EditOrigin::Validator
            && let Some(repair) = self.validator.repair(tr.doc(), tr.selection())
        {
            tr.absorb(repair);
            repaired = true;
        }

        if self.config.expand_folded_targets {
            self.expand_ancestors_of(tr.doc(), tr.selection().head);
        }

        if tr.doc_changed() && tr.meta().add_to_history {
            let single_insert = matches!(tr.steps(), [Step::Insert { .. }]) && !repaired;
            self.history.record(Revision::of(&tr), coalescible && single_insert);
        }

        self.doc = tr.doc().clone();
        self.selection = tr.selection();
        self.session.fold_mut().retain_existing(&self.doc);
        if tr.doc_changed() {
            self.last_transaction = Some(tr);
        }
    }

    /// Expand collapsed headings whose body holds `pos`.
    fn expand_ancestors_of(&mut self, doc: &Document, pos: usize) {
        let Ok(resolved) = doc.resolve(pos) else {
            return;
        };
        for depth in 0..resolved.depth() {
            let node = resolved.node(depth);
            if let Some(id) = node.heading_id()
                && matches!(resolved.node(depth + 1).kind(), NodeKind::ContentWrapper)
                && self.session.fold_mut().expand(id)
            {
                debug!(%id, "expanded collapsed destination");
            }
        }
    }

    fn undo(&mut self) -> Result<CommandResult, CommandError> {
        let (doc, selection) = (&self.doc, self.selection);
        let tr = self
            .history
            .undo(|batch| {
                let mut tr = Transaction::new(doc, selection)
                    .with_origin(EditOrigin::History)
                    .without_history();
                for revision in batch.revisions().iter().rev() {
                    for inverse in revision.inverted().iter().rev() {
                        tr.step(inverse.clone())?;
                    }
                    tr.set_selection(revision.selection_before());
                }
                debug!(revisions = batch.revisions().len(), "undo");
                Ok::<_, TransformError>(tr)
            })
            .ok_or(CommandError::NothingToUndo)??;
        self.finish_history(tr);
        Ok(CommandResult::Applied)
    }

    fn redo(&mut self) -> Result<CommandResult, CommandError> {
        let (doc, selection) = (&self.doc, self.selection);
        let tr = self
            .history
            .redo(|batch| {
                let mut tr = Transaction::new(doc, selection)
                    .with_origin(EditOrigin::History)
                    .without_history();
                for revision in batch.revisions() {
                    for forward in revision.steps() {
                        tr.step(forward.clone())?;
                    }
                    tr.set_selection(revision.selection_after());
                }
                debug!(revisions = batch.revisions().len(), "redo");
                Ok::<_, TransformError>(tr)
            })
            .ok_or(CommandError::NothingToRedo)??;
        self.finish_history(tr);
        Ok(CommandResult::Applied)
    }

    fn finish_history(&mut self, tr: Transaction) {
        self.doc = tr.doc().clone();
        self.selection = tr.selection();
        self.session.fold_mut().retain_existing(&self.doc);
        self.last_transaction = Some(tr);
    }
}

/// Replace the selection with `text`, then apply the heading-marker input rule.
fn insert_text(
    tr: &mut Transaction,
    text: &str,
    config: &EngineConfig,
    ids: &mut IdGenerator,
) -> Result<bool, EngineError> {
    if !tr.selection().is_empty() && !delete_selection(tr)? {
        return Ok(false);
    }
    let pos = tr.selection().head;
    let resolved = tr.doc().resolve(pos)?;
    if !resolved.parent().kind().is_textblock() {
        warn!(pos, "text can only be typed into a textblock");
        return Ok(tr.doc_changed());
    }
    if text.is_empty() {
        return Ok(tr.doc_changed());
    }

    tr.insert(pos, inline_text(text))?;
    let caret = pos + text.chars().count();
    tr.set_selection(Selection::caret(caret));

    apply_heading_marker(tr, config, ids)?;
    Ok(true)
}

/// `#`…`# ` typed at the start of a body paragraph: drop the marker and wrap the paragraph.
fn apply_heading_marker(
    tr: &mut Transaction,
    config: &EngineConfig,
    ids: &mut IdGenerator,
) -> Result<(), EngineError> {
    let caret = tr.selection().head;
    let resolved = tr.doc().resolve(caret)?;
    if !matches!(resolved.parent().kind(), NodeKind::Paragraph) {
        return Ok(());
    }
    let prefix: String = slice_inline(resolved.parent().content(), 0, resolved.parent_offset())
        .iter()
        .map(Node::text_content)
        .collect();
    let Some(level) = heading_marker(&prefix) else {
        return Ok(());
    };

    let start = resolved.start(resolved.depth());
    let mut attempt = tr.clone();
    attempt.delete(start, caret)?;
    attempt.set_selection(Selection::caret(start));
    if wrap_as_heading(&mut attempt, level, config, ids)? {
        debug!(level, "heading marker applied");
        *tr = attempt;
    }
    Ok(())
}

/// Structural range deletion, falling back to a plain delete inside one textblock.
fn delete_selection(tr: &mut Transaction) -> Result<bool, EngineError> {
    let selection = tr.selection();
    if selection.is_empty() {
        return Ok(false);
    }
    if delete_range(tr)? {
        return Ok(true);
    }
    match tr.delete(selection.from(), selection.to()) {
        Ok(_) => {
            tr.set_selection(Selection::caret(selection.from()));
            Ok(true)
        }
        Err(err) => {
            warn!(
                from = selection.from(),
                to = selection.to(),
                %err,
                "selection cannot be deleted"
            );
            Ok(false)
        }
    }
}
