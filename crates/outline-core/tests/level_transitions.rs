use outline_core::{
    Command, CommandResult, Document, EngineConfig, HeadingId, HeadingLayout, OutlineEditor,
    Selection, find_violations,
};
use pretty_assertions::assert_eq;

fn editor(text: &str) -> OutlineEditor {
    OutlineEditor::from_outline(text, EngineConfig::default())
}

fn heading_pos(doc: &Document, title: &str) -> usize {
    let mut found = None;
    doc.descendants(&mut |node, pos| {
        if found.is_none() && node.is_heading() && node.title_text() == title {
            found = Some(pos);
        }
        found.is_none()
    });
    found.unwrap_or_else(|| panic!("no heading titled {title:?}"))
}

fn caret_in_title(editor: &mut OutlineEditor, title: &str) {
    let pos = heading_pos(editor.document(), title) + 2;
    editor
        .execute(Command::SetSelection {
            anchor: pos,
            head: pos,
        })
        .unwrap();
}

#[test]
fn test_promote_nests_under_previous_sibling() {
    let mut editor = editor("# Intro\n\n## A\n\n## B\n");
    caret_in_title(&mut editor, "B");

    let result = editor.execute(Command::Promote { level: 3 }).unwrap();

    assert_eq!(result, CommandResult::Applied);
    assert_eq!(
        editor.document().outline(),
        vec!["# Intro", "  ## A", "    ### B"]
    );
    let pos = heading_pos(editor.document(), "B");
    let node = editor.document().node_at(pos).unwrap();
    let layout = HeadingLayout::of(node, pos).unwrap();
    assert_eq!(editor.selection(), Selection::caret(layout.title_content_end));
}

#[test]
fn test_demote_to_root_keeps_children_nested() {
    let mut editor = editor("# Top\n\n## A\n\n### X\n");
    caret_in_title(&mut editor, "A");

    editor.execute(Command::Demote { level: 1 }).unwrap();

    assert_eq!(editor.document().outline(), vec!["# Top", "# A", "  ### X"]);
    let (_, x) = editor
        .document()
        .find_heading(&HeadingId::new("h3"))
        .unwrap();
    assert_eq!(x.title_text(), "X");
}

#[test]
fn test_set_level_root_gathers_following_deeper_headings() {
    let mut editor = editor("# R\n\n## A\n\n### B\n\nbody\n\n## C\n");
    caret_in_title(&mut editor, "B");

    editor.execute(Command::SetLevel { level: 1 }).unwrap();

    assert_eq!(
        editor.document().outline(),
        vec!["# R", "  ## A", "# B", "  ## C"]
    );
    let b = editor.document().content()[1].clone();
    assert_eq!(b.plain_blocks().len(), 1);
    assert_eq!(b.plain_blocks()[0].text_content(), "body");
}

#[test]
fn test_promote_then_demote_restores_document() {
    let mut editor = editor("# Intro\n\n## A\n\ntext a\n\n## B\n\n### B1\n\n## C\n");
    let original = editor.document().clone();
    caret_in_title(&mut editor, "B");

    editor.execute(Command::Promote { level: 3 }).unwrap();
    assert_eq!(
        editor.document().outline(),
        vec!["# Intro", "  ## A", "    ### B", "    ### B1", "  ## C"]
    );

    editor.execute(Command::Demote { level: 2 }).unwrap();
    assert_eq!(editor.document(), &original);
}

#[test]
fn test_first_heading_stays_at_top_level() {
    let mut editor = editor("# First\n\n## Second\n");
    let before = editor.document().clone();
    caret_in_title(&mut editor, "First");

    let result = editor.execute(Command::Promote { level: 2 }).unwrap();

    assert_eq!(result, CommandResult::Applied);
    assert_eq!(editor.document(), &before);
    assert!(!editor.can_undo());
}

#[test]
fn test_wrong_direction_is_ignored() {
    let mut editor = editor("# R\n\n## A\n");
    let before = editor.document().clone();
    caret_in_title(&mut editor, "A");

    assert_eq!(
        editor.execute(Command::Promote { level: 1 }).unwrap(),
        CommandResult::Ignored
    );
    assert_eq!(
        editor.execute(Command::Demote { level: 3 }).unwrap(),
        CommandResult::Ignored
    );
    assert_eq!(
        editor.execute(Command::SetLevel { level: 2 }).unwrap(),
        CommandResult::Ignored
    );
    assert_eq!(editor.document(), &before);
}

#[test]
fn test_level_change_on_empty_document_is_ignored() {
    let mut editor = OutlineEditor::new(Document::default(), EngineConfig::default());
    assert_eq!(
        editor.execute(Command::SetLevel { level: 2 }).unwrap(),
        CommandResult::Ignored
    );
}

#[test]
fn test_target_level_is_clamped_to_config() {
    let config = EngineConfig::default().with_max_level(3);
    let mut editor = OutlineEditor::from_outline("# R\n\n## A\n\n### B\n\n## C\n", config);
    caret_in_title(&mut editor, "C");

    editor.execute(Command::Promote { level: 9 }).unwrap();

    assert_eq!(
        editor.document().outline(),
        vec!["# R", "  ## A", "    ### B", "    ### C"]
    );
    assert!(find_violations(editor.document()).is_empty());
}

#[test]
fn test_unnormalized_zero_max_level_caps_at_top_level() {
    let config = EngineConfig {
        max_level: 0,
        ..EngineConfig::default()
    };
    let mut editor = OutlineEditor::from_outline("# R\n\n## A\n", config);
    caret_in_title(&mut editor, "A");

    let result = editor.execute(Command::SetLevel { level: 2 }).unwrap();

    assert_eq!(result, CommandResult::Applied);
    assert_eq!(editor.document().outline(), vec!["# R", "# A"]);
}
