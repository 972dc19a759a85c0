use outline_core::{Command, EngineConfig, HeadingId, Node, OutlineEditor, Selection};
use pretty_assertions::assert_eq;

fn select(editor: &mut OutlineEditor, anchor: usize, head: usize) {
    editor
        .execute(Command::SetSelection { anchor, head })
        .unwrap();
}

#[test]
fn test_delete_from_body_into_next_title() {
    // Body paragraph "alpha" has content 11..16 and the "B" title ends at 22.
    let mut editor = OutlineEditor::from_outline(
        "# r\n\n## A\n\nalpha\n\n## B\n\nbeta\n",
        EngineConfig::default(),
    );
    select(&mut editor, 13, 22);

    editor.execute(Command::DeleteSelection).unwrap();

    assert_eq!(editor.document().outline(), vec!["# r", "  ## A"]);
    let (_, a) = editor
        .document()
        .find_heading(&HeadingId::new("h2"))
        .unwrap();
    assert_eq!(
        a.plain_blocks(),
        &[Node::paragraph_text("al"), Node::paragraph_text("beta")]
    );
    assert_eq!(editor.selection(), Selection::caret(13));
    assert!(editor.document().check().is_ok());
}

#[test]
fn test_deleted_heading_children_reattach() {
    let text = "# r\n\n## A\n\n## B\n\n### B1\n\n## C\n";
    let mut editor = OutlineEditor::from_outline(text, EngineConfig::default());
    let original = editor.document().clone();
    // End of the "A" title to the end of the "B" title.
    select(&mut editor, 8, 15);

    editor.execute(Command::DeleteSelection).unwrap();

    assert_eq!(
        editor.document().outline(),
        vec!["# r", "  ## A", "    ### B1", "  ## C"]
    );
    assert_eq!(editor.selection(), Selection::caret(8));

    editor.execute(Command::Undo).unwrap();
    assert_eq!(editor.document(), &original);
    assert_eq!(editor.selection(), Selection::new(8, 15));
}

#[test]
fn test_delete_inside_one_paragraph_is_plain() {
    let mut editor = OutlineEditor::from_outline(
        "# r\n\n## A\n\nalpha\n",
        EngineConfig::default(),
    );
    select(&mut editor, 11, 13);

    editor.execute(Command::DeleteSelection).unwrap();

    let (_, a) = editor
        .document()
        .find_heading(&HeadingId::new("h2"))
        .unwrap();
    assert_eq!(a.plain_blocks(), &[Node::paragraph_text("pha")]);
    assert_eq!(editor.selection(), Selection::caret(11));
}

#[test]
fn test_typing_over_cross_heading_selection() {
    let mut editor = OutlineEditor::from_outline(
        "# r\n\n## A\n\nalpha\n\n## B\n\nbeta\n",
        EngineConfig::default(),
    );
    select(&mut editor, 13, 22);

    editor
        .execute(Command::InsertText {
            text: "so".to_string(),
        })
        .unwrap();

    let (_, a) = editor
        .document()
        .find_heading(&HeadingId::new("h2"))
        .unwrap();
    assert_eq!(
        a.plain_blocks(),
        &[Node::paragraph_text("also"), Node::paragraph_text("beta")]
    );
    assert_eq!(editor.selection(), Selection::caret(15));
}
