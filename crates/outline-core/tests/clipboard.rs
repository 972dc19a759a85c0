use outline_core::model::inline_text;
use outline_core::{
    Command, CommandResult, Document, EngineConfig, HeadingId, Node, OutlineEditor,
    adjust_heading_levels_for_context, find_violations,
};
use pretty_assertions::assert_eq;

fn h(id: &str, level: u8, title: &str, body: Vec<Node>) -> Node {
    Node::heading(HeadingId::new(id), level, inline_text(title), body)
}

/// `### A` holding `#### B` holding `##### C`.
fn nest() -> Node {
    h("x", 3, "A", vec![h("y", 4, "B", vec![h("z", 5, "C", vec![])])])
}

fn editor_at(text: &str, pos: usize) -> OutlineEditor {
    let mut editor = OutlineEditor::from_outline(text, EngineConfig::default());
    editor
        .execute(Command::SetSelection {
            anchor: pos,
            head: pos,
        })
        .unwrap();
    editor
}

// "# Doc" title content is 2..5; "## Section" starts at 7 with its body paragraph content at 19.
const SECTION: &str = "# Doc\n\n## Section\n\nintro\n";
const INTRO: usize = 19;

#[test]
fn test_adjust_shifts_shallowest_heading_below_context() {
    let adjusted = adjust_heading_levels_for_context(vec![nest()], 1, 10);
    let levels: Vec<String> = Document::new(adjusted.nested.clone()).outline();
    assert_eq!(levels, vec!["## A", "  ### B", "    #### C"]);
    assert!(adjusted.root.is_empty());

    let adjusted = adjust_heading_levels_for_context(vec![nest()], 8, 10);
    assert_eq!(
        Document::new(adjusted.nested).outline(),
        vec!["######### A", "  ########## B", "    ########## C"]
    );
}

#[test]
fn test_paste_in_section_body_keeps_fitting_levels() {
    let mut editor = editor_at(SECTION, INTRO);

    let result = editor
        .execute(Command::Paste {
            fragment: vec![nest()],
        })
        .unwrap();

    assert_eq!(result, CommandResult::Applied);
    assert_eq!(
        editor.document().outline(),
        vec![
            "# Doc",
            "  ## Section",
            "    ### A",
            "      #### B",
            "        ##### C"
        ]
    );
    // The section's own paragraph stays ahead of the pasted headings.
    let (_, section) = editor
        .document()
        .find_heading(&HeadingId::new("h2"))
        .unwrap();
    assert_eq!(section.plain_blocks(), &[Node::paragraph_text("intro")]);
}

#[test]
fn test_paste_into_empty_document_starts_at_level_one() {
    let mut editor = OutlineEditor::new(Document::default(), EngineConfig::default());

    editor
        .execute(Command::Paste {
            fragment: vec![nest()],
        })
        .unwrap();

    assert_eq!(
        editor.document().outline(),
        vec!["# A", "  ## B", "    ### C"]
    );
    assert!(find_violations(editor.document()).is_empty());
    // Pasted headings never reuse the fragment's identifiers.
    assert!(editor.document().find_heading(&HeadingId::new("x")).is_none());
}

#[test]
fn test_paste_text_merges_into_paragraph() {
    let mut editor = editor_at(SECTION, INTRO);

    editor
        .execute(Command::Paste {
            fragment: inline_text("big "),
        })
        .unwrap();

    let (_, section) = editor
        .document()
        .find_heading(&HeadingId::new("h2"))
        .unwrap();
    assert_eq!(section.plain_blocks(), &[Node::paragraph_text("big intro")]);
    assert_eq!(editor.selection().head, INTRO + 4);
}

#[test]
fn test_paste_empty_fragment_is_ignored() {
    let mut editor = editor_at(SECTION, INTRO);
    assert_eq!(
        editor
            .execute(Command::Paste {
                fragment: Vec::new()
            })
            .unwrap(),
        CommandResult::Ignored
    );
    assert!(!editor.can_undo());
}

#[test]
fn test_paste_between_body_blocks_lands_at_caret() {
    // "p1" occupies 7..11 in the body of "# Top", so 11 sits between the two paragraphs.
    let mut editor = editor_at("# Top\n\np1\n\np2\n", 11);

    editor
        .execute(Command::Paste {
            fragment: vec![Node::paragraph_text("NEW")],
        })
        .unwrap();

    let top = &editor.document().content()[0];
    assert_eq!(
        top.plain_blocks(),
        &[
            Node::paragraph_text("p1"),
            Node::paragraph_text("NEW"),
            Node::paragraph_text("p2")
        ]
    );
}
