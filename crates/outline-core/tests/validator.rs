use outline_core::model::inline_text;
use outline_core::{
    Command, Document, EngineConfig, HeadingId, HierarchyValidator, Node, OutlineEditor,
    ViolationKind, document_from_json, find_violations,
};
use pretty_assertions::assert_eq;

fn h(id: &str, level: u8, title: &str, body: Vec<Node>) -> Node {
    Node::heading(HeadingId::new(id), level, inline_text(title), body)
}

const NESTED_H1: &str = r#"{"type":"doc","content":[
    {"type":"heading","attrs":{"id":"outer","level":2},"content":[
        {"type":"contentHeading","attrs":{"level":2},"content":[{"type":"text","text":"outer"}]},
        {"type":"contentWrapper","content":[
            {"type":"heading","attrs":{"id":"inner","level":1},"content":[
                {"type":"contentHeading","attrs":{"level":1},"content":[{"type":"text","text":"inner"}]},
                {"type":"contentWrapper","content":[]}
            ]}
        ]}
    ]}
]}"#;

/// `# r` > `### a` > `## b` > `# c`: two violations, one inside the other.
fn chained() -> Document {
    Document::new(vec![h(
        "r",
        1,
        "r",
        vec![h("a", 3, "a", vec![h("b", 2, "b", vec![h("c", 1, "c", vec![])])])],
    )])
}

#[test]
fn test_loaded_nested_h1_moves_to_root() {
    let doc = document_from_json(NESTED_H1).unwrap();
    let violations = find_violations(&doc);
    assert_eq!(violations.len(), 1);
    assert_eq!(violations[0].kind, ViolationKind::H1Nested);

    let repaired = HierarchyValidator::default().validate(&doc).unwrap();
    assert_eq!(repaired.outline(), vec!["## outer", "# inner"]);
    assert!(repaired.check().is_ok());
}

#[test]
fn test_repair_is_idempotent() {
    let validator = HierarchyValidator::default();
    let once = validator.validate(&chained()).unwrap();
    assert!(find_violations(&once).is_empty());
    assert_eq!(validator.validate(&once), None);
}

#[test]
fn test_inner_violation_is_fixed_in_a_later_pass() {
    let repaired = HierarchyValidator::default().validate(&chained()).unwrap();
    assert_eq!(repaired.outline(), vec!["# r", "  ### a", "  ## b", "# c"]);

    let config = EngineConfig {
        max_repair_iterations: 1,
        ..EngineConfig::default()
    };
    let capped = HierarchyValidator::new(&config).validate(&chained()).unwrap();
    assert_eq!(capped.outline(), vec!["# r", "  ### a", "  ## b", "    # c"]);
    assert_eq!(find_violations(&capped).len(), 1);
}

#[test]
fn test_editor_folds_repair_into_the_edit() {
    let doc = document_from_json(NESTED_H1).unwrap();
    let original = doc.clone();
    let mut editor = OutlineEditor::new(doc, EngineConfig::default());
    // End of the "outer" title.
    editor
        .execute(Command::SetSelection { anchor: 7, head: 7 })
        .unwrap();

    editor
        .execute(Command::InsertText {
            text: "!".to_string(),
        })
        .unwrap();

    assert_eq!(editor.document().outline(), vec!["## outer!", "# inner"]);
    assert_eq!(editor.undo_depth(), 1);

    editor.execute(Command::Undo).unwrap();
    assert_eq!(editor.document(), &original);
}

#[test]
fn test_validation_can_be_disabled() {
    let doc = document_from_json(NESTED_H1).unwrap();
    let config = EngineConfig::default().with_validation(false);
    let mut editor = OutlineEditor::new(doc, config);
    editor
        .execute(Command::SetSelection { anchor: 7, head: 7 })
        .unwrap();

    editor
        .execute(Command::InsertText {
            text: "!".to_string(),
        })
        .unwrap();

    assert_eq!(editor.document().outline(), vec!["## outer!", "  # inner"]);
}
