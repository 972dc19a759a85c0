use outline_core::error::SchemaError;
use outline_core::{
    EngineConfig, IdGenerator, document_from_json, document_to_json, parse_outline,
};
use pretty_assertions::assert_eq;

#[test]
fn test_document_round_trips_through_json() {
    let doc = parse_outline(
        "# Intro\n\nhello\n\n## Steps\n\n- one\n- two\n\n> note\n\n# End\n",
        &mut IdGenerator::new("h"),
    );
    let json = document_to_json(&doc).unwrap();
    assert!(json.contains("\"bulletList\""));
    assert_eq!(document_from_json(&json).unwrap(), doc);
}

#[test]
fn test_schema_errors_are_reported() {
    assert!(matches!(
        document_from_json("not json"),
        Err(SchemaError::Json(_))
    ));
    // A heading without its body.
    let json = r#"{"type":"doc","content":[
        {"type":"heading","attrs":{"id":"a","level":1},"content":[
            {"type":"contentHeading","attrs":{"level":1}}
        ]}
    ]}"#;
    assert!(matches!(
        document_from_json(json),
        Err(SchemaError::MalformedHeading { id }) if id == "a"
    ));
    // Title level disagrees with the heading.
    let json = r#"{"type":"doc","content":[
        {"type":"heading","attrs":{"id":"a","level":1},"content":[
            {"type":"contentHeading","attrs":{"level":2}},
            {"type":"contentWrapper"}
        ]}
    ]}"#;
    assert!(matches!(
        document_from_json(json),
        Err(SchemaError::TitleLevelMismatch { .. })
    ));
}

#[test]
fn test_config_from_partial_json() {
    let config = EngineConfig::from_json_str(r#"{ "max_level": 42, "id_prefix": "sec-" }"#)
        .unwrap();
    assert_eq!(config.max_level, 10);
    assert_eq!(config.id_prefix, "sec-");
    assert_eq!(config.max_repair_iterations, 10);
    assert!(config.validate_after_edit);

    let config = EngineConfig::from_json_str(r#"{ "max_level": 0 }"#).unwrap();
    assert_eq!(config.max_level, 1);
    assert!(EngineConfig::from_json_str(r#"{ "max_level": "deep" }"#).is_err());
}
