use metron::error::MetronError;

#[test]
fn error_constructors_group_1() {
    assert!(matches!(
        MetronError::config("x"),
        MetronError::Config { .. }
    ));
    assert!(matches!(MetronError::auth("x"), MetronError::Auth { .. }));
    assert!(matches!(MetronError::api("x"), MetronError::Api { .. }));
}

#[test]
fn error_constructors_group_2() {
    let ser = MetronError::Serialization {
        message: "s".into(),
    };
    assert!(matches!(ser, MetronError::Serialization { .. }));
    assert!(matches!(MetronError::io("x"), MetronError::Io { .. }));
    assert!(matches!(
        MetronError::network("x"),
        MetronError::Network { .. }
    ));
    assert!(matches!(
        MetronError::validation("f", "m"),
        MetronError::Validation { .. }
    ));
    assert!(matches!(
        MetronError::generic("x"),
        MetronError::Generic { .. }
    ));
}

#[test]
fn display_messages() {
    let e = MetronError::validation("field", "bad");
    let s = format!("{}", e);
    assert!(s.contains("Validation error"));

    let e = MetronError::api("API error 500: boom");
    let s = format!("{}", e);
    assert!(s.contains("API error 500"));
}

#[test]
fn conversions_map_to_expected_variants() {
    let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
    assert!(matches!(MetronError::from(io_err), MetronError::Io { .. }));

    let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
    assert!(matches!(
        MetronError::from(json_err),
        MetronError::Serialization { .. }
    ));
}
