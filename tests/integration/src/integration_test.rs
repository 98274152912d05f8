//! End-to-end tests over the checked-in fixture files
//!
//! Exercises the flow: fixture file -> props-fs load -> store edits -> atomic save -> reload.

use pretty_assertions::assert_eq;
use props_core::{Encoding, LineEnding, Properties, Timestamp, WriteOptions};
use props_fs::{load_file, load_file_or_defaults, save_file};
use props_test_utils::TestDir;
use props_test_utils::fixtures::fixture;
use std::fs;

#[test]
fn test_load_app_fixture() {
    let props = load_file(&fixture("app.properties"), Encoding::Iso8859_1).unwrap();

    let expected: Properties = [
        ("app.name", "Demo Application"),
        ("app.version", "1.4.2"),
        ("server.host", "localhost"),
        ("server.port", "8080"),
        ("greeting", "Hello, World"),
        ("path", "C:\\Program Files\\Demo"),
        ("unicode.escape", "café"),
        ("empty.value", ""),
        ("key with spaces", "spaced"),
    ]
    .into_iter()
    .collect();
    assert_eq!(props, expected);
}

#[test]
fn test_latin1_and_utf8_fixtures_agree_on_shared_keys() {
    let latin1 = load_file(&fixture("latin1.properties"), Encoding::Iso8859_1).unwrap();
    let utf8 = load_file(&fixture("utf8.properties"), Encoding::Utf8).unwrap();

    assert_eq!(latin1.get_property("city"), Some("Zürich"));
    assert_eq!(utf8.get_property("city"), Some("Zürich"));
    assert_eq!(latin1.get_property("word"), Some("naïve"));
    assert_eq!(utf8.get_property("symbol"), Some("€"));
}

#[test]
fn test_crlf_fixture_with_continuation() {
    let props = load_file(&fixture("crlf.properties"), Encoding::Iso8859_1).unwrap();

    assert_eq!(props.len(), 3);
    assert_eq!(props.get_property("b"), Some("twolines"));
    assert_eq!(props.get_property("c"), Some("3"));
}

#[test]
fn test_malformed_fixture_reports_path_and_line() {
    let err = load_file(&fixture("malformed.properties"), Encoding::Iso8859_1).unwrap_err();

    assert!(err.is_parse_error());
    let message = err.to_string();
    assert!(message.contains("malformed.properties"), "{message}");
    assert!(message.contains("line 2"), "{message}");
}

#[test]
fn test_edit_save_reload_cycle() {
    let dir = TestDir::new();
    let target = dir.path("app.properties");
    fs::copy(fixture("app.properties"), &target).unwrap();

    let mut props = load_file(&target, Encoding::Iso8859_1).unwrap();
    props.set_property("server.port", "9443");
    props.set_property("owner", "Zoë");
    props.remove("empty.value");

    let options = WriteOptions::default()
        .with_line_ending(LineEnding::CrLf)
        .with_timestamp(Timestamp::Omit);
    save_file(&target, &props, Some("Edited\nby the integration test"), options).unwrap();

    dir.assert_file_contains("app.properties", "#Edited\r\n#by the integration test\r\n");
    dir.assert_file_contains("app.properties", "owner=Zo\\u00EB\r\n");

    let reloaded = load_file(&target, Encoding::Iso8859_1).unwrap();
    assert_eq!(reloaded, props);
    assert_eq!(reloaded.get_property("empty.value"), None);
}

#[test]
fn test_fixture_as_defaults_for_user_overrides() {
    let defaults = load_file(&fixture("app.properties"), Encoding::Iso8859_1).unwrap();
    let dir = TestDir::new();
    let overrides = dir.write_properties("user.properties", "server.port = 7000\nextra=1\n");

    let props = load_file_or_defaults(&overrides, Encoding::Utf8, &defaults).unwrap();

    assert_eq!(props.len(), 2);
    assert_eq!(props.get_property("server.port"), Some("7000"));
    assert_eq!(props.get_property("app.name"), Some("Demo Application"));
    assert_eq!(props.property_names().len(), defaults.len() + 1);
}

#[test]
fn test_writer_options_from_host_config() {
    #[derive(serde::Deserialize)]
    struct HostConfig {
        output: WriteOptions,
    }

    let config: HostConfig = toml::from_str(
        r#"
[output]
encoding = "UTF-8"
line_ending = "lf"
timestamp = "omit"
"#,
    )
    .unwrap();

    let dir = TestDir::new();
    let target = dir.path("out.properties");
    let props: Properties = [("symbol", "€")].into_iter().collect();
    save_file(&target, &props, Some("€ prices"), config.output).unwrap();

    assert_eq!(
        dir.read_bytes("out.properties"),
        "#€ prices\nsymbol=\\u20AC\n".as_bytes()
    );
}
