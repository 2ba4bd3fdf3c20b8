//! CLI integration tests for all subcommands.
//!
//! Uses `assert_cmd` to spawn the `propshape` binary and verify exit codes,
//! stdout content, and stderr content. Every test runs inside its own
//! temporary directory, so no `propshape.toml` is picked up by accident.

use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

fn propshape(dir: &TempDir) -> Command {
    let mut cmd = cargo_bin_cmd!("propshape");
    cmd.current_dir(dir.path());
    cmd.env_remove("RUST_LOG");
    cmd
}

fn write(dir: &TempDir, name: &str, contents: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, contents).unwrap();
    path
}

fn stdout_json(output: &std::process::Output) -> serde_json::Value {
    serde_json::from_slice(&output.stdout).unwrap()
}

// ──────────────────────────────────────────────
// 1. Help and version
// ──────────────────────────────────────────────

#[test]
fn help_exits_0_with_description() {
    let dir = TempDir::new().unwrap();
    propshape(&dir)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "Prop expression and storable prop shape tooling",
        ));
}

#[test]
fn version_exits_0() {
    let dir = TempDir::new().unwrap();
    propshape(&dir)
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("propshape"));
}

// ──────────────────────────────────────────────
// 2. parse
// ──────────────────────────────────────────────

#[test]
fn parse_describes_a_field_type_prop() {
    let dir = TempDir::new().unwrap();
    propshape(&dir)
        .args(["parse", "ℹ︎link␟url"])
        .assert()
        .success()
        .stdout(predicate::str::contains("field_type_prop: ℹ︎link␟url"))
        .stdout(predicate::str::contains("field_type: \"link\""));
}

#[test]
fn parse_json_output_is_structured() {
    let dir = TempDir::new().unwrap();
    let out = propshape(&dir)
        .args(["--output", "json", "parse", "ℹ︎␜node:article␝title␞0␟value"])
        .output()
        .unwrap();
    assert!(out.status.success());
    let json = stdout_json(&out);
    assert_eq!(json["kind"], "structured_data_prop");
    assert_eq!(json["bundle"], "article");
    assert_eq!(json["delta"], 0);
    assert_eq!(json["field_type_expression"], false);
}

#[test]
fn parse_canonicalizes_control_code_separators() {
    let dir = TempDir::new().unwrap();
    let out = propshape(&dir)
        .args(["--output", "json", "parse", "ℹ︎\u{1C}node\u{1D}title"])
        .output()
        .unwrap();
    assert!(out.status.success());
    assert_eq!(stdout_json(&out)["canonical"], "ℹ︎␜node␝title");
}

#[test]
fn parse_rejects_malformed_expressions() {
    let dir = TempDir::new().unwrap();
    for bad in ["link␟url", "ℹ︎link␟", "ℹ︎␜node␟value␝title"] {
        propshape(&dir)
            .args(["parse", bad])
            .assert()
            .failure()
            .stderr(predicate::str::contains("malformed expression"));
    }
}

#[test]
fn parse_json_errors_go_to_stderr() {
    let dir = TempDir::new().unwrap();
    let out = propshape(&dir)
        .args(["--output", "json", "parse", "nope"])
        .output()
        .unwrap();
    assert!(!out.status.success());
    let err: serde_json::Value = serde_json::from_slice(&out.stderr).unwrap();
    assert!(err["error"].as_str().unwrap().contains("malformed"));
}

// ──────────────────────────────────────────────
// 3. normalize
// ──────────────────────────────────────────────

#[test]
fn normalize_strips_informational_keywords() {
    let dir = TempDir::new().unwrap();
    let file = write(
        &dir,
        "shape.json",
        r#"{ "title": "Heading", "type": ["string"], "maxLength": 80 }"#,
    );
    let out = propshape(&dir)
        .args(["--output", "json", "normalize"])
        .arg(&file)
        .output()
        .unwrap();
    assert!(out.status.success());
    let json = stdout_json(&out);
    assert_eq!(
        json["shape"],
        serde_json::json!({ "type": "string", "maxLength": 80 })
    );
    assert_eq!(json["dedup_key"], "type=%22string%22&maxLength=80");
}

#[test]
fn normalize_reports_unknown_types() {
    let dir = TempDir::new().unwrap();
    let file = write(&dir, "shape.json", r#"{ "type": "date" }"#);
    propshape(&dir)
        .arg("normalize")
        .arg(&file)
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown type 'date'"));
}

#[test]
fn normalize_reports_missing_files() {
    let dir = TempDir::new().unwrap();
    propshape(&dir)
        .args(["normalize", "missing.json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("error reading file"));
}

// ──────────────────────────────────────────────
// 4. resolve
// ──────────────────────────────────────────────

#[test]
fn resolve_uses_builtin_rules() {
    let dir = TempDir::new().unwrap();
    let file = write(
        &dir,
        "tags.json",
        r#"{ "type": "array", "items": { "type": "string" } }"#,
    );
    propshape(&dir)
        .arg("resolve")
        .arg(&file)
        .assert()
        .success()
        .stdout(predicate::str::contains("field type prop: ℹ︎string␟value"))
        .stdout(predicate::str::contains("field widget: string_textfield"))
        .stdout(predicate::str::contains("cardinality: unlimited"));
}

#[test]
fn resolve_reports_unmapped_shapes() {
    let dir = TempDir::new().unwrap();
    let file = write(
        &dir,
        "slot.json",
        r#"{ "type": "object", "properties": { "a": { "type": "string" } } }"#,
    );
    propshape(&dir)
        .arg("resolve")
        .arg(&file)
        .assert()
        .success()
        .stdout(predicate::str::contains("no storable mapping"));
}

#[test]
fn resolve_applies_config_overrides() {
    let dir = TempDir::new().unwrap();
    write(
        &dir,
        "propshape.toml",
        r#"
[[alter]]
name = "links"
when = { type = "string", format = "uri" }
set = { field_type_prop = "ℹ︎link␟url", field_widget = "link_default", field_instance_settings = { title = "disabled" } }
"#,
    );
    let file = write(
        &dir,
        "link.json",
        r#"{ "type": "string", "format": "uri", "title": "Link" }"#,
    );
    let out = propshape(&dir)
        .args(["--output", "json", "resolve"])
        .arg(&file)
        .output()
        .unwrap();
    assert!(out.status.success());
    assert_eq!(
        stdout_json(&out)["storable"],
        serde_json::json!({
            "field_type_prop": "ℹ︎link␟url",
            "field_widget": "link_default",
            "field_instance_settings": { "title": "disabled" },
        })
    );
}

#[test]
fn resolve_fails_on_widgets_without_transforms() {
    let dir = TempDir::new().unwrap();
    let config = write(
        &dir,
        "custom.toml",
        r#"
[[alter]]
name = "color"
when = { type = "string", format = "color" }
set = { field_type_prop = "ℹ︎color_field␟rgb", field_widget = "color_picker" }
"#,
    );
    let file = write(
        &dir,
        "color.json",
        r#"{ "type": "string", "format": "color" }"#,
    );
    propshape(&dir)
        .arg("--config")
        .arg(&config)
        .arg("resolve")
        .arg(&file)
        .assert()
        .failure()
        .stderr(predicate::str::contains("color_picker"));
}

#[test]
fn resolve_fails_on_invariant_violations() {
    let dir = TempDir::new().unwrap();
    write(
        &dir,
        "propshape.toml",
        r#"
[[alter]]
name = "one_slot"
when = { type = "array" }
set = { cardinality = 1 }
"#,
    );
    let file = write(
        &dir,
        "tags.json",
        r#"{ "type": "array", "items": { "type": "string" } }"#,
    );
    propshape(&dir)
        .arg("resolve")
        .arg(&file)
        .assert()
        .failure()
        .stderr(predicate::str::contains("invariant violation"));
}

#[test]
fn invalid_config_is_reported() {
    let dir = TempDir::new().unwrap();
    write(&dir, "propshape.toml", "[[alter]]\nname = 3\n");
    let file = write(&dir, "shape.json", r#"{ "type": "string" }"#);
    propshape(&dir)
        .arg("resolve")
        .arg(&file)
        .assert()
        .failure()
        .stderr(predicate::str::contains("error in config"));
}

// ──────────────────────────────────────────────
// 5. version
// ──────────────────────────────────────────────

const CARD: &str = r#"{
  "props": {
    "heading": { "type": "string", "title": "Heading" },
    "image": { "$ref": "json-schema-definitions://propshape/image" },
    "slot": { "type": "object", "properties": {} }
  }
}"#;

#[test]
fn version_prints_settings_and_a_stable_id() {
    let dir = TempDir::new().unwrap();
    let file = write(&dir, "card.json", CARD);
    let run = || {
        let out = propshape(&dir)
            .args(["--output", "json", "version"])
            .arg(&file)
            .output()
            .unwrap();
        assert!(out.status.success());
        stdout_json(&out)
    };
    let first = run();
    assert_eq!(first["component_id"], "card");
    assert_eq!(first["version_id"].as_str().unwrap().len(), 16);
    assert_eq!(
        first["settings"]["props"]["image"]["field_widget"],
        "image_image"
    );
    assert_eq!(first["unbound_props"], serde_json::json!(["slot"]));
    assert_eq!(run()["version_id"], first["version_id"]);
}

#[test]
fn version_id_changes_with_the_alteration_chain() {
    let dir = TempDir::new().unwrap();
    let file = write(&dir, "card.json", CARD);
    let version_of = |config: Option<&PathBuf>| {
        let mut cmd = propshape(&dir);
        if let Some(c) = config {
            cmd.arg("--config").arg(c);
        }
        let out = cmd
            .args(["--output", "json", "version", "--component", "c1"])
            .arg(&file)
            .output()
            .unwrap();
        assert!(out.status.success());
        stdout_json(&out)["version_id"].clone()
    };
    let before = version_of(None);
    let config = write(
        &dir,
        "rich.toml",
        r#"
[[alter]]
name = "rich_headings"
when = { type = "string" }
set = { field_widget = "text_textarea" }
"#,
    );
    assert_ne!(version_of(Some(&config)), before);
}

#[test]
fn version_fails_on_widgets_without_transforms() {
    let dir = TempDir::new().unwrap();
    let config = write(
        &dir,
        "custom.toml",
        r#"
[[alter]]
name = "plain_headings"
when = { type = "string" }
set = { field_widget = "plain_text_widget" }
"#,
    );
    let file = write(&dir, "card.json", CARD);
    propshape(&dir)
        .arg("--config")
        .arg(&config)
        .arg("version")
        .arg(&file)
        .assert()
        .failure()
        .stderr(predicate::str::contains("plain_text_widget"))
        .stderr(predicate::str::contains("heading"));
}

#[test]
fn version_rejects_non_component_files() {
    let dir = TempDir::new().unwrap();
    let file = write(&dir, "shape.json", r#"{ "type": "string" }"#);
    propshape(&dir)
        .arg("version")
        .arg(&file)
        .assert()
        .failure()
        .stderr(predicate::str::contains("is not a component source"));
}

#[test]
fn verbose_logs_rule_decisions_to_stderr() {
    let dir = TempDir::new().unwrap();
    let file = write(&dir, "shape.json", r#"{ "type": "boolean" }"#);
    propshape(&dir)
        .args(["--verbose", "resolve"])
        .arg(&file)
        .assert()
        .success()
        .stderr(predicate::str::contains("builtin storage default"));
}
