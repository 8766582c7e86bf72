//! Integration tests for document inclusion.
//!
//! Tests the IncludeResolver directives:
//! - `{include: file}` string leaves
//! - `{extends: a, b}` string leaves
//! - the root `@extends` key, as a string or a list
//! - cycle detection and error context

use layerconf::{Config, ErrorCode, FileSource, IncludeResolver};
use serde_json::json;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn write(dir: &Path, name: &str, content: &str) {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("Failed to create directory");
    }
    fs::write(path, content).expect("Failed to write document");
}

#[test]
fn test_include_and_extends_leaves() {
    let temp = TempDir::new().unwrap();
    let dir = temp.path();
    write(dir, "config.1.json", r#"{"var1": "value1", "shared": {"a": 1, "b": 1}}"#);
    write(dir, "config.2.json", r#"{"var2": "value2", "shared": {"b": 2, "c": 2}}"#);
    write(
        dir,
        "main.json",
        r#"{
    "var5": "{extends: config.1.json, config.2.json}",
    "var6": "{include: config.1.json}",
    "plain": "kept"
}"#,
    );

    let document = IncludeResolver::new().load(&dir.join("main.json")).unwrap();
    assert_eq!(
        json!(document),
        json!({
            "var5": {"var1": "value1", "var2": "value2", "shared": {"a": 1, "b": 1, "c": 2}},
            "var6": {"var1": "value1", "shared": {"a": 1, "b": 1}},
            "plain": "kept"
        })
    );
}

#[test]
fn test_root_extends_child_wins() {
    let temp = TempDir::new().unwrap();
    let dir = temp.path();
    write(
        dir,
        "base.yaml",
        "server:\n  host: 0.0.0.0\n  port: 80\nfeatures: [a, b]\n",
    );
    write(
        dir,
        "app.json",
        r#"{"@extends": "base.yaml", "server": {"port": 8080}, "features": ["c"]}"#,
    );

    let source = FileSource::open_with(dir.join("app.json"), 0, &IncludeResolver::new()).unwrap();
    assert_eq!(
        source.data(),
        &json!({"server": {"host": "0.0.0.0", "port": 8080}, "features": ["c"]})
    );
}

#[test]
fn test_root_extends_list_and_relative_directories() {
    let temp = TempDir::new().unwrap();
    let dir = temp.path();
    write(dir, "shared/defaults.json", r#"{"log": {"level": "info"}, "db": "{include: db.json}"}"#);
    write(dir, "shared/db.json", r#"{"host": "db.internal"}"#);
    write(dir, "shared/extra.json", r#"{"log": {"level": "warn", "format": "text"}}"#);
    write(
        dir,
        "env/prod.json",
        r#"{"@extends": ["../shared/defaults.json", "../shared/extra.json"], "log": {"format": "json"}}"#,
    );

    let document = IncludeResolver::new().load(&dir.join("env/prod.json")).unwrap();
    assert_eq!(
        json!(document),
        json!({
            "log": {"level": "info", "format": "json"},
            "db": {"host": "db.internal"}
        })
    );
}

#[test]
fn test_mutual_extends_is_recursive_inclusion() {
    let temp = TempDir::new().unwrap();
    let dir = temp.path();
    write(dir, "x.json", r#"{"@extends": "y.json", "x": 1}"#);
    write(dir, "y.json", r#"{"@extends": "x.json", "y": 1}"#);

    let err = IncludeResolver::new().load(&dir.join("x.json")).unwrap_err();
    assert_eq!(err.code, ErrorCode::RecursiveInclusion);
}

#[test]
fn test_self_include_reports_path() {
    let temp = TempDir::new().unwrap();
    let dir = temp.path();
    write(dir, "loop.json", r#"{"nested": {"again": "{include: loop.json}"}}"#);

    let err = IncludeResolver::new().load(&dir.join("loop.json")).unwrap_err();
    assert_eq!(err.code, ErrorCode::RecursiveInclusion);
    assert_eq!(err.key.as_deref(), Some("nested.again"));
    assert!(err.message.contains("loop.json"));
}

#[test]
fn test_missing_include_keeps_code_with_context() {
    let temp = TempDir::new().unwrap();
    let dir = temp.path();
    write(dir, "main.json", r#"{"db": "{include: missing.json}"}"#);

    let err = IncludeResolver::new().load(&dir.join("main.json")).unwrap_err();
    assert_eq!(err.code, ErrorCode::NotFound);
    assert_eq!(err.key.as_deref(), Some("db"));
    assert!(err.message.starts_with("Unable to resolve"));
    assert!(err.message.contains("missing.json"));
}

#[test]
fn test_nested_include_failure_reports_full_key() {
    let temp = TempDir::new().unwrap();
    let dir = temp.path();
    write(dir, "db.json", r#"{"credentials": "{include: secrets/missing.json}"}"#);
    write(dir, "main.json", r#"{"services": {"main": "{include: db.json}"}}"#);

    let err = IncludeResolver::new().load(&dir.join("main.json")).unwrap_err();
    assert_eq!(err.code, ErrorCode::NotFound);
    assert_eq!(err.key.as_deref(), Some("services.main.credentials"));
    assert!(err.reference.as_deref().unwrap().ends_with("missing.json"));
}

#[test]
fn test_diamond_is_not_a_cycle() {
    // The same document reached twice along different branches is fine.
    let temp = TempDir::new().unwrap();
    let dir = temp.path();
    write(dir, "common.json", r#"{"region": "eu"}"#);
    write(dir, "a.json", r#"{"@extends": "common.json", "a": true}"#);
    write(dir, "b.json", r#"{"@extends": "common.json", "b": true}"#);
    write(dir, "top.json", r#"{"left": "{include: a.json}", "right": "{include: b.json}"}"#);

    let document = IncludeResolver::new().load(&dir.join("top.json")).unwrap();
    assert_eq!(
        json!(document),
        json!({
            "left": {"region": "eu", "a": true},
            "right": {"region": "eu", "b": true}
        })
    );
}

#[test]
fn test_included_templates_resolve_through_config() {
    let temp = TempDir::new().unwrap();
    let dir = temp.path();
    write(dir, "paths.yaml", "data: \"{= root}\"\n");
    write(dir, "app.json", r#"{"paths": "{include: paths.yaml}"}"#);

    let mut config = Config::new()
        .with_source(FileSource::open_with(dir.join("app.json"), 0, &IncludeResolver::new()).unwrap());
    config.set_variable("root", "/srv/app");

    assert_eq!(config.get("paths.data").unwrap(), Some(json!("/srv/app")));
}

#[test]
fn test_open_without_resolver_keeps_directives() {
    let temp = TempDir::new().unwrap();
    let dir = temp.path();
    write(dir, "main.json", r#"{"@extends": "nowhere.json", "db": "{include: nowhere.json}"}"#);

    let source = FileSource::open(dir.join("main.json"), 0).unwrap();
    assert_eq!(
        source.data(),
        &json!({"@extends": "nowhere.json", "db": "{include: nowhere.json}"})
    );
}
