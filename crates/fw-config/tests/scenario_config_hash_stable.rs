//! Layering and hashing.
//!
//! GREEN when:
//! - identical inputs hash identically;
//! - key order inside a document does not change the hash;
//! - later layers override earlier ones;
//! - the shipped base config loads, validates and reports no unused keys.

use fw_config::{load_layered_yaml, load_layered_yaml_from_strings, report_unused_keys, UnusedKeyPolicy};

const BASE_YAML: &str = r#"
remote:
  host: "sftp.example.internal"
  base_path: "/incoming"
monitor:
  delay_threshold_minutes: 10
  pass_interval_secs: 60
"#;

const BASE_YAML_REORDERED: &str = r#"
monitor:
  pass_interval_secs: 60
  delay_threshold_minutes: 10
remote:
  base_path: "/incoming"
  host: "sftp.example.internal"
"#;

const OVERLAY_YAML: &str = r#"
remote:
  base_path: "/incoming/staging"
monitor:
  delay_threshold_minutes: 20
"#;

#[test]
fn same_input_produces_identical_hash() {
    let a = load_layered_yaml_from_strings(&[BASE_YAML]).unwrap();
    let b = load_layered_yaml_from_strings(&[BASE_YAML]).unwrap();
    assert_eq!(a.config_hash, b.config_hash);
    assert_eq!(a.canonical_json, b.canonical_json);
}

#[test]
fn reordered_keys_produce_same_hash() {
    let a = load_layered_yaml_from_strings(&[BASE_YAML]).unwrap();
    let b = load_layered_yaml_from_strings(&[BASE_YAML_REORDERED]).unwrap();
    assert_eq!(a.config_hash, b.config_hash);
}

#[test]
fn overlay_overrides_base_and_changes_hash() {
    let base = load_layered_yaml_from_strings(&[BASE_YAML]).unwrap();
    let merged = load_layered_yaml_from_strings(&[BASE_YAML, OVERLAY_YAML]).unwrap();
    assert_ne!(base.config_hash, merged.config_hash);

    let cfg = merged.monitor().unwrap();
    assert_eq!(cfg.base_path().as_deref(), Some("/incoming/staging"));
    assert_eq!(cfg.monitor.delay_threshold_minutes, 20);
    // Untouched sibling keys survive the merge.
    assert_eq!(cfg.remote.host.as_deref(), Some("sftp.example.internal"));
    assert_eq!(cfg.monitor.pass_interval_secs, 60);
}

#[test]
fn hash_is_64_hex_chars() {
    let loaded = load_layered_yaml_from_strings(&[BASE_YAML]).unwrap();
    assert_eq!(loaded.config_hash.len(), 64);
    assert!(loaded.config_hash.chars().all(|c| c.is_ascii_hexdigit()));
}

#[test]
fn files_are_layered_in_argument_order() {
    let dir = tempfile::tempdir().unwrap();
    let base = dir.path().join("base.yaml");
    let local = dir.path().join("local.yaml");
    std::fs::write(&base, BASE_YAML).unwrap();
    std::fs::write(&local, OVERLAY_YAML).unwrap();

    let loaded = load_layered_yaml(&[base.to_str().unwrap(), local.to_str().unwrap()]).unwrap();
    let from_strings = load_layered_yaml_from_strings(&[BASE_YAML, OVERLAY_YAML]).unwrap();
    assert_eq!(loaded.config_hash, from_strings.config_hash);
}

#[test]
fn missing_file_names_the_path() {
    let err = load_layered_yaml(&["/definitely/not/here.yaml"]).unwrap_err();
    assert!(format!("{err:#}").contains("/definitely/not/here.yaml"));
}

#[test]
fn shipped_base_config_is_valid_and_fully_consumed() {
    let path = concat!(env!("CARGO_MANIFEST_DIR"), "/../../config/base.yaml");
    let loaded = load_layered_yaml(&[path]).unwrap();
    let cfg = loaded.monitor().unwrap();
    assert_eq!(cfg.feed_schedules().unwrap().len(), 4);

    let report = report_unused_keys(&loaded.config_json, UnusedKeyPolicy::Fail).unwrap();
    assert!(report.is_clean());
}
