//! Pulling remote values into local files.

mod common;

use std::fs;

use joao::config::{self, Config};
use joao::opclient::mock;
use joao::OutputOptions;

#[test]
fn fetch_updates_values_but_keeps_local_shape() {
    let mock = mock::install();
    let (_dir, path) = common::temp_copy("commented.yaml");

    // The remote copy has different leaf values.
    let mut remote_cfg = Config::from_file(&path).unwrap();
    remote_cfg
        .set(&common::segments("secret"), b"rotated", true, false)
        .unwrap();
    remote_cfg
        .set(&common::segments("int"), b"2", false, false)
        .unwrap();
    mock.put("example", remote_cfg.to_item());

    let remote = config::load(path.to_str().unwrap(), true).unwrap();
    let mut local = config::load(path.to_str().unwrap(), false).unwrap();
    local.merge(&remote);
    local.as_file(&path, OutputOptions::default()).unwrap();

    let written = fs::read_to_string(&path).unwrap();
    assert!(written.contains("secret: !!secret rotated\n"));
    assert!(written.contains("int: 2\n"));
    // Comments and blank lines are local property and survive untouched.
    assert!(written.contains("\n# the answer\n"));
    assert!(written.contains("  # deeper note\n"));
    assert!(written.contains("text: |\n  first line\n  second line\n"));
}

#[test]
fn fetch_appends_remote_additions_at_the_end() {
    let mock = mock::install();
    let (_dir, path) = common::temp_copy("test.yaml");

    let mut remote_cfg = Config::from_file(&path).unwrap();
    remote_cfg
        .set(&common::segments("fresh.key"), b"value", false, false)
        .unwrap();
    mock.put("example", remote_cfg.to_item());

    let remote = config::load(path.to_str().unwrap(), true).unwrap();
    let mut local = config::load(path.to_str().unwrap(), false).unwrap();
    local.merge(&remote);

    assert_eq!(
        local.lookup(&common::segments("fresh.key")).unwrap().value,
        "value"
    );
    // Existing values kept their positions; the addition went to the end.
    let yaml = local.as_yaml(OutputOptions::default());
    assert!(yaml.ends_with("fresh:\n  key: value\n"));
}

#[test]
fn fetch_merges_sequences_by_index() {
    let mock = mock::install();
    let (_dir, path) = common::temp_copy("commented.yaml");

    let mut remote_cfg = Config::from_file(&path).unwrap();
    remote_cfg
        .set(&common::segments("nested.list.1"), b"dos", false, false)
        .unwrap();
    remote_cfg
        .set(&common::segments("nested.list.2"), b"tres", false, false)
        .unwrap();
    mock.put("example", remote_cfg.to_item());

    let remote = config::load(path.to_str().unwrap(), true).unwrap();
    let mut local = config::load(path.to_str().unwrap(), false).unwrap();
    local.merge(&remote);

    let list = local.lookup(&common::segments("nested.list")).unwrap();
    let values: Vec<&str> = list.items().iter().map(|e| e.value.as_str()).collect();
    assert_eq!(values, vec!["one", "dos", "tres"]);
}

#[test]
fn remote_loads_resolve_identity_from_the_file() {
    let mock = mock::install();
    let (_dir, path) = common::temp_copy("test.yaml");
    mock.put("example", Config::from_file(&path).unwrap().to_item());

    // Loading by file path resolves (vault, name) from _config; loading by
    // "vault/name" goes straight to the backend.
    let by_path = config::load(path.to_str().unwrap(), true).unwrap();
    assert_eq!(by_path.name, "some:test");

    let by_name = config::load("example/some:test", true).unwrap();
    assert_eq!(by_name.to_map(false), by_path.to_map(false));
}
