//! Diffing local files against their remote copies.

mod common;

use joao::config::Config;
use joao::opclient::{self, mock};
use joao::Error;

#[test]
fn unchanged_configs_produce_no_diff() {
    let _mock = mock::install();
    let (_dir, path) = common::temp_copy("test.yaml");

    let cfg = Config::from_file(&path).unwrap();
    opclient::update(&cfg.vault, &cfg.name, &cfg.to_item()).unwrap();

    let mut out = Vec::new();
    let mut err = Vec::new();
    let changed = cfg
        .diff_remote(path.to_str().unwrap(), false, false, &mut out, &mut err)
        .unwrap();
    assert!(!changed);
    assert!(out.is_empty());
}

#[test]
fn local_changes_show_up_labeled() {
    let _mock = mock::install();
    let (_dir, path) = common::temp_copy("test.yaml");

    let mut cfg = Config::from_file(&path).unwrap();
    opclient::update(&cfg.vault, &cfg.name, &cfg.to_item()).unwrap();
    cfg.set(&common::segments("int"), b"2", false, false).unwrap();

    let mut out = Vec::new();
    let mut err = Vec::new();
    let changed = cfg
        .diff_remote(path.to_str().unwrap(), false, false, &mut out, &mut err)
        .unwrap();
    assert!(changed);

    let text = String::from_utf8(out).unwrap();
    assert!(text.contains("op://example/some:test"));
    assert!(text.contains("-int: 1"));
    assert!(text.contains("+int: 2"));
}

#[test]
fn missing_remote_diffs_against_nothing() {
    let _mock = mock::install();
    let (_dir, path) = common::temp_copy("test.yaml");
    let cfg = Config::from_file(&path).unwrap();

    let mut out = Vec::new();
    let mut err = Vec::new();
    let changed = cfg
        .diff_remote(path.to_str().unwrap(), false, false, &mut out, &mut err)
        .unwrap();
    assert!(changed);
    assert!(String::from_utf8(out).unwrap().contains("+int: 1"));
}

#[test]
fn fetch_preview_needs_the_remote() {
    let _mock = mock::install();
    let (_dir, path) = common::temp_copy("test.yaml");
    let cfg = Config::from_file(&path).unwrap();

    let mut out = Vec::new();
    let mut err = Vec::new();
    let result = cfg.diff_remote(path.to_str().unwrap(), false, true, &mut out, &mut err);
    assert!(matches!(result, Err(Error::ItemNotFound { .. })));
}
