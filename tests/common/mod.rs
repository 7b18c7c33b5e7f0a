#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

pub fn testdata(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests/testdata")
        .join(name)
}

pub fn read_fixture(name: &str) -> Vec<u8> {
    fs::read(testdata(name)).unwrap_or_else(|_| panic!("missing fixture {}", name))
}

/// Copies a fixture into a fresh temp directory so tests can rewrite it.
pub fn temp_copy(name: &str) -> (TempDir, PathBuf) {
    let dir = tempfile::tempdir().expect("could not create tempdir");
    let path = dir.path().join(name);
    fs::copy(testdata(name), &path).expect("could not copy fixture");
    (dir, path)
}

pub fn segments(path: &str) -> Vec<String> {
    path.split('.').map(str::to_string).collect()
}
