//! Writing values into config files on disk.

mod common;

use std::fs;
use std::path::Path;

use joao::config::{Config, OutputOptions};
use joao::Error;

#[test]
fn set_on_an_empty_document_creates_containers() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join(".joao.yaml"), "vault: example\n").unwrap();
    let path = dir.path().join("empty.yaml");
    fs::write(&path, "{}").unwrap();

    let mut cfg = Config::from_file(&path).unwrap();
    cfg.set(&common::segments("a.b.0"), b"um", false, false).unwrap();
    cfg.as_file(&path, OutputOptions::default()).unwrap();

    assert_eq!(fs::read_to_string(&path).unwrap(), "a:\n  b:\n    - um\n");
}

#[test]
fn set_and_lookup_are_inverse() {
    let (_dir, path) = common::temp_copy("test.yaml");
    let mut cfg = Config::from_file(&path).unwrap();

    cfg.set(&common::segments("nested.token"), b"hunter2\n", true, false)
        .unwrap();
    let token = cfg.lookup(&common::segments("nested.token")).unwrap();
    assert_eq!(token.value, "hunter2");
    assert!(token.is_secret());

    cfg.set(&common::segments("string"), b"quem", false, false).unwrap();
    assert_eq!(cfg.lookup(&common::segments("string")).unwrap().value, "quem");
    assert!(!cfg.lookup(&common::segments("string")).unwrap().is_secret());
}

#[test]
fn set_persists_and_reloads() {
    let (_dir, path) = common::temp_copy("test.yaml");
    let mut cfg = Config::from_file(&path).unwrap();
    cfg.set(&common::segments("nested.token"), b"hunter2", true, false)
        .unwrap();
    cfg.as_file(&path, OutputOptions::default()).unwrap();

    let reloaded = Config::from_file(&path).unwrap();
    let token = reloaded.lookup(&common::segments("nested.token")).unwrap();
    assert_eq!(token.value, "hunter2");
    assert!(token.is_secret());

    // The rest of the document did not move.
    let written = fs::read_to_string(&path).unwrap();
    assert!(written.starts_with(
        "_config: !!joao\n  vault: example\n  name: some:test\nint: 1\n"
    ));
    assert!(written.ends_with("  list: [1, 2, 3]\n  token: !!secret hunter2\n"));
}

#[test]
fn delete_drops_keys_and_reindexes_sequences() {
    let (_dir, path) = common::temp_copy("test.yaml");
    let mut cfg = Config::from_file(&path).unwrap();

    cfg.delete(&common::segments("nested.list.0")).unwrap();
    assert_eq!(
        cfg.lookup(&common::segments("nested.list.0")).unwrap().value,
        "2"
    );

    cfg.delete(&common::segments("string")).unwrap();
    assert!(matches!(
        cfg.lookup(&common::segments("string")),
        Err(Error::NotFound { .. })
    ));
    assert!(!cfg.as_yaml(OutputOptions::default()).contains("pato"));
}

#[cfg(unix)]
#[test]
fn file_permissions_survive_rewrites() {
    use std::os::unix::fs::PermissionsExt;

    let (_dir, path) = common::temp_copy("test.yaml");
    fs::set_permissions(&path, fs::Permissions::from_mode(0o600)).unwrap();

    let mut cfg = Config::from_file(&path).unwrap();
    cfg.set(&common::segments("int"), b"2", false, false).unwrap();
    cfg.as_file(Path::new(&path), OutputOptions::default()).unwrap();

    let mode = fs::metadata(&path).unwrap().permissions().mode() & 0o777;
    assert_eq!(mode, 0o600);
}
