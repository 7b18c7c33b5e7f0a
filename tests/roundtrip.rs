//! Round-trip properties of the document model.

mod common;

use std::fs;

use joao::config::{Config, ShortType};
use joao::OutputOptions;

#[test]
fn serializing_a_loaded_file_is_the_identity() {
    for fixture in ["test.yaml", "commented.yaml"] {
        let path = common::testdata(fixture);
        let cfg = Config::from_file(&path).unwrap();
        let original = fs::read_to_string(&path).unwrap();
        assert_eq!(cfg.as_yaml(OutputOptions::default()), original, "{}", fixture);
    }
}

#[test]
fn redaction_only_touches_secret_values() {
    let cfg = Config::from_file(&common::testdata("test.yaml")).unwrap();
    let plain = cfg.as_yaml(OutputOptions::default());
    let redacted = cfg.as_yaml(OutputOptions::REDACTED);

    assert!(redacted.contains("secret: !!secret \"\"\n"));
    assert_eq!(
        redacted.replace("secret: !!secret \"\"", "secret: !!secret very secret"),
        plain
    );
}

#[test]
fn field_projection_is_bijective_on_the_logical_model() {
    let cfg = Config::from_file(&common::testdata("commented.yaml")).unwrap();
    let rebuilt = Config::from_item(&cfg.to_item()).unwrap();

    // Scalars, paths and logical types survive; comments and styles do not
    // need to.
    assert_eq!(cfg.to_map(false), rebuilt.to_map(false));
    assert_eq!(rebuilt.vault, "example");
    assert_eq!(rebuilt.name, "commented:test");

    let secret = rebuilt.lookup(&common::segments("secret")).unwrap();
    assert!(secret.is_secret());
    assert_eq!(secret.path, common::segments("secret"));

    let port = rebuilt.lookup(&common::segments("servers.0.port")).unwrap();
    assert_eq!(port.short_type, ShortType::Int);
    assert_eq!(port.path, common::segments("servers.0.port"));

    // And projecting again yields the same item content.
    let again = rebuilt.to_item();
    let original = cfg.to_item();
    assert_eq!(original.value_of("password"), again.value_of("password"));
}

#[test]
fn merge_with_self_is_the_identity() {
    let cfg = Config::from_file(&common::testdata("commented.yaml")).unwrap();
    let mut merged = cfg.clone();
    merged.merge(&cfg);
    assert_eq!(
        merged.as_yaml(OutputOptions::default()),
        cfg.as_yaml(OutputOptions::default())
    );
}
