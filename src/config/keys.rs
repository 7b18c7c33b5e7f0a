//! Dotted key-path enumeration for shell completion.

use super::{Config, Entry};
use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyListMode {
    /// Only paths ending in a scalar.
    Leaves,
    /// Scalar paths plus every container path above them.
    WithParents,
}

/// Every dotted path in a YAML document whose terminal is a scalar, sorted;
/// the top-level `_config` entry is skipped. `WithParents` adds container
/// paths, which `get` also accepts.
pub fn keys_in(bytes: &[u8], mode: KeyListMode) -> Result<Vec<String>> {
    let cfg = Config::from_yaml(bytes)?;
    let mut keys = Vec::new();
    collect(&cfg.tree, mode, &mut keys);
    keys.sort();
    Ok(keys)
}

fn collect(entry: &Entry, mode: KeyListMode, keys: &mut Vec<String>) {
    for pair in entry.pairs() {
        if entry.path.is_empty() && pair.key.value == "_config" {
            continue;
        }
        visit(&pair.value, mode, keys);
    }
    for item in entry.items() {
        visit(item, mode, keys);
    }
}

fn visit(entry: &Entry, mode: KeyListMode, keys: &mut Vec<String>) {
    if entry.is_scalar() {
        keys.push(entry.path.join("."));
        return;
    }
    if mode == KeyListMode::WithParents && !entry.path.is_empty() {
        keys.push(entry.path.join("."));
    }
    collect(entry, mode, keys);
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = "\
_config: !!joao
  vault: example
  name: some:test
int: 1
nested:
  bool: true
  list: [1, 2]
";

    #[test]
    fn lists_scalar_paths_sorted() {
        let keys = keys_in(DOC.as_bytes(), KeyListMode::Leaves).unwrap();
        assert_eq!(
            keys,
            vec!["int", "nested.bool", "nested.list.0", "nested.list.1"]
        );
    }

    #[test]
    fn with_parents_adds_container_paths() {
        let keys = keys_in(DOC.as_bytes(), KeyListMode::WithParents).unwrap();
        assert!(keys.contains(&"nested".to_string()));
        assert!(keys.contains(&"nested.list".to_string()));
        assert!(keys.contains(&"nested.list.0".to_string()));
        assert!(!keys.iter().any(|k| k.starts_with("_config")));
    }
}
