//! The configuration document: a typed tree bound to its (vault, name)
//! identity, with the operations the commands are built from.

use std::fs;
use std::path::Path;

use serde_json::Value as JsonValue;

pub mod entry;
pub mod item;
pub mod keys;
pub mod output;
pub mod resolver;

pub use entry::{Comments, Entry, EntryKind, MapPair, ShortType, Style, TAG_META_CONFIG, TAG_SECRET};
pub use item::{FieldKind, Item, ItemField, ItemSection, ItemVault};
pub use keys::{keys_in, KeyListMode};
pub use output::OutputOptions;
pub use resolver::{is_yaml_path, load, vault_and_name_from, RepoConfig};

use crate::error::{Error, Result};
use crate::yaml;

/// A configuration document and where it lives in the secret manager.
#[derive(Debug, Clone)]
pub struct Config {
    pub vault: String,
    pub name: String,
    pub tree: Entry,
}

impl Config {
    /// Parses YAML bytes into a config with no identity attached. Empty
    /// input yields an empty mapping.
    pub fn from_yaml(bytes: &[u8]) -> Result<Config> {
        let text = std::str::from_utf8(bytes)
            .map_err(|_| Error::parse(1, "configuration is not valid UTF-8"))?;

        let tree = if text.trim().is_empty() {
            let mut root = Entry::mapping();
            root.set_path(Vec::new());
            root
        } else {
            let root = yaml::parse(text)?;
            if !root.is_mapping() {
                return Err(Error::parse(
                    root.line,
                    "top-level configuration must be a mapping",
                ));
            }
            root
        };

        Ok(Config {
            vault: String::new(),
            name: String::new(),
            tree,
        })
    }

    pub fn from_yaml_named(bytes: &[u8], vault: &str, name: &str) -> Result<Config> {
        let mut cfg = Config::from_yaml(bytes)?;
        cfg.vault = vault.to_string();
        cfg.name = name.to_string();
        Ok(cfg)
    }

    /// The entry at `query`. The empty path and `["."]` return the root.
    pub fn lookup(&self, query: &[String]) -> Result<&Entry> {
        if query.is_empty() || (query.len() == 1 && query[0] == ".") {
            return Ok(&self.tree);
        }
        let mut entry = &self.tree;
        for part in query {
            entry = entry
                .child_named(part)
                .ok_or_else(|| Error::not_found(part, query))?;
        }
        Ok(entry)
    }

    /// Stores a value at `path`, creating intermediate containers as needed.
    /// Intermediates become sequences when the following segment is numeric.
    ///
    /// With `parse_value` the bytes are decoded (JSON, or the YAML subset)
    /// and containers are stored in standard style; otherwise the bytes are
    /// a scalar, optionally tagged secret. The two flags conflict.
    pub fn set(
        &mut self,
        path: &[String],
        bytes: &[u8],
        is_secret: bool,
        parse_value: bool,
    ) -> Result<()> {
        if is_secret && parse_value {
            return Err(Error::InvalidArgs(
                "a value cannot be both secret and parsed".to_string(),
            ));
        }
        let Some((last, parents)) = path.split_last() else {
            return Err(Error::InvalidArgs("empty target path".to_string()));
        };

        let new_entry = if parse_value {
            let mut parsed = match serde_json::from_slice::<JsonValue>(bytes) {
                Ok(value) => entry_from_json(&value),
                Err(_) => {
                    let text = std::str::from_utf8(bytes)
                        .map_err(|_| Error::parse(1, "value is not valid UTF-8"))?;
                    yaml::parse(text)?
                }
            };
            if !parsed.is_scalar() {
                normalize_standard(&mut parsed);
            }
            parsed
        } else {
            let text = std::str::from_utf8(bytes)
                .map_err(|_| Error::InvalidArgs("value is not valid UTF-8".to_string()))?;
            let value = text.trim_end_matches('\n');
            let mut scalar = Entry::scalar(value);
            scalar.short_type = yaml::resolve_plain(value);
            if is_secret {
                scalar.tag = TAG_SECRET.to_string();
                scalar.style = Style::TAGGED;
                scalar.short_type = ShortType::Str;
            }
            if value.contains('\n') {
                scalar.style = scalar.style.with(Style::LITERAL);
            }
            scalar
        };

        let mut entry = &mut self.tree;
        for (idx, segment) in parents.iter().enumerate() {
            if entry.child_named(segment).is_none() {
                let next = parents.get(idx + 1).map(String::as_str).unwrap_or(last);
                let child = if item::is_numeric(next) {
                    Entry::sequence()
                } else {
                    Entry::mapping()
                };
                item::push_child(entry, segment, child)?;
            }
            entry = entry
                .child_named_mut(segment)
                .ok_or_else(|| Error::Internal(format!("missing container {:?}", segment)))?;
        }

        match entry.child_named_mut(last) {
            Some(existing) => {
                existing.value = new_entry.value;
                existing.tag = new_entry.tag;
                existing.style = new_entry.style;
                existing.short_type = new_entry.short_type;
                existing.kind = new_entry.kind;
            }
            None => item::push_child(entry, last, new_entry)?,
        }

        self.tree.set_path(Vec::new());
        Ok(())
    }

    /// Removes the entry at `path`; for mapping parents the key goes with it.
    pub fn delete(&mut self, path: &[String]) -> Result<()> {
        let Some((last, parents)) = path.split_last() else {
            return Err(Error::InvalidArgs("empty target path".to_string()));
        };

        let mut entry = &mut self.tree;
        for segment in parents {
            entry = entry
                .child_named_mut(segment)
                .ok_or_else(|| Error::not_found(segment, path))?;
        }

        match &mut entry.kind {
            EntryKind::Mapping(pairs) => {
                let position = pairs
                    .iter()
                    .position(|p| p.key.value == *last)
                    .ok_or_else(|| Error::not_found(last, path))?;
                pairs.remove(position);
            }
            EntryKind::Sequence(items) => {
                let index: usize = last
                    .parse()
                    .ok()
                    .filter(|idx| *idx < items.len())
                    .ok_or_else(|| Error::not_found(last, path))?;
                items.remove(index);
            }
            EntryKind::Scalar => return Err(Error::not_found(last, path)),
        }

        self.tree.set_path(Vec::new());
        Ok(())
    }

    /// Merges remote leaf values into this tree, keeping local structure and
    /// comments authoritative.
    pub fn merge(&mut self, remote: &Config) {
        self.tree.merge(&remote.tree);
        self.tree.set_path(Vec::new());
    }

    /// The tree as plain JSON, without the `_config` entry.
    pub fn to_map(&self, redacted: bool) -> JsonValue {
        let mut map = serde_json::Map::new();
        for pair in self.tree.pairs() {
            if pair.value.is_meta_config() {
                continue;
            }
            map.insert(pair.key.value.clone(), pair.value.as_map(redacted));
        }
        JsonValue::Object(map)
    }

    pub fn as_yaml(&self, opts: OutputOptions) -> String {
        yaml::emit(&self.tree, opts)
    }

    /// JSON bytes: the plain map, or the flat item when `as_item`.
    pub fn as_json(&self, redacted: bool, as_item: bool) -> Result<String> {
        if as_item {
            Ok(serde_json::to_string(&self.to_item())?)
        } else {
            Ok(serde_json::to_string(&self.to_map(redacted))?)
        }
    }

    /// Writes the serialized document to `path`, preserving the file's
    /// permissions when it exists (0644 otherwise).
    pub fn as_file(&self, path: &Path, opts: OutputOptions) -> Result<()> {
        let bytes = self.as_yaml(opts);

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = fs::metadata(path)
                .map(|m| m.permissions().mode() & 0o777)
                .unwrap_or(0o644);
            fs::write(path, &bytes).map_err(|err| write_error(path, err))?;
            fs::set_permissions(path, fs::Permissions::from_mode(mode))?;
        }
        #[cfg(not(unix))]
        {
            fs::write(path, &bytes).map_err(|err| write_error(path, err))?;
        }
        Ok(())
    }

    /// Diffs this config against its remote copy. Both sides render in
    /// canonical form; a missing remote compares against an empty document
    /// unless the diff previews a fetch, where it is an error. Returns
    /// whether differences were found.
    pub fn diff_remote(
        &self,
        path: &str,
        redacted: bool,
        as_fetch: bool,
        stdout: &mut dyn std::io::Write,
        stderr: &mut dyn std::io::Write,
    ) -> Result<bool> {
        let remote = match resolver::load(path, true) {
            Ok(cfg) => Some(cfg),
            Err(Error::ItemNotFound { .. }) if !as_fetch => None,
            Err(err) => return Err(err),
        };

        let mut opts = OutputOptions::diff_canonical();
        if redacted {
            opts |= OutputOptions::REDACTED;
        }

        let local = self.as_yaml(opts);
        let remote_label = format!("op://{}/{}", self.vault, self.name);
        let remote_bytes = remote.map(|cfg| cfg.as_yaml(opts));

        let (label_a, side_a, label_b, side_b) = if as_fetch {
            (path.to_string(), Some(local), remote_label, remote_bytes)
        } else {
            (remote_label, remote_bytes, path.to_string(), Some(local))
        };

        crate::diff::unified(
            &label_a,
            side_a.as_deref(),
            &label_b,
            side_b.as_deref(),
            stdout,
            stderr,
        )
    }
}

fn write_error(path: &Path, err: std::io::Error) -> Error {
    Error::Io(std::io::Error::new(
        err.kind(),
        format!("could not save changes to {}: {}", path.display(), err),
    ))
}

/// Decodes a JSON value into an entry in standard style.
fn entry_from_json(value: &JsonValue) -> Entry {
    match value {
        JsonValue::Null => Entry::scalar_typed("null", ShortType::Null),
        JsonValue::Bool(b) => Entry::scalar_typed(b.to_string(), ShortType::Bool),
        JsonValue::Number(n) => {
            let short_type = if n.is_i64() || n.is_u64() {
                ShortType::Int
            } else {
                ShortType::Float
            };
            Entry::scalar_typed(n.to_string(), short_type)
        }
        JsonValue::String(s) => Entry::scalar(s.clone()),
        JsonValue::Array(values) => {
            let mut seq = Entry::sequence();
            seq.kind = EntryKind::Sequence(values.iter().map(entry_from_json).collect());
            seq
        }
        JsonValue::Object(map) => {
            let mut mapping = Entry::mapping();
            mapping.kind = EntryKind::Mapping(
                map.iter()
                    .map(|(k, v)| MapPair {
                        key: Entry::scalar(k.clone()),
                        value: entry_from_json(v),
                    })
                    .collect(),
            );
            mapping
        }
    }
}

/// Strips presentation styles so a pasted value serializes in block form.
fn normalize_standard(entry: &mut Entry) {
    entry.style = if entry.is_scalar() && entry.value.contains('\n') {
        Style::LITERAL
    } else {
        Style::PLAIN
    };
    match &mut entry.kind {
        EntryKind::Mapping(pairs) => {
            for pair in pairs {
                pair.key.style = Style::PLAIN;
                normalize_standard(&mut pair.value);
            }
        }
        EntryKind::Sequence(items) => {
            for item in items {
                normalize_standard(item);
            }
        }
        EntryKind::Scalar => {}
    }
}
