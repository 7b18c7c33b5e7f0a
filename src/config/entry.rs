//! The typed configuration tree.
//!
//! An [`Entry`] is one node of a parsed configuration document. It keeps
//! everything needed to reproduce the source bytes: scalar text, explicit
//! tags, quoting styles, comments and source positions. Mappings are ordered
//! lists of key/value pairs so document order survives every transformation.

use serde_json::Value as JsonValue;

/// YAML tag marking a scalar as secret.
pub const TAG_SECRET: &str = "!!secret";
/// YAML tag marking the embedded `_config` mapping.
pub const TAG_META_CONFIG: &str = "!!joao";

/// Scalar resolution per the YAML 1.2 core schema, stored as a short tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ShortType {
    #[default]
    Str,
    Int,
    Float,
    Bool,
    Null,
}

impl ShortType {
    pub fn as_tag(self) -> &'static str {
        match self {
            ShortType::Str => "!!str",
            ShortType::Int => "!!int",
            ShortType::Float => "!!float",
            ShortType::Bool => "!!bool",
            ShortType::Null => "!!null",
        }
    }
}

/// Presentation style flags preserved from parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Style(u8);

impl Style {
    pub const PLAIN: Style = Style(0);
    pub const TAGGED: Style = Style(1);
    pub const SINGLE_QUOTED: Style = Style(1 << 1);
    pub const DOUBLE_QUOTED: Style = Style(1 << 2);
    pub const LITERAL: Style = Style(1 << 3);
    pub const FOLDED: Style = Style(1 << 4);
    pub const FLOW: Style = Style(1 << 5);

    pub fn has(self, flag: Style) -> bool {
        self.0 & flag.0 != 0
    }

    #[must_use]
    pub fn with(self, flag: Style) -> Style {
        Style(self.0 | flag.0)
    }

    #[must_use]
    pub fn without(self, flag: Style) -> Style {
        Style(self.0 & !flag.0)
    }
}

/// Comments attached to a node, stored as raw source lines (including `#`
/// and original indentation) so emission can reproduce them verbatim. Blank
/// lines appear as empty strings inside `head`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Comments {
    pub head: Vec<String>,
    pub line: String,
    pub foot: Vec<String>,
}

impl Comments {
    pub fn is_empty(&self) -> bool {
        self.head.is_empty() && self.line.is_empty() && self.foot.is_empty()
    }
}

/// One key/value record of a mapping. Keys are always scalar entries.
#[derive(Debug, Clone, PartialEq)]
pub struct MapPair {
    pub key: Entry,
    pub value: Entry,
}

/// The shape of an entry, carrying its children.
#[derive(Debug, Clone, PartialEq)]
pub enum EntryKind {
    Scalar,
    Mapping(Vec<MapPair>),
    Sequence(Vec<Entry>),
}

/// A node in the configuration tree.
#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    pub kind: EntryKind,
    /// Scalar text; empty for containers.
    pub value: String,
    /// Explicit tag as written in the source (`!!secret`, `!!joao`), empty
    /// when the node carries no explicit tag.
    pub tag: String,
    pub short_type: ShortType,
    pub style: Style,
    pub comments: Comments,
    pub line: usize,
    pub column: usize,
    /// Segments locating this entry from the root; map keys as given,
    /// sequence indices in decimal.
    pub path: Vec<String>,
}

impl Entry {
    pub fn scalar(value: impl Into<String>) -> Entry {
        let value = value.into();
        Entry {
            kind: EntryKind::Scalar,
            value,
            tag: String::new(),
            short_type: ShortType::Str,
            style: Style::PLAIN,
            comments: Comments::default(),
            line: 0,
            column: 0,
            path: Vec::new(),
        }
    }

    pub fn scalar_typed(value: impl Into<String>, short_type: ShortType) -> Entry {
        let mut e = Entry::scalar(value);
        e.short_type = short_type;
        e
    }

    pub fn mapping() -> Entry {
        Entry {
            kind: EntryKind::Mapping(Vec::new()),
            ..Entry::scalar("")
        }
    }

    pub fn sequence() -> Entry {
        Entry {
            kind: EntryKind::Sequence(Vec::new()),
            ..Entry::scalar("")
        }
    }

    pub fn is_scalar(&self) -> bool {
        matches!(self.kind, EntryKind::Scalar)
    }

    pub fn is_mapping(&self) -> bool {
        matches!(self.kind, EntryKind::Mapping(_))
    }

    pub fn is_sequence(&self) -> bool {
        matches!(self.kind, EntryKind::Sequence(_))
    }

    pub fn is_secret(&self) -> bool {
        self.tag == TAG_SECRET
    }

    pub fn is_meta_config(&self) -> bool {
        self.tag == TAG_META_CONFIG
    }

    /// The last path segment, or the empty string for the root.
    pub fn name(&self) -> &str {
        self.path.last().map(String::as_str).unwrap_or("")
    }

    /// The type annotation this entry contributes to the item sidecar.
    /// Empty means the default (string) and needs no annotation.
    pub fn type_str(&self) -> &'static str {
        if self.is_secret() {
            return "secret";
        }
        match self.short_type {
            ShortType::Bool => "bool",
            ShortType::Int => "int",
            ShortType::Float => "float",
            _ => "",
        }
    }

    pub fn pairs(&self) -> &[MapPair] {
        match &self.kind {
            EntryKind::Mapping(pairs) => pairs,
            _ => &[],
        }
    }

    pub fn items(&self) -> &[Entry] {
        match &self.kind {
            EntryKind::Sequence(items) => items,
            _ => &[],
        }
    }

    /// Mapping pairs in document order, or sorted by key when requested.
    /// Sequences are never reordered.
    pub fn ordered_pairs(&self, sorted: bool) -> Vec<&MapPair> {
        let mut pairs: Vec<&MapPair> = self.pairs().iter().collect();
        if sorted {
            pairs.sort_by(|a, b| a.key.value.cmp(&b.key.value));
        }
        pairs
    }

    /// Finds a direct child: by key for mappings, by decimal index for
    /// sequences.
    pub fn child_named(&self, name: &str) -> Option<&Entry> {
        match &self.kind {
            EntryKind::Mapping(pairs) => pairs
                .iter()
                .find(|p| p.key.value == name)
                .map(|p| &p.value),
            EntryKind::Sequence(items) => {
                name.parse::<usize>().ok().and_then(|idx| items.get(idx))
            }
            EntryKind::Scalar => None,
        }
    }

    pub fn child_named_mut(&mut self, name: &str) -> Option<&mut Entry> {
        match &mut self.kind {
            EntryKind::Mapping(pairs) => pairs
                .iter_mut()
                .find(|p| p.key.value == name)
                .map(|p| &mut p.value),
            EntryKind::Sequence(items) => {
                name.parse::<usize>().ok().and_then(|idx| items.get_mut(idx))
            }
            EntryKind::Scalar => None,
        }
    }

    /// Recursively assigns `path` to this entry and all descendants. Mapping
    /// children take their key scalar as segment, sequence children their
    /// decimal index.
    pub fn set_path(&mut self, path: Vec<String>) {
        self.path = path;
        match &mut self.kind {
            EntryKind::Mapping(pairs) => {
                let base = self.path.clone();
                for pair in pairs {
                    let mut child_path = base.clone();
                    child_path.push(pair.key.value.clone());
                    pair.key.path = child_path.clone();
                    pair.value.set_path(child_path);
                }
            }
            EntryKind::Sequence(items) => {
                let base = self.path.clone();
                for (idx, item) in items.iter_mut().enumerate() {
                    let mut child_path = base.clone();
                    child_path.push(idx.to_string());
                    item.set_path(child_path);
                }
            }
            EntryKind::Scalar => {}
        }
    }

    /// Projects this entry to plain JSON. Scalars decode per their short
    /// type (bool, int and float become typed values, everything else stays
    /// a string), sequences become arrays and mappings become objects.
    pub fn as_map(&self, redacted: bool) -> JsonValue {
        match &self.kind {
            EntryKind::Scalar => self.scalar_json(redacted),
            EntryKind::Sequence(items) => {
                JsonValue::Array(items.iter().map(|e| e.as_map(redacted)).collect())
            }
            EntryKind::Mapping(pairs) => {
                let mut map = serde_json::Map::new();
                for pair in pairs {
                    map.insert(pair.key.value.clone(), pair.value.as_map(redacted));
                }
                JsonValue::Object(map)
            }
        }
    }

    fn scalar_json(&self, redacted: bool) -> JsonValue {
        if redacted && self.is_secret() {
            return JsonValue::String(String::new());
        }
        match self.short_type {
            ShortType::Bool => match self.value.parse::<bool>() {
                Ok(b) => JsonValue::Bool(b),
                Err(_) => JsonValue::String(self.value.clone()),
            },
            ShortType::Int => match self.value.parse::<i64>() {
                Ok(n) => JsonValue::Number(n.into()),
                Err(_) => JsonValue::String(self.value.clone()),
            },
            ShortType::Float => match self.value.parse::<f64>() {
                Ok(f) => serde_json::Number::from_f64(f)
                    .map(JsonValue::Number)
                    .unwrap_or_else(|| JsonValue::String(self.value.clone())),
                Err(_) => JsonValue::String(self.value.clone()),
            },
            _ => JsonValue::String(self.value.clone()),
        }
    }

    /// Merges `remote` into this entry. Local structure and comments are
    /// authoritative; remote leaf values win. Sequences recurse over the
    /// common prefix and append remote indices past the local length.
    pub fn merge(&mut self, remote: &Entry) {
        if self.is_scalar() && remote.is_scalar() {
            self.value = remote.value.clone();
            self.tag = remote.tag.clone();
            self.short_type = remote.short_type;
            if remote.is_secret() {
                self.style = self.style.with(Style::TAGGED);
            }
            return;
        }

        match (&mut self.kind, &remote.kind) {
            (EntryKind::Mapping(pairs), EntryKind::Mapping(remote_pairs)) => {
                for rp in remote_pairs {
                    match pairs.iter_mut().find(|p| p.key.value == rp.key.value) {
                        Some(local) => local.value.merge(&rp.value),
                        None => pairs.push(rp.clone()),
                    }
                }
            }
            (EntryKind::Sequence(items), EntryKind::Sequence(remote_items)) => {
                for (idx, remote_item) in remote_items.iter().enumerate() {
                    match items.get_mut(idx) {
                        Some(local) => local.merge(remote_item),
                        None => items.push(remote_item.clone()),
                    }
                }
            }
            // Mismatched kinds: remote replaces local, keeping the local
            // comments anchored to this document position.
            _ => {
                let comments = std::mem::take(&mut self.comments);
                *self = remote.clone();
                self.comments = comments;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mapping_of(pairs: Vec<(&str, Entry)>) -> Entry {
        let mut root = Entry::mapping();
        if let EntryKind::Mapping(list) = &mut root.kind {
            for (k, v) in pairs {
                list.push(MapPair {
                    key: Entry::scalar(k),
                    value: v,
                });
            }
        }
        root.set_path(Vec::new());
        root
    }

    #[test]
    fn child_lookup_by_key_and_index() {
        let mut seq = Entry::sequence();
        if let EntryKind::Sequence(items) = &mut seq.kind {
            items.push(Entry::scalar("a"));
            items.push(Entry::scalar("b"));
        }
        let root = mapping_of(vec![("list", seq), ("plain", Entry::scalar("x"))]);

        assert_eq!(root.child_named("plain").unwrap().value, "x");
        let list = root.child_named("list").unwrap();
        assert_eq!(list.child_named("1").unwrap().value, "b");
        assert!(list.child_named("2").is_none());
        assert!(root.child_named("nope").is_none());
    }

    #[test]
    fn set_path_assigns_segments() {
        let mut seq = Entry::sequence();
        if let EntryKind::Sequence(items) = &mut seq.kind {
            items.push(Entry::scalar("a"));
        }
        let root = mapping_of(vec![("list", seq)]);
        let item = root.child_named("list").unwrap().child_named("0").unwrap();
        assert_eq!(item.path, vec!["list".to_string(), "0".to_string()]);
        assert_eq!(item.name(), "0");
    }

    #[test]
    fn type_str_for_annotations() {
        let mut secret = Entry::scalar("hush");
        secret.tag = TAG_SECRET.to_string();
        assert_eq!(secret.type_str(), "secret");
        assert_eq!(Entry::scalar_typed("1", ShortType::Int).type_str(), "int");
        assert_eq!(
            Entry::scalar_typed("true", ShortType::Bool).type_str(),
            "bool"
        );
        assert_eq!(Entry::scalar_typed("x", ShortType::Str).type_str(), "");
    }

    #[test]
    fn as_map_decodes_short_types() {
        let root = mapping_of(vec![
            ("int", Entry::scalar_typed("1", ShortType::Int)),
            ("bool", Entry::scalar_typed("false", ShortType::Bool)),
            ("float", Entry::scalar_typed("1.5", ShortType::Float)),
            ("string", Entry::scalar("pato")),
        ]);
        let json = root.as_map(false);
        assert_eq!(json["int"], serde_json::json!(1));
        assert_eq!(json["bool"], serde_json::json!(false));
        assert_eq!(json["float"], serde_json::json!(1.5));
        assert_eq!(json["string"], serde_json::json!("pato"));
    }

    #[test]
    fn as_map_redacts_secrets() {
        let mut secret = Entry::scalar("very secret");
        secret.tag = TAG_SECRET.to_string();
        let root = mapping_of(vec![("secret", secret)]);
        assert_eq!(root.as_map(true)["secret"], serde_json::json!(""));
        assert_eq!(root.as_map(false)["secret"], serde_json::json!("very secret"));
    }

    #[test]
    fn merge_is_identity_on_self() {
        let root = mapping_of(vec![
            ("int", Entry::scalar_typed("1", ShortType::Int)),
            ("string", Entry::scalar("pato")),
        ]);
        let mut merged = root.clone();
        merged.merge(&root);
        assert_eq!(merged, root);
    }

    #[test]
    fn merge_overwrites_scalars_and_appends_missing() {
        let mut local = mapping_of(vec![("kept", Entry::scalar("old"))]);
        local.child_named_mut("kept").unwrap().comments.line = "# local note".into();

        let remote = mapping_of(vec![
            ("kept", Entry::scalar("new")),
            ("added", Entry::scalar("fresh")),
        ]);
        local.merge(&remote);

        let kept = local.child_named("kept").unwrap();
        assert_eq!(kept.value, "new");
        assert_eq!(kept.comments.line, "# local note");
        assert_eq!(local.child_named("added").unwrap().value, "fresh");
    }

    #[test]
    fn merge_sequences_recurse_and_append() {
        let mut local_seq = Entry::sequence();
        if let EntryKind::Sequence(items) = &mut local_seq.kind {
            items.push(Entry::scalar("one"));
            items.push(Entry::scalar("two"));
        }
        let mut remote_seq = Entry::sequence();
        if let EntryKind::Sequence(items) = &mut remote_seq.kind {
            items.push(Entry::scalar("uno"));
            items.push(Entry::scalar("dos"));
            items.push(Entry::scalar("tres"));
        }
        let mut local = mapping_of(vec![("list", local_seq)]);
        let remote = mapping_of(vec![("list", remote_seq)]);
        local.merge(&remote);

        let list = local.child_named("list").unwrap();
        let values: Vec<&str> = list.items().iter().map(|e| e.value.as_str()).collect();
        assert_eq!(values, vec!["uno", "dos", "tres"]);
    }

    #[test]
    fn merge_replaces_on_kind_mismatch() {
        let mut local = mapping_of(vec![("node", Entry::scalar("plain"))]);
        let remote = mapping_of(vec![(
            "node",
            mapping_of(vec![("sub", Entry::scalar("deep"))]),
        )]);
        local.merge(&remote);
        assert!(local.child_named("node").unwrap().is_mapping());
    }
}
