//! The flat secret-manager item and its codec.
//!
//! A configuration tree projects onto a 1Password item as one field per
//! scalar leaf, path-encoded into the field id. Logical types that the flat
//! shape cannot carry (secret, bool, int, float) travel in a reserved
//! `~annotations` section, and the reserved `password` field stores a
//! content checksum of the data fields.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::entry::{Entry, EntryKind, MapPair, ShortType, Style, TAG_SECRET};
use super::Config;
use crate::error::{Error, Result};
use crate::opclient::checksum;

/// Section holding type annotations for data fields.
pub const ANNOTATIONS_SECTION: &str = "~annotations";
/// Reserved field storing the content checksum.
pub const FIELD_PASSWORD: &str = "password";
/// Reserved notes field.
pub const FIELD_NOTES: &str = "notesPlain";
/// Value of the reserved notes field.
pub const NOTES_VALUE: &str = "flushed by joao";
/// Category of every item this tool writes.
pub const CATEGORY_PASSWORD: &str = "PASSWORD";

/// A 1Password item as the CLI and Connect API serialize it.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Item {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    pub title: String,
    pub vault: ItemVault,
    pub category: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sections: Vec<ItemSection>,
    #[serde(default)]
    pub fields: Vec<ItemField>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ItemVault {
    pub id: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ItemSection {
    pub id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub label: String,
}

impl ItemSection {
    pub fn named(name: &str) -> ItemSection {
        ItemSection {
            id: name.to_string(),
            label: name.to_string(),
        }
    }

    /// The display name: label when present, id otherwise.
    pub fn name(&self) -> &str {
        if self.label.is_empty() {
            &self.id
        } else {
            &self.label
        }
    }
}

/// Wire field type: `CONCEALED` for secrets, `STRING` for everything else.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum FieldKind {
    #[default]
    String,
    Concealed,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ItemField {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: FieldKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub purpose: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section: Option<ItemSection>,
    pub label: String,
    #[serde(default)]
    pub value: String,
}

impl Item {
    /// The value of the field with the given id, or the empty string.
    pub fn value_of(&self, id: &str) -> &str {
        self.fields
            .iter()
            .find(|f| f.id == id)
            .map(|f| f.value.as_str())
            .unwrap_or("")
    }

}

impl Config {
    /// Projects the tree onto a flat item, computing the content checksum
    /// into the reserved `password` field.
    pub fn to_item(&self) -> Item {
        let mut sections = vec![ItemSection::named(ANNOTATIONS_SECTION)];
        for pair in self.tree.pairs() {
            if pair.value.is_meta_config() {
                continue;
            }
            if !pair.value.is_scalar() {
                sections.push(ItemSection::named(&pair.key.value));
            }
        }

        let mut data = Vec::new();
        collect_fields(&self.tree, &mut data);

        let mut fields = vec![
            ItemField {
                id: FIELD_PASSWORD.to_string(),
                kind: FieldKind::Concealed,
                purpose: Some("PASSWORD".to_string()),
                section: None,
                label: FIELD_PASSWORD.to_string(),
                value: checksum(&data),
            },
            ItemField {
                id: FIELD_NOTES.to_string(),
                kind: FieldKind::String,
                purpose: Some("NOTES".to_string()),
                section: None,
                label: FIELD_NOTES.to_string(),
                value: NOTES_VALUE.to_string(),
            },
        ];
        fields.extend(data);

        Item {
            id: String::new(),
            title: self.name.clone(),
            vault: ItemVault {
                id: self.vault.clone(),
            },
            category: CATEGORY_PASSWORD.to_string(),
            sections,
            fields,
        }
    }

    /// Rebuilds a config from a flat item. A checksum mismatch against the
    /// stored `password` field means someone edited the item by hand; it is
    /// reported as a warning, never an error.
    pub fn from_item(item: &Item) -> Result<Config> {
        let stored = item.value_of(FIELD_PASSWORD);
        let computed = checksum(&item.fields);
        if stored != computed {
            tracing::warn!(
                "item {}/{} changed and its checksum was not updated. Expected: {}, found: {}",
                item.vault.id,
                item.title,
                computed,
                stored
            );
        }

        let mut tree = tree_from_fields(&item.fields)?;
        tree.set_path(Vec::new());
        Ok(Config {
            vault: item.vault.id.clone(),
            name: item.title.clone(),
            tree,
        })
    }
}

/// Walks the tree in document order emitting one data field per scalar leaf,
/// preceded by its sidecar annotation when the logical type needs one.
fn collect_fields(entry: &Entry, out: &mut Vec<ItemField>) {
    match &entry.kind {
        EntryKind::Scalar => {
            let full_path = entry.path.join(".");
            let (section, label) = if entry.path.len() >= 2 {
                (
                    Some(ItemSection::named(&entry.path[0])),
                    entry.path[1..].join("."),
                )
            } else {
                (None, full_path.clone())
            };

            let annotation = entry.type_str();
            if !annotation.is_empty() {
                out.push(ItemField {
                    id: format!("{}.{}", ANNOTATIONS_SECTION, full_path),
                    kind: FieldKind::String,
                    purpose: None,
                    section: Some(ItemSection::named(ANNOTATIONS_SECTION)),
                    label: full_path.clone(),
                    value: annotation.to_string(),
                });
            }

            out.push(ItemField {
                id: full_path,
                kind: if entry.is_secret() {
                    FieldKind::Concealed
                } else {
                    FieldKind::String
                },
                purpose: None,
                section,
                label,
                value: entry.value.clone(),
            });
        }
        EntryKind::Sequence(items) => {
            for item in items {
                collect_fields(item, out);
            }
        }
        EntryKind::Mapping(pairs) => {
            for pair in pairs {
                if pair.value.is_meta_config() {
                    continue;
                }
                collect_fields(&pair.value, out);
            }
        }
    }
}

/// Rebuilds a tree from flat fields: reserved fields are dropped, the
/// `~annotations` section is collected into a type map, and every data field
/// walks or creates its container chain.
fn tree_from_fields(fields: &[ItemField]) -> Result<Entry> {
    let mut annotations: HashMap<&str, &str> = HashMap::new();
    let mut order: Vec<String> = Vec::new();
    let mut data: HashMap<String, &str> = HashMap::new();

    for field in fields {
        let mut label = field.label.clone();
        if let Some(section) = &field.section {
            if section.name() == ANNOTATIONS_SECTION {
                annotations.insert(&field.label, &field.value);
                continue;
            }
            if !section.name().is_empty() {
                label = format!("{}.{}", section.name(), field.label);
            }
        }
        if label == FIELD_PASSWORD || label == FIELD_NOTES {
            continue;
        }
        order.push(label.clone());
        data.insert(label, &field.value);
    }

    let mut root = Entry::mapping();
    for label in &order {
        let segments: Vec<&str> = label.split('.').collect();
        let value = data[label];
        insert_leaf(&mut root, &segments, value, annotations.get(label.as_str()).copied())?;
    }
    Ok(root)
}

fn insert_leaf(
    root: &mut Entry,
    segments: &[&str],
    value: &str,
    annotation: Option<&str>,
) -> Result<()> {
    let mut container = root;
    for (idx, segment) in segments.iter().enumerate() {
        let last = idx == segments.len() - 1;
        if last {
            place_scalar(container, segment, value, annotation)?;
            break;
        }

        let next_numeric = is_numeric(segments[idx + 1]);
        if container.child_named(segment).is_none() {
            let child = if next_numeric {
                Entry::sequence()
            } else {
                Entry::mapping()
            };
            push_child(container, segment, child)?;
        }
        container = match container.child_named_mut(segment) {
            Some(child) => child,
            None => {
                return Err(Error::Internal(format!(
                    "container {:?} vanished while rebuilding tree",
                    segment
                )))
            }
        };
    }
    Ok(())
}

fn place_scalar(
    container: &mut Entry,
    segment: &str,
    value: &str,
    annotation: Option<&str>,
) -> Result<()> {
    let mut leaf = Entry::scalar(value);
    match annotation {
        Some("secret") => {
            leaf.tag = TAG_SECRET.to_string();
            leaf.style = Style::TAGGED;
        }
        Some("bool") => leaf.short_type = ShortType::Bool,
        Some("int") => leaf.short_type = ShortType::Int,
        Some("float") => leaf.short_type = ShortType::Float,
        // Unknown annotations are ignored.
        _ => {}
    }

    if let Some(existing) = container.child_named_mut(segment) {
        existing.value = leaf.value;
        existing.tag = leaf.tag;
        existing.style = leaf.style;
        existing.short_type = leaf.short_type;
        existing.kind = EntryKind::Scalar;
        return Ok(());
    }
    push_child(container, segment, leaf)
}

pub(crate) fn push_child(container: &mut Entry, segment: &str, child: Entry) -> Result<()> {
    // A fresh mapping grows into a sequence when its first key is numeric.
    if is_numeric(segment) && container.is_mapping() && container.pairs().is_empty() {
        container.kind = EntryKind::Sequence(Vec::new());
    }

    match &mut container.kind {
        EntryKind::Sequence(items) => {
            items.push(child);
            Ok(())
        }
        EntryKind::Mapping(pairs) => {
            pairs.push(MapPair {
                key: Entry::scalar(segment),
                value: child,
            });
            Ok(())
        }
        EntryKind::Scalar => Err(Error::Internal(format!(
            "cannot add {:?} to a scalar entry",
            segment
        ))),
    }
}

pub(crate) fn is_numeric(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::yaml;

    const DOC: &str = "\
_config: !!joao
  vault: example
  name: some:test
int: 1
string: pato
secret: !!secret very secret
nested:
  bool: true
  list: [1, 2, 3]
";

    fn config() -> Config {
        let mut tree = yaml::parse(DOC).unwrap();
        tree.set_path(Vec::new());
        Config {
            vault: "example".into(),
            name: "some:test".into(),
            tree,
        }
    }

    fn field<'a>(item: &'a Item, id: &str) -> &'a ItemField {
        item.fields
            .iter()
            .find(|f| f.id == id)
            .unwrap_or_else(|| panic!("missing field {}", id))
    }

    #[test]
    fn to_item_projects_scalars_with_sections() {
        let item = config().to_item();
        assert_eq!(item.title, "some:test");
        assert_eq!(item.vault.id, "example");
        assert_eq!(item.category, CATEGORY_PASSWORD);

        // _config never leaves the file.
        assert!(item.fields.iter().all(|f| !f.id.contains("_config")));

        let int = field(&item, "int");
        assert_eq!(int.value, "1");
        assert_eq!(int.kind, FieldKind::String);
        assert!(int.section.is_none());

        let secret = field(&item, "secret");
        assert_eq!(secret.kind, FieldKind::Concealed);
        assert_eq!(secret.value, "very secret");

        let nested = field(&item, "nested.list.1");
        assert_eq!(nested.value, "2");
        assert_eq!(nested.section.as_ref().unwrap().id, "nested");
        assert_eq!(nested.label, "list.1");
    }

    #[test]
    fn to_item_emits_sidecar_annotations() {
        let item = config().to_item();
        let ann = field(&item, "~annotations.nested.bool");
        assert_eq!(ann.section.as_ref().unwrap().id, ANNOTATIONS_SECTION);
        assert_eq!(ann.label, "nested.bool");
        assert_eq!(ann.value, "bool");

        let secret_ann = field(&item, "~annotations.secret");
        assert_eq!(secret_ann.value, "secret");

        // Plain strings need no annotation.
        assert!(!item.fields.iter().any(|f| f.id == "~annotations.string"));
    }

    #[test]
    fn to_item_carries_reserved_fields_and_sections() {
        let item = config().to_item();
        assert_eq!(item.value_of(FIELD_NOTES), NOTES_VALUE);
        assert!(!item.value_of(FIELD_PASSWORD).is_empty());
        let section_ids: Vec<&str> = item.sections.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(section_ids, vec![ANNOTATIONS_SECTION, "nested"]);
    }

    #[test]
    fn stored_checksum_matches_computed() {
        let item = config().to_item();
        assert_eq!(item.value_of(FIELD_PASSWORD), checksum(&item.fields));
    }

    #[test]
    fn from_item_round_trips_the_logical_tree() {
        let original = config();
        let rebuilt = Config::from_item(&original.to_item()).unwrap();

        assert_eq!(rebuilt.vault, "example");
        assert_eq!(rebuilt.name, "some:test");
        assert_eq!(
            rebuilt.tree.child_named("int").unwrap().short_type,
            ShortType::Int
        );
        assert!(rebuilt.tree.child_named("secret").unwrap().is_secret());
        let list = rebuilt
            .tree
            .child_named("nested")
            .unwrap()
            .child_named("list")
            .unwrap();
        assert!(list.is_sequence());
        assert_eq!(list.items().len(), 3);
        assert_eq!(list.child_named("2").unwrap().value, "3");
        assert_eq!(
            list.child_named("0").unwrap().path,
            vec!["nested".to_string(), "list".to_string(), "0".to_string()]
        );

        // The projection of the rebuilt tree matches the original's.
        assert_eq!(original.tree.as_map(false), rebuilt.tree.as_map(false));
    }

    #[test]
    fn from_item_ignores_unknown_annotations() {
        let mut item = config().to_item();
        item.fields.push(ItemField {
            id: "~annotations.string".into(),
            kind: FieldKind::String,
            purpose: None,
            section: Some(ItemSection::named(ANNOTATIONS_SECTION)),
            label: "string".into(),
            value: "hologram".into(),
        });
        let rebuilt = Config::from_item(&item).unwrap();
        assert_eq!(
            rebuilt.tree.child_named("string").unwrap().short_type,
            ShortType::Str
        );
    }

    #[test]
    fn item_json_uses_wire_names() {
        let item = config().to_item();
        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["category"], "PASSWORD");
        assert_eq!(json["vault"]["id"], "example");
        let first = &json["fields"][0];
        assert_eq!(first["id"], "password");
        assert_eq!(first["type"], "CONCEALED");
    }
}
