//! Content checksum over the logical state of an item's data fields.

use blake2::digest::consts::U32;
use blake2::{Blake2b, Digest};

use crate::config::item::{ItemField, ANNOTATIONS_SECTION, FIELD_NOTES, FIELD_PASSWORD};

type Blake2b256 = Blake2b<U32>;

/// Hashes the data fields of an item: one `label+value` line per field (the
/// label qualified by its section id), lexicographically sorted and
/// concatenated, digested with BLAKE2b-256. Reserved fields and the
/// annotation sidecar never participate, so the result is stable across
/// field reordering and annotation edits.
pub fn checksum(fields: &[ItemField]) -> String {
    let mut lines: Vec<String> = Vec::new();
    for field in fields {
        if field.id == FIELD_PASSWORD || field.id == FIELD_NOTES {
            continue;
        }
        if let Some(section) = &field.section {
            if section.id == ANNOTATIONS_SECTION {
                continue;
            }
        }

        let mut line = String::new();
        if let Some(section) = &field.section {
            if !section.id.is_empty() {
                line.push_str(&section.id);
                line.push('.');
            }
        }
        line.push_str(&field.label);
        line.push_str(&field.value);
        lines.push(line);
    }
    lines.sort();

    let mut hasher = Blake2b256::new();
    hasher.update(lines.concat().as_bytes());
    hex::encode(hasher.finalize())
}
