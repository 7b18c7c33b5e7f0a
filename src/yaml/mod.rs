//! Comment-preserving YAML document codec.
//!
//! No published YAML crate keeps comments, styles and explicit tags through
//! a DOM, and this tool's whole job is to hand files back with those intact.
//! This module implements a block-style YAML 1.2 subset that is lossless for
//! the constructs configuration files use: nested mappings and sequences,
//! single-line flow collections, plain and quoted scalars, literal and
//! folded blocks, explicit tags and comments. Anchors, aliases, directives
//! and multi-document streams are rejected with a parse error naming the
//! offending line.

mod emitter;
mod parser;
mod scanner;

pub use emitter::emit;
pub use parser::parse;

pub(crate) use parser::resolve_plain;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::output::OutputOptions;

    // Documents that must survive a parse/emit cycle byte for byte.
    const ROUND_TRIPS: &[&str] = &[
        "int: 1\n",
        "a: 1\nb:\n  c: pato\n  d: [1, 2]\n",
        "# top\nkey: value # side\n\nother: 1\n",
        "secret: !!secret very secret\n",
        "_config: !!joao\n  vault: example\n  name: some:test\n",
        "list:\n  - one\n  - two\n  - !!secret three\n",
        "quoted: \"a: b\"\nsingle: 'x'\n",
        "empty_map: {}\nempty_list: []\n",
        "block: |\n  line one\n  line two\nafter: 1\n",
        "chomped: |-\n  no trailing newline\n",
        "nulls:\n  a:\n  b: ~\n",
        "seq_of_maps:\n  - host: a\n    port: 1\n  - host: b\n",
        "weird keys:\n  \"with: colon\": 1\n",
    ];

    #[test]
    fn parse_emit_is_identity() {
        for doc in ROUND_TRIPS {
            let tree = parse(doc).unwrap();
            assert_eq!(&emit(&tree, OutputOptions::default()), doc, "for {:?}", doc);
        }
    }

    #[test]
    fn emit_parse_is_stable_under_modes() {
        // Canonical output must itself parse and re-emit unchanged.
        let doc = "b: 2\n# note\na: !!secret hush\nnested:\n  z: [3, 4]\n";
        let tree = parse(doc).unwrap();
        for opts in [
            OutputOptions::diff_canonical(),
            OutputOptions::SORTED | OutputOptions::NO_COMMENTS,
            OutputOptions::REDACTED,
        ] {
            let once = emit(&tree, opts);
            let reparsed = parse(&once).unwrap();
            assert_eq!(emit(&reparsed, OutputOptions::default()), once);
        }
    }
}
