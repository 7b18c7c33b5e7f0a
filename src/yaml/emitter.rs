//! Indent-2 YAML writer.
//!
//! Serialization is driven by an [`OutputOptions`] value carried down the
//! tree walk, so nested emissions never observe ambient state. With default
//! options the writer reproduces the parsed source byte for byte for the
//! supported YAML subset.

use super::parser::resolve_plain;
use crate::config::entry::{Entry, EntryKind, ShortType, Style};
use crate::config::output::OutputOptions;

/// Serializes an entry tree as YAML.
pub fn emit(entry: &Entry, opts: OutputOptions) -> String {
    let ctx = EmitContext { opts };
    let mut out = String::new();
    match &entry.kind {
        EntryKind::Mapping(_) => ctx.write_mapping(&mut out, entry, 0, true),
        EntryKind::Sequence(_) => ctx.write_sequence(&mut out, entry, 0),
        EntryKind::Scalar => ctx.write_scalar_document(&mut out, entry),
    }
    if !ctx.no_comments() {
        for line in &entry.comments.foot {
            out.push_str(line);
            out.push('\n');
        }
    }
    out
}

struct EmitContext {
    opts: OutputOptions,
}

impl EmitContext {
    fn no_comments(&self) -> bool {
        self.opts.has(OutputOptions::NO_COMMENTS)
    }

    fn standard(&self) -> bool {
        self.opts.has(OutputOptions::STANDARD_YAML)
    }

    fn sorted(&self) -> bool {
        self.opts.has(OutputOptions::SORTED)
    }

    fn redacted(&self) -> bool {
        self.opts.has(OutputOptions::REDACTED)
    }

    fn write_head(&self, out: &mut String, entry: &Entry) {
        if self.no_comments() {
            return;
        }
        for line in &entry.comments.head {
            out.push_str(line);
            out.push('\n');
        }
    }

    fn write_mapping(&self, out: &mut String, entry: &Entry, indent: usize, top: bool) {
        for pair in entry.ordered_pairs(self.sorted()) {
            if top && self.opts.has(OutputOptions::NO_CONFIG) && pair.value.is_meta_config() {
                continue;
            }
            self.write_pair(out, &pair.key, &pair.value, indent, false);
        }
    }

    fn write_pair(&self, out: &mut String, key: &Entry, value: &Entry, indent: usize, omit_indent: bool) {
        if !omit_indent {
            self.write_head(out, key);
            self.write_head(out, value);
            push_indent(out, indent);
        }
        out.push_str(&self.key_token(key));
        out.push(':');

        let comment = if self.no_comments() {
            ""
        } else if !value.comments.line.is_empty() {
            &value.comments.line
        } else {
            &key.comments.line
        };
        self.write_value(out, value, indent, comment);
    }

    /// Writes everything after a `:` or `-`, including the trailing newline.
    fn write_value(&self, out: &mut String, value: &Entry, indent: usize, comment: &str) {
        match &value.kind {
            EntryKind::Scalar => self.write_scalar_value(out, value, indent, comment),
            EntryKind::Mapping(pairs) => {
                if pairs.is_empty() {
                    if !value.tag.is_empty() {
                        out.push(' ');
                        out.push_str(&value.tag);
                    }
                    out.push_str(" {}");
                    push_comment(out, comment);
                    out.push('\n');
                } else if value.style.has(Style::FLOW) && !self.standard() {
                    out.push(' ');
                    out.push_str(&self.flow_token(value));
                    push_comment(out, comment);
                    out.push('\n');
                } else {
                    if !value.tag.is_empty() {
                        out.push(' ');
                        out.push_str(&value.tag);
                    }
                    push_comment(out, comment);
                    out.push('\n');
                    self.write_mapping(out, value, indent + 2, false);
                }
            }
            EntryKind::Sequence(items) => {
                if items.is_empty() {
                    if !value.tag.is_empty() {
                        out.push(' ');
                        out.push_str(&value.tag);
                    }
                    out.push_str(" []");
                    push_comment(out, comment);
                    out.push('\n');
                } else if value.style.has(Style::FLOW) && !self.standard() {
                    out.push(' ');
                    out.push_str(&self.flow_token(value));
                    push_comment(out, comment);
                    out.push('\n');
                } else {
                    if !value.tag.is_empty() {
                        out.push(' ');
                        out.push_str(&value.tag);
                    }
                    push_comment(out, comment);
                    out.push('\n');
                    self.write_sequence(out, value, indent + 2);
                }
            }
        }
    }

    fn write_scalar_value(&self, out: &mut String, value: &Entry, indent: usize, comment: &str) {
        let text = self.scalar_text(value);
        let style = self.effective_scalar_style(value, &text);

        if !text.is_empty() && (style.has(Style::LITERAL) || style.has(Style::FOLDED)) {
            out.push(' ');
            if !value.tag.is_empty() {
                out.push_str(&value.tag);
                out.push(' ');
            }
            self.write_block_scalar(out, &text, style, indent, comment);
            return;
        }

        let token = self.scalar_token(value, &text, style);
        if !token.is_empty() {
            out.push(' ');
            out.push_str(&token);
        }
        push_comment(out, comment);
        out.push('\n');
    }

    fn write_block_scalar(
        &self,
        out: &mut String,
        text: &str,
        style: Style,
        indent: usize,
        comment: &str,
    ) {
        let folded = style.has(Style::FOLDED) && !text.trim_end_matches('\n').contains('\n');
        let (header, body) = match text.strip_suffix('\n') {
            Some(body) => (if folded { ">" } else { "|" }, body),
            None => (if folded { ">-" } else { "|-" }, text),
        };
        out.push_str(header);
        push_comment(out, comment);
        out.push('\n');
        for line in body.split('\n') {
            if line.is_empty() {
                out.push('\n');
            } else {
                push_indent(out, indent + 2);
                out.push_str(line);
                out.push('\n');
            }
        }
    }

    fn write_sequence(&self, out: &mut String, entry: &Entry, indent: usize) {
        for item in entry.items() {
            self.write_head(out, item);
            push_indent(out, indent);
            out.push('-');

            let compact = item.is_mapping()
                && !item.pairs().is_empty()
                && item.tag.is_empty()
                && !(item.style.has(Style::FLOW) && !self.standard());
            if compact {
                out.push(' ');
                let pairs = item.ordered_pairs(self.sorted());
                for (idx, pair) in pairs.iter().enumerate() {
                    self.write_pair(out, &pair.key, &pair.value, indent + 2, idx == 0);
                }
            } else {
                let comment = if self.no_comments() { "" } else { &item.comments.line };
                self.write_value(out, item, indent, comment);
            }
        }
    }

    fn write_scalar_document(&self, out: &mut String, entry: &Entry) {
        let text = self.scalar_text(entry);
        let style = self.effective_scalar_style(entry, &text);
        if !text.is_empty() && (style.has(Style::LITERAL) || style.has(Style::FOLDED)) {
            if !entry.tag.is_empty() {
                out.push_str(&entry.tag);
                out.push(' ');
            }
            // Block scalar at column zero; body indented by two.
            let mut header = String::new();
            self.write_block_scalar(&mut header, &text, style, 0, "");
            out.push_str(&header);
            return;
        }
        let token = self.scalar_token(entry, &text, style);
        if token.is_empty() {
            out.push_str("null");
        } else {
            out.push_str(&token);
        }
        out.push('\n');
    }

    fn scalar_text(&self, entry: &Entry) -> String {
        if self.redacted() && entry.is_secret() {
            String::new()
        } else {
            entry.value.clone()
        }
    }

    fn effective_scalar_style(&self, entry: &Entry, text: &str) -> Style {
        if self.standard() {
            return if text.contains('\n') {
                Style::LITERAL
            } else {
                Style::PLAIN
            };
        }
        if text.contains('\n')
            && !entry.style.has(Style::LITERAL)
            && !entry.style.has(Style::FOLDED)
            && !entry.style.has(Style::DOUBLE_QUOTED)
        {
            return Style::LITERAL;
        }
        entry.style
    }

    fn scalar_token(&self, entry: &Entry, text: &str, style: Style) -> String {
        let body = if style.has(Style::DOUBLE_QUOTED) {
            quote_double(text)
        } else if style.has(Style::SINGLE_QUOTED) {
            if text.chars().any(char::is_control) {
                quote_double(text)
            } else {
                quote_single(text)
            }
        } else if text.is_empty() {
            if entry.tag.is_empty() && entry.short_type == ShortType::Null {
                String::new()
            } else {
                "\"\"".to_string()
            }
        } else if needs_quote(text, Some(entry.short_type)) {
            quote_double(text)
        } else {
            text.to_string()
        };

        if entry.tag.is_empty() {
            body
        } else if body.is_empty() {
            entry.tag.clone()
        } else {
            format!("{} {}", entry.tag, body)
        }
    }

    fn key_token(&self, key: &Entry) -> String {
        if key.style.has(Style::DOUBLE_QUOTED) {
            quote_double(&key.value)
        } else if key.style.has(Style::SINGLE_QUOTED) {
            quote_single(&key.value)
        } else if key.value.is_empty() || needs_quote(&key.value, None) {
            quote_double(&key.value)
        } else {
            key.value.clone()
        }
    }

    fn flow_token(&self, entry: &Entry) -> String {
        let body = match &entry.kind {
            EntryKind::Scalar => {
                let text = self.scalar_text(entry);
                let style = if text.contains('\n') {
                    Style::DOUBLE_QUOTED
                } else {
                    entry.style
                };
                return self.scalar_token(entry, &text, style);
            }
            EntryKind::Sequence(items) => {
                let inner: Vec<String> = items.iter().map(|i| self.flow_token(i)).collect();
                format!("[{}]", inner.join(", "))
            }
            EntryKind::Mapping(_) => {
                let inner: Vec<String> = entry
                    .ordered_pairs(self.sorted())
                    .iter()
                    .map(|p| format!("{}: {}", self.key_token(&p.key), self.flow_token(&p.value)))
                    .collect();
                format!("{{{}}}", inner.join(", "))
            }
        };
        if entry.tag.is_empty() {
            body
        } else {
            format!("{} {}", entry.tag, body)
        }
    }
}

fn push_indent(out: &mut String, indent: usize) {
    for _ in 0..indent {
        out.push(' ');
    }
}

fn push_comment(out: &mut String, comment: &str) {
    if !comment.is_empty() {
        out.push(' ');
        out.push_str(comment);
    }
}

/// Whether a plain rendition of `text` would change meaning or structure.
/// `short_type` is checked so a string that looks like a number stays quoted;
/// pass `None` for mapping keys, which always read back as strings.
fn needs_quote(text: &str, short_type: Option<ShortType>) -> bool {
    if let Some(st) = short_type {
        if st == ShortType::Str && resolve_plain(text) != ShortType::Str {
            return true;
        }
    }
    let mut chars = text.chars();
    match chars.next() {
        None => return true,
        Some(first) => {
            let second = chars.next();
            match first {
                '-' | '?' | ':' => {
                    if second.is_none() || second == Some(' ') {
                        return true;
                    }
                }
                '#' | '&' | '*' | '!' | '|' | '>' | '\'' | '"' | '%' | '@' | '`' | '[' | ']'
                | '{' | '}' | ',' | ' ' => return true,
                _ => {}
            }
        }
    }
    text.contains(": ")
        || text.ends_with(':')
        || text.contains(" #")
        || text.contains('\t')
        || text.trim() != text
}

fn quote_double(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('"');
    for c in text.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            c if (c as u32) < 0x20 => out.push_str(&format!("\\u{:04x}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

fn quote_single(text: &str) -> String {
    format!("'{}'", text.replace('\'', "''"))
}
