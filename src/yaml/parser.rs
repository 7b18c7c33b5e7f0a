//! Recursive-descent parser building [`Entry`] trees from scanned lines.

use super::scanner::{scan, Line};
use crate::config::entry::{Entry, EntryKind, MapPair, ShortType, Style, TAG_SECRET};
use crate::error::{Error, Result};

/// Parses a YAML document into an entry tree. The document node is folded
/// into the root entry; paths are assigned from the root.
pub fn parse(input: &str) -> Result<Entry> {
    let mut parser = Parser {
        lines: scan(input)?,
        pos: 0,
        pending: Vec::new(),
    };
    let mut root = parser.parse_root()?;
    root.set_path(Vec::new());
    Ok(root)
}

/// Resolves a plain scalar against the YAML 1.2 core schema.
pub(crate) fn resolve_plain(text: &str) -> ShortType {
    match text {
        "" | "~" | "null" | "Null" | "NULL" => return ShortType::Null,
        "true" | "True" | "TRUE" | "false" | "False" | "FALSE" => return ShortType::Bool,
        ".inf" | "+.inf" | "-.inf" | ".Inf" | "+.Inf" | "-.Inf" | ".INF" | "+.INF" | "-.INF"
        | ".nan" | ".NaN" | ".NAN" => return ShortType::Float,
        _ => {}
    }
    if is_int(text) {
        ShortType::Int
    } else if is_float(text) {
        ShortType::Float
    } else {
        ShortType::Str
    }
}

fn is_int(text: &str) -> bool {
    let t = text.strip_prefix(['-', '+']).unwrap_or(text);
    if let Some(hex) = t.strip_prefix("0x") {
        return !hex.is_empty() && hex.chars().all(|c| c.is_ascii_hexdigit());
    }
    if let Some(oct) = t.strip_prefix("0o") {
        return !oct.is_empty() && oct.chars().all(|c| ('0'..='7').contains(&c));
    }
    !t.is_empty() && t.chars().all(|c| c.is_ascii_digit())
}

fn is_float(text: &str) -> bool {
    let t = text.strip_prefix(['-', '+']).unwrap_or(text);
    if t.is_empty() {
        return false;
    }
    let (mantissa, exponent) = match t.split_once(['e', 'E']) {
        Some((m, e)) => (m, Some(e)),
        None => (t, None),
    };
    if let Some(e) = exponent {
        let e = e.strip_prefix(['-', '+']).unwrap_or(e);
        if e.is_empty() || !e.chars().all(|c| c.is_ascii_digit()) {
            return false;
        }
    }
    let (int_part, frac_part) = match mantissa.split_once('.') {
        Some((i, f)) => (i, f),
        // A bare integer mantissa is a float only with an exponent.
        None => return exponent.is_some() && mantissa.chars().all(|c| c.is_ascii_digit()),
    };
    if int_part.is_empty() && frac_part.is_empty() {
        return false;
    }
    int_part.chars().all(|c| c.is_ascii_digit()) && frac_part.chars().all(|c| c.is_ascii_digit())
}

struct Parser {
    lines: Vec<Line>,
    pos: usize,
    /// Raw comment and blank lines seen but not yet attached to a node.
    pending: Vec<String>,
}

impl Parser {
    fn parse_root(&mut self) -> Result<Entry> {
        self.collect_comments();
        if let Some(line) = self.lines.get(self.pos) {
            if line.content == "---" {
                self.pos += 1;
                self.collect_comments();
            }
        }

        let mut root = match self.lines.get(self.pos).cloned() {
            None => Entry::mapping(),
            Some(line) => {
                if starts_dash(&line.content) {
                    self.parse_sequence(line.indent)?
                } else if line.content.starts_with(['[', '{']) {
                    self.pos += 1;
                    let (entry, rest) = parse_flow_node(&line.content, &line)?;
                    if !rest.trim().is_empty() {
                        return Err(Error::parse(
                            line.number,
                            "unexpected content after flow collection",
                        ));
                    }
                    entry
                } else if looks_like_key(&line.content) {
                    self.parse_mapping(line.indent)?
                } else {
                    self.pos += 1;
                    let mut entry =
                        self.parse_inline_value(&line.content, line.indent, &line, false)?;
                    if let Some(c) = line.comment.clone() {
                        entry.comments.line = c;
                    }
                    entry
                }
            }
        };

        self.collect_comments();
        if let Some(line) = self.lines.get(self.pos) {
            return Err(Error::parse(
                line.number,
                format!("unexpected content: {:?}", line.content),
            ));
        }
        root.comments.foot = std::mem::take(&mut self.pending);

        // An empty flow document ("{}") should grow as a block mapping.
        if root.is_mapping() && root.pairs().is_empty() {
            root.style = root.style.without(Style::FLOW);
        }
        Ok(root)
    }

    /// Consumes blank and comment-only lines into the pending buffer.
    fn collect_comments(&mut self) {
        while let Some(line) = self.lines.get(self.pos) {
            if line.is_blank() {
                self.pending.push(String::new());
            } else if line.is_comment_only() {
                self.pending.push(line.raw.clone());
            } else {
                break;
            }
            self.pos += 1;
        }
    }

    /// The next content line without consuming anything.
    fn peek_content(&self) -> Option<&Line> {
        self.lines[self.pos..]
            .iter()
            .find(|l| !l.is_blank() && !l.is_comment_only())
    }

    fn parse_mapping(&mut self, indent: usize) -> Result<Entry> {
        let mut entry = Entry::mapping();
        if let Some(line) = self.peek_content() {
            entry.line = line.number;
            entry.column = line.indent + 1;
        }

        let mut pairs = Vec::new();
        loop {
            self.collect_comments();
            let Some(line) = self.lines.get(self.pos).cloned() else {
                break;
            };
            if line.indent < indent {
                break;
            }
            if line.indent > indent {
                return Err(Error::parse(line.number, "unexpected indentation"));
            }
            if line.content == "---" {
                return Err(Error::parse(line.number, "multiple documents are not supported"));
            }

            let (key_text, key_style, rest) = split_key(&line.content, line.number)?;
            let mut key = Entry::scalar(key_text);
            key.style = key_style;
            key.line = line.number;
            key.column = line.indent + 1;
            key.comments.head = std::mem::take(&mut self.pending);

            self.pos += 1;
            let mut value = if rest.is_empty() {
                self.parse_block_value(indent, line.number, true)?
            } else {
                self.parse_inline_value(&rest, indent, &line, true)?
            };

            if let Some(c) = line.comment.clone() {
                if rest.is_empty() || !value.is_scalar() && !value.style.has(Style::FLOW) {
                    key.comments.line = c;
                } else {
                    value.comments.line = c;
                }
            }
            pairs.push(MapPair { key, value });
        }

        entry.kind = EntryKind::Mapping(pairs);
        Ok(entry)
    }

    fn parse_sequence(&mut self, indent: usize) -> Result<Entry> {
        let mut entry = Entry::sequence();
        if let Some(line) = self.peek_content() {
            entry.line = line.number;
            entry.column = line.indent + 1;
        }

        let mut items = Vec::new();
        loop {
            self.collect_comments();
            let Some(line) = self.lines.get(self.pos).cloned() else {
                break;
            };
            if line.indent < indent || !starts_dash(&line.content) {
                if line.indent > indent {
                    return Err(Error::parse(line.number, "unexpected indentation"));
                }
                break;
            }
            if line.indent > indent {
                return Err(Error::parse(line.number, "unexpected indentation"));
            }

            let head = std::mem::take(&mut self.pending);
            let rest = line.content[1..].trim_start().to_string();
            let item_indent = line.indent + (line.content.len() - rest.len());

            let mut item = if rest.is_empty() {
                self.pos += 1;
                self.parse_block_value(indent, line.number, false)?
            } else if starts_dash(&rest) {
                self.lines[self.pos] = reindent(&line, item_indent, &rest);
                self.parse_sequence(item_indent)?
            } else if looks_like_key(&rest) {
                self.lines[self.pos] = reindent(&line, item_indent, &rest);
                self.parse_mapping(item_indent)?
            } else {
                self.pos += 1;
                let mut scalar = self.parse_inline_value(&rest, indent, &line, false)?;
                if let Some(c) = line.comment.clone() {
                    scalar.comments.line = c;
                }
                scalar
            };

            if !head.is_empty() {
                let mut combined = head;
                combined.extend(std::mem::take(&mut item.comments.head));
                item.comments.head = combined;
            }
            items.push(item);
        }

        entry.kind = EntryKind::Sequence(items);
        Ok(entry)
    }

    /// Parses the value introduced by a key (or dash) with nothing after it
    /// on the same line: a deeper block, a sequence at the same indent
    /// (mapping values only), or an implicit null.
    fn parse_block_value(
        &mut self,
        parent_indent: usize,
        after_line: usize,
        same_indent_seq: bool,
    ) -> Result<Entry> {
        let Some(next) = self.peek_content().cloned() else {
            return Ok(null_scalar(after_line));
        };

        if next.indent > parent_indent {
            if starts_dash(&next.content) {
                return self.parse_sequence(next.indent);
            }
            if looks_like_key(&next.content) {
                return self.parse_mapping(next.indent);
            }
            // A flow collection or scalar on its own line.
            self.collect_comments();
            let line = self.lines[self.pos].clone();
            self.pos += 1;
            let mut entry = self.parse_inline_value(&line.content, line.indent, &line, false)?;
            entry.comments.head = std::mem::take(&mut self.pending);
            if let Some(c) = line.comment.clone() {
                entry.comments.line = c;
            }
            return Ok(entry);
        }

        if same_indent_seq && next.indent == parent_indent && starts_dash(&next.content) {
            return self.parse_sequence(parent_indent);
        }

        Ok(null_scalar(after_line))
    }

    /// Parses a value that starts on the current line: tagged values, block
    /// scalars, flow collections and plain or quoted scalars.
    fn parse_inline_value(
        &mut self,
        text: &str,
        parent_indent: usize,
        line: &Line,
        same_indent_seq: bool,
    ) -> Result<Entry> {
        if text.starts_with('!') {
            let (tag, after) = split_tag(text);
            let mut value = if after.is_empty() {
                self.parse_block_value(parent_indent, line.number, same_indent_seq)?
            } else {
                self.parse_untagged_value(&after, parent_indent, line)?
            };
            if tag == TAG_SECRET && !value.is_scalar() {
                return Err(Error::parse(
                    line.number,
                    format!("{} may only tag scalar values", TAG_SECRET),
                ));
            }
            apply_tag(&mut value, &tag);
            return Ok(value);
        }
        self.parse_untagged_value(text, parent_indent, line)
    }

    fn parse_untagged_value(
        &mut self,
        text: &str,
        parent_indent: usize,
        line: &Line,
    ) -> Result<Entry> {
        match text.chars().next() {
            Some('|') | Some('>') => self.parse_block_scalar(parent_indent, text, line),
            Some('[') | Some('{') => {
                let (entry, rest) = parse_flow_node(text, line)?;
                if !rest.trim().is_empty() {
                    return Err(Error::parse(
                        line.number,
                        "unexpected content after flow collection",
                    ));
                }
                Ok(entry)
            }
            Some('"') => {
                let (value, rest) = consume_double_quoted(text, line.number)?;
                if !rest.trim().is_empty() {
                    return Err(Error::parse(
                        line.number,
                        "unexpected content after quoted scalar",
                    ));
                }
                let mut entry = Entry::scalar(value);
                entry.style = Style::DOUBLE_QUOTED;
                entry.line = line.number;
                entry.column = line.indent + 1;
                Ok(entry)
            }
            Some('\'') => {
                let (value, rest) = consume_single_quoted(text, line.number)?;
                if !rest.trim().is_empty() {
                    return Err(Error::parse(
                        line.number,
                        "unexpected content after quoted scalar",
                    ));
                }
                let mut entry = Entry::scalar(value);
                entry.style = Style::SINGLE_QUOTED;
                entry.line = line.number;
                entry.column = line.indent + 1;
                Ok(entry)
            }
            Some('&') | Some('*') => Err(Error::parse(
                line.number,
                "anchors and aliases are not supported",
            )),
            _ => {
                if text.contains(": ") {
                    return Err(Error::parse(
                        line.number,
                        "mapping values are not allowed in this context",
                    ));
                }
                let mut entry = Entry::scalar(text);
                entry.short_type = resolve_plain(text);
                entry.line = line.number;
                entry.column = line.indent + 1;
                Ok(entry)
            }
        }
    }

    fn parse_block_scalar(
        &mut self,
        parent_indent: usize,
        header: &str,
        line: &Line,
    ) -> Result<Entry> {
        let folded = header.starts_with('>');
        let mut strip = false;
        let mut explicit_indent = None;
        for c in header[1..].chars() {
            match c {
                '-' => strip = true,
                '+' => {}
                '1'..='9' => explicit_indent = Some(c as usize - '0' as usize),
                _ => {
                    return Err(Error::parse(
                        line.number,
                        format!("invalid block scalar header {:?}", header),
                    ))
                }
            }
        }

        let mut block_indent = explicit_indent.map(|d| parent_indent + d);
        let mut body: Vec<String> = Vec::new();
        while let Some(l) = self.lines.get(self.pos) {
            if l.raw.trim().is_empty() {
                body.push(String::new());
                self.pos += 1;
                continue;
            }
            let bi = match block_indent {
                Some(bi) => bi,
                None => {
                    if l.indent <= parent_indent {
                        break;
                    }
                    block_indent = Some(l.indent);
                    l.indent
                }
            };
            if l.indent < bi {
                break;
            }
            body.push(l.raw[bi..].to_string());
            self.pos += 1;
        }

        // Trailing blanks belong to whatever comes after the block.
        while body.last().is_some_and(|l| l.is_empty()) {
            body.pop();
            self.pos -= 1;
        }

        let mut value = if folded {
            fold_lines(&body)
        } else {
            body.join("\n")
        };
        if !strip && !value.is_empty() {
            value.push('\n');
        }

        let mut entry = Entry::scalar(value);
        entry.style = if folded { Style::FOLDED } else { Style::LITERAL };
        entry.line = line.number;
        entry.column = line.indent + 1;
        Ok(entry)
    }
}

fn fold_lines(body: &[String]) -> String {
    let mut out = String::new();
    let mut in_paragraph = false;
    for line in body {
        if line.is_empty() {
            out.push('\n');
            in_paragraph = false;
        } else {
            if in_paragraph {
                out.push(' ');
            }
            out.push_str(line);
            in_paragraph = true;
        }
    }
    out
}

fn null_scalar(line: usize) -> Entry {
    let mut entry = Entry::scalar("");
    entry.short_type = ShortType::Null;
    entry.line = line;
    entry
}

fn starts_dash(content: &str) -> bool {
    content == "-" || content.starts_with("- ")
}

fn looks_like_key(content: &str) -> bool {
    split_key(content, 0).is_ok()
}

fn reindent(line: &Line, indent: usize, content: &str) -> Line {
    Line {
        number: line.number,
        raw: line.raw.clone(),
        indent,
        content: content.to_string(),
        comment: line.comment.clone(),
    }
}

fn apply_tag(entry: &mut Entry, tag: &str) {
    entry.tag = tag.to_string();
    entry.style = entry.style.with(Style::TAGGED);
    match tag {
        "!!str" => entry.short_type = ShortType::Str,
        "!!int" => entry.short_type = ShortType::Int,
        "!!float" => entry.short_type = ShortType::Float,
        "!!bool" => entry.short_type = ShortType::Bool,
        "!!null" => entry.short_type = ShortType::Null,
        _ => {}
    }
}

fn split_tag(text: &str) -> (String, String) {
    match text.split_once(char::is_whitespace) {
        Some((tag, rest)) => (tag.to_string(), rest.trim_start().to_string()),
        None => (text.to_string(), String::new()),
    }
}

/// Splits a mapping line into key text, key style and whatever follows the
/// colon.
fn split_key(content: &str, line_no: usize) -> Result<(String, Style, String)> {
    if content.starts_with('"') {
        let (key, rest) = consume_double_quoted(content, line_no)?;
        let rest = rest.trim_start();
        let Some(after) = rest.strip_prefix(':') else {
            return Err(Error::parse(line_no, "expected ':' after quoted key"));
        };
        return Ok((key, Style::DOUBLE_QUOTED, after.trim_start().to_string()));
    }
    if content.starts_with('\'') {
        let (key, rest) = consume_single_quoted(content, line_no)?;
        let rest = rest.trim_start();
        let Some(after) = rest.strip_prefix(':') else {
            return Err(Error::parse(line_no, "expected ':' after quoted key"));
        };
        return Ok((key, Style::SINGLE_QUOTED, after.trim_start().to_string()));
    }

    let bytes = content.as_bytes();
    for (i, b) in bytes.iter().enumerate() {
        if *b == b':' && (i + 1 == bytes.len() || bytes[i + 1] == b' ') {
            let key = content[..i].trim_end();
            if key.is_empty() {
                return Err(Error::parse(line_no, "empty mapping key"));
            }
            return Ok((
                key.to_string(),
                Style::PLAIN,
                content[i + 1..].trim_start().to_string(),
            ));
        }
    }
    Err(Error::parse(line_no, "expected a mapping key"))
}

fn consume_double_quoted(text: &str, line_no: usize) -> Result<(String, &str)> {
    debug_assert!(text.starts_with('"'));
    let mut out = String::new();
    let mut chars = text.char_indices().skip(1);
    while let Some((i, c)) = chars.next() {
        match c {
            '"' => return Ok((out, &text[i + 1..])),
            '\\' => match chars.next() {
                Some((_, 'n')) => out.push('\n'),
                Some((_, 't')) => out.push('\t'),
                Some((_, 'r')) => out.push('\r'),
                Some((_, '0')) => out.push('\0'),
                Some((_, '\\')) => out.push('\\'),
                Some((_, '"')) => out.push('"'),
                Some((_, 'u')) => {
                    let start = i + 2;
                    let hex = text.get(start..start + 4).ok_or_else(|| {
                        Error::parse(line_no, "truncated \\u escape in double-quoted scalar")
                    })?;
                    let code = u32::from_str_radix(hex, 16).map_err(|_| {
                        Error::parse(line_no, "invalid \\u escape in double-quoted scalar")
                    })?;
                    out.push(char::from_u32(code).ok_or_else(|| {
                        Error::parse(line_no, "invalid \\u escape in double-quoted scalar")
                    })?);
                    for _ in 0..4 {
                        chars.next();
                    }
                }
                Some((_, other)) => {
                    return Err(Error::parse(
                        line_no,
                        format!("unsupported escape \\{} in double-quoted scalar", other),
                    ))
                }
                None => break,
            },
            _ => out.push(c),
        }
    }
    Err(Error::parse(line_no, "unterminated double-quoted scalar"))
}

fn consume_single_quoted(text: &str, line_no: usize) -> Result<(String, &str)> {
    debug_assert!(text.starts_with('\''));
    let mut out = String::new();
    let mut chars = text.char_indices().skip(1).peekable();
    while let Some((i, c)) = chars.next() {
        if c == '\'' {
            if matches!(chars.peek(), Some((_, '\''))) {
                out.push('\'');
                chars.next();
            } else {
                return Ok((out, &text[i + 1..]));
            }
        } else {
            out.push(c);
        }
    }
    Err(Error::parse(line_no, "unterminated single-quoted scalar"))
}

/// Parses one node of a single-line flow collection, returning the node and
/// the unconsumed remainder.
fn parse_flow_node<'a>(text: &'a str, line: &Line) -> Result<(Entry, &'a str)> {
    let t = text.trim_start();
    let line_no = line.number;

    if let Some(rest) = t.strip_prefix('[') {
        let mut items = Vec::new();
        let mut rest = rest;
        loop {
            rest = rest.trim_start();
            if rest.is_empty() {
                return Err(Error::parse(line_no, "flow sequence must close on one line"));
            }
            if let Some(after) = rest.strip_prefix(']') {
                rest = after;
                break;
            }
            let (item, r) = parse_flow_node(rest, line)?;
            items.push(item);
            rest = r.trim_start();
            if let Some(after) = rest.strip_prefix(',') {
                rest = after;
            } else if !rest.starts_with(']') {
                return Err(Error::parse(line_no, "expected ',' or ']' in flow sequence"));
            }
        }
        let mut entry = Entry::sequence();
        entry.kind = EntryKind::Sequence(items);
        entry.style = Style::FLOW;
        entry.line = line_no;
        return Ok((entry, rest));
    }

    if let Some(rest) = t.strip_prefix('{') {
        let mut pairs = Vec::new();
        let mut rest = rest;
        loop {
            rest = rest.trim_start();
            if rest.is_empty() {
                return Err(Error::parse(line_no, "flow mapping must close on one line"));
            }
            if let Some(after) = rest.strip_prefix('}') {
                rest = after;
                break;
            }
            let (key, r) = parse_flow_key(rest, line_no)?;
            rest = r.trim_start();
            let Some(after_colon) = rest.strip_prefix(':') else {
                return Err(Error::parse(line_no, "expected ':' in flow mapping"));
            };
            let (value, r) = parse_flow_node(after_colon, line)?;
            pairs.push(MapPair { key, value });
            rest = r.trim_start();
            if let Some(after) = rest.strip_prefix(',') {
                rest = after;
            } else if !rest.starts_with('}') {
                return Err(Error::parse(line_no, "expected ',' or '}' in flow mapping"));
            }
        }
        let mut entry = Entry::mapping();
        entry.kind = EntryKind::Mapping(pairs);
        entry.style = Style::FLOW;
        entry.line = line_no;
        return Ok((entry, rest));
    }

    if t.starts_with('!') {
        let (tag, after) = match t.split_once(char::is_whitespace) {
            Some((tag, rest)) => (tag.to_string(), rest),
            None => return Err(Error::parse(line_no, "tag without value in flow collection")),
        };
        let (mut entry, rest) = parse_flow_node(after, line)?;
        if tag == TAG_SECRET && !entry.is_scalar() {
            return Err(Error::parse(
                line_no,
                format!("{} may only tag scalar values", TAG_SECRET),
            ));
        }
        apply_tag(&mut entry, &tag);
        return Ok((entry, rest));
    }

    if t.starts_with('"') {
        let (value, rest) = consume_double_quoted(t, line_no)?;
        let mut entry = Entry::scalar(value);
        entry.style = Style::DOUBLE_QUOTED;
        entry.line = line_no;
        return Ok((entry, rest));
    }
    if t.starts_with('\'') {
        let (value, rest) = consume_single_quoted(t, line_no)?;
        let mut entry = Entry::scalar(value);
        entry.style = Style::SINGLE_QUOTED;
        entry.line = line_no;
        return Ok((entry, rest));
    }

    let end = t
        .char_indices()
        .find(|(_, c)| matches!(c, ',' | ']' | '}'))
        .map(|(i, _)| i)
        .unwrap_or(t.len());
    let raw = t[..end].trim_end();
    let mut entry = Entry::scalar(raw);
    entry.short_type = resolve_plain(raw);
    entry.line = line_no;
    Ok((entry, &t[end..]))
}

fn parse_flow_key(text: &str, line_no: usize) -> Result<(Entry, &str)> {
    let t = text.trim_start();
    if t.starts_with('"') {
        let (key, rest) = consume_double_quoted(t, line_no)?;
        let mut entry = Entry::scalar(key);
        entry.style = Style::DOUBLE_QUOTED;
        return Ok((entry, rest));
    }
    if t.starts_with('\'') {
        let (key, rest) = consume_single_quoted(t, line_no)?;
        let mut entry = Entry::scalar(key);
        entry.style = Style::SINGLE_QUOTED;
        return Ok((entry, rest));
    }
    let end = t
        .char_indices()
        .find(|(_, c)| matches!(c, ':' | ',' | '}'))
        .map(|(i, _)| i)
        .unwrap_or(t.len());
    let key = t[..end].trim_end();
    if key.is_empty() {
        return Err(Error::parse(line_no, "empty key in flow mapping"));
    }
    Ok((Entry::scalar(key), &t[end..]))
}
