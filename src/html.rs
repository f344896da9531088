//! HTML fragment parsing into the [`Document`] arena, and serialization back out.
//!
//! The parser is forgiving in the way the renderers need: unknown closing tags are dropped,
//! unclosed elements are closed at the end of the fragment, comments are skipped.

use crate::dom::{Document, NodeId, NodeKind};
use crate::escape::{escape_attr, escape_html, unescape_html};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Tag {
    Opening {
        name: String,
        attrs: Vec<(String, String)>,
        self_closing: bool,
    },
    Closing {
        name: String,
    },
    Comment,
}

fn is_ascii_tag_name_char(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'-'
}

pub fn is_void_html_tag(name: &str) -> bool {
    matches!(
        name,
        "area"
            | "base"
            | "br"
            | "col"
            | "embed"
            | "hr"
            | "img"
            | "input"
            | "link"
            | "meta"
            | "param"
            | "source"
            | "track"
            | "wbr"
    )
}

fn skip_ws(bytes: &[u8], mut i: usize) -> usize {
    while i < bytes.len() && bytes[i].is_ascii_whitespace() {
        i += 1;
    }
    i
}

/// Parse attributes from `i` up to the closing `>`. Returns the attributes, whether the tag
/// ends in `/>`, and the byte offset just past `>`.
fn parse_attrs(s: &str, mut i: usize) -> Option<(Vec<(String, String)>, bool, usize)> {
    let bytes = s.as_bytes();
    let mut attrs: Vec<(String, String)> = Vec::new();
    loop {
        i = skip_ws(bytes, i);
        match bytes.get(i)? {
            b'>' => return Some((attrs, false, i + 1)),
            b'/' if bytes.get(i + 1) == Some(&b'>') => return Some((attrs, true, i + 2)),
            b'/' => {
                i += 1;
                continue;
            }
            _ => {}
        }
        let name_start = i;
        while i < bytes.len() && !matches!(bytes[i], b' ' | b'\t' | b'\n' | b'\r' | b'=' | b'>' | b'/')
        {
            i += 1;
        }
        let name = s[name_start..i].to_ascii_lowercase();
        i = skip_ws(bytes, i);
        let mut value = String::new();
        if bytes.get(i) == Some(&b'=') {
            i = skip_ws(bytes, i + 1);
            match bytes.get(i)? {
                q @ (b'"' | b'\'') => {
                    let close = s[i + 1..].find(*q as char)? + i + 1;
                    value = unescape_html(&s[i + 1..close]).into_owned();
                    i = close + 1;
                }
                _ => {
                    let start = i;
                    while i < bytes.len() && !bytes[i].is_ascii_whitespace() && bytes[i] != b'>' {
                        i += 1;
                    }
                    value = unescape_html(&s[start..i]).into_owned();
                }
            }
        }
        if !name.is_empty() && !attrs.iter().any(|(k, _)| *k == name) {
            attrs.push((name, value));
        }
    }
}

/// Parse a tag starting at the `<` at byte offset `lt`. Returns the tag and the offset after it.
fn parse_tag_at(s: &str, lt: usize) -> Option<(Tag, usize)> {
    let bytes = s.as_bytes();
    if bytes.get(lt) != Some(&b'<') {
        return None;
    }
    if s[lt..].starts_with("<!--") {
        let end = s[lt + 4..]
            .find("-->")
            .map(|p| lt + 4 + p + 3)
            .unwrap_or(s.len());
        return Some((Tag::Comment, end));
    }
    let mut i = lt + 1;
    let is_closing = bytes.get(i) == Some(&b'/');
    if is_closing {
        i += 1;
    }
    if !bytes.get(i)?.is_ascii_alphabetic() {
        return None;
    }
    let name_start = i;
    while i < bytes.len() && is_ascii_tag_name_char(bytes[i]) {
        i += 1;
    }
    let name = s[name_start..i].to_ascii_lowercase();
    let next = bytes.get(i).copied().unwrap_or(b'\0');
    if !(next.is_ascii_whitespace() || next == b'>' || next == b'/') {
        return None;
    }
    if is_closing {
        let close = s[i..].find('>')? + i;
        return Some((Tag::Closing { name }, close + 1));
    }
    let (attrs, slash, end) = parse_attrs(s, i)?;
    let self_closing = slash || is_void_html_tag(&name);
    Some((
        Tag::Opening {
            name,
            attrs,
            self_closing,
        },
        end,
    ))
}

/// Parse `markup` into detached nodes owned by `doc`, returning the top-level ones in order.
pub fn parse_fragment(doc: &mut Document, markup: &str) -> Vec<NodeId> {
    let mut top: Vec<NodeId> = Vec::new();
    let mut stack: Vec<(String, NodeId)> = Vec::new();
    let mut text_start = 0usize;
    let mut i = 0usize;

    fn attach(doc: &mut Document, top: &mut Vec<NodeId>, stack: &[(String, NodeId)], node: NodeId) {
        match stack.last() {
            // Fresh nodes under a fresh parent cannot form a cycle.
            Some(&(_, parent)) => {
                let _ = doc.append_child(parent, node);
            }
            None => top.push(node),
        }
    }

    fn flush_text(
        doc: &mut Document,
        top: &mut Vec<NodeId>,
        stack: &[(String, NodeId)],
        raw: &str,
    ) {
        if raw.is_empty() {
            return;
        }
        let node = doc.create_text(&unescape_html(raw));
        attach(doc, top, stack, node);
    }

    while let Some(rel) = markup[i..].find('<') {
        let lt = i + rel;
        let Some((tag, end)) = parse_tag_at(markup, lt) else {
            i = lt + 1;
            continue;
        };
        flush_text(doc, &mut top, &stack, &markup[text_start..lt]);
        match tag {
            Tag::Comment => {}
            Tag::Opening {
                name,
                attrs,
                self_closing,
            } => {
                let node = doc.create_element(&name);
                let _ = doc.replace_attrs(node, attrs);
                attach(doc, &mut top, &stack, node);
                if !self_closing {
                    stack.push((name, node));
                }
            }
            Tag::Closing { name } => {
                if let Some(pos) = stack.iter().rposition(|(n, _)| *n == name) {
                    stack.truncate(pos);
                }
            }
        }
        i = end;
        text_start = end;
    }
    flush_text(doc, &mut top, &stack, &markup[text_start..]);
    top
}

/// Append the serialization of `id` (and its subtree) to `out`.
pub fn serialize_into(doc: &Document, id: NodeId, out: &mut String) {
    match doc.kind(id) {
        None => {}
        Some(NodeKind::Text(t)) => out.push_str(&escape_html(t)),
        Some(NodeKind::Document) => {
            for &child in doc.children(id) {
                serialize_into(doc, child, out);
            }
        }
        Some(NodeKind::Element { tag, attrs }) => {
            out.push('<');
            out.push_str(tag);
            for (k, v) in attrs {
                out.push(' ');
                out.push_str(k);
                out.push_str("=\"");
                out.push_str(&escape_attr(v));
                out.push('"');
            }
            out.push('>');
            if is_void_html_tag(tag) {
                return;
            }
            for &child in doc.children(id) {
                serialize_into(doc, child, out);
            }
            out.push_str("</");
            out.push_str(tag);
            out.push('>');
        }
    }
}
