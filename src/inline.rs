use crate::escape::escape_html;

enum Segment<'a> {
    Text(&'a str),
    Code(&'a str),
}

/// Split on single-line backtick spans. An unmatched backtick stays literal text.
fn split_code_spans(text: &str) -> Vec<Segment<'_>> {
    let mut out = Vec::new();
    let mut rest = text;
    let mut pending_start = 0usize;
    let mut cursor = 0usize;
    while let Some(open_rel) = rest.find('`') {
        let open = cursor + open_rel;
        let after = &text[open + 1..];
        let close_rel = after
            .find(['`', '\n'])
            .filter(|&i| after.as_bytes()[i] == b'`' && i > 0);
        match close_rel {
            Some(close_rel) => {
                if pending_start < open {
                    out.push(Segment::Text(&text[pending_start..open]));
                }
                out.push(Segment::Code(&after[..close_rel]));
                cursor = open + 1 + close_rel + 1;
                pending_start = cursor;
            }
            None => {
                cursor = open + 1;
            }
        }
        rest = &text[cursor..];
    }
    if pending_start < text.len() {
        out.push(Segment::Text(&text[pending_start..]));
    }
    out
}

fn wrap_strong(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 16);
    let mut rest = s;
    while let Some(open) = rest.find("**") {
        let after = &rest[open + 2..];
        let Some(close) = after.find("**") else {
            break;
        };
        let inner = &after[..close];
        if inner.trim().is_empty() {
            out.push_str(&rest[..open + 2]);
            rest = after;
            continue;
        }
        out.push_str(&rest[..open]);
        out.push_str("<strong>");
        out.push_str(inner);
        out.push_str("</strong>");
        rest = &after[close + 2..];
    }
    out.push_str(rest);
    out
}

/// Emphasis may not straddle a `<strong>` boundary.
fn strong_balanced(inner: &str) -> bool {
    inner.matches("<strong>").count() == inner.matches("</strong>").count()
        && inner.find("</strong>") >= inner.find("<strong>")
}

fn wrap_emphasis(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 16);
    let mut rest = s;
    while let Some(open) = rest.find('*') {
        let after = &rest[open + 1..];
        let close = after.find(['*', '\n']).filter(|&i| after.as_bytes()[i] == b'*');
        let inner = close.map(|i| &after[..i]);
        match inner {
            Some(inner)
                if !inner.is_empty()
                    && !inner.starts_with(char::is_whitespace)
                    && !inner.ends_with(char::is_whitespace)
                    && strong_balanced(inner) =>
            {
                out.push_str(&rest[..open]);
                out.push_str("<em>");
                out.push_str(inner);
                out.push_str("</em>");
                rest = &after[inner.len() + 1..];
            }
            _ => {
                out.push_str(&rest[..open + 1]);
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

/// Escape `text` and apply `**strong**`, `*em*` and `` `code` `` spans.
///
/// Code spans are cut out first so their contents are never re-interpreted.
pub fn format_inline(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 16);
    for segment in split_code_spans(text) {
        match segment {
            Segment::Text(t) => {
                let escaped = escape_html(t);
                out.push_str(&wrap_emphasis(&wrap_strong(&escaped)));
            }
            Segment::Code(c) => {
                out.push_str("<code>");
                out.push_str(&escape_html(c));
                out.push_str("</code>");
            }
        }
    }
    out
}

/// Inline formatting plus single newlines as `<br>`.
pub fn format_paragraph(text: &str) -> String {
    format_inline(text.trim_matches('\n')).replace('\n', "<br>")
}

/// Multi-paragraph text: blank lines separate `<p>` blocks, single newlines become `<br>`.
pub fn format_rich_text(text: &str) -> String {
    fn flush(current: &mut Vec<&str>, out: &mut String) {
        if current.is_empty() {
            return;
        }
        out.push_str("<p>");
        out.push_str(&format_paragraph(&current.join("\n")));
        out.push_str("</p>");
        current.clear();
    }

    let mut out = String::new();
    let mut current: Vec<&str> = Vec::new();
    for line in text.split('\n') {
        let line = line.strip_suffix('\r').unwrap_or(line);
        if line.trim().is_empty() {
            flush(&mut current, &mut out);
        } else {
            current.push(line.trim_end());
        }
    }
    flush(&mut current, &mut out);
    out
}
