use std::borrow::Cow;

fn needs_body_escape(c: char) -> bool {
    matches!(c, '&' | '<' | '>' | '"' | '\'')
}

fn needs_attr_escape(c: char) -> bool {
    needs_body_escape(c) || matches!(c, '\n' | '\r' | '`')
}

/// Escape untrusted text for an HTML body context.
pub fn escape_html(s: &str) -> Cow<'_, str> {
    if !s.contains(needs_body_escape) {
        return Cow::Borrowed(s);
    }
    let mut out = String::with_capacity(s.len() + 16);
    for c in s.chars() {
        push_escaped(&mut out, c);
    }
    Cow::Owned(out)
}

/// Escape untrusted text for a double-quoted attribute value.
///
/// Newlines and backticks are encoded as numeric references so the value survives attribute
/// normalisation and round-trips through [`unescape_html`] byte for byte.
pub fn escape_attr(s: &str) -> Cow<'_, str> {
    if !s.contains(needs_attr_escape) {
        return Cow::Borrowed(s);
    }
    let mut out = String::with_capacity(s.len() + 16);
    for c in s.chars() {
        match c {
            '\n' => out.push_str("&#10;"),
            '\r' => out.push_str("&#13;"),
            '`' => out.push_str("&#96;"),
            _ => push_escaped(&mut out, c),
        }
    }
    Cow::Owned(out)
}

fn push_escaped(out: &mut String, c: char) {
    match c {
        '&' => out.push_str("&amp;"),
        '<' => out.push_str("&lt;"),
        '>' => out.push_str("&gt;"),
        '"' => out.push_str("&quot;"),
        '\'' => out.push_str("&#39;"),
        _ => out.push(c),
    }
}

fn decode_entity(name: &str) -> Option<char> {
    match name {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        "nbsp" => Some('\u{a0}'),
        _ => {
            let num = name.strip_prefix('#')?;
            let code = match num.strip_prefix(['x', 'X']) {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => num.parse::<u32>().ok()?,
            };
            char::from_u32(code)
        }
    }
}

/// Decode the entities produced by [`escape_html`] / [`escape_attr`] (plus `&nbsp;`, `&apos;`
/// and numeric references). Unknown entities are kept verbatim.
pub fn unescape_html(s: &str) -> Cow<'_, str> {
    if !s.contains('&') {
        return Cow::Borrowed(s);
    }
    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let after = &rest[amp + 1..];
        // Entity names are short; do not scan arbitrarily far for ';'.
        let semi = after.find(';').filter(|&i| i > 0 && i <= 10);
        match semi.and_then(|i| decode_entity(&after[..i]).map(|c| (i, c))) {
            Some((i, c)) => {
                out.push(c);
                rest = &after[i + 1..];
            }
            None => {
                out.push('&');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    Cow::Owned(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn body_escape_borrows_clean_text() {
        assert!(matches!(escape_html("plain text"), Cow::Borrowed(_)));
        assert_eq!(
            escape_html(r#"<a href="x">&'"#),
            "&lt;a href=&quot;x&quot;&gt;&amp;&#39;"
        );
    }

    #[test]
    fn attr_escape_round_trips_through_unescape() {
        let raw = "line one\nline \"two\" <b>`x`</b> & done\r\n";
        let escaped = escape_attr(raw);
        assert!(!escaped.contains(['\n', '"', '<', '>', '`']));
        assert_eq!(unescape_html(&escaped), raw);
    }

    #[test]
    fn unescape_keeps_unknown_entities() {
        assert_eq!(unescape_html("a &bogus; b &amp; c &"), "a &bogus; b & c &");
        assert_eq!(unescape_html("&#x41;&#66;"), "AB");
    }
}
