//! Pure text-to-HTML rendering of a whole stream buffer.
//!
//! `render(s)` depends only on `s` and the options; the streaming item re-renders the full
//! buffer on every append and lets the reconciler work out what changed.

use std::borrow::Cow;
use std::collections::HashMap;

use crate::cards::{self, CardKind, render_card, render_kind, render_skeleton};
use crate::escape::escape_html;
use crate::extract::{CardPayload, Extraction, JsonBlock, extract_json_blocks};
use crate::inline::{format_inline, format_paragraph, format_rich_text};
use crate::markdown::{Alignment, Block, parse_blocks_with_markers};
use crate::options::Options;

/// A card emitted by one render, in document order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedCard {
    pub kind: CardKind,
    /// Disambiguated identity; `None` when the payload has no usable identity field.
    pub signature: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Rendered {
    pub html: String,
    pub cards: Vec<RenderedCard>,
    /// Predicted kinds of the skeletons in the output, in document order.
    pub skeletons: Vec<CardKind>,
}

/// CRLF and lone CR become LF.
pub fn normalize_newlines(text: &str) -> Cow<'_, str> {
    if !text.contains('\r') {
        return Cow::Borrowed(text);
    }
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\r' {
            out.push(c);
            continue;
        }
        if chars.peek() == Some(&'\n') {
            chars.next();
        }
        out.push('\n');
    }
    Cow::Owned(out)
}

/// Largest suffix of `s` that fits in `max_bytes`, cut at a char boundary.
fn tail_window(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes {
        return s;
    }
    let mut start = s.len() - max_bytes;
    while !s.is_char_boundary(start) {
        start += 1;
    }
    &s[start..]
}

struct Renderer<'a> {
    options: &'a Options,
    out: Rendered,
    seen: HashMap<String, usize>,
}

impl<'a> Renderer<'a> {
    fn new(options: &'a Options, capacity: usize) -> Self {
        Self {
            options,
            out: Rendered {
                html: String::with_capacity(capacity),
                ..Rendered::default()
            },
            seen: HashMap::new(),
        }
    }

    /// First occurrence keeps the bare signature; later ones get `#2`, `#3`, ...
    fn disambiguate(&mut self, signature: String) -> String {
        let count = self.seen.entry(signature.clone()).or_insert(0);
        *count += 1;
        if *count == 1 {
            signature
        } else {
            format!("{signature}#{count}")
        }
    }

    fn block(&mut self, block: &Block, extraction: &Extraction) {
        let html = &mut self.out.html;
        match block {
            Block::Heading { level, text } => {
                let level = (*level).clamp(1, 6);
                html.push_str(&format!("<h{level}>"));
                html.push_str(&format_inline(text));
                html.push_str(&format!("</h{level}>"));
            }
            Block::BulletList { items } => {
                html.push_str("<ul>");
                push_items(html, items);
                html.push_str("</ul>");
            }
            Block::OrderedList { start, items } => {
                if *start == 1 {
                    html.push_str("<ol>");
                } else {
                    html.push_str(&format!(r#"<ol start="{start}">"#));
                }
                push_items(html, items);
                html.push_str("</ol>");
            }
            Block::Table {
                alignments,
                header,
                rows,
            } => push_table(html, alignments, header.as_deref(), rows),
            Block::CodeBlock {
                language,
                text,
                complete,
            } => {
                if *complete {
                    html.push_str(r#"<pre class="code-block">"#);
                } else {
                    html.push_str(
                        r#"<pre class="code-block code-block--streaming" data-streaming="true">"#,
                    );
                }
                match language {
                    Some(lang) => {
                        html.push_str(r#"<code class="language-"#);
                        html.push_str(&crate::escape::escape_attr(lang));
                        html.push_str(r#"">"#);
                    }
                    None => html.push_str("<code>"),
                }
                html.push_str(&escape_html(text));
                html.push_str("</code></pre>");
            }
            Block::Paragraph { text } => {
                html.push_str("<p>");
                html.push_str(&format_paragraph(text));
                html.push_str("</p>");
            }
            Block::Rule => html.push_str("<hr>"),
            Block::CardPlaceholder { index } => match extraction.block(*index) {
                Some(json) => self.json_block(json),
                None => tracing::trace!(index, "placeholder without a json block"),
            },
        }
    }

    fn json_block(&mut self, json: &JsonBlock) {
        match json {
            JsonBlock::Parsed(payload) => self.cards(payload),
            JsonBlock::IncompleteLooksLikeAdMockup => self.skeleton(CardKind::AdMockup),
            JsonBlock::IncompleteLooksLikeEmail => self.skeleton(CardKind::EmailMockup),
            JsonBlock::IncompleteLooksLikeGenericIdea => self.skeleton(CardKind::GenericIdea),
            JsonBlock::IncompleteUnknown { raw_text } => {
                let shown = tail_window(raw_text, self.options.max_unknown_preview_bytes);
                let html = &mut self.out.html;
                html.push_str(r#"<pre class="json-streaming" data-streaming="true"><code class="language-json">"#);
                html.push_str(&escape_html(shown.trim_start_matches('\n')));
                html.push_str("</code></pre>");
            }
        }
    }

    fn skeleton(&mut self, kind: CardKind) {
        self.out.html.push_str(&render_skeleton(kind));
        self.out.skeletons.push(kind);
    }

    fn cards(&mut self, payload: &CardPayload) {
        if let Some(content) = payload.content.as_deref().filter(|c| !c.trim().is_empty()) {
            self.out.html.push_str(r#"<div class="cards-intro">"#);
            self.out.html.push_str(&format_rich_text(content));
            self.out.html.push_str("</div>");
        }
        for idea in &payload.ideas {
            let signature = cards::card_signature(idea).map(|s| self.disambiguate(s));
            self.out.html.push_str(&render_card(idea, signature.as_deref()));
            self.out.cards.push(RenderedCard {
                kind: render_kind(idea),
                signature,
            });
        }
    }
}

fn push_items(html: &mut String, items: &[String]) {
    for item in items {
        html.push_str("<li>");
        html.push_str(&format_paragraph(item));
        html.push_str("</li>");
    }
}

fn push_row(html: &mut String, cell_tag: &str, alignments: &[Alignment], cells: &[String]) {
    html.push_str("<tr>");
    for (i, cell) in cells.iter().enumerate() {
        let align = alignments.get(i).copied().unwrap_or(Alignment::Left);
        html.push_str(&format!(
            r#"<{cell_tag} style="text-align:{}">"#,
            align.as_css()
        ));
        html.push_str(&format_inline(cell));
        html.push_str(&format!("</{cell_tag}>"));
    }
    html.push_str("</tr>");
}

fn push_table(
    html: &mut String,
    alignments: &[Alignment],
    header: Option<&[String]>,
    rows: &[Vec<String>],
) {
    html.push_str(r#"<div class="table-wrapper"><table>"#);
    if let Some(header) = header {
        html.push_str("<thead>");
        push_row(html, "th", alignments, header);
        html.push_str("</thead>");
    }
    if !rows.is_empty() {
        html.push_str("<tbody>");
        for row in rows {
            push_row(html, "td", alignments, row);
        }
        html.push_str("</tbody>");
    }
    html.push_str("</table></div>");
}

/// Render a complete stream buffer.
pub fn render(text: &str, options: &Options) -> Rendered {
    let text = normalize_newlines(text);
    let extraction = extract_json_blocks(&text);
    let blocks = parse_blocks_with_markers(&extraction.text, &extraction.marker_prefix);
    let mut renderer = Renderer::new(options, text.len() * 2);
    for block in &blocks {
        renderer.block(block, &extraction);
    }
    renderer.out
}

/// Just the HTML of [`render`].
pub fn render_html(text: &str, options: &Options) -> String {
    render(text, options).html
}
