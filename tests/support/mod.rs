#![allow(dead_code)]

use cardstream::{
    Document, ItemId, NodeId, Options, StreamHeader, StreamingItem, Viewport, render_html,
};

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// A document with a container and one live item attached to it.
pub fn live_item(opts: Options) -> (Document, NodeId, StreamingItem) {
    let mut doc = Document::new();
    let container = doc.create_element("div");
    let root = doc.root();
    doc.append_child(root, container).unwrap();
    let item = StreamingItem::begin(
        &mut doc,
        container,
        ItemId(1),
        StreamHeader::new("Strategist").with_version("2"),
        opts,
    )
    .unwrap();
    (doc, container, item)
}

/// Stream `chunks` through a fresh item; returns the document and the item.
pub fn stream_chunks(
    chunks: impl IntoIterator<Item = String>,
    opts: Options,
) -> (Document, StreamingItem) {
    let (mut doc, _, mut item) = live_item(opts);
    for chunk in chunks {
        item.append(&mut doc, &chunk);
    }
    (doc, item)
}

pub fn final_body_html(chunks: impl IntoIterator<Item = String>, opts: Options) -> String {
    let (doc, item) = stream_chunks(chunks, opts);
    doc.inner_html(item.body_slot())
}

/// What a one-shot render of the whole text looks like.
pub fn one_shot_html(text: &str) -> String {
    render_html(text, &Options::default())
}

/// Nodes under `scope` carrying `class`, first match.
pub fn first_with_class(doc: &Document, scope: NodeId, class: &str) -> Option<NodeId> {
    doc.find_by_class(scope, class).into_iter().next()
}

pub fn text_of_class(doc: &Document, scope: NodeId, class: &str) -> Option<String> {
    first_with_class(doc, scope, class).map(|n| doc.text_content(n))
}

/// Layout fake: every item header sits at a fixed absolute position in the scroll content.
#[derive(Debug, Default)]
pub struct FakeViewport {
    pub scroll_top: f64,
    pub max_scroll_top: f64,
    pub header_positions: Vec<(NodeId, f64)>,
    pub writes: usize,
}

impl FakeViewport {
    pub fn place(&mut self, node: NodeId, absolute_top: f64) {
        self.header_positions.push((node, absolute_top));
    }
}

impl Viewport for FakeViewport {
    fn scroll_top(&self) -> f64 {
        self.scroll_top
    }

    fn set_scroll_top(&mut self, top: f64) {
        self.writes += 1;
        self.scroll_top = top.clamp(0.0, self.max_scroll_top);
    }

    fn max_scroll_top(&self) -> f64 {
        self.max_scroll_top
    }

    fn offset_top(&self, node: NodeId) -> f64 {
        let absolute = self
            .header_positions
            .iter()
            .find(|(n, _)| *n == node)
            .map(|(_, top)| *top)
            .unwrap_or(0.0);
        absolute - self.scroll_top
    }
}

pub fn chunk_whole(text: &str) -> Vec<String> {
    vec![text.to_string()]
}

pub fn chunk_lines(text: &str) -> Vec<String> {
    text.split_inclusive('\n').map(|s| s.to_string()).collect()
}

pub fn chunk_chars(text: &str) -> Vec<String> {
    text.chars().map(|c| c.to_string()).collect()
}

fn fnv1a64(s: &str) -> u64 {
    let mut h: u64 = 0xcbf29ce484222325;
    for &b in s.as_bytes() {
        h ^= b as u64;
        h = h.wrapping_mul(0x100000001b3);
    }
    h
}

fn xorshift64(state: &mut u64) -> u64 {
    let mut x = *state;
    x ^= x << 13;
    x ^= x >> 7;
    x ^= x << 17;
    *state = x;
    x
}

/// Deterministic random split at char boundaries; the same label and trial give the same chunks.
pub fn chunk_pseudo_random(
    text: &str,
    seed_label: &str,
    trial: u64,
    max_bytes: usize,
) -> Vec<String> {
    assert!(max_bytes > 0);
    let mut state = fnv1a64(seed_label) ^ (trial.wrapping_mul(0x9e3779b97f4a7c15));

    let mut out = Vec::new();
    let mut start = 0usize;
    while start < text.len() {
        let want = (xorshift64(&mut state) as usize % max_bytes) + 1;
        let mut end = (start + want).min(text.len());
        while end < text.len() && !text.is_char_boundary(end) {
            end += 1;
        }
        out.push(text[start..end].to_string());
        start = end;
    }
    out
}
