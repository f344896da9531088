use serde_json::Value;

const OPEN_FENCE: &str = "```json";
const CLOSE_FENCE: &str = "```";
/// Marker prefix used unless the text already contains it.
pub const MARKER_PREFIX: &str = "___JSON_BLOCK_";
const MARKER_SUFFIX: &str = "___";

/// Normalised payload of a complete, parseable `json` fence.
#[derive(Debug, Clone, PartialEq)]
pub struct CardPayload {
    /// Optional markdown-ish intro text (`{"content": "...", "ideas": [...]}` shape).
    pub content: Option<String>,
    /// One entry per card, in source order.
    pub ideas: Vec<Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum JsonBlock {
    Parsed(CardPayload),
    IncompleteLooksLikeAdMockup,
    IncompleteLooksLikeEmail,
    IncompleteLooksLikeGenericIdea,
    IncompleteUnknown { raw_text: String },
}

impl JsonBlock {
    pub fn is_incomplete(&self) -> bool {
        !matches!(self, JsonBlock::Parsed(_))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Extraction {
    /// Input text with every recognised `json` region replaced by its marker line.
    pub text: String,
    /// Indexed by the number carried in the marker.
    pub blocks: Vec<JsonBlock>,
    /// Marker prefix used for this text. Never a substring of the input, so marker-shaped
    /// lines the model writes itself stay prose.
    pub marker_prefix: String,
}

impl Extraction {
    pub fn marker(&self, index: usize) -> String {
        format!("{}{index}{MARKER_SUFFIX}", self.marker_prefix)
    }

    pub fn parse_marker(&self, line: &str) -> Option<usize> {
        parse_marker_with(&self.marker_prefix, line)
    }

    pub fn block(&self, index: usize) -> Option<&JsonBlock> {
        self.blocks.get(index)
    }
}

/// `___JSON_BLOCK_`, extended with `X`s until it does not occur in `text`.
fn marker_prefix_for(text: &str) -> String {
    let mut prefix = MARKER_PREFIX.to_string();
    let mut extra = 0usize;
    while text.contains(prefix.as_str()) {
        extra += 1;
        prefix = format!("{MARKER_PREFIX}{}_", "X".repeat(extra));
    }
    prefix
}

/// Parse a marker line carrying the default prefix (surrounding whitespace allowed).
pub fn parse_marker(line: &str) -> Option<usize> {
    parse_marker_with(MARKER_PREFIX, line)
}

/// Parse a marker line built with `prefix` back into its block index.
pub fn parse_marker_with(prefix: &str, line: &str) -> Option<usize> {
    let s = line.trim();
    let digits = s.strip_prefix(prefix)?.strip_suffix(MARKER_SUFFIX)?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

fn find_open_fence(text: &str, from: usize) -> Option<usize> {
    let mut search = from;
    while let Some(rel) = text[search..].find(OPEN_FENCE) {
        let at = search + rel;
        let after = at + OPEN_FENCE.len();
        // ```json must be followed by whitespace (or the end of what has arrived so far);
        // ```jsonc / ```json5 stay ordinary code fences.
        match text[after..].chars().next() {
            None => return Some(at),
            Some(c) if c.is_whitespace() => return Some(at),
            Some(_) => search = after,
        }
    }
    None
}

fn parse_payload(body: &str) -> Option<CardPayload> {
    let value: Value = serde_json::from_str(body.trim()).ok()?;
    match value {
        Value::Array(ideas) => Some(CardPayload {
            content: None,
            ideas,
        }),
        Value::Object(mut obj) => {
            if let Some(Value::Array(_)) = obj.get("ideas") {
                let Some(Value::Array(ideas)) = obj.remove("ideas") else {
                    return None;
                };
                let content = obj
                    .get("content")
                    .and_then(Value::as_str)
                    .map(|s| s.to_string());
                Some(CardPayload { content, ideas })
            } else {
                Some(CardPayload {
                    content: None,
                    ideas: vec![Value::Object(obj)],
                })
            }
        }
        _ => None,
    }
}

/// Predict the card kind of a partial payload from the keys seen so far.
///
/// Email keys win over ad keys, which win over idea keys.
pub fn classify_incomplete(partial: &str) -> JsonBlock {
    let has_any = |keys: &[&str]| {
        keys.iter()
            .any(|k| partial.contains(&format!("\"{k}\"")))
    };
    if has_any(&["subject_line", "body_text"]) {
        JsonBlock::IncompleteLooksLikeEmail
    } else if has_any(&["primary_text", "headline", "call_to_action"]) {
        JsonBlock::IncompleteLooksLikeAdMockup
    } else if has_any(&["title", "description", "idea"]) {
        JsonBlock::IncompleteLooksLikeGenericIdea
    } else {
        JsonBlock::IncompleteUnknown {
            raw_text: partial.to_string(),
        }
    }
}

fn push_marker(out: &mut String, prefix: &str, index: usize) {
    out.push('\n');
    out.push_str(prefix);
    out.push_str(&index.to_string());
    out.push_str(MARKER_SUFFIX);
    out.push('\n');
}

/// Locate ```` ```json ```` regions, replace them with marker lines and classify them.
///
/// Complete fences whose body is not an object or array are left in place so that the block
/// parser renders them as ordinary `json` code blocks.
pub fn extract_json_blocks(text: &str) -> Extraction {
    let marker_prefix = marker_prefix_for(text);
    let mut out = String::with_capacity(text.len());
    let mut blocks = Vec::new();
    let mut copied_to = 0usize;
    let mut search_from = 0usize;

    while let Some(open) = find_open_fence(text, search_from) {
        let body_start = open + OPEN_FENCE.len();
        match text[body_start..].find(CLOSE_FENCE) {
            Some(close_rel) => {
                let body = &text[body_start..body_start + close_rel];
                let close_end = body_start + close_rel + CLOSE_FENCE.len();
                match parse_payload(body) {
                    Some(payload) => {
                        out.push_str(&text[copied_to..open]);
                        push_marker(&mut out, &marker_prefix, blocks.len());
                        blocks.push(JsonBlock::Parsed(payload));
                        copied_to = close_end;
                    }
                    None => {
                        tracing::trace!(offset = open, "malformed json fence left as code");
                    }
                }
                search_from = close_end;
            }
            None => {
                // Only the last fence in the buffer can be unterminated.
                out.push_str(&text[copied_to..open]);
                push_marker(&mut out, &marker_prefix, blocks.len());
                blocks.push(classify_incomplete(&text[body_start..]));
                copied_to = text.len();
                break;
            }
        }
    }

    out.push_str(&text[copied_to..]);
    Extraction {
        text: out,
        blocks,
        marker_prefix,
    }
}
