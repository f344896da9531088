//! Card renderers for JSON payloads embedded in the stream.
//!
//! Every renderer returns an HTML string. Untrusted values pass through
//! [`escape_html`](crate::escape::escape_html) (body context) or
//! [`escape_attr`](crate::escape::escape_attr) (attribute context) before they are spliced in.

pub mod ad;
pub mod email;
pub mod idea;
pub mod skeleton;

use serde_json::{Map, Value};

use crate::escape::{escape_attr, escape_html};
use crate::inline::format_rich_text;

pub use skeleton::render_skeleton;

/// Attribute carrying a card's identity while the stream is live.
pub const SIGNATURE_ATTR: &str = "data-card-signature";
/// Attribute carrying the JSON payload on a card's add button.
pub const PAYLOAD_ATTR: &str = "data-payload";
pub const KIND_ATTR: &str = "data-card-kind";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CardKind {
    GenericIdea,
    AdMockup,
    EmailMockup,
}

impl CardKind {
    pub fn as_str(self) -> &'static str {
        match self {
            CardKind::GenericIdea => "idea",
            CardKind::AdMockup => "ad",
            CardKind::EmailMockup => "email",
        }
    }

    /// Route segment of the persistence endpoint a host should post this kind of payload to.
    pub fn endpoint_hint(self) -> &'static str {
        match self {
            CardKind::GenericIdea => "ideas",
            CardKind::AdMockup => "ad-mockups",
            CardKind::EmailMockup => "email-mockups",
        }
    }

    pub fn wrapper_class(self) -> &'static str {
        match self {
            CardKind::GenericIdea => "idea-card",
            CardKind::AdMockup => "ad-mockup-card",
            CardKind::EmailMockup => "email-mockup-card",
        }
    }
}

/// Fingerprint a set of object keys.
pub fn classify_keys<'a>(keys: impl IntoIterator<Item = &'a str>) -> CardKind {
    let mut ad = [false; 3];
    let mut email = [false; 2];
    let mut email_cta = false;
    for key in keys {
        match key {
            "primary_text" => ad[0] = true,
            "headline" => ad[1] = true,
            "call_to_action" => ad[2] = true,
            "subject_line" => email[0] = true,
            "body_text" => email[1] = true,
            "cta_text" | "cta_url" => email_cta = true,
            _ => {}
        }
    }
    if ad.iter().all(|&b| b) {
        CardKind::AdMockup
    } else if email.iter().all(|&b| b) && email_cta {
        CardKind::EmailMockup
    } else {
        CardKind::GenericIdea
    }
}

/// Fingerprint a payload. Anything that is not an object is a generic idea.
pub fn classify(value: &Value) -> CardKind {
    match value.as_object() {
        Some(obj) => classify_keys(obj.keys().map(String::as_str)),
        None => CardKind::GenericIdea,
    }
}

/// Kind a payload is drawn as.
///
/// Same as [`classify`], except that an object carrying both `subject_line` and `body_text` but
/// neither a CTA nor a title is drawn as an email: a sequence email without a call to action is
/// still an email to the reader.
pub fn render_kind(value: &Value) -> CardKind {
    let kind = classify(value);
    let Some(obj) = value.as_object() else {
        return kind;
    };
    let looks_like_email = obj.contains_key("subject_line")
        && obj.contains_key("body_text")
        && !obj.contains_key("title")
        && !obj.contains_key("name");
    if kind == CardKind::GenericIdea && looks_like_email {
        CardKind::EmailMockup
    } else {
        kind
    }
}

/// First non-empty scalar among `keys`, as text.
pub(crate) fn field(obj: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|k| match obj.get(*k)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    })
}

/// Undo JSON-escape remnants: literal `\n` becomes a newline and `\"` loses its backslash.
pub(crate) fn clean_raw(s: &str) -> String {
    s.replace("\\\"", "\"").replace("\\n", "\n")
}

/// Display-only text: cleaned, escaped, newlines as `<br>`.
pub fn display_text(s: &str) -> String {
    escape_html(&clean_raw(s)).replace("\r\n", "\n").replace('\n', "<br>")
}

/// Formatted multi-paragraph text (inline markdown, `<p>` per blank-line separated paragraph).
pub(crate) fn rich_text(s: &str) -> String {
    format_rich_text(&clean_raw(s))
}

/// Voice-of-customer evidence: strings and numbers from an array, or a lone string.
///
/// `null`, objects and empty arrays yield nothing, for every card kind.
pub(crate) fn voc_items(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|v| match v {
                Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
            .collect(),
        Some(Value::String(s)) if !s.trim().is_empty() => vec![s.clone()],
        _ => Vec::new(),
    }
}

pub(crate) fn render_voc_list(out: &mut String, items: &[String]) {
    if items.is_empty() {
        return;
    }
    out.push_str(r#"<div class="voc-evidence"><span class="voc-label">Voice of customer</span><ul>"#);
    for item in items {
        out.push_str("<li>");
        out.push_str(&display_text(item));
        out.push_str("</li>");
    }
    out.push_str("</ul></div>");
}

pub(crate) fn open_wrapper(out: &mut String, kind: CardKind, signature: Option<&str>) {
    out.push_str(r#"<div class=""#);
    out.push_str(kind.wrapper_class());
    out.push_str(r#" card" "#);
    out.push_str(KIND_ATTR);
    out.push_str(r#"=""#);
    out.push_str(kind.as_str());
    out.push('"');
    if let Some(sig) = signature {
        out.push(' ');
        out.push_str(SIGNATURE_ATTR);
        out.push_str(r#"=""#);
        out.push_str(&escape_attr(sig));
        out.push('"');
    }
    out.push('>');
}

pub(crate) fn render_add_button(out: &mut String, kind: CardKind, payload: &Value) {
    let json = serde_json::to_string(payload).unwrap_or_default();
    out.push_str(r#"<div class="card-actions"><button type="button" class="add-card-btn" "#);
    out.push_str(KIND_ATTR);
    out.push_str(r#"=""#);
    out.push_str(kind.as_str());
    out.push_str(r#"" "#);
    out.push_str(PAYLOAD_ATTR);
    out.push_str(r#"=""#);
    out.push_str(&escape_attr(&json));
    out.push_str(r#"">Add</button></div>"#);
}

/// Identity of a card, stable across re-renders of a growing stream.
///
/// Preference: explicit `id`, then the kind-specific id, then the kind's title-like field.
pub fn card_signature(value: &Value) -> Option<String> {
    let obj = value.as_object()?;
    if let Some(id) = field(obj, &["id"]) {
        return Some(format!("id:{}", id.trim()));
    }
    let kind = render_kind(value);
    const EMAIL_TITLE: &[&str] = &["subject_line"];
    const AD_TITLE: &[&str] = &["headline"];
    const IDEA_TITLE: &[&str] = &["title", "name"];
    let (specific_id, title_keys) = match kind {
        CardKind::EmailMockup => ("email_id", EMAIL_TITLE),
        CardKind::AdMockup => ("ad_id", AD_TITLE),
        CardKind::GenericIdea => ("idea_id", IDEA_TITLE),
    };
    if let Some(id) = field(obj, &[specific_id]) {
        return Some(format!("{}-id:{}", kind.as_str(), id.trim()));
    }
    field(obj, title_keys).map(|t| format!("{}:{}", kind.as_str(), t.trim()))
}

/// Render one payload with the renderer its fingerprint selects.
pub fn render_card(value: &Value, signature: Option<&str>) -> String {
    let Some(obj) = value.as_object() else {
        return idea::render_non_object(value, signature);
    };
    match render_kind(value) {
        CardKind::AdMockup => ad::render(obj, value, signature),
        CardKind::EmailMockup => email::render(obj, value, signature),
        CardKind::GenericIdea => idea::render(obj, value, signature),
    }
}
