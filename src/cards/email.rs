use serde_json::{Map, Value};

use super::{
    CardKind, display_text, field, open_wrapper, render_add_button, render_voc_list, rich_text,
    voc_items,
};
use crate::escape::{escape_attr, escape_html};

/// `send_delay_hours` as a human day label: `Day max(1, ceil(h / 24))`.
pub fn day_label(hours: f64) -> String {
    let day = if hours.is_finite() && hours > 24.0 {
        (hours / 24.0).ceil() as u64
    } else {
        1
    };
    format!("Day {day}")
}

fn number(obj: &Map<String, Value>, key: &str) -> Option<f64> {
    match obj.get(key)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn sequence_badge(obj: &Map<String, Value>) -> Option<String> {
    let position = field(obj, &["sequence_position"]).map(|p| format!("Email {p}"));
    let day = number(obj, "send_delay_hours").map(day_label);
    match (position, day) {
        (Some(p), Some(d)) => Some(format!("{p} · {d}")),
        (p, d) => p.or(d),
    }
}

pub(crate) fn render(obj: &Map<String, Value>, payload: &Value, signature: Option<&str>) -> String {
    let subject = field(obj, &["subject_line"]).unwrap_or_default();
    let body = field(obj, &["body_text"]).unwrap_or_default();
    let from_name = field(obj, &["from_name"]).unwrap_or_else(|| "Your Brand".into());

    let mut out = String::with_capacity(1536);
    open_wrapper(&mut out, CardKind::EmailMockup, signature);
    out.push_str(r#"<div class="email-mockup">"#);

    out.push_str(r#"<div class="email-header">"#);
    if let Some(badge) = sequence_badge(obj) {
        out.push_str(r#"<span class="email-sequence-badge">"#);
        out.push_str(&escape_html(&badge));
        out.push_str("</span>");
    }
    out.push_str(r#"<div class="email-from">"#);
    out.push_str(&display_text(&from_name));
    out.push_str(r#"</div><div class="email-subject">"#);
    out.push_str(&display_text(&subject));
    out.push_str("</div>");
    if let Some(preview) = field(obj, &["preview_text"]) {
        out.push_str(r#"<div class="email-preview">"#);
        out.push_str(&display_text(&preview));
        out.push_str("</div>");
    }
    out.push_str("</div>");

    out.push_str(r#"<div class="email-body">"#);
    if let Some(logo) = field(obj, &["logo_url"]) {
        out.push_str(r#"<img class="email-logo" alt="" src=""#);
        out.push_str(&escape_attr(&logo));
        out.push_str(r#"">"#);
    }
    if let Some(headline) = field(obj, &["headline"]) {
        out.push_str(r#"<h3 class="email-headline">"#);
        out.push_str(&display_text(&headline));
        out.push_str("</h3>");
    }
    if let Some(code) = field(obj, &["discount_code"]) {
        out.push_str(r#"<div class="email-discount"><span class="email-discount-label">Use code</span><code class="email-discount-code">"#);
        out.push_str(&escape_html(&code));
        out.push_str("</code></div>");
    }
    out.push_str(r#"<div class="email-body-text">"#);
    out.push_str(&rich_text(&body));
    out.push_str("</div>");
    if let Some(proof) = field(obj, &["social_proof"]) {
        out.push_str(r#"<blockquote class="email-social-proof">"#);
        out.push_str(&display_text(&proof));
        out.push_str("</blockquote>");
    }
    let cta_text = field(obj, &["cta_text"]);
    let cta_url = field(obj, &["cta_url"]);
    if cta_text.is_some() || cta_url.is_some() {
        out.push_str(r#"<a class="email-cta" target="_blank" rel="noopener" href=""#);
        out.push_str(&escape_attr(cta_url.as_deref().unwrap_or("#")));
        out.push_str(r#"">"#);
        out.push_str(&display_text(cta_text.as_deref().unwrap_or("Learn more")));
        out.push_str("</a>");
    }
    out.push_str("</div>");

    out.push_str(r#"<div class="email-footer"><span>Unsubscribe</span><span>View in browser</span></div>"#);
    out.push_str("</div>");

    render_voc_list(&mut out, &voc_items(obj.get("voc_evidence")));
    if let Some(intent) = field(obj, &["strategic_intent"]) {
        out.push_str(r#"<div class="email-strategic-intent"><span class="callout-label">Strategic intent</span>"#);
        out.push_str(&rich_text(&intent));
        out.push_str("</div>");
    }
    render_add_button(&mut out, CardKind::EmailMockup, payload);
    out.push_str("</div>");
    out
}
