use serde_json::{Map, Value};

use super::{
    CardKind, display_text, field, open_wrapper, render_add_button, render_voc_list, voc_items,
};
use crate::escape::escape_html;

/// `SHOP_NOW` -> `Shop now`, `learn more` -> `Learn more`.
pub fn sentence_case_cta(cta: &str) -> String {
    let words = cta
        .replace(['_', '-'], " ")
        .split_whitespace()
        .map(|w| w.to_lowercase())
        .collect::<Vec<_>>()
        .join(" ");
    let mut chars = words.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Hostname of a destination URL without a leading `www.`.
///
/// Scheme-less input (`example.com/x`) is retried with `https://`; anything unparseable is
/// returned trimmed as-is.
pub fn display_url(raw: &str) -> String {
    let raw = raw.trim();
    let parsed = url::Url::parse(raw)
        .ok()
        .filter(|u| u.host_str().is_some())
        .or_else(|| url::Url::parse(&format!("https://{raw}")).ok());
    let host = parsed
        .as_ref()
        .and_then(|u| u.host_str())
        .map(|h| h.to_string());
    let host = match host {
        Some(h) if !h.is_empty() => h,
        _ => return raw.to_string(),
    };
    host.strip_prefix("www.").unwrap_or(&host).to_string()
}

pub(crate) fn render(obj: &Map<String, Value>, payload: &Value, signature: Option<&str>) -> String {
    let primary_text = field(obj, &["primary_text"]).unwrap_or_default();
    let headline = field(obj, &["headline"]).unwrap_or_default();
    let cta = field(obj, &["call_to_action"])
        .map(|c| sentence_case_cta(&c))
        .unwrap_or_default();
    let description = field(obj, &["description"]);
    let url = field(obj, &["destination_url"]).map(|u| display_url(&u));
    let brand = field(obj, &["page_name", "brand_name"]).unwrap_or_else(|| "Your Brand".into());

    let mut out = String::with_capacity(1024);
    open_wrapper(&mut out, CardKind::AdMockup, signature);
    out.push_str(r#"<div class="ad-mockup">"#);

    out.push_str(r#"<div class="ad-profile"><div class="ad-avatar"></div><div class="ad-profile-meta"><span class="ad-page-name">"#);
    out.push_str(&display_text(&brand));
    out.push_str(r#"</span><span class="ad-sponsored">Sponsored</span></div></div>"#);

    out.push_str(r#"<div class="ad-primary-text">"#);
    out.push_str(&display_text(&primary_text));
    out.push_str("</div>");

    out.push_str(r#"<div class="ad-media"><span class="ad-media-placeholder">Image</span></div>"#);

    out.push_str(r#"<div class="ad-link-bar"><div class="ad-link-meta">"#);
    if let Some(url) = &url {
        out.push_str(r#"<span class="ad-display-url">"#);
        out.push_str(&escape_html(url));
        out.push_str("</span>");
    }
    out.push_str(r#"<span class="ad-headline">"#);
    out.push_str(&display_text(&headline));
    out.push_str("</span>");
    if let Some(description) = &description {
        out.push_str(r#"<span class="ad-description">"#);
        out.push_str(&display_text(description));
        out.push_str("</span>");
    }
    out.push_str(r#"</div><span class="ad-cta">"#);
    out.push_str(&escape_html(&cta));
    out.push_str("</span></div>");

    out.push_str(r#"<div class="ad-reactions"><span class="ad-reaction">Like</span><span class="ad-reaction">Comment</span><span class="ad-reaction">Share</span></div>"#);
    out.push_str("</div>");

    render_voc_list(&mut out, &voc_items(obj.get("voc_evidence")));
    render_add_button(&mut out, CardKind::AdMockup, payload);
    out.push_str("</div>");
    out
}
