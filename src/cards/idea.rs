use serde_json::{Map, Value};

use super::{
    CardKind, display_text, field, open_wrapper, render_add_button, render_voc_list, rich_text,
    voc_items,
};

fn meta_row(out: &mut String, label: &str, value: Option<String>) {
    let Some(value) = value else {
        return;
    };
    out.push_str(r#"<div class="idea-meta-row"><span class="idea-meta-label">"#);
    out.push_str(label);
    out.push_str(r#"</span><span class="idea-meta-value">"#);
    out.push_str(&display_text(&value));
    out.push_str("</span></div>");
}

pub(crate) fn render(obj: &Map<String, Value>, payload: &Value, signature: Option<&str>) -> String {
    let title = field(obj, &["title", "name"]).unwrap_or_default();
    let test_type = field(obj, &["testType", "test_type", "type"]);
    let details = field(obj, &["details", "description"]);

    let mut out = String::with_capacity(768);
    open_wrapper(&mut out, CardKind::GenericIdea, signature);
    if let Some(test_type) = &test_type {
        out.push_str(r#"<span class="idea-badge">"#);
        out.push_str(&display_text(test_type));
        out.push_str("</span>");
    }
    out.push_str(r#"<h4 class="idea-title">"#);
    out.push_str(&display_text(&title));
    out.push_str("</h4>");

    out.push_str(r#"<div class="idea-meta">"#);
    meta_row(&mut out, "Application", field(obj, &["application"]));
    meta_row(&mut out, "Origin", field(obj, &["origin"]));
    out.push_str("</div>");

    if let Some(details) = &details {
        out.push_str(r#"<div class="idea-details">"#);
        out.push_str(&rich_text(details));
        out.push_str("</div>");
    }
    render_voc_list(&mut out, &voc_items(obj.get("voc_evidence")));
    render_add_button(&mut out, CardKind::GenericIdea, payload);
    out.push_str("</div>");
    out
}

/// Strings, numbers and nested arrays inside `ideas` still render, as an untitled idea whose
/// details are the JSON text.
pub(crate) fn render_non_object(value: &Value, signature: Option<&str>) -> String {
    let text = match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    let mut out = String::with_capacity(256);
    open_wrapper(&mut out, CardKind::GenericIdea, signature);
    out.push_str(r#"<h4 class="idea-title"></h4><div class="idea-details">"#);
    out.push_str(&rich_text(&text));
    out.push_str("</div>");
    render_add_button(&mut out, CardKind::GenericIdea, value);
    out.push_str("</div>");
    out
}
