use super::CardKind;

/// Attribute marking a skeleton placeholder; its value is the predicted card kind.
pub const SKELETON_ATTR: &str = "data-skeleton";

fn line(out: &mut String, class: &str) {
    out.push_str(r#"<div class="skeleton-line "#);
    out.push_str(class);
    out.push_str(r#""></div>"#);
}

/// Non-interactive placeholder shaped like the card `kind` will become.
///
/// Skeletons carry no payload and no identity, so the reconciler always replaces them.
pub fn render_skeleton(kind: CardKind) -> String {
    let mut out = String::with_capacity(512);
    out.push_str(r#"<div class="card-skeleton "#);
    out.push_str(kind.wrapper_class());
    out.push_str(r#"-skeleton" aria-hidden="true" "#);
    out.push_str(SKELETON_ATTR);
    out.push_str(r#"=""#);
    out.push_str(kind.as_str());
    out.push_str(r#"">"#);
    match kind {
        CardKind::AdMockup => {
            out.push_str(r#"<div class="skeleton-profile"><div class="skeleton-avatar"></div>"#);
            line(&mut out, "skeleton-short");
            out.push_str("</div>");
            line(&mut out, "skeleton-body");
            line(&mut out, "skeleton-body");
            out.push_str(r#"<div class="skeleton-media"></div>"#);
            line(&mut out, "skeleton-cta");
        }
        CardKind::EmailMockup => {
            out.push_str(r#"<div class="skeleton-header">"#);
            line(&mut out, "skeleton-short");
            line(&mut out, "skeleton-title");
            out.push_str("</div>");
            line(&mut out, "skeleton-body");
            line(&mut out, "skeleton-body");
            line(&mut out, "skeleton-body");
            out.push_str(r#"<div class="skeleton-button"></div>"#);
        }
        CardKind::GenericIdea => {
            out.push_str(r#"<div class="skeleton-header">"#);
            line(&mut out, "skeleton-badge");
            line(&mut out, "skeleton-title");
            out.push_str("</div>");
            line(&mut out, "skeleton-body");
            line(&mut out, "skeleton-body");
        }
    }
    out.push_str("</div>");
    out
}
