mod support;

use cardstream::cards::{PAYLOAD_ATTR, SIGNATURE_ATTR};
use cardstream::{MergePath, Options};
use pretty_assertions::assert_eq;
use serde_json::Value;

#[test]
fn plain_prose_across_two_chunks() {
    let (mut doc, _, mut item) = support::live_item(Options::default());
    item.append(&mut doc, "Hello ");
    assert_eq!(doc.inner_html(item.body_slot()), "<p>Hello</p>");

    item.append(&mut doc, "**world**.\n\nSee below.");
    assert_eq!(
        doc.inner_html(item.body_slot()),
        "<p>Hello <strong>world</strong>.</p><p>See below.</p>"
    );
    assert_eq!(item.raw_text(), "Hello **world**.\n\nSee below.");
}

#[test]
fn numbered_label_before_bullets_becomes_a_heading() {
    let html = support::final_body_html(
        support::chunk_whole("1. Benefits:\n- Fast\n- Safe\n"),
        Options::default(),
    );
    assert_eq!(html, "<h3>Benefits</h3><ul><li>Fast</li><li>Safe</li></ul>");
    assert!(!html.contains("<ol"));
}

#[test]
fn table_with_alignments() {
    let html = support::final_body_html(
        support::chunk_whole("| A | B |\n|:--|--:|\n| 1 | 2 |"),
        Options::default(),
    );
    assert_eq!(
        html,
        concat!(
            r#"<div class="table-wrapper"><table>"#,
            r#"<thead><tr><th style="text-align:left">A</th><th style="text-align:right">B</th></tr></thead>"#,
            r#"<tbody><tr><td style="text-align:left">1</td><td style="text-align:right">2</td></tr></tbody>"#,
            "</table></div>"
        )
    );
}

const AD_JSON: &str = r#"{"primary_text":"P","headline":"H","call_to_action":"SHOP_NOW","destination_url":"https://www.example.com/x"}"#;

#[test]
fn ad_mockup_from_a_complete_fence() {
    let text = format!("```json\n{AD_JSON}\n```");
    let (doc, item) = support::stream_chunks(support::chunk_whole(&text), Options::default());
    let body = item.body_slot();

    let card = support::first_with_class(&doc, body, "ad-mockup-card").unwrap();
    assert_eq!(doc.attr(card, "data-card-kind"), Some("ad"));
    assert_eq!(support::text_of_class(&doc, card, "ad-headline").as_deref(), Some("H"));
    assert_eq!(support::text_of_class(&doc, card, "ad-cta").as_deref(), Some("Shop now"));
    assert_eq!(
        support::text_of_class(&doc, card, "ad-display-url").as_deref(),
        Some("example.com")
    );

    let button = support::first_with_class(&doc, card, "add-card-btn").unwrap();
    let payload: Value = serde_json::from_str(doc.attr(button, PAYLOAD_ATTR).unwrap()).unwrap();
    let original: Value = serde_json::from_str(AD_JSON).unwrap();
    assert_eq!(payload, original);
}

#[test]
fn card_node_survives_trailing_prose() {
    let (mut doc, _, mut item) = support::live_item(Options::default());
    let first = r#"```json
{"primary_text":"P","headline":"H1","call_to_action":"LEARN_MORE"}
```"#;
    item.append(&mut doc, first);
    let card = support::first_with_class(&doc, item.body_slot(), "ad-mockup-card").unwrap();
    assert_eq!(doc.attr(card, SIGNATURE_ATTR), Some("ad:H1"));

    let outcome = item.append(&mut doc, "\n\nThat ad leans on urgency.").unwrap();
    assert_eq!(outcome.path, MergePath::Fast);

    let after = support::first_with_class(&doc, item.body_slot(), "ad-mockup-card").unwrap();
    assert_eq!(after, card);
    assert!(doc.is_attached(card));
    assert_eq!(
        doc.inner_html(item.body_slot()),
        support::one_shot_html(item.raw_text())
    );
}

#[test]
fn email_skeleton_is_replaced_by_the_card_in_place() {
    let (mut doc, _, mut item) = support::live_item(Options::default());
    let body = item.body_slot();
    let idea = "Intro paragraph.\n\n```json\n{\"title\":\"Keep\",\"details\":\"d\"}\n```\n\n";

    item.append(&mut doc, idea);
    item.append(&mut doc, "```json\n{\"subject_line\":\"S\",");
    let intro = doc.children(body)[0];
    assert_eq!(doc.text_content(intro), "Intro paragraph.");
    let idea_card = support::first_with_class(&doc, body, "idea-card").unwrap();
    let skeleton = support::first_with_class(&doc, body, "email-mockup-card-skeleton").unwrap();
    assert_eq!(doc.attr(skeleton, "data-skeleton"), Some("email"));
    let skeleton_pos = doc.children(body).iter().position(|&n| n == skeleton).unwrap();

    item.append(&mut doc, "\"body_text\":\"B\"}\n```");

    assert!(!doc.contains(skeleton));
    assert!(support::first_with_class(&doc, body, "card-skeleton").is_none());
    let email = support::first_with_class(&doc, body, "email-mockup-card").unwrap();
    assert_eq!(doc.children(body).iter().position(|&n| n == email), Some(skeleton_pos));
    assert_eq!(support::text_of_class(&doc, email, "email-subject").as_deref(), Some("S"));
    assert_eq!(support::text_of_class(&doc, email, "email-body-text").as_deref(), Some("B"));

    assert_eq!(support::first_with_class(&doc, body, "idea-card"), Some(idea_card));
    assert!(doc.contains(intro));
    assert_eq!(doc.children(body)[0], intro);
}

#[test]
fn empty_append_changes_nothing() {
    let (mut doc, _, mut item) = support::live_item(Options::default());
    item.append(&mut doc, "# Title\n\nBody");
    let before_html = doc.inner_html(item.body_slot());
    let before_nodes = doc.descendants(item.body_slot());

    assert_eq!(item.append(&mut doc, ""), None);
    assert_eq!(doc.inner_html(item.body_slot()), before_html);
    assert_eq!(doc.descendants(item.body_slot()), before_nodes);
}

#[test]
fn raw_text_is_the_exact_concatenation() {
    let chunks = ["a\r", "\nb", "", "😀 c", "\r\n"];
    let (mut doc, _, mut item) = support::live_item(Options::default());
    for chunk in chunks {
        item.append(&mut doc, chunk);
        assert!(chunks.concat().starts_with(item.raw_text()));
    }
    assert_eq!(item.raw_text(), chunks.concat());
    assert_eq!(doc.inner_html(item.body_slot()), "<p>a<br>b😀 c</p>");
}
