mod support;

use cardstream::cards::SIGNATURE_ATTR;
use cardstream::{Options, render};
use pretty_assertions::assert_eq;

const RESPONSE: &str = r#"# Campaign ideas

Here are **three** angles for the *spring* launch:

1. Urgency:
- Countdown banner
- Limited `SPRING20` code

| Channel | Budget | Share |
|:--------|-------:|:-----:|
| Meta    | 1200   | 60%   |
| Email   | 800    | 40%   |

```json
{"content": "Two ad variants", "ideas": [
  {"primary_text": "Spring is here 🌸", "headline": "Fresh drops", "call_to_action": "SHOP_NOW", "destination_url": "https://www.example.com/spring"},
  {"primary_text": "Last call", "headline": "48h only", "call_to_action": "LEARN_MORE"}
]}
```

And the follow-up email:

```json
{"subject_line": "Still thinking it over?", "body_text": "Hi,\n\nYour picks are waiting.", "cta_text": "Finish order", "send_delay_hours": 26, "email_id": "seq-2"}
```

```python
print("not a card")
```

---

That's it. Questions?
"#;

#[test]
fn final_body_matches_a_one_shot_render_for_any_chunking() {
    support::init_tracing();
    let expected = support::one_shot_html(RESPONSE);
    let opts = Options::default();

    let whole = support::final_body_html(support::chunk_whole(RESPONSE), opts.clone());
    let lines = support::final_body_html(support::chunk_lines(RESPONSE), opts.clone());
    let chars = support::final_body_html(support::chunk_chars(RESPONSE), opts.clone());
    assert_eq!(whole, expected);
    assert_eq!(lines, expected);
    assert_eq!(chars, expected);

    for trial in 0..8 {
        let chunks = support::chunk_pseudo_random(
            RESPONSE,
            "final_body_matches_a_one_shot_render_for_any_chunking",
            trial,
            24,
        );
        let got = support::final_body_html(chunks, opts.clone());
        assert_eq!(got, expected, "trial {trial}");
    }
}

#[test]
fn render_is_deterministic_and_balanced() {
    let opts = Options::default();
    let a = render(RESPONSE, &opts);
    let b = render(RESPONSE, &opts);
    assert_eq!(a, b);
    assert_eq!(a.cards.len(), 3);
    assert!(a.skeletons.is_empty());

    // Every prefix renders to markup that survives a parse/serialize round trip unchanged,
    // which only holds when all tags are balanced.
    let mut doc = cardstream::Document::new();
    let host = doc.create_element("div");
    for end in (0..=RESPONSE.len()).filter(|&i| RESPONSE.is_char_boundary(i)) {
        let html = render(&RESPONSE[..end], &opts).html;
        doc.set_inner_html(host, &html).unwrap();
        assert_eq!(doc.inner_html(host), html, "prefix of {end} bytes");
    }
}

#[test]
fn card_nodes_persist_from_first_appearance_to_the_end() {
    let (mut doc, _, mut item) = support::live_item(Options::default());
    let mut first_seen = std::collections::HashMap::new();
    for chunk in support::chunk_pseudo_random(RESPONSE, "card_nodes_persist", 0, 16) {
        item.append(&mut doc, &chunk);
        for card in doc.find_with_attr(item.body_slot(), SIGNATURE_ATTR) {
            let sig = doc.attr(card, SIGNATURE_ATTR).unwrap().to_string();
            let node = *first_seen.entry(sig.clone()).or_insert(card);
            assert_eq!(node, card, "card {sig} was remounted");
        }
    }
    let mut sigs: Vec<_> = first_seen.keys().cloned().collect();
    sigs.sort();
    assert_eq!(sigs, vec!["ad:48h only", "ad:Fresh drops", "email-id:seq-2"]);
}
