mod support;

use cardstream::{Console, Error, ItemId, MergePath, Options, StreamHeader, StreamMetadata};
use pretty_assertions::assert_eq;

#[test]
fn items_get_sequential_ids_and_mount_in_order() {
    let mut console = Console::default();
    let a = console.begin(StreamHeader::new("Strategist")).unwrap();
    let b = console.begin(StreamHeader::new("Copywriter")).unwrap();
    assert_eq!((a, b), (ItemId(1), ItemId(2)));

    let doc = console.document();
    let roots: Vec<_> = console.items().map(|i| i.root()).collect();
    assert_eq!(doc.children(console.container()), roots.as_slice());
    assert!(doc.has_class(console.container(), "stream-console"));
}

#[test]
fn append_accumulates_raw_text_per_item() {
    let mut console = Console::new(Options::default());
    let a = console.begin(StreamHeader::new("a")).unwrap();
    let b = console.begin(StreamHeader::new("b")).unwrap();

    let first = console.append(a, "# Title\n").unwrap().unwrap();
    assert_eq!(first.path, MergePath::Slow);
    console.append(b, "other").unwrap();
    console.append(a, "Body").unwrap();

    assert_eq!(console.raw_text(a), Some("# Title\nBody"));
    assert_eq!(console.raw_text(b), Some("other"));
    let doc = console.document();
    let body_a = console.item(a).unwrap().body_slot();
    assert_eq!(doc.inner_html(body_a), "<h1>Title</h1><p>Body</p>");
}

#[test]
fn unknown_items_are_errors() {
    let mut console = Console::default();
    let ghost = ItemId(42);
    assert_eq!(console.append(ghost, "x"), Err(Error::UnknownItem(ghost)));
    assert_eq!(
        console.finalise(ghost, &StreamMetadata::default()),
        Err(Error::UnknownItem(ghost))
    );
    assert_eq!(console.remove(ghost), Err(Error::UnknownItem(ghost)));
    assert_eq!(console.raw_text(ghost), None);
}

#[test]
fn removed_items_are_freed_and_later_calls_are_no_ops() {
    let mut console = Console::default();
    let id = console.begin(StreamHeader::new("a")).unwrap();
    console.append(id, "kept").unwrap();
    let root = console.item(id).unwrap().root();

    console.remove(id).unwrap();
    assert!(!console.document().contains(root));
    assert!(console.item(id).is_none());
    assert!(console.document().children(console.container()).is_empty());

    assert_eq!(console.append(id, " dropped"), Ok(None));
    assert_eq!(console.finalise(id, &StreamMetadata::default()), Ok(()));
    assert_eq!(console.remove(id), Ok(()));
    assert_eq!(console.raw_text(id), None);
}

#[test]
fn removing_items_returns_the_document_to_its_baseline() {
    let mut console = Console::default();
    let baseline = console.document().node_count();
    for round in 0..50 {
        let id = console.begin(StreamHeader::new("a").with_user_message("q")).unwrap();
        console
            .append(id, &format!("# Round {round}\n\n```json\n{{\"title\":\"t{round}\"}}\n```\n"))
            .unwrap();
        if round % 2 == 0 {
            console.finalise(id, &StreamMetadata::default()).unwrap();
        }
        console.remove(id).unwrap();
    }
    assert_eq!(console.document().node_count(), baseline);
    assert_eq!(console.items().count(), 0);
}

#[test]
fn finalise_through_the_console() {
    let mut console = Console::default();
    let id = console.begin(StreamHeader::new("a")).unwrap();
    console.append(id, "done").unwrap();
    console
        .finalise(
            id,
            &StreamMetadata {
                model: Some("m".into()),
                tokens_used: Some(1),
            },
        )
        .unwrap();
    assert!(console.item(id).unwrap().is_finalised());
    assert_eq!(
        console.finalise(id, &StreamMetadata::default()),
        Err(Error::AlreadyFinalised(id))
    );
    let header = console.item(id).unwrap().header_slot();
    assert_eq!(
        support::text_of_class(console.document(), header, "stream-item-tokens").as_deref(),
        Some("1 tokens")
    );
}

#[test]
fn header_metadata_deserializes_from_host_json() {
    let header: StreamHeader =
        serde_json::from_str(r#"{"name":"Strategist","version":3,"userMessage":"hi"}"#).unwrap();
    assert_eq!(
        header,
        StreamHeader::new("Strategist")
            .with_version("3")
            .with_user_message("hi")
    );
    let meta: StreamMetadata =
        serde_json::from_str(r#"{"model":"m","tokensUsed":12}"#).unwrap();
    assert_eq!(meta.tokens_used, Some(12));
}
