use cardstream::markdown::{Alignment, Block, BlockKind, parse_blocks, parse_code_fence_header};
use pretty_assertions::assert_eq;

fn kinds(text: &str) -> Vec<BlockKind> {
    parse_blocks(text).iter().map(Block::kind).collect()
}

#[test]
fn headings_levels_one_to_six() {
    assert_eq!(
        parse_blocks("# One\n### Three\n###### Six\n####### Seven"),
        vec![
            Block::Heading {
                level: 1,
                text: "One".into()
            },
            Block::Heading {
                level: 3,
                text: "Three".into()
            },
            Block::Heading {
                level: 6,
                text: "Six".into()
            },
            Block::Paragraph {
                text: "####### Seven".into()
            },
        ]
    );
}

#[test]
fn hash_without_space_is_prose() {
    assert_eq!(kinds("#hashtag"), vec![BlockKind::Paragraph]);
}

#[test]
fn heading_promotion_only_before_bullets() {
    assert_eq!(
        parse_blocks("1. Benefits:\n\n- Fast"),
        vec![
            Block::Heading {
                level: 3,
                text: "Benefits".into()
            },
            Block::BulletList {
                items: vec!["Fast".into()]
            },
        ]
    );
    // Followed by prose: stays an ordered list.
    assert_eq!(
        parse_blocks("1. Benefits:\nThey are many."),
        vec![
            Block::OrderedList {
                start: 1,
                items: vec!["Benefits:".into()]
            },
            Block::Paragraph {
                text: "They are many.".into()
            },
        ]
    );
}

#[test]
fn promoted_headings_split_ordered_runs() {
    let text = "1. Speed:\n- fast\n2. Safety:\n- safe\n3. Cost\n4. Scale";
    assert_eq!(
        parse_blocks(text),
        vec![
            Block::Heading {
                level: 3,
                text: "Speed".into()
            },
            Block::BulletList {
                items: vec!["fast".into()]
            },
            Block::Heading {
                level: 3,
                text: "Safety".into()
            },
            Block::BulletList {
                items: vec!["safe".into()]
            },
            Block::OrderedList {
                start: 3,
                items: vec!["Cost".into(), "Scale".into()]
            },
        ]
    );
}

#[test]
fn bullets_accept_three_markers_and_continuations() {
    assert_eq!(
        parse_blocks("- one\n* two\n  wrapped\n+ three\n\nafter"),
        vec![
            Block::BulletList {
                items: vec!["one".into(), "two\nwrapped".into(), "three".into()]
            },
            Block::Paragraph {
                text: "after".into()
            },
        ]
    );
}

#[test]
fn ordered_list_with_parenthesis_markers() {
    assert_eq!(
        parse_blocks("2) b\n3) c"),
        vec![Block::OrderedList {
            start: 2,
            items: vec!["b".into(), "c".into()]
        }]
    );
}

#[test]
fn table_without_separator_has_no_header() {
    assert_eq!(
        parse_blocks("| a | b |\n| c | d |\nnext"),
        vec![
            Block::Table {
                alignments: vec![Alignment::Left, Alignment::Left],
                header: None,
                rows: vec![vec!["a".into(), "b".into()], vec!["c".into(), "d".into()]],
            },
            Block::Paragraph {
                text: "next".into()
            },
        ]
    );
}

#[test]
fn centre_alignment() {
    let blocks = parse_blocks("| x |\n|:-:|\n| y |");
    let Block::Table { alignments, .. } = &blocks[0] else {
        panic!("expected a table, got {blocks:?}");
    };
    assert_eq!(alignments, &vec![Alignment::Center]);
}

#[test]
fn fences_close_and_keep_their_language() {
    assert_eq!(
        parse_blocks("```rust\nfn main() {}\n\n# not a heading\n```\ntail"),
        vec![
            Block::CodeBlock {
                language: Some("rust".into()),
                text: "fn main() {}\n\n# not a heading".into(),
                complete: true,
            },
            Block::Paragraph {
                text: "tail".into()
            },
        ]
    );
}

#[test]
fn tilde_fence_needs_a_matching_closer() {
    assert_eq!(
        parse_blocks("~~~\na\n```\nb"),
        vec![Block::CodeBlock {
            language: None,
            text: "a\n```\nb".into(),
            complete: false,
        }]
    );
}

#[test]
fn unterminated_fence_is_incomplete() {
    assert_eq!(
        parse_blocks("Look:\n```python\nprint(1)"),
        vec![
            Block::Paragraph {
                text: "Look:".into()
            },
            Block::CodeBlock {
                language: Some("python".into()),
                text: "print(1)".into(),
                complete: false,
            },
        ]
    );
}

#[test]
fn thematic_breaks() {
    assert_eq!(
        kinds("a\n\n---\n* * *\nb"),
        vec![
            BlockKind::Paragraph,
            BlockKind::Rule,
            BlockKind::Rule,
            BlockKind::Paragraph
        ]
    );
}

#[test]
fn placeholders_close_open_constructs() {
    assert_eq!(
        parse_blocks("- a\n___JSON_BLOCK_0___\n- b"),
        vec![
            Block::BulletList {
                items: vec!["a".into()]
            },
            Block::CardPlaceholder { index: 0 },
            Block::BulletList {
                items: vec!["b".into()]
            },
        ]
    );
}

#[test]
fn marker_inside_a_code_fence_is_code() {
    assert_eq!(
        kinds("```\n___JSON_BLOCK_0___\n```"),
        vec![BlockKind::CodeBlock]
    );
}

#[test]
fn fence_header_parsing() {
    let h = parse_code_fence_header("  ````ts title=x").unwrap();
    assert_eq!(h.fence_char, '`');
    assert_eq!(h.fence_len, 4);
    assert_eq!(h.language, Some("ts"));
    assert_eq!(h.info, "ts title=x");
    assert!(parse_code_fence_header("``not").is_none());
    assert!(parse_code_fence_header("```a`b").is_none());
}
