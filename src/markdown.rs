use crate::extract::{MARKER_PREFIX, parse_marker_with};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Alignment {
    Left,
    Center,
    Right,
}

impl Alignment {
    pub fn as_css(self) -> &'static str {
        match self {
            Alignment::Left => "left",
            Alignment::Center => "center",
            Alignment::Right => "right",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    Heading {
        level: u8,
        text: String,
    },
    BulletList {
        items: Vec<String>,
    },
    OrderedList {
        start: u64,
        items: Vec<String>,
    },
    Table {
        alignments: Vec<Alignment>,
        header: Option<Vec<String>>,
        rows: Vec<Vec<String>>,
    },
    CodeBlock {
        language: Option<String>,
        text: String,
        /// False when the closing fence has not arrived yet.
        complete: bool,
    },
    Paragraph {
        text: String,
    },
    Rule,
    CardPlaceholder {
        index: usize,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    Heading,
    BulletList,
    OrderedList,
    Table,
    CodeBlock,
    Paragraph,
    Rule,
    CardPlaceholder,
}

impl Block {
    pub fn kind(&self) -> BlockKind {
        match self {
            Block::Heading { .. } => BlockKind::Heading,
            Block::BulletList { .. } => BlockKind::BulletList,
            Block::OrderedList { .. } => BlockKind::OrderedList,
            Block::Table { .. } => BlockKind::Table,
            Block::CodeBlock { .. } => BlockKind::CodeBlock,
            Block::Paragraph { .. } => BlockKind::Paragraph,
            Block::Rule => BlockKind::Rule,
            Block::CardPlaceholder { .. } => BlockKind::CardPlaceholder,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodeFenceHeader<'a> {
    pub fence_char: char,
    pub fence_len: usize,
    /// Entire info string (trimmed), excluding fence markers.
    pub info: &'a str,
    /// First token of `info`. `None` means "no language".
    pub language: Option<&'a str>,
}

fn strip_up_to_three_spaces(line: &str) -> &str {
    let mut s = line;
    let mut spaces = 0usize;
    while spaces < 3 && s.starts_with(' ') {
        s = &s[1..];
        spaces += 1;
    }
    s
}

pub fn parse_code_fence_header(line: &str) -> Option<CodeFenceHeader<'_>> {
    // Fence opening line:
    // - up to 3 leading spaces
    // - fence is ``` or ~~~ (>=3)
    // - info string is the rest of the line after the fence run
    let s = strip_up_to_three_spaces(line);
    let bytes = s.as_bytes();
    if bytes.len() < 3 {
        return None;
    }
    let fence_char = bytes[0] as char;
    if fence_char != '`' && fence_char != '~' {
        return None;
    }
    let mut fence_len = 0usize;
    while fence_len < bytes.len() && bytes[fence_len] == bytes[0] {
        fence_len += 1;
    }
    if fence_len < 3 {
        return None;
    }
    let info = s[fence_len..].trim();
    // A backtick fence's info string may not contain backticks (that is inline code).
    if fence_char == '`' && info.contains('`') {
        return None;
    }
    let language = info.split_whitespace().next();
    Some(CodeFenceHeader {
        fence_char,
        fence_len,
        info,
        language,
    })
}

pub fn is_code_fence_closing_line(line: &str, fence_char: char, fence_len: usize) -> bool {
    let trimmed = strip_up_to_three_spaces(line).trim_end();
    let mut count = 0usize;
    for ch in trimmed.chars() {
        if ch != fence_char {
            return false;
        }
        count += 1;
    }
    count >= fence_len
}

fn thematic_break_char(line: &str) -> Option<char> {
    // - up to 3 leading spaces
    // - one of '-', '*', '_' repeated >= 3
    // - spaces/tabs may appear between markers
    // - no other characters
    let s = strip_up_to_three_spaces(line).trim_end_matches([' ', '\t']);
    let mut it = s.chars();
    let first = it.next()?;
    if first != '-' && first != '*' && first != '_' {
        return None;
    }
    let mut count = 1usize;
    for c in it {
        if c == first {
            count += 1;
            continue;
        }
        if c == ' ' || c == '\t' {
            continue;
        }
        return None;
    }
    if count >= 3 { Some(first) } else { None }
}

fn heading(trimmed: &str) -> Option<(u8, &str)> {
    let level = trimmed.bytes().take_while(|&b| b == b'#').count();
    if level == 0 || level > 6 {
        return None;
    }
    let rest = &trimmed[level..];
    if !rest.starts_with([' ', '\t']) {
        return None;
    }
    Some((level as u8, rest.trim()))
}

/// `- item`, `* item` or `+ item` (after leading whitespace).
fn bullet_item(line: &str) -> Option<&str> {
    let s = line.trim_start();
    let bytes = s.as_bytes();
    if bytes.len() < 2 {
        return None;
    }
    match bytes[0] {
        b'-' | b'*' | b'+' if bytes[1] == b' ' || bytes[1] == b'\t' => Some(s[2..].trim()),
        _ => None,
    }
}

/// `12. item` or `12) item` (after leading whitespace).
fn ordered_item(line: &str) -> Option<(u64, &str)> {
    let s = line.trim_start();
    let bytes = s.as_bytes();
    let mut i = 0usize;
    while i < bytes.len() && bytes[i].is_ascii_digit() {
        i += 1;
    }
    if i == 0 || i > 9 || i + 1 >= bytes.len() {
        return None;
    }
    if !(bytes[i] == b'.' || bytes[i] == b')') {
        return None;
    }
    if !(bytes[i + 1] == b' ' || bytes[i + 1] == b'\t') {
        return None;
    }
    let number = s[..i].parse().ok()?;
    Some((number, s[i + 2..].trim()))
}

fn is_table_row(trimmed: &str) -> bool {
    trimmed.len() >= 2 && trimmed.starts_with('|') && trimmed.ends_with('|')
}

fn split_cells(trimmed: &str) -> Vec<String> {
    let inner = &trimmed[1..trimmed.len() - 1];
    inner.split('|').map(|c| c.trim().to_string()).collect()
}

fn separator_alignments(trimmed: &str) -> Option<Vec<Alignment>> {
    let cells = split_cells(trimmed);
    let mut out = Vec::with_capacity(cells.len());
    for cell in &cells {
        let left = cell.starts_with(':');
        let right = cell.ends_with(':') && cell.len() > 1;
        let dashes = cell.trim_start_matches(':').trim_end_matches(':');
        if dashes.is_empty() || !dashes.bytes().all(|b| b == b'-') {
            return None;
        }
        out.push(match (left, right) {
            (true, true) => Alignment::Center,
            (false, true) => Alignment::Right,
            _ => Alignment::Left,
        });
    }
    if out.is_empty() { None } else { Some(out) }
}

fn is_continuation(line: &str) -> bool {
    line.starts_with('\t') || line.starts_with("  ")
}

#[derive(Debug)]
enum Open {
    None,
    Bullet(Vec<String>),
    Ordered {
        start: u64,
        items: Vec<String>,
    },
    Table {
        alignments: Option<Vec<Alignment>>,
        rows: Vec<Vec<String>>,
    },
    Code {
        fence_char: char,
        fence_len: usize,
        language: Option<String>,
        lines: Vec<String>,
    },
}

struct BlockParser<'a> {
    marker_prefix: &'a str,
    blocks: Vec<Block>,
    open: Open,
    paragraph: Vec<String>,
}

impl<'a> BlockParser<'a> {
    fn new(marker_prefix: &'a str) -> Self {
        Self {
            marker_prefix,
            blocks: Vec::new(),
            open: Open::None,
            paragraph: Vec::new(),
        }
    }

    fn flush_paragraph(&mut self) {
        if self.paragraph.is_empty() {
            return;
        }
        let text = std::mem::take(&mut self.paragraph).join("\n");
        self.blocks.push(Block::Paragraph { text });
    }

    fn close_open(&mut self) {
        match std::mem::replace(&mut self.open, Open::None) {
            Open::None => {}
            Open::Bullet(items) => self.blocks.push(Block::BulletList { items }),
            Open::Ordered { start, items } => self.blocks.push(Block::OrderedList { start, items }),
            Open::Table {
                alignments,
                mut rows,
            } => {
                let header = match alignments {
                    Some(_) if !rows.is_empty() => Some(rows.remove(0)),
                    _ => None,
                };
                let columns = header
                    .iter()
                    .chain(rows.iter())
                    .map(|r| r.len())
                    .max()
                    .unwrap_or(0);
                let mut alignments = alignments.unwrap_or_default();
                alignments.resize(columns.max(alignments.len()), Alignment::Left);
                self.blocks.push(Block::Table {
                    alignments,
                    header,
                    rows,
                });
            }
            Open::Code {
                language,
                lines: code,
                ..
            } => {
                // Unterminated fences never get here; `finish` emits them as incomplete.
                self.blocks.push(Block::CodeBlock {
                    language,
                    text: code.join("\n"),
                    complete: true,
                });
            }
        }
    }

    fn close_all(&mut self) {
        self.flush_paragraph();
        self.close_open();
    }

    fn next_nonempty_is_bullet(lines: &[&str], from: usize) -> bool {
        lines[from..]
            .iter()
            .find(|l| !l.trim().is_empty())
            .is_some_and(|l| bullet_item(l).is_some())
    }

    fn push_line(&mut self, lines: &[&str], index: usize) {
        let line = lines[index];

        if let Open::Code {
            fence_char,
            fence_len,
            ..
        } = &self.open
        {
            if is_code_fence_closing_line(line, *fence_char, *fence_len) {
                // Marks the fence complete; `close_open` emits it.
                self.close_open();
            } else if let Open::Code { lines: code, .. } = &mut self.open {
                code.push(line.to_string());
            }
            return;
        }

        let trimmed = line.trim();
        if trimmed.is_empty() {
            self.close_all();
            return;
        }

        if let Some(index) = parse_marker_with(self.marker_prefix, trimmed) {
            self.close_all();
            self.blocks.push(Block::CardPlaceholder { index });
            return;
        }

        if let Some(header) = parse_code_fence_header(line) {
            self.close_all();
            self.open = Open::Code {
                fence_char: header.fence_char,
                fence_len: header.fence_len,
                language: header.language.map(|l| l.to_string()),
                lines: Vec::new(),
            };
            return;
        }

        if let Some((level, text)) = heading(trimmed) {
            self.close_all();
            self.blocks.push(Block::Heading {
                level,
                text: text.to_string(),
            });
            return;
        }

        if is_table_row(trimmed) {
            self.flush_paragraph();
            if !matches!(self.open, Open::Table { .. }) {
                self.close_open();
                self.open = Open::Table {
                    alignments: None,
                    rows: Vec::new(),
                };
            }
            let Open::Table { alignments, rows } = &mut self.open else {
                return;
            };
            match separator_alignments(trimmed) {
                Some(found) => *alignments = Some(found),
                None => rows.push(split_cells(trimmed)),
            }
            return;
        }

        if thematic_break_char(line).is_some() {
            self.close_all();
            self.blocks.push(Block::Rule);
            return;
        }

        if let Some(text) = bullet_item(line) {
            self.flush_paragraph();
            if let Open::Bullet(items) = &mut self.open {
                items.push(text.to_string());
            } else {
                self.close_open();
                self.open = Open::Bullet(vec![text.to_string()]);
            }
            return;
        }

        if let Some((number, text)) = ordered_item(line) {
            self.flush_paragraph();
            if text.ends_with(':') && Self::next_nonempty_is_bullet(lines, index + 1) {
                self.close_open();
                self.blocks.push(Block::Heading {
                    level: 3,
                    text: text.trim_end_matches(':').trim_end().to_string(),
                });
                return;
            }
            if let Open::Ordered { items, .. } = &mut self.open {
                items.push(text.to_string());
            } else {
                self.close_open();
                self.open = Open::Ordered {
                    start: number,
                    items: vec![text.to_string()],
                };
            }
            return;
        }

        if is_continuation(line) {
            if let Open::Bullet(items) | Open::Ordered { items, .. } = &mut self.open {
                if let Some(last) = items.last_mut() {
                    last.push('\n');
                    last.push_str(trimmed);
                    return;
                }
            }
        }

        if !matches!(self.open, Open::None) {
            self.close_open();
        }
        self.paragraph.push(trimmed.to_string());
    }

    fn finish(mut self) -> Vec<Block> {
        if let Open::Code { .. } = self.open {
            if let Open::Code {
                language,
                lines: code,
                ..
            } = std::mem::replace(&mut self.open, Open::None)
            {
                self.blocks.push(Block::CodeBlock {
                    language,
                    text: code.join("\n"),
                    complete: false,
                });
            }
            return self.blocks;
        }
        self.close_all();
        self.blocks
    }
}

/// Split (marker-substituted) text into blocks, in input order.
///
/// Ill-formed input never fails: an open construct is closed when something else starts.
pub fn parse_blocks(text: &str) -> Vec<Block> {
    parse_blocks_with_markers(text, MARKER_PREFIX)
}

/// [`parse_blocks`] for text whose card markers were built with `marker_prefix`.
pub fn parse_blocks_with_markers(text: &str, marker_prefix: &str) -> Vec<Block> {
    let lines: Vec<&str> = text
        .split('\n')
        .map(|l| l.strip_suffix('\r').unwrap_or(l))
        .collect();
    let mut parser = BlockParser::new(marker_prefix);
    for index in 0..lines.len() {
        parser.push_line(&lines, index);
    }
    parser.finish()
}
