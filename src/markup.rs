//! Chapter markup parser – converts raw chapter text into structured blocks.
//!
//! The dialect is a small markdown subset: `#`/`##`/`###` headings, `*`/`-`/`+`
//! bullet lists, `>` quotes, blank-line paragraph breaks, and inline
//! `**bold**`, `__bold__`, `*italic*`, `_italic_` and `` `code` `` spans
//! (code renders as plain text). Everything else is literal.

use serde::{Deserialize, Serialize};

/// A run of text within a block sharing one style.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Span {
    pub text: String,
    #[serde(default)]
    pub bold: bool,
    #[serde(default)]
    pub italic: bool,
}

impl Span {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            bold: false,
            italic: false,
        }
    }

    pub fn bold(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            bold: true,
            italic: false,
        }
    }

    pub fn italic(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            bold: false,
            italic: true,
        }
    }
}

/// One structural unit of parsed chapter text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Block {
    Heading { level: u8, text: String },
    Paragraph { spans: Vec<Span> },
    List { items: Vec<Vec<Span>> },
    Quote { spans: Vec<Span> },
}

/// Parse raw chapter text into an ordered block sequence.
///
/// Total function: empty input yields an empty sequence. Consecutive
/// non-blank, non-special lines merge into one paragraph; a heading, bullet
/// or quote line always terminates a buffered paragraph.
pub fn parse(raw: &str) -> Vec<Block> {
    let mut blocks = Vec::new();
    let mut paragraph: Vec<String> = Vec::new();
    let mut lines = raw.lines().peekable();

    while let Some(line) = lines.next() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            flush_paragraph(&mut paragraph, &mut blocks);
            continue;
        }

        if let Some((level, text)) = heading_line(trimmed) {
            flush_paragraph(&mut paragraph, &mut blocks);
            blocks.push(Block::Heading {
                level,
                text: collapse_spaces(text).trim().to_string(),
            });
            continue;
        }

        if let Some(item) = bullet_line(trimmed) {
            flush_paragraph(&mut paragraph, &mut blocks);
            let mut items = vec![parse_inline(item)];
            // Consume the whole run of bullet lines into one list.
            while let Some(next) = lines.peek() {
                match bullet_line(next.trim()) {
                    Some(text) => {
                        items.push(parse_inline(text));
                        lines.next();
                    }
                    None => break,
                }
            }
            blocks.push(Block::List { items });
            continue;
        }

        if let Some(rest) = trimmed.strip_prefix('>') {
            flush_paragraph(&mut paragraph, &mut blocks);
            blocks.push(Block::Quote {
                spans: parse_inline(rest.trim_start()),
            });
            continue;
        }

        paragraph.push(trimmed.to_string());
    }

    flush_paragraph(&mut paragraph, &mut blocks);
    blocks
}

fn flush_paragraph(buffer: &mut Vec<String>, blocks: &mut Vec<Block>) {
    if buffer.is_empty() {
        return;
    }
    let joined = buffer.join(" ");
    buffer.clear();
    let spans = parse_inline(&joined);
    if !spans.is_empty() {
        blocks.push(Block::Paragraph { spans });
    }
}

/// `^#{1,3}\s+text` – four or more hashes do not match and stay literal.
fn heading_line(line: &str) -> Option<(u8, &str)> {
    let hashes = line.chars().take_while(|&c| c == '#').count();
    if hashes == 0 || hashes > 3 {
        return None;
    }
    let rest = &line[hashes..];
    if !rest.starts_with(|c: char| c.is_whitespace()) {
        return None;
    }
    let text = rest.trim_start();
    if text.is_empty() {
        return None;
    }
    Some((hashes as u8, text))
}

fn bullet_line(line: &str) -> Option<&str> {
    let mut chars = line.char_indices();
    let (_, marker) = chars.next()?;
    if !matches!(marker, '*' | '-' | '+') {
        return None;
    }
    let (_, sep) = chars.next()?;
    if !sep.is_whitespace() {
        return None;
    }
    let rest = chars.next().map(|(i, _)| &line[i..]).unwrap_or("");
    Some(rest.trim_start())
}

/// Tokenize inline markers into styled spans.
///
/// Only fully-closed pairs match; a stray marker stays literal text. Internal
/// whitespace runs collapse to single spaces (leading/trailing spaces within a
/// span survive so adjacent spans keep their separation).
pub fn parse_inline(text: &str) -> Vec<Span> {
    let text = collapse_spaces(text);
    let chars: Vec<char> = text.chars().collect();
    let mut spans = Vec::new();
    let mut plain = String::new();
    let mut i = 0;

    while i < chars.len() {
        if let Some((inner, consumed, bold, italic)) = match_styled(&chars[i..]) {
            if !plain.is_empty() {
                spans.push(Span::plain(std::mem::take(&mut plain)));
            }
            spans.push(Span {
                text: inner,
                bold,
                italic,
            });
            i += consumed;
        } else {
            plain.push(chars[i]);
            i += 1;
        }
    }

    if !plain.is_empty() {
        spans.push(Span::plain(plain));
    }
    spans.retain(|s| !s.text.is_empty());
    spans
}

/// Match a closed `**…**`/`__…__`/`*…*`/`_…_`/`` `…` `` pair at the start of
/// `chars`. Returns (inner text, chars consumed, bold, italic).
fn match_styled(chars: &[char]) -> Option<(String, usize, bool, bool)> {
    let double = |marker: char| -> Option<(String, usize)> {
        if chars.len() < 5 || chars[0] != marker || chars[1] != marker {
            return None;
        }
        let mut j = 2;
        while j + 1 < chars.len() {
            if chars[j] == marker && chars[j + 1] == marker {
                if j == 2 {
                    return None;
                }
                let inner: String = chars[2..j].iter().collect();
                return Some((inner, j + 2));
            }
            j += 1;
        }
        None
    };

    let single = |marker: char| -> Option<(String, usize)> {
        if chars.len() < 3 || chars[0] != marker {
            return None;
        }
        let mut j = 1;
        while j < chars.len() {
            if chars[j] == marker {
                if j == 1 {
                    return None;
                }
                let inner: String = chars[1..j].iter().collect();
                return Some((inner, j + 1));
            }
            j += 1;
        }
        None
    };

    if let Some((inner, consumed)) = double('*').or_else(|| double('_')) {
        return Some((inner, consumed, true, false));
    }
    if let Some((inner, consumed)) = single('*').or_else(|| single('_')) {
        return Some((inner, consumed, false, true));
    }
    // Code spans are rendered as plain text, backticks dropped.
    if let Some((inner, consumed)) = single('`') {
        return Some((inner, consumed, false, false));
    }
    None
}

/// Collapse internal whitespace runs to single spaces without trimming the
/// ends of the string.
fn collapse_spaces(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_space = false;
    for ch in text.chars() {
        if ch.is_whitespace() {
            if !in_space {
                out.push(' ');
            }
            in_space = true;
        } else {
            out.push(ch);
            in_space = false;
        }
    }
    out
}

/// Drop leading heading/paragraph blocks that repeat the chapter title.
///
/// Both sides are normalized by stripping a leading `chapter N[:-.]` prefix
/// and collapsing to lowercase alphanumerics. Repeats of the title stacked at
/// the top are all removed; the scan stops at the first non-match or at any
/// list/quote block.
pub fn strip_leading_title(mut blocks: Vec<Block>, chapter_title: &str) -> Vec<Block> {
    let target = normalize_title(chapter_title);
    if target.is_empty() {
        return blocks;
    }

    let mut drop = 0;
    while drop < blocks.len() {
        let text = match &blocks[drop] {
            Block::Heading { text, .. } => text.clone(),
            Block::Paragraph { spans } => spans.iter().map(|s| s.text.as_str()).collect(),
            _ => break,
        };
        if normalize_title(&text) == target {
            drop += 1;
        } else {
            break;
        }
    }

    blocks.drain(..drop);
    blocks
}

/// Strip a leading `Chapter N[:-.]` prefix for display, preserving case.
/// `"Chapter 3: The Fall"` becomes `"The Fall"`; a bare `"Chapter 3"` is
/// returned unchanged.
pub fn display_title(title: &str) -> String {
    let trimmed = title.trim();
    let mut iter = trimmed.char_indices().peekable();
    for expected in "chapter".chars() {
        match iter.next() {
            Some((_, c)) if c.to_ascii_lowercase() == expected => {}
            _ => return trimmed.to_string(),
        }
    }
    while matches!(iter.peek(), Some((_, c)) if c.is_whitespace()) {
        iter.next();
    }
    let mut digits = 0;
    while matches!(iter.peek(), Some((_, c)) if c.is_ascii_digit()) {
        iter.next();
        digits += 1;
    }
    if digits == 0 {
        return trimmed.to_string();
    }
    while matches!(iter.peek(), Some(&(_, c)) if matches!(c, ':' | '-' | '.' | '–' | '—') || c.is_whitespace())
    {
        iter.next();
    }
    match iter.peek() {
        Some(&(offset, _)) => trimmed[offset..].to_string(),
        None => trimmed.to_string(),
    }
}

fn normalize_title(text: &str) -> String {
    let lower = text.to_lowercase();
    let mut rest = lower.trim();
    if let Some(after) = rest.strip_prefix("chapter") {
        let after_ws = after.trim_start();
        let digits = after_ws.trim_start_matches(|c: char| c.is_ascii_digit());
        if digits.len() < after_ws.len() {
            rest = digits.trim_start_matches([':', '-', '.', '–', '—']).trim();
        }
    }
    rest.chars().filter(|c| c.is_ascii_alphanumeric()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_yields_no_blocks() {
        assert!(parse("").is_empty());
        assert!(parse("   \n\n  ").is_empty());
    }

    #[test]
    fn plain_paragraphs_round_trip() {
        let blocks = parse("First group\nstill first.\n\nSecond group.");
        assert_eq!(blocks.len(), 2);
        match &blocks[0] {
            Block::Paragraph { spans } => {
                assert_eq!(spans.len(), 1);
                assert_eq!(spans[0].text, "First group still first.");
                assert!(!spans[0].bold && !spans[0].italic);
            }
            other => panic!("expected paragraph, got {other:?}"),
        }
    }

    #[test]
    fn bold_and_italic_scenario() {
        let blocks = parse("Hello **world**.\n\nSecond *paragraph*.");
        assert_eq!(blocks.len(), 2);
        match &blocks[0] {
            Block::Paragraph { spans } => {
                assert_eq!(
                    spans,
                    &vec![
                        Span::plain("Hello "),
                        Span::bold("world"),
                        Span::plain("."),
                    ]
                );
            }
            other => panic!("expected paragraph, got {other:?}"),
        }
        match &blocks[1] {
            Block::Paragraph { spans } => {
                assert!(spans
                    .iter()
                    .any(|s| s.italic && s.text == "paragraph"));
            }
            other => panic!("expected paragraph, got {other:?}"),
        }
    }

    #[test]
    fn heading_levels_capped_at_three() {
        let blocks = parse("# One\n## Two\n### Three\n#### Four");
        assert_eq!(
            blocks[0],
            Block::Heading {
                level: 1,
                text: "One".into()
            }
        );
        assert_eq!(
            blocks[1],
            Block::Heading {
                level: 2,
                text: "Two".into()
            }
        );
        assert_eq!(
            blocks[2],
            Block::Heading {
                level: 3,
                text: "Three".into()
            }
        );
        // Four hashes fail the heading pattern and fall through to a paragraph.
        match &blocks[3] {
            Block::Paragraph { spans } => assert_eq!(spans[0].text, "#### Four"),
            other => panic!("expected paragraph, got {other:?}"),
        }
    }

    #[test]
    fn bullet_run_becomes_one_list() {
        let blocks = parse("* alpha\n- beta\n+ gamma\nafter the list");
        assert_eq!(blocks.len(), 2);
        match &blocks[0] {
            Block::List { items } => {
                assert_eq!(items.len(), 3);
                assert_eq!(items[1][0].text, "beta");
            }
            other => panic!("expected list, got {other:?}"),
        }
        assert!(matches!(&blocks[1], Block::Paragraph { .. }));
    }

    #[test]
    fn quote_line() {
        let blocks = parse("> a borrowed thought");
        match &blocks[0] {
            Block::Quote { spans } => assert_eq!(spans[0].text, "a borrowed thought"),
            other => panic!("expected quote, got {other:?}"),
        }
    }

    #[test]
    fn heading_terminates_paragraph() {
        let blocks = parse("line one\n# Title\nline two");
        assert_eq!(blocks.len(), 3);
        assert!(matches!(&blocks[0], Block::Paragraph { .. }));
        assert!(matches!(&blocks[1], Block::Heading { .. }));
        assert!(matches!(&blocks[2], Block::Paragraph { .. }));
    }

    #[test]
    fn unmatched_marker_stays_literal() {
        let spans = parse_inline("a * stray star");
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].text, "a * stray star");
    }

    #[test]
    fn code_span_renders_plain() {
        let spans = parse_inline("run `press` now");
        assert_eq!(spans.len(), 3);
        assert_eq!(spans[1].text, "press");
        assert!(!spans[1].bold && !spans[1].italic);
    }

    #[test]
    fn double_underscore_is_bold() {
        let spans = parse_inline("__loud__ and _soft_");
        assert!(spans[0].bold);
        assert_eq!(spans[0].text, "loud");
        assert!(spans.iter().any(|s| s.italic && s.text == "soft"));
    }

    #[test]
    fn whitespace_collapses_inside_spans() {
        let spans = parse_inline("too   many\tspaces");
        assert_eq!(spans[0].text, "too many spaces");
    }

    #[test]
    fn strip_removes_repeated_title() {
        let blocks = parse("# Chapter 2: The Fall\nThe Fall\n\nReal text.");
        let stripped = strip_leading_title(blocks, "The Fall");
        assert_eq!(stripped.len(), 1);
        match &stripped[0] {
            Block::Paragraph { spans } => assert_eq!(spans[0].text, "Real text."),
            other => panic!("expected paragraph, got {other:?}"),
        }
    }

    #[test]
    fn strip_is_idempotent() {
        let blocks = parse("# The Fall\n\nBody text here.");
        let once = strip_leading_title(blocks, "Chapter 7 - The Fall");
        let twice = strip_leading_title(once.clone(), "Chapter 7 - The Fall");
        assert_eq!(once, twice);
    }

    #[test]
    fn strip_stops_at_non_text_block() {
        let blocks = parse("* The Fall\n\nBody.");
        let stripped = strip_leading_title(blocks.clone(), "The Fall");
        assert_eq!(stripped, blocks);
    }

    #[test]
    fn display_title_strips_prefix() {
        assert_eq!(display_title("Chapter 3: The Fall"), "The Fall");
        assert_eq!(display_title("chapter 12 — Embers"), "Embers");
        assert_eq!(display_title("Chapter 3"), "Chapter 3");
        assert_eq!(display_title("The Fall"), "The Fall");
    }
}
