//! Rich-text line breaking – splits styled spans into measured tokens and
//! greedily packs them into lines.

use crate::fonts::{variant_flags, FontRole, FontSet};
use crate::markup::Span;

/// One measured run on a line: a word or a whitespace gap, carrying the face
/// flags it resolves to.
#[derive(Debug, Clone)]
pub struct StyledToken {
    pub text: String,
    pub bold: bool,
    pub italic: bool,
    pub width: f32,
    pub whitespace: bool,
}

/// An ordered list of styled tokens fitting one line.
#[derive(Debug, Clone, Default)]
pub struct Line {
    pub tokens: Vec<StyledToken>,
}

impl Line {
    pub fn width(&self) -> f32 {
        self.tokens.iter().map(|t| t.width).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Concatenated token text, for tests and debugging.
    pub fn text(&self) -> String {
        self.tokens.iter().map(|t| t.text.as_str()).collect()
    }
}

/// Greedily wrap styled spans into lines no wider than `max_width`.
///
/// Whitespace is preserved as its own token type but never starts a line,
/// and trailing whitespace is trimmed when a line closes. A single token
/// wider than `max_width` stands alone on its own line; there is no
/// mid-word breaking.
pub fn wrap(
    spans: &[Span],
    role: FontRole,
    size: f32,
    max_width: f32,
    fonts: &FontSet,
) -> Vec<Line> {
    wrap_shaped(spans, role, size, &LineWidths::uniform(max_width), fonts)
}

/// Per-line width schedule. The first `narrow_count` lines use
/// `narrow_width`; the rest use `width`. A uniform schedule has
/// `narrow_count == 0`.
#[derive(Debug, Clone, Copy)]
pub struct LineWidths {
    pub width: f32,
    pub narrow_width: f32,
    pub narrow_count: usize,
}

impl LineWidths {
    pub fn uniform(width: f32) -> Self {
        Self {
            width,
            narrow_width: width,
            narrow_count: 0,
        }
    }

    /// Narrow first lines, as used to flow text around a drop cap.
    pub fn indented(narrow_width: f32, narrow_count: usize, width: f32) -> Self {
        Self {
            width,
            narrow_width,
            narrow_count,
        }
    }

    fn for_line(&self, index: usize) -> f32 {
        if index < self.narrow_count {
            self.narrow_width
        } else {
            self.width
        }
    }
}

/// Greedy wrap with a per-line width schedule.
pub fn wrap_shaped(
    spans: &[Span],
    role: FontRole,
    size: f32,
    widths: &LineWidths,
    fonts: &FontSet,
) -> Vec<Line> {
    let tokens = tokenize(spans, role, size, fonts);
    let mut lines: Vec<Line> = Vec::new();
    let mut current = Line::default();
    let mut current_width = 0.0f32;

    for token in tokens {
        if token.whitespace {
            if current.is_empty() {
                continue;
            }
            current_width += token.width;
            current.tokens.push(token);
            continue;
        }

        let max_width = widths.for_line(lines.len());
        if current_width + token.width > max_width && !current.is_empty() {
            close_line(&mut current, &mut lines);
            current_width = 0.0;
        }
        current_width += token.width;
        current.tokens.push(token);
    }

    if !current.is_empty() {
        close_line(&mut current, &mut lines);
    }
    lines
}

fn close_line(current: &mut Line, lines: &mut Vec<Line>) {
    while current.tokens.last().is_some_and(|t| t.whitespace) {
        current.tokens.pop();
    }
    if !current.tokens.is_empty() {
        lines.push(std::mem::take(current));
    }
}

/// Flatten spans into measured word/whitespace tokens. Each token's face is
/// its span's style combined with the role's base bold flag, collapsed so
/// bold wins over italic.
fn tokenize(spans: &[Span], role: FontRole, size: f32, fonts: &FontSet) -> Vec<StyledToken> {
    let choice = fonts.choice(role);
    let mut tokens = Vec::new();

    for span in spans {
        let (bold, italic) = variant_flags(span.bold || choice.bold, span.italic);
        for (text, whitespace) in split_runs(&span.text) {
            let width = fonts
                .manager()
                .measure_text_width(&text, size, bold, italic, choice.family);
            tokens.push(StyledToken {
                text,
                bold,
                italic,
                width,
                whitespace,
            });
        }
    }
    tokens
}

fn split_runs(text: &str) -> Vec<(String, bool)> {
    let mut runs: Vec<(String, bool)> = Vec::new();
    for ch in text.chars() {
        let ws = ch.is_whitespace();
        match runs.last_mut() {
            Some((run, last_ws)) if *last_ws == ws => run.push(ch),
            _ => runs.push((ch.to_string(), ws)),
        }
    }
    runs
}
