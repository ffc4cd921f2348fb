//! Font catalog and text measurement using `ttf-parser`.
//!
//! Documents draw from a fixed catalog of three families mapped onto the PDF
//! base-14 faces. Widths come from an average-character heuristic per family;
//! when a real TTF face is loaded its glyph advances are used instead.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// The fixed family catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FontFamily {
    #[default]
    Helvetica,
    Times,
    Courier,
}

// Manifests may name fonts loosely ("serif", "mono"); resolve through
// `from_name` instead of the strict derive.
impl<'de> Deserialize<'de> for FontFamily {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let name = String::deserialize(deserializer)?;
        Ok(FontFamily::from_name(&name))
    }
}

impl FontFamily {
    pub fn as_str(&self) -> &'static str {
        match self {
            FontFamily::Helvetica => "Helvetica",
            FontFamily::Times => "Times",
            FontFamily::Courier => "Courier",
        }
    }

    /// Resolve a free-form family name, defaulting to Helvetica.
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_lowercase().as_str() {
            "times" | "times-roman" | "serif" => FontFamily::Times,
            "courier" | "mono" | "monospace" => FontFamily::Courier,
            _ => FontFamily::Helvetica,
        }
    }
}

/// The three logical font roles of a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FontRole {
    Title,
    Heading,
    Body,
}

/// Spans can be flagged both bold and italic; the bold face wins so a token
/// always maps to exactly one variant.
pub fn variant_flags(bold: bool, italic: bool) -> (bool, bool) {
    if bold {
        (true, false)
    } else {
        (false, italic)
    }
}

/// Per-role font configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FontChoice {
    pub family: FontFamily,
    pub size: f32,
    pub bold: bool,
}

impl FontChoice {
    pub fn new(family: FontFamily, size: f32, bold: bool) -> Self {
        Self { family, size, bold }
    }
}

impl Default for FontChoice {
    fn default() -> Self {
        Self {
            family: FontFamily::Helvetica,
            size: 11.0,
            bold: false,
        }
    }
}

/// A loaded font face with metrics.
#[derive(Clone)]
pub struct FontData {
    /// Raw font bytes (kept alive for ttf-parser's zero-copy API).
    pub bytes: Vec<u8>,
    pub units_per_em: f32,
    pub ascender: f32,
    pub descender: f32,
    pub line_gap: f32,
}

#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
pub struct FontKey {
    pub family: FontFamily,
    pub bold: bool,
    pub italic: bool,
}

/// Manages loaded fonts.
pub struct FontManager {
    fonts: HashMap<FontKey, FontData>,
    /// Fallback metrics if no font is loaded for a key.
    default_key: FontKey,
}

impl FontManager {
    pub fn new() -> Self {
        Self {
            fonts: HashMap::new(),
            default_key: FontKey {
                family: FontFamily::Helvetica,
                bold: false,
                italic: false,
            },
        }
    }

    /// Load a TTF/OTF face from bytes for accurate advances.
    pub fn load_font(
        &mut self,
        family: FontFamily,
        bold: bool,
        italic: bool,
        bytes: Vec<u8>,
    ) -> Result<()> {
        let face = ttf_parser::Face::parse(&bytes, 0)
            .map_err(|e| Error::Font(format!("failed to parse font: {e}")))?;

        let data = FontData {
            units_per_em: face.units_per_em() as f32,
            ascender: face.ascender() as f32,
            descender: face.descender() as f32,
            line_gap: face.line_gap() as f32,
            bytes,
        };

        self.fonts.insert(
            FontKey {
                family,
                bold,
                italic,
            },
            data,
        );
        Ok(())
    }

    /// Register synthetic metrics for the builtin catalog (regular and bold
    /// of every family). These carry no bytes, so measurement falls back to
    /// the per-family heuristic.
    pub fn ensure_defaults(&mut self) {
        for family in [FontFamily::Helvetica, FontFamily::Times, FontFamily::Courier] {
            for bold in [false, true] {
                let key = FontKey {
                    family,
                    bold,
                    italic: false,
                };
                self.fonts.entry(key).or_insert(FontData {
                    bytes: Vec::new(),
                    units_per_em: 1000.0,
                    ascender: 750.0,
                    descender: -250.0,
                    line_gap: 0.0,
                });
            }
        }
    }

    /// Get font data for a key, falling back to the default.
    pub fn get(&self, key: &FontKey) -> &FontData {
        self.fonts
            .get(key)
            .unwrap_or_else(|| self.fonts.get(&self.default_key).expect("no fonts loaded"))
    }

    /// Average glyph advance as a fraction of font size, per builtin family.
    /// Courier is monospaced; bold proportional faces run ~10 % wider.
    fn heuristic_advance(family: FontFamily, bold: bool) -> f32 {
        match family {
            FontFamily::Helvetica => {
                if bold {
                    0.55
                } else {
                    0.5
                }
            }
            FontFamily::Times => {
                if bold {
                    0.52
                } else {
                    0.48
                }
            }
            FontFamily::Courier => 0.6,
        }
    }

    /// Measure the width of a string at a given font size (in points).
    pub fn measure_text_width(
        &self,
        text: &str,
        font_size: f32,
        bold: bool,
        italic: bool,
        family: FontFamily,
    ) -> f32 {
        let key = FontKey {
            family,
            bold,
            italic,
        };
        let data = self.get(&key);

        if data.bytes.is_empty() {
            let avg = Self::heuristic_advance(family, bold);
            return text.chars().count() as f32 * font_size * avg;
        }

        // Parse the face and sum horizontal advances.
        if let Ok(face) = ttf_parser::Face::parse(&data.bytes, 0) {
            let scale = font_size / data.units_per_em;
            let mut width = 0.0f32;
            for ch in text.chars() {
                if let Some(gid) = face.glyph_index(ch) {
                    let advance = face.glyph_hor_advance(gid).unwrap_or(0);
                    width += advance as f32 * scale;
                } else {
                    width += font_size * 0.5;
                }
            }
            width
        } else {
            text.chars().count() as f32 * font_size * 0.5
        }
    }

    /// Measure the line height in points.
    pub fn line_height_px(&self, font_size: f32, line_height_factor: f32) -> f32 {
        font_size * line_height_factor
    }

    /// Get the ascender in points for the given font.
    pub fn ascender_px(&self, font_size: f32, bold: bool, italic: bool, family: FontFamily) -> f32 {
        let key = FontKey {
            family,
            bold,
            italic,
        };
        let data = self.get(&key);
        let scale = font_size / data.units_per_em;
        data.ascender * scale
    }
}

impl Default for FontManager {
    fn default() -> Self {
        let mut mgr = Self::new();
        mgr.ensure_defaults();
        mgr
    }
}

/// The resolved font set for one document build: a choice per role over one
/// shared manager. At most 3 families × 3 variants, deduplicated by key.
pub struct FontSet {
    pub title: FontChoice,
    pub heading: FontChoice,
    pub body: FontChoice,
    manager: FontManager,
}

impl FontSet {
    pub fn new(title: FontChoice, heading: FontChoice, body: FontChoice) -> Self {
        Self {
            title,
            heading,
            body,
            manager: FontManager::default(),
        }
    }

    pub fn manager(&self) -> &FontManager {
        &self.manager
    }

    pub fn choice(&self, role: FontRole) -> &FontChoice {
        match role {
            FontRole::Title => &self.title,
            FontRole::Heading => &self.heading,
            FontRole::Body => &self.body,
        }
    }

    /// Measure text in a role's family. Style flags are combined with the
    /// role's base bold flag and collapsed to one face.
    pub fn measure(&self, role: FontRole, text: &str, size: f32, bold: bool, italic: bool) -> f32 {
        let choice = self.choice(role);
        let (bold, italic) = variant_flags(bold || choice.bold, italic);
        self.manager
            .measure_text_width(text, size, bold, italic, choice.family)
    }
}

impl Default for FontSet {
    fn default() -> Self {
        Self::new(
            FontChoice::new(FontFamily::Times, 34.0, true),
            FontChoice::new(FontFamily::Helvetica, 17.0, true),
            FontChoice::new(FontFamily::Helvetica, 11.0, false),
        )
    }
}

/// Word-wrap plain text in a role's font to fit `max_width`. Blank source
/// lines are preserved as empty output lines.
pub fn wrap_plain(
    text: &str,
    role: FontRole,
    size: f32,
    max_width: f32,
    fonts: &FontSet,
) -> Vec<String> {
    if max_width <= 0.0 || text.is_empty() {
        return vec![text.to_string()];
    }

    let mut lines: Vec<String> = Vec::new();
    for paragraph in text.split('\n') {
        let words: Vec<&str> = paragraph.split_whitespace().collect();
        if words.is_empty() {
            lines.push(String::new());
            continue;
        }

        let mut current_line = String::new();
        for word in &words {
            let candidate = if current_line.is_empty() {
                word.to_string()
            } else {
                format!("{} {}", current_line, word)
            };
            let w = fonts.measure(role, &candidate, size, false, false);
            if w > max_width && !current_line.is_empty() {
                lines.push(current_line);
                current_line = word.to_string();
            } else {
                current_line = candidate;
            }
        }
        if !current_line.is_empty() {
            lines.push(current_line);
        }
    }

    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}
