//! Theme resolver – maps a preset key to a concrete palette and spacing
//! multipliers. Presets are process-wide immutable tables; unknown keys fall
//! back to the first preset.

use serde::{Deserialize, Serialize};

/// RGBA color, components in 0.0–1.0.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const BLACK: Self = Self {
        r: 0.0,
        g: 0.0,
        b: 0.0,
        a: 1.0,
    };
    pub const WHITE: Self = Self {
        r: 1.0,
        g: 1.0,
        b: 1.0,
        a: 1.0,
    };

    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    pub fn is_transparent(&self) -> bool {
        self.a < 0.001
    }

    /// Components as the `[r, g, b]` array carried by draw items.
    pub fn to_rgb_array(&self) -> [f32; 3] {
        [self.r, self.g, self.b]
    }

    pub fn from_hex(hex: &str) -> Option<Self> {
        let hex = hex.trim_start_matches('#');
        if hex.len() == 6 {
            let r = u8::from_str_radix(&hex[0..2], 16).ok()? as f32 / 255.0;
            let g = u8::from_str_radix(&hex[2..4], 16).ok()? as f32 / 255.0;
            let b = u8::from_str_radix(&hex[4..6], 16).ok()? as f32 / 255.0;
            Some(Self { r, g, b, a: 1.0 })
        } else if hex.len() == 3 {
            let r = u8::from_str_radix(&hex[0..1].repeat(2), 16).ok()? as f32 / 255.0;
            let g = u8::from_str_radix(&hex[1..2].repeat(2), 16).ok()? as f32 / 255.0;
            let b = u8::from_str_radix(&hex[2..3].repeat(2), 16).ok()? as f32 / 255.0;
            Some(Self { r, g, b, a: 1.0 })
        } else {
            None
        }
    }
}

/// The ten named colors a theme provides.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Palette {
    pub page_background: Color,
    pub cover_background: Color,
    pub cover_title: Color,
    pub cover_subtitle: Color,
    pub heading: Color,
    pub body: Color,
    pub quote: Color,
    pub caption: Color,
    pub accent: Color,
    pub footer: Color,
}

/// A resolved visual theme: palette plus spacing multipliers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Theme {
    pub name: &'static str,
    pub palette: Palette,
    /// Line height as a multiple of font size.
    pub line_height: f32,
    /// Gap between blocks as a multiple of the body font size.
    pub paragraph_spacing: f32,
}

/// Warm cream pages with a burgundy cover and sienna accents.
pub const CLASSIC: Theme = Theme {
    name: "classic",
    palette: Palette {
        page_background: Color::rgb(0.980, 0.965, 0.933),
        cover_background: Color::rgb(0.290, 0.122, 0.141),
        cover_title: Color::rgb(0.961, 0.914, 0.851),
        cover_subtitle: Color::rgb(0.851, 0.761, 0.659),
        heading: Color::rgb(0.239, 0.169, 0.122),
        body: Color::rgb(0.169, 0.137, 0.125),
        quote: Color::rgb(0.420, 0.341, 0.267),
        caption: Color::rgb(0.478, 0.416, 0.345),
        accent: Color::rgb(0.639, 0.333, 0.184),
        footer: Color::rgb(0.541, 0.478, 0.400),
    },
    line_height: 1.45,
    paragraph_spacing: 0.6,
};

/// Cool grays and steel blue.
pub const SLATE: Theme = Theme {
    name: "slate",
    palette: Palette {
        page_background: Color::rgb(0.957, 0.965, 0.973),
        cover_background: Color::rgb(0.122, 0.161, 0.200),
        cover_title: Color::rgb(0.910, 0.929, 0.949),
        cover_subtitle: Color::rgb(0.624, 0.702, 0.784),
        heading: Color::rgb(0.141, 0.231, 0.325),
        body: Color::rgb(0.153, 0.196, 0.239),
        quote: Color::rgb(0.282, 0.396, 0.506),
        caption: Color::rgb(0.384, 0.490, 0.596),
        accent: Color::rgb(0.180, 0.498, 0.722),
        footer: Color::rgb(0.510, 0.604, 0.694),
    },
    line_height: 1.4,
    paragraph_spacing: 0.55,
};

/// Sepia tones with antique gold accents.
pub const VINTAGE: Theme = Theme {
    name: "vintage",
    palette: Palette {
        page_background: Color::rgb(0.953, 0.918, 0.847),
        cover_background: Color::rgb(0.227, 0.184, 0.137),
        cover_title: Color::rgb(0.918, 0.851, 0.690),
        cover_subtitle: Color::rgb(0.788, 0.694, 0.494),
        heading: Color::rgb(0.290, 0.231, 0.157),
        body: Color::rgb(0.235, 0.204, 0.165),
        quote: Color::rgb(0.463, 0.376, 0.247),
        caption: Color::rgb(0.541, 0.451, 0.314),
        accent: Color::rgb(0.592, 0.455, 0.165),
        footer: Color::rgb(0.576, 0.514, 0.373),
    },
    line_height: 1.5,
    paragraph_spacing: 0.7,
};

/// Theme preset key. Unrecognized manifest values fall back to `Classic`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ThemeChoice {
    #[default]
    Classic,
    Slate,
    Vintage,
}

// Deserialized by hand so a manifest with an unknown theme key still renders
// instead of failing the whole parse.
impl<'de> serde::Deserialize<'de> for ThemeChoice {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let key = String::deserialize(deserializer)?;
        Ok(ThemeChoice::from_key(&key))
    }
}

impl ThemeChoice {
    pub fn theme(&self) -> &'static Theme {
        match self {
            ThemeChoice::Classic => &CLASSIC,
            ThemeChoice::Slate => &SLATE,
            ThemeChoice::Vintage => &VINTAGE,
        }
    }

    /// Resolve a free-form key, falling back to the default preset.
    pub fn from_key(key: &str) -> Self {
        match key.trim().to_lowercase().as_str() {
            "classic" => ThemeChoice::Classic,
            "slate" => ThemeChoice::Slate,
            "vintage" => ThemeChoice::Vintage,
            other => {
                if !other.is_empty() {
                    log::debug!("unknown theme `{other}`, using classic");
                }
                ThemeChoice::Classic
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_parsing() {
        let c = Color::from_hex("#ff8000").unwrap();
        assert!((c.r - 1.0).abs() < 0.001);
        assert!((c.g - 0.502).abs() < 0.01);
        let short = Color::from_hex("fff").unwrap();
        assert_eq!(short, Color::WHITE);
        assert!(Color::from_hex("nope").is_none());
    }

    #[test]
    fn unknown_key_falls_back_to_classic() {
        assert_eq!(ThemeChoice::from_key("neon"), ThemeChoice::Classic);
        assert_eq!(ThemeChoice::from_key(""), ThemeChoice::Classic);
        assert_eq!(ThemeChoice::from_key("Vintage"), ThemeChoice::Vintage);
    }

    #[test]
    fn unknown_key_deserializes_to_classic() {
        let choice: ThemeChoice = serde_json::from_str("\"neon\"").unwrap();
        assert_eq!(choice, ThemeChoice::Classic);
        let choice: ThemeChoice = serde_json::from_str("\"slate\"").unwrap();
        assert_eq!(choice, ThemeChoice::Slate);
        // Round trip: Serialize emits the lowercase key from_key accepts.
        let json = serde_json::to_string(&ThemeChoice::Vintage).unwrap();
        assert_eq!(serde_json::from_str::<ThemeChoice>(&json).unwrap(), ThemeChoice::Vintage);
    }

    #[test]
    fn presets_are_distinct() {
        assert_ne!(CLASSIC.palette.accent, SLATE.palette.accent);
        assert_ne!(
            SLATE.palette.page_background,
            VINTAGE.palette.page_background
        );
    }

    #[test]
    fn default_choice_is_first_preset() {
        assert_eq!(ThemeChoice::default().theme().name, "classic");
    }
}
