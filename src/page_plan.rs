//! Document plan – the intermediate representation between composition and
//! PDF rendering. This is the "frozen" structure that encodes exactly what
//! goes on each page, plus the page-metadata log the deferred table-of-
//! contents and footer passes consume.
//!
//! Coordinates are PDF points with the origin at the bottom-left of the
//! page. Text positions are baselines; rectangles and images are anchored at
//! their bottom-left corner.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::fonts::FontFamily;

/// A complete laid-out document ready for rendering.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentPlan {
    /// Document title embedded in the PDF metadata.
    #[serde(default = "DocumentPlan::default_title")]
    pub title: String,
    /// Width of each page in PDF points (1 pt = 1/72 inch).
    pub page_width: f32,
    /// Height of each page in PDF points.
    pub page_height: f32,
    /// Ordered list of pages.
    pub pages: Vec<PagePlan>,
    /// Append-only page-metadata log, in page creation order.
    pub records: Vec<PageRecord>,
    /// Chapter entries resolved during composition.
    pub toc: Vec<TocEntry>,
}

impl DocumentPlan {
    pub fn new(title: &str, page_width: f32, page_height: f32) -> Self {
        Self {
            title: if title.trim().is_empty() {
                Self::default_title()
            } else {
                title.to_string()
            },
            page_width,
            page_height,
            pages: Vec::new(),
            records: Vec::new(),
            toc: Vec::new(),
        }
    }

    fn default_title() -> String {
        "bookpress output".to_string()
    }

    /// Serialise to JSON.
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_default()
    }

    /// Deserialise from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// One page of content.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PagePlan {
    pub index: usize,
    /// Draw items in painting order (earlier items render underneath).
    pub items: Vec<DrawItem>,
}

/// A single drawing operation on a page.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum DrawItem {
    /// Filled rectangle anchored at its bottom-left corner.
    #[serde(rename_all = "camelCase")]
    Rect {
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        color: [f32; 3],
    },
    /// Stroked line segment.
    #[serde(rename_all = "camelCase")]
    Rule {
        x1: f32,
        y1: f32,
        x2: f32,
        y2: f32,
        width: f32,
        color: [f32; 3],
    },
    /// A text run; `y` is the baseline.
    #[serde(rename_all = "camelCase")]
    Text {
        x: f32,
        y: f32,
        text: String,
        family: FontFamily,
        size: f32,
        bold: bool,
        italic: bool,
        color: [f32; 3],
    },
    /// An embedded image, anchored at its bottom-left corner and scaled to
    /// `width` × `height` points.
    #[serde(rename_all = "camelCase")]
    Image {
        asset_id: String,
        x: f32,
        y: f32,
        width: f32,
        height: f32,
    },
}

/// What a page is for. Drives the deferred footer and TOC passes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageRole {
    Cover,
    Gallery,
    Toc,
    Chapter,
}

/// Bookkeeping entry for one created page.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageRecord {
    pub page_index: usize,
    pub role: PageRole,
    #[serde(default)]
    pub chapter_title: Option<String>,
}

/// A table-of-contents row: chapter title plus its 1-based page number in
/// the post-cover numbering space.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TocEntry {
    pub title: String,
    pub page_number: usize,
}
