//! Pagination – a descending-cursor page composer.
//!
//! The composer owns a [`DocumentPlan`] and a write cursor `y` measured in
//! points from the bottom of the current page. Content flows downward from
//! the top margin; when a block does not fit above the bottom margin the
//! composer opens a continuation page that repeats the chapter chrome
//! (accent strip plus running label) without the full chapter banner.
//!
//! Two passes are deferred until the rest of the document is laid out:
//! table-of-contents rows are written into pages reserved up front, and
//! footers are stamped once the final page count is known. Both passes are
//! idempotent.

use serde::{Deserialize, Serialize};

use crate::compose::RenderOptions;
use crate::fonts::{variant_flags, FontRole, FontSet};
use crate::images::ImageAsset;
use crate::page_plan::{DocumentPlan, DrawItem, PagePlan, PageRecord, PageRole, TocEntry};
use crate::style::{Color, Theme};

/// Height of the accent strip drawn on chapter continuation pages.
const STRIP_HEIGHT: f32 = 3.0;
/// Size of the uppercase running label next to the strip.
const RUNNING_LABEL_SIZE: f32 = 8.5;
/// Footer page-number size.
const FOOTER_SIZE: f32 = 9.0;
/// Footer running-title size.
const FOOTER_LABEL_SIZE: f32 = 8.0;
/// Caption text size under anchored images.
const CAPTION_SIZE: f32 = 9.5;
/// Vertical room kept under an image for its caption line.
const CAPTION_ALLOWANCE: f32 = 26.0;
/// Gap after an image without a caption.
const IMAGE_GAP: f32 = 14.0;
/// Size of the "Contents" heading.
const TOC_HEADING_SIZE: f32 = 22.0;
/// Vertical room the contents heading and its rule occupy.
const TOC_HEADING_ALLOWANCE: f32 = 56.0;
/// Size of a contents row.
const TOC_ENTRY_SIZE: f32 = 11.5;
/// Row pitch of the contents table.
const TOC_ROW_HEIGHT: f32 = 22.0;
/// Size of the "CHAPTER N" eyebrow line.
const EYEBROW_SIZE: f32 = 10.0;
/// Length of the decorative rule under a chapter banner.
const BANNER_RULE_LEN: f32 = 64.0;

/// Page margins in points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Margins {
    pub top: f32,
    pub bottom: f32,
    pub left: f32,
    pub right: f32,
}

impl Default for Margins {
    fn default() -> Self {
        Margins {
            top: 72.0,
            bottom: 60.0,
            left: 72.0,
            right: 60.0,
        }
    }
}

/// Horizontal alignment for single-line text helpers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Left,
    Center,
    Right,
}

/// Flows content onto pages and records draw items in a [`DocumentPlan`].
pub struct PageComposer<'a> {
    plan: DocumentPlan,
    theme: &'a Theme,
    fonts: &'a FontSet,
    margins: Margins,
    page_numbers: bool,
    /// Write cursor: distance from the page bottom to the next free line top.
    y: f32,
    /// Index of the page currently receiving content.
    current: Option<usize>,
    /// Pages reserved for the table of contents, in order.
    toc_pages: Vec<usize>,
    toc_filled: bool,
    footers_stamped: bool,
}

impl<'a> PageComposer<'a> {
    pub fn new(title: &str, options: &RenderOptions, theme: &'a Theme, fonts: &'a FontSet) -> Self {
        let (width, height) = options.page_size.dimensions();
        PageComposer {
            plan: DocumentPlan::new(title, width, height),
            theme,
            fonts,
            margins: options.margins,
            page_numbers: options.page_numbers,
            y: 0.0,
            current: None,
            toc_pages: Vec::new(),
            toc_filled: false,
            footers_stamped: false,
        }
    }

    pub fn page_width(&self) -> f32 {
        self.plan.page_width
    }

    pub fn page_height(&self) -> f32 {
        self.plan.page_height
    }

    pub fn margins(&self) -> Margins {
        self.margins
    }

    pub fn content_width(&self) -> f32 {
        self.plan.page_width - self.margins.left - self.margins.right
    }

    pub fn content_height(&self) -> f32 {
        self.plan.page_height - self.margins.top - self.margins.bottom
    }

    /// Current cursor position, measured from the page bottom.
    pub fn cursor(&self) -> f32 {
        self.y
    }

    pub fn page_count(&self) -> usize {
        self.plan.pages.len()
    }

    pub fn plan(&self) -> &DocumentPlan {
        &self.plan
    }

    pub fn into_plan(self) -> DocumentPlan {
        self.plan
    }

    /// Opens a fresh page, paints its background and resets the cursor to
    /// the top margin. Returns the page index.
    pub fn start_page(&mut self, role: PageRole, chapter_title: Option<&str>) -> usize {
        let index = self.plan.pages.len();
        self.plan.pages.push(PagePlan {
            index,
            items: Vec::new(),
        });
        self.plan.records.push(PageRecord {
            page_index: index,
            role,
            chapter_title: chapter_title.map(str::to_string),
        });

        let background = match role {
            PageRole::Cover => self.theme.palette.cover_background,
            _ => self.theme.palette.page_background,
        };
        if !background.is_transparent() {
            let (w, h) = (self.plan.page_width, self.plan.page_height);
            self.plan.pages[index].items.push(DrawItem::Rect {
                x: 0.0,
                y: 0.0,
                width: w,
                height: h,
                color: background.to_rgb_array(),
            });
        }

        self.current = Some(index);
        self.y = self.plan.page_height - self.margins.top;
        index
    }

    /// Opens a continuation page carrying the same role and chapter title
    /// as the current page. Chapter continuations get the accent strip and
    /// running label; the full banner stays on the chapter's first page.
    fn continuation_page(&mut self) {
        let (role, chapter) = match self.current {
            Some(index) => {
                let record = &self.plan.records[index];
                (record.role, record.chapter_title.clone())
            }
            None => (PageRole::Chapter, None),
        };
        self.start_page(role, chapter.as_deref());

        if role == PageRole::Chapter {
            let top = self.plan.page_height - self.margins.top;
            let accent = self.theme.palette.accent;
            self.push_item(DrawItem::Rect {
                x: self.margins.left,
                y: top + 18.0,
                width: self.content_width(),
                height: STRIP_HEIGHT,
                color: accent.to_rgb_array(),
            });
            if let Some(name) = chapter {
                let label = name.to_uppercase();
                let width =
                    self.fonts
                        .measure(FontRole::Body, &label, RUNNING_LABEL_SIZE, false, false);
                let x = self.plan.page_width - self.margins.right - width;
                let item = self.text_item(
                    x,
                    top + 18.0 + STRIP_HEIGHT + 6.0,
                    &label,
                    FontRole::Body,
                    RUNNING_LABEL_SIZE,
                    false,
                    false,
                    self.theme.palette.caption,
                );
                self.push_item(item);
            }
        }
    }

    /// Guarantees at least `needed` points of vertical room above the bottom
    /// margin, opening a continuation page when necessary.
    pub fn ensure_space(&mut self, needed: f32) {
        if self.current.is_none() {
            self.start_page(PageRole::Chapter, None);
            return;
        }
        if self.y - needed < self.margins.bottom {
            self.continuation_page();
        }
    }

    /// Moves the cursor down. Never opens a page by itself.
    pub fn advance(&mut self, dy: f32) {
        self.y -= dy;
    }

    fn push_item(&mut self, item: DrawItem) {
        let index = match self.current {
            Some(index) => index,
            None => self.start_page(PageRole::Chapter, None),
        };
        self.plan.pages[index].items.push(item);
    }

    fn push_to(&mut self, page: usize, item: DrawItem) {
        self.plan.pages[page].items.push(item);
    }

    /// Builds a text item with the face resolved from role plus extra flags.
    #[allow(clippy::too_many_arguments)]
    fn text_item(
        &self,
        x: f32,
        baseline: f32,
        text: &str,
        role: FontRole,
        size: f32,
        bold: bool,
        italic: bool,
        color: Color,
    ) -> DrawItem {
        let choice = self.fonts.choice(role);
        let (bold, italic) = variant_flags(bold || choice.bold, italic);
        DrawItem::Text {
            x,
            y: baseline,
            text: text.to_string(),
            family: choice.family,
            size,
            bold,
            italic,
            color: color.to_rgb_array(),
        }
    }

    /// Places text at an explicit position without touching the cursor.
    #[allow(clippy::too_many_arguments)]
    pub fn draw_text_at(
        &mut self,
        x: f32,
        baseline: f32,
        text: &str,
        role: FontRole,
        size: f32,
        bold: bool,
        italic: bool,
        color: Color,
    ) {
        let item = self.text_item(x, baseline, text, role, size, bold, italic, color);
        self.push_item(item);
    }

    pub fn draw_rect(&mut self, x: f32, y: f32, width: f32, height: f32, color: Color) {
        self.push_item(DrawItem::Rect {
            x,
            y,
            width,
            height,
            color: color.to_rgb_array(),
        });
    }

    #[allow(clippy::too_many_arguments)]
    pub fn draw_rule(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, width: f32, color: Color) {
        self.push_item(DrawItem::Rule {
            x1,
            y1,
            x2,
            y2,
            width,
            color: color.to_rgb_array(),
        });
    }

    pub fn draw_image_at(&mut self, asset_id: &str, x: f32, y: f32, width: f32, height: f32) {
        self.push_item(DrawItem::Image {
            asset_id: asset_id.to_string(),
            x,
            y,
            width,
            height,
        });
    }

    /// Writes one line at the cursor and advances by the themed line height.
    #[allow(clippy::too_many_arguments)]
    pub fn draw_styled_line(
        &mut self,
        text: &str,
        role: FontRole,
        size: f32,
        bold: bool,
        italic: bool,
        color: Color,
        align: Align,
        indent: f32,
    ) {
        let choice = self.fonts.choice(role);
        let manager = self.fonts.manager();
        let (face_bold, face_italic) = variant_flags(bold || choice.bold, italic);
        let line_height = manager.line_height_px(size, self.theme.line_height);
        let ascent = manager.ascender_px(size, face_bold, face_italic, choice.family);
        let width = manager.measure_text_width(text, size, face_bold, face_italic, choice.family);
        let x = match align {
            Align::Left => self.margins.left + indent,
            Align::Center => self.margins.left + (self.content_width() - width) / 2.0,
            Align::Right => self.plan.page_width - self.margins.right - width,
        };
        let baseline = self.y - ascent;
        let item = self.text_item(x, baseline, text, role, size, bold, italic, color);
        self.push_item(item);
        self.y -= line_height;
    }

    pub fn draw_plain_line(
        &mut self,
        text: &str,
        role: FontRole,
        size: f32,
        color: Color,
        align: Align,
        indent: f32,
    ) {
        self.draw_styled_line(text, role, size, false, false, color, align, indent);
    }

    /// Writes one wrapped rich-text line at the cursor. Tokens carry their
    /// own face flags and pre-measured widths; whitespace tokens advance the
    /// pen without emitting text.
    pub fn draw_rich_line(
        &mut self,
        line: &crate::linebreak::Line,
        role: FontRole,
        size: f32,
        color: Color,
        indent: f32,
    ) {
        let choice = self.fonts.choice(role);
        let manager = self.fonts.manager();
        let line_height = manager.line_height_px(size, self.theme.line_height);
        let ascent = manager.ascender_px(size, choice.bold, false, choice.family);
        let baseline = self.y - ascent;

        let mut x = self.margins.left + indent;
        let mut items = Vec::new();
        for token in &line.tokens {
            if !token.whitespace {
                items.push(self.text_item(
                    x,
                    baseline,
                    &token.text,
                    role,
                    size,
                    token.bold,
                    token.italic,
                    color,
                ));
            }
            x += token.width;
        }
        for item in items {
            self.push_item(item);
        }
        self.y -= line_height;
    }

    /// Shortens `text` with a trailing ellipsis until it fits `max_width`.
    pub fn truncate_to_width(
        &self,
        text: &str,
        role: FontRole,
        size: f32,
        max_width: f32,
    ) -> String {
        if self.fonts.measure(role, text, size, false, false) <= max_width {
            return text.to_string();
        }
        let mut kept = text.to_string();
        while kept.pop().is_some() {
            let candidate = format!("{}\u{2026}", kept.trim_end());
            if self.fonts.measure(role, &candidate, size, false, false) <= max_width {
                return candidate;
            }
        }
        String::from("\u{2026}")
    }

    /// Opens the chapter's first page, records its table-of-contents entry
    /// and draws the banner: eyebrow, wrapped title, decorative rule.
    pub fn begin_chapter(&mut self, number: usize, display_title: &str) -> usize {
        let page = self.start_page(PageRole::Chapter, Some(display_title));

        // Page numbering starts after the cover, so the printed number is
        // the count of non-cover pages so far.
        let cover_pages = self
            .plan
            .records
            .iter()
            .filter(|r| r.role == PageRole::Cover)
            .count();
        let page_number = self.plan.records.len() - cover_pages;
        self.plan.toc.push(TocEntry {
            title: display_title.to_string(),
            page_number,
        });

        let accent = self.theme.palette.accent;
        let heading_color = self.theme.palette.heading;

        self.advance(6.0);
        let eyebrow = format!("CHAPTER {number}");
        self.draw_styled_line(
            &eyebrow,
            FontRole::Body,
            EYEBROW_SIZE,
            true,
            false,
            accent,
            Align::Left,
            0.0,
        );

        let title_choice = self.fonts.choice(FontRole::Title);
        let heading_size = self.fonts.choice(FontRole::Heading).size;
        let banner_size = (title_choice.size * 0.66).max(heading_size);
        self.advance(banner_size * 0.35);
        let lines = crate::fonts::wrap_plain(
            display_title,
            FontRole::Title,
            banner_size,
            self.content_width(),
            self.fonts,
        );
        for line in &lines {
            self.draw_plain_line(
                line,
                FontRole::Title,
                banner_size,
                heading_color,
                Align::Left,
                0.0,
            );
        }

        self.advance(4.0);
        let rule_y = self.y;
        self.draw_rule(
            self.margins.left,
            rule_y,
            self.margins.left + BANNER_RULE_LEN,
            rule_y,
            2.0,
            accent,
        );
        self.advance(banner_size * 0.8);

        page
    }

    /// Scales an image to the content width (never upscaling), keeps room
    /// for its caption and places both on the same page. `px` is the source
    /// size in pixels.
    pub fn draw_anchored_image(&mut self, asset: &ImageAsset, px: (u32, u32)) {
        let content_w = self.content_width();
        let (pw, ph) = (px.0 as f32, px.1 as f32);
        let tail = if asset.caption.is_some() {
            CAPTION_ALLOWANCE
        } else {
            IMAGE_GAP
        };

        let mut scale = (content_w / pw).min(1.0);
        let max_h = self.content_height() - tail;
        if ph * scale > max_h {
            scale = max_h / ph;
        }
        let width = pw * scale;
        let height = ph * scale;

        self.ensure_space(height + tail);
        let x = self.margins.left + (content_w - width) / 2.0;
        let bottom = self.y - height;
        self.draw_image_at(&asset.id, x, bottom, width, height);
        self.y = bottom;

        if let Some(caption) = asset.caption.clone() {
            self.advance(4.0);
            let caption = self.truncate_to_width(&caption, FontRole::Body, CAPTION_SIZE, content_w);
            self.draw_styled_line(
                &caption,
                FontRole::Body,
                CAPTION_SIZE,
                false,
                true,
                self.theme.palette.caption,
                Align::Center,
                0.0,
            );
            self.advance(4.0);
        } else {
            self.advance(IMAGE_GAP);
        }
    }

    fn toc_rows_per_page(&self) -> usize {
        let available = self.content_height() - TOC_HEADING_ALLOWANCE;
        ((available / TOC_ROW_HEIGHT) as usize).max(1)
    }

    /// Reserves enough contents pages for `entries` rows, at least one.
    pub fn reserve_toc_pages(&mut self, entries: usize) {
        let per_page = self.toc_rows_per_page();
        let pages = ((entries + per_page - 1) / per_page).max(1);
        for _ in 0..pages {
            let index = self.start_page(PageRole::Toc, None);
            self.toc_pages.push(index);
        }
    }

    /// Writes the collected contents entries into the reserved pages.
    /// Entries past the reservation are dropped with a warning. Idempotent.
    pub fn fill_toc(&mut self) {
        if self.toc_filled {
            return;
        }
        self.toc_filled = true;
        if self.toc_pages.is_empty() {
            if !self.plan.toc.is_empty() {
                log::warn!(
                    "no contents pages reserved; dropping {} entries",
                    self.plan.toc.len()
                );
            }
            return;
        }

        let top = self.plan.page_height - self.margins.top;
        let heading_color = self.theme.palette.heading;
        let body_color = self.theme.palette.body;
        let leader_color = self.theme.palette.footer;

        let first = self.toc_pages[0];
        let heading = self.text_item(
            self.margins.left,
            top - TOC_HEADING_SIZE * 0.75,
            "Contents",
            FontRole::Heading,
            TOC_HEADING_SIZE,
            false,
            false,
            heading_color,
        );
        self.push_to(first, heading);
        self.push_to(
            first,
            DrawItem::Rule {
                x1: self.margins.left,
                y1: top - TOC_HEADING_SIZE * 0.75 - 10.0,
                x2: self.margins.left + BANNER_RULE_LEN,
                y2: top - TOC_HEADING_SIZE * 0.75 - 10.0,
                width: 1.5,
                color: self.theme.palette.accent.to_rgb_array(),
            },
        );

        let rows = self.toc_rows_per_page();
        let entries = self.plan.toc.clone();
        let total = entries.len();
        for (i, entry) in entries.iter().enumerate() {
            let slot = i / rows;
            if slot >= self.toc_pages.len() {
                log::warn!(
                    "table of contents overflow: dropping {} of {} entries",
                    total - i,
                    total
                );
                break;
            }
            let page = self.toc_pages[slot];
            let row = i % rows;
            let row_top = top - TOC_HEADING_ALLOWANCE - row as f32 * TOC_ROW_HEIGHT;
            let baseline = row_top - TOC_ENTRY_SIZE * 0.75;

            let number = entry.page_number.to_string();
            let number_width =
                self.fonts
                    .measure(FontRole::Body, &number, TOC_ENTRY_SIZE, false, false);
            let number_x = self.plan.page_width - self.margins.right - number_width;
            let title_max = self.content_width() - number_width - 18.0;
            let title =
                self.truncate_to_width(&entry.title, FontRole::Body, TOC_ENTRY_SIZE, title_max);
            let title_width =
                self.fonts
                    .measure(FontRole::Body, &title, TOC_ENTRY_SIZE, false, false);

            let title_item = self.text_item(
                self.margins.left,
                baseline,
                &title,
                FontRole::Body,
                TOC_ENTRY_SIZE,
                false,
                false,
                body_color,
            );
            self.push_to(page, title_item);
            let number_item = self.text_item(
                number_x,
                baseline,
                &number,
                FontRole::Body,
                TOC_ENTRY_SIZE,
                false,
                false,
                body_color,
            );
            self.push_to(page, number_item);

            let leader_start = self.margins.left + title_width + 8.0;
            let leader_end = number_x - 8.0;
            if leader_end > leader_start {
                self.push_to(
                    page,
                    DrawItem::Rule {
                        x1: leader_start,
                        y1: baseline + 2.0,
                        x2: leader_end,
                        y2: baseline + 2.0,
                        width: 0.4,
                        color: leader_color.to_rgb_array(),
                    },
                );
            }
        }
    }

    /// Stamps centred page numbers and running titles on every page except
    /// the cover. Numbering is 1-based from the first non-cover page.
    /// Idempotent, and a no-op when page numbers are disabled.
    pub fn stamp_footers(&mut self) {
        if self.footers_stamped {
            return;
        }
        self.footers_stamped = true;
        if !self.page_numbers {
            return;
        }

        let footer_color = self.theme.palette.footer;
        let center = self.margins.left + self.content_width() / 2.0;
        let records = self.plan.records.clone();

        let mut printed = 0usize;
        for record in &records {
            if record.role == PageRole::Cover {
                continue;
            }
            printed += 1;

            let number = printed.to_string();
            let number_width =
                self.fonts
                    .measure(FontRole::Body, &number, FOOTER_SIZE, false, false);
            let number_item = self.text_item(
                center - number_width / 2.0,
                self.margins.bottom * 0.35,
                &number,
                FontRole::Body,
                FOOTER_SIZE,
                false,
                false,
                footer_color,
            );
            self.push_to(record.page_index, number_item);

            let label = match &record.chapter_title {
                Some(chapter) => format!("{} \u{b7} {}", self.plan.title, chapter),
                None => self.plan.title.clone(),
            };
            let label = self.truncate_to_width(
                &label,
                FontRole::Body,
                FOOTER_LABEL_SIZE,
                self.content_width(),
            );
            let label_width =
                self.fonts
                    .measure(FontRole::Body, &label, FOOTER_LABEL_SIZE, false, false);
            let label_item = self.text_item(
                center - label_width / 2.0,
                self.margins.bottom * 0.35 + FOOTER_SIZE * 1.5,
                &label,
                FontRole::Body,
                FOOTER_LABEL_SIZE,
                false,
                true,
                footer_color,
            );
            self.push_to(record.page_index, label_item);
        }
    }
}
