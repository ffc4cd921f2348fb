//! Document assembly – sequences cover, gallery, contents and chapters
//! into a [`DocumentPlan`], then runs the deferred contents and footer
//! passes. This is the orchestrator the CLI and the library entry point
//! call; everything below it (parser, themes, fonts, line breaker, page
//! composer, image plan) is wired together here.

use serde::{Deserialize, Serialize};

use crate::book::{BookConfig, ChapterContent, Manuscript, Outline};
use crate::error::{Error, Result};
use crate::fonts::{FontChoice, FontFamily, FontRole, FontSet};
use crate::images::{Anchor, AnchoredImage, ImageAsset, ImagePlan, ImageStore};
use crate::linebreak::{wrap, wrap_shaped, LineWidths};
use crate::markup::{self, Block, Span};
use crate::page_plan::{DocumentPlan, PageRole};
use crate::pagination::{Align, Margins, PageComposer};
use crate::style::{Theme, ThemeChoice};

/// Hanging indent for bullet list items.
const LIST_INDENT: f32 = 18.0;
/// Text indent inside block quotes.
const QUOTE_INDENT: f32 = 20.0;
/// Width of the quote accent bar.
const QUOTE_BAR_WIDTH: f32 = 3.0;
/// Drop cap height relative to the body size.
const DROP_CAP_SCALE: f32 = 3.2;
/// Lines that flow beside a drop cap.
const DROP_CAP_LINES: usize = 2;
/// Gap between a drop cap and the narrowed lines.
const DROP_CAP_GUTTER: f32 = 6.0;
/// Largest edge of the cover badge image.
const BADGE_MAX: f32 = 96.0;

/// Physical page formats the renderer supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageSizeChoice {
    #[default]
    A4,
    Letter,
}

impl PageSizeChoice {
    /// Width and height in points.
    pub fn dimensions(self) -> (f32, f32) {
        match self {
            PageSizeChoice::A4 => (595.28, 841.89),
            PageSizeChoice::Letter => (612.0, 792.0),
        }
    }
}

/// Everything that controls the look of the rendered book.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RenderOptions {
    pub title_font: FontChoice,
    pub heading_font: FontChoice,
    pub body_font: FontChoice,
    pub theme: ThemeChoice,
    pub page_size: PageSizeChoice,
    pub margins: Margins,
    pub page_numbers: bool,
    pub drop_caps: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        RenderOptions {
            title_font: FontChoice::new(FontFamily::Times, 34.0, true),
            heading_font: FontChoice::new(FontFamily::Helvetica, 17.0, true),
            body_font: FontChoice::default(),
            theme: ThemeChoice::default(),
            page_size: PageSizeChoice::default(),
            margins: Margins::default(),
            page_numbers: true,
            drop_caps: false,
        }
    }
}

impl RenderOptions {
    pub fn font_set(&self) -> FontSet {
        FontSet::new(self.title_font, self.heading_font, self.body_font)
    }

    pub fn theme(&self) -> &'static Theme {
        self.theme.theme()
    }
}

/// The JSON document the CLI consumes: config plus whatever parts of the
/// book already exist. Missing outline/chapters are filled by generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    pub config: BookConfig,
    #[serde(default)]
    pub outline: Option<Outline>,
    #[serde(default)]
    pub chapters: Option<Vec<ChapterContent>>,
    #[serde(default)]
    pub images: Vec<ImageAsset>,
    #[serde(default)]
    pub options: RenderOptions,
}

impl Manifest {
    pub fn new(config: BookConfig) -> Self {
        Manifest {
            config,
            outline: None,
            chapters: None,
            images: Vec::new(),
            options: RenderOptions::default(),
        }
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Assembles the manuscript, failing when no chapter prose exists yet.
    pub fn manuscript(&self) -> Result<Manuscript> {
        let chapters = self.chapters.clone().ok_or_else(|| {
            Error::InvalidManuscript(
                "manifest carries no chapters; provide them or run with --generate".into(),
            )
        })?;
        Ok(Manuscript {
            config: self.config.clone(),
            outline: self.outline.clone().unwrap_or_default(),
            chapters,
        })
    }
}

/// A chapter ready for layout: parsed blocks, deduplicated title, images.
struct PreparedChapter<'a> {
    index: usize,
    display: String,
    blocks: Vec<Block>,
    images: &'a [AnchoredImage<'a>],
}

/// Lays the whole manuscript out into a page plan. The plan is complete
/// (contents filled, footers stamped) but not yet rendered to PDF.
pub fn compose_document(
    manuscript: &Manuscript,
    images: &[ImageAsset],
    options: &RenderOptions,
) -> Result<DocumentPlan> {
    manuscript.validate()?;
    let theme = options.theme();
    let fonts = options.font_set();
    let image_plan = ImagePlan::partition(images);
    let mut store = ImageStore::new();

    let mut pc = PageComposer::new(&manuscript.config.title, options, theme, &fonts);

    draw_cover(&mut pc, &manuscript.config, &image_plan, &mut store, theme, &fonts)?;

    if !image_plan.gallery.is_empty() {
        draw_gallery(&mut pc, &image_plan, &mut store, theme)?;
    }

    let mut prepared = Vec::new();
    for chapter in manuscript.ordered_chapters() {
        let blocks = markup::strip_leading_title(markup::parse(&chapter.body), &chapter.title);
        let anchored = image_plan.for_chapter(chapter.index);
        if blocks.is_empty() && anchored.is_empty() {
            log::debug!("chapter {} `{}` is empty, skipping", chapter.index, chapter.title);
            continue;
        }
        prepared.push(PreparedChapter {
            index: chapter.index,
            display: markup::display_title(&chapter.title),
            blocks,
            images: anchored,
        });
    }

    pc.reserve_toc_pages(prepared.len());

    for chapter in &prepared {
        render_chapter(&mut pc, chapter, theme, &fonts, &mut store, options)?;
    }

    pc.fill_toc();
    pc.stamp_footers();
    log::info!(
        "composed `{}`: {} pages, {} chapters",
        manuscript.config.title,
        pc.page_count(),
        prepared.len()
    );
    Ok(pc.into_plan())
}

/// Composes and renders in one step, returning the PDF bytes together
/// with the plan that produced them.
pub fn render_book(
    manuscript: &Manuscript,
    images: &[ImageAsset],
    options: &RenderOptions,
) -> Result<(Vec<u8>, DocumentPlan)> {
    let plan = compose_document(manuscript, images, options)?;
    let bytes = crate::render::render_pdf(&plan, images)?;
    Ok((bytes, plan))
}

fn draw_cover(
    pc: &mut PageComposer,
    config: &BookConfig,
    image_plan: &ImagePlan,
    store: &mut ImageStore,
    theme: &Theme,
    fonts: &FontSet,
) -> Result<()> {
    pc.start_page(PageRole::Cover, None);
    let (pw, ph) = (pc.page_width(), pc.page_height());
    let palette = &theme.palette;

    // Full-bleed background image, scaled to cover the page.
    if let Some(asset) = image_plan.cover_background {
        let (w, h) = store.dimensions(asset)?;
        let scale = (pw / w as f32).max(ph / h as f32);
        let sw = w as f32 * scale;
        let sh = h as f32 * scale;
        pc.draw_image_at(&asset.id, (pw - sw) / 2.0, (ph - sh) / 2.0, sw, sh);
    }

    // Title block, centred around the upper third.
    let title_size = fonts.choice(FontRole::Title).size;
    let lines = crate::fonts::wrap_plain(&config.title, FontRole::Title, title_size, pw - 120.0, fonts);
    let line_height = fonts.manager().line_height_px(title_size, 1.15);
    let mut baseline = ph * 0.62 + line_height * (lines.len().saturating_sub(1)) as f32 / 2.0;
    for line in &lines {
        let width = fonts.measure(FontRole::Title, line, title_size, false, false);
        pc.draw_text_at(
            (pw - width) / 2.0,
            baseline,
            line,
            FontRole::Title,
            title_size,
            false,
            false,
            palette.cover_title,
        );
        baseline -= line_height;
    }

    let rule_y = baseline - 2.0;
    pc.draw_rule(pw / 2.0 - 40.0, rule_y, pw / 2.0 + 40.0, rule_y, 2.0, palette.accent);

    if !config.topic.trim().is_empty() {
        let subtitle_size = 13.0;
        let width = fonts.measure(FontRole::Heading, &config.topic, subtitle_size, false, true);
        pc.draw_text_at(
            (pw - width) / 2.0,
            rule_y - 26.0,
            &config.topic,
            FontRole::Heading,
            subtitle_size,
            false,
            true,
            palette.cover_subtitle,
        );
    }

    // Badge, centred in the lower third.
    if let Some(asset) = image_plan.cover_badge {
        let (w, h) = store.dimensions(asset)?;
        let scale = (BADGE_MAX / w as f32).min(BADGE_MAX / h as f32).min(1.0);
        let bw = w as f32 * scale;
        let bh = h as f32 * scale;
        pc.draw_image_at(&asset.id, (pw - bw) / 2.0, ph * 0.22 - bh / 2.0, bw, bh);
    }

    if let Some(dedication) = &config.dedication {
        if !dedication.trim().is_empty() {
            let size = 10.5;
            let width = fonts.measure(FontRole::Body, dedication, size, false, true);
            pc.draw_text_at(
                (pw - width) / 2.0,
                ph * 0.1,
                dedication,
                FontRole::Body,
                size,
                false,
                true,
                palette.cover_subtitle,
            );
        }
    }

    Ok(())
}

fn draw_gallery(
    pc: &mut PageComposer,
    image_plan: &ImagePlan,
    store: &mut ImageStore,
    theme: &Theme,
) -> Result<()> {
    pc.start_page(PageRole::Gallery, None);
    pc.advance(4.0);
    pc.draw_plain_line(
        "Gallery",
        FontRole::Heading,
        20.0,
        theme.palette.heading,
        Align::Left,
        0.0,
    );
    let rule_y = pc.cursor() - 2.0;
    pc.draw_rule(
        pc.margins().left,
        rule_y,
        pc.margins().left + 64.0,
        rule_y,
        1.5,
        theme.palette.accent,
    );
    pc.advance(16.0);

    for asset in &image_plan.gallery {
        let dims = store.dimensions(asset)?;
        pc.draw_anchored_image(asset, dims);
    }
    Ok(())
}

fn render_chapter(
    pc: &mut PageComposer,
    chapter: &PreparedChapter,
    theme: &Theme,
    fonts: &FontSet,
    store: &mut ImageStore,
    options: &RenderOptions,
) -> Result<()> {
    pc.begin_chapter(chapter.index, &chapter.display);

    let mut start = Vec::new();
    let mut middle = Vec::new();
    let mut end = Vec::new();
    for anchored in chapter.images {
        match anchored.anchor {
            Anchor::Start => start.push(anchored.asset),
            Anchor::Middle => middle.push(anchored.asset),
            Anchor::End => end.push(anchored.asset),
        }
    }

    for asset in &start {
        let dims = store.dimensions(asset)?;
        pc.draw_anchored_image(asset, dims);
    }

    let total = chapter.blocks.len();
    let midpoint = total.div_euclid(2) + total.rem_euclid(2); // ceil(total / 2)
    if total == 0 {
        for asset in &middle {
            let dims = store.dimensions(asset)?;
            pc.draw_anchored_image(asset, dims);
        }
    }

    let mut drop_cap_pending = options.drop_caps;
    for (i, block) in chapter.blocks.iter().enumerate() {
        render_block(pc, block, theme, fonts, &mut drop_cap_pending);
        if i + 1 == midpoint.max(1) {
            for asset in &middle {
                let dims = store.dimensions(asset)?;
                pc.draw_anchored_image(asset, dims);
            }
        }
    }

    for asset in &end {
        let dims = store.dimensions(asset)?;
        pc.draw_anchored_image(asset, dims);
    }
    Ok(())
}

fn render_block(
    pc: &mut PageComposer,
    block: &Block,
    theme: &Theme,
    fonts: &FontSet,
    drop_cap_pending: &mut bool,
) {
    let body_size = fonts.choice(FontRole::Body).size;
    let body_line = fonts.manager().line_height_px(body_size, theme.line_height);
    let content_w = pc.content_width();

    match block {
        Block::Heading { level, text } => {
            let scale = match level {
                1 => 1.0,
                2 => 0.86,
                _ => 0.74,
            };
            let size = fonts.choice(FontRole::Heading).size * scale;
            let line_height = fonts.manager().line_height_px(size, theme.line_height);
            let lines = crate::fonts::wrap_plain(text, FontRole::Heading, size, content_w, fonts);
            pc.ensure_space(line_height * lines.len() as f32 + size * 0.9);
            pc.advance(size * 0.5);
            for line in &lines {
                pc.draw_plain_line(
                    line,
                    FontRole::Heading,
                    size,
                    theme.palette.heading,
                    Align::Left,
                    0.0,
                );
            }
            pc.advance(size * 0.4);
        }
        Block::Paragraph { spans } => {
            if *drop_cap_pending && draw_drop_cap_paragraph(pc, spans, theme, fonts) {
                *drop_cap_pending = false;
            } else {
                let lines = wrap(spans, FontRole::Body, body_size, content_w, fonts);
                pc.ensure_space(body_line * lines.len().min(2) as f32);
                for line in &lines {
                    pc.ensure_space(body_line);
                    pc.draw_rich_line(line, FontRole::Body, body_size, theme.palette.body, 0.0);
                }
                pc.advance(body_size * theme.paragraph_spacing);
            }
        }
        Block::List { items } => {
            let body_choice = fonts.choice(FontRole::Body);
            for item in items {
                let lines = wrap(item, FontRole::Body, body_size, content_w - LIST_INDENT, fonts);
                pc.ensure_space(body_line * lines.len().min(2).max(1) as f32);
                for (i, line) in lines.iter().enumerate() {
                    pc.ensure_space(body_line);
                    if i == 0 {
                        let ascent = fonts.manager().ascender_px(
                            body_size,
                            body_choice.bold,
                            false,
                            body_choice.family,
                        );
                        pc.draw_text_at(
                            pc.margins().left + LIST_INDENT - 12.0,
                            pc.cursor() - ascent,
                            "\u{2022}",
                            FontRole::Body,
                            body_size,
                            false,
                            false,
                            theme.palette.body,
                        );
                    }
                    pc.draw_rich_line(
                        line,
                        FontRole::Body,
                        body_size,
                        theme.palette.body,
                        LIST_INDENT,
                    );
                }
            }
            pc.advance(body_size * theme.paragraph_spacing);
        }
        Block::Quote { spans } => {
            // Quotes render in italic; bold spans keep bold (which wins).
            let styled: Vec<Span> = spans
                .iter()
                .map(|s| Span {
                    text: s.text.clone(),
                    bold: s.bold,
                    italic: true,
                })
                .collect();
            let lines = wrap(&styled, FontRole::Body, body_size, content_w - QUOTE_INDENT, fonts);
            pc.ensure_space(body_line * lines.len().min(2).max(1) as f32);
            for line in &lines {
                pc.ensure_space(body_line);
                pc.draw_rect(
                    pc.margins().left + 4.0,
                    pc.cursor() - body_line,
                    QUOTE_BAR_WIDTH,
                    body_line,
                    theme.palette.accent,
                );
                pc.draw_rich_line(line, FontRole::Body, body_size, theme.palette.quote, QUOTE_INDENT);
            }
            pc.advance(body_size * theme.paragraph_spacing);
        }
    }
}

/// Splits the first letter off a paragraph and flows the remainder around
/// it. Returns false when the paragraph has no usable first character, in
/// which case the caller renders it normally.
fn draw_drop_cap_paragraph(
    pc: &mut PageComposer,
    spans: &[Span],
    theme: &Theme,
    fonts: &FontSet,
) -> bool {
    let Some((cap, rest)) = split_cap(spans) else {
        return false;
    };

    let body_size = fonts.choice(FontRole::Body).size;
    let body_choice = fonts.choice(FontRole::Body);
    let line_height = fonts.manager().line_height_px(body_size, theme.line_height);
    let cap_size = body_size * DROP_CAP_SCALE;
    let cap_text = cap.to_string();
    let cap_width = fonts.measure(FontRole::Title, &cap_text, cap_size, false, false);
    let content_w = pc.content_width();

    let widths = LineWidths::indented(
        content_w - cap_width - DROP_CAP_GUTTER,
        DROP_CAP_LINES,
        content_w,
    );
    let lines = wrap_shaped(&rest, FontRole::Body, body_size, &widths, fonts);

    let cap_depth = line_height * DROP_CAP_LINES as f32;
    pc.ensure_space(cap_depth.max(cap_size));

    // Cap baseline sits on the last narrowed line's baseline.
    let body_ascent =
        fonts
            .manager()
            .ascender_px(body_size, body_choice.bold, false, body_choice.family);
    let cap_baseline = pc.cursor() - line_height * (DROP_CAP_LINES - 1) as f32 - body_ascent;
    pc.draw_text_at(
        pc.margins().left,
        cap_baseline,
        &cap_text,
        FontRole::Title,
        cap_size,
        false,
        false,
        theme.palette.heading,
    );

    for (i, line) in lines.iter().enumerate() {
        if i >= DROP_CAP_LINES {
            pc.ensure_space(line_height);
        }
        let indent = if i < DROP_CAP_LINES {
            cap_width + DROP_CAP_GUTTER
        } else {
            0.0
        };
        pc.draw_rich_line(line, FontRole::Body, body_size, theme.palette.body, indent);
    }
    if lines.len() < DROP_CAP_LINES {
        pc.advance(line_height * (DROP_CAP_LINES - lines.len()) as f32);
    }
    pc.advance(body_size * theme.paragraph_spacing);
    true
}

/// First letter of the paragraph plus the spans that remain after it.
fn split_cap(spans: &[Span]) -> Option<(char, Vec<Span>)> {
    let mut cap = None;
    let mut rest = Vec::new();
    for span in spans {
        if cap.is_none() {
            let trimmed = span.text.trim_start();
            let mut chars = trimmed.chars();
            match chars.next() {
                Some(c) => {
                    cap = Some(c);
                    let remainder = chars.as_str();
                    if !remainder.is_empty() {
                        rest.push(Span {
                            text: remainder.to_string(),
                            bold: span.bold,
                            italic: span.italic,
                        });
                    }
                }
                None => continue,
            }
        } else {
            rest.push(span.clone());
        }
    }
    cap.map(|c| (c, rest))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::book::Genre;
    use crate::page_plan::DrawItem;
    use std::io::Cursor;

    fn tiny_png(width: u32, height: u32) -> Vec<u8> {
        let img = image::RgbaImage::from_pixel(width, height, image::Rgba([90, 120, 40, 255]));
        let mut bytes = Vec::new();
        image::DynamicImage::ImageRgba8(img)
            .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();
        bytes
    }

    fn png_asset(id: &str, placement: Option<crate::images::Placement>) -> ImageAsset {
        let data = tiny_png(40, 30);
        ImageAsset {
            id: id.to_string(),
            name: id.to_string(),
            size_bytes: data.len() as u64,
            data,
            mime: crate::images::ImageMime::Png,
            include: true,
            caption: None,
            placement,
        }
    }

    fn manuscript(chapters: Vec<(usize, &str, &str)>) -> Manuscript {
        Manuscript {
            config: BookConfig {
                title: "Field Notes".to_string(),
                topic: "walking the fens".to_string(),
                genre: Genre::Nonfiction,
                audience: "general readers".to_string(),
                language: "English".to_string(),
                tone: String::new(),
                chapter_count: chapters.len().max(1),
                words_per_chapter: 200,
                dedication: None,
            },
            outline: Outline::default(),
            chapters: chapters
                .into_iter()
                .map(|(index, title, body)| ChapterContent {
                    index,
                    title: title.to_string(),
                    body: body.to_string(),
                })
                .collect(),
        }
    }

    #[test]
    fn manifest_with_unknown_theme_still_parses() {
        let raw = r#"{
          "config": { "title": "Night Walks", "chapterCount": 1 },
          "chapters": [{ "index": 1, "title": "Out", "body": "A short walk." }],
          "options": { "theme": "neon" }
        }"#;
        let manifest = Manifest::from_json(raw).unwrap();
        assert_eq!(manifest.options.theme().name, "classic");
    }

    #[test]
    fn default_options_are_a4_with_numbers() {
        let options = RenderOptions::default();
        assert_eq!(options.page_size, PageSizeChoice::A4);
        let (w, h) = options.page_size.dimensions();
        assert!((w - 595.28).abs() < 0.01);
        assert!((h - 841.89).abs() < 0.01);
        assert!(options.page_numbers);
        assert!(!options.drop_caps);
    }

    #[test]
    fn manifest_parses_with_only_config() {
        let manifest = Manifest::from_json(r#"{"config":{"title":"T"}}"#).unwrap();
        assert_eq!(manifest.config.title, "T");
        assert!(manifest.chapters.is_none());
        assert!(manifest.manuscript().is_err());
    }

    #[test]
    fn page_order_is_cover_toc_chapters() {
        let m = manuscript(vec![(1, "One", "First paragraph.\n\nSecond paragraph.")]);
        let plan = compose_document(&m, &[], &RenderOptions::default()).unwrap();
        let roles: Vec<PageRole> = plan.records.iter().map(|r| r.role).collect();
        assert_eq!(roles[0], PageRole::Cover);
        assert_eq!(roles[1], PageRole::Toc);
        assert_eq!(roles[2], PageRole::Chapter);
        assert_eq!(plan.toc.len(), 1);
        // First non-cover page is the contents page, so the chapter is 2.
        assert_eq!(plan.toc[0].page_number, 2);
    }

    #[test]
    fn empty_chapters_are_skipped() {
        let m = manuscript(vec![(1, "Ghost", "   \n\n  "), (2, "Real", "Words here.")]);
        let plan = compose_document(&m, &[], &RenderOptions::default()).unwrap();
        assert_eq!(plan.toc.len(), 1);
        assert_eq!(plan.toc[0].title, "Real");
        let chapter_pages = plan
            .records
            .iter()
            .filter(|r| r.role == PageRole::Chapter)
            .count();
        assert_eq!(chapter_pages, 1);
    }

    #[test]
    fn empty_chapter_with_anchored_image_still_renders() {
        let m = manuscript(vec![(1, "Plates", "")]);
        let images = vec![png_asset(
            "img-a",
            Some(crate::images::Placement::Chapter {
                chapter_index: 1,
                anchor: Anchor::Middle,
            }),
        )];
        let plan = compose_document(&m, &images, &RenderOptions::default()).unwrap();
        assert_eq!(plan.toc.len(), 1);
        let chapter_page = plan
            .records
            .iter()
            .find(|r| r.role == PageRole::Chapter)
            .unwrap();
        let drawn = plan.pages[chapter_page.page_index]
            .items
            .iter()
            .any(|item| matches!(item, DrawItem::Image { asset_id, .. } if asset_id == "img-a"));
        assert!(drawn);
    }

    #[test]
    fn dangling_chapter_index_draws_nothing() {
        let m = manuscript(vec![(1, "Only", "Some text.")]);
        let images = vec![png_asset(
            "img-x",
            Some(crate::images::Placement::Chapter {
                chapter_index: 5,
                anchor: Anchor::Start,
            }),
        )];
        let plan = compose_document(&m, &images, &RenderOptions::default()).unwrap();
        let any_image = plan
            .pages
            .iter()
            .flat_map(|p| &p.items)
            .any(|item| matches!(item, DrawItem::Image { .. }));
        assert!(!any_image);
    }

    #[test]
    fn middle_anchor_lands_after_second_of_four_blocks() {
        let body = "Alpha block.\n\nBravo block.\n\nCharlie block.\n\nDelta block.";
        let m = manuscript(vec![(1, "Anchors", body)]);
        let images = vec![png_asset(
            "img-mid",
            Some(crate::images::Placement::Chapter {
                chapter_index: 1,
                anchor: Anchor::Middle,
            }),
        )];
        let plan = compose_document(&m, &images, &RenderOptions::default()).unwrap();
        let chapter_page = plan
            .records
            .iter()
            .find(|r| r.role == PageRole::Chapter)
            .unwrap();
        let items = &plan.pages[chapter_page.page_index].items;

        let position = |needle: &str| {
            items.iter().position(|item| {
                matches!(item, DrawItem::Text { text, .. } if text.contains(needle))
            })
        };
        let image_at = items
            .iter()
            .position(|item| matches!(item, DrawItem::Image { .. }))
            .unwrap();
        assert!(position("Bravo").unwrap() < image_at);
        assert!(image_at < position("Charlie").unwrap());
    }

    #[test]
    fn gallery_page_present_only_with_gallery_images() {
        let m = manuscript(vec![(1, "One", "Text.")]);
        let plan = compose_document(&m, &[], &RenderOptions::default()).unwrap();
        assert!(!plan.records.iter().any(|r| r.role == PageRole::Gallery));

        let images = vec![png_asset("img-g", None)];
        let plan = compose_document(&m, &images, &RenderOptions::default()).unwrap();
        assert!(plan.records.iter().any(|r| r.role == PageRole::Gallery));
    }

    #[test]
    fn drop_cap_enlarges_first_letter() {
        let m = manuscript(vec![(
            1,
            "Caps",
            "Morning fog rolled over the water and would not lift.",
        )]);
        let options = RenderOptions {
            drop_caps: true,
            ..RenderOptions::default()
        };
        let plan = compose_document(&m, &[], &options).unwrap();
        let chapter_page = plan
            .records
            .iter()
            .find(|r| r.role == PageRole::Chapter)
            .unwrap();
        let body_size = options.body_font.size;
        let cap = plan.pages[chapter_page.page_index]
            .items
            .iter()
            .find_map(|item| match item {
                DrawItem::Text { text, size, .. } if text == "M" && *size > body_size * 2.0 => {
                    Some(*size)
                }
                _ => None,
            });
        assert!(cap.is_some());
        // The first body word flows beside the cap, not at the margin.
        let indented = plan.pages[chapter_page.page_index]
            .items
            .iter()
            .any(|item| {
                matches!(item, DrawItem::Text { text, x, .. }
                    if text == "orning" && *x > options.margins.left + 1.0)
            });
        assert!(indented);
    }

    #[test]
    fn quote_draws_accent_bar() {
        let m = manuscript(vec![(1, "Q", "> A borrowed line.")]);
        let plan = compose_document(&m, &[], &RenderOptions::default()).unwrap();
        let chapter_page = plan
            .records
            .iter()
            .find(|r| r.role == PageRole::Chapter)
            .unwrap();
        let theme = RenderOptions::default().theme();
        let bar = plan.pages[chapter_page.page_index]
            .items
            .iter()
            .any(|item| {
                matches!(item, DrawItem::Rect { width, color, .. }
                    if (*width - QUOTE_BAR_WIDTH).abs() < 0.01
                        && *color == theme.palette.accent.to_rgb_array())
            });
        assert!(bar);
    }

    #[test]
    fn one_chapter_book_numbering_scenario() {
        let m = manuscript(vec![(1, "Solo", "Only chapter text.")]);
        let plan = compose_document(&m, &[], &RenderOptions::default()).unwrap();

        // Cover page carries no number.
        let cover_texts: Vec<&String> = plan.pages[0]
            .items
            .iter()
            .filter_map(|item| match item {
                DrawItem::Text { text, .. } => Some(text),
                _ => None,
            })
            .collect();
        assert!(!cover_texts.iter().any(|t| t.as_str() == "1"));

        // Contents page is numbered 1, chapter page 2.
        let toc_numbered = plan.pages[1]
            .items
            .iter()
            .any(|item| matches!(item, DrawItem::Text { text, .. } if text == "1"));
        assert!(toc_numbered);
        let chapter_numbered = plan.pages[2]
            .items
            .iter()
            .any(|item| matches!(item, DrawItem::Text { text, .. } if text == "2"));
        assert!(chapter_numbered);
    }
}
