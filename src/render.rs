//! PDF renderer – takes a [`DocumentPlan`] and produces PDF bytes using
//! `printpdf` (v0.8 ops-based API).
//!
//! Plan coordinates are already PDF-space (origin bottom-left, text
//! positions are baselines), so items translate to ops without any axis
//! conversion. Image assets referenced by the plan are decoded once and
//! registered as shared XObjects; a failed decode aborts the render.

use std::collections::{HashMap, HashSet};

use printpdf::*;

use crate::error::{Error, Result};
use crate::fonts::FontFamily;
use crate::images::{ImageAsset, ImageMime};
use crate::page_plan::{DocumentPlan, DrawItem};

/// A printpdf XObject together with the pixel dimensions of the source image.
struct ImageResource {
    xobj_id: XObjectId,
    px_width: u32,
    px_height: u32,
}

/// Render a DocumentPlan into PDF bytes. `assets` must contain every image
/// the plan references.
pub fn render_pdf(plan: &DocumentPlan, assets: &[ImageAsset]) -> Result<Vec<u8>> {
    let page_w = Mm(plan.page_width * 0.352778); // pt → mm
    let page_h = Mm(plan.page_height * 0.352778);

    let mut doc = PdfDocument::new(&plan.title);

    // ── Pre-register every image the plan draws ───────────────────────────
    let mut used: HashSet<&str> = HashSet::new();
    for page in &plan.pages {
        for item in &page.items {
            if let DrawItem::Image { asset_id, .. } = item {
                used.insert(asset_id.as_str());
            }
        }
    }

    let by_id: HashMap<&str, &ImageAsset> = assets.iter().map(|a| (a.id.as_str(), a)).collect();

    let mut resources: HashMap<String, ImageResource> = HashMap::new();
    let mut img_warnings: Vec<PdfWarnMsg> = Vec::new();

    for id in used {
        let asset = by_id.get(id).ok_or_else(|| {
            Error::Render(format!("plan references unknown image asset `{id}`"))
        })?;
        if asset.mime == ImageMime::Webp {
            return Err(Error::UnsupportedImage(format!(
                "asset `{}` is webp; embedding supports png and jpeg",
                asset.id
            )));
        }

        // Decode with the `image` crate to obtain pixel dimensions.
        let dyn_img = ::image::load_from_memory(&asset.data).map_err(|e| Error::ImageDecode {
            id: asset.id.clone(),
            reason: e.to_string(),
        })?;

        // Register with printpdf as a reusable XObject.
        let raw =
            RawImage::decode_from_bytes(&asset.data, &mut img_warnings).map_err(|e| {
                Error::ImageDecode {
                    id: asset.id.clone(),
                    reason: e.to_string(),
                }
            })?;
        let xobj_id = doc.add_image(&raw);

        resources.insert(
            id.to_string(),
            ImageResource {
                xobj_id,
                px_width: dyn_img.width(),
                px_height: dyn_img.height(),
            },
        );
    }

    // ── Render pages ──────────────────────────────────────────────────────
    let mut pages = Vec::new();
    for page in &plan.pages {
        let mut ops = Vec::new();
        for item in &page.items {
            render_item(&mut ops, item, &resources)?;
        }
        pages.push(PdfPage::new(page_w, page_h, ops));
    }

    // Ensure at least one page.
    if pages.is_empty() {
        pages.push(PdfPage::new(page_w, page_h, Vec::new()));
    }

    doc.with_pages(pages);
    let bytes = doc.save(&PdfSaveOptions::default(), &mut Vec::new());

    Ok(bytes)
}

fn render_item(
    ops: &mut Vec<Op>,
    item: &DrawItem,
    images: &HashMap<String, ImageResource>,
) -> Result<()> {
    match item {
        DrawItem::Rect {
            x,
            y,
            width,
            height,
            color,
        } => {
            ops.push(Op::SetFillColor {
                col: rgb(*color),
            });
            ops.push(Op::DrawPolygon {
                polygon: Polygon {
                    rings: vec![PolygonRing {
                        points: vec![
                            line_point(*x, *y),
                            line_point(*x + *width, *y),
                            line_point(*x + *width, *y + *height),
                            line_point(*x, *y + *height),
                        ],
                    }],
                    mode: PaintMode::Fill,
                    winding_order: WindingOrder::NonZero,
                },
            });
        }
        DrawItem::Rule {
            x1,
            y1,
            x2,
            y2,
            width,
            color,
        } => {
            ops.push(Op::SetOutlineColor {
                col: rgb(*color),
            });
            ops.push(Op::SetOutlineThickness { pt: Pt(*width) });
            ops.push(Op::DrawLine {
                line: Line {
                    points: vec![line_point(*x1, *y1), line_point(*x2, *y2)],
                    is_closed: false,
                },
            });
        }
        DrawItem::Text {
            x,
            y,
            text,
            family,
            size,
            bold,
            italic,
            color,
        } => {
            if text.is_empty() {
                return Ok(());
            }
            let font = builtin_font(*family, *bold, *italic);
            ops.push(Op::StartTextSection);
            ops.push(Op::SetTextCursor {
                pos: Point {
                    x: Pt(*x),
                    y: Pt(*y),
                },
            });
            ops.push(Op::SetFontSizeBuiltinFont {
                size: Pt(*size),
                font,
            });
            ops.push(Op::SetLineHeight {
                lh: Pt(*size * 1.2),
            });
            ops.push(Op::SetFillColor {
                col: rgb(*color),
            });
            ops.push(Op::WriteTextBuiltinFont {
                items: vec![TextItem::Text(to_winlatin(text))],
                font,
            });
            ops.push(Op::EndTextSection);
        }
        DrawItem::Image {
            asset_id,
            x,
            y,
            width,
            height,
        } => {
            if *width <= 0.0 || *height <= 0.0 {
                return Err(Error::Render(format!(
                    "image `{asset_id}` has a non-positive placed size {width}x{height}"
                )));
            }
            let res = images.get(asset_id).ok_or_else(|| {
                Error::Render(format!("image `{asset_id}` was not registered"))
            })?;

            // At dpi=72 printpdf renders 1 px = 1 pt, so
            // scale = desired_pt / px_dim.
            let scale_x = if res.px_width > 0 {
                *width / res.px_width as f32
            } else {
                1.0
            };
            let scale_y = if res.px_height > 0 {
                *height / res.px_height as f32
            } else {
                1.0
            };

            ops.push(Op::UseXobject {
                id: res.xobj_id.clone(),
                transform: XObjectTransform {
                    translate_x: Some(Pt(*x)),
                    translate_y: Some(Pt(*y)),
                    dpi: Some(72.0),
                    scale_x: Some(scale_x),
                    scale_y: Some(scale_y),
                    rotate: None,
                },
            });
        }
    }
    Ok(())
}

fn rgb(color: [f32; 3]) -> Color {
    Color::Rgb(Rgb {
        r: color[0],
        g: color[1],
        b: color[2],
        icc_profile: None,
    })
}

fn line_point(x: f32, y: f32) -> LinePoint {
    LinePoint {
        p: Point { x: Pt(x), y: Pt(y) },
        bezier: false,
    }
}

/// Map a family plus variant flags to one of the fourteen builtin faces.
fn builtin_font(family: FontFamily, bold: bool, italic: bool) -> BuiltinFont {
    match (family, bold, italic) {
        (FontFamily::Helvetica, false, false) => BuiltinFont::Helvetica,
        (FontFamily::Helvetica, true, false) => BuiltinFont::HelveticaBold,
        (FontFamily::Helvetica, false, true) => BuiltinFont::HelveticaOblique,
        (FontFamily::Helvetica, true, true) => BuiltinFont::HelveticaBoldOblique,
        (FontFamily::Times, false, false) => BuiltinFont::TimesRoman,
        (FontFamily::Times, true, false) => BuiltinFont::TimesBold,
        (FontFamily::Times, false, true) => BuiltinFont::TimesItalic,
        (FontFamily::Times, true, true) => BuiltinFont::TimesBoldItalic,
        (FontFamily::Courier, false, false) => BuiltinFont::Courier,
        (FontFamily::Courier, true, false) => BuiltinFont::CourierBold,
        (FontFamily::Courier, false, true) => BuiltinFont::CourierOblique,
        (FontFamily::Courier, true, true) => BuiltinFont::CourierBoldOblique,
    }
}

/// Convert a UTF-8 string to raw Windows-1252 bytes then wrap in a String so
/// printpdf writes the bytes unchanged into the PDF stream (builtin fonts use
/// WinAnsiEncoding, so each glyph is one byte 0x00–0xFF).
fn to_winlatin(s: &str) -> String {
    let bytes: Vec<u8> = s
        .chars()
        .map(|c| match c {
            '\u{20AC}' => 0x80, // euro
            '\u{201A}' => 0x82, // single low-9 quote
            '\u{201E}' => 0x84, // double low-9 quote
            '\u{2026}' => 0x85, // ellipsis
            '\u{2018}' => 0x91, // left single quote
            '\u{2019}' => 0x92, // right single quote
            '\u{201C}' => 0x93, // left double quote
            '\u{201D}' => 0x94, // right double quote
            '\u{2022}' => 0x95, // bullet
            '\u{2013}' => 0x96, // en-dash
            '\u{2014}' => 0x97, // em-dash
            '\u{2122}' => 0x99, // trademark
            '\u{00A0}' => 0x20, // non-breaking space -> space
            c if (c as u32) < 256 => c as u8,
            _ => b'?',
        })
        .collect();
    // SAFETY: intentionally non-UTF-8 for 0x80-0x9F range; printpdf passes
    // these bytes straight to the PDF stream, decoded by WinAnsiEncoding.
    #[allow(unsafe_code)]
    unsafe {
        String::from_utf8_unchecked(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page_plan::PagePlan;
    use std::io::Cursor;

    fn empty_plan() -> DocumentPlan {
        DocumentPlan::new("render test", 595.28, 841.89)
    }

    // `use printpdf::*` above pulls in printpdf's own `image` module, so the
    // external crate needs the leading `::` here.
    fn tiny_png() -> Vec<u8> {
        let img = ::image::RgbaImage::from_pixel(8, 6, ::image::Rgba([10, 20, 30, 255]));
        let mut bytes = Vec::new();
        ::image::DynamicImage::ImageRgba8(img)
            .write_to(&mut Cursor::new(&mut bytes), ::image::ImageFormat::Png)
            .unwrap();
        bytes
    }

    fn png_asset(id: &str) -> ImageAsset {
        let data = tiny_png();
        ImageAsset {
            id: id.to_string(),
            name: id.to_string(),
            size_bytes: data.len() as u64,
            data,
            mime: ImageMime::Png,
            include: true,
            caption: None,
            placement: None,
        }
    }

    #[test]
    fn render_empty_plan() {
        let bytes = render_pdf(&empty_plan(), &[]).unwrap();
        assert!(bytes.len() > 100, "PDF should have content");
        // PDF magic number
        assert_eq!(&bytes[0..5], b"%PDF-");
    }

    #[test]
    fn render_text_and_shapes() {
        let mut plan = empty_plan();
        plan.pages.push(PagePlan {
            index: 0,
            items: vec![
                DrawItem::Rect {
                    x: 0.0,
                    y: 0.0,
                    width: 595.28,
                    height: 841.89,
                    color: [0.98, 0.96, 0.9],
                },
                DrawItem::Rule {
                    x1: 72.0,
                    y1: 700.0,
                    x2: 200.0,
                    y2: 700.0,
                    width: 1.5,
                    color: [0.5, 0.2, 0.1],
                },
                DrawItem::Text {
                    x: 72.0,
                    y: 720.0,
                    text: "Chapter \u{2022} one \u{2014} test".to_string(),
                    family: FontFamily::Times,
                    size: 14.0,
                    bold: true,
                    italic: false,
                    color: [0.1, 0.1, 0.1],
                },
            ],
        });
        let bytes = render_pdf(&plan, &[]).unwrap();
        assert_eq!(&bytes[0..5], b"%PDF-");
    }

    #[test]
    fn render_embeds_registered_image() {
        let mut plan = empty_plan();
        plan.pages.push(PagePlan {
            index: 0,
            items: vec![DrawItem::Image {
                asset_id: "img-1".to_string(),
                x: 100.0,
                y: 500.0,
                width: 80.0,
                height: 60.0,
            }],
        });
        let bytes = render_pdf(&plan, &[png_asset("img-1")]).unwrap();
        assert_eq!(&bytes[0..5], b"%PDF-");
    }

    #[test]
    fn missing_asset_is_an_error() {
        let mut plan = empty_plan();
        plan.pages.push(PagePlan {
            index: 0,
            items: vec![DrawItem::Image {
                asset_id: "img-gone".to_string(),
                x: 0.0,
                y: 0.0,
                width: 10.0,
                height: 10.0,
            }],
        });
        assert!(render_pdf(&plan, &[]).is_err());
    }

    #[test]
    fn webp_asset_is_rejected() {
        let mut asset = png_asset("img-w");
        asset.mime = ImageMime::Webp;
        let mut plan = empty_plan();
        plan.pages.push(PagePlan {
            index: 0,
            items: vec![DrawItem::Image {
                asset_id: "img-w".to_string(),
                x: 0.0,
                y: 0.0,
                width: 10.0,
                height: 10.0,
            }],
        });
        let err = render_pdf(&plan, &[asset]).unwrap_err();
        assert!(matches!(err, Error::UnsupportedImage(_)));
    }

    #[test]
    fn undecodable_bytes_are_an_error() {
        let mut asset = png_asset("img-bad");
        asset.data = vec![0xAA; 32];
        let mut plan = empty_plan();
        plan.pages.push(PagePlan {
            index: 0,
            items: vec![DrawItem::Image {
                asset_id: "img-bad".to_string(),
                x: 0.0,
                y: 0.0,
                width: 10.0,
                height: 10.0,
            }],
        });
        let err = render_pdf(&plan, &[asset]).unwrap_err();
        assert!(matches!(err, Error::ImageDecode { .. }));
    }

    #[test]
    fn builtin_faces_cover_all_variants() {
        assert!(matches!(
            builtin_font(FontFamily::Helvetica, false, false),
            BuiltinFont::Helvetica
        ));
        assert!(matches!(
            builtin_font(FontFamily::Times, true, true),
            BuiltinFont::TimesBoldItalic
        ));
        assert!(matches!(
            builtin_font(FontFamily::Courier, false, true),
            BuiltinFont::CourierOblique
        ));
    }

    #[test]
    fn winlatin_remaps_punctuation() {
        let s = to_winlatin("a\u{2014}b\u{2022}\u{00A0}\u{4E00}");
        let bytes = s.as_bytes();
        assert_eq!(bytes, &[b'a', 0x97, b'b', 0x95, 0x20, b'?']);
    }
}
