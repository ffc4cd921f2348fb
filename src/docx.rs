//! Alternate manuscript export as a minimal OOXML word-processing file.
//!
//! The container carries exactly three parts: `[Content_Types].xml`,
//! `_rels/.rels` and `word/document.xml`. All formatting is direct run
//! and paragraph formatting, so no styles part is needed. Blocks map one
//! to one onto flow paragraphs; pagination is left to the word processor.

use std::io::{Cursor, Write as _};

use zip::write::SimpleFileOptions;

use crate::book::Manuscript;
use crate::error::Result;
use crate::markup::{self, Block, Span};

const WML_NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";

/// Half-point font sizes for the document and chapter headings.
const TITLE_HALF_POINTS: u32 = 48;
const CHAPTER_HALF_POINTS: u32 = 36;

/// Left indents in twentieths of a point.
const LIST_INDENT_TWIPS: u32 = 360;
const QUOTE_INDENT_TWIPS: u32 = 720;

/// Build a `.docx` file from the manuscript.
///
/// The book title opens the document; each chapter contributes its
/// display title and the parsed blocks of its body, with the same
/// leading-title deduplication the PDF path applies.
pub fn manuscript_to_docx(manuscript: &Manuscript) -> Result<Vec<u8>> {
    let document = render_document_xml(manuscript);

    let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default()
        .compression_method(zip::CompressionMethod::Deflated)
        .unix_permissions(0o644);

    zip.start_file("[Content_Types].xml", options)?;
    zip.write_all(content_types_xml().as_bytes())?;

    zip.start_file("_rels/.rels", options)?;
    zip.write_all(package_rels_xml().as_bytes())?;

    zip.start_file("word/document.xml", options)?;
    zip.write_all(document.as_bytes())?;

    let cursor = zip.finish()?;
    Ok(cursor.into_inner())
}

fn content_types_xml() -> &'static str {
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
  <Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
  <Default Extension="xml" ContentType="application/xml"/>
  <Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/>
</Types>
"#
}

fn package_rels_xml() -> &'static str {
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
  <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/>
</Relationships>
"#
}

fn render_document_xml(manuscript: &Manuscript) -> String {
    let mut body = String::new();
    heading_paragraph(&mut body, &manuscript.config.title, TITLE_HALF_POINTS, true);

    for chapter in manuscript.ordered_chapters() {
        let display = markup::display_title(&chapter.title);
        heading_paragraph(&mut body, &display, CHAPTER_HALF_POINTS, false);

        let blocks = markup::strip_leading_title(markup::parse(&chapter.body), &chapter.title);
        for block in &blocks {
            push_block(&mut body, block);
        }
    }

    let mut out = String::new();
    out.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n");
    out.push_str(&format!("<w:document xmlns:w=\"{WML_NS}\">"));
    out.push_str("<w:body>");
    out.push_str(&body);
    // A4 page with one-inch margins.
    out.push_str(
        "<w:sectPr><w:pgSz w:w=\"11906\" w:h=\"16838\"/>\
         <w:pgMar w:top=\"1440\" w:right=\"1440\" w:bottom=\"1440\" w:left=\"1440\"/></w:sectPr>",
    );
    out.push_str("</w:body></w:document>");
    out
}

fn push_block(out: &mut String, block: &Block) {
    match block {
        Block::Heading { level, text } => {
            let half_points = match level {
                1 => 32,
                2 => 28,
                _ => 26,
            };
            heading_paragraph(out, text, half_points, false);
        }
        Block::Paragraph { spans } => {
            out.push_str("<w:p>");
            paragraph_props(out, 0, false);
            push_runs(out, spans, false);
            out.push_str("</w:p>");
        }
        Block::List { items } => {
            for item in items {
                out.push_str("<w:p>");
                paragraph_props(out, LIST_INDENT_TWIPS, false);
                push_run(out, "\u{2022} ", false, false);
                push_runs(out, item, false);
                out.push_str("</w:p>");
            }
        }
        Block::Quote { spans } => {
            out.push_str("<w:p>");
            paragraph_props(out, QUOTE_INDENT_TWIPS, false);
            push_runs(out, spans, true);
            out.push_str("</w:p>");
        }
    }
}

fn heading_paragraph(out: &mut String, text: &str, half_points: u32, centered: bool) {
    out.push_str("<w:p>");
    paragraph_props(out, 0, centered);
    push_sized_run(out, text, true, false, Some(half_points));
    out.push_str("</w:p>");
}

// Child order inside w:pPr is fixed by the schema: spacing, ind, jc.
fn paragraph_props(out: &mut String, indent_twips: u32, centered: bool) {
    out.push_str("<w:pPr>");
    out.push_str("<w:spacing w:after=\"160\"/>");
    if indent_twips > 0 {
        out.push_str(&format!("<w:ind w:left=\"{indent_twips}\"/>"));
    }
    if centered {
        out.push_str("<w:jc w:val=\"center\"/>");
    }
    out.push_str("</w:pPr>");
}

fn push_runs(out: &mut String, spans: &[Span], force_italic: bool) {
    for span in spans {
        push_run(out, &span.text, span.bold, span.italic || force_italic);
    }
}

fn push_run(out: &mut String, text: &str, bold: bool, italic: bool) {
    push_sized_run(out, text, bold, italic, None);
}

fn push_sized_run(out: &mut String, text: &str, bold: bool, italic: bool, half_points: Option<u32>) {
    if text.is_empty() {
        return;
    }
    out.push_str("<w:r>");
    if bold || italic || half_points.is_some() {
        out.push_str("<w:rPr>");
        if bold {
            out.push_str("<w:b/>");
        }
        if italic {
            out.push_str("<w:i/>");
        }
        if let Some(sz) = half_points {
            out.push_str(&format!("<w:sz w:val=\"{sz}\"/><w:szCs w:val=\"{sz}\"/>"));
        }
        out.push_str("</w:rPr>");
    }
    // Spans can carry leading or trailing spaces that must survive.
    out.push_str("<w:t xml:space=\"preserve\">");
    out.push_str(&xml_escape(text));
    out.push_str("</w:t></w:r>");
}

fn xml_escape(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::book::{BookConfig, ChapterContent, Genre, Outline};
    use std::io::Read as _;

    fn manuscript(chapters: Vec<(usize, &str, &str)>) -> Manuscript {
        Manuscript {
            config: BookConfig {
                title: "Tides & Crossings".to_string(),
                topic: "ferry routes of the north".to_string(),
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

    fn document_xml(bytes: &[u8]) -> String {
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes.to_vec())).unwrap();
        let mut file = archive.by_name("word/document.xml").unwrap();
        let mut xml = String::new();
        file.read_to_string(&mut xml).unwrap();
        xml
    }

    #[test]
    fn output_is_a_zip_container_with_required_parts() {
        let bytes = manuscript_to_docx(&manuscript(vec![(1, "One", "Hello.")])).unwrap();
        assert_eq!(&bytes[..2], b"PK");

        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        for name in ["[Content_Types].xml", "_rels/.rels", "word/document.xml"] {
            assert!(archive.by_name(name).is_ok(), "missing part {name}");
        }
    }

    #[test]
    fn title_and_chapters_become_paragraphs() {
        let bytes = manuscript_to_docx(&manuscript(vec![
            (1, "Harbors", "The first crossing."),
            (2, "Channels", "The second crossing."),
        ]))
        .unwrap();
        let xml = document_xml(&bytes);
        assert!(xml.contains("Tides &amp; Crossings"));
        assert!(xml.contains("Harbors"));
        assert!(xml.contains("Channels"));
        let first = xml.find("The first crossing.").unwrap();
        let second = xml.find("The second crossing.").unwrap();
        assert!(first < second);
    }

    #[test]
    fn chapters_are_ordered_by_index() {
        let bytes = manuscript_to_docx(&manuscript(vec![
            (2, "Later", "Body two."),
            (1, "Sooner", "Body one."),
        ]))
        .unwrap();
        let xml = document_xml(&bytes);
        assert!(xml.find("Sooner").unwrap() < xml.find("Later").unwrap());
    }

    #[test]
    fn styled_runs_carry_flags() {
        let bytes = manuscript_to_docx(&manuscript(vec![(
            1,
            "One",
            "Plain **strong** and *slanted* text.",
        )]))
        .unwrap();
        let xml = document_xml(&bytes);
        assert!(xml.contains("<w:rPr><w:b/></w:rPr><w:t xml:space=\"preserve\">strong</w:t>"));
        assert!(xml.contains("<w:rPr><w:i/></w:rPr><w:t xml:space=\"preserve\">slanted</w:t>"));
    }

    #[test]
    fn lists_get_literal_bullets_and_quotes_get_indent() {
        let body = "- first point\n- second point\n\n> a borrowed line\n";
        let bytes = manuscript_to_docx(&manuscript(vec![(1, "One", body)])).unwrap();
        let xml = document_xml(&bytes);
        assert_eq!(xml.matches("\u{2022} ").count(), 2);
        assert!(xml.contains(&format!("<w:ind w:left=\"{LIST_INDENT_TWIPS}\"/>")));
        assert!(xml.contains(&format!("<w:ind w:left=\"{QUOTE_INDENT_TWIPS}\"/>")));
        // Quote runs are italic even without inline markers.
        let quote_at = xml.find("a borrowed line").unwrap();
        let before = &xml[..quote_at];
        let run_start = before.rfind("<w:r>").unwrap();
        assert!(xml[run_start..quote_at].contains("<w:i/>"));
    }

    #[test]
    fn repeated_chapter_title_is_not_doubled() {
        let body = "# Harbors\n\nThe crossing begins.";
        let bytes = manuscript_to_docx(&manuscript(vec![(1, "Harbors", body)])).unwrap();
        let xml = document_xml(&bytes);
        assert_eq!(xml.matches("Harbors").count(), 1);
    }

    #[test]
    fn heading_levels_step_down_in_size() {
        let body = "# Big\n\n## Middle\n\n### Small\n";
        let bytes = manuscript_to_docx(&manuscript(vec![(1, "One", body)])).unwrap();
        let xml = document_xml(&bytes);
        assert!(xml.contains("<w:sz w:val=\"32\"/>"));
        assert!(xml.contains("<w:sz w:val=\"28\"/>"));
        assert!(xml.contains("<w:sz w:val=\"26\"/>"));
    }
}
