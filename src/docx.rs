use anyhow::{Context, Result};
use std::collections::BTreeSet;
use std::fs;
use std::io::{Cursor, Write};
use std::path::Path;
use tracing::debug;
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

use crate::image::ImageFormat;
use crate::model::{
    Alignment, Block, Document, Image, Paragraph, ParagraphStyle, Run, RunRole, RunStyle, Table,
};

const EMU_PER_PX: u64 = 9525;
const LIST_INDENT_TWIPS: u32 = 720;
const HEADER_SHADING: &str = "D9E2F3";

fn xml_escape_text(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            // Not representable in XML 1.0.
            c if (c as u32) < 0x20 && !matches!(c, '\t' | '\n' | '\r') => {}
            _ => out.push(ch),
        }
    }
    out
}

fn run_properties(style: RunStyle, role: RunRole) -> String {
    let mut out = String::new();
    if style.code {
        out.push_str("<w:rFonts w:ascii=\"Consolas\" w:hAnsi=\"Consolas\" w:cs=\"Consolas\"/>");
    }
    if style.bold {
        out.push_str("<w:b/>");
    }
    if style.italic {
        out.push_str("<w:i/>");
    }
    if style.strike {
        out.push_str("<w:strike/>");
    }
    match role {
        RunRole::Link | RunRole::LinkTarget => out.push_str("<w:color w:val=\"0563C1\"/>"),
        _ if style.code => out.push_str("<w:color w:val=\"C80000\"/>"),
        RunRole::Placeholder => out.push_str("<w:color w:val=\"808080\"/>"),
        _ => {}
    }
    if style.code {
        out.push_str("<w:sz w:val=\"20\"/>");
    } else if role == RunRole::LinkTarget {
        out.push_str("<w:sz w:val=\"18\"/>");
    }
    if style.highlight {
        out.push_str("<w:highlight w:val=\"yellow\"/>");
    }
    if role == RunRole::Link {
        out.push_str("<w:u w:val=\"single\"/>");
    }
    if style.superscript {
        out.push_str("<w:vertAlign w:val=\"superscript\"/>");
    } else if style.subscript {
        out.push_str("<w:vertAlign w:val=\"subscript\"/>");
    }
    out
}

fn run_xml(run: &Run, force_bold: bool) -> String {
    if run.role == RunRole::Break {
        return "<w:r><w:br/></w:r>".to_string();
    }
    if run.text.is_empty() {
        return String::new();
    }
    let mut style = run.style;
    style.bold |= force_bold;
    let props = run_properties(style, run.role);
    let mut out = String::new();
    out.push_str("<w:r>");
    if !props.is_empty() {
        out.push_str("<w:rPr>");
        out.push_str(&props);
        out.push_str("</w:rPr>");
    }
    out.push_str("<w:t xml:space=\"preserve\">");
    out.push_str(&xml_escape_text(&run.text));
    out.push_str("</w:t></w:r>");
    out
}

fn paragraph_properties(p: &Paragraph) -> String {
    let mut out = String::new();
    if let Some(id) = p.style.style_id() {
        out.push_str(&format!("<w:pStyle w:val=\"{id}\"/>"));
    }
    if let ParagraphStyle::ListItem { depth, .. } = p.style {
        out.push_str(&format!(
            "<w:ind w:left=\"{}\" w:hanging=\"360\"/>",
            LIST_INDENT_TWIPS * depth.max(1)
        ));
    }
    if p.alignment == Alignment::Center {
        out.push_str("<w:jc w:val=\"center\"/>");
    }
    out
}

fn paragraph_xml(p: &Paragraph, force_bold: bool) -> String {
    let mut out = String::new();
    out.push_str("<w:p>");
    let props = paragraph_properties(p);
    if !props.is_empty() {
        out.push_str("<w:pPr>");
        out.push_str(&props);
        out.push_str("</w:pPr>");
    }
    for run in &p.runs {
        out.push_str(&run_xml(run, force_bold));
    }
    out.push_str("</w:p>");
    out
}

fn table_xml(t: &Table) -> String {
    let columns = t.column_count();
    let header = t.has_header_row();
    let mut out = String::new();
    out.push_str("<w:tbl>");
    out.push_str("<w:tblPr>");
    out.push_str("<w:tblW w:w=\"0\" w:type=\"auto\"/>");
    out.push_str(
        r#"<w:tblBorders>
<w:top w:val="single" w:sz="4" w:space="0" w:color="A6A6A6"/>
<w:left w:val="single" w:sz="4" w:space="0" w:color="A6A6A6"/>
<w:bottom w:val="single" w:sz="4" w:space="0" w:color="A6A6A6"/>
<w:right w:val="single" w:sz="4" w:space="0" w:color="A6A6A6"/>
<w:insideH w:val="single" w:sz="4" w:space="0" w:color="A6A6A6"/>
<w:insideV w:val="single" w:sz="4" w:space="0" w:color="A6A6A6"/>
</w:tblBorders>"#,
    );
    out.push_str("</w:tblPr>");
    out.push_str("<w:tblGrid>");
    for _ in 0..columns {
        out.push_str("<w:gridCol/>");
    }
    out.push_str("</w:tblGrid>");

    for (i, row) in t.rows.iter().enumerate() {
        let is_header = header && i == 0;
        out.push_str("<w:tr>");
        if is_header {
            out.push_str("<w:trPr><w:tblHeader/></w:trPr>");
        }
        for c in 0..columns {
            out.push_str("<w:tc><w:tcPr><w:tcW w:w=\"0\" w:type=\"auto\"/>");
            if is_header {
                out.push_str(&format!(
                    "<w:shd w:val=\"clear\" w:color=\"auto\" w:fill=\"{HEADER_SHADING}\"/>"
                ));
            }
            out.push_str("</w:tcPr><w:p>");
            if let Some(cell) = row.cells.get(c) {
                for run in &cell.runs {
                    out.push_str(&run_xml(run, is_header));
                }
            }
            out.push_str("</w:p></w:tc>");
        }
        out.push_str("</w:tr>");
    }

    out.push_str("</w:tbl>");
    out
}

fn image_xml(img: &Image, index: usize) -> String {
    let cx = img.width_px as u64 * EMU_PER_PX;
    let cy = img.height_px as u64 * EMU_PER_PX;
    let descr = xml_escape_text(img.caption.as_deref().unwrap_or(&img.src));
    format!(
        r#"<w:p><w:pPr><w:jc w:val="center"/></w:pPr><w:r><w:drawing><wp:inline distT="0" distB="0" distL="0" distR="0"><wp:extent cx="{cx}" cy="{cy}"/><wp:docPr id="{index}" name="Picture {index}" descr="{descr}"/><wp:cNvGraphicFramePr><a:graphicFrameLocks xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" noChangeAspect="1"/></wp:cNvGraphicFramePr><a:graphic xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main"><a:graphicData uri="http://schemas.openxmlformats.org/drawingml/2006/picture"><pic:pic xmlns:pic="http://schemas.openxmlformats.org/drawingml/2006/picture"><pic:nvPicPr><pic:cNvPr id="{index}" name="{name}"/><pic:cNvPicPr/></pic:nvPicPr><pic:blipFill><a:blip r:embed="{rid}"/><a:stretch><a:fillRect/></a:stretch></pic:blipFill><pic:spPr><a:xfrm><a:off x="0" y="0"/><a:ext cx="{cx}" cy="{cy}"/></a:xfrm><a:prstGeom prst="rect"><a:avLst/></a:prstGeom></pic:spPr></pic:pic></a:graphicData></a:graphic></wp:inline></w:drawing></w:r></w:p>"#,
        name = media_name(index, img.format),
        rid = image_rid(index),
    )
}

fn rule_xml() -> &'static str {
    r#"<w:p><w:pPr><w:pBdr><w:bottom w:val="single" w:sz="6" w:space="1" w:color="C0C0C0"/></w:pBdr><w:spacing w:before="120" w:after="120"/></w:pPr></w:p>"#
}

fn page_break_xml() -> &'static str {
    r#"<w:p><w:r><w:br w:type="page"/></w:r></w:p>"#
}

fn media_name(index: usize, format: ImageFormat) -> String {
    format!("image{index}.{}", format.extension())
}

fn image_rid(index: usize) -> String {
    format!("rIdImg{index}")
}

fn document_xml(blocks: &[Block]) -> String {
    let mut body = String::new();
    let mut image_index = 0;
    for b in blocks {
        match b {
            Block::Paragraph(p) => body.push_str(&paragraph_xml(p, false)),
            Block::Table(t) => {
                body.push_str(&table_xml(t));
                // Word merges adjacent tables without a paragraph between them.
                body.push_str("<w:p/>");
            }
            Block::Image(img) => {
                image_index += 1;
                body.push_str(&image_xml(img, image_index));
            }
            Block::Rule => body.push_str(rule_xml()),
            Block::PageBreak => body.push_str(page_break_xml()),
        }
    }

    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:wpc="http://schemas.microsoft.com/office/word/2010/wordprocessingCanvas"
 xmlns:mc="http://schemas.openxmlformats.org/markup-compatibility/2006"
 xmlns:o="urn:schemas-microsoft-com:office:office"
 xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"
 xmlns:m="http://schemas.openxmlformats.org/officeDocument/2006/math"
 xmlns:v="urn:schemas-microsoft-com:vml"
 xmlns:wp14="http://schemas.microsoft.com/office/word/2010/wordprocessingDrawing"
 xmlns:wp="http://schemas.openxmlformats.org/drawingml/2006/wordprocessingDrawing"
 xmlns:w10="urn:schemas-microsoft-com:office:word"
 xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"
 xmlns:w14="http://schemas.microsoft.com/office/word/2010/wordprocessingml"
 xmlns:w15="http://schemas.microsoft.com/office/word/2012/wordprocessingml"
 xmlns:wpg="http://schemas.microsoft.com/office/word/2010/wordprocessingGroup"
 xmlns:wpi="http://schemas.microsoft.com/office/word/2010/wordprocessingInk"
 xmlns:wne="http://schemas.microsoft.com/office/word/2006/wordml"
 xmlns:wps="http://schemas.microsoft.com/office/word/2010/wordprocessingShape"
 mc:Ignorable="w14 w15 wp14">
  <w:body>
    {body}
    <w:sectPr>
      <w:pgSz w:w="12240" w:h="15840"/>
      <w:pgMar w:top="1440" w:right="1440" w:bottom="1440" w:left="1440" w:header="708" w:footer="708" w:gutter="0"/>
      <w:cols w:space="708"/>
      <w:docGrid w:linePitch="360"/>
    </w:sectPr>
  </w:body>
</w:document>"#,
        body = body
    )
}

fn content_types_xml(formats: &BTreeSet<&'static str>) -> String {
    let mut out = String::new();
    out.push_str(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
    out.push('\n');
    out.push_str(r#"<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">"#);
    out.push('\n');
    out.push_str(
        r#"  <Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>"#,
    );
    out.push('\n');
    out.push_str(r#"  <Default Extension="xml" ContentType="application/xml"/>"#);
    out.push('\n');
    for ext in formats {
        out.push_str(&format!(
            r#"  <Default Extension="{ext}" ContentType="{}"/>"#,
            content_type_for_extension(ext)
        ));
        out.push('\n');
    }
    out.push_str(r#"  <Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/>"#);
    out.push('\n');
    out.push_str(r#"  <Override PartName="/word/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.styles+xml"/>"#);
    out.push('\n');
    out.push_str(r#"  <Override PartName="/docProps/core.xml" ContentType="application/vnd.openxmlformats-package.core-properties+xml"/>"#);
    out.push('\n');
    out.push_str("</Types>");
    out
}

fn content_type_for_extension(ext: &str) -> &'static str {
    [ImageFormat::Png, ImageFormat::Jpeg, ImageFormat::Gif, ImageFormat::Bmp]
        .into_iter()
        .find(|f| f.extension() == ext)
        .map(|f| f.content_type())
        .unwrap_or("application/octet-stream")
}

fn rels_xml() -> &'static str {
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
  <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/>
  <Relationship Id="rId2" Type="http://schemas.openxmlformats.org/package/2006/relationships/metadata/core-properties" Target="docProps/core.xml"/>
</Relationships>"#
}

fn document_rels_xml(images: &[&Image]) -> String {
    let mut out = String::new();
    out.push_str(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
    out.push('\n');
    out.push_str(r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#);
    out.push('\n');
    out.push_str(r#"  <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/>"#);
    out.push('\n');
    for (i, img) in images.iter().enumerate() {
        let index = i + 1;
        out.push_str(&format!(
            r#"  <Relationship Id="{rid}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/image" Target="media/{name}"/>"#,
            rid = image_rid(index),
            name = media_name(index, img.format),
        ));
        out.push('\n');
    }
    out.push_str("</Relationships>");
    out
}

fn core_xml(title: Option<&str>) -> String {
    let title = title
        .map(|t| format!("<dc:title>{}</dc:title>", xml_escape_text(t)))
        .unwrap_or_default();
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<cp:coreProperties xmlns:cp="http://schemas.openxmlformats.org/package/2006/metadata/core-properties" xmlns:dc="http://purl.org/dc/elements/1.1/" xmlns:dcterms="http://purl.org/dc/terms/" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance">{title}<dc:creator>md2docx</dc:creator></cp:coreProperties>"#
    )
}

fn heading_style(level: u8, size: u32, before: u32) -> String {
    format!(
        r#"  <w:style w:type="paragraph" w:styleId="Heading{level}">
    <w:name w:val="heading {level}"/>
    <w:basedOn w:val="Normal"/>
    <w:next w:val="Normal"/>
    <w:uiPriority w:val="9"/>
    <w:qFormat/>
    <w:pPr>
      <w:keepNext/>
      <w:spacing w:before="{before}" w:after="120"/>
      <w:outlineLvl w:val="{outline}"/>
    </w:pPr>
    <w:rPr>
      <w:b/>
      <w:color w:val="1F3864"/>
      <w:sz w:val="{size}"/>
    </w:rPr>
  </w:style>
"#,
        outline = level - 1
    )
}

fn styles_xml() -> String {
    let mut out = String::new();
    out.push_str(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:styles xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">
  <w:docDefaults>
    <w:rPrDefault><w:rPr><w:rFonts w:ascii="Calibri" w:hAnsi="Calibri" w:cs="Calibri"/><w:sz w:val="22"/></w:rPr></w:rPrDefault>
    <w:pPrDefault><w:pPr><w:spacing w:after="120" w:line="264" w:lineRule="auto"/></w:pPr></w:pPrDefault>
  </w:docDefaults>
  <w:style w:type="paragraph" w:default="1" w:styleId="Normal">
    <w:name w:val="Normal"/>
    <w:qFormat/>
  </w:style>
"#,
    );
    for (level, size, before) in [
        (1, 36, 360),
        (2, 32, 300),
        (3, 28, 240),
        (4, 26, 240),
        (5, 24, 200),
        (6, 22, 200),
    ] {
        out.push_str(&heading_style(level, size, before));
    }
    out.push_str(
        r#"  <w:style w:type="paragraph" w:styleId="Quote">
    <w:name w:val="Quote"/>
    <w:basedOn w:val="Normal"/>
    <w:qFormat/>
    <w:pPr>
      <w:pBdr><w:left w:val="single" w:sz="18" w:space="8" w:color="BFBFBF"/></w:pBdr>
      <w:spacing w:before="120" w:after="120"/>
      <w:ind w:left="720" w:right="720"/>
    </w:pPr>
    <w:rPr>
      <w:i/>
      <w:color w:val="595959"/>
    </w:rPr>
  </w:style>
  <w:style w:type="paragraph" w:styleId="CodeBlock">
    <w:name w:val="Code Block"/>
    <w:basedOn w:val="Normal"/>
    <w:uiPriority w:val="99"/>
    <w:qFormat/>
    <w:pPr>
      <w:shd w:val="clear" w:color="auto" w:fill="F2F2F2"/>
      <w:spacing w:before="120" w:after="120" w:line="240" w:lineRule="auto"/>
    </w:pPr>
    <w:rPr>
      <w:rFonts w:ascii="Consolas" w:hAnsi="Consolas" w:cs="Consolas"/>
      <w:sz w:val="20"/>
    </w:rPr>
  </w:style>
  <w:style w:type="paragraph" w:styleId="ListParagraph">
    <w:name w:val="List Paragraph"/>
    <w:basedOn w:val="Normal"/>
    <w:uiPriority w:val="34"/>
    <w:qFormat/>
    <w:pPr>
      <w:spacing w:after="60"/>
      <w:contextualSpacing/>
    </w:pPr>
  </w:style>
  <w:style w:type="paragraph" w:styleId="Caption">
    <w:name w:val="caption"/>
    <w:basedOn w:val="Normal"/>
    <w:next w:val="Normal"/>
    <w:uiPriority w:val="35"/>
    <w:qFormat/>
    <w:pPr>
      <w:jc w:val="center"/>
    </w:pPr>
    <w:rPr>
      <w:i/>
      <w:sz w:val="18"/>
    </w:rPr>
  </w:style>
</w:styles>"#,
    );
    out
}

/// Serializes the document into the bytes of a `.docx` package.
pub fn to_bytes(doc: &Document) -> Result<Vec<u8>> {
    let images: Vec<&Image> = doc.images().collect();
    let formats: BTreeSet<&'static str> = images.iter().map(|i| i.format.extension()).collect();

    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let opts = SimpleFileOptions::default();

    zip.start_file("[Content_Types].xml", opts)?;
    zip.write_all(content_types_xml(&formats).as_bytes())?;

    zip.start_file("_rels/.rels", opts)?;
    zip.write_all(rels_xml().as_bytes())?;

    zip.start_file("docProps/core.xml", opts)?;
    zip.write_all(core_xml(doc.title.as_deref()).as_bytes())?;

    zip.start_file("word/document.xml", opts)?;
    zip.write_all(document_xml(&doc.blocks).as_bytes())?;

    zip.start_file("word/styles.xml", opts)?;
    zip.write_all(styles_xml().as_bytes())?;

    zip.start_file("word/_rels/document.xml.rels", opts)?;
    zip.write_all(document_rels_xml(&images).as_bytes())?;

    for (i, img) in images.iter().enumerate() {
        zip.start_file(format!("word/media/{}", media_name(i + 1, img.format)), opts)?;
        zip.write_all(&img.data)?;
    }

    let cursor = zip.finish().context("finish docx archive")?;
    debug!("packaged {} blocks and {} images", doc.blocks.len(), images.len());
    Ok(cursor.into_inner())
}

pub fn write_docx(out_path: &Path, doc: &Document) -> Result<()> {
    let bytes = to_bytes(doc)?;
    fs::write(out_path, bytes).with_context(|| format!("write {}", out_path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{TableCell, TableRow};
    use std::io::Read;
    use zip::ZipArchive;

    fn part(bytes: &[u8], name: &str) -> String {
        let mut archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
        let mut file = archive.by_name(name).unwrap();
        let mut s = String::new();
        file.read_to_string(&mut s).unwrap();
        s
    }

    fn para(style: ParagraphStyle, runs: Vec<Run>) -> Block {
        let mut p = Paragraph::new(style);
        p.runs = runs;
        Block::Paragraph(p)
    }

    fn text(t: &str, style: RunStyle) -> Run {
        Run::new(t, style, RunRole::Text)
    }

    #[test]
    fn package_has_required_parts() {
        let doc = Document {
            title: Some("T & C".into()),
            blocks: vec![para(ParagraphStyle::Heading(1), vec![text("T & C", RunStyle::default())])],
        };
        let bytes = to_bytes(&doc).unwrap();
        let ct = part(&bytes, "[Content_Types].xml");
        assert!(ct.contains("/word/document.xml"));
        assert!(ct.contains("/word/styles.xml"));
        let rels = part(&bytes, "word/_rels/document.xml.rels");
        assert!(rels.contains("Target=\"styles.xml\""));
        assert!(part(&bytes, "docProps/core.xml").contains("<dc:title>T &amp; C</dc:title>"));
        let body = part(&bytes, "word/document.xml");
        assert!(body.contains("<w:pStyle w:val=\"Heading1\"/>"));
        assert!(body.contains(">T &amp; C</w:t>"));
    }

    #[test]
    fn styles_define_six_headings() {
        let styles = styles_xml();
        for level in 1..=6 {
            assert!(styles.contains(&format!("w:styleId=\"Heading{level}\"")));
        }
    }

    #[test]
    fn run_flags_map_to_run_properties() {
        let style = RunStyle {
            bold: true,
            italic: true,
            strike: true,
            subscript: true,
            highlight: true,
            ..Default::default()
        };
        let xml = run_xml(&text("x", style), false);
        for needle in [
            "<w:b/>",
            "<w:i/>",
            "<w:strike/>",
            "<w:highlight w:val=\"yellow\"/>",
            "<w:vertAlign w:val=\"subscript\"/>",
        ] {
            assert!(xml.contains(needle), "{needle} missing from {xml}");
        }
        assert_eq!(
            run_xml(&text("y", RunStyle::default()), false),
            "<w:r><w:t xml:space=\"preserve\">y</w:t></w:r>"
        );
    }

    #[test]
    fn header_row_is_bold_and_shaded() {
        let cell = |t: &str, header| TableCell {
            runs: vec![text(t, RunStyle::default())],
            header,
        };
        let table = Table {
            rows: vec![
                TableRow { cells: vec![cell("A", true), cell("B", true)] },
                TableRow { cells: vec![cell("1", false)] },
            ],
        };
        let xml = table_xml(&table);
        assert_eq!(xml.matches("<w:tr>").count(), 2);
        assert_eq!(xml.matches("<w:tc>").count(), 4);
        assert_eq!(xml.matches("<w:gridCol/>").count(), 2);
        assert_eq!(xml.matches(HEADER_SHADING).count(), 2);
        assert_eq!(xml.matches("<w:b/>").count(), 2);
    }

    #[test]
    fn list_items_indent_by_depth() {
        let mut p = Paragraph::new(ParagraphStyle::ListItem { depth: 3, ordered: false });
        p.runs.push(text("x", RunStyle::default()));
        assert!(paragraph_xml(&p, false).contains("<w:ind w:left=\"2160\""));
    }

    #[test]
    fn images_are_embedded_with_relationships() {
        let img = Image {
            src: "a.png".into(),
            caption: None,
            data: vec![1, 2, 3],
            format: ImageFormat::Png,
            width_px: 100,
            height_px: 50,
        };
        let doc = Document {
            title: None,
            blocks: vec![Block::Image(img), Block::Rule, Block::PageBreak],
        };
        let bytes = to_bytes(&doc).unwrap();
        assert!(part(&bytes, "[Content_Types].xml").contains("Extension=\"png\""));
        assert!(part(&bytes, "word/_rels/document.xml.rels").contains("media/image1.png"));
        let body = part(&bytes, "word/document.xml");
        assert!(body.contains("r:embed=\"rIdImg1\""));
        assert!(body.contains("cx=\"952500\" cy=\"476250\""));
        assert!(body.contains("<w:br w:type=\"page\"/>"));
        assert!(body.contains("<w:pBdr>"));
        let mut archive = ZipArchive::new(Cursor::new(&bytes[..])).unwrap();
        assert_eq!(archive.by_name("word/media/image1.png").unwrap().size(), 3);
    }

    #[test]
    fn control_characters_are_dropped() {
        assert_eq!(xml_escape_text("a\u{1}b\tc"), "ab\tc");
    }
}
