//! `.docx` codec: a WordprocessingML package read into paragraphs of runs and
//! written back out.
//!
//! Only `word/document.xml` is interpreted. Every other package part is copied
//! byte-for-byte, and inside the main part anything that is not a plain text
//! run is carried as verbatim markup, so an unfilled template round-trips to
//! the same XML.

use std::io::{Cursor, Read, Write};
use std::path::Path;

use quick_xml::escape::unescape;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, DateTime, ZipArchive, ZipWriter};

use crate::document::model::{Paragraph, ParagraphItem, Run, RunProperty, RunStyle, StyledDocument};
use crate::errors::{ResumeError, Stage};

const DOCUMENT_PART: &str = "word/document.xml";

#[derive(Debug, Clone)]
struct Part {
    name: String,
    data: Vec<u8>,
    is_dir: bool,
}

#[derive(Debug, Clone, PartialEq)]
enum BodyNode {
    Markup(String),
    Paragraph(Paragraph),
}

/// A loaded Word document.
#[derive(Debug, Clone)]
pub struct DocxDocument {
    parts: Vec<Part>,
    body: Vec<BodyNode>,
}

impl DocxDocument {
    pub async fn open(path: &Path) -> Result<Self, ResumeError> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| ResumeError::file_io(path, Stage::Input, e))?;
        Self::from_bytes(&bytes)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ResumeError> {
        let mut archive = ZipArchive::new(Cursor::new(bytes))
            .map_err(|e| malformed(format!("not a .docx package: {e}")))?;

        let mut parts = Vec::with_capacity(archive.len());
        for index in 0..archive.len() {
            let mut file = archive
                .by_index(index)
                .map_err(|e| malformed(format!("unreadable package entry #{index}: {e}")))?;
            let mut data = Vec::with_capacity(file.size() as usize);
            file.read_to_end(&mut data)
                .map_err(|e| malformed(format!("unreadable package entry '{}': {e}", file.name())))?;
            parts.push(Part {
                name: file.name().to_string(),
                is_dir: file.is_dir(),
                data,
            });
        }

        let main = parts
            .iter()
            .find(|p| p.name == DOCUMENT_PART)
            .ok_or_else(|| malformed(format!("package has no {DOCUMENT_PART}")))?;
        let xml = std::str::from_utf8(&main.data)
            .map_err(|e| malformed(format!("{DOCUMENT_PART} is not UTF-8: {e}")))?;
        let body = parse_body(xml)?;

        Ok(Self { parts, body })
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, ResumeError> {
        let pack = |e: zip::result::ZipError| malformed(format!("failed to write package: {e}"));
        let io = |e: std::io::Error| malformed(format!("failed to write package: {e}"));

        // Fixed timestamps keep output byte-identical for identical inputs.
        let options = SimpleFileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .last_modified_time(DateTime::default());

        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        for part in &self.parts {
            if part.is_dir {
                writer.add_directory(part.name.as_str(), options).map_err(pack)?;
                continue;
            }
            writer.start_file(part.name.as_str(), options).map_err(pack)?;
            if part.name == DOCUMENT_PART {
                writer.write_all(self.render_body().as_bytes()).map_err(io)?;
            } else {
                writer.write_all(&part.data).map_err(io)?;
            }
        }
        Ok(writer.finish().map_err(pack)?.into_inner())
    }

    fn render_body(&self) -> String {
        let mut out = String::new();
        for node in &self.body {
            match node {
                BodyNode::Markup(xml) => out.push_str(xml),
                BodyNode::Paragraph(p) => out.push_str(&p.to_xml()),
            }
        }
        out
    }
}

impl StyledDocument for DocxDocument {
    fn paragraphs(&self) -> Vec<&Paragraph> {
        self.body
            .iter()
            .filter_map(|node| match node {
                BodyNode::Paragraph(p) => Some(p),
                BodyNode::Markup(_) => None,
            })
            .collect()
    }

    fn paragraphs_mut(&mut self) -> Vec<&mut Paragraph> {
        self.body
            .iter_mut()
            .filter_map(|node| match node {
                BodyNode::Paragraph(p) => Some(p),
                BodyNode::Markup(_) => None,
            })
            .collect()
    }
}

// ──────────────────────────────────────────────────────────────
// Parsing
// ──────────────────────────────────────────────────────────────

type XmlReader<'a> = Reader<&'a [u8]>;

fn malformed(message: String) -> ResumeError {
    ResumeError::Document(message)
}

fn next_event<'a>(reader: &mut XmlReader<'a>) -> Result<Event<'a>, ResumeError> {
    reader.read_event().map_err(|e| {
        malformed(format!(
            "{DOCUMENT_PART} is not well-formed at byte {}: {e}",
            reader.buffer_position()
        ))
    })
}

fn position(reader: &XmlReader<'_>) -> usize {
    reader.buffer_position() as usize
}

/// Start of the tag that ends at `end`. Tags never contain a literal `<`.
fn tag_start(xml: &str, end: usize) -> usize {
    xml[..end].rfind('<').unwrap_or(end)
}

fn unexpected_eof() -> ResumeError {
    malformed(format!("{DOCUMENT_PART} ends inside an open element"))
}

fn parse_body(xml: &str) -> Result<Vec<BodyNode>, ResumeError> {
    let mut reader = Reader::from_str(xml);
    let mut nodes = Vec::new();
    let mut markup_start = 0;

    loop {
        let event = next_event(&mut reader)?;
        let end = position(&reader);
        match event {
            Event::Start(e) if e.name().as_ref() == b"w:p" => {
                let start = tag_start(xml, end);
                if start > markup_start {
                    nodes.push(BodyNode::Markup(xml[markup_start..start].to_string()));
                }
                let paragraph = parse_paragraph(&mut reader, xml, xml[start..end].to_string())?;
                nodes.push(BodyNode::Paragraph(paragraph));
                markup_start = position(&reader);
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if markup_start < xml.len() {
        nodes.push(BodyNode::Markup(xml[markup_start..].to_string()));
    }
    Ok(nodes)
}

/// Inline wrappers whose runs are part of the visible paragraph text. Their
/// tags stay verbatim markup; the runs inside are parsed like direct children.
const RUN_CONTAINERS: &[&[u8]] = &[
    b"w:hyperlink",
    b"w:ins",
    b"w:smartTag",
    b"w:sdt",
    b"w:sdtContent",
    b"w:customXml",
    b"w:fldSimple",
];

/// Reads up to and including `</w:p>`. Runs directly under the paragraph or
/// inside a [`RUN_CONTAINERS`] wrapper become `Run`s when they hold nothing
/// but text, tabs and plain line breaks.
fn parse_paragraph(
    reader: &mut XmlReader<'_>,
    xml: &str,
    open_tag: String,
) -> Result<Paragraph, ResumeError> {
    let mut items = Vec::new();
    let mut item_start = position(reader);
    let mut depth = 0usize;
    let mut containers = 0usize;

    let push_markup = |items: &mut Vec<ParagraphItem>, from: usize, to: usize| {
        if to > from {
            items.push(ParagraphItem::Markup(xml[from..to].to_string()));
        }
    };

    loop {
        let event = next_event(reader)?;
        let end = position(reader);
        match event {
            Event::Start(e) if depth == 0 && e.name().as_ref() == b"w:r" => {
                let start = tag_start(xml, end);
                push_markup(&mut items, item_start, start);
                items.push(parse_run(reader, xml, start)?);
                item_start = position(reader);
            }
            Event::Start(e) if depth == 0 && RUN_CONTAINERS.contains(&e.name().as_ref()) => {
                containers += 1;
            }
            Event::Start(_) => depth += 1,
            Event::End(_) if depth == 0 && containers > 0 => containers -= 1,
            Event::End(_) if depth == 0 => {
                push_markup(&mut items, item_start, tag_start(xml, end));
                return Ok(Paragraph { open_tag, items });
            }
            Event::End(_) => depth -= 1,
            Event::Eof => return Err(unexpected_eof()),
            _ => {}
        }
    }
}

fn parse_run(
    reader: &mut XmlReader<'_>,
    xml: &str,
    run_start: usize,
) -> Result<ParagraphItem, ResumeError> {
    let mut text = String::new();
    let mut style = RunStyle::default();
    let mut plain = true;
    let mut depth = 0usize;

    loop {
        let event = next_event(reader)?;
        let end = position(reader);
        match event {
            Event::Start(e) if depth == 0 && e.name().as_ref() == b"w:rPr" => {
                style = parse_properties(reader, xml)?;
            }
            Event::Start(e) if depth == 0 && e.name().as_ref() == b"w:t" => {
                text.push_str(&read_text(reader, xml, end)?);
            }
            Event::Empty(e) if depth == 0 => match e.name().as_ref() {
                b"w:rPr" | b"w:t" | b"w:lastRenderedPageBreak" => {}
                b"w:tab" => text.push('\t'),
                b"w:br" | b"w:cr" if e.attributes().next().is_none() => text.push('\n'),
                _ => plain = false,
            },
            Event::Start(_) => {
                plain = false;
                depth += 1;
            }
            Event::End(_) if depth == 0 => {
                let source = xml[run_start..end].to_string();
                return Ok(if plain {
                    let mut run = Run::new(text, style);
                    run.source_xml = Some(source);
                    ParagraphItem::Run(run)
                } else {
                    ParagraphItem::Markup(source)
                });
            }
            Event::End(_) => depth -= 1,
            Event::Eof => return Err(unexpected_eof()),
            _ => {}
        }
    }
}

/// Unescaped content of a `w:t` whose opening tag ends at `content_start`.
fn read_text(
    reader: &mut XmlReader<'_>,
    xml: &str,
    content_start: usize,
) -> Result<String, ResumeError> {
    loop {
        match next_event(reader)? {
            Event::End(_) => {
                let content_end = tag_start(xml, position(reader));
                let raw = &xml[content_start..content_end];
                return unescape(raw)
                    .map(|t| t.into_owned())
                    .map_err(|e| malformed(format!("bad text content '{raw}': {e}")));
            }
            Event::Eof => return Err(unexpected_eof()),
            Event::Start(_) | Event::Empty(_) => {
                return Err(malformed("unexpected element inside w:t".to_string()))
            }
            _ => {}
        }
    }
}

/// Reads a `w:rPr` block, keeping each child verbatim and decoding the few
/// properties the model exposes.
fn parse_properties(reader: &mut XmlReader<'_>, xml: &str) -> Result<RunStyle, ResumeError> {
    let mut properties = Vec::new();
    let mut font = None;
    let mut size_pt = None;
    let mut bold = false;
    let mut italic = false;

    let mut depth = 0usize;
    let mut child: Option<(String, usize)> = None;

    loop {
        let event = next_event(reader)?;
        let end = position(reader);
        match event {
            Event::Empty(e) if depth == 0 => {
                match e.name().as_ref() {
                    b"w:rFonts" => {
                        font = ["w:ascii", "w:hAnsi", "w:cs", "w:eastAsia"]
                            .iter()
                            .find_map(|key| attribute(&e, key));
                    }
                    b"w:sz" => {
                        size_pt = attribute(&e, "w:val")
                            .and_then(|v| v.parse::<f32>().ok())
                            .map(|half_points| half_points / 2.0);
                    }
                    b"w:b" => bold = is_on(&e),
                    b"w:i" => italic = is_on(&e),
                    _ => {}
                }
                properties.push(RunProperty {
                    name: local_name(&e),
                    xml: xml[tag_start(xml, end)..end].to_string(),
                });
            }
            Event::Start(e) => {
                if depth == 0 {
                    child = Some((local_name(&e), tag_start(xml, end)));
                }
                depth += 1;
            }
            Event::End(_) if depth == 0 => break,
            Event::End(_) => {
                depth -= 1;
                if depth == 0 {
                    if let Some((name, start)) = child.take() {
                        properties.push(RunProperty {
                            name,
                            xml: xml[start..end].to_string(),
                        });
                    }
                }
            }
            Event::Eof => return Err(unexpected_eof()),
            _ => {}
        }
    }

    Ok(RunStyle::from_parts(properties, font, size_pt, bold, italic))
}

fn attribute(element: &BytesStart<'_>, key: &str) -> Option<String> {
    element
        .try_get_attribute(key)
        .ok()
        .flatten()
        .and_then(|a| a.unescape_value().ok())
        .map(|v| v.into_owned())
}

/// Toggle properties are on unless `w:val` says otherwise.
fn is_on(element: &BytesStart<'_>) -> bool {
    !matches!(
        attribute(element, "w:val").as_deref(),
        Some("0" | "false" | "off")
    )
}

fn local_name(element: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(element.local_name().as_ref()).into_owned()
}
