//! In-memory document shape: ordered paragraphs of ordered styled runs.
//!
//! Everything the filler needs and nothing more. Concrete formats (`.docx`)
//! map onto this through the `StyledDocument` trait; anything a format carries
//! that is not a plain text run is kept as opaque `Markup` so it round-trips
//! untouched.

use quick_xml::escape::escape;

/// `w:rPr` children in the order WordprocessingML requires them.
const PROPERTY_ORDER: &[&str] = &[
    "rStyle", "rFonts", "b", "bCs", "i", "iCs", "caps", "smallCaps", "strike", "dstrike",
    "outline", "shadow", "emboss", "imprint", "noProof", "snapToGrid", "vanish", "webHidden",
    "color", "spacing", "w", "kern", "position", "sz", "szCs", "highlight", "u", "effect", "bdr",
    "shd", "fitText", "vertAlign", "rtl", "cs", "em", "lang", "eastAsianLayout", "specVanish",
    "oMath",
];

/// One child element of a run's property block, kept verbatim.
#[derive(Debug, Clone, PartialEq)]
pub struct RunProperty {
    pub name: String,
    pub xml: String,
}

/// Character formatting of a run.
///
/// The typed accessors cover what callers inspect; the full property list is
/// preserved so that colours, underline, language tags etc. survive a rewrite.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunStyle {
    font: Option<String>,
    size_pt: Option<f32>,
    bold: bool,
    italic: bool,
    properties: Vec<RunProperty>,
}

impl RunStyle {
    pub(crate) fn from_parts(
        properties: Vec<RunProperty>,
        font: Option<String>,
        size_pt: Option<f32>,
        bold: bool,
        italic: bool,
    ) -> Self {
        Self {
            font,
            size_pt,
            bold,
            italic,
            properties,
        }
    }

    pub fn font(&self) -> Option<&str> {
        self.font.as_deref()
    }

    pub fn size_pt(&self) -> Option<f32> {
        self.size_pt
    }

    pub fn is_bold(&self) -> bool {
        self.bold
    }

    pub fn is_italic(&self) -> bool {
        self.italic
    }

    pub fn with_font(mut self, font: &str) -> Self {
        let font_attr = escape(font);
        self.upsert(
            "rFonts",
            format!(r#"<w:rFonts w:ascii="{font_attr}" w:hAnsi="{font_attr}" w:cs="{font_attr}"/>"#),
        );
        self.font = Some(font.to_string());
        self
    }

    pub fn with_size_pt(mut self, size_pt: f32) -> Self {
        let half_points = (size_pt * 2.0).round() as u32;
        self.upsert("sz", format!(r#"<w:sz w:val="{half_points}"/>"#));
        self.upsert("szCs", format!(r#"<w:szCs w:val="{half_points}"/>"#));
        self.size_pt = Some(size_pt);
        self
    }

    pub fn with_bold(mut self, bold: bool) -> Self {
        if bold {
            self.upsert("b", "<w:b/>".to_string());
        } else {
            self.properties.retain(|p| p.name != "b");
        }
        self.bold = bold;
        self
    }

    pub fn with_italic(mut self, italic: bool) -> Self {
        if italic {
            self.upsert("i", "<w:i/>".to_string());
        } else {
            self.properties.retain(|p| p.name != "i");
        }
        self.italic = italic;
        self
    }

    /// Renders the `w:rPr` block, or nothing for an unstyled run.
    pub fn to_xml(&self) -> String {
        if self.properties.is_empty() {
            return String::new();
        }
        let mut out = String::from("<w:rPr>");
        for property in &self.properties {
            out.push_str(&property.xml);
        }
        out.push_str("</w:rPr>");
        out
    }

    /// Replaces the property called `name`, or inserts it at its schema position.
    fn upsert(&mut self, name: &str, xml: String) {
        if let Some(existing) = self.properties.iter_mut().find(|p| p.name == name) {
            existing.xml = xml;
            return;
        }
        let rank = |n: &str| PROPERTY_ORDER.iter().position(|o| *o == n).unwrap_or(usize::MAX);
        let target = rank(name);
        let index = self
            .properties
            .iter()
            .position(|p| rank(&p.name) > target)
            .unwrap_or(self.properties.len());
        self.properties.insert(
            index,
            RunProperty {
                name: name.to_string(),
                xml,
            },
        );
    }
}

/// A span of text sharing one style.
#[derive(Debug, Clone, PartialEq)]
pub struct Run {
    pub text: String,
    pub style: RunStyle,
    /// Original markup; cleared whenever the run is rewritten.
    pub(crate) source_xml: Option<String>,
}

impl Run {
    pub fn new(text: impl Into<String>, style: RunStyle) -> Self {
        Self {
            text: text.into(),
            style,
            source_xml: None,
        }
    }

    /// Renders the run, reusing the original markup when untouched.
    pub fn to_xml(&self) -> String {
        if let Some(source) = &self.source_xml {
            return source.clone();
        }

        let mut out = String::from("<w:r>");
        out.push_str(&self.style.to_xml());
        let mut segment = String::new();
        let flush = |out: &mut String, segment: &mut String| {
            if !segment.is_empty() {
                out.push_str(r#"<w:t xml:space="preserve">"#);
                out.push_str(&escape(segment.as_str()));
                out.push_str("</w:t>");
                segment.clear();
            }
        };
        for c in self.text.chars() {
            match c {
                '\n' => {
                    flush(&mut out, &mut segment);
                    out.push_str("<w:br/>");
                }
                '\t' => {
                    flush(&mut out, &mut segment);
                    out.push_str("<w:tab/>");
                }
                c => segment.push(c),
            }
        }
        flush(&mut out, &mut segment);
        out.push_str("</w:r>");
        out
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ParagraphItem {
    Run(Run),
    /// Paragraph properties, bookmarks, fields, drawings, hyperlinks… kept verbatim.
    Markup(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Paragraph {
    pub(crate) open_tag: String,
    pub items: Vec<ParagraphItem>,
}

impl Paragraph {
    pub fn from_runs(runs: impl IntoIterator<Item = Run>) -> Self {
        Self {
            open_tag: "<w:p>".to_string(),
            items: runs.into_iter().map(ParagraphItem::Run).collect(),
        }
    }

    pub fn runs(&self) -> impl Iterator<Item = &Run> {
        self.items.iter().filter_map(|item| match item {
            ParagraphItem::Run(run) => Some(run),
            ParagraphItem::Markup(_) => None,
        })
    }

    /// Visible text: the concatenation of every run's text.
    pub fn text(&self) -> String {
        self.runs().map(|r| r.text.as_str()).collect()
    }

    pub fn to_xml(&self) -> String {
        let mut out = self.open_tag.clone();
        for item in &self.items {
            match item {
                ParagraphItem::Run(run) => out.push_str(&run.to_xml()),
                ParagraphItem::Markup(xml) => out.push_str(xml),
            }
        }
        out.push_str("</w:p>");
        out
    }
}

/// A document seen as ordered paragraphs of styled runs.
pub trait StyledDocument: Clone {
    fn paragraphs(&self) -> Vec<&Paragraph>;
    fn paragraphs_mut(&mut self) -> Vec<&mut Paragraph>;
}

/// Format-free document; useful wherever no real file backs the template.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlainDocument {
    pub paragraphs: Vec<Paragraph>,
}

impl PlainDocument {
    pub fn new(paragraphs: Vec<Paragraph>) -> Self {
        Self { paragraphs }
    }
}

impl StyledDocument for PlainDocument {
    fn paragraphs(&self) -> Vec<&Paragraph> {
        self.paragraphs.iter().collect()
    }

    fn paragraphs_mut(&mut self) -> Vec<&mut Paragraph> {
        self.paragraphs.iter_mut().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_style_builders_keep_schema_order() {
        let style = RunStyle::default()
            .with_size_pt(10.0)
            .with_italic(true)
            .with_font("Spectral")
            .with_bold(true);
        assert_eq!(
            style.to_xml(),
            r#"<w:rPr><w:rFonts w:ascii="Spectral" w:hAnsi="Spectral" w:cs="Spectral"/><w:b/><w:i/><w:sz w:val="20"/><w:szCs w:val="20"/></w:rPr>"#
        );
        assert_eq!(style.font(), Some("Spectral"));
        assert_eq!(style.size_pt(), Some(10.0));
        assert!(style.is_bold() && style.is_italic());
    }

    #[test]
    fn test_overriding_font_keeps_other_properties() {
        let style = RunStyle::from_parts(
            vec![
                RunProperty {
                    name: "rFonts".into(),
                    xml: r#"<w:rFonts w:ascii="Arial"/>"#.into(),
                },
                RunProperty {
                    name: "color".into(),
                    xml: r#"<w:color w:val="FF0000"/>"#.into(),
                },
            ],
            Some("Arial".into()),
            None,
            false,
            false,
        )
        .with_font("Spectral");
        let xml = style.to_xml();
        assert!(xml.contains(r#"w:ascii="Spectral""#));
        assert!(!xml.contains("Arial"));
        assert!(xml.contains(r#"<w:color w:val="FF0000"/>"#));
    }

    #[test]
    fn test_unbolding_removes_property() {
        let style = RunStyle::default().with_bold(true).with_bold(false);
        assert_eq!(style.to_xml(), "");
        assert!(!style.is_bold());
    }

    #[test]
    fn test_run_xml_escapes_and_breaks() {
        let run = Run::new("R&D <lead>\nsecond\tline", RunStyle::default());
        assert_eq!(
            run.to_xml(),
            r#"<w:r><w:t xml:space="preserve">R&amp;D &lt;lead&gt;</w:t><w:br/><w:t xml:space="preserve">second</w:t><w:tab/><w:t xml:space="preserve">line</w:t></w:r>"#
        );
    }

    #[test]
    fn test_paragraph_text_skips_markup() {
        let mut paragraph = Paragraph::from_runs([
            Run::new("Hello ", RunStyle::default()),
            Run::new("world", RunStyle::default().with_bold(true)),
        ]);
        paragraph
            .items
            .insert(1, ParagraphItem::Markup("<w:proofErr w:type=\"spellStart\"/>".into()));
        assert_eq!(paragraph.text(), "Hello world");
        assert_eq!(paragraph.runs().count(), 2);
    }
}
