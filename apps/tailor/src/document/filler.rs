//! Document Filler — replaces the placeholder marker in a template with a
//! generated passage while keeping the surrounding formatting.
//!
//! Word processors routinely split a typed marker such as `<objective_here>`
//! across several runs (spell-check boundaries, revision ids, partial
//! formatting). Matching therefore happens on each paragraph's concatenated
//! run text; the runs the match touches are then rebuilt so that text before
//! the marker keeps the first run's style, the passage takes the style of the
//! run where the marker starts, and text after the marker keeps the last
//! run's style. Non-run markup inside the span (bookmarks, proofing marks)
//! stays where it was.

use tracing::debug;

use crate::document::model::{Paragraph, ParagraphItem, Run, StyledDocument};
use crate::errors::ResumeError;
use crate::generation::response::GeneratedPassage;

pub const DEFAULT_PLACEHOLDER: &str = "<objective_here>";

/// Formatting forced onto the inserted passage.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FillOptions {
    pub font: Option<String>,
    pub font_size_pt: Option<f32>,
}

/// Returns a copy of `template` with every occurrence of `placeholder`
/// replaced by `passage`. The template itself is never modified.
///
/// Fails with `PlaceholderNotFound` when the marker does not occur in any
/// paragraph, and with `InvalidInput` for an empty marker.
pub fn fill_placeholder<D: StyledDocument>(
    template: &D,
    placeholder: &str,
    passage: &GeneratedPassage,
    options: &FillOptions,
) -> Result<D, ResumeError> {
    if placeholder.is_empty() {
        return Err(ResumeError::InvalidInput(
            "placeholder marker must not be empty".to_string(),
        ));
    }

    let mut document = template.clone();
    let mut replaced = 0;
    for paragraph in document.paragraphs_mut() {
        replaced += replace_in_paragraph(paragraph, placeholder, passage.as_str(), options);
    }

    if replaced == 0 {
        return Err(ResumeError::PlaceholderNotFound {
            placeholder: placeholder.to_string(),
        });
    }

    debug!("Replaced {replaced} placeholder occurrence(s)");
    Ok(document)
}

/// Number of marker occurrences, counting ones split across runs.
pub fn count_placeholders<D: StyledDocument>(document: &D, placeholder: &str) -> usize {
    if placeholder.is_empty() {
        return 0;
    }
    document
        .paragraphs()
        .iter()
        .map(|p| p.text().matches(placeholder).count())
        .sum()
}

/// Byte range a run occupies in the paragraph's concatenated text.
struct RunSpan {
    item: usize,
    start: usize,
    end: usize,
}

fn run_spans(paragraph: &Paragraph) -> (String, Vec<RunSpan>) {
    let mut text = String::new();
    let mut spans = Vec::new();
    for (item, entry) in paragraph.items.iter().enumerate() {
        if let ParagraphItem::Run(run) = entry {
            let start = text.len();
            text.push_str(&run.text);
            spans.push(RunSpan {
                item,
                start,
                end: text.len(),
            });
        }
    }
    (text, spans)
}

fn replace_in_paragraph(
    paragraph: &mut Paragraph,
    placeholder: &str,
    passage: &str,
    options: &FillOptions,
) -> usize {
    let mut replaced = 0;
    // Resume searching after the inserted passage so a passage that happens
    // to contain the marker is never re-expanded.
    let mut search_from = 0;

    loop {
        let (text, spans) = run_spans(paragraph);
        let Some(offset) = text.get(search_from..).and_then(|t| t.find(placeholder)) else {
            break;
        };
        let match_start = search_from + offset;
        let match_end = match_start + placeholder.len();

        let (Some(first), Some(last)) = (
            spans
                .iter()
                .find(|s| s.start <= match_start && match_start < s.end),
            spans
                .iter()
                .find(|s| s.start < match_end && match_end <= s.end),
        ) else {
            break;
        };

        let (first_run, last_run) = match (
            &paragraph.items[first.item],
            &paragraph.items[last.item],
        ) {
            (ParagraphItem::Run(a), ParagraphItem::Run(b)) => (a.clone(), b.clone()),
            _ => break,
        };

        let prefix = &first_run.text[..match_start - first.start];
        let suffix = &last_run.text[match_end - last.start..];

        let mut passage_style = first_run.style.clone();
        if let Some(font) = &options.font {
            passage_style = passage_style.with_font(font);
        }
        if let Some(size) = options.font_size_pt {
            passage_style = passage_style.with_size_pt(size);
        }

        let mut rebuilt = Vec::new();
        if !prefix.is_empty() {
            rebuilt.push(ParagraphItem::Run(Run::new(prefix, first_run.style.clone())));
        }
        rebuilt.push(ParagraphItem::Run(Run::new(passage, passage_style)));
        // Runs swallowed by the marker disappear; markup between them stays.
        if last.item > first.item {
            for item in &paragraph.items[first.item + 1..last.item] {
                if let ParagraphItem::Markup(xml) = item {
                    rebuilt.push(ParagraphItem::Markup(xml.clone()));
                }
            }
        }
        if !suffix.is_empty() {
            rebuilt.push(ParagraphItem::Run(Run::new(suffix, last_run.style.clone())));
        }

        paragraph.items.splice(first.item..=last.item, rebuilt);
        replaced += 1;
        search_from = match_start + passage.len();
    }

    replaced
}
