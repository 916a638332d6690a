//! Generation Request Builder — assembles the exact prompt sent to the text
//! generation service from resume and job description text.
//!
//! Pure transformation: no I/O, no clock, no randomness.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::errors::ResumeError;
use crate::generation::prompts::{COVER_LETTER_PROMPT_TEMPLATE, OBJECTIVE_PROMPT_TEMPLATE};
use crate::generation::tone::{ObjectiveLength, Tone};
use crate::llm_client::prompts::NO_INVENTION_INSTRUCTION;

/// Company name used in a cover letter when none is known.
const UNKNOWN_COMPANY: &str = "the company";

/// Which passage the model is asked to write.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum DocumentKind {
    #[default]
    Objective,
    CoverLetter,
}

/// Upper bounds on the text forwarded to the generation service, in characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PromptLimits {
    pub resume_chars: usize,
    pub job_description_chars: usize,
}

impl Default for PromptLimits {
    fn default() -> Self {
        Self {
            resume_chars: 4000,
            job_description_chars: 2000,
        }
    }
}

/// Everything needed to build one prompt.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub resume: String,
    pub job_description: String,
    pub tone: Tone,
    pub length: ObjectiveLength,
    pub kind: DocumentKind,
    /// Company name for cover letter personalisation.
    pub company: Option<String>,
}

impl GenerationRequest {
    pub fn new(resume: impl Into<String>, job_description: impl Into<String>) -> Self {
        Self {
            resume: resume.into(),
            job_description: job_description.into(),
            tone: Tone::default(),
            length: ObjectiveLength::default(),
            kind: DocumentKind::default(),
            company: None,
        }
    }
}

/// Builds the prompt for `request`, truncating inputs to `limits`.
///
/// Fails with `InvalidInput` when either input is blank.
pub fn build_prompt(
    request: &GenerationRequest,
    limits: &PromptLimits,
) -> Result<String, ResumeError> {
    let resume = request.resume.trim();
    let job_description = request.job_description.trim();

    if resume.is_empty() {
        return Err(ResumeError::InvalidInput("resume text is empty".to_string()));
    }
    if job_description.is_empty() {
        return Err(ResumeError::InvalidInput(
            "job description text is empty".to_string(),
        ));
    }

    let resume = truncate_at_word(resume, limits.resume_chars);
    let job_description = truncate_at_word(job_description, limits.job_description_chars);

    let guidance = request.tone.guidance();
    let preferred = guidance.preferred_phrases.join(", ");
    let avoid = guidance.avoid_phrases.join(", ");
    let company = request
        .company
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .unwrap_or(UNKNOWN_COMPANY);

    let prompt = match request.kind {
        DocumentKind::Objective => fill_template(
            OBJECTIVE_PROMPT_TEMPLATE,
            &[
                ("no_invention_instruction", NO_INVENTION_INSTRUCTION),
                ("tone", request.tone.as_str()),
                ("tone_register", guidance.register),
                ("preferred_phrases", &preferred),
                ("avoid_phrases", &avoid),
                ("length", request.length.sentences()),
                ("resume", resume),
                ("job_description", job_description),
            ],
        ),
        DocumentKind::CoverLetter => fill_template(
            COVER_LETTER_PROMPT_TEMPLATE,
            &[
                ("no_invention_instruction", NO_INVENTION_INSTRUCTION),
                ("tone", request.tone.as_str()),
                ("tone_register", guidance.register),
                ("company", company),
                ("resume", resume),
                ("job_description", job_description),
            ],
        ),
    };

    Ok(prompt)
}

/// Keeps at most `limit` characters from the head of `text`, backing off to the
/// last whitespace inside the window so no word is cut in half. Falls back to a
/// hard cut when the window holds a single unbroken word.
pub fn truncate_at_word(text: &str, limit: usize) -> &str {
    let Some((cut, _)) = text.char_indices().nth(limit) else {
        return text;
    };

    let head = &text[..cut];
    if text[cut..].starts_with(char::is_whitespace) {
        return head.trim_end();
    }

    match head.rfind(char::is_whitespace) {
        Some(boundary) if !head[..boundary].trim_end().is_empty() => head[..boundary].trim_end(),
        _ => head,
    }
}

/// Single-pass `{key}` substitution. Only placeholders present in the template
/// are expanded, so braces inside substituted values are left untouched.
fn fill_template(template: &str, values: &[(&str, &str)]) -> String {
    let extra: usize = values.iter().map(|(_, v)| v.len()).sum();
    let mut out = String::with_capacity(template.len() + extra);
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let matched = after.find('}').and_then(|close| {
            let key = &after[..close];
            values
                .iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| (close, *v))
        });

        match matched {
            Some((close, value)) => {
                out.push_str(value);
                rest = &after[close + 1..];
            }
            None => {
                out.push('{');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const RESUME: &str = "# Jane Doe\nBackend engineer. Rust, PostgreSQL, Kafka. Led migration to async Rust.";
    const JD: &str = "Backend Engineer at Acme\nRequired: Rust, distributed systems.";

    #[test]
    fn test_prompt_contains_both_inputs_verbatim() {
        let request = GenerationRequest::new(RESUME, JD);
        let prompt = build_prompt(&request, &PromptLimits::default()).unwrap();
        assert!(prompt.contains(RESUME));
        assert!(prompt.contains(JD));
        assert!(prompt.contains("professional"));
        assert!(prompt.contains("2-3 sentences"));
    }

    #[test]
    fn test_tone_is_interpolated() {
        let mut request = GenerationRequest::new(RESUME, JD);
        request.tone = Tone::Enthusiastic;
        let prompt = build_prompt(&request, &PromptLimits::default()).unwrap();
        assert!(prompt.contains("The tone must be enthusiastic."));
        assert!(prompt.contains(Tone::Enthusiastic.guidance().register));
    }

    #[test]
    fn test_empty_inputs_are_rejected() {
        let blank_resume = GenerationRequest::new("  \n\t", JD);
        assert!(matches!(
            build_prompt(&blank_resume, &PromptLimits::default()),
            Err(ResumeError::InvalidInput(_))
        ));

        let blank_jd = GenerationRequest::new(RESUME, "");
        assert!(matches!(
            build_prompt(&blank_jd, &PromptLimits::default()),
            Err(ResumeError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_long_inputs_are_truncated_on_word_boundary() {
        let resume = "alpha beta gamma delta epsilon";
        let limits = PromptLimits {
            resume_chars: 13,
            job_description_chars: 2000,
        };
        let prompt = build_prompt(&GenerationRequest::new(resume, JD), &limits).unwrap();
        assert!(prompt.contains("alpha beta"));
        assert!(!prompt.contains("alpha beta g"));
        assert!(!prompt.contains("gamma"));
    }

    #[test]
    fn test_truncate_at_word() {
        assert_eq!(truncate_at_word("short", 10), "short");
        assert_eq!(truncate_at_word("hello world", 11), "hello world");
        assert_eq!(truncate_at_word("hello world", 5), "hello");
        assert_eq!(truncate_at_word("hello world", 8), "hello");
        // Single unbroken word: hard cut.
        assert_eq!(truncate_at_word("supercalifragilistic", 5), "super");
        // Counts characters, not bytes.
        assert_eq!(truncate_at_word("héllo wörld", 7), "héllo");
    }

    #[test]
    fn test_cover_letter_uses_company() {
        let mut request = GenerationRequest::new(RESUME, JD);
        request.kind = DocumentKind::CoverLetter;
        request.company = Some("Acme".to_string());
        let prompt = build_prompt(&request, &PromptLimits::default()).unwrap();
        assert!(prompt.contains("job application at Acme"));
        assert!(prompt.contains("COVER LETTER:"));

        request.company = None;
        let prompt = build_prompt(&request, &PromptLimits::default()).unwrap();
        assert!(prompt.contains("job application at the company"));
    }

    #[test]
    fn test_braces_in_inputs_are_not_expanded() {
        let resume = "Built {job_description} templating engine";
        let prompt = build_prompt(&GenerationRequest::new(resume, JD), &PromptLimits::default()).unwrap();
        assert!(prompt.contains(resume));
    }

    #[test]
    fn test_fill_template_leaves_unknown_keys() {
        assert_eq!(fill_template("{a} {b} {", &[("a", "1")]), "1 {b} {");
    }
}
