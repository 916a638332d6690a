//! Response parsing — turns raw model output into a sanitized passage plus the
//! role/company metadata the model was asked to echo back.

use serde::Serialize;

use crate::errors::ResumeError;

/// Generated text that is safe to insert into a document.
///
/// Holds no XML-illegal characters, uses `\n` line endings and never starts or
/// ends with whitespace. Construct through [`GeneratedPassage::sanitize`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct GeneratedPassage(String);

impl GeneratedPassage {
    /// Cleans untrusted model text. Fails with `InvalidResponse` when nothing is left.
    pub fn sanitize(raw: &str) -> Result<Self, ResumeError> {
        let text = strip_fences(raw.trim()).replace("\r\n", "\n").replace('\r', "\n");

        let cleaned: String = text
            .chars()
            .filter(|&c| is_document_safe(c))
            .collect::<String>()
            .replace("**", "");

        let mut lines: Vec<&str> = Vec::new();
        let mut blank_run = 0;
        for line in cleaned.lines().map(str::trim_end) {
            if line.trim().is_empty() {
                blank_run += 1;
                if blank_run > 1 {
                    continue;
                }
            } else {
                blank_run = 0;
            }
            lines.push(line);
        }

        let passage = lines.join("\n").trim().to_string();
        if passage.is_empty() {
            return Err(ResumeError::InvalidResponse(
                "generated passage is empty".to_string(),
            ));
        }
        Ok(GeneratedPassage(passage))
    }

    /// Collapses all whitespace, including line breaks, to single spaces.
    pub fn into_single_paragraph(self) -> Self {
        GeneratedPassage(self.0.split_whitespace().collect::<Vec<_>>().join(" "))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Parsed model output.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedGeneration {
    pub passage: GeneratedPassage,
    pub role: Option<String>,
    pub company: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Preamble,
    Passage,
    Role,
    Company,
    Filename,
}

const LABELS: &[(&str, Section)] = &[
    ("CAREER OBJECTIVE", Section::Passage),
    ("OBJECTIVE", Section::Passage),
    ("COVER LETTER", Section::Passage),
    ("ROLE", Section::Role),
    ("COMPANY", Section::Company),
    ("FILENAME", Section::Filename),
];

/// Splits labeled output (`OBJECTIVE:` / `ROLE:` / `COMPANY:`) into its parts.
///
/// Unlabeled output is taken whole as the passage. A legacy
/// `FILENAME: role-at-company` section is used when `ROLE`/`COMPANY` are absent.
pub fn parse_generation(raw: &str) -> Result<ParsedGeneration, ResumeError> {
    let mut sections: Vec<(Section, Vec<&str>)> = vec![(Section::Preamble, Vec::new())];

    for line in raw.lines() {
        match match_label(line) {
            Some((section, rest)) => {
                let mut body = Vec::new();
                if !rest.is_empty() {
                    body.push(rest);
                }
                sections.push((section, body));
            }
            None => {
                if let Some((_, body)) = sections.last_mut() {
                    body.push(line);
                }
            }
        }
    }

    let collect = |wanted: Section| -> String {
        sections
            .iter()
            .filter(|(s, _)| *s == wanted)
            .flat_map(|(_, body)| body.iter().copied())
            .collect::<Vec<_>>()
            .join("\n")
    };

    let labeled = sections.len() > 1;
    let passage_text = if labeled {
        let passage = collect(Section::Passage);
        if passage.trim().is_empty() {
            collect(Section::Preamble)
        } else {
            passage
        }
    } else {
        raw.to_string()
    };

    let passage = GeneratedPassage::sanitize(&passage_text)?;

    let mut role = metadata_value(&collect(Section::Role));
    let mut company = metadata_value(&collect(Section::Company));

    if role.is_none() && company.is_none() {
        if let Some(filename) = metadata_value(&collect(Section::Filename)) {
            let (r, c) = split_filename_hint(&filename);
            role = r;
            company = c;
        }
    }

    Ok(ParsedGeneration {
        passage,
        role,
        company,
    })
}

fn match_label(line: &str) -> Option<(Section, &str)> {
    let stripped = line.trim().trim_start_matches(['*', '#', ' ']);
    for (label, section) in LABELS {
        let Some(head) = stripped.get(..label.len()) else {
            continue;
        };
        if !head.eq_ignore_ascii_case(label) {
            continue;
        }
        let tail = stripped[label.len()..].trim_start_matches('*');
        if let Some(rest) = tail.strip_prefix(':') {
            return Some((*section, rest.trim().trim_matches('*').trim()));
        }
    }
    None
}

/// First meaningful line of a metadata section; template echoes and filler
/// answers count as missing.
fn metadata_value(body: &str) -> Option<String> {
    let line = body.lines().map(str::trim).find(|l| !l.is_empty())?;
    if line.starts_with('[') {
        return None;
    }
    let value = line.trim_matches(|c: char| c == '"' || c == '\'' || c == '*').trim();
    match value.to_ascii_lowercase().as_str() {
        "" | "n/a" | "na" | "none" | "unknown" | "not specified" | "empty" => None,
        _ => Some(value.to_string()),
    }
}

/// `senior-engineer-at-acme` → (`senior engineer`, `acme`).
fn split_filename_hint(hint: &str) -> (Option<String>, Option<String>) {
    let hint = hint.trim_end_matches(".docx");
    let humanize = |s: &str| {
        let words = s.replace(['-', '_'], " ");
        let words = words.split_whitespace().collect::<Vec<_>>().join(" ");
        (!words.is_empty()).then_some(words)
    };
    match hint.split_once("-at-") {
        Some((role, company)) => (humanize(role), humanize(company)),
        None => (humanize(hint), None),
    }
}

fn strip_fences(text: &str) -> &str {
    let Some(stripped) = text.strip_prefix("```") else {
        return text;
    };
    // Drop an info string such as ```text on the opening fence.
    let body = match stripped.split_once('\n') {
        Some((first, rest)) if !first.contains(' ') => rest,
        _ => stripped,
    };
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

/// XML 1.0 admits tab, newline and everything from U+0020 except the
/// non-characters U+FFFE/U+FFFF; C1 controls are dropped as well.
fn is_document_safe(c: char) -> bool {
    match c {
        '\t' | '\n' => true,
        '\u{7f}'..='\u{9f}' | '\u{fffe}' | '\u{ffff}' => false,
        c => !c.is_control(),
    }
}
