//! JD metadata — best-effort role/company extraction from a raw job description.
//!
//! Used only to name the output file when neither the caller nor the model
//! supplied the role and company. Never fails; returns `None` for anything it
//! cannot find.

use std::sync::OnceLock;

use regex::Regex;

/// Role and company pulled from a job description.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobMetadata {
    pub role: Option<String>,
    pub company: Option<String>,
}

impl JobMetadata {
    /// Field-wise fallback: keeps `self` where set, fills gaps from `other`.
    pub fn or(self, other: JobMetadata) -> JobMetadata {
        JobMetadata {
            role: self.role.or(other.role),
            company: self.company.or(other.company),
        }
    }
}

fn role_label() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?im)^\s*(?:job\s+title|title|role|position)\s*:\s*(.+?)\s*$")
            .expect("valid role regex")
    })
}

fn company_label() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?im)^\s*(?:company(?:\s+name)?|employer|organi[sz]ation)\s*:\s*(.+?)\s*$")
            .expect("valid company regex")
    })
}

fn headline() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)^(?:we(?:'re| are)\s+hiring:?\s*)?(?:an?\s+)?(.+?)\s+(?:at|@)\s+(.+?)[\s.!]*$")
            .expect("valid headline regex")
    })
}

/// Extracts role and company from labeled lines (`Title:`, `Company:`) first,
/// then from a `<role> at <company>` headline among the first few lines.
pub fn extract_job_metadata(job_description: &str) -> JobMetadata {
    let mut meta = JobMetadata {
        role: role_label()
            .captures(job_description)
            .and_then(|c| clean(&c[1])),
        company: company_label()
            .captures(job_description)
            .and_then(|c| clean(&c[1])),
    };

    if meta.role.is_some() && meta.company.is_some() {
        return meta;
    }

    let first_lines = job_description
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .take(3);

    for line in first_lines {
        // Headlines are short; skip prose sentences that merely contain " at ".
        if line.split_whitespace().count() > 12 {
            continue;
        }
        if let Some(caps) = headline().captures(line) {
            meta = meta.or(JobMetadata {
                role: clean(&caps[1]),
                company: clean(&caps[2]),
            });
            break;
        }
    }

    meta
}

fn clean(value: &str) -> Option<String> {
    let value = value
        .trim()
        .trim_start_matches(['#', '*', ' '])
        .trim_end_matches(['*', ' ']);
    // "Acme — Remote (US)" → "Acme"
    let value = value
        .split(" — ")
        .next()
        .unwrap_or(value)
        .split(" | ")
        .next()
        .unwrap_or(value)
        .split(" (")
        .next()
        .unwrap_or(value)
        .trim();
    (!value.is_empty()).then(|| value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_headline_role_at_company() {
        let meta = extract_job_metadata("Backend Engineer at Acme");
        assert_eq!(meta.role.as_deref(), Some("Backend Engineer"));
        assert_eq!(meta.company.as_deref(), Some("Acme"));
    }

    #[test]
    fn test_labeled_lines_win() {
        let jd = "Join our growing team!\nJob Title: Staff Data Engineer\nCompany: Globex Corporation\nRequirements: SQL";
        let meta = extract_job_metadata(jd);
        assert_eq!(meta.role.as_deref(), Some("Staff Data Engineer"));
        assert_eq!(meta.company.as_deref(), Some("Globex Corporation"));
    }

    #[test]
    fn test_markdown_headline_with_suffix() {
        let meta = extract_job_metadata("## Senior SRE @ Initech — Remote (EU)\n\nYou will keep things up.");
        assert_eq!(meta.role.as_deref(), Some("Senior SRE"));
        assert_eq!(meta.company.as_deref(), Some("Initech"));
    }

    #[test]
    fn test_prose_sentence_is_not_a_headline() {
        let jd = "In this role you will work closely with designers and product managers at a fast-growing fintech startup to build great things.";
        assert_eq!(extract_job_metadata(jd), JobMetadata::default());
    }

    #[test]
    fn test_nothing_found() {
        assert_eq!(
            extract_job_metadata("Requirements: Rust\nNice to have: Go"),
            JobMetadata::default()
        );
    }

    #[test]
    fn test_or_fills_gaps_only() {
        let a = JobMetadata {
            role: Some("Engineer".into()),
            company: None,
        };
        let b = JobMetadata {
            role: Some("Other".into()),
            company: Some("Acme".into()),
        };
        let merged = a.or(b);
        assert_eq!(merged.role.as_deref(), Some("Engineer"));
        assert_eq!(merged.company.as_deref(), Some("Acme"));
    }
}
