//! Output Namer — derives a filesystem-safe, descriptive file name from the
//! target role and company, with a timestamp fallback and numeric
//! disambiguation. Pure: the clock and the existence check are supplied by the
//! caller.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

/// Longest stem produced, in characters.
pub const MAX_STEM_CHARS: usize = 80;

const FALLBACK_PREFIX: &str = "resume";

pub struct OutputNamer;

impl OutputNamer {
    /// `{role}_{company}` from the normalized parts; either alone when the other
    /// normalizes to nothing, `resume_{YYYYMMDD-HHMMSS}` when both do.
    pub fn stem(role: Option<&str>, company: Option<&str>, now: DateTime<Utc>) -> String {
        let parts: Vec<String> = [role, company]
            .into_iter()
            .flatten()
            .map(normalize_component)
            .filter(|p| !p.is_empty())
            .collect();

        if parts.is_empty() {
            return format!("{FALLBACK_PREFIX}_{}", now.format("%Y%m%d-%H%M%S"));
        }

        let joined = parts.join("_");
        // Normalized text is pure ASCII, so byte and char positions agree.
        let capped = &joined[..joined.len().min(MAX_STEM_CHARS)];
        capped.trim_end_matches(is_separator).to_string()
    }

    /// `{stem}.{ext}`, `{stem}-1.{ext}`, `{stem}-2.{ext}`, … inside `dir`.
    pub fn candidates<'a>(
        dir: &'a Path,
        stem: &'a str,
        extension: &'a str,
    ) -> impl Iterator<Item = PathBuf> + 'a {
        (0u32..).map(move |n| {
            let name = if n == 0 {
                format!("{stem}.{extension}")
            } else {
                format!("{stem}-{n}.{extension}")
            };
            dir.join(name)
        })
    }

    /// First candidate for which `exists` is false. Never returns a taken path.
    pub fn unique_path(
        dir: &Path,
        stem: &str,
        extension: &str,
        exists: impl Fn(&Path) -> bool,
    ) -> PathBuf {
        Self::candidates(dir, stem, extension)
            .find(|p| !exists(p.as_path()))
            .unwrap_or_else(|| dir.join(format!("{stem}.{extension}")))
    }
}

/// Lower-cases and maps everything outside `[a-z0-9._-]` to `-`, collapsing
/// repeats and trimming separators at both ends. The result never contains a
/// path separator and is never `.` or `..`.
pub fn normalize_component(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars().flat_map(char::to_lowercase) {
        let mapped = if c.is_ascii_lowercase() || c.is_ascii_digit() || c == '.' || c == '_' {
            c
        } else {
            '-'
        };
        if mapped == '-' && out.ends_with('-') {
            continue;
        }
        out.push(mapped);
    }
    out.trim_matches(is_separator).to_string()
}

fn is_separator(c: char) -> bool {
    matches!(c, '-' | '_' | '.')
}
