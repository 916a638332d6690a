// Output: naming, atomic writes and optional PDF export of generated artifacts.

pub mod namer;
pub mod pdf;
pub mod writer;

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What one generation run produced. Created once, never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Artifact {
    /// The filled `.docx`.
    pub path: PathBuf,
    pub file_name: String,
    /// The objective as inserted.
    pub passage: String,
    pub role: Option<String>,
    pub company: Option<String>,
    pub cover_letter: Option<String>,
    /// `.txt` beside the document, sharing its stem.
    pub cover_letter_path: Option<PathBuf>,
    pub pdf_path: Option<PathBuf>,
    /// Non-fatal problems, such as a failed PDF export.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
    pub created_at: DateTime<Utc>,
}
