//! Generation pipeline — the one code path shared by the CLI, the synchronous
//! HTTP endpoint and queued jobs.
//!
//! Flow: read inputs → open template → generate objective (timeout) →
//!       parse/sanitize → resolve role/company → optional cover letter →
//!       fill → name → atomic write → optional PDF export.
//!
//! Nothing is written unless every earlier step succeeded.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{info, warn};

use crate::config::Config;
use crate::document::docx::DocxDocument;
use crate::document::filler::{count_placeholders, fill_placeholder, FillOptions};
use crate::errors::{ResumeError, Stage};
use crate::generation::jd_metadata::{extract_job_metadata, JobMetadata};
use crate::generation::request_builder::{build_prompt, DocumentKind, GenerationRequest};
use crate::generation::response::{parse_generation, ParsedGeneration};
use crate::generation::tone::{ObjectiveLength, Tone};
use crate::llm_client::TextGenerator;
use crate::output::namer::OutputNamer;
use crate::output::pdf::PdfConverter;
use crate::output::writer::{read_text_input, write_artifact};
use crate::output::Artifact;

// ────────────────────────────────────────────────────────────────────────────
// Input
// ────────────────────────────────────────────────────────────────────────────

/// One generation run. Unset paths fall back to the configured defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct GenerateInput {
    pub job_description: String,
    /// Resume text given inline; wins over `resume_path`.
    pub resume: Option<String>,
    pub resume_path: Option<PathBuf>,
    pub template_path: Option<PathBuf>,
    pub output_dir: Option<PathBuf>,
    pub tone: Tone,
    pub length: ObjectiveLength,
    /// Also write a cover letter (`.txt`) beside the filled document.
    pub cover_letter: bool,
    /// Explicit role for the file name; wins over anything generated or extracted.
    pub role: Option<String>,
    /// Explicit company; also personalises cover letters.
    pub company: Option<String>,
    #[serde(rename = "pdf")]
    pub export_pdf: bool,
}

// ────────────────────────────────────────────────────────────────────────────
// Pipeline
// ────────────────────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct Pipeline {
    generator: Arc<dyn TextGenerator>,
    config: Arc<Config>,
    pdf: PdfConverter,
    clock: fn() -> DateTime<Utc>,
}

impl Pipeline {
    pub fn new(generator: Arc<dyn TextGenerator>, config: Arc<Config>) -> Self {
        Self {
            generator,
            config,
            pdf: PdfConverter::default(),
            clock: Utc::now,
        }
    }

    #[cfg(test)]
    pub fn with_clock(mut self, clock: fn() -> DateTime<Utc>) -> Self {
        self.clock = clock;
        self
    }

    #[cfg(test)]
    pub fn with_pdf_converter(mut self, pdf: PdfConverter) -> Self {
        self.pdf = pdf;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub async fn run(&self, input: GenerateInput) -> Result<Artifact, ResumeError> {
        self.run_cancellable(input, &AtomicBool::new(false)).await
    }

    /// Like [`Pipeline::run`], but gives up with `Cancelled` (and writes
    /// nothing) once `cancel` is set.
    pub async fn run_cancellable(
        &self,
        input: GenerateInput,
        cancel: &AtomicBool,
    ) -> Result<Artifact, ResumeError> {
        let config = &self.config;
        let check_cancel = || {
            if cancel.load(Ordering::SeqCst) {
                Err(ResumeError::Cancelled)
            } else {
                Ok(())
            }
        };

        // Step 1: Read inputs
        let resume = match input.resume.clone().filter(|r| !r.trim().is_empty()) {
            Some(text) => text,
            None => {
                let path = input.resume_path.as_ref().unwrap_or(&config.resume_path);
                read_text_input(path).await?
            }
        };
        info!(
            "Inputs read: resume={} chars, job description={} chars",
            resume.chars().count(),
            input.job_description.chars().count()
        );

        // Step 2: Open the template first so a bad template costs no API call
        let template_path = input.template_path.as_ref().unwrap_or(&config.template_path);
        let template = DocxDocument::open(template_path).await?;
        if count_placeholders(&template, &config.placeholder) == 0 {
            return Err(ResumeError::PlaceholderNotFound {
                placeholder: config.placeholder.clone(),
            });
        }
        check_cancel()?;

        // Step 3: Generate the objective
        let jd_metadata = extract_job_metadata(&input.job_description);
        let request = GenerationRequest {
            tone: input.tone,
            length: input.length,
            kind: DocumentKind::Objective,
            company: input.company.clone().or_else(|| jd_metadata.company.clone()),
            ..GenerationRequest::new(resume, input.job_description.clone())
        };
        let parsed = self.generate(&request).await?;
        let passage = parsed.passage.into_single_paragraph();
        let metadata = JobMetadata {
            role: input.role.clone(),
            company: input.company.clone(),
        }
        .or(JobMetadata {
            role: parsed.role,
            company: parsed.company,
        })
        .or(jd_metadata);
        info!(
            "Objective ready: {} chars, role={:?}, company={:?}",
            passage.as_str().len(),
            metadata.role,
            metadata.company
        );

        // Step 4: Optional cover letter, addressed to the resolved company
        let cover_letter = if input.cover_letter {
            check_cancel()?;
            let request = GenerationRequest {
                kind: DocumentKind::CoverLetter,
                company: metadata.company.clone(),
                ..request
            };
            let letter = self.generate(&request).await?.passage;
            info!("Cover letter ready: {} chars", letter.as_str().len());
            Some(letter)
        } else {
            None
        };

        // A cancelled job never produces a file.
        check_cancel()?;

        // Step 5: Fill and serialize (CPU-bound)
        let placeholder = config.placeholder.clone();
        let options = FillOptions {
            font: config.passage_font.clone(),
            font_size_pt: config.passage_font_size,
        };
        let fill_passage = passage.clone();
        let document = tokio::task::spawn_blocking(move || {
            fill_placeholder(&template, &placeholder, &fill_passage, &options)?.to_bytes()
        })
        .await
        .map_err(|e| ResumeError::Document(format!("document fill aborted: {e}")))??;

        // Step 6: Name and write atomically; the letter takes the document's stem
        let stem = OutputNamer::stem(
            metadata.role.as_deref(),
            metadata.company.as_deref(),
            (self.clock)(),
        );
        let output_dir = input
            .output_dir
            .clone()
            .unwrap_or_else(|| config.output_dir.clone());
        let path = write_blocking(&output_dir, &stem, "docx", document).await?;
        info!("Document written: {}", path.display());

        let cover_letter_path = match &cover_letter {
            Some(letter) => {
                let letter_stem = path
                    .file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_else(|| stem.clone());
                let contents = format!("{}\n", letter.as_str()).into_bytes();
                let letter_path = write_blocking(&output_dir, &letter_stem, "txt", contents).await?;
                info!("Cover letter written: {}", letter_path.display());
                Some(letter_path)
            }
            None => None,
        };

        // Step 7: Optional PDF export. The document is already on disk, so a
        // failed conversion is reported on the artifact instead of failing the run.
        let mut warnings = Vec::new();
        let pdf_path = if input.export_pdf {
            match self.pdf.convert(&path).await {
                Ok(pdf) => Some(pdf),
                Err(e) => {
                    warn!("PDF export failed for {}: {e}", path.display());
                    warnings.push(format!("PDF export failed: {e}"));
                    None
                }
            }
        } else {
            None
        };

        Ok(Artifact {
            file_name: path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| format!("{stem}.docx")),
            path,
            passage: passage.as_str().to_string(),
            role: metadata.role,
            company: metadata.company,
            cover_letter: cover_letter.map(|letter| letter.as_str().to_string()),
            cover_letter_path,
            pdf_path,
            warnings,
            created_at: (self.clock)(),
        })
    }

    /// Builds the prompt, calls the generator under the configured timeout
    /// and parses the reply.
    async fn generate(&self, request: &GenerationRequest) -> Result<ParsedGeneration, ResumeError> {
        let prompt = build_prompt(request, &self.config.prompt_limits())?;

        info!("Requesting {:?} passage (tone={})", request.kind, request.tone);
        let timeout = self.config.generation_timeout();
        let raw = tokio::time::timeout(timeout, self.generator.generate(&prompt, request.tone))
            .await
            .map_err(|_| ResumeError::GenerationTimeout {
                seconds: timeout.as_secs(),
            })??;

        parse_generation(&raw)
    }
}

async fn write_blocking(
    dir: &Path,
    stem: &str,
    extension: &'static str,
    contents: Vec<u8>,
) -> Result<PathBuf, ResumeError> {
    let (owned_dir, owned_stem) = (dir.to_path_buf(), stem.to_string());
    tokio::task::spawn_blocking(move || {
        write_artifact(&owned_dir, &owned_stem, extension, &contents)
    })
    .await
    .map_err(|e| ResumeError::file_io(dir, Stage::Writing, std::io::Error::other(e.to_string())))?
}
