//! PDF export of a written `.docx` through headless LibreOffice.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tempfile::TempPath;
use tokio::process::Command;
use tracing::{info, warn};

use crate::errors::{ResumeError, Stage};
use crate::output::namer::OutputNamer;
use crate::output::writer::MAX_CANDIDATES;

const SOFFICE: &str = "soffice";
const CONVERSION_TIMEOUT: Duration = Duration::from_secs(60);

/// Runs `soffice --headless --convert-to pdf` with a hard time limit.
#[derive(Debug, Clone)]
pub struct PdfConverter {
    program: String,
    timeout: Duration,
}

impl Default for PdfConverter {
    fn default() -> Self {
        Self {
            program: SOFFICE.to_string(),
            timeout: CONVERSION_TIMEOUT,
        }
    }
}

impl PdfConverter {
    pub fn new(program: impl Into<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            timeout,
        }
    }

    /// Converts `docx` into a `.pdf` beside it and returns its path.
    ///
    /// LibreOffice writes into a scratch directory next to the document; the
    /// result is then moved to the first free `{stem}[-N].pdf`, so an existing
    /// PDF is never replaced.
    pub async fn convert(&self, docx: &Path) -> Result<PathBuf, ResumeError> {
        let out_dir = docx
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let stem = docx
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let expected = docx.with_extension("pdf");
        let fail = |kind: ErrorKind, message: String| {
            ResumeError::file_io(&expected, Stage::Writing, std::io::Error::new(kind, message))
        };

        let scratch = tempfile::Builder::new()
            .prefix(".pdf-export-")
            .tempdir_in(out_dir)
            .map_err(|e| ResumeError::file_io(out_dir, Stage::Writing, e))?;

        let mut command = Command::new(&self.program);
        command
            .arg("--headless")
            .arg("--convert-to")
            .arg("pdf")
            .arg("--outdir")
            .arg(scratch.path())
            .arg(docx)
            .kill_on_drop(true);

        let output = match tokio::time::timeout(self.timeout, command.output()).await {
            Ok(result) => result.map_err(|e| ResumeError::file_io(&expected, Stage::Writing, e))?,
            Err(_) => {
                warn!("PDF conversion of {} timed out", docx.display());
                return Err(fail(
                    ErrorKind::TimedOut,
                    format!("{} did not finish within {}s", self.program, self.timeout.as_secs()),
                ));
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(fail(
                ErrorKind::Other,
                format!("{} exited with {}: {}", self.program, output.status, stderr.trim()),
            ));
        }
        let produced = scratch.path().join(format!("{stem}.pdf"));
        if !produced.exists() {
            return Err(fail(
                ErrorKind::NotFound,
                format!("{} reported success but produced no PDF", self.program),
            ));
        }

        let path = place_without_clobbering(&produced, out_dir, &stem)?;
        info!("PDF exported: {}", path.display());
        Ok(path)
    }
}

/// Renames `produced` to the first free `{stem}[-N].pdf` in `dir`.
fn place_without_clobbering(produced: &Path, dir: &Path, stem: &str) -> Result<PathBuf, ResumeError> {
    let mut pending = TempPath::from_path(produced);
    for candidate in OutputNamer::candidates(dir, stem, "pdf").take(MAX_CANDIDATES) {
        if candidate.exists() {
            continue;
        }
        match pending.persist_noclobber(&candidate) {
            Ok(()) => return Ok(candidate),
            Err(e) if e.error.kind() == ErrorKind::AlreadyExists => pending = e.path,
            Err(e) => return Err(ResumeError::file_io(&candidate, Stage::Writing, e.error)),
        }
    }
    Err(ResumeError::file_io(
        dir,
        Stage::Writing,
        std::io::Error::new(
            ErrorKind::AlreadyExists,
            format!("no free file name for '{stem}.pdf'"),
        ),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_converter_is_a_writing_error() {
        let converter = PdfConverter::new("tailor-no-such-converter", Duration::from_secs(5));
        let err = converter.convert(Path::new("/tmp/x.docx")).await.unwrap_err();
        match err {
            ResumeError::FileIo { path, stage, source } => {
                assert_eq!(stage, Stage::Writing);
                assert_eq!(path, PathBuf::from("/tmp/x.pdf"));
                assert_eq!(source.kind(), ErrorKind::NotFound);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_failing_converter_reports_exit_status() {
        // `false` ignores its arguments and exits 1.
        let converter = PdfConverter::new("false", Duration::from_secs(5));
        let err = converter.convert(Path::new("/tmp/x.docx")).await.unwrap_err();
        assert!(err.to_string().contains("exited with"));
    }

    /// Stand-in converter that writes `{stem}.pdf` into its `--outdir`.
    #[cfg(unix)]
    fn fake_soffice(dir: &Path) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let script = dir.join("fake-soffice");
        std::fs::write(
            &script,
            "#!/bin/sh\nwhile [ \"$1\" != \"--outdir\" ]; do shift; done\n\
             out=\"$2\"; stem=$(basename \"$3\" .docx)\n\
             printf converted > \"$out/$stem.pdf\"\n",
        )
        .unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();
        script
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_existing_pdf_is_never_overwritten() {
        let tools = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let docx = out.path().join("backend-engineer_acme.docx");
        std::fs::write(&docx, b"PK").unwrap();
        std::fs::write(out.path().join("backend-engineer_acme.pdf"), b"earlier").unwrap();

        let converter = PdfConverter::new(
            fake_soffice(tools.path()).to_string_lossy(),
            Duration::from_secs(5),
        );
        let pdf = converter.convert(&docx).await.unwrap();

        assert_eq!(pdf, out.path().join("backend-engineer_acme-1.pdf"));
        assert_eq!(std::fs::read(&pdf).unwrap(), b"converted");
        assert_eq!(
            std::fs::read(out.path().join("backend-engineer_acme.pdf")).unwrap(),
            b"earlier"
        );
        let mut names: Vec<_> = std::fs::read_dir(out.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        names.sort();
        assert_eq!(
            names,
            vec![
                "backend-engineer_acme-1.pdf",
                "backend-engineer_acme.docx",
                "backend-engineer_acme.pdf"
            ]
        );
    }
}
