//! File system edge: reading text inputs and writing artifacts atomically.

use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::debug;

use crate::errors::{ResumeError, Stage};
use crate::output::namer::OutputNamer;

/// Upper bound on `-N` suffixes tried before giving up.
pub(crate) const MAX_CANDIDATES: usize = 10_000;

/// Reads a resume or job description. `.pdf` files go through text
/// extraction; everything else must be UTF-8.
pub async fn read_text_input(path: &Path) -> Result<String, ResumeError> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| ResumeError::file_io(path, Stage::Input, e))?;

    let is_pdf = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"));

    let unreadable = |message: String| {
        ResumeError::file_io(
            path,
            Stage::Input,
            std::io::Error::new(ErrorKind::InvalidData, message),
        )
    };

    if is_pdf {
        // Extraction is CPU-bound.
        return tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&bytes))
            .await
            .map_err(|e| unreadable(format!("PDF extraction aborted: {e}")))?
            .map_err(|e| unreadable(format!("could not extract text from PDF: {e}")));
    }

    String::from_utf8(bytes).map_err(|_| unreadable("not valid UTF-8 text".to_string()))
}

/// Writes `contents` to the first free `{stem}[-N].{extension}` in `dir`,
/// creating `dir` if needed. The file appears fully written or not at all and
/// an existing file is never replaced.
pub fn write_artifact(
    dir: &Path,
    stem: &str,
    extension: &str,
    contents: &[u8],
) -> Result<PathBuf, ResumeError> {
    let io_err = |path: &Path, e| ResumeError::file_io(path, Stage::Writing, e);

    std::fs::create_dir_all(dir).map_err(|e| io_err(dir, e))?;

    let mut temp = NamedTempFile::new_in(dir).map_err(|e| io_err(dir, e))?;
    temp.write_all(contents).map_err(|e| io_err(temp.path(), e))?;
    temp.as_file().sync_all().map_err(|e| io_err(temp.path(), e))?;

    for candidate in OutputNamer::candidates(dir, stem, extension).take(MAX_CANDIDATES) {
        if candidate.exists() {
            continue;
        }
        match temp.persist_noclobber(&candidate) {
            Ok(_) => {
                debug!("Wrote {} bytes to {}", contents.len(), candidate.display());
                return Ok(candidate);
            }
            // Lost a race with another writer; try the next suffix.
            Err(e) if e.error.kind() == ErrorKind::AlreadyExists => temp = e.file,
            Err(e) => return Err(io_err(&candidate, e.error)),
        }
    }

    Err(io_err(
        dir,
        std::io::Error::new(
            ErrorKind::AlreadyExists,
            format!("no free file name for '{stem}.{extension}'"),
        ),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_creates_directory_and_file() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("nested/out");
        let path = write_artifact(&dir, "backend-engineer_acme", "docx", b"abc").unwrap();
        assert_eq!(path, dir.join("backend-engineer_acme.docx"));
        assert_eq!(std::fs::read(&path).unwrap(), b"abc");
    }

    #[test]
    fn test_existing_files_are_never_overwritten() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("x.docx"), b"first").unwrap();

        let second = write_artifact(dir.path(), "x", "docx", b"second").unwrap();
        let third = write_artifact(dir.path(), "x", "docx", b"third").unwrap();

        assert_eq!(second, dir.path().join("x-1.docx"));
        assert_eq!(third, dir.path().join("x-2.docx"));
        assert_eq!(std::fs::read(dir.path().join("x.docx")).unwrap(), b"first");
    }

    #[test]
    fn test_no_temporary_files_left_behind() {
        let dir = tempfile::tempdir().unwrap();
        write_artifact(dir.path(), "a", "txt", b"1").unwrap();
        write_artifact(dir.path(), "a", "txt", b"2").unwrap();
        let mut names: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        names.sort();
        assert_eq!(names, vec!["a-1.txt", "a.txt"]);
    }

    #[test]
    fn test_unwritable_directory_is_a_writing_error() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, b"").unwrap();
        let err = write_artifact(&blocker.join("sub"), "a", "txt", b"1").unwrap_err();
        assert!(matches!(err, ResumeError::FileIo { stage: Stage::Writing, .. }));
    }

    #[tokio::test]
    async fn test_read_text_input_utf8() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("resume.md");
        std::fs::write(&path, "# Jane\nRust engineer").unwrap();
        assert_eq!(read_text_input(&path).await.unwrap(), "# Jane\nRust engineer");
    }

    #[tokio::test]
    async fn test_read_text_input_missing_file() {
        let err = read_text_input(Path::new("/definitely/not/here.md")).await.unwrap_err();
        assert!(matches!(err, ResumeError::FileIo { stage: Stage::Input, .. }));
    }

    #[tokio::test]
    async fn test_read_text_input_rejects_binary() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("jd.txt");
        std::fs::write(&path, [0xff, 0xfe, 0x00]).unwrap();
        let err = read_text_input(&path).await.unwrap_err();
        assert_eq!(err.stage(), Stage::Input);
        assert!(matches!(
            &err,
            ResumeError::FileIo { path: p, source, .. }
                if p == &path && source.kind() == ErrorKind::InvalidData
        ));
    }

    #[tokio::test]
    async fn test_read_text_input_bad_pdf() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("resume.PDF");
        std::fs::write(&path, b"not really a pdf").unwrap();
        let err = read_text_input(&path).await.unwrap_err();
        assert_eq!(err.stage(), Stage::Input);
        assert!(err.to_string().contains("resume.PDF"));
    }
}
