//! CLI argument parsing.
//!
//! Two subcommands: `generate` runs one generation in-process and `serve`
//! starts the HTTP API with its job workers.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use tokio::io::AsyncReadExt;

use crate::errors::{ResumeError, Stage};
use crate::generation::tone::{ObjectiveLength, Tone};
use crate::output::writer::read_text_input;
use crate::pipeline::GenerateInput;

/// Tailor a resume objective or cover letter to a job description.
#[derive(Parser)]
#[command(name = "tailor", author, version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Generate a tailored objective into the template (or a cover letter).
    Generate(GenerateArgs),

    /// Serve the HTTP API and job workers.
    Serve {
        /// Bind address; defaults to HOST.
        #[arg(long)]
        host: Option<String>,

        /// Port; defaults to PORT.
        #[arg(long)]
        port: Option<u16>,
    },
}

#[derive(Args, Debug)]
pub struct GenerateArgs {
    /// Job description file (`.txt`, `.md` or `.pdf`), or `-` for stdin.
    pub job_description: PathBuf,

    /// Resume file; defaults to RESUME_PATH.
    #[arg(long)]
    pub resume: Option<PathBuf>,

    /// Template `.docx` containing the placeholder; defaults to TEMPLATE_PATH.
    #[arg(long)]
    pub template: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = Tone::Professional)]
    pub tone: Tone,

    #[arg(long, value_enum, default_value = "short")]
    pub length: ObjectiveLength,

    /// Output directory; defaults to OUTPUT_DIR.
    #[arg(long, short = 'o')]
    pub output_dir: Option<PathBuf>,

    /// Role used in the file name instead of the detected one.
    #[arg(long)]
    pub role: Option<String>,

    /// Company used in the file name and cover letter instead of the detected one.
    #[arg(long)]
    pub company: Option<String>,

    /// Also write a cover letter (.txt) beside the filled document.
    #[arg(long, alias = "cv")]
    pub cover_letter: bool,

    /// Also export the filled document as PDF (needs LibreOffice).
    #[arg(long)]
    pub pdf: bool,
}

impl GenerateArgs {
    pub async fn into_input(self) -> Result<GenerateInput, ResumeError> {
        let job_description = if self.job_description.as_os_str() == "-" {
            let mut text = String::new();
            tokio::io::stdin()
                .read_to_string(&mut text)
                .await
                .map_err(|e| ResumeError::file_io("<stdin>", Stage::Input, e))?;
            text
        } else {
            read_text_input(&self.job_description).await?
        };

        Ok(GenerateInput {
            job_description,
            resume: None,
            resume_path: self.resume,
            template_path: self.template,
            output_dir: self.output_dir,
            tone: self.tone,
            length: self.length,
            cover_letter: self.cover_letter,
            role: self.role,
            company: self.company,
            export_pdf: self.pdf,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_defaults() {
        let cli = Cli::try_parse_from(["tailor", "generate", "jd.txt"]).unwrap();
        let Commands::Generate(args) = cli.command else {
            panic!("expected generate");
        };
        assert_eq!(args.job_description, PathBuf::from("jd.txt"));
        assert_eq!(args.tone, Tone::Professional);
        assert_eq!(args.length, ObjectiveLength::Short);
        assert!(!args.cover_letter && !args.pdf);
    }

    #[test]
    fn test_generate_all_flags() {
        let cli = Cli::try_parse_from([
            "tailor", "generate", "jd.md", "--resume", "me.pdf", "--template", "t.docx", "--tone",
            "formal", "--length", "long", "-o", "out", "--company", "Acme", "--cover-letter",
            "--pdf",
        ])
        .unwrap();
        let Commands::Generate(args) = cli.command else {
            panic!("expected generate");
        };
        assert_eq!(args.resume, Some(PathBuf::from("me.pdf")));
        assert_eq!(args.tone, Tone::Formal);
        assert_eq!(args.length, ObjectiveLength::Long);
        assert_eq!(args.output_dir, Some(PathBuf::from("out")));
        assert!(args.cover_letter && args.pdf);
    }

    #[test]
    fn test_cv_flag_requests_a_cover_letter() {
        let cli = Cli::try_parse_from(["tailor", "generate", "jd.txt", "--cv"]).unwrap();
        let Commands::Generate(args) = cli.command else {
            panic!("expected generate");
        };
        assert!(args.cover_letter);
        assert_eq!(args.job_description, PathBuf::from("jd.txt"));
        assert!(args.resume.is_none());
    }

    #[test]
    fn test_unknown_tone_is_rejected() {
        assert!(Cli::try_parse_from(["tailor", "generate", "jd.txt", "--tone", "snarky"]).is_err());
    }

    #[test]
    fn test_serve_overrides() {
        let cli = Cli::try_parse_from(["tailor", "serve", "--port", "9090"]).unwrap();
        assert!(matches!(cli.command, Commands::Serve { host: None, port: Some(9090) }));
    }

    #[tokio::test]
    async fn test_into_input_reads_job_description_file() {
        let dir = tempfile::tempdir().unwrap();
        let jd = dir.path().join("jd.txt");
        std::fs::write(&jd, "Backend Engineer at Acme").unwrap();
        let cli = Cli::try_parse_from(["tailor", "generate", jd.to_str().unwrap(), "--cover-letter"])
            .unwrap();
        let Commands::Generate(args) = cli.command else {
            panic!("expected generate");
        };
        let input = args.into_input().await.unwrap();
        assert_eq!(input.job_description, "Backend Engineer at Acme");
        assert!(input.cover_letter);
    }
}
