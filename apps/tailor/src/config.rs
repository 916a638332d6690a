use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::document::filler::DEFAULT_PLACEHOLDER;
use crate::generation::request_builder::PromptLimits;
use crate::llm_client::ANTHROPIC_API_URL;

/// Application configuration loaded from environment variables.
/// Loaded once at startup and passed explicitly; never re-read afterwards.
#[derive(Debug, Clone)]
pub struct Config {
    pub anthropic_api_key: String,
    pub anthropic_api_url: String,
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    pub resume_path: PathBuf,
    pub template_path: PathBuf,
    pub placeholder: String,
    pub resume_char_limit: usize,
    pub jd_char_limit: usize,
    pub generation_timeout_secs: u64,
    pub llm_max_attempts: u32,
    /// Font forced onto the inserted passage. `None` keeps the placeholder run's font.
    pub passage_font: Option<String>,
    /// Point size forced onto the inserted passage.
    pub passage_font_size: Option<f32>,
    pub worker_count: usize,
    pub redis_url: Option<String>,
    pub host: String,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from an arbitrary key lookup. `from_env` delegates here.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let input_dir = PathBuf::from(get("INPUT_DIR").unwrap_or_else(|| "input".to_string()));
        let resume_path = get("RESUME_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| input_dir.join("resume.md"));
        let template_path = get("TEMPLATE_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| input_dir.join("resume.docx"));

        let worker_count: usize = parse_or(get("WORKER_COUNT"), "WORKER_COUNT", 2)?;
        if worker_count == 0 {
            anyhow::bail!("WORKER_COUNT must be at least 1");
        }

        Ok(Config {
            anthropic_api_key: get("ANTHROPIC_API_KEY")
                .context("Required environment variable 'ANTHROPIC_API_KEY' is not set")?,
            anthropic_api_url: get("ANTHROPIC_API_URL")
                .unwrap_or_else(|| ANTHROPIC_API_URL.to_string()),
            output_dir: PathBuf::from(
                get("OUTPUT_DIR").unwrap_or_else(|| "generated".to_string()),
            ),
            input_dir,
            resume_path,
            template_path,
            placeholder: get("PLACEHOLDER").unwrap_or_else(|| DEFAULT_PLACEHOLDER.to_string()),
            resume_char_limit: parse_or(get("RESUME_CHAR_LIMIT"), "RESUME_CHAR_LIMIT", 4000)?,
            jd_char_limit: parse_or(get("JD_CHAR_LIMIT"), "JD_CHAR_LIMIT", 2000)?,
            generation_timeout_secs: parse_or(
                get("GENERATION_TIMEOUT_SECS"),
                "GENERATION_TIMEOUT_SECS",
                30,
            )?,
            llm_max_attempts: parse_or(get("LLM_MAX_ATTEMPTS"), "LLM_MAX_ATTEMPTS", 3)?,
            passage_font: get("PASSAGE_FONT"),
            passage_font_size: get("PASSAGE_FONT_SIZE")
                .map(|v| {
                    v.parse::<f32>()
                        .context("PASSAGE_FONT_SIZE must be a number of points")
                })
                .transpose()?,
            worker_count,
            redis_url: get("REDIS_URL"),
            host: get("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: parse_or(get("PORT"), "PORT", 8080)?,
            rust_log: get("RUST_LOG").unwrap_or_else(|| "info".to_string()),
        })
    }

    pub fn prompt_limits(&self) -> PromptLimits {
        PromptLimits {
            resume_chars: self.resume_char_limit,
            job_description_chars: self.jd_char_limit,
        }
    }

    pub fn generation_timeout(&self) -> Duration {
        Duration::from_secs(self.generation_timeout_secs)
    }
}

fn parse_or<T: FromStr>(value: Option<String>, key: &str, default: T) -> Result<T> {
    match value {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .ok()
            .with_context(|| format!("{key} has an invalid value: '{raw}'")),
        None => Ok(default),
    }
}
