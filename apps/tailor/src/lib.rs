//! Tailor: generates a job-specific resume objective (or cover letter) with a
//! hosted LLM and writes it into a Word template at a placeholder marker.
//!
//! The binary in `main.rs` exposes this as a CLI and an HTTP API; everything
//! it needs lives here.

pub mod cli;
pub mod config;
pub mod document;
pub mod errors;
pub mod generation;
pub mod jobs;
pub mod llm_client;
pub mod output;
pub mod pipeline;
pub mod routes;
pub mod state;
