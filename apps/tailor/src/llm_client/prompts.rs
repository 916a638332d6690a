// Shared prompt constants and prompt-building utilities.
// Each service that needs LLM calls defines its own prompts.rs alongside it.
// This file contains cross-cutting prompt fragments.

/// System prompt fragment that enforces plain-text output.
pub const PLAIN_TEXT_SYSTEM: &str = "You are a precise career-writing assistant. \
    Respond in plain text only. \
    Do NOT use markdown, bullet symbols, bold markers or code fences. \
    Do NOT include explanations or apologies.";

/// Common instruction appended to all generation prompts.
pub const NO_INVENTION_INSTRUCTION: &str = "\
    CRITICAL: Use only skills, experience and achievements present in the resume. \
    Do NOT invent employers, titles, numbers or technologies. \
    If the resume does not support a claim, omit it.";
