// All LLM prompt constants for the Generation module.
// Reuses cross-cutting fragments from llm_client::prompts.

/// Objective prompt template.
/// Replace: {no_invention_instruction}, {tone}, {tone_register}, {preferred_phrases},
///          {avoid_phrases}, {length}, {resume}, {job_description}
pub const OBJECTIVE_PROMPT_TEMPLATE: &str = r#"{no_invention_instruction}

Write a career objective of {length} for the resume below, tailored to the job description below.
The tone must be {tone}.
Highlight the resume's skills and experience that best match the job requirements.

TONE CALIBRATION:
- Register: {tone_register}
- Phrases that fit this tone: {preferred_phrases}
- Phrases to avoid: {avoid_phrases}

RESUME:
{resume}

JOB DESCRIPTION:
{job_description}

Return the result in this exact format:

OBJECTIVE:
[the career objective]

ROLE:
[job title from the job description, or leave empty]

COMPANY:
[company name from the job description, or leave empty]"#;

/// Cover letter prompt template.
/// Replace: {no_invention_instruction}, {tone}, {tone_register}, {company},
///          {resume}, {job_description}
pub const COVER_LETTER_PROMPT_TEMPLATE: &str = r#"{no_invention_instruction}

Write a cover letter for a job application at {company}, using the resume and job description below.
The tone must be {tone}.

TONE CALIBRATION:
- Register: {tone_register}

RULES:
1. Use the layout of a professional cover letter in plain text and include a subject line.
2. Keep it short: at most three paragraphs, preferably two.
3. The second paragraph lists, one per line, why the candidate fits the job requirements.
4. Mention only skills and experience present in both the resume and the job description.

RESUME:
{resume}

JOB DESCRIPTION:
{job_description}

Return the result in this exact format:

COVER LETTER:
[the cover letter]

ROLE:
[job title from the job description, or leave empty]

COMPANY:
[company name from the job description, or leave empty]"#;
