// Generation: prompt assembly, tone calibration and parsing of model output.
// All LLM calls go through llm_client; nothing here performs I/O.

pub mod handlers;
pub mod jd_metadata;
pub mod prompts;
pub mod request_builder;
pub mod response;
pub mod tone;
