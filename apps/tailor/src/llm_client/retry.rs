//! Bounded exponential backoff around any `TextGenerator`.

use std::time::Duration;

use async_trait::async_trait;
use tracing::warn;

use crate::errors::ResumeError;
use crate::generation::tone::Tone;
use crate::llm_client::TextGenerator;

const BASE_DELAY: Duration = Duration::from_millis(1000);

/// Retries transient failures (`ServiceUnavailable`, `RateLimited`) up to
/// `max_attempts` total attempts with 1s, 2s, 4s … delays. Anything else is
/// returned immediately.
pub struct Retrying<G> {
    inner: G,
    max_attempts: u32,
    base_delay: Duration,
}

impl<G: TextGenerator> Retrying<G> {
    pub fn new(inner: G, max_attempts: u32) -> Self {
        Self {
            inner,
            max_attempts: max_attempts.max(1),
            base_delay: BASE_DELAY,
        }
    }

    #[cfg(test)]
    fn with_base_delay(mut self, base_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self
    }
}

#[async_trait]
impl<G: TextGenerator> TextGenerator for Retrying<G> {
    async fn generate(&self, prompt: &str, tone: Tone) -> Result<String, ResumeError> {
        let mut attempt = 1;
        loop {
            match self.inner.generate(prompt, tone).await {
                Ok(text) => return Ok(text),
                Err(e) if e.is_transient() && attempt < self.max_attempts => {
                    // Exponential backoff: 1s, 2s, 4s
                    let delay = self.base_delay * (1 << (attempt - 1));
                    warn!(
                        "Generation attempt {}/{} failed ({e}), retrying after {}ms...",
                        attempt,
                        self.max_attempts,
                        delay.as_millis()
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
