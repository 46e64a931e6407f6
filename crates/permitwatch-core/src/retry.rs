use std::time::Duration;

use rand::Rng;
use tracing::warn;

use crate::error::{PipelineError, Result};

/// Bounded exponential backoff, applied only to transient fetch errors.
/// Non-transient errors pass through on the first attempt.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(20),
        }
    }
}

impl RetryPolicy {
    pub fn run<T>(&self, mut operation: impl FnMut() -> Result<T>) -> Result<T> {
        let mut attempt = 1;
        loop {
            match operation() {
                Ok(value) => return Ok(value),
                Err(err) if err.is_transient() && attempt < self.max_attempts => {
                    let delay = self.delay_for(attempt);
                    warn!(
                        "transient fetch error (attempt {attempt}/{}), retrying in {:.1}s: {err}",
                        self.max_attempts,
                        delay.as_secs_f64()
                    );
                    std::thread::sleep(delay);
                    attempt += 1;
                }
                Err(err) if err.is_transient() => {
                    return Err(PipelineError::RetriesExhausted {
                        attempts: attempt,
                        source: Box::new(err),
                    });
                }
                Err(err) => return Err(err),
            }
        }
    }

    fn delay_for(&self, attempt: u32) -> Duration {
        let exp = self.base_delay.as_secs_f64() * 2f64.powi(attempt.saturating_sub(1) as i32);
        let capped = exp.min(self.max_delay.as_secs_f64());
        let jitter = if capped > 0.0 {
            rand::rng().random_range(0.0..=capped * 0.25)
        } else {
            0.0
        };
        Duration::from_secs_f64(capped + jitter)
    }
}
