// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Bounded retry with exponential backoff for mirror writes.

use crate::config::RetryConfig;
use rand::Rng;
use std::fmt;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::debug;

/// Result of a single attempt
#[derive(Debug)]
pub enum Attempt<T> {
    Done(T),
    /// The attempt failed in a way another attempt may fix (conflict, store outage)
    Retry(String),
}

/// All attempts failed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryExhausted {
    pub attempts: u32,
    pub last_reason: String,
}

impl fmt::Display for RetryExhausted {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "gave up after {} attempts: {}",
            self.attempts, self.last_reason
        )
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    config: RetryConfig,
}

impl RetryPolicy {
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    pub fn max_attempts(&self) -> u32 {
        self.config.max_attempts.max(1)
    }

    /// Upper bound of the delay after failed attempt `failed` (1-based):
    /// base delay doubled per attempt, capped at the max delay
    pub fn ceiling(&self, failed: u32) -> Duration {
        let exponent = failed.saturating_sub(1).min(31);
        self.config
            .base_delay
            .saturating_mul(1u32 << exponent)
            .min(self.config.max_delay)
    }

    /// Jittered delay in `[ceiling / 2, ceiling]`
    pub fn delay(&self, failed: u32) -> Duration {
        let ceiling = self.ceiling(failed);
        let half = ceiling / 2;
        let spread = (ceiling - half).as_millis() as u64;
        half + Duration::from_millis(rand::thread_rng().gen_range(0..=spread))
    }

    /// Run `attempt` until it is done or the attempts run out, sleeping between tries
    pub async fn run<T, F, Fut>(&self, mut attempt: F) -> Result<T, RetryExhausted>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Attempt<T>>,
    {
        let max_attempts = self.max_attempts();
        let mut last_reason = String::new();

        for n in 1..=max_attempts {
            match attempt(n).await {
                Attempt::Done(value) => return Ok(value),
                Attempt::Retry(reason) => {
                    if n < max_attempts {
                        let delay = self.delay(n);
                        debug!(
                            "Attempt {}/{} failed: {}, retrying in {:?}",
                            n, max_attempts, reason, delay
                        );
                        sleep(delay).await;
                    }
                    last_reason = reason;
                }
            }
        }

        Err(RetryExhausted {
            attempts: max_attempts,
            last_reason,
        })
    }
}
