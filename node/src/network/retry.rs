// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Capped exponential backoff for idempotent ledger reads.
//!
//! Retried: transport errors (connect, timeout) and HTTP 408, 409, 429, 5xx.
//! A well-formed reply with `status: false` is an answer, not a failure, and
//! is never retried here.

use std::time::Duration;

use reqwest::{RequestBuilder, Response, StatusCode};
use tracing::warn;

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    /// Down-jitter: the delay is scaled by a factor in `[1 - jitter, 1.0]`.
    pub jitter: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            initial_delay: Duration::from_millis(250),
            max_delay: Duration::from_secs(4),
            jitter: 0.25,
        }
    }
}

impl RetryPolicy {
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    /// Delay before retry number `step + 1`.
    pub fn delay_for(&self, step: u32) -> Duration {
        let base = self.initial_delay.as_secs_f64() * 2.0_f64.powi(step.min(30) as i32);
        let capped = base.min(self.max_delay.as_secs_f64());
        let factor = 1.0 - rand::random::<f64>() * self.jitter.clamp(0.0, 1.0);
        Duration::from_secs_f64(capped * factor)
    }
}

#[must_use]
pub fn should_retry(status: StatusCode) -> bool {
    matches!(status.as_u16(), 408 | 409 | 429 | 500..=599)
}

fn is_transient(err: &reqwest::Error) -> bool {
    err.is_connect() || err.is_timeout()
}

/// Send the request built by `build`, retrying per `policy`.
///
/// Returns the last response even when its status is retryable, so the
/// caller reports the real status once retries are exhausted.
pub async fn send_with_retry<F>(
    policy: &RetryPolicy,
    endpoint: &str,
    mut build: F,
) -> Result<Response, reqwest::Error>
where
    F: FnMut() -> RequestBuilder,
{
    let mut attempt = 0u32;
    loop {
        let can_retry = attempt < policy.max_retries;
        match build().send().await {
            Ok(resp) if can_retry && should_retry(resp.status()) => {
                warn!(endpoint, status = %resp.status(), attempt, "Retryable ledger status");
            }
            Ok(resp) => return Ok(resp),
            Err(e) if can_retry && is_transient(&e) => {
                warn!(endpoint, error = %e, attempt, "Transient ledger error");
            }
            Err(e) => return Err(e),
        }
        tokio::time::sleep(policy.delay_for(attempt)).await;
        attempt += 1;
    }
}
