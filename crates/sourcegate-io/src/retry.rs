// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Retry with exponential backoff + jitter for idempotent fetches.
//
// The dispatcher itself never retries. Capabilities whose operation is
// idempotent (file downloads) may retry transient failures internally; the
// page only ever sees the final outcome.

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tracing::{debug, info, warn};

use sourcegate_core::error::{BridgeError, Result};

/// Retry configuration.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of retry attempts after the first try.
    pub max_retries: u32,
    /// Base delay between retries (exponential backoff).
    pub base_delay: Duration,
    /// Maximum delay between retries.
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            base_delay: Duration::from_millis(250),
            max_delay: Duration::from_secs(5),
        }
    }
}

/// Whether another attempt could plausibly succeed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    Transient,
    Permanent,
}

/// Result of evaluating whether to retry.
#[derive(Debug)]
pub enum RetryDecision {
    RetryAfter(Duration),
    GiveUp,
    Exhausted,
}

pub fn classify_error(err: &BridgeError) -> ErrorClass {
    match err {
        BridgeError::Timeout(_) => ErrorClass::Transient,
        BridgeError::Http(detail) => classify_http_detail(detail),
        BridgeError::Io(io_err) => match io_err.kind() {
            std::io::ErrorKind::TimedOut
            | std::io::ErrorKind::ConnectionRefused
            | std::io::ErrorKind::ConnectionReset
            | std::io::ErrorKind::ConnectionAborted
            | std::io::ErrorKind::Interrupted => ErrorClass::Transient,
            _ => ErrorClass::Permanent,
        },
        _ => ErrorClass::Permanent,
    }
}

/// `status 4xx` and malformed URLs will not get better; everything else at
/// the HTTP layer (5xx, resets, DNS hiccups) might.
fn classify_http_detail(detail: &str) -> ErrorClass {
    let lower = detail.to_ascii_lowercase();
    if lower.starts_with("status 4")
        || lower.contains("builder error")
        || lower.contains("relative url")
        || lower.contains("unsupported url")
    {
        return ErrorClass::Permanent;
    }
    ErrorClass::Transient
}

pub fn should_retry(err: &BridgeError, attempt: u32, config: &RetryConfig) -> RetryDecision {
    match classify_error(err) {
        ErrorClass::Permanent => {
            info!(error = %err, "permanent error, not retrying");
            RetryDecision::GiveUp
        }
        ErrorClass::Transient if attempt >= config.max_retries => {
            warn!(attempt, max = config.max_retries, "retry limit exhausted");
            RetryDecision::Exhausted
        }
        ErrorClass::Transient => {
            let delay = compute_delay(attempt, config, &mut rand::thread_rng());
            debug!(attempt, delay_ms = delay.as_millis() as u64, "scheduling retry");
            RetryDecision::RetryAfter(delay)
        }
    }
}

/// delay = min(base * 2^attempt + jitter, max_delay), jitter in [0, base).
fn compute_delay<R: Rng + ?Sized>(attempt: u32, config: &RetryConfig, rng: &mut R) -> Duration {
    let base_ms = config.base_delay.as_millis() as u64;
    let exp_ms = base_ms.saturating_mul(1u64 << attempt.min(10));
    let jitter_ms = rng.gen_range(0..base_ms.max(1));
    let capped_ms = exp_ms
        .saturating_add(jitter_ms)
        .min(config.max_delay.as_millis() as u64);
    Duration::from_millis(capped_ms)
}

/// Run `op` until it succeeds, fails permanently, or retries run out.
pub async fn with_retry<T, F, Fut>(config: &RetryConfig, mut op: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 0;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) => match should_retry(&err, attempt, config) {
                RetryDecision::RetryAfter(delay) => {
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                RetryDecision::GiveUp | RetryDecision::Exhausted => return Err(err),
            },
        }
    }
}
