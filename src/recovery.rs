//! # Recovery Module
//!
//! Exponential backoff with jitter for reconnecting to the chat platform.

use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tracing::{info, warn};

use crate::config::RecoveryConfig;

/// Delay in milliseconds before retry number `attempt` (1-based).
///
/// Doubles from `base_retry_delay_ms`, is capped at `max_retry_delay_ms`
/// and gets up to 10% random jitter on top.
pub fn calculate_retry_delay(attempt: u32, config: &RecoveryConfig) -> u64 {
    let exponent = attempt.saturating_sub(1).min(16);
    let delay = config
        .base_retry_delay_ms
        .saturating_mul(1u64 << exponent)
        .min(config.max_retry_delay_ms);

    let jitter_range = delay / 10;
    let jitter = if jitter_range > 0 {
        rand::thread_rng().gen_range(0..=jitter_range)
    } else {
        0
    };

    delay + jitter
}

/// Run `operation` until it succeeds or `max_retries` retries are spent.
///
/// Returns the last error when every attempt failed.
pub async fn retry_with_backoff<T, E, F, Fut>(
    operation_name: &str,
    config: &RecoveryConfig,
    mut operation: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let mut attempt = 0;
    loop {
        match operation().await {
            Ok(value) => {
                if attempt > 0 {
                    info!(operation = operation_name, attempt, "Operation succeeded after retry");
                }
                return Ok(value);
            }
            Err(e) if attempt < config.max_retries => {
                attempt += 1;
                let delay = calculate_retry_delay(attempt, config);
                warn!(
                    operation = operation_name,
                    attempt,
                    delay_ms = delay,
                    error = %e,
                    "Operation failed, retrying"
                );
                tokio::time::sleep(Duration::from_millis(delay)).await;
            }
            Err(e) => return Err(e),
        }
    }
}
