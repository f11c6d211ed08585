//! Tenacity-style retry + timeout wrapper for blocking exchange RPC calls.
//!
//! Base 0.5s / max 8s exponential backoff, up to 5 attempts, retryable on
//! server-side 5xx, 429, and timeouts (§5). Each attempt is individually
//! bounded by a 10s timeout.

use crate::error::{Error, Result};
use std::future::Future;
use std::time::Duration;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
const BASE_DELAY: Duration = Duration::from_millis(500);
const MAX_DELAY: Duration = Duration::from_secs(8);
const MAX_ATTEMPTS: u32 = 5;

/// Classify whether an error from an attempt should be retried.
pub fn is_retryable(err: &Error) -> bool {
    match err {
        Error::Http(e) => {
            e.is_timeout()
                || e.status()
                    .is_some_and(|s| s.is_server_error() || s.as_u16() == 429)
        }
        Error::Connection(_) => true,
        _ => false,
    }
}

fn backoff_delay(attempt: u32) -> Duration {
    let millis = BASE_DELAY.as_millis() as u64 * 2u64.saturating_pow(attempt);
    Duration::from_millis(millis).min(MAX_DELAY)
}

/// Run `op` up to `MAX_ATTEMPTS` times, each attempt bounded by
/// `DEFAULT_TIMEOUT`, backing off between retryable failures.
pub async fn retryable<T, F, Fut>(mut op: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut last_err = None;
    for attempt in 0..MAX_ATTEMPTS {
        let attempt_result = tokio::time::timeout(DEFAULT_TIMEOUT, op()).await;
        match attempt_result {
            Ok(Ok(value)) => return Ok(value),
            Ok(Err(err)) => {
                let retry = is_retryable(&err);
                last_err = Some(err);
                if !retry {
                    break;
                }
            }
            Err(_) => {
                last_err = Some(Error::Connection("exchange call timed out".into()));
            }
        }
        if attempt + 1 < MAX_ATTEMPTS {
            tokio::time::sleep(backoff_delay(attempt)).await;
        }
    }
    Err(last_err.unwrap_or_else(|| Error::Exchange("retry loop exited without a result".into())))
}
