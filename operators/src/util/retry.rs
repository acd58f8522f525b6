use std::time::Duration;

use futures::Future;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Timeout and retry behaviour for calls to a remote source
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RetryOptions {
    pub max_attempts: usize,
    pub initial_delay_ms: u64,
    pub exponential_backoff_factor: f64,
}

impl Default for RetryOptions {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay_ms: 500,
            exponential_backoff_factor: 2.0,
        }
    }
}

/// A method wrapper for calling a method that may fail spuriously until it succeeds.
/// The method is called at most `max_attempts` times, but at least once.
/// If it still fails after `max_attempts` times, the last error is returned.
///
/// Uses exponential backoff by taking the `initial_delay_ms` and multiplying each time an `exponential_backoff_factor` on it.
///
pub async fn retry<F, T, E, Fut>(options: RetryOptions, mut f: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let mut result = (f)().await;

    let mut retries = options.max_attempts.max(1) - 1; // first one used previously
    let mut sleep_delay = options.initial_delay_ms as f64;

    while retries > 0 {
        let Err(error) = &result else {
            break;
        };

        warn!(
            %error,
            retries_left = retries,
            delay_ms = sleep_delay as u64,
            "attempt failed, retrying"
        );

        tokio::time::sleep(Duration::from_millis(sleep_delay as u64)).await;

        result = (f)().await;

        retries -= 1;
        sleep_delay *= options.exponential_backoff_factor;
    }

    result
}
