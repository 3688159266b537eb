use super::LaunchError;
use std::future::Future;
use tokio::time::{sleep, timeout, Duration, Instant};
use tracing::{error, warn};

/// Retries a fallible async operation with exponential backoff.
///
/// Only errors reporting `is_retryable()` are retried. Reserved for idempotent
/// operations such as metadata uploads; ledger steps are never retried.
///
/// # Arguments
/// * `operation` - An async closure that returns a Result
/// * `max_retries` - Maximum number of retry attempts
/// * `initial_delay_ms` - Initial delay in milliseconds, which doubles after each attempt
pub async fn retry_with_backoff<F, Fut, T>(
    operation: F,
    max_retries: u32,
    initial_delay_ms: u64,
) -> std::result::Result<T, LaunchError>
where
    F: Fn() -> Fut,
    Fut: Future<Output = std::result::Result<T, LaunchError>>,
{
    let mut current_retry = 0;
    let mut delay_ms = initial_delay_ms;

    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(e) => {
                if current_retry >= max_retries || !e.is_retryable() {
                    return Err(e);
                }
                warn!("Operation failed, retrying in {}ms. Error: {:?}", delay_ms, e);
                sleep(Duration::from_millis(delay_ms)).await;
                current_retry += 1;
                delay_ms *= 2;
            }
        }
    }
}

/// Runs `fut` under a deadline, reporting expiry as `LaunchError::Timeout` for `step`.
pub async fn with_timeout<F, T>(
    step: &str,
    limit: Duration,
    fut: F,
) -> std::result::Result<T, LaunchError>
where
    F: Future<Output = std::result::Result<T, LaunchError>>,
{
    let started = Instant::now();
    match timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(LaunchError::Timeout {
            step: step.to_string(),
            elapsed_ms: started.elapsed().as_millis() as u64,
        }),
    }
}

/// Logs an error with appropriate severity based on the error type.
///
/// # Arguments
/// * `error` - The LaunchError to log
/// * `context` - Additional context about where/how the error occurred
pub fn log_error(error: &LaunchError, context: &str) {
    match error {
        LaunchError::Validation(msg) | LaunchError::Overflow(msg) => {
            warn!("{} - Rejected input: {}", context, msg);
        }
        LaunchError::Storage(msg) => {
            warn!("{} - Storage error: {}", context, msg);
        }
        LaunchError::HttpError { status, message } => {
            if status.is_server_error() {
                error!("{} - HTTP error {}: {}", context, status, message);
            } else {
                warn!("{} - HTTP error {}: {}", context, status, message);
            }
        }
        LaunchError::Chain { step, message } => {
            error!("{} - Chain error at {}: {}", context, step, message);
        }
        LaunchError::Timeout { step, elapsed_ms } => {
            error!("{} - Timed out at {} after {}ms", context, step, elapsed_ms);
        }
        _ => error!("{} - Unexpected error: {}", context, error),
    }
}

/// Converts a reqwest error to a LaunchError with additional context.
///
/// # Arguments
/// * `error` - The reqwest error to convert
/// * `context` - Additional context about the request that failed
pub fn handle_reqwest_error(error: reqwest::Error, context: &str) -> LaunchError {
    if error.is_timeout() {
        LaunchError::NetworkError(format!("{}: Request timed out - {}", context, error))
    } else if let Some(status) = error.status() {
        LaunchError::HttpError {
            status,
            message: format!("{}: {}", context, error),
        }
    } else {
        LaunchError::NetworkError(format!("{}: {}", context, error))
    }
}
