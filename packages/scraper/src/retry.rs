//! Blocking HTTP retry for transient errors.
//!
//! Every request a [`crate::Session`] makes goes through [`send`], which
//! retries connection failures, timeouts, HTTP 429 and HTTP 5xx with
//! exponential backoff (1s, 2s, 4s, ...). Other 4xx answers are permanent
//! and returned immediately.

use std::time::Duration;

use crate::ScrapeError;

/// Sends the request built by `build_request`, retrying transient failures
/// up to `max_retries` times.
///
/// The closure is called on each attempt because a
/// [`reqwest::blocking::RequestBuilder`] is consumed by `send()`.
///
/// # Errors
///
/// Returns [`ScrapeError::Http`] if the request fails permanently or the
/// retries run out, and [`ScrapeError::Status`] for a 429/5xx answer on the
/// last attempt.
pub fn send<F>(
    build_request: F,
    max_retries: u32,
) -> Result<reqwest::blocking::Response, ScrapeError>
where
    F: Fn() -> reqwest::blocking::RequestBuilder,
{
    let mut attempt = 0;

    loop {
        if attempt > 0 {
            let delay = backoff(attempt);
            log::warn!("  retry {attempt}/{max_retries} in {delay:?}...");
            std::thread::sleep(delay);
        }

        match build_request().send() {
            Err(e) => {
                if is_transient(&e) && attempt < max_retries {
                    log::warn!("  transient error: {e}");
                    attempt += 1;
                    continue;
                }
                return Err(ScrapeError::Http(e));
            }
            Ok(response) => {
                let status = response.status();
                let retryable = status == reqwest::StatusCode::TOO_MANY_REQUESTS
                    || status.is_server_error();

                if retryable {
                    if attempt < max_retries {
                        log::warn!("  HTTP {status} from {}", response.url());
                        attempt += 1;
                        continue;
                    }
                    return Err(ScrapeError::Status {
                        status,
                        url: response.url().to_string(),
                    });
                }

                return Ok(response);
            }
        }
    }
}

/// Delay before retry number `attempt` (1-based).
fn backoff(attempt: u32) -> Duration {
    Duration::from_secs(1u64 << (attempt - 1).min(5))
}

/// Returns `true` if the error is likely transient and worth retrying.
fn is_transient(e: &reqwest::Error) -> bool {
    e.is_timeout() || e.is_connect() || e.is_body() || e.is_request()
}
