// src/fetch/retry.rs

use reqwest::{Client, StatusCode};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, error, warn};
use url::Url;

use super::{body_preview, FetchError};

/// Statuses worth another attempt; everything else non-200 is final.
pub const RETRYABLE_STATUSES: [StatusCode; 5] = [
    StatusCode::TOO_MANY_REQUESTS,
    StatusCode::INTERNAL_SERVER_ERROR,
    StatusCode::BAD_GATEWAY,
    StatusCode::SERVICE_UNAVAILABLE,
    StatusCode::GATEWAY_TIMEOUT,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries on top of the first attempt.
    pub max_retries: u32,
    pub initial_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff: Duration::from_secs(5),
        }
    }
}

/// Upper bound on a single backoff delay.
pub const MAX_BACKOFF: Duration = Duration::from_secs(24 * 60 * 60);

impl RetryPolicy {
    /// Delay before retry number `retry` (1-based): doubles each time, capped
    /// at [`MAX_BACKOFF`].
    pub fn backoff(&self, retry: u32) -> Duration {
        self.initial_backoff
            .checked_mul(2u32.saturating_pow(retry.saturating_sub(1)))
            .unwrap_or(MAX_BACKOFF)
            .min(MAX_BACKOFF)
    }
}

pub fn is_retryable_status(status: StatusCode) -> bool {
    RETRYABLE_STATUSES.contains(&status)
}

/// Any transport failure is transient except a bad request, a redirect loop
/// or an undecodable body, which would fail the same way again.
fn is_retryable_error(err: &reqwest::Error) -> bool {
    !(err.is_builder() || err.is_redirect() || err.is_decode())
}

/// Outcome of a single request.
enum Attempt {
    Done(Vec<u8>),
    Transient(FetchError),
    Fatal(FetchError),
}

fn transport(url: &Url, attempts: u32, source: reqwest::Error) -> Attempt {
    let retryable = is_retryable_error(&source);
    let err = FetchError::Transport {
        url: url.clone(),
        attempts,
        source,
    };
    if retryable {
        Attempt::Transient(err)
    } else {
        Attempt::Fatal(err)
    }
}

async fn attempt_once(client: &Client, url: &Url, attempts: u32, preview_bytes: usize) -> Attempt {
    debug!(%url, attempt = attempts, "GET");
    let resp = match client.get(url.clone()).send().await {
        Ok(r) => r,
        Err(e) => return transport(url, attempts, e),
    };

    let status = resp.status();
    if status == StatusCode::OK {
        return match resp.bytes().await {
            Ok(b) => Attempt::Done(b.to_vec()),
            Err(e) => transport(url, attempts, e),
        };
    }

    // error pages are usually HTML; keep the head of it for the log
    let body = resp.bytes().await.unwrap_or_default();
    let err = FetchError::Status {
        url: url.clone(),
        status,
        attempts,
        preview: body_preview(&body, preview_bytes),
    };
    if is_retryable_status(status) {
        Attempt::Transient(err)
    } else {
        Attempt::Fatal(err)
    }
}

/// GET `url` and return the body of a 200 response.
///
/// Transport failures (refused, reset or dropped connections, timeouts) and
/// [`RETRYABLE_STATUSES`] are retried up to `policy.max_retries` times with doubling backoff; the last failure is
/// returned once the budget is spent.
pub async fn get_bytes_with_retry(
    client: &Client,
    url: &Url,
    policy: RetryPolicy,
    preview_bytes: usize,
) -> Result<Vec<u8>, FetchError> {
    let mut attempts = 0;
    loop {
        attempts += 1;
        match attempt_once(client, url, attempts, preview_bytes).await {
            Attempt::Done(bytes) => return Ok(bytes),
            Attempt::Transient(e) if attempts <= policy.max_retries => {
                let delay = policy.backoff(attempts);
                warn!(
                    %url,
                    attempt = attempts,
                    delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                    error = %e,
                    "Retrying"
                );
                sleep(delay).await;
            }
            Attempt::Transient(e) => {
                error!(%url, attempts, error = %e, "Exhausted retries");
                return Err(e);
            }
            Attempt::Fatal(e) => {
                error!(%url, attempts, error = %e, "fetch failed");
                return Err(e);
            }
        }
    }
}
