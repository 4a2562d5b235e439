//! HTTP send helper with retry for transient errors.
//!
//! Every territory API call goes through [`send_json`]. The caller picks
//! the retry budget: overlap checks retry, building detection and
//! create/update pass `0` so a request is sent exactly once.
//!
//! ```ignore
//! let body = retry::send_json(|| client.post(&url).json(&payload), 3).await?;
//! ```

use std::time::Duration;

use crate::ClientError;

/// Maximum length of the response body preview included in errors.
const BODY_PREVIEW_LEN: usize = 300;

/// Sends a request and parses the response body as JSON.
///
/// `build_request` is called once per attempt since
/// [`reqwest::RequestBuilder`] is consumed by `.send()`. Connection
/// errors, timeouts, HTTP 429, and HTTP 5xx are retried up to
/// `max_retries` times with exponential backoff (1s, 2s, 4s, ...). Other
/// 4xx responses are permanent.
///
/// # Errors
///
/// Returns [`ClientError`] if the request still fails after all retries,
/// the server returns a non-retryable status, or the body is not JSON.
pub async fn send_json<F>(build_request: F, max_retries: u32) -> Result<serde_json::Value, ClientError>
where
    F: Fn() -> reqwest::RequestBuilder + Send + Sync,
{
    let response = send_inner(&build_request, max_retries).await?;
    let status = response.status();
    let text = response.text().await?;

    serde_json::from_str(&text).map_err(|e| {
        log::error!(
            "JSON parse failed (status {status}, {} bytes): {e}\n  body preview: {}",
            text.len(),
            preview(&text)
        );
        ClientError::Json(e)
    })
}

async fn send_inner<F>(
    build_request: &F,
    max_retries: u32,
) -> Result<reqwest::Response, ClientError>
where
    F: Fn() -> reqwest::RequestBuilder + Send + Sync,
{
    let mut attempt = 0;

    loop {
        if attempt > 0 {
            let delay = backoff(attempt);
            log::warn!("  retry {attempt}/{max_retries} in {delay:?}...");
            tokio::time::sleep(delay).await;
        }

        match build_request().send().await {
            Err(e) => {
                if is_transient(&e) && attempt < max_retries {
                    log::warn!("  transient error: {e}");
                    attempt += 1;
                    continue;
                }
                return Err(ClientError::Http(e));
            }
            Ok(response) => {
                let status = response.status();

                if status == reqwest::StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
                    if attempt < max_retries {
                        log::warn!("  HTTP {status} from {}", response.url());
                        attempt += 1;
                        continue;
                    }
                    return Err(status_error(response).await);
                }

                if status.is_client_error() {
                    return Err(status_error(response).await);
                }

                return Ok(response);
            }
        }
    }
}

async fn status_error(response: reqwest::Response) -> ClientError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    ClientError::Status {
        status: status.as_u16(),
        message: if body.is_empty() {
            status.canonical_reason().unwrap_or("request failed").to_string()
        } else {
            preview(&body)
        },
    }
}

fn backoff(attempt: u32) -> Duration {
    Duration::from_secs(1u64 << (attempt - 1).min(5))
}

fn preview(text: &str) -> String {
    if text.len() <= BODY_PREVIEW_LEN {
        return text.to_string();
    }
    let mut end = BODY_PREVIEW_LEN;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &text[..end])
}

/// Returns `true` if the error is likely transient and worth retrying.
fn is_transient(e: &reqwest::Error) -> bool {
    e.is_timeout() || e.is_connect() || e.is_body() || e.is_request()
}
