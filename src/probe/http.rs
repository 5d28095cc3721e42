use reqwest::{Client, Response, StatusCode, redirect};
use std::time::{Duration, Instant};
use tracing::debug;

use super::ProbeOutcome;

/// Client used for HTTP probes. The timeout covers connect, headers and body;
/// on expiry the connection is dropped.
pub fn build_client(timeout: Duration) -> Result<Client, reqwest::Error> {
    Client::builder()
        .timeout(timeout)
        .redirect(redirect::Policy::none())
        .build()
}

/// Issues a GET and reads the response to completion.
///
/// Succeeds iff a response arrives with a status below 400.
pub async fn check_http(client: &Client, url: &str) -> ProbeOutcome {
    let start_time = Instant::now();
    let result = match client.get(url).send().await {
        Ok(response) => drain(response).await,
        Err(e) => Err(e),
    };
    let response_time_ms = Some(elapsed_ms(start_time));

    match result {
        Ok(status) => {
            debug!(url, status = status.as_u16(), "HTTP probe finished.");
            ProbeOutcome {
                success: status.as_u16() < 400,
                response_time_ms,
                status_code: Some(i32::from(status.as_u16())),
                error_message: None,
            }
        }
        Err(e) => {
            let message = if e.is_timeout() {
                "Request timed out".to_string()
            } else {
                format!("Request failed: {e}")
            };
            ProbeOutcome {
                response_time_ms,
                ..ProbeOutcome::failed(message)
            }
        }
    }
}

/// Reads the body chunk by chunk, discarding each one, so the timing covers
/// the full response without holding it in memory.
async fn drain(mut response: Response) -> Result<StatusCode, reqwest::Error> {
    let status = response.status();
    while response.chunk().await?.is_some() {}
    Ok(status)
}

fn elapsed_ms(start: Instant) -> i32 {
    i32::try_from(start.elapsed().as_millis()).unwrap_or(i32::MAX)
}
