use std::time::Duration;

use reqwest::{Client, Response, StatusCode};

use super::ProviderError;

/// Shared HTTP client for provider calls.
pub fn new_api_client(timeout: Duration) -> Client {
    Client::builder()
        .timeout(timeout)
        .connect_timeout(Duration::from_secs(10))
        // Below typical upstream keep-alive so pooled sockets are not reused stale
        .pool_idle_timeout(Some(Duration::from_secs(60)))
        .tcp_keepalive(Duration::from_secs(60))
        .build()
        .unwrap_or_else(|e| {
            log::warn!("Falling back to default HTTP client: {}", e);
            Client::new()
        })
}

/// Maps non-2xx responses into `ProviderError`, keeping the body for the log.
pub async fn check_status(provider: &'static str, response: Response) -> Result<Response, ProviderError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let error_text = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(ProviderError::Auth {
            provider,
            message: format!("({}) {}", status, error_text),
        }),
        _ => Err(ProviderError::Upstream {
            provider,
            status: Some(status.as_u16()),
            message: error_text,
        }),
    }
}
