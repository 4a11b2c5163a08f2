//! Shared reqwest plumbing for the backend adapters.

use std::time::Duration;

use tether_types::error::BackendError;

/// Build the HTTP client shared by both backends.
pub fn build_client(timeout: Duration) -> Result<reqwest::Client, BackendError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| BackendError::Transport(format!("failed to create HTTP client: {e}")))
}

/// Client for long-lived streaming responses: only connecting is bounded,
/// since a total timeout would cut a slow turn off mid-stream.
pub fn build_streaming_client(connect_timeout: Duration) -> Result<reqwest::Client, BackendError> {
    reqwest::Client::builder()
        .connect_timeout(connect_timeout)
        .build()
        .map_err(|e| BackendError::Transport(format!("failed to create HTTP client: {e}")))
}

/// Join a base URL and an absolute path without doubling slashes.
pub fn endpoint(base_url: &str, path: &str) -> String {
    format!("{}{}", base_url.trim_end_matches('/'), path)
}

pub fn transport(e: reqwest::Error) -> BackendError {
    BackendError::Transport(format!("HTTP request failed: {e}"))
}

/// Map a non-2xx response to a [`BackendError`]; 401 is kept distinct so the
/// invoker can renew and retry.
pub async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, BackendError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    if status == reqwest::StatusCode::UNAUTHORIZED {
        return Err(BackendError::Unauthorized);
    }
    let body = response.text().await.unwrap_or_default();
    Err(BackendError::Status {
        status: status.as_u16(),
        body,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_joins_without_double_slash() {
        assert_eq!(endpoint("http://h/api/", "/auth/refresh"), "http://h/api/auth/refresh");
        assert_eq!(endpoint("http://h/api", "/auth/refresh"), "http://h/api/auth/refresh");
    }

    #[test]
    fn build_client_succeeds() {
        assert!(build_client(Duration::from_secs(5)).is_ok());
        assert!(build_streaming_client(Duration::from_secs(5)).is_ok());
    }
}
