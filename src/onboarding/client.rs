//! Onboarding service client: the single create call behind submit.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::{debug, warn};
use uuid::Uuid;

use super::model::{OnboardingRequest, OnboardingResponse};
use crate::error::SubmissionError;

/// Header carrying the per-wizard idempotency key.
pub const IDEMPOTENCY_HEADER: &str = "Idempotency-Key";

/// Path of the create endpoint, relative to the API base URL.
pub const ONBOARDING_PATH: &str = "/api/onboarding";

/// Creates a user profile from a finished draft.
#[async_trait]
pub trait OnboardingClient: Send + Sync {
    async fn create_profile(
        &self,
        request: &OnboardingRequest,
        idempotency_key: Uuid,
    ) -> Result<OnboardingResponse, SubmissionError>;
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: Option<String>,
}

/// reqwest-backed client for `POST {base_url}/api/onboarding`.
pub struct HttpOnboardingClient {
    client: reqwest::Client,
    base_url: String,
    timeout: Option<Duration>,
}

impl HttpOnboardingClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout: None,
        }
    }

    /// Client whose connections give up after `timeout`.
    pub fn with_timeout(
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, SubmissionError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SubmissionError::Network(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout: Some(timeout),
        })
    }

    /// A transport timeout is the same outcome as the coordinator's bound.
    fn transport_error(&self, e: reqwest::Error) -> SubmissionError {
        match self.timeout {
            Some(timeout) if e.is_timeout() => SubmissionError::Timeout(timeout),
            _ => SubmissionError::Network(e.to_string()),
        }
    }

    fn endpoint(&self) -> String {
        format!("{}{ONBOARDING_PATH}", self.base_url)
    }
}

#[async_trait]
impl OnboardingClient for HttpOnboardingClient {
    async fn create_profile(
        &self,
        request: &OnboardingRequest,
        idempotency_key: Uuid,
    ) -> Result<OnboardingResponse, SubmissionError> {
        let resp = self
            .client
            .post(self.endpoint())
            .header(IDEMPOTENCY_HEADER, idempotency_key.to_string())
            .json(request)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| self.transport_error(e))?;

        if status.is_success() {
            debug!(status = %status, "Onboarding create accepted");
            return serde_json::from_str(&body)
                .map_err(|e| SubmissionError::InvalidResponse(format!("{e}: {body}")));
        }

        warn!(status = %status, "Onboarding create failed");
        Err(classify_failure(status, &body))
    }
}

/// Map a non-2xx response to the submission error taxonomy.
pub fn classify_failure(status: StatusCode, body: &str) -> SubmissionError {
    let message = serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.error)
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("request failed")
                .to_string()
        });

    match status {
        StatusCode::CONFLICT => SubmissionError::Conflict { message },
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
            SubmissionError::Rejected { message }
        }
        other => SubmissionError::Service {
            status: other.as_u16(),
            message,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conflict_maps_to_conflict() {
        let err = classify_failure(StatusCode::CONFLICT, r#"{"error":"email taken"}"#);
        assert!(matches!(err, SubmissionError::Conflict { ref message } if message == "email taken"));
    }

    #[test]
    fn bad_request_and_unprocessable_map_to_rejected() {
        for status in [StatusCode::BAD_REQUEST, StatusCode::UNPROCESSABLE_ENTITY] {
            let err = classify_failure(status, r#"{"error":"email is required"}"#);
            assert!(matches!(err, SubmissionError::Rejected { .. }));
        }
    }

    #[test]
    fn server_error_keeps_status() {
        let err = classify_failure(StatusCode::SERVICE_UNAVAILABLE, "upstream down");
        match err {
            SubmissionError::Service { status, message } => {
                assert_eq!(status, 503);
                assert_eq!(message, "Service Unavailable");
            }
            other => panic!("expected Service, got {other:?}"),
        }
    }

    #[test]
    fn endpoint_trims_trailing_slash() {
        let client = HttpOnboardingClient::new("http://localhost:3001/");
        assert_eq!(client.endpoint(), "http://localhost:3001/api/onboarding");
    }

    #[tokio::test]
    async fn unreachable_host_is_network_failure() {
        // Grab a free port, then release it so nothing is listening.
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let client = HttpOnboardingClient::with_timeout(
            format!("http://127.0.0.1:{port}"),
            Duration::from_secs(2),
        )
        .unwrap();
        let request = OnboardingRequest::from(&super::super::model::Draft::default());
        let err = client
            .create_profile(&request, Uuid::new_v4())
            .await
            .unwrap_err();
        assert!(matches!(err, SubmissionError::Network(_)));
    }

    #[tokio::test]
    async fn silent_server_is_timeout_not_network() {
        // Accept connections but never answer.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });

        let timeout = Duration::from_millis(100);
        let client =
            HttpOnboardingClient::with_timeout(format!("http://127.0.0.1:{port}"), timeout).unwrap();
        let request = OnboardingRequest::from(&super::super::model::Draft::default());
        let err = client
            .create_profile(&request, Uuid::new_v4())
            .await
            .unwrap_err();
        assert!(matches!(err, SubmissionError::Timeout(t) if t == timeout), "{err:?}");
    }
}
