// src/session/api.rs

use std::{future::Future, time::Duration};

use async_trait::async_trait;
use serde::{Serialize, de::DeserializeOwned};
use tokio::time;

use crate::{
    error::SessionError,
    models::{
        attempt::{AnswerEntry, AttemptResult, StartAttemptResponse, SubmitAttemptRequest},
        violation::{ReportViolationRequest, ViolationCategory, ViolationReport},
    },
};

/// Attempt-lifecycle operations the session controller depends on.
#[async_trait]
pub trait AttemptApi: Send + Sync {
    async fn start_attempt(&self, assessment_id: i64) -> Result<StartAttemptResponse, SessionError>;

    async fn report_violation(
        &self,
        assessment_id: i64,
        category: ViolationCategory,
    ) -> Result<ViolationReport, SessionError>;

    async fn submit_attempt(
        &self,
        assessment_id: i64,
        answers: Vec<AnswerEntry>,
    ) -> Result<AttemptResult, SessionError>;
}

/// Fails a call with `SessionError::Timeout` once `limit` has passed,
/// whatever the transport underneath does.
pub async fn with_timeout<T>(
    limit: Duration,
    request: impl Future<Output = Result<T, SessionError>>,
) -> Result<T, SessionError> {
    time::timeout(limit, request).await?
}

/// `AttemptApi` over HTTP, authenticated with a bearer token.
#[derive(Debug, Clone)]
pub struct HttpAttemptApi {
    client: reqwest::Client,
    base_url: String,
    token: String,
}

impl HttpAttemptApi {
    /// Client whose every request gives up after `request_timeout`.
    pub fn new(
        base_url: impl Into<String>,
        token: impl Into<String>,
        request_timeout: Duration,
    ) -> Result<Self, SessionError> {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()?;
        Ok(Self::with_client(client, base_url, token))
    }

    pub fn with_client(
        client: reqwest::Client,
        base_url: impl Into<String>,
        token: impl Into<String>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
        }
    }

    async fn post<B, R>(&self, path: &str, body: &B) -> Result<R, SessionError>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let response = self
            .client
            .post(format!("{}{}", self.base_url, path))
            .bearer_auth(&self.token)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            // Error bodies look like {"error": "..."}; fall back to the reason phrase.
            let message = response
                .json::<serde_json::Value>()
                .await
                .ok()
                .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(str::to_string))
                .unwrap_or_else(|| status.canonical_reason().unwrap_or("unknown").to_string());
            return Err(SessionError::Status {
                status: status.as_u16(),
                message,
            });
        }

        response
            .json::<R>()
            .await
            .map_err(|e| SessionError::Decode(e.to_string()))
    }
}

#[async_trait]
impl AttemptApi for HttpAttemptApi {
    async fn start_attempt(&self, assessment_id: i64) -> Result<StartAttemptResponse, SessionError> {
        self.post(
            &format!("/api/assessments/{}/attempts/start", assessment_id),
            &serde_json::json!({}),
        )
        .await
    }

    async fn report_violation(
        &self,
        assessment_id: i64,
        category: ViolationCategory,
    ) -> Result<ViolationReport, SessionError> {
        self.post(
            &format!("/api/assessments/{}/attempts/violation", assessment_id),
            &ReportViolationRequest { category },
        )
        .await
    }

    async fn submit_attempt(
        &self,
        assessment_id: i64,
        answers: Vec<AnswerEntry>,
    ) -> Result<AttemptResult, SessionError> {
        self.post(
            &format!("/api/assessments/{}/attempts/submit", assessment_id),
            &SubmitAttemptRequest { answers },
        )
        .await
    }
}
