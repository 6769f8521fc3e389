//! HTTP client for the companion backend.

use async_trait::async_trait;
use log::{debug, warn};
use reqwest::Url;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;

use super::protocol::{
    Acknowledgement, CancelReminderRequest, ChatRequest, ChatResponse, ClassifyRequest,
    IntentClassification, RegisterDeviceRequest, RemoteReminderStatus, ScheduleReminderRequest,
    ScheduleReminderResponse,
};
use super::{ChatBackend, IntentClassifier, PushBackend};
use crate::core::{PipelineError, PipelineResult};

#[derive(Clone)]
pub struct BackendClient {
    http: reqwest::Client,
    base_url: String,
}

impl BackendClient {
    pub fn new(base_url: &str, timeout: Duration) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn status_url(&self, remote_id: &str) -> PipelineResult<Url> {
        let mut url = Url::parse(&self.url("/firebase/reminder-status"))
            .map_err(|e| PipelineError::backend(format!("invalid backend url: {e}")))?;
        url.path_segments_mut()
            .map_err(|_| PipelineError::backend("backend url cannot carry a path"))?
            .push(remote_id);
        Ok(url)
    }

    async fn post_json<B, R>(&self, path: &str, body: &B) -> PipelineResult<R>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        debug!("POST {path}");
        let response = self.http.post(self.url(path)).json(body).send().await?;
        Self::decode(path, response).await
    }

    async fn decode<R: DeserializeOwned>(path: &str, response: reqwest::Response) -> PipelineResult<R> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!("{path} returned {status}: {body}");
            return Err(PipelineError::backend(format!("{path} returned {status}")));
        }

        response
            .json::<R>()
            .await
            .map_err(|e| PipelineError::backend(format!("malformed response from {path}: {e}")))
    }
}

/// Turn a `{success: false}` body into a backend error
fn ensure_success(path: &str, success: bool, error: Option<String>) -> PipelineResult<()> {
    if success {
        Ok(())
    } else {
        Err(PipelineError::backend(format!(
            "{path} rejected the request: {}",
            error.unwrap_or_else(|| "no reason given".to_string())
        )))
    }
}

#[async_trait]
impl IntentClassifier for BackendClient {
    async fn classify(&self, user_id: &str, text: &str) -> PipelineResult<IntentClassification> {
        let request = ClassifyRequest {
            user_id: user_id.to_string(),
            text: text.to_string(),
        };
        self.post_json("/intent/classify", &request).await
    }
}

#[async_trait]
impl ChatBackend for BackendClient {
    async fn chat(&self, request: &ChatRequest) -> PipelineResult<ChatResponse> {
        self.post_json("/chat", request).await
    }
}

#[async_trait]
impl PushBackend for BackendClient {
    async fn register_device(&self, request: &RegisterDeviceRequest) -> PipelineResult<()> {
        let path = "/firebase/register-device";
        let ack: Acknowledgement = self.post_json(path, request).await?;
        ensure_success(path, ack.success, ack.error)
    }

    async fn schedule_reminder(&self, request: &ScheduleReminderRequest) -> PipelineResult<String> {
        let path = "/firebase/schedule-reminder";
        let response: ScheduleReminderResponse = self.post_json(path, request).await?;
        ensure_success(path, response.success, response.error)?;
        response
            .remote_id
            .filter(|id| !id.is_empty())
            .ok_or_else(|| PipelineError::backend(format!("{path} returned no remoteId")))
    }

    async fn cancel_reminder(&self, request: &CancelReminderRequest) -> PipelineResult<()> {
        let path = "/firebase/cancel-reminder";
        let ack: Acknowledgement = self.post_json(path, request).await?;
        ensure_success(path, ack.success, ack.error)
    }

    async fn reminder_status(&self, remote_id: &str) -> PipelineResult<RemoteReminderStatus> {
        let url = self.status_url(remote_id)?;
        debug!("GET {url}");
        let response = self.http.get(url).send().await?;
        let status: RemoteReminderStatus =
            Self::decode("/firebase/reminder-status", response).await?;
        ensure_success("/firebase/reminder-status", status.success, None)?;
        Ok(status)
    }
}
