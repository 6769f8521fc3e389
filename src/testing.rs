//! Test doubles for the backend collaborators.

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use crate::backend::{
    CancelReminderRequest, ChatBackend, ChatRequest, ChatResponse, IntentClassification,
    IntentClassifier, PushBackend, RegisterDeviceRequest, RemoteReminderStatus,
    ScheduleReminderRequest,
};
use crate::core::{PipelineError, PipelineResult};

#[derive(Default)]
pub struct FakePush {
    pub registered: Mutex<Vec<String>>,
    pub scheduled: Mutex<Vec<ScheduleReminderRequest>>,
    pub cancelled: Mutex<Vec<CancelReminderRequest>>,
    pub fail_register: AtomicBool,
    pub fail_schedule: AtomicBool,
    pub fail_cancel: AtomicBool,
    pub register_delay: Mutex<Option<Duration>>,
    pub schedule_delay: Mutex<Option<Duration>>,
}

impl FakePush {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn registered_tokens(&self) -> Vec<String> {
        self.registered.lock().unwrap().clone()
    }

    pub fn scheduled_tokens(&self) -> Vec<String> {
        self.scheduled
            .lock()
            .unwrap()
            .iter()
            .map(|r| r.fcm_token.clone())
            .collect()
    }

    pub fn cancel_count(&self) -> usize {
        self.cancelled.lock().unwrap().len()
    }

    pub fn set_register_delay(&self, delay: Option<Duration>) {
        *self.register_delay.lock().unwrap() = delay;
    }

    pub fn set_schedule_delay(&self, delay: Option<Duration>) {
        *self.schedule_delay.lock().unwrap() = delay;
    }
}

#[async_trait]
impl PushBackend for FakePush {
    async fn register_device(&self, request: &RegisterDeviceRequest) -> PipelineResult<()> {
        let fail = self.fail_register.load(Ordering::SeqCst);
        let delay = *self.register_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if fail {
            return Err(PipelineError::backend("register-device unavailable"));
        }
        self.registered
            .lock()
            .unwrap()
            .push(request.fcm_token.clone());
        Ok(())
    }

    async fn schedule_reminder(&self, request: &ScheduleReminderRequest) -> PipelineResult<String> {
        let fail = self.fail_schedule.load(Ordering::SeqCst);
        let delay = *self.schedule_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if fail {
            return Err(PipelineError::backend("schedule-reminder unavailable"));
        }
        let mut scheduled = self.scheduled.lock().unwrap();
        scheduled.push(request.clone());
        Ok(format!("remote-{}", scheduled.len()))
    }

    async fn cancel_reminder(&self, request: &CancelReminderRequest) -> PipelineResult<()> {
        if self.fail_cancel.load(Ordering::SeqCst) {
            return Err(PipelineError::backend("cancel-reminder unavailable"));
        }
        self.cancelled.lock().unwrap().push(request.clone());
        Ok(())
    }

    async fn reminder_status(&self, remote_id: &str) -> PipelineResult<RemoteReminderStatus> {
        Ok(RemoteReminderStatus {
            success: true,
            status: Some(format!("scheduled:{remote_id}")),
            scheduled_for: None,
            delivered: Some(false),
        })
    }
}

/// Classifier returning a canned answer, or failing when `None`
pub struct FakeClassifier {
    pub answer: Mutex<Option<IntentClassification>>,
    pub calls: Mutex<Vec<String>>,
}

impl FakeClassifier {
    pub fn answering(intent: &str, time: Option<&str>, confidence: f64) -> Self {
        Self {
            answer: Mutex::new(Some(IntentClassification {
                success: true,
                intent: Some(intent.to_string()),
                time: time.map(|t| t.to_string()),
                confidence,
            })),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            answer: Mutex::new(None),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl IntentClassifier for FakeClassifier {
    async fn classify(&self, _user_id: &str, text: &str) -> PipelineResult<IntentClassification> {
        self.calls.lock().unwrap().push(text.to_string());
        self.answer
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| PipelineError::backend("classifier offline"))
    }
}

#[derive(Default)]
pub struct FakeChat {
    pub requests: Mutex<Vec<ChatRequest>>,
    pub fail: AtomicBool,
}

impl FakeChat {
    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl ChatBackend for FakeChat {
    async fn chat(&self, request: &ChatRequest) -> PipelineResult<ChatResponse> {
        self.requests.lock().unwrap().push(request.clone());
        if self.fail.load(Ordering::SeqCst) {
            return Err(PipelineError::backend("chat offline"));
        }
        Ok(ChatResponse {
            response: format!("echo: {}", request.text),
            tokens_used: 12,
            web_search_used: request.use_web_search,
        })
    }
}
