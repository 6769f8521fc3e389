//! Intent router
//!
//! One classification call per utterance. Reminders need a confident
//! classification with a time; everything else, including classifier
//! failures, goes to chat.

use log::{debug, info, warn};
use std::sync::Arc;

use crate::backend::{ChatBackend, ChatRequest, ChatResponse, IntentClassifier};
use crate::core::PipelineError;
use crate::features::reminders::{ReminderScheduler, SchedulingResult};
use crate::features::settings::Settings;

/// Minimum classifier confidence for the reminder path
pub const CONFIDENCE_THRESHOLD: f64 = 0.8;

pub const REMINDER_INTENT: &str = "reminder";

#[derive(Debug, Clone, PartialEq)]
pub enum Route {
    Reminder { time: String, confidence: f64 },
    Chat,
}

#[derive(Debug, Clone)]
pub enum Reply {
    Reminder(SchedulingResult),
    /// `notice` explains why a reminder request ended up in chat
    Chat {
        response: ChatResponse,
        notice: Option<String>,
    },
    Unavailable { message: String },
}

impl Reply {
    /// Text shown to the user
    pub fn message(&self) -> String {
        match self {
            Reply::Reminder(result) => result.message.clone(),
            Reply::Chat { response, notice } => match notice {
                Some(notice) => format!("{notice}\n\n{}", response.response),
                None => response.response.clone(),
            },
            Reply::Unavailable { message } => message.clone(),
        }
    }
}

pub struct IntentRouter {
    classifier: Arc<dyn IntentClassifier>,
    chat: Arc<dyn ChatBackend>,
    scheduler: Arc<ReminderScheduler>,
    settings: Arc<Settings>,
    user_id: String,
}

impl IntentRouter {
    pub fn new(
        classifier: Arc<dyn IntentClassifier>,
        chat: Arc<dyn ChatBackend>,
        scheduler: Arc<ReminderScheduler>,
        settings: Arc<Settings>,
        user_id: impl Into<String>,
    ) -> Self {
        Self {
            classifier,
            chat,
            scheduler,
            settings,
            user_id: user_id.into(),
        }
    }

    pub async fn route(&self, utterance: &str) -> Route {
        let classification = match self.classifier.classify(&self.user_id, utterance).await {
            Ok(c) => c,
            Err(e) => {
                warn!("Intent classification failed, routing to chat: {e}");
                return Route::Chat;
            }
        };

        let time = classification
            .time
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty());

        match (classification.success, classification.intent.as_deref(), time) {
            (true, Some(REMINDER_INTENT), Some(time))
                if classification.confidence >= CONFIDENCE_THRESHOLD =>
            {
                debug!(
                    "Routed to reminder (time '{time}', confidence {:.2})",
                    classification.confidence
                );
                Route::Reminder {
                    time: time.to_string(),
                    confidence: classification.confidence,
                }
            }
            _ => {
                debug!(
                    "Routed to chat (intent {:?}, confidence {:.2})",
                    classification.intent, classification.confidence
                );
                Route::Chat
            }
        }
    }

    /// Route, then schedule or chat. A failed reminder attempt falls back to
    /// chat once; if chat fails too the reply says so.
    pub async fn handle(&self, utterance: &str) -> Reply {
        let notice = match self.route(utterance).await {
            Route::Reminder { time, confidence } => {
                match self.scheduler.schedule(utterance, &time, confidence).await {
                    Ok(result) => return Reply::Reminder(result),
                    Err(e) => {
                        warn!("Reminder path failed, falling back to chat: {e}");
                        Some(e.user_message())
                    }
                }
            }
            Route::Chat => None,
        };

        match self.chat(utterance).await {
            Ok(response) => Reply::Chat { response, notice },
            Err(e) => {
                warn!("Chat backend failed: {e}");
                let message = match notice {
                    Some(notice) => format!("{notice} I also can't reach the assistant right now."),
                    None => "I can't reach the assistant right now. Please try again shortly."
                        .to_string(),
                };
                Reply::Unavailable { message }
            }
        }
    }

    async fn chat(&self, utterance: &str) -> Result<ChatResponse, PipelineError> {
        let use_web_search = match self.settings.web_search().await {
            Ok(enabled) => enabled,
            Err(e) => {
                warn!("Could not read web search setting: {e}");
                false
            }
        };

        let request = ChatRequest {
            user_id: self.user_id.clone(),
            text: utterance.to_string(),
            use_web_search,
            include_context: true,
        };
        let response = self.chat.chat(&request).await?;
        info!(
            "Chat reply received ({} tokens, web search: {})",
            response.tokens_used, response.web_search_used
        );
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::FixedClock;
    use crate::features::delivery::{DeliveryTokenManager, StaticPermissions, StaticTokenSource};
    use crate::features::reminders::{Platform, ReminderStore};
    use crate::storage::MemoryStore;
    use crate::testing::{FakeChat, FakeClassifier, FakePush};
    use chrono::{TimeZone, Utc};
    use std::sync::atomic::Ordering;

    struct Harness {
        router: IntentRouter,
        classifier: Arc<FakeClassifier>,
        chat: Arc<FakeChat>,
        settings: Arc<Settings>,
        scheduler: Arc<ReminderScheduler>,
    }

    fn harness(classifier: FakeClassifier) -> Harness {
        let kv = Arc::new(MemoryStore::new());
        let push = Arc::new(FakePush::new());
        let clock = Arc::new(FixedClock::new(
            Utc.with_ymd_and_hms(2026, 10, 19, 15, 0, 0).unwrap(),
        ));
        let tokens = Arc::new(DeliveryTokenManager::new(
            Arc::new(StaticPermissions::new(true)),
            Arc::new(StaticTokenSource::new(None)),
            push.clone(),
            kv.clone(),
            "user-1",
            Platform::Other,
        ));
        let scheduler = Arc::new(ReminderScheduler::new(
            Arc::new(ReminderStore::new(kv.clone())),
            tokens,
            push,
            clock,
            "user-1",
        ));
        let classifier = Arc::new(classifier);
        let chat = Arc::new(FakeChat::default());
        let settings = Arc::new(Settings::new(kv));
        let router = IntentRouter::new(
            classifier.clone(),
            chat.clone(),
            scheduler.clone(),
            settings.clone(),
            "user-1",
        );
        Harness {
            router,
            classifier,
            chat,
            settings,
            scheduler,
        }
    }

    #[tokio::test]
    async fn test_threshold_is_inclusive() {
        let below = harness(FakeClassifier::answering("reminder", Some("5 minutes"), 0.79));
        assert_eq!(below.router.route("remind me").await, Route::Chat);

        let at = harness(FakeClassifier::answering("reminder", Some("5 minutes"), 0.80));
        assert_eq!(
            at.router.route("remind me").await,
            Route::Reminder {
                time: "5 minutes".to_string(),
                confidence: 0.80
            }
        );
    }

    #[tokio::test]
    async fn test_reminder_without_time_goes_to_chat() {
        let h = harness(FakeClassifier::answering("reminder", Some("  "), 0.95));
        assert_eq!(h.router.route("remind me").await, Route::Chat);

        let h = harness(FakeClassifier::answering("reminder", None, 0.95));
        assert_eq!(h.router.route("remind me").await, Route::Chat);
    }

    #[tokio::test]
    async fn test_other_intents_go_to_chat() {
        let h = harness(FakeClassifier::answering("chat", Some("5 minutes"), 0.99));
        assert_eq!(h.router.route("hello").await, Route::Chat);
        assert_eq!(h.classifier.call_count(), 1);
    }

    #[tokio::test]
    async fn test_classifier_failure_routes_to_chat() {
        let h = harness(FakeClassifier::failing());
        assert_eq!(h.router.route("remind me in 5 minutes").await, Route::Chat);
    }

    #[tokio::test]
    async fn test_handle_schedules_reminder() {
        let h = harness(FakeClassifier::answering("reminder", Some("5 minutes"), 0.9));
        let reply = h.router.handle("remind me to stretch in 5 minutes").await;

        assert!(matches!(reply, Reply::Reminder(_)));
        assert_eq!(h.chat.request_count(), 0);
        assert_eq!(h.scheduler.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_invalid_time_falls_back_to_chat_once() {
        let h = harness(FakeClassifier::answering("reminder", Some("someday"), 0.9));
        let reply = h.router.handle("remind me someday").await;

        match &reply {
            Reply::Chat { notice, .. } => assert!(notice.is_some()),
            other => panic!("expected chat fallback, got {other:?}"),
        }
        assert_eq!(h.chat.request_count(), 1);
        assert_eq!(h.classifier.call_count(), 1);
        assert!(h.scheduler.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_chat_carries_web_search_setting() {
        let h = harness(FakeClassifier::answering("chat", None, 0.9));
        h.settings.set_web_search(true).await.unwrap();

        let reply = h.router.handle("what's the weather").await;
        match reply {
            Reply::Chat { response, notice } => {
                assert!(response.web_search_used);
                assert!(notice.is_none());
            }
            other => panic!("expected chat, got {other:?}"),
        }
        let requests = h.chat.requests.lock().unwrap();
        assert!(requests[0].use_web_search);
        assert!(requests[0].include_context);
    }

    #[tokio::test]
    async fn test_chat_failure_is_unavailable() {
        let h = harness(FakeClassifier::failing());
        h.chat.fail.store(true, Ordering::SeqCst);

        let reply = h.router.handle("hello").await;
        assert!(matches!(reply, Reply::Unavailable { .. }));
        assert!(reply.message().contains("can't reach"));
        assert_eq!(h.chat.request_count(), 1);
    }
}
