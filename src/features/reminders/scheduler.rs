//! Reminder scheduler
//!
//! End-to-end flow for one reminder: parse → persist (durability checkpoint)
//! → push scheduling when a registered token is available → reconcile the
//! stored delivery state → report. Anything short of a storage failure ends
//! in a usable reminder, at worst in local-only mode.
//!
//! - **Version**: 1.3.0
//! - **Since**: 0.1.0
//!
//! ## Changelog
//! - 1.3.0: Cancel removes before contacting the backend; clock supplies the user's zone
//! - 1.2.0: Late push acceptances after a timeout are reconciled by remote id
//! - 1.1.0: Added reminder status lookup
//! - 1.0.0: Initial release

use chrono::{DateTime, FixedOffset, Utc};
use log::{debug, error, info, warn};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

use super::model::{DeliveryMethod, DeliveryState, ReminderPatch, ReminderRecord};
use super::parser::{parse_time_expression, reminder_text};
use super::store::ReminderStore;
use crate::backend::{CancelReminderRequest, PushBackend, RemoteReminderStatus, ScheduleReminderRequest};
use crate::core::config::DEFAULT_REQUEST_TIMEOUT_SECS;
use crate::core::{Clock, PipelineError, PipelineResult};
use crate::features::delivery::DeliveryTokenManager;

/// How a scheduling attempt ended up being delivered
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchedulingOutcome {
    /// Push backend accepted the reminder
    Push,
    /// Degraded mode: stored on device only
    LocalOnly { reason: String },
}

#[derive(Debug, Clone)]
pub struct SchedulingResult {
    pub reminder: ReminderRecord,
    pub outcome: SchedulingOutcome,
    /// User-facing confirmation, distinct for each outcome
    pub message: String,
}

impl SchedulingResult {
    fn pushed(reminder: ReminderRecord, offset: FixedOffset) -> Self {
        let message = format!(
            "⏰ Reminder set for {}: \"{}\". You'll get a notification.",
            format_when(reminder.time, offset),
            reminder.text
        );
        Self {
            reminder,
            outcome: SchedulingOutcome::Push,
            message,
        }
    }

    fn local_only(reminder: ReminderRecord, reason: String, offset: FixedOffset) -> Self {
        let message = format!(
            "📝 Reminder saved for {}: \"{}\", but only on this device ({}). Keep the app open to see it.",
            format_when(reminder.time, offset),
            reminder.text,
            reason
        );
        Self {
            reminder,
            outcome: SchedulingOutcome::LocalOnly { reason },
            message,
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self.outcome, SchedulingOutcome::LocalOnly { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CancelResult {
    pub id: String,
    /// True only when the reminder was pushed and the backend confirmed the cancel
    pub canceled_remote: bool,
    pub message: String,
}

/// Local record plus whatever the push backend reports for it
#[derive(Debug, Clone)]
pub struct ReminderStatusReport {
    pub reminder: ReminderRecord,
    pub remote: Option<RemoteReminderStatus>,
    pub remote_error: Option<String>,
}

enum PushAttempt {
    Accepted(String),
    Failed(String),
    /// Still running; the handle is watched for a late answer
    TimedOut(JoinHandle<PipelineResult<String>>),
}

fn format_when(time: DateTime<Utc>, offset: FixedOffset) -> String {
    time.with_timezone(&offset)
        .format("%b %-d at %-I:%M %p")
        .to_string()
}

pub struct ReminderScheduler {
    store: Arc<ReminderStore>,
    tokens: Arc<DeliveryTokenManager>,
    push: Arc<dyn PushBackend>,
    clock: Arc<dyn Clock>,
    user_id: String,
    push_timeout: Duration,
}

impl ReminderScheduler {
    pub fn new(
        store: Arc<ReminderStore>,
        tokens: Arc<DeliveryTokenManager>,
        push: Arc<dyn PushBackend>,
        clock: Arc<dyn Clock>,
        user_id: impl Into<String>,
    ) -> Self {
        Self {
            store,
            tokens,
            push,
            clock,
            user_id: user_id.into(),
            push_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        }
    }

    /// Upper bound on waiting for the push backend
    pub fn with_push_timeout(mut self, timeout: Duration) -> Self {
        self.push_timeout = timeout;
        self
    }

    /// Create exactly one new reminder for `utterance` at `classified_time`.
    ///
    /// Fails with `InvalidTime` before anything is stored, and with `Storage`
    /// if the record cannot be persisted. Push problems never fail the call.
    pub async fn schedule(
        &self,
        utterance: &str,
        classified_time: &str,
        confidence: f64,
    ) -> PipelineResult<SchedulingResult> {
        let local_now = self.clock.local_now();
        let offset = *local_now.offset();
        let now = local_now.with_timezone(&Utc);
        let time = parse_time_expression(classified_time, &local_now)?;
        if time <= now {
            return Err(PipelineError::invalid_time(format!(
                "'{classified_time}' is not in the future"
            )));
        }

        let record = ReminderRecord::new(
            self.user_id.as_str(),
            reminder_text(utterance),
            utterance,
            time,
            confidence,
            self.tokens.platform(),
            now,
        );
        let record = self.store.save(record).await?;
        info!("Saved reminder {} for {}", record.id, record.time);

        let Some(token) = self.tokens.ready_token(now).await else {
            return self
                .finish_local_only(&record, "push notifications aren't set up".to_string(), offset)
                .await;
        };

        match self.push_with_timeout(&record, &token.value).await {
            PushAttempt::Accepted(remote_id) => {
                let patch = ReminderPatch::delivery(DeliveryState::Pushed {
                    remote_id: remote_id.clone(),
                });
                match self.store.update(&record.id, patch).await {
                    Ok(updated) => {
                        info!("Reminder {} scheduled remotely as {remote_id}", updated.id);
                        Ok(SchedulingResult::pushed(updated, offset))
                    }
                    Err(PipelineError::NotFound(id)) => {
                        warn!("Reminder {id} disappeared while scheduling; cancelling remote {remote_id}");
                        self.cancel_remote(&remote_id, &token.value).await;
                        Err(PipelineError::NotFound(id))
                    }
                    Err(e) => Err(e),
                }
            }
            PushAttempt::Failed(reason) => self.finish_local_only(&record, reason, offset).await,
            PushAttempt::TimedOut(call) => {
                let result = self
                    .finish_local_only(
                        &record,
                        "the reminder service didn't answer in time".to_string(),
                        offset,
                    )
                    .await;
                self.watch_late_response(record.id.clone(), token.value.clone(), call);
                result
            }
        }
    }

    async fn finish_local_only(
        &self,
        record: &ReminderRecord,
        reason: String,
        offset: FixedOffset,
    ) -> PipelineResult<SchedulingResult> {
        let updated = self
            .store
            .update(&record.id, ReminderPatch::delivery(DeliveryState::LocalOnly))
            .await?;
        info!("Reminder {} kept local-only: {reason}", updated.id);
        Ok(SchedulingResult::local_only(updated, reason, offset))
    }

    async fn push_with_timeout(&self, record: &ReminderRecord, fcm_token: &str) -> PushAttempt {
        let request = ScheduleReminderRequest {
            reminder: record.clone(),
            fcm_token: fcm_token.to_string(),
            user_id: self.user_id.clone(),
        };
        let push = self.push.clone();
        let mut call = tokio::spawn(async move { push.schedule_reminder(&request).await });

        match tokio::time::timeout(self.push_timeout, &mut call).await {
            Ok(Ok(Ok(remote_id))) => PushAttempt::Accepted(remote_id),
            Ok(Ok(Err(e))) => {
                warn!("Push scheduling failed for reminder {}: {e}", record.id);
                PushAttempt::Failed("the reminder service couldn't be reached".to_string())
            }
            Ok(Err(e)) => {
                error!("Push scheduling task for reminder {} aborted: {e}", record.id);
                PushAttempt::Failed("push scheduling was interrupted".to_string())
            }
            Err(_) => {
                warn!(
                    "Push scheduling for reminder {} timed out after {:?}",
                    record.id, self.push_timeout
                );
                PushAttempt::TimedOut(call)
            }
        }
    }

    /// Reconcile a push call that answered after we gave up on it
    fn watch_late_response(
        &self,
        id: String,
        fcm_token: String,
        call: JoinHandle<PipelineResult<String>>,
    ) {
        let store = self.store.clone();
        let push = self.push.clone();
        let user_id = self.user_id.clone();
        let timeout = self.push_timeout;

        tokio::spawn(async move {
            let remote_id = match call.await {
                Ok(Ok(remote_id)) => remote_id,
                Ok(Err(e)) => {
                    debug!("Late push response for reminder {id} was a failure: {e}");
                    return;
                }
                Err(e) => {
                    warn!("Late push task for reminder {id} aborted: {e}");
                    return;
                }
            };

            let patch = ReminderPatch::delivery(DeliveryState::Pushed {
                remote_id: remote_id.clone(),
            });
            match store
                .update_if(&id, |r| r.method == DeliveryMethod::LocalOnly, patch)
                .await
            {
                Ok(Some(_)) => info!("Reconciled late push acceptance for reminder {id} as {remote_id}"),
                Ok(None) => debug!("Reminder {id} changed before late push acceptance; leaving it"),
                Err(PipelineError::NotFound(_)) => {
                    info!("Reminder {id} is gone; cancelling orphaned remote {remote_id}");
                    let request = CancelReminderRequest {
                        remote_id,
                        fcm_token,
                        user_id,
                    };
                    send_cancel(push.as_ref(), &request, timeout).await;
                }
                Err(e) => warn!("Could not reconcile late push for reminder {id}: {e}"),
            }
        });
    }

    async fn cancel_remote(&self, remote_id: &str, fcm_token: &str) -> bool {
        let request = CancelReminderRequest {
            remote_id: remote_id.to_string(),
            fcm_token: fcm_token.to_string(),
            user_id: self.user_id.clone(),
        };
        send_cancel(self.push.as_ref(), &request, self.push_timeout).await
    }

    /// Remove a reminder locally, then cancel it remotely when it was pushed.
    ///
    /// Remote cancellation is best-effort; the local record is always removed.
    pub async fn cancel(&self, id: &str) -> PipelineResult<CancelResult> {
        // Removing first makes any in-flight delivery update see NotFound and
        // take the orphan-cancel path itself.
        let record = self.store.remove(id).await?;

        let canceled_remote = match record.delivery_state() {
            DeliveryState::Pushed { remote_id } => match self.tokens.current_token().await {
                Some(token) => self.cancel_remote(&remote_id, &token.value).await,
                None => {
                    warn!("No delivery token cached; skipping remote cancel of {remote_id}");
                    false
                }
            },
            _ => false,
        };

        let message = match (record.method, canceled_remote) {
            (DeliveryMethod::Push, true) => format!("✅ Cancelled reminder \"{}\".", record.text),
            (DeliveryMethod::Push, false) => format!(
                "✅ Removed reminder \"{}\" from this device, but the notification service couldn't confirm it was cancelled.",
                record.text
            ),
            _ => format!("✅ Removed reminder \"{}\".", record.text),
        };
        info!("Cancelled reminder {id} (remote confirmed: {canceled_remote})");

        Ok(CancelResult {
            id: id.to_string(),
            canceled_remote,
            message,
        })
    }

    /// Live reminders; expired ones are evicted as a side effect
    pub async fn list(&self) -> PipelineResult<Vec<ReminderRecord>> {
        self.store.list(self.clock.now()).await
    }

    /// Local state plus remote delivery status for pushed reminders
    pub async fn status(&self, id: &str) -> PipelineResult<ReminderStatusReport> {
        let reminder = self
            .store
            .get(id)
            .await?
            .ok_or_else(|| PipelineError::not_found(id))?;

        let DeliveryState::Pushed { remote_id } = reminder.delivery_state() else {
            return Ok(ReminderStatusReport {
                reminder,
                remote: None,
                remote_error: None,
            });
        };

        let lookup = tokio::time::timeout(self.push_timeout, self.push.reminder_status(&remote_id)).await;
        let (remote, remote_error) = match lookup {
            Ok(Ok(status)) => (Some(status), None),
            Ok(Err(e)) => (None, Some(e.to_string())),
            Err(_) => (None, Some("status lookup timed out".to_string())),
        };

        Ok(ReminderStatusReport {
            reminder,
            remote,
            remote_error,
        })
    }
}

/// Bounded, best-effort remote cancel. Returns whether the backend confirmed.
async fn send_cancel(push: &dyn PushBackend, request: &CancelReminderRequest, timeout: Duration) -> bool {
    match tokio::time::timeout(timeout, push.cancel_reminder(request)).await {
        Ok(Ok(())) => true,
        Ok(Err(e)) => {
            warn!("Remote cancel of {} failed: {e}", request.remote_id);
            false
        }
        Err(_) => {
            warn!("Remote cancel of {} timed out", request.remote_id);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::FixedClock;
    use crate::features::delivery::{StaticPermissions, StaticTokenSource};
    use crate::features::reminders::Platform;
    use crate::storage::{KeyValueStore, MemoryStore};
    use crate::testing::FakePush;
    use async_trait::async_trait;
    use chrono::{Duration as ChronoDuration, TimeZone};
    use std::sync::atomic::{AtomicBool, Ordering};

    /// Memory store whose reads can be slowed down on demand
    #[derive(Default)]
    struct SlowReads {
        inner: MemoryStore,
        slow: AtomicBool,
    }

    #[async_trait]
    impl KeyValueStore for SlowReads {
        async fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
            if self.slow.load(Ordering::SeqCst) {
                tokio::time::sleep(Duration::from_millis(200)).await;
            }
            self.inner.get(key).await
        }

        async fn set(&self, key: &str, value: &str) -> anyhow::Result<()> {
            self.inner.set(key, value).await
        }

        async fn remove(&self, key: &str) -> anyhow::Result<()> {
            self.inner.remove(key).await
        }
    }

    struct Harness {
        scheduler: ReminderScheduler,
        store: Arc<ReminderStore>,
        tokens: Arc<DeliveryTokenManager>,
        push: Arc<FakePush>,
        clock: Arc<FixedClock>,
    }

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 19, 15, 0, 0).unwrap()
    }

    async fn harness(with_token: bool) -> Harness {
        harness_with(
            Arc::new(MemoryStore::new()),
            Arc::new(FixedClock::new(start())),
            with_token,
        )
        .await
    }

    async fn harness_with(
        kv: Arc<dyn KeyValueStore>,
        clock: Arc<FixedClock>,
        with_token: bool,
    ) -> Harness {
        let push = Arc::new(FakePush::new());
        let tokens = Arc::new(DeliveryTokenManager::new(
            Arc::new(StaticPermissions::new(true)),
            Arc::new(StaticTokenSource::new(Some("tok-a".to_string()))),
            push.clone(),
            kv.clone(),
            "user-1",
            Platform::Android,
        ));
        if with_token {
            tokens.initialize(start()).await.unwrap();
        }
        let store = Arc::new(ReminderStore::new(kv));
        let scheduler = ReminderScheduler::new(
            store.clone(),
            tokens.clone(),
            push.clone(),
            clock.clone(),
            "user-1",
        );
        Harness {
            scheduler,
            store,
            tokens,
            push,
            clock,
        }
    }

    #[tokio::test]
    async fn test_schedule_via_push() {
        let h = harness(true).await;
        let result = h
            .scheduler
            .schedule("remind me to stretch in 5 minutes", "5 minutes", 0.92)
            .await
            .unwrap();

        assert_eq!(result.outcome, SchedulingOutcome::Push);
        assert!(!result.is_degraded());
        let r = &result.reminder;
        assert!(r.scheduled);
        assert_eq!(r.method, DeliveryMethod::Push);
        assert_eq!(r.remote_id.as_deref(), Some("remote-1"));
        assert_eq!(r.text, "stretch");
        assert_eq!(r.time, start() + ChronoDuration::minutes(5));
        assert_eq!(h.push.scheduled_tokens(), vec!["tok-a".to_string()]);

        let listed = h.scheduler.list().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].method, DeliveryMethod::Push);
    }

    #[tokio::test]
    async fn test_unreachable_backend_keeps_exactly_one_local_record() {
        let h = harness(true).await;
        h.push.fail_schedule.store(true, Ordering::SeqCst);

        let result = h
            .scheduler
            .schedule("remind me to call mom in 10 minutes", "10 minutes", 0.9)
            .await
            .unwrap();

        assert!(result.is_degraded());
        assert!(result.message.contains("only on this device"));
        let listed = h.scheduler.list().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].method, DeliveryMethod::LocalOnly);
        assert!(!listed[0].scheduled);
        assert_eq!(listed[0].remote_id, None);
    }

    #[tokio::test]
    async fn test_no_token_degrades_to_local_only() {
        let h = harness(false).await;
        let result = h.scheduler.schedule("drink water", "1 hour", 0.85).await.unwrap();
        assert!(result.is_degraded());
        assert_eq!(result.reminder.method, DeliveryMethod::LocalOnly);
        assert!(h.push.scheduled_tokens().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_time_stores_nothing() {
        let h = harness(true).await;

        let unparseable = h.scheduler.schedule("do it", "someday", 0.9).await;
        assert!(matches!(unparseable, Err(PipelineError::InvalidTime(_))));

        let past = h
            .scheduler
            .schedule("do it", "2020-01-01T00:00:00Z", 0.9)
            .await;
        assert!(matches!(past, Err(PipelineError::InvalidTime(_))));

        let zero = h.scheduler.schedule("do it", "minutes", 0.9).await;
        assert!(matches!(zero, Err(PipelineError::InvalidTime(_))));

        assert!(h.scheduler.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_each_schedule_creates_a_new_record() {
        let h = harness(true).await;
        let a = h.scheduler.schedule("stand up", "5 minutes", 0.9).await.unwrap();
        let b = h.scheduler.schedule("stand up", "5 minutes", 0.9).await.unwrap();
        assert_ne!(a.reminder.id, b.reminder.id);
        assert_eq!(h.scheduler.list().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_cancel_pushed_reminder() {
        let h = harness(true).await;
        let scheduled = h.scheduler.schedule("stand up", "5 minutes", 0.9).await.unwrap();

        let cancelled = h.scheduler.cancel(&scheduled.reminder.id).await.unwrap();
        assert!(cancelled.canceled_remote);
        assert_eq!(h.push.cancel_count(), 1);
        assert!(h.scheduler.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_cancel_local_only_reminder_reports_no_remote() {
        let h = harness(false).await;
        let scheduled = h.scheduler.schedule("stand up", "5 minutes", 0.9).await.unwrap();

        let cancelled = h.scheduler.cancel(&scheduled.reminder.id).await.unwrap();
        assert!(!cancelled.canceled_remote);
        assert_eq!(h.push.cancel_count(), 0);
        assert!(h.scheduler.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_remote_cancel_failure_still_removes_locally() {
        let h = harness(true).await;
        let scheduled = h.scheduler.schedule("stand up", "5 minutes", 0.9).await.unwrap();
        h.push.fail_cancel.store(true, Ordering::SeqCst);

        let cancelled = h.scheduler.cancel(&scheduled.reminder.id).await.unwrap();
        assert!(!cancelled.canceled_remote);
        assert!(cancelled.message.contains("couldn't confirm"));
        assert!(h.scheduler.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_evicted_reminder_cannot_be_cancelled() {
        let h = harness(true).await;
        let scheduled = h.scheduler.schedule("stand up", "5 minutes", 0.9).await.unwrap();

        h.clock.advance(ChronoDuration::minutes(6));
        assert!(h.scheduler.list().await.unwrap().is_empty());

        let result = h.scheduler.cancel(&scheduled.reminder.id).await;
        assert!(matches!(result, Err(PipelineError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_refresh_between_schedules_uses_new_token() {
        let h = harness(true).await;
        let first = h.scheduler.schedule("one", "5 minutes", 0.9).await.unwrap();

        h.tokens.on_refresh("tok-b", start()).await.unwrap();
        let second = h.scheduler.schedule("two", "10 minutes", 0.9).await.unwrap();

        assert_eq!(
            h.push.scheduled_tokens(),
            vec!["tok-a".to_string(), "tok-b".to_string()]
        );
        assert_eq!(second.outcome, SchedulingOutcome::Push);

        // First reminder is untouched by the refresh
        let stored = h.scheduler.status(&first.reminder.id).await.unwrap();
        assert_eq!(stored.reminder, first.reminder);
    }

    #[tokio::test]
    async fn test_refresh_with_registration_down_degrades_next_schedule() {
        let h = harness(true).await;
        h.push.fail_register.store(true, Ordering::SeqCst);
        h.tokens.on_refresh("tok-b", start()).await.unwrap();

        let result = h.scheduler.schedule("two", "10 minutes", 0.9).await.unwrap();
        assert!(result.is_degraded());
        // The stale tok-a is never used after the refresh
        assert!(h.push.scheduled_tokens().is_empty());
    }

    #[tokio::test]
    async fn test_timeout_falls_back_then_reconciles_late_success() {
        let mut h = harness(true).await;
        h.scheduler = h.scheduler.with_push_timeout(Duration::from_millis(50));
        h.push.set_schedule_delay(Some(Duration::from_millis(150)));

        let result = h.scheduler.schedule("slow", "5 minutes", 0.9).await.unwrap();
        assert!(result.is_degraded());
        assert_eq!(result.reminder.method, DeliveryMethod::LocalOnly);

        tokio::time::sleep(Duration::from_millis(300)).await;
        let listed = h.scheduler.list().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].method, DeliveryMethod::Push);
        assert!(listed[0].scheduled);
        assert_eq!(listed[0].remote_id.as_deref(), Some("remote-1"));
    }

    #[tokio::test]
    async fn test_late_success_for_cancelled_reminder_cancels_remote() {
        let mut h = harness(true).await;
        h.scheduler = h.scheduler.with_push_timeout(Duration::from_millis(50));
        h.push.set_schedule_delay(Some(Duration::from_millis(150)));

        let result = h.scheduler.schedule("slow", "5 minutes", 0.9).await.unwrap();
        let cancelled = h.scheduler.cancel(&result.reminder.id).await.unwrap();
        assert!(!cancelled.canceled_remote);

        tokio::time::sleep(Duration::from_millis(300)).await;
        assert_eq!(h.push.cancel_count(), 1);
        assert!(h.scheduler.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_status_reports_remote_state_for_pushed_reminders() {
        let h = harness(true).await;
        let pushed = h.scheduler.schedule("a", "5 minutes", 0.9).await.unwrap();
        let report = h.scheduler.status(&pushed.reminder.id).await.unwrap();
        assert!(report.remote.is_some());
        assert!(report.remote_error.is_none());

        assert!(matches!(
            h.scheduler.status("missing").await,
            Err(PipelineError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_clock_time_already_past_today_rolls_to_tomorrow() {
        let h = harness(false).await;
        let result = h.scheduler.schedule("standup", "2:30 PM", 0.9).await.unwrap();
        assert_eq!(
            result.reminder.time,
            Utc.with_ymd_and_hms(2026, 10, 20, 14, 30, 0).unwrap()
        );
    }

    #[tokio::test]
    async fn test_clock_time_uses_the_clocks_zone() {
        // 15:00 UTC is 11:00 at UTC-4, so 2:30 PM is still ahead today
        let clock = Arc::new(
            FixedClock::new(start()).with_offset(FixedOffset::west_opt(4 * 3600).unwrap()),
        );
        let h = harness_with(Arc::new(MemoryStore::new()), clock, false).await;

        let result = h.scheduler.schedule("standup", "2:30 PM", 0.9).await.unwrap();
        assert_eq!(
            result.reminder.time,
            Utc.with_ymd_and_hms(2026, 10, 19, 18, 30, 0).unwrap()
        );
        assert!(result.message.contains("Oct 19 at 2:30 PM"));
    }

    #[tokio::test]
    async fn test_cancel_racing_late_acceptance_still_cancels_remote() {
        let kv = Arc::new(SlowReads::default());
        let mut h = harness_with(kv.clone(), Arc::new(FixedClock::new(start())), true).await;
        h.scheduler = h.scheduler.with_push_timeout(Duration::from_millis(50));
        h.push.set_schedule_delay(Some(Duration::from_millis(150)));

        let result = h.scheduler.schedule("slow", "5 minutes", 0.9).await.unwrap();
        assert!(result.is_degraded());

        // The late acceptance arrives while cancel is still reading the store
        kv.slow.store(true, Ordering::SeqCst);
        let cancelled = h.scheduler.cancel(&result.reminder.id).await.unwrap();
        assert!(!cancelled.canceled_remote);

        tokio::time::sleep(Duration::from_millis(600)).await;
        assert_eq!(h.push.scheduled_tokens().len(), 1);
        assert_eq!(h.push.cancel_count(), 1);
        kv.slow.store(false, Ordering::SeqCst);
        assert!(h.scheduler.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_cancel_without_cached_token_skips_remote_call() {
        let h = harness(true).await;
        let scheduled = h.scheduler.schedule("stand up", "5 minutes", 0.9).await.unwrap();
        assert_eq!(scheduled.outcome, SchedulingOutcome::Push);

        // Same reminders, but a device session that never obtained a token
        let tokenless = Arc::new(DeliveryTokenManager::new(
            Arc::new(StaticPermissions::new(true)),
            Arc::new(StaticTokenSource::new(None)),
            h.push.clone(),
            Arc::new(MemoryStore::new()),
            "user-1",
            Platform::Android,
        ));
        let scheduler = ReminderScheduler::new(
            h.store.clone(),
            tokenless,
            h.push.clone(),
            h.clock.clone(),
            "user-1",
        );

        let cancelled = scheduler.cancel(&scheduled.reminder.id).await.unwrap();
        assert!(!cancelled.canceled_remote);
        assert_eq!(h.push.cancel_count(), 0);
        assert!(h.store.get(&scheduled.reminder.id).await.unwrap().is_none());
    }
}
