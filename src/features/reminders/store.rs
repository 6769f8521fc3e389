//! Local reminder store
//!
//! Keeps every reminder record as one JSON collection under
//! [`keys::REMINDERS`]. Each operation loads, mutates and writes back the
//! whole collection while holding a single async mutex, so concurrent callers
//! never lose each other's writes.
//!
//! - **Version**: 1.1.0
//! - **Since**: 0.1.0
//!
//! ## Changelog
//! - 1.1.0: Conditional updates for late push reconciliation
//! - 1.0.0: Initial release with lazy eviction on list

use chrono::{DateTime, Utc};
use log::{debug, info};
use std::sync::Arc;
use tokio::sync::Mutex;

use super::model::{ReminderPatch, ReminderRecord};
use crate::core::{PipelineError, PipelineResult};
use crate::storage::{keys, KeyValueStore};

pub struct ReminderStore {
    kv: Arc<dyn KeyValueStore>,
    write_lock: Mutex<()>,
}

impl ReminderStore {
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self {
            kv,
            write_lock: Mutex::new(()),
        }
    }

    /// Time-derived id, unique within the collection
    fn generate_id(created: DateTime<Utc>, existing: &[ReminderRecord]) -> String {
        loop {
            let suffix = uuid::Uuid::new_v4().simple().to_string();
            let id = format!("rem_{}_{}", created.timestamp_millis(), &suffix[..8]);
            if !existing.iter().any(|r| r.id == id) {
                return id;
            }
        }
    }

    async fn load(&self) -> PipelineResult<Vec<ReminderRecord>> {
        let raw = self
            .kv
            .get(keys::REMINDERS)
            .await
            .map_err(|e| PipelineError::storage(format!("failed to read reminders: {e}")))?;

        match raw {
            None => Ok(Vec::new()),
            Some(json) => serde_json::from_str(&json)
                .map_err(|e| PipelineError::storage(format!("reminder collection is corrupt: {e}"))),
        }
    }

    async fn persist(&self, records: &[ReminderRecord]) -> PipelineResult<()> {
        let json = serde_json::to_string(records)
            .map_err(|e| PipelineError::storage(format!("failed to encode reminders: {e}")))?;
        self.kv
            .set(keys::REMINDERS, &json)
            .await
            .map_err(|e| PipelineError::storage(format!("failed to write reminders: {e}")))
    }

    /// All live reminders in insertion order.
    ///
    /// Records whose time is at or before `now` are evicted from storage first;
    /// they cannot be retrieved afterwards.
    pub async fn list(&self, now: DateTime<Utc>) -> PipelineResult<Vec<ReminderRecord>> {
        let _guard = self.write_lock.lock().await;
        let mut records = self.load().await?;

        let before = records.len();
        records.retain(|r| !r.is_expired(now));
        let evicted = before - records.len();

        if evicted > 0 {
            self.persist(&records).await?;
            info!("Evicted {evicted} expired reminder(s)");
        }

        Ok(records)
    }

    /// Raw lookup, no eviction
    pub async fn get(&self, id: &str) -> PipelineResult<Option<ReminderRecord>> {
        let _guard = self.write_lock.lock().await;
        let records = self.load().await?;
        Ok(records.into_iter().find(|r| r.id == id))
    }

    /// Append a new record, assigning an id when it has none
    pub async fn save(&self, mut record: ReminderRecord) -> PipelineResult<ReminderRecord> {
        let _guard = self.write_lock.lock().await;
        let mut records = self.load().await?;

        if record.id.is_empty() {
            record.id = Self::generate_id(record.created, &records);
        } else if records.iter().any(|r| r.id == record.id) {
            return Err(PipelineError::storage(format!(
                "reminder {} already exists",
                record.id
            )));
        }

        records.push(record.clone());
        self.persist(&records).await?;
        debug!("Saved reminder {} for {}", record.id, record.time);
        Ok(record)
    }

    pub async fn update(&self, id: &str, patch: ReminderPatch) -> PipelineResult<ReminderRecord> {
        self.update_if(id, |_| true, patch)
            .await?
            .ok_or_else(|| PipelineError::not_found(id))
    }

    /// Apply `patch` only when `condition` holds for the stored record.
    ///
    /// Returns `NotFound` for unknown ids and `Ok(None)` when the condition
    /// rejected the update.
    pub async fn update_if<F>(
        &self,
        id: &str,
        condition: F,
        patch: ReminderPatch,
    ) -> PipelineResult<Option<ReminderRecord>>
    where
        F: FnOnce(&ReminderRecord) -> bool,
    {
        let _guard = self.write_lock.lock().await;
        let mut records = self.load().await?;

        let record = records
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| PipelineError::not_found(id))?;

        if !condition(record) {
            return Ok(None);
        }

        patch.apply_to(record)?;
        let updated = record.clone();
        self.persist(&records).await?;
        Ok(Some(updated))
    }

    /// Delete a record, returning what was removed
    pub async fn remove(&self, id: &str) -> PipelineResult<ReminderRecord> {
        let _guard = self.write_lock.lock().await;
        let mut records = self.load().await?;

        let position = records
            .iter()
            .position(|r| r.id == id)
            .ok_or_else(|| PipelineError::not_found(id))?;

        let removed = records.remove(position);
        self.persist(&records).await?;
        debug!("Removed reminder {id}");
        Ok(removed)
    }
}
