//! crates/math_mentor_core/src/store.rs
//!
//! The record store: the error log, the study-plan task list and the
//! availability text, plus their persistence through a `StorageService`.
//!
//! Every mutating method writes the affected value back to storage before
//! returning. Persistence is best-effort: a failed write is logged and the
//! in-memory change stands. Nothing is written at load time, so an empty
//! first session never clobbers saved state.

use crate::analytics::Analytics;
use crate::domain::{DailyTask, ErrorRecord, RecordDraft};
use crate::ports::{PortError, PortResult, StorageService};
use crate::sanitize::{
    sanitize_record, sanitize_stored_record, sanitize_task, RawRecord, RawTask, StoredRecord,
};
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

pub const RECORDS_KEY: &str = "math_errors";
pub const PLAN_KEY: &str = "math_study_plan";
pub const AVAILABILITY_KEY: &str = "math_schedule_input";

pub const DEFAULT_AVAILABILITY: &str = "Học trên lớp từ 7h đến 11h, chiều học thêm lúc 14h-16h.";

pub struct RecordStore {
    storage: Arc<dyn StorageService>,
    records: Vec<ErrorRecord>,
    tasks: Vec<DailyTask>,
    availability: String,
    /// Bumped on every record mutation.
    version: u64,
    analytics: Option<(u64, Arc<Analytics>)>,
}

impl RecordStore {
    /// An empty store that has not read anything from `storage`.
    pub fn new(storage: Arc<dyn StorageService>) -> Self {
        Self {
            storage,
            records: Vec::new(),
            tasks: Vec::new(),
            availability: DEFAULT_AVAILABILITY.to_string(),
            version: 0,
            analytics: None,
        }
    }

    /// Reads all three keys once. Unreadable or malformed values fall back to
    /// their defaults; stored records are sanitized on the way in.
    pub async fn load(storage: Arc<dyn StorageService>) -> Self {
        let mut store = Self::new(storage);
        let now = Utc::now();

        if let Some(items) = store.load_array(RECORDS_KEY).await {
            store.records = items
                .into_iter()
                .filter(Value::is_object)
                .filter_map(|item| serde_json::from_value::<StoredRecord>(item).ok())
                .map(|raw| sanitize_stored_record(raw, now))
                .collect();
        }
        if let Some(items) = store.load_array(PLAN_KEY).await {
            store.tasks = items
                .into_iter()
                .filter(Value::is_object)
                .filter_map(|item| serde_json::from_value::<RawTask>(item).ok())
                .filter_map(sanitize_task)
                .collect();
        }
        match store.storage.load_item(AVAILABILITY_KEY).await {
            Ok(Some(text)) => store.availability = text,
            Ok(None) => {}
            Err(e) => warn!("Failed to load availability text: {}", e),
        }

        info!(
            "Loaded {} records and {} tasks from storage.",
            store.records.len(),
            store.tasks.len()
        );
        store
    }

    async fn load_array(&self, key: &str) -> Option<Vec<Value>> {
        let text = match self.storage.load_item(key).await {
            Ok(Some(text)) => text,
            Ok(None) => return None,
            Err(e) => {
                warn!("Failed to load '{}': {}", key, e);
                return None;
            }
        };
        match serde_json::from_str::<Value>(&text) {
            Ok(Value::Array(items)) => Some(items),
            Ok(_) => {
                warn!("Stored value for '{}' is not a list; ignoring it.", key);
                None
            }
            Err(e) => {
                warn!("Stored value for '{}' is not valid JSON: {}", key, e);
                None
            }
        }
    }

    //=====================================================================================
    // Reads
    //=====================================================================================

    /// Records in display order (newest insertions first).
    pub fn records(&self) -> &[ErrorRecord] {
        &self.records
    }

    pub fn record(&self, id: Uuid) -> Option<&ErrorRecord> {
        self.records.iter().find(|r| r.id == id)
    }

    pub fn tasks(&self) -> &[DailyTask] {
        &self.tasks
    }

    pub fn availability(&self) -> &str {
        &self.availability
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    /// Derived statistics, recomputed only when the record list changed.
    pub fn analytics(&mut self) -> Arc<Analytics> {
        if let Some((version, analytics)) = &self.analytics {
            if *version == self.version {
                return analytics.clone();
            }
        }
        debug!("Recomputing analytics for store version {}.", self.version);
        let analytics = Arc::new(Analytics::compute(&self.records));
        self.analytics = Some((self.version, analytics.clone()));
        analytics
    }

    //=====================================================================================
    // Record Mutations
    //=====================================================================================

    /// Puts `records` in front of the existing ones, keeping their order.
    pub async fn prepend_records(&mut self, records: Vec<ErrorRecord>) {
        if records.is_empty() {
            return;
        }
        let mut combined = records;
        combined.append(&mut self.records);
        self.records = combined;
        self.records_changed().await;
    }

    /// Sanitizes a manual entry and adds it at the front.
    pub async fn add_manual_record(&mut self, raw: RawRecord, now: DateTime<Utc>) -> ErrorRecord {
        let record = sanitize_record(raw).into_record(now, None);
        self.prepend_records(vec![record.clone()]).await;
        record
    }

    /// Applies the provided fields to an existing record and re-sanitizes it.
    pub async fn update_record(&mut self, id: Uuid, patch: RawRecord) -> PortResult<ErrorRecord> {
        let record = self
            .records
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| PortError::NotFound(format!("Record {} not found", id)))?;

        let mut raw = RawRecord::from(&RecordDraft::from(&*record));
        raw.overlay(patch);
        let draft = sanitize_record(raw);
        record.source = draft.source;
        record.question = draft.question;
        record.difficulty = draft.difficulty;
        record.error_type = draft.error_type;
        record.sub_type = draft.sub_type;
        record.part = draft.part;
        record.topics = draft.topics;
        record.remedy = draft.remedy;
        let updated = record.clone();

        self.records_changed().await;
        Ok(updated)
    }

    pub async fn delete_record(&mut self, id: Uuid) -> PortResult<()> {
        let before = self.records.len();
        self.records.retain(|r| r.id != id);
        if self.records.len() == before {
            return Err(PortError::NotFound(format!("Record {} not found", id)));
        }
        self.records_changed().await;
        Ok(())
    }

    async fn records_changed(&mut self) {
        self.version += 1;
        self.persist(RECORDS_KEY, serde_json::to_string(&self.records)).await;
    }

    //=====================================================================================
    // Plan Mutations
    //=====================================================================================

    /// Replaces the whole task list; tasks are never edited one by one
    /// except for their completion flag.
    pub async fn replace_tasks(&mut self, tasks: Vec<DailyTask>) {
        self.tasks = tasks;
        self.persist(PLAN_KEY, serde_json::to_string(&self.tasks)).await;
    }

    pub async fn toggle_task(&mut self, index: usize) -> PortResult<DailyTask> {
        let task = self
            .tasks
            .get_mut(index)
            .ok_or_else(|| PortError::NotFound(format!("Task {} not found", index)))?;
        task.completed = !task.completed;
        let toggled = task.clone();
        self.persist(PLAN_KEY, serde_json::to_string(&self.tasks)).await;
        Ok(toggled)
    }

    pub async fn set_availability(&mut self, text: String) {
        self.availability = text;
        let value = self.availability.clone();
        self.persist(AVAILABILITY_KEY, Ok(value)).await;
    }

    async fn persist(&self, key: &str, value: serde_json::Result<String>) {
        let result = match value {
            Ok(text) => self.storage.save_item(key, &text).await,
            Err(e) => Err(PortError::Unexpected(e.to_string())),
        };
        if let Err(e) = result {
            warn!("Failed to persist '{}': {}", key, e);
        }
    }
}
