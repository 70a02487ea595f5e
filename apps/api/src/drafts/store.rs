//! Draft Store: the authoritative in-memory collection of drafts plus the
//! active pointer, mirrored to a `StorageMedium`.
//!
//! Every mutation builds the complete next collection, swaps it in, then
//! performs a single write of the whole document. Reads never fail: corrupt
//! or missing persisted state degrades to an empty collection.

use chrono::Utc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::drafts::skills::dedupe_skills_case_insensitive;
use crate::drafts::storage::{StorageEvent, StorageKeys, StorageMedium};
use crate::models::draft::{DraftContent, DraftRecord};

/// Parameters for creating a brand new draft.
#[derive(Debug, Clone, Default)]
pub struct NewDraft {
    pub name: String,
    pub template_id: Option<String>,
    pub owner: Option<String>,
    pub content: DraftContent,
}

pub struct DraftStore {
    medium: Box<dyn StorageMedium>,
    keys: StorageKeys,
    records: Vec<DraftRecord>,
    active_id: Option<String>,
}

impl DraftStore {
    /// Opens a store over `medium`, reading both keys.
    pub fn open(medium: Box<dyn StorageMedium>, keys: StorageKeys) -> Self {
        let mut store = Self {
            medium,
            keys,
            records: Vec::new(),
            active_id: None,
        };
        store.records = store.load();
        store.active_id = store.load_active();
        store.drop_dangling_active();
        info!(
            "Draft store opened with {} drafts (active: {:?})",
            store.records.len(),
            store.active_id
        );
        store
    }

    // ── Reads ───────────────────────────────────────────────────────────────

    pub fn records(&self) -> &[DraftRecord] {
        &self.records
    }

    pub fn get(&self, id: &str) -> Option<&DraftRecord> {
        self.records.iter().find(|r| r.id == id)
    }

    pub fn active_id(&self) -> Option<&str> {
        self.active_id.as_deref()
    }

    pub fn active(&self) -> Option<&DraftRecord> {
        self.active_id.as_deref().and_then(|id| self.get(id))
    }

    // ── Persistence ─────────────────────────────────────────────────────────

    /// Reads and parses the persisted collection. Any failure, including a
    /// non-array document, yields an empty collection.
    pub fn load(&mut self) -> Vec<DraftRecord> {
        let raw = match self.medium.get(&self.keys.drafts) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Vec::new(),
            Err(e) => {
                warn!("Failed to read drafts from {}: {e}", self.keys.drafts);
                return Vec::new();
            }
        };
        match serde_json::from_str::<Vec<DraftRecord>>(&raw) {
            Ok(records) => records,
            Err(e) => {
                warn!("Discarding malformed drafts under {}: {e}", self.keys.drafts);
                Vec::new()
            }
        }
    }

    fn load_active(&mut self) -> Option<String> {
        match self.medium.get(&self.keys.active) {
            Ok(value) => value.filter(|id| !id.is_empty()),
            Err(e) => {
                warn!("Failed to read active draft id from {}: {e}", self.keys.active);
                None
            }
        }
    }

    /// Swaps in `records` and writes the whole collection. Write failures
    /// are logged, never returned.
    pub fn persist(&mut self, records: Vec<DraftRecord>) {
        self.records = records;
        let payload = match serde_json::to_string(&self.records) {
            Ok(payload) => payload,
            Err(e) => {
                warn!("Failed to serialize drafts: {e}");
                return;
            }
        };
        if let Err(e) = self.medium.set(&self.keys.drafts, &payload) {
            warn!("Failed to persist drafts to {}: {e}", self.keys.drafts);
        }
    }

    fn persist_active(&mut self) {
        let result = match self.active_id.as_deref() {
            Some(id) => self.medium.set(&self.keys.active, id),
            None => self.medium.remove(&self.keys.active),
        };
        if let Err(e) = result {
            warn!("Failed to persist active draft id to {}: {e}", self.keys.active);
        }
    }

    fn drop_dangling_active(&mut self) {
        if let Some(id) = self.active_id.as_deref() {
            if self.get(id).is_none() {
                debug!("Active draft {id} not in collection, clearing pointer");
                self.active_id = None;
            }
        }
    }

    // ── Mutations ───────────────────────────────────────────────────────────

    /// Points the active marker at `id`, or clears it with `None`.
    /// Returns false (and changes nothing) for an unknown id.
    pub fn set_active(&mut self, id: Option<&str>) -> bool {
        if let Some(id) = id {
            if self.get(id).is_none() {
                return false;
            }
        }
        self.active_id = id.map(str::to_string);
        self.persist_active();
        true
    }

    /// Applies a pure transformation to one draft's content and persists the
    /// collection. No-op returning false when `id` is unknown.
    pub fn update_content<F>(&mut self, id: &str, updater: F) -> bool
    where
        F: FnOnce(DraftContent) -> DraftContent,
    {
        self.update_record(id, |mut record| {
            record.content = updater(record.content);
            record
        })
    }

    /// Replaces one whole record with `updater(record)`. The id is pinned.
    pub fn update_record<F>(&mut self, id: &str, updater: F) -> bool
    where
        F: FnOnce(DraftRecord) -> DraftRecord,
    {
        let Some(index) = self.records.iter().position(|r| r.id == id) else {
            return false;
        };
        let mut next = self.records.clone();
        let mut updated = updater(next[index].clone());
        updated.id = next[index].id.clone();
        next[index] = updated;
        self.persist(next);
        true
    }

    /// Direct user edit of a draft's content. Skills are de-duplicated.
    pub fn replace_content(&mut self, id: &str, mut content: DraftContent) -> bool {
        if let Some(skills) = content.skills.take() {
            content.skills = Some(dedupe_skills_case_insensitive(&skills));
        }
        self.update_content(id, |_| content)
    }

    pub fn rename(&mut self, id: &str, name: &str) -> bool {
        let name = name.trim();
        if name.is_empty() {
            return false;
        }
        self.update_record(id, |mut record| {
            record.name = name.to_string();
            record
        })
    }

    /// Creates a draft at the front of the collection. It becomes active only
    /// when nothing else is.
    pub fn create_draft(&mut self, new: NewDraft) -> DraftRecord {
        let NewDraft {
            name,
            template_id,
            owner,
            mut content,
        } = new;
        if let Some(skills) = content.skills.take() {
            content.skills = Some(dedupe_skills_case_insensitive(&skills));
        }
        let record = DraftRecord {
            id: Uuid::new_v4().to_string(),
            name,
            template_id,
            created_at: Utc::now(),
            owner,
            source_version_id: None,
            last_applied_job_id: None,
            content,
        };
        self.insert_front(record.clone());
        if self.active_id.is_none() {
            self.active_id = Some(record.id.clone());
            self.persist_active();
        }
        info!("Created draft {} ({})", record.id, record.name);
        record
    }

    /// Inserts `record` at the front unless its id is already present.
    pub(crate) fn insert_front(&mut self, record: DraftRecord) -> bool {
        if self.get(&record.id).is_some() {
            return false;
        }
        let mut next = Vec::with_capacity(self.records.len() + 1);
        next.push(record);
        next.extend(self.records.iter().cloned());
        self.persist(next);
        true
    }

    /// Removes a draft and hands it back so the caller can keep it for undo.
    /// Deleting the active draft moves the pointer to the first remaining
    /// draft, or clears it.
    pub fn delete_draft(&mut self, id: &str) -> Option<DraftRecord> {
        let index = self.records.iter().position(|r| r.id == id)?;
        let mut next = self.records.clone();
        let removed = next.remove(index);
        self.persist(next);

        if self.active_id.as_deref() == Some(id) {
            self.active_id = self.records.first().map(|r| r.id.clone());
            self.persist_active();
        }
        info!("Deleted draft {id} (active now: {:?})", self.active_id);
        Some(removed)
    }

    /// Re-inserts a previously deleted record verbatim at the front. A record
    /// whose id is already present is ignored. The active pointer is left
    /// alone.
    pub fn restore_draft(&mut self, record: DraftRecord) -> bool {
        let id = record.id.clone();
        let restored = self.insert_front(record);
        if restored {
            info!("Restored draft {id}");
        } else {
            debug!("Restore of draft {id} skipped, id already present");
        }
        restored
    }

    // ── Cross-context sync ──────────────────────────────────────────────────

    /// Re-reads both keys from the medium. Used when individual change
    /// notifications may have been missed.
    pub fn reload_all(&mut self) {
        self.records = self.load();
        self.active_id = self.load_active();
        self.drop_dangling_active();
        debug!(
            "Reloaded {} drafts from medium (active: {:?})",
            self.records.len(),
            self.active_id
        );
    }

    /// Refreshes the in-memory view after another context wrote one of this
    /// store's keys. The external write fully replaces the local view.
    /// Returns true when state was reloaded.
    pub fn on_storage_event(&mut self, event: &StorageEvent) -> bool {
        if event.origin == self.medium.origin() {
            return false;
        }
        if event.key == self.keys.drafts {
            self.records = self.load();
        } else if event.key == self.keys.active {
            self.active_id = self.load_active();
        } else {
            return false;
        }
        self.drop_dangling_active();
        debug!("Refreshed drafts after external write to {}", event.key);
        true
    }
}
