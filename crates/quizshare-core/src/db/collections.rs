//! Whole-document quiz collections kept in the record store
//!
//! Every mutation reads the full array, changes it, and writes it back.
//! Collections are stored newest-first and capped; the tail is dropped first.

use super::{RecordKey, RecordStore, SqliteRecordStore};
use crate::error::Result;
use crate::models::{QuizId, QuizRecord};

/// Maximum number of records kept per collection.
pub const MAX_COLLECTION_LEN: usize = 100;

/// Typed access to the community cache and the offline cache.
#[derive(Clone)]
pub struct QuizCollections {
    store: SqliteRecordStore,
    capacity: usize,
}

impl QuizCollections {
    pub const fn new(store: SqliteRecordStore) -> Self {
        Self {
            store,
            capacity: MAX_COLLECTION_LEN,
        }
    }

    /// Override the retention bound
    #[must_use]
    pub const fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    pub const fn store(&self) -> &SqliteRecordStore {
        &self.store
    }

    /// Load a collection; a missing document is an empty collection.
    pub fn load(&self, key: RecordKey) -> Result<Vec<QuizRecord>> {
        Ok(self.store.load_json(key)?.unwrap_or_default())
    }

    pub fn save(&self, key: RecordKey, records: &[QuizRecord]) -> Result<()> {
        self.store.save_json(key, records)
    }

    /// Insert at the front, dropping the oldest records beyond capacity.
    ///
    /// Returns the collection as written.
    pub fn insert_capped(&self, key: RecordKey, record: QuizRecord) -> Result<Vec<QuizRecord>> {
        let mut records = self.load(key)?;
        records.insert(0, record);
        self.truncate(&mut records);
        self.save(key, &records)?;
        Ok(records)
    }

    /// Save a quiz in the offline cache.
    ///
    /// A record sharing the same `originalId` (or the same `id` when it has no
    /// `originalId`) is replaced and moved to the front.
    pub fn upsert_offline(&self, record: QuizRecord) -> Result<()> {
        let key = RecordKey::OfflineSharedQuizzes;
        let mut records = self.load(key)?;
        records.retain(|existing| !same_source(existing, &record));
        records.insert(0, record);
        self.truncate(&mut records);
        self.save(key, &records)
    }

    /// Find a quiz in the offline cache by id.
    pub fn find_offline(&self, id: &QuizId) -> Result<Option<QuizRecord>> {
        Ok(self
            .load(RecordKey::OfflineSharedQuizzes)?
            .into_iter()
            .find(|record| &record.id == id))
    }

    /// Apply `update` to the record with `id`; returns the updated collection
    /// and the updated record, or `None` when no record matched.
    pub fn update_record(
        &self,
        key: RecordKey,
        id: &QuizId,
        update: impl FnOnce(&mut QuizRecord),
    ) -> Result<Option<(Vec<QuizRecord>, QuizRecord)>> {
        let mut records = self.load(key)?;
        let Some(record) = records.iter_mut().find(|record| &record.id == id) else {
            return Ok(None);
        };
        update(record);
        let updated = record.clone();
        self.save(key, &records)?;
        Ok(Some((records, updated)))
    }

    fn truncate(&self, records: &mut Vec<QuizRecord>) {
        if records.len() > self.capacity {
            let dropped = records.len() - self.capacity;
            records.truncate(self.capacity);
            tracing::debug!("Dropped {dropped} oldest record(s) beyond retention bound");
        }
    }
}

fn same_source(existing: &QuizRecord, incoming: &QuizRecord) -> bool {
    match (&existing.original_id, &incoming.original_id) {
        (Some(left), Some(right)) => left == right,
        _ => existing.id == incoming.id,
    }
}
