//! In-process record store
//!
//! Records live in a [`DashMap`]; every record carries a numeric revision
//! that is bumped on each write. Compare-and-swap happens under the map's
//! per-entry lock, so `patch` is atomic with respect to other writers.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::error::{StoreError, StoreResult};
use crate::record::{RecordKey, StoredRecord, VersionToken, DEFAULT_PAYLOAD_KEY};
use crate::store::RecordStore;

#[derive(Debug, Clone)]
struct MemoryRecord {
    data: BTreeMap<String, String>,
    revision: u64,
}

/// Record store backed by process memory
///
/// Cloning shares the underlying records.
#[derive(Debug, Clone)]
pub struct MemoryRecordStore {
    payload_key: String,
    records: Arc<DashMap<RecordKey, MemoryRecord>>,
}

impl MemoryRecordStore {
    /// Create empty store reading and writing `payload_key`
    #[inline]
    #[must_use]
    pub fn new(payload_key: impl Into<String>) -> Self {
        Self {
            payload_key: payload_key.into(),
            records: Arc::new(DashMap::new()),
        }
    }

    /// Key of the data field holding the document text
    #[inline]
    #[must_use]
    pub fn payload_key(&self) -> &str {
        &self.payload_key
    }

    /// Create a record holding `text` under the payload key
    ///
    /// # Errors
    /// Returns `StoreError::AlreadyExists` if the key is taken
    pub fn create(&self, key: RecordKey, text: impl Into<String>) -> StoreResult<VersionToken> {
        let mut data = BTreeMap::new();
        data.insert(self.payload_key.clone(), text.into());
        self.create_with_data(key, data)
    }

    /// Create a record with an arbitrary data map
    ///
    /// # Errors
    /// Returns `StoreError::AlreadyExists` if the key is taken
    pub fn create_with_data(
        &self,
        key: RecordKey,
        data: BTreeMap<String, String>,
    ) -> StoreResult<VersionToken> {
        match self.records.entry(key) {
            Entry::Occupied(entry) => Err(StoreError::AlreadyExists(entry.key().clone())),
            Entry::Vacant(entry) => {
                entry.insert(MemoryRecord { data, revision: 1 });
                Ok(VersionToken::from(1))
            }
        }
    }

    /// Unconditionally write the payload, creating the record if needed
    pub fn put(&self, key: RecordKey, text: impl Into<String>) -> VersionToken {
        let mut record = self.records.entry(key).or_insert_with(|| MemoryRecord {
            data: BTreeMap::new(),
            revision: 0,
        });
        record.data.insert(self.payload_key.clone(), text.into());
        record.revision += 1;
        VersionToken::from(record.revision)
    }

    /// Delete a record, returning whether it existed
    pub fn remove(&self, key: &RecordKey) -> bool {
        self.records.remove(key).is_some()
    }

    /// Current payload text, if the record exists
    #[must_use]
    pub fn payload(&self, key: &RecordKey) -> Option<String> {
        self.records
            .get(key)
            .map(|record| record.data.get(&self.payload_key).cloned().unwrap_or_default())
    }

    /// Current revision, if the record exists
    #[must_use]
    pub fn version(&self, key: &RecordKey) -> Option<VersionToken> {
        self.records
            .get(key)
            .map(|record| VersionToken::from(record.revision))
    }

    /// Number of records held
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Check if the store holds no records
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl Default for MemoryRecordStore {
    fn default() -> Self {
        Self::new(DEFAULT_PAYLOAD_KEY)
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn get(&self, key: &RecordKey) -> StoreResult<StoredRecord> {
        let record = self
            .records
            .get(key)
            .ok_or_else(|| StoreError::NotFound(key.clone()))?;

        Ok(StoredRecord {
            text: record.data.get(&self.payload_key).cloned().unwrap_or_default(),
            version: VersionToken::from(record.revision),
        })
    }

    async fn patch(
        &self,
        key: &RecordKey,
        expected: &VersionToken,
        text: String,
    ) -> StoreResult<VersionToken> {
        let mut record = self
            .records
            .get_mut(key)
            .ok_or_else(|| StoreError::NotFound(key.clone()))?;

        let actual = VersionToken::from(record.revision);
        if &actual != expected {
            return Err(StoreError::conflict(key, expected, &actual));
        }

        record.data.insert(self.payload_key.clone(), text);
        record.revision += 1;
        tracing::debug!(record = %key, revision = record.revision, "patched in-memory record");
        Ok(VersionToken::from(record.revision))
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}
