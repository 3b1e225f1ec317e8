//! Record store capability consumed by the request handlers

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::StoreResult;
use crate::record::{RecordKey, StoredRecord, VersionToken};

/// Versioned key-value record store
///
/// # Contract
/// - `get` returns the payload text and the revision it was read at.
/// - `patch` must be version-checked: it replaces the payload only if the
///   stored revision still equals `expected`, and otherwise fails with
///   `StoreError::Conflict` without writing. Handlers rely on this for
///   correctness under concurrent writers.
#[async_trait]
pub trait RecordStore: Send + Sync + std::fmt::Debug {
    /// Read the current payload and revision
    ///
    /// # Errors
    /// - `StoreError::NotFound` if no record exists under `key`
    /// - `StoreError::Transport` / `StoreError::Io` if the store is unreachable
    async fn get(&self, key: &RecordKey) -> StoreResult<StoredRecord>;

    /// Replace the payload if the record is still at `expected`
    ///
    /// # Returns
    /// Revision of the newly written payload
    ///
    /// # Errors
    /// - `StoreError::Conflict` if the record moved past `expected`
    /// - `StoreError::NotFound` if the record was removed
    /// - `StoreError::Transport` / `StoreError::Io` if the store is unreachable
    async fn patch(
        &self,
        key: &RecordKey,
        expected: &VersionToken,
        text: String,
    ) -> StoreResult<VersionToken>;

    /// Short backend name for logs
    fn backend(&self) -> &'static str;
}

#[async_trait]
impl<S: RecordStore + ?Sized> RecordStore for Arc<S> {
    async fn get(&self, key: &RecordKey) -> StoreResult<StoredRecord> {
        (**self).get(key).await
    }

    async fn patch(
        &self,
        key: &RecordKey,
        expected: &VersionToken,
        text: String,
    ) -> StoreResult<VersionToken> {
        (**self).patch(key, expected, text).await
    }

    fn backend(&self) -> &'static str {
        (**self).backend()
    }
}
