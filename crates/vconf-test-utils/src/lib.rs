//! Testing utilities for vconf workspace
//!
//! Shared fixtures, seeded stores, and store doubles.

#![allow(missing_docs)]

use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};

use async_trait::async_trait;
use rand::Rng;
use serde_json::{json, Value};
use vconf_document::{parse, to_yaml, SectionKind, VectorConfig};
use vconf_store::{
    MemoryRecordStore, RecordKey, RecordStore, StoreError, StoreResult, StoredRecord,
    VersionToken,
};

/// Reference pipeline document as an operator would store it
pub const VECTOR_DOCUMENT: &str = r#"
data_dir: /vector-data-dir
sinks:
    k8s_logs_sink:
        compression: none
        encoding:
            codec: json
        inputs:
            - filter_k8s_logs
        path: /tmp/vector-demo-logs-1-%Y-%m-%d.log
        type: file
    vector_agent_sink:
        address: http://vector-agent:9000
        inputs:
            - internal_log_source
        type: vector
transforms:
    filter_k8s_logs:
        condition: contains(string(.message) ?? "", "no_tag") != true
        inputs:
            - k8s_logs_source
        type: filter
sources:
    internal_log_source:
        type: internal_logs
    k8s_logs_source:
        extra_field_selector: metadata.name==load-test-pod
        type: kubernetes_logs
"#;

const ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz";

pub fn vector_document() -> VectorConfig {
    parse(VECTOR_DOCUMENT).unwrap()
}

pub fn random_name(len: usize) -> String {
    let mut rng = rand::rng();
    (0..len)
        .map(|_| ALPHABET[rng.random_range(0..ALPHABET.len())] as char)
        .collect()
}

pub fn random_key() -> RecordKey {
    RecordKey::new(random_name(4), random_name(8))
}

/// Filter transform reading from `input`
pub fn filter_transform(condition: &str, input: &str) -> Value {
    json!({
        "condition": condition,
        "inputs": [input],
        "type": "filter",
    })
}

/// Memory store holding [`VECTOR_DOCUMENT`] under a random key
pub fn seeded_store() -> (MemoryRecordStore, RecordKey) {
    let store = MemoryRecordStore::default();
    let key = random_key();
    store.create(key.clone(), VECTOR_DOCUMENT).unwrap();
    (store, key)
}

/// Memory store that lets a rival writer commit before each of the first
/// `races` patches, so those patches hit a version conflict.
///
/// The rival adds `sources.rival_<n>` so tests can check that retried
/// updates build on the rival's write.
#[derive(Debug)]
pub struct RacingStore {
    inner: MemoryRecordStore,
    races_left: AtomicU32,
    patches: AtomicUsize,
}

impl RacingStore {
    pub fn new(inner: MemoryRecordStore, races: u32) -> Self {
        Self {
            inner,
            races_left: AtomicU32::new(races),
            patches: AtomicUsize::new(0),
        }
    }

    pub fn inner(&self) -> &MemoryRecordStore {
        &self.inner
    }

    /// Patch attempts seen, including the ones that conflicted
    pub fn patch_attempts(&self) -> usize {
        self.patches.load(Ordering::SeqCst)
    }

    fn rival_write(&self, key: &RecordKey, round: u32) {
        let current = self.inner.payload(key).unwrap_or_default();
        let doc = parse(&current)
            .unwrap()
            .with_entry(SectionKind::Sources, format!("rival_{round}"), json!({"type": "stdin"}));
        self.inner.put(key.clone(), to_yaml(&doc).unwrap());
    }
}

#[async_trait]
impl RecordStore for RacingStore {
    async fn get(&self, key: &RecordKey) -> StoreResult<StoredRecord> {
        self.inner.get(key).await
    }

    async fn patch(
        &self,
        key: &RecordKey,
        expected: &VersionToken,
        text: String,
    ) -> StoreResult<VersionToken> {
        self.patches.fetch_add(1, Ordering::SeqCst);
        let left = self.races_left.load(Ordering::SeqCst);
        if left > 0 {
            self.races_left.store(left - 1, Ordering::SeqCst);
            self.rival_write(key, left);
        }
        self.inner.patch(key, expected, text).await
    }

    fn backend(&self) -> &'static str {
        "racing"
    }
}

/// Store whose calls never complete
#[derive(Debug, Default)]
pub struct StallingStore;

#[async_trait]
impl RecordStore for StallingStore {
    async fn get(&self, _key: &RecordKey) -> StoreResult<StoredRecord> {
        futures::future::pending().await
    }

    async fn patch(
        &self,
        _key: &RecordKey,
        _expected: &VersionToken,
        _text: String,
    ) -> StoreResult<VersionToken> {
        futures::future::pending().await
    }

    fn backend(&self) -> &'static str {
        "stalling"
    }
}

/// Store that is always unreachable
#[derive(Debug, Default)]
pub struct UnreachableStore;

#[async_trait]
impl RecordStore for UnreachableStore {
    async fn get(&self, _key: &RecordKey) -> StoreResult<StoredRecord> {
        Err(StoreError::Transport("connection refused".to_string()))
    }

    async fn patch(
        &self,
        _key: &RecordKey,
        _expected: &VersionToken,
        _text: String,
    ) -> StoreResult<VersionToken> {
        Err(StoreError::Transport("connection refused".to_string()))
    }

    fn backend(&self) -> &'static str {
        "unreachable"
    }
}
