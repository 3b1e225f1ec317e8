//! File-backed record store
//!
//! Each record is a YAML manifest at `<root>/<namespace>/<name>.yaml`:
//!
//! ```yaml
//! namespace: logging
//! name: vector-config
//! resourceVersion: 3
//! data:
//!   vector.yaml: |
//!     sources: ...
//! ```
//!
//! Writes hold an exclusive advisory lock on a sidecar `.<name>.lock` file,
//! re-check the revision under the lock, then replace the manifest through a
//! temp file and rename. Readers never lock; rename keeps them consistent.

use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write as _};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{StoreError, StoreResult};
use crate::record::{RecordKey, StoredRecord, VersionToken, DEFAULT_PAYLOAD_KEY};
use crate::store::RecordStore;

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RecordManifest {
    #[serde(default)]
    namespace: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    resource_version: u64,
    #[serde(default)]
    data: BTreeMap<String, String>,
}

struct RecordPaths {
    manifest: PathBuf,
    temp: PathBuf,
    lock: PathBuf,
    dir: PathBuf,
}

impl RecordPaths {
    fn new(root: &Path, key: &RecordKey) -> StoreResult<Self> {
        check_segment(key, &key.namespace)?;
        check_segment(key, &key.name)?;

        let dir = root.join(&key.namespace);
        Ok(Self {
            manifest: dir.join(format!("{}.yaml", key.name)),
            temp: dir.join(format!(".{}.yaml.tmp", key.name)),
            lock: dir.join(format!(".{}.lock", key.name)),
            dir,
        })
    }
}

/// Namespaces and names map to path segments; keep them inert
fn check_segment(key: &RecordKey, segment: &str) -> StoreResult<()> {
    let reason = if segment.is_empty() {
        Some("empty segment")
    } else if segment.starts_with('.') {
        Some("segment may not start with '.'")
    } else if !segment
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
    {
        Some("only ASCII letters, digits, '-', '_' and '.' are allowed")
    } else {
        None
    };

    match reason {
        Some(reason) => Err(StoreError::InvalidKey {
            key: key.clone(),
            reason: reason.to_string(),
        }),
        None => Ok(()),
    }
}

/// Record store persisting one YAML manifest per record
#[derive(Debug, Clone)]
pub struct FileRecordStore {
    root: PathBuf,
    payload_key: String,
}

impl FileRecordStore {
    /// Open a store rooted at `root`, creating the directory if needed
    ///
    /// # Errors
    /// Returns `StoreError::Io` if the root cannot be created
    pub fn open(root: impl Into<PathBuf>, payload_key: impl Into<String>) -> StoreResult<Self> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|e| StoreError::io_error(&root, e))?;
        Ok(Self {
            root,
            payload_key: payload_key.into(),
        })
    }

    /// Open a store using the default payload key
    ///
    /// # Errors
    /// Returns `StoreError::Io` if the root cannot be created
    pub fn open_default(root: impl Into<PathBuf>) -> StoreResult<Self> {
        Self::open(root, DEFAULT_PAYLOAD_KEY)
    }

    /// Store root directory
    #[inline]
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
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
    /// - `StoreError::AlreadyExists` if the record exists
    /// - `StoreError::InvalidKey` if the key cannot be mapped to a path
    /// - `StoreError::Io` on filesystem failure
    pub async fn create(&self, key: RecordKey, text: impl Into<String>) -> StoreResult<VersionToken> {
        let root = self.root.clone();
        let payload_key = self.payload_key.clone();
        let text = text.into();

        tokio::task::spawn_blocking(move || create_blocking(&root, &key, payload_key, text))
            .await
            .map_err(|e| StoreError::Transport(format!("file store worker failed: {e}")))?
    }
}

#[async_trait]
impl RecordStore for FileRecordStore {
    async fn get(&self, key: &RecordKey) -> StoreResult<StoredRecord> {
        let paths = RecordPaths::new(&self.root, key)?;

        let raw = match tokio::fs::read_to_string(&paths.manifest).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(StoreError::NotFound(key.clone()))
            }
            Err(e) => return Err(StoreError::io_error(&paths.manifest, e)),
        };

        let manifest = decode_manifest(key, &raw)?;
        Ok(StoredRecord {
            text: manifest.data.get(&self.payload_key).cloned().unwrap_or_default(),
            version: VersionToken::from(manifest.resource_version),
        })
    }

    async fn patch(
        &self,
        key: &RecordKey,
        expected: &VersionToken,
        text: String,
    ) -> StoreResult<VersionToken> {
        let root = self.root.clone();
        let payload_key = self.payload_key.clone();
        let key = key.clone();
        let expected = expected.clone();

        tokio::task::spawn_blocking(move || patch_blocking(&root, &key, &expected, payload_key, text))
            .await
            .map_err(|e| StoreError::Transport(format!("file store worker failed: {e}")))?
    }

    fn backend(&self) -> &'static str {
        "file"
    }
}

fn patch_blocking(
    root: &Path,
    key: &RecordKey,
    expected: &VersionToken,
    payload_key: String,
    text: String,
) -> StoreResult<VersionToken> {
    let paths = RecordPaths::new(root, key)?;
    if !paths.manifest.exists() {
        return Err(StoreError::NotFound(key.clone()));
    }

    let mut lock = fd_lock::RwLock::new(open_lock_file(&paths.lock)?);
    let _guard = lock
        .write()
        .map_err(|e| StoreError::io_error(&paths.lock, e))?;

    let raw = match fs::read_to_string(&paths.manifest) {
        Ok(raw) => raw,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Err(StoreError::NotFound(key.clone())),
        Err(e) => return Err(StoreError::io_error(&paths.manifest, e)),
    };
    let mut manifest = decode_manifest(key, &raw)?;

    let actual = VersionToken::from(manifest.resource_version);
    if &actual != expected {
        return Err(StoreError::conflict(key, expected, &actual));
    }

    manifest.resource_version += 1;
    manifest.data.insert(payload_key, text);
    write_manifest(&paths, key, &manifest)?;

    tracing::debug!(record = %key, revision = manifest.resource_version, "patched record file");
    Ok(VersionToken::from(manifest.resource_version))
}

fn create_blocking(
    root: &Path,
    key: &RecordKey,
    payload_key: String,
    text: String,
) -> StoreResult<VersionToken> {
    let paths = RecordPaths::new(root, key)?;
    fs::create_dir_all(&paths.dir).map_err(|e| StoreError::io_error(&paths.dir, e))?;

    let mut lock = fd_lock::RwLock::new(open_lock_file(&paths.lock)?);
    let _guard = lock
        .write()
        .map_err(|e| StoreError::io_error(&paths.lock, e))?;

    if paths.manifest.exists() {
        return Err(StoreError::AlreadyExists(key.clone()));
    }

    let mut data = BTreeMap::new();
    data.insert(payload_key, text);
    let manifest = RecordManifest {
        namespace: key.namespace.clone(),
        name: key.name.clone(),
        resource_version: 1,
        data,
    };
    write_manifest(&paths, key, &manifest)?;
    Ok(VersionToken::from(manifest.resource_version))
}

fn open_lock_file(path: &Path) -> StoreResult<File> {
    OpenOptions::new()
        .create(true)
        .truncate(false)
        .write(true)
        .open(path)
        .map_err(|e| StoreError::io_error(path, e))
}

fn decode_manifest(key: &RecordKey, raw: &str) -> StoreResult<RecordManifest> {
    serde_yaml::from_str(raw).map_err(|e| StoreError::Corrupt {
        key: key.clone(),
        message: e.to_string(),
    })
}

fn write_manifest(paths: &RecordPaths, key: &RecordKey, manifest: &RecordManifest) -> StoreResult<()> {
    let encoded = serde_yaml::to_string(manifest).map_err(|e| StoreError::Corrupt {
        key: key.clone(),
        message: e.to_string(),
    })?;

    let mut temp = File::create(&paths.temp).map_err(|e| StoreError::io_error(&paths.temp, e))?;
    temp.write_all(encoded.as_bytes())
        .and_then(|()| temp.sync_all())
        .map_err(|e| StoreError::io_error(&paths.temp, e))?;
    fs::rename(&paths.temp, &paths.manifest).map_err(|e| StoreError::io_error(&paths.manifest, e))
}
