//! Server settings
//!
//! Layered: built-in defaults, then an optional TOML file, then the
//! environment, then command-line flags (applied by the binary through the
//! `with_*` builders).

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use vconf_document::DocumentError;
use vconf_store::{
    FileRecordStore, MemoryRecordStore, RecordKey, RecordStore, StoreError, DEFAULT_PAYLOAD_KEY,
};

use crate::handlers::{ConfigService, DEFAULT_MAX_UPDATE_ATTEMPTS};
use crate::routes::DEFAULT_MAX_BODY_BYTES;

/// Environment variable overriding the listen address
pub const SERVER_ADDRESS_ENV: &str = "SERVER_ADDRESS";

/// Settings file picked up from the working directory when none is given
pub const DEFAULT_SETTINGS_FILE: &str = "app.toml";

/// Settings loading and validation errors
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    /// Settings file could not be read
    #[error("cannot read settings file {path}: {source}")]
    Read {
        /// File path
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Settings file is not valid TOML for [`Settings`]
    #[error("invalid settings file {path}: {source}")]
    Parse {
        /// File path
        path: PathBuf,
        /// Underlying error
        #[source]
        source: toml::de::Error,
    },

    /// A setting holds an unusable value
    #[error("invalid setting `{field}`: {reason}")]
    Invalid {
        /// Setting name
        field: &'static str,
        /// What is wrong with it
        reason: String,
    },

    /// Seed file does not hold a readable document
    #[error("seed file {path} is not a valid document: {source}")]
    Seed {
        /// File path
        path: PathBuf,
        /// Underlying error
        #[source]
        source: DocumentError,
    },

    /// Configured store could not be opened
    #[error("cannot open record store: {0}")]
    Store(#[from] StoreError),
}

impl SettingsError {
    fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field,
            reason: reason.into(),
        }
    }
}

/// Record store backend selection
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum StoreSettings {
    /// Process-local store; records do not survive a restart
    #[default]
    Memory,
    /// One manifest file per record under `root`
    File {
        /// Store root directory
        root: PathBuf,
    },
}

/// Record loaded into the in-memory store at startup
///
/// Written `<namespace>/<name>=<file>` on the command line, or as a
/// `[[seed]]` table in the settings file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SeedRecord {
    /// Record namespace
    pub namespace: String,
    /// Record name
    pub name: String,
    /// YAML document to store
    pub file: PathBuf,
}

impl SeedRecord {
    /// Key the record is stored under
    #[must_use]
    pub fn key(&self) -> RecordKey {
        RecordKey::new(self.namespace.clone(), self.name.clone())
    }
}

impl FromStr for SeedRecord {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || format!("invalid seed `{s}`, expected <namespace>/<name>=<file>");
        let (key, file) = s.split_once('=').ok_or_else(invalid)?;
        let (namespace, name) = key.split_once('/').ok_or_else(invalid)?;
        if namespace.is_empty() || name.is_empty() || file.is_empty() {
            return Err(invalid());
        }
        Ok(Self {
            namespace: namespace.to_string(),
            name: name.to_string(),
            file: PathBuf::from(file),
        })
    }
}

/// Server settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Listen address
    pub server_address: String,
    /// Record data key holding the document text
    pub payload_key: String,
    /// Update attempts before giving up on version conflicts
    pub max_update_attempts: u32,
    /// Bound on each store call, in milliseconds
    pub store_timeout_ms: u64,
    /// Bound on request bodies, in bytes
    pub max_body_bytes: u64,
    /// Record store backend
    pub store: StoreSettings,
    /// Records loaded into the in-memory store at startup
    #[serde(rename = "seed")]
    pub seeds: Vec<SeedRecord>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_address: "0.0.0.0:8080".to_string(),
            payload_key: DEFAULT_PAYLOAD_KEY.to_string(),
            max_update_attempts: DEFAULT_MAX_UPDATE_ATTEMPTS,
            store_timeout_ms: 5000,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            store: StoreSettings::default(),
            seeds: Vec::new(),
        }
    }
}

impl Settings {
    /// Create default settings
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load settings from a TOML file; absent keys keep their defaults
    ///
    /// # Errors
    /// Returns `SettingsError::Read` or `SettingsError::Parse`
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let text = std::fs::read_to_string(path).map_err(|source| SettingsError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&text).map_err(|source| SettingsError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Parse settings from TOML text
    ///
    /// # Errors
    /// Returns the TOML error on malformed text or unknown keys
    pub fn from_toml(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    /// Apply environment overrides through `lookup`
    #[must_use]
    pub fn apply_env(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(address) = lookup(SERVER_ADDRESS_ENV).filter(|s| !s.is_empty()) {
            self.server_address = address;
        }
        self
    }

    /// With listen address
    #[inline]
    #[must_use]
    pub fn with_server_address(mut self, address: impl Into<String>) -> Self {
        self.server_address = address.into();
        self
    }

    /// With payload key
    #[inline]
    #[must_use]
    pub fn with_payload_key(mut self, key: impl Into<String>) -> Self {
        self.payload_key = key.into();
        self
    }

    /// With update attempt bound
    #[inline]
    #[must_use]
    pub fn with_max_update_attempts(mut self, attempts: u32) -> Self {
        self.max_update_attempts = attempts;
        self
    }

    /// With store call timeout
    #[inline]
    #[must_use]
    pub fn with_store_timeout_ms(mut self, millis: u64) -> Self {
        self.store_timeout_ms = millis;
        self
    }

    /// With file store rooted at `root`
    #[inline]
    #[must_use]
    pub fn with_store_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.store = StoreSettings::File { root: root.into() };
        self
    }

    /// With a record seeded into the in-memory store
    #[inline]
    #[must_use]
    pub fn with_seed(mut self, seed: SeedRecord) -> Self {
        self.seeds.push(seed);
        self
    }

    /// Store call timeout
    #[inline]
    #[must_use]
    pub fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.store_timeout_ms)
    }

    /// Check every field
    ///
    /// # Errors
    /// Returns `SettingsError::Invalid` naming the first bad field
    pub fn validate(&self) -> Result<(), SettingsError> {
        self.socket_addr()?;
        if self.payload_key.trim().is_empty() {
            return Err(SettingsError::invalid("payload_key", "must not be empty"));
        }
        if self.max_update_attempts == 0 {
            return Err(SettingsError::invalid("max_update_attempts", "must be at least 1"));
        }
        if self.store_timeout_ms == 0 {
            return Err(SettingsError::invalid("store_timeout_ms", "must be at least 1"));
        }
        if self.max_body_bytes == 0 {
            return Err(SettingsError::invalid("max_body_bytes", "must be at least 1"));
        }
        if let StoreSettings::File { root } = &self.store {
            if root.as_os_str().is_empty() {
                return Err(SettingsError::invalid("store.root", "must not be empty"));
            }
            if !self.seeds.is_empty() {
                return Err(SettingsError::invalid(
                    "seed",
                    "only the memory store can be seeded",
                ));
            }
        }
        for seed in &self.seeds {
            if seed.namespace.is_empty() || seed.name.is_empty() {
                return Err(SettingsError::invalid(
                    "seed",
                    format!("`{}` needs a namespace and a name", seed.file.display()),
                ));
            }
        }
        Ok(())
    }

    /// Parsed listen address
    ///
    /// # Errors
    /// Returns `SettingsError::Invalid` if the address does not parse
    pub fn socket_addr(&self) -> Result<SocketAddr, SettingsError> {
        self.server_address
            .parse()
            .map_err(|e| SettingsError::invalid("server_address", format!("{e}")))
    }

    /// Open the configured record store
    ///
    /// The in-memory store starts out holding the configured seed records.
    ///
    /// # Errors
    /// - `SettingsError::Store` if the file store root cannot be created or
    ///   two seeds share a key
    /// - `SettingsError::Read` / `SettingsError::Seed` if a seed file cannot
    ///   be read or does not parse
    pub fn build_store(&self) -> Result<Arc<dyn RecordStore>, SettingsError> {
        let store: Arc<dyn RecordStore> = match &self.store {
            StoreSettings::Memory => {
                tracing::warn!("Using in-memory record store; records are lost on restart");
                Arc::new(self.seeded_memory_store()?)
            }
            StoreSettings::File { root } => {
                tracing::info!("Using file record store at {}", root.display());
                Arc::new(FileRecordStore::open(root.clone(), self.payload_key.clone())?)
            }
        };
        Ok(store)
    }

    fn seeded_memory_store(&self) -> Result<MemoryRecordStore, SettingsError> {
        let store = MemoryRecordStore::new(self.payload_key.clone());
        for seed in &self.seeds {
            let text = std::fs::read_to_string(&seed.file).map_err(|source| SettingsError::Read {
                path: seed.file.clone(),
                source,
            })?;
            vconf_document::parse(&text).map_err(|source| SettingsError::Seed {
                path: seed.file.clone(),
                source,
            })?;
            store.create(seed.key(), text)?;
            tracing::info!("Seeded {} from {}", seed.key(), seed.file.display());
        }
        Ok(store)
    }

    /// Build the request handlers over the configured store
    ///
    /// # Errors
    /// Returns `SettingsError::Store` if the store cannot be opened
    pub fn build_service(&self) -> Result<ConfigService, SettingsError> {
        Ok(ConfigService::new(self.build_store()?)
            .with_max_update_attempts(self.max_update_attempts)
            .with_store_timeout(self.store_timeout()))
    }
}
