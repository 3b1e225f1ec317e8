//! Record identity and revision types

use std::fmt;

/// Payload key used when none is configured
pub const DEFAULT_PAYLOAD_KEY: &str = "vector.yaml";

/// Namespaced name of one record
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecordKey {
    /// Namespace holding the record
    pub namespace: String,
    /// Record name within the namespace
    pub name: String,
}

impl RecordKey {
    /// Create new key
    #[inline]
    #[must_use]
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// Opaque identifier of one stored revision
///
/// Only ever compared for equality.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VersionToken(String);

impl VersionToken {
    /// Wrap a store-specific revision string
    #[inline]
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Borrow the raw token
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<u64> for VersionToken {
    fn from(revision: u64) -> Self {
        Self(revision.to_string())
    }
}

impl fmt::Display for VersionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Payload text of a record together with its revision
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredRecord {
    /// Document text held under the payload key (empty if the key is absent)
    pub text: String,
    /// Revision the text was read at
    pub version: VersionToken,
}
