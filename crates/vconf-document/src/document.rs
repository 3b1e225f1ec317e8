//! Vector config document model
//!
//! A document has an opaque `data_dir` and three keyed sections. Section
//! values are never interpreted here; they travel as untyped JSON values.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Keyed entries of one section (`sources`, `transforms` or `sinks`)
///
/// Ordered so that encoding is stable across requests.
pub type Section = BTreeMap<String, Value>;

/// The three keyed sections of a document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SectionKind {
    /// Data sources
    Sources,
    /// Transforms between sources and sinks
    Transforms,
    /// Data sinks
    Sinks,
}

impl SectionKind {
    /// All sections, in the order the API reports them
    pub const ALL: [SectionKind; 3] = [Self::Sources, Self::Transforms, Self::Sinks];

    /// Key used for this section in both encodings
    #[inline]
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Sources => "sources",
            Self::Transforms => "transforms",
            Self::Sinks => "sinks",
        }
    }
}

impl fmt::Display for SectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Full config document as persisted in the record payload
///
/// Field order matches the persisted YAML layout. Top-level keys other than
/// the four known ones are kept in `extra` so a rewrite never drops them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VectorConfig {
    /// Vector data directory, passed through untouched
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<String>,

    /// Sink definitions by id
    #[serde(default, deserialize_with = "section_or_empty")]
    pub sinks: Section,

    /// Transform definitions by id
    #[serde(default, deserialize_with = "section_or_empty")]
    pub transforms: Section,

    /// Source definitions by id
    #[serde(default, deserialize_with = "section_or_empty")]
    pub sources: Section,

    /// Unrecognised top-level keys
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl VectorConfig {
    /// Create an empty document
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the data directory
    #[inline]
    #[must_use]
    pub fn with_data_dir(mut self, data_dir: impl Into<String>) -> Self {
        self.data_dir = Some(data_dir.into());
        self
    }

    /// Add or replace one entry
    #[inline]
    #[must_use]
    pub fn with_entry(mut self, kind: SectionKind, key: impl Into<String>, value: Value) -> Self {
        self.section_mut(kind).insert(key.into(), value);
        self
    }

    /// Borrow a section
    #[inline]
    #[must_use]
    pub fn section(&self, kind: SectionKind) -> &Section {
        match kind {
            SectionKind::Sources => &self.sources,
            SectionKind::Transforms => &self.transforms,
            SectionKind::Sinks => &self.sinks,
        }
    }

    /// Mutably borrow a section
    #[inline]
    pub fn section_mut(&mut self, kind: SectionKind) -> &mut Section {
        match kind {
            SectionKind::Sources => &mut self.sources,
            SectionKind::Transforms => &mut self.transforms,
            SectionKind::Sinks => &mut self.sinks,
        }
    }

    /// Total number of entries across the three sections
    #[must_use]
    pub fn entry_count(&self) -> usize {
        SectionKind::ALL
            .iter()
            .map(|kind| self.section(*kind).len())
            .sum()
    }
}

/// Caller-supplied partial document to overlay onto the stored one
///
/// Carries no `data_dir`: fragments can only touch section entries.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Fragment {
    /// Sources to add or replace
    #[serde(default, deserialize_with = "section_or_empty")]
    pub sources: Section,

    /// Transforms to add or replace
    #[serde(default, deserialize_with = "section_or_empty")]
    pub transforms: Section,

    /// Sinks to add or replace
    #[serde(default, deserialize_with = "section_or_empty")]
    pub sinks: Section,
}

impl Fragment {
    /// Create an empty fragment
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one entry
    #[inline]
    #[must_use]
    pub fn with_entry(mut self, kind: SectionKind, key: impl Into<String>, value: Value) -> Self {
        self.section_mut(kind).insert(key.into(), value);
        self
    }

    /// Borrow a section
    #[inline]
    #[must_use]
    pub fn section(&self, kind: SectionKind) -> &Section {
        match kind {
            SectionKind::Sources => &self.sources,
            SectionKind::Transforms => &self.transforms,
            SectionKind::Sinks => &self.sinks,
        }
    }

    /// Mutably borrow a section
    #[inline]
    pub fn section_mut(&mut self, kind: SectionKind) -> &mut Section {
        match kind {
            SectionKind::Sources => &mut self.sources,
            SectionKind::Transforms => &mut self.transforms,
            SectionKind::Sinks => &mut self.sinks,
        }
    }

    /// True when no section carries any entry
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sources.is_empty() && self.transforms.is_empty() && self.sinks.is_empty()
    }

    /// Total number of entries across the three sections
    #[must_use]
    pub fn entry_count(&self) -> usize {
        self.sources.len() + self.transforms.len() + self.sinks.len()
    }
}

/// Treat an absent or `null` section as empty
fn section_or_empty<'de, D>(deserializer: D) -> Result<Section, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Section>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn section_kind_names() {
        let names: Vec<_> = SectionKind::ALL.iter().map(|k| k.as_str()).collect();
        assert_eq!(names, ["sources", "transforms", "sinks"]);
        assert_eq!(SectionKind::Sinks.to_string(), "sinks");
    }

    #[test]
    fn builder_places_entries() {
        let doc = VectorConfig::new()
            .with_data_dir("/var/lib/vector")
            .with_entry(SectionKind::Sources, "in", json!({"type": "stdin"}))
            .with_entry(SectionKind::Sinks, "out", json!({"type": "console"}));

        assert_eq!(doc.data_dir.as_deref(), Some("/var/lib/vector"));
        assert_eq!(doc.sources["in"], json!({"type": "stdin"}));
        assert!(doc.transforms.is_empty());
        assert_eq!(doc.entry_count(), 2);
    }

    #[test]
    fn fragment_null_sections_are_empty() {
        let fragment: Fragment =
            serde_json::from_value(json!({"sources": null, "sinks": {"s": {"type": "blackhole"}}}))
                .unwrap();
        assert!(fragment.sources.is_empty());
        assert!(fragment.transforms.is_empty());
        assert_eq!(fragment.entry_count(), 1);
        assert!(!fragment.is_empty());
    }

    #[test]
    fn fragment_rejects_non_mapping_section() {
        let result = serde_json::from_value::<Fragment>(json!({"transforms": ["a"]}));
        assert!(result.is_err());
    }

    #[test]
    fn same_key_in_two_sections() {
        let fragment = Fragment::new()
            .with_entry(SectionKind::Sources, "shared", json!(1))
            .with_entry(SectionKind::Sinks, "shared", json!(2));
        assert_eq!(fragment.section(SectionKind::Sources)["shared"], json!(1));
        assert_eq!(fragment.section(SectionKind::Sinks)["shared"], json!(2));
    }
}
