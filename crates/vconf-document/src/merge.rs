//! Merge engine
//!
//! Overlays a [`Fragment`] onto a [`VectorConfig`] with key-level overwrite:
//! a supplied key replaces the stored value wholesale (no deep merge), a new
//! key is added, and keys the fragment does not mention are left alone.
//! `data_dir` and unrecognised top-level keys are carried over unchanged.

use crate::document::{Fragment, Section, SectionKind, VectorConfig};

/// One entry touched by a merge
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct EntryRef {
    /// Section holding the entry
    pub section: SectionKind,
    /// Entry key within the section
    pub key: String,
}

impl EntryRef {
    fn new(section: SectionKind, key: &str) -> Self {
        Self {
            section,
            key: key.to_owned(),
        }
    }
}

impl std::fmt::Display for EntryRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.section, self.key)
    }
}

/// What a merge did to each supplied entry
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeReport {
    /// Keys that were not present before
    pub added: Vec<EntryRef>,
    /// Keys whose value changed
    pub replaced: Vec<EntryRef>,
    /// Keys supplied with the value already stored
    pub unchanged: Vec<EntryRef>,
}

impl MergeReport {
    /// True when the merged document equals the input document
    #[inline]
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.added.is_empty() && self.replaced.is_empty()
    }
}

/// Overlay `patch` onto `base`, returning a new section
///
/// Neither input is modified.
#[must_use]
pub fn overlay(base: &Section, patch: &Section) -> Section {
    let mut result = base.clone();
    result.extend(patch.iter().map(|(key, value)| (key.clone(), value.clone())));
    result
}

/// Merge a fragment into a document
///
/// Pure: the result depends only on the inputs, and an empty fragment
/// yields a document equal to `current`.
#[must_use]
pub fn merge(current: &VectorConfig, fragment: &Fragment) -> VectorConfig {
    VectorConfig {
        data_dir: current.data_dir.clone(),
        sinks: overlay(&current.sinks, &fragment.sinks),
        transforms: overlay(&current.transforms, &fragment.transforms),
        sources: overlay(&current.sources, &fragment.sources),
        extra: current.extra.clone(),
    }
}

/// Merge a fragment and classify every supplied entry
#[must_use]
pub fn merge_with_report(current: &VectorConfig, fragment: &Fragment) -> (VectorConfig, MergeReport) {
    let mut report = MergeReport::default();

    for kind in SectionKind::ALL {
        let before = current.section(kind);
        for (key, value) in fragment.section(kind) {
            let entry = EntryRef::new(kind, key);
            match before.get(key) {
                None => report.added.push(entry),
                Some(existing) if existing == value => report.unchanged.push(entry),
                Some(_) => report.replaced.push(entry),
            }
        }
    }

    (merge(current, fragment), report)
}
