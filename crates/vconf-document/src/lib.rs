//! vconf Document Layer
//!
//! Typed model of a Vector pipeline config, its persisted YAML encoding,
//! and the merge engine that overlays caller fragments onto it.
//!
//! # Core Concepts
//!
//! - [`VectorConfig`]: Full document (`data_dir` plus three keyed sections)
//! - [`Fragment`]: Partial set of section entries supplied by a caller
//! - [`parse`] / [`to_yaml`]: Persisted text boundary
//! - [`merge`]: Pure key-level overlay, last write wins
//!
//! # Example
//!
//! ```rust
//! use vconf_document::{merge, parse, to_yaml, Fragment, SectionKind};
//! use serde_json::json;
//!
//! let current = parse("sources:\n  in:\n    type: stdin\n")?;
//! let fragment = Fragment::new().with_entry(SectionKind::Sinks, "out", json!({"type": "console"}));
//!
//! let updated = merge(&current, &fragment);
//! assert_eq!(updated.sources.len(), 1);
//! assert_eq!(updated.sinks.len(), 1);
//!
//! let text = to_yaml(&updated)?;
//! assert_eq!(parse(&text)?, updated);
//! # Ok::<(), vconf_document::DocumentError>(())
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

mod codec;
mod document;
mod error;
mod merge;

pub use codec::{parse, to_yaml};
pub use document::{Fragment, Section, SectionKind, VectorConfig};
pub use error::{DocumentError, DocumentResult};
pub use merge::{merge, merge_with_report, overlay, EntryRef, MergeReport};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
