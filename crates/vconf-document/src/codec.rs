//! Persisted YAML encoding of [`VectorConfig`]
//!
//! Uses `serde_yaml` for both directions. Parsing goes through an untyped
//! [`serde_yaml::Value`] first so that empty payloads and non-mapping roots
//! are handled before the typed decode.
//!
//! `<<` is an ordinary key in both directions: merge keys are not resolved,
//! so a `<<` entry written by [`to_yaml`] reads back unchanged. Anchors and
//! aliases are still expanded.

use serde_yaml::Value;

use crate::document::VectorConfig;
use crate::error::{DocumentError, DocumentResult};

/// Parse stored YAML text into a document
///
/// Empty or comment-only text yields an empty document, as does a document
/// that omits any of the sections.
///
/// Mapping keys inside section values must be strings; a key such as `200`
/// in `codes: {200: ok}` is rejected with `InvalidStructure`.
///
/// # Errors
/// - `DocumentError::InvalidYaml` if the text is not valid YAML
/// - `DocumentError::NotAMapping` if the root is not a mapping
/// - `DocumentError::InvalidStructure` if a known key has the wrong shape
pub fn parse(text: &str) -> DocumentResult<VectorConfig> {
    if text.trim().is_empty() {
        return Ok(VectorConfig::default());
    }

    let root: Value = serde_yaml::from_str(text).map_err(DocumentError::InvalidYaml)?;

    match root {
        Value::Null => Ok(VectorConfig::default()),
        Value::Mapping(_) => serde_yaml::from_value(root).map_err(DocumentError::InvalidStructure),
        other => Err(DocumentError::NotAMapping {
            found: node_kind(&other),
        }),
    }
}

/// Encode a document as block-style YAML
///
/// # Errors
/// Returns `DocumentError::Serialization` if encoding fails (not expected
/// for documents built from parsed input)
pub fn to_yaml(document: &VectorConfig) -> DocumentResult<String> {
    serde_yaml::to_string(document).map_err(DocumentError::Serialization)
}

fn node_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Sequence(_) => "sequence",
        Value::Mapping(_) => "mapping",
        Value::Tagged(_) => "tagged value",
    }
}
