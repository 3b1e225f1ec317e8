//! Error types for the document layer
//!
//! Covers both directions of the persisted boundary:
//! - Parse (stored YAML text → `VectorConfig`)
//! - Serialize (`VectorConfig` → stored YAML text)

/// Errors while decoding or encoding a config document
#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    /// Text is not syntactically valid YAML
    #[error("invalid YAML: {0}")]
    InvalidYaml(#[source] serde_yaml::Error),

    /// Document root is a scalar or sequence instead of a mapping
    #[error("document root must be a mapping, found {found}")]
    NotAMapping {
        /// Kind of the YAML node found at the root
        found: &'static str,
    },

    /// YAML is valid but a known key has the wrong shape
    #[error("invalid document structure: {0}")]
    InvalidStructure(#[source] serde_yaml::Error),

    /// Encoding the document failed
    #[error("serialization failed: {0}")]
    Serialization(#[source] serde_yaml::Error),
}

impl DocumentError {
    /// Whether the error came from reading text (as opposed to writing it)
    #[inline]
    #[must_use]
    pub fn is_parse(&self) -> bool {
        !matches!(self, Self::Serialization(_))
    }
}

/// Result alias for document operations
pub type DocumentResult<T> = Result<T, DocumentError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_a_mapping_display() {
        let err = DocumentError::NotAMapping { found: "sequence" };
        assert_eq!(err.to_string(), "document root must be a mapping, found sequence");
        assert!(err.is_parse());
    }

    #[test]
    fn invalid_yaml_is_parse() {
        let source = serde_yaml::from_str::<serde_yaml::Value>("a: [").unwrap_err();
        let err = DocumentError::InvalidYaml(source);
        assert!(err.is_parse());
        assert!(err.to_string().starts_with("invalid YAML"));
    }
}
