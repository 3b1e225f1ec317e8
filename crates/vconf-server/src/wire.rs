//! JSON wire types for the `/config` routes

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use vconf_document::{Fragment, Section, VectorConfig};

use crate::error::ApiError;

/// Field carrying the record name
pub const NAME_FIELD: &str = "configMapName";

/// Field carrying the record namespace
pub const NAMESPACE_FIELD: &str = "configMapNameSpace";

/// Body (or query) of `GET /config`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchRequest {
    /// Record name
    #[serde(rename = "configMapName", default)]
    pub name: Option<String>,

    /// Record namespace
    #[serde(rename = "configMapNameSpace", default)]
    pub namespace: Option<String>,
}

impl FetchRequest {
    /// Build from a raw body and query parameters
    ///
    /// Body fields win; the query string fills whatever the body leaves out.
    /// An empty body is allowed.
    ///
    /// # Errors
    /// Returns `ApiError::Validation` if the body is not a JSON object of
    /// the expected shape
    pub fn from_parts(body: &[u8], query: &HashMap<String, String>) -> Result<Self, ApiError> {
        let mut request: Self = decode_body(body)?;
        if request.name.is_none() {
            request.name = query.get(NAME_FIELD).cloned();
        }
        if request.namespace.is_none() {
            request.namespace = query.get(NAMESPACE_FIELD).cloned();
        }
        Ok(request)
    }
}

/// Body of `POST /config`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpdateRequest {
    /// Record name
    #[serde(rename = "configMapName", default)]
    pub name: Option<String>,

    /// Record namespace
    #[serde(rename = "configMapNameSpace", default)]
    pub namespace: Option<String>,

    /// Entries to merge
    #[serde(flatten)]
    pub fragment: Fragment,
}

impl UpdateRequest {
    /// Decode a raw request body
    ///
    /// # Errors
    /// Returns `ApiError::Validation` if the body is not a JSON object of
    /// the expected shape
    pub fn from_body(body: &[u8]) -> Result<Self, ApiError> {
        decode_body(body)
    }
}

/// Document as returned to API callers
///
/// Always carries all four keys; `data_dir` is `null` when unset.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigResponse {
    /// Vector data directory
    pub data_dir: Option<String>,
    /// Source definitions by id
    #[serde(default)]
    pub sources: Section,
    /// Transform definitions by id
    #[serde(default)]
    pub transforms: Section,
    /// Sink definitions by id
    #[serde(default)]
    pub sinks: Section,
}

impl From<VectorConfig> for ConfigResponse {
    fn from(doc: VectorConfig) -> Self {
        Self {
            data_dir: doc.data_dir,
            sources: doc.sources,
            transforms: doc.transforms,
            sinks: doc.sinks,
        }
    }
}

fn decode_body<T: Default + serde::de::DeserializeOwned>(body: &[u8]) -> Result<T, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice(body).map_err(|e| ApiError::validation(format!("invalid request body: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use vconf_document::SectionKind;

    #[test]
    fn fetch_request_from_body() {
        let body = br#"{"configMapName": "vector", "configMapNameSpace": "logging"}"#;
        let request = FetchRequest::from_parts(body, &HashMap::new()).unwrap();
        assert_eq!(request.name.as_deref(), Some("vector"));
        assert_eq!(request.namespace.as_deref(), Some("logging"));
    }

    #[test]
    fn fetch_request_from_query() {
        let query: HashMap<_, _> = [
            (NAME_FIELD.to_string(), "vector".to_string()),
            (NAMESPACE_FIELD.to_string(), "logging".to_string()),
        ]
        .into_iter()
        .collect();

        let request = FetchRequest::from_parts(b"", &query).unwrap();
        assert_eq!(request.name.as_deref(), Some("vector"));
        assert_eq!(request.namespace.as_deref(), Some("logging"));
    }

    #[test]
    fn body_wins_over_query() {
        let query: HashMap<_, _> = [(NAME_FIELD.to_string(), "from-query".to_string())]
            .into_iter()
            .collect();
        let request = FetchRequest::from_parts(br#"{"configMapName": "from-body"}"#, &query).unwrap();
        assert_eq!(request.name.as_deref(), Some("from-body"));
        assert_eq!(request.namespace, None);
    }

    #[test]
    fn malformed_body_is_validation_error() {
        let err = FetchRequest::from_parts(b"{not json", &HashMap::new()).unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));

        let err = UpdateRequest::from_body(br#"{"configMapName": 7}"#).unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[test]
    fn update_request_carries_fragment() {
        let body = serde_json::to_vec(&json!({
            "configMapName": "vector",
            "configMapNameSpace": "logging",
            "transforms": {"filter_test": {"type": "filter"}},
            "sinks": null,
        }))
        .unwrap();

        let request = UpdateRequest::from_body(&body).unwrap();
        assert_eq!(request.name.as_deref(), Some("vector"));
        assert_eq!(
            request.fragment,
            Fragment::new().with_entry(SectionKind::Transforms, "filter_test", json!({"type": "filter"}))
        );
    }

    #[test]
    fn response_has_all_keys() {
        let value = serde_json::to_value(ConfigResponse::from(VectorConfig::default())).unwrap();
        assert_eq!(
            value,
            json!({"data_dir": null, "sources": {}, "transforms": {}, "sinks": {}})
        );
    }

    #[test]
    fn response_drops_unknown_top_level_keys() {
        let mut doc = VectorConfig::new().with_data_dir("/data");
        doc.extra.insert("api".into(), json!({"enabled": true}));
        let value = serde_json::to_value(ConfigResponse::from(doc)).unwrap();
        assert!(value.get("api").is_none());
        assert_eq!(value["data_dir"], json!("/data"));
    }
}
