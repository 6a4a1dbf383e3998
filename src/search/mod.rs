//! Search backend interface
//!
//! The backend is a document-oriented add/delete API accepting JSON batches.
//! Documents are keyed by a namespaced id (`item:<id>`, `unit:<id>`,
//! `page:<unit>:<slug>`); the `is_info` flag distinguishes informational
//! pages from content items.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Faceted and free-text fields submitted per document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchFields {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub authors: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub campuses: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub departments: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub journals: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub series: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub disciplines: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rights: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub genre: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pub_year: Option<i32>,
    /// 1 for informational pages, 0 for content items
    pub is_info: u8,
}

/// One add or delete operation in a batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SearchOp {
    Add { id: String, fields: SearchFields },
    Delete { id: String },
}

impl SearchOp {
    pub fn doc_id(&self) -> &str {
        match self {
            SearchOp::Add { id, .. } | SearchOp::Delete { id } => id,
        }
    }

    /// Serialized size of this operation on the wire
    pub fn wire_len(&self) -> usize {
        serde_json::to_vec(self).map(|v| v.len()).unwrap_or(0)
    }
}

/// Namespaced document id for an item
pub fn item_doc_id(id: &str) -> String {
    format!("item:{}", id)
}

/// Namespaced document id for a unit's landing page
pub fn unit_doc_id(id: &str) -> String {
    format!("unit:{}", id)
}

/// Namespaced document id for an informational page
pub fn page_doc_id(unit: &str, slug: &str) -> String {
    format!("page:{}:{}", unit, slug)
}

/// Backend failures, split by whether retrying can help
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("transient backend error: {0}")]
    Transient(String),

    #[error("fatal backend error: {0}")]
    Fatal(String),
}

/// Document-oriented search backend seam
#[async_trait]
pub trait SearchBackend: Send + Sync {
    /// Ship one batch of operations. The call either fully succeeds or
    /// fails as a whole; partial application is the backend's problem to
    /// prevent.
    async fn submit(&self, ops: &[SearchOp]) -> Result<(), BackendError>;
}

/// HTTP client for the hosted search backend
pub struct HttpSearchBackend {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpSearchBackend {
    pub fn new(endpoint: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint,
        }
    }
}

#[async_trait]
impl SearchBackend for HttpSearchBackend {
    async fn submit(&self, ops: &[SearchOp]) -> Result<(), BackendError> {
        debug!(ops = ops.len(), endpoint = %self.endpoint, "Submitting batch");
        let resp = self
            .client
            .post(&self.endpoint)
            .json(ops)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() || e.is_connect() {
                    BackendError::Transient(e.to_string())
                } else {
                    BackendError::Fatal(e.to_string())
                }
            })?;

        let status = resp.status();
        if status.is_success() {
            return Ok(());
        }
        let body = resp.text().await.unwrap_or_default();
        if status.is_server_error() || status == StatusCode::SERVICE_UNAVAILABLE {
            Err(BackendError::Transient(format!("{}: {}", status, body)))
        } else {
            Err(BackendError::Fatal(format!("{}: {}", status, body)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ops_serialize_with_type_tags() {
        let add = SearchOp::Add {
            id: item_doc_id("qt1234"),
            fields: SearchFields {
                title: Some("A Title".to_string()),
                is_info: 0,
                ..Default::default()
            },
        };
        let json = serde_json::to_value(&add).unwrap();
        assert_eq!(json["type"], "add");
        assert_eq!(json["id"], "item:qt1234");
        assert_eq!(json["fields"]["title"], "A Title");

        let del = SearchOp::Delete {
            id: item_doc_id("qt9999"),
        };
        let json = serde_json::to_value(&del).unwrap();
        assert_eq!(json["type"], "delete");
    }

    #[test]
    fn doc_ids_are_namespaced() {
        assert_eq!(item_doc_id("qt1"), "item:qt1");
        assert_eq!(unit_doc_id("ucb"), "unit:ucb");
        assert_eq!(page_doc_id("ucb", "about"), "page:ucb:about");
    }

    #[test]
    fn wire_len_tracks_serialized_size() {
        let op = SearchOp::Delete {
            id: "item:qt1".to_string(),
        };
        assert_eq!(op.wire_len(), serde_json::to_vec(&op).unwrap().len());
    }
}
